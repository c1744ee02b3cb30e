// SPDX-License-Identifier: MIT

//! Google Calendar v3 client.
//!
//! Handles:
//! - Minting short-lived access tokens from a stored refresh token
//! - Listing the user's writable calendars
//! - All-day event insert/update/delete for record mirroring

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const API_BASE: &str = "https://www.googleapis.com/calendar/v3";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// A hung external call stalls only its own request, but still bound it.
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Google Calendar API client.
#[derive(Clone)]
pub struct CalendarClient {
    http: reqwest::Client,
    api_base: String,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl CalendarClient {
    /// Create a client against the real Google endpoints.
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self::with_endpoints(API_BASE, TOKEN_URL, client_id, client_secret)
    }

    /// Create a client with custom endpoints (tests, proxies).
    pub fn with_endpoints(
        api_base: impl Into<String>,
        token_url: impl Into<String>,
        client_id: String,
        client_secret: String,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into(),
            token_url: token_url.into(),
            client_id,
            client_secret,
        }
    }

    /// Mint an access token from the user's stored refresh token.
    pub async fn access_token(&self, refresh_token: &str) -> Result<String, AppError> {
        let response = self
            .http
            .post(&self.token_url)
            .timeout(HTTP_TIMEOUT)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| AppError::GoogleApi(format!("Token refresh request failed: {e}")))?;

        let tokens: AccessTokenResponse = self.check_response_json(response).await?;
        Ok(tokens.access_token)
    }

    /// List calendars the user can write to.
    pub async fn list_calendars(&self, access_token: &str) -> Result<Vec<CalendarSummary>, AppError> {
        let url = format!("{}/users/me/calendarList", self.api_base);

        let response = self
            .http
            .get(&url)
            .timeout(HTTP_TIMEOUT)
            .bearer_auth(access_token)
            .query(&[("minAccessRole", "writer")])
            .send()
            .await
            .map_err(|e| AppError::GoogleApi(e.to_string()))?;

        let list: CalendarListResponse = self.check_response_json(response).await?;
        Ok(list.items)
    }

    /// Insert an all-day event; returns the new event id.
    pub async fn insert_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event: &CalendarEvent,
    ) -> Result<String, AppError> {
        let url = format!(
            "{}/calendars/{}/events",
            self.api_base,
            urlencoding::encode(calendar_id)
        );

        let response = self
            .http
            .post(&url)
            .timeout(HTTP_TIMEOUT)
            .bearer_auth(access_token)
            .json(event)
            .send()
            .await
            .map_err(|e| AppError::GoogleApi(e.to_string()))?;

        let created: EventResponse = self.check_response_json(response).await?;
        Ok(created.id)
    }

    /// Update an existing event in place.
    pub async fn update_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
        event: &CalendarEvent,
    ) -> Result<(), AppError> {
        let url = format!(
            "{}/calendars/{}/events/{}",
            self.api_base,
            urlencoding::encode(calendar_id),
            urlencoding::encode(event_id)
        );

        let response = self
            .http
            .put(&url)
            .timeout(HTTP_TIMEOUT)
            .bearer_auth(access_token)
            .json(event)
            .send()
            .await
            .map_err(|e| AppError::GoogleApi(e.to_string()))?;

        self.check_response(response).await
    }

    /// Delete an event.
    pub async fn delete_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
    ) -> Result<(), AppError> {
        let url = format!(
            "{}/calendars/{}/events/{}",
            self.api_base,
            urlencoding::encode(calendar_id),
            urlencoding::encode(event_id)
        );

        let response = self
            .http
            .delete(&url)
            .timeout(HTTP_TIMEOUT)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::GoogleApi(e.to_string()))?;

        self.check_response(response).await
    }

    /// Check response status and return an error if not successful.
    async fn check_response(&self, response: reqwest::Response) -> Result<(), AppError> {
        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(AppError::GoogleApi(format!("HTTP {status}: {body}")))
    }

    /// Check response and parse the JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::GoogleApi(format!("HTTP {status}: {body}")));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::GoogleApi(format!("JSON parse error: {e}")))
    }
}

/// All-day event body (start inclusive, end exclusive).
#[derive(Debug, Clone, Serialize)]
pub struct CalendarEvent {
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start: EventDate,
    pub end: EventDate,
}

/// A date-only event boundary.
#[derive(Debug, Clone, Serialize)]
pub struct EventDate {
    pub date: String,
}

/// Writable calendar entry returned to the frontend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarSummary {
    pub id: String,
    pub summary: String,
    #[serde(default)]
    pub primary: bool,
}

#[derive(Debug, Deserialize)]
struct CalendarListResponse {
    #[serde(default)]
    items: Vec<CalendarSummary>,
}

#[derive(Debug, Deserialize)]
struct EventResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: String,
}
