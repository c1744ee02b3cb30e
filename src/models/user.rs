// SPDX-License-Identifier: MIT

//! User model for storage and API.

use serde::{Deserialize, Serialize};

/// User row as stored in the `users` table.
///
/// Holds the Google refresh token, so this struct stays internal;
/// API responses use [`UserProfile`].
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    /// Google subject id from the verified ID token
    pub google_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    /// Avatar URL (may be None if not shared)
    pub picture: Option<String>,
    /// Long-lived Google refresh token, issued on first consent
    pub refresh_token: Option<String>,
    /// Default target calendar for record mirroring
    pub calendar_id: Option<String>,
    pub sync_enabled: bool,
    pub created_at: String,
}

/// User profile exposed over the API (no credentials).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub google_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub calendar_id: Option<String>,
    pub sync_enabled: bool,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            google_id: user.google_id,
            email: user.email,
            name: user.name,
            picture: user.picture,
            calendar_id: user.calendar_id,
            sync_enabled: user.sync_enabled,
        }
    }
}
