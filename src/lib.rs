// SPDX-License-Identifier: MIT

//! Zdraví-Tracker: family health-record tracker backend.
//!
//! This crate provides the REST API for logging family illness records,
//! treatments, attachments, vaccinations and growth entries, with optional
//! mirroring of records into Google Calendar.

pub mod config;
pub mod dates;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::Db;
use services::{CalendarClient, GoogleAuthService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Db,
    pub google_auth: GoogleAuthService,
    pub calendar: CalendarClient,
}
