// SPDX-License-Identifier: MIT

//! Services module - Google integration and calendar reconciliation.

pub mod calendar;
pub mod google_auth;
pub mod sync;

pub use calendar::{CalendarClient, CalendarEvent, CalendarSummary, EventDate};
pub use google_auth::{CodeExchange, GoogleAuthService, GoogleIdentity};
