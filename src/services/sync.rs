// SPDX-License-Identifier: MIT

//! Calendar reconciliation: best-effort mirroring of a record into the
//! user's Google Calendar.
//!
//! Invoked synchronously inside record create/update/delete. The local
//! record is the source of truth: any Google failure is logged and never
//! fails the enclosing mutation, so the mirror may drift. There is no
//! retry or repair job.
//!
//! Per-record transitions, keyed by (`addToCalendar`, stored event id):
//!
//! | addToCalendar | has event id | action                              |
//! |---------------|--------------|-------------------------------------|
//! | true          | absent       | create event, store returned id     |
//! | true          | present      | update event in place               |
//! | false         | present      | delete event (best-effort), clear id|
//! | false         | absent       | no-op                               |

use crate::dates::exclusive_event_end;
use crate::db::Db;
use crate::error::AppError;
use crate::services::calendar::{CalendarClient, CalendarEvent, EventDate};

/// Fixed prefix of every mirrored event title.
pub const EVENT_TITLE_PREFIX: &str = "Zdraví";

/// The record fields that shape the mirrored event.
pub struct RecordEvent<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub start_date: &'a str,
    /// Inclusive end date; None for a single-day record
    pub end_date: Option<&'a str>,
    pub member_name: Option<&'a str>,
}

/// Reconcile a record's external mirror and return the event id to store.
///
/// Never returns an error: failures are logged and the best-known id is
/// returned. On the `false`/present transition the id is cleared even when
/// the external delete fails, so the record stops referencing an event we
/// no longer want.
pub async fn reconcile(
    db: &Db,
    client: &CalendarClient,
    user_id: i64,
    add_to_calendar: bool,
    requested_calendar_id: Option<&str>,
    existing_event_id: Option<&str>,
    record: &RecordEvent<'_>,
) -> Option<String> {
    match (add_to_calendar, existing_event_id) {
        (false, None) => None,

        (false, Some(event_id)) => {
            if let Err(e) =
                delete_mirror(db, client, user_id, requested_calendar_id, event_id).await
            {
                tracing::warn!(user_id, event_id, error = %e, "Calendar event delete failed");
            }
            None
        }

        (true, existing) => {
            match upsert_mirror(db, client, user_id, requested_calendar_id, existing, record)
                .await
            {
                Ok(event_id) => event_id,
                Err(e) => {
                    tracing::warn!(user_id, error = %e, "Calendar sync failed");
                    existing.map(str::to_string)
                }
            }
        }
    }
}

/// Best-effort delete of a record's mirrored event, used by record deletion.
pub async fn delete_mirror(
    db: &Db,
    client: &CalendarClient,
    user_id: i64,
    requested_calendar_id: Option<&str>,
    event_id: &str,
) -> Result<(), AppError> {
    let Some((refresh_token, stored_calendar)) = credentials(db, user_id).await? else {
        tracing::info!(user_id, "No calendar credential; skipping event delete");
        return Ok(());
    };

    let calendar_id = target_calendar(requested_calendar_id, stored_calendar.as_deref());
    let access_token = client.access_token(&refresh_token).await?;
    client
        .delete_event(&access_token, calendar_id, event_id)
        .await?;

    tracing::info!(user_id, event_id, "Calendar event deleted");
    Ok(())
}

/// Create or update the mirrored event, returning the id to store.
async fn upsert_mirror(
    db: &Db,
    client: &CalendarClient,
    user_id: i64,
    requested_calendar_id: Option<&str>,
    existing_event_id: Option<&str>,
    record: &RecordEvent<'_>,
) -> Result<Option<String>, AppError> {
    let Some((refresh_token, stored_calendar)) = credentials(db, user_id).await? else {
        tracing::info!(user_id, "No calendar credential; skipping event sync");
        return Ok(existing_event_id.map(str::to_string));
    };

    let calendar_id = target_calendar(requested_calendar_id, stored_calendar.as_deref());
    let event = build_event(record)?;
    let access_token = client.access_token(&refresh_token).await?;

    match existing_event_id {
        None => {
            let event_id = client.insert_event(&access_token, calendar_id, &event).await?;
            tracing::info!(user_id, event_id = %event_id, "Calendar event created");
            Ok(Some(event_id))
        }
        Some(event_id) => {
            client
                .update_event(&access_token, calendar_id, event_id, &event)
                .await?;
            tracing::info!(user_id, event_id, "Calendar event updated");
            Ok(Some(event_id.to_string()))
        }
    }
}

/// The user's refresh token and stored default calendar, if usable.
async fn credentials(db: &Db, user_id: i64) -> Result<Option<(String, Option<String>)>, AppError> {
    let Some(user) = db.get_user(user_id).await? else {
        return Ok(None);
    };
    Ok(user.refresh_token.map(|token| (token, user.calendar_id)))
}

/// Per-request calendar choice, then the user's default, then `primary`.
fn target_calendar<'a>(requested: Option<&'a str>, stored: Option<&'a str>) -> &'a str {
    requested.or(stored).unwrap_or("primary")
}

/// Event title: `Zdraví: <member name - ><record title>`.
pub fn event_title(member_name: Option<&str>, title: &str) -> String {
    match member_name {
        Some(name) => format!("{EVENT_TITLE_PREFIX}: {name} - {title}"),
        None => format!("{EVENT_TITLE_PREFIX}: {title}"),
    }
}

fn build_event(record: &RecordEvent<'_>) -> Result<CalendarEvent, AppError> {
    Ok(CalendarEvent {
        summary: event_title(record.member_name, record.title),
        description: record.description.map(str::to_string),
        start: EventDate {
            date: record.start_date.to_string(),
        },
        end: EventDate {
            date: exclusive_event_end(record.start_date, record.end_date)?,
        },
    })
}
