use std::path::PathBuf;

use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Calendar as returned by the provider's calendar list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCalendar {
    pub id: String,
    /// Display title, also used as the output file stem
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: Option<String>,
    /// IANA time zone name
    #[serde(default)]
    pub time_zone: Option<String>,
}

impl RemoteCalendar {
    /// Public embed link published in the JSON feed.
    pub fn embed_url(&self, fallback_tz: &str) -> String {
        format!(
            "https://calendar.google.com/calendar/embed?src={}&ctz={}",
            self.id,
            self.time_zone.as_deref().unwrap_or(fallback_tz)
        )
    }
}

/// Organizer or attendee of a remote event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemotePerson {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Start or end of a remote event. Timed events carry `date_time`
/// (`YYYY-MM-DDTHH:MM:SS±HH:MM`), all-day events only `date`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEventTime {
    #[serde(default)]
    pub date_time: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time_zone: Option<String>,
}

/// Event record as returned by the provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEvent {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub organizer: Option<RemotePerson>,
    #[serde(default)]
    pub attendees: Vec<RemotePerson>,
    #[serde(default)]
    pub start: Option<RemoteEventTime>,
    #[serde(default)]
    pub end: Option<RemoteEventTime>,
    /// Public view URL
    #[serde(default)]
    pub html_link: Option<String>,
    #[serde(default)]
    pub transparency: Option<String>,
}

/// Provider-agnostic event, built and discarded within one export run.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalEvent {
    pub id: String,
    pub summary: String,
    pub description: Option<String>,
    pub location: Option<String>,
    /// Upper-cased provider status
    pub status: String,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    /// Organizer email, empty when unknown
    pub organizer_display: String,
    /// Attendee display names joined by a single space
    pub attendees_display: String,
    /// `<export-instant>-EVENT#<id>-@<lab>`
    pub unique_key: String,
    pub public_url: String,
    /// `TRANSPARENT` / `OPAQUE` when the provider says so
    pub transparency: Option<String>,
}

/// Export run settings
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Laboratory name embedded in UIDs and the product identifier
    pub lab_name: String,
    /// Zone in which provider wall-clock times are interpreted
    pub timezone: Tz,
    /// Root of `ics/` and `json/`
    pub output_dir: PathBuf,
    /// Abort the run on the first failing calendar
    pub fail_fast: bool,
}

impl ExportOptions {
    pub fn ics_dir(&self) -> PathBuf {
        self.output_dir.join("ics")
    }

    pub fn json_dir(&self) -> PathBuf {
        self.output_dir.join("json")
    }

    pub fn product_id(&self) -> String {
        format!("-//SEMINAIRES/{}/ICS v1.0//FR", self.lab_name)
    }
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            lab_name: "LPSM".to_string(),
            timezone: chrono_tz::Europe::Paris,
            output_dir: PathBuf::from("export"),
            fail_fast: false,
        }
    }
}
