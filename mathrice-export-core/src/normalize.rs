use std::sync::LazyLock;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use regex::Regex;

use crate::{CanonicalEvent, Error, RemoteEvent, RemoteEventTime, RemotePerson, Result};

/// Date plus hour and minute; seconds and offset are ignored on purpose.
static DATE_TIME_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})-(\d{2})-(\d{2})T(\d{2}):(\d{2})").expect("valid date-time regex")
});

/// Turns provider events into [`CanonicalEvent`]s for one export run.
///
/// Every event normalized by the same instance shares the same generation
/// instant, so all UIDs of a run carry the same timestamp prefix.
#[derive(Debug, Clone)]
pub struct Normalizer {
    lab_name: String,
    timezone: Tz,
    generated_at: DateTime<Utc>,
}

impl Normalizer {
    pub fn new(lab_name: impl Into<String>, timezone: Tz, generated_at: DateTime<Utc>) -> Self {
        Self {
            lab_name: lab_name.into(),
            timezone,
            generated_at,
        }
    }

    pub fn normalize(&self, event: &RemoteEvent) -> Result<CanonicalEvent> {
        if event.id.is_empty() {
            return Err(Error::malformed("<unknown>", "event has no id"));
        }

        let start = event
            .start
            .as_ref()
            .ok_or_else(|| Error::malformed(&event.id, "event has no start time"))?;
        let end = event
            .end
            .as_ref()
            .ok_or_else(|| Error::malformed(&event.id, "event has no end time"))?;

        Ok(CanonicalEvent {
            id: event.id.clone(),
            summary: event.summary.clone().unwrap_or_default(),
            description: non_empty(event.description.as_deref()),
            location: non_empty(event.location.as_deref()),
            status: event
                .status
                .as_deref()
                .map(str::to_uppercase)
                .unwrap_or_default(),
            start: parse_event_time(&event.id, start, self.timezone)?,
            end: parse_event_time(&event.id, end, self.timezone)?,
            organizer_display: organizer_display(event.organizer.as_ref()),
            attendees_display: attendees_display(&event.attendees),
            unique_key: self.unique_key(&event.id),
            public_url: event.html_link.clone().unwrap_or_default(),
            transparency: event
                .transparency
                .as_deref()
                .and_then(|t| match t {
                    "transparent" => Some("TRANSPARENT".to_string()),
                    "opaque" => Some("OPAQUE".to_string()),
                    _ => None,
                }),
        })
    }

    /// `<export-instant>-EVENT#<id>-@<lab>`, the instant being Unix seconds
    /// with microsecond fraction.
    pub fn unique_key(&self, id: &str) -> String {
        format!(
            "{}.{:06}-EVENT#{}-@{}",
            self.generated_at.timestamp(),
            self.generated_at.timestamp_subsec_micros(),
            id,
            self.lab_name
        )
    }
}

/// Parse a provider timestamp, keeping only date, hour and minute.
///
/// The provider offset is dropped and the wall-clock value is placed in `tz`.
/// All-day events start at midnight.
pub fn parse_event_time(id: &str, time: &RemoteEventTime, tz: Tz) -> Result<DateTime<Tz>> {
    let naive = if let Some(ref raw) = time.date_time {
        let caps = DATE_TIME_PREFIX
            .captures(raw)
            .ok_or_else(|| Error::malformed(id, format!("unparseable date-time '{}'", raw)))?;
        let field = |i: usize| caps[i].parse::<u32>().unwrap_or_default();
        let year = caps[1]
            .parse::<i32>()
            .map_err(|_| Error::malformed(id, format!("invalid year in '{}'", raw)))?;

        NaiveDate::from_ymd_opt(year, field(2), field(3))
            .and_then(|d| d.and_hms_opt(field(4), field(5), 0))
            .ok_or_else(|| Error::malformed(id, format!("out-of-range date-time '{}'", raw)))?
    } else if let Some(ref raw) = time.date {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .ok_or_else(|| Error::malformed(id, format!("invalid date '{}'", raw)))?
    } else {
        return Err(Error::malformed(id, "time has neither dateTime nor date"));
    };

    // A wall-clock time inside a DST gap moves forward by the gap
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
        .ok_or_else(|| Error::malformed(id, format!("{} does not exist in {}", naive, tz.name())))
}

fn organizer_display(organizer: Option<&RemotePerson>) -> String {
    organizer
        .and_then(|o| o.email.clone())
        .unwrap_or_default()
}

/// Display names in provider order; attendees without one are dropped.
fn attendees_display(attendees: &[RemotePerson]) -> String {
    attendees
        .iter()
        .filter_map(|a| a.display_name.as_deref())
        .filter(|name| !name.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}
