//! Projections of a [`CanonicalEvent`] onto the two published feed shapes.

use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;

use crate::CanonicalEvent;

/// Latitude / longitude pair for the ICS `GEO` property.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Field set of one `VEVENT`. `None` means the property is not emitted.
#[derive(Debug, Clone, PartialEq)]
pub struct IcsFields {
    pub uid: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub dtstart: DateTime<Tz>,
    pub dtend: DateTime<Tz>,
    pub transp: Option<String>,
    pub location: Option<String>,
    pub geo: Option<GeoPoint>,
    pub url: Option<String>,
    pub organizer: Option<String>,
    pub attendee: Option<String>,
    pub status: Option<String>,
    pub dtstamp: DateTime<Tz>,
}

/// `startDate` / `endDate` of a JSON record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonDate {
    /// `YYYYMMDD`
    pub date: String,
    /// `HH:MM:SS`
    pub time: String,
    pub tz: String,
}

/// The single synthetic chair of a record. `id` is always 1: attendees are
/// aggregated into `full_name` rather than listed one by one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Chair {
    pub id: u32,
    pub full_name: String,
    pub affiliation: String,
}

/// One entry of the JSON feed `results` array. Field order is the
/// serialized key order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonRecord {
    pub id: String,
    pub start_date: JsonDate,
    pub end_date: JsonDate,
    pub description: String,
    pub chairs: Chair,
    pub url: String,
    pub location: String,
    pub timezone: String,
}

pub fn to_ics_fields(event: &CanonicalEvent) -> IcsFields {
    IcsFields {
        uid: event.unique_key.clone(),
        summary: present(&event.summary),
        description: event.description.clone(),
        dtstart: event.start,
        dtend: event.end,
        transp: event.transparency.clone(),
        location: event.location.clone(),
        geo: None,
        url: present(&event.public_url),
        organizer: present(&event.organizer_display),
        attendee: present(&event.attendees_display),
        status: present(&event.status),
        dtstamp: event.start,
    }
}

pub fn to_json_record(event: &CanonicalEvent) -> JsonRecord {
    let tz = event.start.timezone().name().to_string();

    JsonRecord {
        id: event.id.clone(),
        start_date: json_date(&event.start),
        end_date: json_date(&event.end),
        description: event.description.clone().unwrap_or_default(),
        chairs: Chair {
            id: 1,
            full_name: event.attendees_display.clone(),
            affiliation: event.organizer_display.clone(),
        },
        url: event.public_url.clone(),
        location: event.location.clone().unwrap_or_default(),
        timezone: tz,
    }
}

fn json_date(dt: &DateTime<Tz>) -> JsonDate {
    JsonDate {
        date: dt.format("%Y%m%d").to_string(),
        time: dt.format("%H:%M:%S").to_string(),
        tz: dt.timezone().name().to_string(),
    }
}

fn present(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
