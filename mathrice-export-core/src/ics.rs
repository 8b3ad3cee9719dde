use std::path::Path;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use icalendar::{Calendar, Component, EventLike, Property};

use crate::{Error, Result, feed::IcsFields};

/// Calendar-level properties of one published ICS document.
#[derive(Debug, Clone)]
pub struct IcsFeedHeader {
    pub product_id: String,
    pub title: String,
    pub description: Option<String>,
    pub timezone: String,
}

/// Calendar feed: accumulates every event of a calendar, then serializes once.
#[derive(Debug, Clone)]
pub struct IcsFeed {
    header: IcsFeedHeader,
    items: Vec<IcsFields>,
}

impl IcsFeed {
    pub fn new(header: IcsFeedHeader) -> Self {
        Self {
            header,
            items: Vec::new(),
        }
    }

    pub fn add_item(&mut self, item: IcsFields) {
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Serialize the whole document.
    pub fn render(&self) -> Result<String> {
        let mut cal = Calendar::new();
        cal.append_property(Property::new("METHOD", "PUBLISH"));
        cal.append_property(Property::new("X-WR-CALNAME", &self.header.title));
        if let Some(ref desc) = self.header.description {
            cal.append_property(Property::new("X-WR-CALDESC", desc));
        }
        cal.append_property(Property::new("X-WR-TIMEZONE", &self.header.timezone));

        for item in &self.items {
            cal.push(build_event(item));
        }
        let cal = cal.done();

        rewrite_header(&cal.to_string(), &self.header.product_id)
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        let content = self.render()?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

fn build_event(item: &IcsFields) -> icalendar::Event {
    let mut ics_event = icalendar::Event::new();
    ics_event.uid(&item.uid);

    // DTSTAMP must be UTC
    ics_event.add_property("DTSTAMP", format_utc(&item.dtstamp));
    add_zoned_datetime(&mut ics_event, "DTSTART", &item.dtstart);
    add_zoned_datetime(&mut ics_event, "DTEND", &item.dtend);

    if let Some(ref summary) = item.summary {
        ics_event.summary(summary);
    }
    if let Some(ref desc) = item.description {
        ics_event.description(desc);
    }
    if let Some(ref transp) = item.transp {
        ics_event.add_property("TRANSP", transp);
    }
    if let Some(ref loc) = item.location {
        ics_event.location(loc);
    }
    if let Some(geo) = item.geo {
        ics_event.add_property("GEO", format!("{};{}", geo.latitude, geo.longitude));
    }
    if let Some(ref url) = item.url {
        ics_event.add_property("URL", url);
    }
    if let Some(ref org) = item.organizer {
        ics_event.append_property(Property::new("ORGANIZER", format!("mailto:{}", org)));
    }
    if let Some(ref attendee) = item.attendee {
        ics_event.add_property("ATTENDEE", attendee);
    }
    if let Some(ref status) = item.status {
        ics_event.add_property("STATUS", status);
    }

    ics_event.done()
}

fn add_zoned_datetime(ics_event: &mut icalendar::Event, name: &str, dt: &DateTime<Tz>) {
    let mut prop = Property::new(name, dt.format("%Y%m%dT%H%M%S").to_string());
    prop.add_parameter("TZID", dt.timezone().name());
    ics_event.append_property(prop);
}

fn format_utc(dt: &DateTime<Tz>) -> String {
    dt.with_timezone(&Utc).format("%Y%m%dT%H%M%SZ").to_string()
}

/// Replace the library's own VERSION/PRODID/CALSCALE lines with ours,
/// right after `BEGIN:VCALENDAR`.
fn rewrite_header(ics: &str, product_id: &str) -> Result<String> {
    let mut lines = ics.lines();
    if lines.next() != Some("BEGIN:VCALENDAR") {
        return Err(Error::IcsGeneration(
            "document does not start with BEGIN:VCALENDAR".to_string(),
        ));
    }

    let mut result = String::with_capacity(ics.len() + product_id.len());
    result.push_str("BEGIN:VCALENDAR\r\n");
    result.push_str("VERSION:2.0\r\n");
    result.push_str(&format!("PRODID:{}\r\n", product_id));
    result.push_str("CALSCALE:GREGORIAN\r\n");

    let mut in_component = false;
    for line in lines {
        if line.starts_with("BEGIN:") {
            in_component = true;
        }
        if !in_component
            && (line.starts_with("VERSION:")
                || line.starts_with("PRODID:")
                || line.starts_with("CALSCALE:"))
        {
            continue;
        }
        result.push_str(line);
        result.push_str("\r\n");
    }

    Ok(result)
}

#[cfg(test)]
mod tests;
