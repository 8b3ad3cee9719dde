use super::*;
use crate::feed::GeoPoint;
use chrono::TimeZone;
use chrono_tz::Europe::Paris;

fn header() -> IcsFeedHeader {
    IcsFeedHeader {
        product_id: "-//SEMINAIRES/LPSM/ICS v1.0//FR".to_string(),
        title: "Séminaire Été".to_string(),
        description: Some("Séminaire de probabilités".to_string()),
        timezone: "Europe/Paris".to_string(),
    }
}

fn item(id: &str) -> IcsFields {
    let start = Paris.with_ymd_and_hms(2024, 3, 14, 10, 30, 0).unwrap();
    IcsFields {
        uid: format!("1709280000.000000-EVENT#{}-@LPSM", id),
        summary: Some("Marches aleatoires".to_string()),
        description: Some("Expose".to_string()),
        dtstart: start,
        dtend: Paris.with_ymd_and_hms(2024, 3, 14, 11, 30, 0).unwrap(),
        transp: None,
        location: Some("Jussieu".to_string()),
        geo: None,
        url: Some("https://example.org/evt".to_string()),
        organizer: Some("seminaire@lpsm.paris".to_string()),
        attendee: Some("Alice Bob".to_string()),
        status: Some("CONFIRMED".to_string()),
        dtstamp: start,
    }
}

/// Undo RFC 5545 line folding so assertions don't depend on line width.
fn unfold(ics: &str) -> String {
    ics.replace("\r\n ", "").replace("\r\n\t", "")
}

#[test]
fn test_empty_feed_has_header_only() {
    let feed = IcsFeed::new(header());
    assert!(feed.is_empty());

    let ics = unfold(&feed.render().expect("rendering an empty feed"));

    assert!(ics.starts_with("BEGIN:VCALENDAR\r\nVERSION:2.0\r\n"));
    assert!(ics.contains("PRODID:-//SEMINAIRES/LPSM/ICS v1.0//FR\r\n"));
    assert!(ics.contains("CALSCALE:GREGORIAN\r\n"));
    assert!(ics.contains("METHOD:PUBLISH\r\n"));
    assert!(ics.contains("X-WR-CALNAME:Séminaire Été"));
    assert!(ics.contains("X-WR-TIMEZONE:Europe/Paris"));
    assert!(ics.trim_end().ends_with("END:VCALENDAR"));
    assert!(!ics.contains("BEGIN:VEVENT"));
}

#[test]
fn test_header_lines_appear_once() {
    let mut feed = IcsFeed::new(header());
    feed.add_item(item("a"));
    let ics = feed.render().unwrap();

    for prefix in ["VERSION:", "PRODID:", "CALSCALE:"] {
        let count = ics.lines().filter(|l| l.starts_with(prefix)).count();
        assert_eq!(count, 1, "{} appears {} times:\n{}", prefix, count, ics);
    }
}

#[test]
fn test_event_fields() {
    let mut feed = IcsFeed::new(header());
    feed.add_item(item("evt1"));
    let ics = unfold(&feed.render().unwrap());

    assert!(ics.contains("UID:1709280000.000000-EVENT#evt1-@LPSM"));
    assert!(ics.contains("SUMMARY:Marches aleatoires"));
    assert!(ics.contains("DESCRIPTION:Expose"));
    assert!(ics.contains("LOCATION:Jussieu"));
    assert!(ics.contains("DTSTART;TZID=Europe/Paris:20240314T103000"));
    assert!(ics.contains("DTEND;TZID=Europe/Paris:20240314T113000"));
    // 10:30 CET is 09:30 UTC
    assert!(ics.contains("DTSTAMP:20240314T093000Z"));
    assert!(ics.contains("URL:https://example.org/evt"));
    assert!(ics.contains("ORGANIZER:mailto:seminaire@lpsm.paris"));
    assert!(ics.contains("ATTENDEE:Alice Bob"));
    assert!(ics.contains("STATUS:CONFIRMED"));
    assert!(!ics.contains("TRANSP:"));
    assert!(!ics.contains("GEO:"));
}

#[test]
fn test_absent_fields_are_not_emitted() {
    let mut sparse = item("sparse");
    sparse.description = None;
    sparse.location = None;
    sparse.organizer = None;
    sparse.attendee = None;
    sparse.url = None;

    let mut feed = IcsFeed::new(header());
    feed.add_item(sparse);
    let ics = unfold(&feed.render().unwrap());

    assert!(!ics.contains("DESCRIPTION:"));
    assert!(!ics.contains("LOCATION:"));
    assert!(!ics.contains("ORGANIZER"));
    assert!(!ics.contains("ATTENDEE"));
    assert!(!ics.contains("URL:"));
    assert!(!ics.contains("None"));
}

#[test]
fn test_optional_transp_and_geo() {
    let mut full = item("geo");
    full.transp = Some("TRANSPARENT".to_string());
    full.geo = Some(GeoPoint {
        latitude: 48.8466,
        longitude: 2.3564,
    });

    let mut feed = IcsFeed::new(header());
    feed.add_item(full);
    let ics = unfold(&feed.render().unwrap());

    assert!(ics.contains("TRANSP:TRANSPARENT"));
    assert!(ics.contains("GEO:48.8466;2.3564"));
}

#[test]
fn test_one_vevent_per_item() {
    let mut feed = IcsFeed::new(header());
    for id in ["a", "b", "c"] {
        feed.add_item(item(id));
    }
    assert_eq!(feed.len(), 3);

    let ics = feed.render().unwrap();
    assert_eq!(ics.lines().filter(|l| *l == "BEGIN:VEVENT").count(), 3);
    assert_eq!(ics.lines().filter(|l| *l == "END:VEVENT").count(), 3);
}

#[test]
fn test_no_calendar_description() {
    let mut h = header();
    h.description = None;
    let ics = IcsFeed::new(h).render().unwrap();
    assert!(!ics.contains("X-WR-CALDESC"));
}

#[test]
fn test_write_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("feed.ics");

    let mut feed = IcsFeed::new(header());
    feed.add_item(item("evt1"));
    feed.write_to(&path).unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    assert_eq!(written, feed.render().unwrap());
}

#[test]
fn test_rewrite_header_rejects_garbage() {
    let err = rewrite_header("not a calendar", "-//X//Y//FR").unwrap_err();
    assert!(matches!(err, Error::IcsGeneration(_)));
}
