//! Per-calendar export pipeline: fetch, normalize, map, write both feeds.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::{
    Error, ExportOptions, RemoteCalendar, Result,
    feed::{to_ics_fields, to_json_record},
    ics::{IcsFeed, IcsFeedHeader},
    json::{FeedPath, JsonFeed},
    normalize::Normalizer,
    providers::CalendarSource,
};

/// ASCII file stem for a calendar title. Path separators become `-`.
pub fn file_stem(title: &str) -> String {
    deunicode::deunicode(title)
        .chars()
        .map(|c| if c == '/' || c == '\\' { '-' } else { c })
        .collect()
}

/// Outcome of one exported calendar.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarReport {
    pub calendar_id: String,
    pub title: String,
    pub ics_path: PathBuf,
    pub json_path: PathBuf,
    pub events: usize,
    /// Events dropped as malformed
    pub skipped: usize,
}

#[derive(Debug, Default)]
pub struct ExportSummary {
    pub exported: Vec<CalendarReport>,
    /// Calendars that failed, with the error that stopped them
    pub failed: Vec<(String, Error)>,
}

impl ExportSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total_events(&self) -> usize {
        self.exported.iter().map(|r| r.events).sum()
    }
}

pub struct Exporter<S: CalendarSource> {
    source: S,
    options: ExportOptions,
}

impl<S: CalendarSource> Exporter<S> {
    pub fn new(source: S, options: ExportOptions) -> Self {
        Self { source, options }
    }

    /// Export every visible calendar.
    ///
    /// A failing calendar is recorded in the summary and the run moves on,
    /// unless the error is fatal or `fail_fast` is set.
    pub async fn run(&self) -> Result<ExportSummary> {
        let generated_at = Utc::now();
        let calendars = self.source.list_calendars().await?;
        tracing::info!(
            "Found {} calendars via {}",
            calendars.len(),
            self.source.name()
        );

        let mut summary = ExportSummary::default();
        for calendar in &calendars {
            match self.export_calendar(calendar, generated_at).await {
                Ok(report) => summary.exported.push(report),
                Err(e) if e.is_fatal() || self.options.fail_fast => {
                    tracing::error!("Export of '{}' failed: {}", calendar.summary, e);
                    return Err(e);
                }
                Err(e) => {
                    tracing::error!("Export of '{}' failed: {}", calendar.summary, e);
                    summary.failed.push((calendar.summary.clone(), e));
                }
            }
        }

        tracing::info!(
            "Exported {} calendars ({} events), {} failed",
            summary.exported.len(),
            summary.total_events(),
            summary.failed.len()
        );
        Ok(summary)
    }

    pub async fn export_calendar(
        &self,
        calendar: &RemoteCalendar,
        generated_at: DateTime<Utc>,
    ) -> Result<CalendarReport> {
        println!("Calendrier: {}", calendar.summary);
        tracing::info!("Exporting calendar '{}' ({})", calendar.summary, calendar.id);

        let events = self.source.list_events(&calendar.id).await?;
        let normalizer = Normalizer::new(
            self.options.lab_name.as_str(),
            self.options.timezone,
            generated_at,
        );
        let zone = self.options.timezone.name();

        let mut ics = IcsFeed::new(IcsFeedHeader {
            product_id: self.options.product_id(),
            title: calendar.summary.clone(),
            description: calendar.description.clone(),
            timezone: calendar.time_zone.clone().unwrap_or_else(|| zone.to_string()),
        });
        let mut json = JsonFeed::new(FeedPath {
            url: calendar.embed_url(zone),
            name: calendar.summary.clone(),
            id: calendar.id.clone(),
        });

        let mut skipped = 0;
        for event in &events {
            let canonical = match normalizer.normalize(event) {
                Ok(canonical) => canonical,
                Err(e @ Error::MalformedRecord { .. }) => {
                    tracing::warn!("Skipping event in '{}': {}", calendar.summary, e);
                    skipped += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };
            ics.add_item(to_ics_fields(&canonical));
            json.add_record(to_json_record(&canonical));
        }

        let stem = file_stem(&calendar.summary);
        std::fs::create_dir_all(self.options.ics_dir())?;
        std::fs::create_dir_all(self.options.json_dir())?;
        let ics_path = self.options.ics_dir().join(format!("{}.ics", stem));
        let json_path = self.options.json_dir().join(format!("{}.json", stem));

        ics.write_to(&ics_path)?;
        println!("Fichier '{}' genere ({} events).", ics_path.display(), ics.len());
        json.write_to(&json_path)?;
        println!("Fichier '{}' genere ({} events).", json_path.display(), json.count);
        tracing::debug!("Wrote {} and {}", ics_path.display(), json_path.display());

        Ok(CalendarReport {
            calendar_id: calendar.id.clone(),
            title: calendar.summary.clone(),
            ics_path,
            json_path,
            events: ics.len(),
            skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RemoteEvent, RemoteEventTime, RemotePerson};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeSource {
        calendars: Vec<RemoteCalendar>,
        events: HashMap<String, Vec<RemoteEvent>>,
        broken: HashMap<String, fn() -> Error>,
    }

    impl FakeSource {
        fn with_calendar(mut self, id: &str, title: &str, events: Vec<RemoteEvent>) -> Self {
            self.calendars.push(RemoteCalendar {
                id: id.to_string(),
                summary: title.to_string(),
                description: None,
                time_zone: Some("Europe/Paris".to_string()),
            });
            self.events.insert(id.to_string(), events);
            self
        }

        fn broken(mut self, id: &str, title: &str, error: fn() -> Error) -> Self {
            self = self.with_calendar(id, title, Vec::new());
            self.broken.insert(id.to_string(), error);
            self
        }
    }

    #[async_trait]
    impl CalendarSource for FakeSource {
        fn name(&self) -> &str {
            "fake"
        }

        async fn list_calendars(&self) -> Result<Vec<RemoteCalendar>> {
            Ok(self.calendars.clone())
        }

        async fn list_events(&self, calendar_id: &str) -> Result<Vec<RemoteEvent>> {
            if let Some(error) = self.broken.get(calendar_id) {
                return Err(error());
            }
            Ok(self.events.get(calendar_id).cloned().unwrap_or_default())
        }
    }

    fn timed(date_time: &str) -> Option<RemoteEventTime> {
        Some(RemoteEventTime {
            date_time: Some(date_time.to_string()),
            ..Default::default()
        })
    }

    fn event(id: &str) -> RemoteEvent {
        RemoteEvent {
            id: id.to_string(),
            summary: Some("Marches aléatoires".to_string()),
            status: Some("confirmed".to_string()),
            organizer: Some(RemotePerson {
                email: Some("seminaire@lpsm.paris".to_string()),
                display_name: None,
            }),
            attendees: vec![
                RemotePerson {
                    email: Some("alice@lpsm.paris".to_string()),
                    display_name: Some("Alice".to_string()),
                },
                RemotePerson {
                    email: Some("x@y.com".to_string()),
                    display_name: None,
                },
            ],
            start: timed("2024-03-14T10:30:00+01:00"),
            end: timed("2024-03-14T11:30:00+01:00"),
            html_link: Some(format!("https://www.google.com/calendar/event?eid={}", id)),
            ..Default::default()
        }
    }

    fn options(dir: &tempfile::TempDir) -> ExportOptions {
        ExportOptions {
            output_dir: dir.path().join("export"),
            ..Default::default()
        }
    }

    fn generated_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("Séminaire Été"), "Seminaire Ete");
        assert_eq!(file_stem("Probas/Stats"), "Probas-Stats");
        assert_eq!(file_stem("a\\b"), "a-b");
        assert_eq!(file_stem("Groupe de travail"), "Groupe de travail");
    }

    #[tokio::test]
    async fn test_transliterated_paths_keep_accented_name() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSource::default().with_calendar("cal1", "Séminaire Été", vec![event("evt1")]);
        let exporter = Exporter::new(source, options(&dir));

        let summary = exporter.run().await.unwrap();
        assert!(summary.is_success());
        assert_eq!(summary.exported.len(), 1);

        let report = &summary.exported[0];
        assert_eq!(report.events, 1);
        assert_eq!(
            report.ics_path,
            dir.path().join("export/ics/Seminaire Ete.ics")
        );
        assert_eq!(
            report.json_path,
            dir.path().join("export/json/Seminaire Ete.json")
        );

        let json: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&report.json_path).unwrap()).unwrap();
        assert_eq!(json["additionalInfo"]["path"]["name"], "Séminaire Été");
        assert_eq!(json["count"], 1);
        assert_eq!(json["results"][0]["chairs"]["fullName"], "Alice");
        assert_eq!(json["results"][0]["description"], "");

        let ics = std::fs::read_to_string(&report.ics_path).unwrap();
        assert!(ics.contains("X-WR-CALNAME:Séminaire Été"));
        assert_eq!(ics.matches("BEGIN:VEVENT").count(), 1);
    }

    #[tokio::test]
    async fn test_empty_calendar_writes_empty_documents() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSource::default().with_calendar("empty", "Vide", Vec::new());
        let exporter = Exporter::new(source, options(&dir));

        let report = exporter
            .export_calendar(&exporter.source.calendars[0].clone(), generated_at())
            .await
            .unwrap();

        let ics = std::fs::read_to_string(&report.ics_path).unwrap();
        assert!(ics.starts_with("BEGIN:VCALENDAR"));
        assert!(ics.contains("PRODID:-//SEMINAIRES/LPSM/ICS v1.0//FR"));
        assert!(!ics.contains("BEGIN:VEVENT"));

        let json: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&report.json_path).unwrap()).unwrap();
        assert_eq!(json["count"], 0);
        assert_eq!(json["results"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_malformed_event_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut missing_start = event("broken");
        missing_start.start = None;
        let source = FakeSource::default().with_calendar(
            "cal1",
            "Séminaire",
            vec![event("a"), missing_start, event("b")],
        );
        let exporter = Exporter::new(source, options(&dir));

        let summary = exporter.run().await.unwrap();
        let report = &summary.exported[0];
        assert_eq!(report.events, 2);
        assert_eq!(report.skipped, 1);

        let json: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&report.json_path).unwrap()).unwrap();
        assert_eq!(json["results"][0]["id"], "a");
        assert_eq!(json["results"][1]["id"], "b");
    }

    #[tokio::test]
    async fn test_bad_all_day_date_skips_only_that_event() {
        let dir = tempfile::tempdir().unwrap();
        let all_day = |id: &str, date: &str| RemoteEvent {
            start: Some(RemoteEventTime {
                date: Some(date.to_string()),
                ..Default::default()
            }),
            end: Some(RemoteEventTime {
                date: Some(date.to_string()),
                ..Default::default()
            }),
            ..event(id)
        };
        let source = FakeSource::default().with_calendar(
            "cal1",
            "Cal",
            vec![all_day("good", "2024-05-08"), all_day("bad", "2024-5-8x")],
        );
        let exporter = Exporter::new(source, options(&dir));

        let summary = exporter.run().await.unwrap();
        assert!(summary.is_success());
        let report = &summary.exported[0];
        assert_eq!(report.events, 1);
        assert_eq!(report.skipped, 1);

        let json: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&report.json_path).unwrap()).unwrap();
        assert_eq!(json["count"], 1);
        assert_eq!(json["results"][0]["id"], "good");
        assert!(report.ics_path.exists());
    }

    #[tokio::test]
    async fn test_failing_calendar_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSource::default()
            .broken("down", "En panne", || Error::Transient("HTTP 503".to_string()))
            .with_calendar("ok", "Séminaire", vec![event("evt1")]);
        let exporter = Exporter::new(source, options(&dir));

        let summary = exporter.run().await.unwrap();
        assert!(!summary.is_success());
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, "En panne");
        assert_eq!(summary.exported.len(), 1);
        assert_eq!(summary.total_events(), 1);
    }

    #[tokio::test]
    async fn test_fail_fast_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSource::default()
            .broken("down", "En panne", || Error::Transient("HTTP 503".to_string()))
            .with_calendar("ok", "Séminaire", vec![event("evt1")]);
        let exporter = Exporter::new(
            source,
            ExportOptions {
                fail_fast: true,
                ..options(&dir)
            },
        );

        assert!(matches!(exporter.run().await, Err(Error::Transient(_))));
        assert!(!dir.path().join("export/json/Seminaire.json").exists());
    }

    #[tokio::test]
    async fn test_auth_error_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSource::default()
            .broken("revoked", "Révoqué", || Error::Authentication("HTTP 401".to_string()))
            .with_calendar("ok", "Séminaire", vec![event("evt1")]);
        let exporter = Exporter::new(source, options(&dir));

        assert!(matches!(exporter.run().await, Err(Error::Authentication(_))));
    }

    #[tokio::test]
    async fn test_rerun_overwrites_files() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSource::default().with_calendar("cal1", "Séminaire", vec![event("a"), event("b")]);
        let exporter = Exporter::new(source, options(&dir));
        exporter.run().await.unwrap();

        let exporter = Exporter::new(
            FakeSource::default().with_calendar("cal1", "Séminaire", vec![event("a")]),
            options(&dir),
        );
        let summary = exporter.run().await.unwrap();

        let json: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&summary.exported[0].json_path).unwrap()).unwrap();
        assert_eq!(json["count"], 1);
    }
}
