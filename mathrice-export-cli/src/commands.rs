use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result, anyhow, bail};
use chrono_tz::Tz;
use mathrice_export_core::{
    prelude::*,
    providers::{google::GoogleCalendarProvider, service_account::ServiceAccountKey},
};

pub const DEFAULT_LAB: &str = "LPSM";
pub const DEFAULT_TIMEZONE: &str = "Europe/Paris";
pub const DEFAULT_OUTPUT_DIR: &str = "export";

/// Export command parameters
pub struct ExportParams {
    pub key_file: PathBuf,
    pub lab: String,
    pub timezone: String,
    pub output_dir: PathBuf,
    pub retries: u32,
    pub timeout: u64,
    pub fail_fast: bool,
}

fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|e| anyhow!("Unknown time zone '{}': {}", name, e))
}

fn connect(key_file: &Path, timeout: u64) -> Result<GoogleCalendarProvider> {
    let key = ServiceAccountKey::from_file(key_file)?;
    let provider = GoogleCalendarProvider::new(key, timeout)?;
    tracing::debug!("Authenticating as {}", provider.client_email());
    Ok(provider)
}

/// Export every visible calendar to ICS and JSON
pub async fn export_command(params: ExportParams) -> Result<()> {
    let options = ExportOptions {
        lab_name: params.lab,
        timezone: parse_timezone(&params.timezone)?,
        output_dir: params.output_dir,
        fail_fast: params.fail_fast,
    };

    tracing::info!(
        "Starting export: lab={}, timezone={}, output={}",
        options.lab_name,
        options.timezone,
        options.output_dir.display()
    );

    let provider = connect(&params.key_file, params.timeout)?;
    let policy = if params.fail_fast {
        RetryPolicy::none()
    } else {
        RetryPolicy::new(params.retries, Duration::from_millis(500))
    };
    let exporter = Exporter::new(RetryingSource::new(provider, policy), options);

    let summary = exporter.run().await?;
    for (title, error) in &summary.failed {
        eprintln!("Echec de l'export de '{}': {}", title, error);
    }

    if !summary.is_success() {
        bail!(
            "{} of {} calendars failed to export",
            summary.failed.len(),
            summary.failed.len() + summary.exported.len()
        );
    }
    Ok(())
}

/// List the calendars visible to the service account
pub async fn calendars_command(key_file: PathBuf, timeout: u64) -> Result<()> {
    let provider = connect(&key_file, timeout)?;
    let calendars = RetryingSource::new(provider, RetryPolicy::default())
        .list_calendars()
        .await?;

    println!("Calendriers ({}):", calendars.len());
    if calendars.is_empty() {
        println!("  aucun calendrier visible");
    }
    for calendar in calendars {
        println!("  {} - {}", calendar.id, calendar.summary);
        if let Some(tz) = calendar.time_zone {
            println!("    fuseau: {}", tz);
        }
    }
    Ok(())
}

pub async fn create_calendar_command(
    key_file: PathBuf,
    timeout: u64,
    summary: String,
    timezone: String,
) -> Result<()> {
    parse_timezone(&timezone)?;
    let provider = connect(&key_file, timeout)?;
    let calendar = provider.create_calendar(&summary, &timezone).await?;

    println!("Calendrier '{}' cree: {}", calendar.summary, calendar.id);
    Ok(())
}

/// Insert an event whose provider JSON body is read from a file
pub async fn create_event_command(
    key_file: PathBuf,
    timeout: u64,
    calendar_id: String,
    file: PathBuf,
) -> Result<()> {
    let content = fs::read_to_string(&file)
        .with_context(|| format!("Failed to read event file {}", file.display()))?;
    let body: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Invalid event JSON in {}", file.display()))?;

    let provider = connect(&key_file, timeout)?;
    let event = provider.insert_event(&calendar_id, &body).await?;

    println!("Evenement cree: {}", event.id);
    if let Some(link) = event.html_link {
        println!("  {}", link);
    }
    Ok(())
}

pub async fn delete_event_command(
    key_file: PathBuf,
    timeout: u64,
    calendar_id: String,
    event_id: String,
) -> Result<()> {
    let provider = connect(&key_file, timeout)?;
    provider.delete_event(&calendar_id, &event_id).await?;

    println!("Evenement {} supprime", event_id);
    Ok(())
}
