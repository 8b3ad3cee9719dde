use async_trait::async_trait;
use chrono::Utc;
use reqwest::{RequestBuilder, StatusCode, Url};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::sync::Mutex;

use crate::{
    Error, RemoteCalendar, RemoteEvent, Result,
    providers::{
        BaseProvider, BaseProviderBuilder, CalendarSource, Page, ProviderInfo, collect_pages,
        service_account::{AccessToken, CALENDAR_SCOPE, ServiceAccountAuth, ServiceAccountKey},
    },
};

const API_ROOT: &str = "https://www.googleapis.com/calendar/v3";

/// Listing envelope shared by `calendarList.list` and `events.list`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    #[serde(default)]
    next_page_token: Option<String>,
}

impl<T> From<ListResponse<T>> for Page<T> {
    fn from(list: ListResponse<T>) -> Self {
        Page {
            items: list.items,
            next_page_token: list.next_page_token,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewCalendar<'a> {
    summary: &'a str,
    time_zone: &'a str,
}

/// Google Calendar v3 over REST, authenticated as a service account.
pub struct GoogleCalendarProvider {
    base: BaseProvider,
    auth: ServiceAccountAuth,
    api_root: String,
    token: Mutex<Option<AccessToken>>,
}

impl GoogleCalendarProvider {
    pub fn new(key: ServiceAccountKey, timeout_secs: u64) -> Result<Self> {
        let base = BaseProviderBuilder::new_with_timeout(
            ProviderInfo {
                name: "google".to_string(),
            },
            timeout_secs,
        )
        .build()?;

        Ok(Self {
            base,
            auth: ServiceAccountAuth::new(key, &[CALENDAR_SCOPE])?,
            api_root: API_ROOT.to_string(),
            token: Mutex::new(None),
        })
    }

    pub fn client_email(&self) -> &str {
        self.auth.client_email()
    }

    /// Cached bearer token, refreshed shortly before it expires.
    async fn bearer(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Utc::now())) {
            return Ok(token.token.clone());
        }

        let token = self.auth.fetch_token(&self.base.client).await?;
        tracing::debug!("Access token valid until {}", token.expires_at);
        let bearer = token.token.clone();
        *cached = Some(token);
        Ok(bearer)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.api_root)
            .map_err(|e| Error::Config(format!("Invalid API root {}: {}", self.api_root, e)))?;
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("Invalid API root {}", self.api_root)))?
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response> {
        let response = request
            .bearer_auth(self.bearer().await?)
            .send()
            .await
            .map_err(|e| self.base.handle_error_req(e))?;
        self.base.check_status(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        tracing::debug!("GET {}", url);
        let response = self.send(self.base.client.get(url)).await?;
        response.json().await.map_err(|e| {
            tracing::error!("Failed to parse {} response: {}", self.base.info.name, e);
            self.base.custom_error(format!("Invalid response: {}", e))
        })
    }

    async fn list_page<T: DeserializeOwned>(
        &self,
        mut url: Url,
        page_token: Option<String>,
    ) -> Result<Page<T>> {
        if let Some(token) = page_token {
            url.query_pairs_mut().append_pair("pageToken", &token);
        }
        let list: ListResponse<T> = self.get_json(url).await?;
        Ok(list.into())
    }

    pub async fn create_calendar(&self, summary: &str, time_zone: &str) -> Result<RemoteCalendar> {
        tracing::info!("Creating calendar '{}' ({})", summary, time_zone);
        let url = self.endpoint(&["calendars"])?;
        let body = NewCalendar { summary, time_zone };
        let response = self.send(self.base.client.post(url).json(&body)).await?;
        Ok(response.json().await?)
    }

    pub async fn insert_event(
        &self,
        calendar_id: &str,
        event: &serde_json::Value,
    ) -> Result<RemoteEvent> {
        tracing::info!("Inserting event into {}", calendar_id);
        let url = self.endpoint(&["calendars", calendar_id, "events"])?;
        let response = self.send(self.base.client.post(url).json(event)).await?;
        Ok(response.json().await?)
    }

    /// Deleting an already deleted event is not an error.
    pub async fn delete_event(&self, calendar_id: &str, event_id: &str) -> Result<()> {
        tracing::info!("Deleting event {} from {}", event_id, calendar_id);
        let url = self.endpoint(&["calendars", calendar_id, "events", event_id])?;
        let response = self
            .base
            .client
            .delete(url)
            .bearer_auth(self.bearer().await?)
            .send()
            .await
            .map_err(|e| self.base.handle_error_req(e))?;

        if response.status() == StatusCode::GONE {
            tracing::debug!("Event {} was already deleted", event_id);
            return Ok(());
        }
        self.base.check_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl CalendarSource for GoogleCalendarProvider {
    fn name(&self) -> &str {
        &self.base.info.name
    }

    async fn list_calendars(&self) -> Result<Vec<RemoteCalendar>> {
        let url = self.endpoint(&["users", "me", "calendarList"])?;
        collect_pages(self.name(), |token| self.list_page(url.clone(), token)).await
    }

    async fn list_events(&self, calendar_id: &str) -> Result<Vec<RemoteEvent>> {
        let url = self.endpoint(&["calendars", calendar_id, "events"])?;
        collect_pages(self.name(), |token| self.list_page(url.clone(), token)).await
    }
}
