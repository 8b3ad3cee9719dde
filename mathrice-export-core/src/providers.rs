pub mod base;
pub mod google;
pub mod service_account;

use std::{future::Future, time::Duration};

use async_trait::async_trait;

use crate::{Error, RemoteCalendar, RemoteEvent, Result};

pub use base::*;

/// Stop following continuation tokens after this many pages.
pub const MAX_PAGES: usize = 1000;

/// Remote calendar provider, read side.
#[async_trait]
pub trait CalendarSource: Send + Sync {
    /// Provider name
    fn name(&self) -> &str;

    /// Every calendar visible to the credential, in provider order.
    async fn list_calendars(&self) -> Result<Vec<RemoteCalendar>>;

    /// Every event of a calendar, in provider order, all pages concatenated.
    async fn list_events(&self, calendar_id: &str) -> Result<Vec<RemoteEvent>>;
}

/// One page of a paginated listing.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page_token: Option<String>,
}

/// Fetch pages until the continuation token is absent or empty.
///
/// `fetch` receives `None` for the first page and the previous page's token
/// afterwards.
pub async fn collect_pages<T, F, Fut>(provider: &str, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut items = Vec::new();
    let mut token: Option<String> = None;

    for page_no in 1..=MAX_PAGES {
        let page = fetch(token.take()).await?;
        tracing::debug!(
            "{}: page {} returned {} items",
            provider,
            page_no,
            page.items.len()
        );
        items.extend(page.items);

        match page.next_page_token {
            Some(next) if !next.is_empty() => token = Some(next),
            _ => return Ok(items),
        }
    }

    Err(Error::Provider {
        provider: provider.to_string(),
        message: format!("pagination did not terminate after {} pages", MAX_PAGES),
    })
}

/// Bounded retry with exponential backoff for transient failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, the first one included
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Single attempt, legacy behaviour.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }

    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        "{} failed (attempt {}/{}): {}, retrying in {:?}",
                        what,
                        attempt,
                        self.max_attempts,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500))
    }
}

/// Wraps any [`CalendarSource`] with a [`RetryPolicy`].
pub struct RetryingSource<S: CalendarSource> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: CalendarSource> RetryingSource<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: CalendarSource> CalendarSource for RetryingSource<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn list_calendars(&self) -> Result<Vec<RemoteCalendar>> {
        self.policy
            .run("list calendars", || self.inner.list_calendars())
            .await
    }

    async fn list_events(&self, calendar_id: &str) -> Result<Vec<RemoteEvent>> {
        let what = format!("list events of {}", calendar_id);
        self.policy
            .run(&what, || self.inner.list_events(calendar_id))
            .await
    }
}
