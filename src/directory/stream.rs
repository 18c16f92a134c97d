//! Lazy paginated user stream.
//!
//! Pages are fetched on demand, in order, from page 0 until the first empty
//! page. The stream is not resumable: a new stream starts again at page 0.

use std::collections::VecDeque;
use std::time::Duration;

use tracing::info;

use super::{UserDirectory, UserRecord};
use crate::auth::{BearerToken, TokenProvider};
use crate::error::SourceError;

/// Lower bound on the pause between page requests.
pub const MIN_PAGE_DELAY: Duration = Duration::from_millis(100);

/// Pagination parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSettings {
    pub page_size: u32,
    pub page_delay: Duration,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            page_size: 50,
            page_delay: MIN_PAGE_DELAY,
        }
    }
}

/// Produces users one at a time, fetching a page whenever the buffer runs dry.
pub struct UserStream<'a, D: ?Sized, T: ?Sized> {
    directory: &'a D,
    tokens: &'a T,
    token: Option<BearerToken>,
    query: String,
    settings: SourceSettings,
    next_page: u32,
    buffer: VecDeque<UserRecord>,
    total_fetched: u64,
    exhausted: bool,
}

impl<'a, D, T> UserStream<'a, D, T>
where
    D: UserDirectory + ?Sized,
    T: TokenProvider + ?Sized,
{
    /// Create a stream. Without a `token`, one is acquired before the first page.
    pub fn new(
        directory: &'a D,
        tokens: &'a T,
        token: Option<BearerToken>,
        query: String,
        settings: SourceSettings,
    ) -> Self {
        Self {
            directory,
            tokens,
            token,
            query,
            settings,
            next_page: 0,
            buffer: VecDeque::new(),
            total_fetched: 0,
            exhausted: false,
        }
    }

    /// Next user, or `None` once an empty page has been seen.
    ///
    /// Any failed page request is fatal; users already yielded are not re-sent.
    pub async fn next_user(&mut self) -> Result<Option<UserRecord>, SourceError> {
        loop {
            if let Some(user) = self.buffer.pop_front() {
                return Ok(Some(user));
            }
            if self.exhausted {
                return Ok(None);
            }
            self.fetch_next_page().await?;
        }
    }

    /// Users received so far. Final once the stream is exhausted.
    pub fn total_fetched(&self) -> u64 {
        self.total_fetched
    }

    async fn fetch_next_page(&mut self) -> Result<(), SourceError> {
        let page = self.next_page;

        if page > 0 {
            tokio::time::sleep(self.settings.page_delay.max(MIN_PAGE_DELAY)).await;
        }

        let token = match self.token.take() {
            Some(token) => token,
            None => self.tokens.acquire_token().await?,
        };

        let result = self
            .directory
            .search_users(&token, &self.query, page, self.settings.page_size)
            .await;
        self.token = Some(token);
        let result = result?;

        if page == 0 {
            if let Some(total) = result.total {
                info!("Directory reports {} matching users", total);
            }
        }

        let count = result.users.len();
        info!("Fetched page {}: {} users", page, count);

        self.total_fetched += count as u64;
        self.next_page += 1;

        if count == 0 {
            self.exhausted = true;
            info!("Total users fetched: {}", self.total_fetched);
        } else {
            self.buffer.extend(result.users);
        }

        Ok(())
    }
}
