//! Paginated incremental loading.
//!
//! [`PaginatedFeedController`] owns one paged list of items and is the only
//! thing allowed to mutate it. Fetches run as tokio tasks; each one is tagged
//! with a [`FetchHandle`] and its result comes back as a [`FetchCompletion`]
//! through a caller-supplied sink. The owner feeds completions back into
//! [`PaginatedFeedController::apply`] from its own (single) update loop, and
//! the controller drops any completion whose handle is not the one currently
//! in flight. That handle check is what keeps superseded or cancelled
//! requests from ever touching `items`.

use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::config::FeedConfig;
use crate::error::FetchError;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const DEFAULT_PREFETCH_THRESHOLD: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub query: Option<String>,
    /// 1-based
    pub page: u32,
    pub page_size: u32,
}

/// Coarse state of a feed, as the UI needs to draw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewPhase {
    #[default]
    Idle,
    LoadingInitial,
    Ready,
    LoadingMore,
    Empty,
    Error,
}

/// Which progress indicator the UI should show for the fetch in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadingIndicator {
    #[default]
    None,
    /// Full-screen overlay; only for the first load of a controller
    Blocking,
    /// Lightweight marker for a reload (refresh, new query, retry)
    Refresh,
    /// Row at the bottom of the list while the next page loads
    Footer,
}

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

/// Identifies one issued fetch. Unique for the life of the process, so a
/// completion can never be mistaken for one from a newer controller either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchHandle(u64);

impl FetchHandle {
    fn next() -> Self {
        FetchHandle(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for FetchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct FetchCompletion<T> {
    pub handle: FetchHandle,
    pub request: PageRequest,
    pub outcome: Result<Vec<T>, FetchError>,
}

/// The fetch function a feed is parameterized by.
#[async_trait]
pub trait PageSource<T>: Send + Sync {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<T>, FetchError>;
}

/// Where finished fetches are posted. Must hand the completion back to the
/// thread that owns the controller.
pub type CompletionSink<T> = Arc<dyn Fn(FetchCompletion<T>) + Send + Sync>;

pub type RenderHook<T> = Box<dyn FnMut(&FeedSnapshot<'_, T>) + Send>;

/// Transient, auto-dismissing message for a failed follow-up page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub raised_at: Instant,
}

#[derive(Debug)]
pub struct FeedSnapshot<'a, T> {
    pub items: &'a [T],
    pub phase: ViewPhase,
    pub has_more: bool,
    pub indicator: LoadingIndicator,
    /// Set only in [`ViewPhase::Error`]
    pub error: Option<&'a FetchError>,
    pub notice: Option<&'a Notice>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedOptions {
    pub page_size: u32,
    pub prefetch_threshold: usize,
    pub notice_ttl: Duration,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            prefetch_threshold: DEFAULT_PREFETCH_THRESHOLD,
            notice_ttl: Duration::from_secs(2),
        }
    }
}

impl From<&FeedConfig> for FeedOptions {
    fn from(config: &FeedConfig) -> Self {
        Self {
            page_size: config.page_size.max(1),
            prefetch_threshold: config.prefetch_threshold,
            notice_ttl: config.notice_ttl(),
        }
    }
}

/// What a cancelled fetch falls back to
struct Settled {
    phase: ViewPhase,
    page: u32,
    failed: Option<PageRequest>,
}

struct InFlight {
    handle: FetchHandle,
    token: CancellationToken,
    settled: Settled,
}

pub struct PaginatedFeedController<T> {
    source: Arc<dyn PageSource<T>>,
    sink: CompletionSink<T>,
    options: FeedOptions,

    query: Option<String>,
    items: Vec<T>,
    current_page: u32,
    has_more: bool,
    phase: ViewPhase,
    indicator: LoadingIndicator,
    error: Option<FetchError>,
    notice: Option<Notice>,
    failed: Option<PageRequest>,
    in_flight: Option<InFlight>,
    loaded_once: bool,
    disposed: bool,
    render: Option<RenderHook<T>>,
}

impl<T> fmt::Debug for PaginatedFeedController<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaginatedFeedController")
            .field("query", &self.query)
            .field("items", &self.items.len())
            .field("current_page", &self.current_page)
            .field("has_more", &self.has_more)
            .field("phase", &self.phase)
            .field("in_flight", &self.in_flight.as_ref().map(|f| f.handle))
            .finish_non_exhaustive()
    }
}

impl<T: Send + 'static> PaginatedFeedController<T> {
    pub fn new(
        source: Arc<dyn PageSource<T>>,
        sink: CompletionSink<T>,
        options: FeedOptions,
    ) -> Self {
        Self {
            source,
            sink,
            options,
            query: None,
            items: Vec::new(),
            current_page: 1,
            has_more: true,
            phase: ViewPhase::Idle,
            indicator: LoadingIndicator::None,
            error: None,
            notice: None,
            failed: None,
            in_flight: None,
            loaded_once: false,
            disposed: false,
            render: None,
        }
    }

    /// Called with a full snapshot after every state transition.
    pub fn set_render_hook(&mut self, hook: impl FnMut(&FeedSnapshot<'_, T>) + Send + 'static) {
        self.render = Some(Box::new(hook));
    }

    /// Reset and load page 1 of `query`, superseding any fetch in flight.
    pub fn start(&mut self, query: Option<String>) -> Option<FetchHandle> {
        if self.disposed {
            tracing::debug!("start on disposed feed ignored");
            return None;
        }

        let settled = self.supersede();

        self.query = query;
        self.items.clear();
        self.current_page = 1;
        self.has_more = true;
        self.notice = None;
        // A failure from before the reset must not be retried on top of it
        self.failed = None;
        self.phase = ViewPhase::LoadingInitial;
        self.indicator = if self.loaded_once {
            LoadingIndicator::Refresh
        } else {
            LoadingIndicator::Blocking
        };

        let handle = self.issue(1, settled);
        self.emit();
        Some(handle)
    }

    /// Fetch the next page when `visible_index` is within the prefetch
    /// threshold of the end. Cheap no-op otherwise; meant to be called on
    /// every render or selection change.
    pub fn load_next_page_if_needed(&mut self, visible_index: usize) -> Option<FetchHandle> {
        if self.disposed
            || self.is_fetching()
            || !self.has_more
            || self.phase != ViewPhase::Ready
        {
            return None;
        }
        if visible_index + self.options.prefetch_threshold < self.items.len() {
            return None;
        }

        let settled = self.supersede();
        let page = self.current_page + 1;
        self.current_page = page;
        self.phase = ViewPhase::LoadingMore;
        self.indicator = LoadingIndicator::Footer;

        let handle = self.issue(page, settled);
        self.emit();
        Some(handle)
    }

    /// Abandon the fetch in flight and fall back to the phase it started from.
    /// Returns whether there was anything to cancel.
    pub fn cancel(&mut self) -> bool {
        let Some(in_flight) = self.in_flight.take() else {
            return false;
        };
        in_flight.token.cancel();
        tracing::debug!(handle = %in_flight.handle, "fetch cancelled");
        self.settle_cancelled(in_flight);
        self.emit();
        true
    }

    /// Re-issue the most recent failed request. A failed first page reloads
    /// from scratch; a failed later page is retried on top of the items
    /// already shown. Returns `None` when nothing has failed or a fetch is
    /// already in flight.
    pub fn retry(&mut self) -> Option<FetchHandle> {
        if self.disposed || self.is_fetching() {
            return None;
        }
        let failed = self.failed.clone()?;

        if failed.page <= 1 {
            tracing::info!(query = ?failed.query, "retrying first page");
            return self.start(failed.query);
        }

        tracing::info!(page = failed.page, "retrying page");
        let settled = self.supersede();
        self.notice = None;
        self.current_page = failed.page;
        self.phase = ViewPhase::LoadingMore;
        self.indicator = LoadingIndicator::Footer;

        let handle = self.issue(failed.page, settled);
        self.emit();
        Some(handle)
    }

    /// Cancel outstanding work and stop reacting to anything. Idempotent.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.token.cancel();
        }
        self.disposed = true;
        self.render = None;
        self.indicator = LoadingIndicator::None;
    }

    /// Apply a finished fetch. Returns false when the completion is stale
    /// (its handle is not the fetch in flight) and was dropped.
    pub fn apply(&mut self, completion: FetchCompletion<T>) -> bool {
        let is_current = self
            .in_flight
            .as_ref()
            .is_some_and(|f| f.handle == completion.handle);
        if !is_current {
            tracing::debug!(handle = %completion.handle, "dropping stale completion");
            return false;
        }
        let Some(in_flight) = self.in_flight.take() else {
            return false;
        };

        let page = completion.request.page;
        match completion.outcome {
            Ok(batch) => {
                self.has_more = batch.len() == self.options.page_size as usize;
                if page <= 1 {
                    self.items = batch;
                } else {
                    self.items.extend(batch);
                }
                self.error = None;
                self.failed = None;
                self.loaded_once = true;
                self.phase = if page <= 1 && self.items.is_empty() {
                    ViewPhase::Empty
                } else {
                    ViewPhase::Ready
                };
                tracing::debug!(
                    page,
                    total = self.items.len(),
                    has_more = self.has_more,
                    "page applied"
                );
            }
            Err(err) if err.is_cancelled() => {
                self.settle_cancelled(in_flight);
            }
            Err(err) => {
                tracing::warn!(page, error = %err, "page fetch failed");
                self.has_more = false;
                self.failed = Some(completion.request);
                if page <= 1 {
                    self.loaded_once = true;
                    self.error = Some(err);
                    self.phase = ViewPhase::Error;
                } else {
                    self.notice = Some(Notice {
                        message: format!("Failed to load more: {}", err),
                        raised_at: Instant::now(),
                    });
                    self.phase = ViewPhase::Ready;
                }
            }
        }

        self.indicator = LoadingIndicator::None;
        self.emit();
        true
    }

    /// Drop the notice once it has been visible for the configured time.
    pub fn expire_notice(&mut self, now: Instant) -> bool {
        let expired = self
            .notice
            .as_ref()
            .is_some_and(|n| now.saturating_duration_since(n.raised_at) >= self.options.notice_ttl);
        if expired {
            self.notice = None;
            self.emit();
        }
        expired
    }

    pub fn snapshot(&self) -> FeedSnapshot<'_, T> {
        FeedSnapshot {
            items: &self.items,
            phase: self.phase,
            has_more: self.has_more,
            indicator: self.indicator,
            error: self.error(),
            notice: self.notice.as_ref(),
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_some()
    }

    fn error(&self) -> Option<&FetchError> {
        if self.phase == ViewPhase::Error {
            self.error.as_ref()
        } else {
            None
        }
    }

    pub fn can_retry(&self) -> bool {
        self.failed.is_some() && !self.is_fetching()
    }

    /// Cancel whatever is in flight and report the settled state it started
    /// from, so a chain of superseded fetches still unwinds to a non-loading
    /// phase.
    fn supersede(&mut self) -> Settled {
        match self.in_flight.take() {
            Some(previous) => {
                previous.token.cancel();
                tracing::debug!(handle = %previous.handle, "fetch superseded");
                previous.settled
            }
            None => Settled {
                phase: self.phase,
                page: self.current_page,
                failed: self.failed.clone(),
            },
        }
    }

    fn settle_cancelled(&mut self, in_flight: InFlight) {
        let settled = in_flight.settled;
        self.current_page = settled.page;
        // A later page can only be retried on top of the pages before it
        self.failed = settled
            .failed
            .filter(|failed| failed.page <= 1 || !self.items.is_empty());
        self.phase = match settled.phase {
            // The reset already discarded what that phase described
            ViewPhase::Ready | ViewPhase::Empty if self.items.is_empty() => ViewPhase::Idle,
            phase => phase,
        };
        self.indicator = LoadingIndicator::None;
    }

    fn issue(&mut self, page: u32, settled: Settled) -> FetchHandle {
        let handle = FetchHandle::next();
        let token = CancellationToken::new();
        let request = PageRequest {
            query: self.query.clone(),
            page,
            page_size: self.options.page_size,
        };
        tracing::debug!(%handle, page, query = ?request.query, "fetch issued");

        let source = Arc::clone(&self.source);
        let sink = Arc::clone(&self.sink);
        let task_token = token.clone();
        tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = task_token.cancelled() => Err(FetchError::Cancelled),
                result = source.fetch_page(&request) => result,
            };
            sink(FetchCompletion {
                handle,
                request,
                outcome,
            });
        });

        self.in_flight = Some(InFlight {
            handle,
            token,
            settled,
        });
        handle
    }

    fn emit(&mut self) {
        let Some(hook) = self.render.as_mut() else {
            return;
        };
        let error = if self.phase == ViewPhase::Error {
            self.error.as_ref()
        } else {
            None
        };
        let snapshot = FeedSnapshot {
            items: &self.items,
            phase: self.phase,
            has_more: self.has_more,
            indicator: self.indicator,
            error,
            notice: self.notice.as_ref(),
        };
        hook(&snapshot);
    }
}

impl<T> Drop for PaginatedFeedController<T> {
    fn drop(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.token.cancel();
        }
    }
}
