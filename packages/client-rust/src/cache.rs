//! Virtualized row cache.
//!
//! [`RowCache`] maps absolute row positions to fetched rows for exactly one
//! query key `(resource, search, sort)`. It performs no I/O: callers ask it
//! for the next [`FetchRequest`], run the fetch, and hand the result back
//! through [`RowCache::complete`]. Every request carries a [`FetchTicket`]
//! so responses for a superseded key are discarded instead of applied.

use std::collections::BTreeMap;
use std::ops::Range;

use lcadash_core::{Page, QueryDescriptor, QueryKey, Row, SearchSpec, SortSpec};
use tracing::{debug, warn};

use crate::{FetchError, RowCacheConfig};

/// Whether a fetch is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Idle,
    Loading,
}

/// Rows the view currently wants to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Window {
    pub skip: u64,
    pub take: u64,
}

impl Window {
    fn end(self) -> u64 {
        self.skip.saturating_add(self.take)
    }
}

/// One position of the visible window.
#[derive(Debug, Clone, PartialEq)]
pub enum RowSlot {
    Loaded(Row),
    /// Placeholder for a row that has not arrived yet.
    NotLoaded,
}

impl RowSlot {
    #[must_use]
    pub fn row(&self) -> Option<&Row> {
        match self {
            Self::Loaded(row) => Some(row),
            Self::NotLoaded => None,
        }
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }
}

/// Identifies one issued fetch: the key active at send time and the span
/// of rows requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    key: QueryKey,
    generation: u64,
    skip: u64,
    take: u64,
}

impl FetchTicket {
    #[must_use]
    pub fn key(&self) -> &QueryKey {
        &self.key
    }
}

/// A fetch the caller should perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub ticket: FetchTicket,
    pub descriptor: QueryDescriptor,
}

/// Result of handing a response back to the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Rows stored; `rows` counts those inside the ceiling.
    Applied { rows: usize },
    /// The response belonged to a superseded query key and was ignored.
    StaleResponseDiscarded,
    /// The fetch failed; cached rows are unchanged.
    Failed(FetchError),
}

/// Sparse row cache for one list view.
///
/// At most one fetch is in flight at a time. A window requested while
/// loading is fetched after the current response arrives; a search, sort
/// or resource change supersedes the in-flight fetch immediately.
#[derive(Debug)]
pub struct RowCache {
    config: RowCacheConfig,
    resource: String,
    search_term: String,
    search_columns: Vec<String>,
    sort: Option<SortSpec>,
    window: Window,
    rows: BTreeMap<u64, Row>,
    /// Total reported for the current key, before the ceiling.
    total: Option<u64>,
    state: CacheState,
    dirty: bool,
    in_flight: Option<FetchTicket>,
    last_issued: Option<QueryKey>,
    generation: u64,
}

impl RowCache {
    /// Creates an empty cache whose window is the first page of `resource`.
    #[must_use]
    pub fn new(resource: impl Into<String>, config: RowCacheConfig) -> Self {
        let take = config.page_size;
        Self {
            config,
            resource: resource.into(),
            search_term: String::new(),
            search_columns: Vec::new(),
            sort: None,
            window: Window { skip: 0, take },
            rows: BTreeMap::new(),
            total: None,
            state: CacheState::Idle,
            dirty: true,
            in_flight: None,
            last_issued: None,
            generation: 0,
        }
    }

    /// Restricts searches to `columns`. Empty means the server's defaults.
    #[must_use]
    pub fn with_search_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn config(&self) -> &RowCacheConfig {
        &self.config
    }

    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    #[must_use]
    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    #[must_use]
    pub fn sort(&self) -> Option<&SortSpec> {
        self.sort.as_ref()
    }

    #[must_use]
    pub fn window(&self) -> Window {
        self.window
    }

    #[must_use]
    pub fn state(&self) -> CacheState {
        self.state
    }

    /// Whether the current window still needs a fetch.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Number of rows held for the current key.
    #[must_use]
    pub fn cached_rows(&self) -> usize {
        self.rows.len()
    }

    /// The key rows are currently cached under.
    #[must_use]
    pub fn query_key(&self) -> QueryKey {
        let search = (!self.search_term.is_empty()).then(|| {
            SearchSpec::new(self.search_term.clone(), self.search_columns.iter().cloned())
        });
        QueryKey {
            resource: self.resource.clone(),
            search,
            sort: self.sort.clone(),
        }
    }

    /// Total matching rows, clamped to the ceiling. `None` until known.
    #[must_use]
    pub fn total_count(&self) -> Option<u64> {
        self.total.map(|total| total.min(self.config.max_rows))
    }

    // -----------------------------------------------------------------------
    // View events
    // -----------------------------------------------------------------------

    /// Records the window the view wants. Returns whether it needs a fetch.
    ///
    /// Windows are clamped to the ceiling.
    pub fn request_window(&mut self, skip: u64, take: u64) -> bool {
        let skip = skip.min(self.config.max_rows);
        let take = take.min(self.config.max_rows - skip);
        self.window = Window { skip, take };

        let needed = !self.is_window_cached();
        if needed {
            self.dirty = true;
        }
        needed
    }

    /// Applies a (debounced) search term: clears the cache and scrolls to
    /// the top. An unchanged term is ignored.
    pub fn on_search_change(&mut self, term: impl Into<String>) {
        let term = term.into();
        if term == self.search_term {
            return;
        }
        self.search_term = term;
        self.window.skip = 0;
        self.invalidate();
    }

    /// Applies a sort change: clears the cache and keeps the scroll offset.
    /// An unchanged sort is ignored.
    pub fn on_sort_change(&mut self, sort: Option<SortSpec>) {
        if sort == self.sort {
            return;
        }
        self.sort = sort;
        self.invalidate();
    }

    /// Points the cache at another resource, resetting sort, search columns
    /// and scroll offset. The search term is kept.
    pub fn switch_resource(&mut self, resource: impl Into<String>) {
        self.resource = resource.into();
        self.search_columns.clear();
        self.sort = None;
        self.window.skip = 0;
        self.invalidate();
    }

    fn invalidate(&mut self) {
        debug!(
            resource = %self.resource,
            discarded = self.rows.len(),
            "row cache invalidated"
        );
        self.rows.clear();
        self.total = None;
        self.state = CacheState::Idle;
        self.in_flight = None;
        self.dirty = true;
        self.generation += 1;
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    fn visible_range(&self) -> Range<u64> {
        let end = match self.total_count() {
            Some(total) => self.window.end().min(total),
            None => self.window.end(),
        };
        self.window.skip..end.max(self.window.skip)
    }

    /// Whether every row of the window (up to the known total) is cached
    /// and the last issued fetch was for the current key.
    #[must_use]
    pub fn is_window_cached(&self) -> bool {
        if self.total.is_none() || self.last_issued.as_ref() != Some(&self.query_key()) {
            return false;
        }
        self.visible_range().all(|pos| self.rows.contains_key(&pos))
    }

    /// The current window with placeholders for rows not loaded yet.
    #[must_use]
    pub fn visible_rows(&self) -> Vec<RowSlot> {
        self.visible_range()
            .map(|pos| {
                self.rows
                    .get(&pos)
                    .cloned()
                    .map_or(RowSlot::NotLoaded, RowSlot::Loaded)
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Fetching
    // -----------------------------------------------------------------------

    /// The next fetch to perform, if any.
    ///
    /// Returns `None` while loading, when nothing changed, or when the
    /// window is already cached. The request covers the missing part of the
    /// window widened to page boundaries, and asks for the total count only
    /// while it is unknown.
    pub fn next_fetch(&mut self) -> Option<FetchRequest> {
        if self.state == CacheState::Loading || !self.dirty {
            return None;
        }
        self.dirty = false;

        let Range { start, end } = self.fetch_span()?;
        let key = self.query_key();
        let ticket = FetchTicket {
            key: key.clone(),
            generation: self.generation,
            skip: start,
            take: end - start,
        };
        let descriptor = key.descriptor(start, end - start, self.total.is_none());
        debug!(
            resource = %self.resource,
            skip = descriptor.skip,
            take = descriptor.take,
            "fetching rows"
        );

        self.in_flight = Some(ticket.clone());
        self.last_issued = Some(key);
        self.state = CacheState::Loading;
        Some(FetchRequest { ticket, descriptor })
    }

    fn fetch_span(&self) -> Option<Range<u64>> {
        let page = self.config.page_size.max(1);

        let (first, end) = if self.total.is_some() {
            let range = self.visible_range();
            let first = range.clone().find(|pos| !self.rows.contains_key(pos))?;
            let last = range
                .rev()
                .find(|pos| !self.rows.contains_key(pos))
                .unwrap_or(first);
            (first, last + 1)
        } else {
            let skip = self.window.skip;
            (skip, self.window.end().max(skip + 1))
        };

        let start = first / page * page;
        let mut stop = end.div_ceil(page).saturating_mul(page).min(self.config.max_rows);
        if let Some(total) = self.total_count() {
            stop = stop.min(total);
        }
        Some(start..stop.max(start))
    }

    /// Hands back the result of the fetch identified by `ticket`.
    pub fn complete(
        &mut self,
        ticket: &FetchTicket,
        result: Result<Page, FetchError>,
    ) -> FetchOutcome {
        if self.in_flight.as_ref() != Some(ticket) {
            debug!(
                resource = %ticket.key.resource,
                skip = ticket.skip,
                "stale response discarded"
            );
            return FetchOutcome::StaleResponseDiscarded;
        }
        self.in_flight = None;
        self.state = CacheState::Idle;

        let page = match result {
            Ok(page) => page,
            Err(err) => {
                warn!(resource = %self.resource, error = %err, "row fetch failed");
                return FetchOutcome::Failed(err);
            }
        };

        if let Some(total) = page.total_count {
            self.total = Some(total);
        }
        let ceiling = self.config.max_rows;
        let mut applied = 0;
        for (pos, row) in (ticket.skip..).zip(page.data) {
            if pos >= ceiling {
                break;
            }
            self.rows.insert(pos, row);
            applied += 1;
        }

        // A short page (the server caps `take`) settles only the rows it
        // carried. An empty page settles its whole span so a table that
        // shrank under us cannot be fetched forever.
        let answered = if applied == 0 {
            ticket.take
        } else {
            u64::try_from(applied).unwrap_or(u64::MAX)
        };
        let settled = ticket.skip..ticket.skip.saturating_add(answered);
        self.dirty = self.total.is_some()
            && self
                .visible_range()
                .any(|pos| !settled.contains(&pos) && !self.rows.contains_key(&pos));

        FetchOutcome::Applied { rows: applied }
    }
}
