//! 🖼️ The Gallery: search box, status dropdown, sort toggle and an endless list,
//! all glued together.
//!
//! 🎬 *[a user types fast, changes their mind, scrolls like their life depends on it.]*
//! *[three requests are in flight. two of them no longer matter.]*
//! *[the gallery shows the one that does.]*
//!
//! 📦 Moving parts:
//! - a [`Debounced`] name setter: keystrokes update `search_input` at once, the
//!   settled name goes to the filter worker after the quiet period
//! - the filter worker: drains [`FilterCommand`]s from an `async_channel`, asks the
//!   [`FilterCoordinator`] for a refetch ticket and spawns the page-1 fetch, aborting
//!   the previous one
//! - the [`InfiniteAccumulator`]: load-more tickets, dedup, terminal state
//!
//! Shared state sits behind one `Mutex` that is never held across an `.await`.
//! Spawned tasks only hold a `Weak` to it, so a dropped gallery is never written to.
//! Stale refetches are rejected by generation even if the abort loses the race. 🦆

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use async_channel::{Receiver, Sender};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::accumulator::{InfiniteAccumulator, LoadTicket, MergeOutcome};
use crate::app_config::GalleryConfig;
use crate::characters::{CharactersPage, PageSource};
use crate::coordinator::{FilterCoordinator, FilterState, RefetchTicket};
use crate::debounce::Debounced;
use crate::models::{Character, SortOption, StatusFilter};

/// 📨 What the filter worker can be asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
enum FilterCommand {
    SettleName(String),
    Status(StatusFilter),
    Sort(SortOption),
}

#[derive(Debug)]
struct GalleryState {
    coordinator: FilterCoordinator,
    accumulator: InfiniteAccumulator,
}

type SharedState = Arc<Mutex<GalleryState>>;
type WeakState = Weak<Mutex<GalleryState>>;

fn lock(state: &Mutex<GalleryState>) -> MutexGuard<'_, GalleryState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 📸 Everything a renderer needs, copied out from under the lock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GallerySnapshot {
    pub search_input: String,
    pub filters: FilterState,
    pub rows: Vec<Vec<Character>>,
    pub has_more: bool,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl GallerySnapshot {
    pub fn character_count(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }
}

#[derive(Debug)]
pub struct Gallery {
    state: SharedState,
    source: Arc<dyn PageSource>,
    commands: Sender<FilterCommand>,
    search: Debounced<String, ()>,
    worker: Option<JoinHandle<()>>,
}

impl Gallery {
    /// 🚀 Start a gallery. With an `initial` page nothing is fetched on mount;
    /// without one, page 1 is requested right away.
    ///
    /// Spawns the filter worker, so this needs a tokio runtime.
    pub fn new(
        source: Arc<dyn PageSource>,
        config: &GalleryConfig,
        initial: Option<CharactersPage>,
    ) -> Self {
        Self::with_filters(source, config, FilterState::default(), initial)
    }

    /// 🎛️ Like [`Gallery::new`], for an `initial` page that was fetched with `filters`.
    pub fn with_filters(
        source: Arc<dyn PageSource>,
        config: &GalleryConfig,
        filters: FilterState,
        initial: Option<CharactersPage>,
    ) -> Self {
        let request = filters.first_page();
        let mut coordinator = FilterCoordinator::new(filters, initial.is_some());
        let mount = coordinator.mount();

        let mut accumulator = InfiniteAccumulator::default().with_prefetch_rows(config.prefetch_rows);
        if let Some(initial) = initial {
            match initial.error {
                Some(error) => accumulator.reset_failed(error, request.name, request.status),
                None => accumulator.reset(
                    initial.characters,
                    initial.next_page,
                    request.name,
                    request.status,
                ),
            }
        }

        let state = Arc::new(Mutex::new(GalleryState {
            coordinator,
            accumulator,
        }));
        let (commands, rx) = async_channel::unbounded();

        let settle = commands.clone();
        let search = Debounced::new(
            Duration::from_millis(config.search_debounce_ms),
            move |name: String| {
                if settle.try_send(FilterCommand::SettleName(name)).is_err() {
                    debug!("🔌 gallery is closed, dropping settled search");
                }
            },
        );

        let worker = FilterWorker::new(rx, Arc::downgrade(&state), Arc::clone(&source), mount).start();

        Self {
            state,
            source,
            commands,
            search,
            worker: Some(worker),
        }
    }

    /// ⌨️ A keystroke. The input updates now; the fetch waits for the typing to stop.
    pub fn type_search(&self, raw: impl Into<String>) {
        let raw = raw.into();
        lock(&self.state).coordinator.set_search_input(raw.clone());
        self.search.call(raw);
    }

    /// 🚽 Settle whatever is in the search box without waiting out the debounce.
    pub fn flush_search(&self) {
        self.search.flush();
    }

    pub fn set_status(&self, status: StatusFilter) {
        self.send(FilterCommand::Status(status));
    }

    pub fn set_sort(&self, sort_order: SortOption) {
        self.send(FilterCommand::Sort(sort_order));
    }

    fn send(&self, command: FilterCommand) {
        if let Err(e) = self.commands.try_send(command) {
            warn!(command = ?e.into_inner(), "⚠️ gallery is shut down, filter change ignored");
        }
    }

    /// 📥 Load the next page. `None` when a load is already running or the list is done.
    ///
    /// Dropping the returned future mid-fetch frees the loading flag again.
    pub async fn load_more(&self) -> Option<MergeOutcome> {
        let ticket = lock(&self.state).accumulator.request_more()?;
        Some(self.run_load(ticket).await)
    }

    /// 📜 Scroll position changed; loads the next page if the bottom is near.
    pub async fn on_scroll(&self, last_visible_row: usize) -> Option<MergeOutcome> {
        let ticket = lock(&self.state).accumulator.on_scroll(last_visible_row)?;
        Some(self.run_load(ticket).await)
    }

    async fn run_load(&self, ticket: LoadTicket) -> MergeOutcome {
        let request = ticket.request.clone();
        let pending = PendingLoad {
            state: &self.state,
            ticket: Some(ticket),
        };
        let page = self.source.fetch_page(request).await;
        pending.land(page)
    }

    pub fn snapshot(&self) -> GallerySnapshot {
        let state = lock(&self.state);
        let filters = state.coordinator.filters().clone();
        GallerySnapshot {
            search_input: state.coordinator.search_input().to_string(),
            rows: state.accumulator.rows(Some(filters.sort_order)),
            has_more: state.accumulator.has_more(),
            is_loading: state.accumulator.is_loading(),
            error: state.accumulator.error().map(str::to_string),
            filters,
        }
    }

    /// 🛑 Stop accepting filter changes and wait for the worker to wind down.
    pub async fn shutdown(mut self) {
        self.search.cancel();
        self.commands.close();
        if let Some(worker) = self.worker.take()
            && let Err(e) = worker.await
        {
            warn!(error = %e, "⚠️ filter worker did not shut down cleanly");
        }
    }
}

impl Drop for Gallery {
    fn drop(&mut self) {
        self.search.cancel();
        self.commands.close();
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}

/// 🪂 A load-more in flight. Dropped before it lands, it hands the loading flag back.
struct PendingLoad<'a> {
    state: &'a Mutex<GalleryState>,
    ticket: Option<LoadTicket>,
}

impl PendingLoad<'_> {
    fn land(mut self, page: CharactersPage) -> MergeOutcome {
        match self.ticket.take() {
            Some(ticket) => lock(self.state).accumulator.complete_load(&ticket, page),
            None => MergeOutcome::Stale,
        }
    }
}

impl Drop for PendingLoad<'_> {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            lock(self.state).accumulator.abandon_load(&ticket);
        }
    }
}

/// 🎛️ Drains filter commands and keeps at most one page-1 refetch in flight.
struct FilterWorker {
    rx: Receiver<FilterCommand>,
    state: WeakState,
    source: Arc<dyn PageSource>,
    mount: Option<RefetchTicket>,
}

impl FilterWorker {
    fn new(
        rx: Receiver<FilterCommand>,
        state: WeakState,
        source: Arc<dyn PageSource>,
        mount: Option<RefetchTicket>,
    ) -> Self {
        Self {
            rx,
            state,
            source,
            mount,
        }
    }

    fn start(self) -> JoinHandle<()> {
        let Self {
            rx,
            state,
            source,
            mount,
        } = self;
        tokio::spawn(async move {
            debug!("🎛️ filter worker started");
            let mut in_flight =
                mount.map(|ticket| spawn_refetch(state.clone(), Arc::clone(&source), ticket));

            while let Ok(command) = rx.recv().await {
                let Some(shared) = state.upgrade() else {
                    break;
                };
                let ticket = {
                    let mut guard = lock(&shared);
                    match command {
                        FilterCommand::SettleName(name) => guard.coordinator.settle_name(name),
                        FilterCommand::Status(status) => guard.coordinator.set_status(status),
                        FilterCommand::Sort(sort_order) => guard.coordinator.set_sort(sort_order),
                    }
                };
                drop(shared);

                if let Some(ticket) = ticket {
                    if let Some(previous) = in_flight.take() {
                        previous.abort();
                    }
                    in_flight = Some(spawn_refetch(state.clone(), Arc::clone(&source), ticket));
                }
            }

            if let Some(previous) = in_flight {
                previous.abort();
            }
            debug!("🏁 filter worker: channel closed, shutting down");
        })
    }
}

fn spawn_refetch(
    state: WeakState,
    source: Arc<dyn PageSource>,
    ticket: RefetchTicket,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let page = source.fetch_page(ticket.request.clone()).await;
        let Some(shared) = state.upgrade() else {
            debug!("🔌 gallery dropped before the refetch landed");
            return;
        };
        let mut guard = lock(&shared);
        if !guard.coordinator.is_current(ticket.generation) {
            debug!(
                generation = ticket.generation,
                current = guard.coordinator.generation(),
                "🗑️ ignoring a refetch for filters that changed since"
            );
            return;
        }
        let request = ticket.request;
        match page.error {
            Some(error) => {
                warn!(%error, "⚠️ first page failed for the new filters");
                guard.accumulator.reset_failed(error, request.name, request.status);
            }
            None => guard.accumulator.reset(
                page.characters,
                page.next_page,
                request.name,
                request.status,
            ),
        }
    })
}
