//! 🎛️ Filter/Search Coordinator: who asked for what, and which answer still matters.
//!
//! 🎬 *[user types "rick". request #1 leaves.]*
//! *[user changes status to dead. request #2 leaves.]*
//! *[#2 comes back. #1 comes back later, sweaty and out of breath.]*
//! *["sorry, you're generation 1," says the coordinator. "we've moved on."]*
//!
//! 📦 Holds the raw `search_input` (what's in the box right now) and the settled
//! [`FilterState`] (what the fetches use). Every effective filter change mints a
//! [`RefetchTicket`] for page 1 under a fresh generation. Only the newest generation
//! may land: last request wins, not first response. 🦆
//!
//! ⚠️ Debouncing the name is NOT done here. The gallery wraps `settle_name` in a
//! [`Debounced`](crate::debounce::Debounced); status and sort apply immediately.

use serde::Serialize;
use tracing::debug;

use crate::characters::PageRequest;
use crate::models::{SortOption, StatusFilter};

/// 🔢 Monotonic request counter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestGeneration {
    current: u64,
}

impl RequestGeneration {
    /// 🎫 Mint the next generation. Everything older becomes stale.
    pub fn issue(&mut self) -> u64 {
        self.current += 1;
        self.current
    }

    pub fn current(&self) -> u64 {
        self.current
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.current
    }
}

/// 🎛️ The settled filters. `name` is the debounced value, not the raw input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterState {
    pub name: String,
    pub status: StatusFilter,
    pub sort_order: SortOption,
}

impl FilterState {
    /// 📄 Page-1 request for these filters. Blank names are left out.
    pub fn first_page(&self) -> PageRequest {
        let name = self.name.trim();
        PageRequest::first(
            (!name.is_empty()).then(|| name.to_string()),
            self.status,
        )
    }
}

/// 🎫 A page-1 refetch, stamped with the generation that must still be current when
/// its response lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefetchTicket {
    pub generation: u64,
    pub request: PageRequest,
}

#[derive(Debug, Clone)]
pub struct FilterCoordinator {
    search_input: String,
    filters: FilterState,
    generation: RequestGeneration,
    first_load: bool,
    has_initial_page: bool,
}

impl FilterCoordinator {
    /// 🌱 `has_initial_page` says whether a first page was supplied from outside.
    pub fn new(filters: FilterState, has_initial_page: bool) -> Self {
        Self {
            search_input: filters.name.clone(),
            filters,
            generation: RequestGeneration::default(),
            first_load: true,
            has_initial_page,
        }
    }

    /// 🚪 First mount. With an initial page there's nothing to fetch; without one,
    /// page 1 is requested. Only the first call does anything.
    pub fn mount(&mut self) -> Option<RefetchTicket> {
        if !std::mem::take(&mut self.first_load) {
            return None;
        }
        if self.has_initial_page {
            debug!("🌱 using the supplied first page, no refetch");
            None
        } else {
            Some(self.refetch())
        }
    }

    pub fn search_input(&self) -> &str {
        &self.search_input
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    /// ⌨️ Raw keystrokes land here immediately. Nothing is fetched.
    pub fn set_search_input(&mut self, raw: impl Into<String>) {
        self.search_input = raw.into();
    }

    /// ⏳ The debounced name has settled.
    pub fn settle_name(&mut self, name: impl Into<String>) -> Option<RefetchTicket> {
        let name = name.into();
        if name == self.filters.name {
            return None;
        }
        self.filters.name = name;
        self.changed()
    }

    pub fn set_status(&mut self, status: StatusFilter) -> Option<RefetchTicket> {
        if status == self.filters.status {
            return None;
        }
        self.filters.status = status;
        self.changed()
    }

    pub fn set_sort(&mut self, sort_order: SortOption) -> Option<RefetchTicket> {
        if sort_order == self.filters.sort_order {
            return None;
        }
        self.filters.sort_order = sort_order;
        self.changed()
    }

    /// ✅ May a response stamped with `generation` be applied?
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation.is_current(generation)
    }

    pub fn generation(&self) -> u64 {
        self.generation.current()
    }

    fn changed(&mut self) -> Option<RefetchTicket> {
        // -- 🌱 a change before mount still counts as the mount being done
        self.first_load = false;
        Some(self.refetch())
    }

    fn refetch(&mut self) -> RefetchTicket {
        let ticket = RefetchTicket {
            generation: self.generation.issue(),
            request: self.filters.first_page(),
        };
        debug!(
            generation = ticket.generation,
            name = %self.filters.name,
            status = %self.filters.status,
            sort = %self.filters.sort_order,
            "🎛️ filters changed, refetching page 1"
        );
        ticket
    }
}
