//! 📜 The Infinite Accumulator: the list that keeps growing as you scroll.
//!
//! 🎬 *[the user scrolls. the list ends. the user scrolls harder.]*
//! *[page 2 arrives. page 3 arrives. page 3 arrives AGAIN (flaky API, thanks).]*
//! *[nobody sees a duplicate Rick. the accumulator saw to that.]*
//!
//! 📦 State machine over `{characters, next_page, is_loading, error}`:
//!
//! - **reset**: new first page (filters changed upstream) replaces everything and
//!   bumps the generation, so in-flight loads for the old filters are ignored.
//! - **request_more / on_scroll**: hands out a [`LoadTicket`] only when there is a
//!   next page and nothing is loading already. That `is_loading` flag is the whole
//!   backpressure story.
//! - **complete_load**: merges the page, skipping ids we already hold, keeping arrival
//!   order. Failures keep the list and record the error.
//! - **abandon_load**: the fetch for a ticket was dropped before it finished. Frees
//!   `is_loading` so the next scroll can try again.
//! - **terminal**: `next_page == None`. No more tickets, ever (until a reset).
//!
//! The ticket split exists because the fetch is async and the accumulator is not: the
//! owner can release its lock across the `.await` and still have stale completions
//! rejected. 🦆

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::characters::{CharactersPage, PageRequest, PageSource};
use crate::models::{Character, SortOption, StatusFilter};

/// 🧱 Characters per rendered row.
pub const ROW_SIZE: usize = 3;

/// 🎫 Permission to fetch one page. Carries everything the fetch needs, plus the
/// generation it was issued under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    pub generation: u64,
    pub request: PageRequest,
}

/// 🔀 What `complete_load` did with the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Appended this many new characters.
    Merged(usize),
    /// The page failed; the list is untouched and `error` is set.
    Failed,
    /// The ticket belonged to an older generation. Nothing changed.
    Stale,
}

#[derive(Debug, Clone, Default)]
pub struct InfiniteAccumulator {
    characters: Vec<Character>,
    seen: HashSet<i64>,
    next_page: Option<u32>,
    is_loading: bool,
    error: Option<String>,
    name: Option<String>,
    status: StatusFilter,
    generation: u64,
    prefetch_rows: usize,
}

impl InfiniteAccumulator {
    /// 🌱 Seed from an externally fetched first page.
    pub fn new(initial_characters: Vec<Character>, initial_next_page: Option<u32>) -> Self {
        let mut accumulator = Self::default();
        accumulator.replace(initial_characters, initial_next_page);
        accumulator
    }

    /// 📏 Prefetch when the last visible row is within `rows` of the end.
    pub fn with_prefetch_rows(mut self, rows: usize) -> Self {
        self.prefetch_rows = rows;
        self
    }

    /// 🔄 Wholesale replacement: new filters, new first page, new generation.
    pub fn reset(
        &mut self,
        characters: Vec<Character>,
        next_page: Option<u32>,
        name: Option<String>,
        status: StatusFilter,
    ) {
        self.generation += 1;
        self.name = name;
        self.status = status;
        self.is_loading = false;
        self.error = None;
        self.replace(characters, next_page);
        debug!(
            generation = self.generation,
            count = self.characters.len(),
            next_page = ?self.next_page,
            "🔄 accumulator reset"
        );
    }

    /// 💀 A first-page failure: empty list, no next page, and the reason.
    pub fn reset_failed(&mut self, error: String, name: Option<String>, status: StatusFilter) {
        self.reset(Vec::new(), None, name, status);
        self.error = Some(error);
    }

    fn replace(&mut self, characters: Vec<Character>, next_page: Option<u32>) {
        self.characters.clear();
        self.seen.clear();
        self.next_page = next_page;
        self.append_unique(characters);
    }

    /// 🎫 Ask to load the next page. `None` when loading already or out of pages.
    pub fn request_more(&mut self) -> Option<LoadTicket> {
        if self.is_loading {
            return None;
        }
        let page = self.next_page?;
        self.is_loading = true;
        self.error = None;
        Some(LoadTicket {
            generation: self.generation,
            request: PageRequest {
                page,
                name: self.name.clone(),
                status: self.status,
            },
        })
    }

    /// 📜 Scroll signal: `last_visible_row` is the index of the lowest row on screen.
    pub fn on_scroll(&mut self, last_visible_row: usize) -> Option<LoadTicket> {
        let rows = self.row_count();
        let reach = last_visible_row
            .saturating_add(self.prefetch_rows)
            .saturating_add(1);
        if reach >= rows {
            self.request_more()
        } else {
            None
        }
    }

    /// 🔀 Fold a fetched page back in.
    pub fn complete_load(&mut self, ticket: &LoadTicket, page: CharactersPage) -> MergeOutcome {
        if ticket.generation != self.generation {
            debug!(
                ticket = ticket.generation,
                current = self.generation,
                "🗑️ dropping load from an older generation"
            );
            return MergeOutcome::Stale;
        }
        self.is_loading = false;
        // -- 📌 next page moves on even when the page failed, so one bad page can't wedge us
        self.next_page = page.next_page;

        if let Some(error) = page.error {
            warn!(page = ticket.request.page, %error, "⚠️ load more failed");
            self.error = Some(error);
            return MergeOutcome::Failed;
        }

        let added = self.append_unique(page.characters);
        if added == 0 && self.next_page == Some(ticket.request.page) {
            // -- 🛑 same page again and nothing new: the API is looping us. call it the end.
            warn!(
                page = ticket.request.page,
                "🛑 page returned no new characters and pointed at itself, ending pagination"
            );
            self.next_page = None;
        }
        MergeOutcome::Merged(added)
    }

    /// 🪂 The fetch behind `ticket` was cancelled. Only the current generation's load
    /// owns `is_loading`; an older ticket leaves it alone.
    pub fn abandon_load(&mut self, ticket: &LoadTicket) {
        if ticket.generation != self.generation || !self.is_loading {
            return;
        }
        self.is_loading = false;
        debug!(page = ticket.request.page, "🪂 load more abandoned before it landed");
    }

    /// 🚀 One complete load-more cycle against `source`. `None` if no ticket was issued.
    pub async fn load_more(&mut self, source: &dyn PageSource) -> Option<MergeOutcome> {
        let ticket = self.request_more()?;
        let page = source.fetch_page(ticket.request.clone()).await;
        Some(self.complete_load(&ticket, page))
    }

    fn append_unique(&mut self, incoming: Vec<Character>) -> usize {
        let before = self.characters.len();
        for character in incoming {
            if self.seen.insert(character.id) {
                self.characters.push(character);
            }
        }
        self.characters.len() - before
    }

    pub fn characters(&self) -> &[Character] {
        &self.characters
    }

    pub fn next_page(&self) -> Option<u32> {
        self.next_page
    }

    pub fn has_more(&self) -> bool {
        self.next_page.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn row_count(&self) -> usize {
        self.characters.len().div_ceil(ROW_SIZE)
    }

    /// 🧱 Derived view: characters sorted (if asked) and chunked into rows.
    pub fn rows(&self, sort: Option<SortOption>) -> Vec<Vec<Character>> {
        let mut ordered = self.characters.clone();
        if let Some(sort) = sort {
            sort.apply(&mut ordered);
        }
        ordered.chunks(ROW_SIZE).map(<[Character]>::to_vec).collect()
    }
}
