//! 📊 progress.rs: "are we there yet?", asked once per page.
//!
//! 🚀 `rdx browse` pages through the API like a user scrolling with purpose. This
//! module keeps score: pages loaded, characters collected, how fast, how long.
//! A progress bar from indicatif, a borderless table from comfy-table.
//!
//! 🦆 The duck scrolled too. The duck found 826 characters and no duplicates.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::NOTHING};
use indicatif::{ProgressBar, ProgressStyle};

/// 🔢 "1000000" → "1,000,000". Eyes say thank you.
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

/// ⏱️ MM:SS, or HH:MM:SS if the API is having a day.
fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

/// 📊 Live scoreboard for a browse run.
///
/// Rates come from a sliding 5-second window so one slow page doesn't tank the number.
pub(crate) struct BrowseProgress {
    /// 🏷️ what we're browsing, e.g. `name=rick status=dead`
    query: String,
    target_pages: u64,
    pages: u64,
    characters: u64,
    progress_bar: ProgressBar,
    // -- 🔄 (when, pages, characters)
    rate_samples: VecDeque<(Instant, u64, u64)>,
    start_time: Instant,
}

impl std::fmt::Debug for BrowseProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // -- 🎭 ProgressBar has no Debug worth printing
        f.debug_struct("BrowseProgress")
            .field("query", &self.query)
            .field("target_pages", &self.target_pages)
            .field("pages", &self.pages)
            .field("characters", &self.characters)
            .finish()
    }
}

impl BrowseProgress {
    pub(crate) fn new(query: String, target_pages: u64) -> Self {
        let progress_bar = ProgressBar::new(target_pages);
        let style = ProgressStyle::default_bar()
            .template("{msg}\n| [{bar:40.cyan/blue}] {pos}/{len} pages")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");
        progress_bar.set_style(style);

        let start_time = Instant::now();
        let mut rate_samples = VecDeque::new();
        rate_samples.push_back((start_time, 0, 0));

        Self {
            query,
            target_pages,
            pages: 0,
            characters: 0,
            progress_bar,
            rate_samples,
            start_time,
        }
    }

    /// 🔄 One more page landed; `characters` is the running total after the merge.
    pub(crate) fn page_loaded(&mut self, characters: u64) {
        self.pages += 1;
        self.characters = characters;
        let (pages_per_sec, characters_per_sec) = self.rates();
        self.render(pages_per_sec, characters_per_sec);
        self.progress_bar.set_position(self.pages);
    }

    pub(crate) fn finish(&self) {
        self.progress_bar.finish();
    }

    fn rates(&mut self) -> (f64, f64) {
        let now = Instant::now();
        let window = Duration::from_secs(5);
        while let Some(&(timestamp, _, _)) = self.rate_samples.front() {
            if now.duration_since(timestamp) > window {
                self.rate_samples.pop_front();
            } else {
                break;
            }
        }
        self.rate_samples.push_back((now, self.pages, self.characters));

        match self.rate_samples.front() {
            Some(&(oldest, pages, characters)) => {
                let elapsed = now.duration_since(oldest).as_secs_f64();
                if elapsed > 0.0 {
                    (
                        self.pages.saturating_sub(pages) as f64 / elapsed,
                        self.characters.saturating_sub(characters) as f64 / elapsed,
                    )
                } else {
                    (0.0, 0.0)
                }
            }
            None => (0.0, 0.0),
        }
    }

    fn render(&self, pages_per_sec: f64, characters_per_sec: f64) {
        let mut table = Table::new();
        table.load_preset(NOTHING);
        table.set_content_arrangement(ContentArrangement::Dynamic);

        table.add_row(vec![
            Cell::new(format!("{characters_per_sec:.1} characters/s"))
                .set_alignment(CellAlignment::Right),
            Cell::new(format!("{} characters", format_number(self.characters)))
                .set_alignment(CellAlignment::Right),
        ]);
        table.add_row(vec![
            Cell::new(format!("{pages_per_sec:.2} pages/s")).set_alignment(CellAlignment::Right),
            Cell::new(format!("{} / {} pages", self.pages, self.target_pages))
                .set_alignment(CellAlignment::Right),
        ]);
        table.add_row(vec![Cell::new(format!(
            "{} elapsed",
            format_duration(self.start_time.elapsed())
        ))
        .set_alignment(CellAlignment::Right)]);

        self.progress_bar
            .set_message(format!("browsing: {}\n{}", self.query, table));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_big_numbers_get_commas() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(826), "826");
        assert_eq!(format_number(1_000_000), "1,000,000");
    }

    #[test]
    fn the_one_where_long_runs_grow_an_hours_column() {
        assert_eq!(format_duration(Duration::from_secs(75)), "01:15");
        assert_eq!(format_duration(Duration::from_secs(3_725)), "01:02:05");
    }
}
