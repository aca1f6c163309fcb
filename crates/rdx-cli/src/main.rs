//! 🚀 rdx: the gallery, minus the browser.
//!
//! 🎬 *[narrator voice]* "It all started with a simple main() function... and 826 characters."
//! 📦 Thin CLI wrapper: loads config, sets up logging, hands the real work to the
//! `rdx` library, and prints what comes back as cards or a table. 🦆

mod cards;
mod progress;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use comfy_table::{Cell, ContentArrangement, Table, presets::UTF8_FULL};
use rdx::accumulator::MergeOutcome;
use rdx::characters::detail_episode_ids;
use rdx::coordinator::FilterState;
use rdx::{
    AppConfig, ApiClient, Gallery, PageRequest, SortOption, StatusFilter, fetch_characters_page,
    get_character_by_id, get_episodes_by_ids,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::cards::CardVariant;
use crate::progress::BrowseProgress;

#[derive(Debug, Parser)]
#[command(name = "rdx", version, about = "🧪 Browse the Rick and Morty character dataset from a terminal")]
struct Cli {
    /// TOML config file. `RDX_*` and `API_ROOT_URL` env vars still win over it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// How to draw each character.
    #[arg(long, value_enum, default_value_t = CardVariant::Classic, global = true)]
    card: CardVariant,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 📄 Fetch one page of characters.
    Page {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        name: Option<String>,
        /// alive, dead, unknown or all
        #[arg(long, default_value_t = StatusFilter::All)]
        status: StatusFilter,
    },
    /// 🎯 One character, plus its first few episodes.
    Character { id: i64 },
    /// 📺 Episodes by id, e.g. `rdx episodes 1,2,3`.
    Episodes {
        #[arg(required = true, value_delimiter = ',')]
        ids: Vec<i64>,
    },
    /// 📜 Scroll through pages like the gallery does, deduplicated and sorted.
    Browse {
        #[arg(long)]
        name: Option<String>,
        #[arg(long, default_value_t = StatusFilter::All)]
        status: StatusFilter,
        /// name-asc or name-desc
        #[arg(long, default_value_t = SortOption::NameAsc)]
        sort: SortOption,
        /// Stop after this many pages, even if there are more.
        #[arg(long, default_value_t = 3)]
        pages: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        let exists = path.try_exists().with_context(|| {
            format!(
                "💀 Couldn't check whether the config file exists. If it's a relative path, \
                try an absolute one. Was checking here: '{}'",
                path.display()
            )
        })?;
        if !exists {
            bail!("💀 Config file '{}' does not exist", path.display());
        }
    }

    let app_config = rdx::load_config(cli.config.as_deref())
        .context("💀 In rdx, main, we couldn't load the config. Check the TOML and the RDX_* env vars")?;

    let result = run(cli.command, cli.card, &app_config).await;

    if let Err(err) = result {
        error!("💀 error: {}", err);
        let mut looks_like_connection_trouble = false;
        for cause in err.chain().skip(1) {
            error!("⚠️  cause: {}", cause);
            let cause_str = cause.to_string();
            if cause_str.contains("Network error")
                || cause_str.contains("error sending request")
                || cause_str.contains("Connection refused")
                || cause_str.contains("dns error")
            {
                looks_like_connection_trouble = true;
            }
        }
        if looks_like_connection_trouble || err.to_string().contains("Network error") {
            error!(
                "🔧 hint: the API isn't reachable. Check API_ROOT_URL / NEXT_PUBLIC_API_ROOT_URL \
                (or `api_root_url` in the config file) and your network. ☕"
            );
        }
        std::process::exit(1);
    }

    Ok(())
}

async fn run(command: Command, card: CardVariant, config: &AppConfig) -> Result<()> {
    match command {
        Command::Page { page, name, status } => {
            let api = ApiClient::from_config(config)?;
            let request = PageRequest { page, name, status };
            let result = fetch_characters_page(&api, &request).await;
            if let Some(error) = result.error {
                bail!("💀 page {page} failed: {error}");
            }
            for character in &result.characters {
                println!("{}\n", cards::render(card, character));
            }
            match result.next_page {
                Some(next) => info!(next, "➡️ more where that came from: --page {next}"),
                None => info!("🏁 that was the last page"),
            }
        }
        Command::Character { id } => {
            let api = ApiClient::from_config(config)?;
            let lookup = get_character_by_id(&api, id).await;
            let character = match (lookup.character, lookup.error) {
                (Some(character), _) => character,
                (None, error) => bail!(
                    "💀 character {id} failed: {}",
                    error.unwrap_or_else(|| "not found".to_string())
                ),
            };
            println!("{}\n", cards::render(card, &character));

            let episodes = get_episodes_by_ids(&api, &detail_episode_ids(&character)).await;
            if let Some(error) = episodes.error {
                warn!(%error, "⚠️ couldn't load episodes for the detail view");
            }
            for episode in &episodes.episodes {
                println!("  {}", cards::episode_line(episode));
            }
        }
        Command::Episodes { ids } => {
            let api = ApiClient::from_config(config)?;
            let lookup = get_episodes_by_ids(&api, &ids).await;
            if let Some(error) = lookup.error {
                bail!("💀 episodes {ids:?} failed: {error}");
            }
            for episode in &lookup.episodes {
                println!("{}", cards::episode_line(episode));
            }
        }
        Command::Browse {
            name,
            status,
            sort,
            pages,
        } => {
            let filters = FilterState {
                name: name.unwrap_or_default(),
                status,
                sort_order: sort,
            };
            browse(config, card, filters, pages).await?;
        }
    }
    Ok(())
}

/// 📜 Page 1 up front, then load-more until `pages` or the end of the list.
async fn browse(config: &AppConfig, card: CardVariant, filters: FilterState, pages: u32) -> Result<()> {
    let api = Arc::new(
        ApiClient::public_from_config(config).context("💀 couldn't build the API client for browse")?,
    );
    let query = format!("name={:?} status={} sort={}", filters.name, filters.status, filters.sort_order);

    let first = fetch_characters_page(&api, &filters.first_page()).await;
    if let Some(error) = &first.error {
        bail!("💀 first page failed for {query}: {error}");
    }

    let gallery = Gallery::with_filters(api, &config.gallery, filters, Some(first));
    let mut progress = BrowseProgress::new(query, u64::from(pages.max(1)));
    progress.page_loaded(gallery.snapshot().character_count() as u64);

    for _ in 1..pages {
        match gallery.load_more().await {
            None => break,
            Some(MergeOutcome::Failed) => {
                let snapshot = gallery.snapshot();
                warn!(error = ?snapshot.error, "⚠️ load more failed, showing what we have");
                break;
            }
            Some(_) => progress.page_loaded(gallery.snapshot().character_count() as u64),
        }
    }
    progress.finish();

    let snapshot = gallery.snapshot();
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    for row in &snapshot.rows {
        table.add_row(row.iter().map(|character| Cell::new(cards::render(card, character))));
    }
    println!("{table}");
    info!(
        characters = snapshot.character_count(),
        has_more = snapshot.has_more,
        "✅ browse done"
    );

    gallery.shutdown().await;
    Ok(())
}
