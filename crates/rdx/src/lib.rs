//! 🧪 rdx: the data core behind a Rick and Morty character gallery.
//!
//! Fetch, validate, paginate, debounce, and throw away whatever answer arrived too late.

pub mod accumulator;
pub mod app_config;
pub mod cache;
pub mod characters;
pub mod coordinator;
pub mod debounce;
pub mod fetch;
pub mod gallery;
pub mod models;
pub mod pipeline;
pub mod schema;
pub mod url_builder;

pub use app_config::{AppConfig, load_config};
pub use characters::{
    CharactersPage, PageRequest, PageSource, extract_next_page, fetch_characters_page,
    get_character_by_id, get_episodes_by_ids,
};
pub use gallery::{Gallery, GallerySnapshot};
pub use models::{Character, Episode, SortOption, StatusFilter};
pub use pipeline::ApiClient;
