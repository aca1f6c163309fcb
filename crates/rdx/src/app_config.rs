//! 🔧 App Configuration: the sacred TOML-and-env-to-struct pipeline.
//!
//! 📡 "Where's the API?" "Which dimension?" Every config bug, ever 🦆
//!
//! 🏗️ Powered by Figment, because hand-parsing env vars is a form of self-harm
//! that even the borrow checker wouldn't approve of.
//!
//! 🧠 Layering, lowest to highest priority:
//! 1. serde defaults (the fallback dimension)
//! 2. the optional TOML file
//! 3. `RDX_*` env vars (nested with `__`, e.g. `RDX_HTTP__REQUEST_TIMEOUT_SECS`)
//! 4. the raw `API_ROOT_URL` / `NEXT_PUBLIC_API_ROOT_URL` vars

use std::path::Path;

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use tracing::{info, warn};

/// 🌍 The public API host, used when nobody told us otherwise.
pub const DEFAULT_API_ROOT_URL: &str = "https://rickandmortyapi.com/api";

/// 📦 One struct to rule them all, one struct to find them.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    /// 📡 Server-side base for the dataset API.
    #[serde(default)]
    pub api_root_url: Option<String>,
    /// 📡 Client-exposed equivalent, for client-originated fetches.
    #[serde(default)]
    pub next_public_api_root_url: Option<String>,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub gallery: GalleryConfig,
}

/// ⏱️ How patient the HTTP client is. Polite, but not a doormat.
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// 🗄️ Response cache knobs.
#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_cache_enabled() -> bool {
    true
}

// -- ⏳ five minutes. long enough to skip refetches, short enough to notice new episodes.
fn default_cache_ttl_secs() -> u64 {
    300
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

/// 🖼️ Gallery behavior: how long search waits to settle, how early scrolling prefetches.
#[derive(Debug, Deserialize, Clone)]
pub struct GalleryConfig {
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,
    /// 📜 Start loading the next page when the last visible row is this close to the end.
    #[serde(default = "default_prefetch_rows")]
    pub prefetch_rows: usize,
}

fn default_search_debounce_ms() -> u64 {
    400
}

fn default_prefetch_rows() -> usize {
    2
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            search_debounce_ms: default_search_debounce_ms(),
            prefetch_rows: default_prefetch_rows(),
        }
    }
}

impl AppConfig {
    /// 📡 Server-side API root. Falls back to the public host, with a warning, because
    /// silently talking to the internet is how surprises happen.
    pub fn api_root(&self) -> String {
        match non_blank(&self.api_root_url) {
            Some(root) => root.to_string(),
            None => {
                warn!(
                    fallback = DEFAULT_API_ROOT_URL,
                    "⚠️ API_ROOT_URL is not set, falling back to the public API"
                );
                DEFAULT_API_ROOT_URL.to_string()
            }
        }
    }

    /// 📡 Client-side API root. Falls back to the server-side root.
    pub fn public_api_root(&self) -> String {
        match non_blank(&self.next_public_api_root_url) {
            Some(root) => root.to_string(),
            None => self.api_root(),
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// 🚀 Load the config: optional TOML file, then env vars on top.
///
/// 📐 If `config_file_name` is `None` we read env vars only. No file, no assumptions.
///
/// 💀 Returns an error if the merged config doesn't deserialize. The context says
/// which sources were involved so 3am-you knows where to look.
pub fn load_config(config_file_name: Option<&Path>) -> anyhow::Result<AppConfig> {
    info!(
        "🔧 Loading configuration: {:#?}",
        config_file_name.unwrap_or(Path::new(""))
    );

    let config = Figment::new();
    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };
    let config = config
        .merge(Env::prefixed("RDX_").split("__"))
        .merge(Env::raw().only(&["API_ROOT_URL", "NEXT_PUBLIC_API_ROOT_URL"]));

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}' and environment variables (RDX_*, API_ROOT_URL). \
             The file exists in our hearts, but apparently not in a shape serde likes.",
            path.display()
        ),
        None => "💀 Failed to parse configuration from environment variables (RDX_*, API_ROOT_URL). \
                 No file was provided, so this one's all on the environment."
            .to_string(),
    };

    config.extract().context(context_msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_test_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("💀 temp file refused to exist");
        file.write_all(contents.as_bytes())
            .expect("💀 Failed to write test config. The filesystem said 'new phone who dis'.");
        file
    }

    #[test]
    fn the_one_where_every_section_is_spelled_out() {
        // -- 🔒 jailed: sibling tests set API_ROOT_URL in the process env
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "rdx.toml",
                r#"
                api_root_url = "http://localhost:8080/api"

                [http]
                connect_timeout_secs = 2
                request_timeout_secs = 5

                [cache]
                enabled = false
                ttl_secs = 1

                [gallery]
                search_debounce_ms = 250
                prefetch_rows = 4
                "#,
            )?;

            let config = load_config(Some(Path::new("rdx.toml")))
                .map_err(|e| figment::Error::from(e.to_string()))?;
            assert_eq!(config.api_root(), "http://localhost:8080/api");
            assert_eq!(config.http.request_timeout_secs, 5);
            assert!(!config.cache.enabled);
            assert_eq!(config.gallery.search_debounce_ms, 250);
            assert_eq!(config.gallery.prefetch_rows, 4);
            Ok(())
        });
    }

    #[test]
    fn the_one_where_defaults_show_up_uninvited_but_helpful() {
        let file = write_test_config("");
        let config: AppConfig = Figment::new()
            .merge(Toml::file(file.path()))
            .extract()
            .expect("💀 empty config should fall back to defaults");

        assert_eq!(config.http.connect_timeout_secs, 10);
        assert_eq!(config.http.request_timeout_secs, 30);
        assert!(config.cache.enabled);
        assert_eq!(config.cache.ttl_secs, 300);
        assert_eq!(config.gallery.search_debounce_ms, 400);
        assert_eq!(config.api_root(), DEFAULT_API_ROOT_URL);
    }

    #[test]
    fn the_one_where_the_public_root_borrows_the_server_root() {
        let config = AppConfig {
            api_root_url: Some("http://server/api".into()),
            next_public_api_root_url: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(config.public_api_root(), "http://server/api");

        let config = AppConfig {
            next_public_api_root_url: Some("http://client/api".into()),
            ..config
        };
        assert_eq!(config.public_api_root(), "http://client/api");
    }

    #[test]
    fn the_one_where_raw_env_vars_win() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("rdx.toml", r#"api_root_url = "http://from-file/api""#)?;
            jail.set_env("API_ROOT_URL", "http://from-env/api");
            jail.set_env("RDX_GALLERY__PREFETCH_ROWS", "7");

            let config = load_config(Some(Path::new("rdx.toml")))
                .map_err(|e| figment::Error::from(e.to_string()))?;
            assert_eq!(config.api_root(), "http://from-env/api");
            assert_eq!(config.gallery.prefetch_rows, 7);
            Ok(())
        });
    }
}
