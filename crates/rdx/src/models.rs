//! 📦 Models: the nouns of the multiverse.
//!
//! 🎬 *[a portal opens. 826 characters step through. some of them are Ricks.]*
//!
//! Every record the API hands us lives here, next to the [`Schema`] that vouches for
//! it. The structs are what the rest of the crate holds; the schemas are what the
//! pipeline checks raw JSON against before any struct gets built. Keep the two in
//! sync or the validator and serde will start arguing in public. 🦆

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::schema::{Field, Schema};

/// 🧑‍🚀 One dataset record. Identity is `id` and nothing else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: i64,
    pub name: String,
    /// Alive / Dead / unknown in practice, but the API never promised, so: String.
    pub status: String,
    pub species: String,
    /// 🏷️ `type` on the wire. Usually empty. Sometimes "Parasite". Sometimes worse.
    #[serde(rename = "type", default)]
    pub kind: String,
    pub gender: String,
    pub origin: LocationRef,
    pub location: LocationRef,
    pub image: String,
    /// 📺 Episode URLs, in air order.
    pub episode: Vec<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub created: String,
}

/// 📍 A `{name, url}` pointer to a location. `url` is empty for "unknown".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRef {
    pub name: String,
    pub url: String,
}

/// 📺 One episode. Fetched lazily for detail views, five at most.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub id: i64,
    pub name: String,
    /// Code like "S01E01".
    pub episode: String,
    #[serde(default)]
    pub air_date: String,
    #[serde(default)]
    pub characters: Vec<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub created: String,
}

/// 📄 The `info` half of the pagination envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageInfo {
    pub count: u64,
    pub pages: u64,
    pub next: Option<String>,
    pub prev: Option<String>,
}

/// 🎛️ Status filter as the user picks it. `All` means "don't send a status param".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Alive,
    Dead,
    Unknown,
}

impl StatusFilter {
    /// 📡 The query value for the API, or `None` when no filter applies.
    pub fn as_query(self) -> Option<&'static str> {
        match self {
            StatusFilter::All => None,
            StatusFilter::Alive => Some("alive"),
            StatusFilter::Dead => Some("dead"),
            StatusFilter::Unknown => Some("unknown"),
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query().unwrap_or("all"))
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" | "" => Ok(StatusFilter::All),
            "alive" => Ok(StatusFilter::Alive),
            "dead" => Ok(StatusFilter::Dead),
            "unknown" => Ok(StatusFilter::Unknown),
            other => Err(format!("unknown status filter '{other}'")),
        }
    }
}

/// 🔤 Client-side sort. The API doesn't sort, so we do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOption {
    #[default]
    #[serde(rename = "name-asc")]
    NameAsc,
    #[serde(rename = "name-desc")]
    NameDesc,
}

impl SortOption {
    /// 🔄 Stable sort by name, case-insensitive. Ties keep arrival order.
    pub fn apply(self, characters: &mut [Character]) {
        characters.sort_by(|a, b| {
            let ordering = a.name.to_lowercase().cmp(&b.name.to_lowercase());
            match self {
                SortOption::NameAsc => ordering,
                SortOption::NameDesc => ordering.reverse(),
            }
        });
    }
}

impl fmt::Display for SortOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOption::NameAsc => f.write_str("name-asc"),
            SortOption::NameDesc => f.write_str("name-desc"),
        }
    }
}

impl FromStr for SortOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name-asc" => Ok(SortOption::NameAsc),
            "name-desc" => Ok(SortOption::NameDesc),
            other => Err(format!("unknown sort option '{other}'")),
        }
    }
}

fn location_schema() -> Schema {
    Schema::object([
        Field::required("name", Schema::String),
        Field::required("url", Schema::String),
    ])
}

/// 🧬 Shape of a single character as the API sends it.
pub static CHARACTER_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::object([
        Field::required("id", Schema::Integer),
        Field::required("name", Schema::String),
        Field::required("status", Schema::String),
        Field::required("species", Schema::String),
        Field::optional("type", Schema::String),
        Field::required("gender", Schema::String),
        Field::required("origin", location_schema()),
        Field::required("location", location_schema()),
        Field::required("image", Schema::String),
        Field::required("episode", Schema::array(Schema::String)),
        Field::optional("url", Schema::String),
        Field::optional("created", Schema::String),
    ])
});

/// 🧬 Shape of a single episode.
pub static EPISODE_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::object([
        Field::required("id", Schema::Integer),
        Field::required("name", Schema::String),
        Field::required("episode", Schema::String),
        Field::optional("air_date", Schema::String),
        Field::optional("characters", Schema::array(Schema::String)),
        Field::optional("url", Schema::String),
        Field::optional("created", Schema::String),
    ])
});

/// 📄 Shape of the `{info, results}` envelope. `results` stays untyped here; the
/// element schema gets its turn afterwards.
pub static ENVELOPE_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::object([
        Field::required(
            "info",
            Schema::object([
                Field::required("count", Schema::Integer),
                Field::required("pages", Schema::Integer),
                Field::required("next", Schema::nullable(Schema::String)),
                Field::required("prev", Schema::nullable(Schema::String)),
            ]),
        ),
        Field::required("results", Schema::array(Schema::Any)),
    ])
});

#[cfg(test)]
pub(crate) mod fixtures {
    //! 🧪 JSON builders shared by the tests across the crate.
    use serde_json::{Value, json};

    pub(crate) fn character_json(id: i64, name: &str, status: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "status": status,
            "species": "Human",
            "type": "",
            "gender": "Male",
            "origin": {"name": "Earth (C-137)", "url": "https://rickandmortyapi.com/api/location/1"},
            "location": {"name": "Citadel of Ricks", "url": "https://rickandmortyapi.com/api/location/3"},
            "image": format!("https://rickandmortyapi.com/api/character/avatar/{id}.jpeg"),
            "episode": ["https://rickandmortyapi.com/api/episode/1"],
            "url": format!("https://rickandmortyapi.com/api/character/{id}"),
            "created": "2017-11-04T18:48:46.250Z"
        })
    }

    pub(crate) fn character(id: i64, name: &str) -> crate::models::Character {
        serde_json::from_value(character_json(id, name, "Alive"))
            .expect("💀 fixture character should decode")
    }

    pub(crate) fn envelope(results: Vec<Value>, next: Option<&str>) -> Value {
        json!({
            "info": {"count": 826, "pages": 42, "next": next, "prev": null},
            "results": results
        })
    }

    pub(crate) fn episode_json(id: i64, code: &str) -> Value {
        json!({
            "id": id,
            "name": format!("Episode {id}"),
            "air_date": "December 2, 2013",
            "episode": code,
            "characters": [],
            "url": format!("https://rickandmortyapi.com/api/episode/{id}"),
            "created": "2017-11-10T12:56:33.798Z"
        })
    }
}
