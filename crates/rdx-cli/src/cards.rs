//! 🃏 Cards: five ways to draw a character in a terminal.
//!
//! 🎬 *[the same Rick, five outfits. none of them are a lab coat. all of them are text.]*
//!
//! Picked by [`CardVariant`] on the command line (`--card portal`, or `--card 2`, the
//! numeric keys are kept as aliases). The match in [`render`] is exhaustive, so a
//! sixth variant doesn't compile until somebody draws it. 🦆

use clap::ValueEnum;
use rdx::models::{Character, Episode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub(crate) enum CardVariant {
    #[default]
    #[value(alias = "1")]
    Classic,
    #[value(alias = "2")]
    Portal,
    #[value(alias = "3")]
    Wanted,
    #[value(alias = "4")]
    Hologram,
    #[value(alias = "5")]
    Polaroid,
}

/// 🎨 Draw one character in the chosen style.
pub(crate) fn render(variant: CardVariant, character: &Character) -> String {
    match variant {
        CardVariant::Classic => classic(character),
        CardVariant::Portal => portal(character),
        CardVariant::Wanted => wanted(character),
        CardVariant::Hologram => hologram(character),
        CardVariant::Polaroid => polaroid(character),
    }
}

fn status_badge(status: &str) -> &'static str {
    match status.to_ascii_lowercase().as_str() {
        "alive" => "💚",
        "dead" => "💀",
        _ => "❔",
    }
}

fn classic(character: &Character) -> String {
    format!(
        "#{} {}\n{} {} · {} · {}\n📍 {}\n🌍 {}",
        character.id,
        character.name,
        status_badge(&character.status),
        character.status,
        character.species,
        character.gender,
        character.location.name,
        character.origin.name,
    )
}

fn portal(character: &Character) -> String {
    format!(
        "🌀 ( {} ) 🌀\nfrom {}, last seen at {}",
        character.name, character.origin.name, character.location.name,
    )
}

fn wanted(character: &Character) -> String {
    let name = character.name.to_uppercase();
    let width = name.chars().count().max(14) + 4;
    let rule = "═".repeat(width);
    let line = |text: &str| format!("║{text:^width$}║");
    [
        format!("╔{rule}╗"),
        line("WANTED"),
        line(&name),
        line(&format!("{} {}", status_badge(&character.status), character.species)),
        line(&format!("{} appearances", character.episode.len())),
        format!("╚{rule}╝"),
    ]
    .join("\n")
}

fn hologram(character: &Character) -> String {
    let kind = if character.kind.is_empty() {
        String::new()
    } else {
        format!(" [type: {}]", character.kind)
    };
    format!(
        "▓▒░ {} ░▒▓\n[status: {}] [species: {}]{kind}",
        character.name.to_uppercase(),
        character.status.to_uppercase(),
        character.species,
    )
}

fn polaroid(character: &Character) -> String {
    let caption = format!("{} {}", status_badge(&character.status), character.name);
    let width = caption.chars().count().max(character.image.chars().count()) + 2;
    let blank = " ".repeat(width);
    [
        format!("┌{}┐", "─".repeat(width)),
        format!("│{blank}│"),
        format!("│{:^width$}│", character.image),
        format!("│{blank}│"),
        format!("│{caption:^width$}│"),
        format!("└{}┘", "─".repeat(width)),
    ]
    .join("\n")
}

/// 📺 One line per episode: code, title, air date.
pub(crate) fn episode_line(episode: &Episode) -> String {
    format!("{}  {}  ({})", episode.episode, episode.name, episode.air_date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdx::models::LocationRef;

    fn rick() -> Character {
        Character {
            id: 1,
            name: "Rick Sanchez".into(),
            status: "Alive".into(),
            species: "Human".into(),
            kind: String::new(),
            gender: "Male".into(),
            origin: LocationRef {
                name: "Earth (C-137)".into(),
                url: String::new(),
            },
            location: LocationRef {
                name: "Citadel of Ricks".into(),
                url: String::new(),
            },
            image: "https://rickandmortyapi.com/api/character/avatar/1.jpeg".into(),
            episode: vec!["https://rickandmortyapi.com/api/episode/1".into()],
            url: String::new(),
            created: String::new(),
        }
    }

    #[test]
    fn the_one_where_every_card_mentions_who_it_is() {
        for variant in CardVariant::value_variants() {
            let card = render(*variant, &rick());
            assert!(
                card.to_lowercase().contains("rick sanchez"),
                "{variant:?} forgot the name:\n{card}"
            );
        }
    }

    #[test]
    fn the_one_where_numeric_keys_still_pick_a_card() {
        assert_eq!(CardVariant::from_str("2", true), Ok(CardVariant::Portal));
        assert_eq!(CardVariant::from_str("polaroid", true), Ok(CardVariant::Polaroid));
        assert!(CardVariant::from_str("6", true).is_err());
    }

    #[test]
    fn the_one_where_the_wanted_poster_has_straight_edges() {
        let poster = wanted(&rick());
        let widths: Vec<_> = poster.lines().map(|line| line.chars().count()).collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]), "ragged poster: {widths:?}");
    }
}
