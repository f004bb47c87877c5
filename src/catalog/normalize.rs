//! Catalog normalization
//!
//! Turns a raw bundle into a render-ready [`Catalog`]: every field defaulted,
//! every image name resolved to a media handle, input order preserved.

use super::raw::{RawCatalog, RawEpisode, RawScalar, RawSeason};
use super::{Catalog, Episode, Season};
use crate::media::MediaTable;

/// Placeholder for a missing season or episode title
pub const UNTITLED: &str = "Sin título";
/// Placeholder for a missing duration or air date
pub const UNKNOWN: &str = "Desconocida";
/// Placeholder for a missing synopsis
pub const NO_SYNOPSIS: &str = "Sin sinopsis";
/// Accent colour for seasons that don't carry one
pub const DEFAULT_AVG_COLOR: &str = "#000";

/// Normalizes a raw catalog into a render-ready one.
///
/// An absent catalog, or one without a `seasons` list, produces an empty
/// catalog. This never fails.
pub fn normalize(raw: Option<&RawCatalog>, media: &MediaTable) -> Catalog {
    let seasons = raw
        .and_then(|r| r.seasons.as_deref())
        .unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(index, season)| normalize_season(index, season, media))
        .collect();

    Catalog { seasons }
}

fn normalize_season(index: usize, raw: &RawSeason, media: &MediaTable) -> Season {
    let episodes = raw
        .episodes
        .as_deref()
        .unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(position, episode)| normalize_episode(position, episode, media))
        .collect();

    Season {
        id: scalar_or(raw.id.as_ref(), || index.to_string()),
        title: text_or(raw.title.as_deref(), UNTITLED),
        image: raw.image.clone(),
        cover_image_ref: media.season_image(raw.image.as_deref()),
        avg_color: text_or(raw.avg_color.as_deref(), DEFAULT_AVG_COLOR),
        episodes,
    }
}

fn normalize_episode(position: usize, raw: &RawEpisode, media: &MediaTable) -> Episode {
    // Falls back to the 1-based position; 0 is treated like a missing number.
    let episode_number = raw
        .episode_number
        .filter(|n| *n > 0)
        .unwrap_or_else(|| u32::try_from(position + 1).unwrap_or(u32::MAX));

    Episode {
        id: scalar_or(raw.id.as_ref(), || position.to_string()),
        episode_number,
        title: text_or(raw.title.as_deref(), UNTITLED),
        duration: scalar_or(raw.duration.as_ref(), || UNKNOWN.to_string()),
        synopsis: text_or(raw.synopsis.as_deref(), NO_SYNOPSIS),
        air_date: text_or(raw.air_date.as_deref(), UNKNOWN),
        image: raw.image.clone(),
        image_ref: media.episode_image(raw.image.as_deref()),
    }
}

fn text_or(value: Option<&str>, default: &str) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => default.to_string(),
    }
}

fn scalar_or(value: Option<&RawScalar>, default: impl FnOnce() -> String) -> String {
    value.and_then(RawScalar::to_text).unwrap_or_else(default)
}
