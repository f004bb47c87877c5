//! Raw catalog shapes as they appear in the bundled data file.
//!
//! Every field is optional. These structures mirror the loosely-structured
//! JSON bundle and are only ever consumed by the normalizer.
use super::{Catalog, CatalogError, Episode, Season};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// A scalar field that the bundle may store either as text or as a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawScalar {
    Text(String),
    Number(serde_json::Number),
}

impl RawScalar {
    /// Returns the textual form, or None if the value is an empty string.
    pub(crate) fn to_text(&self) -> Option<String> {
        match self {
            RawScalar::Text(s) if s.is_empty() => None,
            RawScalar::Text(s) => Some(s.clone()),
            RawScalar::Number(n) => Some(number_text(n)),
        }
    }
}

/// Renders whole floats without a fractional part, so `1.0` reads as `1`.
fn number_text(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        _ => n.to_string(),
    }
}

/// Decodes a field, treating a value of the wrong type like a missing one.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

/// Decodes a list field element by element. Elements of the wrong shape
/// become all-default entries; a non-list value counts as missing.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) => Ok(Some(
            items
                .into_iter()
                .map(|item| T::deserialize(item).unwrap_or_default())
                .collect(),
        )),
        _ => Ok(None),
    }
}

impl From<&str> for RawScalar {
    fn from(value: &str) -> Self {
        RawScalar::Text(value.to_string())
    }
}

/// The top-level bundle object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawCatalog {
    #[serde(deserialize_with = "lenient_list")]
    pub seasons: Option<Vec<RawSeason>>,
}

/// A season as found in the bundle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawSeason {
    #[serde(deserialize_with = "lenient")]
    pub id: Option<RawScalar>,
    #[serde(deserialize_with = "lenient")]
    pub title: Option<String>,
    /// Name of the cover image in the season media table
    #[serde(deserialize_with = "lenient")]
    pub image: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub avg_color: Option<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub episodes: Option<Vec<RawEpisode>>,
}

/// An episode as found in the bundle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawEpisode {
    #[serde(deserialize_with = "lenient")]
    pub id: Option<RawScalar>,
    #[serde(deserialize_with = "lenient")]
    pub episode_number: Option<u32>,
    #[serde(deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub duration: Option<RawScalar>,
    #[serde(deserialize_with = "lenient")]
    pub synopsis: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub air_date: Option<String>,
    /// Name of the still image in the episode media table
    #[serde(deserialize_with = "lenient")]
    pub image: Option<String>,
}

impl RawCatalog {
    /// Parses a bundle from JSON text.
    ///
    /// Text that is not JSON, or a top level that is not an object, yields
    /// an empty catalog; the failure is logged but never returned. Below the
    /// top level, values of the wrong type are dropped one field at a time
    /// and take their defaults during normalization.
    pub fn from_json(text: &str) -> Self {
        match serde_json::from_str::<Option<RawCatalog>>(text) {
            Ok(raw) => raw.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "Catalog bundle is malformed, using an empty catalog");
                Self::default()
            }
        }
    }

    /// Reads and parses a bundle file.
    ///
    /// Only I/O failures are reported as errors; content problems are
    /// handled as in [`RawCatalog::from_json`].
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let content = fs::read_to_string(path).map_err(|e| CatalogError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(Self::from_json(&content))
    }
}

impl From<&Catalog> for RawCatalog {
    fn from(catalog: &Catalog) -> Self {
        RawCatalog {
            seasons: Some(catalog.seasons.iter().map(RawSeason::from).collect()),
        }
    }
}

impl From<&Season> for RawSeason {
    fn from(season: &Season) -> Self {
        RawSeason {
            id: Some(season.id.as_str().into()),
            title: Some(season.title.clone()),
            image: season.image.clone(),
            avg_color: Some(season.avg_color.clone()),
            episodes: Some(season.episodes.iter().map(RawEpisode::from).collect()),
        }
    }
}

impl From<&Episode> for RawEpisode {
    fn from(episode: &Episode) -> Self {
        RawEpisode {
            id: Some(episode.id.as_str().into()),
            episode_number: Some(episode.episode_number),
            title: Some(episode.title.clone()),
            duration: Some(episode.duration.as_str().into()),
            synopsis: Some(episode.synopsis.clone()),
            air_date: Some(episode.air_date.clone()),
            image: episode.image.clone(),
        }
    }
}
