//! Deck, slide and asset records.
//!
//! These are both the sidecar format (`.deck.json`) and the payload exchanged
//! with the remote deck endpoint, so field names follow the server's wire
//! names. The camelCase names are accepted as aliases when reading.

use crate::stable_id::StableId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Theme applied to new slides when the deck has no slides to inherit from.
pub const DEFAULT_THEME: &str = "bebas";
/// Color variant applied alongside [`DEFAULT_THEME`].
pub const DEFAULT_COLOR_VARIANT: u32 = 1;
/// Content of the single slide in a freshly created deck.
pub const NEW_SLIDE_CONTENT: &str = "# New Slide";

/// One slide as known to the local or remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideRecord {
    /// Server-assigned id (0 = not yet persisted)
    #[serde(default)]
    pub id: u64,

    /// Client-generated identity, never reassigned
    #[serde(rename = "uuid", alias = "stableId", default)]
    pub stable_id: StableId,

    /// 1-based ordinal within the deck
    #[serde(default)]
    pub position: u32,

    /// Exact (trimmed) markdown for this slide
    #[serde(rename = "markdown", default, deserialize_with = "nullable")]
    pub content: String,

    #[serde(rename = "presenter_notes", alias = "notes", default, deserialize_with = "nullable")]
    pub notes: String,

    #[serde(rename = "theme_name", alias = "theme", default, deserialize_with = "nullable")]
    pub theme: String,

    #[serde(rename = "color_variation", alias = "colorVariant", default, deserialize_with = "nullable")]
    pub color_variant: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
}

/// Presentation attributes a new slide inherits from its deck.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideStyle {
    pub theme: String,
    pub color_variant: u32,
    pub layout: Option<String>,
}

impl Default for SlideStyle {
    fn default() -> Self {
        Self {
            theme: DEFAULT_THEME.to_string(),
            color_variant: DEFAULT_COLOR_VARIANT,
            layout: None,
        }
    }
}

impl SlideRecord {
    /// Create a slide with fresh identity and no server id.
    pub fn new(content: impl Into<String>, position: u32, style: SlideStyle) -> Self {
        Self {
            id: 0,
            stable_id: StableId::generate(),
            position,
            content: content.into(),
            notes: String::new(),
            theme: style.theme,
            color_variant: style.color_variant,
            layout: style.layout,
        }
    }

    /// The presentation attributes of this slide.
    pub fn style(&self) -> SlideStyle {
        SlideStyle {
            theme: self.theme.clone(),
            color_variant: self.color_variant,
            layout: self.layout.clone(),
        }
    }
}

/// A remote asset file attached to a deck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    #[serde(default)]
    pub id: u64,

    /// Unique key within the deck
    pub filename: String,

    /// Public URL of the uploaded file
    #[serde(default, deserialize_with = "nullable")]
    pub url: String,

    #[serde(default, with = "timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl AssetRecord {
    /// Record for a freshly uploaded file.
    pub fn uploaded(filename: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: 0,
            filename: filename.into(),
            url: url.into(),
            updated_at: None,
        }
    }
}

/// The deck aggregate: identity, descriptive fields, slides and assets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckRecord {
    /// Server-assigned id (0 = not yet created remotely)
    #[serde(default)]
    pub id: u64,

    #[serde(default)]
    pub uuid: StableId,

    #[serde(default, deserialize_with = "nullable")]
    pub slug: String,

    #[serde(default, deserialize_with = "nullable")]
    pub title: String,

    #[serde(default, deserialize_with = "nullable")]
    pub description: String,

    #[serde(default, deserialize_with = "nullable")]
    pub is_public: bool,

    /// Last modification time as reported by the server
    #[serde(default, with = "timestamp")]
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(rename = "slides_attributes", alias = "slides", default, deserialize_with = "nullable")]
    pub slides: Vec<SlideRecord>,

    #[serde(rename = "assets_attributes", alias = "assets", default, deserialize_with = "nullable")]
    pub assets: Vec<AssetRecord>,
}

impl DeckRecord {
    /// A not-yet-created deck with a client-assigned uuid and one placeholder slide.
    pub fn draft(title: impl Into<String>, description: impl Into<String>, is_public: bool) -> Self {
        Self {
            id: 0,
            uuid: StableId::generate(),
            slug: String::new(),
            title: title.into(),
            description: description.into(),
            is_public,
            updated_at: None,
            slides: vec![SlideRecord::new(NEW_SLIDE_CONTENT, 1, SlideStyle::default())],
            assets: Vec::new(),
        }
    }

    /// Whether the remote store has assigned this deck an id.
    pub fn is_persisted(&self) -> bool {
        self.id != 0
    }

    /// Restore the ordering invariants on a payload received from elsewhere.
    ///
    /// Slides are sorted by position (stable, so ties keep payload order) and
    /// duplicate asset filenames collapse to their first occurrence.
    pub fn normalize(mut self) -> Self {
        self.slides.sort_by_key(|slide| slide.position);
        let mut seen = std::collections::HashSet::new();
        self.assets.retain(|asset| seen.insert(asset.filename.clone()));
        self
    }
}

/// `{"deck": ...}` wrapper used by the create and update endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckPayload {
    pub deck: DeckRecord,
}

/// `{"decks": [...]}` response of the list endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeckList {
    #[serde(default)]
    pub decks: Vec<DeckRecord>,
}

/// Treat an explicit JSON `null` like a missing field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Server timestamps: `YYYY-MM-DDTHH:MM:SS.mmmZ`, with `""`/`null` meaning unset.
///
/// An unparseable value is treated as unset so it sorts before every real
/// timestamp at the gate.
pub(crate) mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

    pub fn serialize<S: Serializer>(value: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(time) => s.serialize_str(&time.format(FORMAT).to_string()),
            None => s.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        match DateTime::parse_from_rfc3339(raw) {
            Ok(time) => Ok(Some(time.with_timezone(&Utc))),
            Err(e) => {
                tracing::warn!("Ignoring unparseable timestamp {:?}: {}", raw, e);
                Ok(None)
            }
        }
    }
}
