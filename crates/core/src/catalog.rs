//! Reference data: themes and presets.
//!
//! Both catalogs are fetched once at startup and then read-only. [`Catalog`]
//! is the immutable snapshot handed to the rest of the client;
//! [`Catalog::fallback`] is what it degrades to when the service cannot be
//! reached.

use serde::{Deserialize, Serialize};

use crate::request::DEFAULT_THEME;

// ---------------------------------------------------------------------------
// Themes
// ---------------------------------------------------------------------------

/// Colour palette of a theme, keyed by semantic slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    #[serde(rename = "bg", alias = "background")]
    pub background: String,
    pub text: String,
    pub water: String,
    pub parks: String,
    pub road_motorway: String,
    pub road_primary: String,
}

/// One entry of `GET /api/themes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    /// Identifier sent back in [`GenerationRequest::theme`](crate::request::GenerationRequest).
    #[serde(rename = "name")]
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "colors")]
    pub palette: Palette,
}

impl Theme {
    /// The built-in black and white theme.
    pub fn fallback() -> Self {
        Self {
            id: DEFAULT_THEME.to_string(),
            display_name: "Feature-Based Shading".to_string(),
            description: "Classic black & white with road hierarchy".to_string(),
            palette: Palette {
                background: "#FFFFFF".to_string(),
                text: "#000000".to_string(),
                water: "#C0C0C0".to_string(),
                parks: "#F0F0F0".to_string(),
                road_motorway: "#0A0A0A".to_string(),
                road_primary: "#1A1A1A".to_string(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Presets
// ---------------------------------------------------------------------------

/// Named poster size shortcut, in inches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSize {
    pub name: String,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DpiOption {
    pub name: String,
    pub value: u32,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatOption {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub description: String,
}

/// Bundle of feature toggles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub name: String,
    pub water: bool,
    pub parks: bool,
    pub buildings: bool,
    pub railways: bool,
}

/// Body of `GET /api/presets`. Missing sections are empty.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Presets {
    #[serde(default)]
    pub output_sizes: Vec<OutputSize>,
    #[serde(default)]
    pub dpi_options: Vec<DpiOption>,
    #[serde(default)]
    pub format_options: Vec<FormatOption>,
    #[serde(default)]
    pub feature_sets: Vec<FeatureSet>,
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Immutable reference-data snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    themes: Vec<Theme>,
    presets: Presets,
}

impl Catalog {
    /// Build a snapshot. An empty theme list is replaced by the built-in
    /// theme so the form always has something valid to offer.
    pub fn new(themes: Vec<Theme>, presets: Presets) -> Self {
        let themes = if themes.is_empty() {
            vec![Theme::fallback()]
        } else {
            themes
        };
        Self { themes, presets }
    }

    /// Snapshot used when neither catalog could be fetched.
    pub fn fallback() -> Self {
        Self::new(Vec::new(), Presets::default())
    }

    pub fn themes(&self) -> &[Theme] {
        &self.themes
    }

    pub fn presets(&self) -> &Presets {
        &self.presets
    }

    pub fn theme(&self, id: &str) -> Option<&Theme> {
        self.themes.iter().find(|t| t.id == id)
    }

    pub fn theme_ids(&self) -> Vec<&str> {
        self.themes.iter().map(|t| t.id.as_str()).collect()
    }

    pub fn output_size(&self, name: &str) -> Option<&OutputSize> {
        self.presets
            .output_sizes
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    pub fn feature_set(&self, name: &str) -> Option<&FeatureSet> {
        self.presets
            .feature_sets
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::fallback()
    }
}
