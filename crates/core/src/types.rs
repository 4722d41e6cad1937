use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier assigned by the remote service on submission.
pub type JobId = String;

/// Progress percentage, clamped to `0..=100` on ingestion.
pub type Percent = u8;

/// Output format requested by the user.
///
/// `Both` asks the service for a PNG and an SVG of the same poster.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    Svg,
    Both,
}

impl OutputFormat {
    /// Parse a format name leniently. Unknown values resolve to `Png`.
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "svg" => Self::Svg,
            "both" => Self::Both,
            _ => Self::Png,
        }
    }

    /// File extension for a single-file format. `Both` has none of its own
    /// and falls back to `png`.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Png | Self::Both => "png",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Svg => "svg",
            Self::Both => "both",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clamp a raw progress value reported by the service into `0..=100`.
pub fn clamp_percent(raw: i64) -> Percent {
    raw.clamp(0, 100) as Percent
}
