//! Generation request validation and serialization.
//!
//! [`PosterForm`] holds raw form values as the presentation layer collects
//! them. [`PosterForm::build`] parses and validates them into a
//! [`GenerationRequest`], the only type the client will submit. Malformed
//! input never reaches the network.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, FeatureSet, OutputSize};
use crate::error::CoreError;
use crate::types::OutputFormat;

// ---------------------------------------------------------------------------
// Limits and defaults
// ---------------------------------------------------------------------------

/// Smallest map radius in meters.
pub const MIN_DISTANCE_M: u32 = 4_000;
/// Largest map radius in meters.
pub const MAX_DISTANCE_M: u32 = 30_000;
/// Default map radius in meters.
pub const DEFAULT_DISTANCE_M: u32 = 29_000;

/// Smallest poster side in inches.
pub const MIN_DIMENSION_IN: f64 = 6.0;
/// Largest poster side in inches.
pub const MAX_DIMENSION_IN: f64 = 48.0;
pub const DEFAULT_WIDTH_IN: f64 = 12.0;
pub const DEFAULT_HEIGHT_IN: f64 = 16.0;

/// Accepted DPI values.
pub const VALID_DPI: &[u32] = &[150, 300, 600];
pub const DEFAULT_DPI: u32 = 300;

/// Theme used when the form does not pick one.
pub const DEFAULT_THEME: &str = "feature_based";

/// Palette slots that may be overridden through `custom_colors`.
pub const COLOR_SLOTS: &[&str] = &[
    "bg",
    "text",
    "water",
    "parks",
    "road_motorway",
    "road_primary",
    "building",
    "railway",
    "gradient_color",
];

// ---------------------------------------------------------------------------
// GenerationRequest
// ---------------------------------------------------------------------------

/// A validated request, serialized as the body of `POST /api/generate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub city: String,
    pub country: String,
    pub theme: String,
    pub distance: u32,
    pub width: f64,
    pub height: f64,
    pub dpi: u32,
    pub format: OutputFormat,
    pub show_water: bool,
    pub show_parks: bool,
    pub show_buildings: bool,
    pub show_railways: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_attribution: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_colors: Option<BTreeMap<String, String>>,
}

impl GenerationRequest {
    /// A request with default output settings for the given location.
    pub fn new(city: impl Into<String>, country: impl Into<String>, theme: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            country: country.into(),
            theme: theme.into(),
            distance: DEFAULT_DISTANCE_M,
            width: DEFAULT_WIDTH_IN,
            height: DEFAULT_HEIGHT_IN,
            dpi: DEFAULT_DPI,
            format: OutputFormat::Png,
            show_water: true,
            show_parks: true,
            show_buildings: false,
            show_railways: false,
            show_attribution: None,
            custom_colors: None,
        }
    }

    /// Check every field against the limits and the loaded theme catalog.
    pub fn validate(&self, catalog: &Catalog) -> Result<(), CoreError> {
        validate_required("city", &self.city)?;
        validate_required("country", &self.country)?;
        validate_theme(&self.theme, catalog)?;
        validate_distance(self.distance)?;
        validate_dimension("width", self.width)?;
        validate_dimension("height", self.height)?;
        validate_dpi(self.dpi)?;
        if let Some(colors) = &self.custom_colors {
            validate_custom_colors(colors)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PosterForm (raw input)
// ---------------------------------------------------------------------------

/// Raw form values. Numeric fields are kept as text until [`build`](Self::build).
#[derive(Debug, Clone, PartialEq)]
pub struct PosterForm {
    pub city: String,
    pub country: String,
    pub theme: String,
    pub distance: String,
    pub width: String,
    pub height: String,
    pub dpi: String,
    pub format: String,
    pub show_water: bool,
    pub show_parks: bool,
    pub show_buildings: bool,
    pub show_railways: bool,
    pub show_attribution: Option<bool>,
    pub custom_colors: BTreeMap<String, String>,
}

impl Default for PosterForm {
    fn default() -> Self {
        Self {
            city: String::new(),
            country: String::new(),
            theme: DEFAULT_THEME.to_string(),
            distance: DEFAULT_DISTANCE_M.to_string(),
            width: DEFAULT_WIDTH_IN.to_string(),
            height: DEFAULT_HEIGHT_IN.to_string(),
            dpi: DEFAULT_DPI.to_string(),
            format: OutputFormat::Png.to_string(),
            show_water: true,
            show_parks: true,
            show_buildings: false,
            show_railways: false,
            show_attribution: None,
            custom_colors: BTreeMap::new(),
        }
    }
}

impl PosterForm {
    /// Copy a size preset into the width/height fields.
    pub fn apply_output_size(&mut self, size: &OutputSize) {
        self.width = size.width.to_string();
        self.height = size.height.to_string();
    }

    /// Copy a feature bundle into the toggle fields.
    pub fn apply_feature_set(&mut self, set: &FeatureSet) {
        self.show_water = set.water;
        self.show_parks = set.parks;
        self.show_buildings = set.buildings;
        self.show_railways = set.railways;
    }

    /// Parse and validate into a [`GenerationRequest`].
    ///
    /// Text fields are trimmed. The format is parsed leniently (unknown
    /// values become PNG); every other field must be well formed.
    pub fn build(&self, catalog: &Catalog) -> Result<GenerationRequest, CoreError> {
        let request = GenerationRequest {
            city: self.city.trim().to_string(),
            country: self.country.trim().to_string(),
            theme: self.theme.trim().to_string(),
            distance: parse_positive_int("distance", &self.distance)?,
            width: parse_positive_number("width", &self.width)?,
            height: parse_positive_number("height", &self.height)?,
            dpi: parse_positive_int("dpi", &self.dpi)?,
            format: OutputFormat::parse_lenient(&self.format),
            show_water: self.show_water,
            show_parks: self.show_parks,
            show_buildings: self.show_buildings,
            show_railways: self.show_railways,
            show_attribution: self.show_attribution,
            custom_colors: (!self.custom_colors.is_empty()).then(|| self.custom_colors.clone()),
        };
        request.validate(catalog)?;
        Ok(request)
    }
}

// ---------------------------------------------------------------------------
// Field validation
// ---------------------------------------------------------------------------

/// Reject empty or whitespace-only text.
pub fn validate_required(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Theme must be one of the loaded catalog's identifiers.
pub fn validate_theme(theme: &str, catalog: &Catalog) -> Result<(), CoreError> {
    if catalog.theme(theme).is_some() {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Unknown theme '{theme}'. Must be one of: {}",
            catalog.theme_ids().join(", ")
        )))
    }
}

pub fn validate_distance(distance: u32) -> Result<(), CoreError> {
    if (MIN_DISTANCE_M..=MAX_DISTANCE_M).contains(&distance) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "distance must be between {MIN_DISTANCE_M} and {MAX_DISTANCE_M} meters, got {distance}"
        )))
    }
}

pub fn validate_dimension(field: &str, inches: f64) -> Result<(), CoreError> {
    if inches.is_finite() && (MIN_DIMENSION_IN..=MAX_DIMENSION_IN).contains(&inches) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "{field} must be between {MIN_DIMENSION_IN} and {MAX_DIMENSION_IN} inches, got {inches}"
        )))
    }
}

pub fn validate_dpi(dpi: u32) -> Result<(), CoreError> {
    if VALID_DPI.contains(&dpi) {
        Ok(())
    } else {
        let allowed: Vec<String> = VALID_DPI.iter().map(u32::to_string).collect();
        Err(CoreError::Validation(format!(
            "Invalid dpi {dpi}. Must be one of: {}",
            allowed.join(", ")
        )))
    }
}

/// Override slots must be known and values must be `#RRGGBB`.
pub fn validate_custom_colors(colors: &BTreeMap<String, String>) -> Result<(), CoreError> {
    for (slot, value) in colors {
        if !COLOR_SLOTS.contains(&slot.as_str()) {
            return Err(CoreError::Validation(format!(
                "Unknown color slot '{slot}'. Must be one of: {}",
                COLOR_SLOTS.join(", ")
            )));
        }
        if !is_hex_color(value) {
            return Err(CoreError::Validation(format!(
                "Color for '{slot}' must look like #RRGGBB, got '{value}'"
            )));
        }
    }
    Ok(())
}

fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

fn parse_positive_int(field: &str, raw: &str) -> Result<u32, CoreError> {
    match raw.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(CoreError::Validation(format!(
            "{field} must be a positive whole number, got '{raw}'"
        ))),
    }
}

fn parse_positive_number(field: &str, raw: &str) -> Result<f64, CoreError> {
    match raw.trim().parse::<f64>() {
        Ok(n) if n.is_finite() && n > 0.0 => Ok(n),
        _ => Err(CoreError::Validation(format!(
            "{field} must be a positive number, got '{raw}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn venice() -> PosterForm {
        PosterForm {
            city: "Venice".into(),
            country: "Italy".into(),
            distance: "15000".into(),
            ..Default::default()
        }
    }

    #[test]
    fn builds_valid_request_with_defaults() {
        let req = venice().build(&Catalog::fallback()).unwrap();
        assert_eq!(req.city, "Venice");
        assert_eq!(req.theme, "feature_based");
        assert_eq!(req.distance, 15_000);
        assert_eq!(req.width, 12.0);
        assert_eq!(req.dpi, 300);
        assert_eq!(req.format, OutputFormat::Png);
        assert!(req.custom_colors.is_none());
    }

    #[test]
    fn rejects_blank_city() {
        let form = PosterForm {
            city: "   ".into(),
            ..venice()
        };
        assert_matches!(form.build(&Catalog::fallback()), Err(CoreError::Validation(m)) if m.contains("city"));
    }

    #[test]
    fn rejects_malformed_numbers() {
        for (field, form) in [
            ("distance", PosterForm { distance: "far".into(), ..venice() }),
            ("width", PosterForm { width: "-3".into(), ..venice() }),
            ("height", PosterForm { height: "NaN".into(), ..venice() }),
            ("dpi", PosterForm { dpi: "0".into(), ..venice() }),
        ] {
            assert_matches!(
                form.build(&Catalog::fallback()),
                Err(CoreError::Validation(m)) if m.contains(field),
                "field {field}"
            );
        }
    }

    #[test]
    fn distance_bounds_are_inclusive() {
        assert!(validate_distance(MIN_DISTANCE_M).is_ok());
        assert!(validate_distance(MAX_DISTANCE_M).is_ok());
        assert!(validate_distance(MIN_DISTANCE_M - 1).is_err());
        assert!(validate_distance(MAX_DISTANCE_M + 1).is_err());
    }

    #[test]
    fn dimension_bounds() {
        assert!(validate_dimension("width", 6.0).is_ok());
        assert!(validate_dimension("width", 48.0).is_ok());
        assert!(validate_dimension("width", 5.5).is_err());
        assert!(validate_dimension("height", 48.5).is_err());
    }

    #[test]
    fn dpi_must_be_enumerated() {
        assert!(validate_dpi(600).is_ok());
        assert_matches!(validate_dpi(200), Err(CoreError::Validation(m)) if m.contains("150, 300, 600"));
    }

    #[test]
    fn unknown_theme_rejected() {
        let form = PosterForm {
            theme: "neon".into(),
            ..venice()
        };
        assert_matches!(form.build(&Catalog::fallback()), Err(CoreError::Validation(m)) if m.contains("neon"));
    }

    #[test]
    fn unknown_format_defaults_to_png() {
        let form = PosterForm {
            format: "webp".into(),
            ..venice()
        };
        assert_eq!(form.build(&Catalog::fallback()).unwrap().format, OutputFormat::Png);
    }

    #[test]
    fn custom_colors_validated() {
        let mut form = venice();
        form.custom_colors.insert("water".into(), "#1A2B3C".into());
        assert!(form.build(&Catalog::fallback()).is_ok());

        form.custom_colors.insert("water".into(), "blue".into());
        assert!(form.build(&Catalog::fallback()).is_err());

        form.custom_colors.clear();
        form.custom_colors.insert("sky".into(), "#FFFFFF".into());
        assert!(form.build(&Catalog::fallback()).is_err());
    }

    #[test]
    fn presets_apply_to_form() {
        let mut form = venice();
        form.apply_output_size(&OutputSize {
            name: "Square (12x12)".into(),
            width: 12.0,
            height: 12.0,
        });
        form.apply_feature_set(&FeatureSet {
            name: "Complete".into(),
            water: true,
            parks: true,
            buildings: true,
            railways: true,
        });
        let req = form.build(&Catalog::fallback()).unwrap();
        assert_eq!(req.height, 12.0);
        assert!(req.show_buildings && req.show_railways);
    }

    #[test]
    fn payload_uses_wire_field_names() {
        let req = venice().build(&Catalog::fallback()).unwrap();
        let payload = serde_json::to_value(&req).unwrap();
        assert_eq!(payload["city"], "Venice");
        assert_eq!(payload["distance"], 15_000);
        assert_eq!(payload["format"], "png");
        assert_eq!(payload["show_water"], true);
        assert!(payload.get("show_attribution").is_none());
        assert!(payload.get("custom_colors").is_none());
    }
}
