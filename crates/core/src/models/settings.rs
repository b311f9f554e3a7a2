use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Engine configuration.
///
/// Every field has a default, so a partial JSON document is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// The currency all totals are rendered in (e.g., "USD", "EUR", "SGD").
    pub display_currency: String,

    /// Maximum number of points kept in the value series (most recent win).
    pub series_point_cap: usize,

    /// A historical price more than this factor above, or below its
    /// reciprocal, the last accepted price is discarded as a bad tick.
    pub bad_tick_ratio: f64,

    /// Number of holdings returned in the top-mover ranking.
    pub top_movers: usize,

    /// Number of positions returned in the allocation breakdown.
    pub allocation_slices: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            display_currency: "USD".to_string(),
            series_point_cap: 520,
            bad_tick_ratio: 5.0,
            top_movers: 5,
            allocation_slices: 10,
        }
    }
}

impl Settings {
    /// Parse and validate settings from JSON. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let mut settings: Settings = serde_json::from_str(json)?;
        settings.display_currency = normalize_currency_code(&settings.display_currency)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, CoreError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize settings: {e}")))
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        normalize_currency_code(&self.display_currency)?;
        if self.series_point_cap == 0 {
            return Err(CoreError::ValidationError(
                "series_point_cap must be at least 1".into(),
            ));
        }
        if !self.bad_tick_ratio.is_finite() || self.bad_tick_ratio <= 1.0 {
            return Err(CoreError::ValidationError(format!(
                "bad_tick_ratio must be a finite number greater than 1 (got {})",
                self.bad_tick_ratio
            )));
        }
        if self.top_movers == 0 || self.allocation_slices == 0 {
            return Err(CoreError::ValidationError(
                "top_movers and allocation_slices must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Trim and upper-case a currency code, rejecting anything that is not
/// exactly three ASCII letters.
pub fn normalize_currency_code(code: &str) -> Result<String, CoreError> {
    let trimmed = code.trim().to_uppercase();
    if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(CoreError::ValidationError(format!(
            "Invalid currency code '{code}': must be exactly 3 ASCII letters (e.g., USD, EUR, SGD)"
        )));
    }
    Ok(trimmed)
}
