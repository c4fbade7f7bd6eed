use serde::{Deserialize, Serialize};

use crate::{ProviderId, Symbol, UtcDateTime, ValidationError};

/// Price fields every quote adapter must extract; parsing fails closed when any is missing.
///
/// `day_low <= current_price <= day_high` is not checked: upstream data is untrusted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuoteFields {
    pub current_price: f64,
    pub day_high: f64,
    pub day_low: f64,
    pub previous_close: f64,
    pub volume: u64,
    pub change_percent: f64,
}

impl QuoteFields {
    pub fn new(
        current_price: f64,
        day_high: f64,
        day_low: f64,
        previous_close: f64,
        volume: u64,
        change_percent: f64,
    ) -> Result<Self, ValidationError> {
        validate_positive("current_price", current_price)?;
        validate_non_negative("day_high", day_high)?;
        validate_non_negative("day_low", day_low)?;
        validate_non_negative("previous_close", previous_close)?;
        if !change_percent.is_finite() {
            return Err(ValidationError::NonFiniteValue {
                field: "change_percent",
            });
        }

        Ok(Self {
            current_price,
            day_high,
            day_low,
            previous_close,
            volume,
            change_percent,
        })
    }

    /// Percent change derived from price and previous close; 0 when the close is unknown.
    pub fn derive_change_percent(current_price: f64, previous_close: f64) -> f64 {
        if previous_close > 0.0 {
            (current_price - previous_close) / previous_close * 100.0
        } else {
            0.0
        }
    }
}

/// Canonical quote with provenance attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: Symbol,
    pub current_price: f64,
    pub day_high: f64,
    pub day_low: f64,
    pub previous_close: f64,
    pub volume: u64,
    pub change_percent: f64,
    pub source: ProviderId,
    pub synthetic: bool,
    pub fetched_at: UtcDateTime,
}

impl Quote {
    pub fn from_fields(
        symbol: Symbol,
        fields: QuoteFields,
        source: ProviderId,
        synthetic: bool,
        fetched_at: UtcDateTime,
    ) -> Self {
        Self {
            symbol,
            current_price: fields.current_price,
            day_high: fields.day_high,
            day_low: fields.day_low,
            previous_close: fields.previous_close,
            volume: fields.volume,
            change_percent: fields.change_percent,
            source,
            synthetic,
            fetched_at,
        }
    }

    pub fn fields(&self) -> QuoteFields {
        QuoteFields {
            current_price: self.current_price,
            day_high: self.day_high,
            day_low: self.day_low,
            previous_close: self.previous_close,
            volume: self.volume,
            change_percent: self.change_percent,
        }
    }
}

fn validate_positive(field: &'static str, value: f64) -> Result<(), ValidationError> {
    validate_non_negative(field, value)?;
    if value == 0.0 {
        return Err(ValidationError::NonPositiveValue { field });
    }
    Ok(())
}

fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}
