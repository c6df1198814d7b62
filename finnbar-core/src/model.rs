use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

/// Two-letter country code, stored lowercase (e.g. `de`, `us`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CountryCode(String);

impl CountryCode {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let code = raw.trim().to_ascii_lowercase();
        if code.len() == 2 && code.bytes().all(|b| b.is_ascii_lowercase()) {
            Ok(Self(code))
        } else {
            Err(ValidationError::InvalidCountryCode(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Uppercase form used for display.
    pub fn label(&self) -> String {
        self.0.to_ascii_uppercase()
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CountryCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CountryCode> for String {
    fn from(code: CountryCode) -> Self {
        code.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Country {
    pub code: CountryCode,
    pub name: String,
}

impl Country {
    /// `DE – Germany`
    pub fn label(&self) -> String {
        format!("{} – {}", self.code.label(), self.name)
    }
}

/// Which stores a stock check covers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StoreFilter {
    #[default]
    All,
    Store(String),
}

impl StoreFilter {
    pub fn matches(&self, store_id: &str) -> bool {
        match self {
            StoreFilter::All => true,
            StoreFilter::Store(code) => code == store_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRequest {
    pub country: CountryCode,
    pub store: StoreFilter,
    pub product_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreRecord {
    pub store_id: String,
    pub name: String,
    pub address: String,
    pub country_code: CountryCode,
    pub country: String,
}

/// Orders `Unknown` below any known quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StockQuantity {
    Unknown,
    Known(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probability {
    HighInStock,
    LowInStock,
    OutOfStock,
    Unknown,
}

impl Probability {
    /// Map the API's `messageType` onto a probability; anything unrecognised is `Unknown`.
    pub fn from_message_type(message_type: &str) -> Self {
        match message_type {
            "HIGH_IN_STOCK" => Probability::HighInStock,
            "LOW_IN_STOCK" => Probability::LowInStock,
            "OUT_OF_STOCK" => Probability::OutOfStock,
            _ => Probability::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Probability::HighInStock => "High in stock",
            Probability::LowInStock => "Low in stock",
            Probability::OutOfStock => "Out of stock",
            Probability::Unknown => "Unknown",
        }
    }
}

/// When a store last reported its stock, kept in the offset the API sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LastUpdated {
    At(DateTime<FixedOffset>),
    /// Not an RFC 3339 timestamp; shown as received.
    Raw(String),
}

impl LastUpdated {
    pub const FORMAT: &'static str = "%Y-%m-%d %H:%M";

    pub fn parse(raw: &str) -> Self {
        match DateTime::parse_from_rfc3339(raw) {
            Ok(at) => LastUpdated::At(at),
            Err(_) => LastUpdated::Raw(raw.to_string()),
        }
    }

    pub fn display(&self) -> String {
        match self {
            LastUpdated::At(at) => at.format(Self::FORMAT).to_string(),
            LastUpdated::Raw(raw) => raw.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityRecord {
    pub store_id: String,
    pub store_name: String,
    pub product_id: String,
    pub country_code: CountryCode,
    pub country: String,
    pub stock: StockQuantity,
    pub probability: Probability,
    pub last_updated: Option<LastUpdated>,
}

impl AvailabilityRecord {
    /// Out-of-stock always counts as zero, whatever quantity was reported.
    pub fn effective_stock(&self) -> StockQuantity {
        if self.probability == Probability::OutOfStock {
            StockQuantity::Known(0)
        } else {
            self.stock
        }
    }

    pub fn display_stock(&self) -> String {
        match self.effective_stock() {
            StockQuantity::Known(n) => n.to_string(),
            StockQuantity::Unknown => "?".to_string(),
        }
    }
}
