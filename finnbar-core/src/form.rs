//! The three user-editable inputs and their validation.

use crate::{
    error::ValidationError,
    model::{CountryCode, LookupRequest, StoreFilter},
};

/// Split raw text into product IDs.
///
/// Tokens are comma-separated and trimmed; empty tokens are dropped. Dots are
/// removed so printed article numbers like `306.043.67` work as typed.
pub fn parse_product_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|token| token.trim().replace('.', ""))
        .filter(|token| !token.is_empty())
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct InputForm {
    supported: Vec<CountryCode>,
    country: Option<String>,
    store: Option<String>,
    product_text: String,
}

impl InputForm {
    pub fn new(supported: impl IntoIterator<Item = CountryCode>) -> Self {
        Self { supported: supported.into_iter().collect(), ..Self::default() }
    }

    pub fn set_country(&mut self, code: impl Into<String>) {
        self.country = Some(code.into());
    }

    pub fn clear_country(&mut self) {
        self.country = None;
    }

    /// `None` means all stores.
    pub fn set_store(&mut self, code: Option<String>) {
        self.store = code;
    }

    pub fn set_product_ids(&mut self, raw: impl Into<String>) {
        self.product_text = raw.into();
    }

    pub fn reset_products(&mut self) {
        self.product_text.clear();
    }

    pub fn product_text(&self) -> &str {
        &self.product_text
    }

    /// Validate the country alone; used by the store-browsing path.
    pub fn build_store_query(&self) -> Result<CountryCode, ValidationError> {
        let raw = self.country.as_deref().ok_or(ValidationError::MissingCountry)?;
        let code = CountryCode::parse(raw)?;
        if !self.supported.contains(&code) {
            return Err(ValidationError::UnsupportedCountry(code.label()));
        }
        Ok(code)
    }

    pub fn build_request(&self) -> Result<LookupRequest, ValidationError> {
        let country = self.build_store_query()?;

        let product_ids = parse_product_ids(&self.product_text);
        if product_ids.is_empty() {
            return Err(ValidationError::EmptyProductList);
        }

        let store = match &self.store {
            Some(code) if !code.trim().is_empty() => StoreFilter::Store(code.trim().to_string()),
            _ => StoreFilter::All,
        };

        Ok(LookupRequest { country, store, product_ids })
    }
}
