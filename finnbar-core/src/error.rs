use thiserror::Error;

/// Which form field a validation error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Country,
    Store,
    Products,
}

/// Problems with user input, caught before anything is dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please select a country first.")]
    MissingCountry,

    #[error("Country '{0}' is not supported.")]
    UnsupportedCountry(String),

    #[error("'{0}' is not a two-letter country code.")]
    InvalidCountryCode(String),

    #[error("Please enter at least one product ID.")]
    EmptyProductList,
}

impl ValidationError {
    pub fn field(&self) -> FormField {
        match self {
            ValidationError::MissingCountry
            | ValidationError::UnsupportedCountry(_)
            | ValidationError::InvalidCountryCode(_) => FormField::Country,
            ValidationError::EmptyProductList => FormField::Products,
        }
    }
}

/// A failed call against the data source.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited by the availability service, try again later")]
    RateLimited,

    #[error("unexpected HTTP status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unexpected API response: {0}")]
    UnexpectedResponse(String),

    #[error("availability service error: {0}")]
    Service(String),

    #[error("unknown country '{0}'")]
    UnknownCountry(String),

    #[error("unknown store '{store}' in {country}")]
    UnknownStore { country: String, store: String },

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read store catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse store catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid store catalog: {0}")]
    Invalid(String),
}
