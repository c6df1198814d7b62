//! Core library for the `finnbar` stock availability checker.
//!
//! This crate defines:
//! - Configuration and the store catalog
//! - The [`DataClient`] abstraction and its Ingka (IKEA) implementation
//! - The input form with its validation rules
//! - The [`Dispatcher`] that runs lookups without blocking the interface
//!
//! It is used by `finnbar-cli`, but holds no terminal code of its own.

pub mod catalog;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod form;
pub mod model;

pub use catalog::StoreCatalog;
pub use client::{DataClient, IngkaClient, client_from_config};
pub use config::Config;
pub use dispatch::{Channel, Completion, Dispatcher, Outcome};
pub use error::{CatalogError, FormField, LookupError, ValidationError};
pub use form::{InputForm, parse_product_ids};
pub use model::{
    AvailabilityRecord, Country, CountryCode, LastUpdated, LookupRequest, Probability,
    StockQuantity, StoreFilter, StoreRecord,
};
