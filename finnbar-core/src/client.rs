use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

use crate::{
    Config,
    error::LookupError,
    model::{AvailabilityRecord, Country, CountryCode, LookupRequest, StoreRecord},
};

pub mod ingka;

pub use ingka::IngkaClient;

/// The data source the interface queries.
#[async_trait]
pub trait DataClient: Send + Sync + Debug {
    /// Countries the data source can answer for.
    async fn list_countries(&self) -> Result<Vec<Country>, LookupError>;

    async fn list_stores(&self, country: &CountryCode) -> Result<Vec<StoreRecord>, LookupError>;

    async fn check_availability(
        &self,
        request: &LookupRequest,
    ) -> Result<Vec<AvailabilityRecord>, LookupError>;
}

/// Construct the production client from config.
pub fn client_from_config(config: &Config) -> anyhow::Result<Arc<dyn DataClient>> {
    let catalog = config.store_catalog()?;
    let client = IngkaClient::new(&config.api, catalog)?;
    Ok(Arc::new(client))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn client_from_config_works_with_defaults() {
        assert!(client_from_config(&Config::default()).is_ok());
    }

    #[test]
    fn client_from_config_errors_when_stores_file_missing() {
        let cfg = Config {
            stores_file: Some(PathBuf::from("/definitely/not/here/stores.json")),
            ..Config::default()
        };
        let err = client_from_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("Failed to load stores file"));
    }
}
