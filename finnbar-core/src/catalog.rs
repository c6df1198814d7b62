//! Store metadata the availability API does not return itself.
//!
//! The Ingka availability endpoint only reports business-unit codes, so names,
//! addresses and the list of supported countries come from a JSON catalog. A
//! seed catalog ships inside the library; `stores_file` in the config replaces it.

use serde::Deserialize;
use std::{collections::BTreeMap, fs, path::Path};

use crate::{
    error::CatalogError,
    model::{Country, CountryCode, StoreRecord},
};

const EMBEDDED_CATALOG: &str = include_str!("../data/stores.json");

#[derive(Debug, Deserialize)]
struct RawCatalog {
    countries: BTreeMap<String, String>,
    stores: Vec<RawStore>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStore {
    bu_code: String,
    name: String,
    country_code: String,
    #[serde(default)]
    country: String,
    #[serde(default)]
    address: String,
}

#[derive(Debug, Clone)]
pub struct StoreCatalog {
    countries: BTreeMap<CountryCode, String>,
    stores: Vec<StoreRecord>,
}

impl StoreCatalog {
    pub fn embedded() -> Result<Self, CatalogError> {
        Self::from_json(EMBEDDED_CATALOG)
    }

    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let contents = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let raw: RawCatalog = serde_json::from_str(json)?;

        let mut countries = BTreeMap::new();
        for (code, name) in raw.countries {
            let code = CountryCode::parse(&code)
                .map_err(|e| CatalogError::Invalid(e.to_string()))?;
            countries.insert(code, name);
        }

        let mut stores = Vec::with_capacity(raw.stores.len());
        for store in raw.stores {
            let country_code = CountryCode::parse(&store.country_code).map_err(|e| {
                CatalogError::Invalid(format!("store {}: {e}", store.bu_code))
            })?;
            let country = if store.country.is_empty() {
                countries.get(&country_code).cloned().unwrap_or_default()
            } else {
                store.country
            };
            stores.push(StoreRecord {
                store_id: store.bu_code,
                name: store.name,
                address: store.address,
                country_code,
                country,
            });
        }

        Ok(Self { countries, stores })
    }

    /// Supported countries, sorted by code.
    pub fn countries(&self) -> Vec<Country> {
        self.countries
            .iter()
            .map(|(code, name)| Country { code: code.clone(), name: name.clone() })
            .collect()
    }

    pub fn has_country(&self, code: &CountryCode) -> bool {
        self.countries.contains_key(code)
    }

    /// Falls back to the uppercase code when the country has no name.
    pub fn country_name(&self, code: &CountryCode) -> String {
        self.countries.get(code).cloned().unwrap_or_else(|| code.label())
    }

    /// Stores of one country in catalog order.
    pub fn iter_stores<'a>(
        &'a self,
        code: &'a CountryCode,
    ) -> impl Iterator<Item = &'a StoreRecord> {
        self.stores.iter().filter(move |s| &s.country_code == code)
    }

    /// Stores of one country, sorted by name.
    pub fn stores(&self, code: &CountryCode) -> Vec<StoreRecord> {
        let mut stores: Vec<StoreRecord> = self.iter_stores(code).cloned().collect();
        stores.sort_by(|a, b| a.name.cmp(&b.name));
        stores
    }

    pub fn store(&self, code: &CountryCode, store_id: &str) -> Option<&StoreRecord> {
        self.stores
            .iter()
            .find(|s| &s.country_code == code && s.store_id == store_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = r#"{
        "countries": { "de": "Germany", "se": "Sweden" },
        "stores": [
            { "buCode": "421", "name": "Berlin-Tempelhof", "countryCode": "de", "country": "Germany" },
            { "buCode": "324", "name": "Berlin-Lichtenberg", "countryCode": "DE" },
            { "buCode": "012", "name": "Kungens Kurva", "countryCode": "se", "country": "Sweden", "address": "Ekgårdsvägen 2" }
        ]
    }"#;

    fn de() -> CountryCode {
        CountryCode::parse("de").unwrap()
    }

    #[test]
    fn embedded_catalog_parses() {
        let catalog = StoreCatalog::embedded().expect("embedded catalog must be valid");
        assert!(!catalog.countries().is_empty());
        assert!(!catalog.stores(&de()).is_empty());
    }

    #[test]
    fn stores_are_filtered_by_country_and_sorted_by_name() {
        let catalog = StoreCatalog::from_json(SMALL).unwrap();
        let names: Vec<_> = catalog.stores(&de()).into_iter().map(|s| s.name).collect();
        assert_eq!(names, ["Berlin-Lichtenberg", "Berlin-Tempelhof"]);
    }

    #[test]
    fn missing_store_country_name_is_filled_from_countries() {
        let catalog = StoreCatalog::from_json(SMALL).unwrap();
        let store = catalog.store(&de(), "324").unwrap();
        assert_eq!(store.country, "Germany");
    }

    #[test]
    fn store_lookup_is_scoped_to_country() {
        let catalog = StoreCatalog::from_json(SMALL).unwrap();
        let found = {
            let code = de();
            catalog.store(&code, "421")
        };
        assert_eq!(found.map(|s| s.name.as_str()), Some("Berlin-Tempelhof"));

        let se = CountryCode::parse("se").unwrap();
        assert!(catalog.store(&se, "421").is_none());
    }

    #[test]
    fn country_name_falls_back_to_code() {
        let catalog = StoreCatalog::from_json(SMALL).unwrap();
        assert_eq!(catalog.country_name(&de()), "Germany");
        assert_eq!(catalog.country_name(&CountryCode::parse("us").unwrap()), "US");
    }

    #[test]
    fn invalid_country_code_is_rejected() {
        let json = r#"{ "countries": { "deu": "Germany" }, "stores": [] }"#;
        let err = StoreCatalog::from_json(json).unwrap_err();
        assert!(matches!(err, CatalogError::Invalid(_)));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = StoreCatalog::from_path(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }
}
