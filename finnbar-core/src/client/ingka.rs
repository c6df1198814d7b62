use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::HashMap;

use crate::{
    catalog::StoreCatalog,
    config::ApiConfig,
    error::LookupError,
    model::{
        AvailabilityRecord, Country, CountryCode, LastUpdated, LookupRequest, Probability,
        StockQuantity, StoreFilter, StoreRecord,
    },
};

use super::DataClient;

/// Availability data reported per physical store.
const STORE_UNIT_TYPE: &str = "STO";

/// Client for the Ingka (IKEA) availability API.
#[derive(Debug, Clone)]
pub struct IngkaClient {
    http: Client,
    base_url: String,
    client_id: String,
    catalog: StoreCatalog,
}

impl IngkaClient {
    pub fn new(api: &ApiConfig, catalog: StoreCatalog) -> Result<Self, LookupError> {
        let http = Client::builder().timeout(api.timeout()).build()?;
        Ok(Self {
            http,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            client_id: api.client_id.clone(),
            catalog,
        })
    }

    async fn fetch_availabilities(
        &self,
        country: &CountryCode,
        product_ids: &[String],
    ) -> Result<IkAvailabilityResponse, LookupError> {
        let url = format!("{}/cia/availabilities/ru/{}", self.base_url, country);
        let item_nos = product_ids.join(",");

        tracing::debug!(%url, items = %item_nos, "requesting availability");

        let res = self
            .http
            .get(&url)
            .header("x-client-id", &self.client_id)
            .header("accept", "application/json;version=1")
            .query(&[("expand", "StoresList,Restocks"), ("itemNos", item_nos.as_str())])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(LookupError::RateLimited);
        }
        if !status.is_success() {
            return Err(LookupError::UnexpectedStatus {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        serde_json::from_str(&body).map_err(|source| LookupError::Decode {
            context: format!("availability response for {country}"),
            source,
        })
    }

    fn to_records(
        &self,
        country: &CountryCode,
        response: IkAvailabilityResponse,
        filter: &StoreFilter,
    ) -> Result<Vec<AvailabilityRecord>, LookupError> {
        let Some(entries) = response.availabilities else {
            if let Some(first) = response.errors.first() {
                return Err(LookupError::Service(first.describe()));
            }
            return Err(LookupError::UnexpectedResponse(
                "missing 'availabilities' list".to_string(),
            ));
        };

        if entries.is_empty() {
            if let Some(first) = response.errors.first() {
                return Err(LookupError::Service(first.describe()));
            }
        }

        let stores: HashMap<&str, &StoreRecord> = self
            .catalog
            .iter_stores(country)
            .map(|s| (s.store_id.as_str(), s))
            .collect();

        let mut records: Vec<AvailabilityRecord> = entries
            .into_iter()
            .filter_map(decode_entry)
            .filter(|e| e.class_unit_key.class_unit_type == STORE_UNIT_TYPE)
            .filter(|e| filter.matches(&e.class_unit_key.class_unit_code))
            .filter_map(|e| {
                let store = stores.get(e.class_unit_key.class_unit_code.as_str())?;
                Some(entry_to_record(e, store))
            })
            .collect();

        records.sort_by(|a, b| {
            a.store_name
                .cmp(&b.store_name)
                .then_with(|| a.product_id.cmp(&b.product_id))
        });

        Ok(records)
    }
}

#[async_trait]
impl DataClient for IngkaClient {
    async fn list_countries(&self) -> Result<Vec<Country>, LookupError> {
        Ok(self.catalog.countries())
    }

    async fn list_stores(&self, country: &CountryCode) -> Result<Vec<StoreRecord>, LookupError> {
        if !self.catalog.has_country(country) {
            return Err(LookupError::UnknownCountry(country.label()));
        }
        Ok(self.catalog.stores(country))
    }

    async fn check_availability(
        &self,
        request: &LookupRequest,
    ) -> Result<Vec<AvailabilityRecord>, LookupError> {
        let country = &request.country;
        if !self.catalog.has_country(country) {
            return Err(LookupError::UnknownCountry(country.label()));
        }
        if let StoreFilter::Store(store) = &request.store {
            if self.catalog.store(country, store).is_none() {
                return Err(LookupError::UnknownStore {
                    country: country.label(),
                    store: store.clone(),
                });
            }
        }

        let response = self.fetch_availabilities(country, &request.product_ids).await?;
        let records = self.to_records(country, response, &request.store)?;

        tracing::info!(
            country = %country,
            products = request.product_ids.len(),
            rows = records.len(),
            "availability received"
        );
        Ok(records)
    }
}

fn entry_to_record(entry: IkAvailability, store: &StoreRecord) -> AvailabilityRecord {
    let mut stock = StockQuantity::Unknown;
    let mut probability = Probability::Unknown;
    let mut last_updated = None;

    let availability = entry
        .buying_option
        .and_then(|b| b.cash_carry)
        .and_then(|c| c.availability);

    if entry.available_for_cash_carry {
        if let Some(avail) = availability {
            stock = StockQuantity::Known(avail.quantity.unwrap_or(0));
            probability = avail
                .probability
                .and_then(|p| p.this_day)
                .map(|d| Probability::from_message_type(&d.message_type))
                .unwrap_or(Probability::Unknown);
            last_updated = avail
                .update_date_time
                .filter(|raw| !raw.is_empty())
                .map(|raw| LastUpdated::parse(&raw));
        }
    }

    AvailabilityRecord {
        store_id: store.store_id.clone(),
        store_name: store.name.clone(),
        product_id: entry.item_key.item_no,
        country_code: store.country_code.clone(),
        country: store.country.clone(),
        stock,
        probability,
        last_updated,
    }
}

/// One bad entry must not cost the rest of the response.
fn decode_entry(value: Value) -> Option<IkAvailability> {
    match serde_json::from_value(value) {
        Ok(entry) => Some(entry),
        Err(err) => {
            tracing::debug!(%err, "skipping malformed availability entry");
            None
        }
    }
}

/// Accepts integers, floats and numeric strings; anything else counts as absent.
fn lenient_quantity<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let quantity = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| *f >= 0.0)
            .map(|f| f as u64),
        _ => None,
    };
    Ok(quantity.map(|q| u32::try_from(q).unwrap_or(u32::MAX)))
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct IkAvailabilityResponse {
    availabilities: Option<Vec<Value>>,
    #[serde(default)]
    errors: Vec<IkError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IkAvailability {
    #[serde(default)]
    class_unit_key: IkClassUnitKey,
    #[serde(default)]
    item_key: IkItemKey,
    #[serde(default)]
    available_for_cash_carry: bool,
    buying_option: Option<IkBuyingOption>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IkClassUnitKey {
    #[serde(default)]
    class_unit_type: String,
    #[serde(default)]
    class_unit_code: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IkItemKey {
    #[serde(default)]
    item_no: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IkBuyingOption {
    cash_carry: Option<IkCashCarry>,
}

#[derive(Debug, Deserialize)]
struct IkCashCarry {
    availability: Option<IkStock>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IkStock {
    #[serde(default, deserialize_with = "lenient_quantity")]
    quantity: Option<u32>,
    probability: Option<IkProbability>,
    update_date_time: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IkProbability {
    this_day: Option<IkProbabilityDay>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IkProbabilityDay {
    #[serde(default)]
    message_type: String,
}

#[derive(Debug, Deserialize)]
struct IkError {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: String,
}

impl IkError {
    fn describe(&self) -> String {
        match self.code {
            Some(code) => format!("{} (code {code})", self.message),
            None => self.message.clone(),
        }
    }
}
