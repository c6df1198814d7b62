//! Runs lookups in the background and decides which results are still wanted.
//!
//! Every lookup gets a sequence number from one counter. Completions travel back
//! over an unbounded channel and are only accepted if their number is the latest
//! one issued on the same [`Channel`]; anything older has been superseded.

use futures::FutureExt;
use std::{any::Any, future::Future, panic::AssertUnwindSafe, sync::Arc};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::{
    client::DataClient,
    error::LookupError,
    model::{AvailabilityRecord, CountryCode, LookupRequest, StoreRecord},
};

/// Where a completed lookup is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// The results table; stock checks and store searches share it.
    Results,
    /// Options of the store selector.
    StoreOptions,
}

#[derive(Debug)]
pub enum Outcome {
    Availability { request: LookupRequest, records: Vec<AvailabilityRecord> },
    Stores { country: CountryCode, records: Vec<StoreRecord> },
    StoreOptions { country: CountryCode, records: Vec<StoreRecord> },
}

#[derive(Debug)]
pub struct Completion {
    pub seq: u64,
    pub channel: Channel,
    pub result: Result<Outcome, LookupError>,
}

#[derive(Debug)]
pub struct Dispatcher {
    client: Arc<dyn DataClient>,
    tx: UnboundedSender<Completion>,
    next_seq: u64,
    pending_results: Option<u64>,
    pending_options: Option<u64>,
}

impl Dispatcher {
    /// Returns the dispatcher and the receiving end for its completions.
    pub fn new(client: Arc<dyn DataClient>) -> (Self, UnboundedReceiver<Completion>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = Self {
            client,
            tx,
            next_seq: 0,
            pending_results: None,
            pending_options: None,
        };
        (dispatcher, rx)
    }

    pub fn check_stock(&mut self, request: LookupRequest) -> u64 {
        let seq = self.issue(Channel::Results);
        tracing::info!(seq, country = %request.country, products = ?request.product_ids, "check stock");

        let client = Arc::clone(&self.client);
        self.spawn(seq, Channel::Results, async move {
            let records = client.check_availability(&request).await?;
            Ok(Outcome::Availability { request, records })
        });
        seq
    }

    pub fn search_stores(&mut self, country: CountryCode) -> u64 {
        let seq = self.issue(Channel::Results);
        tracing::info!(seq, %country, "search stores");

        let client = Arc::clone(&self.client);
        self.spawn(seq, Channel::Results, async move {
            let records = client.list_stores(&country).await?;
            Ok(Outcome::Stores { country, records })
        });
        seq
    }

    /// Refresh the store selector after the country changed.
    pub fn load_store_options(&mut self, country: CountryCode) -> u64 {
        let seq = self.issue(Channel::StoreOptions);
        tracing::debug!(seq, %country, "load store options");

        let client = Arc::clone(&self.client);
        self.spawn(seq, Channel::StoreOptions, async move {
            let records = client.list_stores(&country).await?;
            Ok(Outcome::StoreOptions { country, records })
        });
        seq
    }

    /// Forget the pending results-table lookup; its completion will be dropped.
    pub fn clear(&mut self) {
        if let Some(seq) = self.pending_results.take() {
            tracing::debug!(seq, "pending lookup cleared");
        }
    }

    /// Whether a results-table lookup is in flight.
    pub fn is_pending(&self) -> bool {
        self.pending_results.is_some()
    }

    /// Returns the result if `completion` is the latest lookup on its channel.
    pub fn accept(&mut self, completion: Completion) -> Option<Result<Outcome, LookupError>> {
        let slot = self.slot(completion.channel);
        if *slot != Some(completion.seq) {
            tracing::debug!(
                seq = completion.seq,
                channel = ?completion.channel,
                latest = ?*slot,
                "dropping stale completion"
            );
            return None;
        }
        *slot = None;

        if let Err(err) = &completion.result {
            tracing::warn!(seq = completion.seq, %err, "lookup failed");
        }
        Some(completion.result)
    }

    fn issue(&mut self, channel: Channel) -> u64 {
        self.next_seq += 1;
        let seq = self.next_seq;
        *self.slot(channel) = Some(seq);
        seq
    }

    fn slot(&mut self, channel: Channel) -> &mut Option<u64> {
        match channel {
            Channel::Results => &mut self.pending_results,
            Channel::StoreOptions => &mut self.pending_options,
        }
    }

    fn spawn<F>(&self, seq: u64, channel: Channel, lookup: F)
    where
        F: Future<Output = Result<Outcome, LookupError>> + Send + 'static,
    {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = match AssertUnwindSafe(lookup).catch_unwind().await {
                Ok(result) => result,
                Err(panic) => Err(LookupError::Internal(panic_message(panic.as_ref()))),
            };
            // Nobody is listening once the shell has exited.
            let _ = tx.send(Completion { seq, channel, result });
        });
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        format!("lookup panicked: {msg}")
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        format!("lookup panicked: {msg}")
    } else {
        "lookup panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Country, Probability, StockQuantity, StoreFilter};
    use async_trait::async_trait;
    use std::{
        collections::HashMap,
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
    };
    use tokio::sync::oneshot;

    /// Holds each stock check until its product's gate is released.
    #[derive(Debug, Default)]
    struct GatedClient {
        gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
        calls: AtomicUsize,
    }

    impl GatedClient {
        fn gate(&self, product: &str) -> oneshot::Sender<()> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().unwrap().insert(product.to_string(), rx);
            tx
        }
    }

    #[async_trait]
    impl DataClient for GatedClient {
        async fn list_countries(&self) -> Result<Vec<Country>, LookupError> {
            Ok(Vec::new())
        }

        async fn list_stores(
            &self,
            country: &CountryCode,
        ) -> Result<Vec<StoreRecord>, LookupError> {
            Ok(vec![StoreRecord {
                store_id: "421".into(),
                name: "Berlin".into(),
                address: String::new(),
                country_code: country.clone(),
                country: "Germany".into(),
            }])
        }

        async fn check_availability(
            &self,
            request: &LookupRequest,
        ) -> Result<Vec<AvailabilityRecord>, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let product = request.product_ids[0].clone();

            let gate = self.gates.lock().unwrap().remove(&product);
            if let Some(gate) = gate {
                let _ = gate.await;
            }

            match product.as_str() {
                "boom" => panic!("client exploded"),
                "fail" => Err(LookupError::Service("unknown product".into())),
                _ => Ok(vec![AvailabilityRecord {
                    store_id: "421".into(),
                    store_name: "Berlin".into(),
                    product_id: product,
                    country_code: request.country.clone(),
                    country: "Germany".into(),
                    stock: StockQuantity::Known(5),
                    probability: Probability::HighInStock,
                    last_updated: None,
                }]),
            }
        }
    }

    fn request(product: &str) -> LookupRequest {
        LookupRequest {
            country: CountryCode::parse("de").unwrap(),
            store: StoreFilter::All,
            product_ids: vec![product.to_string()],
        }
    }

    fn product_of(result: Result<Outcome, LookupError>) -> String {
        match result.expect("lookup should succeed") {
            Outcome::Availability { records, .. } => records[0].product_id.clone(),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn later_request_wins_when_earlier_finishes_last() {
        let client = Arc::new(GatedClient::default());
        let first_gate = client.gate("first");
        let second_gate = client.gate("second");
        let (mut dispatcher, mut rx) = Dispatcher::new(client.clone());

        dispatcher.check_stock(request("first"));
        let second = dispatcher.check_stock(request("second"));

        second_gate.send(()).unwrap();
        let done = rx.recv().await.unwrap();
        assert_eq!(done.seq, second);
        assert_eq!(product_of(dispatcher.accept(done).unwrap()), "second");

        first_gate.send(()).unwrap();
        let stale = rx.recv().await.unwrap();
        assert!(dispatcher.accept(stale).is_none());
        assert!(!dispatcher.is_pending());
    }

    #[tokio::test]
    async fn later_request_wins_when_earlier_finishes_first() {
        let client = Arc::new(GatedClient::default());
        let first_gate = client.gate("first");
        let second_gate = client.gate("second");
        let (mut dispatcher, mut rx) = Dispatcher::new(client.clone());

        dispatcher.check_stock(request("first"));
        dispatcher.check_stock(request("second"));

        first_gate.send(()).unwrap();
        let stale = rx.recv().await.unwrap();
        assert!(dispatcher.accept(stale).is_none());
        assert!(dispatcher.is_pending());

        second_gate.send(()).unwrap();
        let done = rx.recv().await.unwrap();
        assert_eq!(product_of(dispatcher.accept(done).unwrap()), "second");
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn clear_discards_in_flight_result() {
        let client = Arc::new(GatedClient::default());
        let gate = client.gate("slow");
        let (mut dispatcher, mut rx) = Dispatcher::new(client);

        dispatcher.check_stock(request("slow"));
        dispatcher.clear();
        assert!(!dispatcher.is_pending());

        gate.send(()).unwrap();
        let late = rx.recv().await.unwrap();
        assert!(dispatcher.accept(late).is_none());
    }

    #[tokio::test]
    async fn failure_is_delivered_as_error() {
        let (mut dispatcher, mut rx) = Dispatcher::new(Arc::new(GatedClient::default()));

        dispatcher.check_stock(request("fail"));
        let done = rx.recv().await.unwrap();
        let err = dispatcher.accept(done).unwrap().unwrap_err();
        assert!(matches!(err, LookupError::Service(_)));
    }

    #[tokio::test]
    async fn panicking_lookup_becomes_internal_error() {
        let (mut dispatcher, mut rx) = Dispatcher::new(Arc::new(GatedClient::default()));

        dispatcher.check_stock(request("boom"));
        let done = rx.recv().await.unwrap();
        let err = dispatcher.accept(done).unwrap().unwrap_err();
        match err {
            LookupError::Internal(msg) => assert!(msg.contains("client exploded")),
            other => panic!("expected internal error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn store_options_do_not_supersede_results() {
        let client = Arc::new(GatedClient::default());
        let gate = client.gate("slow");
        let (mut dispatcher, mut rx) = Dispatcher::new(client);
        let de = CountryCode::parse("de").unwrap();

        dispatcher.check_stock(request("slow"));
        dispatcher.load_store_options(de);

        let options = rx.recv().await.unwrap();
        assert_eq!(options.channel, Channel::StoreOptions);
        assert!(matches!(
            dispatcher.accept(options),
            Some(Ok(Outcome::StoreOptions { .. }))
        ));

        gate.send(()).unwrap();
        let done = rx.recv().await.unwrap();
        assert_eq!(product_of(dispatcher.accept(done).unwrap()), "slow");
    }

    #[tokio::test]
    async fn store_search_supersedes_stock_check() {
        let client = Arc::new(GatedClient::default());
        let gate = client.gate("slow");
        let (mut dispatcher, mut rx) = Dispatcher::new(client);

        dispatcher.check_stock(request("slow"));
        dispatcher.search_stores(CountryCode::parse("de").unwrap());

        let stores = rx.recv().await.unwrap();
        assert!(matches!(dispatcher.accept(stores), Some(Ok(Outcome::Stores { .. }))));

        gate.send(()).unwrap();
        let stale = rx.recv().await.unwrap();
        assert!(dispatcher.accept(stale).is_none());
    }
}
