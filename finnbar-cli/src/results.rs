//! What the results pane currently shows.
//!
//! Records are kept in the order the data client returned them. A sort only
//! changes the display order and is picked explicitly by the user.

use finnbar_core::{AvailabilityRecord, StoreRecord};
use ratatui::widgets::TableState;
use std::cmp::Reverse;

/// Rows moved by PageUp / PageDown.
const PAGE: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ResultsContent {
    #[default]
    Idle,
    Loading,
    Availability(Vec<AvailabilityRecord>),
    Stores(Vec<StoreRecord>),
    Empty(String),
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Store,
    Product,
    Stock,
}

impl SortKey {
    pub fn label(self) -> &'static str {
        match self {
            SortKey::Store => "store",
            SortKey::Product => "product",
            SortKey::Stock => "stock",
        }
    }
}

#[derive(Debug, Default)]
pub struct ResultsView {
    content: ResultsContent,
    sort: Option<SortKey>,
    /// Display order as indices into the received records.
    order: Vec<usize>,
    table: TableState,
}

impl ResultsView {
    pub fn content(&self) -> &ResultsContent {
        &self.content
    }

    pub fn sort(&self) -> Option<SortKey> {
        self.sort
    }

    pub fn table_state_mut(&mut self) -> &mut TableState {
        &mut self.table
    }

    pub fn selected(&self) -> Option<usize> {
        self.table.selected()
    }

    pub fn show_loading(&mut self) {
        self.replace(ResultsContent::Loading);
    }

    pub fn show_availability(&mut self, records: Vec<AvailabilityRecord>) {
        self.replace(ResultsContent::Availability(records));
    }

    pub fn show_stores(&mut self, records: Vec<StoreRecord>) {
        self.replace(ResultsContent::Stores(records));
    }

    pub fn show_empty(&mut self, reason: impl Into<String>) {
        self.replace(ResultsContent::Empty(reason.into()));
    }

    pub fn show_error(&mut self, message: impl Into<String>) {
        self.replace(ResultsContent::Error(message.into()));
    }

    /// Back to the idle placeholder.
    pub fn clear(&mut self) {
        self.replace(ResultsContent::Idle);
    }

    /// Availability rows in display order.
    pub fn availability_rows(&self) -> Vec<&AvailabilityRecord> {
        match &self.content {
            ResultsContent::Availability(records) => self.order.iter().map(|&i| &records[i]).collect(),
            _ => Vec::new(),
        }
    }

    /// Store rows in display order.
    pub fn store_rows(&self) -> Vec<&StoreRecord> {
        match &self.content {
            ResultsContent::Stores(records) => self.order.iter().map(|&i| &records[i]).collect(),
            _ => Vec::new(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.order.len()
    }

    /// off → store → product → stock → off
    pub fn cycle_sort(&mut self) -> Option<SortKey> {
        self.sort = match self.sort {
            None => Some(SortKey::Store),
            Some(SortKey::Store) => Some(SortKey::Product),
            Some(SortKey::Product) => Some(SortKey::Stock),
            Some(SortKey::Stock) => None,
        };
        self.reorder();
        self.sort
    }

    pub fn select_next(&mut self) {
        self.move_selection(1);
    }

    pub fn select_previous(&mut self) {
        self.move_selection(-1);
    }

    pub fn page_down(&mut self) {
        self.move_selection(PAGE as isize);
    }

    pub fn page_up(&mut self) {
        self.move_selection(-(PAGE as isize));
    }

    pub fn select_first(&mut self) {
        if self.row_count() > 0 {
            self.table.select(Some(0));
        }
    }

    pub fn select_last(&mut self) {
        if let Some(last) = self.row_count().checked_sub(1) {
            self.table.select(Some(last));
        }
    }

    fn move_selection(&mut self, delta: isize) {
        let Some(last) = self.row_count().checked_sub(1) else {
            return;
        };
        let current = self.table.selected().unwrap_or(0) as isize;
        let next = (current + delta).clamp(0, last as isize) as usize;
        self.table.select(Some(next));
    }

    fn replace(&mut self, content: ResultsContent) {
        self.content = content;
        self.table = TableState::default();
        self.reorder();
        self.select_first();
    }

    fn reorder(&mut self) {
        self.order = match &self.content {
            ResultsContent::Availability(records) => {
                let mut order: Vec<usize> = (0..records.len()).collect();
                match self.sort {
                    Some(SortKey::Store) => order.sort_by(|&a, &b| {
                        records[a].store_name.cmp(&records[b].store_name)
                    }),
                    Some(SortKey::Product) => order.sort_by(|&a, &b| {
                        records[a].product_id.cmp(&records[b].product_id)
                    }),
                    Some(SortKey::Stock) => {
                        order.sort_by_key(|&i| Reverse(records[i].effective_stock()))
                    }
                    None => {}
                }
                order
            }
            ResultsContent::Stores(records) => {
                let mut order: Vec<usize> = (0..records.len()).collect();
                match self.sort {
                    Some(SortKey::Store) => {
                        order.sort_by(|&a, &b| records[a].name.cmp(&records[b].name))
                    }
                    Some(SortKey::Product) | Some(SortKey::Stock) | None => {}
                }
                order
            }
            _ => Vec::new(),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finnbar_core::{CountryCode, Probability, StockQuantity};

    fn record(store: &str, product: &str, stock: StockQuantity) -> AvailabilityRecord {
        AvailabilityRecord {
            store_id: store.to_lowercase(),
            store_name: store.into(),
            product_id: product.into(),
            country_code: CountryCode::parse("de").unwrap(),
            country: "Germany".into(),
            stock,
            probability: Probability::Unknown,
            last_updated: None,
        }
    }

    fn names(view: &ResultsView) -> Vec<&str> {
        view.availability_rows().iter().map(|r| r.store_name.as_str()).collect()
    }

    fn sample() -> Vec<AvailabilityRecord> {
        vec![
            record("Hamburg", "2", StockQuantity::Known(1)),
            record("Berlin", "3", StockQuantity::Unknown),
            record("Dresden", "1", StockQuantity::Known(9)),
        ]
    }

    #[test]
    fn rows_keep_arrival_order() {
        let mut view = ResultsView::default();
        view.show_availability(sample());
        assert_eq!(names(&view), ["Hamburg", "Berlin", "Dresden"]);
    }

    #[test]
    fn sort_cycles_and_returns_to_arrival_order() {
        let mut view = ResultsView::default();
        view.show_availability(sample());

        assert_eq!(view.cycle_sort(), Some(SortKey::Store));
        assert_eq!(names(&view), ["Berlin", "Dresden", "Hamburg"]);

        assert_eq!(view.cycle_sort(), Some(SortKey::Product));
        assert_eq!(names(&view), ["Dresden", "Hamburg", "Berlin"]);

        assert_eq!(view.cycle_sort(), Some(SortKey::Stock));
        assert_eq!(names(&view), ["Dresden", "Hamburg", "Berlin"]);

        assert_eq!(view.cycle_sort(), None);
        assert_eq!(names(&view), ["Hamburg", "Berlin", "Dresden"]);
    }

    #[test]
    fn new_results_replace_old_ones() {
        let mut view = ResultsView::default();
        view.show_availability(sample());
        view.show_availability(vec![record("Köln", "4", StockQuantity::Known(2))]);
        assert_eq!(names(&view), ["Köln"]);
    }

    #[test]
    fn clear_returns_to_idle_from_any_state() {
        let mut view = ResultsView::default();

        view.show_availability(sample());
        view.clear();
        assert_eq!(view.content(), &ResultsContent::Idle);
        assert_eq!(view.row_count(), 0);

        view.show_error("boom");
        view.clear();
        assert_eq!(view.content(), &ResultsContent::Idle);
    }

    #[test]
    fn selection_is_clamped() {
        let mut view = ResultsView::default();
        view.select_next();
        assert_eq!(view.selected(), None);

        view.show_availability(sample());
        assert_eq!(view.selected(), Some(0));
        view.select_previous();
        assert_eq!(view.selected(), Some(0));
        view.page_down();
        assert_eq!(view.selected(), Some(2));
        view.select_next();
        assert_eq!(view.selected(), Some(2));
        view.page_up();
        assert_eq!(view.selected(), Some(0));
        view.select_last();
        assert_eq!(view.selected(), Some(2));
    }

    #[test]
    fn error_has_no_rows() {
        let mut view = ResultsView::default();
        view.show_availability(sample());
        view.show_error("network down");
        assert!(view.availability_rows().is_empty());
        assert_eq!(view.content(), &ResultsContent::Error("network down".into()));
    }
}
