//! Application state, keybindings and the event loop.

use anyhow::{Context, Result};
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use finnbar_core::{
    Channel, Completion, Country, CountryCode, DataClient, Dispatcher, FormField, InputForm,
    LookupError, LookupRequest, Outcome, StoreFilter, StoreRecord, ValidationError,
};
use futures::StreamExt;
use ratatui::{Terminal, backend::Backend};
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::results::ResultsView;

/// Redraw interval that keeps the header clock current.
const CLOCK_TICK: Duration = Duration::from_secs(1);
const MAX_TERMINAL_ERRORS: u32 = 5;

pub const IDLE_HINT: &str = "Select a country and store (optional),\n\
                             then enter a product ID and press\n\
                             Ctrl-K to check stock.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellState {
    Idle,
    AwaitingResult,
    Displaying,
    Error,
}

impl ShellState {
    pub fn label(self) -> &'static str {
        match self {
            ShellState::Idle => "IDLE",
            ShellState::AwaitingResult => "LOADING",
            ShellState::Displaying => "READY",
            ShellState::Error => "ERROR",
        }
    }
}

/// Which widget receives keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Country,
    Store,
    Products,
    Results,
}

impl Focus {
    pub fn next(self) -> Self {
        match self {
            Focus::Country => Focus::Store,
            Focus::Store => Focus::Products,
            Focus::Products => Focus::Results,
            Focus::Results => Focus::Country,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Focus::Country => Focus::Results,
            Focus::Store => Focus::Country,
            Focus::Products => Focus::Store,
            Focus::Results => Focus::Products,
        }
    }
}

impl From<FormField> for Focus {
    fn from(field: FormField) -> Self {
        match field {
            FormField::Country => Focus::Country,
            FormField::Store => Focus::Store,
            FormField::Products => Focus::Products,
        }
    }
}

/// Commands bound to fixed shortcuts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CheckStock,
    SearchStores,
    Clear,
    CycleSort,
    Quit,
}

impl Action {
    pub fn from_key(key: &KeyEvent) -> Option<Self> {
        if !key.modifiers.contains(KeyModifiers::CONTROL) {
            return None;
        }
        match key.code {
            KeyCode::Char('k') => Some(Action::CheckStock),
            KeyCode::Char('s') => Some(Action::SearchStores),
            KeyCode::Char('x') => Some(Action::Clear),
            KeyCode::Char('o') => Some(Action::CycleSort),
            KeyCode::Char('q') | KeyCode::Char('c') => Some(Action::Quit),
            _ => None,
        }
    }
}

/// Country selector. Nothing is selected until the user picks a country.
#[derive(Debug, Clone)]
pub struct CountryPicker {
    options: Vec<Country>,
    selected: Option<usize>,
}

impl CountryPicker {
    pub fn new(options: Vec<Country>) -> Self {
        Self { options, selected: None }
    }

    pub fn selected(&self) -> Option<&Country> {
        self.selected.and_then(|i| self.options.get(i))
    }

    pub fn name_of(&self, code: &CountryCode) -> String {
        self.options
            .iter()
            .find(|c| &c.code == code)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| code.label())
    }

    pub fn codes(&self) -> impl Iterator<Item = CountryCode> + '_ {
        self.options.iter().map(|c| c.code.clone())
    }

    pub fn next(&mut self) {
        if self.options.is_empty() {
            return;
        }
        self.selected = Some(match self.selected {
            None => 0,
            Some(i) => (i + 1) % self.options.len(),
        });
    }

    pub fn previous(&mut self) {
        if self.options.is_empty() {
            return;
        }
        let last = self.options.len() - 1;
        self.selected = Some(match self.selected {
            None | Some(0) => last,
            Some(i) => i - 1,
        });
    }
}

/// Store selector for the chosen country. `None` selected means all stores.
#[derive(Debug, Clone, Default)]
pub struct StorePicker {
    country: Option<CountryCode>,
    options: Vec<StoreRecord>,
    selected: Option<usize>,
    loading: bool,
}

impl StorePicker {
    pub fn selected(&self) -> Option<&StoreRecord> {
        self.selected.and_then(|i| self.options.get(i))
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn name_of(&self, store_id: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|s| s.store_id == store_id)
            .map(|s| s.name.as_str())
    }

    /// Drop the old options while the stores of `country` load.
    pub fn reset(&mut self, country: CountryCode) {
        self.country = Some(country);
        self.options.clear();
        self.selected = None;
        self.loading = true;
    }

    /// Ignored when the options belong to a country that is no longer selected.
    pub fn set_options(&mut self, country: &CountryCode, options: Vec<StoreRecord>) {
        if self.country.as_ref() != Some(country) {
            return;
        }
        self.options = options;
        self.selected = None;
        self.loading = false;
    }

    pub fn fail(&mut self) {
        self.loading = false;
    }

    /// all → first → … → last → all
    pub fn next(&mut self) {
        if self.options.is_empty() {
            return;
        }
        self.selected = match self.selected {
            None => Some(0),
            Some(i) if i + 1 < self.options.len() => Some(i + 1),
            Some(_) => None,
        };
    }

    pub fn previous(&mut self) {
        if self.options.is_empty() {
            return;
        }
        self.selected = match self.selected {
            None => Some(self.options.len() - 1),
            Some(0) => None,
            Some(i) => Some(i - 1),
        };
    }
}

/// The single owner of all interface state.
#[derive(Debug)]
pub struct App {
    pub form: InputForm,
    pub countries: CountryPicker,
    pub stores: StorePicker,
    pub results: ResultsView,
    pub focus: Focus,
    pub state: ShellState,
    /// Shown beneath the offending field.
    pub field_error: Option<ValidationError>,
    pub status: String,
    pub should_quit: bool,
    dispatcher: Dispatcher,
    completions: UnboundedReceiver<Completion>,
}

impl App {
    pub fn new(client: Arc<dyn DataClient>, countries: Vec<Country>) -> Self {
        let (dispatcher, completions) = Dispatcher::new(client);
        let countries = CountryPicker::new(countries);
        let form = InputForm::new(countries.codes());

        Self {
            form,
            countries,
            stores: StorePicker::default(),
            results: ResultsView::default(),
            focus: Focus::Country,
            state: ShellState::Idle,
            field_error: None,
            status: String::from("Ready."),
            should_quit: false,
            dispatcher,
            completions,
        }
    }

    /// Run the TUI until the user quits.
    ///
    /// Terminal read and draw failures are logged and the loop carries on; only
    /// a run of `MAX_TERMINAL_ERRORS` consecutive read failures ends it.
    pub async fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        let mut events = EventStream::new();
        let mut clock = tokio::time::interval(CLOCK_TICK);
        let mut read_errors = 0;

        while !self.should_quit {
            if let Err(err) = terminal.draw(|frame| crate::ui::render(frame, self)) {
                tracing::warn!(%err, "failed to draw frame");
            }

            tokio::select! {
                maybe_event = events.next() => match maybe_event {
                    Some(Ok(Event::Key(key))) => {
                        read_errors = 0;
                        if key.kind == KeyEventKind::Press {
                            self.handle_key(key);
                        }
                    }
                    Some(Ok(_)) => read_errors = 0,
                    Some(Err(err)) => {
                        read_errors += 1;
                        tracing::warn!(%err, read_errors, "failed to read terminal event");
                        if read_errors >= MAX_TERMINAL_ERRORS {
                            return Err(err).context("Terminal input kept failing");
                        }
                    }
                    None => break,
                },
                Some(completion) = self.next_completion() => {
                    self.on_completion(completion);
                }
                _ = clock.tick() => {}
            }
        }

        Ok(())
    }

    /// Wait for the next lookup to finish, stale or not.
    pub async fn next_completion(&mut self) -> Option<Completion> {
        self.completions.recv().await
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if let Some(action) = Action::from_key(&key) {
            self.perform(action);
            return;
        }

        match key.code {
            KeyCode::Tab => self.focus = self.focus.next(),
            KeyCode::BackTab => self.focus = self.focus.prev(),
            _ => match self.focus {
                Focus::Country => self.on_country_key(key.code),
                Focus::Store => self.on_store_key(key.code),
                Focus::Products => self.on_products_key(key),
                Focus::Results => self.on_results_key(key.code),
            },
        }
    }

    pub fn perform(&mut self, action: Action) {
        match action {
            Action::CheckStock => self.check_stock(),
            Action::SearchStores => self.search_stores(),
            Action::Clear => self.clear(),
            Action::CycleSort => {
                self.status = match self.results.cycle_sort() {
                    Some(key) => format!("Sorted by {}.", key.label()),
                    None => "Showing rows in received order.".to_string(),
                };
            }
            Action::Quit => self.should_quit = true,
        }
    }

    pub fn check_stock(&mut self) {
        let request = match self.form.build_request() {
            Ok(request) => request,
            Err(err) => return self.reject(err),
        };

        self.field_error = None;
        self.status = format!("Checking {} product(s)…", request.product_ids.len());
        self.dispatcher.check_stock(request);
        self.await_result();
    }

    pub fn search_stores(&mut self) {
        let country = match self.form.build_store_query() {
            Ok(country) => country,
            Err(err) => return self.reject(err),
        };

        self.field_error = None;
        self.status = format!("Searching stores in {}…", self.countries.name_of(&country));
        self.dispatcher.search_stores(country);
        self.await_result();
    }

    /// Back to an empty results pane; any pending lookup is ignored.
    pub fn clear(&mut self) {
        let cancelled = self.dispatcher.is_pending();
        self.dispatcher.clear();
        self.results.clear();
        self.form.reset_products();
        self.field_error = None;
        self.state = ShellState::Idle;
        self.status = if cancelled {
            String::from("Cleared. The pending lookup will be ignored.")
        } else {
            String::from("Cleared.")
        };
    }

    pub fn on_completion(&mut self, completion: Completion) {
        let channel = completion.channel;
        let Some(result) = self.dispatcher.accept(completion) else {
            return;
        };

        match (channel, result) {
            (_, Ok(Outcome::Availability { request, records })) => {
                if records.is_empty() {
                    let reason = self.no_availability_message(&request);
                    self.results.show_empty(reason);
                    self.status = String::from("No results.");
                } else {
                    self.status = format!("{} row(s).", records.len());
                    self.results.show_availability(records);
                }
                self.state = ShellState::Displaying;
            }
            (_, Ok(Outcome::Stores { country, records })) => {
                if records.is_empty() {
                    let name = self.countries.name_of(&country);
                    self.results.show_empty(format!("No stores found in {name}."));
                    self.status = String::from("No results.");
                } else {
                    self.status = format!("{} store(s).", records.len());
                    self.results.show_stores(records);
                }
                self.state = ShellState::Displaying;
            }
            (_, Ok(Outcome::StoreOptions { country, records })) => {
                self.stores.set_options(&country, records);
            }
            (Channel::StoreOptions, Err(err)) => {
                self.stores.fail();
                self.status = format!("Could not load stores: {err}");
            }
            (Channel::Results, Err(err)) => {
                self.results.show_error(failure_message(&err));
                self.state = ShellState::Error;
                self.status = String::from("Lookup failed.");
            }
        }
    }

    fn reject(&mut self, err: ValidationError) {
        tracing::debug!(%err, "form rejected");
        self.status = err.to_string();
        self.focus = err.field().into();
        self.field_error = Some(err);
    }

    fn await_result(&mut self) {
        self.results.show_loading();
        self.state = ShellState::AwaitingResult;
    }

    fn no_availability_message(&self, request: &LookupRequest) -> String {
        let country = self.countries.name_of(&request.country);
        let ids = request.product_ids.join(", ");
        let store = match &request.store {
            StoreFilter::Store(id) => {
                format!(" in {}", self.stores.name_of(id).unwrap_or(id.as_str()))
            }
            StoreFilter::All => String::new(),
        };
        format!("No availability data found for product(s) {ids}{store} in {country}.")
    }

    fn on_country_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Right | KeyCode::Down => self.countries.next(),
            KeyCode::Left | KeyCode::Up => self.countries.previous(),
            _ => return,
        }
        self.sync_country();
    }

    /// Push the selected country into the form and reload its stores.
    fn sync_country(&mut self) {
        let Some(country) = self.countries.selected().map(|c| c.code.clone()) else {
            return;
        };
        self.form.set_country(country.as_str());
        self.form.set_store(None);
        if matches!(self.field_error.as_ref().map(|e| e.field()), Some(FormField::Country)) {
            self.field_error = None;
        }
        self.stores.reset(country.clone());
        self.dispatcher.load_store_options(country);
    }

    fn on_store_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Right | KeyCode::Down => self.stores.next(),
            KeyCode::Left | KeyCode::Up => self.stores.previous(),
            _ => return,
        }
        self.form.set_store(self.stores.selected().map(|s| s.store_id.clone()));
    }

    fn on_products_key(&mut self, key: KeyEvent) {
        let mut text = self.form.product_text().to_string();
        match key.code {
            KeyCode::Enter => return self.check_stock(),
            KeyCode::Char(_)
                if key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                return;
            }
            KeyCode::Char(c) => text.push(c),
            KeyCode::Backspace => {
                text.pop();
            }
            KeyCode::Esc => text.clear(),
            _ => return,
        }
        self.form.set_product_ids(text);
        if matches!(self.field_error.as_ref().map(|e| e.field()), Some(FormField::Products)) {
            self.field_error = None;
        }
    }

    fn on_results_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Down => self.results.select_next(),
            KeyCode::Up => self.results.select_previous(),
            KeyCode::PageDown => self.results.page_down(),
            KeyCode::PageUp => self.results.page_up(),
            KeyCode::Home => self.results.select_first(),
            KeyCode::End => self.results.select_last(),
            _ => {}
        }
    }
}

fn failure_message(err: &LookupError) -> String {
    format!("Failed to fetch stock data: {err}")
}
