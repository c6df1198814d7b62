//! Stateless render functions for each region of the screen.

use chrono::Local;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
};

use crate::{
    app::{App, Focus, IDLE_HINT, ShellState},
    results::{ResultsContent, ResultsView},
    theme::DEFAULT_THEME,
};
use finnbar_core::{FormField, LastUpdated};

const SIDEBAR_WIDTH: u16 = 36;
const CLOCK_FORMAT: &str = "%H:%M:%S";

pub fn render(frame: &mut Frame, app: &mut App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
        .split(rows[1]);

    let clock = Local::now().format(CLOCK_FORMAT).to_string();
    render_header(frame, rows[0], &clock);
    render_sidebar(frame, columns[0], app);
    render_results(frame, columns[1], &mut app.results, app.focus == Focus::Results);
    render_status_bar(frame, rows[2], app);
}

fn render_header(frame: &mut Frame, area: Rect, clock: &str) {
    let title = Line::from(vec![
        Span::styled(
            " FINNBAR ",
            Style::default()
                .bg(DEFAULT_THEME.primary)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(" IKEA Availability Checker", Style::default().fg(DEFAULT_THEME.fg)),
    ]);
    frame.render_widget(Paragraph::new(title), area);

    let clock = Span::styled(format!("{clock} "), Style::default().fg(DEFAULT_THEME.muted));
    frame.render_widget(Paragraph::new(Line::from(clock)).alignment(Alignment::Right), area);
}

fn render_sidebar(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // country
            Constraint::Length(1),
            Constraint::Length(3), // store
            Constraint::Length(1),
            Constraint::Length(3), // products
            Constraint::Length(1),
            Constraint::Min(0), // help
        ])
        .split(area);

    let country = match app.countries.selected() {
        Some(c) => selector_line(&c.label(), true),
        None => selector_line("Select country…", false),
    };
    render_field(frame, chunks[0], "Country", country, app.focus == Focus::Country);
    render_field_error(frame, chunks[1], app, FormField::Country);

    let store = if app.stores.is_loading() {
        selector_line("Loading stores…", false)
    } else {
        match app.stores.selected() {
            Some(s) => selector_line(&s.name, true),
            None => selector_line("All stores", false),
        }
    };
    render_field(frame, chunks[2], "Store", store, app.focus == Focus::Store);
    render_field_error(frame, chunks[3], app, FormField::Store);

    let text = app.form.product_text();
    let products = if text.is_empty() && app.focus != Focus::Products {
        Line::from(Span::styled("306.043.67, 10606640", Style::default().fg(DEFAULT_THEME.muted)))
    } else if app.focus == Focus::Products {
        Line::from(vec![
            Span::styled(text.to_string(), Style::default().fg(DEFAULT_THEME.fg)),
            Span::styled("▏", Style::default().fg(DEFAULT_THEME.border_focused)),
        ])
    } else {
        Line::from(Span::styled(text.to_string(), Style::default().fg(DEFAULT_THEME.fg)))
    };
    render_field(frame, chunks[4], "Product ID(s)", products, app.focus == Focus::Products);
    render_field_error(frame, chunks[5], app, FormField::Products);

    let help = Paragraph::new(vec![
        help_line("Tab", "next field"),
        help_line("←/→", "change selection"),
        help_line("^K", "check stock"),
        help_line("^S", "search stores"),
        help_line("^O", "sort"),
        help_line("^X", "clear"),
        help_line("^Q", "quit"),
    ])
    .block(Block::default().borders(Borders::TOP).border_style(DEFAULT_THEME.border(false)));
    frame.render_widget(help, chunks[6]);
}

fn selector_line(label: &str, chosen: bool) -> Line<'static> {
    let style = if chosen {
        Style::default().fg(DEFAULT_THEME.fg)
    } else {
        Style::default().fg(DEFAULT_THEME.muted)
    };
    Line::from(vec![
        Span::styled("◀ ", Style::default().fg(DEFAULT_THEME.muted)),
        Span::styled(label.to_string(), style),
        Span::styled(" ▶", Style::default().fg(DEFAULT_THEME.muted)),
    ])
}

fn help_line(key: &'static str, desc: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!(" {key:<4}"), Style::default().fg(DEFAULT_THEME.secondary)),
        Span::styled(desc, Style::default().fg(DEFAULT_THEME.muted)),
    ])
}

fn render_field(frame: &mut Frame, area: Rect, title: &str, content: Line<'_>, focused: bool) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {title} "))
        .border_style(DEFAULT_THEME.border(focused));
    frame.render_widget(Paragraph::new(content).block(block), area);
}

fn render_field_error(frame: &mut Frame, area: Rect, app: &App, field: FormField) {
    let Some(err) = app.field_error.as_ref().filter(|e| e.field() == field) else {
        return;
    };
    let line = Span::styled(format!(" {err}"), Style::default().fg(DEFAULT_THEME.error));
    frame.render_widget(Paragraph::new(Line::from(line)), area);
}

fn render_results(frame: &mut Frame, area: Rect, results: &mut ResultsView, focused: bool) {
    let title = match results.sort() {
        Some(key) => format!(" Results · sorted by {} ", key.label()),
        None => " Results ".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(DEFAULT_THEME.border(focused));

    let message = match results.content() {
        ResultsContent::Idle => Some((IDLE_HINT.to_string(), DEFAULT_THEME.muted)),
        ResultsContent::Loading => Some(("Loading…".to_string(), DEFAULT_THEME.primary)),
        ResultsContent::Empty(reason) => Some((reason.clone(), DEFAULT_THEME.fg)),
        ResultsContent::Error(message) => Some((format!("⚠  {message}"), DEFAULT_THEME.error)),
        ResultsContent::Availability(_) | ResultsContent::Stores(_) => None,
    };

    if let Some((text, color)) = message {
        let paragraph = Paragraph::new(text)
            .style(Style::default().fg(color))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let table = if matches!(results.content(), ResultsContent::Stores(_)) {
        store_table(results)
    } else {
        availability_table(results)
    };
    frame.render_stateful_widget(table.block(block), area, results.table_state_mut());
}

fn header_row(titles: &[&'static str]) -> Row<'static> {
    Row::new(titles.iter().map(|t| Cell::from(*t)))
        .style(Style::default().fg(DEFAULT_THEME.primary).add_modifier(Modifier::BOLD))
}

fn zebra(index: usize) -> Style {
    if index % 2 == 1 {
        Style::default().bg(DEFAULT_THEME.zebra_bg)
    } else {
        Style::default()
    }
}

fn availability_table(results: &ResultsView) -> Table<'static> {
    let rows: Vec<Row> = results
        .availability_rows()
        .into_iter()
        .enumerate()
        .map(|(i, r)| {
            let updated = r
                .last_updated
                .as_ref()
                .map(LastUpdated::display)
                .unwrap_or_default();
            Row::new(vec![
                Cell::from(r.product_id.clone()),
                Cell::from(format!("{} – {}", r.country_code.label(), r.country)),
                Cell::from(r.store_name.clone()),
                Cell::from(r.display_stock()),
                Cell::from(Span::styled(
                    r.probability.label(),
                    DEFAULT_THEME.probability(r.probability),
                )),
                Cell::from(updated),
            ])
            .style(zebra(i))
        })
        .collect();

    Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Min(14),
            Constraint::Min(16),
            Constraint::Length(6),
            Constraint::Length(14),
            Constraint::Length(17),
        ],
    )
    .header(header_row(&["Product ID", "Country", "Store", "Stock", "Availability", "Updated"]))
    .highlight_style(Style::default().bg(DEFAULT_THEME.selected_bg))
}

fn store_table(results: &ResultsView) -> Table<'static> {
    let rows: Vec<Row> = results
        .store_rows()
        .into_iter()
        .enumerate()
        .map(|(i, s)| {
            Row::new(vec![
                Cell::from(s.store_id.clone()),
                Cell::from(s.name.clone()),
                Cell::from(s.address.clone()),
                Cell::from(format!("{} – {}", s.country_code.label(), s.country)),
            ])
            .style(zebra(i))
        })
        .collect();

    Table::new(
        rows,
        [
            Constraint::Length(8),
            Constraint::Min(18),
            Constraint::Min(24),
            Constraint::Min(14),
        ],
    )
    .header(header_row(&["Store ID", "Name", "Address", "Country"]))
    .highlight_style(Style::default().bg(DEFAULT_THEME.selected_bg))
}

fn render_status_bar(frame: &mut Frame, area: Rect, app: &App) {
    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let state_bg = match app.state {
        ShellState::Idle => DEFAULT_THEME.muted,
        ShellState::AwaitingResult => DEFAULT_THEME.secondary,
        ShellState::Displaying => DEFAULT_THEME.success,
        ShellState::Error => DEFAULT_THEME.error,
    };
    let message_fg = if app.state == ShellState::Error || app.field_error.is_some() {
        DEFAULT_THEME.error
    } else {
        DEFAULT_THEME.fg
    };

    let left = Line::from(vec![
        Span::styled(
            format!(" {} ", app.state.label()),
            Style::default().bg(state_bg).fg(Color::Black).add_modifier(Modifier::BOLD),
        ),
        Span::styled(" │ ", Style::default().fg(DEFAULT_THEME.muted)),
        Span::styled(app.status.clone(), Style::default().fg(message_fg)),
    ]);
    frame.render_widget(
        Paragraph::new(left).style(Style::default().bg(DEFAULT_THEME.bar_bg)),
        layout[0],
    );

    let position = match (app.results.selected(), app.results.row_count()) {
        (Some(i), total) if total > 0 => format!(" row {}/{} ", i + 1, total),
        _ => String::new(),
    };
    let key_style = Style::default().bg(DEFAULT_THEME.muted).fg(Color::Black);
    let desc_style = Style::default().fg(DEFAULT_THEME.fg);
    let right = Line::from(vec![
        Span::styled(position, Style::default().fg(DEFAULT_THEME.muted)),
        Span::styled(" ^K ", key_style),
        Span::styled(" check ", desc_style),
        Span::styled(" ^X ", key_style),
        Span::styled(" clear ", desc_style),
        Span::styled(" ^Q ", key_style),
        Span::styled(" quit ", desc_style),
    ]);
    frame.render_widget(
        Paragraph::new(right)
            .style(Style::default().bg(DEFAULT_THEME.bar_bg))
            .alignment(Alignment::Right),
        layout[1],
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::ResultsView;
    use async_trait::async_trait;
    use finnbar_core::{
        AvailabilityRecord, Country, CountryCode, DataClient, LookupError, LookupRequest,
        Probability, StockQuantity, StoreRecord, ValidationError,
    };
    use ratatui::{Terminal, backend::TestBackend};
    use std::sync::Arc;

    #[derive(Debug)]
    struct NoData;

    #[async_trait]
    impl DataClient for NoData {
        async fn list_countries(&self) -> Result<Vec<Country>, LookupError> {
            Ok(Vec::new())
        }

        async fn list_stores(&self, _: &CountryCode) -> Result<Vec<StoreRecord>, LookupError> {
            Ok(Vec::new())
        }

        async fn check_availability(
            &self,
            _: &LookupRequest,
        ) -> Result<Vec<AvailabilityRecord>, LookupError> {
            Ok(Vec::new())
        }
    }

    fn draw(width: u16, height: u16, f: impl FnOnce(&mut Frame)) -> Vec<String> {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(f).unwrap();
        let buffer = terminal.backend().buffer();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect()
    }

    fn screen(results: &mut ResultsView) -> String {
        draw(100, 12, |frame| {
            let area = frame.area();
            render_results(frame, area, results, true);
        })
        .join("\n")
    }

    fn app() -> App {
        let germany = Country { code: CountryCode::parse("de").unwrap(), name: "Germany".into() };
        App::new(Arc::new(NoData), vec![germany])
    }

    fn record(last_updated: Option<LastUpdated>) -> AvailabilityRecord {
        AvailabilityRecord {
            store_id: "421".into(),
            store_name: "Berlin".into(),
            product_id: "40299687".into(),
            country_code: CountryCode::parse("de").unwrap(),
            country: "Germany".into(),
            stock: StockQuantity::Known(5),
            probability: Probability::HighInStock,
            last_updated,
        }
    }

    #[test]
    fn availability_table_renders_one_row_per_record() {
        let mut results = ResultsView::default();
        results.show_availability(vec![record(None)]);

        let text = screen(&mut results);
        let data_rows: Vec<_> = text.lines().filter(|l| l.contains("40299687")).collect();
        assert_eq!(data_rows.len(), 1);
        let row = data_rows[0];
        assert!(row.contains("Berlin"));
        assert!(row.contains(" 5 "));
        assert!(row.contains("High in stock"));
        assert!(text.contains("Product ID"));
    }

    #[test]
    fn error_state_shows_message() {
        let mut results = ResultsView::default();
        results.show_error("Failed to fetch stock data: rate limited");
        assert!(screen(&mut results).contains("rate limited"));
    }

    #[test]
    fn idle_state_shows_hint() {
        let mut results = ResultsView::default();
        assert!(screen(&mut results).contains("Ctrl-K to check stock"));
    }

    #[test]
    fn updated_column_shows_reported_time_or_raw_text() {
        let mut results = ResultsView::default();
        results.show_availability(vec![
            record(Some(LastUpdated::parse("2024-05-01T10:15:00+02:00"))),
            record(Some(LastUpdated::parse("this morning"))),
        ]);

        let text = screen(&mut results);
        assert!(text.contains("2024-05-01 10:15"));
        assert!(text.contains("this morning"));
    }

    #[test]
    fn header_shows_clock() {
        let lines = draw(60, 1, |frame| {
            let area = frame.area();
            render_header(frame, area, "12:34:56");
        });
        assert!(lines[0].contains("FINNBAR"));
        assert!(lines[0].trim_end().ends_with("12:34:56"));
    }

    #[test]
    fn validation_error_renders_under_its_field() {
        let mut app = app();
        app.check_stock();
        assert_eq!(app.field_error, Some(ValidationError::MissingCountry));

        let lines = draw(100, 20, |frame| render(frame, &mut app));
        let country_box = lines.iter().position(|l| l.contains("Country")).unwrap();
        let error_line = lines
            .iter()
            .position(|l| l.contains("Please select a country first."))
            .unwrap();
        assert_eq!(error_line, country_box + 3);
        assert!(!lines[country_box + 7].contains("Please"));
    }

    #[test]
    fn product_error_moves_below_products_field() {
        let mut app = app();
        app.form.set_country("de");
        app.check_stock();
        assert_eq!(app.field_error, Some(ValidationError::EmptyProductList));

        let lines = draw(100, 20, |frame| render(frame, &mut app));
        let products_box = lines.iter().position(|l| l.contains("Product ID(s)")).unwrap();
        assert!(lines[products_box + 3].contains("Please enter at least one"));
        assert!(!lines.iter().any(|l| l.contains("Please select a country")));
    }
}
