use std::error::Error;
use std::io;
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use clap::{Parser, Subcommand};
use crossterm::{
    event::{self, Event as CEvent, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use tui::{
    backend::{Backend, CrosstermBackend},
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{BarChart, Block, Borders, List, ListItem, Paragraph, Tabs, Wrap},
    Frame, Terminal,
};

use job_insights::form::{Control, SimulationForm};
use job_insights::logging::{self, LogTarget};
use job_insights::{
    CandidateProfile, Chart, ChartKind, Config, DatasetCache, Insight, PreparedTable, Predictor,
};

const TICK_RATE: Duration = Duration::from_millis(200);

#[derive(Parser)]
#[command(name = "job_insights")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Dashboard and employment predictor for the IT job-seeker survey")]
struct Cli {
    /// TOML settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Survey CSV; overrides `data_path` from the settings file
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive terminal dashboard (default)
    Dashboard,
    /// Print the data behind one descriptive view
    View {
        /// age, gender, states, time-to-job or contract
        name: String,
    },
    /// Fit the predictor and report held-out accuracy
    Train {
        #[arg(long)]
        json: bool,
    },
    /// Fit the predictor and classify one candidate profile
    Predict {
        /// JSON object with the eight model features
        #[arg(long)]
        profile: String,

        #[arg(long)]
        json: bool,
    },
}

enum Event<I> {
    Input(I),
    Tick,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(data) = cli.data {
        config.data_path = data;
    }
    let command = cli.command.unwrap_or(Commands::Dashboard);

    let target = match command {
        Commands::Dashboard => LogTarget::File(config.log_file.clone()),
        _ => LogTarget::Stderr,
    };
    if let Err(err) = logging::init(&target, &config.log_filter) {
        eprintln!("Logging disabled: {}", err);
    }

    let mut cache = DatasetCache::new(config.data_path.clone());
    let table = cache.get()?;

    match command {
        Commands::Dashboard => run_dashboard(cache, table, &config),
        Commands::View { name } => print_view(&name, &table),
        Commands::Train { json } => {
            let mut predictor = Predictor::new();
            let report = predictor.fit(&table, &config.predictor)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Model accuracy: {:.2}", report.accuracy);
                println!(
                    "Rows: {} total, {} excluded, {} train, {} test",
                    report.total_rows, report.excluded_rows, report.train_rows, report.test_rows
                );
                for (feature, importance) in &report.feature_importances {
                    println!("  {:<28} {:.3}", feature, importance);
                }
            }
            Ok(())
        }
        Commands::Predict { profile, json } => {
            let value: serde_json::Value = serde_json::from_str(&profile)?;
            let profile = CandidateProfile::from_json(&value)?;
            let mut predictor = Predictor::new();
            let accuracy = predictor.fit(&table, &config.predictor)?.accuracy;
            let prediction = predictor.infer(&profile)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&prediction)?);
            } else {
                println!("Model accuracy: {:.2}", accuracy);
                println!("{} (vote share {:.2})", prediction.outcome, prediction.vote_share);
            }
            Ok(())
        }
    }
}

fn print_view(name: &str, table: &PreparedTable) -> Result<(), Box<dyn Error>> {
    let insight = Insight::from_slug(name).ok_or_else(|| {
        let names: Vec<&str> = Insight::ALL.iter().map(Insight::slug).collect();
        format!("unknown view `{}`; expected one of {}", name, names.join(", "))
    })?;
    let Some(chart) = insight.chart(table) else {
        return Err("the prediction view has no chart; use `train` or `predict`".into());
    };

    println!("{}", chart.title);
    match chart.kind {
        ChartKind::Pie => {
            for ((label, value), (_, share)) in chart.points.iter().zip(chart.shares()) {
                println!("  {:<16} {:>6} {:>5.1}%", label, value, share);
            }
        }
        ChartKind::HorizontalBar | ChartKind::VerticalBar => {
            println!("  {:<16} {}", chart.y_label, chart.x_label);
            for (label, value) in &chart.points {
                println!("  {:<16} {:.2}", label, value);
            }
        }
    }
    Ok(())
}

struct App<'a> {
    config: &'a Config,
    cache: DatasetCache,
    table: Arc<PreparedTable>,
    loaded_at: DateTime<Local>,
    active: Insight,
    predictor: Predictor,
    fit_error: Option<String>,
    form: SimulationForm,
    status: Option<String>,
}

impl<'a> App<'a> {
    fn new(config: &'a Config, cache: DatasetCache, table: Arc<PreparedTable>) -> Self {
        App {
            config,
            cache,
            table,
            loaded_at: Local::now(),
            active: Insight::AgeDistribution,
            predictor: Predictor::new(),
            fit_error: None,
            form: SimulationForm::default(),
            status: None,
        }
    }

    /// Picks up a changed source file; the model is retrained on next use.
    fn refresh(&mut self) {
        match self.cache.get() {
            Ok(table) => {
                if !Arc::ptr_eq(&table, &self.table) {
                    self.table = table;
                    self.loaded_at = Local::now();
                    self.predictor = Predictor::new();
                    self.fit_error = None;
                }
                self.status = None;
            }
            Err(err) => {
                tracing::error!("Reloading {} failed: {}", self.cache.path().display(), err);
                self.status = Some(format!("Reload failed, showing previous data: {}", err));
            }
        }
    }

    fn ensure_trained(&mut self) {
        if self.predictor.is_trained() || self.fit_error.is_some() {
            return;
        }
        if let Err(err) = self.predictor.fit(&self.table, &self.config.predictor) {
            tracing::error!("Training failed: {}", err);
            self.fit_error = Some(err.to_string());
        }
    }

    /// Returns `true` when the user asked to quit.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Tab => self.active = self.active.next(),
            KeyCode::BackTab => self.active = self.active.previous(),
            KeyCode::Char('r') => {
                self.cache.invalidate();
                self.refresh();
            }
            KeyCode::Char(c) if c.is_ascii_digit() => {
                let index = (c as usize).wrapping_sub('1' as usize);
                if let Some(insight) = Insight::from_index(index) {
                    self.active = insight;
                }
            }
            KeyCode::Up if self.active == Insight::EmploymentPrediction => self.form.select_previous(),
            KeyCode::Down if self.active == Insight::EmploymentPrediction => self.form.select_next(),
            KeyCode::Left if self.active == Insight::EmploymentPrediction => self.form.decrease(),
            KeyCode::Right if self.active == Insight::EmploymentPrediction => self.form.increase(),
            _ => {}
        }
        false
    }
}

fn run_dashboard(
    cache: DatasetCache,
    table: Arc<PreparedTable>,
    config: &Config,
) -> Result<(), Box<dyn Error>> {
    let mut app = App::new(config, cache, table);

    enable_raw_mode()?;
    let raw_mode = OnDrop(|| {
        if let Err(err) = disable_raw_mode() {
            tracing::warn!("Failed to leave raw mode: {}", err);
        }
    });

    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut last_tick = Instant::now();
        loop {
            let timeout = TICK_RATE
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_secs(0));

            match event::poll(timeout) {
                Ok(true) => {
                    if let Ok(CEvent::Key(key)) = event::read() {
                        if key.kind == KeyEventKind::Press && tx.send(Event::Input(key)).is_err() {
                            break;
                        }
                    }
                }
                Ok(false) => {}
                Err(_) => break,
            }

            if last_tick.elapsed() >= TICK_RATE {
                if tx.send(Event::Tick).is_err() {
                    break;
                }
                last_tick = Instant::now();
            }
        }
    });

    let stdout = io::stdout();
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = event_loop(&mut terminal, &mut app, &rx);

    drop(raw_mode);
    terminal.clear()?;
    terminal.show_cursor()?;
    result
}

/// Runs the closure when dropped, so the terminal is restored on every exit path.
struct OnDrop<F: FnMut()>(F);

impl<F: FnMut()> Drop for OnDrop<F> {
    fn drop(&mut self) {
        (self.0)()
    }
}

fn event_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: &mpsc::Receiver<Event<KeyEvent>>,
) -> Result<(), Box<dyn Error>> {
    loop {
        if app.active == Insight::EmploymentPrediction {
            app.ensure_trained();
        }
        terminal.draw(|rect| draw(rect, app))?;

        match rx.recv()? {
            Event::Input(key) => {
                if app.handle_key(key) {
                    return Ok(());
                }
            }
            Event::Tick => app.refresh(),
        }
    }
}

fn draw<B: Backend>(rect: &mut Frame<B>, app: &App) {
    let size = rect.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(10),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(size);

    let menu = Insight::ALL
        .iter()
        .enumerate()
        .map(|(i, insight)| {
            Spans::from(vec![
                Span::styled(
                    format!("{}", i + 1),
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::UNDERLINED),
                ),
                Span::styled(format!(" {}", insight.title()), Style::default().fg(Color::White)),
            ])
        })
        .collect();

    let tabs = Tabs::new(menu)
        .select(app.active.index())
        .block(Block::default().title("Insights").borders(Borders::ALL))
        .style(Style::default().fg(Color::Cyan))
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .divider(Span::raw("|"));
    rect.render_widget(tabs, chunks[0]);

    match app.active.chart(&app.table) {
        Some(chart) => draw_chart(rect, chunks[1], &chart),
        None => draw_prediction(rect, chunks[1], app),
    }

    let footer_text = match &app.status {
        Some(status) => Spans::from(Span::styled(status.clone(), Style::default().fg(Color::Red))),
        None => Spans::from(Span::styled(
            format!(
                "{} rows from {} (loaded {})  |  Tab/1-6 switch view  r reload  q quit",
                app.table.len(),
                app.cache.path().display(),
                app.loaded_at.format("%H:%M:%S")
            ),
            Style::default().fg(Color::DarkGray),
        )),
    };
    let footer = Paragraph::new(footer_text)
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Center);
    rect.render_widget(footer, chunks[2]);
}

fn bar(value: f64, max: f64, width: usize) -> String {
    let len = if max > 0.0 {
        ((value / max) * width as f64).round() as usize
    } else {
        0
    };
    "█".repeat(len)
}

fn draw_chart<B: Backend>(rect: &mut Frame<B>, area: Rect, chart: &Chart) {
    let block = Block::default().title(chart.title.as_str()).borders(Borders::ALL);
    let label_width = chart
        .points
        .iter()
        .map(|(label, _)| label.chars().count())
        .max()
        .unwrap_or(0);
    let bar_width = (area.width as usize).saturating_sub(label_width + 16).max(1);

    match chart.kind {
        ChartKind::Pie => {
            let shares = chart.shares();
            let items: Vec<ListItem> = shares
                .iter()
                .map(|(label, share)| {
                    ListItem::new(Spans::from(vec![
                        Span::raw(format!("{:<width$} ", label, width = label_width)),
                        Span::styled(bar(*share, 100.0, bar_width), Style::default().fg(Color::Magenta)),
                        Span::raw(format!(" {:.1}%", share)),
                    ]))
                })
                .collect();
            rect.render_widget(List::new(items).block(block), area);
        }
        ChartKind::HorizontalBar => {
            let max = chart.points.iter().map(|(_, v)| *v).fold(0.0, f64::max);
            let mut items = vec![ListItem::new(Span::styled(
                format!("{}  /  {}", chart.y_label, chart.x_label),
                Style::default().fg(Color::DarkGray),
            ))];
            items.extend(chart.points.iter().map(|(label, value)| {
                ListItem::new(Spans::from(vec![
                    Span::raw(format!("{:<width$} ", label, width = label_width)),
                    Span::styled(bar(*value, max, bar_width), Style::default().fg(Color::Blue)),
                    Span::raw(format!(" {:.1}", value)),
                ]))
            }));
            rect.render_widget(List::new(items).block(block), area);
        }
        ChartKind::VerticalBar => {
            let data: Vec<(&str, u64)> = chart
                .points
                .iter()
                .map(|(label, value)| (label.as_str(), value.round() as u64))
                .collect();
            let bar_chart = BarChart::default()
                .block(block)
                .data(&data)
                .bar_width(label_width.clamp(3, 12) as u16)
                .bar_gap(2)
                .bar_style(Style::default().fg(Color::Yellow))
                .value_style(Style::default().fg(Color::Black).bg(Color::Yellow));
            rect.render_widget(bar_chart, area);
        }
    }
}

fn draw_prediction<B: Backend>(rect: &mut Frame<B>, area: Rect, app: &App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)].as_ref())
        .split(area);

    let mut lines = vec![];
    match (app.predictor.report(), &app.fit_error) {
        (Some(report), _) => lines.push(Spans::from(vec![
            Span::raw("Model accuracy: "),
            Span::styled(
                format!("{:.2}", report.accuracy),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  ({} train / {} test)", report.train_rows, report.test_rows),
                Style::default().fg(Color::DarkGray),
            ),
        ])),
        (None, Some(err)) => lines.push(Spans::from(Span::styled(
            err.clone(),
            Style::default().fg(Color::Red),
        ))),
        (None, None) => lines.push(Spans::from("Training...")),
    }
    lines.push(Spans::from(""));
    lines.push(Spans::from(Span::styled(
        "Run a simulation (Up/Down select, Left/Right adjust):",
        Style::default().add_modifier(Modifier::BOLD),
    )));
    for control in Control::ALL {
        let selected = control == app.form.selected();
        let style = if selected {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let (low, high) = control.bounds();
        let range = if control.is_yes_no() {
            String::new()
        } else {
            format!("  [{}-{}]", low, high)
        };
        lines.push(Spans::from(vec![
            Span::styled(if selected { "> " } else { "  " }, style),
            Span::styled(format!("{:<34}", control.label()), style),
            Span::styled(app.form.display_value(control), style),
            Span::styled(range, Style::default().fg(Color::DarkGray)),
        ]));
    }
    let form = Paragraph::new(lines)
        .block(Block::default().title("Employment prediction").borders(Borders::ALL))
        .wrap(Wrap { trim: false });
    rect.render_widget(form, columns[0]);

    let verdict = match app.predictor.infer(&app.form.to_profile()) {
        Ok(prediction) => {
            let color = if prediction.outcome.as_label() == 1 {
                Color::Green
            } else {
                Color::Red
            };
            vec![
                Spans::from(Span::styled(
                    prediction.outcome.to_string(),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                )),
                Spans::from(""),
                Spans::from(format!(
                    "{:.0}% of trees vote employed",
                    prediction.vote_share * 100.0
                )),
            ]
        }
        Err(err) => vec![Spans::from(Span::styled(
            err.to_string(),
            Style::default().fg(Color::Red),
        ))],
    };
    let verdict = Paragraph::new(verdict)
        .block(Block::default().title("Result").borders(Borders::ALL))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    rect.render_widget(verdict, columns[1]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn failing_setup(restored: &Cell<usize>) -> io::Result<()> {
        let _guard = OnDrop(|| restored.set(restored.get() + 1));
        Err(io::Error::new(io::ErrorKind::Other, "terminal unavailable"))
    }

    #[test]
    fn restore_runs_on_early_error() {
        let restored = Cell::new(0);
        assert!(failing_setup(&restored).is_err());
        assert_eq!(restored.get(), 1);
    }

    #[test]
    fn restore_runs_once_on_explicit_drop() {
        let restored = Cell::new(0);
        let guard = OnDrop(|| restored.set(restored.get() + 1));
        drop(guard);
        assert_eq!(restored.get(), 1);
    }
}
