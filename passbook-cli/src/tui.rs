use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use passbook_core::{Statement, StatementError};
use passbook_export::{output_file_name, render, row_cells, ExportFormat, COLUMNS};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
    Frame, Terminal,
};
use std::io::{self, Stdout};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::Config;

const PAGE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Typing a file path
    Input,
    /// Looking at a loaded statement
    Browse,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    Continue,
    Quit,
}

struct App {
    cfg: Config,
    mode: Mode,
    input: String,
    path: Option<PathBuf>,
    statement: Option<Statement>,
    scroll: usize,
    show_logs: bool,
    status: String,
}

impl App {
    fn new(cfg: Config) -> Self {
        Self {
            cfg,
            mode: Mode::Input,
            input: String::new(),
            path: None,
            statement: None,
            scroll: 0,
            show_logs: false,
            status: "Enter the path of a statement PDF and press Enter".to_string(),
        }
    }

    fn load(&mut self, path: &Path) {
        self.scroll = 0;
        match read_statement(path, &self.cfg) {
            Ok(st) => {
                self.status = format!(
                    "Extracted {} transactions from {}",
                    st.batch.len(),
                    st.meta.source_name
                );
                info!(path = %path.display(), rows = st.batch.len(), "statement loaded");
                self.statement = Some(st);
                self.path = Some(path.to_path_buf());
                self.mode = Mode::Browse;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "statement load failed");
                self.status = format!("{e:#}");
                self.statement = None;
                self.path = None;
                self.mode = Mode::Input;
            }
        }
    }

    fn export(&self, format: ExportFormat) -> Result<PathBuf> {
        let (Some(st), Some(path)) = (&self.statement, &self.path) else {
            anyhow::bail!("nothing loaded");
        };
        let dir = crate::export_dir(path, None, &self.cfg);
        std::fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;

        let options = self.cfg.export_options(Some(st.meta.source_name.clone()));
        let bytes = render(&st.batch, format, &options)?;
        let out = dir.join(output_file_name(&st.meta.source_name, format));
        std::fs::write(&out, bytes).with_context(|| format!("write {}", out.display()))?;
        Ok(out)
    }

    fn export_and_report(&mut self, format: ExportFormat) {
        self.status = match self.export(format) {
            Ok(out) => format!("Wrote {}", out.display()),
            Err(e) => format!("{format} export failed: {e:#}"),
        };
    }

    fn row_count(&self) -> usize {
        self.statement.as_ref().map(|s| s.batch.len()).unwrap_or(0)
    }

    fn scroll_by(&mut self, delta: isize) {
        let max = self.row_count().saturating_sub(1);
        self.scroll = self.scroll.saturating_add_signed(delta).min(max);
    }

    fn handle_key(&mut self, code: KeyCode) -> Action {
        match self.mode {
            Mode::Input => match code {
                KeyCode::Esc => {
                    if self.statement.is_some() {
                        self.mode = Mode::Browse;
                    } else {
                        return Action::Quit;
                    }
                }
                KeyCode::Enter => {
                    let raw = self.input.trim().trim_matches(['"', '\'']).to_string();
                    if !raw.is_empty() {
                        self.input.clear();
                        self.load(Path::new(&raw));
                    }
                }
                KeyCode::Backspace => {
                    self.input.pop();
                }
                KeyCode::Char(c) => self.input.push(c),
                _ => {}
            },
            Mode::Browse => match code {
                KeyCode::Char('q') | KeyCode::Esc => return Action::Quit,
                KeyCode::Char('c') => self.export_and_report(ExportFormat::Csv),
                KeyCode::Char('x') => self.export_and_report(ExportFormat::Xlsx),
                KeyCode::Char('p') => self.export_and_report(ExportFormat::Pdf),
                KeyCode::Char('l') => self.show_logs = !self.show_logs,
                KeyCode::Char('o') | KeyCode::Char('/') => {
                    self.mode = Mode::Input;
                    self.status = "Open another statement (Esc to go back)".to_string();
                }
                KeyCode::Down | KeyCode::Char('j') => self.scroll_by(1),
                KeyCode::Up | KeyCode::Char('k') => self.scroll_by(-1),
                KeyCode::PageDown => self.scroll_by(PAGE as isize),
                KeyCode::PageUp => self.scroll_by(-(PAGE as isize)),
                KeyCode::Home => self.scroll = 0,
                KeyCode::End => self.scroll = self.row_count().saturating_sub(1),
                _ => {}
            },
        }
        Action::Continue
    }
}

fn read_statement(path: &Path, cfg: &Config) -> Result<Statement> {
    let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    match crate::statement_from_bytes(&bytes, &name, cfg) {
        Ok(st) => Ok(st),
        Err(StatementError::EmptyResult { skipped }) => {
            anyhow::bail!("No transactions found in {name} ({skipped} lines skipped)")
        }
        Err(e) => Err(e.into()),
    }
}

pub fn run_viewer(file: Option<PathBuf>, cfg: Config) -> Result<()> {
    let mut app = App::new(cfg);
    if let Some(path) = file {
        app.load(&path);
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = viewer_loop(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    res
}

fn viewer_loop(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| draw(f, app))?;

        if event::poll(std::time::Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if app.handle_key(key.code) == Action::Quit {
                    break;
                }
            }
        }
    }
    Ok(())
}

fn draw(f: &mut Frame, app: &App) {
    let logs_height = if app.show_logs { 8 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(5),
            Constraint::Length(logs_height),
            Constraint::Length(3),
        ])
        .split(f.area());

    draw_summary(f, app, chunks[0]);
    draw_table(f, app, chunks[1]);
    if app.show_logs {
        draw_logs(f, app, chunks[2]);
    }
    draw_footer(f, app, chunks[3]);
}

fn draw_summary(f: &mut Frame, app: &App, area: Rect) {
    let title = Span::styled(
        "passbook",
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
    );
    let mut lines = vec![Line::from(title)];

    match &app.statement {
        Some(st) => {
            let totals = st.batch.totals();
            let mut meta = format!("{} | {} page(s)", st.meta.source_name, st.meta.page_count);
            if let Some(acct) = &st.meta.account_number {
                meta.push_str(&format!(" | account {acct}"));
            }
            if let Some((from, to)) = st.meta.period {
                meta.push_str(&format!(" | {from} to {to}"));
            }
            lines.push(Line::raw(meta));
            lines.push(Line::from(vec![
                Span::raw(format!("{} rows  ", st.batch.len())),
                Span::styled(format!("debits {}  ", totals.debits), Style::default().fg(Color::Red)),
                Span::styled(format!("credits {}  ", totals.credits), Style::default().fg(Color::Green)),
                Span::raw(format!("net {}  ", totals.net)),
                Span::styled(
                    format!("skipped {}", st.report.skipped.len()),
                    Style::default().fg(Color::Gray),
                ),
            ]));
        }
        None => lines.push(Line::styled("No statement loaded", Style::default().fg(Color::Gray))),
    }

    f.render_widget(Paragraph::new(Text::from(lines)), area);
}

fn draw_table(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("transactions");
    let Some(st) = &app.statement else {
        let hint = Paragraph::new("No transactions to show.").block(block);
        f.render_widget(hint, area);
        return;
    };

    let options = app.cfg.export_options(None);
    if let Err(e) = options.validate() {
        let msg = Paragraph::new(format!("{e}")).style(Style::default().fg(Color::Red)).block(block);
        f.render_widget(msg, area);
        return;
    }

    let header = Row::new(COLUMNS.map(|c| Cell::from(c)))
        .style(Style::default().add_modifier(Modifier::BOLD));
    let rows = st.batch.iter().skip(app.scroll).filter_map(|txn| {
        let style = if txn.is_debit() {
            Style::default().fg(Color::Red)
        } else {
            Style::default().fg(Color::Green)
        };
        let [date, desc, amount, balance] = row_cells(txn, &options).ok()?;
        Some(Row::new(vec![
            Cell::from(date),
            Cell::from(desc),
            Cell::from(Line::from(amount).right_aligned()).style(style),
            Cell::from(Line::from(balance).right_aligned()),
        ]))
    });

    let widths = [
        Constraint::Length(12),
        Constraint::Min(20),
        Constraint::Length(14),
        Constraint::Length(14),
    ];
    let table = Table::new(rows, widths).header(header).block(block);
    f.render_widget(table, area);
}

fn draw_logs(f: &mut Frame, app: &App, area: Rect) {
    let lines: Vec<Line> = app
        .statement
        .as_ref()
        .map(|st| st.report.logs.iter().map(|l| Line::raw(l.clone())).collect())
        .unwrap_or_default();
    let logs = Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL).title("processing logs"))
        .wrap(Wrap { trim: false });
    f.render_widget(logs, area);
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let (title, body) = match app.mode {
        Mode::Input => ("open statement", format!("{}_", app.input)),
        Mode::Browse => (
            "c=csv x=xlsx p=pdf l=logs o=open q=quit",
            app.status.clone(),
        ),
    };
    let mut text = vec![Line::raw(body)];
    if app.mode == Mode::Input {
        text.push(Line::styled(app.status.clone(), Style::default().fg(Color::Gray)));
    }
    let footer = Paragraph::new(Text::from(text))
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(footer, area);
}
