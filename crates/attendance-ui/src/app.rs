//! Viewer state and terminal event loop.
//!
//! [`App`] owns the theme, the analysis result being shown, the selected tab
//! and one scroll position per tab.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame, Terminal,
};

use attendance_core::formatting::{format_average, format_count};
use attendance_data::analysis::AnalysisResult;

use crate::chart_view::{self, ChartSeries};
use crate::table_view;
use crate::themes::Theme;

// ── Tab ───────────────────────────────────────────────────────────────────────

/// Which view the viewer is currently rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    BranchMonthly,
    ConstituencyMonthly,
    TopPerformers,
    LowPerformers,
    ConstituencyCharts,
    BranchCharts,
}

impl Tab {
    pub const ALL: [Tab; 6] = [
        Tab::BranchMonthly,
        Tab::ConstituencyMonthly,
        Tab::TopPerformers,
        Tab::LowPerformers,
        Tab::ConstituencyCharts,
        Tab::BranchCharts,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Tab::BranchMonthly => "Branch Monthly",
            Tab::ConstituencyMonthly => "Constituency Monthly",
            Tab::TopPerformers => "Top Performers",
            Tab::LowPerformers => "Low Performers",
            Tab::ConstituencyCharts => "Constituency Charts",
            Tab::BranchCharts => "Branch Charts",
        }
    }

    fn index(self) -> usize {
        Tab::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }

    pub fn next(self) -> Tab {
        Tab::ALL[(self.index() + 1) % Tab::ALL.len()]
    }

    pub fn previous(self) -> Tab {
        Tab::ALL[(self.index() + Tab::ALL.len() - 1) % Tab::ALL.len()]
    }
}

// ── App ───────────────────────────────────────────────────────────────────────

/// Root state of the attendance viewer.
pub struct App {
    pub theme: Theme,
    pub tab: Tab,
    /// Scroll position per tab: first visible row, or selected chart.
    pub positions: [usize; 6],
    pub should_quit: bool,
    result: AnalysisResult,
    constituency_charts: Vec<ChartSeries>,
    /// Branch charts of each constituency, indexed like `constituency_charts`.
    branch_charts: Vec<Vec<ChartSeries>>,
}

impl App {
    pub fn new(theme_name: &str, result: AnalysisResult) -> Self {
        let constituency_charts = chart_view::constituency_series(&result.constituency_monthly);
        let branch_charts = constituency_charts
            .iter()
            .map(|c| chart_view::branch_series(&result.branch_monthly, &c.title))
            .collect();
        Self {
            theme: Theme::from_name(theme_name),
            tab: Tab::BranchMonthly,
            positions: [0; 6],
            should_quit: false,
            result,
            constituency_charts,
            branch_charts,
        }
    }

    /// Current scroll position of the active tab.
    pub fn position(&self) -> usize {
        self.positions[self.tab.index()]
    }

    /// Number of rows (or charts) in `tab`.
    pub fn item_count(&self, tab: Tab) -> usize {
        match tab {
            Tab::BranchMonthly => self.result.branch_monthly.len(),
            Tab::ConstituencyMonthly => self.result.constituency_monthly.len(),
            Tab::TopPerformers => self.result.top_performers.len(),
            Tab::LowPerformers => self.result.low_performers.len(),
            Tab::ConstituencyCharts => self.constituency_charts.len(),
            Tab::BranchCharts => self.current_branch_charts().len(),
        }
    }

    /// Constituency whose branches the branch charts show; the one selected
    /// on the constituency charts tab.
    pub fn selected_constituency(&self) -> Option<&str> {
        self.constituency_charts
            .get(self.positions[Tab::ConstituencyCharts.index()])
            .map(|c| c.title.as_str())
    }

    fn current_branch_charts(&self) -> &[ChartSeries] {
        self.branch_charts
            .get(self.positions[Tab::ConstituencyCharts.index()])
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    // ── Input ─────────────────────────────────────────────────────────────────

    /// Apply one key press.
    ///
    /// Tab/→ and Shift-Tab/← switch tabs, ↑/↓ scroll, `[`/`]` pick the
    /// constituency for branch charts, `q` or Ctrl+C quits.
    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Char('q') | KeyCode::Char('Q') => self.should_quit = true,
            KeyCode::Tab | KeyCode::Right => self.tab = self.tab.next(),
            KeyCode::BackTab | KeyCode::Left => self.tab = self.tab.previous(),
            KeyCode::Down | KeyCode::Char('j') => self.scroll_by(1),
            KeyCode::Up | KeyCode::Char('k') => self.scroll_by(-1),
            KeyCode::PageDown => self.scroll_by(10),
            KeyCode::PageUp => self.scroll_by(-10),
            KeyCode::Home => self.positions[self.tab.index()] = 0,
            KeyCode::Char(']') => self.select_constituency(1),
            KeyCode::Char('[') => self.select_constituency(-1),
            _ => {}
        }
    }

    /// Move the constituency selection and restart the branch charts.
    fn select_constituency(&mut self, delta: isize) {
        let last = self.constituency_charts.len().saturating_sub(1);
        let slot = &mut self.positions[Tab::ConstituencyCharts.index()];
        *slot = slot.saturating_add_signed(delta).min(last);
        self.positions[Tab::BranchCharts.index()] = 0;
    }

    fn scroll_by(&mut self, delta: isize) {
        if self.tab == Tab::ConstituencyCharts {
            self.select_constituency(delta);
            return;
        }
        let last = self.item_count(self.tab).saturating_sub(1);
        let slot = &mut self.positions[self.tab.index()];
        *slot = slot.saturating_add_signed(delta).min(last);
    }

    // ── Event loop ────────────────────────────────────────────────────────────

    /// Take over the terminal until the user quits.
    pub fn run(mut self) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let tick_rate = Duration::from_millis(250);

        let result = loop {
            if let Err(e) = terminal.draw(|frame| self.render(frame)) {
                break Err(e);
            }

            match event::poll(tick_rate) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) => self.handle_key(key),
                    Ok(_) => {}
                    Err(e) => break Err(e),
                },
                Ok(false) => {}
                Err(e) => break Err(e),
            }

            if self.should_quit {
                break Ok(());
            }
        };

        // Restore terminal state unconditionally.
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    // ── Rendering ─────────────────────────────────────────────────────────────

    /// Render the current application state into `frame`.
    pub fn render(&self, frame: &mut Frame) {
        let [tabs_area, body_area, footer_area] = Layout::vertical([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        let tabs = Tabs::new(Tab::ALL.iter().map(|t| t.title()))
            .select(self.tab.index())
            .style(self.theme.tab)
            .highlight_style(self.theme.tab_selected)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(self.theme.table_border)
                    .title(Span::styled(" Attendance Statistics ", self.theme.header)),
            );
        frame.render_widget(tabs, tabs_area);

        let position = self.position();
        let theme = &self.theme;
        match self.tab {
            Tab::BranchMonthly => table_view::render_branch_table(
                frame,
                body_area,
                &self.result.branch_monthly,
                position,
                theme,
            ),
            Tab::ConstituencyMonthly => table_view::render_constituency_table(
                frame,
                body_area,
                &self.result.constituency_monthly,
                position,
                theme,
            ),
            Tab::TopPerformers => table_view::render_performer_table(
                frame,
                body_area,
                Tab::TopPerformers.title(),
                &self.result.top_performers,
                position,
                theme,
            ),
            Tab::LowPerformers => table_view::render_performer_table(
                frame,
                body_area,
                Tab::LowPerformers.title(),
                &self.result.low_performers,
                position,
                theme,
            ),
            Tab::ConstituencyCharts => chart_view::render_chart(
                frame,
                body_area,
                "Constituency",
                &self.constituency_charts,
                position,
                theme,
            ),
            Tab::BranchCharts => {
                let kind = match self.selected_constituency() {
                    Some(constituency) => format!("{constituency} branch"),
                    None => "Branch".to_string(),
                };
                chart_view::render_chart(
                    frame,
                    body_area,
                    &kind,
                    self.current_branch_charts(),
                    position,
                    theme,
                )
            }
        }

        frame.render_widget(Paragraph::new(self.footer()), footer_area);
    }

    fn footer(&self) -> Line<'static> {
        let overview = &self.result.overview;
        Line::from(vec![
            Span::styled(
                format!(
                    " {} records | {} constituencies | {} branches | avg {} ",
                    format_count(overview.record_count as u64),
                    format_count(overview.constituency_count as u64),
                    format_count(overview.branch_count as u64),
                    format_average(overview.avg_attendance),
                ),
                self.theme.label,
            ),
            Span::styled(
                " Tab/←→ switch  ↑↓ scroll  [ ] constituency  q quit",
                self.theme.dim,
            ),
        ])
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
