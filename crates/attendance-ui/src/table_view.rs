//! Rollup and performer tables.
//!
//! Each view renders a bordered [`ratatui::widgets::Table`] starting at a
//! scroll offset, with the rate column coloured by how close a row came to
//! its target.

use ratatui::{
    layout::{Constraint, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use attendance_core::formatting::{format_average, format_count, format_rate};
use attendance_core::models::{BranchMonthly, ConstituencyMonthly, Performer};

use crate::themes::Theme;

/// Display width of the widest of `header` and `values`, clamped to
/// `[min, max]`.
pub fn column_width<'a>(
    header: &str,
    values: impl IntoIterator<Item = &'a str>,
    min: u16,
    max: u16,
) -> u16 {
    let widest = values
        .into_iter()
        .map(UnicodeWidthStr::width)
        .chain(std::iter::once(header.width()))
        .max()
        .unwrap_or(0);
    (widest.min(u16::MAX as usize) as u16).clamp(min, max)
}

/// Render the monthly branch rollup starting at row `offset`.
pub fn render_branch_table(
    frame: &mut Frame,
    area: Rect,
    rows: &[BranchMonthly],
    offset: usize,
    theme: &Theme,
) {
    let headers = ["Year", "Month", "Constituency", "Branch", "Avg", "Target", "Rate"];

    let data_rows: Vec<Row> = rows
        .iter()
        .enumerate()
        .skip(offset)
        .map(|(i, row)| {
            Row::new(vec![
                Cell::from(row.year.clone()),
                Cell::from(row.month.clone()),
                Cell::from(row.constituency.clone()),
                Cell::from(row.branch.clone()),
                Cell::from(format_average(row.avg_attendance)),
                Cell::from(format_count(u64::from(row.target))),
                Cell::from(format_rate(row.rate)).style(theme.rate_style(row.rate)),
            ])
            .style(stripe(theme, i))
        })
        .collect();

    let widths = [
        Constraint::Length(6),
        Constraint::Length(column_width("Month", rows.iter().map(|r| r.month.as_str()), 5, 12)),
        Constraint::Length(column_width(
            "Constituency",
            rows.iter().map(|r| r.constituency.as_str()),
            12,
            28,
        )),
        Constraint::Length(column_width("Branch", rows.iter().map(|r| r.branch.as_str()), 6, 32)),
        Constraint::Length(10),
        Constraint::Length(8),
        Constraint::Length(10),
    ];

    render_table(frame, area, "Branch Monthly", &headers, widths, data_rows, rows.len(), theme);
}

/// Render the monthly constituency rollup starting at row `offset`.
pub fn render_constituency_table(
    frame: &mut Frame,
    area: Rect,
    rows: &[ConstituencyMonthly],
    offset: usize,
    theme: &Theme,
) {
    let headers = [
        "Year",
        "Month",
        "Constituency",
        "Reports",
        "Total",
        "Branches",
        "Total Target",
        "Avg",
        "Target",
        "Rate",
    ];

    let data_rows: Vec<Row> = rows
        .iter()
        .enumerate()
        .skip(offset)
        .map(|(i, row)| {
            Row::new(vec![
                Cell::from(row.year.clone()),
                Cell::from(row.month.clone()),
                Cell::from(row.constituency.clone()),
                Cell::from(format_count(row.report_count as u64)),
                Cell::from(format_count(row.total_attendance)),
                Cell::from(format_count(row.unique_branches as u64)),
                Cell::from(format_count(row.total_target)),
                Cell::from(format_average(row.avg_attendance)),
                Cell::from(format_count(row.target)),
                Cell::from(format_rate(row.rate)).style(theme.rate_style(row.rate)),
            ])
            .style(stripe(theme, i))
        })
        .collect();

    let widths = [
        Constraint::Length(6),
        Constraint::Length(column_width("Month", rows.iter().map(|r| r.month.as_str()), 5, 12)),
        Constraint::Length(column_width(
            "Constituency",
            rows.iter().map(|r| r.constituency.as_str()),
            12,
            28,
        )),
        Constraint::Length(8),
        Constraint::Length(9),
        Constraint::Length(9),
        Constraint::Length(13),
        Constraint::Length(10),
        Constraint::Length(8),
        Constraint::Length(10),
    ];

    render_table(
        frame,
        area,
        "Constituency Monthly",
        &headers,
        widths,
        data_rows,
        rows.len(),
        theme,
    );
}

/// Render a top or low performer list starting at row `offset`.
pub fn render_performer_table(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    rows: &[Performer],
    offset: usize,
    theme: &Theme,
) {
    let headers = ["#", "Year", "Month", "Constituency", "Branch", "Avg", "Rate"];

    // Rank restarts at 1 for every month.
    let mut ranks = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let same_month = i > 0 && rows[i - 1].month == row.month;
        let rank = if same_month { ranks[i - 1] + 1 } else { 1 };
        ranks.push(rank);
    }

    let data_rows: Vec<Row> = rows
        .iter()
        .zip(ranks)
        .enumerate()
        .skip(offset)
        .map(|(i, (row, rank))| {
            Row::new(vec![
                Cell::from(rank.to_string()),
                Cell::from(row.year.clone()),
                Cell::from(row.month.clone()),
                Cell::from(row.constituency.clone()),
                Cell::from(row.branch.clone()),
                Cell::from(format_average(row.avg_attendance)),
                Cell::from(format_rate(row.rate)).style(theme.rate_style(row.rate)),
            ])
            .style(stripe(theme, i))
        })
        .collect();

    let widths = [
        Constraint::Length(3),
        Constraint::Length(6),
        Constraint::Length(column_width("Month", rows.iter().map(|r| r.month.as_str()), 5, 12)),
        Constraint::Length(column_width(
            "Constituency",
            rows.iter().map(|r| r.constituency.as_str()),
            12,
            28,
        )),
        Constraint::Length(column_width("Branch", rows.iter().map(|r| r.branch.as_str()), 6, 32)),
        Constraint::Length(10),
        Constraint::Length(10),
    ];

    render_table(frame, area, title, &headers, widths, data_rows, rows.len(), theme);
}

/// Render a "no data" placeholder.
pub fn render_no_data(frame: &mut Frame, area: Rect, title: &str, theme: &Theme) {
    let text = vec![
        Line::from(""),
        Line::from(Span::styled("No attendance records to show", theme.warning)),
        Line::from(""),
        Line::from(Span::styled(
            "Check the dataset path and that its rows have a constituency, branch and attendance.",
            theme.dim,
        )),
        Line::from(Span::styled("Press 'q' or Ctrl+C to exit", theme.dim)),
    ];
    frame.render_widget(
        Paragraph::new(ratatui::text::Text::from(text)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.table_border)
                .title(format!(" {} ", title)),
        ),
        area,
    );
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn stripe(theme: &Theme, index: usize) -> ratatui::style::Style {
    if index % 2 == 0 {
        theme.table_row
    } else {
        theme.table_row_alt
    }
}

#[allow(clippy::too_many_arguments)]
fn render_table<const N: usize>(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    headers: &[&str; N],
    widths: [Constraint; N],
    rows: Vec<Row>,
    total: usize,
    theme: &Theme,
) {
    if total == 0 {
        render_no_data(frame, area, title, theme);
        return;
    }

    let header = Row::new(
        headers
            .iter()
            .map(|h| Cell::from(*h).style(theme.table_header)),
    )
    .height(1);

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.table_border)
                .title(Span::styled(format!(" {} ({} rows) ", title, total), theme.header)),
        )
        .style(theme.text);

    frame.render_widget(table, area);
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn branch_rows() -> Vec<BranchMonthly> {
        vec![
            BranchMonthly {
                year: "2025".to_string(),
                month: "July".to_string(),
                constituency: "Central".to_string(),
                branch: "Branch 1".to_string(),
                avg_attendance: 6.0,
                target: 12,
                rate: Some(50.0),
            },
            BranchMonthly {
                year: "2025".to_string(),
                month: "July".to_string(),
                constituency: "Central".to_string(),
                branch: "Branch 2".to_string(),
                avg_attendance: 5.0,
                target: 0,
                rate: None,
            },
        ]
    }

    fn performers() -> Vec<Performer> {
        branch_rows().iter().map(Performer::from).collect()
    }

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_column_width() {
        assert_eq!(column_width("Branch", ["B1", "B2"], 4, 30), 6);
        assert_eq!(column_width("Branch", ["A very long branch name"], 4, 30), 23);
        assert_eq!(column_width("Branch", ["x".repeat(50).as_str()], 4, 30), 30);
        assert_eq!(column_width("", std::iter::empty(), 4, 30), 4);
    }

    #[test]
    fn test_column_width_counts_display_columns() {
        // Wide characters take two cells each.
        assert_eq!(column_width("", ["教会"], 1, 30), 4);
    }

    #[test]
    fn test_render_branch_table_shows_rows() {
        let backend = TestBackend::new(120, 20);
        let mut terminal = Terminal::new(backend).unwrap();
        let theme = Theme::dark();
        let rows = branch_rows();

        terminal
            .draw(|frame| {
                let area = frame.area();
                render_branch_table(frame, area, &rows, 0, &theme);
            })
            .unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains("Branch Monthly"));
        assert!(text.contains("Branch 1"));
        assert!(text.contains("50.00%"));
        assert!(text.contains("n/a"));
    }

    #[test]
    fn test_render_branch_table_offset_skips_rows() {
        let backend = TestBackend::new(120, 20);
        let mut terminal = Terminal::new(backend).unwrap();
        let theme = Theme::dark();
        let rows = branch_rows();

        terminal
            .draw(|frame| {
                let area = frame.area();
                render_branch_table(frame, area, &rows, 1, &theme);
            })
            .unwrap();

        let text = buffer_text(&terminal);
        assert!(!text.contains("Branch 1"));
        assert!(text.contains("Branch 2"));
    }

    #[test]
    fn test_render_constituency_table_does_not_panic() {
        let backend = TestBackend::new(130, 20);
        let mut terminal = Terminal::new(backend).unwrap();
        let theme = Theme::light();
        let rows = vec![ConstituencyMonthly {
            year: "2025".to_string(),
            month: "July".to_string(),
            constituency: "Central".to_string(),
            report_count: 4,
            total_attendance: 23,
            unique_branches: 2,
            total_target: 32,
            avg_attendance: 5.75,
            target: 8,
            rate: Some(71.88),
        }];

        terminal
            .draw(|frame| {
                let area = frame.area();
                render_constituency_table(frame, area, &rows, 0, &theme);
            })
            .unwrap();

        assert!(buffer_text(&terminal).contains("71.88%"));
    }

    #[test]
    fn test_render_performer_table_does_not_panic() {
        let backend = TestBackend::new(120, 20);
        let mut terminal = Terminal::new(backend).unwrap();
        let theme = Theme::dark();
        let rows = performers();

        terminal
            .draw(|frame| {
                let area = frame.area();
                render_performer_table(frame, area, "Top Performers", &rows, 0, &theme);
            })
            .unwrap();

        assert!(buffer_text(&terminal).contains("Top Performers"));
    }

    #[test]
    fn test_render_empty_table_shows_placeholder() {
        let backend = TestBackend::new(100, 12);
        let mut terminal = Terminal::new(backend).unwrap();
        let theme = Theme::dark();

        terminal
            .draw(|frame| {
                let area = frame.area();
                render_branch_table(frame, area, &[], 0, &theme);
            })
            .unwrap();

        assert!(buffer_text(&terminal).contains("No attendance records"));
    }

    #[test]
    fn test_render_tiny_area_does_not_panic() {
        let backend = TestBackend::new(10, 3);
        let mut terminal = Terminal::new(backend).unwrap();
        let theme = Theme::dark();
        let rows = branch_rows();

        terminal
            .draw(|frame| {
                let area = frame.area();
                render_branch_table(frame, area, &rows, 0, &theme);
            })
            .unwrap();
    }
}
