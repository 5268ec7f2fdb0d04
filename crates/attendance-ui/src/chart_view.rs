//! Grouped bar charts of average attendance against target by month.
//!
//! One chart per constituency, and one per branch of a chosen constituency.
//! Each month is a bar group
//! holding an attendance bar and a target bar.

use std::collections::BTreeMap;

use chrono::Month;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Paragraph},
    Frame,
};

use attendance_core::formatting::{format_average, format_count};
use attendance_core::models::{BranchMonthly, ConstituencyMonthly};
use attendance_core::months::month_number;

use crate::themes::Theme;

const BAR_WIDTH: u16 = 4;
const BAR_GAP: u16 = 1;
const GROUP_GAP: u16 = 3;

/// One month of a chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartPoint {
    pub year: String,
    pub month: String,
    pub avg_attendance: f64,
    pub target: u64,
}

impl ChartPoint {
    /// Short x-axis label, e.g. `"Jul 25"`.
    pub fn label(&self) -> String {
        let month = month_number(&self.month)
            .and_then(|n| Month::try_from(n as u8).ok())
            .map(|m| m.name()[..3].to_string())
            .unwrap_or_else(|| self.month.chars().take(3).collect());
        let year: String = {
            let chars: Vec<char> = self.year.chars().collect();
            chars[chars.len().saturating_sub(2)..].iter().collect()
        };
        if year.is_empty() {
            month
        } else {
            format!("{month} {year}")
        }
    }
}

/// All months of one constituency or branch, in table order.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub title: String,
    pub points: Vec<ChartPoint>,
}

/// One series per constituency, alphabetically.
pub fn constituency_series(rows: &[ConstituencyMonthly]) -> Vec<ChartSeries> {
    let mut grouped: BTreeMap<&str, Vec<ChartPoint>> = BTreeMap::new();
    for row in rows {
        grouped
            .entry(row.constituency.as_str())
            .or_default()
            .push(ChartPoint {
                year: row.year.clone(),
                month: row.month.clone(),
                avg_attendance: row.avg_attendance,
                target: row.target,
            });
    }
    grouped
        .into_iter()
        .map(|(constituency, points)| ChartSeries {
            title: constituency.to_string(),
            points,
        })
        .collect()
}

/// One series per branch of `constituency`, alphabetically.
pub fn branch_series(rows: &[BranchMonthly], constituency: &str) -> Vec<ChartSeries> {
    let mut grouped: BTreeMap<&str, Vec<ChartPoint>> = BTreeMap::new();
    for row in rows.iter().filter(|r| r.constituency == constituency) {
        grouped
            .entry(row.branch.as_str())
            .or_default()
            .push(ChartPoint {
                year: row.year.clone(),
                month: row.month.clone(),
                avg_attendance: row.avg_attendance,
                target: u64::from(row.target),
            });
    }
    grouped
        .into_iter()
        .map(|(branch, points)| ChartSeries {
            title: branch.to_string(),
            points,
        })
        .collect()
}

/// Render `series[selected]` with a legend and a position indicator.
pub fn render_chart(
    frame: &mut Frame,
    area: Rect,
    kind: &str,
    series: &[ChartSeries],
    selected: usize,
    theme: &Theme,
) {
    let Some(current) = series.get(selected) else {
        crate::table_view::render_no_data(frame, area, kind, theme);
        return;
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.table_border)
        .title(Span::styled(
            format!(
                " {}: {} ({}/{}) ",
                kind,
                current.title,
                selected + 1,
                series.len()
            ),
            theme.header,
        ));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [legend_area, chart_area] =
        Layout::vertical([Constraint::Length(1), Constraint::Min(0)]).areas(inner);

    let legend = Line::from(vec![
        Span::styled("■ ", theme.bar_attendance),
        Span::styled("Avg attendance   ", theme.label),
        Span::styled("■ ", theme.bar_target),
        Span::styled("Target   ", theme.label),
        Span::styled("↑/↓ to change chart", theme.dim),
    ]);
    frame.render_widget(Paragraph::new(legend), legend_area);

    let mut chart = BarChart::default()
        .bar_width(BAR_WIDTH)
        .bar_gap(BAR_GAP)
        .group_gap(GROUP_GAP);
    for point in &current.points {
        chart = chart.data(month_group(point, theme));
    }
    frame.render_widget(chart, chart_area);
}

fn month_group(point: &ChartPoint, theme: &Theme) -> BarGroup<'static> {
    let attendance = Bar::default()
        .value(point.avg_attendance.round().max(0.0) as u64)
        .text_value(format_average(point.avg_attendance))
        .style(theme.bar_attendance)
        .value_style(value_style(theme, theme.bar_attendance));
    let target = Bar::default()
        .value(point.target)
        .text_value(format_count(point.target))
        .style(theme.bar_target)
        .value_style(value_style(theme, theme.bar_target));

    BarGroup::default()
        .label(Line::from(point.label()))
        .bars(&[attendance, target])
}

/// Value text drawn inside a bar, on the bar's own colour.
fn value_style(theme: &Theme, bar: Style) -> Style {
    theme.bar_value.bg(bar.fg.unwrap_or(Color::Reset))
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn constituency_row(constituency: &str, month: &str, avg: f64, target: u64) -> ConstituencyMonthly {
        ConstituencyMonthly {
            year: "2025".to_string(),
            month: month.to_string(),
            constituency: constituency.to_string(),
            report_count: 2,
            total_attendance: 0,
            unique_branches: 1,
            total_target: 0,
            avg_attendance: avg,
            target,
            rate: None,
        }
    }

    fn branch_row(constituency: &str, branch: &str, month: &str) -> BranchMonthly {
        BranchMonthly {
            year: "2025".to_string(),
            month: month.to_string(),
            constituency: constituency.to_string(),
            branch: branch.to_string(),
            avg_attendance: 6.0,
            target: 12,
            rate: Some(50.0),
        }
    }

    #[test]
    fn test_point_label() {
        let point = ChartPoint {
            year: "2025".to_string(),
            month: "July".to_string(),
            avg_attendance: 0.0,
            target: 0,
        };
        assert_eq!(point.label(), "Jul 25");

        let odd = ChartPoint {
            year: String::new(),
            month: "Harvest".to_string(),
            avg_attendance: 0.0,
            target: 0,
        };
        assert_eq!(odd.label(), "Har");
    }

    #[test]
    fn test_constituency_series_groups_by_name() {
        let rows = vec![
            constituency_row("Zion", "July", 5.0, 8),
            constituency_row("Abba", "July", 3.0, 4),
            constituency_row("Zion", "August", 6.0, 8),
        ];
        let series = constituency_series(&rows);

        assert_eq!(series.len(), 2);
        assert_eq!(series[0].title, "Abba");
        assert_eq!(series[1].title, "Zion");
        let months: Vec<&str> = series[1].points.iter().map(|p| p.month.as_str()).collect();
        assert_eq!(months, vec!["July", "August"]);
    }

    #[test]
    fn test_branch_series_scoped_to_constituency() {
        let rows = vec![
            branch_row("North", "N2", "July"),
            branch_row("North", "N1", "July"),
            branch_row("Central", "C1", "July"),
            branch_row("North", "N1", "August"),
        ];
        let north = branch_series(&rows, "North");
        let titles: Vec<&str> = north.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["N1", "N2"]);
        assert_eq!(north[0].points.len(), 2);

        assert_eq!(branch_series(&rows, "Central").len(), 1);
        assert!(branch_series(&rows, "South").is_empty());
    }

    #[test]
    fn test_render_chart_does_not_panic() {
        let backend = TestBackend::new(100, 25);
        let mut terminal = Terminal::new(backend).unwrap();
        let theme = Theme::dark();
        let series = constituency_series(&[
            constituency_row("Central", "June", 5.0, 8),
            constituency_row("Central", "July", 7.5, 8),
        ]);

        terminal
            .draw(|frame| {
                let area = frame.area();
                render_chart(frame, area, "Constituency", &series, 0, &theme);
            })
            .unwrap();

        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(text.contains("Central"));
        assert!(text.contains("(1/1)"));
    }

    #[test]
    fn test_render_chart_out_of_range_shows_placeholder() {
        let backend = TestBackend::new(80, 12);
        let mut terminal = Terminal::new(backend).unwrap();
        let theme = Theme::dark();

        terminal
            .draw(|frame| {
                let area = frame.area();
                render_chart(frame, area, "Branch", &[], 0, &theme);
            })
            .unwrap();
    }

    #[test]
    fn test_render_chart_tiny_area_does_not_panic() {
        let backend = TestBackend::new(8, 4);
        let mut terminal = Terminal::new(backend).unwrap();
        let theme = Theme::light();
        let series = branch_series(&[branch_row("North", "N1", "July")], "North");

        terminal
            .draw(|frame| {
                let area = frame.area();
                render_chart(frame, area, "Branch", &series, 0, &theme);
            })
            .unwrap();
    }
}
