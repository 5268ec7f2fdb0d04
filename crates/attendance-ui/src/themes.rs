use ratatui::style::{Color, Modifier, Style};

/// Terminal background type detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackgroundType {
    Dark,
    Light,
    Unknown,
}

/// Detect terminal background type from the `COLORFGBG` environment variable.
///
/// The variable has the format `"foreground;background"`.  Background values
/// 0–6 are considered dark; 7–15 are considered light.  If the variable is
/// absent or unparseable, `BackgroundType::Unknown` is returned.
pub fn detect_background() -> BackgroundType {
    std::env::var("COLORFGBG")
        .ok()
        .as_deref()
        .map(background_from_colorfgbg)
        .unwrap_or(BackgroundType::Unknown)
}

fn background_from_colorfgbg(value: &str) -> BackgroundType {
    match value.split(';').next_back().map(str::parse::<u8>) {
        Some(Ok(bg)) if bg <= 6 => BackgroundType::Dark,
        Some(Ok(_)) => BackgroundType::Light,
        _ => BackgroundType::Unknown,
    }
}

/// All styles used by the viewer.
#[derive(Debug, Clone)]
pub struct Theme {
    // ── Header / tabs ────────────────────────────────────────────────────────
    pub header: Style,
    pub tab: Style,
    pub tab_selected: Style,

    // ── Text ─────────────────────────────────────────────────────────────────
    pub text: Style,
    pub dim: Style,
    pub label: Style,
    pub warning: Style,

    // ── Rates ────────────────────────────────────────────────────────────────
    /// At or above target.
    pub rate_high: Style,
    /// 75 % of target or more.
    pub rate_medium: Style,
    pub rate_low: Style,

    // ── Table ────────────────────────────────────────────────────────────────
    pub table_header: Style,
    pub table_border: Style,
    pub table_row: Style,
    pub table_row_alt: Style,

    // ── Charts ───────────────────────────────────────────────────────────────
    pub bar_attendance: Style,
    pub bar_target: Style,
    pub bar_value: Style,
}

impl Theme {
    /// Dark-background terminal theme (default).
    pub fn dark() -> Self {
        Self {
            header: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            tab: Style::default().fg(Color::Gray),
            tab_selected: Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),

            text: Style::default().fg(Color::White),
            dim: Style::default().fg(Color::DarkGray),
            label: Style::default().fg(Color::Gray),
            warning: Style::default().fg(Color::Yellow),

            rate_high: Style::default().fg(Color::Green),
            rate_medium: Style::default().fg(Color::Yellow),
            rate_low: Style::default().fg(Color::Red),

            table_header: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            table_border: Style::default().fg(Color::DarkGray),
            table_row: Style::default().fg(Color::White),
            table_row_alt: Style::default().fg(Color::Gray),

            bar_attendance: Style::default().fg(Color::LightBlue),
            bar_target: Style::default().fg(Color::LightRed),
            bar_value: Style::default()
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        }
    }

    /// Light-background terminal theme.
    pub fn light() -> Self {
        Self {
            header: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            tab: Style::default().fg(Color::DarkGray),
            tab_selected: Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),

            text: Style::default().fg(Color::Black),
            dim: Style::default().fg(Color::Gray),
            label: Style::default().fg(Color::DarkGray),
            warning: Style::default().fg(Color::Yellow),

            rate_high: Style::default().fg(Color::Green),
            rate_medium: Style::default().fg(Color::Yellow),
            rate_low: Style::default().fg(Color::Red),

            table_header: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            table_border: Style::default().fg(Color::Gray),
            table_row: Style::default().fg(Color::Black),
            table_row_alt: Style::default().fg(Color::DarkGray),

            bar_attendance: Style::default().fg(Color::Blue),
            bar_target: Style::default().fg(Color::Red),
            bar_value: Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        }
    }

    /// Choose a theme automatically based on the detected terminal background.
    pub fn auto_detect() -> Self {
        match detect_background() {
            BackgroundType::Light => Self::light(),
            _ => Self::dark(),
        }
    }

    /// Construct a theme by name.  Falls back to `auto_detect` for unknown
    /// names.
    pub fn from_name(name: &str) -> Self {
        match name {
            "light" => Self::light(),
            "dark" => Self::dark(),
            _ => Self::auto_detect(),
        }
    }

    /// Style for an attendance rate; undefined rates are dimmed.
    pub fn rate_style(&self, rate: Option<f64>) -> Style {
        match rate {
            None => self.dim,
            Some(r) if r >= 100.0 => self.rate_high,
            Some(r) if r >= 75.0 => self.rate_medium,
            Some(_) => self.rate_low,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dark_theme_creation() {
        let t = Theme::dark();
        assert_eq!(t.header.fg, Some(Color::Cyan));
        assert_eq!(t.rate_high.fg, Some(Color::Green));
        assert_eq!(t.rate_low.fg, Some(Color::Red));
        assert_eq!(t.bar_attendance.fg, Some(Color::LightBlue));
    }

    #[test]
    fn test_light_theme_creation() {
        let t = Theme::light();
        assert_eq!(t.header.fg, Some(Color::Blue));
        assert_eq!(t.text.fg, Some(Color::Black));
        assert_eq!(t.table_row.fg, Some(Color::Black));
    }

    #[test]
    fn test_from_name() {
        assert_eq!(Theme::from_name("dark").header.fg, Some(Color::Cyan));
        assert_eq!(Theme::from_name("light").header.fg, Some(Color::Blue));
        // Unknown names must not panic and must return a valid theme.
        assert!(Theme::from_name("neon").header.fg.is_some());
    }

    #[test]
    fn test_background_from_colorfgbg() {
        assert_eq!(background_from_colorfgbg("15;0"), BackgroundType::Dark);
        assert_eq!(background_from_colorfgbg("0;15"), BackgroundType::Light);
        assert_eq!(background_from_colorfgbg("0;default"), BackgroundType::Unknown);
        assert_eq!(background_from_colorfgbg(""), BackgroundType::Unknown);
    }

    #[test]
    fn test_rate_style_thresholds() {
        let t = Theme::dark();
        assert_eq!(t.rate_style(None).fg, Some(Color::DarkGray));
        assert_eq!(t.rate_style(Some(40.0)).fg, Some(Color::Red));
        assert_eq!(t.rate_style(Some(75.0)).fg, Some(Color::Yellow));
        assert_eq!(t.rate_style(Some(99.99)).fg, Some(Color::Yellow));
        assert_eq!(t.rate_style(Some(100.0)).fg, Some(Color::Green));
        assert_eq!(t.rate_style(Some(180.0)).fg, Some(Color::Green));
    }
}
