//! Span and style helpers shared by the field and popup renderers.

use ratatui::{
    style::{Color, Modifier, Style},
    text::Span,
};

use nucleo_matcher::{Config, Matcher};
use ratatui_themes::ThemePalette;
use treecombo::{MatchMode, VisibleRow};

/// Semantic color palette derived from the active theme.
pub struct UiColors {
    pub caption: Color,
    pub branch: Color,
    pub value: Color,
    pub icon: Color,
    pub required: Color,
    pub error: Color,
    pub help: Color,
    pub active_border: Color,
    pub inactive_border: Color,
    pub selected_bg: Color,
    pub pending: Color,
    pub bg: Color,
    pub bar_bg: Color,
}

impl UiColors {
    pub fn from_palette(p: &ThemePalette) -> Self {
        let bar_bg = match p.bg {
            Color::Rgb(r, g, b) => Color::Rgb(
                r.saturating_add(10),
                g.saturating_add(10),
                b.saturating_add(15),
            ),
            _ => Color::Rgb(30, 30, 40),
        };

        let selected_bg = match p.selection {
            Color::Rgb(r, g, b) => Color::Rgb(r, g, b),
            _ => Color::Rgb(40, 40, 60),
        };

        Self {
            caption: p.fg,
            branch: p.info,
            value: p.accent,
            icon: p.secondary,
            required: p.error,
            error: p.error,
            help: p.muted,
            active_border: p.accent,
            inactive_border: p.muted,
            selected_bg,
            pending: p.warning,
            bg: p.bg,
            bar_bg,
        }
    }
}

/// Push the cursor indicator (`▶ ` or `  `) for a popup row.
pub fn push_selection_cursor(spans: &mut Vec<Span<'static>>, is_cursor: bool, colors: &UiColors) {
    if is_cursor {
        spans.push(Span::styled(
            "▶ ",
            Style::default()
                .fg(colors.active_border)
                .add_modifier(Modifier::BOLD),
        ));
    } else {
        spans.push(Span::raw("  "));
    }
}

/// Push indentation and the expand marker for a popup row.
pub fn push_tree_prefix(spans: &mut Vec<Span<'static>>, row: &VisibleRow, colors: &UiColors) {
    let indent = "  ".repeat(row.depth);
    let marker = match (row.has_children, row.expanded) {
        (true, true) => "▾ ",
        (true, false) => "▸ ",
        (false, _) => "  ",
    };
    spans.push(Span::raw(indent));
    spans.push(Span::styled(marker, Style::default().fg(colors.branch)));
}

/// `(normal, highlight)` styles for a caption.
fn highlight_styles(base_color: Color, bg_color: Color, is_cursor: bool) -> (Style, Style) {
    if is_cursor {
        (
            Style::default()
                .fg(base_color)
                .add_modifier(Modifier::BOLD),
            Style::default()
                .fg(bg_color)
                .bg(base_color)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        (
            Style::default().fg(base_color),
            Style::default()
                .fg(base_color)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        )
    }
}

/// Push a row caption, highlighting the characters the filter text matched.
/// The selected value is drawn in the value color.
pub fn push_caption(
    spans: &mut Vec<Span<'static>>,
    caption: &str,
    filter_text: &str,
    mode: MatchMode,
    is_cursor: bool,
    is_value: bool,
    colors: &UiColors,
) {
    let base = if is_value { colors.value } else { colors.caption };
    let (normal, highlight) = highlight_styles(base, colors.bg, is_cursor);
    spans.extend(build_highlighted_text(caption, filter_text, mode, normal, highlight));
}

/// Push the field text with an inline cursor (before + `▎` + after).
pub fn push_edit_cursor(
    spans: &mut Vec<Span<'static>>,
    before_cursor: &str,
    after_cursor: &str,
    style: Style,
    colors: &UiColors,
) {
    spans.push(Span::styled(before_cursor.to_string(), style));
    spans.push(Span::styled(
        "▎",
        Style::default()
            .fg(colors.active_border)
            .add_modifier(Modifier::SLOW_BLINK),
    ));
    spans.push(Span::styled(after_cursor.to_string(), style));
}

/// Split `text` into spans, styling the characters matched by `pattern`
/// under `mode` with `highlight_style`.
pub fn build_highlighted_text(
    text: &str,
    pattern: &str,
    mode: MatchMode,
    normal_style: Style,
    highlight_style: Style,
) -> Vec<Span<'static>> {
    let mut matcher = Matcher::new(Config::DEFAULT);
    let indices = treecombo::filter::match_indices(text, pattern, mode, &mut matcher);

    if indices.is_empty() {
        return vec![Span::styled(text.to_string(), normal_style)];
    }

    let mut spans = Vec::new();
    let chars: Vec<char> = text.chars().collect();
    let mut last_idx = 0;

    for &match_idx in &indices {
        let idx = match_idx as usize;
        if idx >= chars.len() {
            continue;
        }

        if last_idx < idx {
            let before: String = chars[last_idx..idx].iter().collect();
            spans.push(Span::styled(before, normal_style));
        }

        spans.push(Span::styled(chars[idx].to_string(), highlight_style));
        last_idx = idx + 1;
    }

    if last_idx < chars.len() {
        let after: String = chars[last_idx..].iter().collect();
        spans.push(Span::styled(after, normal_style));
    }

    spans
}
