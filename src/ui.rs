use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};
use treecombo::{ComboFocus, HierarchicalDataView};

use crate::app::{App, Region};
use crate::widgets::{
    push_caption, push_edit_cursor, push_selection_cursor, push_tree_prefix, UiColors,
};

/// Maximum popup height, borders included.
const POPUP_MAX_HEIGHT: u16 = 12;

/// Main render function called from the event loop. Registers the click
/// regions for the frame it draws.
pub fn render(frame: &mut Frame, app: &mut App) {
    let area = frame.area();
    let colors = UiColors::from_palette(&app.palette());
    app.click_regions.clear();

    // [header] [combo box + popup] [status] [key hints]
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(5),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(area);

    render_header(frame, app, outer[0], &colors);
    render_combo(frame, app, outer[1], &colors);
    render_status(frame, app, outer[2], &colors);
    render_help_bar(frame, app, outer[3], &colors);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect, colors: &UiColors) {
    let options = app.combo.options();
    let spans = vec![
        Span::styled(" treecombo", Style::default().fg(colors.value).bold()),
        Span::styled(" > ", Style::default().fg(colors.help)),
        Span::styled(app.title.clone(), Style::default().fg(colors.branch).bold()),
        Span::styled(
            format!("   mode: {}", options.match_mode),
            Style::default().fg(colors.help),
        ),
        Span::styled(
            format!(
                "   leafs only: {}",
                if options.select_only_leafs { "on" } else { "off" }
            ),
            Style::default().fg(colors.help),
        ),
    ];
    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(colors.bar_bg));
    frame.render_widget(paragraph, area);
}

fn render_combo(frame: &mut Frame, app: &mut App, area: Rect, colors: &UiColors) {
    if area.width < 8 || area.height < 3 {
        return;
    }
    let options = app.combo.options().clone();
    let field_width = options.width.clamp(8, area.width.saturating_sub(2).max(8));
    let field = Rect::new(area.x + 1, area.y + 1, field_width, 3).intersection(area);

    render_field(frame, app, field, colors);

    // Helper text, or the error message while invalid.
    let below = Rect::new(field.x + 1, field.bottom(), field.width.saturating_sub(1), 1).intersection(area);
    let hint = if options.invalid {
        options
            .error_message
            .as_deref()
            .map(|msg| Span::styled(msg.to_string(), Style::default().fg(colors.error)))
    } else {
        options
            .helper_text
            .as_deref()
            .map(|text| Span::styled(text.to_string(), Style::default().fg(colors.help).italic()))
    };
    if let Some(hint) = hint {
        frame.render_widget(Paragraph::new(Line::from(hint)), below);
    }

    if let Some(tooltip) = &options.tooltip_text {
        let x = field.right() + 1;
        if x < area.right() {
            let tip = Rect::new(x, field.y + 1, area.right() - x, 1);
            frame.render_widget(
                Paragraph::new(Line::from(Span::styled(
                    format!("ⓘ {tooltip}"),
                    Style::default().fg(colors.help),
                ))),
                tip,
            );
        }
    }

    if app.combo.is_opened() {
        render_popup(frame, app, field, area, colors);
    }
}

fn render_field(frame: &mut Frame, app: &mut App, area: Rect, colors: &UiColors) {
    let options = app.combo.options().clone();
    let field_focused = app.combo.focused() == ComboFocus::Field;

    let border_color = if options.invalid {
        colors.error
    } else if field_focused {
        colors.active_border
    } else {
        colors.inactive_border
    };

    let mut title = Vec::new();
    if let Some(label) = &options.label {
        title.push(Span::styled(
            format!(" {label}"),
            Style::default().fg(border_color).bold(),
        ));
        if options.required_indicator_visible {
            title.push(Span::styled(" *", Style::default().fg(colors.required).bold()));
        }
        title.push(Span::raw(" "));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(Line::from(title));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let show_clear =
        options.clear_button_visible && !options.read_only && !app.combo.text().is_empty();
    let buttons_width: u16 = if show_clear { 4 } else { 2 };
    let parts = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(buttons_width)])
        .split(inner);
    let (text_area, buttons) = (parts[0], parts[1]);

    let mut spans = Vec::new();
    if let Some(icon) = &options.icon {
        spans.push(Span::styled(format!("{icon} "), Style::default().fg(colors.icon)));
    }

    let text = app.combo.text().to_string();
    let text_style = if options.read_only {
        Style::default().fg(colors.help)
    } else if app.combo.is_autoselected() && field_focused {
        Style::default().fg(colors.caption).bg(colors.selected_bg)
    } else {
        Style::default().fg(colors.caption)
    };
    if field_focused && !options.read_only && !app.combo.is_autoselected() {
        let cursor = app.combo.input().cursor_pos;
        let before: String = text.chars().take(cursor).collect();
        let after: String = text.chars().skip(cursor).collect();
        push_edit_cursor(&mut spans, &before, &after, text_style, colors);
    } else {
        spans.push(Span::styled(text, text_style));
    }
    if app.combo.has_pending_input() {
        spans.push(Span::styled(" …", Style::default().fg(colors.pending)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), text_area);
    app.click_regions.register(text_area, Region::Field);

    let mut button_spans = Vec::new();
    if show_clear {
        button_spans.push(Span::styled(" ×", Style::default().fg(colors.help)));
        app.click_regions
            .register(Rect::new(buttons.x + 1, buttons.y, 1, 1), Region::ClearButton);
    }
    let open_symbol = if app.combo.is_opened() { " ▲" } else { " ▼" };
    let open_style = if options.read_only {
        Style::default().fg(colors.inactive_border).add_modifier(Modifier::DIM)
    } else {
        Style::default().fg(colors.active_border)
    };
    button_spans.push(Span::styled(open_symbol, open_style));
    if !options.read_only {
        app.click_regions.register(
            Rect::new(buttons.right().saturating_sub(1), buttons.y, 1, 1),
            Region::OpenButton,
        );
    }
    frame.render_widget(Paragraph::new(Line::from(button_spans)), buttons);
}

/// Render the popup tree anchored below the field.
fn render_popup(frame: &mut Frame, app: &mut App, field: Rect, area: Rect, colors: &UiColors) {
    let top = field.bottom();
    let available = area.bottom().saturating_sub(top);
    let rows = app.combo.visible_rows();
    let wanted = (rows.len().max(1) as u16).saturating_add(2);
    let height = wanted.min(POPUP_MAX_HEIGHT).min(available);
    if height < 3 {
        return;
    }
    let width = app
        .combo
        .popup_width()
        .min(area.right().saturating_sub(field.x))
        .max(8);
    let popup = Rect::new(field.x, top, width, height).intersection(area);

    let viewport = popup.height.saturating_sub(2) as usize;
    app.ensure_visible(viewport);

    let tree_focused = app.tree_focused();
    let border_color = if tree_focused {
        colors.active_border
    } else {
        colors.inactive_border
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));
    let inner = block.inner(popup);

    frame.render_widget(Clear, popup);
    frame.render_widget(block, popup);
    app.click_regions.register(popup, Region::Popup);

    if rows.is_empty() {
        frame.render_widget(
            Paragraph::new(Span::styled(
                "No matches",
                Style::default().fg(colors.help).italic(),
            )),
            inner,
        );
        return;
    }

    let value = app.combo.value();
    let cursor = app.combo.cursor_index();
    let mode = app.combo.match_mode();
    let filter_text = app.combo.applied_filter().unwrap_or_default().to_string();
    let label = app.combo.label_provider();

    let lines: Vec<Line> = rows
        .iter()
        .enumerate()
        .skip(app.combo.scroll_offset())
        .take(viewport)
        .map(|(i, row)| {
            let is_cursor = tree_focused && i == cursor;
            let caption = app
                .combo
                .data_provider()
                .item(row.id)
                .map(|item| label(item))
                .unwrap_or_default();

            let mut spans = Vec::new();
            push_selection_cursor(&mut spans, is_cursor, colors);
            push_tree_prefix(&mut spans, row, colors);
            push_caption(
                &mut spans,
                &caption,
                &filter_text,
                mode,
                is_cursor,
                value == Some(row.id),
                colors,
            );
            let line = Line::from(spans);
            if is_cursor {
                line.style(Style::default().bg(colors.selected_bg))
            } else {
                line
            }
        })
        .collect();

    frame.render_widget(Paragraph::new(lines), inner);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect, colors: &UiColors) {
    let (text, color) = if app.combo.has_pending_input() {
        ("Filtering…".to_string(), colors.pending)
    } else if let Some(status) = &app.status {
        (status.clone(), colors.value)
    } else if let Some(caption) = app.value_caption() {
        (format!("Value: {caption}"), colors.caption)
    } else {
        ("No value".to_string(), colors.help)
    };
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(format!(" {text}"), Style::default().fg(color)))),
        area,
    );
}

fn render_help_bar(frame: &mut Frame, app: &App, area: Rect, colors: &UiColors) {
    let keybinds = if app.tree_focused() {
        "↑↓: navigate  ←→: collapse/expand  Enter: pick  Esc: close"
    } else if app.combo.is_read_only() {
        "F4: reset  F5/F6: theme  Esc: quit"
    } else {
        "↓: browse  Enter: accept  Ctrl+U: clear  F2: mode  F3: leafs  F4: reset  F5/F6: theme  Esc: quit"
    };
    let hints = Paragraph::new(Line::from(Span::styled(
        format!(" {keybinds}"),
        Style::default().fg(colors.help),
    )))
    .style(Style::default().bg(colors.bar_bg));
    frame.render_widget(hints, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, Terminal};
    use std::time::Instant;
    use treecombo::dataset::{into_tree_data, parse_dataset, DemoKind};
    use treecombo::ComboOptions;

    fn departments() -> App {
        let demo = DemoKind::Departments.build().unwrap();
        let options = demo.config.to_options();
        App::new("departments", demo.data, options, demo.default_value)
    }

    fn catalog(options: ComboOptions) -> App {
        let data = parse_dataset(
            include_str!("../fixtures/catalog.json"),
            std::path::Path::new("catalog.json"),
        )
        .unwrap();
        App::new("catalog", data, options, None)
    }

    fn render_to_string(app: &mut App, width: u16, height: u16) -> String {
        let backend = TestBackend::new(width, height);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|frame| render(frame, app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        let mut output = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                let cell = &buffer[(x, y)];
                output.push_str(cell.symbol());
            }
            let trimmed = output.trim_end();
            output = trimmed.to_string();
            output.push('\n');
        }
        output
    }

    #[test]
    fn test_field_shows_label_value_and_helper() {
        let mut app = departments();
        let output = render_to_string(&mut app, 80, 20);
        assert!(output.contains("Select one"));
        assert!(output.contains("Research"));
        assert!(output.contains("Type to filter, Down to browse"));
        assert!(output.contains("ⓘ Pick the owning department"));
        assert!(output.contains("▼"));
        assert!(output.contains("Value: Research"));
        // The demo hides the clear button.
        assert!(!output.contains("×"));
    }

    #[test]
    fn test_open_popup_reveals_value() {
        let mut app = departments();
        app.combo.open_popup();
        let output = render_to_string(&mut app, 80, 20);
        assert!(output.contains("▾ Product Development"));
        assert!(output.contains("▸ Research"));
        assert!(output.contains("▸ Sales"));
        assert!(output.contains("▲"));
    }

    #[test]
    fn test_popup_shows_cursor_when_tree_focused() {
        let mut app = catalog(ComboOptions::default());
        app.handle_key(
            crossterm::event::KeyEvent::new(
                crossterm::event::KeyCode::Down,
                crossterm::event::KeyModifiers::NONE,
            ),
            Instant::now(),
        );
        let output = render_to_string(&mut app, 80, 20);
        assert!(output.contains("▶ ▸ Fruit"));
        assert!(output.contains("Enter: pick"));
    }

    #[test]
    fn test_filtered_popup_and_no_matches() {
        let mut app = catalog(ComboOptions::default());
        app.combo.apply_filter_text("berry", true);
        let output = render_to_string(&mut app, 80, 20);
        assert!(output.contains("▾ Berries"));
        assert!(output.contains("Strawberry"));
        assert!(!output.contains("Citrus"));
        assert!(!output.contains("Honey"));

        app.combo.apply_filter_text("kiwi", true);
        let output = render_to_string(&mut app, 80, 20);
        assert!(output.contains("No matches"));
    }

    #[test]
    fn test_clear_button_and_regions() {
        let mut app = catalog(ComboOptions::default());
        let honey = app.combo.tree_data().find(|s| s == "Honey");
        app.combo.set_value(honey);
        let output = render_to_string(&mut app, 80, 20);
        assert!(output.contains("×"));
        let regions: Vec<Region> = app.click_regions.regions().iter().map(|r| r.data).collect();
        assert!(regions.contains(&Region::Field));
        assert!(regions.contains(&Region::ClearButton));
        assert!(regions.contains(&Region::OpenButton));
        assert!(!regions.contains(&Region::Popup));
    }

    #[test]
    fn test_required_invalid_and_read_only() {
        let options = ComboOptions {
            label: Some("Product".to_string()),
            required_indicator_visible: true,
            invalid: true,
            error_message: Some("Pick a product".to_string()),
            helper_text: Some("Hidden while invalid".to_string()),
            read_only: true,
            ..ComboOptions::default()
        };
        let mut app = catalog(options);
        let output = render_to_string(&mut app, 80, 20);
        assert!(output.contains("Product *"));
        assert!(output.contains("Pick a product"));
        assert!(!output.contains("Hidden while invalid"));
        let regions: Vec<Region> = app.click_regions.regions().iter().map(|r| r.data).collect();
        assert!(!regions.contains(&Region::OpenButton));
    }

    #[test]
    fn test_icon_and_status_line() {
        let mut app = App::new(
            "tiny",
            into_tree_data(vec![treecombo::dataset::DatasetNode::leaf("Only")]).unwrap(),
            ComboOptions {
                icon: Some("#".to_string()),
                ..ComboOptions::default()
            },
            None,
        );
        let output = render_to_string(&mut app, 60, 10);
        assert!(output.contains("# "));
        assert!(output.contains("No value"));
    }

    #[test]
    fn test_small_terminal_does_not_panic() {
        let mut app = departments();
        app.combo.open_popup();
        let _ = render_to_string(&mut app, 12, 5);
        let _ = render_to_string(&mut app, 4, 2);
    }
}
