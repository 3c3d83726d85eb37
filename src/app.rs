use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use ratatui_interact::traits::ClickRegionRegistry;
use ratatui_themes::{ThemeName, ThemePalette};
use treecombo::{ComboAction, ComboFocus, ComboOptions, NodeId, TreeComboBox, TreeData, ValueChange};

/// Actions that the event loop should take after handling an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    None,
    Quit,
    Accept,
}

/// Clickable parts of the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Field,
    ClearButton,
    OpenButton,
    Popup,
}

/// Width of the row cursor indicator drawn before each popup row.
pub const CURSOR_WIDTH: u16 = 2;

/// Main application state.
pub struct App {
    pub combo: TreeComboBox<String>,

    /// Shown in the header bar.
    pub title: String,

    /// Restored by the reset key.
    pub default_value: Option<NodeId>,

    /// Current color theme.
    pub theme_name: ThemeName,

    /// Last value change or setting change, shown in the status line.
    pub status: Option<String>,

    /// Click region registry for mouse hit-testing.
    pub click_regions: ClickRegionRegistry<Region>,
}

impl App {
    pub fn new(
        title: impl Into<String>,
        data: TreeData<String>,
        options: ComboOptions,
        default_value: Option<NodeId>,
    ) -> Self {
        Self::with_theme(title, data, options, default_value, ThemeName::default())
    }

    pub fn with_theme(
        title: impl Into<String>,
        data: TreeData<String>,
        options: ComboOptions,
        default_value: Option<NodeId>,
        theme_name: ThemeName,
    ) -> Self {
        let mut combo = TreeComboBox::with_tree_data(data, |label: &String| label.clone());
        combo.set_options(options);
        combo.set_value(default_value);
        Self {
            combo,
            title: title.into(),
            default_value,
            theme_name,
            status: None,
            click_regions: ClickRegionRegistry::new(),
        }
    }

    pub fn palette(&self) -> ThemePalette {
        self.theme_name.palette()
    }

    pub fn next_theme(&mut self) {
        self.theme_name = self.theme_name.next();
    }

    pub fn prev_theme(&mut self) {
        self.theme_name = self.theme_name.prev();
    }

    /// Caption of the selected value.
    pub fn value_caption(&self) -> Option<String> {
        self.combo.value().and_then(|id| self.combo.caption(id))
    }

    /// Captions from the root down to the selected value, joined by ` / `.
    pub fn value_path(&self) -> Option<String> {
        let id = self.combo.value()?;
        let data = self.combo.tree_data();
        let mut path: Vec<NodeId> = data.ancestors(id);
        path.reverse();
        path.push(id);
        let captions: Vec<String> = path.iter().filter_map(|n| self.combo.caption(*n)).collect();
        Some(captions.join(" / "))
    }

    fn record_change(&mut self, change: ValueChange) {
        let caption = change.value.and_then(|id| self.combo.caption(id));
        tracing::info!(
            old = ?change.old,
            value = ?change.value,
            from_user = change.from_user,
            "value change"
        );
        self.status = Some(match caption {
            Some(caption) => format!("Value change: {caption}"),
            None => "No value".to_string(),
        });
    }

    fn record(&mut self, change: Option<ValueChange>) {
        if let Some(change) = change {
            self.record_change(change);
        }
    }

    /// Restore the default value.
    pub fn reset(&mut self) {
        let change = self.combo.set_value(self.default_value);
        self.record(change);
    }

    /// Advance the debounce timer; true when the screen needs a redraw.
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.combo.has_pending_input() {
            return false;
        }
        let change = self.combo.tick(now);
        self.record(change);
        !self.combo.has_pending_input()
    }

    fn cycle_match_mode(&mut self) {
        let mode = self.combo.match_mode().next();
        self.combo.set_match_mode(mode);
        self.status = Some(format!("Match mode: {mode}"));
    }

    fn toggle_leafs_only(&mut self) {
        let only_leafs = !self.combo.options().select_only_leafs;
        self.combo.set_select_only_leafs(only_leafs);
        self.status = Some(format!(
            "Leafs only: {}",
            if only_leafs { "on" } else { "off" }
        ));
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) -> Action {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('q') {
            return Action::Quit;
        }

        match key.code {
            KeyCode::F(2) => {
                self.cycle_match_mode();
                return Action::None;
            }
            KeyCode::F(3) => {
                self.toggle_leafs_only();
                return Action::None;
            }
            KeyCode::F(4) => {
                self.reset();
                return Action::None;
            }
            KeyCode::F(5) => {
                self.next_theme();
                return Action::None;
            }
            KeyCode::F(6) => {
                self.prev_theme();
                return Action::None;
            }
            _ => {}
        }

        match self.combo.handle_key(key, now) {
            ComboAction::None => Action::None,
            ComboAction::ValueChanged(change) => {
                self.record_change(change);
                Action::None
            }
            ComboAction::Ignored => match key.code {
                KeyCode::Enter if self.combo.value().is_some() => Action::Accept,
                KeyCode::Esc => Action::Quit,
                _ => Action::None,
            },
        }
    }

    /// Handle a mouse event and return the resulting Action.
    pub fn handle_mouse(&mut self, event: MouseEvent) -> Action {
        let col = event.column;
        let row = event.row;

        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                let Some(&region) = self.click_regions.handle_click(col, row) else {
                    // Clicking outside closes the popup.
                    if self.combo.is_opened() {
                        self.combo.close_popup();
                    }
                    return Action::None;
                };
                match region {
                    Region::ClearButton => {
                        let change = self.combo.clear();
                        self.record(change);
                    }
                    Region::OpenButton => self.combo.toggle_popup(),
                    Region::Field => self.combo.focus(),
                    Region::Popup => self.click_popup_row(col, row),
                }
                Action::None
            }
            MouseEventKind::ScrollUp if self.combo.is_opened() => {
                let idx = self.combo.cursor_index().saturating_sub(1);
                self.combo.set_cursor_index(idx);
                Action::None
            }
            MouseEventKind::ScrollDown if self.combo.is_opened() => {
                let idx = self.combo.cursor_index() + 1;
                self.combo.set_cursor_index(idx);
                Action::None
            }
            _ => Action::None,
        }
    }

    /// A click on a popup row picks it; a click on the expand marker of a
    /// parent toggles it instead.
    fn click_popup_row(&mut self, col: u16, row: u16) {
        let Some(area) = self.region_area(Region::Popup) else {
            return;
        };
        let inner_top = area.y + 1;
        if row < inner_top {
            return;
        }
        let idx = self.combo.scroll_offset() + (row - inner_top) as usize;
        let rows = self.combo.visible_rows();
        let Some(clicked) = rows.get(idx).copied() else {
            return;
        };

        self.combo.set_cursor_index(idx);
        self.combo.focus_tree();

        let marker_start = area.x + 1 + CURSOR_WIDTH + 2 * clicked.depth as u16;
        let on_marker = (marker_start..marker_start + 2).contains(&col);
        if clicked.has_children && on_marker {
            self.combo.toggle_expanded(clicked.id);
        } else {
            let change = self.combo.pick(clicked.id);
            self.record(change);
        }
    }

    fn region_area(&self, region: Region) -> Option<Rect> {
        self.click_regions
            .regions()
            .iter()
            .find(|r| r.data == region)
            .map(|r| r.area)
    }

    /// Keep the popup cursor within the given viewport height.
    pub fn ensure_visible(&mut self, viewport_height: usize) {
        self.combo.ensure_cursor_visible(viewport_height);
    }

    pub fn tree_focused(&self) -> bool {
        self.combo.is_opened() && self.combo.focused() == ComboFocus::Tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use treecombo::dataset::DemoKind;

    fn departments() -> App {
        let demo = DemoKind::Departments.build().unwrap();
        let options = demo.config.to_options();
        App::new("departments", demo.data, options, demo.default_value)
    }

    fn plain() -> App {
        let demo = DemoKind::Departments.build().unwrap();
        App::new("departments", demo.data, ComboOptions::default(), None)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn click(column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    fn type_text(app: &mut App, text: &str, now: Instant) {
        for c in text.chars() {
            app.handle_key(key(KeyCode::Char(c)), now);
        }
    }

    #[test]
    fn test_app_starts_on_default_value() {
        let app = departments();
        assert_eq!(app.value_caption().as_deref(), Some("Research"));
        assert_eq!(app.combo.text(), "Research");
        assert_eq!(app.status, None);
    }

    #[test]
    fn test_value_path() {
        let app = departments();
        assert_eq!(
            app.value_path().as_deref(),
            Some("Product Development / Research")
        );
    }

    #[test]
    fn test_typing_resolves_after_debounce() {
        let mut app = plain();
        let start = Instant::now();
        type_text(&mut app, "pay", start);
        assert!(!app.tick(start + Duration::from_millis(500)));
        assert!(app.tick(start + Duration::from_millis(1000)));
        assert_eq!(app.value_caption().as_deref(), Some("Payroll"));
        assert_eq!(app.status.as_deref(), Some("Value change: Payroll"));
    }

    #[test]
    fn test_enter_accepts_selected_value() {
        let mut app = departments();
        assert_eq!(app.handle_key(key(KeyCode::Enter), Instant::now()), Action::Accept);
    }

    #[test]
    fn test_enter_without_value_does_nothing() {
        let mut app = plain();
        assert_eq!(app.handle_key(key(KeyCode::Enter), Instant::now()), Action::None);
    }

    #[test]
    fn test_quit_keys() {
        let mut app = plain();
        let now = Instant::now();
        assert_eq!(
            app.handle_key(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL), now),
            Action::Quit
        );
        assert_eq!(app.handle_key(key(KeyCode::Esc), now), Action::Quit);
    }

    #[test]
    fn test_esc_closes_popup_before_quitting() {
        let mut app = plain();
        let now = Instant::now();
        app.handle_key(key(KeyCode::Down), now);
        assert!(app.tree_focused());
        assert_eq!(app.handle_key(key(KeyCode::Esc), now), Action::None);
        assert!(!app.combo.is_opened());
    }

    #[test]
    fn test_function_keys_change_settings() {
        let mut app = plain();
        let now = Instant::now();
        app.handle_key(key(KeyCode::F(2)), now);
        assert_eq!(app.status.as_deref(), Some("Match mode: exact-case"));
        app.handle_key(key(KeyCode::F(3)), now);
        assert!(app.combo.options().select_only_leafs);
        assert_eq!(app.status.as_deref(), Some("Leafs only: on"));

        let theme = app.theme_name;
        app.handle_key(key(KeyCode::F(5)), now);
        assert_ne!(app.theme_name, theme);
        app.handle_key(key(KeyCode::F(6)), now);
        assert_eq!(app.theme_name, theme);
    }

    #[test]
    fn test_reset_restores_default_value() {
        let mut app = departments();
        let finance = app.combo.tree_data().find(|s| s == "Finance").unwrap();
        app.combo.set_value(Some(finance));
        app.handle_key(key(KeyCode::F(4)), Instant::now());
        assert_eq!(app.value_caption().as_deref(), Some("Research"));
        assert_eq!(app.status.as_deref(), Some("Value change: Research"));
    }

    #[test]
    fn test_clear_button_click() {
        let mut app = plain();
        let sales = app.combo.tree_data().find(|s| s == "Sales").unwrap();
        app.combo.set_value(Some(sales));
        app.click_regions.clear();
        app.click_regions.register(Rect::new(30, 1, 1, 1), Region::ClearButton);

        app.handle_mouse(click(30, 1));
        assert_eq!(app.combo.value(), None);
        assert_eq!(app.status.as_deref(), Some("No value"));
    }

    #[test]
    fn test_open_button_and_outside_click() {
        let mut app = plain();
        app.click_regions.clear();
        app.click_regions.register(Rect::new(32, 2, 1, 1), Region::OpenButton);

        app.handle_mouse(click(32, 2));
        assert!(app.combo.is_opened());

        app.handle_mouse(click(70, 20));
        assert!(!app.combo.is_opened());
    }

    #[test]
    fn test_popup_click_picks_row() {
        let mut app = plain();
        app.combo.open_popup();
        app.click_regions.clear();
        app.click_regions.register(Rect::new(2, 4, 30, 7), Region::Popup);

        // Rows: Product Development, Sales, Marketing, Human Resources, Finance.
        app.handle_mouse(click(20, 9));
        assert_eq!(app.value_caption().as_deref(), Some("Finance"));
        assert!(!app.combo.is_opened());
    }

    #[test]
    fn test_popup_click_on_marker_toggles() {
        let mut app = plain();
        app.combo.open_popup();
        app.click_regions.clear();
        app.click_regions.register(Rect::new(2, 4, 30, 7), Region::Popup);

        // Marker of the "Sales" row: x = 2 + 1 border + 2 cursor.
        app.handle_mouse(click(5, 6));
        let sales = app.combo.tree_data().find(|s| s == "Sales").unwrap();
        assert!(app.combo.tree().is_expanded(sales));
        assert_eq!(app.combo.value(), None);
        assert!(app.combo.is_opened());
    }

    #[test]
    fn test_mouse_scroll_moves_cursor() {
        let mut app = plain();
        app.combo.open_popup();
        let scroll = |kind| MouseEvent {
            kind,
            column: 0,
            row: 0,
            modifiers: KeyModifiers::NONE,
        };
        app.handle_mouse(scroll(MouseEventKind::ScrollDown));
        app.handle_mouse(scroll(MouseEventKind::ScrollDown));
        assert_eq!(app.combo.cursor_index(), 2);
        app.handle_mouse(scroll(MouseEventKind::ScrollUp));
        assert_eq!(app.combo.cursor_index(), 1);
    }

    #[test]
    fn test_click_region_registry() {
        let mut app = plain();
        app.click_regions.clear();
        app.click_regions.register(Rect::new(2, 1, 30, 3), Region::Field);
        assert_eq!(app.click_regions.handle_click(10, 2), Some(&Region::Field));
        assert_eq!(app.click_regions.handle_click(50, 2), None);
        assert_eq!(app.region_area(Region::Field), Some(Rect::new(2, 1, 30, 3)));
    }
}
