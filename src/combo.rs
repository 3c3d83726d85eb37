//! The tree combo box: a text field, an open button and a popup tree over a
//! hierarchical data view, with single selection.
//!
//! Typed text is debounced; once it has been stable for the value change
//! timeout the text becomes a filter on the data view and the combo box
//! drills down from the root while exactly one child matches, selecting the
//! item where the matches run out. Selecting an item (by resolution, by
//! picking it in the popup, or programmatically) shows its caption in the
//! field and closes the popup.

use std::rc::Rc;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui_interact::components::InputState;
use ratatui_interact::state::FocusManager;

use crate::debounce::{Debouncer, DEFAULT_WINDOW};
use crate::filter::{build_predicate, LabelProvider, MatchMode, Predicate};
use crate::tree_data::{HierarchicalDataView, HierarchicalQuery, NodeId, TreeData, TreeDataProvider};
use crate::tree_view::{TreeView, VisibleRow};

/// Default field width in terminal columns.
pub const DEFAULT_WIDTH: u16 = 30;

/// A change of the selected value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueChange {
    pub old: Option<NodeId>,
    pub value: Option<NodeId>,
    /// True when the change comes from user interaction (typing, picking,
    /// clearing), false for `set_value`.
    pub from_user: bool,
}

/// Result of handing a key to the combo box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComboAction {
    /// The key was consumed.
    None,
    /// The key has no meaning for the combo box in its current state.
    Ignored,
    /// The key was consumed and changed the selected value.
    ValueChanged(ValueChange),
}

impl From<Option<ValueChange>> for ComboAction {
    fn from(change: Option<ValueChange>) -> Self {
        match change {
            Some(change) => ComboAction::ValueChanged(change),
            None => ComboAction::None,
        }
    }
}

/// Which part of the combo box has keyboard focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComboFocus {
    Field,
    Tree,
}

/// Presentation and behavior options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComboOptions {
    pub match_mode: MatchMode,
    /// Only leaf items may be selected.
    pub select_only_leafs: bool,
    pub clear_button_visible: bool,
    /// Typing does not edit the field; the popup is for browsing only.
    pub filtering_disabled: bool,
    /// Field width in columns.
    pub width: u16,
    /// Popup width in columns; follows `width` when unset.
    pub popup_width: Option<u16>,
    pub label: Option<String>,
    pub helper_text: Option<String>,
    pub invalid: bool,
    pub error_message: Option<String>,
    pub tooltip_text: Option<String>,
    pub required_indicator_visible: bool,
    pub read_only: bool,
    /// Prefix icon drawn inside the field.
    pub icon: Option<String>,
    /// Quiescence window before typed text is applied as a filter.
    pub value_change_timeout: Duration,
}

impl Default for ComboOptions {
    fn default() -> Self {
        Self {
            match_mode: MatchMode::default(),
            select_only_leafs: false,
            clear_button_visible: true,
            filtering_disabled: false,
            width: DEFAULT_WIDTH,
            popup_width: None,
            label: None,
            helper_text: None,
            invalid: false,
            error_message: None,
            tooltip_text: None,
            required_indicator_visible: false,
            read_only: false,
            icon: None,
            value_change_timeout: DEFAULT_WINDOW,
        }
    }
}

pub struct TreeComboBox<T: 'static, D = TreeDataProvider<T>> {
    label: LabelProvider<T>,
    data: D,
    tree: TreeView,
    input: InputState,
    debouncer: Debouncer<String>,
    options: ComboOptions,
    opened: bool,
    /// Field, plus the tree while the popup is open.
    focus_manager: FocusManager<ComboFocus>,
    /// The field content is "selected": the next typed character replaces it.
    autoselect: bool,
    /// Text of the installed filter.
    applied_filter: Option<String>,
}

impl<T: 'static> TreeComboBox<T, TreeDataProvider<T>> {
    /// A combo box with no items; supply them later with
    /// [`TreeComboBox::set_items`] or [`TreeComboBox::set_tree_data`].
    pub fn new(label: impl Fn(&T) -> String + 'static) -> Self {
        Self::with_data_provider(TreeDataProvider::default(), label)
    }

    pub fn with_tree_data(data: TreeData<T>, label: impl Fn(&T) -> String + 'static) -> Self {
        Self::with_data_provider(TreeDataProvider::new(data), label)
    }

    /// Replace the items with `roots` and everything `children_of` yields
    /// below them.
    pub fn set_items<F>(&mut self, roots: Vec<T>, children_of: F)
    where
        F: Fn(&T) -> Vec<T>,
    {
        self.set_tree_data(TreeData::from_roots(roots, children_of));
    }

    pub fn set_tree_data(&mut self, data: TreeData<T>) {
        self.set_data_provider(TreeDataProvider::new(data));
    }
}

impl<T: 'static, D: HierarchicalDataView<T>> TreeComboBox<T, D> {
    pub fn with_data_provider(data: D, label: impl Fn(&T) -> String + 'static) -> Self {
        let options = ComboOptions::default();
        let mut focus_manager = FocusManager::new();
        focus_manager.register(ComboFocus::Field);
        Self {
            label: Rc::new(label),
            data,
            tree: TreeView::new(),
            input: InputState::empty(),
            debouncer: Debouncer::new(options.value_change_timeout),
            options,
            opened: false,
            focus_manager,
            autoselect: false,
            applied_filter: None,
        }
    }

    /// Swap the data view. Selection, expansion and pending input are reset
    /// because node handles of the old view mean nothing in the new one.
    pub fn set_data_provider(&mut self, data: D) {
        self.data = data;
        self.tree = TreeView::new();
        self.debouncer.cancel();
        self.input.clear();
        self.autoselect = false;
        self.applied_filter = None;
    }

    pub fn data_provider(&self) -> &D {
        &self.data
    }

    pub fn data_provider_mut(&mut self) -> &mut D {
        &mut self.data
    }

    pub fn tree_data(&self) -> &TreeData<T> {
        self.data.tree_data()
    }

    pub fn tree(&self) -> &TreeView {
        &self.tree
    }

    pub fn label_provider(&self) -> LabelProvider<T> {
        Rc::clone(&self.label)
    }

    pub fn caption(&self, id: NodeId) -> Option<String> {
        self.data.item(id).map(|item| (self.label)(item))
    }

    // --- Value ---

    pub fn value(&self) -> Option<NodeId> {
        self.tree.selected()
    }

    pub fn value_item(&self) -> Option<&T> {
        self.value().and_then(|id| self.data.item(id))
    }

    /// Set the value programmatically. Bypasses filtering and the leaf-only
    /// restriction; the resulting change is not flagged as user interaction.
    pub fn set_value(&mut self, value: Option<NodeId>) -> Option<ValueChange> {
        self.apply_selection(value, false)
    }

    /// Select `id` as the user's choice. Refused for non-leaf items when only
    /// leafs may be selected.
    pub fn select_from_user(&mut self, id: NodeId) -> Option<ValueChange> {
        if self.options.select_only_leafs && self.data.has_children(id) {
            tracing::debug!(node = %id, "refusing non-leaf selection");
            return None;
        }
        self.apply_selection(Some(id), true)
    }

    fn apply_selection(&mut self, value: Option<NodeId>, from_user: bool) -> Option<ValueChange> {
        let old = self.tree.select(value);
        match value {
            Some(id) => {
                let caption = self.caption(id).unwrap_or_default();
                self.set_field_text(caption);
                self.set_opened(false);
                self.focus();
            }
            None if !from_user => self.set_field_text(String::new()),
            None => {}
        }
        if old == value {
            return None;
        }
        tracing::debug!(?old, ?value, from_user, "value changed");
        Some(ValueChange {
            old,
            value,
            from_user,
        })
    }

    // --- Filter resolution ---

    /// Drill down from `start` (the root when `None`) while exactly one
    /// direct child passes `predicate`, expanding each such child. Where no
    /// child passes, that item is selected; where several pass, the walk
    /// stops and the selection is left alone. No predicate means no-op.
    pub fn resolve(
        &mut self,
        predicate: Option<&Predicate<T>>,
        start: Option<NodeId>,
    ) -> Option<ValueChange> {
        let predicate = predicate?;
        let mut cursor = start;
        loop {
            let query = HierarchicalQuery::new(Some(Rc::clone(predicate)), cursor);
            match self.data.size(&query) {
                0 => {
                    tracing::debug!(node = ?cursor, "no matching children");
                    return cursor.and_then(|id| self.select_from_user(id));
                }
                1 => {
                    let child = self.data.fetch(&query).into_iter().next()?;
                    tracing::debug!(node = %child, "single match, expanding");
                    self.tree.expand(child);
                    cursor = Some(child);
                }
                matches => {
                    tracing::debug!(node = ?cursor, matches, "ambiguous filter, stopping");
                    if let Some(id) = cursor {
                        let rows = self.visible_rows();
                        self.tree.move_cursor_to(id, &rows);
                    }
                    return None;
                }
            }
        }
    }

    /// React to a settled field value. Only user edits filter: non-empty
    /// text installs a predicate, opens the popup and resolves from the
    /// root; empty text removes the predicate and deselects.
    pub fn apply_filter_text(&mut self, text: &str, from_user: bool) -> Option<ValueChange> {
        if !from_user || self.options.filtering_disabled {
            return None;
        }
        if text.trim().is_empty() {
            self.data.clear_filter();
            self.applied_filter = None;
            return match self.value() {
                Some(_) => self.apply_selection(None, true),
                None => None,
            };
        }

        tracing::debug!(text, mode = %self.options.match_mode, "applying filter");
        self.set_opened(true);
        let predicate = build_predicate(text, self.options.match_mode, self.label_provider());
        self.data.set_filter(Some(Rc::clone(&predicate)));
        self.applied_filter = Some(text.to_string());
        self.tree.state.selected_index = 0;
        self.resolve(Some(&predicate), None)
    }

    /// Fire the debounced filter text if its window has elapsed.
    pub fn tick(&mut self, now: Instant) -> Option<ValueChange> {
        let text = self.debouncer.poll(now)?;
        tracing::debug!(text = %text, "filter text settled");
        self.apply_filter_text(&text, true)
    }

    /// Apply pending filter text immediately.
    pub fn commit_pending(&mut self) -> Option<ValueChange> {
        let text = self.debouncer.flush()?;
        self.apply_filter_text(&text, true)
    }

    pub fn has_pending_input(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// How long the host may block before [`TreeComboBox::tick`] has work.
    pub fn time_until_tick(&self, now: Instant) -> Option<Duration> {
        self.debouncer.time_until_due(now)
    }

    /// The clear affordance: empties the field as a user edit, applied
    /// without waiting for the debounce window.
    pub fn clear(&mut self) -> Option<ValueChange> {
        if self.options.read_only {
            return None;
        }
        self.input.clear();
        self.debouncer.cancel();
        self.autoselect = false;
        self.apply_filter_text("", true)
    }

    // --- Field ---

    pub fn text(&self) -> &str {
        self.input.text()
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    /// Programmatic field update; never filters.
    fn set_field_text(&mut self, text: String) {
        self.input.set_text(text);
        self.input.move_end();
        self.debouncer.cancel();
    }

    fn editable(&self) -> bool {
        !self.options.read_only && !self.options.filtering_disabled
    }

    fn field_edited(&mut self, now: Instant) {
        self.debouncer.schedule(self.input.text().to_string(), now);
    }

    pub fn is_autoselected(&self) -> bool {
        self.autoselect
    }

    // --- Focus and popup ---

    /// Focus the field. Its current content becomes selected.
    pub fn focus(&mut self) {
        self.focus_manager.set(ComboFocus::Field);
        self.autoselect = !self.input.text().is_empty();
    }

    pub fn focus_tree(&mut self) {
        if self.opened {
            self.focus_manager.set(ComboFocus::Tree);
            self.autoselect = false;
        }
    }

    pub fn focused(&self) -> ComboFocus {
        self.focus_manager
            .current()
            .copied()
            .unwrap_or(ComboFocus::Field)
    }

    /// The tree takes part in focus traversal only while the popup is open.
    fn set_opened(&mut self, opened: bool) {
        let current = self.focused();
        self.opened = opened;
        self.focus_manager.clear();
        self.focus_manager.register(ComboFocus::Field);
        if opened {
            self.focus_manager.register(ComboFocus::Tree);
        }
        if opened && current == ComboFocus::Tree {
            self.focus_manager.set(ComboFocus::Tree);
        } else {
            self.focus_manager.set(ComboFocus::Field);
        }
    }

    pub fn is_opened(&self) -> bool {
        self.opened
    }

    /// Open the popup with the cursor on the current value, revealing it.
    pub fn open_popup(&mut self) {
        if self.options.read_only {
            return;
        }
        self.set_opened(true);
        if let Some(id) = self.value() {
            for ancestor in self.data.tree_data().ancestors(id) {
                self.tree.expand(ancestor);
            }
            let rows = self.visible_rows();
            self.tree.move_cursor_to(id, &rows);
        }
    }

    pub fn close_popup(&mut self) {
        let had_tree = self.focused() == ComboFocus::Tree;
        self.set_opened(false);
        if had_tree {
            self.focus();
        }
    }

    pub fn toggle_popup(&mut self) {
        if self.opened {
            self.close_popup();
        } else {
            self.open_popup();
        }
    }

    // --- Popup tree ---

    pub fn visible_rows(&self) -> Vec<VisibleRow> {
        self.tree.visible_rows(&self.data)
    }

    pub fn cursor_index(&self) -> usize {
        self.tree.state.selected_index
    }

    pub fn set_cursor_index(&mut self, idx: usize) {
        let total = self.visible_rows().len();
        self.tree.state.selected_index = idx;
        self.tree.clamp_cursor(total);
    }

    pub fn ensure_cursor_visible(&mut self, viewport_height: usize) {
        if viewport_height > 0 {
            self.tree.state.ensure_visible(viewport_height);
        }
    }

    pub fn scroll_offset(&self) -> usize {
        self.tree.state.scroll as usize
    }

    pub fn toggle_expanded(&mut self, id: NodeId) {
        self.tree.toggle(id);
        let total = self.visible_rows().len();
        self.tree.clamp_cursor(total);
    }

    /// The user picked `id` in the popup. Non-leaf items toggle instead
    /// when only leafs may be selected.
    pub fn pick(&mut self, id: NodeId) -> Option<ValueChange> {
        if self.options.select_only_leafs && self.data.has_children(id) {
            self.toggle_expanded(id);
            return None;
        }
        let change = self.select_from_user(id);
        self.set_opened(false);
        self.focus();
        change
    }

    fn move_cursor_right(&mut self) {
        let rows = self.visible_rows();
        let Some(row) = rows.get(self.cursor_index()).copied() else {
            return;
        };
        if row.has_children && !row.expanded {
            self.tree.expand(row.id);
        } else if row.expanded {
            let total = self.visible_rows().len();
            self.tree.state.select_next(total);
        }
    }

    fn move_cursor_left(&mut self) {
        let rows = self.visible_rows();
        let Some(row) = rows.get(self.cursor_index()).copied() else {
            return;
        };
        if row.expanded {
            self.tree.collapse(row.id);
        } else if let Some(parent) = self.data.parent(row.id) {
            self.tree.move_cursor_to(parent, &rows);
        }
    }

    // --- Keyboard ---

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) -> ComboAction {
        match self.focused() {
            ComboFocus::Field => self.handle_field_key(key, now),
            ComboFocus::Tree => self.handle_tree_key(key, now),
        }
    }

    fn handle_field_key(&mut self, key: KeyEvent, now: Instant) -> ComboAction {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('u') if self.options.clear_button_visible => self.clear().into(),
                _ => ComboAction::Ignored,
            };
        }

        match key.code {
            KeyCode::Char(c) => {
                if !self.editable() {
                    return ComboAction::Ignored;
                }
                if self.autoselect {
                    self.input.clear();
                    self.autoselect = false;
                }
                self.input.insert_char(c);
                self.field_edited(now);
                ComboAction::None
            }
            KeyCode::Backspace | KeyCode::Delete => {
                if !self.editable() {
                    return ComboAction::Ignored;
                }
                if self.autoselect {
                    self.input.clear();
                    self.autoselect = false;
                } else if key.code == KeyCode::Backspace {
                    self.input.delete_char_backward();
                } else {
                    self.input.delete_char_forward();
                }
                self.field_edited(now);
                ComboAction::None
            }
            KeyCode::Left => {
                self.autoselect = false;
                self.input.move_left();
                ComboAction::None
            }
            KeyCode::Right => {
                self.autoselect = false;
                self.input.move_right();
                ComboAction::None
            }
            KeyCode::Home => {
                self.autoselect = false;
                self.input.move_home();
                ComboAction::None
            }
            KeyCode::End => {
                self.autoselect = false;
                self.input.move_end();
                ComboAction::None
            }
            KeyCode::Down => {
                if self.options.read_only {
                    return ComboAction::Ignored;
                }
                if !self.opened {
                    self.open_popup();
                }
                self.focus_tree();
                ComboAction::None
            }
            KeyCode::Tab if self.opened => {
                self.focus_manager.next();
                self.autoselect = false;
                ComboAction::None
            }
            KeyCode::Enter if self.has_pending_input() => self.commit_pending().into(),
            KeyCode::Esc if self.opened => {
                self.close_popup();
                ComboAction::None
            }
            KeyCode::Esc if self.has_pending_input() => {
                self.debouncer.cancel();
                ComboAction::None
            }
            _ => ComboAction::Ignored,
        }
    }

    fn handle_tree_key(&mut self, key: KeyEvent, now: Instant) -> ComboAction {
        match key.code {
            KeyCode::Up => {
                self.tree.state.select_prev();
                ComboAction::None
            }
            KeyCode::Down => {
                let total = self.visible_rows().len();
                self.tree.state.select_next(total);
                ComboAction::None
            }
            KeyCode::Home => {
                self.tree.state.selected_index = 0;
                ComboAction::None
            }
            KeyCode::End => {
                let total = self.visible_rows().len();
                self.tree.state.selected_index = total.saturating_sub(1);
                ComboAction::None
            }
            KeyCode::Right => {
                self.move_cursor_right();
                ComboAction::None
            }
            KeyCode::Left => {
                self.move_cursor_left();
                ComboAction::None
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                let rows = self.visible_rows();
                match self.tree.cursor_node(&rows) {
                    Some(id) => self.pick(id).into(),
                    None => ComboAction::None,
                }
            }
            KeyCode::Esc | KeyCode::Tab | KeyCode::BackTab => {
                self.close_popup();
                ComboAction::None
            }
            KeyCode::Char(_) | KeyCode::Backspace => {
                // Typing in the tree goes to the field.
                self.focus_manager.set(ComboFocus::Field);
                self.autoselect = false;
                self.handle_field_key(key, now)
            }
            _ => ComboAction::Ignored,
        }
    }

    // --- Options ---

    pub fn options(&self) -> &ComboOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: ComboOptions) {
        let mode = options.match_mode;
        let filtering_disabled = options.filtering_disabled;
        let read_only = options.read_only;
        self.debouncer.set_window(options.value_change_timeout);
        self.options = options;
        self.set_match_mode(mode);
        self.set_disable_filtering(filtering_disabled);
        self.set_read_only(read_only);
    }

    /// Change the match mode. An installed filter is rebuilt under the new
    /// mode, without re-running resolution.
    pub fn set_match_mode(&mut self, mode: MatchMode) {
        self.options.match_mode = mode;
        if let Some(text) = &self.applied_filter {
            let predicate = build_predicate(text, mode, self.label_provider());
            self.data.set_filter(Some(predicate));
        }
    }

    /// The text behind the installed filter, if any. Differs from the field
    /// text once a selection has replaced it with a caption.
    pub fn applied_filter(&self) -> Option<&str> {
        self.applied_filter.as_deref()
    }

    pub fn match_mode(&self) -> MatchMode {
        self.options.match_mode
    }

    pub fn set_select_only_leafs(&mut self, only_leafs: bool) {
        self.options.select_only_leafs = only_leafs;
    }

    pub fn set_clear_button_visible(&mut self, visible: bool) {
        self.options.clear_button_visible = visible;
    }

    pub fn set_disable_filtering(&mut self, disabled: bool) {
        self.options.filtering_disabled = disabled;
        if disabled {
            self.debouncer.cancel();
        }
    }

    pub fn set_width(&mut self, width: u16) {
        self.options.width = width;
    }

    pub fn set_popup_width(&mut self, width: Option<u16>) {
        self.options.popup_width = width;
    }

    pub fn popup_width(&self) -> u16 {
        self.options.popup_width.unwrap_or(self.options.width)
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.options.label = Some(label.into());
    }

    pub fn set_helper_text(&mut self, text: impl Into<String>) {
        self.options.helper_text = Some(text.into());
    }

    pub fn set_invalid(&mut self, invalid: bool) {
        self.options.invalid = invalid;
    }

    pub fn set_error_message(&mut self, message: impl Into<String>) {
        self.options.error_message = Some(message.into());
    }

    pub fn set_tooltip_text(&mut self, text: impl Into<String>) {
        self.options.tooltip_text = Some(text.into());
    }

    pub fn set_required_indicator_visible(&mut self, visible: bool) {
        self.options.required_indicator_visible = visible;
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.options.read_only = read_only;
        if read_only {
            self.debouncer.cancel();
            self.close_popup();
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.options.read_only
    }

    pub fn set_icon(&mut self, icon: impl Into<String>) {
        self.options.icon = Some(icon.into());
    }

    pub fn set_value_change_timeout(&mut self, timeout: Duration) {
        self.options.value_change_timeout = timeout;
        self.debouncer.set_window(timeout);
    }
}
