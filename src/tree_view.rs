//! Visual state of the popup tree: expanded nodes, the selected node, and the
//! keyboard cursor over the flattened visible rows.

use std::collections::HashSet;

use ratatui_interact::components::TreeViewState;

use crate::tree_data::{HierarchicalDataView, HierarchicalQuery, NodeId};

/// One row of the flattened, filtered, expansion-aware tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleRow {
    pub id: NodeId,
    pub depth: usize,
    pub has_children: bool,
    pub expanded: bool,
}

/// Popup tree state. Holds handles only; items live in the data view.
pub struct TreeView {
    expanded: HashSet<NodeId>,
    selected: Option<NodeId>,
    /// Cursor and scroll offset over the visible rows.
    pub state: TreeViewState,
}

impl Default for TreeView {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeView {
    pub fn new() -> Self {
        Self {
            expanded: HashSet::new(),
            selected: None,
            state: TreeViewState::new(),
        }
    }

    pub fn expand(&mut self, id: NodeId) {
        self.expanded.insert(id);
    }

    pub fn collapse(&mut self, id: NodeId) {
        self.expanded.remove(&id);
    }

    pub fn toggle(&mut self, id: NodeId) {
        if !self.expanded.remove(&id) {
            self.expanded.insert(id);
        }
    }

    pub fn is_expanded(&self, id: NodeId) -> bool {
        self.expanded.contains(&id)
    }

    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.selected
    }

    /// Set the selected node, returning the previous one.
    pub fn select(&mut self, id: Option<NodeId>) -> Option<NodeId> {
        std::mem::replace(&mut self.selected, id)
    }

    /// Flatten the tree as the popup shows it: children pass the view's
    /// installed filter, and only expanded nodes show their children.
    pub fn visible_rows<T, D>(&self, view: &D) -> Vec<VisibleRow>
    where
        D: HierarchicalDataView<T> + ?Sized,
    {
        let filter = view.filter().cloned();
        let mut rows = Vec::new();
        let root = view.fetch(&HierarchicalQuery::new(filter.clone(), None));
        let mut stack: Vec<(NodeId, usize)> = root.into_iter().rev().map(|id| (id, 0)).collect();

        while let Some((id, depth)) = stack.pop() {
            let has_children = view.has_children(id);
            let expanded = has_children && self.is_expanded(id);
            rows.push(VisibleRow {
                id,
                depth,
                has_children,
                expanded,
            });
            if expanded {
                let children = view.fetch(&HierarchicalQuery::new(filter.clone(), Some(id)));
                stack.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
            }
        }
        rows
    }

    /// Node under the cursor.
    pub fn cursor_node(&self, rows: &[VisibleRow]) -> Option<NodeId> {
        rows.get(self.state.selected_index).map(|r| r.id)
    }

    /// Move the cursor onto `id` if it is visible.
    pub fn move_cursor_to(&mut self, id: NodeId, rows: &[VisibleRow]) {
        if let Some(idx) = rows.iter().position(|r| r.id == id) {
            self.state.selected_index = idx;
        }
    }

    /// Keep the cursor inside the row range after the rows changed.
    pub fn clamp_cursor(&mut self, total: usize) {
        if total == 0 {
            self.state.selected_index = 0;
        } else if self.state.selected_index >= total {
            self.state.selected_index = total - 1;
        }
    }

    /// Render the visible rows as indented text, one row per line.
    /// `▾`/`▸` mark expanded/collapsed parents and `*` marks the selection.
    pub fn outline<T, D>(&self, view: &D, label: &dyn Fn(&T) -> String) -> String
    where
        D: HierarchicalDataView<T> + ?Sized,
    {
        self.visible_rows(view)
            .iter()
            .filter_map(|row| {
                let item = view.item(row.id)?;
                let marker = match (row.has_children, row.expanded) {
                    (true, true) => "▾ ",
                    (true, false) => "▸ ",
                    (false, _) => "  ",
                };
                let selected = if self.selected == Some(row.id) { " *" } else { "" };
                Some(format!(
                    "{}{}{}{}",
                    "  ".repeat(row.depth),
                    marker,
                    label(item),
                    selected
                ))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Predicate;
    use crate::tree_data::{TreeData, TreeDataProvider};
    use std::rc::Rc;

    fn provider() -> (TreeDataProvider<String>, Vec<NodeId>) {
        let mut data = TreeData::new();
        let a = data.add_item(None, "Author A".to_string()).unwrap();
        let b1 = data.add_item(Some(a), "Book B1".to_string()).unwrap();
        let c1 = data.add_item(Some(b1), "Chapter C1".to_string()).unwrap();
        let c2 = data.add_item(Some(b1), "Chapter C2".to_string()).unwrap();
        let b2 = data.add_item(Some(a), "Book B2".to_string()).unwrap();
        let z = data.add_item(None, "Author Z".to_string()).unwrap();
        (TreeDataProvider::new(data), vec![a, b1, c1, c2, b2, z])
    }

    fn label(s: &String) -> String {
        s.clone()
    }

    #[test]
    fn test_collapsed_tree_shows_roots_only() {
        let (provider, ids) = provider();
        let view = TreeView::new();
        let rows = view.visible_rows(&provider);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, ids[0]);
        assert!(rows[0].has_children);
        assert!(!rows[0].expanded);
    }

    #[test]
    fn test_outline_follows_expansion_and_selection() {
        let (provider, ids) = provider();
        let mut view = TreeView::new();
        view.expand(ids[0]);
        view.expand(ids[1]);
        view.select(Some(ids[3]));
        insta::assert_snapshot!(view.outline(&provider, &label), @r"
        ▾ Author A
          ▾ Book B1
              Chapter C1
              Chapter C2 *
            Book B2
          Author Z
        ");
    }

    #[test]
    fn test_outline_hides_filtered_branches() {
        let (mut provider, ids) = provider();
        let pred: Predicate<String> = Rc::new(|s: &String| s.ends_with("C2"));
        provider.set_filter(Some(pred));
        let mut view = TreeView::new();
        view.expand(ids[0]);
        view.expand(ids[1]);
        insta::assert_snapshot!(view.outline(&provider, &label), @r"
        ▾ Author A
          ▾ Book B1
              Chapter C2
        ");
    }

    #[test]
    fn test_toggle_and_collapse_all() {
        let (provider, ids) = provider();
        let mut view = TreeView::new();
        view.toggle(ids[0]);
        assert!(view.is_expanded(ids[0]));
        assert_eq!(view.visible_rows(&provider).len(), 4);
        view.toggle(ids[0]);
        assert!(!view.is_expanded(ids[0]));
        view.expand(ids[0]);
        view.expand(ids[1]);
        view.collapse_all();
        assert_eq!(view.visible_rows(&provider).len(), 2);
    }

    #[test]
    fn test_cursor_follows_node() {
        let (provider, ids) = provider();
        let mut view = TreeView::new();
        view.expand(ids[0]);
        let rows = view.visible_rows(&provider);
        view.move_cursor_to(ids[4], &rows);
        assert_eq!(view.state.selected_index, 2);
        assert_eq!(view.cursor_node(&rows), Some(ids[4]));

        view.clamp_cursor(1);
        assert_eq!(view.state.selected_index, 0);
    }

    #[test]
    fn test_select_returns_previous() {
        let (_, ids) = provider();
        let mut view = TreeView::new();
        assert_eq!(view.select(Some(ids[2])), None);
        assert_eq!(view.select(None), Some(ids[2]));
        assert_eq!(view.selected(), None);
    }
}
