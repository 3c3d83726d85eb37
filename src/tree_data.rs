//! In-memory hierarchical data and the data view the combo box queries.
//!
//! Items live in an arena and are addressed by [`NodeId`] handles, so two
//! items that compare equal are still distinct nodes. [`TreeDataProvider`]
//! owns the single active filter and answers [`HierarchicalQuery`]s: a direct
//! child of the queried parent passes a filter when the child itself or any
//! of its descendants matches.

use std::fmt;

use crate::error::{Error, Result};
use crate::filter::Predicate;

/// Handle of one node in a [`TreeData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct Node<T> {
    item: T,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A strict tree of items: every node has zero or one parent and an ordered
/// list of children. Nodes are never removed, so handles stay valid.
#[derive(Debug, Clone)]
pub struct TreeData<T> {
    nodes: Vec<Node<T>>,
    roots: Vec<NodeId>,
}

impl<T> Default for TreeData<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TreeData<T> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            roots: Vec::new(),
        }
    }

    /// Build a tree from root items and a function returning the children of
    /// an item. Children are visited depth first, in the order returned.
    pub fn from_roots<F>(roots: Vec<T>, children_of: F) -> Self
    where
        F: Fn(&T) -> Vec<T>,
    {
        let mut data = Self::new();
        let mut pending: Vec<(Option<NodeId>, T)> =
            roots.into_iter().rev().map(|item| (None, item)).collect();

        while let Some((parent, item)) = pending.pop() {
            let children = children_of(&item);
            let id = data.push(parent, item);
            pending.extend(children.into_iter().rev().map(|child| (Some(id), child)));
        }
        data
    }

    /// Add an item under `parent`, or as a root when `parent` is `None`.
    pub fn add_item(&mut self, parent: Option<NodeId>, item: T) -> Result<NodeId> {
        if let Some(parent) = parent {
            if !self.contains(parent) {
                return Err(Error::UnknownParent(parent));
            }
        }
        Ok(self.push(parent, item))
    }

    /// Add several items under the same parent, keeping their order.
    pub fn add_items<I>(&mut self, parent: Option<NodeId>, items: I) -> Result<Vec<NodeId>>
    where
        I: IntoIterator<Item = T>,
    {
        items
            .into_iter()
            .map(|item| self.add_item(parent, item))
            .collect()
    }

    fn push(&mut self, parent: Option<NodeId>, item: T) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            item,
            parent,
            children: Vec::new(),
        });
        match parent {
            Some(parent) => self.nodes[parent.0].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn item(&self, id: NodeId) -> Option<&T> {
        self.nodes.get(id.0).map(|n| &n.item)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Direct children of `parent`, or the roots when `parent` is `None`.
    pub fn children(&self, parent: Option<NodeId>) -> &[NodeId] {
        match parent {
            Some(id) => self
                .nodes
                .get(id.0)
                .map(|n| n.children.as_slice())
                .unwrap_or(&[]),
            None => &self.roots,
        }
    }

    pub fn has_children(&self, id: NodeId) -> bool {
        !self.children(Some(id)).is_empty()
    }

    /// Depth of a node; roots are at depth 0.
    pub fn depth(&self, id: NodeId) -> usize {
        self.ancestors(id).len()
    }

    /// Ancestors of `id`, nearest first. Does not include `id` itself.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut current = self.parent(id);
        while let Some(parent) = current {
            result.push(parent);
            current = self.parent(parent);
        }
        result
    }

    /// All node handles in depth-first pre-order.
    pub fn iter_ids(&self) -> Vec<NodeId> {
        let mut result = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            result.push(id);
            stack.extend(self.nodes[id.0].children.iter().rev().copied());
        }
        result
    }

    /// First node in pre-order whose item satisfies `pred`.
    pub fn find<P>(&self, pred: P) -> Option<NodeId>
    where
        P: Fn(&T) -> bool,
    {
        self.iter_ids()
            .into_iter()
            .find(|id| pred(&self.nodes[id.0].item))
    }

    /// True when `id` or any node below it satisfies `pred`.
    pub fn subtree_matches(&self, id: NodeId, pred: &dyn Fn(&T) -> bool) -> bool {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(current.0) else {
                continue;
            };
            if pred(&node.item) {
                return true;
            }
            stack.extend(node.children.iter().copied());
        }
        false
    }
}

/// A query for the direct children of `parent` (root level when `None`)
/// that pass `filter`.
pub struct HierarchicalQuery<T> {
    pub filter: Option<Predicate<T>>,
    pub parent: Option<NodeId>,
}

impl<T> HierarchicalQuery<T> {
    pub fn new(filter: Option<Predicate<T>>, parent: Option<NodeId>) -> Self {
        Self { filter, parent }
    }
}

/// The hierarchical data view the combo box drives.
///
/// `size` and `fetch` apply both the view's installed filter and the query's
/// own filter; a child is included when it or a descendant passes both.
pub trait HierarchicalDataView<T> {
    fn tree_data(&self) -> &TreeData<T>;

    /// The currently installed filter, if any.
    fn filter(&self) -> Option<&Predicate<T>>;

    /// Install a filter, replacing any previous one. `None` clears it.
    fn set_filter(&mut self, filter: Option<Predicate<T>>);

    /// Number of direct children of `query.parent` passing the filters.
    fn size(&self, query: &HierarchicalQuery<T>) -> usize;

    /// Direct children of `query.parent` passing the filters, in tree order.
    fn fetch(&self, query: &HierarchicalQuery<T>) -> Vec<NodeId>;

    fn clear_filter(&mut self) {
        self.set_filter(None);
    }

    fn item(&self, id: NodeId) -> Option<&T> {
        self.tree_data().item(id)
    }

    fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.tree_data().parent(id)
    }

    /// Unfiltered children; `None` gives the roots.
    fn children<'a>(&'a self, parent: Option<NodeId>) -> &'a [NodeId]
    where
        T: 'a,
    {
        self.tree_data().children(parent)
    }

    fn roots<'a>(&'a self) -> &'a [NodeId]
    where
        T: 'a,
    {
        self.tree_data().roots()
    }

    /// Whether `id` has children in the unfiltered tree.
    fn has_children(&self, id: NodeId) -> bool {
        self.tree_data().has_children(id)
    }
}

/// In-memory [`HierarchicalDataView`] over a [`TreeData`].
pub struct TreeDataProvider<T> {
    data: TreeData<T>,
    filter: Option<Predicate<T>>,
}

impl<T> TreeDataProvider<T> {
    pub fn new(data: TreeData<T>) -> Self {
        Self { data, filter: None }
    }

    pub fn tree_data_mut(&mut self) -> &mut TreeData<T> {
        &mut self.data
    }

    fn passes(&self, id: NodeId, query_filter: Option<&Predicate<T>>) -> bool {
        match (self.filter.as_ref(), query_filter) {
            (None, None) => true,
            (Some(own), None) => self.data.subtree_matches(id, own.as_ref()),
            (None, Some(query)) => self.data.subtree_matches(id, query.as_ref()),
            (Some(own), Some(query)) => self
                .data
                .subtree_matches(id, &|item: &T| own(item) && query(item)),
        }
    }
}

impl<T> Default for TreeDataProvider<T> {
    fn default() -> Self {
        Self::new(TreeData::new())
    }
}

impl<T> From<TreeData<T>> for TreeDataProvider<T> {
    fn from(data: TreeData<T>) -> Self {
        Self::new(data)
    }
}

impl<T> HierarchicalDataView<T> for TreeDataProvider<T> {
    fn tree_data(&self) -> &TreeData<T> {
        &self.data
    }

    fn filter(&self) -> Option<&Predicate<T>> {
        self.filter.as_ref()
    }

    fn set_filter(&mut self, filter: Option<Predicate<T>>) {
        self.filter = filter;
    }

    fn size(&self, query: &HierarchicalQuery<T>) -> usize {
        self.data
            .children(query.parent)
            .iter()
            .filter(|id| self.passes(**id, query.filter.as_ref()))
            .count()
    }

    fn fetch(&self, query: &HierarchicalQuery<T>) -> Vec<NodeId> {
        self.data
            .children(query.parent)
            .iter()
            .copied()
            .filter(|id| self.passes(*id, query.filter.as_ref()))
            .collect()
    }
}
