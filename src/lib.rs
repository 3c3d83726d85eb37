//! A filterable tree combo box for ratatui applications.
//!
//! [`TreeComboBox`] pairs a text field with a popup tree over hierarchical
//! data. Typed text filters the tree; when the filter narrows the tree to a
//! single path, the combo box expands it and selects the item it ends at.

pub mod combo;
pub mod config;
pub mod dataset;
pub mod debounce;
pub mod error;
pub mod filter;
pub mod tree_data;
pub mod tree_view;

pub use combo::{ComboAction, ComboFocus, ComboOptions, TreeComboBox, ValueChange};
pub use error::{Error, Result};
pub use filter::{LabelProvider, MatchMode, Predicate};
pub use tree_data::{HierarchicalDataView, HierarchicalQuery, NodeId, TreeData, TreeDataProvider};
pub use tree_view::{TreeView, VisibleRow};
