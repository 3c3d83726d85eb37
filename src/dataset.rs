//! Datasets for the demo binary: JSON files of labelled nodes and two
//! built-in demos.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::config::ComboConfig;
use crate::error::{Error, Result};
use crate::tree_data::{NodeId, TreeData};

/// One node of a JSON dataset: `{ "label": "...", "children": [...] }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatasetNode {
    pub label: String,
    #[serde(default)]
    pub children: Vec<DatasetNode>,
}

impl DatasetNode {
    pub fn leaf(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            children: Vec::new(),
        }
    }

    pub fn branch(label: impl Into<String>, children: Vec<DatasetNode>) -> Self {
        Self {
            label: label.into(),
            children,
        }
    }
}

/// Flatten dataset nodes into tree data of their labels, keeping order.
pub fn into_tree_data(roots: Vec<DatasetNode>) -> Result<TreeData<String>> {
    let mut data = TreeData::new();
    let mut stack: Vec<(Option<NodeId>, DatasetNode)> =
        roots.into_iter().rev().map(|node| (None, node)).collect();

    while let Some((parent, node)) = stack.pop() {
        let id = data.add_item(parent, node.label)?;
        stack.extend(node.children.into_iter().rev().map(|child| (Some(id), child)));
    }
    Ok(data)
}

pub fn parse_dataset(contents: &str, path: &Path) -> Result<TreeData<String>> {
    let roots: Vec<DatasetNode> = serde_json::from_str(contents).map_err(|e| Error::json(path, e))?;
    into_tree_data(roots)
}

/// Load a JSON dataset file.
pub fn load_dataset(path: &Path) -> Result<TreeData<String>> {
    let contents = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let data = parse_dataset(&contents, path)?;
    tracing::info!(path = %path.display(), nodes = data.len(), "loaded dataset");
    Ok(data)
}

/// Built-in demo datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DemoKind {
    /// Authors, their books and the chapters of each book.
    Library,
    /// A department hierarchy.
    #[default]
    Departments,
}

/// A ready-to-show demo: data, the value selected on start (and on reset),
/// and the option preset.
pub struct Demo {
    pub data: TreeData<String>,
    pub default_value: Option<NodeId>,
    pub config: ComboConfig,
}

impl DemoKind {
    pub fn build(self) -> Result<Demo> {
        match self {
            DemoKind::Library => library(),
            DemoKind::Departments => departments(),
        }
    }
}

/// Follow first children `depth` levels down from the first root.
fn first_descendant(data: &TreeData<String>, depth: usize) -> Option<NodeId> {
    let mut current = data.roots().first().copied()?;
    for _ in 0..depth {
        current = data.children(Some(current)).first().copied()?;
    }
    Some(current)
}

fn chapter_pages(author: u32, book: u32, chapter: u32) -> u32 {
    (author * 7 + book * 3 + chapter * 5) % 10 + 1
}

fn library() -> Result<Demo> {
    let authors = (1..=3u32)
        .map(|i| {
            let books = (1..=(i % 3) + 1)
                .map(|j| {
                    let name = format!("Book {i}/{j}");
                    let pages: Vec<u32> = (0..(i + j) % 4 + 1)
                        .map(|k| chapter_pages(i, j, k))
                        .collect();
                    let chapters = pages
                        .iter()
                        .enumerate()
                        .map(|(k, p)| DatasetNode::leaf(format!("{name}: Chapter {k} ({p} pages)")))
                        .collect();
                    let total: u32 = pages.iter().sum();
                    DatasetNode::branch(format!("{name} ({total} pages)"), chapters)
                })
                .collect();
            DatasetNode::branch(format!("Author {i}"), books)
        })
        .collect();

    let data = into_tree_data(authors)?;
    let default_value = first_descendant(&data, 2);
    Ok(Demo {
        data,
        default_value,
        config: ComboConfig {
            clear_button_visible: Some(false),
            disable_filtering: Some(true),
            icon: Some("📖".to_string()),
            popup_width: Some(44),
            label: Some("Chapter".to_string()),
            ..ComboConfig::default()
        },
    })
}

fn departments() -> Result<Demo> {
    use DatasetNode as N;

    let roots = vec![
        N::branch(
            "Product Development",
            vec![
                N::branch("Research", vec![N::leaf("Platform"), N::leaf("Mobile")]),
                N::leaf("Quality Assurance"),
                N::leaf("Design"),
            ],
        ),
        N::branch(
            "Sales",
            vec![N::leaf("EMEA"), N::leaf("Americas"), N::leaf("Asia Pacific")],
        ),
        N::branch("Marketing", vec![N::leaf("Brand"), N::leaf("Digital")]),
        N::branch("Human Resources", vec![N::leaf("Recruiting"), N::leaf("Payroll")]),
        N::leaf("Finance"),
    ];

    let data = into_tree_data(roots)?;
    let default_value = first_descendant(&data, 1);
    Ok(Demo {
        data,
        default_value,
        config: ComboConfig {
            label: Some("Select one".to_string()),
            width: Some(35),
            icon: Some("ℹ".to_string()),
            clear_button_visible: Some(false),
            tooltip_text: Some("Pick the owning department".to_string()),
            helper_text: Some("Type to filter, Down to browse".to_string()),
            ..ComboConfig::default()
        },
    })
}
