//! A lossless model of block-style YAML as it is found in Kubernetes
//! manifests.
//!
//! [`serde_yaml`] drops comments on the floor, but markers live inside
//! comments and have to be attached to the nodes they annotate. This module
//! therefore parses manifests into a small AST ([`Document`], [`Node`]) which
//! keeps key order, comments and scalar styles, can be mutated in place and
//! can be emitted again as YAML text.
//!
//! The supported subset covers what manifests use in practice: block
//! mappings and sequences (including compact `- key: value` items), plain,
//! quoted and block scalars, tags and single or multi-line flow collections.
//! Anchors and aliases are rejected.

mod emitter;
mod parser;
mod scalar;
mod value;

pub use emitter::{emit_document, emit_documents};
pub use parser::{Error as ParseError, parse_documents, split_documents};
pub use scalar::{Chomping, Scalar, ScalarStyle};
pub use value::{Error as ConvertError, node_to_json};

/// The tag which marks a scalar as a variable reference instead of a literal.
pub const VAR_TAG: &str = "!!var";

/// Opens a variable reference which is spliced into a larger string.
pub const START_MARK: &str = "!!start";

/// Closes a variable reference which is spliced into a larger string.
pub const END_MARK: &str = "!!end";

/// A single YAML document, i.e. the content between two `---` separators.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Document {
    /// Comments which appear before the root node and could not be attached
    /// to any entry, e.g. because the document only consists of a scalar.
    pub head_comments: Vec<String>,

    /// The root node. Documents which only contain comments have no root.
    pub root: Option<Node>,

    /// Comments after the last node of the document.
    pub foot_comments: Vec<String>,

    /// The 1-based line number the document starts at.
    pub line: usize,
}

impl Document {
    /// Looks up a value by following the given mapping keys from the root.
    pub fn get(&self, path: &[&str]) -> Option<&Node> {
        let mut node = self.root.as_ref()?;

        for key in path {
            node = node.as_mapping()?.get(key)?;
        }

        Some(node)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Mapping(Mapping),
    Sequence(Sequence),
    Scalar(Scalar),
}

impl Node {
    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Self::Mapping(mapping) => Some(mapping),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    /// Returns the line the node starts at.
    pub fn line(&self) -> usize {
        match self {
            Self::Mapping(mapping) => mapping.entries.first().map_or(0, |e| e.line),
            Self::Sequence(sequence) => sequence.items.first().map_or(0, |i| i.line),
            Self::Scalar(scalar) => scalar.line,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Mapping {
    pub entries: Vec<Entry>,

    /// Comments which trail the last entry while still being indented at
    /// the level of this mapping.
    pub foot_comments: Vec<String>,
}

impl Mapping {
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entries
            .iter()
            .find(|entry| entry.key.text == key)
            .map(|entry| &entry.value)
    }
}

/// A key/value pair of a block mapping together with its comments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub key: Scalar,
    pub value: Node,

    /// Full-line comments directly above the key.
    pub head_comments: Vec<String>,

    /// The comment on the same line as the key.
    pub line_comment: Option<String>,

    pub line: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Sequence {
    pub items: Vec<Item>,
    pub foot_comments: Vec<String>,
}

/// A single `- ` item of a block sequence together with its comments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Item {
    pub value: Node,
    pub head_comments: Vec<String>,
    pub line_comment: Option<String>,
    pub line: usize,
}
