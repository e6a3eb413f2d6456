//! The tree of API fields a workload's custom resource spec consists of.
//!
//! Fields are declared by markers which are scattered over many manifests.
//! Each marker inserts its dotted path into the tree rooted at `Spec`:
//! intermediate segments become struct nodes, the last segment becomes a
//! typed leaf. Declaring the same leaf twice is fine as long as both
//! declarations are equivalent, see [`is_equivalent`].

use convert_case::{Case, Casing};
use serde::{Serialize, ser::SerializeStruct};
use snafu::{Snafu, ensure};
use strum::{Display, EnumString};

use crate::marker::{FieldMarkerResult, Literal};

mod sample;

pub use sample::sample_document;

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display(
        "overwrite-existing-value: cannot declare {path:?} as {candidate}, it is already declared as {existing}"
    ))]
    OverwriteExistingValue {
        path: String,
        existing: String,
        candidate: String,
    },

    #[snafu(display("field path {path:?} contains an empty segment"))]
    EmptySegment { path: String },
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, EnumString, Display, Serialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    Unknown,
    String,
    Int,
    Bool,
    Struct,
}

/// A node of the API field tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiFields {
    /// The exported (PascalCase) name of the field.
    pub name: String,

    /// The name of the field as it appears in the custom resource.
    pub manifest_name: String,

    pub field_type: FieldType,

    /// Free text comments, usually taken from marker descriptions.
    pub comments: Vec<String>,

    pub default: Option<Literal>,

    /// The value used for the sample custom resource if there is no
    /// default.
    pub sample: Option<Literal>,

    pub children: Vec<ApiFields>,

    /// Manifest names from the root down to this node, excluding the root.
    path: Vec<String>,
}

impl Default for ApiFields {
    fn default() -> Self {
        Self::root()
    }
}

impl ApiFields {
    /// Creates the root `Spec` node.
    pub fn root() -> Self {
        Self {
            name: "Spec".to_owned(),
            manifest_name: "spec".to_owned(),
            field_type: FieldType::Struct,
            comments: Vec::new(),
            default: None,
            sample: None,
            children: Vec::new(),
            path: Vec::new(),
        }
    }

    fn node(path: &[&str], field_type: FieldType) -> Self {
        let manifest_name = path.last().copied().unwrap_or_default();

        Self {
            name: manifest_name.to_case(Case::Pascal),
            manifest_name: manifest_name.to_owned(),
            field_type,
            comments: Vec::new(),
            default: None,
            sample: None,
            children: Vec::new(),
            path: path.iter().map(|segment| (*segment).to_owned()).collect(),
        }
    }

    /// Inserts the field declared by a field marker.
    pub fn add_marker(&mut self, result: &FieldMarkerResult) -> Result<()> {
        let marker = &result.marker;
        self.add_field(
            &marker.name,
            marker.field_type,
            marker.default.clone(),
            result.sample.clone(),
            marker.description_lines(),
        )
    }

    /// Inserts a leaf at the dotted `path`, creating struct nodes for all
    /// prefixes.
    pub fn add_field(
        &mut self,
        path: &str,
        field_type: FieldType,
        default: Option<Literal>,
        sample: Option<Literal>,
        comments: Vec<String>,
    ) -> Result<()> {
        let segments: Vec<&str> = path.split('.').collect();
        ensure!(
            segments.iter().all(|segment| !segment.is_empty()),
            EmptySegmentSnafu { path }
        );

        let mut node = self;
        for depth in 1..segments.len() {
            node = node.child_struct(&segments[..depth], path)?;
        }

        let candidate = Self {
            comments,
            default,
            sample,
            ..Self::node(&segments, field_type)
        };

        match node
            .children
            .iter()
            .position(|child| child.manifest_name == candidate.manifest_name)
        {
            None => node.children.push(candidate),
            Some(index) => {
                let existing = &mut node.children[index];
                ensure!(
                    is_equivalent(existing, &candidate),
                    OverwriteExistingValueSnafu {
                        path,
                        existing: existing.describe(),
                        candidate: candidate.describe(),
                    }
                );
                existing.merge(candidate);
            }
        }

        Ok(())
    }

    /// Returns the struct child at the end of `prefix`, creating it if
    /// needed.
    fn child_struct(&mut self, prefix: &[&str], path: &str) -> Result<&mut Self> {
        let segment = prefix.last().copied().unwrap_or_default();

        let index = if let Some(index) = self
            .children
            .iter()
            .position(|child| child.manifest_name == segment)
        {
            let existing = &self.children[index];
            ensure!(
                existing.field_type == FieldType::Struct,
                OverwriteExistingValueSnafu {
                    path,
                    existing: existing.describe(),
                    candidate: format!("a struct at {:?}", prefix.join(".")),
                }
            );
            index
        } else {
            self.children.push(Self::node(prefix, FieldType::Struct));
            self.children.len() - 1
        };

        Ok(&mut self.children[index])
    }

    fn merge(&mut self, other: Self) {
        if self.default.is_none() {
            self.default = other.default;
        }
        if self.comments.is_empty() {
            self.comments = other.comments;
        }
        self.sample = match (self.sample.take(), other.sample) {
            (Some(existing), Some(candidate)) => {
                Some(if candidate.to_string() < existing.to_string() {
                    candidate
                } else {
                    existing
                })
            }
            (existing, candidate) => existing.or(candidate),
        };
    }

    fn describe(&self) -> String {
        let mut description = format!("type {}", self.field_type);
        if let Some(default) = &self.default {
            description.push_str(&format!(" with default {default}"));
        }
        if !self.comments.is_empty() {
            description.push_str(&format!(" described as {:?}", self.comments.join(" ")));
        }
        description
    }

    /// Adds the `collection` struct a component uses to reference the
    /// collection it belongs to.
    pub fn add_collection_field(&mut self, collection_kind: &str) -> Result<()> {
        self.add_field(
            "collection.name",
            FieldType::String,
            None,
            Some(Literal::String(format!(
                "{}-sample",
                collection_kind.to_lowercase()
            ))),
            vec![
                "Required if specifying collection.  The name of the collection".to_owned(),
                "within a specific collection.namespace to reference.".to_owned(),
            ],
        )?;
        self.add_field(
            "collection.namespace",
            FieldType::String,
            Some(Literal::String(String::new())),
            None,
            vec![
                "Optional if specifying collection.  The namespace where the collection exists."
                    .to_owned(),
            ],
        )
    }

    /// Looks up a node by its dotted path below this node.
    pub fn find(&self, path: &str) -> Option<&Self> {
        path.split('.').try_fold(self, |node, segment| {
            node.children
                .iter()
                .find(|child| child.manifest_name == segment)
        })
    }

    pub fn is_struct(&self) -> bool {
        self.field_type == FieldType::Struct
    }

    /// A node is required if it has no default and either is a leaf or has
    /// a required descendant.
    pub fn is_required(&self) -> bool {
        self.default.is_none()
            && (self.children.is_empty() || self.children.iter().any(Self::is_required))
    }

    /// The name of the generated Go struct, for struct nodes only.
    pub fn struct_name(&self) -> Option<String> {
        self.is_struct().then(|| {
            std::iter::once("Spec".to_owned())
                .chain(self.path.iter().map(|segment| segment.to_case(Case::Pascal)))
                .collect()
        })
    }

    /// The Go type of the field.
    pub fn go_type(&self) -> String {
        match self.field_type {
            FieldType::String => "string".to_owned(),
            FieldType::Int => "int".to_owned(),
            FieldType::Bool => "bool".to_owned(),
            FieldType::Struct => self.struct_name().unwrap_or_default(),
            FieldType::Unknown => "interface{}".to_owned(),
        }
    }

    /// The Go struct tag of the field.
    pub fn tags(&self) -> String {
        if self.is_required() {
            format!("`json:\"{}\"`", self.manifest_name)
        } else {
            format!("`json:\"{},omitempty\"`", self.manifest_name)
        }
    }

    /// The comments of the field including the generated note on its
    /// default.
    pub fn rendered_comments(&self) -> Vec<String> {
        let mut comments = self.comments.clone();
        if let Some(default) = &self.default {
            comments.push(format!("(Default: {default})"));
        }
        comments
    }

    /// The kubebuilder markers of the field.
    pub fn markers(&self) -> Vec<String> {
        match &self.default {
            Some(default) => vec![
                format!("+kubebuilder:default={default}"),
                "+kubebuilder:validation:Optional".to_owned(),
            ],
            None if self.is_required() => vec!["+kubebuilder:validation:Required".to_owned()],
            None => vec!["+kubebuilder:validation:Optional".to_owned()],
        }
    }

    /// The value rendered into sample custom resources.
    pub fn sample_value(&self) -> Option<Literal> {
        self.default
            .clone()
            .or_else(|| self.sample.clone())
            .or_else(|| Literal::zero(self.field_type))
    }

    /// The sample line of this node alone: `key:` for structs and
    /// `key: value` for leaves.
    pub fn sample_line(&self) -> String {
        match self.sample_value() {
            Some(value) if !self.is_struct() => format!("{}: {value}", self.manifest_name),
            _ => format!("{}:", self.manifest_name),
        }
    }

    /// Renders this node and its children as YAML. With `required_only`
    /// only required descendants are kept.
    pub fn render_sample(&self, required_only: bool) -> String {
        let mut out = String::new();
        self.write_sample(&mut out, 0, required_only);
        out
    }

    fn write_sample(&self, out: &mut String, indent: usize, required_only: bool) {
        out.push_str(&" ".repeat(indent));
        out.push_str(&self.sample_line());
        out.push('\n');

        for child in &self.children {
            if !required_only || child.is_required() {
                child.write_sample(out, indent + 2, required_only);
            }
        }
    }
}

/// Two declarations of a leaf are equivalent if their types match, their
/// defaults do not contradict each other and their comments are either
/// equal or absent on one side.
pub fn is_equivalent(existing: &ApiFields, candidate: &ApiFields) -> bool {
    let defaults_match = match (&existing.default, &candidate.default) {
        (Some(existing), Some(candidate)) => existing == candidate,
        _ => true,
    };
    let comments_match = existing.comments.is_empty()
        || candidate.comments.is_empty()
        || existing.comments == candidate.comments;

    existing.field_type == candidate.field_type && defaults_match && comments_match
}

impl Serialize for ApiFields {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ApiFields", 12)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("manifestName", &self.manifest_name)?;
        state.serialize_field("type", &self.field_type)?;
        state.serialize_field("goType", &self.go_type())?;
        state.serialize_field("tags", &self.tags())?;
        state.serialize_field("comments", &self.rendered_comments())?;
        state.serialize_field("markers", &self.markers())?;
        state.serialize_field("structName", &self.struct_name())?;
        state.serialize_field("default", &self.default.as_ref().map(ToString::to_string))?;
        state.serialize_field("sample", &self.sample_line())?;
        state.serialize_field("required", &self.is_required())?;
        state.serialize_field("children", &self.children)?;
        state.end()
    }
}
