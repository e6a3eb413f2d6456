//! Marker directives embedded in manifest comments.
//!
//! Three kinds of markers are understood:
//!
//! - `+operator-builder:field:<args>` turns the annotated value into a field
//!   of the workload API,
//! - `+operator-builder:collection:field:<args>` does the same for the API of
//!   the collection the workload belongs to,
//! - `+operator-builder:resource:<args>` makes the whole document
//!   conditional on the value of a previously declared field.
//!
//! [`rewrite`] walks parsed manifests, applies field markers to the YAML AST
//! and collects all markers, [`resource`] evaluates resource markers once the
//! markers of all manifests are known.

use std::fmt::Display;

use regex::Regex;
use serde::Serialize;
use snafu::{OptionExt, ResultExt, Snafu, ensure};
use strum::{Display as StrumDisplay, EnumString};

use crate::{api::FieldType, naming::pascal_path};

pub mod args;
pub mod resource;
pub mod rewrite;

pub use resource::{Guard, MarkerSet};
pub use rewrite::{DocumentMarkers, FieldMarkerResult, rewrite_documents};

use args::Arguments;

pub const FIELD_PREFIX: &str = "+operator-builder:field:";
pub const COLLECTION_FIELD_PREFIX: &str = "+operator-builder:collection:field:";
pub const RESOURCE_PREFIX: &str = "+operator-builder:resource:";

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("line {line}: failed to parse marker arguments"))]
    ParseArguments { source: args::Error, line: usize },

    #[snafu(display("line {line}: marker is missing the required argument {name:?}"))]
    MissingArgument { name: &'static str, line: usize },

    #[snafu(display("line {line}: unknown marker arguments {names:?}"))]
    UnknownArguments { names: Vec<String>, line: usize },

    #[snafu(display("line {line}: unsupported field type {value:?}, expected string, int or bool"))]
    InvalidType { value: String, line: usize },

    #[snafu(display("line {line}: default {value:?} is not a valid {field_type}"))]
    InvalidDefault {
        value: String,
        field_type: FieldType,
        line: usize,
    },

    #[snafu(display("line {line}: invalid reference point {value:?}, expected parent or collection"))]
    InvalidParent { value: String, line: usize },

    #[snafu(display("line {line}: failed to compile replace expression {expression:?}"))]
    InvalidReplace {
        source: regex::Error,
        expression: String,
        line: usize,
    },

    #[snafu(display("line {line}: invalid boolean {value:?} for argument {name:?}"))]
    InvalidBool {
        name: &'static str,
        value: String,
        line: usize,
    },

    #[snafu(display("line {line}: resource marker must declare exactly one of {first:?} and {second:?}"))]
    ExclusiveArguments {
        first: &'static str,
        second: &'static str,
        line: usize,
    },

    #[snafu(display("line {line}: replace requires a scalar value, found a collection"))]
    ReplaceRequiresScalar { line: usize },

    #[snafu(display("line {line}: resource marker references unknown field {field:?}"))]
    UnknownField { field: String, line: usize },

    #[snafu(display(
        "line {line}: include requires a bool field, but {field:?} is of type {field_type}"
    ))]
    IncludeRequiresBool {
        field: String,
        field_type: FieldType,
        line: usize,
    },

    #[snafu(display("line {line}: value {value:?} does not match type {field_type} of field {field:?}"))]
    ValueTypeMismatch {
        field: String,
        value: String,
        field_type: FieldType,
        line: usize,
    },

    #[snafu(display("line {line}: field marker {name:?} does not annotate a value"))]
    UnattachedFieldMarker { name: String, line: usize },
}

/// The API a marker binds to, and the variable it is referenced through in
/// generated code.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, EnumString, StrumDisplay, Serialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    Parent,
    Collection,
}

impl Scope {
    /// Returns the reference to the field at `path`, e.g.
    /// `parent.Spec.Image.Tag` for `image.tag`.
    pub fn reference(self, path: &str) -> String {
        format!("{self}.Spec.{}", pascal_path(path))
    }
}

/// A typed literal as declared in marker arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Literal {
    String(String),
    Int(i64),
    Bool(bool),
}

impl Literal {
    /// Parses the raw value as a literal of the given type. Returns [`None`]
    /// for values which are not valid for the type.
    pub fn parse(field_type: FieldType, raw: &str) -> Option<Self> {
        match field_type {
            FieldType::String => Some(Self::String(raw.to_owned())),
            FieldType::Int => raw.trim().parse().ok().map(Self::Int),
            FieldType::Bool => raw.trim().parse().ok().map(Self::Bool),
            FieldType::Unknown | FieldType::Struct => None,
        }
    }

    /// The zero value of a type, used as sample when nothing better is known.
    pub fn zero(field_type: FieldType) -> Option<Self> {
        match field_type {
            FieldType::String => Some(Self::String(String::new())),
            FieldType::Int => Some(Self::Int(0)),
            FieldType::Bool => Some(Self::Bool(false)),
            FieldType::Unknown | FieldType::Struct => None,
        }
    }
}

/// Strings are rendered double-quoted, which is valid both as YAML and as
/// Go literal.
impl Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(string) => {
                f.write_str("\"")?;
                for c in string.chars() {
                    match c {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        '\t' => f.write_str("\\t")?,
                        c => write!(f, "{c}")?,
                    }
                }
                f.write_str("\"")
            }
            Self::Int(int) => write!(f, "{int}"),
            Self::Bool(bool) => write!(f, "{bool}"),
        }
    }
}

#[derive(Clone, Debug)]
pub enum Marker {
    Field(FieldMarker),
    Resource(ResourceMarker),
}

/// A field or collection field marker.
#[derive(Clone, Debug)]
pub struct FieldMarker {
    /// The dotted path of the field, e.g. `image.tag`.
    pub name: String,
    pub field_type: FieldType,
    pub default: Option<Literal>,
    pub description: Option<String>,

    /// The API the field is declared on.
    pub scope: Scope,

    /// The variable the rewritten value references. Equals `scope` unless
    /// overridden by the `parent` argument.
    pub reference_scope: Scope,

    /// Only the matches of this expression are replaced by the reference.
    pub replace: Option<Regex>,

    /// Arbitrary fields rewrite values but are not part of the API.
    pub arbitrary: bool,

    pub line: usize,
}

impl FieldMarker {
    /// The reference which replaces the annotated value.
    pub fn reference(&self) -> String {
        self.reference_scope.reference(&self.name)
    }

    /// The lines of the description, without surrounding whitespace.
    pub fn description_lines(&self) -> Vec<String> {
        self.description
            .iter()
            .flat_map(|description| description.lines())
            .map(|line| line.trim().to_owned())
            .filter(|line| !line.is_empty())
            .collect()
    }
}

/// A resource marker: the document is only created if the referenced field
/// matches `condition`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceMarker {
    pub field: String,
    pub scope: Scope,
    pub condition: Condition,
    pub line: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Condition {
    /// The field must equal the raw value.
    Value(String),

    /// The resource is included if the bool field equals this value.
    Include(bool),
}

impl Marker {
    /// Parses a comment (the text following `#`) as marker. Returns
    /// [`None`] for comments which are not markers.
    pub fn parse(comment: &str, line: usize) -> Result<Option<Self>> {
        let comment = comment.trim();

        if let Some(args) = comment.strip_prefix(COLLECTION_FIELD_PREFIX) {
            return parse_field(args, Scope::Collection, line).map(|m| Some(Self::Field(m)));
        }
        if let Some(args) = comment.strip_prefix(FIELD_PREFIX) {
            return parse_field(args, Scope::Parent, line).map(|m| Some(Self::Field(m)));
        }
        if let Some(args) = comment.strip_prefix(RESOURCE_PREFIX) {
            return parse_resource(args, line).map(|m| Some(Self::Resource(m)));
        }

        Ok(None)
    }
}

fn parse_field(input: &str, scope: Scope, line: usize) -> Result<FieldMarker> {
    let mut args = Arguments::parse(input).context(ParseArgumentsSnafu { line })?;

    let name = args
        .take("name")
        .filter(|name| !name.is_empty())
        .context(MissingArgumentSnafu { name: "name", line })?;
    let raw_type = args
        .take("type")
        .context(MissingArgumentSnafu { name: "type", line })?;
    let field_type = match raw_type.parse::<FieldType>() {
        Ok(field_type @ (FieldType::String | FieldType::Int | FieldType::Bool)) => field_type,
        _ => return InvalidTypeSnafu { value: raw_type, line }.fail(),
    };

    let default = args
        .take("default")
        .map(|value| {
            Literal::parse(field_type, &value).context(InvalidDefaultSnafu {
                value,
                field_type,
                line,
            })
        })
        .transpose()?;

    let reference_scope = match args.take("parent") {
        Some(value) => value
            .parse::<Scope>()
            .ok()
            .context(InvalidParentSnafu { value, line })?,
        None => scope,
    };

    let replace = args
        .take("replace")
        .map(|expression| {
            Regex::new(&expression).context(InvalidReplaceSnafu { expression, line })
        })
        .transpose()?;

    let arbitrary = args
        .take("arbitrary")
        .map(|value| parse_bool("arbitrary", value, line))
        .transpose()?
        .unwrap_or_default();

    let description = args.take("description");

    let remaining = args.remaining();
    ensure!(
        remaining.is_empty(),
        UnknownArgumentsSnafu {
            names: remaining,
            line
        }
    );

    Ok(FieldMarker {
        name,
        field_type,
        default,
        description,
        scope,
        reference_scope,
        replace,
        arbitrary,
        line,
    })
}

fn parse_resource(input: &str, line: usize) -> Result<ResourceMarker> {
    let mut args = Arguments::parse(input).context(ParseArgumentsSnafu { line })?;

    let field = args.take("field");
    let collection_field = args.take_any(&["collectionField", "collection-field"]);
    let (field, scope) = match (field, collection_field) {
        (Some(field), None) => (field, Scope::Parent),
        (None, Some(field)) => (field, Scope::Collection),
        _ => {
            return ExclusiveArgumentsSnafu {
                first: "field",
                second: "collectionField",
                line,
            }
            .fail();
        }
    };

    let condition = match (args.take("value"), args.take("include")) {
        (Some(value), None) => Condition::Value(value),
        (None, Some(include)) => Condition::Include(parse_bool("include", include, line)?),
        _ => {
            return ExclusiveArgumentsSnafu {
                first: "value",
                second: "include",
                line,
            }
            .fail();
        }
    };

    let remaining = args.remaining();
    ensure!(
        remaining.is_empty(),
        UnknownArgumentsSnafu {
            names: remaining,
            line
        }
    );

    Ok(ResourceMarker {
        field,
        scope,
        condition,
        line,
    })
}

fn parse_bool(name: &'static str, value: String, line: usize) -> Result<bool> {
    match value.as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => InvalidBoolSnafu { name, value, line }.fail(),
    }
}
