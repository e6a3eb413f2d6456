//! Generation of source code which reconstructs child resources.
//!
//! The generated operator creates its child resources from code rather than
//! from YAML, so every rewritten manifest document is turned into source
//! code by a [`CodeGenerator`]. Variable references left behind by field
//! markers become expressions on the custom resource in that code.

use std::collections::BTreeMap;

use snafu::Snafu;

use crate::{api::FieldType, marker::Guard, yaml::Node};

mod go;

pub use go::GoGenerator;

/// The types of all variable references which may appear in rewritten
/// manifests, keyed by reference (e.g. `parent.Spec.Replicas`).
pub type VariableTypes = BTreeMap<String, FieldType>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to convert flow collection"))]
    ConvertFlow { source: crate::yaml::ConvertError },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GeneratedCode {
    pub body: String,

    /// Set if the code converts integers or booleans into strings, so the
    /// rendering template has to import the conversion helpers.
    pub use_string_conv: bool,
}

/// A back-end producing source code in the language of the generated
/// operator.
pub trait CodeGenerator {
    /// Generates the code which reconstructs the object described by the
    /// root node of a manifest document.
    fn generate(&self, root: &Node, variables: &VariableTypes) -> Result<GeneratedCode, Error>;

    /// Generates the code which skips the creation of a resource unless the
    /// guard holds.
    fn resource_guard(&self, guard: &Guard) -> String;
}
