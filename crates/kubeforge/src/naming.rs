//! Names derived from workload names and field paths.

use convert_case::{Case, Casing};
use serde::Serialize;

/// The Go package name of a workload: its name in lower case without
/// dashes.
pub fn package_name(name: &str) -> String {
    name.to_lowercase().replace('-', "")
}

/// Converts a dotted field path into its exported form, e.g.
/// `image.pullPolicy` into `Image.PullPolicy`.
pub fn pascal_path(path: &str) -> String {
    path.split('.')
        .map(|segment| segment.to_case(Case::Pascal))
        .collect::<Vec<_>>()
        .join(".")
}

/// A command of the companion CLI.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CliCommand {
    pub name: String,
    pub description: String,

    /// The name of the Go variable holding the command.
    pub var_name: String,

    /// The name of the source file the command is rendered into, without
    /// extension.
    pub file_name: String,
}

impl CliCommand {
    /// Derives the command from its declared name. Without description the
    /// command manages workloads of the given kind.
    pub fn new(name: &str, description: Option<&str>, kind: &str) -> Self {
        let description = description
            .filter(|description| !description.is_empty())
            .map_or_else(
                || format!("Manage {} workload", kind.to_lowercase()),
                ToOwned::to_owned,
            );

        Self {
            name: name.to_owned(),
            description,
            var_name: name.to_case(Case::Pascal),
            file_name: name.to_case(Case::Snake),
        }
    }
}
