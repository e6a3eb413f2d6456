//! The manifest files of a workload.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Serialize;
use snafu::{ResultExt, Snafu};
use tracing::debug;

use crate::{config::WorkloadMeta, resource::ChildResource};

pub mod file_name;
pub mod glob;

pub use file_name::{RESERVED_FILE_NAME, assign_source_file_names, preferred_source_file_names};

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to expand the resources of workload {workload:?}"))]
    Expand { source: glob::Error, workload: String },

    #[snafu(display("failed to read manifest {path:?}"))]
    ReadManifest {
        source: std::io::Error,
        path: PathBuf,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub path: PathBuf,

    /// The path relative to the directory of the workload configuration.
    pub relative_path: String,

    #[serde(skip)]
    pub content: String,

    /// The content after markers were applied.
    pub mutated_content: String,

    /// Source file name candidates, from the most specific one on.
    pub preferred_source_file_names: Vec<String>,
    pub source_file_name: String,
    pub child_resources: Vec<ChildResource>,
}

impl Manifest {
    pub fn read(base: &Path, path: PathBuf) -> Result<Self, Error> {
        let content = fs::read_to_string(&path).context(ReadManifestSnafu { path: &path })?;

        let relative = path.strip_prefix(base).unwrap_or(&path);
        let relative_path = glob::slash_path(relative);
        let preferred_source_file_names = preferred_source_file_names(relative);

        Ok(Self {
            path,
            relative_path,
            mutated_content: content.clone(),
            content,
            preferred_source_file_names,
            source_file_name: String::new(),
            child_resources: Vec::new(),
        })
    }
}

/// Reads all manifests declared by a workload.
pub fn expand(workload: &WorkloadMeta) -> Result<Vec<Manifest>, Error> {
    let base = workload.directory();
    let paths = glob::expand(base, &workload.resources).context(ExpandSnafu {
        workload: &workload.name,
    })?;

    paths
        .into_iter()
        .map(|path| {
            debug!(?path, workload = %workload.name, "reading manifest");
            Manifest::read(base, path)
        })
        .collect()
}

/// Assigns every manifest its source file name.
pub fn assign_file_names(manifests: &mut [Manifest]) {
    let candidates: Vec<_> = manifests
        .iter()
        .map(|manifest| manifest.preferred_source_file_names.clone())
        .collect();

    for (manifest, name) in manifests
        .iter_mut()
        .zip(assign_source_file_names(&candidates))
    {
        manifest.source_file_name = name;
    }
}
