use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{naming::package_name, rbac::plural};

/// The discriminator of a workload configuration document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumString, Display, Serialize)]
pub enum WorkloadKind {
    StandaloneWorkload,
    WorkloadCollection,
    ComponentWorkload,
}

/// The API a workload is managed through.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadApiSpec {
    pub domain: String,
    pub group: String,
    pub version: String,
    pub kind: String,
    pub cluster_scoped: bool,
}

impl WorkloadApiSpec {
    /// The full API group, i.e. the group qualified by the domain.
    pub fn api_group(&self) -> String {
        if self.domain.is_empty() {
            self.group.clone()
        } else {
            format!("{}.{}", self.group, self.domain)
        }
    }

    pub fn api_version(&self) -> String {
        format!("{}/{}", self.api_group(), self.version)
    }

    /// The plural resource name of the custom resource.
    pub fn resource(&self) -> String {
        plural(&self.kind)
    }

    /// The name of the sample custom resource.
    pub fn sample_name(&self) -> String {
        format!("{}-sample", self.kind.to_lowercase())
    }
}

/// A command of the companion CLI as declared in the configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CliCommandSpec {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,
}

/// The attributes shared by all workload kinds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkloadMeta {
    pub name: String,
    pub api: WorkloadApiSpec,

    /// Glob patterns of the manifests, relative to [`Self::directory`].
    pub resources: Vec<String>,

    /// The configuration file which declared the workload.
    pub path: PathBuf,
}

impl WorkloadMeta {
    /// The directory manifest globs are resolved against.
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    pub fn package_name(&self) -> String {
        package_name(&self.name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StandaloneWorkload {
    pub meta: WorkloadMeta,
    pub root_command: Option<CliCommandSpec>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkloadCollection {
    pub meta: WorkloadMeta,

    /// Paths of component configuration files, relative to the directory of
    /// the collection's configuration file.
    pub component_files: Vec<String>,
    pub root_command: Option<CliCommandSpec>,
    pub sub_command: Option<CliCommandSpec>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentWorkload {
    pub meta: WorkloadMeta,

    /// Names of the components this component depends on.
    pub dependencies: Vec<String>,
    pub sub_command: Option<CliCommandSpec>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Workload {
    Standalone(StandaloneWorkload),
    Collection(WorkloadCollection),
    Component(ComponentWorkload),
}

impl Workload {
    pub fn meta(&self) -> &WorkloadMeta {
        match self {
            Self::Standalone(workload) => &workload.meta,
            Self::Collection(workload) => &workload.meta,
            Self::Component(workload) => &workload.meta,
        }
    }

    pub fn name(&self) -> &str {
        &self.meta().name
    }

    pub fn kind(&self) -> WorkloadKind {
        match self {
            Self::Standalone(_) => WorkloadKind::StandaloneWorkload,
            Self::Collection(_) => WorkloadKind::WorkloadCollection,
            Self::Component(_) => WorkloadKind::ComponentWorkload,
        }
    }

    pub fn is_component(&self) -> bool {
        matches!(self, Self::Component(_))
    }

    pub fn root_command(&self) -> Option<&CliCommandSpec> {
        match self {
            Self::Standalone(workload) => workload.root_command.as_ref(),
            Self::Collection(workload) => workload.root_command.as_ref(),
            Self::Component(_) => None,
        }
    }

    pub fn sub_command(&self) -> Option<&CliCommandSpec> {
        match self {
            Self::Standalone(_) => None,
            Self::Collection(workload) => workload.sub_command.as_ref(),
            Self::Component(workload) => workload.sub_command.as_ref(),
        }
    }
}
