//! Loading of workload configuration documents.
//!
//! A run starts from a single configuration file which holds exactly one
//! `StandaloneWorkload` or one `WorkloadCollection`. A collection lists
//! further files declaring its `ComponentWorkload`s, components can also be
//! declared inline in the collection's file.

use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use snafu::{OptionExt, ResultExt, Snafu, ensure};
use tracing::{debug, info};

mod workload;

pub use workload::{
    CliCommandSpec, ComponentWorkload, StandaloneWorkload, Workload, WorkloadApiSpec,
    WorkloadCollection, WorkloadKind, WorkloadMeta,
};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to read workload configuration {path:?}"))]
    ReadConfig {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to parse workload configuration {path:?}"))]
    ParseConfig {
        source: serde_yaml::Error,
        path: PathBuf,
    },

    #[snafu(display("unknown workload kind {kind:?} in {path:?}"))]
    UnknownWorkloadKind { kind: String, path: PathBuf },

    #[snafu(display("failed to decode {kind} in {path:?}"))]
    DecodeWorkload {
        source: serde_yaml::Error,
        kind: WorkloadKind,
        path: PathBuf,
    },

    #[snafu(display(
        "workload {name:?} in {path:?} is missing required fields: {}",
        fields.join(", ")
    ))]
    MissingRequiredFields {
        name: String,
        path: PathBuf,
        fields: Vec<&'static str>,
    },

    #[snafu(display("names-must-be-unique: workload name {name:?} is declared more than once"))]
    DuplicateName { name: String },

    #[snafu(display("no StandaloneWorkload or WorkloadCollection found in {path:?}"))]
    MissingTopLevel { path: PathBuf },

    #[snafu(display(
        "only one StandaloneWorkload or WorkloadCollection is allowed, found {first:?} and {second:?}"
    ))]
    MultipleTopLevel { first: String, second: String },

    #[snafu(display("component {name:?} requires a WorkloadCollection"))]
    ComponentWithoutCollection { name: String },
}

/// The workloads of a single run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Configuration {
    Standalone(StandaloneWorkload),
    Collection {
        collection: WorkloadCollection,
        components: Vec<ComponentWorkload>,
    },
}

impl Configuration {
    /// Iterates over all workloads, the top-level one first.
    pub fn workloads(&self) -> Vec<Workload> {
        match self {
            Self::Standalone(standalone) => vec![Workload::Standalone(standalone.clone())],
            Self::Collection {
                collection,
                components,
            } => std::iter::once(Workload::Collection(collection.clone()))
                .chain(components.iter().cloned().map(Workload::Component))
                .collect(),
        }
    }
}

/// Loads the configuration file at `path` along with all component files
/// it references.
pub fn load(path: impl AsRef<Path>) -> Result<Configuration> {
    let path = path.as_ref();
    info!(?path, "loading workload configuration");

    let mut top_level = None;
    let mut components = Vec::new();

    for workload in read_workloads(path)? {
        match workload {
            Workload::Component(component) => components.push(component),
            workload => set_top_level(&mut top_level, workload)?,
        }
    }

    let Some(top_level) = top_level else {
        if let Some(component) = components.first() {
            return ComponentWithoutCollectionSnafu {
                name: &component.meta.name,
            }
            .fail();
        }
        return MissingTopLevelSnafu { path }.fail();
    };

    let configuration = match top_level {
        Workload::Collection(collection) => {
            for file in &collection.component_files {
                let component_path = collection.meta.directory().join(file);
                debug!(path = ?component_path, "loading component configuration");

                for workload in read_workloads(&component_path)? {
                    match workload {
                        Workload::Component(component) => components.push(component),
                        workload => {
                            return MultipleTopLevelSnafu {
                                first: &collection.meta.name,
                                second: workload.name(),
                            }
                            .fail();
                        }
                    }
                }
            }

            for component in &mut components {
                if component.meta.api.domain.is_empty() {
                    component.meta.api.domain.clone_from(&collection.meta.api.domain);
                }
            }

            Configuration::Collection {
                collection,
                components,
            }
        }
        Workload::Standalone(standalone) => {
            if let Some(component) = components.first() {
                return ComponentWithoutCollectionSnafu {
                    name: &component.meta.name,
                }
                .fail();
            }
            Configuration::Standalone(standalone)
        }
        Workload::Component(component) => {
            return ComponentWithoutCollectionSnafu {
                name: component.meta.name,
            }
            .fail();
        }
    };

    let mut names = BTreeSet::new();
    for workload in configuration.workloads() {
        ensure!(
            names.insert(workload.name().to_owned()),
            DuplicateNameSnafu {
                name: workload.name()
            }
        );
    }

    Ok(configuration)
}

fn set_top_level(top_level: &mut Option<Workload>, workload: Workload) -> Result<()> {
    if let Some(existing) = top_level {
        return MultipleTopLevelSnafu {
            first: existing.name(),
            second: workload.name(),
        }
        .fail();
    }

    *top_level = Some(workload);
    Ok(())
}

/// Reads every workload document of a single file.
fn read_workloads(path: &Path) -> Result<Vec<Workload>> {
    let content = fs::read_to_string(path).context(ReadConfigSnafu { path })?;

    let mut workloads = Vec::new();
    for document in serde_yaml::Deserializer::from_str(&content) {
        let value = serde_yaml::Value::deserialize(document).context(ParseConfigSnafu { path })?;
        if value.is_null() {
            continue;
        }

        workloads.push(decode_workload(value, path)?);
    }

    Ok(workloads)
}

fn decode_workload(value: serde_yaml::Value, path: &Path) -> Result<Workload> {
    let Some(kind) = value.get("kind").and_then(serde_yaml::Value::as_str) else {
        let text = |value: Option<&serde_yaml::Value>| {
            value
                .and_then(serde_yaml::Value::as_str)
                .map(ToOwned::to_owned)
        };
        let api = value.get("spec").and_then(|spec| spec.get("api"));
        let api = ApiDocument {
            domain: text(api.and_then(|api| api.get("domain"))),
            group: text(api.and_then(|api| api.get("group"))),
            version: text(api.and_then(|api| api.get("version"))),
            kind: text(api.and_then(|api| api.get("kind"))),
            cluster_scoped: false,
        };
        let name = text(value.get("name")).unwrap_or_default();

        // The domain requirement depends on the kind, so it is not reported.
        let mut fields = missing_fields(&name, &api, false);
        fields.insert(usize::from(name.is_empty()), "kind");

        return MissingRequiredFieldsSnafu { name, path, fields }.fail();
    };
    let kind = kind
        .parse::<WorkloadKind>()
        .ok()
        .context(UnknownWorkloadKindSnafu { kind, path })?;

    let workload = match kind {
        WorkloadKind::StandaloneWorkload => {
            let document: Document<StandaloneSpec> =
                serde_yaml::from_value(value).context(DecodeWorkloadSnafu { kind, path })?;
            Workload::Standalone(StandaloneWorkload {
                meta: document.meta(&document.spec.api, &document.spec.resources, true, path)?,
                root_command: document.spec.companion_cli_rootcmd,
            })
        }
        WorkloadKind::WorkloadCollection => {
            let document: Document<CollectionSpec> =
                serde_yaml::from_value(value).context(DecodeWorkloadSnafu { kind, path })?;
            Workload::Collection(WorkloadCollection {
                meta: document.meta(&document.spec.api, &document.spec.resources, true, path)?,
                component_files: document.spec.component_files,
                root_command: document.spec.companion_cli_rootcmd,
                sub_command: document.spec.companion_cli_subcmd,
            })
        }
        WorkloadKind::ComponentWorkload => {
            let document: Document<ComponentSpec> =
                serde_yaml::from_value(value).context(DecodeWorkloadSnafu { kind, path })?;
            Workload::Component(ComponentWorkload {
                meta: document.meta(&document.spec.api, &document.spec.resources, false, path)?,
                dependencies: document.spec.dependencies,
                sub_command: document.spec.companion_cli_subcmd,
            })
        }
    };

    debug!(name = workload.name(), %kind, "decoded workload");
    Ok(workload)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct Document<S> {
    #[serde(default)]
    name: Option<String>,

    #[allow(dead_code)]
    kind: String,

    #[serde(default)]
    spec: S,
}

impl<S> Document<S> {
    /// Builds the shared attributes, reporting every missing required field
    /// at once.
    fn meta(
        &self,
        api: &ApiDocument,
        resources: &[String],
        requires_domain: bool,
        path: &Path,
    ) -> Result<WorkloadMeta> {
        let name = self.name.clone().unwrap_or_default();

        let missing = missing_fields(&name, api, requires_domain);
        ensure!(
            missing.is_empty(),
            MissingRequiredFieldsSnafu {
                name,
                path,
                fields: missing,
            }
        );

        Ok(WorkloadMeta {
            name,
            api: WorkloadApiSpec {
                domain: api.domain.clone().unwrap_or_default(),
                group: api.group.clone().unwrap_or_default(),
                version: api.version.clone().unwrap_or_default(),
                kind: api.kind.clone().unwrap_or_default(),
                cluster_scoped: api.cluster_scoped,
            },
            resources: resources.to_vec(),
            path: path.to_path_buf(),
        })
    }
}

/// The paths of all required fields which are absent or blank.
fn missing_fields(name: &str, api: &ApiDocument, requires_domain: bool) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if name.is_empty() {
        missing.push("name");
    }
    if requires_domain && is_blank(api.domain.as_ref()) {
        missing.push("spec.api.domain");
    }
    if is_blank(api.group.as_ref()) {
        missing.push("spec.api.group");
    }
    if is_blank(api.version.as_ref()) {
        missing.push("spec.api.version");
    }
    if is_blank(api.kind.as_ref()) {
        missing.push("spec.api.kind");
    }
    missing
}

fn is_blank(value: Option<&String>) -> bool {
    value.is_none_or(|value| value.trim().is_empty())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ApiDocument {
    domain: Option<String>,
    group: Option<String>,
    version: Option<String>,
    kind: Option<String>,

    #[serde(default)]
    cluster_scoped: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct StandaloneSpec {
    #[serde(default)]
    api: ApiDocument,

    #[serde(default)]
    resources: Vec<String>,

    companion_cli_rootcmd: Option<CliCommandSpec>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct CollectionSpec {
    #[serde(default)]
    api: ApiDocument,

    #[serde(default)]
    resources: Vec<String>,

    #[serde(default)]
    component_files: Vec<String>,

    companion_cli_rootcmd: Option<CliCommandSpec>,
    companion_cli_subcmd: Option<CliCommandSpec>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ComponentSpec {
    #[serde(default)]
    api: ApiDocument,

    #[serde(default)]
    resources: Vec<String>,

    #[serde(default)]
    dependencies: Vec<String>,

    companion_cli_subcmd: Option<CliCommandSpec>,
}
