//! The project model handed to the templates.
//!
//! [`Project::build`] runs the whole pipeline: manifests are expanded and
//! scanned for markers, the API trees are built from all markers of all
//! workloads, component dependencies are resolved and finally every
//! manifest is rewritten and analyzed into child resources.

use std::path::{Path, PathBuf};

use serde::Serialize;
use snafu::{OptionExt, ResultExt, Snafu};
use tracing::{debug, info};

use crate::{
    api::{self, ApiFields, sample_document},
    codegen::{CodeGenerator, GoGenerator, VariableTypes},
    config::{self, Configuration, Workload, WorkloadApiSpec, WorkloadKind},
    dependency::{self, DependencyGraph},
    manifest::{self, Manifest},
    marker::{self, DocumentMarkers, MarkerSet, Scope, rewrite::coerce_collection_references},
    naming::CliCommand,
    rbac::{self, READ_VERBS, Rules},
    resource::{self, ChildResource, NameRegistry},
    yaml::{self, Document, emit_documents, parse_documents, split_documents},
};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to load the workload configuration"))]
    LoadConfig { source: config::Error },

    #[snafu(display("the configuration does not declare any workload"))]
    EmptyConfiguration,

    #[snafu(display("failed to read the manifests of workload {workload:?}"))]
    ReadManifests {
        source: manifest::Error,
        workload: String,
    },

    #[snafu(display("failed to parse manifest {path:?}"))]
    ParseManifest {
        source: yaml::ParseError,
        path: PathBuf,
    },

    #[snafu(display("failed to process the markers of manifest {path:?}"))]
    ProcessMarkers {
        source: marker::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to add the fields of manifest {path:?} to the API"))]
    BuildApi { source: api::Error, path: PathBuf },

    #[snafu(display("failed to link component {workload:?} to its collection"))]
    LinkCollection {
        source: api::Error,
        workload: String,
    },

    #[snafu(display("failed to resolve component dependencies"))]
    ResolveDependencies {
        source: dependency::MissingDependencies,
    },

    #[snafu(display("failed to parse rewritten manifest {path:?}"))]
    ParseRewrittenManifest {
        source: yaml::ParseError,
        path: PathBuf,
    },

    #[snafu(display("failed to analyze the resources of manifest {path:?}"))]
    AnalyzeResource {
        source: resource::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to evaluate resource marker in manifest {path:?}"))]
    ResolveGuard {
        source: marker::Error,
        path: PathBuf,
    },
}

/// Everything the templates need to render the operator of a workload
/// configuration.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// The standalone workload or the collection.
    pub root: WorkloadModel,
    pub components: Vec<WorkloadModel>,
    pub dependency_graph: DependencyGraph,
}

/// A single processed workload.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadModel {
    pub name: String,
    pub kind: WorkloadKind,
    pub package_name: String,
    pub api: WorkloadApiSpec,
    pub api_fields: ApiFields,
    pub manifests: Vec<Manifest>,
    pub rbac: Rules,
    pub root_command: Option<CliCommand>,
    pub sub_command: Option<CliCommand>,

    /// The name of the collection a component belongs to.
    pub collection: Option<String>,
    pub component_dependencies: Vec<String>,

    /// Create functions of all child resources except CRDs.
    pub create_funcs: Vec<String>,

    /// Create functions of CRDs, which run before all other resources.
    pub init_funcs: Vec<String>,
    pub sample: String,
    pub required_sample: String,
}

impl WorkloadModel {
    pub fn child_resources(&self) -> impl Iterator<Item = &ChildResource> {
        self.manifests
            .iter()
            .flat_map(|manifest| &manifest.child_resources)
    }
}

impl Project {
    /// Loads the configuration at `path` and builds the project with the Go
    /// code generator.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let configuration = config::load(path).context(LoadConfigSnafu)?;
        Self::build(&configuration, &GoGenerator)
    }

    pub fn build(configuration: &Configuration, generator: &dyn CodeGenerator) -> Result<Self> {
        let scanned = configuration
            .workloads()
            .into_iter()
            .map(scan)
            .collect::<Result<Vec<_>>>()?;

        let components = match configuration {
            Configuration::Standalone(_) => Vec::new(),
            Configuration::Collection { components, .. } => components.clone(),
        };
        let dependency_graph =
            dependency::resolve(&components).context(ResolveDependenciesSnafu)?;

        let apis = Apis::build(&scanned)?;
        let collection_api = match configuration {
            Configuration::Standalone(_) => None,
            Configuration::Collection { collection, .. } => Some(collection.meta.api.clone()),
        };

        let mut workloads = Vec::with_capacity(scanned.len());
        for (index, scanned) in scanned.into_iter().enumerate() {
            let model = scanned.process(
                index,
                &apis,
                collection_api.as_ref(),
                &dependency_graph,
                generator,
            )?;
            workloads.push(model);
        }

        let mut workloads = workloads.into_iter();
        let root = workloads.next().context(EmptyConfigurationSnafu)?;

        Ok(Self {
            root,
            components: workloads.collect(),
            dependency_graph,
        })
    }

    /// The root workload followed by all components.
    pub fn workloads(&self) -> impl Iterator<Item = &WorkloadModel> {
        std::iter::once(&self.root).chain(&self.components)
    }

    pub fn workload(&self, name: &str) -> Option<&WorkloadModel> {
        self.workloads().find(|workload| workload.name == name)
    }
}

struct ScannedManifest {
    manifest: Manifest,
    documents: Vec<Document>,
    markers: Vec<DocumentMarkers>,
}

struct Scanned {
    workload: Workload,
    manifests: Vec<ScannedManifest>,
}

/// Reads the manifests of a workload and applies their field markers.
fn scan(workload: Workload) -> Result<Scanned> {
    info!(workload = %workload.name(), kind = %workload.kind(), "scanning workload manifests");

    let manifests = manifest::expand(workload.meta()).context(ReadManifestsSnafu {
        workload: workload.name(),
    })?;

    let manifests = manifests
        .into_iter()
        .map(|manifest| {
            debug!(path = ?manifest.path, "scanning manifest for markers");

            let mut documents = parse_documents(&manifest.content).context(ParseManifestSnafu {
                path: &manifest.path,
            })?;
            let markers = marker::rewrite_documents(&mut documents).context(ProcessMarkersSnafu {
                path: &manifest.path,
            })?;

            Ok(ScannedManifest {
                manifest,
                documents,
                markers,
            })
        })
        .collect::<Result<_>>()?;

    Ok(Scanned {
        workload,
        manifests,
    })
}

/// The API trees and declared fields of all workloads, by workload index.
/// The collection (if any) is the first workload.
struct Apis {
    fields: Vec<ApiFields>,
    markers: Vec<MarkerSet>,
}

impl Apis {
    /// Collection field markers of components go to the collection, all
    /// other markers to the workload declaring them.
    fn build(scanned: &[Scanned]) -> Result<Self> {
        let mut fields = vec![ApiFields::root(); scanned.len()];
        let mut markers = vec![MarkerSet::default(); scanned.len()];

        for (index, workload) in scanned.iter().enumerate() {
            for manifest in &workload.manifests {
                let results = manifest.markers.iter().flat_map(|document| &document.fields);

                for result in results {
                    let target = if workload.workload.is_component()
                        && result.marker.scope == Scope::Collection
                    {
                        0
                    } else {
                        index
                    };

                    markers[target].insert(&result.marker);
                    if !result.marker.arbitrary {
                        fields[target].add_marker(result).context(BuildApiSnafu {
                            path: &manifest.manifest.path,
                        })?;
                    }
                }
            }
        }

        Ok(Self { fields, markers })
    }
}

impl Scanned {
    fn process(
        self,
        index: usize,
        apis: &Apis,
        collection_api: Option<&WorkloadApiSpec>,
        dependency_graph: &DependencyGraph,
        generator: &dyn CodeGenerator,
    ) -> Result<WorkloadModel> {
        let workload = self.workload;
        let meta = workload.meta();
        info!(workload = %meta.name, kind = %workload.kind(), "processing workload");

        let component = workload.is_component();
        let own_markers = &apis.markers[index];

        // Only components see the collection, everybody else refers to its
        // own spec through collection markers.
        let collection_markers = if component {
            &apis.markers[0]
        } else {
            own_markers
        };

        let mut variables: VariableTypes = own_markers.references(Scope::Parent).collect();
        if component {
            variables.extend(collection_markers.references(Scope::Collection));
        }

        let mut api_fields = apis.fields[index].clone();
        let collection = match collection_api {
            Some(collection_api) if component => {
                api_fields
                    .add_collection_field(&collection_api.kind)
                    .context(LinkCollectionSnafu { workload: &meta.name })?;
                Some(collection_api)
            }
            _ => None,
        };

        let mut registry = NameRegistry::default();
        let mut rules = rbac::workload_rules(&meta.api);
        if let Some(collection_api) = collection {
            rules.add_resource(
                &collection_api.api_group(),
                &collection_api.resource(),
                READ_VERBS,
            );
        }

        let mut manifests = Vec::with_capacity(self.manifests.len());
        for scanned in self.manifests {
            let context = ManifestContext {
                coerce: !component,
                own_markers,
                collection_markers,
                variables: &variables,
                generator,
            };
            let manifest = context.analyze(scanned, &mut registry)?;

            for child in &manifest.child_resources {
                rules.extend(&child.rbac);
            }
            manifests.push(manifest);
        }
        manifest::assign_file_names(&mut manifests);

        let (init_funcs, create_funcs): (Vec<_>, Vec<_>) = manifests
            .iter()
            .flat_map(|manifest| &manifest.child_resources)
            .partition(|child| child.is_crd);
        let init_funcs = init_funcs.into_iter().map(|child| child.create_func.clone()).collect();
        let create_funcs = create_funcs.into_iter().map(|child| child.create_func.clone()).collect();

        let command = |spec: Option<&config::CliCommandSpec>| {
            spec.map(|spec| {
                CliCommand::new(&spec.name, Some(spec.description.as_str()), &meta.api.kind)
            })
        };
        let sample = sample_document(&meta.api, &api_fields, false);
        let required_sample = sample_document(&meta.api, &api_fields, true);

        Ok(WorkloadModel {
            name: meta.name.clone(),
            kind: workload.kind(),
            package_name: meta.package_name(),
            api: meta.api.clone(),
            sample,
            required_sample,
            api_fields,
            rbac: rules,
            root_command: command(workload.root_command()),
            sub_command: command(workload.sub_command()),
            collection: collection.map(|api| api.kind.clone()),
            component_dependencies: dependency_graph
                .get(&meta.name)
                .cloned()
                .unwrap_or_default(),
            create_funcs,
            init_funcs,
            manifests,
        })
    }
}

struct ManifestContext<'a> {
    /// Rewrite collection references into parent references.
    coerce: bool,
    own_markers: &'a MarkerSet,
    collection_markers: &'a MarkerSet,
    variables: &'a VariableTypes,
    generator: &'a dyn CodeGenerator,
}

impl ManifestContext<'_> {
    /// Emits the rewritten manifest and turns every document into a child
    /// resource.
    fn analyze(&self, scanned: ScannedManifest, registry: &mut NameRegistry) -> Result<Manifest> {
        let ScannedManifest {
            mut manifest,
            documents,
            markers,
        } = scanned;
        let path = manifest.path.clone();
        debug!(?path, "analyzing manifest");

        let mut mutated = emit_documents(&documents);
        if self.coerce {
            mutated = coerce_collection_references(&mutated);
        }

        // Documents are emitted in order, so indices line up with both the
        // markers and the original documents.
        let rewritten =
            parse_documents(&mutated).context(ParseRewrittenManifestSnafu { path: &path })?;
        let originals = split_documents(&manifest.content);

        for (index, document) in rewritten.iter().enumerate() {
            let Some(root) = &document.root else {
                continue;
            };
            let static_content = originals
                .get(index)
                .map(|(_, text)| text.as_str())
                .unwrap_or_default();

            let mut child = ChildResource::analyze(
                root,
                static_content,
                registry,
                self.generator,
                self.variables,
            )
            .context(AnalyzeResourceSnafu { path: &path })?;

            let resource_markers = markers.get(index).map(|markers| markers.resources.as_slice());
            for resource_marker in resource_markers.unwrap_or_default() {
                let mut guard = resource_marker
                    .resolve(self.own_markers, Some(self.collection_markers))
                    .context(ResolveGuardSnafu { path: &path })?;
                if self.coerce {
                    guard.reference = coerce_collection_references(&guard.reference);
                }
                child.add_guard(self.generator, &guard);
            }

            manifest.child_resources.push(child);
        }

        manifest.mutated_content = mutated;
        Ok(manifest)
    }
}
