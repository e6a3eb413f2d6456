//! Analysis of the Kubernetes objects a workload creates.
//!
//! Every non-empty document of a rewritten manifest is one child resource.
//! The analyzer decodes the object, derives a name which is unique within
//! the workload, generates the code reconstructing the object and collects
//! the RBAC rules the controller needs to manage it.

use kube::core::DynamicObject;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use snafu::{OptionExt, ResultExt, Snafu};
use tracing::debug;

use crate::{
    codegen::{self, CodeGenerator, VariableTypes},
    marker::Guard,
    rbac::{self, Rules},
    yaml::{self, END_MARK, Node, START_MARK, VAR_TAG},
};

mod registry;

pub use registry::{NameRegistry, UniqueNameCollision, create_func, mutate_func};

/// Kinds whose unique names start with a shorter alias.
const KIND_ALIASES: &[(&str, &str)] = &[
    ("CustomResourceDefinition", "CRD"),
    ("ValidatingWebhookConfiguration", "ValidatingWebhook"),
    ("MutatingWebhookConfiguration", "MutatingWebhook"),
];

/// Marker syntax which may end up in names and namespaces of rewritten
/// objects.
const MARKER_SYNTAX: &[&str] = &[VAR_TAG, START_MARK, END_MARK, "parent.Spec.", "collection.Spec."];

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to convert document at line {line}"))]
    ConvertDocument {
        source: yaml::ConvertError,
        line: usize,
    },

    #[snafu(display("document at line {line} is missing {field:?}"))]
    MissingTypeField { field: &'static str, line: usize },

    #[snafu(display("failed to decode {kind} object at line {line}"))]
    DecodeObject {
        source: serde_json::Error,
        kind: String,
        line: usize,
    },

    #[snafu(display("failed to generate code for {kind} {name:?}"))]
    GenerateCode {
        source: codegen::Error,
        kind: String,
        name: String,
    },

    #[snafu(display("failed to extract RBAC rules from {kind} {name:?}"))]
    ExtractRules {
        source: rbac::Error,
        kind: String,
        name: String,
    },

    #[snafu(display("failed to name {kind} {name:?}"))]
    ClaimName {
        source: UniqueNameCollision,
        kind: String,
        name: String,
    },
}

/// A Kubernetes object created by the generated controller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildResource {
    pub name: String,
    pub namespace: String,
    pub group: String,
    pub version: String,
    pub kind: String,
    pub unique_name: String,
    pub create_func: String,
    pub mutate_func: String,

    /// Code reconstructing the rewritten object.
    pub source_code: String,

    /// The document as written in the manifest, before markers were applied.
    pub static_content: String,
    pub use_string_conv: bool,

    /// Guards skipping the creation of the object, one per resource marker.
    pub include_code: Vec<String>,
    pub rbac: Rules,

    /// Set for CustomResourceDefinitions, which are created before all other
    /// resources.
    pub is_crd: bool,
}

impl ChildResource {
    /// Analyzes the root node of a rewritten manifest document.
    pub fn analyze(
        root: &Node,
        static_content: &str,
        registry: &mut NameRegistry,
        generator: &dyn CodeGenerator,
        variables: &VariableTypes,
    ) -> Result<Self> {
        let line = root.line();
        let object = decode(root)?;

        let types = object.types.unwrap_or_default();
        let name = object.metadata.name.unwrap_or_default();
        let namespace = object.metadata.namespace.unwrap_or_default();
        let kind = types.kind;
        let (group, version) = match types.api_version.split_once('/') {
            Some((group, version)) => (group.to_owned(), version.to_owned()),
            None => (String::new(), types.api_version),
        };
        debug!(%kind, %name, line, "analyzing child resource");

        let unique_name = registry
            .claim_unique_name(&unique_name_base(&kind, &namespace, &name))
            .context(ClaimNameSnafu {
                kind: &kind,
                name: &name,
            })?;

        let code = generator
            .generate(root, variables)
            .context(GenerateCodeSnafu {
                kind: &kind,
                name: &name,
            })?;

        let rbac = rbac::child_rules(&group, &kind, &object.data).context(ExtractRulesSnafu {
            kind: &kind,
            name: &name,
        })?;

        Ok(Self {
            create_func: create_func(&unique_name),
            mutate_func: mutate_func(&unique_name),
            is_crd: kind == "CustomResourceDefinition",
            name,
            namespace,
            group,
            version,
            kind,
            unique_name,
            source_code: code.body,
            static_content: static_content.to_owned(),
            use_string_conv: code.use_string_conv,
            include_code: Vec::new(),
            rbac,
        })
    }

    pub fn add_guard(&mut self, generator: &dyn CodeGenerator, guard: &Guard) {
        self.include_code.push(generator.resource_guard(guard));
    }
}

/// Decodes a document into an untyped Kubernetes object. Objects without
/// metadata are accepted.
fn decode(root: &Node) -> Result<DynamicObject> {
    let line = root.line();
    let mut value = yaml::node_to_json(root).context(ConvertDocumentSnafu { line })?;

    for field in ["apiVersion", "kind"] {
        value
            .get(field)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
            .context(MissingTypeFieldSnafu { field, line })?;
    }

    let kind = value["kind"].as_str().unwrap_or_default().to_owned();
    if let Value::Object(object) = &mut value {
        object
            .entry("metadata")
            .or_insert_with(|| Value::Object(Map::new()));
    }

    DynamicObject::deserialize(value).context(DecodeObjectSnafu { kind, line })
}

/// Concatenates the (aliased) kind with the title-cased namespace and name.
pub fn unique_name_base(kind: &str, namespace: &str, name: &str) -> String {
    let kind = KIND_ALIASES
        .iter()
        .find(|(long, _)| *long == kind)
        .map_or(kind, |(_, alias)| alias);

    format!("{kind}{}{}", identifier(namespace), identifier(name))
}

/// Title-cases every word of `text` and drops everything which cannot be
/// part of an identifier.
fn identifier(text: &str) -> String {
    let mut text = text.to_owned();
    for syntax in MARKER_SYNTAX {
        text = text.replace(syntax, "");
    }

    let mut identifier = String::with_capacity(text.len());
    let mut word_start = true;
    for c in text.trim().chars() {
        if c.is_alphanumeric() {
            if word_start {
                identifier.extend(c.to_uppercase());
            } else {
                identifier.push(c);
            }
            word_start = false;
        } else {
            if !matches!(c, '-' | '.' | ':' | ' ') {
                identifier.push(c);
            }
            word_start = true;
        }
    }

    identifier
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use rstest::rstest;

    use super::*;
    use crate::{codegen::GoGenerator, yaml::parse_documents};

    fn analyze(input: &str, registry: &mut NameRegistry) -> Result<ChildResource> {
        let documents = parse_documents(input).expect("input must parse");
        let root = documents[0].root.as_ref().expect("document must have a root");

        ChildResource::analyze(
            root,
            input,
            registry,
            &GoGenerator,
            &VariableTypes::default(),
        )
    }

    #[rstest]
    #[case("Deployment", "default", "web-app", "DeploymentDefaultWebApp")]
    #[case("ConfigMap", "", "app.config", "ConfigMapAppConfig")]
    #[case("CustomResourceDefinition", "", "webapps.apps.acme.com", "CRDWebappsAppsAcmeCom")]
    #[case("ValidatingWebhookConfiguration", "", "hook", "ValidatingWebhookHook")]
    #[case("Service", "!!var parent.Spec.Namespace", "web", "ServiceNamespaceWeb")]
    #[case("Service", "kube-system", "web:http", "ServiceKubeSystemWebHttp")]
    fn unique_name_bases(
        #[case] kind: &str,
        #[case] namespace: &str,
        #[case] name: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(unique_name_base(kind, namespace, name), expected);
    }

    #[test]
    fn analyzes_deployments() {
        let mut registry = NameRegistry::default();
        let resource = analyze(
            indoc! {"
                apiVersion: apps/v1
                kind: Deployment
                metadata:
                  name: web
                  namespace: default
                spec:
                  replicas: 2
            "},
            &mut registry,
        )
        .expect("resource must be analyzed");

        assert_eq!(resource.group, "apps");
        assert_eq!(resource.version, "v1");
        assert_eq!(resource.unique_name, "DeploymentDefaultWeb");
        assert_eq!(resource.create_func, "CreateDeploymentDefaultWeb");
        assert_eq!(resource.mutate_func, "MutateDeploymentDefaultWeb");
        assert!(resource.source_code.contains("\"replicas\": 2,"));
        assert!(!resource.is_crd);
        assert_eq!(
            resource.rbac.rules(),
            vec![rbac::Rule::resource("apps", "deployments", rbac::DEFAULT_VERBS)]
        );
    }

    #[test]
    fn core_objects_without_metadata() {
        let mut registry = NameRegistry::default();
        let resource = analyze(
            indoc! {"
                apiVersion: v1
                kind: Namespace
            "},
            &mut registry,
        )
        .expect("resource must be analyzed");

        assert_eq!(resource.group, "");
        assert_eq!(resource.version, "v1");
        assert_eq!(resource.unique_name, "Namespace");
        assert_eq!(
            resource.rbac.rules(),
            vec![rbac::Rule::resource("core", "namespaces", rbac::DEFAULT_VERBS)]
        );
    }

    #[test]
    fn suffixes_colliding_names() {
        let input = indoc! {"
            apiVersion: v1
            kind: ConfigMap
            metadata:
              name: settings
        "};
        let mut registry = NameRegistry::default();

        let first = analyze(input, &mut registry).expect("resource must be analyzed");
        let second = analyze(input, &mut registry).expect("resource must be analyzed");

        assert_eq!(first.unique_name, "ConfigMapSettings");
        assert_eq!(second.unique_name, "ConfigMapSettings2");
        assert_eq!(second.create_func, "CreateConfigMapSettings2");
    }

    #[test]
    fn rejects_documents_without_kind() {
        let mut registry = NameRegistry::default();
        let result = analyze("apiVersion: v1\nmetadata:\n  name: x\n", &mut registry);

        assert!(matches!(
            result,
            Err(Error::MissingTypeField { field: "kind", .. })
        ));
    }
}
