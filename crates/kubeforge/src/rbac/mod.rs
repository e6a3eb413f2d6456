//! The RBAC rules the generated controller needs.
//!
//! Rules are collected in [`Rules`], which merges rules for the same
//! resource (or non-resource URL) by taking the union of their verbs.

use std::collections::BTreeMap;

use indexmap::IndexSet;
use serde::{Serialize, Serializer, ser::SerializeSeq};
use serde_json::Value;

use crate::config::WorkloadApiSpec;

mod plural;
mod role;

pub use plural::plural;
pub use role::{Error, role_rules};

/// The verbs the controller needs on every resource it manages.
pub const DEFAULT_VERBS: &[&str] = &["get", "list", "watch", "create", "update", "patch", "delete"];

/// The verbs the controller needs on the status of its custom resource.
pub const STATUS_VERBS: &[&str] = &["get", "update", "patch"];

/// The verbs a component needs to read its collection.
pub const READ_VERBS: &[&str] = &["get", "list", "watch"];

/// The name the empty (core) API group is emitted as.
pub const CORE_GROUP: &str = "core";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Rule {
    #[serde(rename_all = "camelCase")]
    Resource {
        group: String,
        resource: String,
        verbs: Vec<String>,
    },

    #[serde(rename_all = "camelCase")]
    NonResource { urls: Vec<String>, verbs: Vec<String> },
}

impl Rule {
    pub fn resource(group: &str, resource: &str, verbs: &[&str]) -> Self {
        Self::Resource {
            group: group.to_owned(),
            resource: resource.to_owned(),
            verbs: verbs.iter().map(|verb| (*verb).to_owned()).collect(),
        }
    }

    /// Renders the rule as kubebuilder RBAC marker.
    pub fn marker(&self) -> String {
        match self {
            Self::Resource {
                group,
                resource,
                verbs,
            } => format!(
                "+kubebuilder:rbac:groups={group},resources={resource},verbs={}",
                verbs.join(";")
            ),
            Self::NonResource { urls, verbs } => format!(
                "+kubebuilder:rbac:urls={},verbs={}",
                urls.join(";"),
                verbs.join(";")
            ),
        }
    }
}

/// A set of rules in which every resource and every non-resource URL
/// appears at most once.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Rules {
    resources: BTreeMap<(String, String), IndexSet<String>>,
    urls: BTreeMap<String, IndexSet<String>>,
}

impl Rules {
    /// Adds a rule, merging its verbs into existing rules for the same
    /// resource or URLs. Non-resource rules are split up per URL.
    pub fn add(&mut self, rule: Rule) {
        match rule {
            Rule::Resource {
                group,
                resource,
                verbs,
            } => {
                let group = if group.is_empty() {
                    CORE_GROUP.to_owned()
                } else {
                    group
                };
                self.resources
                    .entry((group, resource))
                    .or_default()
                    .extend(verbs);
            }
            Rule::NonResource { urls, verbs } => {
                for url in urls {
                    self.urls
                        .entry(url)
                        .or_default()
                        .extend(verbs.iter().cloned());
                }
            }
        }
    }

    pub fn add_resource(&mut self, group: &str, resource: &str, verbs: &[&str]) {
        self.add(Rule::resource(group, resource, verbs));
    }

    pub fn extend(&mut self, other: &Self) {
        for rule in other.rules() {
            self.add(rule);
        }
    }

    /// All rules, resource rules sorted by group and resource first, then
    /// non-resource rules sorted by URL.
    pub fn rules(&self) -> Vec<Rule> {
        let resources = self
            .resources
            .iter()
            .map(|((group, resource), verbs)| Rule::Resource {
                group: group.clone(),
                resource: resource.clone(),
                verbs: verbs.iter().cloned().collect(),
            });
        let urls = self.urls.iter().map(|(url, verbs)| Rule::NonResource {
            urls: vec![url.clone()],
            verbs: verbs.iter().cloned().collect(),
        });

        resources.chain(urls).collect()
    }

    pub fn markers(&self) -> Vec<String> {
        self.rules().iter().map(Rule::marker).collect()
    }

    pub fn len(&self) -> usize {
        self.resources.len() + self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Serialize)]
struct RenderedRule {
    #[serde(flatten)]
    rule: Rule,
    marker: String,
}

impl Serialize for Rules {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let rules = self.rules();
        let mut seq = serializer.serialize_seq(Some(rules.len()))?;
        for rule in rules {
            let marker = rule.marker();
            seq.serialize_element(&RenderedRule { rule, marker })?;
        }
        seq.end()
    }
}

/// The rules a workload needs on its own custom resource.
pub fn workload_rules(api: &WorkloadApiSpec) -> Rules {
    let mut rules = Rules::default();
    let resource = api.resource();

    rules.add_resource(&api.api_group(), &resource, DEFAULT_VERBS);
    rules.add_resource(&api.api_group(), &format!("{resource}/status"), STATUS_VERBS);
    rules
}

/// The rules a child resource demands: the default verbs on the resource
/// itself and, for roles, the rules the role grants.
pub fn child_rules(group: &str, kind: &str, object: &Value) -> Result<Rules, Error> {
    let mut rules = Rules::default();
    rules.add_resource(group, &plural(kind), DEFAULT_VERBS);

    if kind.eq_ignore_ascii_case("Role") || kind.eq_ignore_ascii_case("ClusterRole") {
        for rule in role_rules(object)? {
            rules.add(rule);
        }
    }

    Ok(rules)
}
