//! Resolution of the dependencies between the components of a collection.

use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;
use snafu::{Snafu, ensure};

use crate::config::ComponentWorkload;

#[derive(Debug, Snafu)]
#[snafu(display(
    "missing dependencies: {}",
    missing
        .iter()
        .map(|(component, peers)| format!("{component:?} depends on unknown {}", peers.join(", ")))
        .join("; ")
))]
pub struct MissingDependencies {
    /// The unknown peers, keyed by the component declaring them.
    pub missing: BTreeMap<String, Vec<String>>,
}

/// The dependencies of every component, sorted by name. Cycles are kept as
/// declared.
pub type DependencyGraph = BTreeMap<String, Vec<String>>;

/// Checks that components only depend on components of the same collection.
/// The result does not depend on the order the components were declared in.
pub fn resolve(components: &[ComponentWorkload]) -> Result<DependencyGraph, MissingDependencies> {
    let names: BTreeSet<&str> = components
        .iter()
        .map(|component| component.meta.name.as_str())
        .collect();

    let mut graph = DependencyGraph::new();
    let mut missing = BTreeMap::new();

    for component in components {
        let dependencies: Vec<String> = component
            .dependencies
            .iter()
            .cloned()
            .sorted()
            .dedup()
            .collect();

        let unknown: Vec<String> = dependencies
            .iter()
            .filter(|dependency| !names.contains(dependency.as_str()))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            missing.insert(component.meta.name.clone(), unknown);
        }

        graph.insert(component.meta.name.clone(), dependencies);
    }

    ensure!(missing.is_empty(), MissingDependenciesSnafu { missing });
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::config::{WorkloadApiSpec, WorkloadMeta};

    fn component(name: &str, dependencies: &[&str]) -> ComponentWorkload {
        ComponentWorkload {
            meta: WorkloadMeta {
                name: name.to_owned(),
                api: WorkloadApiSpec {
                    domain: "acme.com".to_owned(),
                    group: "platform".to_owned(),
                    version: "v1alpha1".to_owned(),
                    kind: name.to_owned(),
                    cluster_scoped: false,
                },
                resources: Vec::new(),
                path: PathBuf::from("components.yaml"),
            },
            dependencies: dependencies.iter().map(|&name| name.to_owned()).collect(),
            sub_command: None,
        }
    }

    #[test]
    fn resolution_is_order_independent() {
        let forward = [
            component("CacheTier", &["DbTier"]),
            component("DbTier", &[]),
        ];
        let reversed = [
            component("DbTier", &[]),
            component("CacheTier", &["DbTier"]),
        ];

        let graph = resolve(&forward).expect("dependencies must resolve");
        assert_eq!(graph, resolve(&reversed).expect("dependencies must resolve"));
        assert_eq!(graph["CacheTier"], ["DbTier"]);
        assert!(graph["DbTier"].is_empty());
    }

    #[test]
    fn accepts_cycles() {
        let graph = resolve(&[component("a", &["b"]), component("b", &["a"])])
            .expect("cycles must be accepted");

        assert_eq!(graph["a"], ["b"]);
        assert_eq!(graph["b"], ["a"]);
    }

    #[test]
    fn names_missing_peers() {
        let error = resolve(&[component("CacheTier", &["DbTier", "Queue"])])
            .expect_err("unknown peers must fail");

        assert_eq!(
            error.missing["CacheTier"],
            ["DbTier".to_owned(), "Queue".to_owned()]
        );
        assert_eq!(
            error.to_string(),
            "missing dependencies: \"CacheTier\" depends on unknown DbTier, Queue"
        );
    }
}
