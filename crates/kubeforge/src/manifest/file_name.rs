use std::{
    collections::{BTreeMap, HashSet},
    path::{Component, Path},
};

use convert_case::{Case, Casing};

/// The file holding the resource list of a workload, never assigned to a
/// manifest.
pub const RESERVED_FILE_NAME: &str = "resources.go";

/// Candidate source file names for a manifest, from the file name alone
/// (`name.go`) to the whole relative path (`a_b_c_name.go`).
pub fn preferred_source_file_names(relative_path: &Path) -> Vec<String> {
    let segments: Vec<String> = relative_path
        .components()
        .filter_map(|component| match component {
            Component::Normal(segment) => Some(segment.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    (1..=segments.len())
        .map(|count| normalize(&segments[segments.len() - count..].join("_")))
        .collect()
}

fn normalize(candidate: &str) -> String {
    let stem = candidate.replace(".yaml", "").replace(".yml", "").replace('.', "");
    let name = format!("{}.go", stem.to_case(Case::Snake));

    let name = if let Some(stem) = name.strip_suffix("_internal_test.go") {
        format!("{stem}.go")
    } else if let Some(stem) = name.strip_suffix("_test.go") {
        format!("{stem}.go")
    } else {
        name
    };

    name.trim_start_matches('_').to_owned()
}

/// Assigns every manifest one of its candidates so that no two manifests
/// share a file name. Manifests whose candidates collide move on to their
/// next candidate together, collisions left once all candidates are
/// exhausted get a numeric suffix.
pub fn assign_source_file_names(candidates: &[Vec<String>]) -> Vec<String> {
    let mut priorities = vec![0; candidates.len()];

    loop {
        let names = current_names(candidates, &priorities);

        let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (index, name) in names.iter().enumerate() {
            groups.entry(name.as_str()).or_default().push(index);
        }

        let mut escalated = false;
        for (name, members) in groups {
            if members.len() < 2 && name != RESERVED_FILE_NAME {
                continue;
            }

            for index in members {
                if priorities[index] + 1 < candidates[index].len() {
                    priorities[index] += 1;
                    escalated = true;
                }
            }
        }

        if !escalated {
            return disambiguate(names);
        }
    }
}

fn current_names(candidates: &[Vec<String>], priorities: &[usize]) -> Vec<String> {
    candidates
        .iter()
        .zip(priorities)
        .map(|(candidates, &priority)| {
            candidates
                .get(priority)
                .or_else(|| candidates.last())
                .cloned()
                .unwrap_or_else(|| RESERVED_FILE_NAME.to_owned())
        })
        .collect()
}

/// Appends `_<n>` to every name which is taken already.
fn disambiguate(names: Vec<String>) -> Vec<String> {
    let mut taken: HashSet<String> = names.iter().cloned().collect();
    let mut used = HashSet::from([RESERVED_FILE_NAME.to_owned()]);

    names
        .into_iter()
        .map(|name| {
            if used.insert(name.clone()) {
                return name;
            }

            let stem = name.strip_suffix(".go").unwrap_or(&name);
            let unique = (2..)
                .map(|suffix| format!("{stem}_{suffix}.go"))
                .find(|candidate| !taken.contains(candidate) && !used.contains(candidate))
                .unwrap_or_default();

            taken.insert(unique.clone());
            used.insert(unique.clone());
            unique
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn assign(paths: &[&str]) -> Vec<String> {
        let candidates: Vec<_> = paths
            .iter()
            .map(|path| preferred_source_file_names(Path::new(path)))
            .collect();
        assign_source_file_names(&candidates)
    }

    #[rstest]
    #[case("a/b/c/name.yaml", &["name.go", "c_name.go", "b_c_name.go", "a_b_c_name.go"])]
    #[case("./manifests/web-app.yml", &["web_app.go", "manifests_web_app.go"])]
    #[case("../shared/service.account.yaml", &["serviceaccount.go", "shared_serviceaccount.go"])]
    #[case("manifests/app_test.yaml", &["app.go", "manifests_app.go"])]
    #[case("manifests/app_internal_test.yaml", &["app.go", "manifests_app.go"])]
    #[case("_hidden.yaml", &["hidden.go"])]
    fn candidates(#[case] path: &str, #[case] expected: &[&str]) {
        assert_eq!(preferred_source_file_names(Path::new(path)), expected);
    }

    #[test]
    fn escalates_colliding_manifests() {
        assert_eq!(
            assign(&["a/b/name.yaml", "c/d/name.yaml", "e/b/name.yaml"]),
            ["a_b_name.go", "d_name.go", "e_b_name.go"]
        );
    }

    #[test]
    fn keeps_unique_leaf_names() {
        assert_eq!(
            assign(&["manifests/deployment.yaml", "manifests/service.yaml"]),
            ["deployment.go", "service.go"]
        );
    }

    #[test]
    fn never_assigns_the_resource_list() {
        assert_eq!(
            assign(&["manifests/resources.yaml", "resources.yaml"]),
            ["manifests_resources.go", "resources_2.go"]
        );
    }

    #[test]
    fn suffixes_exhausted_collisions() {
        assert_eq!(
            assign(&["name.yaml", "name.yml", "name.yaml"]),
            ["name.go", "name_2.go", "name_3.go"]
        );
    }
}
