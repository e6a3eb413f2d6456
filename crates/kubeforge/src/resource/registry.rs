use indexmap::IndexSet;
use snafu::Snafu;

/// Upper bound for numeric suffixes before giving up on a name.
const MAX_SUFFIX: usize = 10_000;

#[derive(Debug, Snafu)]
#[snafu(display("failed to find a unique name for {base:?}"))]
pub struct UniqueNameCollision {
    pub base: String,
}

/// The names already taken within a workload: unique names of child
/// resources and the create and mutate functions derived from them.
#[derive(Clone, Debug, Default)]
pub struct NameRegistry {
    names: IndexSet<String>,
}

impl NameRegistry {
    /// Claims the first of `base`, `base2`, `base3`, ... for which neither the
    /// name itself nor one of its function names is taken yet.
    pub fn claim_unique_name(&mut self, base: &str) -> Result<String, UniqueNameCollision> {
        for suffix in 1..=MAX_SUFFIX {
            let candidate = if suffix == 1 {
                base.to_owned()
            } else {
                format!("{base}{suffix}")
            };

            let claimed = [
                candidate.clone(),
                create_func(&candidate),
                mutate_func(&candidate),
            ];
            if claimed.iter().any(|name| self.names.contains(name)) {
                continue;
            }

            self.names.extend(claimed);
            return Ok(candidate);
        }

        UniqueNameCollisionSnafu { base }.fail()
    }
}

pub fn create_func(unique_name: &str) -> String {
    format!("Create{unique_name}")
}

pub fn mutate_func(unique_name: &str) -> String {
    format!("Mutate{unique_name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffixes_repeated_names() {
        let mut registry = NameRegistry::default();

        let names: Vec<_> = (0..3)
            .map(|_| {
                registry
                    .claim_unique_name("ConfigMapDefaultSettings")
                    .expect("name must be claimed")
            })
            .collect();

        assert_eq!(
            names,
            [
                "ConfigMapDefaultSettings",
                "ConfigMapDefaultSettings2",
                "ConfigMapDefaultSettings3"
            ]
        );
    }

    #[test]
    fn function_names_block_unique_names() {
        let mut registry = NameRegistry::default();

        // "Create" + "X" collides with the function name of "X"
        registry.claim_unique_name("X").expect("name must be claimed");
        let name = registry
            .claim_unique_name("CreateX")
            .expect("name must be claimed");

        assert_eq!(name, "CreateX2");
    }
}
