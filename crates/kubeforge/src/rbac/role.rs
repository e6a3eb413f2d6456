use k8s_openapi::api::rbac::v1::PolicyRule;
use serde::Deserialize;
use serde_json::Value;
use snafu::{ResultExt, Snafu};
use tracing::debug;

use super::Rule;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to decode the rules of the role"))]
    DecodePolicyRules { source: serde_json::Error },
}

/// Expands the rules declared by a `Role` or `ClusterRole` object. Every
/// combination of API group and resource becomes a resource rule, URLs
/// become non-resource rules. Rules declaring neither are skipped.
pub fn role_rules(object: &Value) -> Result<Vec<Rule>, Error> {
    let policy_rules = match object.get("rules") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(rules) => Vec::<PolicyRule>::deserialize(rules).context(DecodePolicyRulesSnafu)?,
    };

    let mut rules = Vec::new();
    for policy_rule in policy_rules {
        let groups = policy_rule.api_groups.unwrap_or_default();
        let resources = policy_rule.resources.unwrap_or_default();
        let urls = policy_rule.non_resource_urls.unwrap_or_default();

        if !groups.is_empty() && !resources.is_empty() {
            for group in &groups {
                for resource in &resources {
                    rules.push(Rule::Resource {
                        group: group.clone(),
                        resource: resource.clone(),
                        verbs: policy_rule.verbs.clone(),
                    });
                }
            }
        } else if !urls.is_empty() {
            rules.push(Rule::NonResource {
                urls,
                verbs: policy_rule.verbs,
            });
        } else {
            debug!(
                verbs = ?policy_rule.verbs,
                "skipping role rule without resources or non-resource URLs"
            );
        }
    }

    Ok(rules)
}
