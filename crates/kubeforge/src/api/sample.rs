use super::ApiFields;
use crate::config::WorkloadApiSpec;

/// Renders the sample custom resource of a workload. With `required_only`
/// its `spec` only contains the fields a user has to set.
pub fn sample_document(api: &WorkloadApiSpec, spec: &ApiFields, required_only: bool) -> String {
    format!(
        "apiVersion: {api_version}\nkind: {kind}\nmetadata:\n  name: {name}\n{spec}",
        api_version = api.api_version(),
        kind = api.kind,
        name = api.sample_name(),
        spec = spec.render_sample(required_only),
    )
}
