/// Kinds whose resource name does not follow the regular rules.
const IRREGULAR: &[(&str, &str)] = &[
    ("endpoints", "endpoints"),
    ("securitycontextconstraints", "securitycontextconstraints"),
    ("podmetrics", "pods"),
    ("nodemetrics", "nodes"),
    ("person", "people"),
    ("chassis", "chassis"),
];

/// Returns the plural resource name of a kind, e.g. `deployments` for
/// `Deployment` and `networkpolicies` for `NetworkPolicy`.
pub fn plural(kind: &str) -> String {
    let singular = kind.to_lowercase();

    if let Some((_, plural)) = IRREGULAR.iter().find(|(kind, _)| *kind == singular) {
        return (*plural).to_owned();
    }

    if ["s", "x", "z", "ch", "sh"]
        .iter()
        .any(|suffix| singular.ends_with(suffix))
    {
        return format!("{singular}es");
    }

    let consonant_y = singular.strip_suffix('y').filter(|stem| {
        stem.chars()
            .last()
            .is_some_and(|c| !matches!(c, 'a' | 'e' | 'i' | 'o' | 'u'))
    });
    if let Some(stem) = consonant_y {
        return format!("{stem}ies");
    }

    format!("{singular}s")
}
