use serde_json::{Map, Number, Value};
use snafu::{ResultExt, Snafu};

use super::{
    Node,
    scalar::{Resolved, ScalarStyle},
};

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("line {line}: failed to parse flow collection"))]
    ParseFlow {
        source: serde_yaml::Error,
        line: usize,
    },
}

/// Converts a node into an untyped JSON value, e.g. to decode it into a
/// Kubernetes object afterwards. Variable references are kept as strings
/// holding their payload.
pub fn node_to_json(node: &Node) -> Result<Value, Error> {
    match node {
        Node::Mapping(mapping) => {
            let mut object = Map::new();
            for entry in &mapping.entries {
                object.insert(entry.key.text.clone(), node_to_json(&entry.value)?);
            }
            Ok(Value::Object(object))
        }
        Node::Sequence(sequence) => sequence
            .items
            .iter()
            .map(|item| node_to_json(&item.value))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Node::Scalar(scalar) if scalar.style == ScalarStyle::Flow && scalar.tag.is_none() => {
            serde_yaml::from_str(&scalar.text).context(ParseFlowSnafu { line: scalar.line })
        }
        Node::Scalar(scalar) => Ok(match scalar.resolve() {
            Resolved::Null => Value::Null,
            Resolved::Bool(bool) => Value::Bool(bool),
            Resolved::Int(int) => Value::Number(int.into()),
            Resolved::Float(float) => {
                Number::from_f64(float).map_or_else(|| Value::String(scalar.text.clone()), Value::Number)
            }
            Resolved::String(string) => Value::String(string),
        }),
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use serde_json::json;

    use super::*;
    use crate::yaml::parse_documents;

    #[test]
    fn converts_documents_to_json() {
        let documents = parse_documents(indoc! {r#"
            apiVersion: v1
            kind: ConfigMap
            metadata:
              name: settings # comment
            data:
              replicas: !!var parent.Spec.Replicas
              flags: [a, "b"]
              enabled: "true"
              ratio: 0.5
              empty:
        "#})
        .expect("must parse");

        let root = documents[0].root.as_ref().expect("root");
        let value = node_to_json(root).expect("must convert");

        assert_eq!(
            value,
            json!({
                "apiVersion": "v1",
                "kind": "ConfigMap",
                "metadata": { "name": "settings" },
                "data": {
                    "replicas": "parent.Spec.Replicas",
                    "flags": ["a", "b"],
                    "enabled": "true",
                    "ratio": 0.5,
                    "empty": null,
                },
            })
        );
    }
}
