use serde_json::Value;
use snafu::ResultExt;

use super::{CodeGenerator, ConvertFlowSnafu, Error, GeneratedCode, VariableTypes};
use crate::{
    api::FieldType,
    marker::{Guard, Literal},
    yaml::{END_MARK, Node, START_MARK, Scalar, node_to_json},
};

/// Generates Go code building `unstructured.Unstructured` objects.
#[derive(Clone, Copy, Debug, Default)]
pub struct GoGenerator;

impl CodeGenerator for GoGenerator {
    fn generate(&self, root: &Node, variables: &VariableTypes) -> Result<GeneratedCode, Error> {
        let mut writer = Writer {
            out: String::new(),
            variables,
            use_string_conv: false,
        };

        writer.out.push_str("var resourceObj = &unstructured.Unstructured{\n\tObject: ");
        writer.write_node(root, 1)?;
        writer.out.push_str(",\n}\n");

        Ok(GeneratedCode {
            body: writer.out,
            use_string_conv: writer.use_string_conv,
        })
    }

    fn resource_guard(&self, guard: &Guard) -> String {
        let condition = match &guard.expected {
            Literal::Bool(true) => format!("!{}", guard.reference),
            Literal::Bool(false) => guard.reference.clone(),
            expected => format!("{} != {expected}", guard.reference),
        };

        format!("if {condition} {{\n\treturn []client.Object{{}}, nil\n}}\n")
    }
}

struct Writer<'a> {
    out: String,
    variables: &'a VariableTypes,
    use_string_conv: bool,
}

impl Writer<'_> {
    fn indent(&mut self, depth: usize) {
        self.out.push_str(&"\t".repeat(depth));
    }

    /// Writes the expression for a node whose first line is already
    /// indented to `depth`.
    fn write_node(&mut self, node: &Node, depth: usize) -> Result<(), Error> {
        match node {
            Node::Mapping(mapping) if mapping.entries.is_empty() => {
                self.out.push_str("map[string]interface{}{}");
            }
            Node::Mapping(mapping) => {
                self.out.push_str("map[string]interface{}{\n");
                for entry in &mapping.entries {
                    self.indent(depth + 1);
                    self.out.push_str(&go_string(&entry.key.text));
                    self.out.push_str(": ");
                    self.write_node(&entry.value, depth + 1)?;
                    self.out.push_str(",\n");
                }
                self.indent(depth);
                self.out.push('}');
            }
            Node::Sequence(sequence) if sequence.items.is_empty() => {
                self.out.push_str("[]interface{}{}");
            }
            Node::Sequence(sequence) => {
                self.out.push_str("[]interface{}{\n");
                for item in &sequence.items {
                    self.indent(depth + 1);
                    self.write_node(&item.value, depth + 1)?;
                    self.out.push_str(",\n");
                }
                self.indent(depth);
                self.out.push('}');
            }
            Node::Scalar(scalar) => self.write_scalar(scalar, depth)?,
        }

        Ok(())
    }

    fn write_scalar(&mut self, scalar: &Scalar, depth: usize) -> Result<(), Error> {
        if scalar.is_var() {
            let expression = self.reference_expression(&scalar.text);
            self.out.push_str(&expression);
            return Ok(());
        }

        // flow collections may span several lines in the generated code
        let value = node_to_json(&Node::Scalar(scalar.clone())).context(ConvertFlowSnafu)?;
        self.write_json(&value, depth);
        Ok(())
    }

    fn write_json(&mut self, value: &Value, depth: usize) {
        match value {
            Value::Null => self.out.push_str("nil"),
            Value::Bool(bool) => self.out.push_str(&bool.to_string()),
            Value::Number(number) => self.out.push_str(&number.to_string()),
            Value::String(string) => self.out.push_str(&go_string(string)),
            Value::Array(items) if items.is_empty() => self.out.push_str("[]interface{}{}"),
            Value::Array(items) => {
                self.out.push_str("[]interface{}{\n");
                for item in items {
                    self.indent(depth + 1);
                    self.write_json(item, depth + 1);
                    self.out.push_str(",\n");
                }
                self.indent(depth);
                self.out.push('}');
            }
            Value::Object(object) if object.is_empty() => {
                self.out.push_str("map[string]interface{}{}");
            }
            Value::Object(object) => {
                self.out.push_str("map[string]interface{}{\n");
                for (key, value) in object {
                    self.indent(depth + 1);
                    self.out.push_str(&go_string(key));
                    self.out.push_str(": ");
                    self.write_json(value, depth + 1);
                    self.out.push_str(",\n");
                }
                self.indent(depth);
                self.out.push('}');
            }
        }
    }

    /// Turns the payload of a variable scalar into an expression. Payloads
    /// with spliced references become string concatenations.
    fn reference_expression(&mut self, payload: &str) -> String {
        if !payload.contains(START_MARK) {
            return payload.trim().to_owned();
        }

        let mut parts = Vec::new();
        let mut rest = payload;

        while let Some(start) = rest.find(START_MARK) {
            let literal = &rest[..start];
            if !literal.is_empty() {
                parts.push(go_string(literal));
            }

            let after_start = &rest[start + START_MARK.len()..];
            let Some(end) = after_start.find(END_MARK) else {
                rest = after_start;
                break;
            };

            let reference = after_start[..end].trim();
            parts.push(self.string_conversion(reference));
            rest = &after_start[end + END_MARK.len()..];
        }

        if !rest.is_empty() {
            parts.push(go_string(rest));
        }

        if parts.is_empty() {
            return "\"\"".to_owned();
        }
        parts.join(" + ")
    }

    fn string_conversion(&mut self, reference: &str) -> String {
        match self.variables.get(reference) {
            Some(FieldType::Int) => {
                self.use_string_conv = true;
                format!("strconv.Itoa({reference})")
            }
            Some(FieldType::Bool) => {
                self.use_string_conv = true;
                format!("strconv.FormatBool({reference})")
            }
            _ => reference.to_owned(),
        }
    }
}

/// Quotes a string as Go interpreted string literal.
fn go_string(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');

    for c in text.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            '\r' => quoted.push_str("\\r"),
            c if c.is_control() => quoted.push_str(&format!("\\u{:04x}", u32::from(c))),
            c => quoted.push(c),
        }
    }

    quoted.push('"');
    quoted
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;
    use crate::yaml::parse_documents;

    fn generate(input: &str, variables: &[(&str, FieldType)]) -> GeneratedCode {
        let documents = parse_documents(input).expect("input must parse");
        let root = documents[0].root.as_ref().expect("document must have a root");
        let variables: VariableTypes = variables
            .iter()
            .map(|(reference, field_type)| ((*reference).to_owned(), *field_type))
            .collect();

        GoGenerator
            .generate(root, &variables)
            .expect("code must generate")
    }

    #[test]
    fn generates_unstructured_objects() {
        let code = generate(
            indoc! {r#"
                apiVersion: apps/v1
                kind: Deployment
                metadata:
                  name: web
                  labels: {}
                spec:
                  replicas: !!var parent.Spec.Replicas
                  paused: false
                  template:
                    spec:
                      containers:
                        - name: web
                          args: ["--port", "80"]
            "#},
            &[("parent.Spec.Replicas", FieldType::Int)],
        );

        assert_eq!(
            code.body,
            indoc! {r#"
                var resourceObj = &unstructured.Unstructured{
                	Object: map[string]interface{}{
                		"apiVersion": "apps/v1",
                		"kind": "Deployment",
                		"metadata": map[string]interface{}{
                			"name": "web",
                			"labels": map[string]interface{}{},
                		},
                		"spec": map[string]interface{}{
                			"replicas": parent.Spec.Replicas,
                			"paused": false,
                			"template": map[string]interface{}{
                				"spec": map[string]interface{}{
                					"containers": []interface{}{
                						map[string]interface{}{
                							"name": "web",
                							"args": []interface{}{
                								"--port",
                								"80",
                							},
                						},
                					},
                				},
                			},
                		},
                	},
                }
            "#}
        );
        assert!(!code.use_string_conv);
    }

    #[test]
    fn keeps_key_order_of_flow_mappings() {
        let code = generate("labels: {zone: b, app: web}\n", &[]);

        assert!(code.body.contains(concat!(
            "\t\t\"labels\": map[string]interface{}{\n",
            "\t\t\t\"zone\": \"b\",\n",
            "\t\t\t\"app\": \"web\",\n",
            "\t\t},\n",
        )));
    }

    #[test]
    fn splices_references_into_strings() {
        let code = generate(
            indoc! {r#"
                image: !!var nginx:!!start parent.Spec.Tag !!end
                port: !!var "!!start parent.Spec.Port !!end/TCP"
                enabled: !!var "on-!!start collection.Spec.Enabled !!end"
            "#},
            &[
                ("parent.Spec.Tag", FieldType::String),
                ("parent.Spec.Port", FieldType::Int),
                ("collection.Spec.Enabled", FieldType::Bool),
            ],
        );

        assert!(
            code.body
                .contains("\"image\": \"nginx:\" + parent.Spec.Tag,\n")
        );
        assert!(
            code.body
                .contains("\"port\": strconv.Itoa(parent.Spec.Port) + \"/TCP\",\n")
        );
        assert!(
            code.body
                .contains("\"enabled\": \"on-\" + strconv.FormatBool(collection.Spec.Enabled),\n")
        );
        assert!(code.use_string_conv);
    }

    #[test]
    fn generates_resource_guards() {
        let value = Guard {
            reference: "parent.Spec.Provider".to_owned(),
            field_type: FieldType::String,
            expected: Literal::String("aws".to_owned()),
        };
        assert_eq!(
            GoGenerator.resource_guard(&value),
            "if parent.Spec.Provider != \"aws\" {\n\treturn []client.Object{}, nil\n}\n"
        );

        let include = Guard {
            reference: "collection.Spec.Deploy".to_owned(),
            field_type: FieldType::Bool,
            expected: Literal::Bool(true),
        };
        assert_eq!(
            GoGenerator.resource_guard(&include),
            "if !collection.Spec.Deploy {\n\treturn []client.Object{}, nil\n}\n"
        );
    }

    #[test]
    fn quotes_go_strings() {
        assert_eq!(go_string("say \"hi\"\n"), r#""say \"hi\"\n""#);
    }
}
