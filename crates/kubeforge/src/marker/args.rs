//! Parsing of the `key=value` argument list which follows a marker prefix.

use indexmap::IndexMap;
use snafu::{OptionExt, Snafu, ensure};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum Error {
    #[snafu(display("argument {argument:?} has no name"))]
    EmptyName { argument: String },

    #[snafu(display("argument {name:?} is declared more than once"))]
    DuplicateArgument { name: String },

    #[snafu(display("unterminated quoted value for argument {name:?}"))]
    UnterminatedValue { name: String },

    #[snafu(display("invalid escape sequence in value of argument {name:?}"))]
    InvalidEscape { name: String },
}

/// The arguments of a single marker, in declaration order. Flags without a
/// value are stored as `"true"`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Arguments {
    values: IndexMap<String, String>,
}

impl Arguments {
    pub fn parse(input: &str) -> Result<Self> {
        let mut values = IndexMap::new();

        for raw in split_arguments(input) {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }

            let (name, value) = match raw.split_once('=') {
                Some((name, value)) => (name.trim(), parse_value(name.trim(), value.trim())?),
                None => (raw, "true".to_owned()),
            };

            ensure!(!name.is_empty(), EmptyNameSnafu { argument: raw });
            ensure!(
                !values.contains_key(name),
                DuplicateArgumentSnafu { name }
            );
            values.insert(name.to_owned(), value);
        }

        Ok(Self { values })
    }

    /// Removes and returns the argument with the given name.
    pub fn take(&mut self, name: &str) -> Option<String> {
        self.values.shift_remove(name)
    }

    /// Removes the first argument found under any of the given names.
    pub fn take_any(&mut self, names: &[&str]) -> Option<String> {
        names.iter().find_map(|name| self.take(name))
    }

    /// Names of the arguments which have not been taken yet.
    pub fn remaining(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }
}

/// Splits the input on commas which are not part of a quoted value.
fn split_arguments(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;

    for (index, c) in input.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                parts.push(&input[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }

    parts.push(&input[start..]);
    parts
}

fn parse_value(name: &str, value: &str) -> Result<String> {
    let Some(quoted) = value.strip_prefix('"') else {
        return Ok(value.to_owned());
    };
    let body = quoted
        .strip_suffix('"')
        .context(UnterminatedValueSnafu { name })?;

    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        match chars.next().context(InvalidEscapeSnafu { name })? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            '"' => out.push('"'),
            '\\' => out.push('\\'),
            other => {
                // Regular expressions rely on backslash classes like `\d`.
                out.push('\\');
                out.push(other);
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn parses_bare_quoted_and_flag_arguments() {
        let mut args =
            Arguments::parse(r#"name=image.tag,type=string,default="v1, or v2",arbitrary"#)
                .expect("arguments must parse");

        assert_eq!(args.take("name").as_deref(), Some("image.tag"));
        assert_eq!(args.take("type").as_deref(), Some("string"));
        assert_eq!(args.take("default").as_deref(), Some("v1, or v2"));
        assert_eq!(args.take("arbitrary").as_deref(), Some("true"));
        assert!(args.remaining().is_empty());
    }

    #[test]
    fn keeps_regex_escapes() {
        let mut args = Arguments::parse(r#"replace="nginx:\d+\.\d+",description="say \"hi\"""#)
            .expect("arguments must parse");

        assert_eq!(args.take("replace").as_deref(), Some(r"nginx:\d+\.\d+"));
        assert_eq!(args.take("description").as_deref(), Some(r#"say "hi""#));
    }

    #[rstest]
    #[case("name=a,name=b", Error::DuplicateArgument { name: "name".into() })]
    #[case(r#"name="a"#, Error::UnterminatedValue { name: "name".into() })]
    #[case("=a", Error::EmptyName { argument: "=a".into() })]
    fn rejects_malformed_arguments(#[case] input: &str, #[case] expected: Error) {
        assert_eq!(Arguments::parse(input), Err(expected));
    }

    #[test]
    fn take_removes_arguments() {
        let mut args = Arguments::parse("field=provider,value=aws").expect("arguments must parse");

        assert_eq!(args.take("field").as_deref(), Some("provider"));
        assert_eq!(args.remaining(), vec!["value".to_owned()]);
    }
}
