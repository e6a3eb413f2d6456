use std::sync::LazyLock;

use regex::Regex;

use super::VAR_TAG;

static INT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[-+]?(?:[0-9]+|0x[0-9a-fA-F]+|0o[0-7]+)$").expect("failed to compile integer regex")
});

static FLOAT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[-+]?(?:\.[0-9]+|[0-9]+(?:\.[0-9]*)?)(?:[eE][-+]?[0-9]+)?$")
        .expect("failed to compile float regex")
});

/// How the trailing line breaks of a block scalar are treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Chomping {
    /// Keep a single trailing line break (no indicator).
    #[default]
    Clip,

    /// Remove all trailing line breaks (`-`).
    Strip,

    /// Keep all trailing line breaks (`+`).
    Keep,
}

impl Chomping {
    pub(super) fn indicator(self) -> &'static str {
        match self {
            Self::Clip => "",
            Self::Strip => "-",
            Self::Keep => "+",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScalarStyle {
    #[default]
    Plain,
    SingleQuoted,
    DoubleQuoted,

    /// A `|` block scalar. The text holds the content lines joined by `\n`
    /// with the block indentation removed.
    Literal(Chomping),

    /// A `>` block scalar, stored like [`ScalarStyle::Literal`].
    Folded(Chomping),

    /// A flow collection (`[a, b]` or `{a: b}`), kept verbatim.
    Flow,
}

/// A scalar value together with the style it was written in.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Scalar {
    pub text: String,
    pub style: ScalarStyle,
    pub tag: Option<String>,
    pub line: usize,
}

/// The type a plain scalar resolves to under the YAML 1.2 core schema.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolved {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Scalar {
    pub fn plain(text: impl Into<String>, line: usize) -> Self {
        Self {
            text: text.into(),
            style: ScalarStyle::Plain,
            tag: None,
            line,
        }
    }

    /// Creates a scalar tagged as variable reference. Payloads which cannot be
    /// written as plain scalars (e.g. references spliced into a larger
    /// string) are double-quoted.
    pub fn var(payload: impl Into<String>, line: usize) -> Self {
        let text = payload.into();
        let style = if is_plain_safe(&text) {
            ScalarStyle::Plain
        } else {
            ScalarStyle::DoubleQuoted
        };

        Self {
            text,
            style,
            tag: Some(VAR_TAG.to_owned()),
            line,
        }
    }

    /// Returns `true` if the scalar was rewritten into a variable reference.
    pub fn is_var(&self) -> bool {
        self.tag.as_deref() == Some(VAR_TAG)
    }

    /// The string value of the scalar, with block scalars folded and chomped
    /// according to their header.
    pub fn value(&self) -> String {
        match self.style {
            ScalarStyle::Literal(chomping) => chomp(self.text.clone(), chomping),
            ScalarStyle::Folded(chomping) => chomp(fold(&self.text), chomping),
            _ => self.text.clone(),
        }
    }

    /// Resolves the scalar into a typed value. Quoted and block scalars are
    /// always strings, plain scalars follow the core schema unless a tag
    /// says otherwise.
    pub fn resolve(&self) -> Resolved {
        match self.tag.as_deref() {
            Some("!!str") | Some(VAR_TAG) => return Resolved::String(self.value()),
            Some("!!int") => {
                if let Some(int) = parse_int(&self.text) {
                    return Resolved::Int(int);
                }
            }
            _ => {}
        }

        match self.style {
            ScalarStyle::Plain => resolve_plain(&self.text),
            _ => Resolved::String(self.value()),
        }
    }
}

pub(super) fn resolve_plain(text: &str) -> Resolved {
    match text {
        "" | "~" | "null" | "Null" | "NULL" => return Resolved::Null,
        "true" | "True" | "TRUE" => return Resolved::Bool(true),
        "false" | "False" | "FALSE" => return Resolved::Bool(false),
        ".inf" | "+.inf" | ".Inf" | "+.Inf" => return Resolved::Float(f64::INFINITY),
        "-.inf" | "-.Inf" => return Resolved::Float(f64::NEG_INFINITY),
        _ => {}
    }

    if INT_REGEX.is_match(text) {
        if let Some(int) = parse_int(text) {
            return Resolved::Int(int);
        }
    }

    if FLOAT_REGEX.is_match(text) {
        if let Ok(float) = text.parse::<f64>() {
            return Resolved::Float(float);
        }
    }

    Resolved::String(text.to_owned())
}

fn parse_int(text: &str) -> Option<i64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };

    let value = if let Some(hex) = digits.strip_prefix("0x") {
        i64::from_str_radix(hex, 16).ok()?
    } else if let Some(octal) = digits.strip_prefix("0o") {
        i64::from_str_radix(octal, 8).ok()?
    } else {
        digits.parse::<i64>().ok()?
    };

    Some(if negative { -value } else { value })
}

fn chomp(mut text: String, chomping: Chomping) -> String {
    match chomping {
        Chomping::Keep => {
            text.push('\n');
            text
        }
        Chomping::Clip => {
            let trimmed = text.trim_end_matches('\n').len();
            text.truncate(trimmed);
            if !text.is_empty() {
                text.push('\n');
            }
            text
        }
        Chomping::Strip => {
            let trimmed = text.trim_end_matches('\n').len();
            text.truncate(trimmed);
            text
        }
    }
}

/// Folds the lines of a `>` block scalar: adjacent lines are joined with a
/// space, empty lines become line breaks and more-indented lines are kept as
/// they are.
fn fold(text: &str) -> String {
    let mut folded = String::with_capacity(text.len());
    let mut previous_was_text = false;

    for line in text.split('\n') {
        if line.is_empty() {
            folded.push('\n');
            previous_was_text = false;
        } else if line.starts_with(' ') || line.starts_with('\t') {
            if previous_was_text {
                folded.push('\n');
            }
            folded.push_str(line);
            folded.push('\n');
            previous_was_text = false;
        } else {
            if previous_was_text {
                folded.push(' ');
            }
            folded.push_str(line);
            previous_was_text = true;
        }
    }

    folded
}

/// Returns `true` if the text can be written as a plain scalar without
/// changing its meaning.
fn is_plain_safe(text: &str) -> bool {
    if text.is_empty() || text.contains('\n') || text != text.trim() {
        return false;
    }

    let first = text.chars().next().unwrap_or(' ');
    if "-?:,[]{}#&*!|>'\"%@`".contains(first) {
        // A leading dash is fine as long as it is not an indicator.
        if !(first == '-' && text.len() > 1 && !text.starts_with("- ")) {
            return false;
        }
    }

    !(text.contains(": ") || text.contains(" #") || text.ends_with(':'))
        && matches!(resolve_plain(text), Resolved::String(_))
}

/// Writes the text as a double-quoted YAML scalar.
pub(super) fn double_quote(text: &str) -> String {
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

/// Unescapes the body of a double-quoted scalar (without the quotes).
pub(super) fn unescape_double(body: &str) -> Option<String> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '0' => out.push('\0'),
            ' ' => out.push(' '),
            '/' => out.push('/'),
            '"' => out.push('"'),
            '\\' => out.push('\\'),
            'x' => out.push(hex_char(&mut chars, 2)?),
            'u' => out.push(hex_char(&mut chars, 4)?),
            'U' => out.push(hex_char(&mut chars, 8)?),
            _ => return None,
        }
    }

    Some(out)
}

fn hex_char(chars: &mut std::str::Chars<'_>, len: usize) -> Option<char> {
    let digits: String = chars.by_ref().take(len).collect();
    if digits.len() != len {
        return None;
    }
    char::from_u32(u32::from_str_radix(&digits, 16).ok()?)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("2", Resolved::Int(2))]
    #[case("-17", Resolved::Int(-17))]
    #[case("0x1f", Resolved::Int(31))]
    #[case("1.5", Resolved::Float(1.5))]
    #[case("true", Resolved::Bool(true))]
    #[case("~", Resolved::Null)]
    #[case("nginx:1.17", Resolved::String("nginx:1.17".into()))]
    #[case("v1", Resolved::String("v1".into()))]
    fn resolve_plain_scalars(#[case] input: &str, #[case] expected: Resolved) {
        assert_eq!(resolve_plain(input), expected);
    }

    #[rstest]
    #[case("line one\nline two\n\n", Chomping::Clip, "line one\nline two\n")]
    #[case("line one\nline two\n\n", Chomping::Strip, "line one\nline two")]
    #[case("line one\nline two", Chomping::Keep, "line one\nline two\n")]
    fn literal_chomping(#[case] text: &str, #[case] chomping: Chomping, #[case] expected: &str) {
        let scalar = Scalar {
            text: text.to_owned(),
            style: ScalarStyle::Literal(chomping),
            ..Scalar::default()
        };
        assert_eq!(scalar.value(), expected);
    }

    #[test]
    fn folded_scalar_joins_lines() {
        let scalar = Scalar {
            text: "a\nb\n\nc".to_owned(),
            style: ScalarStyle::Folded(Chomping::Strip),
            ..Scalar::default()
        };
        assert_eq!(scalar.value(), "a b\nc");
    }

    #[rstest]
    #[case("nginx", true)]
    #[case("parent.Spec.Replicas", true)]
    #[case("-leading-dash", true)]
    #[case("2", false)]
    #[case("true", false)]
    #[case("a: b", false)]
    #[case("# comment", false)]
    #[case("", false)]
    fn plain_safety(#[case] text: &str, #[case] expected: bool) {
        assert_eq!(is_plain_safe(text), expected);
    }

    #[test]
    fn double_quote_roundtrip() {
        let text = "say \"hi\"\n\tand \\ leave";
        let quoted = double_quote(text);
        let body = &quoted[1..quoted.len() - 1];
        assert_eq!(unescape_double(body).as_deref(), Some(text));
    }
}
