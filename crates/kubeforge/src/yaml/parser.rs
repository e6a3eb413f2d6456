use snafu::{Snafu, ensure};

use super::{
    Document, Entry, Item, Mapping, Node, Sequence,
    scalar::{Chomping, Scalar, ScalarStyle, unescape_double},
};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum Error {
    #[snafu(display("line {line}: unexpected indentation"))]
    UnexpectedIndentation { line: usize },

    #[snafu(display("line {line}: expected a mapping key"))]
    ExpectedKey { line: usize },

    #[snafu(display("line {line}: duplicate mapping key {key:?}"))]
    DuplicateKey { line: usize, key: String },

    #[snafu(display("line {line}: unterminated quoted scalar"))]
    UnterminatedQuote { line: usize },

    #[snafu(display("line {line}: invalid escape sequence in double-quoted scalar"))]
    InvalidEscape { line: usize },

    #[snafu(display("line {line}: unterminated flow collection"))]
    UnterminatedFlow { line: usize },

    #[snafu(display("line {line}: anchors and aliases are not supported"))]
    AnchorsUnsupported { line: usize },

    #[snafu(display("line {line}: complex mapping keys are not supported"))]
    ComplexKey { line: usize },
}

/// Splits the input into documents on lines which are exactly `---` once
/// trailing whitespace is removed. Returns the 1-based line number each
/// document starts at along with its text.
pub fn split_documents(input: &str) -> Vec<(usize, String)> {
    let mut documents = Vec::new();
    let mut start = 1;
    let mut current = String::new();

    for (index, line) in input.lines().enumerate() {
        if line.trim_end() == "---" {
            documents.push((start, std::mem::take(&mut current)));
            start = index + 2;
            continue;
        }

        current.push_str(line);
        current.push('\n');
    }

    documents.push((start, current));
    documents
}

/// Parses every document of the input. Documents which only consist of
/// comments or whitespace are returned without a root node.
pub fn parse_documents(input: &str) -> Result<Vec<Document>> {
    split_documents(input)
        .into_iter()
        .map(|(start, text)| Parser::new(start, &text).parse_document())
        .collect()
}

#[derive(Clone, Debug)]
struct Line {
    number: usize,
    raw: String,
    indent: usize,
    content: String,
    comment: Option<String>,
}

impl Line {
    fn new(number: usize, raw: &str) -> Self {
        let raw = raw.trim_end_matches('\r');
        let indent = raw.len() - raw.trim_start_matches(' ').len();
        let (content, comment) = split_comment(&raw[indent..]);

        Self {
            number,
            raw: raw.to_owned(),
            indent,
            content: content.trim().to_owned(),
            comment,
        }
    }

    fn is_blank(&self) -> bool {
        self.content.is_empty() && self.comment.is_none()
    }

    fn is_comment(&self) -> bool {
        self.content.is_empty() && self.comment.is_some()
    }

    fn is_content(&self) -> bool {
        !self.content.is_empty()
    }

    fn is_dash(&self) -> bool {
        self.content == "-" || self.content.starts_with("- ")
    }
}

/// Splits a line (without indentation) into its content and the trailing
/// comment, if any. A `#` only starts a comment at the beginning of the line
/// or after whitespace, and never inside quotes.
fn split_comment(line: &str) -> (&str, Option<String>) {
    let mut in_single = false;
    let mut in_double = false;
    let mut previous: Option<char> = None;
    let mut chars = line.char_indices().peekable();

    while let Some((index, c)) = chars.next() {
        if in_double {
            match c {
                '\\' => {
                    chars.next();
                }
                '"' => in_double = false,
                _ => {}
            }
        } else if in_single {
            if c == '\'' {
                if chars.peek().is_some_and(|(_, next)| *next == '\'') {
                    chars.next();
                } else {
                    in_single = false;
                }
            }
        } else {
            let quote_allowed = previous.is_none_or(|p| matches!(p, ' ' | '\t' | '[' | '{' | ','));
            match c {
                '#' if previous.is_none_or(char::is_whitespace) => {
                    return (&line[..index], Some(line[index + 1..].to_owned()));
                }
                '"' if quote_allowed => in_double = true,
                '\'' if quote_allowed => in_single = true,
                _ => {}
            }
        }

        previous = Some(c);
    }

    (line, None)
}

/// Returns the byte index of the quote closing the quoted scalar which
/// starts at index 0 of `text`.
fn closing_quote(text: &str) -> Option<usize> {
    let mut chars = text.char_indices().skip(1).peekable();

    match text.chars().next()? {
        '"' => {
            while let Some((index, c)) = chars.next() {
                match c {
                    '\\' => {
                        chars.next();
                    }
                    '"' => return Some(index),
                    _ => {}
                }
            }
            None
        }
        '\'' => {
            while let Some((index, c)) = chars.next() {
                if c == '\'' {
                    if chars.peek().is_some_and(|(_, next)| *next == '\'') {
                        chars.next();
                    } else {
                        return Some(index);
                    }
                }
            }
            None
        }
        _ => None,
    }
}

/// Decodes a complete quoted scalar (including quotes) into its value.
fn unquote(text: &str, line: usize) -> Result<(String, ScalarStyle)> {
    let body = &text[1..text.len() - 1];

    if text.starts_with('"') {
        let value = unescape_double(body).ok_or(Error::InvalidEscape { line })?;
        Ok((value, ScalarStyle::DoubleQuoted))
    } else {
        Ok((body.replace("''", "'"), ScalarStyle::SingleQuoted))
    }
}

/// Splits a line of content into a mapping key and the remaining value text.
/// Returns [`None`] if the content is not a `key: value` pair.
fn split_key(content: &str, line: usize) -> Result<Option<(Scalar, &str)>> {
    if content.starts_with('[') || content.starts_with('{') {
        return Ok(None);
    }
    ensure!(!content.starts_with("? "), ComplexKeySnafu { line });

    if content.starts_with('"') || content.starts_with('\'') {
        let Some(close) = closing_quote(content) else {
            return Ok(None);
        };
        let after = content[close + 1..].trim_start();
        let Some(rest) = after.strip_prefix(':') else {
            return Ok(None);
        };
        if !(rest.is_empty() || rest.starts_with(' ')) {
            return Ok(None);
        }

        let (text, style) = unquote(&content[..=close], line)?;
        let key = Scalar {
            text,
            style,
            tag: None,
            line,
        };
        return Ok(Some((key, rest)));
    }

    let bytes = content.as_bytes();
    for (index, byte) in bytes.iter().enumerate() {
        if *byte == b':' && (index + 1 == bytes.len() || bytes[index + 1] == b' ') {
            let key = content[..index].trim_end();
            if key.is_empty() {
                return Ok(None);
            }
            return Ok(Some((Scalar::plain(key, line), &content[index + 1..])));
        }
    }

    Ok(None)
}

struct Parser {
    start: usize,
    lines: Vec<Line>,
    pos: usize,
}

impl Parser {
    fn new(start: usize, text: &str) -> Self {
        let lines = text
            .lines()
            .enumerate()
            .map(|(index, raw)| Line::new(start + index, raw))
            .collect();

        Self {
            start,
            lines,
            pos: 0,
        }
    }

    fn parse_document(mut self) -> Result<Document> {
        let mut document = Document {
            line: self.start,
            ..Document::default()
        };

        let Some(first) = self.peek_content() else {
            document.head_comments = self.take_comments_until(self.lines.len());
            return Ok(document);
        };

        let first_line = &self.lines[first];
        let indent = first_line.indent;
        let is_collection =
            first_line.is_dash() || split_key(&first_line.content, first_line.number)?.is_some();

        if !is_collection {
            document.head_comments = self.take_comments_until(first);
        }

        document.root = Some(self.parse_block(indent)?);
        document.foot_comments = self.take_comments_until(self.lines.len());

        if let Some(line) = self.lines[self.pos..].iter().find(|l| l.is_content()) {
            return UnexpectedIndentationSnafu { line: line.number }.fail();
        }

        Ok(document)
    }

    /// Returns the index of the next line with content, skipping blank and
    /// comment-only lines.
    fn peek_content(&self) -> Option<usize> {
        (self.pos..self.lines.len()).find(|&index| self.lines[index].is_content())
    }

    /// Consumes all blank and comment-only lines up to `end` and returns the
    /// comments.
    fn take_comments_until(&mut self, end: usize) -> Vec<String> {
        let mut comments = Vec::new();

        while self.pos < end && self.pos < self.lines.len() && !self.lines[self.pos].is_content() {
            if let Some(comment) = &self.lines[self.pos].comment {
                comments.push(comment.clone());
            }
            self.pos += 1;
        }

        comments
    }

    /// Consumes trailing comments which are indented at least as deep as the
    /// block that just ended.
    fn take_foot_comments(&mut self, indent: usize) -> Vec<String> {
        let mut comments = Vec::new();
        let mut cursor = self.pos;

        while cursor < self.lines.len() {
            let line = &self.lines[cursor];
            if line.is_blank() {
                cursor += 1;
            } else if line.is_comment() && line.indent >= indent {
                comments.push(line.comment.clone().unwrap_or_default());
                cursor += 1;
                self.pos = cursor;
            } else {
                break;
            }
        }

        comments
    }

    fn parse_block(&mut self, indent: usize) -> Result<Node> {
        let Some(next) = self.peek_content() else {
            return Ok(Node::Scalar(Scalar::default()));
        };
        let line = self.lines[next].clone();

        if line.is_dash() {
            return Ok(Node::Sequence(self.parse_sequence(indent)?));
        }
        if split_key(&line.content, line.number)?.is_some() {
            return Ok(Node::Mapping(self.parse_mapping(indent)?));
        }

        self.take_comments_until(next);
        self.pos = next + 1;
        let (node, _) = self.parse_inline(&line.content, &line, indent)?;
        Ok(node)
    }

    fn parse_mapping(&mut self, indent: usize) -> Result<Mapping> {
        let mut mapping = Mapping::default();

        while let Some(next) = self.peek_content() {
            let line = &self.lines[next];
            if line.indent < indent || (line.indent == indent && line.is_dash()) {
                break;
            }
            ensure!(
                line.indent == indent,
                UnexpectedIndentationSnafu { line: line.number }
            );

            let head_comments = self.take_comments_until(next);
            let entry = self.parse_entry(indent, head_comments)?;

            if mapping.entries.iter().any(|e| e.key.text == entry.key.text) {
                return DuplicateKeySnafu {
                    line: entry.line,
                    key: entry.key.text,
                }
                .fail();
            }
            mapping.entries.push(entry);
        }

        mapping.foot_comments = self.take_foot_comments(indent);
        Ok(mapping)
    }

    fn parse_entry(&mut self, indent: usize, head_comments: Vec<String>) -> Result<Entry> {
        let line = self.lines[self.pos].clone();
        self.pos += 1;

        let Some((key, rest)) = split_key(&line.content, line.number)? else {
            return ExpectedKeySnafu { line: line.number }.fail();
        };
        let rest = rest.trim();

        let (value, trailing_comment) = if rest.is_empty() {
            (self.parse_nested(indent, line.number)?, None)
        } else {
            self.parse_inline(rest, &line, indent + 1)?
        };

        Ok(Entry {
            key,
            value,
            head_comments,
            line_comment: line.comment.or(trailing_comment),
            line: line.number,
        })
    }

    /// Parses the value of a key which has nothing after its colon. Block
    /// sequences may sit at the same indentation as their key.
    fn parse_nested(&mut self, indent: usize, key_line: usize) -> Result<Node> {
        let Some(next) = self.peek_content() else {
            return Ok(Node::Scalar(Scalar::plain("", key_line)));
        };
        let line = &self.lines[next];

        if line.indent > indent {
            let nested_indent = line.indent;
            return self.parse_block(nested_indent);
        }
        if line.indent == indent && line.is_dash() {
            return Ok(Node::Sequence(self.parse_sequence(indent)?));
        }

        Ok(Node::Scalar(Scalar::plain("", key_line)))
    }

    fn parse_sequence(&mut self, indent: usize) -> Result<Sequence> {
        let mut sequence = Sequence::default();

        while let Some(next) = self.peek_content() {
            let line = &self.lines[next];
            if line.indent < indent || (line.indent == indent && !line.is_dash()) {
                break;
            }
            ensure!(
                line.indent == indent,
                UnexpectedIndentationSnafu { line: line.number }
            );

            let head_comments = self.take_comments_until(next);
            let item = self.parse_item(indent, head_comments)?;
            sequence.items.push(item);
        }

        sequence.foot_comments = self.take_foot_comments(indent);
        Ok(sequence)
    }

    fn parse_item(&mut self, indent: usize, head_comments: Vec<String>) -> Result<Item> {
        let line = self.lines[self.pos].clone();
        let after_dash = &line.content[1..];
        let rest = after_dash.trim_start();

        if rest.is_empty() {
            self.pos += 1;
            let value = match self.peek_content() {
                Some(next) if self.lines[next].indent > indent => {
                    let nested_indent = self.lines[next].indent;
                    self.parse_block(nested_indent)?
                }
                _ => Node::Scalar(Scalar::plain("", line.number)),
            };

            return Ok(Item {
                value,
                head_comments,
                line_comment: line.comment,
                line: line.number,
            });
        }

        let is_nested_block =
            rest == "-" || rest.starts_with("- ") || split_key(rest, line.number)?.is_some();

        if is_nested_block {
            // Treat the content after the dash as a line of its own, indented
            // to where it starts, so compact mappings parse like regular ones.
            let offset = indent + 1 + (after_dash.len() - rest.len());
            let virtual_line = &mut self.lines[self.pos];
            virtual_line.indent = offset;
            virtual_line.content = rest.to_owned();

            let value = self.parse_block(offset)?;
            return Ok(Item {
                value,
                head_comments,
                line_comment: None,
                line: line.number,
            });
        }

        self.pos += 1;
        let rest = rest.to_owned();
        let (value, trailing_comment) = self.parse_inline(&rest, &line, indent + 1)?;

        Ok(Item {
            value,
            head_comments,
            line_comment: line.comment.or(trailing_comment),
            line: line.number,
        })
    }

    /// Parses a value which starts on the current line after a key or dash.
    /// Continuation lines must be indented at least `min_indent` deep. Returns
    /// the node and a comment found on the last continuation line.
    fn parse_inline(
        &mut self,
        rest: &str,
        line: &Line,
        min_indent: usize,
    ) -> Result<(Node, Option<String>)> {
        let mut rest = rest;
        let mut tag = None;

        if rest.starts_with('!') {
            let (tag_text, remainder) = rest.split_once(' ').unwrap_or((rest, ""));
            tag = Some(tag_text.to_owned());
            rest = remainder.trim_start();
        }

        ensure!(
            !rest.starts_with('&') && !rest.starts_with('*'),
            AnchorsUnsupportedSnafu { line: line.number }
        );

        let (mut scalar, trailing_comment) = match rest.chars().next() {
            Some('|' | '>') => (self.parse_block_scalar(rest, line, min_indent), None),
            Some('"' | '\'') => self.parse_quoted(rest, line)?,
            Some('[' | '{') => self.parse_flow(rest, line)?,
            _ => (self.parse_plain(rest, line, min_indent), None),
        };

        scalar.tag = tag;
        Ok((Node::Scalar(scalar), trailing_comment))
    }

    fn parse_block_scalar(&mut self, header: &str, line: &Line, min_indent: usize) -> Scalar {
        let mut chomping = Chomping::Clip;
        let mut explicit_indent = None;

        for c in header.chars().skip(1) {
            match c {
                '-' => chomping = Chomping::Strip,
                '+' => chomping = Chomping::Keep,
                digit if digit.is_ascii_digit() => {
                    explicit_indent = digit.to_digit(10).map(|d| d as usize);
                }
                _ => {}
            }
        }

        let block_indent = explicit_indent
            .map(|d| min_indent.saturating_sub(1) + d)
            .or_else(|| {
                self.lines[self.pos..]
                    .iter()
                    .find(|l| !l.raw.trim().is_empty())
                    .map(|l| l.indent)
            })
            .filter(|indent| *indent >= min_indent);

        let mut content = Vec::new();
        if let Some(block_indent) = block_indent {
            while self.pos < self.lines.len() {
                let raw = &self.lines[self.pos].raw;
                if raw.trim().is_empty() {
                    content.push(String::new());
                } else if self.lines[self.pos].indent >= block_indent {
                    content.push(raw[block_indent..].to_owned());
                } else {
                    break;
                }
                self.pos += 1;
            }
        }

        let style = if header.starts_with('|') {
            ScalarStyle::Literal(chomping)
        } else {
            ScalarStyle::Folded(chomping)
        };

        Scalar {
            text: content.join("\n"),
            style,
            tag: None,
            line: line.number,
        }
    }

    fn parse_quoted(&mut self, rest: &str, line: &Line) -> Result<(Scalar, Option<String>)> {
        let mut text = rest.to_owned();
        let mut trailing_comment = None;

        while closing_quote(&text).is_none() {
            ensure!(
                self.pos < self.lines.len(),
                UnterminatedQuoteSnafu { line: line.number }
            );

            let continuation = self.lines[self.pos].raw.trim().to_owned();
            self.pos += 1;

            if continuation.is_empty() {
                text.push('\n');
            } else if text.ends_with('\n') {
                text.push_str(&continuation);
            } else {
                text.push(' ');
                text.push_str(&continuation);
            }

            if let Some(close) = closing_quote(&text) {
                let after = text[close + 1..].trim();
                if let Some(comment) = after.strip_prefix('#') {
                    trailing_comment = Some(comment.to_owned());
                }
                text.truncate(close + 1);
            }
        }

        let close = closing_quote(&text).unwrap_or(text.len() - 1);
        let (value, style) = unquote(&text[..=close], line.number)?;

        let scalar = Scalar {
            text: value,
            style,
            tag: None,
            line: line.number,
        };
        Ok((scalar, trailing_comment))
    }

    fn parse_flow(&mut self, rest: &str, line: &Line) -> Result<(Scalar, Option<String>)> {
        let mut text = rest.to_owned();
        let mut trailing_comment = None;

        while flow_depth(&text) > 0 {
            ensure!(
                self.pos < self.lines.len(),
                UnterminatedFlowSnafu { line: line.number }
            );

            let continuation = &self.lines[self.pos];
            if continuation.is_content() {
                text.push(' ');
                text.push_str(&continuation.content);
            }
            if continuation.comment.is_some() {
                trailing_comment.clone_from(&continuation.comment);
            }
            self.pos += 1;
        }

        let scalar = Scalar {
            text,
            style: ScalarStyle::Flow,
            tag: None,
            line: line.number,
        };
        Ok((scalar, trailing_comment))
    }

    fn parse_plain(&mut self, rest: &str, line: &Line, min_indent: usize) -> Scalar {
        let mut text = rest.to_owned();
        let mut pending_breaks = 0;
        let mut cursor = self.pos;

        while cursor < self.lines.len() {
            let next = &self.lines[cursor];
            if next.is_blank() {
                pending_breaks += 1;
                cursor += 1;
                continue;
            }
            if !next.is_content() || next.indent < min_indent {
                break;
            }

            if pending_breaks == 0 {
                text.push(' ');
            } else {
                text.push_str(&"\n".repeat(pending_breaks));
            }
            text.push_str(&next.content);
            pending_breaks = 0;
            cursor += 1;
            self.pos = cursor;
        }

        Scalar::plain(text, line.number)
    }
}

/// Returns how many flow collections are still open at the end of `text`.
fn flow_depth(text: &str) -> i32 {
    let mut depth = 0;
    let mut in_single = false;
    let mut in_double = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if in_double => {
                chars.next();
            }
            '"' if !in_single => in_double = !in_double,
            '\'' if !in_double => in_single = !in_single,
            '[' | '{' if !in_single && !in_double => depth += 1,
            ']' | '}' if !in_single && !in_double => depth -= 1,
            _ => {}
        }
    }

    depth
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use rstest::rstest;

    use super::*;

    fn parse_single(input: &str) -> Document {
        let mut documents = parse_documents(input).expect("input must parse");
        assert_eq!(documents.len(), 1);
        documents.remove(0)
    }

    fn scalar_at<'a>(document: &'a Document, path: &[&str]) -> &'a Scalar {
        document
            .get(path)
            .and_then(Node::as_scalar)
            .expect("path must point to a scalar")
    }

    #[test]
    fn splits_documents_on_separator_lines() {
        let input = "a: 1\n---\nb: 2\n---  \nc: 3\n";
        let documents = split_documents(input);

        assert_eq!(documents.len(), 3);
        assert_eq!(documents[1], (3, "b: 2\n".to_owned()));
        assert_eq!(documents[2].0, 5);
    }

    #[test]
    fn parses_nested_mappings_with_comments() {
        let document = parse_single(indoc! {"
            # leading comment
            apiVersion: apps/v1
            kind: Deployment
            spec:
              # +operator-builder:field:name=replicas,type=int
              replicas: 2 # trailing
              paused: false
        "});

        let root = document.root.as_ref().and_then(Node::as_mapping).expect("root mapping");
        assert_eq!(root.entries[0].head_comments, vec![" leading comment"]);

        let spec = root.get("spec").and_then(Node::as_mapping).expect("spec mapping");
        assert_eq!(
            spec.entries[0].head_comments,
            vec![" +operator-builder:field:name=replicas,type=int"]
        );
        assert_eq!(spec.entries[0].line_comment.as_deref(), Some(" trailing"));
        assert_eq!(spec.entries[0].line, 6);
        assert_eq!(scalar_at(&document, &["spec", "replicas"]).text, "2");
    }

    #[test]
    fn parses_compact_sequence_items() {
        let document = parse_single(indoc! {r#"
            containers:
            - name: web
              image: "nginx:1.17" # +marker
              args: ["--port", "80"]
            - name: sidecar
              ports:
                - 80
                - 443
        "#});

        let Some(Node::Sequence(containers)) = document.get(&["containers"]) else {
            panic!("containers must be a sequence");
        };
        assert_eq!(containers.items.len(), 2);

        let first = containers.items[0].value.as_mapping().expect("item mapping");
        let image = first.entries.iter().find(|e| e.key.text == "image").expect("image");
        assert_eq!(image.line_comment.as_deref(), Some(" +marker"));
        assert_eq!(image.value.as_scalar().map(|s| s.style), Some(ScalarStyle::DoubleQuoted));

        let args = first.get("args").and_then(Node::as_scalar).expect("args");
        assert_eq!(args.style, ScalarStyle::Flow);
    }

    #[test]
    fn parses_block_scalars() {
        let document = parse_single(indoc! {"
            data:
              script: |-
                #!/bin/sh
                echo hello

                exit 0
              other: value
        "});

        let script = scalar_at(&document, &["data", "script"]);
        assert_eq!(script.value(), "#!/bin/sh\necho hello\n\nexit 0");
        assert_eq!(scalar_at(&document, &["data", "other"]).text, "value");
    }

    #[test]
    fn parses_multiline_scalars() {
        let document = parse_single(indoc! {r#"
            description: this is
              a long plain
              scalar
            quoted: "first
              second"
        "#});

        assert_eq!(
            scalar_at(&document, &["description"]).text,
            "this is a long plain scalar"
        );
        assert_eq!(scalar_at(&document, &["quoted"]).text, "first second");
    }

    #[test]
    fn keeps_tags_on_scalars() {
        let document = parse_single("replicas: !!var parent.Spec.Replicas\n");
        let replicas = scalar_at(&document, &["replicas"]);

        assert!(replicas.is_var());
        assert_eq!(replicas.text, "parent.Spec.Replicas");
    }

    #[test]
    fn collects_foot_comments_of_nested_blocks() {
        let document = parse_single(indoc! {"
            spec:
              a: 1
              # belongs to spec
            # belongs to b
            b: 2
        "});

        let root = document.root.as_ref().and_then(Node::as_mapping).expect("root");
        let spec = root.get("spec").and_then(Node::as_mapping).expect("spec");
        assert_eq!(spec.foot_comments, vec![" belongs to spec"]);
        assert_eq!(root.entries[1].head_comments, vec![" belongs to b"]);
    }

    #[test]
    fn comment_only_documents_have_no_root() {
        let documents = parse_documents("# just a comment\n---\na: 1\n").expect("must parse");
        assert!(documents[0].root.is_none());
        assert!(documents[1].root.is_some());
    }

    #[test]
    fn documents_compare_by_content_and_comments() {
        let plain = parse_documents("a: 1\n").expect("must parse");

        assert_eq!(plain, parse_documents("a: 1\n").expect("must parse"));
        assert_ne!(plain, parse_documents("a: 1 # note\n").expect("must parse"));
    }

    #[rstest]
    #[case("a: &anchor 1\n")]
    #[case("a: *alias\n")]
    fn rejects_anchors(#[case] input: &str) {
        let err = parse_documents(input).expect_err("anchors are unsupported");
        assert_eq!(err, Error::AnchorsUnsupported { line: 1 });
    }

    #[test]
    fn rejects_duplicate_keys() {
        let err = parse_documents("a: 1\na: 2\n").expect_err("duplicate keys are invalid");
        assert_eq!(
            err,
            Error::DuplicateKey {
                line: 2,
                key: "a".into()
            }
        );
    }

    #[rstest]
    #[case("url: http://example.com # comment", "url: http://example.com ", Some(" comment"))]
    #[case("msg: \"a # b\"", "msg: \"a # b\"", None)]
    #[case("msg: it's # here", "msg: it's ", Some(" here"))]
    #[case("color: a#b", "color: a#b", None)]
    fn comment_splitting(
        #[case] input: &str,
        #[case] content: &str,
        #[case] comment: Option<&str>,
    ) {
        let (actual_content, actual_comment) = split_comment(input);
        assert_eq!(actual_content, content);
        assert_eq!(actual_comment.as_deref(), comment);
    }
}
