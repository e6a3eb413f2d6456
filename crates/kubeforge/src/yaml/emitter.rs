use super::{
    Document, Entry, Mapping, Node, Sequence,
    scalar::{Scalar, ScalarStyle, double_quote},
};

const INDENT: usize = 2;

/// Emits all documents, separated by `---` lines.
pub fn emit_documents(documents: &[Document]) -> String {
    documents
        .iter()
        .map(emit_document)
        .collect::<Vec<_>>()
        .join("---\n")
}

/// Emits a single document. Mappings are indented by two spaces, sequences
/// are indented below their key and comments are written back where they
/// were attached.
pub fn emit_document(document: &Document) -> String {
    let mut out = String::new();

    write_comments(&mut out, &document.head_comments, 0);
    if let Some(root) = &document.root {
        write_block(&mut out, root, 0);
    }
    write_comments(&mut out, &document.foot_comments, 0);

    out
}

fn pad(indent: usize) -> String {
    " ".repeat(indent)
}

fn write_comments(out: &mut String, comments: &[String], indent: usize) {
    for comment in comments {
        out.push_str(&pad(indent));
        out.push('#');
        out.push_str(comment);
        out.push('\n');
    }
}

fn write_line_comment(out: &mut String, comment: Option<&String>) {
    if let Some(comment) = comment {
        out.push_str(" #");
        out.push_str(comment);
    }
}

/// Writes a node which starts on a line of its own.
fn write_block(out: &mut String, node: &Node, indent: usize) {
    match node {
        Node::Mapping(mapping) => write_mapping(out, mapping, indent, false),
        Node::Sequence(sequence) => write_sequence(out, sequence, indent),
        Node::Scalar(scalar) => {
            out.push_str(&pad(indent));
            write_scalar(out, scalar, None, indent);
        }
    }
}

/// Writes the entries of a mapping. If `inline_first` is set, the first key
/// continues the current line (after a sequence dash).
fn write_mapping(out: &mut String, mapping: &Mapping, indent: usize, inline_first: bool) {
    for (index, entry) in mapping.entries.iter().enumerate() {
        if !(inline_first && index == 0) {
            write_comments(out, &entry.head_comments, indent);
            out.push_str(&pad(indent));
        }
        write_entry(out, entry, indent);
    }

    write_comments(out, &mapping.foot_comments, indent);
}

fn write_entry(out: &mut String, entry: &Entry, indent: usize) {
    out.push_str(&key_repr(&entry.key));
    out.push(':');
    write_value(out, &entry.value, indent, entry.line_comment.as_ref());
}

/// Writes the value following a `key:` on the same line, or below it if it
/// is a collection.
fn write_value(out: &mut String, value: &Node, indent: usize, comment: Option<&String>) {
    match value {
        Node::Scalar(scalar) => {
            if !is_null_placeholder(scalar) {
                out.push(' ');
            }
            write_scalar(out, scalar, comment, indent);
        }
        Node::Mapping(mapping) if mapping.entries.is_empty() => {
            out.push_str(" {}");
            write_line_comment(out, comment);
            out.push('\n');
            write_comments(out, &mapping.foot_comments, indent + INDENT);
        }
        Node::Sequence(sequence) if sequence.items.is_empty() => {
            out.push_str(" []");
            write_line_comment(out, comment);
            out.push('\n');
            write_comments(out, &sequence.foot_comments, indent + INDENT);
        }
        Node::Mapping(mapping) => {
            write_line_comment(out, comment);
            out.push('\n');
            write_mapping(out, mapping, indent + INDENT, false);
        }
        Node::Sequence(sequence) => {
            write_line_comment(out, comment);
            out.push('\n');
            write_sequence(out, sequence, indent + INDENT);
        }
    }
}

fn write_sequence(out: &mut String, sequence: &Sequence, indent: usize) {
    for item in &sequence.items {
        write_comments(out, &item.head_comments, indent);
        out.push_str(&pad(indent));
        out.push('-');

        match &item.value {
            Node::Mapping(mapping)
                if !mapping.entries.is_empty()
                    && item.line_comment.is_none()
                    && mapping.entries[0].head_comments.is_empty() =>
            {
                out.push(' ');
                write_mapping(out, mapping, indent + INDENT, true);
            }
            Node::Scalar(scalar) => {
                if !is_null_placeholder(scalar) {
                    out.push(' ');
                }
                write_scalar(out, scalar, item.line_comment.as_ref(), indent);
            }
            collection => write_value(out, collection, indent, item.line_comment.as_ref()),
        }
    }

    write_comments(out, &sequence.foot_comments, indent);
}

fn is_null_placeholder(scalar: &Scalar) -> bool {
    scalar.text.is_empty() && scalar.style == ScalarStyle::Plain && scalar.tag.is_none()
}

fn key_repr(key: &Scalar) -> String {
    match key.style {
        ScalarStyle::SingleQuoted if !key.text.contains('\n') => {
            format!("'{}'", key.text.replace('\'', "''"))
        }
        ScalarStyle::Plain if !key.text.contains('\n') => key.text.clone(),
        _ => double_quote(&key.text),
    }
}

/// Writes a scalar (which already sits at its position on the current line)
/// followed by an optional comment and a line break. Block scalar content is
/// indented one level deeper than `indent`.
fn write_scalar(out: &mut String, scalar: &Scalar, comment: Option<&String>, indent: usize) {
    if let Some(tag) = &scalar.tag {
        out.push_str(tag);
        if !scalar.text.is_empty() || scalar.style != ScalarStyle::Plain {
            out.push(' ');
        }
    }

    let block_chomping = match scalar.style {
        ScalarStyle::Literal(chomping) => Some(('|', chomping)),
        ScalarStyle::Folded(chomping) => Some(('>', chomping)),
        _ => None,
    };

    if let Some((indicator, chomping)) = block_chomping {
        out.push(indicator);
        if scalar.text.starts_with(' ') {
            out.push_str(&INDENT.to_string());
        }
        out.push_str(chomping.indicator());
        write_line_comment(out, comment);
        out.push('\n');

        if !scalar.text.is_empty() {
            for line in scalar.text.split('\n') {
                if !line.is_empty() {
                    out.push_str(&pad(indent + INDENT));
                    out.push_str(line);
                }
                out.push('\n');
            }
        }
        return;
    }

    out.push_str(&scalar_repr(scalar));
    write_line_comment(out, comment);
    out.push('\n');
}

fn scalar_repr(scalar: &Scalar) -> String {
    match scalar.style {
        ScalarStyle::Plain if !scalar.text.contains('\n') => scalar.text.clone(),
        ScalarStyle::SingleQuoted if !scalar.text.contains('\n') => {
            format!("'{}'", scalar.text.replace('\'', "''"))
        }
        ScalarStyle::Flow => scalar.text.clone(),
        _ => double_quote(&scalar.text),
    }
}
