use regex::NoExpand;
use tracing::{debug, warn};

use super::{
    FieldMarker, Literal, Marker, ReplaceRequiresScalarSnafu, ResourceMarker, Result, Scope,
    UnattachedFieldMarkerSnafu,
};
use crate::yaml::{Document, END_MARK, Node, START_MARK, Scalar};

/// A field marker found in a document, along with the sample value taken
/// from the literal it annotated.
#[derive(Clone, Debug)]
pub struct FieldMarkerResult {
    pub marker: FieldMarker,
    pub sample: Option<Literal>,
}

/// All markers found in a single document.
#[derive(Clone, Debug, Default)]
pub struct DocumentMarkers {
    pub fields: Vec<FieldMarkerResult>,
    pub resources: Vec<ResourceMarker>,
}

/// Applies the field markers of every document to the values they annotate
/// and returns the markers found, one entry per document.
///
/// Marker comments are removed from the documents, the description of a
/// field marker is kept as head comment of the annotated key.
pub fn rewrite_documents(documents: &mut [Document]) -> Result<Vec<DocumentMarkers>> {
    documents.iter_mut().map(rewrite_document).collect()
}

/// Rewrites references to the collection into references to the parent.
/// Used when a collection processes its own manifests.
pub fn coerce_collection_references(text: &str) -> String {
    text.replace(
        &format!("{}.Spec.", Scope::Collection),
        &format!("{}.Spec.", Scope::Parent),
    )
}

fn rewrite_document(document: &mut Document) -> Result<DocumentMarkers> {
    let mut markers = DocumentMarkers::default();

    take_unattached(&mut document.head_comments, document.line, &mut markers)?;
    if let Some(root) = &mut document.root {
        visit(root, &mut markers)?;
    }
    take_unattached(&mut document.foot_comments, document.line, &mut markers)?;

    Ok(markers)
}

fn visit(node: &mut Node, markers: &mut DocumentMarkers) -> Result<()> {
    let line = node.line();

    match node {
        Node::Mapping(mapping) => {
            for entry in &mut mapping.entries {
                annotate(
                    &mut entry.head_comments,
                    &mut entry.line_comment,
                    &mut entry.value,
                    entry.line,
                    markers,
                )?;
            }
            take_unattached(&mut mapping.foot_comments, line, markers)
        }
        Node::Sequence(sequence) => {
            for item in &mut sequence.items {
                annotate(
                    &mut item.head_comments,
                    &mut item.line_comment,
                    &mut item.value,
                    item.line,
                    markers,
                )?;
            }
            take_unattached(&mut sequence.foot_comments, line, markers)
        }
        Node::Scalar(_) => Ok(()),
    }
}

/// Handles the markers attached to a key (or sequence item) and descends
/// into its value.
fn annotate(
    head_comments: &mut Vec<String>,
    line_comment: &mut Option<String>,
    value: &mut Node,
    line: usize,
    markers: &mut DocumentMarkers,
) -> Result<()> {
    let mut found = take_markers(head_comments, line)?;

    if let Some(comment) = line_comment.take() {
        match Marker::parse(&comment, line)? {
            Some(marker) => found.push(marker),
            None => *line_comment = Some(comment),
        }
    }

    let mut fields = Vec::new();
    for marker in found {
        match marker {
            Marker::Field(field) => fields.push(field),
            Marker::Resource(resource) => markers.resources.push(resource),
        }
    }

    if !fields.is_empty() {
        // Collection markers go first, field markers then see their result.
        fields.sort_by_key(|field| field.scope != Scope::Collection);
        let original = value.clone();

        for marker in fields {
            debug!(name = %marker.name, line, scope = %marker.scope, "applying field marker");

            let sample = sample_value(&marker, &original);
            apply(&marker, value)?;
            head_comments.extend(
                marker
                    .description_lines()
                    .into_iter()
                    .map(|line| format!(" {line}")),
            );

            markers.fields.push(FieldMarkerResult { marker, sample });
        }
    }

    visit(value, markers)
}

/// Removes markers from comments which do not annotate any value. Resource
/// markers are collected, field markers are rejected.
fn take_unattached(
    comments: &mut Vec<String>,
    line: usize,
    markers: &mut DocumentMarkers,
) -> Result<()> {
    for marker in take_markers(comments, line)? {
        match marker {
            Marker::Resource(resource) => markers.resources.push(resource),
            Marker::Field(field) => {
                return UnattachedFieldMarkerSnafu {
                    name: field.name,
                    line: field.line,
                }
                .fail();
            }
        }
    }

    Ok(())
}

fn take_markers(comments: &mut Vec<String>, line: usize) -> Result<Vec<Marker>> {
    let mut markers = Vec::new();
    let mut kept = Vec::with_capacity(comments.len());

    for comment in comments.drain(..) {
        match Marker::parse(&comment, line)? {
            Some(marker) => markers.push(marker),
            None => kept.push(comment),
        }
    }

    *comments = kept;
    Ok(markers)
}

fn apply(marker: &FieldMarker, value: &mut Node) -> Result<()> {
    let reference = marker.reference();

    let Some(regex) = &marker.replace else {
        let line = value.line().max(marker.line);
        *value = Node::Scalar(Scalar::var(reference, line));
        return Ok(());
    };

    let Node::Scalar(scalar) = value else {
        return ReplaceRequiresScalarSnafu { line: marker.line }.fail();
    };

    let text = if scalar.is_var() {
        scalar.text.clone()
    } else {
        scalar.value()
    };
    let splice = format!("{START_MARK} {reference} {END_MARK}");
    let replaced = regex.replace_all(&text, NoExpand(&splice));

    if replaced == text {
        warn!(
            name = %marker.name,
            line = marker.line,
            expression = regex.as_str(),
            "replace expression did not match, keeping value"
        );
        return Ok(());
    }

    *scalar = Scalar::var(replaced.into_owned(), scalar.line);
    Ok(())
}

/// The literal the marker replaced, used to render samples for fields
/// without default.
fn sample_value(marker: &FieldMarker, original: &Node) -> Option<Literal> {
    let scalar = original.as_scalar()?;
    if scalar.is_var() {
        return None;
    }

    let text = scalar.value();
    let text = match &marker.replace {
        Some(regex) => regex.find(&text)?.as_str().to_owned(),
        None => text.trim_end_matches('\n').to_owned(),
    };

    Literal::parse(marker.field_type, &text)
}
