use std::{
    collections::HashSet,
    fs,
    path::{Component, Path, PathBuf},
};

use regex::Regex;
use snafu::{ResultExt, Snafu, ensure};
use tracing::debug;
use walkdir::WalkDir;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("manifest {path:?} of pattern {pattern:?} does not exist"))]
    GlobNotFound { pattern: String, path: PathBuf },

    #[snafu(display("pattern {pattern:?} does not match any file"))]
    GlobEmpty { pattern: String },

    #[snafu(display("failed to compile pattern {pattern:?}"))]
    CompilePattern { source: regex::Error, pattern: String },

    #[snafu(display("failed to walk {path:?} for pattern {pattern:?}"))]
    Walk {
        source: walkdir::Error,
        pattern: String,
        path: PathBuf,
    },

    #[snafu(display("failed to resolve manifest {path:?}"))]
    Canonicalize {
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Expands glob patterns relative to `base`. Matches of each pattern are
/// sorted, files matched by an earlier pattern are skipped.
pub fn expand(base: &Path, patterns: &[String]) -> Result<Vec<PathBuf>, Error> {
    let mut seen = HashSet::new();
    let mut paths = Vec::new();

    for pattern in patterns {
        for path in expand_pattern(base, pattern)? {
            let canonical = fs::canonicalize(&path).context(CanonicalizeSnafu { path: &path })?;
            if seen.insert(canonical) {
                paths.push(path);
            } else {
                debug!(?path, %pattern, "skipping manifest matched more than once");
            }
        }
    }

    Ok(paths)
}

fn expand_pattern(base: &Path, pattern: &str) -> Result<Vec<PathBuf>, Error> {
    if !has_wildcards(pattern) {
        let path = base.join(pattern);
        ensure!(path.is_file(), GlobNotFoundSnafu { pattern, path });
        return Ok(vec![path]);
    }

    // Only the part starting at the first segment with wildcards is matched,
    // the literal prefix is where the walk starts.
    let segments: Vec<&str> = pattern.split('/').collect();
    let literal = segments
        .iter()
        .position(|segment| has_wildcards(segment))
        .unwrap_or(segments.len());
    let root = segments[..literal]
        .iter()
        .fold(base.to_path_buf(), |root, segment| root.join(segment));
    let regex = translate(&segments[literal..].join("/")).context(CompilePatternSnafu { pattern })?;

    let mut matches = Vec::new();
    if root.is_dir() {
        for entry in WalkDir::new(&root).follow_links(true) {
            let entry = entry.context(WalkSnafu {
                pattern,
                path: &root,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(&root) else {
                continue;
            };
            if regex.is_match(&slash_path(relative)) {
                matches.push(entry.into_path());
            }
        }
    }

    ensure!(!matches.is_empty(), GlobEmptySnafu { pattern });
    matches.sort();
    Ok(matches)
}

fn has_wildcards(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Joins the normal components of a path with slashes.
pub fn slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(segment) => Some(segment.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Translates a glob into an anchored regular expression.
fn translate(glob: &str) -> Result<Regex, regex::Error> {
    let mut regex = String::from("^");
    let mut chars = glob.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                if chars.peek() == Some(&'/') {
                    chars.next();
                    regex.push_str("(?:.*/)?");
                } else {
                    regex.push_str(".*");
                }
            }
            '*' => regex.push_str("[^/]*"),
            '?' => regex.push_str("[^/]"),
            '[' => {
                regex.push('[');
                if chars.peek() == Some(&'!') {
                    chars.next();
                    regex.push('^');
                }
                for c in chars.by_ref() {
                    if c == ']' {
                        break;
                    }
                    if c == '\\' || c == '[' {
                        regex.push('\\');
                    }
                    regex.push(c);
                }
                regex.push(']');
            }
            c => regex.push_str(&regex::escape(&c.to_string())),
        }
    }

    regex.push('$');
    Regex::new(&regex)
}
