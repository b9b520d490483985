//! Depth-bounded traversal of free-form configuration documents.
//!
//! Site configuration is an arbitrary JSON tree that embeds file ids at no
//! fixed path (banner arrays, favicon, navbar icons, ...). The tree is
//! writable through the settings endpoint, so traversal is iterative and
//! bounded rather than recursive.

use crate::file_id::{FileIdSet, extract_file_ids};
use serde_json::Value;
use std::ops::ControlFlow;

/// Default maximum nesting depth inspected in a configuration document.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Summary of a completed walk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WalkOutcome {
    /// Number of string nodes (values and object keys) visited.
    pub strings_visited: usize,
    /// Whether the visitor asked to stop early.
    pub stopped: bool,
}

/// Receives every string found in a document, keys included.
pub trait DocumentVisitor {
    fn visit_str(&mut self, value: &str) -> ControlFlow<()>;
}

impl<F> DocumentVisitor for F
where
    F: FnMut(&str) -> ControlFlow<()>,
{
    fn visit_str(&mut self, value: &str) -> ControlFlow<()> {
        self(value)
    }
}

/// Walk `doc`, handing every string to `visitor`.
///
/// The root sits at depth 0; children of a node at depth `d` sit at `d + 1`.
/// A node deeper than `max_depth` fails the walk with
/// [`crate::Error::DocumentTooDeep`].
pub fn walk<V: DocumentVisitor + ?Sized>(
    doc: &Value,
    max_depth: usize,
    visitor: &mut V,
) -> crate::Result<WalkOutcome> {
    let mut outcome = WalkOutcome::default();
    let mut stack: Vec<(&Value, usize)> = vec![(doc, 0)];

    while let Some((node, depth)) = stack.pop() {
        if depth > max_depth {
            return Err(crate::Error::DocumentTooDeep { max_depth });
        }

        match node {
            Value::String(s) => {
                outcome.strings_visited += 1;
                if visitor.visit_str(s).is_break() {
                    outcome.stopped = true;
                    return Ok(outcome);
                }
            }
            Value::Array(items) => {
                stack.extend(items.iter().rev().map(|item| (item, depth + 1)));
            }
            Value::Object(map) => {
                for (key, value) in map.iter().rev() {
                    outcome.strings_visited += 1;
                    if visitor.visit_str(key).is_break() {
                        outcome.stopped = true;
                        return Ok(outcome);
                    }
                    stack.push((value, depth + 1));
                }
            }
            Value::Null | Value::Bool(_) | Value::Number(_) => {}
        }
    }

    Ok(outcome)
}

/// Collect every file id embedded anywhere in `doc`.
pub fn embedded_file_ids(doc: &Value, max_depth: usize) -> crate::Result<(FileIdSet, WalkOutcome)> {
    let mut ids = FileIdSet::new();
    let outcome = walk(doc, max_depth, &mut |s: &str| {
        ids.extend(extract_file_ids(s));
        ControlFlow::Continue(())
    })?;
    Ok((ids, outcome))
}

/// Fail when `doc` nests deeper than `max_depth`.
pub fn check_depth(doc: &Value, max_depth: usize) -> crate::Result<()> {
    walk(doc, max_depth, &mut |_: &str| ControlFlow::Continue(())).map(|_| ())
}
