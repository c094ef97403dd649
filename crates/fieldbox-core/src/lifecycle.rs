//! # Lifecycle Dispatcher
//!
//! Runs the post-load hook of every box a load created, once the whole
//! document is in place. Each hook runs in its own failure boundary: an error
//! or panic is logged against the box's identity and the next box still runs.

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::graph::BoxGraph;
use crate::registry::panic_message;
use crate::BoxId;
use std::collections::BTreeSet;
use std::panic::{self, AssertUnwindSafe};

/// Invoke the post-load hook on each of `boxes` that has one.
///
/// Returns the number of hooks that ran to success.
pub fn dispatch(graph: &mut BoxGraph, boxes: &BTreeSet<BoxId>, diagnostics: &mut Diagnostics) -> usize {
    let mut completed = 0;

    for &id in boxes {
        let Some(node) = graph.get_mut(id) else {
            continue;
        };
        let identity = node.identity().unwrap_or_default().to_string();

        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| node.run_post_load())) {
            Ok(outcome) => outcome,
            Err(payload) => Some(Err(crate::FieldboxError::HookFailed(panic_message(
                payload.as_ref(),
            )))),
        };

        match outcome {
            None => {}
            Some(Ok(())) => completed += 1,
            Some(Err(e)) => {
                tracing::error!("post-load hook of box {} failed, continuing: {}", identity, e);
                diagnostics.record(Diagnostic::HookFailed {
                    id: identity,
                    reason: e.to_string(),
                });
            }
        }
    }

    completed
}
