//! The incremental-edit protocol
//!
//! An [`EditRequest`] is a closed tagged union describing a mutation of part
//! of an existing trace, together with the weight-computation rule it
//! implies:
//!
//! - `Update` deterministically overwrites addressed leaves; the forward
//!   weight is the exact log-density delta of the touched leaves.
//! - `Regenerate` resamples selected leaves from the program's own prior;
//!   because the proposal cancels the prior by construction, the forward
//!   weight is again the exact log-density delta.
//! - `Index` applies an inner request at one position of a vectorized
//!   trace's batch dimension; all other positions are untouched.
//! - `Static` dispatches distinct requests to distinct sub-addresses,
//!   composing their effects and summing their weights.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::address::{Key, Selection};
use crate::choices::ChoiceMap;
use crate::trace::Trace;

/// A request to mutate part of an existing trace.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EditRequest {
    /// Deterministically overwrite the addressed leaves with the given
    /// constraint values
    Update(ChoiceMap),
    /// Resample the selected leaves from the program's own prior,
    /// discarding the old values
    Regenerate(Selection),
    /// Apply the inner request at one batch index of a vectorized trace
    Index(usize, Box<EditRequest>),
    /// Dispatch distinct requests to distinct sub-addresses
    Static(BTreeMap<Key, EditRequest>),
}

impl EditRequest {
    /// Dispatch `inner` to batch position `index`.
    pub fn index(index: usize, inner: EditRequest) -> Self {
        EditRequest::Index(index, Box::new(inner))
    }

    /// Dispatch per-key requests from an iterator of pairs.
    pub fn static_map<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, EditRequest)>,
        K: Into<Key>,
    {
        EditRequest::Static(pairs.into_iter().map(|(k, r)| (k.into(), r)).collect())
    }

    /// Restrict this request to the subtree under `key`.
    ///
    /// Returns `None` when the request carries nothing for that subtree.
    pub fn descend(&self, key: &Key) -> Option<EditRequest> {
        match self {
            EditRequest::Update(constraint) => {
                let sub = constraint.at(key);
                if sub.static_is_empty() {
                    None
                } else {
                    Some(EditRequest::Update(sub.clone()))
                }
            }
            EditRequest::Regenerate(selection) => {
                let sub = selection.descend(key);
                if sub.is_none() {
                    None
                } else {
                    Some(EditRequest::Regenerate(sub))
                }
            }
            EditRequest::Index(index, inner) => match key {
                Key::Idx(i) if i == index => Some((**inner).clone()),
                _ => None,
            },
            EditRequest::Static(requests) => requests.get(key).cloned(),
        }
    }

    /// Construct the backward request that undoes this edit.
    ///
    /// The inverse of both `Update` and `Regenerate` is `Update(discard)`:
    /// restoring the exact overwritten values reproduces the original
    /// choices and score. Composite requests invert recursively against the
    /// matching slice of the discard.
    pub fn invert(&self, discard: &ChoiceMap) -> EditRequest {
        match self {
            EditRequest::Update(_) | EditRequest::Regenerate(_) => {
                EditRequest::Update(discard.clone())
            }
            EditRequest::Index(i, inner) => {
                EditRequest::index(*i, inner.invert(discard.at(&Key::Idx(*i))))
            }
            EditRequest::Static(requests) => EditRequest::Static(
                requests
                    .iter()
                    .map(|(k, r)| (k.clone(), r.invert(discard.at(k))))
                    .collect(),
            ),
        }
    }
}

/// The result of applying an [`EditRequest`] to a trace.
#[derive(Clone, Debug)]
pub struct EditOutcome {
    /// The updated trace
    pub trace: Trace,
    /// Forward log-weight: the score delta adjusted for proposal asymmetry
    pub weight: f64,
    /// Request that, applied to the new trace, undoes the edit
    pub backward: EditRequest,
    /// Choice map of the values that were overwritten or removed
    pub discard: ChoiceMap,
}
