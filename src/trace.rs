//! Execution traces
//!
//! A [`Trace`] is the immutable record of one full execution of a generative
//! function: the arguments it ran with, its return value, the choice map of
//! every sampled value, and the total log score. Alongside the choice map it
//! keeps a per-leaf log-density ledger, which makes partial-score queries
//! ([`Trace::project`]) and incremental edits exact.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::address::{Address, Selection};
use crate::choices::ChoiceMap;
use crate::value::Value;

/// Immutable record of one execution.
///
/// Traces are created only by `simulate`, `importance`, or `edit` and never
/// mutated in place. The invariant `score == logps.values().sum()` is
/// maintained by construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    gen_fn: String,
    args: Vec<Value>,
    retval: Value,
    choices: ChoiceMap,
    logps: BTreeMap<Address, f64>,
    score: f64,
}

impl Trace {
    /// Assemble a trace. The score is computed from the log-density ledger.
    pub fn new(
        gen_fn: impl Into<String>,
        args: Vec<Value>,
        retval: Value,
        choices: ChoiceMap,
        logps: BTreeMap<Address, f64>,
    ) -> Self {
        let score = logps.values().sum();
        Self {
            gen_fn: gen_fn.into(),
            args,
            retval,
            choices,
            logps,
            score,
        }
    }

    /// Identity of the generative function that produced this trace.
    pub fn gen_fn(&self) -> &str {
        &self.gen_fn
    }

    /// Arguments the execution ran with.
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Return value of the execution.
    pub fn retval(&self) -> &Value {
        &self.retval
    }

    /// Choice map of all sampled values.
    pub fn choices(&self) -> &ChoiceMap {
        &self.choices
    }

    /// Per-leaf log densities.
    pub fn logps(&self) -> &BTreeMap<Address, f64> {
        &self.logps
    }

    /// Total log score: the sum of log-densities of every sampled leaf.
    pub fn score(&self) -> f64 {
        self.score
    }

    /// Sum of log-densities over the leaves matched by `selection`.
    ///
    /// `project(Selection::all())` equals [`Trace::score`];
    /// `project(Selection::none())` equals zero.
    pub fn project(&self, selection: &Selection) -> f64 {
        self.logps
            .iter()
            .filter(|(addr, _)| selection.matches(addr))
            .map(|(_, logp)| logp)
            .sum()
    }
}
