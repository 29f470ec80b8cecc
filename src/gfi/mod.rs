//! The generative function capability
//!
//! Every variant in the system (primitive distribution, composite program,
//! combinator) implements the same operation set: `simulate` (fresh
//! execution), `importance` (conditioned execution with an importance
//! weight), `assess` (pure density evaluation), and `edit` (incremental
//! mutation with exact weight accounting). The edit protocol lives in
//! [`edit`].

pub mod edit;

pub use edit::{EditOutcome, EditRequest};

use crate::choices::ChoiceMap;
use crate::error::GenResult;
use crate::rng::PrngKey;
use crate::trace::Trace;
use crate::value::Value;

/// The uniform operation set over generative computations.
///
/// All operations are deterministic given their inputs (randomness threads
/// through the explicit [`PrngKey`]), so failures are surfaced synchronously
/// and never retried.
pub trait GenerativeFunction: Send + Sync {
    /// Identity recorded in every trace this function produces.
    fn name(&self) -> &str;

    /// Draw fresh values for every sample statement, with no conditioning.
    ///
    /// Fails only on arity or shape mismatches.
    fn simulate(&self, key: PrngKey, args: &[Value]) -> GenResult<Trace>;

    /// Like `simulate`, but any leaf present in `constraint` is fixed to
    /// that value instead of sampled.
    ///
    /// The returned weight is the log-density of the fixed leaves under the
    /// model; it is zero when the constraint fixes no leaves.
    fn importance(
        &self,
        key: PrngKey,
        constraint: &ChoiceMap,
        args: &[Value],
    ) -> GenResult<(Trace, f64)>;

    /// Pure density evaluation against fully supplied choices.
    ///
    /// Every leaf the program needs must be present in `choices`; a missing
    /// leaf fails with an address error. Performs no sampling.
    fn assess(&self, choices: &ChoiceMap, args: &[Value]) -> GenResult<(f64, Value)>;

    /// Apply an incremental mutation to an existing trace.
    ///
    /// Returns the updated trace, the forward log-weight (the score delta,
    /// adjusted for any proposal asymmetry introduced by resampling), the
    /// backward request that undoes the edit, and the discarded choices.
    fn edit(
        &self,
        key: PrngKey,
        trace: &Trace,
        request: &EditRequest,
        args: &[Value],
    ) -> GenResult<EditOutcome>;
}
