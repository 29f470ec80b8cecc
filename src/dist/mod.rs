//! Primitive distributions as generative functions
//!
//! A [`Distribution`] supplies sampling and log-density evaluation for a
//! single value, with numeric semantics delegated to `rand`/`rand_distr`.
//! [`Dist`] adapts any distribution into a [`GenerativeFunction`] whose
//! arguments are the distribution parameters and whose choice map is a
//! single root leaf.

pub mod primitives;

pub use primitives::{bernoulli, categorical, normal, uniform};
pub use primitives::{Bernoulli, Categorical, Normal, Uniform};

use std::collections::BTreeMap;

use rand::rngs::StdRng;

use crate::address::Address;
use crate::choices::ChoiceMap;
use crate::error::{AddressError, GenError, GenResult, ShapeError};
use crate::gfi::{EditOutcome, EditRequest, GenerativeFunction};
use crate::rng::PrngKey;
use crate::trace::Trace;
use crate::value::Value;

/// Sampling and exact log-density evaluation for one value.
pub trait Distribution: Send + Sync {
    /// Distribution name, recorded as the generative-function identity.
    fn name(&self) -> &'static str;

    /// Number of parameters expected in the argument list.
    fn arity(&self) -> usize;

    /// Draw one value given parameters.
    fn sample(&self, rng: &mut StdRng, params: &[Value]) -> GenResult<Value>;

    /// Log-density of `value` given parameters.
    fn log_density(&self, value: &Value, params: &[Value]) -> GenResult<f64>;
}

/// A primitive distribution viewed as a generative function.
///
/// The trace of a `Dist` holds exactly one choice, at the root address.
#[derive(Clone, Debug)]
pub struct Dist<D: Distribution> {
    dist: D,
}

impl<D: Distribution> Dist<D> {
    /// Wrap a distribution.
    pub fn new(dist: D) -> Self {
        Self { dist }
    }

    /// The wrapped distribution.
    pub fn inner(&self) -> &D {
        &self.dist
    }

    fn check_arity(&self, args: &[Value]) -> GenResult<()> {
        if args.len() != self.dist.arity() {
            return Err(ShapeError::Arity {
                gen_fn: self.dist.name().to_string(),
                expected: self.dist.arity(),
                actual: args.len(),
            }
            .into());
        }
        Ok(())
    }

    fn trace_of(&self, args: &[Value], value: Value, logp: f64) -> Trace {
        let mut logps = BTreeMap::new();
        logps.insert(Address::root(), logp);
        Trace::new(
            self.dist.name(),
            args.to_vec(),
            value.clone(),
            ChoiceMap::Leaf(value),
            logps,
        )
    }

    /// No-op edit: keep the old value, re-evaluating its density under the
    /// (possibly changed) arguments.
    fn recompute(&self, trace: &Trace, request: &EditRequest, args: &[Value]) -> GenResult<EditOutcome> {
        let value = trace
            .choices()
            .as_leaf()
            .ok_or(AddressError::Malformed(Address::root()))?
            .clone();
        let logp = self.dist.log_density(&value, args)?;
        let weight = logp - trace.score();
        Ok(EditOutcome {
            trace: self.trace_of(args, value, logp),
            weight,
            backward: request.invert(&ChoiceMap::Empty),
            discard: ChoiceMap::Empty,
        })
    }
}

impl<D: Distribution> GenerativeFunction for Dist<D> {
    fn name(&self) -> &str {
        self.dist.name()
    }

    fn simulate(&self, key: PrngKey, args: &[Value]) -> GenResult<Trace> {
        self.check_arity(args)?;
        let mut rng = key.rng();
        let value = self.dist.sample(&mut rng, args)?;
        let logp = self.dist.log_density(&value, args)?;
        Ok(self.trace_of(args, value, logp))
    }

    fn importance(
        &self,
        key: PrngKey,
        constraint: &ChoiceMap,
        args: &[Value],
    ) -> GenResult<(Trace, f64)> {
        self.check_arity(args)?;
        if constraint.static_is_empty() {
            return Ok((self.simulate(key, args)?, 0.0));
        }
        let value = constraint
            .as_leaf()
            .ok_or(AddressError::Malformed(Address::root()))?
            .clone();
        let logp = self.dist.log_density(&value, args)?;
        Ok((self.trace_of(args, value, logp), logp))
    }

    fn assess(&self, choices: &ChoiceMap, args: &[Value]) -> GenResult<(f64, Value)> {
        self.check_arity(args)?;
        let value = choices
            .as_leaf()
            .ok_or(AddressError::Missing(Address::root()))?;
        let logp = self.dist.log_density(value, args)?;
        Ok((logp, value.clone()))
    }

    fn edit(
        &self,
        key: PrngKey,
        trace: &Trace,
        request: &EditRequest,
        args: &[Value],
    ) -> GenResult<EditOutcome> {
        self.check_arity(args)?;
        match request {
            EditRequest::Update(constraint) => {
                if constraint.static_is_empty() {
                    return self.recompute(trace, request, args);
                }
                let new_value = constraint
                    .as_leaf()
                    .ok_or(AddressError::Malformed(Address::root()))?
                    .clone();
                let old_value = trace
                    .choices()
                    .as_leaf()
                    .ok_or(AddressError::Malformed(Address::root()))?
                    .clone();
                let new_logp = self.dist.log_density(&new_value, args)?;
                let weight = new_logp - trace.score();
                let discard = ChoiceMap::Leaf(old_value);
                Ok(EditOutcome {
                    trace: self.trace_of(args, new_value, new_logp),
                    weight,
                    backward: request.invert(&discard),
                    discard,
                })
            }
            EditRequest::Regenerate(selection) => {
                if !selection.matches(&Address::root()) {
                    return self.recompute(trace, request, args);
                }
                let old_value = trace
                    .choices()
                    .as_leaf()
                    .ok_or(AddressError::Malformed(Address::root()))?
                    .clone();
                let mut rng = key.rng();
                let new_value = self.dist.sample(&mut rng, args)?;
                let new_logp = self.dist.log_density(&new_value, args)?;
                // self-proposal: the resampling density cancels the prior
                let weight = new_logp - trace.score();
                let discard = ChoiceMap::Leaf(old_value);
                Ok(EditOutcome {
                    trace: self.trace_of(args, new_value, new_logp),
                    weight,
                    backward: request.invert(&discard),
                    discard,
                })
            }
            EditRequest::Index(_, _) | EditRequest::Static(_) => Err(GenError::InvalidRequest(
                format!("{} has a single root address; Index/Static requests do not apply", self.dist.name()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Selection;
    use crate::choices::C;

    #[test]
    fn test_simulate_assess_agree() {
        let n = normal();
        let args = [Value::F64(0.0), Value::F64(1.0)];
        let tr = n.simulate(PrngKey::new(1), &args).unwrap();
        let (score, retval) = n.assess(tr.choices(), &args).unwrap();
        assert_eq!(score, tr.score());
        assert_eq!(&retval, tr.retval());
    }

    #[test]
    fn test_importance_weight_is_constrained_density() {
        let n = normal();
        let args = [Value::F64(0.0), Value::F64(1.0)];
        let (tr, w) = n
            .importance(PrngKey::new(2), &C::v(3.0), &args)
            .unwrap();
        assert_eq!(w, Normal::logpdf(3.0, 0.0, 1.0));
        assert_eq!(tr.score(), w);
        assert_eq!(tr.retval(), &Value::F64(3.0));
    }

    #[test]
    fn test_importance_empty_constraint_weight_zero() {
        let n = normal();
        let args = [Value::F64(0.0), Value::F64(1.0)];
        let (_, w) = n
            .importance(PrngKey::new(3), &ChoiceMap::Empty, &args)
            .unwrap();
        assert_eq!(w, 0.0);
    }

    #[test]
    fn test_update_edit_weight() {
        let n = normal();
        let args = [Value::F64(0.0), Value::F64(1.0)];
        let tr = n.simulate(PrngKey::new(4), &args).unwrap();
        let req = EditRequest::Update(C::v(2.5));
        let out = n.edit(PrngKey::new(5), &tr, &req, &args).unwrap();
        assert_eq!(out.weight, out.trace.score() - tr.score());
        assert_eq!(out.trace.retval(), &Value::F64(2.5));
        assert_eq!(out.discard.as_leaf(), Some(tr.retval()));
    }

    #[test]
    fn test_regenerate_edit_roundtrip_via_backward() {
        let n = normal();
        let args = [Value::F64(0.0), Value::F64(1.0)];
        let tr = n.simulate(PrngKey::new(6), &args).unwrap();
        let req = EditRequest::Regenerate(Selection::all());
        let out = n.edit(PrngKey::new(7), &tr, &req, &args).unwrap();
        let undone = n
            .edit(PrngKey::new(8), &out.trace, &out.backward, &args)
            .unwrap();
        assert_eq!(undone.trace.choices(), tr.choices());
        assert_eq!(undone.trace.score(), tr.score());
    }

    #[test]
    fn test_index_request_rejected() {
        let n = normal();
        let args = [Value::F64(0.0), Value::F64(1.0)];
        let tr = n.simulate(PrngKey::new(9), &args).unwrap();
        let req = EditRequest::index(0, EditRequest::Regenerate(Selection::all()));
        assert!(matches!(
            n.edit(PrngKey::new(10), &tr, &req, &args),
            Err(GenError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_arity_mismatch() {
        let n = normal();
        let err = n.simulate(PrngKey::new(11), &[Value::F64(0.0)]).unwrap_err();
        assert!(matches!(err, GenError::Shape(ShapeError::Arity { .. })));
    }
}
