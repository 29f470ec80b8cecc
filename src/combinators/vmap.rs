//! The vmap combinator
//!
//! [`Vmap`] lifts a generative function across a batch axis: per-index
//! evaluations are mutually independent, each reading only its own argument
//! slice and its own child key, so they run as a `rayon` parallel loop. The
//! batched choice map exposes integer keys `0..N-1`, one sub-map per index,
//! and the return values stack structure-preserving.

use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::address::{Address, Key};
use crate::choices::ChoiceMap;
use crate::error::{AddressError, GenResult, ShapeError};
use crate::gfi::{EditOutcome, EditRequest, GenerativeFunction};
use crate::rng::PrngKey;
use crate::trace::Trace;
use crate::value::Value;

/// Broadcasting specification for one argument position.
#[derive(Clone, Debug, PartialEq)]
pub enum AxisSpec {
    /// Map over the given axis of this argument
    Mapped(usize),
    /// Broadcast this argument unchanged to every index
    Broadcast,
    /// Per-element specifications for a list-structured argument.
    ///
    /// Must be a structural prefix of the argument: the argument has to be
    /// a list of matching length.
    Tree(Vec<AxisSpec>),
}

/// Broadcasting specification for a whole argument tuple.
#[derive(Clone, Debug, PartialEq)]
pub enum InAxes {
    /// Map every argument along the same axis
    All(usize),
    /// One specification per argument position
    PerArg(Vec<AxisSpec>),
}

impl InAxes {
    fn spec_for(&self, args: &[Value], gen_fn: &str) -> GenResult<Vec<AxisSpec>> {
        match self {
            InAxes::All(axis) => Ok(vec![AxisSpec::Mapped(*axis); args.len()]),
            InAxes::PerArg(specs) => {
                if specs.len() != args.len() {
                    return Err(ShapeError::Arity {
                        gen_fn: gen_fn.to_string(),
                        expected: specs.len(),
                        actual: args.len(),
                    }
                    .into());
                }
                Ok(specs.clone())
            }
        }
    }
}

/// Result of validating one argument against its specification: the mapped
/// size found in that subtree, if any.
fn mapped_size(argument: usize, spec: &AxisSpec, value: &Value) -> GenResult<Option<usize>> {
    match spec {
        AxisSpec::Broadcast => Ok(None),
        AxisSpec::Mapped(axis) => {
            let rank = value.rank();
            if rank < axis + 1 {
                return Err(ShapeError::MappedRankTooLow {
                    argument,
                    axis: *axis,
                    required: axis + 1,
                    actual: rank,
                }
                .into());
            }
            match value.size_along(*axis) {
                Some(size) => Ok(Some(size)),
                None => Err(ShapeError::AxesNotPrefix { argument }.into()),
            }
        }
        AxisSpec::Tree(specs) => {
            let items = match value {
                Value::List(items) if items.len() == specs.len() => items,
                _ => return Err(ShapeError::AxesNotPrefix { argument }.into()),
            };
            let mut size = None;
            for (spec, item) in specs.iter().zip(items) {
                if let Some(found) = mapped_size(argument, spec, item)? {
                    match size {
                        None => size = Some(found),
                        Some(expected) if expected != found => {
                            return Err(ShapeError::BatchSizeMismatch {
                                argument,
                                expected,
                                actual: found,
                            }
                            .into())
                        }
                        Some(_) => {}
                    }
                }
            }
            Ok(size)
        }
    }
}

fn slice_arg(spec: &AxisSpec, value: &Value, i: usize) -> GenResult<Value> {
    match spec {
        AxisSpec::Broadcast => Ok(value.clone()),
        AxisSpec::Mapped(axis) => value.index_along(*axis, i),
        AxisSpec::Tree(specs) => {
            let items = match value {
                Value::List(items) => items,
                _ => unreachable!("argument shape checked before slicing"),
            };
            let sliced = specs
                .iter()
                .zip(items)
                .map(|(spec, item)| slice_arg(spec, item, i))
                .collect::<GenResult<Vec<_>>>()?;
            Ok(Value::List(sliced))
        }
    }
}

/// Lifts an inner generative function across a batch axis.
#[derive(Clone, Debug)]
pub struct Vmap<G> {
    name: String,
    inner: G,
    in_axes: InAxes,
}

impl<G: GenerativeFunction> Vmap<G> {
    /// Lift `inner` with an explicit broadcasting specification.
    pub fn new(inner: G, in_axes: InAxes) -> Self {
        Self {
            name: format!("vmap({})", inner.name()),
            inner,
            in_axes,
        }
    }

    /// Lift `inner`, mapping every argument along axis 0.
    pub fn mapped(inner: G) -> Self {
        Self::new(inner, InAxes::All(0))
    }

    /// The wrapped generative function.
    pub fn inner(&self) -> &G {
        &self.inner
    }

    /// Validate the arguments and determine the batch size.
    ///
    /// All shape and prefix checks happen here, before any sampling.
    fn batch_size(&self, specs: &[AxisSpec], args: &[Value]) -> GenResult<usize> {
        let mut size = None;
        for (i, (spec, arg)) in specs.iter().zip(args).enumerate() {
            if let Some(found) = mapped_size(i, spec, arg)? {
                match size {
                    None => size = Some(found),
                    Some(expected) if expected != found => {
                        return Err(ShapeError::BatchSizeMismatch {
                            argument: i,
                            expected,
                            actual: found,
                        }
                        .into())
                    }
                    Some(_) => {}
                }
            }
        }
        size.ok_or_else(|| ShapeError::UnknownBatchSize.into())
    }

    fn sliced_args(
        &self,
        specs: &[AxisSpec],
        args: &[Value],
        n: usize,
    ) -> GenResult<Vec<Vec<Value>>> {
        (0..n)
            .map(|i| {
                specs
                    .iter()
                    .zip(args)
                    .map(|(spec, arg)| slice_arg(spec, arg, i))
                    .collect()
            })
            .collect()
    }

    fn empty_trace(&self, args: &[Value]) -> Trace {
        Trace::new(
            &self.name,
            args.to_vec(),
            Value::List(Vec::new()),
            ChoiceMap::Empty,
            BTreeMap::new(),
        )
    }

    /// Assemble a batched trace from per-index sub-traces.
    fn assemble(&self, args: &[Value], subs: Vec<Trace>) -> Trace {
        let mut children = BTreeMap::new();
        let mut logps = BTreeMap::new();
        let mut retvals = Vec::with_capacity(subs.len());
        for (i, sub) in subs.into_iter().enumerate() {
            children.insert(Key::Idx(i), sub.choices().clone());
            for (addr, logp) in sub.logps() {
                logps.insert(addr.prefixed(Key::Idx(i)), *logp);
            }
            retvals.push(sub.retval().clone());
        }
        Trace::new(
            &self.name,
            args.to_vec(),
            Value::stack(retvals),
            ChoiceMap::Node(children),
            logps,
        )
    }

    /// Slice the sub-trace at batch position `i` out of a batched trace.
    fn slice_trace(&self, trace: &Trace, sub_args: &[Value], i: usize) -> GenResult<Trace> {
        let key = Key::Idx(i);
        let sub_choices = trace.choices().at(&key).clone();
        let mut sub_logps = BTreeMap::new();
        for (addr, logp) in trace.logps() {
            if let Some(stripped) = addr.strip_prefix(&key) {
                sub_logps.insert(stripped, *logp);
            }
        }
        let sub_retval = trace.retval().index_leading(i)?;
        Ok(Trace::new(
            self.inner.name(),
            sub_args.to_vec(),
            sub_retval,
            sub_choices,
            sub_logps,
        ))
    }

    /// Splice an edited sub-trace back into the batch at position `i`.
    fn splice(&self, trace: &Trace, args: &[Value], i: usize, sub: &Trace) -> GenResult<Trace> {
        let key = Key::Idx(i);
        let mut children = match trace.choices() {
            ChoiceMap::Node(children) => children.clone(),
            _ => BTreeMap::new(),
        };
        children.insert(key.clone(), sub.choices().clone());
        let mut logps: BTreeMap<Address, f64> = trace
            .logps()
            .iter()
            .filter(|(addr, _)| addr.strip_prefix(&key).is_none())
            .map(|(addr, logp)| (addr.clone(), *logp))
            .collect();
        for (addr, logp) in sub.logps() {
            logps.insert(addr.prefixed(key.clone()), *logp);
        }
        let retval = trace.retval().set_leading(i, sub.retval().clone())?;
        Ok(Trace::new(
            &self.name,
            args.to_vec(),
            retval,
            ChoiceMap::Node(children),
            logps,
        ))
    }

    /// Apply one inner edit at batch position `i` of `trace`.
    fn edit_index(
        &self,
        key: PrngKey,
        trace: &Trace,
        n: usize,
        sliced: &[Vec<Value>],
        args: &[Value],
        i: usize,
        request: &EditRequest,
    ) -> GenResult<(Trace, f64, ChoiceMap)> {
        if i >= n {
            return Err(AddressError::IndexOutOfRange { index: i, size: n }.into());
        }
        let sub_trace = self.slice_trace(trace, &sliced[i], i)?;
        let outcome = self
            .inner
            .edit(key.child(i as u64), &sub_trace, request, &sliced[i])?;
        let new_trace = self.splice(trace, args, i, &outcome.trace)?;
        Ok((
            new_trace,
            outcome.weight,
            ChoiceMap::nest(Key::Idx(i), outcome.discard),
        ))
    }
}

impl<G: GenerativeFunction> GenerativeFunction for Vmap<G> {
    fn name(&self) -> &str {
        &self.name
    }

    fn simulate(&self, key: PrngKey, args: &[Value]) -> GenResult<Trace> {
        let specs = self.in_axes.spec_for(args, &self.name)?;
        let n = self.batch_size(&specs, args)?;
        if n == 0 {
            return Ok(self.empty_trace(args));
        }
        let keys = key.split(n);
        let sliced = self.sliced_args(&specs, args, n)?;
        let subs = (0..n)
            .into_par_iter()
            .map(|i| self.inner.simulate(keys[i], &sliced[i]))
            .collect::<GenResult<Vec<_>>>()?;
        Ok(self.assemble(args, subs))
    }

    fn importance(
        &self,
        key: PrngKey,
        constraint: &ChoiceMap,
        args: &[Value],
    ) -> GenResult<(Trace, f64)> {
        let specs = self.in_axes.spec_for(args, &self.name)?;
        let n = self.batch_size(&specs, args)?;
        if n == 0 {
            return Ok((self.empty_trace(args), 0.0));
        }
        let keys = key.split(n);
        let sliced = self.sliced_args(&specs, args, n)?;
        let pairs = (0..n)
            .into_par_iter()
            .map(|i| {
                // an index with no constraint behaves as plain simulate
                let sub_constraint = constraint.at(&Key::Idx(i));
                self.inner.importance(keys[i], sub_constraint, &sliced[i])
            })
            .collect::<GenResult<Vec<_>>>()?;
        let weight = pairs.iter().map(|(_, w)| w).sum();
        let subs = pairs.into_iter().map(|(tr, _)| tr).collect();
        Ok((self.assemble(args, subs), weight))
    }

    fn assess(&self, choices: &ChoiceMap, args: &[Value]) -> GenResult<(f64, Value)> {
        let specs = self.in_axes.spec_for(args, &self.name)?;
        let n = self.batch_size(&specs, args)?;
        let indices = choices.indices();
        if indices.len() != n || indices.iter().enumerate().any(|(i, idx)| i != *idx) {
            return Err(ShapeError::BatchChoiceMismatch {
                expected: n,
                actual: indices.len(),
            }
            .into());
        }
        let sliced = self.sliced_args(&specs, args, n)?;
        let results = (0..n)
            .into_par_iter()
            .map(|i| self.inner.assess(choices.at(&Key::Idx(i)), &sliced[i]))
            .collect::<GenResult<Vec<_>>>()?;
        let score = results.iter().map(|(s, _)| s).sum();
        let retvals = results.into_iter().map(|(_, v)| v).collect();
        Ok((score, Value::stack(retvals)))
    }

    fn edit(
        &self,
        key: PrngKey,
        trace: &Trace,
        request: &EditRequest,
        args: &[Value],
    ) -> GenResult<EditOutcome> {
        let specs = self.in_axes.spec_for(args, &self.name)?;
        let n = self.batch_size(&specs, args)?;
        let sliced = self.sliced_args(&specs, args, n)?;

        // gather (index, inner request) pairs; indices not mentioned stay
        // untouched and contribute zero weight
        let mut per_index: Vec<(usize, EditRequest)> = Vec::new();
        match request {
            EditRequest::Index(i, inner) => per_index.push((*i, (**inner).clone())),
            EditRequest::Update(constraint) => {
                if let ChoiceMap::Node(children) = constraint {
                    for child_key in children.keys() {
                        match child_key {
                            Key::Idx(i) => {
                                let sub = constraint.at(child_key).clone();
                                per_index.push((*i, EditRequest::Update(sub)));
                            }
                            other => {
                                return Err(AddressError::Malformed(Address::from(
                                    other.clone(),
                                ))
                                .into())
                            }
                        }
                    }
                } else if !constraint.static_is_empty() {
                    return Err(AddressError::Malformed(Address::root()).into());
                }
            }
            EditRequest::Regenerate(selection) => {
                for i in 0..n {
                    let sub = selection.descend(&Key::Idx(i));
                    if !sub.is_none() {
                        per_index.push((i, EditRequest::Regenerate(sub)));
                    }
                }
            }
            EditRequest::Static(requests) => {
                for (child_key, sub) in requests {
                    match child_key {
                        Key::Idx(i) => per_index.push((*i, sub.clone())),
                        other => {
                            return Err(
                                AddressError::Malformed(Address::from(other.clone())).into()
                            )
                        }
                    }
                }
            }
        }

        let mut current = trace.clone();
        let mut weight = 0.0;
        let mut discard = ChoiceMap::Empty;
        for (i, sub_request) in per_index {
            let (next, w, sub_discard) =
                self.edit_index(key, &current, n, &sliced, args, i, &sub_request)?;
            current = next;
            weight += w;
            discard = discard.merge(&sub_discard);
        }
        Ok(EditOutcome {
            trace: current,
            weight,
            backward: request.invert(&discard),
            discard,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addr;
    use crate::address::Selection;
    use crate::choices::C;
    use crate::dist::{normal, Normal};
    use crate::error::GenError;
    use crate::model::ModelFn;

    fn z_model() -> ModelFn {
        ModelFn::new("z_model", |t, args| {
            let x = args[0].as_f64(&addr!())?;
            let z = t.sample_f64(addr!("z"), &Normal, &[Value::F64(x), Value::F64(1.0)])?;
            Ok(Value::F64(z))
        })
    }

    fn arange(n: usize) -> Value {
        Value::floats((0..n).map(|i| i as f64))
    }

    #[test]
    fn test_simulate_score_is_sum_of_inner_scores() {
        let vmapped = Vmap::new(z_model(), InAxes::PerArg(vec![AxisSpec::Mapped(0)]));
        let tr = vmapped.simulate(PrngKey::new(314159), &[arange(50)]).unwrap();
        let inner_sum: f64 = tr.logps().values().sum();
        assert!((tr.score() - inner_sum).abs() < 1e-12);
        assert_eq!(tr.choices().indices().len(), 50);
    }

    #[test]
    fn test_project_all_and_none() {
        let vmapped = Vmap::new(z_model(), InAxes::PerArg(vec![AxisSpec::Mapped(0)]));
        let tr = vmapped.simulate(PrngKey::new(314159), &[arange(10)]).unwrap();
        assert_eq!(tr.project(&Selection::all()), tr.score());
        assert_eq!(tr.project(&Selection::none()), 0.0);
    }

    #[test]
    fn test_zero_length_batch() {
        let vmapped = Vmap::new(
            z_model(),
            InAxes::PerArg(vec![AxisSpec::Mapped(0)]),
        );
        let tr = vmapped.simulate(PrngKey::new(20), &[arange(0)]).unwrap();
        assert!(tr.choices().static_is_empty());
        assert_eq!(tr.score(), 0.0);
    }

    #[test]
    fn test_mapped_rank_zero_fails() {
        let vmapped = Vmap::new(
            z_model(),
            InAxes::PerArg(vec![AxisSpec::Mapped(0)]),
        );
        let err = vmapped
            .simulate(PrngKey::new(1), &[Value::F64(10.0)])
            .unwrap_err();
        assert!(matches!(
            err,
            GenError::Shape(ShapeError::MappedRankTooLow { .. })
        ));
    }

    #[test]
    fn test_in_axes_not_prefix_fails() {
        // Tree spec against a scalar argument
        let vmapped = Vmap::new(
            z_model(),
            InAxes::PerArg(vec![AxisSpec::Tree(vec![
                AxisSpec::Mapped(0),
                AxisSpec::Broadcast,
            ])]),
        );
        let err = vmapped
            .simulate(PrngKey::new(1), &[Value::F64(10.0)])
            .unwrap_err();
        assert!(matches!(
            err,
            GenError::Shape(ShapeError::AxesNotPrefix { argument: 0 })
        ));
    }

    #[test]
    fn test_batch_size_mismatch_fails() {
        let two_arg = ModelFn::new("two", |t, args| {
            let a = args[0].as_f64(&addr!())?;
            let b = args[1].as_f64(&addr!())?;
            let z = t.sample_f64(addr!("z"), &Normal, &[Value::F64(a + b), Value::F64(1.0)])?;
            Ok(Value::F64(z))
        });
        let vmapped = Vmap::mapped(two_arg);
        let err = vmapped
            .simulate(PrngKey::new(1), &[arange(2), arange(3)])
            .unwrap_err();
        assert!(matches!(
            err,
            GenError::Shape(ShapeError::BatchSizeMismatch { .. })
        ));
    }

    #[test]
    fn test_all_broadcast_fails() {
        let vmapped = Vmap::new(z_model(), InAxes::PerArg(vec![AxisSpec::Broadcast]));
        let err = vmapped.simulate(PrngKey::new(1), &[arange(3)]).unwrap_err();
        assert!(matches!(
            err,
            GenError::Shape(ShapeError::UnknownBatchSize)
        ));
    }

    #[test]
    fn test_importance_per_index_constraints() {
        let vmapped = Vmap::new(z_model(), InAxes::PerArg(vec![AxisSpec::Mapped(0)]));
        let constraint = C::at(addr!(0usize, "z"))
            .set(3.0)
            .merge(&C::at(addr!(1usize, "z")).set(2.0))
            .merge(&C::at(addr!(2usize, "z")).set(3.0));
        let (_, w) = vmapped
            .importance(PrngKey::new(314159), &constraint, &[arange(3)])
            .unwrap();
        let expected = Normal::logpdf(3.0, 0.0, 1.0)
            + Normal::logpdf(2.0, 1.0, 1.0)
            + Normal::logpdf(3.0, 2.0, 1.0);
        assert!((w - expected).abs() < 1e-12);
    }

    #[test]
    fn test_importance_single_index_constraint() {
        let vmapped = Vmap::new(z_model(), InAxes::PerArg(vec![AxisSpec::Mapped(0)]));
        let constraint = C::at(addr!(0usize, "z")).set(3.0);
        let (tr, w) = vmapped
            .importance(PrngKey::new(1), &constraint, &[arange(3)])
            .unwrap();
        assert!((w - Normal::logpdf(3.0, 0.0, 1.0)).abs() < 1e-12);
        assert_eq!(
            tr.choices().get_value(&addr!(0usize, "z")).unwrap(),
            Value::F64(3.0)
        );
    }

    #[test]
    fn test_assess_matches_simulate_score() {
        let vmapped = Vmap::new(z_model(), InAxes::PerArg(vec![AxisSpec::Mapped(0)]));
        let args = [arange(50)];
        let tr = vmapped.simulate(PrngKey::new(314159), &args).unwrap();
        let (score, _) = vmapped.assess(tr.choices(), &args).unwrap();
        assert!((score - tr.score()).abs() < 1e-12);
    }

    #[test]
    fn test_assess_wrong_index_count_fails() {
        let vmapped = Vmap::new(z_model(), InAxes::PerArg(vec![AxisSpec::Mapped(0)]));
        let choices = C::at(addr!(0usize, "z")).set(1.0);
        let err = vmapped.assess(&choices, &[arange(3)]).unwrap_err();
        assert!(matches!(
            err,
            GenError::Shape(ShapeError::BatchChoiceMismatch { .. })
        ));
    }

    #[test]
    fn test_index_edit_touches_one_index_only() {
        let vmapped = Vmap::new(z_model(), InAxes::PerArg(vec![AxisSpec::Mapped(0)]));
        let args = [arange(5)];
        let tr = vmapped.simulate(PrngKey::new(42), &args).unwrap();
        let req = EditRequest::index(2, EditRequest::Regenerate(Selection::all()));
        let out = vmapped.edit(PrngKey::new(43), &tr, &req, &args).unwrap();
        for i in 0..5 {
            let old = tr.choices().get_value(&addr!(i, "z")).unwrap();
            let new = out.trace.choices().get_value(&addr!(i, "z")).unwrap();
            if i == 2 {
                assert_ne!(old, new);
            } else {
                assert_eq!(old, new);
                assert_eq!(
                    tr.logps().get(&addr!(i, "z")),
                    out.trace.logps().get(&addr!(i, "z"))
                );
            }
        }
        assert!((out.weight - (out.trace.score() - tr.score())).abs() < 1e-12);
    }

    #[test]
    fn test_index_edit_out_of_range() {
        let vmapped = Vmap::new(z_model(), InAxes::PerArg(vec![AxisSpec::Mapped(0)]));
        let args = [arange(3)];
        let tr = vmapped.simulate(PrngKey::new(42), &args).unwrap();
        let req = EditRequest::index(9, EditRequest::Regenerate(Selection::all()));
        let err = vmapped.edit(PrngKey::new(43), &tr, &req, &args).unwrap_err();
        assert!(matches!(
            err,
            GenError::Address(AddressError::IndexOutOfRange { index: 9, size: 3 })
        ));
    }

    #[test]
    fn test_batch_wide_regenerate_via_wildcard() {
        let vmapped = Vmap::new(z_model(), InAxes::PerArg(vec![AxisSpec::Mapped(0)]));
        let args = [arange(4)];
        let tr = vmapped.simulate(PrngKey::new(42), &args).unwrap();
        let req = EditRequest::Regenerate(Selection::all());
        let out = vmapped.edit(PrngKey::new(43), &tr, &req, &args).unwrap();
        for i in 0..4 {
            let old = tr.choices().get_value(&addr!(i, "z")).unwrap();
            let new = out.trace.choices().get_value(&addr!(i, "z")).unwrap();
            assert_ne!(old, new);
        }
        assert!((out.weight - (out.trace.score() - tr.score())).abs() < 1e-12);
    }

    #[test]
    fn test_edit_backward_round_trip() {
        let vmapped = Vmap::new(z_model(), InAxes::PerArg(vec![AxisSpec::Mapped(0)]));
        let args = [arange(4)];
        let tr = vmapped.simulate(PrngKey::new(42), &args).unwrap();
        let req = EditRequest::index(1, EditRequest::Regenerate(Selection::all()));
        let out = vmapped.edit(PrngKey::new(43), &tr, &req, &args).unwrap();
        let undone = vmapped
            .edit(PrngKey::new(44), &out.trace, &out.backward, &args)
            .unwrap();
        assert_eq!(undone.trace.choices(), tr.choices());
        assert!((undone.trace.score() - tr.score()).abs() < 1e-12);
    }

    #[test]
    fn test_vmap_of_vmap_nested_constraint() {
        let inner = Vmap::new(z_model(), InAxes::PerArg(vec![AxisSpec::Mapped(0)]));
        let outer_model = ModelFn::new("higher", move |t, args| {
            t.call(addr!("outer"), &inner, &[args[0].clone()])
        });
        let higher = Vmap::new(outer_model, InAxes::PerArg(vec![AxisSpec::Mapped(0)]));
        // shape (3, 3) of ones
        let ones = Value::List(vec![
            Value::floats([1.0, 1.0, 1.0]),
            Value::floats([1.0, 1.0, 1.0]),
            Value::floats([1.0, 1.0, 1.0]),
        ]);
        let constraint = C::at(addr!(0usize, "outer", 1, "z")).set(1.0);
        let (tr, w) = higher
            .importance(PrngKey::new(314159), &constraint, &[ones])
            .unwrap();
        assert!((w - Normal::logpdf(1.0, 1.0, 1.0)).abs() < 1e-12);
        assert_eq!(
            tr.choices()
                .get_value(&addr!(0usize, "outer", 1, "z"))
                .unwrap(),
            Value::F64(1.0)
        );
    }

    #[test]
    fn test_vmap_of_distribution() {
        let vmapped = Vmap::mapped(normal());
        let args = [arange(8), Value::floats(std::iter::repeat(1.0).take(8))];
        let tr = vmapped.simulate(PrngKey::new(5), &args).unwrap();
        assert_eq!(tr.choices().indices().len(), 8);
        // vectorized read across the batch dimension
        let stacked = tr.choices().get_value(&Address::from(Key::All)).unwrap();
        match stacked {
            Value::List(items) => assert_eq!(items.len(), 8),
            other => panic!("expected list, got {other:?}"),
        }
        let (score, _) = vmapped.assess(tr.choices(), &args).unwrap();
        assert!((score - tr.score()).abs() < 1e-12);
    }
}
