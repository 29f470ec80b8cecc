//! Composite generative programs
//!
//! A [`ModelFn`] wraps a user program: a closure that samples primitive
//! choices and calls nested generative functions through a [`Tracer`]
//! handle. The same program is replayed under a different tracer mode for
//! each capability: fresh sampling for `simulate`, constrained sampling for
//! `importance`, pure density accumulation for `assess`, and structural
//! request navigation for `edit`.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::address::Address;
use crate::choices::ChoiceMap;
use crate::dist::Distribution;
use crate::error::{AddressError, GenError, GenResult, ShapeError};
use crate::gfi::{EditOutcome, EditRequest, GenerativeFunction};
use crate::rng::PrngKey;
use crate::trace::Trace;
use crate::value::Value;

type Program = dyn Fn(&mut Tracer<'_>, &[Value]) -> GenResult<Value> + Send + Sync;

/// A named generative function defined by a program closure.
pub struct ModelFn {
    name: String,
    program: Arc<Program>,
}

impl Clone for ModelFn {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            program: Arc::clone(&self.program),
        }
    }
}

impl std::fmt::Debug for ModelFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelFn").field("name", &self.name).finish()
    }
}

impl ModelFn {
    /// Define a generative function from a program closure.
    pub fn new<F>(name: impl Into<String>, program: F) -> Self
    where
        F: Fn(&mut Tracer<'_>, &[Value]) -> GenResult<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            program: Arc::new(program),
        }
    }

    fn run<'m>(
        &self,
        mode: Mode<'m>,
        key: PrngKey,
        args: &[Value],
    ) -> GenResult<(Tracer<'m>, Value)> {
        let mut tracer = Tracer::new(mode, key);
        let retval = (self.program)(&mut tracer, args)?;
        Ok((tracer, retval))
    }
}

impl GenerativeFunction for ModelFn {
    fn name(&self) -> &str {
        &self.name
    }

    fn simulate(&self, key: PrngKey, args: &[Value]) -> GenResult<Trace> {
        let (tracer, retval) = self.run(Mode::Simulate, key, args)?;
        Ok(Trace::new(
            &self.name,
            args.to_vec(),
            retval,
            tracer.choices,
            tracer.logps,
        ))
    }

    fn importance(
        &self,
        key: PrngKey,
        constraint: &ChoiceMap,
        args: &[Value],
    ) -> GenResult<(Trace, f64)> {
        let (tracer, retval) = self.run(Mode::Importance { constraint }, key, args)?;
        let weight = tracer.weight;
        Ok((
            Trace::new(&self.name, args.to_vec(), retval, tracer.choices, tracer.logps),
            weight,
        ))
    }

    fn assess(&self, choices: &ChoiceMap, args: &[Value]) -> GenResult<(f64, Value)> {
        let (tracer, retval) = self.run(Mode::Assess { choices }, PrngKey::new(0), args)?;
        Ok((tracer.score, retval))
    }

    fn edit(
        &self,
        key: PrngKey,
        trace: &Trace,
        request: &EditRequest,
        args: &[Value],
    ) -> GenResult<EditOutcome> {
        let (tracer, retval) = self.run(Mode::Edit { prev: trace, request }, key, args)?;
        let weight = tracer.weight;
        let discard = tracer.discard;
        let new_trace = Trace::new(
            &self.name,
            args.to_vec(),
            retval,
            tracer.choices,
            tracer.logps,
        );
        Ok(EditOutcome {
            trace: new_trace,
            weight,
            backward: request.invert(&discard),
            discard,
        })
    }
}

enum Mode<'a> {
    Simulate,
    Importance { constraint: &'a ChoiceMap },
    Assess { choices: &'a ChoiceMap },
    Edit { prev: &'a Trace, request: &'a EditRequest },
}

/// What one primitive sample site sees of the execution mode.
enum SiteMode {
    Simulate,
    Importance {
        fixed: Option<Value>,
    },
    Assess {
        value: Option<Value>,
    },
    Edit {
        governing: Option<EditRequest>,
        old_value: Option<Value>,
        old_logp: f64,
    },
}

/// What one nested-call site sees of the execution mode.
enum CallMode {
    Simulate,
    Importance {
        sub_constraint: ChoiceMap,
    },
    Assess {
        sub_choices: ChoiceMap,
    },
    Edit {
        governing: EditRequest,
        prev_sub_choices: ChoiceMap,
        sub_logps: BTreeMap<Address, f64>,
    },
}

/// The interpreter handle a program samples through.
///
/// One tracer exists per execution; its mode decides what `sample` and
/// `call` do at each address. Child random keys derive from the execution
/// key by a lane counter, so a replay visits the same key sequence.
pub struct Tracer<'a> {
    mode: Mode<'a>,
    key: PrngKey,
    lane: u64,
    choices: ChoiceMap,
    logps: BTreeMap<Address, f64>,
    score: f64,
    weight: f64,
    discard: ChoiceMap,
    visited: BTreeSet<Address>,
}

impl<'a> Tracer<'a> {
    fn new(mode: Mode<'a>, key: PrngKey) -> Self {
        Self {
            mode,
            key,
            lane: 0,
            choices: ChoiceMap::Empty,
            logps: BTreeMap::new(),
            score: 0.0,
            weight: 0.0,
            discard: ChoiceMap::Empty,
            visited: BTreeSet::new(),
        }
    }

    fn next_key(&mut self) -> PrngKey {
        let key = self.key.child(self.lane);
        self.lane += 1;
        key
    }

    fn visit(&mut self, addr: &Address) -> GenResult<()> {
        if !self.visited.insert(addr.clone()) {
            return Err(AddressError::Duplicate(addr.clone()).into());
        }
        Ok(())
    }

    fn record(&mut self, addr: &Address, value: &Value, logp: f64) {
        self.choices = self.choices.set(addr, value.clone());
        self.logps.insert(addr.clone(), logp);
        self.score += logp;
    }

    fn site_mode(&self, addr: &Address) -> SiteMode {
        match &self.mode {
            Mode::Simulate => SiteMode::Simulate,
            Mode::Importance { constraint } => SiteMode::Importance {
                fixed: constraint.at_addr(addr).as_leaf().cloned(),
            },
            Mode::Assess { choices } => SiteMode::Assess {
                value: choices.at_addr(addr).as_leaf().cloned(),
            },
            Mode::Edit { prev, request } => SiteMode::Edit {
                governing: descend_addr(request, addr),
                old_value: prev.choices().at_addr(addr).as_leaf().cloned(),
                old_logp: prev.logps().get(addr).copied().unwrap_or(0.0),
            },
        }
    }

    fn call_mode(&self, addr: &Address) -> CallMode {
        match &self.mode {
            Mode::Simulate => CallMode::Simulate,
            Mode::Importance { constraint } => CallMode::Importance {
                sub_constraint: constraint.at_addr(addr).clone(),
            },
            Mode::Assess { choices } => CallMode::Assess {
                sub_choices: choices.at_addr(addr).clone(),
            },
            Mode::Edit { prev, request } => {
                let mut sub_logps = BTreeMap::new();
                for (full_addr, logp) in prev.logps() {
                    if let Some(stripped) = strip_addr_prefix(full_addr, addr) {
                        sub_logps.insert(stripped, *logp);
                    }
                }
                CallMode::Edit {
                    governing: descend_addr(request, addr)
                        .unwrap_or(EditRequest::Update(ChoiceMap::Empty)),
                    prev_sub_choices: prev.choices().at_addr(addr).clone(),
                    sub_logps,
                }
            }
        }
    }

    /// Record one primitive choice at `addr`.
    pub fn sample<D: Distribution>(
        &mut self,
        addr: impl Into<Address>,
        dist: &D,
        params: &[Value],
    ) -> GenResult<Value> {
        let addr = addr.into();
        if params.len() != dist.arity() {
            return Err(ShapeError::Arity {
                gen_fn: dist.name().to_string(),
                expected: dist.arity(),
                actual: params.len(),
            }
            .into());
        }
        self.visit(&addr)?;
        let site = self.site_mode(&addr);
        // every site consumes a lane, so replays stay aligned
        let site_key = self.next_key();

        let (value, logp) = match site {
            SiteMode::Simulate => {
                let mut rng = site_key.rng();
                let value = dist.sample(&mut rng, params)?;
                let logp = dist.log_density(&value, params)?;
                (value, logp)
            }
            SiteMode::Importance { fixed } => match fixed {
                Some(value) => {
                    let logp = dist.log_density(&value, params)?;
                    self.weight += logp;
                    (value, logp)
                }
                None => {
                    let mut rng = site_key.rng();
                    let value = dist.sample(&mut rng, params)?;
                    let logp = dist.log_density(&value, params)?;
                    (value, logp)
                }
            },
            SiteMode::Assess { value } => {
                let value = value.ok_or_else(|| AddressError::Missing(addr.clone()))?;
                let logp = dist.log_density(&value, params)?;
                (value, logp)
            }
            SiteMode::Edit {
                governing,
                old_value,
                old_logp,
            } => match governing {
                Some(EditRequest::Update(constraint)) => {
                    let new_value = constraint
                        .as_leaf()
                        .ok_or_else(|| AddressError::Malformed(addr.clone()))?
                        .clone();
                    let logp = dist.log_density(&new_value, params)?;
                    self.weight += logp - old_logp;
                    if let Some(old) = old_value {
                        self.discard = self.discard.set(&addr, old);
                    }
                    (new_value, logp)
                }
                Some(EditRequest::Regenerate(selection))
                    if selection.matches(&Address::root()) =>
                {
                    let mut rng = site_key.rng();
                    let new_value = dist.sample(&mut rng, params)?;
                    let logp = dist.log_density(&new_value, params)?;
                    // self-proposal: prior density cancels exactly
                    self.weight += logp - old_logp;
                    if let Some(old) = old_value {
                        self.discard = self.discard.set(&addr, old);
                    }
                    (new_value, logp)
                }
                Some(EditRequest::Regenerate(_)) | None => match old_value {
                    Some(value) => {
                        let logp = dist.log_density(&value, params)?;
                        self.weight += logp - old_logp;
                        (value, logp)
                    }
                    None => {
                        // address new to this execution
                        let mut rng = site_key.rng();
                        let value = dist.sample(&mut rng, params)?;
                        let logp = dist.log_density(&value, params)?;
                        self.weight += logp;
                        (value, logp)
                    }
                },
                Some(other) => {
                    return Err(GenError::InvalidRequest(format!(
                        "request {other:?} does not apply to primitive address {addr}"
                    )))
                }
            },
        };

        self.record(&addr, &value, logp);
        Ok(value)
    }

    /// Record one primitive choice and read it back as an `f64`.
    pub fn sample_f64<D: Distribution>(
        &mut self,
        addr: impl Into<Address>,
        dist: &D,
        params: &[Value],
    ) -> GenResult<f64> {
        let addr = addr.into();
        let value = self.sample(addr.clone(), dist, params)?;
        value.as_f64(&addr)
    }

    /// Invoke a nested generative function at `addr`, nesting its choices
    /// under that address prefix.
    pub fn call<G: GenerativeFunction + ?Sized>(
        &mut self,
        addr: impl Into<Address>,
        gen_fn: &G,
        args: &[Value],
    ) -> GenResult<Value> {
        let addr = addr.into();
        self.visit(&addr)?;
        let call = self.call_mode(&addr);
        let sub_key = self.next_key();

        match call {
            CallMode::Simulate => {
                let sub = gen_fn.simulate(sub_key, args)?;
                let retval = sub.retval().clone();
                self.absorb(&addr, sub.choices().clone(), sub.logps());
                Ok(retval)
            }
            CallMode::Importance { sub_constraint } => {
                let (sub, w) = gen_fn.importance(sub_key, &sub_constraint, args)?;
                self.weight += w;
                let retval = sub.retval().clone();
                self.absorb(&addr, sub.choices().clone(), sub.logps());
                Ok(retval)
            }
            CallMode::Assess { sub_choices } => {
                let (score, retval) = gen_fn.assess(&sub_choices, args)?;
                self.score += score;
                Ok(retval)
            }
            CallMode::Edit {
                governing,
                prev_sub_choices,
                sub_logps,
            } => {
                if prev_sub_choices.static_is_empty() {
                    // sub-call new to this execution
                    let sub = gen_fn.simulate(sub_key, args)?;
                    self.weight += sub.score();
                    let retval = sub.retval().clone();
                    self.absorb(&addr, sub.choices().clone(), sub.logps());
                    return Ok(retval);
                }
                // the previous return value is recovered by a pure replay
                let (_, prev_retval) = gen_fn.assess(&prev_sub_choices, args)?;
                let sub_trace = Trace::new(
                    gen_fn.name(),
                    args.to_vec(),
                    prev_retval,
                    prev_sub_choices,
                    sub_logps,
                );
                let outcome = gen_fn.edit(sub_key, &sub_trace, &governing, args)?;
                self.weight += outcome.weight;
                self.discard = self.discard.merge(&nest_under(&addr, outcome.discard));
                let retval = outcome.trace.retval().clone();
                self.absorb(&addr, outcome.trace.choices().clone(), outcome.trace.logps());
                Ok(retval)
            }
        }
    }

    fn absorb(&mut self, addr: &Address, choices: ChoiceMap, logps: &BTreeMap<Address, f64>) {
        self.choices = self.choices.merge(&nest_under(addr, choices));
        for (sub_addr, logp) in logps {
            let mut full = addr.clone();
            for key in sub_addr.keys() {
                full = full.push(key.clone());
            }
            self.logps.insert(full, *logp);
            self.score += logp;
        }
    }
}

fn strip_addr_prefix(full: &Address, prefix: &Address) -> Option<Address> {
    let mut rest = full.clone();
    for key in prefix.keys() {
        rest = rest.strip_prefix(key)?;
    }
    Some(rest)
}

fn nest_under(addr: &Address, map: ChoiceMap) -> ChoiceMap {
    let mut out = map;
    for key in addr.keys().iter().rev() {
        out = ChoiceMap::nest(key.clone(), out);
    }
    out
}

fn descend_addr(request: &EditRequest, addr: &Address) -> Option<EditRequest> {
    let mut cur = request.clone();
    for key in addr.keys() {
        cur = cur.descend(key)?;
    }
    Some(cur)
}
