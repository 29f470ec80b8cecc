//! Built-in primitive distributions
//!
//! Sampling delegates to `rand`/`rand_distr`; log-densities are the standard
//! closed forms. Parameters arrive as generative-function arguments and are
//! validated before any sampling.

use rand::distributions::WeightedIndex;
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::Distribution as RandDistribution;

use crate::address::Address;
use crate::error::{GenError, GenResult, ShapeError};
use crate::value::Value;

use super::{Dist, Distribution};

fn param_f64(name: &str, params: &[Value], i: usize) -> GenResult<f64> {
    match params.get(i) {
        Some(v) => v.as_f64(&Address::root()),
        None => Err(ShapeError::Arity {
            gen_fn: name.to_string(),
            expected: i + 1,
            actual: params.len(),
        }
        .into()),
    }
}

/// Gaussian with parameters `(mean, std)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Normal;

impl Normal {
    /// Log-density of `x` under `Normal(mean, std)`.
    pub fn logpdf(x: f64, mean: f64, std: f64) -> f64 {
        let z = (x - mean) / std;
        -0.5 * (2.0 * std::f64::consts::PI).ln() - std.ln() - 0.5 * z * z
    }
}

impl Distribution for Normal {
    fn name(&self) -> &'static str {
        "normal"
    }

    fn arity(&self) -> usize {
        2
    }

    fn sample(&self, rng: &mut StdRng, params: &[Value]) -> GenResult<Value> {
        let mean = param_f64("normal", params, 0)?;
        let std = param_f64("normal", params, 1)?;
        let dist = rand_distr::Normal::new(mean, std)
            .map_err(|e| GenError::InvalidParameter(format!("normal: {e}")))?;
        Ok(Value::F64(dist.sample(rng)))
    }

    fn log_density(&self, value: &Value, params: &[Value]) -> GenResult<f64> {
        let x = value.as_f64(&Address::root())?;
        let mean = param_f64("normal", params, 0)?;
        let std = param_f64("normal", params, 1)?;
        if std <= 0.0 {
            return Err(GenError::InvalidParameter(format!(
                "normal: std must be positive, got {std}"
            )));
        }
        Ok(Normal::logpdf(x, mean, std))
    }
}

/// Continuous uniform on `[lo, hi)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Uniform;

impl Distribution for Uniform {
    fn name(&self) -> &'static str {
        "uniform"
    }

    fn arity(&self) -> usize {
        2
    }

    fn sample(&self, rng: &mut StdRng, params: &[Value]) -> GenResult<Value> {
        let lo = param_f64("uniform", params, 0)?;
        let hi = param_f64("uniform", params, 1)?;
        if hi <= lo {
            return Err(GenError::InvalidParameter(format!(
                "uniform: requires lo < hi, got [{lo}, {hi})"
            )));
        }
        Ok(Value::F64(rng.gen_range(lo..hi)))
    }

    fn log_density(&self, value: &Value, params: &[Value]) -> GenResult<f64> {
        let x = value.as_f64(&Address::root())?;
        let lo = param_f64("uniform", params, 0)?;
        let hi = param_f64("uniform", params, 1)?;
        if hi <= lo {
            return Err(GenError::InvalidParameter(format!(
                "uniform: requires lo < hi, got [{lo}, {hi})"
            )));
        }
        if x >= lo && x < hi {
            Ok(-(hi - lo).ln())
        } else {
            Ok(f64::NEG_INFINITY)
        }
    }
}

/// Coin flip with success probability `p`, producing a boolean.
#[derive(Clone, Copy, Debug, Default)]
pub struct Bernoulli;

impl Distribution for Bernoulli {
    fn name(&self) -> &'static str {
        "bernoulli"
    }

    fn arity(&self) -> usize {
        1
    }

    fn sample(&self, rng: &mut StdRng, params: &[Value]) -> GenResult<Value> {
        let p = param_f64("bernoulli", params, 0)?;
        if !(0.0..=1.0).contains(&p) {
            return Err(GenError::InvalidParameter(format!(
                "bernoulli: p must be in [0, 1], got {p}"
            )));
        }
        Ok(Value::Bool(rng.gen::<f64>() < p))
    }

    fn log_density(&self, value: &Value, params: &[Value]) -> GenResult<f64> {
        let b = value.as_bool(&Address::root())?;
        let p = param_f64("bernoulli", params, 0)?;
        if !(0.0..=1.0).contains(&p) {
            return Err(GenError::InvalidParameter(format!(
                "bernoulli: p must be in [0, 1], got {p}"
            )));
        }
        Ok(if b { p.ln() } else { (1.0 - p).ln() })
    }
}

/// Discrete distribution over indices `0..k`, parameterized by a list of
/// non-negative weights. The sampled value is an integer index.
#[derive(Clone, Copy, Debug, Default)]
pub struct Categorical;

impl Categorical {
    fn weights(params: &[Value]) -> GenResult<Vec<f64>> {
        let list = match params.first() {
            Some(Value::List(items)) => items,
            Some(other) => {
                return Err(GenError::InvalidParameter(format!(
                    "categorical: weights must be a list, got {}",
                    other.kind()
                )))
            }
            None => {
                return Err(ShapeError::Arity {
                    gen_fn: "categorical".to_string(),
                    expected: 1,
                    actual: 0,
                }
                .into())
            }
        };
        let weights = list
            .iter()
            .map(|v| v.as_f64(&Address::root()))
            .collect::<GenResult<Vec<_>>>()?;
        if weights.iter().any(|w| *w < 0.0) || weights.iter().sum::<f64>() <= 0.0 {
            return Err(GenError::InvalidParameter(
                "categorical: weights must be non-negative with positive sum".to_string(),
            ));
        }
        Ok(weights)
    }
}

impl Distribution for Categorical {
    fn name(&self) -> &'static str {
        "categorical"
    }

    fn arity(&self) -> usize {
        1
    }

    fn sample(&self, rng: &mut StdRng, params: &[Value]) -> GenResult<Value> {
        let weights = Self::weights(params)?;
        let dist = WeightedIndex::new(&weights)
            .map_err(|e| GenError::InvalidParameter(format!("categorical: {e}")))?;
        Ok(Value::I64(dist.sample(rng) as i64))
    }

    fn log_density(&self, value: &Value, params: &[Value]) -> GenResult<f64> {
        let idx = value.as_i64(&Address::root())?;
        let weights = Self::weights(params)?;
        if idx < 0 || idx as usize >= weights.len() {
            return Ok(f64::NEG_INFINITY);
        }
        let total: f64 = weights.iter().sum();
        Ok((weights[idx as usize] / total).ln())
    }
}

/// The normal distribution as a generative function.
pub fn normal() -> Dist<Normal> {
    Dist::new(Normal)
}

/// The uniform distribution as a generative function.
pub fn uniform() -> Dist<Uniform> {
    Dist::new(Uniform)
}

/// The bernoulli distribution as a generative function.
pub fn bernoulli() -> Dist<Bernoulli> {
    Dist::new(Bernoulli)
}

/// The categorical distribution as a generative function.
pub fn categorical() -> Dist<Categorical> {
    Dist::new(Categorical)
}
