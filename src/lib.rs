//! # gentrace
//!
//! A trace-based probabilistic programming library for Rust.
//!
//! Probabilistic programs are ordinary Rust closures that record random
//! choices at named addresses into an immutable [`trace::Trace`]. Every
//! generative function supports the same small capability surface:
//! sampling a fresh trace, scoring constrained executions, and applying
//! typed incremental edits with exact log-weight accounting.
//!
//! ## Core Concepts
//!
//! - **Addressed choices**: every random choice lives at a hierarchical
//!   [`address::Address`]; executions are persistent [`choices::ChoiceMap`]s
//! - **Exact weights**: `importance` and `edit` return log-weights derived
//!   from per-choice density ledgers, never from approximations
//! - **Combinators**: [`combinators::Vmap`] lifts any generative function
//!   across a batch axis with per-index independence
//!
//! ## Quick Start
//!
//! ```rust
//! use gentrace::prelude::*;
//!
//! let model = ModelFn::new("line", |t, args| {
//!     let x = args[0].as_f64(&addr!())?;
//!     let slope = t.sample_f64(addr!("slope"), &Normal, &[0.0.into(), 1.0.into()])?;
//!     let y = t.sample_f64(addr!("y"), &Normal, &[(slope * x).into(), 0.1.into()])?;
//!     Ok(Value::F64(y))
//! });
//!
//! let trace = model.simulate(PrngKey::new(42), &[Value::F64(2.0)])?;
//! let slope = trace.choices().get_value(&addr!("slope"))?;
//! # Ok::<(), gentrace::error::GenError>(())
//! ```

pub mod address;
pub mod choices;
pub mod combinators;
pub mod dist;
pub mod error;
pub mod gfi;
pub mod model;
pub mod rng;
pub mod trace;
pub mod value;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::addr;
    pub use crate::address::{Address, Key, Selection};
    pub use crate::choices::{ChoiceMap, C};
    pub use crate::combinators::{AxisSpec, InAxes, Vmap};
    pub use crate::dist::{
        bernoulli, categorical, normal, uniform, Bernoulli, Categorical, Dist, Distribution,
        Normal, Uniform,
    };
    pub use crate::error::{GenError, GenResult};
    pub use crate::gfi::{EditOutcome, EditRequest, GenerativeFunction};
    pub use crate::model::{ModelFn, Tracer};
    pub use crate::rng::PrngKey;
    pub use crate::trace::Trace;
    pub use crate::value::Value;
}
