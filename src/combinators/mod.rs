//! Combinators over generative functions

pub mod vmap;

pub use vmap::{AxisSpec, InAxes, Vmap};
