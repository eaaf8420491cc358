#![deny(unsafe_op_in_unsafe_fn)]

//! DSP building blocks for the TeeBee diode ladder filter.
//!
//! Everything in this crate is allocation free and safe to call from the
//! audio thread.

pub mod dc;
pub mod ladder;
pub mod saturator;
pub mod smoothing;
pub mod utils;

pub use dc::DcBlocker;
pub use ladder::{FilterCore, FilterMode, StageMix, Topology};
pub use smoothing::{LinearSmoother, OnePole};
pub use utils::NoDenormalsGuard;
