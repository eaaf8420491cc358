//! TeeBee Filter
//! =============
//!
//! A stereo resonant filter modelled on the TB-303 diode ladder, with five
//! linear ladder responses alongside it. [`TeeBeeFilter`] is the
//! host-facing processor; [`StereoEngine`] is the block processor it wraps
//! and can be used on its own.

pub mod engine;
pub mod params;
pub mod plugin;

pub use engine::{StereoEngine, AUTOMATION_RAMP_SECONDS, MANUAL_RAMP_SECONDS, MAX_CHANNELS};
pub use params::{
    filter_layout, FilterParameterStore, FilterParameters, PARAM_AUTOMATION, PARAM_CUTOFF,
    PARAM_DRIVE, PARAM_FEEDBACK_AMOUNT, PARAM_FEEDBACK_HP, PARAM_MODE, PARAM_RESONANCE,
};
pub use plugin::{TeeBeeFilter, TeeBeeFilterFactory, DESCRIPTOR, PLUGIN_ID};
pub use teebee_dsp::FilterMode;
