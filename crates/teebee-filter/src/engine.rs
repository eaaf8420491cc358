use teebee_dsp::ladder::MIN_SAMPLE_RATE;
use teebee_dsp::{FilterCore, FilterMode, LinearSmoother, NoDenormalsGuard};
use teebee_engine::AudioBuffer;

use crate::params::FilterParameters;

/// Ramp length used while the host is automating parameters.
pub const AUTOMATION_RAMP_SECONDS: f64 = 0.001;
/// Ramp length for manual (UI) parameter changes.
pub const MANUAL_RAMP_SECONDS: f64 = 0.05;
/// Channels that are filtered; any further channels pass through untouched.
pub const MAX_CHANNELS: usize = 2;

const PERCENT: f64 = 0.01;

#[inline]
fn ramp_seconds(automation: bool) -> f64 {
    if automation {
        AUTOMATION_RAMP_SECONDS
    } else {
        MANUAL_RAMP_SECONDS
    }
}

/// Per-sample values produced by [`Smoothers::next`], already in the units
/// [`FilterCore`] consumes.
#[derive(Debug, Clone, Copy)]
struct SmoothedValues {
    cutoff: f64,
    resonance: f64,
    drive_db: f64,
    feedback_hp: f64,
    feedback_amount: f64,
}

#[derive(Debug, Clone)]
struct Smoothers {
    cutoff: LinearSmoother,
    resonance: LinearSmoother,
    drive_db: LinearSmoother,
    feedback_hp: LinearSmoother,
    feedback_amount: LinearSmoother,
}

impl Smoothers {
    fn new(parameters: &FilterParameters) -> Self {
        let mut smoothers = Self {
            cutoff: LinearSmoother::default(),
            resonance: LinearSmoother::default(),
            drive_db: LinearSmoother::default(),
            feedback_hp: LinearSmoother::default(),
            feedback_amount: LinearSmoother::default(),
        };
        smoothers.snap_to(parameters);
        smoothers
    }

    fn all_mut(&mut self) -> [&mut LinearSmoother; 5] {
        [
            &mut self.cutoff,
            &mut self.resonance,
            &mut self.drive_db,
            &mut self.feedback_hp,
            &mut self.feedback_amount,
        ]
    }

    fn set_ramp(&mut self, sample_rate: f64, seconds: f64) {
        for smoother in self.all_mut() {
            smoother.set_ramp(sample_rate, seconds);
        }
    }

    fn finish_ramps(&mut self) {
        for smoother in self.all_mut() {
            smoother.set_current_and_target(smoother.target());
        }
    }

    fn snap_to(&mut self, parameters: &FilterParameters) {
        let targets = Self::targets(parameters);
        self.cutoff.set_current_and_target(targets.cutoff);
        self.resonance.set_current_and_target(targets.resonance);
        self.drive_db.set_current_and_target(targets.drive_db);
        self.feedback_hp.set_current_and_target(targets.feedback_hp);
        self.feedback_amount
            .set_current_and_target(targets.feedback_amount);
    }

    fn set_targets(&mut self, parameters: &FilterParameters) {
        let targets = Self::targets(parameters);
        self.cutoff.set_target(targets.cutoff);
        self.resonance.set_target(targets.resonance);
        self.drive_db.set_target(targets.drive_db);
        self.feedback_hp.set_target(targets.feedback_hp);
        self.feedback_amount.set_target(targets.feedback_amount);
    }

    #[inline]
    fn next(&mut self) -> SmoothedValues {
        SmoothedValues {
            cutoff: self.cutoff.next_value(),
            resonance: self.resonance.next_value(),
            drive_db: self.drive_db.next_value(),
            feedback_hp: self.feedback_hp.next_value(),
            feedback_amount: self.feedback_amount.next_value(),
        }
    }

    fn current(&self) -> SmoothedValues {
        SmoothedValues {
            cutoff: self.cutoff.current(),
            resonance: self.resonance.current(),
            drive_db: self.drive_db.current(),
            feedback_hp: self.feedback_hp.current(),
            feedback_amount: self.feedback_amount.current(),
        }
    }

    fn targets(parameters: &FilterParameters) -> SmoothedValues {
        SmoothedValues {
            cutoff: f64::from(parameters.cutoff_hz),
            resonance: f64::from(parameters.resonance_pct) * PERCENT,
            drive_db: f64::from(parameters.drive_db),
            feedback_hp: f64::from(parameters.feedback_hp_hz),
            feedback_amount: f64::from(parameters.feedback_amount_pct) * PERCENT,
        }
    }
}

/// Two independent [`FilterCore`]s driven by one set of smoothed parameters.
///
/// Targets are taken once per block; every smoother then advances exactly
/// once per frame and the result is pushed into both channels before they
/// process that frame.
#[derive(Debug, Clone)]
pub struct StereoEngine {
    sample_rate: f64,
    filters: [FilterCore; MAX_CHANNELS],
    smoothers: Smoothers,
    mode: FilterMode,
    automation: bool,
}

impl Default for StereoEngine {
    fn default() -> Self {
        Self::new(MIN_SAMPLE_RATE)
    }
}

impl StereoEngine {
    pub fn new(sample_rate: f64) -> Self {
        let mut engine = Self {
            sample_rate: MIN_SAMPLE_RATE,
            filters: [FilterCore::new(), FilterCore::new()],
            smoothers: Smoothers::new(&FilterParameters::default()),
            mode: FilterMode::default(),
            automation: false,
        };
        engine.prepare(sample_rate, &FilterParameters::default());
        engine
    }

    /// Applies a sample rate, snaps every parameter to `parameters` and
    /// clears all filter memories.
    ///
    /// Rates the filter cannot run at are logged and the previous rate is
    /// kept.
    pub fn prepare(&mut self, sample_rate: f64, parameters: &FilterParameters) {
        if self.filters[0].set_sample_rate(sample_rate) {
            self.filters[1].set_sample_rate(sample_rate);
            self.sample_rate = sample_rate;
        } else {
            tracing::warn!(
                sample_rate,
                kept = self.sample_rate,
                "sample rate rejected by filter"
            );
        }

        self.automation = parameters.automation;
        self.mode = parameters.mode;
        self.smoothers
            .set_ramp(self.sample_rate, ramp_seconds(self.automation));
        self.smoothers.snap_to(parameters);
        self.apply(self.smoothers.current());
        for filter in &mut self.filters {
            filter.reset();
        }
    }

    /// Clears filter memories and finishes any running parameter ramp.
    pub fn reset(&mut self) {
        self.smoothers.finish_ramps();
        self.apply(self.smoothers.current());
        for filter in &mut self.filters {
            filter.reset();
        }
    }

    pub fn process_block(&mut self, parameters: &FilterParameters, buffer: &mut AudioBuffer) {
        let _guard = NoDenormalsGuard::new();
        self.begin_block(parameters);

        let frames = buffer.len();
        let channels = buffer.as_mut_slice();
        let active = channels.len().min(MAX_CHANNELS);
        for frame in 0..frames {
            let values = self.smoothers.next();
            self.apply(values);
            for (channel, filter) in channels[..active].iter_mut().zip(self.filters.iter_mut()) {
                if let Some(sample) = channel.get_mut(frame) {
                    *sample = filter.process_sample(*sample);
                }
            }
        }
    }

    /// Processes a single stereo frame. Equivalent to a one-frame block.
    pub fn process_frame(
        &mut self,
        parameters: &FilterParameters,
        left: f32,
        right: f32,
    ) -> (f32, f32) {
        let _guard = NoDenormalsGuard::new();
        self.begin_block(parameters);
        let values = self.smoothers.next();
        self.apply(values);
        let [l, r] = &mut self.filters;
        (l.process_sample(left), r.process_sample(right))
    }

    pub fn channel(&self, index: usize) -> Option<&FilterCore> {
        self.filters.get(index)
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn automation(&self) -> bool {
        self.automation
    }

    fn begin_block(&mut self, parameters: &FilterParameters) {
        if parameters.automation != self.automation {
            self.automation = parameters.automation;
            self.smoothers
                .set_ramp(self.sample_rate, ramp_seconds(self.automation));
        }
        self.mode = parameters.mode;
        self.smoothers.set_targets(parameters);
    }

    #[inline]
    fn apply(&mut self, values: SmoothedValues) {
        for filter in &mut self.filters {
            filter.set_cutoff(values.cutoff);
            filter.set_resonance(values.resonance);
            filter.set_drive_db(values.drive_db);
            filter.set_feedback_hp(values.feedback_hp);
            filter.set_feedback_amount(values.feedback_amount);
            filter.set_mode(self.mode);
        }
    }
}
