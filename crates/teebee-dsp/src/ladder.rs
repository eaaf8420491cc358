//! Four stage diode ladder with a high-passed feedback loop.
//!
//! One [`FilterCore`] processes one channel. All state is kept in `f64`;
//! only the per-sample entry point speaks `f32`.

use core::f64::consts::TAU;

use crate::dc::DcBlocker;
use crate::saturator::soft_clip;
use crate::smoothing::OnePole;

pub const MIN_CUTOFF_HZ: f64 = 20.0;
pub const MAX_CUTOFF_HZ: f64 = 20_000.0;
pub const MIN_DRIVE_DB: f64 = -60.0;
pub const MAX_DRIVE_DB: f64 = 60.0;
/// Rates below this are rejected by [`FilterCore::set_sample_rate`].
pub const MIN_SAMPLE_RATE: f64 = 44_100.0;
/// Internal headroom: every stage, feedback term and output is kept in ±2.
pub const HEADROOM: f64 = 2.0;

// Calibration constants. They define the voice of the filter.
const INPUT_SCALE: f64 = 0.125;
const DRIVE_BASE: f64 = 0.25;
const OUTPUT_PRE_GAIN: f64 = 0.8;
const OUTPUT_MAKEUP: f64 = 1.25;
const FEEDBACK_LP_COEFF: f64 = 0.1;
const LINEAR_FEEDBACK_GAIN: f64 = 0.7;
const DIODE_RESONANCE_BOOST: f64 = 1.5;
const MIX_GAIN: f64 = 5.0;
const ANTI_STALL_BIAS: f64 = 1e-12;

/// Response shape of the filter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FilterMode {
    #[default]
    Tb303,
    LowPass24,
    LowPass18,
    LowPass12,
    HighPass12,
    Flat,
}

impl FilterMode {
    pub const ALL: [FilterMode; 6] = [
        FilterMode::Tb303,
        FilterMode::LowPass24,
        FilterMode::LowPass18,
        FilterMode::LowPass12,
        FilterMode::HighPass12,
        FilterMode::Flat,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        match self {
            FilterMode::Tb303 => 0,
            FilterMode::LowPass24 => 1,
            FilterMode::LowPass18 => 2,
            FilterMode::LowPass12 => 3,
            FilterMode::HighPass12 => 4,
            FilterMode::Flat => 5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FilterMode::Tb303 => "TB-303",
            FilterMode::LowPass24 => "LP 24dB",
            FilterMode::LowPass18 => "LP 18dB",
            FilterMode::LowPass12 => "LP 12dB",
            FilterMode::HighPass12 => "HP 12dB",
            FilterMode::Flat => "Flat",
        }
    }

    /// Weights applied to `[y0, y1, y2, y3, y4]` by the linear ladder.
    pub fn mix(self) -> StageMix {
        match self {
            FilterMode::Tb303 | FilterMode::LowPass24 => StageMix::new([0.0, 0.0, 0.0, 0.0, 1.0]),
            FilterMode::LowPass18 => StageMix::new([0.0, 0.0, 0.0, 1.0, 0.0]),
            FilterMode::LowPass12 => StageMix::new([0.0, 0.0, 1.0, 0.0, 0.0]),
            FilterMode::HighPass12 => StageMix::new([1.0, -2.0, 1.0, 0.0, 0.0]),
            FilterMode::Flat => StageMix::new([1.0, 0.0, 0.0, 0.0, 0.0]),
        }
    }

    pub fn topology(self) -> Topology {
        match self {
            FilterMode::Tb303 => Topology::Diode,
            _ => Topology::Linear,
        }
    }
}

/// Which ladder the per-sample loop runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Topology {
    /// Explicit Euler integration of saturating one-poles.
    Diode,
    /// Linear one-poles mixed through a [`StageMix`].
    Linear,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StageMix([f64; 5]);

impl StageMix {
    pub const fn new(coefficients: [f64; 5]) -> Self {
        Self(coefficients)
    }

    /// `5 * (c0*y0 + c1*y1 + c2*y2 + c3*y3 + c4*y4)`.
    #[inline]
    pub fn combine(&self, taps: &[f64; 5]) -> f64 {
        let [c0, c1, c2, c3, c4] = self.0;
        let [y0, y1, y2, y3, y4] = *taps;
        MIX_GAIN * (c0 * y0 + c1 * y1 + c2 * y2 + c3 * y3 + c4 * y4)
    }
}

/// One-pole high-pass living inside the feedback loop.
#[derive(Clone, Copy, Debug)]
struct FeedbackHighPass {
    a0: f64,
    a1: f64,
    b1: f64,
    x1: f64,
    z1: f64,
}

impl FeedbackHighPass {
    fn new() -> Self {
        Self {
            a0: 1.0,
            a1: -1.0,
            b1: 0.0,
            x1: 0.0,
            z1: 0.0,
        }
    }

    fn set_cutoff(&mut self, sample_rate: f64, cutoff_hz: f64) {
        let x = (-TAU * cutoff_hz / sample_rate).exp();
        self.a0 = 1.0 + x;
        self.a1 = -(1.0 + x);
        self.b1 = -x;
    }

    #[inline]
    fn process(&mut self, input: f64) -> f64 {
        let y = self.a0 * input + self.a1 * self.x1 - self.b1 * self.z1;
        self.x1 = input;
        self.z1 = y.clamp(-HEADROOM, HEADROOM);
        self.z1
    }

    fn reset(&mut self) {
        self.x1 = 0.0;
        self.z1 = 0.0;
    }

    fn heal(&mut self) {
        if !(self.x1.is_finite() && self.z1.is_finite()) {
            self.reset();
        }
    }
}

/// Single channel resonant ladder filter.
#[derive(Clone, Debug)]
pub struct FilterCore {
    sample_rate: f64,
    cutoff: f64,
    resonance: f64,
    drive_db: f64,
    feedback_hp: f64,
    feedback_amount: f64,
    mode: FilterMode,
    mix: StageMix,
    topology: Topology,
    a1: f64,
    b0: f64,
    k: f64,
    drive_factor: f64,
    stages: [f64; 4],
    feedback_lp: OnePole,
    feedback_hpf: FeedbackHighPass,
    dc: DcBlocker,
}

impl Default for FilterCore {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterCore {
    pub fn new() -> Self {
        let mode = FilterMode::default();
        let mut filter = Self {
            sample_rate: MIN_SAMPLE_RATE,
            cutoff: 1_000.0,
            resonance: 0.2,
            drive_db: 0.0,
            feedback_hp: 300.0,
            feedback_amount: 0.5,
            mode,
            mix: mode.mix(),
            topology: mode.topology(),
            a1: 0.0,
            b0: 0.0,
            k: 0.0,
            drive_factor: drive_factor(0.0),
            stages: [0.0; 4],
            feedback_lp: OnePole::with_coeff(FEEDBACK_LP_COEFF),
            feedback_hpf: FeedbackHighPass::new(),
            dc: DcBlocker::new(),
        };
        filter.update_coefficients();
        filter.update_feedback_hp();
        filter
    }

    /// Applies a new sample rate and clears all memories.
    ///
    /// Rates below [`MIN_SAMPLE_RATE`] are ignored and `false` is returned.
    pub fn set_sample_rate(&mut self, sample_rate: f64) -> bool {
        if !(sample_rate.is_finite() && sample_rate >= MIN_SAMPLE_RATE) {
            return false;
        }
        self.sample_rate = sample_rate;
        self.update_feedback_hp();
        self.update_coefficients();
        self.reset();
        true
    }

    /// Clears every memory; parameters and coefficients are left alone.
    pub fn reset(&mut self) {
        self.stages = [0.0; 4];
        self.feedback_lp.reset(0.0);
        self.feedback_hpf.reset();
        self.dc.reset();
    }

    pub fn set_cutoff(&mut self, cutoff_hz: f64) {
        let Some(cutoff) = sanitize(cutoff_hz, MIN_CUTOFF_HZ, MAX_CUTOFF_HZ) else {
            return;
        };
        if cutoff != self.cutoff {
            self.cutoff = cutoff;
            self.update_coefficients();
        }
    }

    pub fn set_resonance(&mut self, resonance: f64) {
        let Some(resonance) = sanitize(resonance, 0.0, 1.0) else {
            return;
        };
        if resonance != self.resonance {
            self.resonance = resonance;
            self.update_coefficients();
        }
    }

    pub fn set_drive_db(&mut self, drive_db: f64) {
        let Some(drive_db) = sanitize(drive_db, MIN_DRIVE_DB, MAX_DRIVE_DB) else {
            return;
        };
        if drive_db != self.drive_db {
            self.drive_db = drive_db;
            self.drive_factor = drive_factor(drive_db);
        }
    }

    pub fn set_mode(&mut self, mode: FilterMode) {
        if mode == self.mode {
            return;
        }
        self.mode = mode;
        self.mix = mode.mix();
        self.topology = mode.topology();
        self.update_coefficients();
    }

    /// Host facing variant of [`Self::set_mode`]; unknown indices are ignored.
    pub fn set_mode_index(&mut self, index: usize) {
        if let Some(mode) = FilterMode::from_index(index) {
            self.set_mode(mode);
        }
    }

    pub fn set_feedback_hp(&mut self, cutoff_hz: f64) {
        let Some(cutoff) = sanitize(cutoff_hz, MIN_CUTOFF_HZ, MAX_CUTOFF_HZ) else {
            return;
        };
        if cutoff != self.feedback_hp {
            self.feedback_hp = cutoff;
            self.update_feedback_hp();
        }
    }

    pub fn set_feedback_amount(&mut self, amount: f64) {
        if let Some(amount) = sanitize(amount, 0.0, 1.0) {
            self.feedback_amount = amount;
        }
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    pub fn resonance(&self) -> f64 {
        self.resonance
    }

    pub fn drive_db(&self) -> f64 {
        self.drive_db
    }

    pub fn feedback_hp(&self) -> f64 {
        self.feedback_hp
    }

    pub fn feedback_amount(&self) -> f64 {
        self.feedback_amount
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    /// Resonance feedback gain `k` currently in use.
    pub fn feedback_gain(&self) -> f64 {
        self.k
    }

    /// Ladder stage outputs `[y1, y2, y3, y4]`.
    pub fn stages(&self) -> [f64; 4] {
        self.stages
    }

    #[inline]
    pub fn process_sample(&mut self, sample: f32) -> f32 {
        let x = f64::from(sample);
        let x = if x.is_finite() { x } else { 0.0 };
        let input = (x * INPUT_SCALE * self.drive_factor).clamp(-HEADROOM, HEADROOM);

        let y4 = self.stages[3];
        let feedback = self.k * self.feedback_amount * y4;
        let feedback = self.feedback_lp.next(feedback).clamp(-HEADROOM, HEADROOM);
        let feedback = self.feedback_hpf.process(feedback);

        let mut y0 = input - feedback + ANTI_STALL_BIAS;
        let out = match self.topology {
            Topology::Diode => {
                y0 -= self.k * self.feedback_amount * y4;
                self.run_diode_ladder(y0);
                self.stages[3]
            }
            Topology::Linear => {
                y0 -= self.k * self.feedback_amount * LINEAR_FEEDBACK_GAIN * y4;
                self.run_linear_ladder(y0);
                let [y1, y2, y3, y4] = self.stages;
                self.mix.combine(&[y0, y1, y2, y3, y4])
            }
        };

        let out = (soft_clip(out * OUTPUT_PRE_GAIN) * OUTPUT_MAKEUP).clamp(-HEADROOM, HEADROOM);
        let out = self.dc.process(out);
        self.heal_memories();

        let out = out.clamp(-HEADROOM, HEADROOM) as f32;
        if out.is_finite() {
            out
        } else {
            0.0
        }
    }

    #[inline]
    fn run_diode_ladder(&mut self, y0: f64) {
        let b0 = self.b0;
        let mut previous = y0;
        for stage in &mut self.stages {
            *stage += b0 * (soft_clip(previous) - soft_clip(*stage));
            previous = *stage;
        }
        self.settle_stages();
    }

    #[inline]
    fn run_linear_ladder(&mut self, y0: f64) {
        let a1 = self.a1;
        let mut previous = y0;
        for stage in &mut self.stages {
            *stage = previous + a1 * (previous - *stage);
            previous = *stage;
        }
        self.settle_stages();
    }

    #[inline]
    fn settle_stages(&mut self) {
        for stage in &mut self.stages {
            *stage = stage.clamp(-HEADROOM, HEADROOM);
            if !stage.is_finite() {
                *stage = 0.0;
            }
        }
    }

    #[inline]
    fn heal_memories(&mut self) {
        if !self.feedback_lp.state().is_finite() {
            self.feedback_lp.reset(0.0);
        }
        self.feedback_hpf.heal();
        self.dc.heal();
    }

    fn update_coefficients(&mut self) {
        let wc = TAU * self.cutoff / self.sample_rate;
        self.a1 = -(-wc).exp();
        self.b0 = self.cutoff / self.sample_rate;
        self.k = self.resonance * 4.0;
        if self.topology == Topology::Diode {
            self.k *= DIODE_RESONANCE_BOOST;
        }
    }

    fn update_feedback_hp(&mut self) {
        self.feedback_hpf.set_cutoff(self.sample_rate, self.feedback_hp);
    }
}

#[inline]
fn drive_factor(drive_db: f64) -> f64 {
    10.0_f64.powf(drive_db * 0.05) * DRIVE_BASE
}

/// Clamps finite values into range; non-finite input yields `None`.
#[inline]
fn sanitize(value: f64, min: f64, max: f64) -> Option<f64> {
    value.is_finite().then(|| value.clamp(min, max))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prepared(mode: FilterMode) -> FilterCore {
        let mut filter = FilterCore::new();
        assert!(filter.set_sample_rate(44_100.0));
        filter.set_mode(mode);
        filter
    }

    #[test]
    fn setters_clamp_into_documented_ranges() {
        let mut filter = FilterCore::new();
        filter.set_cutoff(5.0);
        assert_eq!(filter.cutoff(), MIN_CUTOFF_HZ);
        filter.set_cutoff(96_000.0);
        assert_eq!(filter.cutoff(), MAX_CUTOFF_HZ);
        filter.set_resonance(1.7);
        assert_eq!(filter.resonance(), 1.0);
        filter.set_resonance(-0.3);
        assert_eq!(filter.resonance(), 0.0);
        filter.set_drive_db(120.0);
        assert_eq!(filter.drive_db(), MAX_DRIVE_DB);
        filter.set_feedback_hp(1.0);
        assert_eq!(filter.feedback_hp(), MIN_CUTOFF_HZ);
        filter.set_feedback_amount(2.0);
        assert_eq!(filter.feedback_amount(), 1.0);
    }

    #[test]
    fn non_finite_setter_input_is_ignored() {
        let mut filter = FilterCore::new();
        filter.set_cutoff(f64::NAN);
        filter.set_resonance(f64::INFINITY);
        filter.set_drive_db(f64::NEG_INFINITY);
        assert_eq!(filter.cutoff(), 1_000.0);
        assert_eq!(filter.resonance(), 0.2);
        assert_eq!(filter.drive_db(), 0.0);
        assert!(filter.feedback_gain().is_finite());
    }

    #[test]
    fn low_sample_rates_are_rejected() {
        let mut filter = FilterCore::new();
        assert!(!filter.set_sample_rate(22_050.0));
        assert!(!filter.set_sample_rate(f64::NAN));
        assert_eq!(filter.sample_rate(), MIN_SAMPLE_RATE);
        assert!(filter.set_sample_rate(96_000.0));
        assert_eq!(filter.sample_rate(), 96_000.0);
    }

    #[test]
    fn sample_rate_change_clears_memory() {
        let mut filter = prepared(FilterMode::LowPass24);
        for _ in 0..64 {
            filter.process_sample(0.9);
        }
        assert_ne!(filter.stages(), [0.0; 4]);
        filter.set_sample_rate(48_000.0);
        assert_eq!(filter.stages(), [0.0; 4]);
    }

    #[test]
    fn diode_mode_boosts_resonance_gain() {
        let mut filter = prepared(FilterMode::LowPass24);
        filter.set_resonance(0.5);
        assert_eq!(filter.feedback_gain(), 2.0);
        filter.set_mode(FilterMode::Tb303);
        assert_eq!(filter.feedback_gain(), 3.0);
    }

    #[test]
    fn unknown_mode_index_keeps_mode() {
        let mut filter = prepared(FilterMode::HighPass12);
        filter.set_mode_index(6);
        assert_eq!(filter.mode(), FilterMode::HighPass12);
        filter.set_mode_index(5);
        assert_eq!(filter.mode(), FilterMode::Flat);
    }

    #[test]
    fn mode_indices_round_trip() {
        for (index, mode) in FilterMode::ALL.iter().enumerate() {
            assert_eq!(mode.index(), index);
            assert_eq!(FilterMode::from_index(index), Some(*mode));
        }
        assert_eq!(FilterMode::from_index(FilterMode::ALL.len()), None);
    }

    #[test]
    fn stage_mix_follows_mode_table() {
        let taps = [0.3, -0.7, 1.1, 0.05, -1.9];
        let [y0, y1, y2, y3, y4] = taps;
        let expected = [
            (FilterMode::LowPass24, 5.0 * y4),
            (FilterMode::LowPass18, 5.0 * y3),
            (FilterMode::LowPass12, 5.0 * y2),
            (FilterMode::HighPass12, 5.0 * (y0 - 2.0 * y1 + y2)),
            (FilterMode::Flat, 5.0 * y0),
        ];
        for (mode, value) in expected {
            assert_eq!(mode.topology(), Topology::Linear);
            assert!((mode.mix().combine(&taps) - value).abs() < 1e-12, "{mode:?}");
        }
        assert_eq!(FilterMode::Tb303.topology(), Topology::Diode);
        assert_eq!(FilterMode::Tb303.mix(), FilterMode::LowPass24.mix());
    }

    #[test]
    fn flat_mode_passes_scaled_input_on_first_sample() {
        let mut filter = prepared(FilterMode::Flat);
        filter.set_feedback_amount(0.0);
        let y = filter.process_sample(1.0);
        let pre = 5.0 * (0.125 * 0.25 + ANTI_STALL_BIAS);
        let expected = (pre * OUTPUT_PRE_GAIN).tanh() * OUTPUT_MAKEUP;
        assert!((f64::from(y) - expected).abs() < 1e-6);
    }

    fn assert_stages_near(actual: [f64; 4], expected: [f64; 4]) {
        for (n, (a, e)) in actual.iter().zip(expected).enumerate() {
            assert!((a - e).abs() < 1e-12, "stage {}: {a} vs {e}", n + 1);
        }
    }

    #[test]
    fn drive_curve_sets_input_gain() {
        assert!((drive_factor(6.0) - 10.0_f64.powf(0.3) * 0.25).abs() < 1e-15);
        assert!((drive_factor(-6.0) - 10.0_f64.powf(-0.3) * 0.25).abs() < 1e-15);
        for drive_db in [6.0, -6.0] {
            let mut filter = prepared(FilterMode::Flat);
            filter.set_feedback_amount(0.0);
            filter.set_drive_db(drive_db);
            let y = filter.process_sample(1.0);
            let input = 0.125 * 10.0_f64.powf(drive_db / 20.0) * 0.25;
            let expected = (5.0 * (input + 1e-12) * 0.8).tanh() * 1.25;
            assert!((f64::from(y) - expected).abs() < 1e-6, "{drive_db} dB: {y}");
        }
    }

    #[test]
    fn tb303_stages_read_the_updated_previous_stage() {
        let mut filter = prepared(FilterMode::Tb303);
        filter.set_cutoff(10_000.0);
        filter.set_drive_db(12.0);
        filter.set_resonance(0.8);
        filter.set_feedback_amount(0.9);
        assert!((filter.feedback_gain() - 4.8).abs() < 1e-12);

        let b0 = 10_000.0 / 44_100.0;
        let input = 0.5 * 0.125 * 10.0_f64.powf(12.0 / 20.0) * 0.25;

        // Nothing has reached the feedback path yet.
        filter.process_sample(0.5);
        let y0 = input + 1e-12;
        let y1 = b0 * y0.tanh();
        let y2 = b0 * y1.tanh();
        let y3 = b0 * y2.tanh();
        let y4 = b0 * y3.tanh();
        assert_stages_near(filter.stages(), [y1, y2, y3, y4]);

        filter.process_sample(0.5);
        let kfa = 4.8 * 0.9;
        let x = (-TAU * 300.0 / 44_100.0).exp();
        let lowpassed = 0.1 * kfa * y4;
        let highpassed = (1.0 + x) * lowpassed;
        let y0 = input - highpassed + 1e-12 - kfa * y4;
        let z1 = y1 + b0 * (y0.tanh() - y1.tanh());
        let z2 = y2 + b0 * (z1.tanh() - y2.tanh());
        let z3 = y3 + b0 * (z2.tanh() - y3.tanh());
        let z4 = y4 + b0 * (z3.tanh() - y4.tanh());
        assert_stages_near(filter.stages(), [z1, z2, z3, z4]);
    }

    /// Straight-line restatement of the per-sample pipeline with every
    /// constant written out, fixed at 44.1 kHz and a 300 Hz feedback corner.
    struct LadderModel {
        mode: FilterMode,
        cutoff: f64,
        k: f64,
        amount: f64,
        drive: f64,
        stages: [f64; 4],
        lowpass: f64,
        hp_x1: f64,
        hp_z1: f64,
        dc_x1: f64,
        dc_y1: f64,
    }

    impl LadderModel {
        fn new(mode: FilterMode, cutoff: f64, resonance: f64, amount: f64, drive_db: f64) -> Self {
            let boost = if mode == FilterMode::Tb303 { 1.5 } else { 1.0 };
            Self {
                mode,
                cutoff,
                k: resonance * 4.0 * boost,
                amount,
                drive: 10.0_f64.powf(drive_db / 20.0) * 0.25,
                stages: [0.0; 4],
                lowpass: 0.0,
                hp_x1: 0.0,
                hp_z1: 0.0,
                dc_x1: 0.0,
                dc_y1: 0.0,
            }
        }

        fn step(&mut self, x: f64) -> f64 {
            let input = (x * 0.125 * self.drive).clamp(-2.0, 2.0);
            let y4 = self.stages[3];

            self.lowpass = 0.9 * self.lowpass + 0.1 * (self.k * self.amount * y4);
            let lowpassed = self.lowpass.clamp(-2.0, 2.0);
            let x_hp = (-TAU * 300.0 / 44_100.0).exp();
            let highpassed =
                ((1.0 + x_hp) * lowpassed - (1.0 + x_hp) * self.hp_x1 + x_hp * self.hp_z1)
                    .clamp(-2.0, 2.0);
            self.hp_x1 = lowpassed;
            self.hp_z1 = highpassed;

            let mut y0 = input - highpassed + 1e-12;
            let out = if self.mode == FilterMode::Tb303 {
                y0 -= self.k * self.amount * y4;
                let b0 = self.cutoff / 44_100.0;
                let mut previous = y0;
                for stage in &mut self.stages {
                    *stage += b0 * (saturate(previous) - saturate(*stage));
                    previous = *stage;
                }
                self.stages = self.stages.map(|stage| stage.clamp(-2.0, 2.0));
                self.stages[3]
            } else {
                y0 -= self.k * self.amount * 0.7 * y4;
                let a1 = -(-TAU * self.cutoff / 44_100.0).exp();
                let mut previous = y0;
                for stage in &mut self.stages {
                    *stage = previous + a1 * (previous - *stage);
                    previous = *stage;
                }
                self.stages = self.stages.map(|stage| stage.clamp(-2.0, 2.0));
                let [y1, y2, y3, y4] = self.stages;
                match self.mode {
                    FilterMode::LowPass24 => 5.0 * y4,
                    FilterMode::LowPass18 => 5.0 * y3,
                    FilterMode::LowPass12 => 5.0 * y2,
                    FilterMode::HighPass12 => 5.0 * (y0 - 2.0 * y1 + y2),
                    _ => 5.0 * y0,
                }
            };

            let out = (saturate(out * 0.8) * 1.25).clamp(-2.0, 2.0);
            let y = out - self.dc_x1 + 0.9995 * self.dc_y1;
            self.dc_x1 = out;
            self.dc_y1 = y;
            y.clamp(-2.0, 2.0)
        }
    }

    fn saturate(v: f64) -> f64 {
        v.clamp(-6.0, 6.0).tanh()
    }

    #[test]
    fn feedback_loop_matches_written_out_model() {
        let input = [0.9, -0.4, 0.7, 0.2, -0.8, 0.0, 0.3, 0.5, -0.6, 0.1];
        let cases = [
            (FilterMode::Tb303, 8_000.0, 0.85, 0.9, 6.0),
            (FilterMode::LowPass24, 2_000.0, 0.7, 0.8, 6.0),
            (FilterMode::LowPass12, 5_000.0, 0.95, 1.0, 18.0),
            (FilterMode::HighPass12, 1_500.0, 0.6, 0.5, -3.0),
        ];
        for (mode, cutoff, resonance, amount, drive_db) in cases {
            let mut filter = prepared(mode);
            filter.set_cutoff(cutoff);
            filter.set_resonance(resonance);
            filter.set_feedback_amount(amount);
            filter.set_drive_db(drive_db);
            let mut model = LadderModel::new(mode, cutoff, resonance, amount, drive_db);

            for (n, &x) in input.iter().enumerate() {
                let y = filter.process_sample(x as f32);
                let expected = model.step(f64::from(x as f32));
                assert!(
                    (f64::from(y) - expected).abs() < 1e-6,
                    "{mode:?} sample {n}: {y} vs {expected}"
                );
                for (a, e) in filter.stages().iter().zip(model.stages) {
                    assert!((a - e).abs() < 1e-12, "{mode:?} sample {n}: {a} vs {e}");
                }
            }
            assert!(model.stages.iter().any(|s| s.abs() > 1e-3), "{mode:?}");
        }
    }

    #[test]
    fn non_finite_input_does_not_poison_state() {
        let mut reference = prepared(FilterMode::HighPass12);
        let mut filter = prepared(FilterMode::HighPass12);
        assert_eq!(
            filter.process_sample(f32::NAN).to_bits(),
            reference.process_sample(0.0).to_bits()
        );
        for _ in 0..16 {
            assert!(filter.process_sample(f32::INFINITY).is_finite());
        }
        assert!(filter.stages().iter().all(|s| s.is_finite()));
    }

    #[test]
    fn reset_is_deterministic() {
        let input: Vec<f32> = (0..512)
            .map(|n| ((n as f32) * 0.07).sin() * 0.8)
            .collect();
        for mode in FilterMode::ALL {
            let mut filter = prepared(mode);
            filter.set_resonance(0.9);
            filter.set_feedback_amount(1.0);
            for &x in &input {
                filter.process_sample(x);
            }
            filter.reset();
            let first: Vec<f32> = input.iter().map(|&x| filter.process_sample(x)).collect();
            filter.reset();
            let second: Vec<f32> = input.iter().map(|&x| filter.process_sample(x)).collect();
            assert_eq!(
                first.iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
                second.iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
                "{mode:?}"
            );
        }
    }
}
