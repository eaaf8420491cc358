/// One-pole low-pass with a fixed input weight.
#[derive(Clone, Copy, Debug)]
pub struct OnePole {
    coeff: f64,
    pole: f64,
    state: f64,
}

impl OnePole {
    /// Builds a smoother with a fixed input weight: `y = (1 - c) * y + c * x`.
    #[inline]
    pub fn with_coeff(coeff: f64) -> Self {
        let coeff = coeff.clamp(0.0, 1.0);
        Self {
            coeff,
            pole: 1.0 - coeff,
            state: 0.0,
        }
    }

    #[inline]
    pub fn reset(&mut self, value: f64) {
        self.state = value;
    }

    #[inline]
    pub fn next(&mut self, target: f64) -> f64 {
        self.state = self.pole * self.state + self.coeff * target;
        self.state
    }

    #[inline]
    pub fn state(&self) -> f64 {
        self.state
    }
}

/// Linear ramp generator turning block-rate targets into a per-sample stream.
///
/// Re-targeting while a ramp is running restarts the ramp from the current
/// value, so the target is always reached within one ramp window no matter
/// how often the destination moves.
#[derive(Clone, Copy, Debug)]
pub struct LinearSmoother {
    current: f64,
    target: f64,
    step: f64,
    remaining: u32,
    ramp_steps: u32,
}

impl Default for LinearSmoother {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl LinearSmoother {
    #[inline]
    pub fn new(value: f64) -> Self {
        Self {
            current: value,
            target: value,
            step: 0.0,
            remaining: 0,
            ramp_steps: 0,
        }
    }

    /// Sets a new step basis and snaps the current value onto the target.
    #[inline]
    pub fn reset(&mut self, sample_rate: f64, ramp_seconds: f64) {
        self.set_ramp(sample_rate, ramp_seconds);
        self.set_current_and_target(self.target);
    }

    /// Changes the step basis used by future calls to [`Self::set_target`]
    /// without disturbing a ramp that is already running.
    #[inline]
    pub fn set_ramp(&mut self, sample_rate: f64, ramp_seconds: f64) {
        self.ramp_steps = ramp_steps_for(sample_rate, ramp_seconds);
    }

    #[inline]
    pub fn set_current_and_target(&mut self, value: f64) {
        self.current = value;
        self.target = value;
        self.step = 0.0;
        self.remaining = 0;
    }

    #[inline]
    pub fn set_target(&mut self, value: f64) {
        if value == self.target {
            return;
        }
        if self.ramp_steps == 0 {
            self.set_current_and_target(value);
            return;
        }
        self.target = value;
        self.remaining = self.ramp_steps;
        self.step = (self.target - self.current) / f64::from(self.remaining);
    }

    #[inline]
    pub fn next_value(&mut self) -> f64 {
        if self.remaining == 0 {
            return self.target;
        }
        self.remaining -= 1;
        if self.remaining == 0 {
            self.current = self.target;
            self.step = 0.0;
        } else {
            self.current += self.step;
        }
        self.current
    }

    #[inline]
    pub fn is_smoothing(&self) -> bool {
        self.remaining > 0
    }

    #[inline]
    pub fn current(&self) -> f64 {
        self.current
    }

    #[inline]
    pub fn target(&self) -> f64 {
        self.target
    }

    #[inline]
    pub fn ramp_steps(&self) -> u32 {
        self.ramp_steps
    }
}

/// `ceil(sample_rate * ramp_seconds)`, ignoring sub-ppm float noise so that
/// e.g. 50 ms at 44.1 kHz is 2205 steps and not 2206.
fn ramp_steps_for(sample_rate: f64, ramp_seconds: f64) -> u32 {
    let raw = (sample_rate * ramp_seconds).max(0.0);
    if !raw.is_finite() {
        return 0;
    }
    let nearest = raw.round();
    let steps = if (raw - nearest).abs() <= 1e-6 * nearest.max(1.0) {
        nearest
    } else {
        raw.ceil()
    };
    steps.min(f64::from(u32::MAX)) as u32
}
