/// Pole radius of the DC blocker, roughly a 10 Hz corner at 44.1 kHz.
pub const DC_BLOCK_R: f64 = 0.9995;

/// One-pole differencer removing bias left behind by asymmetric clipping.
#[derive(Clone, Copy, Debug, Default)]
pub struct DcBlocker {
    x1: f64,
    y1: f64,
}

impl DcBlocker {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.y1 = 0.0;
    }

    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let y = input - self.x1 + DC_BLOCK_R * self.y1;
        self.x1 = input;
        self.y1 = y;
        y
    }

    /// Zeroes the memory if either value went non-finite.
    #[inline]
    pub fn heal(&mut self) {
        if !(self.x1.is_finite() && self.y1.is_finite()) {
            self.reset();
        }
    }
}
