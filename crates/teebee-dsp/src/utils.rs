#[cfg(all(feature = "no-denormals", target_arch = "x86_64"))]
const DAZ_FTZ: u32 = 0x8040;

/// Enables flush-to-zero / denormals-are-zero for as long as it is alive and
/// restores the previous floating point control state when dropped.
///
/// On targets without MXCSR (or with the `no-denormals` feature disabled)
/// the guard is a no-op, so callers can hold one unconditionally.
#[derive(Debug)]
#[must_use = "denormals are only suppressed while the guard is alive"]
pub struct NoDenormalsGuard {
    #[cfg(all(feature = "no-denormals", target_arch = "x86_64"))]
    prev: u32,
}

impl NoDenormalsGuard {
    #[inline]
    #[cfg(all(feature = "no-denormals", target_arch = "x86_64"))]
    pub fn new() -> Self {
        #[allow(deprecated)]
        // SAFETY: MXCSR is always present on x86_64; only the FTZ/DAZ bits change.
        let prev = unsafe {
            use core::arch::x86_64::{_mm_getcsr, _mm_setcsr};
            let prev = _mm_getcsr();
            _mm_setcsr(prev | DAZ_FTZ);
            prev
        };
        Self { prev }
    }

    #[inline]
    #[cfg(not(all(feature = "no-denormals", target_arch = "x86_64")))]
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for NoDenormalsGuard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(all(feature = "no-denormals", target_arch = "x86_64"))]
impl Drop for NoDenormalsGuard {
    fn drop(&mut self) {
        #[allow(deprecated)]
        // SAFETY: restores the exact control word captured in `new`.
        unsafe {
            core::arch::x86_64::_mm_setcsr(self.prev);
        }
    }
}
