use std::fmt;

use thiserror::Error;

use crate::{AudioBuffer, BufferConfig, ChannelLayout};

/// Identity of a processor as shown to hosts. Descriptors are static
/// data, so processors usually keep one in a `const`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PluginDescriptor {
    pub id: &'static str,
    pub name: &'static str,
    pub vendor: &'static str,
    pub version: &'static str,
    pub summary: &'static str,
}

impl fmt::Display for PluginDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.name, self.version, self.vendor)
    }
}

/// Errors that can be returned by processor operations.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("plugin reported an invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("unsupported channel layout with {0} channels")]
    UnsupportedLayout(u8),
}

/// Capability interface implemented by every processor.
///
/// `prepare` is only ever called while no `process` call is in flight; the
/// `&mut self` receivers make that mutual exclusion explicit.
pub trait AudioProcessor: Send + Sync {
    fn descriptor(&self) -> PluginDescriptor;
    fn prepare(&mut self, config: &BufferConfig) -> anyhow::Result<()>;
    fn process(&mut self, buffer: &mut AudioBuffer) -> anyhow::Result<()>;

    fn supports_layout(&self, layout: ChannelLayout) -> bool {
        matches!(layout, ChannelLayout::Mono | ChannelLayout::Stereo)
    }

    /// Returns the processing latency in samples introduced by the processor.
    fn latency_samples(&self) -> usize {
        0
    }

    /// How long the processor keeps ringing after its input goes silent.
    fn tail_seconds(&self) -> f64 {
        0.0
    }

    /// Clears internal signal history without touching parameters.
    fn reset(&mut self) {}
}
