//! TeeBee Engine
//! =============
//! The contract between a host and a TeeBee processor: channel layouts, the
//! buffer handed to `process`, and the [`AudioProcessor`] capability trait.

pub mod buffer;
pub mod plugin;

pub use buffer::{AudioBuffer, BufferConfig, ChannelLayout};
pub use plugin::{AudioProcessor, PluginDescriptor, PluginError};
