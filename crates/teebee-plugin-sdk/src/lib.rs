//! TeeBee Plugin SDK
//! =================
//!
//! Parameter descriptions, validated parameter storage and state snapshots
//! for processors built on [`teebee_engine`]'s
//! [`AudioProcessor`](teebee_engine::AudioProcessor) trait.

mod parameters;
mod registry;

pub use parameters::{
    ContinuousParameterOptions, ParameterDefinition, ParameterId, ParameterKind, ParameterLayout,
    ParameterSet, ParameterSnapshot, ParameterValue, PluginParameterError, SNAPSHOT_VERSION,
};
pub use registry::{NativePlugin, PluginFactory};

/// Common imports for plugin authors.
pub mod prelude {
    pub use crate::{
        ContinuousParameterOptions, NativePlugin, ParameterDefinition, ParameterId, ParameterKind,
        ParameterLayout, ParameterSet, ParameterValue, PluginFactory,
    };
    pub use teebee_engine::{
        AudioBuffer, AudioProcessor, BufferConfig, ChannelLayout, PluginDescriptor,
    };
}
