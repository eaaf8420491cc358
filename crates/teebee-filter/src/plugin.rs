use std::sync::Arc;

use teebee_engine::{AudioBuffer, AudioProcessor, BufferConfig, PluginDescriptor, PluginError};
use teebee_plugin_sdk::{
    NativePlugin, ParameterId, ParameterLayout, ParameterSet, ParameterValue, PluginFactory,
    PluginParameterError,
};

use crate::engine::{StereoEngine, MAX_CHANNELS};
use crate::params::{filter_layout, FilterParameterStore};

pub const PLUGIN_ID: &str = "teebee.effects.diode_filter";

pub const DESCRIPTOR: PluginDescriptor = PluginDescriptor {
    id: PLUGIN_ID,
    name: "TeeBee Filter",
    vendor: "TeeBee Audio",
    version: env!("CARGO_PKG_VERSION"),
    summary: "Stereo TB-303 style diode ladder filter",
};

/// The diode ladder filter as a host-facing processor.
///
/// Parameter writes go through [`NativePlugin::set_parameter`] or the shared
/// [`FilterParameterStore`] handle; the audio thread only ever reads the
/// store.
#[derive(Debug)]
pub struct TeeBeeFilter {
    parameters: ParameterSet,
    store: Arc<FilterParameterStore>,
    engine: StereoEngine,
}

impl Default for TeeBeeFilter {
    fn default() -> Self {
        let store = Arc::new(FilterParameterStore::default());
        let engine = StereoEngine::default();
        Self {
            parameters: ParameterSet::new(filter_layout()),
            store,
            engine,
        }
    }
}

impl TeeBeeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for control threads that write parameters without going
    /// through the plugin.
    pub fn parameter_store(&self) -> Arc<FilterParameterStore> {
        Arc::clone(&self.store)
    }

    pub fn engine(&self) -> &StereoEngine {
        &self.engine
    }

    /// Copies the store into the validated set so [`NativePlugin::parameters`]
    /// reflects writes made through [`Self::parameter_store`].
    fn sync_parameters(&mut self) {
        let ids: Vec<ParameterId> = self
            .parameters
            .layout()
            .parameters()
            .iter()
            .map(|definition| definition.id.clone())
            .collect();
        for id in ids {
            let Some(value) = self.store.value(&id) else {
                continue;
            };
            if let Err(err) = self.parameters.set(&id, value) {
                tracing::warn!(parameter = %id, %err, "store value rejected by layout");
            }
        }
    }
}

impl AudioProcessor for TeeBeeFilter {
    fn descriptor(&self) -> PluginDescriptor {
        DESCRIPTOR
    }

    fn prepare(&mut self, config: &BufferConfig) -> anyhow::Result<()> {
        if !(config.sample_rate.is_finite() && config.sample_rate > 0.0) {
            return Err(PluginError::InvalidConfig(format!(
                "sample rate {} is not usable",
                config.sample_rate
            ))
            .into());
        }
        let channels = usize::from(config.layout.channels());
        if channels == 0 {
            return Err(PluginError::UnsupportedLayout(0).into());
        }
        if channels > MAX_CHANNELS {
            tracing::warn!(
                channels,
                "only the first {MAX_CHANNELS} channels are filtered"
            );
        }
        self.sync_parameters();
        self.engine
            .prepare(f64::from(config.sample_rate), &self.store.snapshot());
        tracing::debug!(
            sample_rate = self.engine.sample_rate(),
            block_size = config.block_size,
            "prepared {DESCRIPTOR}"
        );
        Ok(())
    }

    fn process(&mut self, buffer: &mut AudioBuffer) -> anyhow::Result<()> {
        let parameters = self.store.snapshot();
        self.engine.process_block(&parameters, buffer);
        Ok(())
    }

    fn reset(&mut self) {
        self.engine.reset();
    }
}

impl NativePlugin for TeeBeeFilter {
    /// Values written through [`NativePlugin::set_parameter`]. Writes made
    /// directly on the store show up here after the next `prepare`; use
    /// [`NativePlugin::parameter_value`] or [`NativePlugin::state`] for the
    /// values the audio thread is reading right now.
    fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    fn parameters_mut(&mut self) -> &mut ParameterSet {
        &mut self.parameters
    }

    fn parameter_value(&self, id: &ParameterId) -> Result<ParameterValue, PluginParameterError> {
        self.store
            .value(id)
            .ok_or_else(|| PluginParameterError::UnknownParameter(id.clone()))
    }

    fn on_parameter_changed(
        &mut self,
        id: &ParameterId,
        value: &ParameterValue,
    ) -> Result<(), PluginParameterError> {
        self.store.set_value(id, value)
    }

    /// Serializes the values the audio thread is currently reading, which
    /// includes writes made through [`TeeBeeFilter::parameter_store`].
    fn state(&self) -> Result<Vec<u8>, PluginParameterError> {
        let mut snapshot = self.parameters.snapshot();
        for (id, value) in snapshot.values.iter_mut() {
            if let Some(live) = self.store.value(&ParameterId::new(id.as_str())) {
                *value = live;
            }
        }
        Ok(serde_json::to_vec(&snapshot)?)
    }
}

pub struct TeeBeeFilterFactory;

impl PluginFactory for TeeBeeFilterFactory {
    fn descriptor(&self) -> PluginDescriptor {
        DESCRIPTOR
    }

    fn parameter_layout(&self) -> Arc<ParameterLayout> {
        Arc::new(filter_layout())
    }

    fn create(&self) -> Box<dyn NativePlugin> {
        Box::new(TeeBeeFilter::default())
    }
}
