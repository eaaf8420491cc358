use std::sync::Arc;

use teebee_engine::{AudioProcessor, PluginDescriptor};

use crate::{
    ParameterId, ParameterLayout, ParameterSet, ParameterSnapshot, ParameterValue,
    PluginParameterError, SNAPSHOT_VERSION,
};

/// Parameter and state access layered on top of [`AudioProcessor`].
pub trait NativePlugin: AudioProcessor {
    fn parameters(&self) -> &ParameterSet;
    fn parameters_mut(&mut self) -> &mut ParameterSet;

    fn parameter_layout(&self) -> &ParameterLayout {
        self.parameters().layout()
    }

    fn parameter_value(&self, id: &ParameterId) -> Result<ParameterValue, PluginParameterError> {
        self.parameters()
            .get(id)
            .copied()
            .ok_or_else(|| PluginParameterError::UnknownParameter(id.clone()))
    }

    /// Writes a parameter, clamping continuous values into range, and
    /// notifies [`Self::on_parameter_changed`] with the stored value.
    fn set_parameter(
        &mut self,
        id: &ParameterId,
        value: ParameterValue,
    ) -> Result<ParameterValue, PluginParameterError> {
        let stored = self.parameters_mut().set(id, value)?;
        self.on_parameter_changed(id, &stored)?;
        Ok(stored)
    }

    fn on_parameter_changed(
        &mut self,
        _id: &ParameterId,
        _value: &ParameterValue,
    ) -> Result<(), PluginParameterError> {
        Ok(())
    }

    /// Serializes every parameter value as JSON.
    fn state(&self) -> Result<Vec<u8>, PluginParameterError> {
        Ok(serde_json::to_vec(&self.parameters().snapshot())?)
    }

    /// Restores a payload produced by [`Self::state`].
    ///
    /// The whole payload is validated before anything is applied, so a
    /// rejected payload leaves the current values untouched. Ids this
    /// plugin does not know are skipped.
    fn restore_state(&mut self, data: &[u8]) -> Result<(), PluginParameterError> {
        let snapshot: ParameterSnapshot = serde_json::from_slice(data)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(PluginParameterError::UnsupportedStateVersion(snapshot.version));
        }

        let mut accepted = Vec::with_capacity(snapshot.values.len());
        {
            let layout = self.parameter_layout();
            for (id, value) in snapshot.values {
                let id = ParameterId::new(id);
                match layout.find(&id) {
                    Some(definition) => {
                        let value = definition.kind.coerce(&id, value)?;
                        accepted.push((id, value));
                    }
                    None => tracing::warn!(parameter = %id, "skipping unknown parameter in state"),
                }
            }
        }

        for (id, value) in accepted {
            self.set_parameter(&id, value)?;
        }
        tracing::debug!("restored plugin state");
        Ok(())
    }
}

pub trait PluginFactory: Send + Sync {
    fn descriptor(&self) -> PluginDescriptor;
    fn parameter_layout(&self) -> Arc<ParameterLayout>;
    fn create(&self) -> Box<dyn NativePlugin>;
}
