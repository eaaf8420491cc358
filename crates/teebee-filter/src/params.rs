use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use atomic_float::AtomicF32;
use teebee_dsp::FilterMode;
use teebee_plugin_sdk::{
    ContinuousParameterOptions, ParameterDefinition, ParameterId, ParameterKind, ParameterLayout,
    ParameterValue, PluginParameterError,
};

pub const PARAM_CUTOFF: &str = "cutoff";
pub const PARAM_RESONANCE: &str = "resonance";
pub const PARAM_DRIVE: &str = "drive";
pub const PARAM_MODE: &str = "mode";
pub const PARAM_FEEDBACK_HP: &str = "fbhp";
pub const PARAM_FEEDBACK_AMOUNT: &str = "fbamp";
pub const PARAM_AUTOMATION: &str = "automode";

pub const CUTOFF_RANGE: RangeInclusive<f32> = 20.0..=20_000.0;
pub const PERCENT_RANGE: RangeInclusive<f32> = 0.0..=100.0;
pub const DRIVE_RANGE: RangeInclusive<f32> = -24.0..=24.0;

/// Plain copy of every parameter, in host units (Hz, %, dB).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterParameters {
    pub cutoff_hz: f32,
    pub resonance_pct: f32,
    pub drive_db: f32,
    pub mode: FilterMode,
    pub feedback_hp_hz: f32,
    pub feedback_amount_pct: f32,
    /// Selects the short smoothing window for host automation.
    pub automation: bool,
}

impl Default for FilterParameters {
    fn default() -> Self {
        Self {
            cutoff_hz: 1_000.0,
            resonance_pct: 20.0,
            drive_db: 0.0,
            mode: FilterMode::Tb303,
            feedback_hp_hz: 300.0,
            feedback_amount_pct: 50.0,
            automation: false,
        }
    }
}

impl FilterParameters {
    /// Every parameter keyed by its stable id, in layout order.
    pub fn values(&self) -> [(&'static str, ParameterValue); 7] {
        [
            (PARAM_CUTOFF, ParameterValue::Continuous(self.cutoff_hz)),
            (PARAM_RESONANCE, ParameterValue::Continuous(self.resonance_pct)),
            (PARAM_DRIVE, ParameterValue::Continuous(self.drive_db)),
            (PARAM_MODE, ParameterValue::Choice(self.mode.index())),
            (PARAM_FEEDBACK_HP, ParameterValue::Continuous(self.feedback_hp_hz)),
            (
                PARAM_FEEDBACK_AMOUNT,
                ParameterValue::Continuous(self.feedback_amount_pct),
            ),
            (PARAM_AUTOMATION, ParameterValue::Toggle(self.automation)),
        ]
    }
}

pub fn filter_layout() -> ParameterLayout {
    let defaults = FilterParameters::default();
    ParameterLayout::new(vec![
        ParameterDefinition::new(
            PARAM_CUTOFF,
            "Cutoff",
            ParameterKind::Continuous(
                ContinuousParameterOptions::new(CUTOFF_RANGE, defaults.cutoff_hz)
                    .with_step(1.0)
                    .with_skew(0.25),
            ),
        )
        .with_unit("Hz")
        .with_description("Corner frequency of the ladder"),
        ParameterDefinition::new(
            PARAM_RESONANCE,
            "Resonance",
            ParameterKind::Continuous(
                ContinuousParameterOptions::new(PERCENT_RANGE, defaults.resonance_pct)
                    .with_step(0.01),
            ),
        )
        .with_unit("%"),
        ParameterDefinition::new(
            PARAM_DRIVE,
            "Drive",
            ParameterKind::Continuous(
                ContinuousParameterOptions::new(DRIVE_RANGE, defaults.drive_db).with_step(0.01),
            ),
        )
        .with_unit("dB")
        .with_description("Input gain into the saturating stages"),
        ParameterDefinition::new(
            PARAM_MODE,
            "Mode",
            ParameterKind::choice(
                FilterMode::ALL.iter().map(|mode| mode.label()),
                defaults.mode.index(),
            ),
        ),
        ParameterDefinition::new(
            PARAM_FEEDBACK_HP,
            "Feedback HP",
            ParameterKind::Continuous(
                ContinuousParameterOptions::new(CUTOFF_RANGE, defaults.feedback_hp_hz)
                    .with_step(1.0)
                    .with_skew(0.25),
            ),
        )
        .with_unit("Hz")
        .with_description("High-pass corner inside the resonance loop"),
        ParameterDefinition::new(
            PARAM_FEEDBACK_AMOUNT,
            "Feedback Amp",
            ParameterKind::Continuous(
                ContinuousParameterOptions::new(PERCENT_RANGE, defaults.feedback_amount_pct)
                    .with_step(0.01),
            ),
        )
        .with_unit("%"),
        ParameterDefinition::new(
            PARAM_AUTOMATION,
            "Automation Mode",
            ParameterKind::Toggle {
                default: defaults.automation,
            },
        )
        .with_description("Faster parameter smoothing for host automation"),
    ])
}

/// Lock-free parameter storage shared between control and audio threads.
///
/// Every field is an independent relaxed atomic; the audio thread takes one
/// [`FilterParameterStore::snapshot`] per block.
#[derive(Debug)]
pub struct FilterParameterStore {
    cutoff_hz: AtomicF32,
    resonance_pct: AtomicF32,
    drive_db: AtomicF32,
    mode: AtomicUsize,
    feedback_hp_hz: AtomicF32,
    feedback_amount_pct: AtomicF32,
    automation: AtomicBool,
}

impl Default for FilterParameterStore {
    fn default() -> Self {
        Self::new(&FilterParameters::default())
    }
}

impl FilterParameterStore {
    pub fn new(parameters: &FilterParameters) -> Self {
        Self {
            cutoff_hz: AtomicF32::new(parameters.cutoff_hz),
            resonance_pct: AtomicF32::new(parameters.resonance_pct),
            drive_db: AtomicF32::new(parameters.drive_db),
            mode: AtomicUsize::new(parameters.mode.index()),
            feedback_hp_hz: AtomicF32::new(parameters.feedback_hp_hz),
            feedback_amount_pct: AtomicF32::new(parameters.feedback_amount_pct),
            automation: AtomicBool::new(parameters.automation),
        }
    }

    pub fn snapshot(&self) -> FilterParameters {
        FilterParameters {
            cutoff_hz: self.cutoff_hz.load(Ordering::Relaxed),
            resonance_pct: self.resonance_pct.load(Ordering::Relaxed),
            drive_db: self.drive_db.load(Ordering::Relaxed),
            mode: FilterMode::from_index(self.mode.load(Ordering::Relaxed)).unwrap_or_default(),
            feedback_hp_hz: self.feedback_hp_hz.load(Ordering::Relaxed),
            feedback_amount_pct: self.feedback_amount_pct.load(Ordering::Relaxed),
            automation: self.automation.load(Ordering::Relaxed),
        }
    }

    pub fn store(&self, parameters: &FilterParameters) {
        store_clamped(&self.cutoff_hz, parameters.cutoff_hz, CUTOFF_RANGE);
        store_clamped(&self.resonance_pct, parameters.resonance_pct, PERCENT_RANGE);
        store_clamped(&self.drive_db, parameters.drive_db, DRIVE_RANGE);
        self.mode.store(parameters.mode.index(), Ordering::Relaxed);
        store_clamped(&self.feedback_hp_hz, parameters.feedback_hp_hz, CUTOFF_RANGE);
        store_clamped(
            &self.feedback_amount_pct,
            parameters.feedback_amount_pct,
            PERCENT_RANGE,
        );
        self.automation
            .store(parameters.automation, Ordering::Relaxed);
    }

    /// Writes one parameter by id. Continuous values are clamped; a
    /// non-finite value leaves the parameter unchanged.
    pub fn set_value(
        &self,
        id: &ParameterId,
        value: &ParameterValue,
    ) -> Result<(), PluginParameterError> {
        let wrong_type = |expected: &'static str| PluginParameterError::WrongType {
            id: id.clone(),
            expected,
            actual: value.type_name(),
        };
        match id.as_str() {
            PARAM_CUTOFF | PARAM_RESONANCE | PARAM_DRIVE | PARAM_FEEDBACK_HP
            | PARAM_FEEDBACK_AMOUNT => {
                let v = value.as_continuous().ok_or_else(|| wrong_type("continuous"))?;
                let (slot, range) = match id.as_str() {
                    PARAM_CUTOFF => (&self.cutoff_hz, CUTOFF_RANGE),
                    PARAM_RESONANCE => (&self.resonance_pct, PERCENT_RANGE),
                    PARAM_DRIVE => (&self.drive_db, DRIVE_RANGE),
                    PARAM_FEEDBACK_HP => (&self.feedback_hp_hz, CUTOFF_RANGE),
                    _ => (&self.feedback_amount_pct, PERCENT_RANGE),
                };
                store_clamped(slot, v, range);
            }
            PARAM_MODE => {
                let index = value.as_choice().ok_or_else(|| wrong_type("choice"))?;
                let mode = FilterMode::from_index(index).ok_or_else(|| {
                    PluginParameterError::InvalidChoice {
                        id: id.clone(),
                        index,
                        count: FilterMode::ALL.len(),
                    }
                })?;
                self.mode.store(mode.index(), Ordering::Relaxed);
            }
            PARAM_AUTOMATION => {
                let on = value.as_toggle().ok_or_else(|| wrong_type("toggle"))?;
                self.automation.store(on, Ordering::Relaxed);
            }
            _ => return Err(PluginParameterError::UnknownParameter(id.clone())),
        }
        Ok(())
    }

    pub fn value(&self, id: &ParameterId) -> Option<ParameterValue> {
        self.snapshot()
            .values()
            .into_iter()
            .find(|(key, _)| *key == id.as_str())
            .map(|(_, value)| value)
    }
}

fn store_clamped(slot: &AtomicF32, value: f32, range: RangeInclusive<f32>) {
    if value.is_finite() {
        slot.store(value.clamp(*range.start(), *range.end()), Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teebee_plugin_sdk::ParameterSet;

    #[test]
    fn layout_defaults_match_parameter_defaults() {
        let set = ParameterSet::new(filter_layout());
        let store = FilterParameterStore::default();
        for definition in set.layout().parameters() {
            assert_eq!(
                set.get(&definition.id).copied(),
                store.value(&definition.id),
                "{}",
                definition.id
            );
        }
        assert_eq!(set.layout().parameters().len(), 7);
    }

    #[test]
    fn store_writes_are_clamped() {
        let store = FilterParameterStore::default();
        store
            .set_value(&PARAM_CUTOFF.into(), &ParameterValue::Continuous(1.0e6))
            .expect("cutoff");
        store
            .set_value(&PARAM_DRIVE.into(), &ParameterValue::Continuous(-90.0))
            .expect("drive");
        store
            .set_value(&PARAM_RESONANCE.into(), &ParameterValue::Continuous(f32::NAN))
            .expect("resonance");
        let p = store.snapshot();
        assert_eq!(p.cutoff_hz, 20_000.0);
        assert_eq!(p.drive_db, -24.0);
        assert_eq!(p.resonance_pct, 20.0);
    }

    #[test]
    fn store_rejects_bad_writes() {
        let store = FilterParameterStore::default();
        assert!(matches!(
            store.set_value(&PARAM_MODE.into(), &ParameterValue::Choice(6)),
            Err(PluginParameterError::InvalidChoice { .. })
        ));
        assert!(matches!(
            store.set_value(&PARAM_AUTOMATION.into(), &ParameterValue::Continuous(1.0)),
            Err(PluginParameterError::WrongType { .. })
        ));
        assert!(matches!(
            store.set_value(&"q".into(), &ParameterValue::Toggle(true)),
            Err(PluginParameterError::UnknownParameter(_))
        ));
        assert_eq!(store.snapshot(), FilterParameters::default());
    }

    #[test]
    fn snapshot_round_trips_store() {
        let store = FilterParameterStore::default();
        let wanted = FilterParameters {
            cutoff_hz: 440.0,
            resonance_pct: 95.0,
            drive_db: 6.0,
            mode: FilterMode::HighPass12,
            feedback_hp_hz: 80.0,
            feedback_amount_pct: 10.0,
            automation: true,
        };
        store.store(&wanted);
        assert_eq!(store.snapshot(), wanted);
    }
}
