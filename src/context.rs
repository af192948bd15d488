use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SimConfig;
use crate::error::SimError;

/// Power/charging state machine.
///
/// The control channel treats power and charging as mutually exclusive
/// inputs: a power update is ignored while charging and a charging update is
/// ignored while powered. Modelling the pair as one mode makes that
/// exclusion structural instead of a runtime check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerMode {
    Off,
    Powered,
    Charging,
}

/// Object-detection event payload, shared by the control channel and the
/// SOME/IP inbox.
#[derive(Debug, Clone, Deserialize)]
pub struct DetectionEvent {
    pub distance: f64,
    pub object_type: String,
}

const KNOWN_OBJECT_TYPES: [&str; 3] = ["car", "pedestrian", "red_signal"];

/// Externally supplied gating and parameter state.
///
/// Mutated only by the pub/sub collaborator's callback handlers (the
/// `apply_*` methods); read-only to the simulation core. Every handler
/// validates its payload and leaves the context unchanged on a malformed
/// update.
#[derive(Debug, Clone)]
pub struct ControlContext {
    pub mode: PowerMode,
    pub key_present: bool,
    pub simulation_enabled: bool,
    pub dust: bool,
    pub snow: bool,
    pub environment_temp: f64,
    pub manual_door_open: bool,
    pub object_detected: bool,
    pub object_threshold_m: f64,
    pub last_object_type: String,

    normal_threshold_m: f64,
    dust_reduction: f64,
    snow_reduction: f64,
}

impl ControlContext {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            mode: PowerMode::Off,
            key_present: false,
            simulation_enabled: false,
            dust: false,
            snow: false,
            environment_temp: 21.0,
            manual_door_open: false,
            object_detected: false,
            object_threshold_m: config.normal_object_threshold_m,
            last_object_type: "pedestrian".to_owned(),
            normal_threshold_m: config.normal_object_threshold_m,
            dust_reduction: config.dust_threshold_reduction,
            snow_reduction: config.snow_threshold_reduction,
        }
    }

    pub fn powered(&self) -> bool {
        self.mode == PowerMode::Powered
    }

    pub fn charging(&self) -> bool {
        self.mode == PowerMode::Charging
    }

    /// `{"car_power": bool}`. Ignored while charging. Powering off also
    /// resets the key to absent.
    pub fn apply_power(&mut self, payload: &str) -> Result<(), SimError> {
        if self.charging() {
            debug!("power update ignored while charging");
            return Ok(());
        }
        let on: bool = field(payload, "car_power")?;
        self.mode = if on { PowerMode::Powered } else { PowerMode::Off };
        if !on {
            self.key_present = false;
        }
        Ok(())
    }

    /// `{"charging_state": bool}`. Ignored while powered.
    pub fn apply_charging(&mut self, payload: &str) -> Result<(), SimError> {
        if self.powered() {
            debug!("charging update ignored while powered");
            return Ok(());
        }
        let charging: bool = field(payload, "charging_state")?;
        self.mode = if charging {
            PowerMode::Charging
        } else {
            PowerMode::Off
        };
        Ok(())
    }

    /// `{"key_status": "present"|"absent"}`. Only honoured while powered.
    pub fn apply_key_status(&mut self, payload: &str) -> Result<(), SimError> {
        if !self.powered() {
            return Ok(());
        }
        let status: String = field(payload, "key_status")?;
        self.key_present = match status.as_str() {
            "present" => true,
            "absent" => false,
            other => {
                return Err(SimError::InputValidation(format!(
                    "unknown key_status `{other}`"
                )))
            }
        };
        Ok(())
    }

    /// `{"simulation_state": bool}`. Only honoured while powered.
    pub fn apply_simulation_state(&mut self, payload: &str) -> Result<(), SimError> {
        if !self.powered() {
            return Ok(());
        }
        self.simulation_enabled = field(payload, "simulation_state")?;
        Ok(())
    }

    /// `{"dust": bool}`. Only honoured while powered.
    pub fn apply_dust(&mut self, payload: &str) -> Result<(), SimError> {
        if !self.powered() {
            return Ok(());
        }
        self.dust = field(payload, "dust")?;
        Ok(())
    }

    /// `{"snow": bool}`. Only honoured while powered.
    pub fn apply_snow(&mut self, payload: &str) -> Result<(), SimError> {
        if !self.powered() {
            return Ok(());
        }
        self.snow = field(payload, "snow")?;
        Ok(())
    }

    /// `{"environment_temp": number}`. Only honoured while powered.
    pub fn apply_environment_temp(&mut self, payload: &str) -> Result<(), SimError> {
        if !self.powered() {
            return Ok(());
        }
        self.environment_temp = field(payload, "environment_temp")?;
        Ok(())
    }

    /// `{"manual_door_state": "open"|"close"}`. Only honoured while powered.
    pub fn apply_manual_door(&mut self, payload: &str) -> Result<(), SimError> {
        if !self.powered() {
            return Ok(());
        }
        let state: String = field(payload, "manual_door_state")?;
        self.manual_door_open = match state.as_str() {
            "open" => true,
            "close" => false,
            other => {
                return Err(SimError::InputValidation(format!(
                    "unknown manual_door_state `{other}`"
                )))
            }
        };
        Ok(())
    }

    /// `{"distance": number, "object_type": string}`. Requires power, key
    /// and an enabled simulation. A recognized object type arms the
    /// detection flag and rederives the distance threshold from the current
    /// dust/snow conditions; anything else clears the flag.
    pub fn apply_detection(&mut self, payload: &str) -> Result<(), SimError> {
        if !(self.powered() && self.key_present && self.simulation_enabled) {
            return Ok(());
        }
        let event: DetectionEvent = serde_json::from_str(payload)
            .map_err(|e| SimError::InputValidation(format!("bad detection payload: {e}")))?;

        if KNOWN_OBJECT_TYPES.contains(&event.object_type.as_str()) {
            self.object_threshold_m = self.derive_threshold();
            self.object_detected = true;
            self.last_object_type = event.object_type;
        } else {
            self.object_detected = false;
        }
        Ok(())
    }

    /// Normal threshold reduced multiplicatively by the configured dust and
    /// snow fractions.
    fn derive_threshold(&self) -> f64 {
        let reduction = match (self.dust, self.snow) {
            (true, true) => self.dust_reduction + self.snow_reduction,
            (false, true) => self.snow_reduction,
            (true, false) => self.dust_reduction,
            (false, false) => 0.0,
        };
        self.normal_threshold_m * (1.0 - reduction)
    }
}

/// Extracts one named field from a JSON object payload.
fn field<T: DeserializeOwned>(payload: &str, key: &str) -> Result<T, SimError> {
    let value: serde_json::Value = serde_json::from_str(payload)
        .map_err(|e| SimError::InputValidation(format!("payload is not JSON: {e}")))?;
    let field = value
        .get(key)
        .cloned()
        .ok_or_else(|| SimError::InputValidation(format!("missing field `{key}`")))?;
    serde_json::from_value(field)
        .map_err(|e| SimError::InputValidation(format!("field `{key}` has the wrong type: {e}")))
}
