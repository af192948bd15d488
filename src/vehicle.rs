use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::persist::StoredParams;

/// Brake readings above this arm/fire the event counter; exactly this value
/// affects neither (dead zone).
const BRAKE_EVENT_DEADZONE: u8 = 5;

/// Steering-wheel byte decoded to a direction.
///
/// The raw value 0 is neither a right nor a left deflection; it is surfaced
/// as an explicit centre state rather than silently defaulting to a side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WheelDirection {
    Right,
    Left,
    Centre,
}

impl WheelDirection {
    pub fn from_raw(value: u8) -> Self {
        match value {
            0 => WheelDirection::Centre,
            1..=127 => WheelDirection::Right,
            _ => WheelDirection::Left,
        }
    }
}

/// The simulation's authoritative mutable record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    /// km/h-equivalent, always within `[0, base_max_speed]`.
    pub speed: f64,
    /// Always within `[0, 100]`.
    pub battery_percent: f64,
    /// Monotonically non-decreasing while moving.
    pub distance_travelled: f64,
    pub door_locked: bool,
    /// Monotonically non-decreasing.
    pub brake_events: u32,
    // Wear figures carried through persistence untouched by the dynamics.
    pub battery_health: f64,
    pub tyre_health: f64,
    pub brake_pads: f64,
}

/// Per-tick vehicle-dynamics state machine.
///
/// Mutated once per tick by the simulation core only. The hysteresis flag
/// and previous raw inputs live here rather than in [`VehicleState`]; they
/// are working state, not published state.
#[derive(Debug)]
pub struct VehicleDynamics {
    state: VehicleState,
    brake_armed: bool,
    prev_accel: i16,
    prev_brake: u8,
    cfg: SimConfig,
}

impl VehicleDynamics {
    /// Starts from persisted values: distance, battery, brake count and the
    /// wear figures survive restarts, speed does not.
    pub fn new(config: &SimConfig, stored: &StoredParams) -> Self {
        Self {
            state: VehicleState {
                speed: 0.0,
                battery_percent: stored.battery,
                distance_travelled: stored.distance,
                door_locked: false,
                brake_events: stored.brake_counter,
                battery_health: stored.battery_health,
                tyre_health: stored.tyre_health,
                brake_pads: stored.brake_pads,
            },
            brake_armed: false,
            prev_accel: 0,
            prev_brake: 0,
            cfg: config.clone(),
        }
    }

    pub fn state(&self) -> &VehicleState {
        &self.state
    }

    /// Counts one brake event per full press-release-press cycle. Runs
    /// before the dynamics, against the previous tick's speed; a press at
    /// standstill is not counted.
    pub fn count_brake_event(&mut self, brake: u8) {
        if brake > BRAKE_EVENT_DEADZONE && self.brake_armed && self.state.speed != 0.0 {
            self.state.brake_events += 1;
            self.brake_armed = false;
        } else if brake < BRAKE_EVENT_DEADZONE {
            self.brake_armed = true;
        }
    }

    /// Accelerator dynamics: rate-of-change-weighted increment, friction,
    /// clamp to the input-scaled maximum, low-battery cutoff.
    pub fn apply_acceleration(&mut self, accel: i16) {
        let accel_f = f64::from(accel);
        let change = accel_f - f64::from(self.prev_accel);
        let max_speed = self.cfg.base_max_speed * accel_f / 255.0;
        let accel_factor = self.cfg.base_accel_factor * (1.0 + change.abs() / 255.0);
        let increment = accel_f * accel_factor;

        if accel >= self.prev_accel && self.state.speed < max_speed {
            self.state.speed += increment;
        }

        self.state.speed -= self.state.speed * self.cfg.friction_factor;

        if accel > self.prev_accel && accel != 0 && self.state.speed > max_speed {
            self.state.speed = max_speed;
        }
        if self.state.speed < 0.0 {
            self.state.speed = 0.0;
        }
        self.prev_accel = accel;

        if self.state.speed > self.cfg.base_max_speed {
            self.state.speed = self.cfg.base_max_speed;
        }
        if self.state.battery_percent < self.cfg.low_battery_percent {
            self.state.speed = 0.0;
        }
        self.state.speed = round2(self.state.speed);
    }

    /// Brake dynamics: rate-of-change-weighted decrement with the same
    /// clamping and low-battery cutoff as acceleration.
    pub fn apply_brake(&mut self, brake: u8) {
        let change = f64::from(brake) - f64::from(self.prev_brake);
        let brake_factor = self.cfg.base_brake_factor * (1.0 + change.abs() / 255.0);
        self.state.speed -= f64::from(brake) * brake_factor;
        self.prev_brake = brake;

        if self.state.speed < 0.0 {
            self.state.speed = 0.0;
        }
        if self.state.battery_percent < self.cfg.low_battery_percent {
            self.state.speed = 0.0;
        }
        self.state.speed = round2(self.state.speed);
    }

    pub fn advance_distance(&mut self, sim_hours: f64) {
        self.state.distance_travelled =
            round2(self.state.distance_travelled + self.state.speed * sim_hours);
    }

    /// Charging adds a fixed per-minute rate; otherwise the battery drains
    /// with speed and ambient temperature whenever the car is powered or
    /// still rolling. Clamped to [0, 100] either way.
    pub fn update_battery(
        &mut self,
        charging: bool,
        powered: bool,
        environment_temp: f64,
        sim_hours: f64,
    ) {
        if charging {
            self.state.battery_percent += self.cfg.charge_rate_per_min * sim_hours * 60.0;
            if self.state.battery_percent > 100.0 {
                self.state.battery_percent = 100.0;
            }
        } else if powered || self.state.speed != 0.0 {
            self.state.battery_percent -= (self.state.speed * self.cfg.speed_discharge_rate
                + environment_temp.abs() * self.cfg.env_discharge_rate)
                * sim_hours;
            if self.state.battery_percent < 0.0 {
                self.state.battery_percent = 0.0;
            }
        }
        self.state.battery_percent = round2(self.state.battery_percent);
    }

    /// While powered: lock above the speed threshold, unlock at standstill
    /// on a manual door request, otherwise hold. Always unlocked when not
    /// powered.
    pub fn update_door_lock(&mut self, powered: bool, manual_door_open: bool) {
        if powered {
            if self.state.speed > self.cfg.door_lock_threshold {
                self.state.door_locked = true;
            } else if self.state.speed == 0.0 && manual_door_open {
                self.state.door_locked = false;
            }
        } else {
            self.state.door_locked = false;
        }
    }

    pub fn estimated_range(&self) -> f64 {
        self.state.battery_percent * self.cfg.full_battery_range_km / 100.0
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
