use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Immutable simulation configuration, passed into the core at construction.
///
/// Defaults: a 100 ms wall-clock tick standing for 3 minutes of vehicle
/// time (scale factor 1800x).
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Wall-clock period of one simulation tick.
    pub tick_period: Duration,
    /// Simulated minutes represented by one wall-clock second.
    pub sim_minutes_per_second: f64,

    // Dynamics constants
    pub base_max_speed: f64,
    pub base_accel_factor: f64,
    pub base_brake_factor: f64,
    pub friction_factor: f64,
    pub low_battery_percent: f64,
    pub door_lock_threshold: f64,

    // Battery model
    /// Percent gained per simulated minute while charging.
    pub charge_rate_per_min: f64,
    /// Percent lost per km/h of speed over one simulated hour.
    pub speed_discharge_rate: f64,
    /// Percent lost per degree of ambient temperature over one simulated hour.
    pub env_discharge_rate: f64,
    /// Range in km at 100% battery.
    pub full_battery_range_km: f64,

    // Object-detection thresholds
    pub normal_object_threshold_m: f64,
    pub dust_threshold_reduction: f64,
    pub snow_threshold_reduction: f64,

    // Transport endpoints
    /// Local address the SOME/IP receiver binds to.
    pub recv_addr: SocketAddr,
    /// Destination for outbound (synthetic) detection traffic.
    pub send_addr: SocketAddr,

    /// Path of the persisted six-column parameter record.
    pub parameter_file: PathBuf,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_millis(100),
            sim_minutes_per_second: 30.0,
            base_max_speed: 120.0,
            base_accel_factor: 0.1,
            base_brake_factor: 0.05,
            friction_factor: 0.01,
            low_battery_percent: 5.0,
            door_lock_threshold: 10.0,
            charge_rate_per_min: 1.0,
            speed_discharge_rate: 0.1,
            env_discharge_rate: 0.001,
            full_battery_range_km: 400.0,
            normal_object_threshold_m: 50.0,
            dust_threshold_reduction: 0.1,
            snow_threshold_reduction: 0.2,
            recv_addr: "127.0.0.1:30490".parse().expect("static address"),
            send_addr: "127.0.0.1:30490".parse().expect("static address"),
            parameter_file: PathBuf::from("car_parameters.csv"),
        }
    }
}

impl SimConfig {
    /// Simulated hours covered by a single tick (0.05 h for the defaults).
    pub fn sim_hours_per_tick(&self) -> f64 {
        self.tick_period.as_secs_f64() * self.sim_minutes_per_second / 60.0
    }
}
