use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tokio::time;
use tracing::{debug, error, info, warn};

use crate::config::SimConfig;
use crate::context::{ControlContext, DetectionEvent, PowerMode};
use crate::error::SimError;
use crate::persist::{ParameterStore, StoredParams};
use crate::store::SharedStore;
use crate::vehicle::{VehicleDynamics, VehicleState, WheelDirection};

/// One publish event, emitted at most once per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishSnapshot {
    pub speed: f64,
    pub battery: f64,
    pub door_lock: bool,
    pub estimated_range: f64,
    pub obstacle_status: String,
    pub crash_detected: bool,
    pub object_type: String,
    pub odometer: f64,
    pub battery_health: f64,
    pub tyre_health: f64,
    pub brake_pads: f64,
}

/// Boundary with the pub/sub collaborator's outbound `publish` call.
pub trait SnapshotSink {
    fn publish(&mut self, snapshot: &PublishSnapshot);
}

/// Sink that serializes snapshots to JSON and fans them out on a broadcast
/// channel (and the log). Lagging or absent subscribers are not an error.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<String>,
}

impl BroadcastSink {
    pub fn new(tx: broadcast::Sender<String>) -> Self {
        Self { tx }
    }
}

impl SnapshotSink for BroadcastSink {
    fn publish(&mut self, snapshot: &PublishSnapshot) {
        match serde_json::to_string(snapshot) {
            Ok(json) => {
                info!("publish: {json}");
                let _ = self.tx.send(json);
            }
            Err(e) => error!("cannot serialize snapshot: {e}"),
        }
    }
}

/// The fixed-period simulation core.
///
/// Owns the vehicle dynamics exclusively; everything else is reached
/// through the shared store, the read-only control context, and the two
/// collaborator traits.
pub struct Simulator<K: SnapshotSink, P: ParameterStore> {
    config: SimConfig,
    dynamics: VehicleDynamics,
    store: Arc<SharedStore>,
    context: Arc<Mutex<ControlContext>>,
    sink: K,
    params: P,
}

impl<K: SnapshotSink, P: ParameterStore> Simulator<K, P> {
    /// Loads the persisted parameters and seeds the dynamics from them.
    pub fn new(
        config: SimConfig,
        store: Arc<SharedStore>,
        context: Arc<Mutex<ControlContext>>,
        sink: K,
        params: P,
    ) -> Result<Self, SimError> {
        let stored = params.load()?;
        let dynamics = VehicleDynamics::new(&config, &stored);
        Ok(Self {
            config,
            dynamics,
            store,
            context,
            sink,
            params,
        })
    }

    pub fn vehicle(&self) -> &VehicleState {
        self.dynamics.state()
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// One dynamics update, gated entirely by the control context.
    ///
    /// Powered with the key present runs the full pipeline; powered without
    /// the key, or charging, still runs the battery/door/range updates and
    /// publishes; off does nothing.
    pub fn tick(&mut self) -> Result<(), SimError> {
        let ctx = self
            .context
            .lock()
            .expect("context lock poisoned")
            .clone();

        match ctx.mode {
            PowerMode::Powered => {
                if ctx.key_present {
                    let (frame, message) = self.store.snapshot();
                    if let Some(frame) = frame {
                        let wheel = WheelDirection::from_raw(frame.wheel);
                        self.dynamics.count_brake_event(frame.brake);
                        debug!(
                            brake = frame.brake,
                            accel = frame.acceleration,
                            ?wheel,
                            brake_events = self.dynamics.state().brake_events,
                            "bus frame"
                        );
                        self.dynamics.apply_acceleration(frame.acceleration);
                        self.dynamics.apply_brake(frame.brake);
                        self.dynamics.advance_distance(self.config.sim_hours_per_tick());
                    }
                    if let Some(message) = message {
                        self.log_detection(&message);
                    }
                }
                self.publish(&ctx)
            }
            PowerMode::Charging => self.publish(&ctx),
            PowerMode::Off => Ok(()),
        }
    }

    /// Detection events feed diagnostics only; they do not alter the
    /// dynamics.
    fn log_detection(&self, message: &crate::someip::SomeIpMessage) {
        match message
            .payload
            .as_text()
            .map(serde_json::from_str::<DetectionEvent>)
        {
            Some(Ok(event)) => info!(
                service = message.service_id,
                distance = event.distance,
                object = %event.object_type,
                "detection event"
            ),
            Some(Err(e)) => warn!("detection payload is not a valid event: {e}"),
            None => warn!("detection payload is not valid UTF-8"),
        }
    }

    /// Battery, door-lock and range updates, then one publish event and one
    /// persistence write.
    fn publish(&mut self, ctx: &ControlContext) -> Result<(), SimError> {
        self.dynamics.update_battery(
            ctx.charging(),
            ctx.powered(),
            ctx.environment_temp,
            self.config.sim_hours_per_tick(),
        );
        self.dynamics
            .update_door_lock(ctx.powered(), ctx.manual_door_open);

        let state = self.dynamics.state();
        let snapshot = PublishSnapshot {
            speed: state.speed,
            battery: state.battery_percent,
            door_lock: state.door_locked,
            estimated_range: self.dynamics.estimated_range(),
            obstacle_status: if ctx.object_detected { "on" } else { "off" }.to_owned(),
            crash_detected: false,
            object_type: ctx.last_object_type.clone(),
            odometer: state.distance_travelled,
            battery_health: state.battery_health,
            tyre_health: state.tyre_health,
            brake_pads: state.brake_pads,
        };
        self.sink.publish(&snapshot);
        self.params.save(&self.stored_params())
    }

    fn stored_params(&self) -> StoredParams {
        let state = self.dynamics.state();
        StoredParams {
            distance: state.distance_travelled,
            battery: state.battery_percent,
            brake_counter: state.brake_events,
            battery_health: state.battery_health,
            tyre_health: state.tyre_health,
            brake_pads: state.brake_pads,
        }
    }

    /// Tick loop. Runs until the stop signal fires, then performs one final
    /// persistence write. Per-tick errors are logged, never fatal.
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) {
        info!(
            period_ms = self.config.tick_period.as_millis() as u64,
            sim_hours_per_tick = self.config.sim_hours_per_tick(),
            "simulation core started"
        );
        let mut interval = time::interval(self.config.tick_period);
        loop {
            tokio::select! {
                _ = stop.changed() => break,
                _ = interval.tick() => {
                    if let Err(e) = self.tick() {
                        error!("tick failed: {e}");
                    }
                }
            }
        }
        if let Err(e) = self.params.save(&self.stored_params()) {
            error!("final persistence write failed: {e}");
        }
        info!("simulation core stopped");
    }
}
