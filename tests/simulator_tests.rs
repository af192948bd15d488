use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use carbus::canbus::BusFrame;
use carbus::persist::{ParameterStore, StoredParams};
use carbus::sim::{PublishSnapshot, SnapshotSink};
use carbus::someip::{MessagePayload, SomeIpMessage};
use carbus::{ControlContext, SharedStore, SimConfig, SimError, Simulator};

/// Captures every publish for later assertions.
#[derive(Debug, Clone, Default)]
struct RecordingSink {
    snapshots: Arc<Mutex<Vec<PublishSnapshot>>>,
}

impl RecordingSink {
    fn published(&self) -> Vec<PublishSnapshot> {
        self.snapshots.lock().unwrap().clone()
    }
}

impl SnapshotSink for RecordingSink {
    fn publish(&mut self, snapshot: &PublishSnapshot) {
        self.snapshots.lock().unwrap().push(snapshot.clone());
    }
}

/// In-memory stand-in for the CSV file.
#[derive(Debug, Clone)]
struct MemoryParams {
    inner: Arc<Mutex<(StoredParams, usize)>>,
}

impl MemoryParams {
    fn new(params: StoredParams) -> Self {
        Self {
            inner: Arc::new(Mutex::new((params, 0))),
        }
    }

    fn saves(&self) -> usize {
        self.inner.lock().unwrap().1
    }

    fn last(&self) -> StoredParams {
        self.inner.lock().unwrap().0.clone()
    }
}

impl ParameterStore for MemoryParams {
    fn load(&self) -> Result<StoredParams, SimError> {
        Ok(self.inner.lock().unwrap().0.clone())
    }

    fn save(&self, params: &StoredParams) -> Result<(), SimError> {
        let mut inner = self.inner.lock().unwrap();
        inner.0 = params.clone();
        inner.1 += 1;
        Ok(())
    }
}

struct Harness {
    simulator: Simulator<RecordingSink, MemoryParams>,
    store: Arc<SharedStore>,
    context: Arc<Mutex<ControlContext>>,
    sink: RecordingSink,
    params: MemoryParams,
}

fn harness(context: ControlContext) -> Harness {
    let config = SimConfig::default();
    let store = Arc::new(SharedStore::new());
    let context = Arc::new(Mutex::new(context));
    let sink = RecordingSink::default();
    let params = MemoryParams::new(StoredParams::default());

    let simulator = Simulator::new(
        config,
        Arc::clone(&store),
        Arc::clone(&context),
        sink.clone(),
        params.clone(),
    )
    .expect("simulator construction failed");

    Harness {
        simulator,
        store,
        context,
        sink,
        params,
    }
}

fn driving_context() -> ControlContext {
    let mut ctx = ControlContext::new(&SimConfig::default());
    ctx.apply_power(r#"{"car_power": true}"#).unwrap();
    ctx.apply_key_status(r#"{"key_status": "present"}"#).unwrap();
    ctx.apply_simulation_state(r#"{"simulation_state": true}"#)
        .unwrap();
    ctx
}

fn charging_context() -> ControlContext {
    let mut ctx = ControlContext::new(&SimConfig::default());
    ctx.apply_charging(r#"{"charging_state": true}"#).unwrap();
    ctx
}

#[test]
fn test_powered_tick_runs_the_full_pipeline() {
    let mut h = harness(driving_context());
    h.store.put_frame(BusFrame {
        brake: 0,
        acceleration: 200,
        wheel: 1,
    });

    h.simulator.tick().expect("tick failed");

    let published = h.sink.published();
    assert_eq!(published.len(), 1);
    let snap = &published[0];
    assert_eq!(snap.speed, 35.33);
    assert_eq!(snap.odometer, 1.77);
    assert_eq!(snap.battery, 79.82); // 80 - (3.533 + 0.021) * 0.05 h
    assert!(snap.door_lock); // above the 10 km/h lock threshold
    assert!((snap.estimated_range - 319.28).abs() < 1e-9); // 79.82% of 400 km
    assert_eq!(snap.obstacle_status, "off");
    assert!(!snap.crash_detected);

    // Every tick ends in one persistence write.
    assert_eq!(h.params.saves(), 1);
    let saved = h.params.last();
    assert_eq!(saved.distance, 1.77);
    assert_eq!(saved.battery, 79.82);
}

#[test]
fn test_off_tick_is_silent() {
    let mut h = harness(ControlContext::new(&SimConfig::default()));
    h.store.put_frame(BusFrame {
        brake: 0,
        acceleration: 200,
        wheel: 0,
    });

    h.simulator.tick().expect("tick failed");

    assert!(h.sink.published().is_empty());
    assert_eq!(h.params.saves(), 0);
    // The frame is left for whenever the car powers on.
    let (frame, _) = h.store.snapshot();
    assert!(frame.is_some());
}

#[test]
fn test_charging_tick_charges_and_unlocks() {
    let mut h = harness(charging_context());

    h.simulator.tick().expect("tick failed");

    let published = h.sink.published();
    assert_eq!(published.len(), 1);
    let snap = &published[0];
    assert_eq!(snap.speed, 0.0);
    assert_eq!(snap.battery, 83.0); // 1%/min over 3 simulated minutes
    assert!(!snap.door_lock);
    assert_eq!(h.params.saves(), 1);
}

#[test]
fn test_charging_battery_is_capped() {
    let mut h = harness(charging_context());

    for _ in 0..10 {
        h.simulator.tick().expect("tick failed");
    }

    let published = h.sink.published();
    assert_eq!(published.last().unwrap().battery, 100.0);
    assert!(published.iter().all(|s| s.battery <= 100.0));
}

#[test]
fn test_powered_without_key_skips_dynamics_but_publishes() {
    let mut ctx = ControlContext::new(&SimConfig::default());
    ctx.apply_power(r#"{"car_power": true}"#).unwrap();
    let mut h = harness(ctx);
    h.store.put_frame(BusFrame {
        brake: 0,
        acceleration: 200,
        wheel: 0,
    });

    h.simulator.tick().expect("tick failed");

    let published = h.sink.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].speed, 0.0);
    assert_eq!(published[0].odometer, 0.0);

    // The frame was never consumed.
    let (frame, _) = h.store.snapshot();
    assert!(frame.is_some());
}

#[test]
fn test_at_most_one_detection_message_per_tick() {
    let mut h = harness(driving_context());
    for session in 0..3 {
        h.store.push_message(SomeIpMessage::new(
            0x1234,
            0x5678,
            0x0001,
            session,
            1,
            1,
            2,
            0,
            MessagePayload::Text(r#"{"distance": 20.0, "object_type": "car"}"#.to_owned()),
        ));
    }

    h.simulator.tick().expect("tick failed");
    assert_eq!(h.store.pending_messages(), 2);

    h.simulator.tick().expect("tick failed");
    assert_eq!(h.store.pending_messages(), 1);
}

#[test]
fn test_detection_flag_is_reflected_in_the_snapshot() {
    let mut h = harness(driving_context());
    {
        let mut ctx = h.context.lock().unwrap();
        ctx.apply_detection(r#"{"distance": 8.0, "object_type": "red_signal"}"#)
            .unwrap();
    }

    h.simulator.tick().expect("tick failed");

    let published = h.sink.published();
    assert_eq!(published[0].obstacle_status, "on");
    assert_eq!(published[0].object_type, "red_signal");
}

#[tokio::test(start_paused = true)]
async fn test_run_persists_on_shutdown() {
    let h = harness(driving_context());
    let params = h.params.clone();
    let (stop_tx, stop_rx) = watch::channel(false);

    let task = tokio::spawn(h.simulator.run(stop_rx));
    stop_tx.send(true).expect("stop signal failed");
    task.await.expect("simulation task panicked");

    // At least the final shutdown write must have happened.
    assert!(params.saves() >= 1);
}
