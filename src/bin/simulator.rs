use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::time;
use tracing::{error, info};

use carbus::persist::CsvParameterStore;
use carbus::sim::BroadcastSink;
use carbus::someip::{MessagePayload, SomeIpMessage};
use carbus::{canbus, transport, ControlContext, SharedStore, SimConfig, Simulator};

const BUS_CHANNEL_SIZE: usize = 16;
const SNAPSHOT_BROADCAST_BUFFER_SIZE: usize = 256;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    println!("🚗 Vehicle-State Simulator");
    println!("==========================");

    let config = SimConfig::default();
    let store = Arc::new(SharedStore::new());
    let context = Arc::new(Mutex::new(ControlContext::new(&config)));

    // Stand-in for the pub/sub collaborator: bring the car up so the demo
    // runs dynamics out of the box.
    {
        let mut ctx = context.lock().expect("context lock poisoned");
        ctx.apply_power(r#"{"car_power": true}"#)?;
        ctx.apply_key_status(r#"{"key_status": "present"}"#)?;
        ctx.apply_simulation_state(r#"{"simulation_state": true}"#)?;
    }

    // Sockets are bound before any task is spawned; a failure here aborts
    // startup.
    let recv_socket = transport::bind_receiver(config.recv_addr).await?;
    let send_socket = transport::bind_sender().await?;

    let (stop_tx, stop_rx) = watch::channel(false);
    let (bus_tx, bus_rx) = mpsc::channel::<Vec<u8>>(BUS_CHANNEL_SIZE);
    let (outbound_tx, outbound_rx) = mpsc::channel::<Vec<u8>>(transport::OUTBOUND_QUEUE_SIZE);
    let (snapshot_tx, _) = broadcast::channel(SNAPSHOT_BROADCAST_BUFFER_SIZE);

    let receiver_task = tokio::spawn(transport::run_receiver(
        recv_socket,
        Arc::clone(&store),
        stop_rx.clone(),
    ));
    // Synthetic detection traffic loops back to our own receiver.
    let sender_task = tokio::spawn(transport::run_sender(
        send_socket,
        config.send_addr,
        outbound_rx,
        stop_rx.clone(),
    ));
    let ingestion_task = tokio::spawn(canbus::run_bus_ingestion(
        bus_rx,
        Arc::clone(&store),
        stop_rx.clone(),
    ));
    // Stand-in for the hardware bus adapter.
    let generator_task = tokio::spawn(run_input_generator(bus_tx, outbound_tx, stop_rx.clone()));

    let simulator = Simulator::new(
        config.clone(),
        Arc::clone(&store),
        Arc::clone(&context),
        BroadcastSink::new(snapshot_tx),
        CsvParameterStore::new(&config.parameter_file),
    )?;
    let sim_task = tokio::spawn(simulator.run(stop_rx));

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    let _ = stop_tx.send(true);

    if let Err(e) = sim_task.await {
        error!("simulation task panicked: {e}");
    }
    for task in [receiver_task, sender_task, ingestion_task, generator_task] {
        let _ = task.await;
    }

    println!("🚗 Vehicle-State Simulator stopped");
    Ok(())
}

/// Synthetic driver: sweeps the accelerator, pulses the brake and swings the
/// wheel, with a detection event every few seconds.
async fn run_input_generator(
    bus_tx: mpsc::Sender<Vec<u8>>,
    outbound_tx: mpsc::Sender<Vec<u8>>,
    mut stop: watch::Receiver<bool>,
) {
    let mut interval = time::interval(Duration::from_millis(100));
    let mut tick: u64 = 0;
    loop {
        tokio::select! {
            _ = stop.changed() => break,
            _ = interval.tick() => {
                tick += 1;
                let phase = (tick % 100) as f64 / 100.0 * std::f64::consts::TAU;
                let accel = (phase.sin().max(0.0) * 200.0) as i16;
                let brake: u8 = if tick % 80 < 6 { 120 } else { 0 };
                let wheel: u8 = [0u8, 60, 200][(tick / 30 % 3) as usize];

                let mut record = vec![brake];
                record.extend_from_slice(&accel.to_be_bytes());
                record.push(wheel);
                record.push(0); // wire pad byte
                if bus_tx.send(record).await.is_err() {
                    break;
                }

                if tick % 50 == 0 {
                    let event = format!(
                        r#"{{"distance": {:.1}, "object_type": "pedestrian"}}"#,
                        30.0 + (tick % 7) as f64 * 5.0
                    );
                    let message = SomeIpMessage::new(
                        0x1234,
                        0x5678,
                        0x0001,
                        (tick % u64::from(u16::MAX)) as u16,
                        1,
                        1,
                        2,
                        0,
                        MessagePayload::Text(event),
                    );
                    let _ = outbound_tx.send(message.encode()).await;
                }
            }
        }
    }
    info!("input generator stopped");
}
