//! # Vehicle-State Simulator
//!
//! A real-time vehicle-state simulator that fuses three independently paced
//! telemetry sources into one continuously evolving dynamics model:
//!
//! - **CAN-style bus frames**: periodic 4-byte brake/accelerator/steering
//!   samples, latest-value semantics
//! - **SOME/IP detection events**: length-prefixed messages over UDP,
//!   drained FIFO at one message per tick
//! - **Control/context signals**: power, key, charging, environment and
//!   manual overrides delivered by a pub/sub collaborator
//!
//! The simulation core runs on a fixed wall-clock tick (100 ms standing for
//! 3 minutes of vehicle time by default), snapshots the shared state under
//! one lock, runs the dynamics state machine and emits one publish event
//! plus one persistence write per tick.
//!
//! ## Architecture
//!
//! - [`someip`] - SOME/IP frame codec
//! - [`transport`] - UDP sender/receiver tasks
//! - [`canbus`] - bus frame layout and ingestion task
//! - [`store`] - the single consistency-protected state region
//! - [`context`] - externally-set gating and parameter state
//! - [`vehicle`] - the per-tick dynamics state machine
//! - [`sim`] - the tick loop and publish/persist boundary
//! - [`persist`] - the six-column parameter record

pub mod canbus;
pub mod config;
pub mod context;
pub mod error;
pub mod persist;
pub mod sim;
pub mod someip;
pub mod store;
pub mod transport;
pub mod vehicle;

// Re-export main public types for convenience
pub use canbus::BusFrame;
pub use config::SimConfig;
pub use context::{ControlContext, PowerMode};
pub use error::SimError;
pub use sim::{PublishSnapshot, Simulator};
pub use someip::{MessagePayload, SomeIpMessage};
pub use store::SharedStore;
pub use vehicle::{VehicleState, WheelDirection};
