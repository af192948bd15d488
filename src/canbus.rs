use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::error::SimError;
use crate::store::SharedStore;

/// Minimum record size: brake (u8), acceleration (i16), wheel (u8).
pub const BUS_FRAME_LEN: usize = 4;

/// One decoded brake/accelerator/steering-wheel sample.
///
/// Transient: each new frame overwrites the previous one in the shared
/// store, frames are never queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusFrame {
    pub brake: u8,
    pub acceleration: i16,
    pub wheel: u8,
}

impl BusFrame {
    /// Unpacks the big-endian wire record. Bytes past the first four (the
    /// pad the adapter puts on the wire) are ignored.
    pub fn unpack(raw: &[u8]) -> Result<Self, SimError> {
        if raw.len() < BUS_FRAME_LEN {
            return Err(SimError::MalformedFrame(raw.len()));
        }
        Ok(Self {
            brake: raw[0],
            acceleration: i16::from_be_bytes([raw[1], raw[2]]),
            wheel: raw[3],
        })
    }
}

/// Bus ingestion task.
///
/// Reads raw records from the bus-adapter boundary (an mpsc channel fed by
/// the out-of-scope driver), unpacks them and overwrites the latest triple
/// in the shared store. Unreadable records are logged and skipped; the loop
/// exits only on the stop signal or when the adapter goes away.
pub async fn run_bus_ingestion(
    mut frames: mpsc::Receiver<Vec<u8>>,
    store: Arc<SharedStore>,
    mut stop: watch::Receiver<bool>,
) {
    info!("bus ingestion started");
    loop {
        tokio::select! {
            _ = stop.changed() => break,
            received = frames.recv() => match received {
                Some(raw) => match BusFrame::unpack(&raw) {
                    Ok(frame) => store.put_frame(frame),
                    Err(e) => warn!("dropping unreadable bus record: {e}"),
                },
                None => {
                    warn!("bus adapter channel closed");
                    break;
                }
            },
        }
    }
    info!("bus ingestion stopped");
}
