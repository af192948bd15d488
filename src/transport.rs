use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};
use tokio::time;
use tracing::{info, warn};

use crate::error::SimError;
use crate::someip::SomeIpMessage;
use crate::store::SharedStore;

/// Bound on the outbound synthetic-traffic queue.
pub const OUTBOUND_QUEUE_SIZE: usize = 64;

/// How long the sender waits for a packet before re-checking the stop
/// signal.
const SEND_WAIT: Duration = Duration::from_secs(1);

/// Per-attempt receive timeout; keeps the receiver responsive to the stop
/// signal without busy-spinning.
const RECV_POLL: Duration = Duration::from_millis(200);

/// Pause between receive attempts.
const RECV_YIELD: Duration = Duration::from_millis(10);

const RECV_BUFFER_SIZE: usize = 4096;

/// Binds the listening socket once at startup. Failure here is fatal and
/// must abort startup before the receiver task is spawned.
pub async fn bind_receiver(addr: SocketAddr) -> Result<UdpSocket, SimError> {
    UdpSocket::bind(addr)
        .await
        .map_err(|e| SimError::Configuration(format!("cannot bind receiver socket on {addr}: {e}")))
}

/// Opens the ephemeral send socket, reused for the life of the sender task.
pub async fn bind_sender() -> Result<UdpSocket, SimError> {
    UdpSocket::bind("0.0.0.0:0")
        .await
        .map_err(|e| SimError::Configuration(format!("cannot open send socket: {e}")))
}

/// Receiver task: decodes inbound datagrams and appends them to the shared
/// inbox. Malformed frames are logged and dropped; the loop only exits on
/// the stop signal.
pub async fn run_receiver(
    socket: UdpSocket,
    store: Arc<SharedStore>,
    stop: watch::Receiver<bool>,
) {
    match socket.local_addr() {
        Ok(addr) => info!(%addr, "datagram receiver started"),
        Err(_) => info!("datagram receiver started"),
    }
    let mut buf = [0u8; RECV_BUFFER_SIZE];
    loop {
        if *stop.borrow() {
            break;
        }
        match time::timeout(RECV_POLL, socket.recv_from(&mut buf)).await {
            Ok(Ok((len, from))) => match SomeIpMessage::decode(&buf[..len]) {
                Ok(message) => store.push_message(message),
                Err(e) => warn!(%from, "dropping datagram: {e}"),
            },
            Ok(Err(e)) => warn!("receive failed: {e}"),
            Err(_) => {} // quiet socket, re-check the stop signal
        }
        time::sleep(RECV_YIELD).await;
    }
    info!("datagram receiver stopped");
}

/// Sender task: drains the outbound queue to `dest`, fire-and-forget.
/// Transmission failures are logged and the packet is skipped; there is no
/// retry and no backpressure signal to the producer.
pub async fn run_sender(
    socket: UdpSocket,
    dest: SocketAddr,
    mut outbound: mpsc::Receiver<Vec<u8>>,
    stop: watch::Receiver<bool>,
) {
    info!(%dest, "datagram sender started");
    loop {
        if *stop.borrow() {
            break;
        }
        match time::timeout(SEND_WAIT, outbound.recv()).await {
            Ok(Some(packet)) => {
                if let Err(e) = socket.send_to(&packet, dest).await {
                    warn!(%dest, "send failed: {e}");
                }
            }
            Ok(None) => break, // all producers gone
            Err(_) => {} // queue idle, re-check the stop signal
        }
    }
    info!("datagram sender stopped");
}
