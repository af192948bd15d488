use std::net::SocketAddr;
use std::time::Duration;

use clap::{App, Arg, SubCommand};
use colored::*;
use tokio::sync::{mpsc, watch};
use tokio::time;

use carbus::someip::{MessagePayload, SomeIpMessage};
use carbus::transport;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: &str = "30490";

const DETECTION_SERVICE_ID: u16 = 0x1234;
const DETECTION_METHOD_ID: u16 = 0x5678;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = App::new("carbus")
        .version("0.1.0")
        .author("Vehicle Systems Engineering Team")
        .about("🚗 Vehicle-state simulator test-traffic tool")
        .arg(
            Arg::with_name("host")
                .short("h")
                .long("host")
                .value_name("HOST")
                .help("Simulator host address")
                .takes_value(true)
                .default_value(DEFAULT_HOST)
                .global(true),
        )
        .arg(
            Arg::with_name("port")
                .short("p")
                .long("port")
                .value_name("PORT")
                .help("Simulator SOME/IP port")
                .takes_value(true)
                .default_value(DEFAULT_PORT)
                .global(true),
        )
        .subcommand(
            SubCommand::with_name("detect")
                .about("📦 Send synthetic object-detection events")
                .arg(
                    Arg::with_name("distance")
                        .short("d")
                        .long("distance")
                        .value_name("METERS")
                        .help("Detected object distance")
                        .takes_value(true)
                        .default_value("42.0")
                        .validator(|v| {
                            v.parse::<f64>()
                                .map(|_| ())
                                .map_err(|_| "distance must be a number".into())
                        }),
                )
                .arg(
                    Arg::with_name("object-type")
                        .short("o")
                        .long("object-type")
                        .value_name("TYPE")
                        .help("Object type")
                        .takes_value(true)
                        .possible_values(&["car", "pedestrian", "red_signal", "unknown"])
                        .default_value("pedestrian"),
                )
                .arg(
                    Arg::with_name("count")
                        .short("n")
                        .long("count")
                        .value_name("N")
                        .help("Number of events to send")
                        .takes_value(true)
                        .default_value("1")
                        .validator(|v| {
                            v.parse::<u16>()
                                .map(|_| ())
                                .map_err(|_| "count must be a number".into())
                        }),
                ),
        )
        .subcommand(
            SubCommand::with_name("malformed")
                .about("🔧 Send a truncated datagram (receiver should drop it)"),
        )
        .get_matches();

    let host = matches.value_of("host").unwrap_or(DEFAULT_HOST);
    let port: u16 = matches.value_of("port").unwrap_or(DEFAULT_PORT).parse()?;
    let dest: SocketAddr = format!("{host}:{port}").parse()?;

    match matches.subcommand() {
        ("detect", Some(sub_matches)) => {
            let distance: f64 = sub_matches.value_of("distance").unwrap_or("42.0").parse()?;
            let object_type = sub_matches.value_of("object-type").unwrap_or("pedestrian");
            let count: u16 = sub_matches.value_of("count").unwrap_or("1").parse()?;

            let mut packets = Vec::new();
            for session in 0..count {
                let payload = format!(
                    r#"{{"distance": {distance}, "object_type": "{object_type}"}}"#
                );
                let message = SomeIpMessage::new(
                    DETECTION_SERVICE_ID,
                    DETECTION_METHOD_ID,
                    0x0001,
                    session,
                    1,
                    1,
                    2,
                    0,
                    MessagePayload::Text(payload),
                );
                packets.push(message.encode());
            }
            send_packets(dest, packets).await?;
            println!(
                "{} sent {} detection event(s) to {}",
                "✅".green(),
                count.to_string().bright_cyan(),
                dest.to_string().bright_white()
            );
        }
        ("malformed", _) => {
            send_packets(dest, vec![vec![0xDE, 0xAD, 0xBE]]).await?;
            println!(
                "{} sent a truncated datagram to {}",
                "✅".green(),
                dest.to_string().bright_white()
            );
        }
        _ => {
            println!(
                "{}",
                "No command specified. Use --help for usage information.".yellow()
            );
            println!("{}", "Quick start:".bright_green());
            println!(
                "  {} Send one pedestrian event",
                "carbus detect".bright_cyan()
            );
            println!(
                "  {} Stress the receiver's error path",
                "carbus malformed".bright_cyan()
            );
        }
    }

    Ok(())
}

/// Drains the packets through the crate's sender task, same as the
/// simulator's own synthetic-traffic path.
async fn send_packets(
    dest: SocketAddr,
    packets: Vec<Vec<u8>>,
) -> Result<(), Box<dyn std::error::Error>> {
    let socket = transport::bind_sender().await?;
    let (stop_tx, stop_rx) = watch::channel(false);
    let (tx, rx) = mpsc::channel(transport::OUTBOUND_QUEUE_SIZE);

    let sender = tokio::spawn(transport::run_sender(socket, dest, rx, stop_rx));
    for packet in packets {
        tx.send(packet).await?;
        time::sleep(Duration::from_millis(10)).await;
    }
    drop(tx); // sender exits once the queue is drained
    sender.await?;
    drop(stop_tx);
    Ok(())
}
