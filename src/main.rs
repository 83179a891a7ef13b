// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! CLI entry point: parses the port, window size, timeout, loss/corruption
//! probabilities, and congestion flag, builds a validated `Config`, binds
//! the UDP socket, and runs the engine. Usage text, coloring, and argument
//! plumbing live here — the engine itself knows nothing about `clap` or
//! the process environment.

use clap::{App, Arg};
use log::error;
use rft::config::Config;
use rft::engine::Engine;
use rft::fault::FaultInjector;
use rft::transport::UdpSocketTransport;
use std::process;

fn parse_args() -> Result<Config, String> {
    let matches = App::new("rft-sender")
        .about("Sender side of a selective-repeat reliable file-transfer protocol over UDP")
        .arg(
            Arg::with_name("port")
                .short("p")
                .value_name("PORT")
                .required(true)
                .help("Port number the server should listen on"),
        )
        .arg(
            Arg::with_name("window")
                .short("w")
                .value_name("WINDOW_BYTES")
                .default_value("5000")
                .help("Window size in bytes (multiple of 1000, 1000-15000)"),
        )
        .arg(
            Arg::with_name("timeout")
                .short("t")
                .value_name("TIMEOUT_MS")
                .default_value("10000")
                .help("Retransmission timeout in milliseconds"),
        )
        .arg(
            Arg::with_name("loss")
                .short("l")
                .value_name("P_LOSS")
                .default_value("0")
                .help("Probability that a received ack is lost, in [0, 1]"),
        )
        .arg(
            Arg::with_name("corrupt")
                .short("c")
                .value_name("P_CORRUPT")
                .default_value("0")
                .help("Probability that a received ack is corrupted, in [0, 1]"),
        )
        .arg(
            Arg::with_name("congestion")
                .short("x")
                .help("Enable slow-start / congestion-avoidance congestion control"),
        )
        .get_matches();

    let port: u16 = matches
        .value_of("port")
        .unwrap()
        .parse()
        .map_err(|_| "port must be a valid u16".to_string())?;
    let window_bytes: u32 = matches
        .value_of("window")
        .unwrap()
        .parse()
        .map_err(|_| "window size must be an integer".to_string())?;
    let timeout_ms: u64 = matches
        .value_of("timeout")
        .unwrap()
        .parse()
        .map_err(|_| "timeout must be an integer".to_string())?;
    let p_loss: f64 = matches
        .value_of("loss")
        .unwrap()
        .parse()
        .map_err(|_| "loss probability must be a number".to_string())?;
    let p_corrupt: f64 = matches
        .value_of("corrupt")
        .unwrap()
        .parse()
        .map_err(|_| "corruption probability must be a number".to_string())?;
    let congestion_enabled = matches.is_present("congestion");

    Config::new(port, window_bytes, timeout_ms, p_loss, p_corrupt, congestion_enabled)
        .map_err(|e| e.to_string())
}

fn main() {
    flexi_logger::Logger::with_env_or_str("info")
        .start()
        .expect("failed to start logger");

    let config = match parse_args() {
        Ok(config) => config,
        Err(details) => {
            eprintln!("** invalid arguments: {} **", details);
            process::exit(1);
        }
    };

    log::info!("starting the server");
    log::info!("  - port: {}", config.port);
    log::info!(
        "  - window size: {} bytes",
        config.window_cap_packets * rft::packet::PACKET_SIZE
    );
    log::info!("  - timeout: {} milliseconds", config.timeout_ms);
    log::info!("  - probability of a lost ack: {:.2}", config.p_loss);
    log::info!("  - probability of a corrupted ack: {:.2}", config.p_corrupt);
    if config.congestion_enabled {
        log::info!("  - congestion control activated");
    }

    let transport = match UdpSocketTransport::bind(config.port) {
        Ok(transport) => transport,
        Err(e) => {
            error!("failed to bind UDP socket: {}", e);
            process::exit(1);
        }
    };
    let fault = FaultInjector::new(config.p_loss, config.p_corrupt);
    let mut engine = Engine::new(config, transport, fault);

    if let Err(e) = engine.run() {
        error!("fatal engine error: {}", e);
        process::exit(1);
    }
}
