// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Top-level event loop: request intake, packet emission under window
//! constraints, ack handling, timeout handling, and return to intake on
//! completion. This is the orchestration layer around `TransferContext`;
//! it owns the transport and the fault injector, and is the only place
//! that calls `Instant::now()` for real.

use crate::config::Config;
use crate::fail::Fail;
use crate::fault::{AckFate, FaultInjector};
use crate::file_source::FileSource;
use crate::packet::{Packet, PacketType};
use crate::transfer::TransferContext;
use crate::transport::Transport;
use log::{debug, error, info, warn};
use std::net::SocketAddr;
use std::path::Path;
use std::time::{Duration, Instant};

/// How long `recv_with_timeout` waits during request intake when no
/// transfer is active, before looping back to check nothing else needs
/// doing. There's nothing else to check at intake, so this can be long.
const INTAKE_POLL: Duration = Duration::from_secs(3600);

/// Fallback wait when a transfer is active but its timer queue is briefly
/// empty (between the last ack and the next send, which cannot itself
/// block). Keeps the loop from hanging past a disabled-congestion edge
/// case where the window has room but the file has been quiesced.
const IDLE_POLL: Duration = Duration::from_millis(50);

pub struct Engine<T: Transport> {
    config: Config,
    transport: T,
    fault: FaultInjector,
}

impl<T: Transport> Engine<T> {
    pub fn new(config: Config, transport: T, fault: FaultInjector) -> Self {
        Engine {
            config,
            transport,
            fault,
        }
    }

    /// Serially serves file requests forever, one transfer at a time (no
    /// connection multiplexing), reusing the same bound socket across
    /// requests the way the source's outer `while(1)` does.
    pub fn run(&mut self) -> Result<(), Fail> {
        loop {
            if let Some((filename, peer)) = self.intake_request()? {
                // `serve_transfer` only ever returns `Err` for a fatal
                // IoError (socket send/recv failure) — a missing file is
                // handled internally and returns `Ok(())` so the server
                // keeps serving other peers. A fatal error here propagates
                // and brings the process down.
                self.serve_transfer(&filename, peer)?;
            }
        }
    }

    fn intake_request(&mut self) -> Result<Option<(String, SocketAddr)>, Fail> {
        let inbound = match self.transport.recv_with_timeout(INTAKE_POLL)? {
            Some(inbound) => inbound,
            None => return Ok(None),
        };
        let (bytes, from) = inbound;
        let pkt = match Packet::decode(&bytes) {
            Ok(pkt) => pkt,
            Err(e) => {
                debug!("malformed datagram during intake: {}", e);
                return Ok(None);
            }
        };
        if pkt.packet_type != PacketType::Request {
            let ignored = Fail::Ignored {
                details: "non-request datagram during intake",
            };
            debug!("{}", ignored);
            return Ok(None);
        }
        match pkt.request_filename() {
            Ok(filename) => {
                info!("got a request for file: {}", filename);
                Ok(Some((filename, from)))
            }
            Err(e) => {
                warn!("malformed request filename: {}", e);
                Ok(None)
            }
        }
    }

    fn serve_transfer(&mut self, filename: &str, peer: SocketAddr) -> Result<(), Fail> {
        let mut file = match FileSource::open(Path::new(filename)) {
            Ok(file) => file,
            Err(Fail::FileNotFound { path }) => {
                // The source exits the whole process on a missing file.
                // One bad filename should not take down a server serving
                // other peers, so this is handled locally instead.
                error!("requested file doesn't exist: {}", path);
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        info!(
            "file size = {}, required packets = {}",
            file.size(),
            (file.size() + crate::packet::PAYLOAD_MAX as u64 - 1)
                .max(1)
                / crate::packet::PAYLOAD_MAX as u64
        );

        let mut ctx = TransferContext::new(peer, file.size(), self.config.congestion_enabled);
        let now = Instant::now();
        let primed = ctx.prime(&mut file, &self.config, now)?;
        for pkt in &primed {
            self.emit(pkt, peer)?;
        }

        loop {
            if ctx.is_complete() {
                info!("completed file transfer to {}", peer);
                return Ok(());
            }

            match self.transport.recv_with_timeout(self.next_wait(&ctx))? {
                Some((bytes, from)) if from == peer => {
                    self.handle_datagram(&mut ctx, &mut file, &bytes, peer)?;
                }
                Some((_, other)) => {
                    let ignored = Fail::Ignored {
                        details: "datagram from unexpected peer during transfer",
                    };
                    debug!("{} ({} during transfer with {})", ignored, other, peer);
                }
                None => {
                    let now = Instant::now();
                    if let Some(pkt) = ctx.check_timeout(now, self.config.timeout_ms) {
                        warn!("timeout: retransmitted seq #{}", pkt.seq);
                        self.emit(&pkt, peer)?;
                    }
                }
            }
        }
    }

    fn handle_datagram(
        &mut self,
        ctx: &mut TransferContext,
        file: &mut FileSource,
        bytes: &[u8],
        peer: SocketAddr,
    ) -> Result<(), Fail> {
        match self.fault.apply() {
            AckFate::Dropped => {
                let ignored = Fail::Ignored {
                    details: "ack lost (fault injector)",
                };
                debug!("{}", ignored);
                return Ok(());
            }
            AckFate::Corrupted => {
                let ignored = Fail::Ignored {
                    details: "ack corrupted (fault injector)",
                };
                debug!("{}", ignored);
                return Ok(());
            }
            AckFate::Delivered => {}
        }

        let pkt = match Packet::decode(bytes) {
            Ok(pkt) if pkt.packet_type == PacketType::Ack => pkt,
            Ok(_) => {
                let ignored = Fail::Ignored {
                    details: "non-ack datagram mid-transfer",
                };
                debug!("{}", ignored);
                return Ok(());
            }
            Err(e) => {
                debug!("discarding malformed ack: {}", e);
                return Ok(());
            }
        };

        info!("received an ack: seq #{}", pkt.seq);
        let now = Instant::now();
        let sent = ctx.on_ack(pkt.seq, file, self.config.window_cap_packets, now)?;
        for pkt in &sent {
            self.emit(pkt, peer)?;
        }
        Ok(())
    }

    fn emit(&mut self, pkt: &Packet, peer: SocketAddr) -> Result<(), Fail> {
        debug!(
            "sent packet: type {:?}, seq #{}, payload size {}",
            pkt.packet_type, pkt.seq, pkt.size
        );
        self.transport.send_to(&pkt.encode(), peer)
    }

    /// How long to wait for the next datagram before re-checking the timer
    /// queue: exactly until the head entry's deadline, or a short idle
    /// poll if the queue is momentarily empty.
    fn next_wait(&self, ctx: &TransferContext) -> Duration {
        match ctx.timer_queue.head() {
            Some(entry) => {
                let deadline = entry.send_time + Duration::from_millis(self.config.timeout_ms);
                let now = Instant::now();
                deadline.saturating_duration_since(now).max(Duration::from_millis(1))
            }
            None => IDLE_POLL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::FaultInjector;
    use crate::packet::PacketType;
    use crate::transport::FakeTransport;
    use std::io::Write;
    use std::net::{IpAddr, Ipv4Addr};

    fn peer() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 6000)
    }

    fn ack(seq: u32) -> Vec<u8> {
        Packet::new(PacketType::Ack, seq, &[]).encode().to_vec()
    }

    #[test]
    fn intake_parses_request_and_ignores_non_request_datagrams() {
        let mut transport = FakeTransport::new();
        transport.push_inbound(
            Packet::new(PacketType::Ack, 0, &[]).encode().to_vec(),
            peer(),
        );
        transport.push_inbound(
            Packet::new(PacketType::Request, 0, b"file.bin").encode().to_vec(),
            peer(),
        );
        let cfg = Config::new(9000, 5000, 10000, 0.0, 0.0, false).unwrap();
        let mut engine = Engine::new(cfg, transport, FaultInjector::with_seed(0.0, 0.0, 1));

        assert!(engine.intake_request().unwrap().is_none());
        let (filename, from) = engine.intake_request().unwrap().unwrap();
        assert_eq!(filename, "file.bin");
        assert_eq!(from, peer());
    }

    #[test]
    fn full_transfer_happy_path_two_packets() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&vec![9u8; 1500]).unwrap();
        tmp.flush().unwrap();

        let transport = FakeTransport::new();
        let cfg = Config::new(9000, 5000, 10000, 0.0, 0.0, false).unwrap();
        let mut engine = Engine::new(cfg.clone(), transport, FaultInjector::with_seed(0.0, 0.0, 1));

        let mut file = FileSource::open(tmp.path()).unwrap();
        let mut ctx = TransferContext::new(peer(), file.size(), false);
        let now = Instant::now();
        let primed = ctx.prime(&mut file, &cfg, now).unwrap();
        assert_eq!(primed.len(), 2);

        engine.handle_datagram(&mut ctx, &mut file, &ack(0), peer()).unwrap();
        assert!(!ctx.is_complete());
        engine.handle_datagram(&mut ctx, &mut file, &ack(1000), peer()).unwrap();
        assert!(ctx.is_complete());
    }

    #[test]
    fn missing_file_does_not_abort_the_server() {
        let transport = FakeTransport::new();
        let cfg = Config::new(9000, 5000, 10000, 0.0, 0.0, false).unwrap();
        let mut engine = Engine::new(cfg, transport, FaultInjector::with_seed(0.0, 0.0, 1));
        // Must return Ok(()), not propagate FileNotFound, so the server
        // loops back to intake instead of exiting.
        assert!(engine.serve_transfer("/no/such/file.bin", peer()).is_ok());
    }
}
