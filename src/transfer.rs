// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Per-transfer state and its pure event transitions: send, ack, timeout.
//! State (window, timer queue, congestion controller) is kept separate
//! from the socket-polling loop that drives it — everything here is free
//! of I/O and driven entirely by values the caller provides (`Instant`s,
//! decoded packets), which is what makes the boundary scenarios below
//! testable without a real clock or socket.

use crate::config::Config;
use crate::congestion::{CongestionController, Disabled, SlowStartAvoidance};
use crate::fail::Fail;
use crate::file_source::FileSource;
use crate::packet::{Packet, PacketType, PAYLOAD_MAX};
use crate::timer_queue::TimerQueue;
use crate::window::Window;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

pub struct TransferContext {
    pub file_size: u64,
    pub read_offset: u64,
    pub next_seq: u32,
    pub peer_address: SocketAddr,
    pub window: Window,
    pub timer_queue: TimerQueue,
    pub congestion: Box<dyn CongestionController>,
}

impl TransferContext {
    pub fn new(peer_address: SocketAddr, file_size: u64, congestion_enabled: bool) -> Self {
        let congestion: Box<dyn CongestionController> = if congestion_enabled {
            Box::new(SlowStartAvoidance::new())
        } else {
            Box::new(Disabled)
        };
        TransferContext {
            file_size,
            read_offset: 0,
            next_seq: 0,
            peer_address,
            window: Window::new(),
            timer_queue: TimerQueue::new(),
            congestion,
        }
    }

    /// Reads the next chunk at `read_offset`, wraps it in a packet, assigns
    /// `next_seq`, and enrolls it in the window and timer queue. Does not
    /// gate on `read_offset < file_size` so congestion-mode priming can send
    /// a single zero-byte FIN for an empty file, matching the source.
    fn send_next(&mut self, file: &mut FileSource, now: Instant) -> Result<Option<Packet>, Fail> {
        if self.file_size > 0 && self.read_offset >= self.file_size {
            return Ok(None);
        }
        let bytes = file.read_at(self.read_offset, PAYLOAD_MAX)?;
        let n = bytes.len() as u64;
        let eof_after = self.read_offset + n >= self.file_size;
        let packet_type = if eof_after {
            PacketType::Fin
        } else {
            PacketType::Data
        };
        let packet = Packet::new(packet_type, self.next_seq, &bytes);
        self.next_seq = Packet::next_seq(self.next_seq);
        self.read_offset += n;
        self.window.push(packet.seq);
        self.timer_queue.push(packet.clone(), now);
        Ok(Some(packet))
    }

    fn fill_window(
        &mut self,
        file: &mut FileSource,
        window_cap: usize,
        now: Instant,
    ) -> Result<Vec<Packet>, Fail> {
        let mut sent = Vec::new();
        while self.window.size() < self.congestion.effective_window_packets(window_cap)
            && self.read_offset < self.file_size
        {
            match self.send_next(file, now)? {
                Some(p) => sent.push(p),
                None => break,
            }
        }
        Ok(sent)
    }

    /// Congestion mode sends exactly one packet (slow-start initial cwnd);
    /// otherwise fills up to the window cap or file end, whichever is
    /// smaller.
    pub fn prime(
        &mut self,
        file: &mut FileSource,
        config: &Config,
        now: Instant,
    ) -> Result<Vec<Packet>, Fail> {
        if config.congestion_enabled {
            Ok(self.send_next(file, now)?.into_iter().collect())
        } else {
            self.fill_window(file, config.window_cap_packets, now)
        }
    }

    /// Ack-handling event: update congestion state, retire the timer entry
    /// and window slot, slide the left edge, then top up the window.
    /// Returns newly emitted packets for the caller to put on the wire.
    pub fn on_ack(
        &mut self,
        acked_seq: u32,
        file: &mut FileSource,
        window_cap: usize,
        now: Instant,
    ) -> Result<Vec<Packet>, Fail> {
        self.congestion.on_ack();
        self.timer_queue.remove_by_seq(acked_seq);
        self.window.mark_acked(acked_seq);
        self.window.advance();
        self.fill_window(file, window_cap, now)
    }

    /// Checks the timer queue head against `timeout_ms`; if expired,
    /// rotates it to the tail with a fresh timestamp, runs the congestion
    /// timeout transition, and returns the packet to retransmit.
    pub fn check_timeout(&mut self, now: Instant, timeout_ms: u64) -> Option<Packet> {
        let expired = match self.timer_queue.head() {
            Some(entry) => now.duration_since(entry.send_time) > Duration::from_millis(timeout_ms),
            None => false,
        };
        if !expired {
            return None;
        }
        let packet = self.timer_queue.rotate_head(now)?;
        self.congestion.on_timeout();
        Some(packet)
    }

    pub fn is_complete(&self) -> bool {
        self.timer_queue.is_empty() && self.read_offset >= self.file_size
    }
}
