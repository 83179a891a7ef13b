// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! FIFO of in-flight `(packet, send_time)` entries. New entries are always
//! appended with a monotonically non-decreasing timestamp, so the tail is
//! always the newest and the head the oldest — a heap buys nothing here.

use crate::packet::Packet;
use std::collections::VecDeque;
use std::time::Instant;

pub struct TimerEntry {
    pub packet: Packet,
    pub send_time: Instant,
}

#[derive(Default)]
pub struct TimerQueue {
    entries: VecDeque<TimerEntry>,
}

impl TimerQueue {
    pub fn new() -> Self {
        TimerQueue {
            entries: VecDeque::new(),
        }
    }

    pub fn push(&mut self, packet: Packet, now: Instant) {
        self.entries.push_back(TimerEntry {
            packet,
            send_time: now,
        });
    }

    /// First-match removal; linear scan is acceptable at the window
    /// capacities this protocol supports (`<= 15`).
    pub fn remove_by_seq(&mut self, seq: u32) -> bool {
        if let Some(pos) = self.entries.iter().position(|e| e.packet.seq == seq) {
            self.entries.remove(pos);
            true
        } else {
            false
        }
    }

    pub fn head(&self) -> Option<&TimerEntry> {
        self.entries.front()
    }

    /// Removes the head entry and re-appends it with `send_time = now`,
    /// used on retransmission. The entry keeps the invariant that the head
    /// is always the earliest deadline.
    pub fn rotate_head(&mut self, now: Instant) -> Option<Packet> {
        let entry = self.entries.pop_front()?;
        let packet = entry.packet.clone();
        self.entries.push_back(TimerEntry {
            packet: entry.packet,
            send_time: now,
        });
        Some(packet)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `send_time` values taken in push/rotate order, i.e. time-ordered
    /// non-decreasing from head to tail. Used by tests asserting the
    /// queue stays time-ordered after every operation.
    #[cfg(test)]
    pub fn is_time_ordered(&self) -> bool {
        self.entries
            .iter()
            .zip(self.entries.iter().skip(1))
            .all(|(a, b)| a.send_time <= b.send_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::PacketType;
    use std::time::Duration;

    fn pkt(seq: u32) -> Packet {
        Packet::new(PacketType::Data, seq, b"x")
    }

    #[test]
    fn push_and_head_order() {
        let mut q = TimerQueue::new();
        let t0 = Instant::now();
        q.push(pkt(0), t0);
        q.push(pkt(1000), t0 + Duration::from_millis(1));
        assert_eq!(q.head().unwrap().packet.seq, 0);
        assert!(q.is_time_ordered());
    }

    #[test]
    fn remove_by_seq_removes_first_match_only() {
        let mut q = TimerQueue::new();
        let t0 = Instant::now();
        q.push(pkt(0), t0);
        q.push(pkt(1000), t0);
        assert!(q.remove_by_seq(1000));
        assert_eq!(q.len(), 1);
        assert_eq!(q.head().unwrap().packet.seq, 0);
        assert!(!q.remove_by_seq(1000));
    }

    #[test]
    fn rotate_head_moves_to_tail_with_fresh_timestamp() {
        let mut q = TimerQueue::new();
        let t0 = Instant::now();
        q.push(pkt(0), t0);
        q.push(pkt(1000), t0 + Duration::from_millis(1));

        let t1 = t0 + Duration::from_millis(50);
        let retransmitted = q.rotate_head(t1).unwrap();
        assert_eq!(retransmitted.seq, 0);
        assert_eq!(q.head().unwrap().packet.seq, 1000);
        assert!(q.is_time_ordered());
        assert_eq!(q.entries.back().unwrap().send_time, t1);
    }

    #[test]
    fn empty_queue_has_no_head() {
        let q = TimerQueue::new();
        assert!(q.is_empty());
        assert!(q.head().is_none());
    }
}
