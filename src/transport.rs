// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Datagram transport abstraction. `UdpSocketTransport` is the real thing
//! (a `std::net::UdpSocket`, reused serially across transfers); `FakeTransport`
//! (test-only) lets the engine's orchestration logic run against an
//! in-memory queue instead of a real socket.

use crate::fail::Fail;
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

/// A single inbound datagram together with the address it came from.
pub type Inbound = (Vec<u8>, SocketAddr);

pub trait Transport {
    fn send_to(&mut self, bytes: &[u8], addr: SocketAddr) -> Result<(), Fail>;

    /// Waits up to `timeout` for a datagram. Returns `Ok(None)` if nothing
    /// arrived within the deadline — the readiness-based equivalent of the
    /// source's `sleep(1)` poll, but without busy-waiting.
    fn recv_with_timeout(&mut self, timeout: Duration) -> Result<Option<Inbound>, Fail>;
}

pub struct UdpSocketTransport {
    socket: UdpSocket,
    recv_buf: [u8; crate::packet::PACKET_SIZE],
}

impl UdpSocketTransport {
    pub fn bind(port: u16) -> Result<Self, Fail> {
        let socket = UdpSocket::bind(("0.0.0.0", port))?;
        Ok(UdpSocketTransport {
            socket,
            recv_buf: [0u8; crate::packet::PACKET_SIZE],
        })
    }
}

impl Transport for UdpSocketTransport {
    fn send_to(&mut self, bytes: &[u8], addr: SocketAddr) -> Result<(), Fail> {
        self.socket.send_to(bytes, addr)?;
        Ok(())
    }

    fn recv_with_timeout(&mut self, timeout: Duration) -> Result<Option<Inbound>, Fail> {
        // A zero timeout means "block forever" to UdpSocket; round up so
        // request intake still yields a readiness wait rather than a spin.
        let effective = if timeout.is_zero() {
            Duration::from_millis(1)
        } else {
            timeout
        };
        self.socket.set_read_timeout(Some(effective))?;
        match self.socket.recv_from(&mut self.recv_buf) {
            Ok((n, from)) => Ok(Some((self.recv_buf[..n].to_vec(), from))),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
pub struct FakeTransport {
    pub inbound: std::collections::VecDeque<Inbound>,
    pub outbound: Vec<(Vec<u8>, SocketAddr)>,
}

#[cfg(test)]
impl FakeTransport {
    pub fn new() -> Self {
        FakeTransport {
            inbound: std::collections::VecDeque::new(),
            outbound: Vec::new(),
        }
    }

    pub fn push_inbound(&mut self, bytes: Vec<u8>, from: SocketAddr) {
        self.inbound.push_back((bytes, from));
    }
}

#[cfg(test)]
impl Transport for FakeTransport {
    fn send_to(&mut self, bytes: &[u8], addr: SocketAddr) -> Result<(), Fail> {
        self.outbound.push((bytes.to_vec(), addr));
        Ok(())
    }

    fn recv_with_timeout(&mut self, _timeout: Duration) -> Result<Option<Inbound>, Fail> {
        Ok(self.inbound.pop_front())
    }
}
