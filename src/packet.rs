// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Fixed-layout on-wire datagram: 16-byte header + 984-byte payload = 1000
//! bytes total. Field widths are pinned (`u32`/`u32`/`u32`/`u32`) rather than
//! left as C `int`/`size_t`, so two builds on different platforms agree on
//! the wire format.

use crate::fail::Fail;
use byteorder::{ByteOrder, LittleEndian};

/// Total payload capacity of a single packet.
pub const PAYLOAD_MAX: usize = 984;
/// Total bytes of a packet on the wire (header + payload).
pub const PACKET_SIZE: usize = 1000;
/// Inclusive upper bound on sequence numbers before wraparound.
pub const MAX_SEQ: u32 = 30000;

const HEADER_SIZE: usize = 16;
const TYPE_OFFSET: usize = 0;
const SEQ_OFFSET: usize = 4;
const SIZE_OFFSET: usize = 8;
const CHECKSUM_OFFSET: usize = 12;
const PAYLOAD_OFFSET: usize = HEADER_SIZE;

const _: () = assert_layout();
const fn assert_layout() {
    if PAYLOAD_OFFSET + PAYLOAD_MAX != PACKET_SIZE {
        panic!("header/payload layout does not add up to PACKET_SIZE");
    }
}

/// Wire value `0` is reserved for the client's file request; the sender
/// parses it on intake but never emits it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PacketType {
    Request = 0,
    Data = 1,
    Ack = 2,
    Fin = 3,
}

impl PacketType {
    fn from_u32(v: u32) -> Result<Self, Fail> {
        match v {
            0 => Ok(PacketType::Request),
            1 => Ok(PacketType::Data),
            2 => Ok(PacketType::Ack),
            3 => Ok(PacketType::Fin),
            _ => Err(Fail::MalformedPacket {
                details: "unknown packet type",
            }),
        }
    }
}

#[derive(Clone)]
pub struct Packet {
    pub packet_type: PacketType,
    pub seq: u32,
    pub size: u32,
    pub checksum: u32,
    pub payload: [u8; PAYLOAD_MAX],
}

impl Packet {
    pub fn new(packet_type: PacketType, seq: u32, payload: &[u8]) -> Self {
        assert!(payload.len() <= PAYLOAD_MAX);
        let mut buf = [0u8; PAYLOAD_MAX];
        buf[..payload.len()].copy_from_slice(payload);
        let mut pkt = Packet {
            packet_type,
            seq,
            size: payload.len() as u32,
            checksum: 0,
            payload: buf,
        };
        pkt.checksum = pkt.compute_checksum();
        pkt
    }

    /// CRC-32 (IEEE) over the valid payload bytes `[0, size)`. Receivers
    /// validate this; the sender only ever fills it.
    pub fn compute_checksum(&self) -> u32 {
        crc::crc32::checksum_ieee(&self.payload[..self.size as usize])
    }

    /// Filename carried by a request packet: payload up to the first NUL,
    /// decoded as UTF-8.
    pub fn request_filename(&self) -> Result<String, Fail> {
        let end = self.payload[..self.size as usize]
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.size as usize);
        String::from_utf8(self.payload[..end].to_vec()).map_err(|_| Fail::MalformedPacket {
            details: "request filename is not valid UTF-8",
        })
    }

    pub fn encode(&self) -> [u8; PACKET_SIZE] {
        let mut out = [0u8; PACKET_SIZE];
        LittleEndian::write_u32(&mut out[TYPE_OFFSET..], self.packet_type as u32);
        LittleEndian::write_u32(&mut out[SEQ_OFFSET..], self.seq);
        LittleEndian::write_u32(&mut out[SIZE_OFFSET..], self.size);
        LittleEndian::write_u32(&mut out[CHECKSUM_OFFSET..], self.checksum);
        out[PAYLOAD_OFFSET..].copy_from_slice(&self.payload);
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, Fail> {
        if bytes.len() != PACKET_SIZE {
            return Err(Fail::MalformedPacket {
                details: "packet is not PACKET_SIZE bytes",
            });
        }
        let packet_type = PacketType::from_u32(LittleEndian::read_u32(&bytes[TYPE_OFFSET..]))?;
        let seq = LittleEndian::read_u32(&bytes[SEQ_OFFSET..]);
        let size = LittleEndian::read_u32(&bytes[SIZE_OFFSET..]);
        if size as usize > PAYLOAD_MAX {
            return Err(Fail::MalformedPacket {
                details: "size exceeds PAYLOAD_MAX",
            });
        }
        let checksum = LittleEndian::read_u32(&bytes[CHECKSUM_OFFSET..]);
        let mut payload = [0u8; PAYLOAD_MAX];
        payload.copy_from_slice(&bytes[PAYLOAD_OFFSET..]);
        Ok(Packet {
            packet_type,
            seq,
            size,
            checksum,
            payload,
        })
    }

    /// Next sequence number per the wraparound rule: advance by
    /// `PACKET_SIZE`, wrap to 0 once the result would exceed `MAX_SEQ`.
    pub fn next_seq(current: u32) -> u32 {
        let next = current + PACKET_SIZE as u32;
        if next <= MAX_SEQ {
            next
        } else {
            0
        }
    }
}

impl std::fmt::Debug for Packet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Packet")
            .field("type", &self.packet_type)
            .field("seq", &self.seq)
            .field("size", &self.size)
            .field("checksum", &self.checksum)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrip() {
        let pkt = Packet::new(PacketType::Data, 1000, b"hello world");
        let bytes = pkt.encode();
        assert_eq!(bytes.len(), PACKET_SIZE);
        let decoded = Packet::decode(&bytes).unwrap();
        assert_eq!(decoded.packet_type, PacketType::Data);
        assert_eq!(decoded.seq, 1000);
        assert_eq!(decoded.size, 11);
        assert_eq!(decoded.checksum, pkt.checksum);
        assert_eq!(&decoded.payload[..11], b"hello world");
    }

    #[test]
    fn decode_rejects_wrong_length() {
        let bytes = vec![0u8; PACKET_SIZE - 1];
        match Packet::decode(&bytes) {
            Err(Fail::MalformedPacket { .. }) => (),
            other => panic!("expected MalformedPacket, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn decode_rejects_unknown_type() {
        let mut bytes = [0u8; PACKET_SIZE];
        LittleEndian::write_u32(&mut bytes[TYPE_OFFSET..], 99);
        assert!(Packet::decode(&bytes).is_err());
    }

    #[test]
    fn seq_wraparound() {
        assert_eq!(Packet::next_seq(0), 1000);
        assert_eq!(Packet::next_seq(29000), 30000);
        assert_eq!(Packet::next_seq(30000), 0);
    }

    #[test]
    fn request_filename_parses_to_first_nul() {
        let mut payload = [0u8; PAYLOAD_MAX];
        payload[..8].copy_from_slice(b"test.txt");
        let pkt = Packet {
            packet_type: PacketType::Request,
            seq: 0,
            size: PAYLOAD_MAX as u32,
            checksum: 0,
            payload,
        };
        assert_eq!(pkt.request_filename().unwrap(), "test.txt");
    }
}
