use std::net::{IpAddr, Ipv6Addr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;
use crate::membership::update::Update;
use crate::node::Node;

/// Size of the receive buffer. Packets that encode to more are never sent.
pub const MAX_DATAGRAM: usize = 1024;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Message {
    Ack,
    Ping,
    PingReq(Node),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    pub message: Message,
    pub sequence: u64,
    pub sender: Node,
    pub updates: Vec<Update>,
}

impl Packet {
    pub fn ack(sequence: u64, sender: Node, updates: Vec<Update>) -> Packet {
        Packet {
            message: Message::Ack,
            sequence,
            sender,
            updates,
        }
    }

    pub fn ping(sequence: u64, sender: Node, updates: Vec<Update>) -> Packet {
        Packet {
            message: Message::Ping,
            sequence,
            sender,
            updates,
        }
    }

    pub fn ping_req(sequence: u64, sender: Node, target: Node, updates: Vec<Update>) -> Packet {
        Packet {
            message: Message::PingReq(target),
            sequence,
            sender,
            updates,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        let bytes = postcard::to_stdvec(self)?;

        if bytes.len() > MAX_DATAGRAM {
            return Err(Error::OversizedPacket(bytes.len()));
        }

        Ok(bytes)
    }

    /// Encoded size of the largest packet carrying `updates` updates: a
    /// `PingReq` between IPv6 nodes with every counter at its maximum.
    pub fn max_encoded_len(updates: usize) -> Result<usize, Error> {
        let node = Node {
            id: Uuid::from_u128(u128::MAX),
            address: IpAddr::V6(Ipv6Addr::from(u128::MAX)),
            membership_port: u16::MAX,
        };
        let update = Update::failed(node, u32::MAX);
        let packet = Packet::ping_req(u64::MAX, node, node, vec![update; updates]);

        Ok(postcard::to_stdvec(&packet)?.len())
    }

    pub fn decode(bytes: &[u8]) -> Result<Packet, Error> {
        Ok(postcard::from_bytes(bytes)?)
    }
}
