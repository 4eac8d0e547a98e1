use std::net::SocketAddr;
use tokio::sync::broadcast;

use crate::membership::Packet;

pub type OutgoingReceiver = broadcast::Receiver<Outgoing>;
pub type OutgoingSender = broadcast::Sender<Outgoing>;

#[derive(Clone, Debug)]
pub enum Outgoing {
    Packet(Packet, SocketAddr),
}

impl Outgoing {
    pub async fn build() -> OutgoingSender {
        let (outgoing_sender, _) = broadcast::channel::<Outgoing>(256);

        outgoing_sender
    }

    pub fn send(
        outgoing: &OutgoingSender,
        packet: Packet,
        target: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        outgoing.send(Outgoing::Packet(packet, target))?;

        Ok(())
    }
}
