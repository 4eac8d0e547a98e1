use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::time::Instant;

use crate::channel::membership::failure_detector::{
    Acknowledgement, AcknowledgementSender, Sequence,
};
use crate::channel::membership::list::{ListRequest, ListSender};
use crate::channel::membership::sender::{Outgoing, OutgoingSender};
use crate::channel::transition::ShutdownSender;
use crate::config::Config;
use crate::membership::{Message, Packet, Update, MAX_DATAGRAM};
use crate::node::Node;
use crate::{debug, error, info, warn};

pub struct Receiver {
    udp_socket: Arc<UdpSocket>,
    config: Config,
    list_sender: ListSender,
    outgoing: OutgoingSender,
    acknowledgements: AcknowledgementSender,
    sequence: Sequence,
    shutdown: ShutdownSender,
}

impl Receiver {
    pub async fn init(
        udp_socket: Arc<UdpSocket>,
        config: Config,
        list_sender: ListSender,
        outgoing: OutgoingSender,
        acknowledgements: AcknowledgementSender,
        sequence: Sequence,
        shutdown: ShutdownSender,
    ) -> Receiver {
        info!("initialized!");

        Receiver {
            udp_socket,
            config,
            list_sender,
            outgoing,
            acknowledgements,
            sequence,
            shutdown,
        }
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let mut buffer = [0; MAX_DATAGRAM];
        let mut shutdown = self.shutdown.subscribe();

        info!("running...");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    info!("shutting down...");

                    break
                }
                result = self.udp_socket.recv_from(&mut buffer) => {
                    match result {
                        Ok((bytes, origin)) => {
                            let packet = match Packet::decode(&buffer[..bytes]) {
                                Ok(packet) => packet,
                                Err(error) => {
                                    warn!("dropping packet from {:?} -> {}", origin, error);

                                    continue
                                }
                            };

                            let udp_message = UdpMessage::init(
                                self.config.to_owned(),
                                self.list_sender.to_owned(),
                                self.outgoing.to_owned(),
                                self.acknowledgements.to_owned(),
                                self.sequence.to_owned(),
                            )
                            .await;

                            tokio::spawn(async move {
                                if let Err(error) = udp_message.process(packet).await {
                                    error!("process udp message -> {:?}", error);
                                }
                            });
                        }
                        Err(error) => error!("receiving UDP message -> {:?}", error),
                    }
                }
            }
        }

        Ok(())
    }
}

struct UdpMessage {
    config: Config,
    list_sender: ListSender,
    outgoing: OutgoingSender,
    acknowledgements: AcknowledgementSender,
    sequence: Sequence,
}

impl UdpMessage {
    async fn init(
        config: Config,
        list_sender: ListSender,
        outgoing: OutgoingSender,
        acknowledgements: AcknowledgementSender,
        sequence: Sequence,
    ) -> UdpMessage {
        UdpMessage {
            config,
            list_sender,
            outgoing,
            acknowledgements,
            sequence,
        }
    }

    async fn process(&self, packet: Packet) -> Result<(), Box<dyn std::error::Error>> {
        let received =
            ListRequest::receive(&self.list_sender, &packet.sender, &packet.updates).await?;

        if !received.accepted {
            return Ok(());
        }

        let node = ListRequest::get_node(&self.list_sender).await?;

        match packet.message {
            Message::Ping => {
                debug!("received ping -> {:?}", &packet.sender.id);

                return self.ping(&node, &packet, received.refutation).await;
            }
            Message::PingReq(target) => {
                debug!("received ping request -> {:?}", &packet.sender.id);

                self.ping_req(&node, &packet, target).await?;
            }
            Message::Ack => {
                debug!("received ack -> {:?}", &packet.sender.id);

                self.ack(&packet);
            }
        }

        if let Some(alive) = received.refutation {
            let ping = Packet::ping(self.sequence.next(), node, vec![alive]);

            Outgoing::send(&self.outgoing, ping, packet.sender.membership_address())?;
        }

        Ok(())
    }

    async fn ping(
        &self,
        node: &Node,
        packet: &Packet,
        refutation: Option<Update>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let mut updates = ListRequest::next_batch(&self.list_sender).await?;

        if let Some(alive) = refutation {
            if !updates.contains(&alive) {
                updates.insert(0, alive);
                updates.truncate(self.config.max_gossip);
            }
        }

        let ack = Packet::ack(packet.sequence, *node, updates);

        Outgoing::send(&self.outgoing, ack, packet.sender.membership_address())?;

        Ok(())
    }

    async fn ping_req(
        &self,
        node: &Node,
        packet: &Packet,
        target: Node,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let member = ListRequest::member(&self.list_sender, target.id).await?;

        if member.is_none() {
            warn!("dropping ping request for unknown member -> {:?}", &target.id);

            return Ok(());
        }

        let mut acknowledgements = self.acknowledgements.subscribe();
        let sequence = self.sequence.next();

        let updates = ListRequest::next_batch(&self.list_sender).await?;
        let ping = Packet::ping(sequence, *node, updates);

        Outgoing::send(&self.outgoing, ping, target.membership_address())?;

        let deadline = Instant::now() + self.config.ping_timeout;

        if Acknowledgement::wait(&mut acknowledgements, sequence, deadline).await {
            let updates = ListRequest::next_batch(&self.list_sender).await?;
            let ack = Packet::ack(packet.sequence, *node, updates);

            Outgoing::send(&self.outgoing, ack, packet.sender.membership_address())?;
        }

        Ok(())
    }

    fn ack(&self, packet: &Packet) {
        if self.acknowledgements.receiver_count() > 0 {
            let acknowledgement = Acknowledgement {
                sequence: packet.sequence,
                sender: packet.sender,
            };

            let _ = self.acknowledgements.send(acknowledgement);
        }
    }
}
