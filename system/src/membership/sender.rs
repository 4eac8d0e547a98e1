use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::broadcast::error::RecvError;

use crate::channel::membership::sender::{Outgoing, OutgoingReceiver, OutgoingSender};
use crate::channel::transition::ShutdownSender;
use crate::{info, warn};

pub struct Sender {
    udp_socket: Arc<UdpSocket>,
    outgoing: OutgoingReceiver,
    shutdown: ShutdownSender,
}

impl Sender {
    /// Subscribes to `outgoing` right away so nothing queued before `run` is lost.
    pub async fn init(
        udp_socket: Arc<UdpSocket>,
        outgoing: &OutgoingSender,
        shutdown: ShutdownSender,
    ) -> Sender {
        info!("initialized!");

        Sender {
            udp_socket,
            outgoing: outgoing.subscribe(),
            shutdown,
        }
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let mut shutdown = self.shutdown.subscribe();

        info!("running...");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    info!("shutting down...");

                    break
                }
                result = self.outgoing.recv() => {
                    match result {
                        Ok(Outgoing::Packet(packet, target)) => {
                            let bytes = match packet.encode() {
                                Ok(bytes) => bytes,
                                Err(error) => {
                                    warn!("encoding packet -> {}", error);

                                    continue
                                }
                            };

                            if let Err(error) = self.udp_socket.send_to(&bytes, target).await {
                                warn!("sending UDP message to {:?} -> {:?}", target, error);
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!("outgoing lagged, dropped {} packets", skipped);
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            }
        }

        Ok(())
    }
}
