use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;

use crate::channel::membership::failure_detector::{Acknowledgement, Sequence};
use crate::channel::membership::list::ListRequest;
use crate::channel::membership::notification::{Notification, NotificationSender};
use crate::channel::membership::sender::Outgoing;
use crate::channel::membership::suspicion::SuspicionRequest;
use crate::channel::membership::{MembershipReceiver, MembershipRequest, MembershipResponse};
use crate::channel::transition::{Shutdown, ShutdownSender};
use crate::config::Config;
use crate::node::Node;
use crate::{error, info, warn};

pub use dissemination::{retransmit_limit, DisseminationQueue};
pub use failure_detector::Probe;
pub use message::{Message, Packet, MAX_DATAGRAM};
pub use table::{Applied, Member, MembershipTable};
pub use targets::TargetList;
pub use update::{Status, Update};

use failure_detector::FailureDetector;
use list::List;
use receiver::Receiver;
use sender::Sender;
use static_join::StaticJoin;
use suspicion::Suspicion;

mod dissemination;
mod failure_detector;
mod list;
mod message;
mod receiver;
mod sender;
mod static_join;
mod suspicion;
mod table;
mod targets;
mod update;

pub struct Membership {
    config: Config,
    node: Node,
    receiver: MembershipReceiver,
    notifications: NotificationSender,
    shutdown: ShutdownSender,
}

impl Membership {
    pub async fn init(
        config: Config,
        node: Node,
        receiver: MembershipReceiver,
        shutdown: ShutdownSender,
    ) -> Result<Membership, Box<dyn std::error::Error>> {
        config.validate()?;

        let notifications = Notification::build().await;

        info!("initialized!");

        Ok(Membership {
            config,
            node,
            receiver,
            notifications,
            shutdown,
        })
    }

    pub async fn run(&mut self, seeds: Vec<SocketAddr>) -> Result<(), Box<dyn std::error::Error>> {
        let udp_socket = Arc::new(UdpSocket::bind(self.node.membership_address()).await?);

        info!("listening on -> {:?}", udp_socket.local_addr()?);

        let (list_sender, list_receiver) = ListRequest::build().await;
        let (suspicion_sender, suspicion_receiver) = SuspicionRequest::build().await;
        let outgoing = Outgoing::build().await;
        let acknowledgements = Acknowledgement::build().await;
        let sequence = Sequence::init();

        let mut list = List::init(
            self.config.to_owned(),
            self.node,
            list_receiver,
            suspicion_sender.to_owned(),
            self.notifications.to_owned(),
            self.shutdown.to_owned(),
        )
        .await?;

        tokio::spawn(async move {
            if let Err(error) = list.run().await {
                error!("membership list -> {:?}", error);
            }
        });

        let mut suspicion = Suspicion::init(list_sender.to_owned(), suspicion_receiver).await;

        tokio::spawn(async move {
            if let Err(error) = suspicion.run().await {
                error!("membership suspicion -> {:?}", error);
            }
        });

        let mut sender =
            Sender::init(udp_socket.to_owned(), &outgoing, self.shutdown.to_owned()).await;

        tokio::spawn(async move {
            if let Err(error) = sender.run().await {
                error!("membership sender -> {:?}", error);
            }
        });

        let mut receiver = Receiver::init(
            udp_socket,
            self.config.to_owned(),
            list_sender.to_owned(),
            outgoing.to_owned(),
            acknowledgements.to_owned(),
            sequence.to_owned(),
            self.shutdown.to_owned(),
        )
        .await;

        tokio::spawn(async move {
            if let Err(error) = receiver.run().await {
                error!("membership receiver -> {:?}", error);
            }
        });

        let mut failure_detector = FailureDetector::init(
            self.config.to_owned(),
            list_sender.to_owned(),
            outgoing.to_owned(),
            acknowledgements,
            sequence.to_owned(),
            self.shutdown.to_owned(),
        )
        .await;

        tokio::spawn(async move {
            if let Err(error) = failure_detector.run().await {
                error!("membership failure detector -> {:?}", error);
            }
        });

        let static_join = StaticJoin::init(list_sender.to_owned(), outgoing, sequence).await;

        static_join.run(&seeds).await?;

        let mut shutdown = self.shutdown.subscribe();

        info!("running...");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    info!("shutting down...");

                    break
                }
                request = self.receiver.recv() => {
                    let (request, response) = match request {
                        Some(request) => request,
                        None => break,
                    };

                    match request {
                        MembershipRequest::Members => {
                            let members = ListRequest::members(&list_sender).await?;

                            response.send(MembershipResponse::Members(members)).ok();
                        }
                        MembershipRequest::Node => {
                            response.send(MembershipResponse::Node(self.node)).ok();
                        }
                        MembershipRequest::Subscribe => {
                            let notifications = self.notifications.subscribe();

                            response
                                .send(MembershipResponse::Subscribed(notifications))
                                .ok();
                        }
                        MembershipRequest::Shutdown => {
                            info!("shutting down...");

                            Shutdown::send(&self.shutdown).await?;

                            if let Err(error) = ListRequest::shutdown(&list_sender).await {
                                warn!("stopping membership list -> {:?}", error);
                            }

                            if let Err(error) = SuspicionRequest::shutdown(&suspicion_sender).await {
                                warn!("stopping membership suspicion -> {:?}", error);
                            }

                            self.receiver.close();

                            break
                        }
                    }
                }
            }
        }

        Ok(())
    }
}
