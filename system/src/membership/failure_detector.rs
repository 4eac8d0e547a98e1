use tokio::time::{interval, Instant, MissedTickBehavior};

use crate::channel::membership::failure_detector::{
    Acknowledgement, AcknowledgementSender, Sequence,
};
use crate::channel::membership::list::{ListRequest, ListSender};
use crate::channel::membership::sender::{Outgoing, OutgoingSender};
use crate::channel::transition::ShutdownSender;
use crate::config::Config;
use crate::membership::Packet;
use crate::node::Node;
use crate::{debug, error, info, warn};

/// Outcome of one protocol period.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Probe {
    Skipped,
    Acknowledged(Node),
    Suspected(Node),
}

pub struct FailureDetector {
    config: Config,
    list_sender: ListSender,
    outgoing: OutgoingSender,
    acknowledgements: AcknowledgementSender,
    sequence: Sequence,
    shutdown: ShutdownSender,
}

impl FailureDetector {
    pub async fn init(
        config: Config,
        list_sender: ListSender,
        outgoing: OutgoingSender,
        acknowledgements: AcknowledgementSender,
        sequence: Sequence,
        shutdown: ShutdownSender,
    ) -> FailureDetector {
        info!("initialized!");

        FailureDetector {
            config,
            list_sender,
            outgoing,
            acknowledgements,
            sequence,
            shutdown,
        }
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let mut shutdown = self.shutdown.subscribe();
        let mut protocol_period = interval(self.config.protocol_period);

        protocol_period.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("running...");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    info!("shutting down...");

                    break
                }
                result = async {
                    protocol_period.tick().await;

                    self.probe().await
                } => {
                    match result {
                        Ok(Probe::Skipped) => debug!("no members to probe"),
                        Ok(Probe::Acknowledged(target)) => debug!("probe acknowledged -> {:?}", &target.id),
                        Ok(Probe::Suspected(target)) => warn!("probe unanswered -> {:?}", &target),
                        Err(error) => error!("probe failed with error -> {:?}", error),
                    }
                }
            }
        }

        Ok(())
    }

    async fn probe(&self) -> Result<Probe, Box<dyn std::error::Error>> {
        let period_end = Instant::now() + self.config.protocol_period;
        let target = ListRequest::next_target(&self.list_sender).await?;

        match target {
            Some(target) => self.probe_member(target, period_end).await,
            None => Ok(Probe::Skipped),
        }
    }

    async fn probe_member(
        &self,
        target: Node,
        period_end: Instant,
    ) -> Result<Probe, Box<dyn std::error::Error>> {
        let node = ListRequest::get_node(&self.list_sender).await?;
        let mut acknowledgements = self.acknowledgements.subscribe();
        let sequence = self.sequence.next();

        let updates = ListRequest::next_batch(&self.list_sender).await?;
        let ping = Packet::ping(sequence, node, updates);

        Outgoing::send(&self.outgoing, ping, target.membership_address())?;

        let ping_deadline = Instant::now() + self.config.ping_timeout;

        if Acknowledgement::wait(&mut acknowledgements, sequence, ping_deadline).await {
            return Ok(Probe::Acknowledged(target));
        }

        let relays = ListRequest::random_members(
            &self.list_sender,
            self.config.indirect_probes,
            target.id,
        )
        .await?;

        debug!(
            "no ack from {:?}, requesting {} indirect probes",
            &target.id,
            relays.len(),
        );

        for relay in &relays {
            let updates = ListRequest::next_batch(&self.list_sender).await?;
            let ping_req = Packet::ping_req(sequence, node, target, updates);

            Outgoing::send(&self.outgoing, ping_req, relay.membership_address())?;
        }

        if Acknowledgement::wait(&mut acknowledgements, sequence, period_end).await {
            return Ok(Probe::Acknowledged(target));
        }

        let suspected = ListRequest::suspect(&self.list_sender, target.id).await?;

        if let Some(suspected) = suspected {
            let ping = Packet::ping(self.sequence.next(), node, vec![suspected]);

            Outgoing::send(&self.outgoing, ping, target.membership_address())?;
        }

        Ok(Probe::Suspected(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::membership::notification::{Notification, NotificationReceiver};
    use crate::channel::membership::suspicion::{SuspicionReceiver, SuspicionRequest};
    use crate::channel::transition::Shutdown;
    use crate::membership::list::List;
    use crate::membership::{Message, Status, Update};
    use std::net::IpAddr;
    use std::str::FromStr;
    use tokio::sync::broadcast::error::TryRecvError;
    use tokio::time::{timeout, Duration};

    fn test_config() -> Config {
        Config {
            protocol_period: Duration::from_millis(150),
            ping_timeout: Duration::from_millis(30),
            indirect_probes: 2,
            lambda: 2.0,
            ..Config::default()
        }
    }

    async fn test_node(port: u16) -> Result<Node, Box<dyn std::error::Error>> {
        Node::init(IpAddr::from_str("127.0.0.1")?, port).await
    }

    async fn test_list(
        test_local: Node,
        test_members: &[Node],
    ) -> Result<(ListSender, SuspicionReceiver, NotificationReceiver), Box<dyn std::error::Error>>
    {
        let (test_list_sender, test_list_receiver) = ListRequest::build().await;
        let (test_suspicion_sender, test_suspicion_receiver) = SuspicionRequest::build().await;
        let test_notifications = Notification::build().await;
        let test_notification_receiver = test_notifications.subscribe();

        let mut test_list = List::init(
            test_config(),
            test_local,
            test_list_receiver,
            test_suspicion_sender,
            test_notifications,
            Shutdown::build().await,
        )
        .await?;

        tokio::spawn(async move { test_list.run().await.is_ok() });

        for test_member in test_members {
            ListRequest::receive(&test_list_sender, test_member, &[]).await?;
        }

        Ok((
            test_list_sender,
            test_suspicion_receiver,
            test_notification_receiver,
        ))
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn probe_skips_empty_group() -> Result<(), Box<dyn std::error::Error>> {
        let test_local = test_node(25000).await?;
        let (test_list_sender, _test_suspicion, _test_notifications) =
            test_list(test_local, &[]).await?;

        let test_failure_detector = FailureDetector::init(
            test_config(),
            test_list_sender,
            Outgoing::build().await,
            Acknowledgement::build().await,
            Sequence::init(),
            Shutdown::build().await,
        )
        .await;

        assert_eq!(test_failure_detector.probe().await?, Probe::Skipped);

        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn direct_ack_ends_the_round() -> Result<(), Box<dyn std::error::Error>> {
        let test_local = test_node(25000).await?;
        let test_target = test_node(25001).await?;
        let (test_list_sender, _test_suspicion, _test_notifications) =
            test_list(test_local, &[test_target]).await?;
        let test_outgoing = Outgoing::build().await;
        let mut test_outgoing_receiver = test_outgoing.subscribe();
        let test_acknowledgements = Acknowledgement::build().await;

        let test_failure_detector = FailureDetector::init(
            test_config(),
            test_list_sender,
            test_outgoing,
            test_acknowledgements.to_owned(),
            Sequence::init(),
            Shutdown::build().await,
        )
        .await;

        let test_probe = tokio::spawn(async move { test_failure_detector.probe().await.ok() });

        let Outgoing::Packet(test_ping, test_address) = test_outgoing_receiver.recv().await?;

        assert_eq!(test_ping.message, Message::Ping);
        assert_eq!(test_ping.sender, test_local);
        assert_eq!(test_address, test_target.membership_address());
        assert!(test_ping.updates.contains(&Update::alive(test_target, 0)));

        test_acknowledgements.send(Acknowledgement {
            sequence: test_ping.sequence,
            sender: test_target,
        })?;

        assert_eq!(test_probe.await?, Some(Probe::Acknowledged(test_target)));

        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn relayed_ack_prevents_suspicion() -> Result<(), Box<dyn std::error::Error>> {
        let test_local = test_node(25000).await?;
        let test_target = test_node(25001).await?;
        let test_first_relay = test_node(25002).await?;
        let test_second_relay = test_node(25003).await?;
        let (test_list_sender, _test_suspicion, mut test_notifications) = test_list(
            test_local,
            &[test_target, test_first_relay, test_second_relay],
        )
        .await?;

        for _ in 0..3 {
            test_notifications.recv().await?;
        }

        let test_outgoing = Outgoing::build().await;
        let mut test_outgoing_receiver = test_outgoing.subscribe();
        let test_acknowledgements = Acknowledgement::build().await;

        let test_failure_detector = FailureDetector::init(
            test_config(),
            test_list_sender.to_owned(),
            test_outgoing,
            test_acknowledgements.to_owned(),
            Sequence::init(),
            Shutdown::build().await,
        )
        .await;

        let test_period_end = Instant::now() + Duration::from_millis(150);
        let test_probe = tokio::spawn(async move {
            test_failure_detector
                .probe_member(test_target, test_period_end)
                .await
                .ok()
        });

        let Outgoing::Packet(test_ping, _) = test_outgoing_receiver.recv().await?;

        assert_eq!(test_ping.message, Message::Ping);

        let mut test_relays = Vec::with_capacity(2);

        for _ in 0..2 {
            let Outgoing::Packet(test_ping_req, test_address) =
                test_outgoing_receiver.recv().await?;

            assert_eq!(test_ping_req.message, Message::PingReq(test_target));
            assert_eq!(test_ping_req.sequence, test_ping.sequence);
            assert_ne!(test_address, test_target.membership_address());

            test_relays.push(test_address);
        }

        assert_ne!(test_relays[0], test_relays[1]);

        test_acknowledgements.send(Acknowledgement {
            sequence: test_ping.sequence,
            sender: test_first_relay,
        })?;

        assert_eq!(test_probe.await?, Some(Probe::Acknowledged(test_target)));
        assert!(matches!(
            test_notifications.try_recv(),
            Err(TryRecvError::Empty),
        ));
        assert_eq!(
            ListRequest::member(&test_list_sender, test_target.id).await?,
            Some(test_target),
        );

        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unanswered_probe_suspects_target() -> Result<(), Box<dyn std::error::Error>> {
        let test_local = test_node(25000).await?;
        let test_target = test_node(25001).await?;
        let (test_list_sender, mut test_suspicion, mut test_notifications) =
            test_list(test_local, &[test_target]).await?;

        test_notifications.recv().await?;

        let test_outgoing = Outgoing::build().await;
        let mut test_outgoing_receiver = test_outgoing.subscribe();

        let test_failure_detector = FailureDetector::init(
            test_config(),
            test_list_sender,
            test_outgoing,
            Acknowledgement::build().await,
            Sequence::init(),
            Shutdown::build().await,
        )
        .await;

        let test_probe = timeout(Duration::from_secs(2), test_failure_detector.probe()).await??;

        assert_eq!(test_probe, Probe::Suspected(test_target));
        assert_eq!(
            test_notifications.recv().await?,
            Notification {
                node: test_target,
                status: Status::Suspected,
                incarnation: 0,
            },
        );
        assert!(matches!(
            test_suspicion.recv().await,
            Some(SuspicionRequest::Arm(test_update, _)) if test_update == Update::suspected(test_target, 0),
        ));

        let Outgoing::Packet(test_ping, _) = test_outgoing_receiver.recv().await?;

        assert_eq!(test_ping.message, Message::Ping);

        let Outgoing::Packet(test_fast_track, test_address) = test_outgoing_receiver.recv().await?;

        assert_eq!(test_fast_track.message, Message::Ping);
        assert_eq!(test_fast_track.updates, vec![Update::suspected(test_target, 0)]);
        assert_eq!(test_address, test_target.membership_address());

        Ok(())
    }
}
