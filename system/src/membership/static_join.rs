use std::net::SocketAddr;

use crate::channel::membership::failure_detector::Sequence;
use crate::channel::membership::list::{ListRequest, ListSender};
use crate::channel::membership::sender::{Outgoing, OutgoingSender};
use crate::info;
use crate::membership::Packet;

pub struct StaticJoin {
    list_sender: ListSender,
    outgoing: OutgoingSender,
    sequence: Sequence,
}

impl StaticJoin {
    pub async fn init(
        list_sender: ListSender,
        outgoing: OutgoingSender,
        sequence: Sequence,
    ) -> StaticJoin {
        StaticJoin {
            list_sender,
            outgoing,
            sequence,
        }
    }

    pub async fn run(&self, seeds: &[SocketAddr]) -> Result<(), Box<dyn std::error::Error>> {
        let node = ListRequest::get_node(&self.list_sender).await?;
        let alive = ListRequest::local_update(&self.list_sender).await?;

        for seed in seeds {
            if *seed == node.membership_address() {
                continue;
            }

            info!("joining through seed -> {:?}", seed);

            let ping = Packet::ping(self.sequence.next(), node, vec![alive]);

            Outgoing::send(&self.outgoing, ping, *seed)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::membership::list::ListResponse;
    use crate::membership::{Message, Update};
    use crate::node::Node;
    use std::net::IpAddr;
    use std::str::FromStr;

    #[tokio::test(flavor = "multi_thread")]
    async fn ping_every_seed() -> Result<(), Box<dyn std::error::Error>> {
        let test_node = Node::init(IpAddr::from_str("127.0.0.1")?, 25300).await?;
        let test_seeds = vec![
            SocketAddr::from_str("127.0.0.1:25301")?,
            test_node.membership_address(),
            SocketAddr::from_str("127.0.0.1:25302")?,
        ];
        let (test_list_sender, mut test_list_receiver) = ListRequest::build().await;
        let test_outgoing = Outgoing::build().await;
        let mut test_outgoing_receiver = test_outgoing.subscribe();

        tokio::spawn(async move {
            while let Some((test_request, test_response)) = test_list_receiver.recv().await {
                let _ = match test_request {
                    ListRequest::GetNode => test_response.send(ListResponse::Node(test_node)),
                    ListRequest::LocalUpdate => {
                        test_response.send(ListResponse::LocalUpdate(Update::alive(test_node, 0)))
                    }
                    _ => Ok(()),
                };
            }
        });

        let test_static_join =
            StaticJoin::init(test_list_sender, test_outgoing, Sequence::init()).await;

        test_static_join.run(&test_seeds).await?;

        for test_seed in [test_seeds[0], test_seeds[2]] {
            let Outgoing::Packet(test_ping, test_address) = test_outgoing_receiver.recv().await?;

            assert_eq!(test_address, test_seed);
            assert_eq!(test_ping.message, Message::Ping);
            assert_eq!(test_ping.sender, test_node);
            assert_eq!(test_ping.updates, vec![Update::alive(test_node, 0)]);
        }

        assert!(test_outgoing_receiver.try_recv().is_err());

        Ok(())
    }
}
