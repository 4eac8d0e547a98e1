use crate::channel::membership::list::{ListReceiver, ListRequest, ListResponse, Received};
use crate::channel::membership::notification::{Notification, NotificationSender};
use crate::channel::membership::suspicion::{SuspicionRequest, SuspicionSender};
use crate::channel::transition::{Shutdown, ShutdownSender};
use crate::config::Config;
use crate::error::Error;
use crate::membership::dissemination::{retransmit_limit, DisseminationQueue};
use crate::membership::table::{Applied, MembershipTable};
use crate::membership::targets::TargetList;
use crate::membership::update::{Status, Update};
use crate::node::Node;
use crate::{debug, error, info, warn};

pub struct List {
    config: Config,
    table: MembershipTable,
    dissemination: DisseminationQueue,
    targets: TargetList,
    receiver: ListReceiver,
    suspicion: SuspicionSender,
    notifications: NotificationSender,
    shutdown: ShutdownSender,
}

impl List {
    pub async fn init(
        config: Config,
        server: Node,
        receiver: ListReceiver,
        suspicion: SuspicionSender,
        notifications: NotificationSender,
        shutdown: ShutdownSender,
    ) -> Result<List, Box<dyn std::error::Error>> {
        let table = MembershipTable::init(server, config.removed_capacity);
        let dissemination = DisseminationQueue::init();
        let targets = TargetList::init();

        info!("initialized!");

        Ok(List {
            config,
            table,
            dissemination,
            targets,
            receiver,
            suspicion,
            notifications,
            shutdown,
        })
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        info!("running...");

        while let Some((request, response)) = self.receiver.recv().await {
            let handled = match request {
                ListRequest::GetNode => {
                    let node = self.table.local();

                    response.send(ListResponse::Node(node)).ok();

                    Ok(())
                }
                ListRequest::LocalUpdate => {
                    let update = self.table.local_update();

                    response.send(ListResponse::LocalUpdate(update)).ok();

                    Ok(())
                }
                ListRequest::Members => {
                    let members = self.table.members();

                    response.send(ListResponse::Members(members)).ok();

                    Ok(())
                }
                ListRequest::Member(id) => {
                    let member = self.table.get(&id).map(|member| member.node);

                    response.send(ListResponse::Member(member)).ok();

                    Ok(())
                }
                ListRequest::NextTarget => {
                    let target = self.targets.next();

                    response.send(ListResponse::Target(target)).ok();

                    Ok(())
                }
                ListRequest::NextBatch => {
                    let batch = self.next_batch();

                    response.send(ListResponse::Batch(batch)).ok();

                    Ok(())
                }
                ListRequest::RandomMembers(count, exclude) => {
                    let members = self.table.random_members(count, &exclude);

                    response.send(ListResponse::Members(members)).ok();

                    Ok(())
                }
                ListRequest::Receive(sender, updates) => {
                    self.receive(sender, &updates).await.map(|received| {
                        response.send(ListResponse::Received(received)).ok();
                    })
                }
                ListRequest::Suspect(id) => self.suspect(&id).await.map(|suspected| {
                    response.send(ListResponse::Suspected(suspected)).ok();
                }),
                ListRequest::Confirm(suspected) => self.confirm(&suspected).await.map(|changed| {
                    response.send(ListResponse::Applied(changed)).ok();
                }),
                ListRequest::Shutdown => {
                    info!("shutting down...");

                    self.receiver.close();

                    Ok(())
                }
            };

            if let Err(Error::IncarnationExhausted) = handled {
                error!("incarnation exhausted, leaving the group...");

                self.receiver.close();

                if let Err(error) = SuspicionRequest::shutdown(&self.suspicion).await {
                    warn!("stopping membership suspicion -> {:?}", error);
                }

                if self.shutdown.receiver_count() > 0 {
                    Shutdown::send(&self.shutdown).await?;
                }

                return Err(Box::new(Error::IncarnationExhausted));
            }
        }

        Ok(())
    }

    fn next_batch(&mut self) -> Vec<Update> {
        let limit = retransmit_limit(self.config.lambda, self.table.len() + 1);

        self.dissemination.next_batch(self.config.max_gossip, limit)
    }

    async fn receive(&mut self, sender: Node, updates: &[Update]) -> Result<Received, Error> {
        if self.table.is_removed(&sender.id) {
            warn!("dropping packet from removed member -> {:?}", &sender.id);

            return Ok(Received {
                accepted: false,
                refutation: None,
            });
        }

        if sender.id != self.table.local().id && self.table.get(&sender.id).is_none() {
            self.apply(&Update::alive(sender, 0)).await?;
        }

        let mut refutation = None;

        for update in updates {
            if let Applied::Refuted(alive) = self.apply(update).await? {
                refutation = Some(alive);
            }
        }

        Ok(Received {
            accepted: true,
            refutation,
        })
    }

    async fn apply(&mut self, update: &Update) -> Result<Applied, Error> {
        let applied = self.table.apply(update)?;

        match &applied {
            Applied::Ignored => return Ok(applied),
            Applied::Joined => {
                info!("member joined -> {:?} {:?}", &update.node, &update.status);

                self.targets.insert(update.node);

                if update.status == Status::Suspected {
                    self.arm(update).await;
                }
            }
            Applied::Updated(previous) => {
                debug!(
                    "member updated -> {:?} {:?} -> {:?}@{}",
                    &update.node.id, previous, &update.status, update.incarnation,
                );

                match update.status {
                    Status::Suspected => self.arm(update).await,
                    Status::Alive if *previous == Status::Suspected => {
                        self.cancel(update).await
                    }
                    _ => {}
                }
            }
            Applied::Removed => {
                info!("member failed -> {:?}", &update.node);

                self.targets.remove(&update.node.id);
                self.dissemination.purge(&update.node.id);
                self.cancel(update).await;
            }
            Applied::Refuted(alive) => {
                warn!("refuting suspicion with incarnation {}", alive.incarnation);

                self.dissemination.enqueue(*alive);

                Notification::send(&self.notifications, alive);

                return Ok(applied);
            }
        }

        self.dissemination.enqueue(*update);

        Notification::send(&self.notifications, update);

        Ok(applied)
    }

    async fn suspect(&mut self, id: &uuid::Uuid) -> Result<Option<Update>, Error> {
        let suspected = match self.table.get(id) {
            Some(member) if member.status == Status::Alive => {
                Update::suspected(member.node, member.incarnation)
            }
            _ => return Ok(None),
        };

        match self.apply(&suspected).await? {
            Applied::Ignored => Ok(None),
            _ => Ok(Some(suspected)),
        }
    }

    async fn confirm(&mut self, suspected: &Update) -> Result<bool, Error> {
        let still_suspected = match self.table.get(&suspected.node.id) {
            Some(member) => {
                member.status == Status::Suspected && member.incarnation == suspected.incarnation
            }
            None => false,
        };

        if !still_suspected {
            return Ok(false);
        }

        let failed = Update::failed(suspected.node, suspected.incarnation);

        Ok(self.apply(&failed).await?.changed())
    }

    async fn arm(&self, suspected: &Update) {
        let after = self.config.suspicion_timeout(self.table.len() + 1);

        if let Err(error) = SuspicionRequest::arm(&self.suspicion, *suspected, after).await {
            error!("arming suspicion timer -> {:?}", error);
        }
    }

    async fn cancel(&self, update: &Update) {
        if let Err(error) = SuspicionRequest::cancel(&self.suspicion, update.node.id).await {
            error!("cancelling suspicion timer -> {:?}", error);
        }
    }
}
