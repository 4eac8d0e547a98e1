use std::collections::HashMap;

use tokio::task::JoinHandle;
use tokio::time::sleep;
use uuid::Uuid;

use crate::channel::membership::list::{ListRequest, ListSender};
use crate::channel::membership::suspicion::{SuspicionReceiver, SuspicionRequest};
use crate::{debug, error, info};

/// Keeps one failure timer per suspected member.
pub struct Suspicion {
    list_sender: ListSender,
    receiver: SuspicionReceiver,
    timers: HashMap<Uuid, JoinHandle<()>>,
}

impl Suspicion {
    pub async fn init(list_sender: ListSender, receiver: SuspicionReceiver) -> Suspicion {
        info!("initialized!");

        Suspicion {
            list_sender,
            receiver,
            timers: HashMap::with_capacity(10),
        }
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        info!("running...");

        while let Some(request) = self.receiver.recv().await {
            self.timers.retain(|_, timer| !timer.is_finished());

            match request {
                SuspicionRequest::Arm(suspected, after) => {
                    let list_sender = self.list_sender.to_owned();

                    debug!("arming timer for {:?} -> {:?}", &suspected.node.id, &after);

                    let timer = tokio::spawn(async move {
                        sleep(after).await;

                        match ListRequest::confirm(&list_sender, &suspected).await {
                            Ok(true) => info!("suspicion confirmed -> {:?}", &suspected.node),
                            Ok(false) => {}
                            Err(error) => error!("confirming suspicion -> {:?}", error),
                        }
                    });

                    if let Some(previous) = self.timers.insert(suspected.node.id, timer) {
                        previous.abort();
                    }
                }
                SuspicionRequest::Cancel(id) => {
                    if let Some(timer) = self.timers.remove(&id) {
                        debug!("cancelling timer for {:?}", &id);

                        timer.abort();
                    }
                }
                SuspicionRequest::Shutdown => {
                    info!("shutting down...");

                    for (_, timer) in self.timers.drain() {
                        timer.abort();
                    }

                    self.receiver.close();
                }
            }
        }

        Ok(())
    }
}
