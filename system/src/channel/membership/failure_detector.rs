use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{timeout_at, Instant};

use crate::node::Node;

pub type AcknowledgementReceiver = broadcast::Receiver<Acknowledgement>;
pub type AcknowledgementSender = broadcast::Sender<Acknowledgement>;

#[derive(Clone, Debug, PartialEq)]
pub struct Acknowledgement {
    pub sequence: u64,
    pub sender: Node,
}

impl Acknowledgement {
    pub async fn build() -> AcknowledgementSender {
        let (sender, _receiver) = broadcast::channel::<Acknowledgement>(64);

        sender
    }

    /// Waits until an ack for `sequence` shows up or `deadline` passes.
    pub async fn wait(
        receiver: &mut AcknowledgementReceiver,
        sequence: u64,
        deadline: Instant,
    ) -> bool {
        let matching = async {
            loop {
                match receiver.recv().await {
                    Ok(acknowledgement) if acknowledgement.sequence == sequence => return true,
                    Ok(_) | Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => return false,
                }
            }
        };

        matches!(timeout_at(deadline, matching).await, Ok(true))
    }
}

/// Probe round numbers, shared by the failure detector and ping request relays.
#[derive(Clone, Debug, Default)]
pub struct Sequence {
    next: Arc<AtomicU64>,
}

impl Sequence {
    pub fn init() -> Sequence {
        Sequence {
            next: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}
