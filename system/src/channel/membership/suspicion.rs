use tokio::sync::mpsc;
use tokio::time::Duration;
use uuid::Uuid;

use crate::membership::Update;

pub type SuspicionReceiver = mpsc::Receiver<SuspicionRequest>;
pub type SuspicionSender = mpsc::Sender<SuspicionRequest>;

#[derive(Clone, Debug)]
pub enum SuspicionRequest {
    Arm(Update, Duration),
    Cancel(Uuid),
    Shutdown,
}

impl SuspicionRequest {
    pub async fn build() -> (SuspicionSender, SuspicionReceiver) {
        let (suspicion_sender, suspicion_receiver) = mpsc::channel::<SuspicionRequest>(64);

        (suspicion_sender, suspicion_receiver)
    }

    pub async fn arm(
        suspicion: &SuspicionSender,
        suspected: Update,
        after: Duration,
    ) -> Result<(), Box<dyn std::error::Error>> {
        suspicion
            .send(SuspicionRequest::Arm(suspected, after))
            .await?;

        Ok(())
    }

    pub async fn cancel(
        suspicion: &SuspicionSender,
        id: Uuid,
    ) -> Result<(), Box<dyn std::error::Error>> {
        suspicion.send(SuspicionRequest::Cancel(id)).await?;

        Ok(())
    }

    pub async fn shutdown(suspicion: &SuspicionSender) -> Result<(), Box<dyn std::error::Error>> {
        suspicion.send(SuspicionRequest::Shutdown).await?;

        Ok(())
    }
}
