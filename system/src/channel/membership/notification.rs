use tokio::sync::broadcast;

use crate::membership::{Status, Update};
use crate::node::Node;

pub type NotificationReceiver = broadcast::Receiver<Notification>;
pub type NotificationSender = broadcast::Sender<Notification>;

/// Membership change delivered to the application.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Notification {
    pub node: Node,
    pub status: Status,
    pub incarnation: u32,
}

impl Notification {
    pub async fn build() -> NotificationSender {
        let (notification_sender, _) = broadcast::channel::<Notification>(64);

        notification_sender
    }

    pub fn send(notifications: &NotificationSender, update: &Update) {
        if notifications.receiver_count() > 0 {
            let notification = Notification {
                node: update.node,
                status: update.status,
                incarnation: update.incarnation,
            };

            let _ = notifications.send(notification);
        }
    }
}
