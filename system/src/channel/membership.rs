use std::fmt;

use tokio::sync::{mpsc, oneshot};

use crate::node::Node;

pub mod failure_detector;
pub mod list;
pub mod notification;
pub mod sender;
pub mod suspicion;

use notification::NotificationReceiver;

pub type MembershipReceiver =
    mpsc::Receiver<(MembershipRequest, oneshot::Sender<MembershipResponse>)>;
pub type MembershipSender = mpsc::Sender<(MembershipRequest, oneshot::Sender<MembershipResponse>)>;

#[derive(Clone, Debug)]
pub enum MembershipRequest {
    Members,
    Node,
    Subscribe,
    Shutdown,
}

impl MembershipRequest {
    pub async fn build() -> (MembershipSender, MembershipReceiver) {
        let (membership_sender, membership_receiver) =
            mpsc::channel::<(MembershipRequest, oneshot::Sender<MembershipResponse>)>(64);

        (membership_sender, membership_receiver)
    }

    pub async fn node(membership: &MembershipSender) -> Result<Node, Box<dyn std::error::Error>> {
        let (request, response) = oneshot::channel();

        membership.send((MembershipRequest::Node, request)).await?;

        match response.await? {
            MembershipResponse::Node(node) => Ok(node),
            _ => Err(Box::from(
                "unexpected response for membership node request!",
            )),
        }
    }

    pub async fn members(
        membership: &MembershipSender,
    ) -> Result<Vec<Node>, Box<dyn std::error::Error>> {
        let (request, response) = oneshot::channel();

        membership
            .send((MembershipRequest::Members, request))
            .await?;

        match response.await? {
            MembershipResponse::Members(members) => Ok(members),
            _ => Err(Box::from(
                "unexpected response for membership members request!",
            )),
        }
    }

    pub async fn subscribe(
        membership: &MembershipSender,
    ) -> Result<NotificationReceiver, Box<dyn std::error::Error>> {
        let (request, response) = oneshot::channel();

        membership
            .send((MembershipRequest::Subscribe, request))
            .await?;

        match response.await? {
            MembershipResponse::Subscribed(notifications) => Ok(notifications),
            _ => Err(Box::from(
                "unexpected response for membership subscribe request!",
            )),
        }
    }

    pub async fn shutdown(membership: &MembershipSender) -> Result<(), Box<dyn std::error::Error>> {
        let (request, _response) = oneshot::channel();

        membership
            .send((MembershipRequest::Shutdown, request))
            .await?;

        Ok(())
    }
}

#[derive(Debug)]
pub enum MembershipResponse {
    Node(Node),
    Members(Vec<Node>),
    Subscribed(NotificationReceiver),
}

impl fmt::Display for MembershipResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let membership_response = "Membership Response |";

        match self {
            MembershipResponse::Node(node) => {
                write!(f, "{} node -> {:?}", membership_response, node)
            }
            MembershipResponse::Members(members) => {
                write!(f, "{} members -> {:?}", membership_response, members)
            }
            MembershipResponse::Subscribed(_) => {
                write!(f, "{} subscribed", membership_response)
            }
        }
    }
}
