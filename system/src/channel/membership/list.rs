use std::fmt;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::membership::Update;
use crate::node::Node;

pub type ListReceiver = mpsc::Receiver<(ListRequest, oneshot::Sender<ListResponse>)>;
pub type ListSender = mpsc::Sender<(ListRequest, oneshot::Sender<ListResponse>)>;

#[derive(Clone, Debug)]
pub enum ListRequest {
    GetNode,
    LocalUpdate,
    Members,
    Member(Uuid),
    NextTarget,
    NextBatch,
    RandomMembers(usize, Uuid),
    Receive(Node, Vec<Update>),
    Suspect(Uuid),
    Confirm(Update),
    Shutdown,
}

impl ListRequest {
    pub async fn build() -> (ListSender, ListReceiver) {
        let (list_sender, list_receiver) =
            mpsc::channel::<(ListRequest, oneshot::Sender<ListResponse>)>(64);

        (list_sender, list_receiver)
    }

    pub async fn get_node(list: &ListSender) -> Result<Node, Box<dyn std::error::Error>> {
        let (request, response) = oneshot::channel();

        list.send((ListRequest::GetNode, request)).await?;

        match response.await? {
            ListResponse::Node(node) => Ok(node),
            _ => Err(Box::from("unexpected list get node response!")),
        }
    }

    pub async fn local_update(list: &ListSender) -> Result<Update, Box<dyn std::error::Error>> {
        let (request, response) = oneshot::channel();

        list.send((ListRequest::LocalUpdate, request)).await?;

        match response.await? {
            ListResponse::LocalUpdate(update) => Ok(update),
            _ => Err(Box::from("unexpected list local update response!")),
        }
    }

    pub async fn members(list: &ListSender) -> Result<Vec<Node>, Box<dyn std::error::Error>> {
        let (request, response) = oneshot::channel();

        list.send((ListRequest::Members, request)).await?;

        match response.await? {
            ListResponse::Members(members) => Ok(members),
            _ => Err(Box::from("unexpected list members response!")),
        }
    }

    pub async fn member(
        list: &ListSender,
        id: Uuid,
    ) -> Result<Option<Node>, Box<dyn std::error::Error>> {
        let (request, response) = oneshot::channel();

        list.send((ListRequest::Member(id), request)).await?;

        match response.await? {
            ListResponse::Member(member) => Ok(member),
            _ => Err(Box::from("unexpected list member response!")),
        }
    }

    pub async fn next_target(
        list: &ListSender,
    ) -> Result<Option<Node>, Box<dyn std::error::Error>> {
        let (request, response) = oneshot::channel();

        list.send((ListRequest::NextTarget, request)).await?;

        match response.await? {
            ListResponse::Target(target) => Ok(target),
            _ => Err(Box::from("unexpected list next target response!")),
        }
    }

    pub async fn next_batch(list: &ListSender) -> Result<Vec<Update>, Box<dyn std::error::Error>> {
        let (request, response) = oneshot::channel();

        list.send((ListRequest::NextBatch, request)).await?;

        match response.await? {
            ListResponse::Batch(updates) => Ok(updates),
            _ => Err(Box::from("unexpected list next batch response!")),
        }
    }

    pub async fn random_members(
        list: &ListSender,
        count: usize,
        exclude: Uuid,
    ) -> Result<Vec<Node>, Box<dyn std::error::Error>> {
        let (request, response) = oneshot::channel();

        list.send((ListRequest::RandomMembers(count, exclude), request))
            .await?;

        match response.await? {
            ListResponse::Members(members) => Ok(members),
            _ => Err(Box::from("unexpected list random members response!")),
        }
    }

    pub async fn receive(
        list: &ListSender,
        sender: &Node,
        updates: &[Update],
    ) -> Result<Received, Box<dyn std::error::Error>> {
        let (request, response) = oneshot::channel();

        list.send((ListRequest::Receive(*sender, updates.to_vec()), request))
            .await?;

        match response.await? {
            ListResponse::Received(received) => Ok(received),
            _ => Err(Box::from("unexpected list receive response!")),
        }
    }

    pub async fn suspect(
        list: &ListSender,
        id: Uuid,
    ) -> Result<Option<Update>, Box<dyn std::error::Error>> {
        let (request, response) = oneshot::channel();

        list.send((ListRequest::Suspect(id), request)).await?;

        match response.await? {
            ListResponse::Suspected(update) => Ok(update),
            _ => Err(Box::from("unexpected list suspect response!")),
        }
    }

    pub async fn confirm(
        list: &ListSender,
        suspected: &Update,
    ) -> Result<bool, Box<dyn std::error::Error>> {
        let (request, response) = oneshot::channel();

        list.send((ListRequest::Confirm(*suspected), request))
            .await?;

        match response.await? {
            ListResponse::Applied(changed) => Ok(changed),
            _ => Err(Box::from("unexpected list confirm response!")),
        }
    }

    pub async fn shutdown(list: &ListSender) -> Result<(), Box<dyn std::error::Error>> {
        let (request, _response) = oneshot::channel();

        list.send((ListRequest::Shutdown, request)).await?;

        Ok(())
    }
}

/// Result of handing an inbound packet's gossip to the list.
#[derive(Clone, Debug, PartialEq)]
pub struct Received {
    /// `false` when the sender has already been removed from the group.
    pub accepted: bool,
    /// Fresh `alive` update when the gossip made the local member refute a
    /// suspicion about itself.
    pub refutation: Option<Update>,
}

#[derive(Clone, Debug)]
pub enum ListResponse {
    Node(Node),
    LocalUpdate(Update),
    Members(Vec<Node>),
    Member(Option<Node>),
    Target(Option<Node>),
    Batch(Vec<Update>),
    Received(Received),
    Applied(bool),
    Suspected(Option<Update>),
}

impl fmt::Display for ListResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let list_response = "List Response |";

        match self {
            ListResponse::Node(node) => write!(f, "{} node -> {:?}", list_response, node),
            ListResponse::LocalUpdate(update) => {
                write!(f, "{} local update -> {:?}", list_response, update)
            }
            ListResponse::Members(members) => {
                write!(f, "{} members -> {:?}", list_response, members)
            }
            ListResponse::Member(member) => write!(f, "{} member -> {:?}", list_response, member),
            ListResponse::Target(target) => write!(f, "{} target -> {:?}", list_response, target),
            ListResponse::Batch(updates) => write!(f, "{} batch -> {:?}", list_response, updates),
            ListResponse::Received(received) => {
                write!(f, "{} received -> {:?}", list_response, received)
            }
            ListResponse::Applied(changed) => {
                write!(f, "{} applied -> {}", list_response, changed)
            }
            ListResponse::Suspected(update) => {
                write!(f, "{} suspected -> {:?}", list_response, update)
            }
        }
    }
}
