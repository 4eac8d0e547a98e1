use serde::{Deserialize, Serialize};

use crate::node::Node;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum Status {
    Alive,
    Suspected,
    Failed,
}

/// A claim about the status of one member, as gossiped between nodes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Update {
    pub node: Node,
    pub status: Status,
    pub incarnation: u32,
}

impl Update {
    pub fn alive(node: Node, incarnation: u32) -> Update {
        Update {
            node,
            status: Status::Alive,
            incarnation,
        }
    }

    pub fn suspected(node: Node, incarnation: u32) -> Update {
        Update {
            node,
            status: Status::Suspected,
            incarnation,
        }
    }

    pub fn failed(node: Node, incarnation: u32) -> Update {
        Update {
            node,
            status: Status::Failed,
            incarnation,
        }
    }

    /// Whether this update outranks `other`. Both must be about the same member.
    ///
    /// `Failed` beats everything, then the higher incarnation wins, and at equal
    /// incarnation `Suspected` beats `Alive`.
    pub fn supersedes(&self, other: &Update) -> bool {
        debug_assert_eq!(self.node.id, other.node.id);

        match (self.status, other.status) {
            (Status::Failed, Status::Failed) => self.incarnation > other.incarnation,
            (Status::Failed, _) => true,
            (_, Status::Failed) => false,
            (status, other_status) => {
                self.incarnation > other.incarnation
                    || (self.incarnation == other.incarnation
                        && status == Status::Suspected
                        && other_status == Status::Alive)
            }
        }
    }
}
