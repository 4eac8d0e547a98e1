use std::hash::{Hash, Hasher};
use std::net::{IpAddr, SocketAddr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: Uuid,
    pub address: IpAddr,
    pub membership_port: u16,
}

impl Node {
    pub async fn init(
        address: IpAddr,
        membership_port: u16,
    ) -> Result<Node, Box<dyn std::error::Error>> {
        let id = Uuid::new_v4();

        Ok(Node {
            id,
            address,
            membership_port,
        })
    }

    pub fn membership_address(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.membership_port)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[tokio::test(flavor = "multi_thread")]
    async fn init() -> Result<(), Box<dyn std::error::Error>> {
        let test_node_address = IpAddr::from_str("0.0.0.0")?;
        let test_node = Node::init(test_node_address, 25000).await?;

        assert_eq!(test_node.id.get_version_num(), 4);
        assert_eq!(test_node.address.to_string().as_str(), "0.0.0.0");
        assert_eq!(test_node.membership_port, 25000);
        assert_eq!(
            test_node.membership_address().to_string().as_str(),
            "0.0.0.0:25000",
        );

        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn identity_is_the_id() -> Result<(), Box<dyn std::error::Error>> {
        let test_node_address = IpAddr::from_str("127.0.0.1")?;
        let test_node = Node::init(test_node_address, 25000).await?;
        let test_moved_node = Node {
            membership_port: 25001,
            ..test_node
        };
        let test_other_node = Node::init(test_node_address, 25000).await?;

        assert_eq!(test_node, test_moved_node);
        assert_ne!(test_node, test_other_node);

        Ok(())
    }
}
