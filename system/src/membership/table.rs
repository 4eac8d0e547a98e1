use std::collections::{HashMap, HashSet, VecDeque};

use rand::seq::IteratorRandom;
use uuid::Uuid;

use crate::error::Error;
use crate::membership::update::{Status, Update};
use crate::node::Node;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Member {
    pub node: Node,
    pub status: Status,
    pub incarnation: u32,
}

impl Member {
    fn as_update(&self) -> Update {
        Update {
            node: self.node,
            status: self.status,
            incarnation: self.incarnation,
        }
    }
}

/// Outcome of applying an update to the table.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Applied {
    Ignored,
    Joined,
    Updated(Status),
    Removed,
    Refuted(Update),
}

impl Applied {
    pub fn changed(&self) -> bool {
        !matches!(self, Applied::Ignored)
    }
}

/// Ids of failed members, oldest evicted first once `capacity` is reached.
#[derive(Debug)]
struct Removed {
    order: VecDeque<Uuid>,
    ids: HashSet<Uuid>,
    capacity: usize,
}

impl Removed {
    fn init(capacity: usize) -> Removed {
        Removed {
            order: VecDeque::with_capacity(capacity.min(64)),
            ids: HashSet::with_capacity(capacity.min(64)),
            capacity,
        }
    }

    fn insert(&mut self, id: Uuid) {
        if !self.ids.insert(id) {
            return;
        }

        self.order.push_back(id);

        while self.order.len() > self.capacity {
            if let Some(pruned) = self.order.pop_front() {
                self.ids.remove(&pruned);
            }
        }
    }

    fn contains(&self, id: &Uuid) -> bool {
        self.ids.contains(id)
    }
}

pub struct MembershipTable {
    local: Node,
    incarnation: u32,
    members: HashMap<Uuid, Member>,
    removed: Removed,
}

impl MembershipTable {
    pub fn init(local: Node, removed_capacity: usize) -> MembershipTable {
        MembershipTable {
            local,
            incarnation: 0,
            members: HashMap::with_capacity(10),
            removed: Removed::init(removed_capacity),
        }
    }

    pub fn local(&self) -> Node {
        self.local
    }

    pub fn local_update(&self) -> Update {
        Update::alive(self.local, self.incarnation)
    }

    /// Number of known members other than the local one.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn get(&self, id: &Uuid) -> Option<&Member> {
        self.members.get(id)
    }

    pub fn is_removed(&self, id: &Uuid) -> bool {
        self.removed.contains(id)
    }

    pub fn members(&self) -> Vec<Node> {
        self.members.values().map(|member| member.node).collect()
    }

    pub fn random_members(&self, count: usize, exclude: &Uuid) -> Vec<Node> {
        let mut rng = rand::thread_rng();

        self.members
            .values()
            .filter(|member| &member.node.id != exclude)
            .map(|member| member.node)
            .choose_multiple(&mut rng, count)
    }

    pub fn apply(&mut self, update: &Update) -> Result<Applied, Error> {
        let id = update.node.id;

        if self.removed.contains(&id) {
            return Ok(Applied::Ignored);
        }

        if id == self.local.id {
            return self.refute(update);
        }

        let current = match self.members.get(&id) {
            Some(member) => member.as_update(),
            None => {
                if update.status == Status::Failed {
                    self.removed.insert(id);

                    return Ok(Applied::Removed);
                }

                self.members.insert(
                    id,
                    Member {
                        node: update.node,
                        status: update.status,
                        incarnation: update.incarnation,
                    },
                );

                return Ok(Applied::Joined);
            }
        };

        if !update.supersedes(&current) {
            return Ok(Applied::Ignored);
        }

        if update.status == Status::Failed {
            self.members.remove(&id);
            self.removed.insert(id);

            return Ok(Applied::Removed);
        }

        if let Some(member) = self.members.get_mut(&id) {
            member.node = update.node;
            member.status = update.status;
            member.incarnation = update.incarnation;
        }

        Ok(Applied::Updated(current.status))
    }

    fn refute(&mut self, update: &Update) -> Result<Applied, Error> {
        let contested = match update.status {
            Status::Failed => false,
            Status::Suspected => update.incarnation >= self.incarnation,
            Status::Alive => update.incarnation > self.incarnation,
        };

        if !contested {
            return Ok(Applied::Ignored);
        }

        self.incarnation = update
            .incarnation
            .checked_add(1)
            .ok_or(Error::IncarnationExhausted)?;

        Ok(Applied::Refuted(self.local_update()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;
    use std::str::FromStr;

    async fn test_node(port: u16) -> Result<Node, Box<dyn std::error::Error>> {
        let test_address = IpAddr::from_str("127.0.0.1")?;

        Node::init(test_address, port).await
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn init() -> Result<(), Box<dyn std::error::Error>> {
        let test_local = test_node(25000).await?;
        let test_table = MembershipTable::init(test_local, 16);

        assert_eq!(test_table.local(), test_local);
        assert_eq!(test_table.local_update().incarnation, 0);
        assert!(test_table.is_empty());
        assert_eq!(test_table.local_update(), Update::alive(test_local, 0));

        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn apply_joins_unknown_member() -> Result<(), Box<dyn std::error::Error>> {
        let test_local = test_node(25000).await?;
        let test_member = test_node(25001).await?;
        let mut test_table = MembershipTable::init(test_local, 16);

        let test_applied = test_table.apply(&Update::alive(test_member, 2))?;

        assert_eq!(test_applied, Applied::Joined);
        assert_eq!(test_table.members(), vec![test_member]);
        assert_eq!(test_table.get(&test_member.id).map(|m| m.incarnation), Some(2));

        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn apply_twice_changes_once() -> Result<(), Box<dyn std::error::Error>> {
        let test_local = test_node(25000).await?;
        let test_member = test_node(25001).await?;
        let mut test_table = MembershipTable::init(test_local, 16);

        test_table.apply(&Update::alive(test_member, 0))?;

        let test_suspected = Update::suspected(test_member, 0);

        assert_eq!(
            test_table.apply(&test_suspected)?,
            Applied::Updated(Status::Alive),
        );
        assert_eq!(test_table.apply(&test_suspected)?, Applied::Ignored);

        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stale_updates_are_ignored() -> Result<(), Box<dyn std::error::Error>> {
        let test_local = test_node(25000).await?;
        let test_member = test_node(25001).await?;
        let mut test_table = MembershipTable::init(test_local, 16);

        test_table.apply(&Update::alive(test_member, 5))?;

        assert_eq!(
            test_table.apply(&Update::suspected(test_member, 4))?,
            Applied::Ignored,
        );
        assert_eq!(test_table.apply(&Update::alive(test_member, 3))?, Applied::Ignored);
        assert_eq!(test_table.get(&test_member.id).map(|m| m.incarnation), Some(5));

        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn incarnation_is_non_decreasing() -> Result<(), Box<dyn std::error::Error>> {
        let test_local = test_node(25000).await?;
        let test_member = test_node(25001).await?;
        let mut test_table = MembershipTable::init(test_local, 16);
        let test_sequence = [3, 1, 4, 1, 5, 2, 6, 0];
        let mut test_observed = 0;

        for (index, incarnation) in test_sequence.iter().enumerate() {
            let test_update = if index % 2 == 0 {
                Update::alive(test_member, *incarnation)
            } else {
                Update::suspected(test_member, *incarnation)
            };

            test_table.apply(&test_update)?;

            let test_current = test_table
                .get(&test_member.id)
                .map(|member| member.incarnation)
                .unwrap_or_default();

            assert!(test_current >= test_observed);

            test_observed = test_current;
        }

        assert_eq!(test_observed, 6);

        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_is_absorbing() -> Result<(), Box<dyn std::error::Error>> {
        let test_local = test_node(25000).await?;
        let test_member = test_node(25001).await?;
        let mut test_table = MembershipTable::init(test_local, 16);

        test_table.apply(&Update::alive(test_member, 0))?;

        assert_eq!(
            test_table.apply(&Update::failed(test_member, 0))?,
            Applied::Removed,
        );
        assert!(test_table.is_removed(&test_member.id));
        assert!(test_table.members().is_empty());

        for test_update in [
            Update::alive(test_member, 100),
            Update::suspected(test_member, 100),
            Update::failed(test_member, 100),
        ] {
            assert_eq!(test_table.apply(&test_update)?, Applied::Ignored);
        }

        assert!(test_table.members().is_empty());

        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_about_unknown_member_is_remembered() -> Result<(), Box<dyn std::error::Error>> {
        let test_local = test_node(25000).await?;
        let test_member = test_node(25001).await?;
        let mut test_table = MembershipTable::init(test_local, 16);

        assert_eq!(
            test_table.apply(&Update::failed(test_member, 1))?,
            Applied::Removed,
        );
        assert_eq!(test_table.apply(&Update::alive(test_member, 2))?, Applied::Ignored);

        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn removed_set_is_bounded() -> Result<(), Box<dyn std::error::Error>> {
        let test_local = test_node(25000).await?;
        let mut test_table = MembershipTable::init(test_local, 2);
        let mut test_members = Vec::new();

        for port in 25001..25004 {
            let test_member = test_node(port).await?;

            test_table.apply(&Update::failed(test_member, 0))?;
            test_members.push(test_member);
        }

        assert!(!test_table.is_removed(&test_members[0].id));
        assert!(test_table.is_removed(&test_members[1].id));
        assert!(test_table.is_removed(&test_members[2].id));

        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn refute_suspicion() -> Result<(), Box<dyn std::error::Error>> {
        let test_local = test_node(25000).await?;
        let mut test_table = MembershipTable::init(test_local, 16);

        test_table.incarnation = 3;

        let test_suspected = Update::suspected(test_local, 3);

        assert_eq!(
            test_table.apply(&test_suspected)?,
            Applied::Refuted(Update::alive(test_local, 4)),
        );
        assert_eq!(test_table.local_update().incarnation, 4);
        assert_eq!(test_table.apply(&test_suspected)?, Applied::Ignored);
        assert_eq!(test_table.local_update().incarnation, 4);

        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn local_failure_claims_are_dropped() -> Result<(), Box<dyn std::error::Error>> {
        let test_local = test_node(25000).await?;
        let mut test_table = MembershipTable::init(test_local, 16);

        assert_eq!(
            test_table.apply(&Update::failed(test_local, 0))?,
            Applied::Ignored,
        );
        assert!(!test_table.is_removed(&test_local.id));
        assert_eq!(test_table.local_update().incarnation, 0);

        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn incarnation_exhaustion() -> Result<(), Box<dyn std::error::Error>> {
        let test_local = test_node(25000).await?;
        let mut test_table = MembershipTable::init(test_local, 16);

        let test_applied = test_table.apply(&Update::suspected(test_local, u32::MAX));

        assert!(matches!(test_applied, Err(Error::IncarnationExhausted)));

        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn random_members_excludes_target() -> Result<(), Box<dyn std::error::Error>> {
        let test_local = test_node(25000).await?;
        let mut test_table = MembershipTable::init(test_local, 16);
        let mut test_members = Vec::new();

        for port in 25001..25005 {
            let test_member = test_node(port).await?;

            test_table.apply(&Update::alive(test_member, 0))?;
            test_members.push(test_member);
        }

        let test_target = test_members[0];

        for _ in 0..32 {
            let test_random = test_table.random_members(2, &test_target.id);

            assert_eq!(test_random.len(), 2);
            assert!(!test_random.contains(&test_target));
            assert!(!test_random.contains(&test_local));
        }

        assert_eq!(test_table.random_members(10, &test_target.id).len(), 3);

        Ok(())
    }
}
