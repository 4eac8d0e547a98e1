use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;
use uuid::Uuid;

use crate::node::Node;

/// Randomized round-robin order of ping targets.
///
/// Removed members are left behind as stale entries and skipped; the list is
/// compacted on every reshuffle or once stale entries make up half of it.
#[derive(Debug, Default)]
pub struct TargetList {
    nodes: Vec<Node>,
    live: HashSet<Uuid>,
    cursor: usize,
    stale: usize,
}

impl TargetList {
    pub fn init() -> TargetList {
        TargetList {
            nodes: Vec::with_capacity(10),
            live: HashSet::with_capacity(10),
            cursor: 0,
            stale: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn next(&mut self) -> Option<Node> {
        if self.live.is_empty() {
            return None;
        }

        loop {
            if self.cursor >= self.nodes.len() {
                self.reshuffle();
            }

            let node = self.nodes[self.cursor];

            self.cursor += 1;

            if self.live.contains(&node.id) {
                return Some(node);
            }
        }
    }

    /// Places `node` at a uniformly random index; the entry previously there
    /// moves to the end of the list.
    pub fn insert(&mut self, node: Node) {
        if !self.live.insert(node.id) {
            return;
        }

        if self.nodes.is_empty() {
            self.nodes.push(node);

            return;
        }

        let index = rand::thread_rng().gen_range(0..self.nodes.len());
        let displaced = std::mem::replace(&mut self.nodes[index], node);

        self.nodes.push(displaced);
    }

    pub fn remove(&mut self, id: &Uuid) {
        if !self.live.remove(id) {
            return;
        }

        self.stale += 1;

        if self.stale * 2 > self.nodes.len() {
            self.compact();
        }
    }

    fn compact(&mut self) {
        let live = &self.live;
        let visited = self.nodes[..self.cursor.min(self.nodes.len())]
            .iter()
            .filter(|node| live.contains(&node.id))
            .count();

        self.nodes.retain(|node| live.contains(&node.id));
        self.cursor = visited;
        self.stale = 0;
    }

    fn reshuffle(&mut self) {
        let live = &self.live;

        self.nodes.retain(|node| live.contains(&node.id));
        self.nodes.shuffle(&mut rand::thread_rng());
        self.cursor = 0;
        self.stale = 0;
    }
}
