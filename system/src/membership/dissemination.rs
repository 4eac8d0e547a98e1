use std::collections::HashMap;

use uuid::Uuid;

use crate::membership::update::Update;

/// Maximum number of times one update is sent by this node: `ceil(λ · ln n)`,
/// never less than one.
pub fn retransmit_limit(lambda: f64, members: usize) -> u32 {
    let members = members.max(1) as f64;
    let limit = (lambda * members.ln()).ceil();

    if limit.is_finite() && limit >= 1.0 {
        limit as u32
    } else {
        1
    }
}

#[derive(Debug)]
struct Queued {
    update: Update,
    transmissions: u32,
}

/// Pending gossip, at most one update per member.
#[derive(Debug, Default)]
pub struct DisseminationQueue {
    queued: HashMap<Uuid, Queued>,
}

impl DisseminationQueue {
    pub fn init() -> DisseminationQueue {
        DisseminationQueue {
            queued: HashMap::with_capacity(10),
        }
    }

    pub fn len(&self) -> usize {
        self.queued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }

    pub fn get(&self, id: &Uuid) -> Option<&Update> {
        self.queued.get(id).map(|queued| &queued.update)
    }

    /// Queues `update` unless an update about the same member that it does not
    /// supersede is already pending.
    pub fn enqueue(&mut self, update: Update) -> bool {
        match self.queued.get_mut(&update.node.id) {
            Some(queued) if !update.supersedes(&queued.update) => false,
            Some(queued) => {
                queued.update = update;
                queued.transmissions = 0;

                true
            }
            None => {
                self.queued.insert(
                    update.node.id,
                    Queued {
                        update,
                        transmissions: 0,
                    },
                );

                true
            }
        }
    }

    pub fn purge(&mut self, id: &Uuid) {
        self.queued.remove(id);
    }

    /// Takes up to `max` of the least transmitted updates and retires the ones
    /// that have now been sent `limit` times.
    pub fn next_batch(&mut self, max: usize, limit: u32) -> Vec<Update> {
        self.queued.retain(|_, queued| queued.transmissions < limit);

        let mut pending: Vec<(&Uuid, &Queued)> = self.queued.iter().collect();

        pending.sort_by_key(|(_, queued)| queued.transmissions);

        let selected: Vec<Uuid> = pending.into_iter().take(max).map(|(id, _)| *id).collect();
        let mut batch = Vec::with_capacity(selected.len());

        for id in selected {
            if let Some(queued) = self.queued.get_mut(&id) {
                queued.transmissions += 1;

                batch.push(queued.update);

                if queued.transmissions >= limit {
                    self.queued.remove(&id);
                }
            }
        }

        batch
    }
}
