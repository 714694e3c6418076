//! Duplicate detection and resolution for items being added to the list.
//!
//! A candidate duplicates an existing item when the existing item is still
//! to-buy and the names are equal ignoring case. Detected pairs wait in a
//! [`PendingQueue`] until the user decides to merge, skip or add anyway.
//! Nothing here touches storage: resolving a pair yields a
//! [`ResolutionAction`] for the caller to hand to `store::apply_resolution`.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::error::Error;
use crate::model::{Candidate, Item, Priority, Status};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Merge,
    Skip,
    AddAnyway,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Merge => write!(f, "merge"),
            Decision::Skip => write!(f, "skip"),
            Decision::AddAnyway => write!(f, "add-anyway"),
        }
    }
}

impl std::str::FromStr for Decision {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "merge" => Ok(Decision::Merge),
            "skip" => Ok(Decision::Skip),
            "add-anyway" | "add" => Ok(Decision::AddAnyway),
            _ => Err(Error::InvalidDecision(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicatePair {
    pub candidate: Candidate,
    pub existing: Item,
}

#[derive(Debug, Clone, Default)]
pub struct Detection {
    pub unique: Vec<Candidate>,
    pub duplicates: Vec<DuplicatePair>,
}

/// First to-buy item in `existing` whose name equals `name` ignoring case.
pub fn find_open_match<'a>(name: &str, existing: &'a [Item]) -> Option<&'a Item> {
    let wanted = name.to_lowercase();
    existing
        .iter()
        .find(|item| item.status == Status::ToBuy && item.name.to_lowercase() == wanted)
}

/// Split `candidates` into those with no open namesake in `existing` and
/// those that pair with one. Siblings in the batch are not compared with
/// each other.
pub fn detect(candidates: Vec<Candidate>, existing: &[Item]) -> Detection {
    let mut detection = Detection::default();
    for candidate in candidates {
        match find_open_match(&candidate.name, existing) {
            Some(item) => detection.duplicates.push(DuplicatePair {
                candidate,
                existing: item.clone(),
            }),
            None => detection.unique.push(candidate),
        }
    }
    debug!(
        unique = detection.unique.len(),
        duplicates = detection.duplicates.len(),
        "duplicate detection"
    );
    detection
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionAction {
    MergeInto {
        item_id: String,
        quantity: String,
        priority: Priority,
    },
    CreateItem(Candidate),
    NoOp,
}

/// Quantities are free text, so merging joins them rather than adding.
pub fn merge_quantity(existing: &str, incoming: &str) -> String {
    format!("{existing} + {incoming}")
}

/// The candidate's priority wins only when it ranks strictly higher.
/// Unranked values never win and never lose their place.
pub fn merge_priority(existing: &Priority, incoming: &Priority) -> Priority {
    match (existing.rank(), incoming.rank()) {
        (Some(e), Some(i)) if i > e => incoming.clone(),
        _ => existing.clone(),
    }
}

pub fn resolve(pair: &DuplicatePair, decision: Decision) -> ResolutionAction {
    match decision {
        Decision::Merge => ResolutionAction::MergeInto {
            item_id: pair.existing.id.clone(),
            quantity: merge_quantity(&pair.existing.quantity, &pair.candidate.quantity),
            priority: merge_priority(&pair.existing.priority, &pair.candidate.priority),
        },
        Decision::AddAnyway => ResolutionAction::CreateItem(pair.candidate.clone()),
        Decision::Skip => ResolutionAction::NoOp,
    }
}

/// Terminal state a pair reaches once resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Merged,
    Skipped,
    Added,
}

impl From<Decision> for Outcome {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Merge => Outcome::Merged,
            Decision::Skip => Outcome::Skipped,
            Decision::AddAnyway => Outcome::Added,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Merged => write!(f, "merged"),
            Outcome::Skipped => write!(f, "skipped"),
            Outcome::Added => write!(f, "added"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedPair {
    pub id: u64,
    pub pair: DuplicatePair,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub pair_id: u64,
    pub name: String,
    pub outcome: Outcome,
    pub action: ResolutionAction,
}

/// Ordered queue of pairs awaiting a decision. Pair ids are never reused,
/// so a stale id can only miss.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PendingQueue {
    #[serde(default)]
    next_id: u64,
    #[serde(default)]
    entries: Vec<QueuedPair>,
}

impl PendingQueue {
    pub fn push(&mut self, pair: DuplicatePair) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.entries.push(QueuedPair { id, pair });
        id
    }

    pub fn extend(&mut self, pairs: Vec<DuplicatePair>) -> Vec<u64> {
        pairs.into_iter().map(|p| self.push(p)).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueuedPair> {
        self.entries.iter()
    }

    pub fn get(&self, id: u64) -> Option<&QueuedPair> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Bring every queued pair up to date with `items` before deciding.
    ///
    /// A pair whose item is still to-buy picks up its current quantity and
    /// priority. A pair whose item was bought or deleted is retargeted at
    /// the first open namesake, if there is one. Otherwise it is no longer a
    /// duplicate: it leaves the queue and comes back as an addition of the
    /// candidate, like any unique candidate from [`detect`].
    pub fn refresh(&mut self, items: &[Item]) -> Vec<Resolved> {
        let mut released = Vec::new();
        let mut kept = Vec::with_capacity(self.entries.len());
        for mut entry in self.entries.drain(..) {
            let current = items
                .iter()
                .find(|i| i.id == entry.pair.existing.id && i.status == Status::ToBuy)
                .or_else(|| find_open_match(&entry.pair.candidate.name, items));
            match current {
                Some(item) => {
                    entry.pair.existing = item.clone();
                    kept.push(entry);
                }
                None => {
                    debug!(pair = entry.id, "duplicate target gone");
                    released.push(Resolved {
                        pair_id: entry.id,
                        name: entry.pair.candidate.name.clone(),
                        outcome: Outcome::Added,
                        action: ResolutionAction::CreateItem(entry.pair.candidate),
                    });
                }
            }
        }
        self.entries = kept;
        released
    }

    /// Resolve one pair and drop it from the queue. Returns `None` when the
    /// pair is no longer queued.
    ///
    /// A merge rewrites the snapshot of every later pair aimed at the same
    /// item, so merges applied in sequence build on each other.
    pub fn resolve(&mut self, id: u64, decision: Decision) -> Option<Resolved> {
        let pos = self.entries.iter().position(|e| e.id == id)?;
        let entry = self.entries.remove(pos);
        let action = resolve(&entry.pair, decision);

        if let ResolutionAction::MergeInto {
            item_id,
            quantity,
            priority,
        } = &action
        {
            for other in self.entries.iter_mut() {
                if other.pair.existing.id == *item_id {
                    other.pair.existing.quantity = quantity.clone();
                    other.pair.existing.priority = priority.clone();
                }
            }
        }

        debug!(pair = id, %decision, "resolved duplicate");
        Some(Resolved {
            pair_id: id,
            name: entry.pair.candidate.name,
            outcome: decision.into(),
            action,
        })
    }

    /// Apply one decision to every queued pair in order, leaving the queue
    /// empty.
    pub fn resolve_all(&mut self, decision: Decision) -> Vec<Resolved> {
        let ids: Vec<u64> = self.entries.iter().map(|e| e.id).collect();
        ids.into_iter()
            .filter_map(|id| self.resolve(id, decision))
            .collect()
    }

    /// Close the queue without deciding. Returns how many pairs were dropped.
    pub fn discard(&mut self) -> usize {
        let n = self.entries.len();
        self.entries.clear();
        n
    }
}
