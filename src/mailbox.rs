//! Risk-update messages and the store that holds them until the receiver reads them.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use log::debug;
use serde_derive::{Deserialize, Serialize};

use crate::population::PersonId;
use crate::HashMap;

/// Identifies one encounter. Both parties of the encounter share it, and every
/// update about that encounter is filed under it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EncounterUid(pub u64);

impl Display for EncounterUid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateReason {
    /// First disclosure of an encounter.
    Initial,
    RiskUpdate,
    PositiveTest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateMessage {
    pub sender: PersonId,
    pub receiver: PersonId,
    pub uid: EncounterUid,
    pub new_risk_level: u32,
    pub encounter_time: f64,
    pub update_reason: UpdateReason,
}

/// Messages by receiver, then by encounter. Entries are only ever appended to
/// or removed whole.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Mailbox {
    boxes: HashMap<PersonId, BTreeMap<EncounterUid, Vec<UpdateMessage>>>,
}

impl Mailbox {
    #[must_use]
    pub fn new() -> Self {
        Mailbox::default()
    }

    pub fn post(&mut self, message: UpdateMessage) {
        self.boxes
            .entry(message.receiver)
            .or_default()
            .entry(message.uid)
            .or_default()
            .push(message);
    }

    /// Removes and returns everything addressed to `receiver`, ordered by
    /// encounter and then by arrival.
    pub fn drain(&mut self, receiver: PersonId) -> Vec<UpdateMessage> {
        self.boxes
            .remove(&receiver)
            .map(|by_uid| by_uid.into_values().flatten().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn messages_for(&self, receiver: PersonId) -> Option<&BTreeMap<EncounterUid, Vec<UpdateMessage>>> {
        self.boxes.get(&receiver)
    }

    #[must_use]
    pub fn message_count(&self) -> usize {
        self.boxes.values().flat_map(BTreeMap::values).map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Drops messages about encounters more than `retention_days` whole days
    /// before `current_time`, then any entries left empty. Returns how many
    /// messages were dropped.
    pub fn evict(&mut self, current_time: f64, retention_days: i64) -> usize {
        let before = self.message_count();
        for by_uid in self.boxes.values_mut() {
            for messages in by_uid.values_mut() {
                messages.retain(|message| encounter_age_days(current_time, message.encounter_time) <= retention_days);
            }
            by_uid.retain(|_, messages| !messages.is_empty());
        }
        self.boxes.retain(|_, by_uid| !by_uid.is_empty());
        let evicted = before - self.message_count();
        if evicted > 0 {
            debug!("evicted {evicted} stale messages at t={current_time:.2}");
        }
        evicted
    }
}

/// Whole days elapsed between an encounter and `current_time`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn encounter_age_days(current_time: f64, encounter_time: f64) -> i64 {
    (current_time - encounter_time).floor() as i64
}
