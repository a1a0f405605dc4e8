//! The encounters an individual's app remembers, and the update messages derived from them.

use std::collections::BTreeMap;

use crate::mailbox::{encounter_age_days, EncounterUid, UpdateMessage, UpdateReason};
use crate::population::PersonId;
use crate::risk::{Day, RiskLevelMapper};

#[derive(Debug, Clone, PartialEq)]
pub struct Encounter {
    pub uid: EncounterUid,
    pub other: PersonId,
    pub time: f64,
    disclosed: bool,
}

impl Encounter {
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn day(&self) -> Day {
        self.time.floor() as Day
    }

    #[must_use]
    pub fn is_disclosed(&self) -> bool {
        self.disclosed
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContactBook {
    owner: PersonId,
    encounters: Vec<Encounter>,
}

impl ContactBook {
    #[must_use]
    pub fn new(owner: PersonId) -> Self {
        ContactBook {
            owner,
            encounters: Vec::new(),
        }
    }

    #[must_use]
    pub fn owner(&self) -> PersonId {
        self.owner
    }

    #[must_use]
    pub fn encounters(&self) -> &[Encounter] {
        &self.encounters
    }

    pub fn record_contact(&mut self, other: PersonId, uid: EncounterUid, time: f64) {
        self.encounters.push(Encounter {
            uid,
            other,
            time,
            disclosed: false,
        });
    }

    fn message(&self, encounter: &Encounter, level: u32, reason: UpdateReason) -> UpdateMessage {
        UpdateMessage {
            sender: self.owner,
            receiver: encounter.other,
            uid: encounter.uid,
            new_risk_level: level,
            encounter_time: encounter.time,
            update_reason: reason,
        }
    }

    /// One message per encounter not yet disclosed whose day sits above the
    /// baseline level. Every such encounter counts as disclosed afterwards,
    /// messaged or not, so later changes go through [`Self::generate_updates`].
    pub fn generate_initial_updates(
        &mut self,
        risk_history: &BTreeMap<Day, f64>,
        mapper: &RiskLevelMapper,
    ) -> Vec<UpdateMessage> {
        let baseline = mapper.baseline_level();
        let mut messages = Vec::new();
        for index in 0..self.encounters.len() {
            if self.encounters[index].disclosed {
                continue;
            }
            self.encounters[index].disclosed = true;
            let encounter = &self.encounters[index];
            let level = mapper.level_on(risk_history, encounter.day());
            if level != baseline {
                messages.push(self.message(encounter, level, UpdateReason::Initial));
            }
        }
        messages
    }

    /// One message per disclosed encounter whose day changed level between `prev` and `curr`.
    #[must_use]
    pub fn generate_updates(
        &self,
        prev: &BTreeMap<Day, f64>,
        curr: &BTreeMap<Day, f64>,
        mapper: &RiskLevelMapper,
        reason: UpdateReason,
    ) -> Vec<UpdateMessage> {
        self.encounters
            .iter()
            .filter(|encounter| encounter.disclosed)
            .filter_map(|encounter| {
                let day = encounter.day();
                let new_level = mapper.level_on(curr, day);
                (new_level != mapper.level_on(prev, day)).then(|| self.message(encounter, new_level, reason))
            })
            .collect()
    }

    /// Forgets encounters more than `n_days` whole days before `current_time`.
    pub fn cleanup_contacts(&mut self, current_time: f64, n_days: i64) {
        self.encounters
            .retain(|encounter| encounter_age_days(current_time, encounter.time) <= n_days);
    }
}
