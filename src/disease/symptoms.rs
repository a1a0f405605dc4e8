//! Symptom generation.
//!
//! A phase's symptom set is drawn in three steps:
//!
//! 1. A sickness severity is chosen from [`SEVERITY_TABLE`], a list of
//!    `(phase, predicate) -> rule` rows where the first matching row wins.
//! 2. Four *gating* symptoms (fever, gastro, fatigue, trouble breathing) are
//!    drawn with probabilities computed by the `*_probability` functions.
//! 3. Each gated symptom admits its dependents ([`DEPENDENT_SYMPTOMS`]) with
//!    their own base probability, so the marginal probability of a dependent
//!    is the product of the two.
//!
//! Base probabilities for every symptom and phase live in [`base_probability`].
//! For covid gastro the base value is a phase multiplier rather than a
//! probability.

use std::collections::BTreeSet;

use rand::Rng;
use serde_derive::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumCount, EnumIter};

use crate::disease::RiskFactors;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumIter,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Symptom {
    Mild,
    Moderate,
    Severe,
    #[strum(serialize = "extremely-severe")]
    #[serde(rename = "extremely-severe")]
    ExtremelySevere,
    Fever,
    Chills,
    Gastro,
    Diarrhea,
    NauseaVomiting,
    Fatigue,
    HardTimeWakingUp,
    Headache,
    Confused,
    LostConsciousness,
    TroubleBreathing,
    Sneezing,
    Cough,
    RunnyNose,
    SoreThroat,
    SevereChestPain,
    LightTroubleBreathing,
    ModerateTroubleBreathing,
    HeavyTroubleBreathing,
    LossOfTaste,
    Aches,
    Unusual,
}

/// The symptoms present on one day. Ordered so that reports and tests see a stable order.
pub type SymptomSet = BTreeSet<Symptom>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Disease {
    Covid,
    Allergy,
    Cold,
    Flu,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumIter, EnumCount,
)]
#[strum(serialize_all = "snake_case")]
pub enum DiseasePhase {
    CovidIncubation,
    CovidOnset,
    CovidPlateau,
    CovidPostPlateau1,
    CovidPostPlateau2,
    Allergy,
    ColdOnset,
    Cold,
    ColdLast,
    FluFirst,
    Flu,
    FluLast,
}

impl DiseasePhase {
    pub const COVID: [DiseasePhase; 5] = [
        DiseasePhase::CovidIncubation,
        DiseasePhase::CovidOnset,
        DiseasePhase::CovidPlateau,
        DiseasePhase::CovidPostPlateau1,
        DiseasePhase::CovidPostPlateau2,
    ];

    #[must_use]
    pub fn disease(self) -> Disease {
        match self {
            DiseasePhase::CovidIncubation
            | DiseasePhase::CovidOnset
            | DiseasePhase::CovidPlateau
            | DiseasePhase::CovidPostPlateau1
            | DiseasePhase::CovidPostPlateau2 => Disease::Covid,
            DiseasePhase::Allergy => Disease::Allergy,
            DiseasePhase::ColdOnset | DiseasePhase::Cold | DiseasePhase::ColdLast => Disease::Cold,
            DiseasePhase::FluFirst | DiseasePhase::Flu | DiseasePhase::FluLast => Disease::Flu,
        }
    }

    /// Position of the phase within its disease.
    #[must_use]
    pub fn index_in_disease(self) -> usize {
        match self {
            DiseasePhase::CovidIncubation
            | DiseasePhase::Allergy
            | DiseasePhase::ColdOnset
            | DiseasePhase::FluFirst => 0,
            DiseasePhase::CovidOnset | DiseasePhase::Cold | DiseasePhase::Flu => 1,
            DiseasePhase::CovidPlateau | DiseasePhase::ColdLast | DiseasePhase::FluLast => 2,
            DiseasePhase::CovidPostPlateau1 => 3,
            DiseasePhase::CovidPostPlateau2 => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
    ExtremelySevere,
}

impl Severity {
    #[must_use]
    pub fn symptom(self) -> Symptom {
        match self {
            Severity::Mild => Symptom::Mild,
            Severity::Moderate => Symptom::Moderate,
            Severity::Severe => Symptom::Severe,
            Severity::ExtremelySevere => Symptom::ExtremelySevere,
        }
    }

    /// Breathing difficulty label attached when trouble breathing is present.
    #[must_use]
    pub fn trouble_breathing_symptom(self) -> Symptom {
        match self {
            Severity::Mild => Symptom::LightTroubleBreathing,
            Severity::Moderate => Symptom::ModerateTroubleBreathing,
            Severity::Severe | Severity::ExtremelySevere => Symptom::HeavyTroubleBreathing,
        }
    }
}

/// The per-individual inputs every symptom formula reads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymptomFactors {
    pub age: f64,
    pub carefulness: f64,
    pub initial_viral_load: f64,
    pub really_sick: bool,
    pub extremely_sick: bool,
    pub condition_count: usize,
    pub smoker_or_lung_disease: bool,
}

impl SymptomFactors {
    #[must_use]
    pub fn new(risk_factors: &RiskFactors, initial_viral_load: f64) -> Self {
        SymptomFactors {
            age: risk_factors.age,
            carefulness: risk_factors.carefulness,
            initial_viral_load,
            really_sick: risk_factors.really_sick,
            extremely_sick: risk_factors.extremely_sick,
            condition_count: risk_factors.preexisting_conditions.len(),
            smoker_or_lung_disease: risk_factors.smoker_or_lung_disease(),
        }
    }

    /// Any of the markers that push covid onset to "moderate".
    #[must_use]
    pub fn elevated_covid_risk(&self) -> bool {
        self.really_sick || self.extremely_sick || self.condition_count > 2 || self.initial_viral_load > 0.6
    }

    fn elevated_covid_risk_unless_extreme(&self) -> bool {
        self.really_sick || self.condition_count > 2 || self.initial_viral_load > 0.6
    }

    fn elevated_common_risk(&self) -> bool {
        self.really_sick || self.extremely_sick || self.condition_count > 0
    }
}

/// Outcome of a severity table row.
#[derive(Clone, Copy)]
pub enum SeverityRule {
    /// No sickness level is reported in this phase.
    Asymptomatic,
    Fixed(Severity),
    /// `elevated` with the probability returned by the formula, `otherwise` the rest of the time.
    Lottery {
        elevated: Severity,
        otherwise: Severity,
        probability: fn(&SymptomFactors) -> f64,
    },
}

pub struct SeverityRow {
    pub phase: DiseasePhase,
    pub predicate: fn(&SymptomFactors) -> bool,
    pub rule: SeverityRule,
}

fn always(_: &SymptomFactors) -> bool {
    true
}

/// First matching row per phase wins.
pub static SEVERITY_TABLE: &[SeverityRow] = &[
    SeverityRow {
        phase: DiseasePhase::CovidIncubation,
        predicate: always,
        rule: SeverityRule::Asymptomatic,
    },
    SeverityRow {
        phase: DiseasePhase::CovidOnset,
        predicate: SymptomFactors::elevated_covid_risk,
        rule: SeverityRule::Fixed(Severity::Moderate),
    },
    SeverityRow {
        phase: DiseasePhase::CovidOnset,
        predicate: always,
        rule: SeverityRule::Fixed(Severity::Mild),
    },
    SeverityRow {
        phase: DiseasePhase::CovidPlateau,
        predicate: |f| f.extremely_sick,
        rule: SeverityRule::Fixed(Severity::ExtremelySevere),
    },
    SeverityRow {
        phase: DiseasePhase::CovidPlateau,
        predicate: SymptomFactors::elevated_covid_risk_unless_extreme,
        rule: SeverityRule::Fixed(Severity::Severe),
    },
    SeverityRow {
        phase: DiseasePhase::CovidPlateau,
        predicate: always,
        rule: SeverityRule::Lottery {
            elevated: Severity::Moderate,
            otherwise: Severity::Mild,
            probability: |f| f.initial_viral_load - 0.15,
        },
    },
    SeverityRow {
        phase: DiseasePhase::CovidPostPlateau1,
        predicate: |f| f.extremely_sick,
        rule: SeverityRule::Fixed(Severity::Severe),
    },
    SeverityRow {
        phase: DiseasePhase::CovidPostPlateau1,
        predicate: |f| f.really_sick,
        rule: SeverityRule::Fixed(Severity::Moderate),
    },
    SeverityRow {
        phase: DiseasePhase::CovidPostPlateau1,
        predicate: always,
        rule: SeverityRule::Fixed(Severity::Mild),
    },
    SeverityRow {
        phase: DiseasePhase::CovidPostPlateau2,
        predicate: |f| f.extremely_sick,
        rule: SeverityRule::Fixed(Severity::Moderate),
    },
    SeverityRow {
        phase: DiseasePhase::CovidPostPlateau2,
        predicate: always,
        rule: SeverityRule::Fixed(Severity::Mild),
    },
    SeverityRow {
        phase: DiseasePhase::Allergy,
        predicate: always,
        rule: SeverityRule::Asymptomatic,
    },
    SeverityRow {
        phase: DiseasePhase::ColdOnset,
        predicate: always,
        rule: SeverityRule::Asymptomatic,
    },
    SeverityRow {
        phase: DiseasePhase::Cold,
        predicate: SymptomFactors::elevated_common_risk,
        rule: SeverityRule::Fixed(Severity::Moderate),
    },
    SeverityRow {
        phase: DiseasePhase::Cold,
        predicate: always,
        rule: SeverityRule::Fixed(Severity::Mild),
    },
    SeverityRow {
        phase: DiseasePhase::ColdLast,
        predicate: always,
        rule: SeverityRule::Fixed(Severity::Mild),
    },
    SeverityRow {
        phase: DiseasePhase::FluFirst,
        predicate: always,
        rule: SeverityRule::Fixed(Severity::Mild),
    },
    SeverityRow {
        phase: DiseasePhase::Flu,
        predicate: SymptomFactors::elevated_common_risk,
        rule: SeverityRule::Fixed(Severity::Moderate),
    },
    SeverityRow {
        phase: DiseasePhase::Flu,
        predicate: always,
        rule: SeverityRule::Fixed(Severity::Mild),
    },
    SeverityRow {
        phase: DiseasePhase::FluLast,
        predicate: always,
        rule: SeverityRule::Fixed(Severity::Mild),
    },
];

/// Looks up the rule that applies to `factors` in `phase`.
///
/// # Panics
///
/// Panics if the table has no row for `phase`; every phase ends with a catch-all row.
#[must_use]
pub fn severity_rule(phase: DiseasePhase, factors: &SymptomFactors) -> SeverityRule {
    SEVERITY_TABLE
        .iter()
        .find(|row| row.phase == phase && (row.predicate)(factors))
        .map(|row| row.rule)
        .unwrap_or_else(|| panic!("No severity rule for phase {phase}"))
}

/// Chooses the sickness severity for one phase. Returns `None` for phases without one.
pub fn sample_severity<R: Rng + ?Sized>(
    phase: DiseasePhase,
    factors: &SymptomFactors,
    rng: &mut R,
) -> Option<Severity> {
    match severity_rule(phase, factors) {
        SeverityRule::Asymptomatic => None,
        SeverityRule::Fixed(severity) => Some(severity),
        SeverityRule::Lottery {
            elevated,
            otherwise,
            probability,
        } => {
            if bernoulli(rng, probability(factors)) {
                Some(elevated)
            } else {
                Some(otherwise)
            }
        }
    }
}

// Columns follow `DiseasePhase` declaration order.
const PHASE_COUNT: usize = DiseasePhase::COUNT;

#[rustfmt::skip]
static BASE_PROBABILITIES: &[(Symptom, [f64; PHASE_COUNT])] = &[
    //                          inc  onset plat  pp1   pp2   allrg c0   cold  clast flu0  flu   flast
    (Symptom::Fever,            [0.0, 0.2, 0.3,  0.1,  0.0,  0.0,  0.0, 0.0,  0.0,  0.7,  0.7,  0.3]),
    (Symptom::Chills,           [0.0, 0.8, 0.5,  0.5,  0.0,  0.0,  0.0, 0.0,  0.0,  0.8,  0.8,  0.2]),
    (Symptom::Gastro,           [0.0, 1.0, 0.25, 0.1,  0.1,  0.0,  0.0, 0.0,  0.0,  0.3,  0.3,  0.1]),
    (Symptom::Diarrhea,         [0.0, 0.9, 0.9,  0.9,  0.9,  0.0,  0.0, 0.0,  0.0,  0.5,  0.5,  0.5]),
    (Symptom::NauseaVomiting,   [0.0, 0.7, 0.7,  0.7,  0.7,  0.0,  0.0, 0.0,  0.0,  0.5,  0.5,  0.5]),
    (Symptom::Fatigue,          [0.0, 1.0, 1.0,  1.0,  1.0,  0.2,  0.0, 0.8,  0.8,  0.8,  0.8,  0.8]),
    (Symptom::HardTimeWakingUp, [0.0, 0.6, 0.6,  0.6,  0.6,  0.1,  0.0, 0.0,  0.0,  0.6,  0.6,  0.6]),
    (Symptom::Headache,         [0.0, 0.5, 0.5,  0.5,  0.5,  0.2,  0.0, 0.5,  0.5,  0.5,  0.5,  0.5]),
    (Symptom::Confused,         [0.0, 0.1, 0.1,  0.1,  0.1,  0.0,  0.0, 0.0,  0.0,  0.0,  0.0,  0.0]),
    (Symptom::LostConsciousness,[0.0, 0.1, 0.1,  0.1,  0.1,  0.0,  0.0, 0.0,  0.0,  0.0,  0.0,  0.0]),
    (Symptom::TroubleBreathing, [0.0, 1.0, 1.0,  1.0,  1.0,  0.0,  0.0, 0.0,  0.0,  0.0,  0.0,  0.0]),
    (Symptom::Sneezing,         [0.0, 0.2, 0.3,  0.3,  0.3,  0.6,  0.0, 0.4,  0.4,  0.2,  0.2,  0.2]),
    (Symptom::Cough,            [0.0, 0.6, 0.9,  0.9,  0.9,  0.3,  0.0, 0.8,  0.8,  0.6,  0.6,  0.4]),
    (Symptom::RunnyNose,        [0.0, 0.1, 0.2,  0.2,  0.2,  0.4,  0.0, 0.8,  0.8,  0.2,  0.2,  0.2]),
    (Symptom::SoreThroat,       [0.0, 0.5, 0.8,  0.8,  0.8,  0.2,  0.0, 0.5,  0.5,  0.6,  0.6,  0.2]),
    (Symptom::SevereChestPain,  [0.0, 0.4, 0.5,  0.15, 0.15, 0.0,  0.0, 0.0,  0.0,  0.0,  0.0,  0.0]),
    (Symptom::LightTroubleBreathing, [0.0, 0.0, 0.0, 0.0, 0.0, 0.02, 0.0, 0.0, 0.0, 0.0,  0.0,  0.0]),
    (Symptom::LossOfTaste,      [0.0, 0.25, 0.35, 0.0, 0.0,  0.0,  0.0, 0.0,  0.0,  0.0,  0.0,  0.0]),
    (Symptom::Aches,            [0.0, 0.3, 0.4,  0.3,  0.1,  0.0,  0.0, 0.3,  0.3,  0.8,  0.8,  0.4]),
    (Symptom::Unusual,          [0.0, 0.2, 0.3,  0.0,  0.0,  0.0,  0.0, 0.0,  0.0,  0.0,  0.0,  0.0]),
];

/// Table probability of `symptom` in `phase`; zero for symptoms the table does not list.
#[must_use]
pub fn base_probability(symptom: Symptom, phase: DiseasePhase) -> f64 {
    BASE_PROBABILITIES
        .iter()
        .find(|(s, _)| *s == symptom)
        .map_or(0.0, |(_, by_phase)| by_phase[phase as usize])
}

/// Symptoms that can only occur together with a gating symptom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Fever,
    Gastro,
    Fatigue,
    TroubleBreathing,
}

impl Gate {
    #[must_use]
    pub fn symptom(self) -> Symptom {
        match self {
            Gate::Fever => Symptom::Fever,
            Gate::Gastro => Symptom::Gastro,
            Gate::Fatigue => Symptom::Fatigue,
            Gate::TroubleBreathing => Symptom::TroubleBreathing,
        }
    }

    /// Probability of the gating symptom itself during a covid phase.
    #[must_use]
    pub fn probability(self, phase: DiseasePhase, factors: &SymptomFactors) -> f64 {
        match self {
            Gate::Fever => covid_fever_probability(phase, factors),
            Gate::Gastro => covid_gastro_probability(phase, factors.initial_viral_load),
            Gate::Fatigue => covid_fatigue_probability(
                phase,
                factors.age,
                factors.initial_viral_load,
                factors.carefulness,
            ),
            Gate::TroubleBreathing => covid_trouble_breathing_probability(phase, factors),
        }
    }
}

pub struct DependentSymptom {
    pub gate: Gate,
    pub symptom: Symptom,
    /// Whether this individual can have the symptom at all in the given phase.
    pub eligible: fn(DiseasePhase, &SymptomFactors) -> bool,
}

fn always_eligible(_: DiseasePhase, _: &SymptomFactors) -> bool {
    true
}

pub static DEPENDENT_SYMPTOMS: &[DependentSymptom] = &[
    DependentSymptom {
        gate: Gate::Fever,
        symptom: Symptom::Chills,
        eligible: |phase, f| phase != DiseasePhase::CovidOnset || f.extremely_sick,
    },
    DependentSymptom {
        gate: Gate::Gastro,
        symptom: Symptom::Diarrhea,
        eligible: always_eligible,
    },
    DependentSymptom {
        gate: Gate::Gastro,
        symptom: Symptom::NauseaVomiting,
        eligible: always_eligible,
    },
    DependentSymptom {
        gate: Gate::Fatigue,
        symptom: Symptom::HardTimeWakingUp,
        eligible: always_eligible,
    },
    DependentSymptom {
        gate: Gate::Fatigue,
        symptom: Symptom::Headache,
        eligible: always_eligible,
    },
    DependentSymptom {
        gate: Gate::Fatigue,
        symptom: Symptom::Confused,
        eligible: always_eligible,
    },
    DependentSymptom {
        gate: Gate::Fatigue,
        symptom: Symptom::LostConsciousness,
        eligible: |_, f| f.really_sick || f.extremely_sick || f.condition_count > 2,
    },
    DependentSymptom {
        gate: Gate::TroubleBreathing,
        symptom: Symptom::Sneezing,
        eligible: always_eligible,
    },
    DependentSymptom {
        gate: Gate::TroubleBreathing,
        symptom: Symptom::Cough,
        eligible: always_eligible,
    },
    DependentSymptom {
        gate: Gate::TroubleBreathing,
        symptom: Symptom::RunnyNose,
        eligible: always_eligible,
    },
    DependentSymptom {
        gate: Gate::TroubleBreathing,
        symptom: Symptom::SoreThroat,
        eligible: always_eligible,
    },
    DependentSymptom {
        gate: Gate::TroubleBreathing,
        symptom: Symptom::SevereChestPain,
        eligible: |_, f| f.extremely_sick,
    },
];

const GATES: [Gate; 4] = [Gate::Fever, Gate::Gastro, Gate::Fatigue, Gate::TroubleBreathing];

pub fn covid_fever_probability(phase: DiseasePhase, factors: &SymptomFactors) -> f64 {
    let base = base_probability(Symptom::Fever, phase);
    match phase {
        DiseasePhase::CovidOnset if factors.elevated_covid_risk() => base * 2.0,
        DiseasePhase::CovidPlateau if factors.initial_viral_load > 0.6 => 1.0,
        _ => base,
    }
}

/// `initial_viral_load - 0.15`, scaled by the phase multiplier in the base table.
pub fn covid_gastro_probability(phase: DiseasePhase, initial_viral_load: f64) -> f64 {
    match phase {
        DiseasePhase::CovidOnset => initial_viral_load - 0.15,
        DiseasePhase::CovidPlateau
        | DiseasePhase::CovidPostPlateau1
        | DiseasePhase::CovidPostPlateau2 => {
            (initial_viral_load - 0.15) * base_probability(Symptom::Gastro, phase)
        }
        _ => 0.0,
    }
}

pub fn covid_fatigue_probability(
    phase: DiseasePhase,
    age: f64,
    initial_viral_load: f64,
    carefulness: f64,
) -> f64 {
    let base = age / 200.0 + initial_viral_load * 0.6 - carefulness / 2.0;
    let probability = match phase {
        DiseasePhase::CovidOnset => base,
        DiseasePhase::CovidPlateau => base + initial_viral_load - 0.15,
        DiseasePhase::CovidPostPlateau1 => base * 1.5 + initial_viral_load - 0.15,
        DiseasePhase::CovidPostPlateau2 => base * 2.0 + initial_viral_load - 0.15,
        _ => 0.0,
    };
    probability.min(1.0)
}

pub fn covid_trouble_breathing_probability(phase: DiseasePhase, factors: &SymptomFactors) -> f64 {
    let ivl = factors.initial_viral_load;
    let carefulness = factors.carefulness;
    let mut probability = match phase {
        DiseasePhase::CovidOnset => 0.5 * ivl - carefulness * 0.25,
        DiseasePhase::CovidPlateau => 2.0 * (ivl - carefulness * 0.25),
        DiseasePhase::CovidPostPlateau1 => ivl - carefulness * 0.25,
        DiseasePhase::CovidPostPlateau2 => 0.5 * (ivl - carefulness * 0.25),
        _ => 0.0,
    };
    if factors.smoker_or_lung_disease {
        probability = probability * 4.0 + factors.age / 200.0;
    }
    probability.min(1.0)
}

/// Bernoulli trial that treats probabilities outside [0, 1] as certain outcomes.
pub(crate) fn bernoulli<R: Rng + ?Sized>(rng: &mut R, p: f64) -> bool {
    let draw: f64 = rng.random();
    draw < p
}

/// Draws the symptoms of a single covid phase. Incubation has none.
pub fn covid_phase_symptoms<R: Rng + ?Sized>(
    phase: DiseasePhase,
    factors: &SymptomFactors,
    rng: &mut R,
) -> SymptomSet {
    let mut symptoms = SymptomSet::new();
    let Some(severity) = sample_severity(phase, factors, rng) else {
        return symptoms;
    };
    symptoms.insert(severity.symptom());

    for gate in GATES {
        if !bernoulli(rng, gate.probability(phase, factors)) {
            continue;
        }
        symptoms.insert(gate.symptom());
        for dependent in DEPENDENT_SYMPTOMS.iter().filter(|d| d.gate == gate) {
            if (dependent.eligible)(phase, factors)
                && bernoulli(rng, base_probability(dependent.symptom, phase))
            {
                symptoms.insert(dependent.symptom);
            }
        }
        if gate == Gate::TroubleBreathing {
            symptoms.insert(severity.trouble_breathing_symptom());
        }
    }

    for symptom in [Symptom::LossOfTaste, Symptom::Aches] {
        if bernoulli(rng, base_probability(symptom, phase)) {
            symptoms.insert(symptom);
        }
    }
    if severity >= Severity::Severe && bernoulli(rng, base_probability(Symptom::Unusual, phase)) {
        symptoms.insert(Symptom::Unusual);
    }
    symptoms
}

/// Draws the symptoms of a cold, flu or allergy phase. Every listed symptom is an
/// independent trial, except diarrhea and nausea which need gastro.
pub fn common_phase_symptoms<R: Rng + ?Sized>(
    phase: DiseasePhase,
    factors: &SymptomFactors,
    rng: &mut R,
) -> SymptomSet {
    let mut symptoms = SymptomSet::new();
    if let Some(severity) = sample_severity(phase, factors, rng) {
        symptoms.insert(severity.symptom());
    }
    for (symptom, by_phase) in BASE_PROBABILITIES {
        if matches!(symptom, Symptom::Diarrhea | Symptom::NauseaVomiting) {
            continue;
        }
        if bernoulli(rng, by_phase[phase as usize]) {
            symptoms.insert(*symptom);
            if *symptom == Symptom::Gastro {
                for dependent in [Symptom::Diarrhea, Symptom::NauseaVomiting] {
                    if bernoulli(rng, base_probability(dependent, phase)) {
                        symptoms.insert(dependent);
                    }
                }
            }
        }
    }
    symptoms
}

/// Draws the symptoms of any phase.
pub fn phase_symptoms<R: Rng + ?Sized>(
    phase: DiseasePhase,
    factors: &SymptomFactors,
    rng: &mut R,
) -> SymptomSet {
    match phase.disease() {
        Disease::Covid => covid_phase_symptoms(phase, factors, rng),
        Disease::Allergy | Disease::Cold | Disease::Flu => common_phase_symptoms(phase, factors, rng),
    }
}
