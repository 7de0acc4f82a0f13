//! Domain model produced by the FHIR-to-patient transformation pipeline.
//!
//! Every type here is an immutable value object created once per transform
//! call. Nothing is cached or persisted; presentation layers only project
//! fields of [`PatientData`].

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Knobs for the synthesized parts of the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransformConfig {
    /// Journey start date used when a condition carries no onset.
    pub default_onset_date: NaiveDate,
    /// Days between diagnosis and the synthesized care-plan event.
    pub care_plan_lag_days: i64,
    /// Days between diagnosis and the synthesized follow-up event.
    pub follow_up_lag_days: i64,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            default_onset_date: NaiveDate::from_ymd_opt(2024, 1, 1).expect("static date"),
            care_plan_lag_days: 2,
            follow_up_lag_days: 14,
        }
    }
}

/// Patient demographics plus the derived risk score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PatientProfile {
    pub id: String,
    pub name: String,
    pub gender: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// Stable avatar seed derived from name and gender, not stored media.
    pub photo: String,
    /// Saturating heuristic in 10..=100, derived from the condition count.
    pub risk_score: u8,
    pub care_status: String,
    pub health_plan: String,
    pub last_updated: DateTime<Utc>,
}

/// Classification assigned to every condition; never supplied by the input.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ConditionKind {
    Chronic,
    Acute,
    Injury,
    #[serde(rename = "Mental Health")]
    MentalHealth,
}

impl ConditionKind {
    /// Lowercase identifier fragment used for synthesized ids.
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Chronic => "chronic",
            Self::Acute => "acute",
            Self::Injury => "injury",
            Self::MentalHealth => "mental-health",
        }
    }

    /// Care goals suggested on intake forms for this kind of condition.
    pub fn care_goals(&self) -> [&'static str; 3] {
        match self {
            Self::Chronic => [
                "Improve management of chronic condition",
                "Reduce symptom frequency and severity",
                "Maintain quality of life",
            ],
            Self::Acute => [
                "Resolve acute condition",
                "Prevent complications",
                "Return to normal activities",
            ],
            Self::Injury => [
                "Heal injury completely",
                "Restore full function",
                "Prevent re-injury",
            ],
            Self::MentalHealth => [
                "Improve mental health status",
                "Develop coping mechanisms",
                "Enhance daily functioning",
            ],
        }
    }
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Chronic => "Chronic",
            Self::Acute => "Acute",
            Self::Injury => "Injury",
            Self::MentalHealth => "Mental Health",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub id: String,
    pub code: String,
    pub display: String,
    pub onset_date: Option<NaiveDate>,
    pub severity: Option<String>,
    pub status: String,
    pub category: Option<String>,
    #[serde(rename = "type")]
    pub kind: ConditionKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub id: String,
    pub code: String,
    pub display: String,
    pub value: Option<String>,
    pub unit: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub status: String,
    pub category: Option<String>,
    pub interpretation: Option<String>,
}

/// Medication lifecycle as shown on the dashboard.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MedicationStatus {
    Active,
    PendingRefill,
    Completed,
    Stopped,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    pub id: String,
    pub name: String,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub refill_date: NaiveDate,
    /// Synthetic placeholder in 70..100, supplied by the placeholder seam.
    pub adherence_rate: u8,
    pub last_taken: Option<DateTime<Utc>>,
    pub next_due: DateTime<Utc>,
    pub status: MedicationStatus,
}

/// Risk tier of a care journey, derived from its severity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Prediction priority, derived from the same severity thresholds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CareTeamMember {
    pub role: String,
    pub name: String,
}

/// Engagement counters shown on journey cards; placeholder values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct JourneyMetrics {
    pub reviews: u32,
    pub active_plans: u32,
    pub claims: u32,
    pub communications: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JourneyEventKind {
    Clinical,
    Administrative,
    Communication,
}

/// One synthesized entry on a care-journey timeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JourneyEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: JourneyEventKind,
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    pub status: String,
    pub provider: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Numerically equal to the journey severity.
    pub confidence: u8,
    pub timeframe: String,
    pub priority: Priority,
    pub action: String,
}

/// Synthesized grouping of same-kind conditions. Not present in the input;
/// one journey exists per distinct [`ConditionKind`], not per condition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CareJourney {
    pub id: String,
    pub title: String,
    pub start_date: NaiveDate,
    pub status: String,
    pub primary_condition: String,
    pub risk_level: RiskLevel,
    pub last_updated: NaiveDate,
    #[serde(rename = "type")]
    pub kind: ConditionKind,
    /// Saturating heuristic in 20..=90, derived from the group size.
    pub severity: u8,
    pub phase: String,
    pub care_team: Vec<CareTeamMember>,
    pub metrics: JourneyMetrics,
    pub timeline: Vec<JourneyEvent>,
    pub predictions: Vec<Prediction>,
}

/// Aggregate root: the sole output of the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PatientData {
    pub profile: PatientProfile,
    pub conditions: Vec<Condition>,
    pub observations: Vec<Observation>,
    pub medications: Vec<Medication>,
    pub care_journeys: Vec<CareJourney>,
}

/// Pre-filled view of a patient for care-intake forms.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct IntakeSummary {
    pub patient_name: String,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub primary_condition: Option<String>,
    pub recent_observations: Vec<String>,
    pub current_medications: Vec<String>,
    pub relevant_history: Vec<String>,
    pub goals: Vec<String>,
}

impl PatientData {
    /// Medications the patient is currently on.
    pub fn active_medications(&self) -> impl Iterator<Item = &Medication> {
        self.medications
            .iter()
            .filter(|med| med.status == MedicationStatus::Active)
    }

    /// Derive the intake-form view of this patient as of `today`.
    ///
    /// The primary condition is the most recently onset active condition
    /// (conditions without an onset sort last); observations from the last
    /// 30 days are listed as recent findings, non-active conditions become
    /// the relevant history, and goals follow the primary condition's kind.
    pub fn intake_summary(&self, today: NaiveDate) -> IntakeSummary {
        let mut active: Vec<&Condition> = self
            .conditions
            .iter()
            .filter(|condition| condition.status == "active")
            .collect();
        active.sort_by(|a, b| match (a.onset_date, b.onset_date) {
            (Some(left), Some(right)) => right.cmp(&left),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        let primary = active.first().copied();

        let cutoff = today - Duration::days(30);
        let recent_observations = self
            .observations
            .iter()
            .filter(|obs| {
                obs.date
                    .map(|date| date.date_naive() > cutoff)
                    .unwrap_or(false)
            })
            .map(|obs| {
                let mut line = format!("{}:", obs.display);
                if let Some(value) = &obs.value {
                    line.push(' ');
                    line.push_str(value);
                }
                if let Some(unit) = &obs.unit {
                    line.push(' ');
                    line.push_str(unit);
                }
                line
            })
            .collect();

        let current_medications = self
            .active_medications()
            .map(|med| {
                let mut line = med.name.clone();
                if let Some(dosage) = &med.dosage {
                    line.push(' ');
                    line.push_str(dosage);
                }
                if let Some(frequency) = &med.frequency {
                    line.push(' ');
                    line.push_str(frequency);
                }
                line
            })
            .collect();

        let relevant_history = self
            .conditions
            .iter()
            .filter(|condition| condition.status != "active")
            .map(|condition| format!("{} ({})", condition.display, condition.status))
            .collect();

        let goals = primary
            .map(|condition| {
                condition
                    .kind
                    .care_goals()
                    .into_iter()
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        IntakeSummary {
            patient_name: self.profile.name.clone(),
            age: self
                .profile
                .birth_date
                .and_then(|birth| age_on(birth, today)),
            gender: self.profile.gender.clone(),
            primary_condition: primary.map(|condition| condition.display.clone()),
            recent_observations,
            current_medications,
            relevant_history,
            goals,
        }
    }
}

/// Whole years between `birth` and `today`, birthday-aware.
/// `None` when the birth date lies in the future.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> Option<u32> {
    let mut age = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    u32::try_from(age).ok()
}

/// Failure modes of the transformation pipeline.
///
/// Everything below the resource-type level degrades to defaults instead of
/// raising; the absent Patient resource is the one fatal case.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("patient resource not found in bundle")]
    MissingPatient,
    #[error("could not parse bundle: {0}")]
    Parse(String),
}
