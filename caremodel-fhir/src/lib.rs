//! FHIR JSON bundle to [`PatientData`] transformation pipeline.
//!
//! The pipeline probes a bundle as loose `serde_json::Value` trees rather
//! than deserializing rigid FHIR structs: real-world bundles arrive with
//! heterogeneous, partially-missing shapes, and every sub-field below the
//! resource type degrades to a documented default instead of failing the
//! transform. The absent Patient resource is the single fatal case.
//!
//! All extractors are pure functions over the same [`BundleIndex`]. The
//! values the dashboard shows but the clinical record cannot supply
//! (adherence rates, journey metrics, refill dates) come from a
//! [`PlaceholderSource`], so tests and future real computations can swap
//! them without touching extraction logic.

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use rand::Rng;
use serde_json::Value;

use caremodel_core::{
    CareJourney, CareTeamMember, Condition, ConditionKind, JourneyEvent, JourneyEventKind,
    JourneyMetrics, Medication, MedicationStatus, Observation, PatientData, PatientProfile,
    Prediction, Priority, RiskLevel, TransformConfig, TransformError,
};

/// Transform a bundle held as a JSON string, with the default random
/// placeholder source.
pub fn transform_bundle_str(
    bundle_json: &str,
    config: &TransformConfig,
) -> Result<PatientData, TransformError> {
    let value: Value =
        serde_json::from_str(bundle_json).map_err(|err| TransformError::Parse(err.to_string()))?;
    transform_bundle_value(&value, config)
}

/// Transform a parsed bundle with the default random placeholder source.
pub fn transform_bundle_value(
    bundle: &Value,
    config: &TransformConfig,
) -> Result<PatientData, TransformError> {
    transform_bundle_value_with(bundle, config, &mut ThreadRngPlaceholders)
}

/// Transform a parsed bundle with an explicit placeholder source.
///
/// This is the composition point: all five extractions run over the same
/// [`BundleIndex`]. Only the profile extraction can fail (no Patient
/// resource); every other slice may legitimately come back empty.
pub fn transform_bundle_value_with(
    bundle: &Value,
    config: &TransformConfig,
    placeholders: &mut dyn PlaceholderSource,
) -> Result<PatientData, TransformError> {
    let index = BundleIndex::new(bundle);

    let profile = extract_profile(&index)?;
    let conditions = extract_conditions(&index);
    let observations = extract_observations(&index);
    let medications = extract_medications(&index, placeholders);
    let care_journeys = synthesize_care_journeys(&conditions, config, placeholders);

    Ok(PatientData {
        profile,
        conditions,
        observations,
        medications,
        care_journeys,
    })
}

/// String-input variant of [`transform_bundle_value_with`].
pub fn transform_bundle_str_with(
    bundle_json: &str,
    config: &TransformConfig,
    placeholders: &mut dyn PlaceholderSource,
) -> Result<PatientData, TransformError> {
    let value: Value =
        serde_json::from_str(bundle_json).map_err(|err| TransformError::Parse(err.to_string()))?;
    transform_bundle_value_with(&value, config, placeholders)
}

/// Resource lookup over one bundle, built once per transform.
///
/// Entries are indexed by resource type and by `fullUrl`, so extractors
/// that resolve cross-resource references (medications) do a map lookup
/// instead of re-scanning the bundle per item.
pub struct BundleIndex<'a> {
    resources: Vec<&'a Value>,
    by_url: HashMap<&'a str, &'a Value>,
}

impl<'a> BundleIndex<'a> {
    /// Index a bundle. A missing or non-array `entry` field indexes as
    /// empty; no validation happens below the resource-type level.
    pub fn new(bundle: &'a Value) -> Self {
        let mut resources = Vec::new();
        let mut by_url = HashMap::new();

        if let Some(entries) = bundle.get("entry").and_then(Value::as_array) {
            for entry in entries {
                let Some(resource) = entry.get("resource") else {
                    continue;
                };
                resources.push(resource);
                if let Some(url) = entry.get("fullUrl").and_then(Value::as_str) {
                    by_url.insert(url, resource);
                }
            }
        }

        Self { resources, by_url }
    }

    /// All resources, in bundle order.
    pub fn resources(&self) -> impl Iterator<Item = &'a Value> + '_ {
        self.resources.iter().copied()
    }

    /// Resources of one type, in bundle order; empty when none exist.
    pub fn resources_of_type<'s>(
        &'s self,
        resource_type: &'s str,
    ) -> impl Iterator<Item = &'a Value> + 's {
        self.resources.iter().copied().filter(move |resource| {
            resource.get("resourceType").and_then(Value::as_str) == Some(resource_type)
        })
    }

    /// Look up an entry by its logical `fullUrl`.
    pub fn resolve(&self, reference: &str) -> Option<&'a Value> {
        self.by_url.get(reference).copied()
    }

    fn patient(&self) -> Result<&'a Value, TransformError> {
        self.resources_of_type("Patient")
            .next()
            .ok_or(TransformError::MissingPatient)
    }
}

/// Saturating risk heuristic: `clamp(10 + 7 × conditions, 10, 100)`.
/// A placeholder, not a clinical score; the formula is a compatibility
/// contract for downstream consumers.
pub fn risk_score(condition_count: usize) -> u8 {
    let raw = 10u32.saturating_add((condition_count as u32).saturating_mul(7));
    raw.clamp(10, 100) as u8
}

/// Journey severity heuristic: `clamp(group_size × 15, 20, 90)`.
pub fn journey_severity(condition_count: usize) -> u8 {
    let raw = 15u32.saturating_mul(condition_count as u32);
    raw.clamp(20, 90) as u8
}

/// Risk tier for a journey severity: `>70` High, `>40` Medium, else Low.
pub fn risk_level(severity: u8) -> RiskLevel {
    if severity > 70 {
        RiskLevel::High
    } else if severity > 40 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

fn prediction_priority(severity: u8) -> Priority {
    if severity > 70 {
        Priority::High
    } else if severity > 40 {
        Priority::Medium
    } else {
        Priority::Low
    }
}

fn extract_profile(index: &BundleIndex<'_>) -> Result<PatientProfile, TransformError> {
    let patient = index.patient()?;

    let name = extract_human_name(patient).unwrap_or_else(|| "Unknown".to_string());
    let gender = patient
        .get("gender")
        .and_then(Value::as_str)
        .map(str::to_string);

    let address = patient
        .get("address")
        .and_then(Value::as_array)
        .and_then(|addresses| addresses.first());
    let address_line = address
        .and_then(|addr| addr.get("line"))
        .and_then(Value::as_array)
        .map(|lines| {
            lines
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        })
        .filter(|line| !line.is_empty());

    let condition_count = index.resources_of_type("Condition").count();

    Ok(PatientProfile {
        id: resource_id(patient, "patient", 0),
        photo: avatar_seed(&name, gender.as_deref()),
        gender,
        birth_date: patient
            .get("birthDate")
            .and_then(Value::as_str)
            .and_then(parse_naive_date),
        address: address_line,
        city: address
            .and_then(|addr| addr.get("city"))
            .and_then(Value::as_str)
            .map(str::to_string),
        state: address
            .and_then(|addr| addr.get("state"))
            .and_then(Value::as_str)
            .map(str::to_string),
        phone: telecom_value(patient, "phone"),
        email: telecom_value(patient, "email"),
        name,
        risk_score: risk_score(condition_count),
        care_status: "Active".to_string(),
        health_plan: "Standard Care Plan".to_string(),
        last_updated: Utc::now(),
    })
}

fn extract_conditions(index: &BundleIndex<'_>) -> Vec<Condition> {
    index
        .resources_of_type("Condition")
        .enumerate()
        .map(|(position, resource)| {
            let coding = first_coding(resource.get("code"));

            let code = coding
                .and_then(|c| c.get("code"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let display = coding
                .and_then(|c| c.get("display"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| {
                    resource
                        .get("code")
                        .and_then(|code| code.get("text"))
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
                .unwrap_or_else(|| "Unknown Condition".to_string());

            Condition {
                id: resource_id(resource, "condition", position),
                kind: classify_condition(resource, coding),
                code,
                display,
                onset_date: resource
                    .get("onsetDateTime")
                    .and_then(Value::as_str)
                    .and_then(parse_naive_date),
                severity: first_coding(resource.get("severity"))
                    .and_then(|c| c.get("display"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
                status: first_coding(resource.get("clinicalStatus"))
                    .and_then(|c| c.get("code"))
                    .and_then(Value::as_str)
                    .unwrap_or("active")
                    .to_string(),
                category: first_category_display(resource),
            }
        })
        .collect()
}

/// Ordered classification heuristic; later rules override earlier ones.
///
/// 1. Default `Chronic`.
/// 2. Category `problem-list-item` keeps `Chronic`; `encounter-diagnosis`
///    switches to `Acute`.
/// 3. An ICD-10 coding system with a code starting `S`/`T` means `Injury`,
///    `F` means `MentalHealth`; this rule always wins over the category.
fn classify_condition(resource: &Value, coding: Option<&Value>) -> ConditionKind {
    let mut kind = ConditionKind::Chronic;

    if let Some(category_code) = resource
        .get("category")
        .and_then(Value::as_array)
        .and_then(|categories| categories.first())
        .and_then(|category| first_coding(Some(category)))
        .and_then(|c| c.get("code"))
        .and_then(Value::as_str)
    {
        match category_code {
            "problem-list-item" => kind = ConditionKind::Chronic,
            "encounter-diagnosis" => kind = ConditionKind::Acute,
            _ => {}
        }
    }

    if let Some(coding) = coding {
        let system = coding
            .get("system")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_lowercase();
        if system.contains("icd10") || system.contains("icd-10") {
            let code = coding.get("code").and_then(Value::as_str).unwrap_or_default();
            match code.chars().next() {
                Some('S') | Some('T') => kind = ConditionKind::Injury,
                Some('F') => kind = ConditionKind::MentalHealth,
                _ => {}
            }
        }
    }

    kind
}

fn extract_observations(index: &BundleIndex<'_>) -> Vec<Observation> {
    index
        .resources_of_type("Observation")
        .enumerate()
        .map(|(position, resource)| {
            let coding = first_coding(resource.get("code"));
            let (value, unit) = extract_observation_value(resource);

            Observation {
                id: resource_id(resource, "observation", position),
                code: coding
                    .and_then(|c| c.get("code"))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                display: coding
                    .and_then(|c| c.get("display"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .or_else(|| {
                        resource
                            .get("code")
                            .and_then(|code| code.get("text"))
                            .and_then(Value::as_str)
                            .map(str::to_string)
                    })
                    .unwrap_or_else(|| "Unknown Observation".to_string()),
                value,
                unit,
                date: extract_instant(resource, &["effectiveDateTime", "issued"]),
                status: resource
                    .get("status")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string(),
                category: first_category_display(resource),
                interpretation: resource
                    .get("interpretation")
                    .and_then(Value::as_array)
                    .and_then(|entries| entries.first())
                    .and_then(|entry| first_coding(Some(entry)))
                    .and_then(|c| c.get("display"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
            }
        })
        .collect()
}

/// Value extraction in strict priority order: quantity, then codeable
/// concept, then plain string. Exactly the first present branch is used.
fn extract_observation_value(resource: &Value) -> (Option<String>, Option<String>) {
    if let Some(quantity) = resource.get("valueQuantity") {
        let value = quantity
            .get("value")
            .and_then(Value::as_f64)
            .map(format_numeric);
        let unit = quantity
            .get("unit")
            .and_then(Value::as_str)
            .map(str::to_string);
        return (value, unit);
    }

    if let Some(concept) = resource.get("valueCodeableConcept") {
        return (concept_text(concept), None);
    }

    if let Some(text) = resource.get("valueString").and_then(Value::as_str) {
        if !text.is_empty() {
            return (Some(text.to_string()), None);
        }
    }

    (None, None)
}

fn extract_medications(
    index: &BundleIndex<'_>,
    placeholders: &mut dyn PlaceholderSource,
) -> Vec<Medication> {
    let mut medications = Vec::new();
    let mut position = 0;

    for resource in index.resources() {
        let resource_type = resource
            .get("resourceType")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if resource_type != "MedicationStatement" && resource_type != "MedicationAdministration" {
            continue;
        }

        let (dosage, frequency) = extract_dosage(resource);
        let status = match resource.get("status").and_then(Value::as_str) {
            Some("completed") => MedicationStatus::Completed,
            Some("stopped") => MedicationStatus::Stopped,
            _ => placeholders.unresolved_status(),
        };

        medications.push(Medication {
            id: resource_id(resource, "medication", position),
            name: resolve_medication_name(resource, index),
            dosage,
            frequency,
            refill_date: placeholders.today() + Duration::days(placeholders.refill_offset_days()),
            adherence_rate: placeholders.adherence_rate(),
            last_taken: last_taken(resource),
            next_due: placeholders.now() + Duration::days(1),
            status,
        });
        position += 1;
    }

    medications
}

/// Name resolution order: inline codeable concept, then the referenced
/// resource's code (looked up by logical url), then the unknown literal.
fn resolve_medication_name(resource: &Value, index: &BundleIndex<'_>) -> String {
    if let Some(name) = resource
        .get("medicationCodeableConcept")
        .and_then(concept_text)
    {
        return name;
    }

    let reference = resource
        .get("medicationReference")
        .or_else(|| resource.get("medication"))
        .and_then(|medication| medication.get("reference"))
        .and_then(Value::as_str);
    if let Some(url) = reference {
        if let Some(name) = index
            .resolve(url)
            .and_then(|target| target.get("code"))
            .and_then(concept_text)
        {
            return name;
        }
    }

    "Unknown Medication".to_string()
}

/// Dosage and frequency from the first dosage instruction. A structured
/// dose (value + unit) beats the free-text dosage string; frequency falls
/// back through timing text, the repeat pattern, the free text, the
/// effective period, and finally "As directed".
fn extract_dosage(resource: &Value) -> (Option<String>, Option<String>) {
    let first_dosage = match resource.get("dosage") {
        Some(Value::Array(instructions)) => instructions.first(),
        Some(other) if other.is_object() => Some(other),
        _ => None,
    };

    let mut dosage = None;
    let mut frequency = None;

    if let Some(instruction) = first_dosage {
        let structured = instruction
            .get("dose")
            .or_else(|| instruction.get("doseQuantity"))
            .and_then(format_quantity);
        let text = instruction
            .get("text")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty());

        dosage = structured.or_else(|| text.map(str::to_string));

        frequency = instruction
            .get("timing")
            .and_then(|timing| timing.get("code"))
            .and_then(|code| code.get("text"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| {
                instruction
                    .get("timing")
                    .and_then(|timing| timing.get("repeat"))
                    .and_then(format_repeat)
            })
            .or_else(|| {
                // Free text only serves as frequency when the dose already
                // came from a structured quantity.
                match (&dosage, text) {
                    (Some(dose), Some(text)) if dose.as_str() != text => Some(text.to_string()),
                    _ => None,
                }
            });
    }

    if frequency.is_none() {
        frequency = effective_period_phrase(resource);
    }

    (dosage, frequency.or_else(|| Some("As directed".to_string())))
}

fn format_repeat(repeat: &Value) -> Option<String> {
    let frequency = repeat.get("frequency").and_then(Value::as_u64)?;
    match repeat.get("period").and_then(Value::as_u64) {
        Some(period) => {
            let unit = repeat
                .get("periodUnit")
                .and_then(Value::as_str)
                .unwrap_or("day");
            Some(format!("{frequency} time(s) per {period} {unit}"))
        }
        None => Some(format!("{frequency} time(s) daily")),
    }
}

fn effective_period_phrase(resource: &Value) -> Option<String> {
    let period = resource.get("effectivePeriod")?;
    let start = period
        .get("start")
        .and_then(Value::as_str)
        .and_then(parse_naive_date)?;
    match period
        .get("end")
        .and_then(Value::as_str)
        .and_then(parse_naive_date)
    {
        Some(end) => Some(format!("From {start} to {end}")),
        None => Some(format!("Since {start}")),
    }
}

fn last_taken(resource: &Value) -> Option<DateTime<Utc>> {
    resource
        .get("effectiveDateTime")
        .and_then(Value::as_str)
        .and_then(parse_instant)
        .or_else(|| {
            resource
                .get("effectivePeriod")
                .and_then(|period| period.get("start"))
                .and_then(Value::as_str)
                .and_then(parse_instant)
        })
}

/// Synthesize one care journey per distinct condition kind.
///
/// Grouping preserves first-seen order of kinds and the input order of
/// conditions within a kind; the primary condition is the first one
/// encountered in its group. An empty input yields an empty output.
pub fn synthesize_care_journeys(
    conditions: &[Condition],
    config: &TransformConfig,
    placeholders: &mut dyn PlaceholderSource,
) -> Vec<CareJourney> {
    let mut groups: Vec<(ConditionKind, Vec<&Condition>)> = Vec::new();
    for condition in conditions {
        match groups.iter_mut().find(|(kind, _)| *kind == condition.kind) {
            Some((_, members)) => members.push(condition),
            None => groups.push((condition.kind, vec![condition])),
        }
    }

    groups
        .into_iter()
        .map(|(kind, members)| {
            let primary = members[0];
            let severity = journey_severity(members.len());
            let start_date = primary.onset_date.unwrap_or(config.default_onset_date);
            let journey_id = format!("journey-{}", kind.slug());
            let care_team = placeholders.care_team();

            let timeline = vec![
                JourneyEvent {
                    id: format!("{journey_id}-diagnosis"),
                    kind: JourneyEventKind::Clinical,
                    title: "Initial Diagnosis".to_string(),
                    description: format!("Diagnosed with {}", primary.display),
                    date: start_date,
                    status: "completed".to_string(),
                    provider: None,
                },
                JourneyEvent {
                    id: format!("{journey_id}-care-plan"),
                    kind: JourneyEventKind::Administrative,
                    title: "Care Plan Created".to_string(),
                    description: "Treatment plan established".to_string(),
                    date: start_date + Duration::days(config.care_plan_lag_days),
                    status: "completed".to_string(),
                    provider: None,
                },
                JourneyEvent {
                    id: format!("{journey_id}-follow-up"),
                    kind: JourneyEventKind::Communication,
                    title: "Follow-up Consultation".to_string(),
                    description: "Review of treatment progress".to_string(),
                    date: start_date + Duration::days(config.follow_up_lag_days),
                    status: "completed".to_string(),
                    provider: care_team.first().map(|member| member.name.clone()),
                },
            ];

            let prediction = Prediction {
                id: format!("{journey_id}-outlook"),
                title: if severity > 70 {
                    "High Risk of Complications".to_string()
                } else {
                    "Moderate Risk of Complications".to_string()
                },
                description: format!("Based on {} progression and risk factors", primary.display),
                confidence: severity,
                timeframe: "Next 30 days".to_string(),
                priority: prediction_priority(severity),
                action: "Review Care Plan".to_string(),
            };

            CareJourney {
                id: journey_id,
                title: format!("{} Management", primary.display),
                start_date,
                status: "Active".to_string(),
                primary_condition: primary.display.clone(),
                risk_level: risk_level(severity),
                last_updated: placeholders.today(),
                kind,
                severity,
                phase: "Active Management Phase".to_string(),
                care_team,
                metrics: placeholders.journey_metrics(),
                timeline,
                predictions: vec![prediction],
            }
        })
        .collect()
}

/// Supplier of the values the dashboard shows but the clinical record does
/// not carry. The default implementation draws random values in the ranges
/// the dashboard expects; substitute [`FixedPlaceholders`] in tests, or a
/// real computation once one exists.
pub trait PlaceholderSource {
    /// Synthetic adherence percentage in `70..100`.
    fn adherence_rate(&mut self) -> u8;

    /// Days from today until the next refill, in `0..30`.
    fn refill_offset_days(&mut self) -> i64;

    /// Status for medications the source marks neither completed nor
    /// stopped.
    fn unresolved_status(&mut self) -> MedicationStatus;

    /// Engagement counters for a journey card.
    fn journey_metrics(&mut self) -> JourneyMetrics;

    /// Care team roster for a journey.
    fn care_team(&mut self) -> Vec<CareTeamMember> {
        default_care_team()
    }

    /// Calendar date used for refill math and journey bookkeeping.
    fn today(&mut self) -> NaiveDate {
        Utc::now().date_naive()
    }

    /// Instant used as the base for the next-due timestamp.
    fn now(&mut self) -> DateTime<Utc> {
        Utc::now()
    }
}

fn default_care_team() -> Vec<CareTeamMember> {
    vec![
        CareTeamMember {
            role: "Primary Care".to_string(),
            name: "Dr. Sarah Johnson".to_string(),
        },
        CareTeamMember {
            role: "Specialist".to_string(),
            name: "Dr. Michael Chen".to_string(),
        },
        CareTeamMember {
            role: "Care Coordinator".to_string(),
            name: "Emily Davis".to_string(),
        },
    ]
}

/// Default placeholder source backed by the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngPlaceholders;

impl PlaceholderSource for ThreadRngPlaceholders {
    fn adherence_rate(&mut self) -> u8 {
        rand::thread_rng().gen_range(70..100)
    }

    fn refill_offset_days(&mut self) -> i64 {
        rand::thread_rng().gen_range(0..30)
    }

    fn unresolved_status(&mut self) -> MedicationStatus {
        if rand::thread_rng().gen_bool(0.3) {
            MedicationStatus::PendingRefill
        } else {
            MedicationStatus::Active
        }
    }

    fn journey_metrics(&mut self) -> JourneyMetrics {
        let mut rng = rand::thread_rng();
        JourneyMetrics {
            reviews: rng.gen_range(1..=10),
            active_plans: rng.gen_range(1..=3),
            claims: rng.gen_range(1..=15),
            communications: rng.gen_range(1..=30),
        }
    }
}

/// Deterministic placeholder source for tests and reproducible pipelines.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FixedPlaceholders {
    pub adherence_rate: u8,
    pub refill_offset_days: i64,
    pub unresolved_status: MedicationStatus,
    pub metrics: JourneyMetrics,
    pub today: NaiveDate,
    pub now: DateTime<Utc>,
}

impl Default for FixedPlaceholders {
    fn default() -> Self {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).expect("static date");
        Self {
            adherence_rate: 85,
            refill_offset_days: 7,
            unresolved_status: MedicationStatus::Active,
            metrics: JourneyMetrics {
                reviews: 3,
                active_plans: 1,
                claims: 5,
                communications: 10,
            },
            today,
            now: Utc.from_utc_datetime(&today.and_hms_opt(12, 0, 0).expect("static time")),
        }
    }
}

impl PlaceholderSource for FixedPlaceholders {
    fn adherence_rate(&mut self) -> u8 {
        self.adherence_rate
    }

    fn refill_offset_days(&mut self) -> i64 {
        self.refill_offset_days
    }

    fn unresolved_status(&mut self) -> MedicationStatus {
        self.unresolved_status
    }

    fn journey_metrics(&mut self) -> JourneyMetrics {
        self.metrics
    }

    fn today(&mut self) -> NaiveDate {
        self.today
    }

    fn now(&mut self) -> DateTime<Utc> {
        self.now
    }
}

fn extract_human_name(patient: &Value) -> Option<String> {
    let name = patient
        .get("name")
        .and_then(Value::as_array)
        .and_then(|names| names.first())?;
    let given = name
        .get("given")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default();
    let family = name.get("family").and_then(Value::as_str).unwrap_or("");
    let full = format!("{given} {family}").trim().to_string();
    if full.is_empty() {
        None
    } else {
        Some(full)
    }
}

fn telecom_value(patient: &Value, system: &str) -> Option<String> {
    patient
        .get("telecom")
        .and_then(Value::as_array)?
        .iter()
        .find(|entry| entry.get("system").and_then(Value::as_str) == Some(system))
        .and_then(|entry| entry.get("value"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Stable avatar seed derived from name and gender; presentation decides
/// how to render it.
fn avatar_seed(name: &str, gender: Option<&str>) -> String {
    let raw = format!("{name}-{}", gender.unwrap_or("unknown"));
    let slug: String = raw
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .collect();
    format!("persona:{slug}")
}

fn first_coding(value: Option<&Value>) -> Option<&Value> {
    value?
        .get("coding")
        .and_then(Value::as_array)
        .and_then(|codings| codings.first())
}

/// First coding display of a codeable concept, falling back to its text.
fn concept_text(concept: &Value) -> Option<String> {
    if let Some(display) = first_coding(Some(concept))
        .and_then(|coding| coding.get("display"))
        .and_then(Value::as_str)
    {
        if !display.trim().is_empty() {
            return Some(display.trim().to_string());
        }
    }
    concept
        .get("text")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn first_category_display(resource: &Value) -> Option<String> {
    resource
        .get("category")
        .and_then(Value::as_array)
        .and_then(|categories| categories.first())
        .and_then(|category| first_coding(Some(category)))
        .and_then(|coding| coding.get("display"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn resource_id(resource: &Value, fallback: &str, position: usize) -> String {
    resource
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("{fallback}-{position}"))
}

fn extract_instant(resource: &Value, fields: &[&str]) -> Option<DateTime<Utc>> {
    fields
        .iter()
        .filter_map(|field| resource.get(*field))
        .filter_map(Value::as_str)
        .find_map(parse_instant)
}

fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    // Plain dates appear where full timestamps are expected.
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

fn parse_naive_date(value: &str) -> Option<NaiveDate> {
    let prefix = value.get(..10).unwrap_or(value);
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

fn format_numeric(value: f64) -> String {
    if value.fract().abs() < f64::EPSILON {
        format!("{value:.0}")
    } else if (value * 10.0).fract().abs() < f64::EPSILON {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

fn format_quantity(quantity: &Value) -> Option<String> {
    let magnitude = quantity.get("value")?.as_f64()?;
    let number = format_numeric(magnitude);
    match quantity.get("unit").and_then(Value::as_str) {
        Some(unit) if !unit.is_empty() => Some(format!("{number} {unit}")),
        _ => Some(number),
    }
}
