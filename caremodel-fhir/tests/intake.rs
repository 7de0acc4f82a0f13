use caremodel_core::{age_on, TransformConfig};
use caremodel_fhir::{transform_bundle_value_with, FixedPlaceholders};
use chrono::NaiveDate;
use serde_json::{json, Value};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn patient_bundle() -> Value {
    json!({
        "resourceType": "Bundle",
        "type": "collection",
        "entry": [
            { "resource": {
                "resourceType": "Patient",
                "id": "patient-1",
                "gender": "female",
                "birthDate": "1984-03-15",
                "name": [{ "given": ["Jane"], "family": "Doe" }]
            } },
            { "resource": {
                "resourceType": "Condition",
                "id": "c1",
                "code": { "coding": [{ "system": "http://snomed.info/sct", "code": "38341003", "display": "Essential hypertension" }] },
                "clinicalStatus": { "coding": [{ "code": "active" }] },
                "onsetDateTime": "2024-03-10"
            } },
            { "resource": {
                "resourceType": "Condition",
                "id": "c2",
                "code": { "coding": [{ "system": "http://snomed.info/sct", "code": "73211009", "display": "Diabetes mellitus" }] },
                "clinicalStatus": { "coding": [{ "code": "active" }] },
                "onsetDateTime": "2024-05-01"
            } },
            { "resource": {
                "resourceType": "Condition",
                "id": "c3",
                "code": { "coding": [{ "system": "http://snomed.info/sct", "code": "233604007", "display": "Pneumonia" }] },
                "clinicalStatus": { "coding": [{ "code": "resolved" }] }
            } },
            { "resource": {
                "resourceType": "Observation",
                "id": "o1",
                "code": { "coding": [{ "code": "8867-4", "display": "Heart rate" }] },
                "valueQuantity": { "value": 72.0, "unit": "bpm" },
                "effectiveDateTime": "2024-05-20T09:00:00Z"
            } },
            { "resource": {
                "resourceType": "Observation",
                "id": "o2",
                "code": { "coding": [{ "code": "29463-7", "display": "Body weight" }] },
                "valueQuantity": { "value": 70.0, "unit": "kg" },
                "effectiveDateTime": "2024-01-05T09:00:00Z"
            } },
            { "resource": {
                "resourceType": "MedicationStatement",
                "id": "m1",
                "status": "active",
                "medicationCodeableConcept": { "text": "Metformin" },
                "dosage": [{ "doseQuantity": { "value": 500.0, "unit": "mg" }, "timing": { "code": { "text": "BID" } } }]
            } },
            { "resource": {
                "resourceType": "MedicationStatement",
                "id": "m2",
                "status": "completed",
                "medicationCodeableConcept": { "text": "Amoxicillin" }
            } }
        ]
    })
}

#[test]
fn intake_summary_prefills_the_care_form() {
    let data = transform_bundle_value_with(
        &patient_bundle(),
        &TransformConfig::default(),
        &mut FixedPlaceholders::default(),
    )
    .unwrap();

    let summary = data.intake_summary(date(2024, 6, 1));

    assert_eq!(summary.patient_name, "Jane Doe");
    assert_eq!(summary.age, Some(40));
    assert_eq!(summary.gender.as_deref(), Some("female"));
    // Most recent onset among active conditions wins.
    assert_eq!(summary.primary_condition.as_deref(), Some("Diabetes mellitus"));
    assert_eq!(summary.recent_observations, vec!["Heart rate: 72 bpm"]);
    assert_eq!(summary.current_medications, vec!["Metformin 500 mg BID"]);
    assert_eq!(summary.relevant_history, vec!["Pneumonia (resolved)"]);
    assert_eq!(
        summary.goals,
        vec![
            "Improve management of chronic condition",
            "Reduce symptom frequency and severity",
            "Maintain quality of life",
        ]
    );
}

#[test]
fn intake_summary_of_bare_patient_is_mostly_empty() {
    let bundle = json!({
        "resourceType": "Bundle",
        "entry": [{ "resource": { "resourceType": "Patient", "id": "p1" } }]
    });
    let data = transform_bundle_value_with(
        &bundle,
        &TransformConfig::default(),
        &mut FixedPlaceholders::default(),
    )
    .unwrap();

    let summary = data.intake_summary(date(2024, 6, 1));

    assert_eq!(summary.patient_name, "Unknown");
    assert_eq!(summary.age, None);
    assert_eq!(summary.primary_condition, None);
    assert!(summary.recent_observations.is_empty());
    assert!(summary.current_medications.is_empty());
    assert!(summary.relevant_history.is_empty());
    assert!(summary.goals.is_empty());
}

#[test]
fn age_is_birthday_aware() {
    let birth = date(1984, 3, 15);
    assert_eq!(age_on(birth, date(2024, 3, 14)), Some(39));
    assert_eq!(age_on(birth, date(2024, 3, 15)), Some(40));
    assert_eq!(age_on(birth, date(2024, 6, 1)), Some(40));
    assert_eq!(age_on(birth, date(1983, 1, 1)), None);
}
