//! Search Scenario Tests
//!
//! End-to-end searches over the clinical indexes:
//! - Scenario queries return the expected keys and projections
//! - NUMERIC ranges honour inclusive and exclusive bounds
//! - Missing optional fields exclude only searches on that field

use fhirsearch::cli::build_indexes;
use fhirsearch::query::{SearchOptions, SortDirection};
use fhirsearch::schema::FieldSchema;
use fhirsearch::{EngineConfig, SearchEngine};
use serde_json::{json, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn clinical_engine() -> SearchEngine {
    let engine = SearchEngine::new(EngineConfig::default());
    build_indexes(&engine).unwrap();

    let locations = [
        ("1", "active", "Providence Alaska Medical Center", "Anchorage", "AK"),
        ("2", "active", "Denali Clinic", "Fairbanks", "AK"),
        ("3", "inactive", "Old Juneau Clinic", "Juneau", "AK"),
        ("4", "active", "Pikes Peak Hospital", "Woodland Park", "CO"),
        ("5", "active", "Alaska Native Medical Center", "Anchorage", "AK"),
    ];
    for (id, status, name, city, state) in locations {
        engine
            .put(
                &format!("Location:{}", id),
                json!({
                    "resourceType": "Location",
                    "id": id,
                    "status": status,
                    "name": name,
                    "address": {"city": city, "state": state}
                }),
            )
            .unwrap();
    }

    let roles = [
        ("r1", "Dr. Ada", "General Practice", "Anchorage General Hospital"),
        ("r2", "Dr. Bo", "General Practice", "Fairbanks Family Clinic"),
        ("r3", "Dr. Cy", "Practice Management, General", "Mercy Hospital"),
    ];
    for (id, physician, specialty, location) in roles {
        engine
            .put(
                &format!("PractitionerRole:{}", id),
                json!({
                    "practitioner": {"display": physician},
                    "specialty": [{"text": specialty}],
                    "location": [{"display": location}]
                }),
            )
            .unwrap();
    }

    let requests = [
        ("m1", "active", "Amoxicillin 250 MG", "Acute bronchitis (disorder)"),
        ("m2", "stopped", "Acetaminophen 325 MG", "Acute bronchitis (disorder)"),
        ("m3", "active", "Oxycodone Hydrochloride 5 MG", "Fracture of forearm"),
        ("m4", "active", "Albuterol 0.09 MG/ACTUAT", "Childhood asthma"),
    ];
    for (id, status, drug, reason) in requests {
        engine
            .put(
                &format!("MedicationRequest:{}", id),
                json!({
                    "status": status,
                    "medicationCodeableConcept": {"text": drug},
                    "requester": {"display": "Dr. Ada"},
                    "reasonReference": [{"display": reason}]
                }),
            )
            .unwrap();
    }

    let shots = [
        ("i1", "Influenza, seasonal", "Urgent Care of Anchorage", "2015-06-03T10:15:00-04:00", "Patient/p1"),
        ("i2", "Influenza, seasonal", "Urgent Care of Anchorage", "2016-06-03T10:15:00-04:00", "Patient/p2"),
        ("i3", "Td (adult)", "Anchorage General Hospital", "2015-01-20T08:00:00-04:00", "Patient/p3"),
    ];
    for (id, vax, location, date, patient) in shots {
        engine
            .put(
                &format!("Immunization:{}", id),
                json!({
                    "vaccineCode": {"text": vax},
                    "location": {"display": location},
                    "occurrenceDateTime": date,
                    "patient": {"reference": patient}
                }),
            )
            .unwrap();
    }

    let conditions = [
        ("c1", "active", "Perennial allergic rhinitis", "Patient/p1"),
        ("c2", "resolved", "Childhood asthma", "Patient/p2"),
        ("c3", "active", "Childhood asthma", "Patient/p3"),
        ("c4", "active", "Acute bronchitis (disorder)", "Patient/p4"),
    ];
    for (id, code, problem, subject) in conditions {
        engine
            .put(
                &format!("Condition:{}", id),
                json!({
                    "clinicalStatus": {"coding": [{"code": code}]},
                    "code": {"text": problem},
                    "recordedDate": "2020-01-01T00:00:00Z",
                    "subject": {"reference": subject}
                }),
            )
            .unwrap();
    }

    let claims = [
        ("k1", "active", "Aetna", 1000.0, "Encounter for check up"),
        ("k2", "active", "Aetna", 999.999, "Emergency room admission"),
        ("k3", "active", "Humana", 5000.0, "Surgical procedure"),
        ("k4", "cancelled", "Aetna", 2500.0, "Well child visit"),
        ("k5", "active", "Aetna", 0.0, "Telephone consultation"),
    ];
    for (id, status, insurer, value, service) in claims {
        engine
            .put(
                &format!("Claim:{}", id),
                json!({
                    "status": status,
                    "insurance": [{"coverage": {"display": insurer}}],
                    "total": {"value": value, "currency": "USD"},
                    "item": [{"productOrService": {"text": service}}]
                }),
            )
            .unwrap();
    }

    engine
}

fn keys(engine: &SearchEngine, index: &str, query: &str) -> Vec<String> {
    engine
        .search(index, query, &SearchOptions::new())
        .unwrap()
        .documents
        .into_iter()
        .map(|d| d.key)
        .collect()
}

// =============================================================================
// Round Trip
// =============================================================================

#[test]
fn test_put_then_tag_search_round_trip() {
    let engine = SearchEngine::new(EngineConfig::default());
    engine
        .create_index("A", "prefix:", vec![FieldSchema::tag("$.f", "f")])
        .unwrap();
    engine.put("prefix:1", json!({"f": "x"})).unwrap();

    let result = engine.search("A", "@f:{x}", &SearchOptions::new()).unwrap();
    assert_eq!(result.documents.len(), 1);
    assert_eq!(result.documents[0].key, "prefix:1");
}

// =============================================================================
// Clinical Scenarios
// =============================================================================

#[test]
fn test_location_facilities_in_alaska() {
    let engine = clinical_engine();
    let options = SearchOptions::new()
        .return_fields(["$.name", "$.address.city"])
        .limit(3);
    let result = engine
        .search("location_idx", "(@status:{active} @state:{AK})", &options)
        .unwrap();

    assert_eq!(result.total_matched, 3);
    assert_eq!(result.keys(), vec!["Location:1", "Location:2", "Location:5"]);
    assert_eq!(
        Value::Object(result.documents[0].fields.clone()),
        json!({"$.name": "Providence Alaska Medical Center", "$.address.city": "Anchorage"})
    );
}

#[test]
fn test_general_practice_at_hospital() {
    let engine = clinical_engine();
    assert_eq!(
        keys(
            &engine,
            "practitionerRole_idx",
            "(@specialty:\"General Practice\" @location:hospital)"
        ),
        vec!["PractitionerRole:r1"]
    );
}

#[test]
fn test_active_bronchitis_prescriptions() {
    let engine = clinical_engine();
    let options = SearchOptions::new().return_fields(["$.medicationCodeableConcept.text"]);
    let result = engine
        .search(
            "medicationRequest_idx",
            "(@status:{active} @reason:%bronchitis%)",
            &options,
        )
        .unwrap();
    assert_eq!(result.keys(), vec!["MedicationRequest:m1"]);
    assert_eq!(
        result.documents[0].fields["$.medicationCodeableConcept.text"],
        json!("Amoxicillin 250 MG")
    );
}

#[test]
fn test_field_alternation() {
    let engine = clinical_engine();
    assert_eq!(
        keys(
            &engine,
            "medicationRequest_idx",
            "@drug:Hydrocodone|Oxycodone|Morphine"
        ),
        vec!["MedicationRequest:m3"]
    );
}

#[test]
fn test_urgent_care_immunizations_in_2015() {
    let engine = clinical_engine();
    let options = SearchOptions::new().return_fields(["$.patient.reference"]);
    let result = engine
        .search("immunization_idx", "@location:urgent @date:2015*", &options)
        .unwrap();
    assert_eq!(result.keys(), vec!["Immunization:i1"]);
    assert_eq!(result.documents[0].fields["$.patient.reference"], json!("Patient/p1"));
}

#[test]
fn test_active_rhinitis_or_asthma() {
    let engine = clinical_engine();
    assert_eq!(
        keys(&engine, "condition_idx", "@code:{active} @problem:(rhinitis|asthma)"),
        vec!["Condition:c1", "Condition:c3"]
    );
}

#[test]
fn test_aetna_claims_over_1000() {
    let engine = clinical_engine();
    let options = SearchOptions::new().return_fields(["$.item[0].productOrService.text"]);
    let result = engine
        .search(
            "claims_idx",
            "@insurer:Aetna @value:[1000,+inf] @status:{active}",
            &options,
        )
        .unwrap();
    assert_eq!(result.keys(), vec!["Claim:k1"]);
    assert_eq!(
        result.documents[0].fields["$.item[0].productOrService.text"],
        json!("Encounter for check up")
    );
}

// =============================================================================
// Numeric Bounds
// =============================================================================

#[test]
fn test_numeric_bounds() {
    let engine = clinical_engine();
    let matched = keys(&engine, "claims_idx", "@value:[1000 +inf]");
    assert!(matched.contains(&"Claim:k1".to_string()));
    assert!(!matched.contains(&"Claim:k2".to_string()));

    assert_eq!(keys(&engine, "claims_idx", "@value:[-inf 0]"), vec!["Claim:k5"]);
    assert_eq!(keys(&engine, "claims_idx", "@value:[(0 (1000]"), vec!["Claim:k2"]);
}

// =============================================================================
// Missing Fields And Operators
// =============================================================================

#[test]
fn test_missing_field_excludes_only_that_field() {
    let engine = clinical_engine();
    engine
        .put("Location:6", json!({"status": "active", "name": "Nome Clinic"}))
        .unwrap();

    assert!(!keys(&engine, "location_idx", "@state:{AK}").contains(&"Location:6".to_string()));
    assert!(keys(&engine, "location_idx", "@status:{active}").contains(&"Location:6".to_string()));
    assert_eq!(keys(&engine, "location_idx", "@name:nome"), vec!["Location:6"]);
}

#[test]
fn test_negation_and_union() {
    let engine = clinical_engine();
    assert_eq!(
        keys(&engine, "location_idx", "@state:{AK} -@status:{active}"),
        vec!["Location:3"]
    );
    assert_eq!(
        keys(&engine, "location_idx", "@state:{CO} | @city:{Juneau}"),
        vec!["Location:3", "Location:4"]
    );
}

#[test]
fn test_tag_match_is_case_sensitive() {
    let engine = clinical_engine();
    assert!(keys(&engine, "location_idx", "@state:{ak}").is_empty());
}

#[test]
fn test_sorted_paging() {
    let engine = clinical_engine();
    let options = SearchOptions::new()
        .sort_by("insurer", SortDirection::Desc)
        .offset(0)
        .limit(1);
    let result = engine.search("claims_idx", "@status:{active}", &options).unwrap();
    assert_eq!(result.total_matched, 4);
    assert_eq!(result.keys(), vec!["Claim:k3"]);
}

#[test]
fn test_query_errors() {
    let engine = clinical_engine();
    for query in ["@state:{AK", "@nosuch:{x}", "@name:{Denali}", ""] {
        let err = engine
            .search("location_idx", query, &SearchOptions::new())
            .unwrap_err();
        assert_eq!(err.code(), "FHIR_QUERY_SYNTAX", "query {:?}", query);
    }
}
