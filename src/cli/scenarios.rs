//! Clinical indexes and scenarios
//!
//! Six indexes over Synthea-generated FHIR resources and twelve business
//! questions answered with search or aggregation.

use serde::Serialize;
use serde_json::Value;

use crate::aggregate::{Reducer, ReducerKind, Stage};
use crate::engine::SearchEngine;
use crate::error::{Error, Result};
use crate::query::{SearchOptions, SortDirection};
use crate::schema::FieldSchema;

/// Name, key prefix and fields of one index
pub struct IndexDefinition {
    pub name: &'static str,
    pub prefix: &'static str,
    pub fields: Vec<FieldSchema>,
}

/// The clinical indexes, one per resource type
pub fn clinical_indexes() -> Vec<IndexDefinition> {
    vec![
        IndexDefinition {
            name: "location_idx",
            prefix: "Location:",
            fields: vec![
                FieldSchema::tag("$.status", "status"),
                FieldSchema::text("$.name", "name"),
                FieldSchema::tag("$.address.city", "city"),
                FieldSchema::tag("$.address.state", "state"),
                FieldSchema::numeric("$.position.longitude", "longitude"),
                FieldSchema::numeric("$.position.latitude", "latitude"),
            ],
        },
        IndexDefinition {
            name: "practitionerRole_idx",
            prefix: "PractitionerRole:",
            fields: vec![
                FieldSchema::text("$.practitioner.display", "physician"),
                FieldSchema::text("$.specialty[*].text", "specialty").sortable(),
                FieldSchema::text("$.location[*].display", "location"),
            ],
        },
        IndexDefinition {
            name: "medicationRequest_idx",
            prefix: "MedicationRequest:",
            fields: vec![
                FieldSchema::tag("$.status", "status"),
                FieldSchema::text("$.medicationCodeableConcept.text", "drug"),
                FieldSchema::text("$.requester.display", "prescriber").sortable(),
                FieldSchema::text("$.reasonReference[*].display", "reason"),
            ],
        },
        IndexDefinition {
            name: "immunization_idx",
            prefix: "Immunization:",
            fields: vec![
                FieldSchema::text("$.vaccineCode.text", "vax").sortable(),
                FieldSchema::text("$.location.display", "location"),
                FieldSchema::text("$.occurrenceDateTime", "date"),
            ],
        },
        IndexDefinition {
            name: "condition_idx",
            prefix: "Condition:",
            fields: vec![
                FieldSchema::tag("$.clinicalStatus.coding[*].code", "code"),
                FieldSchema::text("$.code.text", "problem"),
                FieldSchema::tag("$.recordedDate", "date"),
            ],
        },
        IndexDefinition {
            name: "claims_idx",
            prefix: "Claim:",
            fields: vec![
                FieldSchema::tag("$.status", "status"),
                FieldSchema::text("$.insurance[*].coverage.display", "insurer").sortable(),
                FieldSchema::numeric("$.total.value", "value"),
            ],
        },
    ]
}

/// Registers every clinical index; returns how many were created
pub fn build_indexes(engine: &SearchEngine) -> Result<usize> {
    let definitions = clinical_indexes();
    let count = definitions.len();
    for definition in definitions {
        engine.create_index(definition.name, definition.prefix, definition.fields)?;
    }
    Ok(count)
}

/// What a scenario runs
pub enum Request {
    Search {
        query: &'static str,
        options: SearchOptions,
    },
    Aggregate {
        query: &'static str,
        stages: Vec<Stage>,
    },
}

/// A business question answered against one index
pub struct Scenario {
    pub title: &'static str,
    pub problem: &'static str,
    pub index: &'static str,
    pub request: Request,
}

/// Result of one scenario
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioOutcome {
    pub title: &'static str,
    pub problem: &'static str,
    pub result: Value,
}

const OPIOIDS: &str = "@drug:Hydrocodone|Oxycodone|Oxymorphone|Morphine|Codeine|Fentanyl|Hydromorphone|Tapentadol|Methadone";

fn search(query: &'static str, returns: &[&str], size: usize) -> Request {
    Request::Search {
        query,
        options: SearchOptions::new()
            .return_fields(returns.iter().copied())
            .offset(0)
            .limit(size),
    }
}

fn count_by(property: &str, alias: &str) -> Stage {
    Stage::group_by(
        [property],
        vec![Reducer::new(ReducerKind::Count, Some(property), alias)],
    )
}

pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            title: "Location Scenario 1",
            problem: "Find 3 medical facilities in Alaska",
            index: "location_idx",
            request: search(
                "(@status:{active} @state:{AK})",
                &["$.name", "$.address.city"],
                3,
            ),
        },
        Scenario {
            title: "Location Scenario 2",
            problem: "Find the closest medical facility to Woodland Park CO",
            index: "location_idx",
            request: Request::Aggregate {
                query: "@status:{active}",
                stages: vec![
                    Stage::load(["@name", "@city", "@state", "@longitude", "@latitude"]),
                    Stage::apply("geodistance(@longitude, @latitude, -105.0569, 38.9939)", "meters"),
                    Stage::apply("ceil(@meters*0.000621371)", "miles"),
                    Stage::sort_by("@miles", SortDirection::Asc),
                    Stage::limit(0, 1),
                ],
            },
        },
        Scenario {
            title: "PractitionerRole Scenario 1",
            problem: "Find 3 General Practice physicians that work from a hospital",
            index: "practitionerRole_idx",
            request: search(
                "(@specialty:\"General Practice\" @location:hospital)",
                &["$.practitioner.display"],
                3,
            ),
        },
        Scenario {
            title: "PractitionerRole Scenario 2",
            problem: "Find the count of physicians per medical specialty",
            index: "practitionerRole_idx",
            request: Request::Aggregate {
                query: "*",
                stages: vec![count_by("@specialty", "count")],
            },
        },
        Scenario {
            title: "MedicationRequest Scenario 1",
            problem: "Find 3 medications currently prescribed for bronchitis",
            index: "medicationRequest_idx",
            request: search(
                "(@status:{active} @reason:%bronchitis%)",
                &["$.medicationCodeableConcept.text"],
                3,
            ),
        },
        Scenario {
            title: "MedicationRequest Scenario 2",
            problem: "Find the top 3 physicians by opioid prescription count",
            index: "medicationRequest_idx",
            request: Request::Aggregate {
                query: OPIOIDS,
                stages: vec![
                    count_by("@prescriber", "opioids_prescribed"),
                    Stage::sort_by("@opioids_prescribed", SortDirection::Desc),
                    Stage::limit(0, 3),
                ],
            },
        },
        Scenario {
            title: "Immunization Scenario 1",
            problem: "Find 5 patients immunized at an urgent care clinic in 2015",
            index: "immunization_idx",
            request: search("@location:urgent @date:2015*", &["$.patient.reference"], 5),
        },
        Scenario {
            title: "Immunization Scenario 2",
            problem: "Find the top 5 vaccines administered in 2020",
            index: "immunization_idx",
            request: Request::Aggregate {
                query: "@date:2020*",
                stages: vec![
                    count_by("@vax", "num_vax"),
                    Stage::sort_by("@num_vax", SortDirection::Desc),
                    Stage::limit(0, 5),
                ],
            },
        },
        Scenario {
            title: "Condition Scenario 1",
            problem: "Find 3 patients with active cases of rhinitis or asthma",
            index: "condition_idx",
            request: search(
                "@code:{active} @problem:(rhinitis|asthma)",
                &["$.subject.reference"],
                3,
            ),
        },
        Scenario {
            title: "Condition Scenario 2",
            problem: "Find the count of reported medical conditions by year",
            index: "condition_idx",
            request: Request::Aggregate {
                query: "*",
                stages: vec![
                    Stage::load(["@date"]),
                    Stage::apply("substr(@date,0,4)", "year"),
                    count_by("@year", "num_conditions"),
                    Stage::sort_by("@year", SortDirection::Desc),
                    Stage::limit(0, 5),
                ],
            },
        },
        Scenario {
            title: "Claims Scenario 1",
            problem: "Find 3 active Aetna claims valued at $1000 or more",
            index: "claims_idx",
            request: search(
                "@insurer:Aetna @value:[1000,+inf] @status:{active}",
                &["$.item[0].productOrService.text"],
                3,
            ),
        },
        Scenario {
            title: "Claims Scenario 2",
            problem: "Find the top insurers by claim value",
            index: "claims_idx",
            request: Request::Aggregate {
                query: "@status:{active}",
                stages: vec![
                    Stage::group_by(["@insurer"], vec![Reducer::sum("@value", "total_value")]),
                    Stage::filter("@total_value > 0"),
                    Stage::sort_by("@total_value", SortDirection::Desc),
                    Stage::limit(0, 5),
                ],
            },
        },
    ]
}

impl Scenario {
    /// Runs the scenario and renders its result as JSON
    pub fn run(&self, engine: &SearchEngine) -> Result<ScenarioOutcome> {
        let result = match &self.request {
            Request::Search { query, options } => {
                let found = engine.search(self.index, query, options)?;
                serde_json::to_value(&found.documents)
            }
            Request::Aggregate { query, stages } => {
                let output = engine.aggregate(self.index, query, stages)?;
                serde_json::to_value(&output.rows)
            }
        };
        let result = result.map_err(|e| Error::io(format!("rendering {}", self.title), e.into()))?;
        Ok(ScenarioOutcome {
            title: self.title,
            problem: self.problem,
            result,
        })
    }
}

/// Runs every scenario in order, stopping at the first failure
pub fn run_scenarios(engine: &SearchEngine) -> Result<Vec<ScenarioOutcome>> {
    scenarios().iter().map(|s| s.run(engine)).collect()
}
