use thiserror::Error;

use crate::sample::SampleField;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RiskError {
    #[error("Invalid hazard type: {0}")]
    InvalidHazardType(String),

    #[error("Incomplete sample: missing {}", join_fields(.missing))]
    IncompleteSample { missing: Vec<SampleField> },
}

fn join_fields(fields: &[SampleField]) -> String {
    fields
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
