//! Offline rule evaluation.

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use discount_sync_core::{Condition, EvaluationContext, rules};

use super::{CliError, print_json};

#[derive(Debug, Serialize)]
struct EvaluateOutput {
    eligible: bool,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let raw = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| CliError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Evaluate the conditions in `conditions` against the context in `context`.
pub fn run(conditions: &Path, context: &Path) -> Result<(), CliError> {
    let conditions: Vec<Condition> = read_json(conditions)?;
    let context: EvaluationContext = read_json(context)?;

    let eligible = rules::evaluate(&conditions, &context)?;
    print_json(&EvaluateOutput { eligible })
}
