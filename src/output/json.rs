//! JSON lines: one object per target.

use machinae_lookup::{ResultSet, SiteOutcome};
use serde_json::{json, Map, Value};

use crate::error::{MachinaeError, Result};

/// Findings are grouped by label; unlabelled values go under `"value"`.
const UNLABELLED: &str = "value";

pub(super) fn render(set: &ResultSet) -> Result<String> {
    let mut line =
        serde_json::to_string(&record(set)).map_err(|e| MachinaeError::Output(e.to_string()))?;
    line.push('\n');
    Ok(line)
}

/// The JSON object for one target.
pub fn record(set: &ResultSet) -> Value {
    let info = &set.target_info;
    let sites: Vec<Value> = set.entries.iter().map(site).collect();
    json!({
        "observable": info.target,
        "observable_type": info.otype,
        "observable_type_detected": info.otype_detected,
        "sites": sites,
    })
}

fn site(entry: &SiteOutcome) -> Value {
    let descriptor = entry.descriptor();
    match entry {
        SiteOutcome::Error(error) => json!({
            "site": descriptor.display_name(),
            "error": error.error.to_string(),
        }),
        SiteOutcome::Results(found) => {
            let mut results = Map::new();
            for finding in &found.results {
                let label = finding.pretty_name.as_deref().unwrap_or(UNLABELLED);
                if let Value::Array(values) = results
                    .entry(label)
                    .or_insert_with(|| Value::Array(Vec::new()))
                {
                    values.push(Value::String(finding.value.clone()));
                }
            }
            json!({
                "site": descriptor.display_name(),
                "results": results,
            })
        }
    }
}
