use std::collections::BTreeMap;

use ic_core::{ArtifactLocation, Error, Result};
use serde_json::Value;

use crate::artifact;

/// Highest class count an indexed labels file may describe.
pub const MAX_CLASSES: usize = 100_000;

pub async fn load(location: &ArtifactLocation) -> Result<Vec<String>> {
    let bytes = artifact::fetch(location).await?;
    parse(&bytes)
}

/// Accepts one label per line, a JSON array, or a JSON object keyed by class index.
pub fn parse(bytes: &[u8]) -> Result<Vec<String>> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| Error::ModelLoad(format!("labels are not UTF-8: {}", e)))?;
    let trimmed = text.trim_start();

    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        return match serde_json::from_str::<Value>(trimmed)? {
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(label) => Ok(label),
                    other => Err(Error::ModelLoad(format!("label is not a string: {}", other))),
                })
                .collect(),
            Value::Object(entries) => from_indexed(entries),
            other => Err(Error::ModelLoad(format!("unexpected labels document: {}", other))),
        };
    }

    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

fn from_indexed(entries: serde_json::Map<String, Value>) -> Result<Vec<String>> {
    let mut indexed = BTreeMap::new();
    for (key, value) in entries {
        let index: usize = key
            .parse()
            .map_err(|_| Error::ModelLoad(format!("label key is not an index: {}", key)))?;
        if index >= MAX_CLASSES {
            return Err(Error::ModelLoad(format!(
                "label index {} exceeds the {} class limit",
                index, MAX_CLASSES
            )));
        }
        let label = value
            .as_str()
            .ok_or_else(|| Error::ModelLoad(format!("label {} is not a string", index)))?;
        indexed.insert(index, label.to_string());
    }

    let len = match indexed.keys().next_back() {
        Some(last) => last
            .checked_add(1)
            .ok_or_else(|| Error::ModelLoad(format!("label index {} is out of range", last)))?,
        None => 0,
    };
    Ok((0..len)
        .map(|index| indexed.remove(&index).unwrap_or_else(|| fallback_label(index)))
        .collect())
}

pub fn label_for(class_names: &[String], index: usize) -> String {
    class_names
        .get(index)
        .cloned()
        .unwrap_or_else(|| fallback_label(index))
}

fn fallback_label(index: usize) -> String {
    format!("class {}", index)
}
