//! Recorded-script parser.
//!
//! Decodes the JSON document produced by the interaction recorder into a
//! [`TestScript`]: the driver registry plus the ordered action list. The
//! drivers section is always decoded first because a case's element payload
//! can only be shaped once its driver's platform is known.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use super::types::{
    ActionInfo, AndroidElement, DriverSession, ElementDescriptor, Platform, TestScript,
    WindowsElement,
};

/// Fatal script-load failure. No partial script is ever returned.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed script document: {0}")]
    MalformedDocument(String),
    #[error("duplicate action id {0} in cases section")]
    DuplicateId(i32),
    #[error("case {index} references unknown driver id `{driver_id}`")]
    UnknownDriver { index: i32, driver_id: String },
}

#[derive(Deserialize)]
struct RawDocument {
    #[serde(default)]
    drivers: Vec<RawDriver>,
    #[serde(default)]
    cases: Vec<RawCase>,
}

#[derive(Deserialize)]
struct RawDriver {
    id: String,
    platform: Platform,
    #[serde(default)]
    init: RawInit,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawInit {
    #[serde(default)]
    launcher_app: Option<String>,
    #[serde(default)]
    init_url: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCase {
    index: i32,
    driver_id: String,
    #[serde(default)]
    element_info: Option<Value>,
    #[serde(default)]
    action: Option<RawAction>,
    #[serde(default, rename = "isOption")]
    is_option: bool,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawAction {
    #[serde(default)]
    action_type: String,
    #[serde(default)]
    arguments: Map<String, Value>,
}

/// Parser for one script load.
///
/// The driver-id table is parser-local state, built by the drivers pass and
/// consumed by the cases pass; nothing here outlives the call.
pub struct ScriptParser {
    driver_platforms: HashMap<String, Platform>,
}

impl ScriptParser {
    pub fn new() -> Self {
        Self {
            driver_platforms: HashMap::new(),
        }
    }

    /// Parse a script document. Atomic: any failure returns no script.
    pub fn parse(mut self, json: &str) -> Result<TestScript, ParseError> {
        let doc: RawDocument =
            serde_json::from_str(json).map_err(|e| ParseError::MalformedDocument(e.to_string()))?;

        // Drivers first: the platform table must be total before any case
        // is decoded.
        let drivers = self.decode_drivers(doc.drivers);
        let actions = self.decode_cases(doc.cases)?;

        Ok(TestScript { drivers, actions })
    }

    fn decode_drivers(&mut self, raw: Vec<RawDriver>) -> Vec<DriverSession> {
        let mut drivers = Vec::with_capacity(raw.len());
        for d in raw {
            log::debug!("driver `{}` on platform {}", d.id, d.platform);
            self.driver_platforms.insert(d.id.clone(), d.platform);
            drivers.push(DriverSession {
                id: d.id,
                platform: d.platform,
                launcher_app: d.init.launcher_app.unwrap_or_default(),
                init_url: d.init.init_url.unwrap_or_default(),
            });
        }
        drivers
    }

    fn decode_cases(&self, raw: Vec<RawCase>) -> Result<Vec<ActionInfo>, ParseError> {
        let mut actions = Vec::with_capacity(raw.len());
        for case in raw {
            let platform = *self.driver_platforms.get(&case.driver_id).ok_or_else(|| {
                ParseError::UnknownDriver {
                    index: case.index,
                    driver_id: case.driver_id.clone(),
                }
            })?;

            let descriptor = decode_descriptor(platform, case.element_info)?;
            let action = case.action.unwrap_or_default();
            log::debug!(
                "case {}: {} on driver `{}`",
                case.index,
                action.action_type,
                case.driver_id
            );

            actions.push(ActionInfo {
                id: case.index,
                driver_id: case.driver_id,
                descriptor,
                action_type: action.action_type,
                arguments: action.arguments,
                is_optional: case.is_option,
            });
        }

        // Replay order is ascending id regardless of document order, and
        // equal ids are never a valid ordering outcome.
        actions.sort_by_key(|a| a.id);
        if let Some(w) = actions.windows(2).find(|w| w[0].id == w[1].id) {
            return Err(ParseError::DuplicateId(w[0].id));
        }

        Ok(actions)
    }
}

impl Default for ScriptParser {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_descriptor(
    platform: Platform,
    element_info: Option<Value>,
) -> Result<ElementDescriptor, ParseError> {
    let value = match element_info {
        Some(v) if !is_empty_payload(&v) => v,
        _ => return Ok(ElementDescriptor::None),
    };

    match platform {
        Platform::Android => {
            let el: AndroidElement = serde_json::from_value(value)
                .map_err(|e| ParseError::MalformedDocument(format!("android elementInfo: {e}")))?;
            Ok(ElementDescriptor::Android(el))
        }
        Platform::Windows => {
            let el: WindowsElement = serde_json::from_value(value)
                .map_err(|e| ParseError::MalformedDocument(format!("windows elementInfo: {e}")))?;
            Ok(ElementDescriptor::Windows(el))
        }
        // No descriptor shape is recorded for these platforms.
        Platform::Ios | Platform::Web => Ok(ElementDescriptor::None),
    }
}

fn is_empty_payload(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Parse a script document from a string.
pub fn parse_script(json: &str) -> Result<TestScript, ParseError> {
    ScriptParser::new().parse(json)
}

/// Parse a script document from a file.
pub fn parse_script_file(path: &Path) -> Result<TestScript> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script file: {}", path.display()))?;
    parse_script(&content).with_context(|| format!("Failed to parse script: {}", path.display()))
}
