use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Target platform of a recorded driver session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
    Windows,
    Ios,
    Web,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Android => "android",
            Platform::Windows => "windows",
            Platform::Ios => "ios",
            Platform::Web => "web",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One addressable live automation target referenced by id.
///
/// Built once per script load from the script's `drivers` section and
/// immutable for the lifetime of the run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DriverSession {
    pub id: String,
    pub platform: Platform,
    pub launcher_app: String,
    pub init_url: String,
}

/// Android element snapshot as captured by the recorder.
///
/// Every field is a search criterion, not a live handle; an empty string
/// means the recorder did not capture that attribute and it must not be
/// used for lookup. The flag attributes arrive as loosely-typed strings
/// ("true"/"false") on the wire and are kept that way.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct AndroidElement {
    #[serde(rename = "resource-id")]
    pub resource_id: String,
    pub package: String,
    #[serde(rename = "class")]
    pub class_name: String,
    pub text: String,
    #[serde(rename = "content-desc")]
    pub content_desc: String,
    pub checkable: String,
    pub checked: String,
    pub clickable: String,
    pub enabled: String,
    pub focusable: String,
    pub focused: String,
    #[serde(rename = "long-clickable")]
    pub long_clickable: String,
    pub password: String,
    pub scrollable: String,
    pub selected: String,
    pub bounds: String,
    #[serde(rename = "display")]
    pub displayed: String,
    pub xpath: String,
    pub top: Option<i32>,
    pub left: Option<i32>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub center_x: Option<i32>,
    pub center_y: Option<i32>,
}

/// Windows element snapshot as captured by the recorder.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct WindowsElement {
    pub accessibility_id: String,
    pub xpath: String,
    pub text: String,
}

/// Platform-shaped search criteria for one recorded UI element.
///
/// The variant is decided by the owning driver's platform at parse time,
/// never by sniffing the payload shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub enum ElementDescriptor {
    Android(AndroidElement),
    Windows(WindowsElement),
    #[default]
    None,
}

impl ElementDescriptor {
    pub fn is_none(&self) -> bool {
        matches!(self, ElementDescriptor::None)
    }
}

/// One ordered, identified step in a replay script.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActionInfo {
    pub id: i32,
    pub driver_id: String,
    pub descriptor: ElementDescriptor,
    pub action_type: String,
    pub arguments: Map<String, Value>,
    pub is_optional: bool,
}

/// A fully parsed script: the driver registry plus the replay order.
///
/// Owned by whoever loaded the script; the dispatcher only borrows it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestScript {
    pub drivers: Vec<DriverSession>,
    /// Strictly ascending by `ActionInfo::id`; the parser guarantees it.
    pub actions: Vec<ActionInfo>,
}

impl TestScript {
    /// Look up a driver session by id.
    pub fn driver(&self, id: &str) -> Option<&DriverSession> {
        self.drivers.iter().find(|d| d.id == id)
    }
}
