pub mod json;
pub mod types;

pub use json::{parse_script, parse_script_file, ParseError, ScriptParser};
pub use types::{
    ActionInfo, AndroidElement, DriverSession, ElementDescriptor, Platform, TestScript,
    WindowsElement,
};
