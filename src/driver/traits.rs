//! Platform seams: the live-session handle and the controller capability set.

use async_trait::async_trait;
use thiserror::Error;

use crate::parser::types::Platform;

/// Failure reported by the underlying automation session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("automation protocol error: {0}")]
    Protocol(String),
    #[error("operation `{0}` is not supported by this session")]
    Unsupported(String),
}

/// Lookup strategy understood by a live session.
///
/// Session implementations translate these to whatever the wire protocol
/// calls them; the names here follow the recorded criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocatorStrategy {
    AccessibilityId,
    ResourceId,
    Xpath,
    Text,
    ContentDescription,
}

impl LocatorStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocatorStrategy::AccessibilityId => "accessibility id",
            LocatorStrategy::ResourceId => "id",
            LocatorStrategy::Xpath => "xpath",
            LocatorStrategy::Text => "text",
            LocatorStrategy::ContentDescription => "content-desc",
        }
    }
}

/// Opaque handle to an element in the live UI tree, valid only for the
/// session that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveElement {
    pub element_id: String,
}

/// Outcome of descriptor resolution.
///
/// A coordinate target (Android geometric fallback) satisfies tap and drag
/// but cannot receive text input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedTarget {
    Element(LiveElement),
    Point { x: i32, y: i32 },
}

/// Pointer device kind for synthesized gestures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Touch,
    Mouse,
    Pen,
}

impl PointerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PointerKind::Touch => "touch",
            PointerKind::Mouse => "mouse",
            PointerKind::Pen => "pen",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerAction {
    Move { duration_ms: u64, x: i32, y: i32 },
    Down,
    Up,
}

/// One press-move-release gesture performed with a single pointer device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerSequence {
    pub kind: PointerKind,
    pub actions: Vec<PointerAction>,
}

impl PointerSequence {
    pub fn new(kind: PointerKind) -> Self {
        Self {
            kind,
            actions: Vec::new(),
        }
    }

    pub fn move_to(mut self, duration_ms: u64, x: i32, y: i32) -> Self {
        self.actions.push(PointerAction::Move { duration_ms, x, y });
        self
    }

    pub fn down(mut self) -> Self {
        self.actions.push(PointerAction::Down);
        self
    }

    pub fn up(mut self) -> Self {
        self.actions.push(PointerAction::Up);
        self
    }
}

/// Externally established live automation session.
///
/// This crate never opens or closes the underlying connection; it only
/// issues operations against the handle and drops the reference when the
/// run finishes or is cancelled.
#[async_trait]
pub trait AutomationSession: Send + Sync {
    /// Find one element, `None` when the strategy matches nothing.
    async fn find_element(
        &self,
        strategy: LocatorStrategy,
        value: &str,
    ) -> Result<Option<LiveElement>, SessionError>;

    async fn click(&self, element: &LiveElement) -> Result<(), SessionError>;

    async fn send_keys(&self, element: &LiveElement, text: &str) -> Result<(), SessionError>;

    async fn perform_pointer(&self, sequence: PointerSequence) -> Result<(), SessionError>;

    async fn page_source(&self) -> Result<String, SessionError>;

    async fn set_clipboard(&self, text: &str) -> Result<(), SessionError>;

    async fn get_clipboard(&self) -> Result<String, SessionError>;

    /// Run a shell line on the device. Only some platforms have a shell.
    async fn exec_shell(&self, _command: &str) -> Result<String, SessionError> {
        Err(SessionError::Unsupported("exec_shell".to_string()))
    }
}

/// Optional fire-and-forget inspection hook invoked around selected
/// controller operations. Control flow never depends on its result.
pub trait TelemetryHook: Send + Sync {
    fn inspect(&self, _target: &str, _description: &str) {}
}

/// Default hook: does nothing.
pub struct NoopTelemetry;

impl TelemetryHook for NoopTelemetry {}

/// Uniform capability set over one live automation session.
///
/// Implementations translate each capability into the primitives the
/// underlying session supports; platform quirks live behind this trait.
#[async_trait]
pub trait DriverController: Send + Sync {
    fn platform(&self) -> Platform;

    /// The session handle, exposed for element resolution.
    fn session(&self) -> &dyn AutomationSession;

    /// Tap at viewport coordinates.
    async fn tap(&self, x: i32, y: i32) -> Result<(), SessionError>;

    /// Press at the origin, move to the destination, release.
    async fn drag_and_drop(
        &self,
        from_x: i32,
        from_y: i32,
        to_x: i32,
        to_y: i32,
    ) -> Result<(), SessionError>;

    /// Focus the element and type the text.
    async fn input(&self, element: &LiveElement, text: &str) -> Result<(), SessionError>;

    /// Read the clipboard and type its content into the element.
    async fn paste(&self, element: &LiveElement) -> Result<(), SessionError>;

    async fn set_clipboard(&self, text: &str) -> Result<(), SessionError>;

    async fn get_page_source(&self) -> Result<String, SessionError>;

    /// Run a rule-expanded shell line on the device.
    async fn exec_command(&self, _line: &str) -> Result<String, SessionError> {
        Err(SessionError::Unsupported("exec_command".to_string()))
    }
}
