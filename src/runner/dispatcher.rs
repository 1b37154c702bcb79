//! Replay dispatcher.
//!
//! Walks the parsed action list in ascending-id order, resolves the driver
//! controller and the recorded element for each action, and applies the
//! optional/mandatory failure policy. One dispatcher drives exactly one
//! run; `run` consumes it, so a finished dispatcher cannot be restarted.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;
use uuid::Uuid;

use super::state::{ActionFailure, RunResult, RunStatus};
use crate::driver::finder::{self, LocateError};
use crate::driver::traits::{DriverController, LiveElement, ResolvedTarget, SessionError};
use crate::parser::types::{ActionInfo, TestScript};

/// Per-action dispatch failure. Recoverable when the action is optional.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("element not found: {0}")]
    ElementNotFound(String),
    #[error("unsupported action type `{0}`")]
    UnsupportedActionType(String),
    #[error("driver command failed: {0}")]
    DriverCommandFailure(String),
}

impl From<LocateError> for DispatchError {
    fn from(err: LocateError) -> Self {
        match err {
            LocateError::NotFound => DispatchError::ElementNotFound(err.to_string()),
            LocateError::Session(e) => DispatchError::DriverCommandFailure(e.to_string()),
        }
    }
}

impl From<SessionError> for DispatchError {
    fn from(err: SessionError) -> Self {
        DispatchError::DriverCommandFailure(err.to_string())
    }
}

pub struct ReplayDispatcher<'a> {
    script: &'a TestScript,
    controllers: &'a HashMap<String, Box<dyn DriverController>>,
    status: RunStatus,
}

impl<'a> ReplayDispatcher<'a> {
    pub fn new(
        script: &'a TestScript,
        controllers: &'a HashMap<String, Box<dyn DriverController>>,
    ) -> Self {
        Self {
            script,
            controllers,
            status: RunStatus::Ready,
        }
    }

    /// Run the whole sequence to completion or abort.
    ///
    /// The optional deadline covers the entire run; when it expires the
    /// in-flight action is cancelled at its next await point and the run
    /// aborts with a deadline failure.
    pub async fn run(mut self, deadline: Option<Duration>) -> RunResult {
        let run_id = Uuid::new_v4().to_string();
        let started_at = chrono::Utc::now().to_rfc3339();
        let start = Instant::now();
        let deadline_at = deadline.map(|d| start + d);

        self.status = RunStatus::Running;
        let mut executed = 0u32;
        let mut optional_failures = Vec::new();
        let mut failure = None;

        for action in &self.script.actions {
            let outcome = self.dispatch_within_deadline(action, deadline_at).await;
            match outcome {
                Ok(()) => executed += 1,
                Err(err) => {
                    let record = self.failure_record(action, &err);
                    if action.is_optional {
                        log::warn!(
                            "optional action {} failed, continuing: {err}",
                            action.id
                        );
                        optional_failures.push(record);
                    } else {
                        log::error!("action {} failed, aborting run: {err}", action.id);
                        self.status = RunStatus::Aborted;
                        failure = Some(record);
                        break;
                    }
                }
            }
        }

        if self.status != RunStatus::Aborted {
            self.status = RunStatus::Done;
        }

        RunResult {
            run_id,
            status: self.status,
            executed,
            failure,
            optional_failures,
            started_at,
            finished_at: chrono::Utc::now().to_rfc3339(),
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    async fn dispatch_within_deadline(
        &self,
        action: &ActionInfo,
        deadline_at: Option<Instant>,
    ) -> Result<(), DispatchError> {
        let Some(deadline_at) = deadline_at else {
            return self.dispatch(action).await;
        };
        let Some(remaining) = deadline_at.checked_duration_since(Instant::now()) else {
            return Err(DispatchError::DriverCommandFailure(
                "run deadline exceeded".to_string(),
            ));
        };
        match tokio::time::timeout(remaining, self.dispatch(action)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(DispatchError::DriverCommandFailure(
                "run deadline exceeded".to_string(),
            )),
        }
    }

    async fn dispatch(&self, action: &ActionInfo) -> Result<(), DispatchError> {
        // The parser validated every driver id, so a miss here means a
        // controller was never supplied for the session.
        let controller = self.controllers.get(&action.driver_id).ok_or_else(|| {
            DispatchError::DriverCommandFailure(format!(
                "no live controller for driver `{}`",
                action.driver_id
            ))
        })?;

        let target = if action.descriptor.is_none() {
            None
        } else {
            Some(finder::locate(controller.session(), &action.descriptor).await?)
        };

        let args = &action.arguments;
        match action.action_type.as_str() {
            "tap" => {
                let (x, y) = point_args(args, target.as_ref())?;
                controller.tap(x, y).await?;
            }
            "dragAndDrop" => {
                let from_x = int_arg(args, "fromX")?;
                let from_y = int_arg(args, "fromY")?;
                let to_x = int_arg(args, "toX")?;
                let to_y = int_arg(args, "toY")?;
                controller.drag_and_drop(from_x, from_y, to_x, to_y).await?;
            }
            "input" => {
                let element = element_target(target)?;
                let text = str_arg(args, "content")?;
                controller.input(&element, &text).await?;
            }
            "paste" => {
                let element = element_target(target)?;
                controller.paste(&element).await?;
            }
            "setClipboard" => {
                let text = str_arg(args, "text")?;
                controller.set_clipboard(&text).await?;
            }
            "getPageSource" => {
                let source = controller.get_page_source().await?;
                log::debug!(
                    "page source for driver `{}` ({} bytes)",
                    action.driver_id,
                    source.len()
                );
            }
            "execCommandOnDevice" => {
                let line = str_arg(args, "command")?;
                controller.exec_command(&line).await?;
            }
            other => return Err(DispatchError::UnsupportedActionType(other.to_string())),
        }
        Ok(())
    }

    fn failure_record(&self, action: &ActionInfo, err: &DispatchError) -> ActionFailure {
        ActionFailure {
            action_id: action.id,
            driver_id: action.driver_id.clone(),
            platform: self.script.driver(&action.driver_id).map(|d| d.platform),
            reason: err.to_string(),
        }
    }
}

fn int_arg(args: &Map<String, Value>, key: &str) -> Result<i32, DispatchError> {
    let value = args.get(key);
    // The recorder is loose about scalar types: numbers may arrive as
    // JSON numbers or as strings.
    let parsed = match value {
        Some(Value::Number(n)) => n.as_i64().map(|v| v as i32),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        DispatchError::DriverCommandFailure(format!("missing or invalid `{key}` argument"))
    })
}

fn str_arg(args: &Map<String, Value>, key: &str) -> Result<String, DispatchError> {
    match args.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        _ => Err(DispatchError::DriverCommandFailure(format!(
            "missing or invalid `{key}` argument"
        ))),
    }
}

/// Tap coordinates come from the arguments when recorded, otherwise from
/// a coordinate-resolved target.
fn point_args(
    args: &Map<String, Value>,
    target: Option<&ResolvedTarget>,
) -> Result<(i32, i32), DispatchError> {
    if let (Ok(x), Ok(y)) = (int_arg(args, "x"), int_arg(args, "y")) {
        return Ok((x, y));
    }
    if let Some(ResolvedTarget::Point { x, y }) = target {
        return Ok((*x, *y));
    }
    Err(DispatchError::DriverCommandFailure(
        "tap requires x/y arguments or a coordinate target".to_string(),
    ))
}

fn element_target(target: Option<ResolvedTarget>) -> Result<LiveElement, DispatchError> {
    match target {
        Some(ResolvedTarget::Element(element)) => Ok(element),
        Some(ResolvedTarget::Point { .. }) => Err(DispatchError::DriverCommandFailure(
            "a coordinate target cannot receive text input".to_string(),
        )),
        None => Err(DispatchError::DriverCommandFailure(
            "action requires a recorded element".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::controller_for;
    use crate::driver::mock::MockSession;
    use crate::driver::traits::{AutomationSession, NoopTelemetry, TelemetryHook};
    use crate::parser::parse_script;
    use std::sync::Arc;

    fn windows_script(cases: &str) -> TestScript {
        parse_script(&format!(
            r#"{{
                "drivers": [{{"id": "d1", "platform": "windows", "init": {{}}}}],
                "cases": [{cases}]
            }}"#
        ))
        .unwrap()
    }

    fn controllers_for(
        script: &TestScript,
        session: Arc<MockSession>,
    ) -> HashMap<String, Box<dyn DriverController>> {
        let telemetry: Arc<dyn TelemetryHook> = Arc::new(NoopTelemetry);
        let mut controllers = HashMap::new();
        for driver in &script.drivers {
            let session: Arc<dyn AutomationSession> = session.clone();
            if let Some(c) = controller_for(driver, session, telemetry.clone()) {
                controllers.insert(driver.id.clone(), c);
            }
        }
        controllers
    }

    #[tokio::test]
    async fn end_to_end_tap_reaches_the_controller_once() {
        let script = windows_script(
            r#"{"index": 1, "driverId": "d1",
                "action": {"actionType": "tap", "arguments": {"x": 10, "y": 20}}}"#,
        );
        let session = Arc::new(MockSession::new());
        let controllers = controllers_for(&script, session.clone());

        let result = ReplayDispatcher::new(&script, &controllers).run(None).await;

        assert_eq!(result.status, RunStatus::Done);
        assert_eq!(result.executed, 1);
        assert_eq!(session.calls(), vec!["pointer:touch:3"]);
    }

    #[tokio::test]
    async fn optional_failure_is_skipped_and_the_run_completes() {
        let script = windows_script(
            r#"{"index": 1, "driverId": "d1", "isOption": true,
                "action": {"actionType": "unsupportedOp", "arguments": {}}},
               {"index": 2, "driverId": "d1",
                "action": {"actionType": "tap", "arguments": {"x": 1, "y": 2}}}"#,
        );
        let session = Arc::new(MockSession::new());
        let controllers = controllers_for(&script, session.clone());

        let result = ReplayDispatcher::new(&script, &controllers).run(None).await;

        assert_eq!(result.status, RunStatus::Done);
        assert_eq!(result.executed, 1);
        assert_eq!(result.optional_failures.len(), 1);
        assert_eq!(result.optional_failures[0].action_id, 1);
        assert_eq!(session.calls(), vec!["pointer:touch:3"]);
    }

    #[tokio::test]
    async fn mandatory_failure_aborts_before_later_actions() {
        let script = windows_script(
            r#"{"index": 1, "driverId": "d1",
                "action": {"actionType": "unsupportedOp", "arguments": {}}},
               {"index": 2, "driverId": "d1",
                "action": {"actionType": "tap", "arguments": {"x": 1, "y": 2}}}"#,
        );
        let session = Arc::new(MockSession::new());
        let controllers = controllers_for(&script, session.clone());

        let result = ReplayDispatcher::new(&script, &controllers).run(None).await;

        assert_eq!(result.status, RunStatus::Aborted);
        assert_eq!(result.executed, 0);
        let failure = result.failure.unwrap();
        assert_eq!(failure.action_id, 1);
        assert_eq!(failure.driver_id, "d1");
        assert_eq!(failure.platform, Some(crate::parser::Platform::Windows));
        assert!(failure.reason.contains("unsupportedOp"));
        // Action 2 never dispatched.
        assert!(session.calls().is_empty());
    }

    #[tokio::test]
    async fn element_not_found_follows_the_same_policy() {
        let script = windows_script(
            r#"{"index": 1, "driverId": "d1",
                "elementInfo": {"accessibilityId": "Missing"},
                "action": {"actionType": "input", "arguments": {"content": "hi"}}}"#,
        );
        let session = Arc::new(MockSession::new());
        let controllers = controllers_for(&script, session.clone());

        let result = ReplayDispatcher::new(&script, &controllers).run(None).await;

        assert_eq!(result.status, RunStatus::Aborted);
        assert!(result
            .failure
            .unwrap()
            .reason
            .contains("element not found"));
    }

    #[tokio::test]
    async fn input_dispatches_to_the_resolved_element() {
        let script = windows_script(
            r#"{"index": 1, "driverId": "d1",
                "elementInfo": {"accessibilityId": "UserField"},
                "action": {"actionType": "input", "arguments": {"content": "alice"}}}"#,
        );
        let session = Arc::new(
            MockSession::new().with_element(
                crate::driver::traits::LocatorStrategy::AccessibilityId,
                "UserField",
                "el-1",
            ),
        );
        let controllers = controllers_for(&script, session.clone());

        let result = ReplayDispatcher::new(&script, &controllers).run(None).await;

        assert_eq!(result.status, RunStatus::Done);
        assert_eq!(
            session.calls(),
            vec![
                "findElement:accessibility id:UserField",
                "click:el-1",
                "sendKeys:el-1:alice",
            ]
        );
    }

    #[tokio::test]
    async fn missing_controller_is_a_fatal_defensive_failure() {
        let script = parse_script(
            r#"{
                "drivers": [{"id": "d_ios", "platform": "ios", "init": {}}],
                "cases": [{"index": 1, "driverId": "d_ios",
                           "action": {"actionType": "tap", "arguments": {"x": 1, "y": 1}}}]
            }"#,
        )
        .unwrap();
        let session = Arc::new(MockSession::new());
        // controller_for yields nothing for ios, so the map stays empty.
        let controllers = controllers_for(&script, session);

        let result = ReplayDispatcher::new(&script, &controllers).run(None).await;

        assert_eq!(result.status, RunStatus::Aborted);
        assert!(result.failure.unwrap().reason.contains("no live controller"));
    }

    #[tokio::test]
    async fn deadline_aborts_a_stalled_run() {
        let script = windows_script(
            r#"{"index": 1, "driverId": "d1",
                "action": {"actionType": "tap", "arguments": {"x": 1, "y": 2}}}"#,
        );
        let session = Arc::new(MockSession::new().with_stall_ms(200));
        let controllers = controllers_for(&script, session);

        let result = ReplayDispatcher::new(&script, &controllers)
            .run(Some(Duration::from_millis(20)))
            .await;

        assert_eq!(result.status, RunStatus::Aborted);
        assert!(result.failure.unwrap().reason.contains("deadline"));
    }

    #[tokio::test]
    async fn string_encoded_coordinates_are_accepted() {
        let script = windows_script(
            r#"{"index": 1, "driverId": "d1",
                "action": {"actionType": "dragAndDrop",
                           "arguments": {"fromX": "0", "fromY": "0", "toX": "50", "toY": "80"}}}"#,
        );
        let session = Arc::new(MockSession::new());
        let controllers = controllers_for(&script, session.clone());

        let result = ReplayDispatcher::new(&script, &controllers).run(None).await;

        assert_eq!(result.status, RunStatus::Done);
        assert_eq!(session.calls(), vec!["pointer:pen:5"]);
    }
}
