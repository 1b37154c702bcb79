pub mod dispatcher;
pub mod state;

use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub use dispatcher::{DispatchError, ReplayDispatcher};
pub use state::{ActionFailure, RunResult, RunStatus};

use crate::driver::controller_for;
use crate::driver::traits::{AutomationSession, DriverController, TelemetryHook};
use crate::parser::types::TestScript;
use crate::rules::{DeviceAction, PhaseMap, RuleSet};

/// Phase tag executed before the recorded sequence.
pub const PHASE_SET_UP: &str = "setUp";
/// Phase tag executed after the recorded sequence, even on abort.
pub const PHASE_TEAR_DOWN: &str = "tearDown";

/// One replayable unit of work: a parsed script plus the device actions
/// its suite's rules expanded into.
pub struct TestTask {
    pub suite_name: String,
    pub script: TestScript,
    pub device_actions: PhaseMap,
}

impl TestTask {
    pub fn new(suite_name: &str, script: TestScript) -> Self {
        Self {
            suite_name: suite_name.to_string(),
            script,
            device_actions: PhaseMap::new(),
        }
    }

    /// Merge the rule expansion for this task's suite into its phase map.
    pub fn load_commands(&mut self, rules: &RuleSet) {
        rules.expand(&self.suite_name, &mut self.device_actions);
    }
}

#[derive(Default)]
pub struct RunOptions {
    /// Deadline over the whole run, including phase actions.
    pub deadline: Option<Duration>,
}

/// Build one controller per driver session from externally supplied
/// session handles. Drivers without a session or without a controller
/// backend are skipped with a warning; dispatch reports them per action.
pub fn build_controllers(
    script: &TestScript,
    mut sessions: HashMap<String, Arc<dyn AutomationSession>>,
    telemetry: Arc<dyn TelemetryHook>,
) -> HashMap<String, Box<dyn DriverController>> {
    let mut controllers = HashMap::new();
    for driver in &script.drivers {
        let Some(session) = sessions.remove(&driver.id) else {
            log::warn!("no session supplied for driver `{}`", driver.id);
            continue;
        };
        match controller_for(driver, session, telemetry.clone()) {
            Some(controller) => {
                controllers.insert(driver.id.clone(), controller);
            }
            None => log::warn!(
                "no controller backend for platform {} (driver `{}`)",
                driver.platform,
                driver.id
            ),
        }
    }
    controllers
}

/// Run one task to completion or abort.
///
/// Strictly sequential: each action blocks until the session call returns.
/// Set-up phase actions run first, the recorded sequence second, and
/// tear-down actions last regardless of the outcome.
pub async fn run_task(
    task: &TestTask,
    controllers: &HashMap<String, Box<dyn DriverController>>,
    options: RunOptions,
) -> RunResult {
    run_device_actions(controllers, task.device_actions.get(PHASE_SET_UP)).await;

    let result = ReplayDispatcher::new(&task.script, controllers)
        .run(options.deadline)
        .await;

    run_device_actions(controllers, task.device_actions.get(PHASE_TEAR_DOWN)).await;
    result
}

/// Blocking facade for callers outside a runtime (the worker pool owns
/// its threads, not a reactor).
pub fn run_task_blocking(
    task: &TestTask,
    controllers: &HashMap<String, Box<dyn DriverController>>,
    options: RunOptions,
) -> Result<RunResult> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    Ok(runtime.block_on(run_task(task, controllers, options)))
}

/// Execute rule-expanded device actions for one phase. Failures here are
/// logged and skipped; they do not abort the recorded sequence.
async fn run_device_actions(
    controllers: &HashMap<String, Box<dyn DriverController>>,
    actions: Option<&Vec<DeviceAction>>,
) {
    for action in actions.into_iter().flatten() {
        let Some(controller) = controllers
            .values()
            .find(|c| c.platform().as_str().eq_ignore_ascii_case(&action.platform))
        else {
            log::warn!(
                "no controller on platform `{}` for device action `{}`",
                action.platform,
                action.operation
            );
            continue;
        };
        match action.operation.as_str() {
            "execCommandOnDevice" => {
                let Some(line) = action.args.first() else {
                    log::warn!("device action `{}` has no command line", action.operation);
                    continue;
                };
                if let Err(err) = controller.exec_command(line).await {
                    log::warn!("device command `{line}` failed: {err}");
                }
            }
            other => log::warn!("unsupported device operation `{other}`"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::mock::MockSession;
    use crate::driver::traits::NoopTelemetry;
    use crate::parser::parse_script;
    use crate::rules::{DeviceCommandRule, RuleSet};

    fn android_task(session: &Arc<MockSession>) -> (TestTask, HashMap<String, Box<dyn DriverController>>) {
        let script = parse_script(
            r#"{
                "drivers": [{"id": "d1", "platform": "android",
                             "init": {"launcherApp": "com.example.app"}}],
                "cases": [{"index": 1, "driverId": "d1",
                           "action": {"actionType": "tap", "arguments": {"x": 10, "y": 20}}}]
            }"#,
        )
        .unwrap();

        let mut sessions: HashMap<String, Arc<dyn AutomationSession>> = HashMap::new();
        sessions.insert("d1".to_string(), session.clone());
        let controllers = build_controllers(&script, sessions, Arc::new(NoopTelemetry));

        (TestTask::new("LoginSuite", script), controllers)
    }

    #[tokio::test]
    async fn phase_actions_wrap_the_recorded_sequence() {
        let session = Arc::new(MockSession::new());
        let (mut task, controllers) = android_task(&session);

        let rules = RuleSet::compile(vec![
            DeviceCommandRule {
                matcher: "Login.*".to_string(),
                converter: "ADBShell".to_string(),
                inline: "settings put global window_animation_scale 0".to_string(),
                when: PHASE_SET_UP.to_string(),
            },
            DeviceCommandRule {
                matcher: "Login.*".to_string(),
                converter: "ADBShell".to_string(),
                inline: "settings put global window_animation_scale 1".to_string(),
                when: PHASE_TEAR_DOWN.to_string(),
            },
        ])
        .unwrap();
        task.load_commands(&rules);

        let result = run_task(&task, &controllers, RunOptions::default()).await;

        assert_eq!(result.status, RunStatus::Done);
        assert_eq!(
            session.calls(),
            vec![
                "shell:settings put global window_animation_scale 0",
                "pointer:touch:3",
                "shell:settings put global window_animation_scale 1",
            ]
        );
    }

    #[tokio::test]
    async fn tear_down_runs_even_after_an_abort() {
        let session = Arc::new(MockSession::new());
        let script = parse_script(
            r#"{
                "drivers": [{"id": "d1", "platform": "android", "init": {}}],
                "cases": [{"index": 1, "driverId": "d1",
                           "action": {"actionType": "unsupportedOp", "arguments": {}}}]
            }"#,
        )
        .unwrap();
        let mut sessions: HashMap<String, Arc<dyn AutomationSession>> = HashMap::new();
        sessions.insert("d1".to_string(), session.clone());
        let controllers = build_controllers(&script, sessions, Arc::new(NoopTelemetry));

        let mut task = TestTask::new("AnySuite", script);
        task.device_actions.insert(
            PHASE_TEAR_DOWN.to_string(),
            vec![{
                let mut a = DeviceAction::new("Android", "execCommandOnDevice");
                a.args.push("input keyevent 3".to_string());
                a
            }],
        );

        let result = run_task(&task, &controllers, RunOptions::default()).await;

        assert_eq!(result.status, RunStatus::Aborted);
        assert_eq!(session.calls(), vec!["shell:input keyevent 3"]);
    }

    #[test]
    fn blocking_entry_point_runs_outside_a_runtime() {
        let session = Arc::new(MockSession::new());
        let (task, controllers) = android_task(&session);

        let result = run_task_blocking(&task, &controllers, RunOptions::default()).unwrap();

        assert_eq!(result.status, RunStatus::Done);
        assert_eq!(result.executed, 1);
    }
}
