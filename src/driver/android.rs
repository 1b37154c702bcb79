//! Android driver controller.

use async_trait::async_trait;
use std::sync::Arc;

use super::traits::{
    AutomationSession, DriverController, LiveElement, PointerKind, PointerSequence, SessionError,
    TelemetryHook,
};
use crate::parser::types::{DriverSession, Platform};

pub struct AndroidController {
    driver: DriverSession,
    session: Arc<dyn AutomationSession>,
    telemetry: Arc<dyn TelemetryHook>,
}

impl AndroidController {
    pub fn new(
        driver: DriverSession,
        session: Arc<dyn AutomationSession>,
        telemetry: Arc<dyn TelemetryHook>,
    ) -> Self {
        Self {
            driver,
            session,
            telemetry,
        }
    }
}

#[async_trait]
impl DriverController for AndroidController {
    fn platform(&self) -> Platform {
        Platform::Android
    }

    fn session(&self) -> &dyn AutomationSession {
        self.session.as_ref()
    }

    async fn tap(&self, x: i32, y: i32) -> Result<(), SessionError> {
        let tap = PointerSequence::new(PointerKind::Touch)
            .move_to(0, x, y)
            .down()
            .up();
        self.session.perform_pointer(tap).await
    }

    async fn drag_and_drop(
        &self,
        from_x: i32,
        from_y: i32,
        to_x: i32,
        to_y: i32,
    ) -> Result<(), SessionError> {
        // A plain touch pointer drives drag fine on Android; the hold
        // before the move is what makes the gesture register as a drag.
        let drag = PointerSequence::new(PointerKind::Touch)
            .move_to(0, from_x, from_y)
            .down()
            .move_to(500, from_x, from_y)
            .move_to(700, to_x, to_y)
            .up();
        self.session.perform_pointer(drag).await
    }

    async fn input(&self, element: &LiveElement, text: &str) -> Result<(), SessionError> {
        self.session.click(element).await?;
        self.session.send_keys(element, text).await
    }

    async fn paste(&self, element: &LiveElement) -> Result<(), SessionError> {
        let text = self.session.get_clipboard().await?;
        self.input(element, &text).await
    }

    async fn set_clipboard(&self, text: &str) -> Result<(), SessionError> {
        self.session.set_clipboard(text).await
    }

    async fn get_page_source(&self) -> Result<String, SessionError> {
        self.session.page_source().await
    }

    async fn exec_command(&self, line: &str) -> Result<String, SessionError> {
        self.telemetry
            .inspect(&self.driver.launcher_app, "execCommandOnDevice");
        log::debug!("adb shell on `{}`: {}", self.driver.id, line);
        self.session.exec_shell(line).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::mock::MockSession;
    use crate::driver::traits::NoopTelemetry;

    fn controller(session: Arc<MockSession>) -> AndroidController {
        AndroidController::new(
            DriverSession {
                id: "d_android".to_string(),
                platform: Platform::Android,
                launcher_app: "com.example.app".to_string(),
                init_url: String::new(),
            },
            session,
            Arc::new(NoopTelemetry),
        )
    }

    #[tokio::test]
    async fn drag_stays_on_the_touch_pointer() {
        let session = Arc::new(MockSession::new());
        controller(session.clone())
            .drag_and_drop(10, 10, 90, 90)
            .await
            .unwrap();
        assert_eq!(session.calls(), vec!["pointer:touch:5"]);
    }

    #[tokio::test]
    async fn input_focuses_then_types() {
        let session = Arc::new(MockSession::new());
        let el = LiveElement {
            element_id: "el-1".to_string(),
        };
        controller(session.clone()).input(&el, "pin 1234").await.unwrap();
        assert_eq!(session.calls(), vec!["click:el-1", "sendKeys:el-1:pin 1234"]);
    }

    #[tokio::test]
    async fn exec_command_runs_on_the_device_shell() {
        let session = Arc::new(MockSession::new());
        controller(session.clone())
            .exec_command("input keyevent 82")
            .await
            .unwrap();
        assert_eq!(session.calls(), vec!["shell:input keyevent 82"]);
    }
}
