//! Windows driver controller.

use async_trait::async_trait;
use std::sync::Arc;

use super::traits::{
    AutomationSession, DriverController, LiveElement, PointerKind, PointerSequence, SessionError,
    TelemetryHook,
};
use crate::parser::types::{DriverSession, Platform};

pub struct WindowsController {
    driver: DriverSession,
    session: Arc<dyn AutomationSession>,
    telemetry: Arc<dyn TelemetryHook>,
}

impl WindowsController {
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
impl DriverController for WindowsController {
    fn platform(&self) -> Platform {
        Platform::Windows
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
        self.telemetry
            .inspect(&self.driver.launcher_app, "dragAndDrop");
        // The Windows automation bridge does not deliver press-move-release
        // reliably through a mouse pointer; a pen pointer does, so the drag
        // gesture is synthesized with a pen device.
        let drag = PointerSequence::new(PointerKind::Pen)
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
        // Clipboard state is host-wide: concurrent runs on the same host
        // race here, and serializing access is the caller's job.
        let text = self.session.get_clipboard().await?;
        self.input(element, &text).await
    }

    async fn set_clipboard(&self, text: &str) -> Result<(), SessionError> {
        self.session.set_clipboard(text).await
    }

    async fn get_page_source(&self) -> Result<String, SessionError> {
        self.session.page_source().await
    }
}
