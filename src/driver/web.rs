//! Web driver controller.
//!
//! Web sessions have no recorded descriptor shape and no device shell;
//! the capability set is the element- and coordinate-centric subset.

use async_trait::async_trait;
use std::sync::Arc;

use super::traits::{
    AutomationSession, DriverController, LiveElement, PointerKind, PointerSequence, SessionError,
};
use crate::parser::types::{DriverSession, Platform};

pub struct WebController {
    driver: DriverSession,
    session: Arc<dyn AutomationSession>,
}

impl WebController {
    pub fn new(driver: DriverSession, session: Arc<dyn AutomationSession>) -> Self {
        Self { driver, session }
    }

    /// URL the recorded session started from.
    pub fn init_url(&self) -> &str {
        &self.driver.init_url
    }
}

#[async_trait]
impl DriverController for WebController {
    fn platform(&self) -> Platform {
        Platform::Web
    }

    fn session(&self) -> &dyn AutomationSession {
        self.session.as_ref()
    }

    async fn tap(&self, x: i32, y: i32) -> Result<(), SessionError> {
        let click = PointerSequence::new(PointerKind::Mouse)
            .move_to(0, x, y)
            .down()
            .up();
        self.session.perform_pointer(click).await
    }

    async fn drag_and_drop(
        &self,
        from_x: i32,
        from_y: i32,
        to_x: i32,
        to_y: i32,
    ) -> Result<(), SessionError> {
        let drag = PointerSequence::new(PointerKind::Mouse)
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
}
