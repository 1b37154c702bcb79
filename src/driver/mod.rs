pub mod android;
pub mod finder;
pub mod traits;
pub mod web;
pub mod windows;

use std::sync::Arc;

use crate::parser::types::{DriverSession, Platform};
use android::AndroidController;
use traits::{AutomationSession, DriverController, TelemetryHook};
use web::WebController;
use windows::WindowsController;

/// Build the controller for a driver session.
///
/// Returns `None` when no controller backend is shipped for the platform
/// (ios sessions are accepted by the parser but cannot be replayed here).
pub fn controller_for(
    driver: &DriverSession,
    session: Arc<dyn AutomationSession>,
    telemetry: Arc<dyn TelemetryHook>,
) -> Option<Box<dyn DriverController>> {
    match driver.platform {
        Platform::Android => Some(Box::new(AndroidController::new(
            driver.clone(),
            session,
            telemetry,
        ))),
        Platform::Windows => Some(Box::new(WindowsController::new(
            driver.clone(),
            session,
            telemetry,
        ))),
        Platform::Web => Some(Box::new(WebController::new(driver.clone(), session))),
        Platform::Ios => None,
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! Scripted session double used across the driver and runner tests.

    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::traits::{
        AutomationSession, LiveElement, LocatorStrategy, PointerSequence, SessionError,
    };

    pub struct MockSession {
        elements: HashMap<(LocatorStrategy, String), String>,
        calls: Mutex<Vec<String>>,
        clipboard: Mutex<String>,
        page_source: String,
        stall_ms: u64,
    }

    impl MockSession {
        pub fn new() -> Self {
            Self {
                elements: HashMap::new(),
                calls: Mutex::new(Vec::new()),
                clipboard: Mutex::new(String::new()),
                page_source: "<hierarchy/>".to_string(),
                stall_ms: 0,
            }
        }

        /// Script an element the session will "find".
        pub fn with_element(
            mut self,
            strategy: LocatorStrategy,
            value: &str,
            element_id: &str,
        ) -> Self {
            self.elements
                .insert((strategy, value.to_string()), element_id.to_string());
            self
        }

        pub fn with_clipboard(self, text: &str) -> Self {
            *self.clipboard.lock().unwrap() = text.to_string();
            self
        }

        /// Delay every session call, for deadline tests.
        pub fn with_stall_ms(mut self, ms: u64) -> Self {
            self.stall_ms = ms;
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub fn find_calls(&self) -> usize {
            self.calls()
                .iter()
                .filter(|c| c.starts_with("findElement"))
                .count()
        }

        fn record(&self, entry: String) {
            self.calls.lock().unwrap().push(entry);
        }

        async fn stall(&self) {
            if self.stall_ms > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(self.stall_ms)).await;
            }
        }
    }

    #[async_trait]
    impl AutomationSession for MockSession {
        async fn find_element(
            &self,
            strategy: LocatorStrategy,
            value: &str,
        ) -> Result<Option<LiveElement>, SessionError> {
            self.stall().await;
            self.record(format!("findElement:{}:{}", strategy.as_str(), value));
            Ok(self
                .elements
                .get(&(strategy, value.to_string()))
                .map(|id| LiveElement {
                    element_id: id.clone(),
                }))
        }

        async fn click(&self, element: &LiveElement) -> Result<(), SessionError> {
            self.record(format!("click:{}", element.element_id));
            Ok(())
        }

        async fn send_keys(&self, element: &LiveElement, text: &str) -> Result<(), SessionError> {
            self.record(format!("sendKeys:{}:{}", element.element_id, text));
            Ok(())
        }

        async fn perform_pointer(&self, sequence: PointerSequence) -> Result<(), SessionError> {
            self.stall().await;
            self.record(format!(
                "pointer:{}:{}",
                sequence.kind.as_str(),
                sequence.actions.len()
            ));
            Ok(())
        }

        async fn page_source(&self) -> Result<String, SessionError> {
            self.record("pageSource".to_string());
            Ok(self.page_source.clone())
        }

        async fn set_clipboard(&self, text: &str) -> Result<(), SessionError> {
            self.record(format!("setClipboard:{text}"));
            *self.clipboard.lock().unwrap() = text.to_string();
            Ok(())
        }

        async fn get_clipboard(&self) -> Result<String, SessionError> {
            self.record("getClipboard".to_string());
            Ok(self.clipboard.lock().unwrap().clone())
        }

        async fn exec_shell(&self, command: &str) -> Result<String, SessionError> {
            self.stall().await;
            self.record(format!("shell:{command}"));
            Ok(String::new())
        }
    }
}
