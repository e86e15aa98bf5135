//! In-memory [`Multiplexer`] stand-in shared by this crate's tests.

use agentmail_core::error::AtmError;
use agentmail_core::multiplexer::Multiplexer;
use std::cell::RefCell;
use std::collections::HashMap;

#[derive(Default)]
pub(crate) struct FakeMultiplexer {
    pub current: Option<String>,
    pub windows: Vec<String>,
    pub sent: RefCell<HashMap<String, Vec<String>>>,
    pub fail_window: Option<String>,
}

impl Multiplexer for FakeMultiplexer {
    fn current_window(&self) -> Result<Option<String>, AtmError> {
        Ok(self.current.clone())
    }

    fn list_windows(&self) -> Result<Vec<String>, AtmError> {
        Ok(self.windows.clone())
    }

    fn notify_window(&self, window: &str, text: &str) -> Result<(), AtmError> {
        if self.fail_window.as_deref() == Some(window) {
            return Err(AtmError::Io {
                path: std::path::PathBuf::from(window),
                source: std::io::Error::other("simulated delivery failure"),
            });
        }
        self.sent
            .borrow_mut()
            .entry(window.to_string())
            .or_default()
            .push(text.to_string());
        Ok(())
    }
}
