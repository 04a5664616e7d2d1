//! Terminal notification surface.

use std::io::Write;

use taskroom_core::NotificationSink;

/// Prints `[title] body` on stderr, optionally ringing the bell first.
pub struct TerminalSink {
    bell: bool,
}

impl TerminalSink {
    pub fn new(bell: bool) -> Self {
        Self { bell }
    }
}

impl NotificationSink for TerminalSink {
    fn notify(
        &mut self,
        title: &str,
        body: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut err = std::io::stderr().lock();
        if self.bell {
            write!(err, "\x07")?;
        }
        writeln!(err, "[{title}] {body}")?;
        err.flush()?;
        Ok(())
    }
}
