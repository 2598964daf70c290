//! Presenting decoded events.

use dirwatch_protocol::DecodedEvent;
use std::io::{self, Write};

/// Receives every decoded event, in delivery order.
pub trait Reporter {
    /// Present one event. Must not fail from the caller's point of view.
    fn report(&mut self, event: &DecodedEvent);

    /// Called once per successful read, before its events are reported.
    fn read_completed(&mut self, _bytes: usize) {}
}

/// Human-readable reporter writing one block per event.
pub struct TextReporter<W> {
    out: W,
}

impl TextReporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TextReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    fn write_event(&mut self, event: &DecodedEvent) -> io::Result<()> {
        let out = &mut self.out;
        writeln!(out, "Event info:")?;
        writeln!(out, "   Watch descriptor.... {}", event.wd)?;
        writeln!(out, "   Mask................ {}", event.mask.bits())?;
        writeln!(out, "   Cookie.............. {}", event.cookie)?;
        writeln!(out, "   Length of name...... {}", event.len)?;
        writeln!(out, "   Name................ {}", event.name.as_deref().unwrap_or(""))?;

        writeln!(out, "Event mask includes:")?;
        for name in event.mask.names() {
            writeln!(out, "   - {name}")?;
        }

        writeln!(out)?;
        out.flush()
    }
}

impl<W: Write> Reporter for TextReporter<W> {
    fn report(&mut self, event: &DecodedEvent) {
        if let Err(e) = self.write_event(event) {
            tracing::warn!(error = %e, wd = event.wd, "Failed to write event");
        }
    }

    fn read_completed(&mut self, bytes: usize) {
        tracing::debug!(bytes, "Completed one read");
        if let Err(e) = writeln!(self.out, "Completed one read...") {
            tracing::warn!(error = %e, "Failed to write read marker");
        }
    }
}
