//! Display contract between the engine and its embedding host.
//!
//! Everything a session ever shows the user flows through one
//! [`ResponseDisplay`]: echoed input, query batches, printed values,
//! and error lines. The engine never writes to stdout itself.

use std::cell::RefCell;
use std::rc::Rc;

/// Ordered sink for a session's response lines.
pub trait ResponseDisplay {
    /// Append one line to the response area.
    fn append_line(&self, line: &str);

    /// Append several lines in order.
    fn append_lines(&self, lines: &[String]) {
        for line in lines {
            self.append_line(line);
        }
    }
}

/// In-memory display that records every line. Clones share the same
/// buffer, so a test can keep one clone and hand the other to the
/// engine.
#[derive(Clone, Default)]
pub struct RecordingDisplay {
    lines: Rc<RefCell<Vec<String>>>,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything appended so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    pub fn last_line(&self) -> Option<String> {
        self.lines.borrow().last().cloned()
    }

    /// True if any recorded line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.borrow().iter().any(|line| line.contains(needle))
    }

    pub fn clear(&self) {
        self.lines.borrow_mut().clear();
    }
}

impl ResponseDisplay for RecordingDisplay {
    fn append_line(&self, line: &str) {
        self.lines.borrow_mut().push(line.to_string());
    }
}
