use arrayvec::ArrayString;
use std::fmt;

use crate::task_id::TaskId;

/// A task's fixed-capacity display name.
///
/// The C original reserves 64 bytes including a NUL terminator, i.e. 63 usable bytes; Rust
/// strings carry their own length, so we give [`ArrayString`] that same 63-byte usable capacity
/// and get truncation-at-a-char-boundary for free.
const NAME_CAPACITY: usize = 63;

pub(crate) const IDLE_SLOT_NAME: &str = "[idle]";

#[derive(Clone, Eq, PartialEq, Hash)]
pub struct TaskName(ArrayString<NAME_CAPACITY>);

impl TaskName {
    /// Build a name from caller input, truncating at a UTF-8 character boundary if it overflows
    /// the 63-byte budget.
    pub fn new(raw: &str) -> Self {
        if raw.len() <= NAME_CAPACITY {
            TaskName(ArrayString::from(raw).expect("checked length above"))
        } else {
            let mut truncate_at = NAME_CAPACITY;
            while !raw.is_char_boundary(truncate_at) {
                truncate_at -= 1;
            }
            TaskName(ArrayString::from(&raw[..truncate_at]).expect("truncated to fit capacity"))
        }
    }

    /// Synthesize the name the spec requires when a caller submits with no name.
    pub(crate) fn synthesize(task_id: TaskId) -> Self {
        Self::new(&format!("unnamed_task_{task_id}"))
    }

    pub(crate) fn idle() -> Self {
        TaskName(ArrayString::from(IDLE_SLOT_NAME).expect("fits in capacity"))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl fmt::Debug for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.0.as_str(), f)
    }
}

impl From<&str> for TaskName {
    fn from(raw: &str) -> Self {
        TaskName::new(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_name_roundtrips() {
        let name = TaskName::new("build-index");
        assert_eq!(name.as_str(), "build-index");
    }

    #[test]
    fn long_name_is_truncated() {
        let long = "x".repeat(200);
        let name = TaskName::new(&long);
        assert_eq!(name.as_str().len(), NAME_CAPACITY);
    }

    #[test]
    fn truncation_respects_utf8_boundaries() {
        // Each multi-byte character is 3 bytes; 63 isn't a multiple of 3, so a naive byte-offset
        // truncation would land mid-character.
        let long = "\u{2603}".repeat(30); // snowman, 3 bytes each = 90 bytes
        let name = TaskName::new(&long);
        assert!(name.as_str().len() <= NAME_CAPACITY);
        assert!(std::str::from_utf8(name.as_str().as_bytes()).is_ok());
    }

    #[test]
    fn idle_slot_name() {
        assert_eq!(TaskName::idle().as_str(), IDLE_SLOT_NAME);
    }
}
