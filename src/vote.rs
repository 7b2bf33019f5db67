use std::fmt;

/// One matched tracked term, on its way to the queue.
///
/// Deliberately neither `Clone` nor `Copy`: an event moves from the adapter
/// into the publisher and from there into the queue exactly once.
#[derive(Debug, PartialEq, Eq)]
pub struct VoteEvent {
    option: String,
}

impl VoteEvent {
    pub fn new(option: impl Into<String>) -> Self {
        Self {
            option: option.into(),
        }
    }

    pub fn option(&self) -> &str {
        &self.option
    }

    /// The wire payload: the option name as raw bytes.
    pub fn payload(&self) -> &[u8] {
        self.option.as_bytes()
    }
}

impl fmt::Display for VoteEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.option)
    }
}
