use serde::{Deserialize, Serialize};

/// The device that most recently heard a voice command on an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastCalled {
    /// Serial of the device, or of a companion app standing in for it
    pub serial_number: String,
    /// Milliseconds since the epoch
    pub timestamp: Option<i64>,
}

impl LastCalled {
    pub fn new(serial_number: impl Into<String>, timestamp: Option<i64>) -> Self {
        Self {
            serial_number: serial_number.into(),
            timestamp,
        }
    }
}
