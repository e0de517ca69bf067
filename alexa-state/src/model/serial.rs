//! Identity types for devices

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! impl_id_type {
    ($name:ident) => {
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name::new(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

/// Serial number of a device or group, the primary key of an entity
///
/// Groups ("clusters") are devices too and are referenced by serial from
/// their members' `parent_clusters`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceSerial(String);

impl DeviceSerial {
    pub fn new(serial: impl Into<String>) -> Self {
        Self(serial.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Obfuscated form for log output
    pub fn hidden(&self) -> String {
        alexa_api::hide_serial(&self.0)
    }
}

impl_id_type!(DeviceSerial);

impl PartialEq<str> for DeviceSerial {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}
