//! Data model of one device entity

mod attributes;
mod last_called;
mod serial;
mod snapshot;

pub use attributes::{escape_image_url, DeviceAttributes, DeviceInfo};
pub use last_called::LastCalled;
pub use serial::DeviceSerial;
pub use snapshot::{
    DeviceIdentity, DeviceSnapshot, MediaDetails, PlayerState, VisibleState,
    CAPABILITY_BLUETOOTH, CAPABILITY_MUSIC, LOCAL_SOURCE,
};
