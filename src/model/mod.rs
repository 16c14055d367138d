//! Validated records handed to callers.
//!
//! Each record is built from its decoder's raw counterpart with `TryFrom`.
//! A required field that the page didn't provide, or a value outside its
//! range, means the firmware's markup changed and is reported as
//! [`Error::Validation`](crate::Error::Validation).

mod devices;
pub use devices::{Device, DevicesInfo, DevicesStats};

mod modem;
pub use modem::{Cell, ModemInfo, Network};

mod sms;
pub use sms::{ParseSmsBoxError, Sms, SmsBox, SmsSummary};

use serde::Serialize;

use crate::{Error, Result};

/// Everything a monitoring poll reads in one go.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouterData {
    pub modem: ModemInfo,
    pub devices: DevicesInfo,
}

fn require<T>(value: Option<T>, record: &'static str, field: &str) -> Result<T> {
    value.ok_or_else(|| Error::validation(record, format!("missing {field}")))
}
