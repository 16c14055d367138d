use serde::Serialize;

use super::require;
use crate::decode::devices::{summarize, DeviceFilter, RawDevice};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Device {
    pub hostname: Option<String>,
    pub ip: String,
    /// Identifies the device across polls
    pub mac: String,
    /// Mbps
    pub up_speed: f64,
    /// Mbps
    pub down_speed: f64,
}

impl TryFrom<RawDevice> for Device {
    type Error = Error;
    fn try_from(raw: RawDevice) -> Result<Self> {
        let mac = require(raw.mac, "device", "mac")?;
        let ip = require(raw.ip, "device", "ip")
            .map_err(|_| Error::validation("device", format!("missing ip for {mac}")))?;
        let up_speed = require(raw.up_speed, "device", "up speed")?;
        let down_speed = require(raw.down_speed, "device", "down speed")?;

        if up_speed < 0.0 || down_speed < 0.0 {
            return Err(Error::validation(
                "device",
                format!("negative speed for {mac}"),
            ));
        }

        Ok(Device {
            hostname: raw.hostname,
            ip,
            mac,
            up_speed,
            down_speed,
        })
    }
}

/// Mbps figures over all connected devices.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DevicesStats {
    pub top_downloader_speed: f64,
    pub top_downloader_mac: String,
    pub top_downloader_hostname: Option<String>,
    pub top_uploader_speed: f64,
    pub top_uploader_mac: String,
    pub top_uploader_hostname: Option<String>,
    pub total_down_speed: f64,
    pub total_up_speed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DevicesInfo {
    /// All connected devices, regardless of the filter
    pub device_count: usize,
    /// `None` when nothing is connected
    pub stats: Option<DevicesStats>,
    /// Devices selected by the filter
    pub devices: Vec<Device>,
}

impl DevicesInfo {
    pub fn build(raw: Vec<RawDevice>, filter: &DeviceFilter) -> Result<DevicesInfo> {
        let devices = raw
            .into_iter()
            .map(Device::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(DevicesInfo {
            device_count: devices.len(),
            stats: summarize(&devices),
            devices: devices.into_iter().filter(|d| filter.matches(d)).collect(),
        })
    }
}
