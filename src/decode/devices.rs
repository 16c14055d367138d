use std::convert::Infallible;
use std::str::FromStr;

use scraper::Html;

use crate::html::{selector, text_with_breaks};
use crate::model::{Device, DevicesStats};

/// One row of the device list, before validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDevice {
    pub hostname: Option<String>,
    pub ip: Option<String>,
    pub mac: Option<String>,
    pub up_speed: Option<f64>,
    pub down_speed: Option<f64>,
}

/// Transfer speed like `512 Kbps` in Mbps (1 Mbps = 1024 Kbps).
///
/// Unknown units count as `0`; empty or non-numeric text is `None`.
pub fn parse_speed(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let lower = text.to_lowercase();
    let number = || text.split(' ').next()?.parse::<f64>().ok();

    if lower.ends_with(" kbps") {
        number().map(|n| round2(n / 1024.0))
    } else if lower.ends_with(" mbps") {
        number()
    } else if lower.ends_with(" gbps") {
        number().map(|n| n * 1024.0)
    } else if lower.ends_with(" bps") {
        number().map(|n| round2(n / 1024.0 / 1024.0))
    } else {
        Some(0.0)
    }
}

fn round2(n: f64) -> f64 {
    (n * 100.0).round() / 100.0
}

/// Scrape `admin/network/devices/devlist?detail=1`.
///
/// Each row holds `<div id="...-ipmac">`, `<div id="...-speed">` and
/// `<div id="...-hostname">` cells whose mobile text is split into lines
/// with `<br>`.
pub fn decode(html: &str) -> Vec<RawDevice> {
    let document = Html::parse_document(html);
    let table_sel = selector("table");
    let row_sel = selector("tr");
    let cell_sel = selector("td div");
    let content_sel = selector("p.visible-xs");

    let mut devices = Vec::new();
    for table in document.select(&table_sel) {
        for row in table.select(&row_sel) {
            let mut device = RawDevice::default();

            for cell in row.select(&cell_sel) {
                let Some(id) = cell.value().attr("id") else {
                    continue;
                };
                let Some(content) = cell.select(&content_sel).next() else {
                    continue;
                };
                let content = text_with_breaks(content);
                let lines = content
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .collect::<Vec<_>>();

                if id.ends_with("ipmac") {
                    if let [ip, mac, ..] = lines.as_slice() {
                        device.ip = Some(ip.to_string());
                        device.mac = Some(mac.to_string());
                    }
                } else if id.ends_with("speed") {
                    if let [up, down, ..] = lines.as_slice() {
                        device.up_speed = parse_speed(up);
                        device.down_speed = parse_speed(down);
                    }
                } else if id.ends_with("hostname") {
                    device.hostname = lines.first().map(|s| s.to_string());
                }
            }

            if device.ip.is_some() || device.mac.is_some() {
                devices.push(device);
            }
        }
    }
    devices
}

/// Which devices to list individually. Statistics always cover all devices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DeviceFilter {
    #[default]
    All,
    /// Hostnames or MAC addresses
    Only(Vec<String>),
}

impl DeviceFilter {
    pub fn matches(&self, device: &Device) -> bool {
        match self {
            DeviceFilter::All => true,
            DeviceFilter::Only(wanted) => wanted
                .iter()
                .any(|w| *w == device.mac || device.hostname.as_deref() == Some(w.as_str())),
        }
    }
}

/// `*` (or nothing) selects everything, otherwise a comma separated list.
impl FromStr for DeviceFilter {
    type Err = Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s
            .split(',')
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>();

        Ok(match wanted.first().map(String::as_str) {
            None | Some("*") => DeviceFilter::All,
            Some(_) => DeviceFilter::Only(wanted),
        })
    }
}

/// Totals and the busiest device in each direction, `None` without devices.
///
/// On equal speeds the device listed first wins.
pub fn summarize(devices: &[Device]) -> Option<DevicesStats> {
    let first = devices.first()?;
    let top_down = devices.iter().fold(first, |best, d| {
        if d.down_speed > best.down_speed {
            d
        } else {
            best
        }
    });
    let top_up = devices.iter().fold(first, |best, d| {
        if d.up_speed > best.up_speed {
            d
        } else {
            best
        }
    });

    Some(DevicesStats {
        top_downloader_speed: top_down.down_speed,
        top_downloader_mac: top_down.mac.clone(),
        top_downloader_hostname: top_down.hostname.clone(),
        top_uploader_speed: top_up.up_speed,
        top_uploader_mac: top_up.mac.clone(),
        top_uploader_hostname: top_up.hostname.clone(),
        total_down_speed: devices.iter().map(|d| d.down_speed).sum(),
        total_up_speed: devices.iter().map(|d| d.up_speed).sum(),
    })
}
