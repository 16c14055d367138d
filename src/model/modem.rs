use lazy_regex::regex_is_match;
use serde::Serialize;

use crate::decode::modem::RawModemInfo;
use crate::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Network {
    /// Radio access technology, e.g. `LTE`; empty when the page had none
    pub name: String,
    pub mcc: Option<String>,
    pub mnc: Option<String>,
}

/// LTE cell identity, split into eNodeB id and sector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Cell {
    pub cell_id_hex: Option<String>,
    pub cell_id: Option<u32>,
    pub enb: Option<u32>,
    pub sector: Option<u32>,
    pub pc_id: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModemInfo {
    pub network: Network,
    /// Seconds since the modem connected
    pub connected_time: Option<i64>,
    /// 0 (bad) to 4 (excellent), derived from RSSI
    pub signal: Option<u8>,
    pub rssi: Option<i32>,
    pub rsrp: Option<i32>,
    pub rsrq: Option<i32>,
    pub sinr: Option<i32>,
    /// Active SIM slot, 0 if unknown
    pub sim: u8,
    /// Aggregated carriers, primary first
    pub band: Vec<String>,
    pub cell: Cell,
}

impl TryFrom<RawModemInfo> for ModemInfo {
    type Error = Error;
    fn try_from(raw: RawModemInfo) -> Result<Self> {
        if let Some(signal) = raw.signal.filter(|&s| s > 4) {
            return Err(Error::validation("modem info", format!("signal {signal} out of range")));
        }
        if raw.sim > 2 {
            return Err(Error::validation("modem info", format!("sim slot {}", raw.sim)));
        }
        if let Some(band) = raw.bands.iter().find(|b| !regex_is_match!(r"^B\d+$", b)) {
            return Err(Error::validation("modem info", format!("malformed band {band:?}")));
        }
        if let (Some(id), Some(enb), Some(sector)) = (raw.cell_id, raw.enb, raw.sector) {
            if enb.checked_mul(256).and_then(|n| n.checked_add(sector)) != Some(id) {
                return Err(Error::validation(
                    "modem info",
                    format!("cell {id} doesn't split into enb {enb} and sector {sector}"),
                ));
            }
        }

        Ok(ModemInfo {
            network: Network {
                name: raw.network_name.unwrap_or_default(),
                mcc: raw.mcc,
                mnc: raw.mnc,
            },
            connected_time: raw.connected_time,
            signal: raw.signal,
            rssi: raw.rssi,
            rsrp: raw.rsrp,
            rsrq: raw.rsrq,
            sinr: raw.sinr,
            sim: raw.sim,
            band: raw.bands,
            cell: Cell {
                cell_id_hex: raw.cell_id_hex,
                cell_id: raw.cell_id,
                enb: raw.enb,
                sector: raw.sector,
                pc_id: raw.pc_id,
            },
        })
    }
}
