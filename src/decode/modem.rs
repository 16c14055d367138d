use chrono::{Duration, Months, NaiveDateTime};
use lazy_regex::regex_captures;

use super::as_int;
use crate::html::{sim_slot, ExtractedTable};

/// Cellular modem status, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawModemInfo {
    pub network_name: Option<String>,
    pub mcc: Option<String>,
    pub mnc: Option<String>,
    pub connected_time: Option<i64>,
    pub signal: Option<u8>,
    pub rssi: Option<i32>,
    pub rsrp: Option<i32>,
    pub rsrq: Option<i32>,
    pub sinr: Option<i32>,
    pub sim: u8,
    pub bands: Vec<String>,
    pub cell_id_hex: Option<String>,
    pub cell_id: Option<u32>,
    pub enb: Option<u32>,
    pub sector: Option<u32>,
    pub pc_id: Option<i32>,
}

/// Scrape `admin/network/gcom/status` together with its `?detail=1` variant.
///
/// `reference` is the instant the connected time is counted back from.
pub fn decode(pages: &[&str], reference: NaiveDateTime) -> RawModemInfo {
    let mut table = ExtractedTable::default();
    let mut sim = 0;
    for page in pages {
        table.merge(ExtractedTable::parse(page));
        if sim == 0 {
            sim = sim_slot(page);
        }
    }

    let text = |key: &str| table.text(key);
    let int = |key: &str| as_int(table.text(key).as_deref());

    // older firmware has no PCC row, only the primary band and its bandwidth
    let pcc = text("PCC").or_else(|| match (text("Band"), text("DL Bandwidth")) {
        (Some(band), Some(bandwidth)) => Some(format!("BAND {band} / {bandwidth}")),
        _ => None,
    });
    let bands = [pcc, text("SCC"), text("SCC2"), text("SCC3"), text("SCC4")]
        .iter()
        .flatten()
        .filter_map(|carrier| band(carrier))
        .collect();

    let rssi = int("RSSI");
    let cell_id_hex = text("Cell ID");
    let cell_id = cell_id_hex.as_deref().and_then(parse_cell_id);

    RawModemInfo {
        network_name: text("Network Type").map(|s| s.replace(" ...", "")),
        mcc: text("MCC"),
        mnc: text("MNC"),
        connected_time: text("Connected Time").and_then(|s| connected_seconds(&s, reference)),
        signal: signal_strength(rssi),
        rssi,
        rsrp: int("RSRP"),
        rsrq: int("RSRQ"),
        sinr: int("SINR"),
        sim,
        bands,
        cell_id_hex,
        cell_id,
        enb: cell_id.map(|id| id / 256),
        sector: cell_id.map(|id| id % 256),
        pc_id: int("PCID"),
    }
}

/// `B3` from a carrier description like `BAND 3 / 20 MHz`.
pub fn band(carrier: &str) -> Option<String> {
    regex_captures!(r"BAND\s*(\d+)\s*/\s*(\d+)\s*MHz", carrier).map(|(_, band, _)| format!("B{band}"))
}

/// Coarse 0-4 score, `None` when there's no RSSI.
pub fn signal_strength(rssi: Option<i32>) -> Option<u8> {
    Some(match rssi? {
        r if r > 20 => 4,
        r if r > 15 => 3,
        r if r > 10 => 2,
        r if r > 5 => 1,
        _ => 0,
    })
}

/// LTE cell identity, printed as hex with or without `0x`.
pub fn parse_cell_id(hex: &str) -> Option<u32> {
    let hex = hex.trim();
    let digits = hex
        .strip_prefix("0x")
        .or_else(|| hex.strip_prefix("0X"))
        .unwrap_or(hex);
    u32::from_str_radix(digits, 16).ok()
}

/// Seconds covered by a duration like `3 months 2 days 04:10:22`.
///
/// `HH:MM:SS` adds hours, minutes and seconds; `year(s)`, `month(s)`,
/// `week(s)` and `day(s)` take the number right before them. Months and years
/// have no fixed length, so the result is the span between `reference` and
/// `reference` moved back by the duration. `None` if nothing was recognized.
pub fn connected_seconds(text: &str, reference: NaiveDateTime) -> Option<i64> {
    let lower = text.to_lowercase();
    let tokens = lower.split_whitespace().collect::<Vec<_>>();

    let mut months: u32 = 0;
    let mut seconds: i64 = 0;
    let mut recognized = false;

    for (i, token) in tokens.iter().enumerate() {
        if token.matches(':').count() == 2 {
            let mut parts = token.split(':').map(|p| p.parse::<u32>().ok());
            if let (Some(Some(h)), Some(Some(m)), Some(Some(s))) =
                (parts.next(), parts.next(), parts.next())
            {
                seconds += i64::from(h) * 3600 + i64::from(m) * 60 + i64::from(s);
                recognized = true;
            }
            continue;
        }
        if i == 0 {
            continue;
        }
        let Ok(n) = tokens[i - 1].parse::<u32>() else {
            continue;
        };

        if token.starts_with("year") {
            months = months.checked_add(n.checked_mul(12)?)?;
        } else if token.starts_with("month") {
            months = months.checked_add(n)?;
        } else if token.starts_with("week") {
            seconds += i64::from(n) * 7 * 86_400;
        } else if token.starts_with("day") {
            seconds += i64::from(n) * 86_400;
        } else {
            continue;
        }
        recognized = true;
    }

    if !recognized {
        return None;
    }

    let start = reference
        .checked_sub_months(Months::new(months))?
        .checked_sub_signed(Duration::try_seconds(seconds)?)?;
    Some((reference - start).num_seconds())
}
