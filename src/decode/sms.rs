use chrono::NaiveDateTime;
use lazy_regex::regex_captures;

use crate::html::{onclick_args, zip_exact, ExtractedTable, FormFields};
use crate::model::SmsBox;

const TIMESTAMP_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Message counters, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSmsSummary {
    pub new_messages_count: Option<u32>,
    pub inbox_count: Option<u32>,
    pub outbox_count: Option<u32>,
}

/// One message, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSms {
    pub index: Option<u32>,
    pub phone_number: Option<String>,
    pub text: Option<String>,
    pub timestamp: Option<NaiveDateTime>,
    pub cfg: Option<String>,
    pub sms_box: Option<SmsBox>,
}

/// Scrape `admin/network/gcom/sms/status`.
pub fn decode_summary(html: &str) -> RawSmsSummary {
    let table = ExtractedTable::parse_with_headers(html);
    let count = |key: &str| table.text(key).and_then(|s| s.trim().parse::<u32>().ok());

    RawSmsSummary {
        // firmware versions disagree on this label
        new_messages_count: count("New Message").or_else(|| count("New messages")),
        inbox_count: count("Inbox"),
        outbox_count: count("Outbox"),
    }
}

/// Scrape `admin/network/gcom/sms/smslist`.
///
/// Rows look like `index | phone | text | timestamp`. The handle needed to
/// open a message is not in the table; it only appears in the row's
/// `cbi_show_modal('readsms', '...readsms?cfg=<handle>')` button, so rows
/// and buttons are matched up by position. If their counts differ no row
/// gets a handle.
pub fn decode_list(html: &str, sms_box: SmsBox) -> Vec<RawSms> {
    let table = ExtractedTable::parse(html);
    let mut messages = table
        .iter()
        .filter_map(|(index, value)| {
            let index = index.trim().parse::<u32>().ok()?;
            let cells = value.as_list();
            Some(RawSms {
                index: Some(index),
                phone_number: cells.first().filter(|s| !s.is_empty()).cloned(),
                text: cells.get(1).cloned(),
                timestamp: cells.get(2).and_then(|s| parse_timestamp(s)),
                cfg: None,
                sms_box: Some(sms_box),
            })
        })
        .collect::<Vec<_>>();

    match zip_exact(&mut messages, read_handles(html), "read buttons") {
        Ok(pairs) => pairs.for_each(|(sms, cfg)| sms.cfg = cfg),
        Err(gap) => log::warn!("sms list ({sms_box}): {gap}, leaving handles unset"),
    }

    messages
}

/// `cfg` handle of every read button, in page order. A button without a
/// recognizable handle still takes up its slot.
fn read_handles(html: &str) -> Vec<Option<String>> {
    onclick_args(html, "cbi_show_modal")
        .into_iter()
        .filter(|args| args.first().map_or(false, |first| first.contains("readsms")))
        .map(|args| {
            args.get(1)
                .and_then(|url| cfg_of(url))
                .or_else(|| args.first().and_then(|first| cfg_of(first)))
        })
        .collect()
}

fn cfg_of(url: &str) -> Option<String> {
    regex_captures!(r"cfg=([a-z0-9]+)", url).map(|(_, cfg)| cfg.to_string())
}

/// Scrape `admin/network/gcom/sms/readsms`, a form showing one message.
pub fn decode_message(html: &str) -> RawSms {
    let fields = FormFields::parse(html);
    RawSms {
        phone_number: fields.get("cbid.smsread.1.phone").map(str::to_string),
        text: fields.get("cbid.smsread.1.text").map(str::to_string),
        ..RawSms::default()
    }
}

pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
}
