use std::fmt::Display;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::Serialize;
use thiserror::Error;

use super::require;
use crate::decode::sms::{RawSms, RawSmsSummary};
use crate::{Error, Result};

/// Message folder on the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SmsBox {
    Inbox,
    Outbox,
}

impl SmsBox {
    /// Value of the `smsbox` query parameter.
    pub fn query_value(self) -> &'static str {
        match self {
            SmsBox::Inbox => "rec",
            SmsBox::Outbox => "sto",
        }
    }
}

impl Display for SmsBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SmsBox::Inbox => "inbox",
            SmsBox::Outbox => "outbox",
        })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown sms box {0:?}, expected inbox or outbox")]
pub struct ParseSmsBoxError(String);

impl FromStr for SmsBox {
    type Err = ParseSmsBoxError;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inbox" | "rec" => Ok(SmsBox::Inbox),
            "outbox" | "sto" => Ok(SmsBox::Outbox),
            _ => Err(ParseSmsBoxError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SmsSummary {
    pub new_messages_count: u32,
    pub inbox_count: u32,
    pub outbox_count: u32,
}

impl TryFrom<RawSmsSummary> for SmsSummary {
    type Error = Error;
    fn try_from(raw: RawSmsSummary) -> Result<Self> {
        Ok(SmsSummary {
            new_messages_count: require(raw.new_messages_count, "sms summary", "new messages")?,
            inbox_count: require(raw.inbox_count, "sms summary", "inbox count")?,
            outbox_count: require(raw.outbox_count, "sms summary", "outbox count")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sms {
    /// Position in the router's list, unknown for a message opened by handle
    pub index: Option<u32>,
    pub phone_number: String,
    pub text: String,
    pub timestamp: Option<NaiveDateTime>,
    /// Router-side handle to open the message with
    pub cfg: Option<String>,
    #[serde(rename = "box")]
    pub sms_box: Option<SmsBox>,
}

impl TryFrom<RawSms> for Sms {
    type Error = Error;
    fn try_from(raw: RawSms) -> Result<Self> {
        Ok(Sms {
            index: raw.index,
            phone_number: require(raw.phone_number, "sms", "phone number")?,
            text: require(raw.text, "sms", "text")?,
            timestamp: raw.timestamp,
            cfg: raw.cfg,
            sms_box: raw.sms_box,
        })
    }
}
