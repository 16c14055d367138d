use reqwest::StatusCode;
use thiserror::Error;

/// Why a login attempt did not produce a session.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthFailure {
    #[error("router did not answer with a login form")]
    NoChallenge,
    #[error("router rejected the login ({0})")]
    Rejected(StatusCode),
    #[error("login response carried no sysauth cookie")]
    MissingCookie,
    #[error("session was rejected again right after logging in")]
    SessionRejected,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("authentication failed: {0}")]
    Authentication(#[from] AuthFailure),
    #[error("unexpected status {status} from {url}")]
    UnexpectedStatus { url: String, status: StatusCode },
    #[error("invalid {record}: {reason}")]
    Validation {
        record: &'static str,
        reason: String,
    },
}

impl Error {
    pub(crate) fn transport(url: &str, source: reqwest::Error) -> Error {
        Error::Transport {
            url: url.to_string(),
            source,
        }
    }

    pub(crate) fn validation(record: &'static str, reason: impl Into<String>) -> Error {
        Error::Validation {
            record,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
