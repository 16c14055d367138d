use std::fmt::Display;

use chrono::{DateTime, Utc};

const COOKIE_NAME: &str = "sysauth";

/// Value of the `sysauth` cookie handed out by a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthCookie {
    value: String,
}

impl AuthCookie {
    /// Pick the `sysauth` cookie out of one `Set-Cookie` header value.
    ///
    /// An empty value is what the router sends when it logs a session out,
    /// so that doesn't count.
    pub fn from_set_cookie(header: &str) -> Option<AuthCookie> {
        let pair = header.split(';').next()?;
        let (name, value) = pair.split_once('=')?;
        let value = value.trim().trim_matches('"');
        if name.trim() != COOKIE_NAME || value.is_empty() {
            return None;
        }
        Some(AuthCookie {
            value: value.to_string(),
        })
    }

    /// `Cookie` request header carrying this session.
    pub fn header_value(&self) -> String {
        format!("{COOKIE_NAME}={}", self.value)
    }
}

impl Display for AuthCookie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
}

/// Login state of one client. Lives only in memory.
#[derive(Debug, Default)]
pub struct Session {
    cookie: Option<AuthCookie>,
    last_authenticated_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn state(&self) -> SessionState {
        match self.cookie {
            Some(_) => SessionState::Authenticated,
            None => SessionState::Unauthenticated,
        }
    }

    pub fn cookie(&self) -> Option<&AuthCookie> {
        self.cookie.as_ref()
    }

    pub fn last_authenticated_at(&self) -> Option<DateTime<Utc>> {
        self.last_authenticated_at
    }

    /// Replace whatever session there was with a fresh one.
    pub(crate) fn authenticated(&mut self, cookie: AuthCookie, at: DateTime<Utc>) {
        self.cookie = Some(cookie);
        self.last_authenticated_at = Some(at);
    }

    /// Forget the cookie, e.g. after the router refused to renew it.
    pub(crate) fn invalidate(&mut self) {
        self.cookie = None;
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{AuthCookie, Session, SessionState};

    #[test]
    fn parse_set_cookie() {
        let cookie =
            AuthCookie::from_set_cookie("sysauth=0a1b2c3d4e5f; path=/cgi-bin/luci; HttpOnly")
                .unwrap();
        assert_eq!(cookie.to_string(), "0a1b2c3d4e5f");
        assert_eq!(cookie.header_value(), "sysauth=0a1b2c3d4e5f");

        assert_eq!(
            AuthCookie::from_set_cookie("sysauth=\"quoted\"").map(|c| c.to_string()),
            Some("quoted".to_string())
        );
        assert_eq!(AuthCookie::from_set_cookie("sysauth=; path=/"), None);
        assert_eq!(AuthCookie::from_set_cookie("sysauth_https=abc"), None);
        assert_eq!(AuthCookie::from_set_cookie("lang=en"), None);
        assert_eq!(AuthCookie::from_set_cookie("garbage"), None);
    }

    #[test]
    fn transitions() {
        let mut session = Session::default();
        assert_eq!(session.state(), SessionState::Unauthenticated);
        assert_eq!(session.last_authenticated_at(), None);

        let now = Utc::now();
        session.authenticated(AuthCookie::from_set_cookie("sysauth=one").unwrap(), now);
        session.authenticated(AuthCookie::from_set_cookie("sysauth=two").unwrap(), now);
        assert_eq!(session.state(), SessionState::Authenticated);
        assert_eq!(session.cookie().map(|c| c.to_string()).as_deref(), Some("two"));
        assert_eq!(session.last_authenticated_at(), Some(now));

        session.invalidate();
        assert_eq!(session.state(), SessionState::Unauthenticated);
        assert_eq!(session.cookie(), None);
    }
}
