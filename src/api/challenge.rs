//! Parse the login form and build the request body for the challenge-response
//! login used by the router's web interface.
//!
//! The router hashes the password in the browser before submitting the form:
//!
//! ```js
//! if ($("input[name='salt']").length > 0) {
//!     pw = sha256(pw + salt);
//!     if ($("input[name='token']").length > 0) {
//!         pw = sha256(pw + token);
//!     }
//! }
//! ```

use sha2::{Digest, Sha256};
use url::form_urlencoded;

use crate::html::FormFields;

/// Hidden fields of the login form that feed into the login request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginChallenge {
    /// `<input name="_csrf">`
    pub csrf_token: Option<String>,
    /// `<input name="token">`
    pub token: Option<String>,
    /// `<input name="salt">`
    pub salt: Option<String>,
}

impl LoginChallenge {
    /// `None` if the page has no form fields at all, which means it isn't a
    /// login page.
    pub fn from_html(html: &str) -> Option<LoginChallenge> {
        let fields = FormFields::parse(html);
        if fields.is_empty() {
            return None;
        }

        let field = |name: &str| fields.non_empty(name).map(str::to_string);
        Some(LoginChallenge {
            csrf_token: field("_csrf"),
            token: field("token"),
            salt: field("salt"),
        })
    }

    pub fn strategy(&self) -> HashStrategy<'_> {
        match (self.salt.as_deref(), self.token.as_deref()) {
            (None, _) => HashStrategy::Plain,
            (Some(salt), None) => HashStrategy::Salted { salt },
            (Some(salt), Some(token)) => HashStrategy::SaltedWithToken { salt, token },
        }
    }
}

/// How the password is transformed before it's sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashStrategy<'a> {
    /// No salt on the page, the password goes out as is
    Plain,
    /// `sha256(password + salt)`
    Salted { salt: &'a str },
    /// `sha256(sha256(password + salt) + token)`
    SaltedWithToken { salt: &'a str, token: &'a str },
}

impl HashStrategy<'_> {
    pub fn apply(&self, password: &str) -> String {
        match *self {
            HashStrategy::Plain => password.to_string(),
            HashStrategy::Salted { salt } => sha256_hex(password, salt),
            HashStrategy::SaltedWithToken { salt, token } => {
                sha256_hex(&sha256_hex(password, salt), token)
            }
        }
    }
}

fn sha256_hex(text: &str, suffix: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.update(suffix.as_bytes());
    hex::encode(hasher.finalize())
}

/// Form-encoded body for the login `POST`.
///
/// `unix_time_ms` is converted to whole seconds for `timeclock`, which is
/// what the browser sends.
pub fn compute_login_body(
    username: &str,
    password: &str,
    challenge: &LoginChallenge,
    timezone_name: &str,
    unix_time_ms: i64,
) -> String {
    let transmitted = challenge.strategy().apply(password);
    let timeclock = (unix_time_ms / 1000).to_string();

    let mut body = form_urlencoded::Serializer::new(String::new());
    if let Some(csrf) = challenge.csrf_token.as_deref() {
        body.append_pair("_csrf", csrf);
    }
    if let Some(token) = challenge.token.as_deref() {
        body.append_pair("token", token);
    }
    if let Some(salt) = challenge.salt.as_deref() {
        body.append_pair("salt", salt);
    }
    body.append_pair("zonename", timezone_name)
        .append_pair("timeclock", &timeclock)
        .append_pair("luci_username", username)
        .append_pair("luci_password", &transmitted)
        .append_pair("luci_language", "en");
    body.finish()
}

#[cfg(test)]
mod tests {
    use super::{compute_login_body, HashStrategy, LoginChallenge};

    // sha256("abcxyz")
    const SALTED: &str = "f312795e322c87461a6f3c49e09897c59ca0d5a36245d2a00f08cbc66eee976d";
    // sha256(SALTED + "tok")
    const SALTED_WITH_TOKEN: &str =
        "aebca70e9e4cc620f61efa65480f97802bc06d1db0d0e97973ebd84e016075fd";

    fn challenge(salt: &str, token: &str) -> LoginChallenge {
        let html = format!(
            r#"<form><input name="salt" value="{salt}"><input name="token" value="{token}"></form>"#
        );
        LoginChallenge::from_html(&html).unwrap()
    }

    #[test]
    fn hash_rounds() {
        let plain = challenge("", "");
        assert_eq!(plain.strategy(), HashStrategy::Plain);
        assert_eq!(plain.strategy().apply("abc"), "abc");

        let token_only = challenge("", "tok");
        assert_eq!(token_only.strategy(), HashStrategy::Plain);

        let salted = challenge("xyz", "");
        assert_eq!(salted.strategy(), HashStrategy::Salted { salt: "xyz" });
        assert_eq!(salted.strategy().apply("abc"), SALTED);

        let both = challenge("xyz", "tok");
        assert_eq!(both.strategy().apply("abc"), SALTED_WITH_TOKEN);
    }

    #[test]
    fn parse_login_page() {
        const PAGE: &str = r#"
<html><body>
<form method="post" action="/cgi-bin/luci">
  <input type="hidden" name="_csrf" value="8f1e">
  <input type="hidden" name="token" value="tok">
  <input type="hidden" name="salt" value="xyz">
  <input type="hidden" name="zonename" value="">
  <input type="hidden" name="timeclock" value="">
  <input type="text" name="luci_username" value="admin">
  <input type="password" id="luci_password2">
  <input type="hidden" name="luci_password">
</form>
</body></html>"#;

        let challenge = LoginChallenge::from_html(PAGE).unwrap();
        assert_eq!(
            challenge,
            LoginChallenge {
                csrf_token: Some("8f1e".into()),
                token: Some("tok".into()),
                salt: Some("xyz".into()),
            }
        );

        assert_eq!(LoginChallenge::from_html("<p>Welcome</p>"), None);
    }

    #[test]
    fn login_body() {
        let both = LoginChallenge {
            csrf_token: Some("c/s+rf".into()),
            token: Some("tok".into()),
            salt: Some("xyz".into()),
        };
        let body = compute_login_body("ad min", "abc", &both, "Europe/Berlin", 1_700_000_000_123);
        assert_eq!(
            body,
            format!(
                "_csrf=c%2Fs%2Brf&token=tok&salt=xyz&zonename=Europe%2FBerlin\
                 &timeclock=1700000000&luci_username=ad+min\
                 &luci_password={SALTED_WITH_TOKEN}&luci_language=en"
            )
        );

        let none = LoginChallenge::default();
        let body = compute_login_body("admin", "p&ss", &none, "UTC", 5_999);
        assert_eq!(
            body,
            "zonename=UTC&timeclock=5&luci_username=admin&luci_password=p%26ss&luci_language=en"
        );
    }
}
