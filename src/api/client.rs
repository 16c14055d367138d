//! Exposes a `Client` struct to interact with the router's web interface.

use std::time::{Duration, Instant};

use anyhow::Context;
use chrono::{DateTime, Local, Utc};
use parking_lot::Mutex;
use reqwest::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use url::form_urlencoded;

use super::challenge::{compute_login_body, LoginChallenge};
use super::session::{AuthCookie, Session, SessionState};
use crate::decode::devices::{self, DeviceFilter};
use crate::decode::{modem, sms};
use crate::model::{DevicesInfo, ModemInfo, RouterData, Sms, SmsBox, SmsSummary};
use crate::{AuthFailure, Error, Result};

const BASE_PATH: &str = "/cgi-bin/luci";
/// One attempt plus one retry after logging in again
const MAX_ATTEMPTS: usize = 2;
const TIMEOUT: Duration = Duration::from_secs(30);

fn elapsed_ms(start: &Instant) -> i64 {
    start.elapsed().as_millis().min(i64::MAX as u128) as i64
}

pub struct Client {
    /// Use to make requests, never follows redirects
    client: reqwest::Client,
    /// Example: `192.168.10.1` or `192.168.10.1:8080`
    host: String,
    /// Username to log in with
    username: String,
    /// Password to log in with
    password: String,
    /// IANA name sent along with the login, e.g. `Europe/Berlin`
    timezone: String,
    /// Cookie is set once logged in
    session: Mutex<Session>,
}

impl Client {
    /// Create a new client for the router at `host`.
    ///
    /// Parameters that are `None` will be resolved from their environment
    /// variable counterpart. `port` is optional there too, and `CUDY_PORT`
    /// is only used together with `CUDY_HOST`.
    pub fn new(
        host: Option<&str>,
        username: Option<&str>,
        password: Option<&str>,
        port: Option<u16>,
    ) -> anyhow::Result<Client> {
        fn resolve_var(key: &str, default: Option<&str>) -> anyhow::Result<String> {
            match default {
                None => dotenv::var(key).with_context(|| format!("couldn't find env var {}", key)),
                Some(s) => Ok(s.to_string()),
            }
        }

        // CUDY_PORT belongs to CUDY_HOST, an explicit host brings its own port
        let port = match (port, host) {
            (Some(port), _) => Some(port),
            (None, Some(_)) => None,
            (None, None) => match dotenv::var("CUDY_PORT") {
                Ok(port) => Some(port.parse::<u16>().context("parse CUDY_PORT")?),
                Err(_) => None,
            },
        };
        let host = resolve_var("CUDY_HOST", host)?;
        let username = resolve_var("CUDY_USERNAME", username)?;
        let password = resolve_var("CUDY_PASSWORD", password)?;

        let host = match port {
            Some(port) => format!("{}:{}", host, port),
            None => host,
        };

        let timezone = dotenv::var("CUDY_TIMEZONE")
            .ok()
            .or_else(|| iana_time_zone::get_timezone().ok())
            .unwrap_or_else(|| {
                log::warn!("couldn't determine local timezone, logging in as UTC");
                "UTC".to_string()
            });

        let client = reqwest::Client::builder()
            .timeout(TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("invalid http client configuration")?;

        Ok(Client {
            client,
            host,
            username,
            password,
            timezone,
            session: Mutex::new(Session::default()),
        })
    }

    /// Use `timezone` as the login's `zonename` instead of the detected one.
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Client {
        self.timezone = timezone.into();
        self
    }

    /// Example: `http://192.168.10.1/cgi-bin/luci`
    pub fn base_url(&self) -> String {
        format!("http://{}{}", self.host, BASE_PATH)
    }

    /// Example: `client.make_url("admin/network/gcom/status")` will produce
    /// `http://{host}/cgi-bin/luci/admin/network/gcom/status`
    pub fn make_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url(), path.trim_start_matches('/'))
    }

    pub fn state(&self) -> SessionState {
        self.session.lock().state()
    }

    pub fn cookie(&self) -> Option<AuthCookie> {
        self.session.lock().cookie().cloned()
    }

    pub fn last_authenticated_at(&self) -> Option<DateTime<Utc>> {
        self.session.lock().last_authenticated_at()
    }

    /// Send one request and log how it went. Any status is returned as is.
    async fn send_with<F>(&self, name: &str, url: &str, method: Method, func: F) -> Result<Response>
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        let now = Instant::now();
        let builder = func(self.client.request(method.clone(), url));

        let resp = builder
            .send()
            .await
            .map_err(|err| Error::transport(url, err))?;

        log::info!(
            "{} request to {} ({} - {}) took {}ms",
            name,
            url,
            method,
            resp.status().as_u16(),
            elapsed_ms(&now),
        );

        Ok(resp)
    }

    /// Log in and store the new session cookie.
    ///
    /// The router answers the bare admin URL with `403` and its login form
    /// while there is no valid session. Whatever session there was is
    /// dropped if this fails.
    pub async fn authenticate(&self) -> Result<()> {
        self.login().await.map_err(|err| {
            log::error!("couldn't log in to {}: {}", self.host, err);
            err
        })
    }

    async fn login(&self) -> Result<()> {
        let result = self.login_inner().await;
        if result.is_err() {
            self.session.lock().invalidate();
        }
        result
    }

    async fn login_inner(&self) -> Result<()> {
        let url = self.base_url();

        // get the challenge
        let resp = self
            .send_with("login-challenge", &url, Method::GET, |req| req)
            .await?;
        if resp.status() != StatusCode::FORBIDDEN {
            return Err(AuthFailure::NoChallenge.into());
        }
        let text = resp
            .text()
            .await
            .map_err(|err| Error::transport(&url, err))?;
        let challenge = LoginChallenge::from_html(&text).ok_or(AuthFailure::NoChallenge)?;

        // respond with the hashed password
        let body = compute_login_body(
            &self.username,
            &self.password,
            &challenge,
            &self.timezone,
            Utc::now().timestamp_millis(),
        );
        let resp = self
            .send_with("login-response", &url, Method::POST, |req| {
                req.header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(body)
            })
            .await?;

        let status = resp.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(AuthFailure::Rejected(status).into());
        }

        // a successful login redirects and sets the cookie on the way
        let cookie = resp
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(AuthCookie::from_set_cookie)
            .ok_or(AuthFailure::MissingCookie)?;

        self.session.lock().authenticated(cookie, Utc::now());
        log::info!("logged in to {} as {}", self.host, self.username);
        Ok(())
    }

    async fn request_with_inner<F>(
        &self,
        name: &str,
        url: &str,
        method: Method,
        func: &F,
    ) -> Result<String>
    where
        F: Fn(RequestBuilder) -> RequestBuilder,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;

            let cookie = self.session.lock().cookie().map(AuthCookie::header_value);
            let resp = self
                .send_with(name, url, method.clone(), |req| {
                    let req = func(req);
                    match cookie.as_deref() {
                        Some(cookie) => req.header(COOKIE, cookie),
                        None => req,
                    }
                })
                .await?;

            let status = resp.status();
            if status == StatusCode::FORBIDDEN {
                if attempts >= MAX_ATTEMPTS {
                    return Err(AuthFailure::SessionRejected.into());
                }
                log::info!("no valid session for {}, logging in", self.host);
                self.login().await?;
                continue;
            }
            if !status.is_success() {
                return Err(Error::UnexpectedStatus {
                    url: url.to_string(),
                    status,
                });
            }

            return resp.text().await.map_err(|err| Error::transport(url, err));
        }
    }

    /// Request `path` below the base URL with the session cookie attached,
    /// logging in again once if the router rejects the session.
    ///
    /// `func` may run once per attempt.
    async fn request_with<F>(&self, name: &str, path: &str, method: Method, func: F) -> Result<String>
    where
        F: Fn(RequestBuilder) -> RequestBuilder,
    {
        let url = self.make_url(path);
        let resp = self.request_with_inner(name, &url, method, &func).await;
        if let Err(err) = resp.as_ref() {
            log::error!("{} request to {} failed: {}", name, url, err);
        }
        resp
    }

    /// Raw HTML of `path`, relative to the base URL.
    pub async fn get(&self, path: &str) -> Result<String> {
        self.request_with("get", path, Method::GET, |req| req).await
    }

    /// Connected devices. `filter` only limits the list, the statistics
    /// always cover every device.
    pub async fn devices(&self, filter: &DeviceFilter) -> Result<DevicesInfo> {
        let text = self
            .request_with(
                "devices",
                "admin/network/devices/devlist?detail=1",
                Method::GET,
                |req| req,
            )
            .await?;

        DevicesInfo::build(devices::decode(&text), filter)
    }

    /// Cellular status, read from the status page and its detail view.
    pub async fn modem_info(&self) -> Result<ModemInfo> {
        let status = self
            .request_with("modem-status", "admin/network/gcom/status", Method::GET, |req| req)
            .await?;
        let detail = self
            .request_with(
                "modem-detail",
                "admin/network/gcom/status?detail=1",
                Method::GET,
                |req| req,
            )
            .await?;

        let raw = modem::decode(&[&status, &detail], Local::now().naive_local());
        ModemInfo::try_from(raw)
    }

    /// Modem info and devices in one go.
    pub async fn data(&self, filter: &DeviceFilter) -> Result<RouterData> {
        Ok(RouterData {
            modem: self.modem_info().await?,
            devices: self.devices(filter).await?,
        })
    }

    pub async fn sms_summary(&self) -> Result<SmsSummary> {
        let text = self
            .request_with("sms-summary", "admin/network/gcom/sms/status", Method::GET, |req| req)
            .await?;

        SmsSummary::try_from(sms::decode_summary(&text))
    }

    pub async fn sms_list(&self, sms_box: SmsBox) -> Result<Vec<Sms>> {
        let path = format!(
            "admin/network/gcom/sms/smslist?smsbox={}",
            sms_box.query_value()
        );
        let text = self
            .request_with("sms-list", &path, Method::GET, |req| req)
            .await?;

        sms::decode_list(&text, sms_box)
            .into_iter()
            .map(Sms::try_from)
            .collect()
    }

    /// Open a single message by the `cfg` handle from [`Client::sms_list`].
    pub async fn read_sms(&self, cfg: &str, sms_box: Option<SmsBox>) -> Result<Sms> {
        let mut path = format!(
            "admin/network/gcom/sms/readsms?cfg={}",
            form_urlencoded::byte_serialize(cfg.as_bytes()).collect::<String>()
        );
        if let Some(sms_box) = sms_box {
            path.push_str("&smsbox=");
            path.push_str(sms_box.query_value());
        }
        let text = self
            .request_with("sms-read", &path, Method::GET, |req| req)
            .await?;

        let mut raw = sms::decode_message(&text);
        raw.cfg = Some(cfg.to_string());
        raw.sms_box = sms_box;
        Sms::try_from(raw)
    }

    /// `POST` a multipart form to `path`, relative to the base URL.
    pub async fn post_multipart(&self, path: &str, fields: &[(&str, &str)]) -> Result<String> {
        self.request_with("post", path, Method::POST, |req| {
            let form = fields
                .iter()
                .fold(reqwest::multipart::Form::new(), |form, &(name, value)| {
                    form.text(name.to_string(), value.to_string())
                });
            req.multipart(form)
        })
        .await
    }

    /// Send a text message through the modem.
    ///
    /// The router's response page is returned as is, it doesn't report
    /// success in a machine readable way.
    pub async fn send_sms(&self, phone: &str, content: &str) -> Result<String> {
        self.post_multipart(
            "admin/network/gcom/sms/smsnew?nomodal=&iface=4g",
            &[
                ("cbi.submit", "1"),
                ("cbid.smsnew.1.phone", phone),
                ("cbid.smsnew.1.content", content),
                ("cbid.smsnew.1.send", "Send"),
            ],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

    use super::Client;
    use crate::api::SessionState;
    use crate::decode::devices::{tests::DEVLIST, DeviceFilter};
    use crate::decode::sms::tests::LIST;
    use crate::model::SmsBox;
    use crate::{AuthFailure, Error};

    const LOGIN_PAGE: &str = r#"
<html><body>
<form method="post" action="/cgi-bin/luci">
  <input type="hidden" name="_csrf" value="c5rf">
  <input type="hidden" name="token" value="tok1">
  <input type="hidden" name="salt" value="salt1">
  <input type="text" name="luci_username" value="">
  <input type="hidden" name="luci_password">
</form>
</body></html>"#;

    // sha256(sha256("secret" + "salt1") + "tok1")
    const HASHED: &str = "b196286947f360ef0eed88f9272dafe28a99d7037a3f530c3862274e45ce52f9";

    const DEVLIST_PATH: &str = "/cgi-bin/luci/admin/network/devices/devlist";

    fn client(server: &MockServer) -> Client {
        Client::new(
            Some(&server.address().to_string()),
            Some("admin"),
            Some("secret"),
            None,
        )
        .unwrap()
        .with_timezone("UTC")
    }

    fn login_page() -> Mock {
        Mock::given(method("GET"))
            .and(path("/cgi-bin/luci"))
            .respond_with(ResponseTemplate::new(403).set_body_string(LOGIN_PAGE))
    }

    fn login_post() -> MockBuilder {
        Mock::given(method("POST"))
            .and(path("/cgi-bin/luci"))
            .and(body_string_contains(format!("luci_password={HASHED}")))
    }

    fn login_success() -> Mock {
        login_post().respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", "/cgi-bin/luci/")
                .insert_header("set-cookie", "sysauth=cafe; path=/cgi-bin/luci; HttpOnly"),
        )
    }

    fn with_session() -> wiremock::matchers::HeaderExactMatcher {
        header("cookie", "sysauth=cafe")
    }

    #[tokio::test]
    async fn login_stores_cookie() {
        let server = MockServer::start().await;
        login_page().expect(1).mount(&server).await;
        login_post()
            .and(body_string_contains("_csrf=c5rf"))
            .and(body_string_contains("zonename=UTC"))
            .and(body_string_contains("luci_username=admin"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("set-cookie", "sysauth=cafe; path=/cgi-bin/luci; HttpOnly"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        assert_eq!(client.state(), SessionState::Unauthenticated);

        client.authenticate().await.unwrap();
        assert_eq!(client.state(), SessionState::Authenticated);
        assert_eq!(client.cookie().map(|c| c.to_string()).as_deref(), Some("cafe"));
        assert!(client.last_authenticated_at().is_some());
    }

    #[tokio::test]
    async fn login_without_form() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cgi-bin/luci"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>Welcome</p>"))
            .mount(&server)
            .await;

        let err = client(&server).authenticate().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Authentication(AuthFailure::NoChallenge)
        ));
    }

    #[tokio::test]
    async fn forbidden_without_form() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cgi-bin/luci"))
            .respond_with(ResponseTemplate::new(403).set_body_string("<h1>Forbidden</h1>"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/cgi-bin/luci"))
            .respond_with(ResponseTemplate::new(302))
            .expect(0)
            .mount(&server)
            .await;

        let client = client(&server);
        let err = client.authenticate().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Authentication(AuthFailure::NoChallenge)
        ));
        assert_eq!(client.state(), SessionState::Unauthenticated);
    }

    #[test]
    fn explicit_host_keeps_its_port() {
        std::env::set_var("CUDY_PORT", "8080");

        let client = Client::new(Some("127.0.0.1:9000"), Some("admin"), Some("secret"), None)
            .unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:9000/cgi-bin/luci");

        let client = Client::new(Some("192.168.10.1"), Some("admin"), Some("secret"), Some(81))
            .unwrap();
        assert_eq!(
            client.make_url("admin/network/gcom/status"),
            "http://192.168.10.1:81/cgi-bin/luci/admin/network/gcom/status"
        );
    }

    #[tokio::test]
    async fn login_without_cookie() {
        let server = MockServer::start().await;
        login_page().mount(&server).await;
        Mock::given(method("POST"))
            .and(path("/cgi-bin/luci"))
            .respond_with(ResponseTemplate::new(302).insert_header("set-cookie", "sysauth=; path=/"))
            .mount(&server)
            .await;

        let client = client(&server);
        let err = client.authenticate().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Authentication(AuthFailure::MissingCookie)
        ));
        assert_eq!(client.state(), SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn expired_session_logs_in_again() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(DEVLIST_PATH))
            .and(query_param("detail", "1"))
            .and(with_session())
            .respond_with(ResponseTemplate::new(200).set_body_string(DEVLIST))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(DEVLIST_PATH))
            .respond_with(ResponseTemplate::new(403).set_body_string(LOGIN_PAGE))
            .expect(1)
            .mount(&server)
            .await;
        login_page().mount(&server).await;
        login_success().expect(1).mount(&server).await;

        let client = client(&server);
        let info = client.devices(&"*".parse().unwrap()).await.unwrap();
        assert_eq!(client.state(), SessionState::Authenticated);

        assert_eq!(info.device_count, 2);
        let stats = info.stats.unwrap();
        assert_eq!(stats.top_downloader_mac, "AA:BB:CC:00:00:01");
        assert_eq!(stats.top_uploader_mac, "AA:BB:CC:00:00:02");
    }

    #[tokio::test]
    async fn failed_login_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(DEVLIST_PATH))
            .respond_with(ResponseTemplate::new(403).set_body_string(LOGIN_PAGE))
            .expect(1)
            .mount(&server)
            .await;
        login_page().expect(1).mount(&server).await;
        Mock::given(method("POST"))
            .and(path("/cgi-bin/luci"))
            .respond_with(ResponseTemplate::new(403).set_body_string(LOGIN_PAGE))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        let err = client.devices(&DeviceFilter::All).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Authentication(AuthFailure::Rejected(StatusCode::FORBIDDEN))
        ));
        assert_eq!(client.state(), SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn rejected_twice() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(DEVLIST_PATH))
            .respond_with(ResponseTemplate::new(403).set_body_string(LOGIN_PAGE))
            .expect(2)
            .mount(&server)
            .await;
        login_page().mount(&server).await;
        login_success().expect(1).mount(&server).await;

        let err = client(&server)
            .devices(&DeviceFilter::All)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Authentication(AuthFailure::SessionRejected)
        ));
    }

    #[tokio::test]
    async fn server_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cgi-bin/luci/admin/network/gcom/sms/status"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server).sms_summary().await.unwrap_err();
        assert!(matches!(
            err,
            Error::UnexpectedStatus {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn connection_refused() {
        let client = Client::new(Some("127.0.0.1:1"), Some("admin"), Some("secret"), None)
            .unwrap()
            .with_timezone("UTC");

        let err = client.get("admin/network/gcom/status").await.unwrap_err();
        assert!(matches!(err, Error::Transport { .. }));
        assert_eq!(client.state(), SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn sms_roundtrip() {
        let server = MockServer::start().await;
        login_page().mount(&server).await;
        login_success().expect(1).mount(&server).await;
        Mock::given(method("GET"))
            .and(path("/cgi-bin/luci/admin/network/gcom/sms/smslist"))
            .and(query_param("smsbox", "rec"))
            .and(with_session())
            .respond_with(ResponseTemplate::new(200).set_body_string(LIST))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/cgi-bin/luci/admin/network/gcom/sms/readsms"))
            .and(query_param("cfg", "a1b2c3"))
            .and(query_param("smsbox", "rec"))
            .and(with_session())
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<form>
  <input name="cbid.smsread.1.phone" value="+4915112345678">
  <textarea id="cbid.smsread.1.text">Your code is 1234</textarea>
</form>"#,
            ))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/cgi-bin/luci/admin/network/gcom/sms/smsnew"))
            .and(query_param("iface", "4g"))
            .and(with_session())
            .and(body_string_contains("name=\"cbi.submit\""))
            .and(body_string_contains("name=\"cbid.smsnew.1.phone\""))
            .and(body_string_contains("name=\"cbid.smsnew.1.content\""))
            .and(body_string_contains("name=\"cbid.smsnew.1.send\""))
            .and(body_string_contains("Send"))
            .and(body_string_contains("+4915112345678"))
            .and(body_string_contains("see you"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>sent</p>"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        client.authenticate().await.unwrap();

        let inbox = client.sms_list(SmsBox::Inbox).await.unwrap();
        assert_eq!(inbox.len(), 2);
        let cfg = inbox[0].cfg.clone().unwrap();

        let sms = client.read_sms(&cfg, Some(SmsBox::Inbox)).await.unwrap();
        assert_eq!(sms.phone_number, "+4915112345678");
        assert_eq!(sms.text, "Your code is 1234");
        assert_eq!(sms.cfg.as_deref(), Some("a1b2c3"));
        assert_eq!(sms.sms_box, Some(SmsBox::Inbox));
        assert_eq!(sms.index, None);

        let reply = client.send_sms("+4915112345678", "see you").await.unwrap();
        assert_eq!(reply, "<p>sent</p>");
    }
}
