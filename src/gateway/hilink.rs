//! Client for the HiLink web API exposed by Huawei USB dongles.
//!
//! Requests and responses are small XML documents. Every POST must carry a
//! single-use `__RequestVerificationToken` together with the `SessionID`
//! cookie; both come from `/api/webserver/SesTokInfo` and are rotated through
//! response headers after a login.

use crate::error::{RelayError, Result};
use crate::gateway::DeviceApi;
use crate::types::{InboundSms, LoginState, ReadState, SessionTokenInfo, SmsCount};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::header::{HeaderMap, CONTENT_TYPE, COOKIE, SET_COOKIE};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

const XML_HEAD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;
const TOKEN_HEADER: &str = "__RequestVerificationToken";
const ROTATED_TOKEN_HEADER: &str = "__requestverificationtokenone";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=UTF-8";

/// Password type 4: salted SHA-256 keyed by the verification token.
const PASSWORD_TYPE: u8 = 4;

#[derive(Debug, Default)]
struct AuthTokens {
    cookie: Option<String>,
    token: Option<String>,
}

pub struct HilinkClient {
    http: Client,
    base_url: String,
    timeout: Duration,
    auth: Mutex<AuthTokens>,
}

#[derive(Debug, Deserialize)]
struct SesTokInfoResponse {
    #[serde(rename = "SesInfo")]
    ses_info: String,
    #[serde(rename = "TokInfo")]
    tok_info: String,
}

#[derive(Debug, Deserialize)]
struct LoginStateResponse {
    #[serde(rename = "State")]
    state: i32,
    #[serde(rename = "Username", default)]
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SmsCountResponse {
    #[serde(rename = "LocalUnread", default)]
    local_unread: u32,
    #[serde(rename = "LocalInbox", default)]
    local_inbox: u32,
}

#[derive(Debug, Deserialize)]
struct SmsListResponse {
    #[serde(rename = "Messages", default)]
    messages: MessageList,
}

#[derive(Debug, Default, Deserialize)]
struct MessageList {
    #[serde(rename = "Message", default)]
    items: Vec<RawMessage>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(rename = "Smstat")]
    smstat: i32,
    #[serde(rename = "Index")]
    index: String,
    #[serde(rename = "Phone", default)]
    phone: String,
    #[serde(rename = "Content", default)]
    content: String,
    #[serde(rename = "Date", default)]
    date: String,
}

impl From<RawMessage> for InboundSms {
    fn from(raw: RawMessage) -> Self {
        InboundSms {
            id: raw.index,
            phone: raw.phone,
            content: raw.content,
            date: raw.date,
            status: if raw.smstat == 0 {
                ReadState::Unread
            } else {
                ReadState::Read
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    code: i64,
    #[serde(default)]
    message: Option<String>,
}

/// Encodes the admin password the way the login form of password type 4 does.
pub fn encode_password(username: &str, password: &str, token: &str) -> String {
    let inner = BASE64.encode(format!("{:x}", Sha256::digest(password.as_bytes())));
    let salted = format!("{username}{inner}{token}");
    BASE64.encode(format!("{:x}", Sha256::digest(salted.as_bytes())))
}

fn parse_xml<T: DeserializeOwned>(body: &str) -> Result<T> {
    quick_xml::de::from_str(body)
        .map_err(|err| RelayError::Protocol(format!("unexpected gateway response: {err}")))
}

/// The serde reader trims text nodes, so message bodies are read again
/// verbatim in document order.
fn raw_contents(body: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(body);
    let mut contents = Vec::new();
    let mut current: Option<String> = None;
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"Content" => {
                current = Some(String::new());
            }
            Ok(Event::Empty(ref e)) if e.name().as_ref() == b"Content" => {
                contents.push(String::new());
            }
            Ok(Event::Text(text)) => {
                if let Some(buf) = current.as_mut() {
                    let text = text
                        .unescape()
                        .map_err(|err| RelayError::Protocol(format!("bad message text: {err}")))?;
                    buf.push_str(&text);
                }
            }
            Ok(Event::CData(data)) => {
                if let Some(buf) = current.as_mut() {
                    buf.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"Content" => {
                if let Some(buf) = current.take() {
                    contents.push(buf);
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                return Err(RelayError::Protocol(format!(
                    "unexpected gateway response: {err}"
                )))
            }
            Ok(_) => {}
        }
    }
    Ok(contents)
}

fn parse_message_list(body: &str) -> Result<Vec<InboundSms>> {
    let list: SmsListResponse = parse_xml(body)?;
    let mut items = list.messages.items;
    let contents = raw_contents(body)?;
    if contents.len() == items.len() {
        for (item, content) in items.iter_mut().zip(contents) {
            item.content = content;
        }
    }
    Ok(items.into_iter().map(InboundSms::from).collect())
}

/// Turns an `<error>` document into a typed error.
fn check_error(body: &str) -> Result<()> {
    if !body.contains("<error>") {
        return Ok(());
    }
    let err: ErrorResponse = parse_xml(body)?;
    Err(RelayError::Gateway {
        code: err.code,
        message: err.message.unwrap_or_default(),
    })
}

fn is_ok_response(body: &str) -> bool {
    let compact: String = body.split_whitespace().collect();
    compact.contains("<response>OK</response>")
}

fn first_token(value: &str) -> Option<String> {
    value
        .split('#')
        .map(str::trim)
        .find(|t| !t.is_empty())
        .map(str::to_string)
}

impl HilinkClient {
    pub fn new(http: Client, base_url: &str, timeout: Duration) -> Result<Self> {
        let parsed = reqwest::Url::parse(base_url)
            .map_err(|err| RelayError::Config(format!("invalid gateway url {base_url}: {err}")))?;
        Ok(Self {
            http,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            timeout,
            auth: Mutex::new(AuthTokens::default()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn cookie(&self) -> Option<String> {
        self.auth.lock().await.cookie.clone()
    }

    /// Stores tokens rotated by the gateway in response headers.
    async fn absorb_headers(&self, headers: &HeaderMap) {
        let token = headers
            .get(ROTATED_TOKEN_HEADER)
            .or_else(|| headers.get(TOKEN_HEADER))
            .and_then(|v| v.to_str().ok())
            .and_then(first_token);
        let cookie = headers
            .get(SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::trim)
            .filter(|c| c.starts_with("SessionID="))
            .map(str::to_string);

        if token.is_none() && cookie.is_none() {
            return;
        }
        let mut auth = self.auth.lock().await;
        if let Some(token) = token {
            auth.token = Some(token);
        }
        if let Some(cookie) = cookie {
            auth.cookie = Some(cookie);
        }
    }

    /// Fetches `SesTokInfo`. With `reset` the current cookie is dropped so the
    /// gateway hands out a brand new session.
    async fn fetch_session(&self, reset: bool) -> Result<SessionTokenInfo> {
        let cookie = if reset { None } else { self.cookie().await };
        let mut req = self
            .http
            .get(self.endpoint("/api/webserver/SesTokInfo"))
            .timeout(self.timeout);
        if let Some(cookie) = cookie.as_ref() {
            req = req.header(COOKIE, cookie);
        }
        let body = req.send().await?.error_for_status()?.text().await?;
        check_error(&body)?;
        let info: SesTokInfoResponse = parse_xml(&body)?;

        let mut auth = self.auth.lock().await;
        auth.token = Some(info.tok_info.clone());
        if reset || auth.cookie.is_none() {
            auth.cookie = Some(info.ses_info.clone());
        }
        Ok(SessionTokenInfo {
            session: info.ses_info,
            token: info.tok_info,
        })
    }

    async fn get_xml(&self, path: &str) -> Result<String> {
        let mut req = self.http.get(self.endpoint(path)).timeout(self.timeout);
        if let Some(cookie) = self.cookie().await {
            req = req.header(COOKIE, cookie);
        }
        let resp = req.send().await?.error_for_status()?;
        self.absorb_headers(resp.headers()).await;
        let body = resp.text().await?;
        check_error(&body)?;
        Ok(body)
    }

    /// Takes the stored verification token, fetching a fresh one when the
    /// previous request already consumed it.
    async fn take_token(&self) -> Result<String> {
        if let Some(token) = self.auth.lock().await.token.take() {
            return Ok(token);
        }
        self.fetch_session(false).await?;
        self.auth
            .lock()
            .await
            .token
            .take()
            .ok_or_else(|| RelayError::Protocol("gateway issued no verification token".to_string()))
    }

    async fn post_xml(&self, path: &str, body: String) -> Result<String> {
        let token = self.take_token().await?;
        self.post_xml_with_token(path, body, &token).await
    }

    async fn post_xml_with_token(&self, path: &str, body: String, token: &str) -> Result<String> {
        debug!(path, "gateway request");
        let mut req = self
            .http
            .post(self.endpoint(path))
            .timeout(self.timeout)
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .header(TOKEN_HEADER, token)
            .body(body);
        if let Some(cookie) = self.cookie().await {
            req = req.header(COOKIE, cookie);
        }
        let resp = req.send().await?.error_for_status()?;
        self.absorb_headers(resp.headers()).await;
        let text = resp.text().await?;
        check_error(&text)?;
        Ok(text)
    }
}

#[async_trait]
impl DeviceApi for HilinkClient {
    async fn login(&self, username: &str, password: &str) -> Result<bool> {
        let session = self.fetch_session(true).await?;
        let token = self.take_token().await?;
        let body = format!(
            "{XML_HEAD}<request><Username>{}</Username><Password>{}</Password><password_type>{PASSWORD_TYPE}</password_type></request>",
            escape(username),
            encode_password(username, password, &session.token),
        );
        match self.post_xml_with_token("/api/user/login", body, &token).await {
            Ok(resp) => Ok(is_ok_response(&resp)),
            Err(RelayError::Gateway { code, .. }) if (108001..=108007).contains(&code) => Err(
                RelayError::Authentication(format!("gateway rejected the admin login ({code})")),
            ),
            Err(err) => Err(err),
        }
    }

    async fn login_state(&self) -> Result<LoginState> {
        let body = self.get_xml("/api/user/state-login").await?;
        let resp: LoginStateResponse = parse_xml(&body)?;
        Ok(LoginState {
            state: resp.state,
            username: resp.username.filter(|u| !u.is_empty()),
        })
    }

    async fn session_token_info(&self) -> Result<SessionTokenInfo> {
        self.fetch_session(false).await
    }

    async fn unread_count(&self) -> Result<SmsCount> {
        let body = self.get_xml("/api/sms/sms-count").await?;
        let resp: SmsCountResponse = parse_xml(&body)?;
        Ok(SmsCount {
            inbox_unread: resp.local_unread,
            inbox_total: resp.local_inbox,
        })
    }

    async fn list_messages(&self, page: u32, page_size: u32) -> Result<Vec<InboundSms>> {
        let body = format!(
            "{XML_HEAD}<request><PageIndex>{page}</PageIndex><ReadCount>{page_size}</ReadCount><BoxType>1</BoxType><SortType>0</SortType><Ascending>0</Ascending><UnreadPreferred>1</UnreadPreferred></request>"
        );
        let resp = self.post_xml("/api/sms/sms-list", body).await?;
        parse_message_list(&resp)
    }

    async fn mark_read(&self, id: &str) -> Result<()> {
        let body = format!("{XML_HEAD}<request><Index>{}</Index></request>", escape(id));
        let resp = self.post_xml("/api/sms/set-read", body).await?;
        if !is_ok_response(&resp) {
            return Err(RelayError::Protocol(format!("set-read for {id} not acknowledged")));
        }
        Ok(())
    }

    async fn send_message(&self, phone: &str, content: &str) -> Result<()> {
        let date = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        let body = format!(
            "{XML_HEAD}<request><Index>-1</Index><Phones><Phone>{}</Phone></Phones><Sca></Sca><Content>{}</Content><Length>{}</Length><Reserved>1</Reserved><Date>{date}</Date></request>",
            escape(phone),
            escape(content),
            content.chars().count(),
        );
        let resp = self.post_xml("/api/sms/send-sms", body).await?;
        if !is_ok_response(&resp) {
            return Err(RelayError::Protocol("send-sms not acknowledged".to_string()));
        }
        Ok(())
    }
}
