use std::{fmt, time::Duration};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use serde_json::Value;
use url::Url;
use uuid::Uuid;

use crate::{
    config::ClientConfig,
    error::{ClientError, Result},
    model::{AttachmentKind, Message, Role, StagedAttachment, Thread, UserProfile},
    normalize,
    session::Session,
};

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Clone, Serialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: Role,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("email", &self.email)
            .field("full_name", &self.full_name)
            .field("role", &self.role)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRequest {
    pub client_id: Uuid,
    pub receiver_id: i64,
    pub content: String,
    pub job_id: Option<i64>,
    pub attachments: Vec<StagedAttachment>,
}

/// The REST surface the messaging core needs.
pub trait Backend: Send {
    fn login(&self, credentials: &Credentials) -> Result<Session>;
    fn register(&self, registration: &Registration) -> Result<Session>;
    fn current_user(&self, token: &str) -> Result<UserProfile>;
    fn list_threads(&self, token: &str) -> Result<Vec<Thread>>;
    fn conversation(
        &self,
        token: &str,
        me: i64,
        peer_id: i64,
        page: u32,
        limit: u32,
    ) -> Result<Vec<Message>>;
    fn send_message(&self, token: &str, me: i64, request: &SendRequest) -> Result<Message>;
    fn unread_count(&self, token: &str) -> Result<u32>;
}

#[derive(Serialize)]
struct AttachmentUpload<'a> {
    name: &'a str,
    kind: AttachmentKind,
    size: u64,
    content_type: &'a str,
    data: String,
}

#[derive(Serialize)]
struct SendBody<'a> {
    receiver_id: i64,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    job_id: Option<i64>,
    client_id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<AttachmentUpload<'a>>,
}

fn encode_attachment(staged: &StagedAttachment) -> Result<AttachmentUpload<'_>> {
    let bytes = std::fs::read(&staged.path)?;
    Ok(AttachmentUpload {
        name: &staged.name,
        kind: staged.kind,
        size: bytes.len() as u64,
        content_type: staged.content_type,
        data: STANDARD.encode(bytes),
    })
}

fn read_response(url: &Url, mut response: ureq::http::Response<ureq::Body>) -> Result<Value> {
    let status = response.status().as_u16();
    let text = response.body_mut().read_to_string().unwrap_or_default();
    if status == 401 {
        log::warn!("[Api] {url} rejected the token");
        return Err(ClientError::Unauthorized);
    }
    if !(200..300).contains(&status) {
        let message = normalize::error_message(&text);
        log::warn!("[Api] {url} failed: status={status}, message={message}");
        return Err(ClientError::Http { status, message });
    }
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|e| ClientError::Decode(format!("{url}: {e}")))
}

/// Blocking REST client. Run it off the UI thread.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base: Url,
    timeout: Duration,
}

impl ApiClient {
    pub fn new(mut base: Url, timeout: Duration) -> Self {
        // Url::join drops the last segment unless the base ends with a slash.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Self { base, timeout }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.api_url.clone(), config.http_timeout)
    }

    pub fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path.trim_start_matches('/'))?)
    }

    fn get(&self, url: &Url, token: &str) -> Result<Value> {
        log::debug!("[Api] GET {url}");
        let response = ureq::get(url.as_str())
            .header("authorization", &format!("Bearer {token}"))
            .config()
            .timeout_global(Some(self.timeout))
            .http_status_as_error(false)
            .build()
            .call()?;
        read_response(url, response)
    }

    fn post_json<T: Serialize>(&self, url: &Url, token: Option<&str>, body: &T) -> Result<Value> {
        log::debug!("[Api] POST {url}");
        let mut request = ureq::post(url.as_str())
            .header("content-type", "application/json")
            .config()
            .timeout_global(Some(self.timeout))
            .http_status_as_error(false)
            .build();
        if let Some(token) = token {
            request = request.header("authorization", &format!("Bearer {token}"));
        }
        let response = request.send_json(body)?;
        read_response(url, response)
    }

    fn token_for(&self, username: &str, password: &str) -> Result<String> {
        let url = self.endpoint("token")?;
        log::info!("[Api] requesting token for {username}");
        let response = ureq::post(url.as_str())
            .config()
            .timeout_global(Some(self.timeout))
            .http_status_as_error(false)
            .build()
            .send_form([("username", username), ("password", password)])?;
        normalize::access_token(&read_response(&url, response)?)
    }

    fn session_for(&self, token: String) -> Result<Session> {
        let profile = self.current_user(&token)?;
        Ok(Session::from_profile(profile, token))
    }
}

impl Backend for ApiClient {
    fn login(&self, credentials: &Credentials) -> Result<Session> {
        let token = self.token_for(&credentials.username, &credentials.password)?;
        self.session_for(token)
    }

    fn register(&self, registration: &Registration) -> Result<Session> {
        let url = self.endpoint("users/register")?;
        self.post_json(&url, None, registration)?;
        log::info!("[Api] registered {}", registration.email);
        let token = self.token_for(&registration.email, &registration.password)?;
        self.session_for(token)
    }

    fn current_user(&self, token: &str) -> Result<UserProfile> {
        let url = self.endpoint("users/me")?;
        normalize::user(&self.get(&url, token)?)
    }

    fn list_threads(&self, token: &str) -> Result<Vec<Thread>> {
        let url = self.endpoint("api/messages/threads")?;
        Ok(normalize::threads(&self.get(&url, token)?))
    }

    fn conversation(
        &self,
        token: &str,
        me: i64,
        peer_id: i64,
        page: u32,
        limit: u32,
    ) -> Result<Vec<Message>> {
        let mut url = self.endpoint(&format!("api/messages/conversation/{peer_id}"))?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("limit", &limit.to_string());
        Ok(normalize::messages(&self.get(&url, token)?, me))
    }

    fn send_message(&self, token: &str, me: i64, request: &SendRequest) -> Result<Message> {
        let url = self.endpoint("api/messages/send")?;
        let attachments = request
            .attachments
            .iter()
            .map(encode_attachment)
            .collect::<Result<Vec<_>>>()?;
        let body = SendBody {
            receiver_id: request.receiver_id,
            content: &request.content,
            job_id: request.job_id,
            client_id: request.client_id.to_string(),
            attachments,
        };
        let value = self.post_json(&url, Some(token), &body)?;
        let record = value
            .get("message")
            .filter(|inner| inner.is_object())
            .unwrap_or(&value);
        let mut message = normalize::message(record, me).ok_or_else(|| {
            ClientError::Decode("send response is missing message ids".to_string())
        })?;
        message.client_id = Some(request.client_id);
        Ok(message)
    }

    fn unread_count(&self, token: &str) -> Result<u32> {
        let url = self.endpoint("api/messages/unread/count")?;
        Ok(normalize::unread_count(&self.get(&url, token)?))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn endpoints_keep_base_path() {
        let client = ApiClient::new(
            Url::parse("https://host.test/v1").unwrap(),
            Duration::from_secs(1),
        );
        assert_eq!(
            client.endpoint("/api/messages/threads").unwrap().as_str(),
            "https://host.test/v1/api/messages/threads"
        );
    }

    #[test]
    fn credentials_debug_hides_password() {
        let creds = Credentials {
            username: "ada".to_string(),
            password: "hunter2".to_string(),
        };
        assert!(!format!("{creds:?}").contains("hunter2"));
    }

    #[test]
    fn attachments_are_base64_encoded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hello").unwrap();
        let staged = StagedAttachment {
            local_id: Uuid::new_v4(),
            kind: AttachmentKind::File,
            path: file.path().to_path_buf(),
            name: "note.pdf".to_string(),
            size: 5,
            content_type: "application/pdf",
        };
        let upload = encode_attachment(&staged).unwrap();
        assert_eq!(upload.data, "aGVsbG8=");
        assert_eq!(upload.size, 5);
    }

    #[test]
    fn send_body_omits_empty_fields() {
        let body = SendBody {
            receiver_id: 42,
            content: "Hello",
            job_id: None,
            client_id: "c".to_string(),
            attachments: Vec::new(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json, serde_json::json!({"receiver_id": 42, "content": "Hello", "client_id": "c"}));
    }
}
