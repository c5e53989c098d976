use std::{env, path::PathBuf, time::Duration};

use url::Url;

use crate::error::{ClientError, Result};

pub const MAX_ATTACHMENTS: usize = 5;
pub const MAX_ATTACHMENT_BYTES: u64 = 10 * 1024 * 1024;
pub const TYPING_WINDOW: Duration = Duration::from_secs(3);
pub const TOAST_TTL: Duration = Duration::from_secs(4);

const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_WS_URL: &str = "ws://127.0.0.1:9001/ws";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 20;
const DEFAULT_PAGE_SIZE: u32 = 50;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: Url,
    pub ws_url: Url,
    pub db_path: PathBuf,
    pub http_timeout: Duration,
    pub page_size: u32,
}

pub fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("skillsync")
        .join("session.db")
}

fn parse_number<T: std::str::FromStr + Default + PartialEq>(key: &str, raw: &str) -> Result<T> {
    match raw.trim().parse::<T>() {
        Ok(value) if value != T::default() => Ok(value),
        _ => Err(ClientError::Config(format!(
            "{key} must be a positive number, got {raw:?}"
        ))),
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(non_empty_env)
    }

    /// Resolves every setting through `lookup`, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_url = Url::parse(
            &lookup("SKILLSYNC_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        )?;
        let ws_url =
            Url::parse(&lookup("SKILLSYNC_WS_URL").unwrap_or_else(|| DEFAULT_WS_URL.to_string()))?;
        if !matches!(ws_url.scheme(), "ws" | "wss") {
            return Err(ClientError::Config(format!(
                "SKILLSYNC_WS_URL must use ws:// or wss://, got {ws_url}"
            )));
        }
        if api_url.cannot_be_a_base() || ws_url.cannot_be_a_base() {
            return Err(ClientError::Config("service URLs must be absolute".to_string()));
        }
        let db_path = lookup("SKILLSYNC_DB")
            .map(PathBuf::from)
            .unwrap_or_else(default_db_path);
        let http_timeout = match lookup("SKILLSYNC_HTTP_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_number("SKILLSYNC_HTTP_TIMEOUT_SECS", &raw)?),
            None => Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        };
        let page_size = match lookup("SKILLSYNC_PAGE_SIZE") {
            Some(raw) => parse_number::<u32>("SKILLSYNC_PAGE_SIZE", &raw)?,
            None => DEFAULT_PAGE_SIZE,
        };
        Ok(Self {
            api_url,
            ws_url,
            db_path,
            http_timeout,
            page_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = ClientConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.api_url.as_str(), "http://127.0.0.1:8000/");
        assert_eq!(config.ws_url.scheme(), "ws");
        assert_eq!(config.page_size, 50);
        assert_eq!(config.http_timeout, Duration::from_secs(20));
    }

    #[test]
    fn overrides_are_read() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("SKILLSYNC_API_URL", "https://api.skillsync.test"),
            ("SKILLSYNC_PAGE_SIZE", "20"),
            ("SKILLSYNC_DB", "/tmp/ss.db"),
        ]))
        .unwrap();
        assert_eq!(config.api_url.host_str(), Some("api.skillsync.test"));
        assert_eq!(config.page_size, 20);
        assert_eq!(config.db_path, PathBuf::from("/tmp/ss.db"));
    }

    #[test]
    fn rejects_http_realtime_url() {
        let err = ClientConfig::from_lookup(lookup_from(&[("SKILLSYNC_WS_URL", "http://x/ws")]))
            .unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn rejects_zero_timeout_and_page_size() {
        for key in ["SKILLSYNC_HTTP_TIMEOUT_SECS", "SKILLSYNC_PAGE_SIZE"] {
            let err = ClientConfig::from_lookup(lookup_from(&[(key, "0")])).unwrap_err();
            assert!(matches!(err, ClientError::Config(_)), "{key} accepted 0");
        }
    }

    #[test]
    fn rejects_garbage_numbers() {
        let err =
            ClientConfig::from_lookup(lookup_from(&[("SKILLSYNC_HTTP_TIMEOUT_SECS", "soon")]))
                .unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }
}
