use std::fmt;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Missing or expired bearer token. Always ends the session.
    #[error("not authenticated")]
    Unauthorized,
    #[error("request failed (HTTP {status}): {message}")]
    Http { status: u16, message: String },
    #[error("network error: {0}")]
    Transport(String),
    #[error("invalid response: {0}")]
    Decode(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("session storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("realtime channel error: {0}")]
    Realtime(String),
}

impl ClientError {
    pub fn is_auth(&self) -> bool {
        matches!(self, ClientError::Unauthorized)
    }
}

impl From<ureq::Error> for ClientError {
    fn from(err: ureq::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::Config(err.to_string())
    }
}

impl From<tungstenite::Error> for ClientError {
    fn from(err: tungstenite::Error) -> Self {
        ClientError::Realtime(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Why a single staged file was refused. Reported per file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    TooMany { limit: usize },
    TooLarge { size: u64, limit: u64 },
    UnsupportedType,
    Unreadable(String),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::TooMany { limit } => write!(f, "at most {limit} files per message"),
            RejectReason::TooLarge { size, limit } => {
                write!(f, "{} exceeds the {} limit", human_size(*size), human_size(*limit))
            }
            RejectReason::UnsupportedType => write!(f, "only PDF, JPEG, PNG, DOC and DOCX are allowed"),
            RejectReason::Unreadable(detail) => write!(f, "could not read file: {detail}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRejection {
    pub name: String,
    pub reason: RejectReason,
}

impl fmt::Display for AttachmentRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.reason)
    }
}

pub fn human_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;
    if bytes >= MIB {
        format!("{:.1} MB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unauthorized_is_auth() {
        assert!(ClientError::Unauthorized.is_auth());
        assert!(!ClientError::Http {
            status: 403,
            message: "forbidden".to_string()
        }
        .is_auth());
        assert!(!ClientError::Transport("reset".to_string()).is_auth());
    }

    #[test]
    fn rejection_names_the_file() {
        let rejection = AttachmentRejection {
            name: "scan.tiff".to_string(),
            reason: RejectReason::UnsupportedType,
        };
        assert!(rejection.to_string().starts_with("scan.tiff: "));
    }

    #[test]
    fn sizes_are_human_readable() {
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(10 * 1024 * 1024), "10.0 MB");
    }
}
