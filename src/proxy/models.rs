//! Proxy data models

use crate::proxy::secret::ValidSecret;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Characters escaped when a server name is written into a canonical link
const SERVER_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b';')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'=')
    .add(b'\'');

/// Secret mode, selected by the two-character secret prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SecretMode {
    #[default]
    Standard,
    /// `dd` prefix, randomized padding
    Secured,
    /// `ee` prefix, fake-TLS with a trailing domain
    Tls,
}

impl fmt::Display for SecretMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretMode::Standard => f.pad("standard"),
            SecretMode::Secured => f.pad("secured"),
            SecretMode::Tls => f.pad("tls"),
        }
    }
}

/// Raw document text for a single channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelDocument {
    pub channel: String,
    pub text: String,
}

impl ChannelDocument {
    pub fn new(channel: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            text: text.into(),
        }
    }

    /// Document standing in for a channel that could not be fetched
    pub fn empty(channel: impl Into<String>) -> Self {
        Self::new(channel, String::new())
    }
}

/// A validated proxy endpoint.
///
/// Records are only built from a [`ValidSecret`], so the secret is always
/// lowercase hex of a length valid for its mode, and the canonical link is
/// always rebuilt from the validated fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProxyRecord {
    server: String,
    port: u16,
    secret: String,
    secret_mode: SecretMode,
    canonical_uri: String,
}

impl ProxyRecord {
    pub fn new(server: String, port: u16, secret: ValidSecret) -> Self {
        let (secret, secret_mode) = secret.into_parts();
        let canonical_uri = format!(
            "tg://proxy?server={}&port={}&secret={}",
            utf8_percent_encode(&server, SERVER_ENCODE_SET),
            port,
            secret
        );

        Self {
            server,
            port,
            secret,
            secret_mode,
            canonical_uri,
        }
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn secret_mode(&self) -> SecretMode {
        self.secret_mode
    }

    pub fn canonical_uri(&self) -> &str {
        &self.canonical_uri
    }

    /// Identity key in `server:port` form
    pub fn identity(&self) -> String {
        format!("{}:{}", self.server, self.port)
    }
}

impl fmt::Display for ProxyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical_uri)
    }
}

/// Liveness classification of a probed proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    /// Connected and echoed at least one byte back
    Online,
    /// Accepted the TCP connection but never answered the payload
    Unstable,
    Offline,
}

impl ProbeStatus {
    pub fn is_online(&self) -> bool {
        matches!(self, ProbeStatus::Online)
    }
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeStatus::Online => f.pad("online"),
            ProbeStatus::Unstable => f.pad("unstable"),
            ProbeStatus::Offline => f.pad("offline"),
        }
    }
}

/// Result of probing a single proxy record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeOutcome {
    pub record: ProxyRecord,
    pub status: ProbeStatus,
    /// Connect latency; `None` when no connection completed before the deadline
    pub latency_ms: Option<u64>,
}

impl ProbeOutcome {
    pub fn online(record: ProxyRecord, latency_ms: u64) -> Self {
        Self {
            record,
            status: ProbeStatus::Online,
            latency_ms: Some(latency_ms),
        }
    }

    pub fn unstable(record: ProxyRecord, latency_ms: u64) -> Self {
        Self {
            record,
            status: ProbeStatus::Unstable,
            latency_ms: Some(latency_ms),
        }
    }

    pub fn offline(record: ProxyRecord) -> Self {
        Self {
            record,
            status: ProbeStatus::Offline,
            latency_ms: None,
        }
    }

    pub fn is_online(&self) -> bool {
        self.status.is_online()
    }
}
