//! Link extractor for pulling proxy links out of scraped channel text

use crate::proxy::models::ProxyRecord;
use crate::proxy::secret::SecretValidator;
use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use regex::Regex;

/// Matches `https://host/proxy?...` and `scheme://proxy?...` and captures
/// everything after `proxy?` up to whitespace, a quote or a tag bracket.
static PROXY_LINK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(?:https?://[^\s"'<>/?]+/|\b[a-z][a-z0-9+.\-]*://)proxy\?([^\s"'<>]+)"#)
        .expect("Invalid proxy link regex")
});

/// Matches `key=value` pairs separated by any of `& ; ? #` or whitespace.
/// A value also ends at `)` or `,`, which only appear around links in prose.
static PARAM_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|[&;?#\s])(server|port|secret)=([^&;?#\s),]*)")
        .expect("Invalid proxy parameter regex")
});

/// Raw, undecoded-by-type parameters of a matched proxy link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLink {
    pub server: String,
    pub port: String,
    pub secret: String,
}

impl RawLink {
    /// Validate the link and build a record, or `None` if any part is invalid
    pub fn into_record(self) -> Option<ProxyRecord> {
        let port: u16 = self.port.parse().ok()?;
        let secret = SecretValidator::validate(&self.secret)?;
        Some(ProxyRecord::new(self.server, port, secret))
    }
}

/// Lazy iterator over the proxy links of one document
pub struct RawLinks {
    text: String,
    offset: usize,
}

impl Iterator for RawLinks {
    type Item = RawLink;

    fn next(&mut self) -> Option<RawLink> {
        while self.offset < self.text.len() {
            let caps = PROXY_LINK_REGEX.captures_at(&self.text, self.offset)?;
            let whole = caps.get(0)?;
            self.offset = whole.end();

            if let Some(link) = caps.get(1).and_then(|params| LinkExtractor::parse_params(params.as_str())) {
                return Some(link);
            }
        }
        None
    }
}

/// Extractor for proxy links embedded in arbitrary text
pub struct LinkExtractor;

impl LinkExtractor {
    /// Extract all proxy links from a document.
    ///
    /// HTML entities are decoded first, since separators are usually
    /// escaped as `&amp;` in scraped markup. Links missing any of `server`,
    /// `port` or `secret` are skipped.
    pub fn extract(text: &str) -> RawLinks {
        RawLinks {
            text: html_escape::decode_html_entities(text).into_owned(),
            offset: 0,
        }
    }

    /// Extract links and keep only the ones that validate
    pub fn extract_records(text: &str) -> impl Iterator<Item = ProxyRecord> {
        Self::extract(text).filter_map(RawLink::into_record)
    }

    /// Parse a single proxy link
    pub fn parse_link(link: &str) -> Option<RawLink> {
        Self::extract(link.trim()).next()
    }

    /// Parse the parameter portion of a link, in any order.
    ///
    /// The first occurrence of each key wins. Values are percent-decoded and
    /// trimmed; an empty value counts as missing.
    fn parse_params(params: &str) -> Option<RawLink> {
        let mut server = None;
        let mut port = None;
        let mut secret = None;

        for caps in PARAM_REGEX.captures_iter(params) {
            let raw = trim_prose_punctuation(&caps[2]);
            let value = percent_decode_str(raw).decode_utf8_lossy().trim().to_string();
            if value.is_empty() {
                continue;
            }

            let slot = match caps[1].to_ascii_lowercase().as_str() {
                "server" => &mut server,
                "port" => &mut port,
                _ => &mut secret,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }

        Some(RawLink {
            server: server?,
            port: port?,
            secret: secret?,
        })
    }
}

/// Drop punctuation a sentence leaves glued to the end of a link: one
/// trailing `.` and a `]` with no matching `[`.
fn trim_prose_punctuation(value: &str) -> &str {
    let value = value.strip_suffix('.').unwrap_or(value);
    match value.strip_suffix(']') {
        Some(inner) if !inner.contains('[') => inner,
        _ => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "dd0123456789abcdef0123456789abcd";

    #[test]
    fn test_extract_native_scheme() {
        let text = format!("Fast proxy: tg://proxy?server=1.2.3.4&port=443&secret={SECRET} enjoy");
        let links: Vec<_> = LinkExtractor::extract(&text).collect();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].server, "1.2.3.4");
        assert_eq!(links[0].port, "443");
        assert_eq!(links[0].secret, SECRET);
    }

    #[test]
    fn test_extract_web_form_with_entities() {
        let text = format!(
            r#"<a href="https://t.me/proxy?server=proxy.example.com&amp;port=8443&amp;secret={SECRET}">Connect</a>"#
        );
        let link = LinkExtractor::extract(&text).next().unwrap();
        assert_eq!(link.server, "proxy.example.com");
        assert_eq!(link.port, "8443");
    }

    #[test]
    fn test_extract_any_parameter_order() {
        let text = format!("tg://proxy?secret={SECRET}&port=443&server=5.6.7.8");
        let link = LinkExtractor::parse_link(&text).unwrap();
        assert_eq!(link.server, "5.6.7.8");
        assert_eq!(link.port, "443");
        assert_eq!(link.secret, SECRET);
    }

    #[test]
    fn test_extract_percent_decodes_and_trims() {
        let text = format!("tg://proxy?server=%20host.example%2Ecom&port=%34%34%33&secret={SECRET}");
        let link = LinkExtractor::parse_link(&text).unwrap();
        assert_eq!(link.server, "host.example.com");
        assert_eq!(link.port, "443");
    }

    #[test]
    fn test_extract_tolerates_double_escaped_separators() {
        let text = format!("https://t.me/proxy?server=1.2.3.4&amp;amp;port=443&amp;amp;secret={SECRET}");
        let link = LinkExtractor::parse_link(&text).unwrap();
        assert_eq!(link.server, "1.2.3.4");
        assert_eq!(link.port, "443");
        assert_eq!(link.secret, SECRET);
    }

    #[test]
    fn test_extract_skips_missing_parameters() {
        let text = format!(
            "tg://proxy?server=1.2.3.4&port=443\n\
             tg://proxy?server=1.2.3.4&secret={SECRET}\n\
             tg://proxy?server=&port=443&secret={SECRET}\n\
             tg://proxy?server=9.9.9.9&port=443&secret={SECRET}"
        );
        let links: Vec<_> = LinkExtractor::extract(&text).collect();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].server, "9.9.9.9");
    }

    #[test]
    fn test_extract_multiple_in_document_order() {
        let text = format!(
            "<p>tg://proxy?server=a.example&port=1&secret={SECRET}</p>\
             <p>https://t.me/proxy?server=b.example&port=2&secret={SECRET}</p>"
        );
        let servers: Vec<_> = LinkExtractor::extract(&text).map(|l| l.server).collect();
        assert_eq!(servers, vec!["a.example", "b.example"]);
    }

    #[test]
    fn test_extract_link_inside_prose() {
        let text = format!(
            "Try tg://proxy?server=1.2.3.4&port=443&secret={SECRET}. \
             Backup (tg://proxy?server=5.6.7.8&port=443&secret={SECRET}), \
             or [https://t.me/proxy?server=9.9.9.9&port=8443&secret={SECRET}]"
        );
        let records: Vec<_> = LinkExtractor::extract_records(&text).collect();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].identity(), "1.2.3.4:443");
        assert_eq!(records[1].identity(), "5.6.7.8:443");
        assert_eq!(records[2].identity(), "9.9.9.9:8443");
        assert!(records.iter().all(|r| r.secret() == SECRET));
    }

    #[test]
    fn test_extract_keeps_bracketed_ipv6_server() {
        let text = format!("tg://proxy?server=[2001:db8::1]&port=443&secret={SECRET}.");
        let link = LinkExtractor::parse_link(&text).unwrap();
        assert_eq!(link.server, "[2001:db8::1]");
        assert_eq!(link.secret, SECRET);
    }

    #[test]
    fn test_extract_ignores_unrelated_links() {
        let text = "https://t.me/channel/123 http://example.com/page?server=1.2.3.4&port=1";
        assert_eq!(LinkExtractor::extract(text).count(), 0);
    }

    #[test]
    fn test_into_record_validates() {
        let valid = RawLink {
            server: "1.2.3.4".to_string(),
            port: "443".to_string(),
            secret: SECRET.to_uppercase(),
        };
        let record = valid.into_record().unwrap();
        assert_eq!(record.secret(), SECRET);

        let bad_port = RawLink {
            server: "1.2.3.4".to_string(),
            port: "70000".to_string(),
            secret: SECRET.to_string(),
        };
        assert!(bad_port.into_record().is_none());

        let bad_secret = RawLink {
            server: "1.2.3.4".to_string(),
            port: "443".to_string(),
            secret: "dd00".to_string(),
        };
        assert!(bad_secret.into_record().is_none());
    }

    #[test]
    fn test_canonical_uri_round_trip() {
        for secret in [SECRET, "ee0123456789abcdef0123456789abcdef676f6f676c652e636f6d"] {
            let original = RawLink {
                server: "proxy.example.com".to_string(),
                port: "8443".to_string(),
                secret: secret.to_string(),
            }
            .into_record()
            .unwrap();

            let reparsed = LinkExtractor::extract_records(original.canonical_uri())
                .next()
                .unwrap();
            assert_eq!(reparsed.server(), original.server());
            assert_eq!(reparsed.port(), original.port());
            assert_eq!(reparsed.secret(), original.secret());
            assert_eq!(reparsed, original);
        }
    }
}
