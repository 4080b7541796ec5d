//! AK/SK request signing (`SDK-HMAC-SHA256`)
//!
//! Every request carries an `X-Sdk-Date` header and an `Authorization`
//! header whose signature covers the method, path, query, a fixed set of
//! headers and the SHA-256 of the body.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use url::Url;

type HmacSha256 = Hmac<Sha256>;

pub const ALGORITHM: &str = "SDK-HMAC-SHA256";
pub const HEADER_DATE: &str = "X-Sdk-Date";
pub const HEADER_SECURITY_TOKEN: &str = "X-Security-Token";
pub const DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";
pub const CONTENT_TYPE_JSON: &str = "application/json";

#[derive(Clone)]
pub struct Signer {
    access_key: String,
    secret_key: String,
    security_token: Option<String>,
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("access_key", &self.access_key)
            .field("secret_key", &"***")
            .field("security_token", &self.security_token.as_ref().map(|_| "***"))
            .finish()
    }
}

impl Signer {
    pub fn new(access_key: &str, secret_key: &str, security_token: Option<&str>) -> Self {
        Self {
            access_key: access_key.to_string(),
            secret_key: secret_key.to_string(),
            security_token: security_token.map(str::to_string),
        }
    }

    /// Headers to attach to the request, `Authorization` last
    pub fn sign(
        &self,
        method: &str,
        url: &Url,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Vec<(&'static str, String)> {
        let date = now.format(DATE_FORMAT).to_string();

        let mut signed: Vec<(String, String)> = vec![
            ("content-type".to_string(), CONTENT_TYPE_JSON.to_string()),
            ("host".to_string(), host_header(url)),
            ("x-sdk-date".to_string(), date.clone()),
        ];
        if let Some(token) = &self.security_token {
            signed.push(("x-security-token".to_string(), token.clone()));
        }
        signed.sort_by(|a, b| a.0.cmp(&b.0));

        let canonical = canonical_request(method, url, &signed, body);
        let string_to_sign = format!("{}\n{}\n{}", ALGORITHM, date, hex_sha256(canonical.as_bytes()));
        let signature = self.signature(&string_to_sign);

        let signed_headers = signed
            .iter()
            .map(|(k, _)| k.as_str())
            .collect::<Vec<_>>()
            .join(";");

        let mut headers = vec![
            ("Content-Type", CONTENT_TYPE_JSON.to_string()),
            (HEADER_DATE, date),
        ];
        if let Some(token) = &self.security_token {
            headers.push((HEADER_SECURITY_TOKEN, token.clone()));
        }
        headers.push((
            "Authorization",
            format!(
                "{} Access={}, SignedHeaders={}, Signature={}",
                ALGORITHM, self.access_key, signed_headers, signature
            ),
        ));
        headers
    }

    fn signature(&self, string_to_sign: &str) -> String {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(self.secret_key.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(string_to_sign.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

/// `host[:port]`, port only when it is not the scheme default
fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

pub fn canonical_request(
    method: &str,
    url: &Url,
    sorted_headers: &[(String, String)],
    body: &[u8],
) -> String {
    let canonical_headers: String = sorted_headers
        .iter()
        .map(|(k, v)| format!("{}:{}\n", k, v.trim()))
        .collect();
    let signed_headers = sorted_headers
        .iter()
        .map(|(k, _)| k.as_str())
        .collect::<Vec<_>>()
        .join(";");

    format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        method.to_uppercase(),
        canonical_uri(url),
        canonical_query(url),
        canonical_headers,
        signed_headers,
        hex_sha256(body)
    )
}

/// Each path segment re-encoded, always ending in `/`
pub fn canonical_uri(url: &Url) -> String {
    let encoded = url
        .path()
        .split('/')
        .map(|segment| {
            let decoded = urlencoding::decode(segment)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| segment.to_string());
            urlencoding::encode(&decoded).into_owned()
        })
        .collect::<Vec<_>>()
        .join("/");

    if encoded.ends_with('/') {
        encoded
    } else {
        format!("{}/", encoded)
    }
}

/// Query pairs encoded and sorted by key, then value
pub fn canonical_query(url: &Url) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            (
                urlencoding::encode(&k).into_owned(),
                urlencoding::encode(&v).into_owned(),
            )
        })
        .collect();
    pairs.sort();
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

pub fn hex_sha256(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
