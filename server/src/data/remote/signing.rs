//! Request signing for the S3-compatible remote backend (§4.5).
//!
//! Two schemes coexist because `aws-sdk-s3` only implements SigV4, but the
//! spec requires the legacy SigV2 scheme for the vendor-fingerprinted
//! endpoints `S3Config::needs_legacy_signature` selects (see DESIGN.md).
//! Both are hand-rolled against `reqwest` headers with `hmac`/`sha2`/`sha1`
//! rather than pulling in a signing crate, matching the pack's general
//! preference for small hand-signed wire protocols over heavyweight SDKs.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::core::config::S3Config;
use crate::core::constants::{S3_DEFAULT_REGION, S3_SERVICE_NAME};
use crate::data::error::RemoteError;

type HmacSha256 = Hmac<Sha256>;
type HmacSha1 = Hmac<Sha1>;

/// The pieces of a request that feed into either signature scheme.
pub struct SignCtx<'a> {
    pub method: &'a str,
    pub bucket: &'a str,
    /// Virtual-hosted host, e.g. `my-bucket.s3.example.com` — no scheme.
    pub host: &'a str,
    /// Path-escaped object path, e.g. `/news/2025-11-26.db`, or `/` for
    /// bucket-level requests (listing).
    pub canonical_uri: &'a str,
    /// Already-escaped and alphabetically sorted `k=v&k=v` query string, or
    /// `""` when the request has none.
    pub query_string: &'a str,
    pub payload: &'a [u8],
    /// Empty string when the request carries no body and sets no content type.
    pub content_type: &'a str,
}

pub fn sign(config: &S3Config, ctx: &SignCtx, now: DateTime<Utc>) -> Result<HeaderMap, RemoteError> {
    if config.needs_legacy_signature() {
        sign_v2(config, ctx, now)
    } else {
        sign_v4(config, ctx, now)
    }
}

fn sign_v4(config: &S3Config, ctx: &SignCtx, now: DateTime<Utc>) -> Result<HeaderMap, RemoteError> {
    let region = config
        .region
        .clone()
        .unwrap_or_else(|| S3_DEFAULT_REGION.to_string());
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date_stamp = now.format("%Y%m%d").to_string();
    let payload_hash = hex::encode(Sha256::digest(ctx.payload));

    let mut headers_to_sign = vec![
        ("content-type".to_string(), ctx.content_type.to_string()),
        ("host".to_string(), ctx.host.to_string()),
        ("x-amz-content-sha256".to_string(), payload_hash.clone()),
        ("x-amz-date".to_string(), amz_date.clone()),
    ];
    headers_to_sign.retain(|(k, v)| !(k == "content-type" && v.is_empty()));
    headers_to_sign.sort();

    let signed_headers = headers_to_sign
        .iter()
        .map(|(k, _)| k.as_str())
        .collect::<Vec<_>>()
        .join(";");
    let canonical_headers: String = headers_to_sign
        .iter()
        .map(|(k, v)| format!("{k}:{v}\n"))
        .collect();

    let canonical_request = format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        ctx.method, ctx.canonical_uri, ctx.query_string, canonical_headers, signed_headers, payload_hash
    );
    let canonical_request_hash = hex::encode(Sha256::digest(canonical_request.as_bytes()));

    let credential_scope = format!("{date_stamp}/{region}/{S3_SERVICE_NAME}/aws4_request");
    let string_to_sign =
        format!("AWS4-HMAC-SHA256\n{amz_date}\n{credential_scope}\n{canonical_request_hash}");

    let k_date = hmac_sha256(format!("AWS4{}", config.secret_access_key).as_bytes(), date_stamp.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, S3_SERVICE_NAME.as_bytes())?;
    let k_signing = hmac_sha256(&k_service, b"aws4_request")?;
    let signature = hex::encode(hmac_sha256(&k_signing, string_to_sign.as_bytes())?);

    let authorization = format!(
        "AWS4-HMAC-SHA256 Credential={}/{credential_scope}, SignedHeaders={signed_headers}, Signature={signature}",
        config.access_key_id
    );

    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static("x-amz-date"),
        HeaderValue::from_str(&amz_date).map_err(header_err)?,
    );
    headers.insert(
        HeaderName::from_static("x-amz-content-sha256"),
        HeaderValue::from_str(&payload_hash).map_err(header_err)?,
    );
    headers.insert(
        reqwest::header::AUTHORIZATION,
        HeaderValue::from_str(&authorization).map_err(header_err)?,
    );
    headers.insert(reqwest::header::HOST, HeaderValue::from_str(ctx.host).map_err(header_err)?);
    if !ctx.content_type.is_empty() {
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            HeaderValue::from_str(ctx.content_type).map_err(header_err)?,
        );
    }
    Ok(headers)
}

/// Classic AWS SigV2: `HMAC-SHA1(secret, StringToSign)`, base64-encoded.
/// Used only for the vendor endpoints the spec fingerprints as legacy.
fn sign_v2(config: &S3Config, ctx: &SignCtx, now: DateTime<Utc>) -> Result<HeaderMap, RemoteError> {
    let date = now.format("%a, %d %b %Y %H:%M:%S GMT").to_string();
    let resource = format!("/{}{}", ctx.bucket, ctx.canonical_uri);
    let string_to_sign = format!("{}\n\n{}\n{}\n{}", ctx.method, ctx.content_type, date, resource);

    let mut mac = HmacSha1::new_from_slice(config.secret_access_key.as_bytes())
        .map_err(|e| RemoteError::S3(format!("hmac key error: {e}")))?;
    mac.update(string_to_sign.as_bytes());
    let signature = STANDARD.encode(mac.finalize().into_bytes());

    let authorization = format!("AWS {}:{}", config.access_key_id, signature);

    let mut headers = HeaderMap::new();
    headers.insert(reqwest::header::DATE, HeaderValue::from_str(&date).map_err(header_err)?);
    headers.insert(
        reqwest::header::AUTHORIZATION,
        HeaderValue::from_str(&authorization).map_err(header_err)?,
    );
    headers.insert(reqwest::header::HOST, HeaderValue::from_str(ctx.host).map_err(header_err)?);
    if !ctx.content_type.is_empty() {
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            HeaderValue::from_str(ctx.content_type).map_err(header_err)?,
        );
    }
    Ok(headers)
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, RemoteError> {
    let mut mac =
        HmacSha256::new_from_slice(key).map_err(|e| RemoteError::S3(format!("hmac key error: {e}")))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn header_err(e: impl std::fmt::Display) -> RemoteError {
    RemoteError::S3(format!("invalid header value: {e}"))
}

/// Percent-encode per RFC 3986 unreserved characters, for query strings and
/// object keys signed under SigV4. Hand-rolled since nothing else in the
/// dependency tree pulls in a URL-encoding crate.
pub fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn config(endpoint: &str) -> S3Config {
        S3Config {
            endpoint_url: endpoint.to_string(),
            bucket_name: "trendradar-bucket".to_string(),
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY".to_string(),
            region: Some("us-east-1".to_string()),
        }
    }

    #[test]
    fn sigv4_authorization_header_has_the_expected_shape() {
        let cfg = config("https://s3.example.com");
        let ctx = SignCtx {
            method: "PUT",
            bucket: "trendradar-bucket",
            host: "trendradar-bucket.s3.example.com",
            canonical_uri: "/news/2025-11-26.db",
            query_string: "",
            payload: b"hello",
            content_type: "application/x-sqlite3",
        };
        let now = Utc.with_ymd_and_hms(2025, 11, 26, 12, 0, 0).unwrap();
        let headers = sign_v4(&cfg, &ctx, now).unwrap();
        let auth = headers.get(reqwest::header::AUTHORIZATION).unwrap().to_str().unwrap();
        assert!(auth.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20251126/us-east-1/s3/aws4_request"
        ));
        assert!(auth.contains("SignedHeaders=content-type;host;x-amz-content-sha256;x-amz-date"));
    }

    #[test]
    fn legacy_vendor_marker_selects_sigv2() {
        let cfg = config("https://cos.ap-shanghai.myqcloud.com");
        assert!(cfg.needs_legacy_signature());
        let ctx = SignCtx {
            method: "GET",
            bucket: "trendradar-bucket",
            host: "trendradar-bucket.cos.ap-shanghai.myqcloud.com",
            canonical_uri: "/news/2025-11-26.db",
            query_string: "",
            payload: b"",
            content_type: "",
        };
        let now = Utc.with_ymd_and_hms(2025, 11, 26, 12, 0, 0).unwrap();
        let headers = sign(&cfg, &ctx, now).unwrap();
        let auth = headers.get(reqwest::header::AUTHORIZATION).unwrap().to_str().unwrap();
        assert!(auth.starts_with("AWS AKIDEXAMPLE:"));
    }

    #[test]
    fn percent_encode_leaves_unreserved_characters_alone() {
        assert_eq!(percent_encode("news/2025-11-26.db"), "news%2F2025-11-26.db");
        assert_eq!(percent_encode("abc_DEF-123.~"), "abc_DEF-123.~");
    }
}
