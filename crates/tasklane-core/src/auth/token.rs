//! Decoding of the claims segment of compact three-part tokens.
//!
//! Tokens are issued by the backend and only ever read here. The header and
//! signature segments are never interpreted; nothing in this module checks a
//! signature.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use chrono::{DateTime, TimeZone, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

use super::TokenError;
use crate::models::Identity;

/// Number of dot-separated segments in a compact token (header, claims, signature).
pub const TOKEN_SEGMENTS: usize = 3;

/// Header used for fixture tokens built by [`encode_unsigned`].
const UNSIGNED_HEADER: &str = r#"{"alg":"none","typ":"JWT"}"#;

/// Placeholder signature segment for fixture tokens.
const UNSIGNED_SIGNATURE: &str = "unsigned";

/// Claims carried in the middle segment of a token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject identifier. The backend may emit a string or a number.
    #[serde(deserialize_with = "subject_from_any")]
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Expiration, seconds since the Unix epoch. Fractional values are allowed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<f64>,
}

impl Claims {
    /// Identity for display. Email falls back to the subject when absent.
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.sub.clone(),
            email: self.email.clone().unwrap_or_else(|| self.sub.clone()),
            name: self.name.clone(),
        }
    }

    /// Expiration as a timestamp (`exp * 1000` milliseconds).
    /// `None` without `exp`, or when `exp` is outside the representable range.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let ms = (self.exp? * 1000.0).floor();
        if !ms.is_finite() || ms.abs() >= i64::MAX as f64 {
            return None;
        }
        Utc.timestamp_millis_opt(ms as i64).single()
    }
}

fn subject_from_any<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "subject must be a string or number, got {}",
            other
        ))),
    }
}

/// Split a token into its segments, requiring exactly three non-empty parts.
fn segments(token: &str) -> Result<[&str; TOKEN_SEGMENTS], TokenError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != TOKEN_SEGMENTS {
        return Err(TokenError::Malformed(format!(
            "expected {} segments, found {}",
            TOKEN_SEGMENTS,
            parts.len()
        )));
    }
    if parts.iter().any(|p| p.is_empty()) {
        return Err(TokenError::Malformed("empty segment".to_string()));
    }
    Ok([parts[0], parts[1], parts[2]])
}

/// Rewrite a URL-safe base64 segment into padded standard base64.
fn to_standard_base64(segment: &str) -> String {
    let mut converted: String = segment
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    let padding = (4 - converted.len() % 4) % 4;
    converted.extend(std::iter::repeat('=').take(padding));
    converted
}

/// Decode the claims segment of `token` without verifying its signature.
pub fn decode_claims(token: &str) -> Result<Claims, TokenError> {
    let [_, payload, _] = segments(token)?;

    let bytes = STANDARD
        .decode(to_standard_base64(payload))
        .map_err(|e| TokenError::Malformed(format!("claims are not base64: {}", e)))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| TokenError::Malformed(format!("claims are not valid JSON: {}", e)))
}

/// Build an unsigned three-segment token around arbitrary claims.
///
/// Intended for fixtures and local tooling; the result carries no signature
/// and would be rejected by any verifying party.
pub fn encode_unsigned<C: Serialize>(claims: &C) -> Result<String, serde_json::Error> {
    let payload = serde_json::to_vec(claims)?;
    Ok(format!(
        "{}.{}.{}",
        URL_SAFE_NO_PAD.encode(UNSIGNED_HEADER),
        URL_SAFE_NO_PAD.encode(payload),
        UNSIGNED_SIGNATURE
    ))
}
