//! Unverified decoding of bearer token claims.
//!
//! Tokens are JWT compact strings (`header.payload.signature`). The client
//! never verifies the signature; it only reads the payload to learn when the
//! server will stop accepting the token and who it belongs to.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::error::ClaimsError;

/// Claim holding the expiration instant, in seconds since the Unix epoch
const EXP_CLAIM: &str = "exp";

/// Decoded token payload.
///
/// A payload without `exp` (or with `exp: null`) never expires on the client
/// side; it stays valid until logout or until the server rejects it.
#[derive(Debug, Clone, PartialEq)]
pub struct Claims {
    fields: Map<String, Value>,
    expires_at: Option<DateTime<Utc>>,
}

impl Claims {
    /// Decode the payload segment of `token` without checking its signature.
    pub fn decode(token: &str) -> Result<Self, ClaimsError> {
        let mut segments = token.trim().split('.');
        let _header = segments.next().filter(|s| !s.is_empty());
        let payload = segments
            .next()
            .filter(|s| !s.is_empty())
            .ok_or(ClaimsError::MissingPayload)?;

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| ClaimsError::Encoding(e.to_string()))?;

        let value: Value =
            serde_json::from_slice(&bytes).map_err(|e| ClaimsError::NotJson(e.to_string()))?;

        let fields = match value {
            Value::Object(map) => map,
            _ => return Err(ClaimsError::NotAnObject),
        };

        let expires_at = parse_expiration(fields.get(EXP_CLAIM))?;

        Ok(Self { fields, expires_at })
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// A token is expired once its expiration instant is at or before `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|exp| exp <= now).unwrap_or(false)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Subject claim (`sub`), the server-side user identifier
    pub fn subject(&self) -> Option<&str> {
        self.get_str("sub")
    }

    pub fn email(&self) -> Option<&str> {
        self.get_str("email")
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Merge extra identity fields (e.g. the user profile returned alongside
    /// the token). Supplemental values replace decoded ones, except `exp`,
    /// which only the token itself may set.
    pub fn merge(&mut self, supplemental: Map<String, Value>) {
        for (key, value) in supplemental {
            if key == EXP_CLAIM {
                continue;
            }
            self.fields.insert(key, value);
        }
    }
}

fn parse_expiration(value: Option<&Value>) -> Result<Option<DateTime<Utc>>, ClaimsError> {
    let number = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n,
        Some(other) => return Err(ClaimsError::InvalidExpiration(other.to_string())),
    };

    let timestamp = if let Some(secs) = number.as_i64() {
        DateTime::from_timestamp(secs, 0)
    } else if let Some(secs) = number.as_f64() {
        let whole = secs.floor();
        let nanos = ((secs - whole) * 1e9) as u32;
        DateTime::from_timestamp(whole as i64, nanos)
    } else {
        None
    };

    timestamp
        .map(Some)
        .ok_or_else(|| ClaimsError::InvalidExpiration(number.to_string()))
}

/// Build an unsigned token carrying `payload`.
///
/// The client never checks signatures, so this is enough for fixtures and
/// local tooling.
pub fn unsigned_token(payload: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{}.{}.", header, body)
}
