//! HMAC-SHA256 request signing.
//!
//! The exchange recomputes the signature over the parameters sorted by key,
//! so the canonical payload is always built in ascending key order no
//! matter how the caller assembled the parameters.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use snipe_core::Credentials;
use snipe_rest::SignedQuery;

use crate::error::{ExecutorError, ExecutorResult};

type HmacSha256 = Hmac<Sha256>;

/// Parameter name of the signature itself; never part of the payload.
pub const SIGNATURE_KEY: &str = "signature";

/// Parameter name of the request timestamp.
pub const TIMESTAMP_KEY: &str = "timestamp";

/// Request signer keyed by the account secret.
#[derive(Clone)]
pub struct Signer {
    mac: HmacSha256,
}

impl Signer {
    /// # Errors
    /// `ExecutorError::InvalidKey` if the HMAC cannot be keyed.
    pub fn new(secret: &str) -> ExecutorResult<Self> {
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| ExecutorError::InvalidKey(e.to_string()))?;
        Ok(Self { mac })
    }

    pub fn from_credentials(credentials: &Credentials) -> ExecutorResult<Self> {
        Self::new(credentials.expose_secret())
    }

    /// `key=value` pairs sorted ascending by key and joined with `&`.
    ///
    /// Any `signature` entry is excluded.
    pub fn canonical_payload<I, K, V>(params: I) -> String
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut pairs: Vec<(K, V)> = params
            .into_iter()
            .filter(|(k, _)| k.as_ref() != SIGNATURE_KEY)
            .collect();
        pairs.sort_by(|a, b| a.0.as_ref().cmp(b.0.as_ref()));

        pairs
            .iter()
            .map(|(k, v)| format!("{}={}", k.as_ref(), v.as_ref()))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Lowercase hex HMAC-SHA256 of a raw message.
    pub fn sign_message(&self, message: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(message.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Signature over the canonical payload of `params`.
    pub fn sign<I, K, V>(&self, params: I) -> String
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.sign_message(&Self::canonical_payload(params))
    }

    /// Add `timestamp`, sign, and return the wire query.
    ///
    /// Pairs come out in canonical order with `signature` appended last.
    pub fn sign_query<I, K, V>(&self, params: I, timestamp_ms: i64) -> SignedQuery
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut pairs: Vec<(String, String)> = params
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(k, _)| k != SIGNATURE_KEY && k != TIMESTAMP_KEY)
            .collect();
        pairs.push((TIMESTAMP_KEY.to_string(), timestamp_ms.to_string()));
        pairs.sort_by(|a, b| a.0.cmp(&b.0));

        let signature = self.sign(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        pairs.push((SIGNATURE_KEY.to_string(), signature));
        SignedQuery::new(pairs)
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer").finish_non_exhaustive()
    }
}
