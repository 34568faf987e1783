//! Request signature verification for Shopify callbacks and webhooks.
//!
//! - OAuth callbacks carry a hex HMAC-SHA256 of the sorted query string.
//! - Webhooks carry a base64 HMAC-SHA256 of the raw body in
//!   `X-Shopify-Hmac-Sha256`.

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the webhook body signature.
pub const WEBHOOK_HMAC_HEADER: &str = "X-Shopify-Hmac-Sha256";

fn hmac_sha256(secret: &SecretString, message: &[u8]) -> Option<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes()).ok()?;
    mac.update(message);
    Some(mac.finalize().into_bytes().to_vec())
}

/// Canonical message for a callback query: every parameter except `hmac`
/// and `signature`, sorted by key, joined as `k=v` with `&`.
fn query_message(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .filter(|(k, _)| k.as_str() != "hmac" && k.as_str() != "signature")
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Verify the `hmac` parameter of an OAuth callback query.
#[must_use]
pub fn verify_query_hmac(params: &BTreeMap<String, String>, secret: &SecretString) -> bool {
    let Some(provided) = params.get("hmac") else {
        return false;
    };
    let Some(digest) = hmac_sha256(secret, query_message(params).as_bytes()) else {
        return false;
    };
    constant_time_compare(&hex::encode(digest), &provided.to_ascii_lowercase())
}

/// Verify a webhook body against its `X-Shopify-Hmac-Sha256` header value.
#[must_use]
pub fn verify_webhook_hmac(body: &[u8], provided: &str, secret: &SecretString) -> bool {
    let Some(digest) = hmac_sha256(secret, body) else {
        return false;
    };
    constant_time_compare(&BASE64.encode(digest), provided.trim())
}

/// Sign a webhook body the way Shopify does. Used by tests and tooling.
#[must_use]
pub fn sign_webhook(body: &[u8], secret: &SecretString) -> String {
    hmac_sha256(secret, body).map(|d| BASE64.encode(d)).unwrap_or_default()
}

/// Sign callback query parameters the way Shopify does.
#[must_use]
pub fn sign_query(params: &BTreeMap<String, String>, secret: &SecretString) -> String {
    hmac_sha256(secret, query_message(params).as_bytes())
        .map(hex::encode)
        .unwrap_or_default()
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret() -> SecretString {
        SecretString::from("hush")
    }

    fn callback_params() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("code".to_string(), "0907a61c0c8d55e99db179b68161bc00".to_string()),
            ("shop".to_string(), "demo.myshopify.com".to_string()),
            ("state".to_string(), "0.6784241404160823".to_string()),
            ("timestamp".to_string(), "1337178173".to_string()),
        ])
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("hello", "hello"));
        assert!(!constant_time_compare("hello", "world"));
        assert!(!constant_time_compare("hello", "hello!"));
    }

    #[test]
    fn test_query_message_sorts_and_excludes_hmac() {
        let mut params = callback_params();
        params.insert("hmac".to_string(), "ignored".to_string());
        assert_eq!(
            query_message(&params),
            "code=0907a61c0c8d55e99db179b68161bc00&shop=demo.myshopify.com&state=0.6784241404160823&timestamp=1337178173"
        );
    }

    #[test]
    fn test_query_hmac_round_trip() {
        let mut params = callback_params();
        let hmac = sign_query(&params, &secret());
        params.insert("hmac".to_string(), hmac);
        assert!(verify_query_hmac(&params, &secret()));

        params.insert("shop".to_string(), "evil.myshopify.com".to_string());
        assert!(!verify_query_hmac(&params, &secret()));
    }

    #[test]
    fn test_query_without_hmac_is_rejected() {
        assert!(!verify_query_hmac(&callback_params(), &secret()));
    }

    #[test]
    fn test_webhook_hmac() {
        let body = br#"{"shop_domain":"demo.myshopify.com"}"#;
        let header = sign_webhook(body, &secret());

        assert!(verify_webhook_hmac(body, &header, &secret()));
        assert!(!verify_webhook_hmac(b"{}", &header, &secret()));
        assert!(!verify_webhook_hmac(body, &header, &SecretString::from("other")));
    }
}
