//! Webhook signature verification and payload parsing.
//!
//! The aggregator signs the raw request body with HMAC-SHA512 and sends the
//! hex digest in a header. Verification runs over the exact bytes received;
//! re-serializing the JSON first would break the signature.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha512;

use crate::errors::{Result, UpstreamError};

type HmacSha512 = Hmac<Sha512>;

/// Header carrying the hex HMAC digest.
pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

/// Balance update carried by a statement webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceEvent {
    /// Aggregator-side account id the event belongs to.
    pub account_ref: String,
    /// Account balance after the statement item, in minor units.
    pub balance_minor: i64,
    /// Currency of the balance, as reported by the aggregator.
    pub currency: String,
}

#[derive(Debug, Deserialize)]
struct EnvelopeWire {
    #[serde(rename = "type")]
    event_type: String,
    /// Left opaque until the event type is known; other event types carry
    /// differently shaped data.
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataWire {
    account: String,
    statement_item: StatementItemWire,
}

#[derive(Debug, Deserialize)]
struct StatementItemWire {
    balance: i64,
    currency: String,
}

/// Verifies the HMAC-SHA512 hex signature over the raw body bytes.
pub fn verify_signature(secret: &[u8], body: &[u8], signature_hex: &str) -> Result<()> {
    let expected = hex::decode(signature_hex).map_err(|_| UpstreamError::InvalidSignature)?;

    let mut mac =
        HmacSha512::new_from_slice(secret).map_err(|_| UpstreamError::InvalidSignature)?;
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| UpstreamError::InvalidSignature)
}

/// Parses a webhook body into a balance event.
///
/// Returns `Ok(None)` for event types the pipeline does not consume; only
/// an undecodable body is an error.
pub fn parse_balance_event(body: &[u8]) -> Result<Option<BalanceEvent>> {
    let envelope: EnvelopeWire =
        serde_json::from_slice(body).map_err(|e| UpstreamError::MalformedWebhook(e.to_string()))?;

    if envelope.event_type != "StatementItem" {
        return Ok(None);
    }

    let data: DataWire = serde_json::from_value(envelope.data)
        .map_err(|e| UpstreamError::MalformedWebhook(e.to_string()))?;
    Ok(Some(BalanceEvent {
        account_ref: data.account,
        balance_minor: data.statement_item.balance,
        currency: data.statement_item.currency,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-webhook-secret";

    fn sign(body: &[u8]) -> String {
        let mut mac = HmacSha512::new_from_slice(SECRET).unwrap();
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_valid_signature_accepted() {
        let body = br#"{"type":"StatementItem","data":{}}"#;
        let sig = sign(body);
        assert!(verify_signature(SECRET, body, &sig).is_ok());
    }

    #[test]
    fn test_tampered_body_rejected() {
        let sig = sign(br#"{"a":1}"#);
        assert!(verify_signature(SECRET, br#"{"a":2}"#, &sig).is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let body = br#"{"a":1}"#;
        let sig = sign(body);
        assert!(verify_signature(b"other-secret", body, &sig).is_err());
    }

    #[test]
    fn test_non_hex_signature_rejected() {
        assert!(verify_signature(SECRET, b"{}", "zz-not-hex").is_err());
    }

    #[test]
    fn test_parse_statement_event() {
        let body = br#"{
            "type": "StatementItem",
            "data": {
                "account": "acc-ref-1",
                "statementItem": { "id": "tx-9", "amount": 150000, "balance": 2500000, "currency": "NGN" }
            }
        }"#;
        let event = parse_balance_event(body).unwrap().unwrap();
        assert_eq!(event.account_ref, "acc-ref-1");
        assert_eq!(event.balance_minor, 2_500_000);
        assert_eq!(event.currency, "NGN");
    }

    #[test]
    fn test_statement_event_without_currency_is_error() {
        let body = br#"{
            "type": "StatementItem",
            "data": {
                "account": "acc-ref-1",
                "statementItem": { "balance": 2500000 }
            }
        }"#;
        assert!(parse_balance_event(body).is_err());
    }

    #[test]
    fn test_unconsumed_event_type_is_none() {
        let body = br#"{"type":"SomethingElse","data":{"account":"a","statementItem":{"balance":1}}}"#;
        assert!(parse_balance_event(body).unwrap().is_none());
    }

    #[test]
    fn test_undecodable_body_is_error() {
        assert!(parse_balance_event(b"not json").is_err());
    }
}
