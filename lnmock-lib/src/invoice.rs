//! Invoice records and their wire representations.
//!
//! The in-memory [`Invoice`] keeps one canonical field per value; the
//! wire types ([`InvoiceDetails`], [`InvoiceReceipt`]) also emit the
//! legacy duplicate names (`expiry_time`, `paid_timestamp`) that the
//! original node exposed, so existing consumers keep parsing.

use std::fmt;
use std::str::FromStr;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{LnMockError, Result};

/// Lifecycle status of an invoice.
///
/// `Unpaid` is the initial state; `Paid` and `Expired` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    /// Awaiting payment, not yet past its expiry.
    Unpaid,
    /// Marked paid; carries a pay index and receipt fields.
    Paid,
    /// Passed its expiry without payment.
    Expired,
}

impl InvoiceStatus {
    /// The lowercase wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unpaid => "unpaid",
            Self::Paid => "paid",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "unpaid" => Ok(Self::Unpaid),
            "paid" => Ok(Self::Paid),
            "expired" => Ok(Self::Expired),
            other => Err(format!(
                "unknown status {other:?} (expected paid, unpaid or expired)"
            )),
        }
    }
}

/// A single invoice record as held in the daemon state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Invoice {
    /// Caller-supplied unique identifier, immutable after creation.
    pub label: String,
    /// Encoded invoice string from the bolt11 boundary.
    pub bolt11: String,
    /// Hex SHA-256 of the preimage bytes.
    pub payment_hash: String,
    /// Requested amount in millisatoshi.
    pub msatoshi: u64,
    /// Current lifecycle status.
    pub status: InvoiceStatus,
    /// Absolute virtual timestamp after which the invoice expires.
    pub expires_at: i64,
    /// Virtual timestamp of the paid transition, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<i64>,
    /// Amount received, including the fixed simulated surcharge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msatoshi_received: Option<u64>,
    /// Strictly increasing sequence number assigned on payment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pay_index: Option<u64>,
}

/// Parameters for creating an invoice.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InvoiceRequest {
    /// Amount in millisatoshi.
    pub msatoshi: u64,
    /// Unique invoice label.
    pub label: String,
    /// Description embedded in the bolt11 string.
    pub description: String,
    /// Seconds until expiry, relative to the virtual clock.
    pub expiry: i64,
    /// Hex preimage; generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preimage: Option<String>,
}

impl InvoiceRequest {
    /// Request with a generated preimage.
    pub fn new(
        msatoshi: u64,
        label: impl Into<String>,
        description: impl Into<String>,
        expiry: i64,
    ) -> Self {
        Self {
            msatoshi,
            label: label.into(),
            description: description.into(),
            expiry,
            preimage: None,
        }
    }

    /// Pins the preimage, for reproducible payment hashes in tests.
    pub fn with_preimage(mut self, preimage: impl Into<String>) -> Self {
        self.preimage = Some(preimage.into());
        self
    }
}

/// What the `invoice` operation returns to the caller.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InvoiceReceipt {
    /// Hex SHA-256 of the preimage bytes.
    pub payment_hash: String,
    /// Legacy duplicate of `expires_at`.
    pub expiry_time: i64,
    /// Absolute virtual expiry timestamp.
    pub expires_at: i64,
    /// Encoded invoice string.
    pub bolt11: String,
}

impl InvoiceReceipt {
    /// Builds a receipt from a node response, tolerating the legacy
    /// duplicate name being absent (a real node only sends
    /// `expires_at`).
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        let payment_hash = require_str(value, "payment_hash")?;
        let bolt11 = require_str(value, "bolt11")?;
        let expires_at = value
            .get("expires_at")
            .and_then(|v| v.as_i64())
            .ok_or_else(|| LnMockError::Serialization("missing field expires_at".to_string()))?;
        let expiry_time = value
            .get("expiry_time")
            .and_then(|v| v.as_i64())
            .unwrap_or(expires_at);
        Ok(Self {
            payment_hash,
            expiry_time,
            expires_at,
            bolt11,
        })
    }
}

fn require_str(value: &serde_json::Value, field: &str) -> Result<String> {
    value
        .get(field)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| LnMockError::Serialization(format!("missing field {field}")))
}

impl From<&Invoice> for InvoiceReceipt {
    fn from(invoice: &Invoice) -> Self {
        Self {
            payment_hash: invoice.payment_hash.clone(),
            expiry_time: invoice.expires_at,
            expires_at: invoice.expires_at,
            bolt11: invoice.bolt11.clone(),
        }
    }
}

/// Wire form of an invoice, with both legacy duplicate field names
/// populated.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InvoiceDetails {
    /// Unique invoice label.
    pub label: String,
    /// Encoded invoice string.
    pub bolt11: String,
    /// Hex SHA-256 of the preimage bytes.
    pub payment_hash: String,
    /// Requested amount in millisatoshi.
    pub msatoshi: u64,
    /// Current lifecycle status.
    pub status: InvoiceStatus,
    /// Absolute virtual expiry timestamp.
    pub expires_at: i64,
    /// Legacy duplicate of `expires_at`; defaults to 0 when a real
    /// node omits it, see [`InvoiceDetails::normalized`].
    #[serde(default)]
    pub expiry_time: i64,
    /// Virtual timestamp of the paid transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<i64>,
    /// Legacy duplicate of `paid_at`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_timestamp: Option<i64>,
    /// Amount received, including the fixed surcharge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msatoshi_received: Option<u64>,
    /// Pay index assigned when the invoice was marked paid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pay_index: Option<u64>,
}

impl InvoiceDetails {
    /// Fills the legacy duplicate fields from their canonical
    /// counterparts when a backend omitted them.
    pub fn normalized(mut self) -> Self {
        if self.expiry_time == 0 {
            self.expiry_time = self.expires_at;
        }
        if self.paid_timestamp.is_none() {
            self.paid_timestamp = self.paid_at;
        }
        self
    }
}

impl From<&Invoice> for InvoiceDetails {
    fn from(invoice: &Invoice) -> Self {
        Self {
            label: invoice.label.clone(),
            bolt11: invoice.bolt11.clone(),
            payment_hash: invoice.payment_hash.clone(),
            msatoshi: invoice.msatoshi,
            status: invoice.status,
            expires_at: invoice.expires_at,
            expiry_time: invoice.expires_at,
            paid_at: invoice.paid_at,
            paid_timestamp: invoice.paid_at,
            msatoshi_received: invoice.msatoshi_received,
            pay_index: invoice.pay_index,
        }
    }
}

/// Hex SHA-256 digest of the raw preimage bytes.
pub fn payment_hash(preimage_hex: &str) -> Result<String> {
    let bytes =
        hex::decode(preimage_hex).map_err(|e| LnMockError::InvalidPreimage(e.to_string()))?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// 256 random bits, hex encoded. The preimage is not security
/// sensitive here; any sufficiently random source suffices.
pub fn generate_preimage() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_hash_known_vectors() {
        // SHA-256 of the empty byte string.
        assert_eq!(
            payment_hash("").unwrap(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        // SHA-256 of 32 zero bytes.
        let zeros = "00".repeat(32);
        assert_eq!(
            payment_hash(&zeros).unwrap(),
            "66687aadf862bd776c8fc18b8e9f8e20089714856ee233b3902a591d0d5f2925"
        );
    }

    #[test]
    fn test_payment_hash_rejects_bad_hex() {
        assert!(matches!(
            payment_hash("not-hex"),
            Err(LnMockError::InvalidPreimage(_))
        ));
    }

    #[test]
    fn test_generated_preimage_is_256_bits_of_hex() {
        let preimage = generate_preimage();
        assert_eq!(preimage.len(), 64);
        assert!(hex::decode(&preimage).is_ok());
        // Two draws colliding would mean the source is not random at all.
        assert_ne!(preimage, generate_preimage());
    }

    #[test]
    fn test_status_serde_and_parse() {
        assert_eq!(
            serde_json::to_string(&InvoiceStatus::Unpaid).unwrap(),
            "\"unpaid\""
        );
        assert_eq!("expired".parse::<InvoiceStatus>(), Ok(InvoiceStatus::Expired));
        assert!("settled".parse::<InvoiceStatus>().is_err());
    }

    #[test]
    fn test_details_emit_both_legacy_names() {
        let invoice = Invoice {
            label: "a".to_string(),
            bolt11: "lnbc1stub".to_string(),
            payment_hash: "00".repeat(32),
            msatoshi: 10_000,
            status: InvoiceStatus::Paid,
            expires_at: 600,
            paid_at: Some(500),
            msatoshi_received: Some(10_033),
            pay_index: Some(1),
        };
        let value = serde_json::to_value(InvoiceDetails::from(&invoice)).unwrap();
        assert_eq!(value["expires_at"], 600);
        assert_eq!(value["expiry_time"], 600);
        assert_eq!(value["paid_at"], 500);
        assert_eq!(value["paid_timestamp"], 500);
    }

    #[test]
    fn test_receipt_from_value_without_legacy_name() {
        let value = serde_json::json!({
            "payment_hash": "ab".repeat(32),
            "bolt11": "lnbc1real",
            "expires_at": 1234,
        });
        let receipt = InvoiceReceipt::from_value(&value).unwrap();
        assert_eq!(receipt.expires_at, 1234);
        assert_eq!(receipt.expiry_time, 1234);
    }

    #[test]
    fn test_receipt_from_value_missing_field() {
        let value = serde_json::json!({ "bolt11": "lnbc1real" });
        assert!(matches!(
            InvoiceReceipt::from_value(&value),
            Err(LnMockError::Serialization(_))
        ));
    }
}
