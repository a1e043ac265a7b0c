//! The bolt11 encoder boundary.
//!
//! Real bech32 invoice encoding is an external collaborator; the store
//! only needs an opaque `encode(fields) -> string` function. The
//! default [`SyntheticEncoder`] produces a deterministic
//! lnbc-prefixed string from the request fields, and [`StubEncoder`]
//! short-circuits to a fixed placeholder for heavy scale testing.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{Result, MSAT_PER_BTC};

/// Placeholder private key for invoice signing. Security is explicitly
/// not a goal in this system, so any old number is fine.
pub const SIGNING_KEY: &str = "0000111122223333444455556666777788889999aaaabbbbccccddddeeeeffff";

/// Fixed output of [`StubEncoder`].
pub const STUB_BOLT11: &str = "lnbc1stubinvoicestubinvoicestubinvoicestubinvoicestub";

/// Field set handed to the encoder.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Bolt11Request {
    /// Currency tag, "bc" for these simulated invoices.
    pub currency: String,
    /// Amount in BTC (msatoshi / 1e11).
    pub amount_btc: f64,
    /// Invoice creation time on the virtual clock.
    pub timestamp: i64,
    /// Hex payment hash to embed.
    pub payment_hash: String,
    /// The `d` description tag.
    pub description: String,
    /// The `x` expiry tag, in seconds.
    pub expiry: i64,
}

/// Opaque invoice string encoder.
pub trait Bolt11Encoder: Send + Sync {
    /// Encodes `request` into an invoice string.
    fn encode(&self, request: &Bolt11Request) -> Result<String>;
}

/// Deterministic stand-in for real bech32 encoding: the same fields
/// (and the fixed signing key) always produce the same string.
#[derive(Clone, Copy, Debug, Default)]
pub struct SyntheticEncoder;

impl Bolt11Encoder for SyntheticEncoder {
    fn encode(&self, request: &Bolt11Request) -> Result<String> {
        let body = serde_json::to_string(request)?;
        let digest = Sha256::new()
            .chain_update(body.as_bytes())
            .chain_update(SIGNING_KEY.as_bytes())
            .finalize();
        let amount_msat = (request.amount_btc * MSAT_PER_BTC as f64).round() as u64;
        Ok(format!(
            "ln{}{}n1{}",
            request.currency,
            amount_msat,
            hex::encode(digest)
        ))
    }
}

/// Short-circuit encoder: a fixed placeholder string, skipping all
/// encoding cost. Useful when creating invoices by the thousand.
#[derive(Clone, Copy, Debug, Default)]
pub struct StubEncoder;

impl Bolt11Encoder for StubEncoder {
    fn encode(&self, _request: &Bolt11Request) -> Result<String> {
        Ok(STUB_BOLT11.to_string())
    }
}
