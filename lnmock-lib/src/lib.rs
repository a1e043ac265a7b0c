//! lnmock library.
//!
//! Emulates the invoice-management subset of a c-lightning node's RPC
//! surface so higher-level software can be tested against deterministic,
//! time-controllable invoice lifecycles without a real node.
//!
//! The core is a synchronous state machine: every operation reads the
//! whole daemon state, mutates it under the virtual clock, and persists
//! it back. Three interchangeable [`NodeClient`] backends present the
//! same operation set to test code:
//!
//! - [`DirectClient`] calls a [`MockNode`] in-process,
//! - [`SubprocessClient`] drives the standalone `lnmock-node` binary,
//! - [`RpcPassthroughClient`] forwards to a real node behind the
//!   [`LightningRpc`] trait.
//!
//! # Example
//!
//! ```
//! use lnmock_lib::{InvoiceRequest, MockNode};
//!
//! let node = MockNode::in_memory();
//! let receipt = node
//!     .invoice(&InvoiceRequest::new(10_000, "order-1", "coffee", 600))
//!     .unwrap();
//! assert_eq!(receipt.payment_hash.len(), 64);
//!
//! node.advance_time(601).unwrap();
//! let invoices = node.list_invoices().unwrap();
//! assert_eq!(invoices[0].status.to_string(), "expired");
//! ```

pub mod bolt11;
pub mod client;
pub mod clock;
pub mod errors;
pub mod invoice;
pub mod node;
pub mod state;
pub mod store;

pub use bolt11::{Bolt11Encoder, Bolt11Request, StubEncoder, SyntheticEncoder, SIGNING_KEY};
pub use client::{
    DirectClient, LightningRpc, NodeClient, Operation, RpcFailure, RpcPassthroughClient,
    SubprocessClient,
};
pub use clock::VirtualClock;
pub use errors::LnMockError;
pub use invoice::{Invoice, InvoiceDetails, InvoiceReceipt, InvoiceRequest, InvoiceStatus};
pub use node::MockNode;
pub use state::{DaemonState, FileStateStore, MemoryStateStore, StateStore};
pub use store::InvoiceStore;

/// Common result alias for lnmock operations.
pub type Result<T> = std::result::Result<T, LnMockError>;

/// Millisatoshis per bitcoin, for bolt11 amount conversion.
pub const MSAT_PER_BTC: u64 = 100_000_000 * 1_000;

/// Fixed surcharge added to `msatoshi_received` when an invoice is
/// marked paid, so results look a little more like a real node's.
pub const PAID_FEE_MSAT: u64 = 33;
