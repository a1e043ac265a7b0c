//! The simulated node: operation dispatch over the state machine.
//!
//! Every operation is a complete read-modify-write of the daemon state
//! through the configured [`StateStore`]; nothing is cached between
//! calls, so multiple `MockNode` values over the same state file see
//! each other's writes when access is sequential. The file is not
//! lock-protected.

use tracing::{debug, info};

use crate::bolt11::{Bolt11Encoder, SyntheticEncoder};
use crate::clock::VirtualClock;
use crate::invoice::{InvoiceDetails, InvoiceReceipt, InvoiceRequest, InvoiceStatus};
use crate::state::{DaemonState, FileStateStore, MemoryStateStore, StateStore};
use crate::store::InvoiceStore;
use crate::Result;

/// A mock c-lightning node over a state store and a bolt11 encoder.
pub struct MockNode {
    store: Box<dyn StateStore>,
    encoder: Box<dyn Bolt11Encoder>,
}

impl MockNode {
    /// Node over `store` with the default [`SyntheticEncoder`].
    pub fn new(store: Box<dyn StateStore>) -> Self {
        Self {
            store,
            encoder: Box::new(SyntheticEncoder),
        }
    }

    /// Node with a custom encoder, e.g. [`crate::StubEncoder`] for
    /// scale tests.
    pub fn with_encoder(store: Box<dyn StateStore>, encoder: Box<dyn Bolt11Encoder>) -> Self {
        Self { store, encoder }
    }

    /// Node whose state lives only in memory, never serialized.
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStateStore::new()))
    }

    /// Node persisting to the JSON state file at `path`.
    pub fn on_file(path: impl Into<std::path::PathBuf>) -> Self {
        Self::new(Box::new(FileStateStore::new(path)))
    }

    /// Creates a new invoice and returns its receipt.
    pub fn invoice(&self, request: &InvoiceRequest) -> Result<InvoiceReceipt> {
        let mut state = self.store.load()?;
        let now = VirtualClock::with_offset(state.time_offset).now();
        let invoice = InvoiceStore::new(&mut state).create(request, now, self.encoder.as_ref())?;
        self.store.persist(&state)?;
        debug!(label = %invoice.label, expires_at = invoice.expires_at, "created invoice");
        Ok(InvoiceReceipt::from(&invoice))
    }

    /// Lists all invoices, expiring due ones and running autoclean as
    /// side effects.
    pub fn list_invoices(&self) -> Result<Vec<InvoiceDetails>> {
        let mut state = self.store.load()?;
        let now = VirtualClock::with_offset(state.time_offset).now();
        let details: Vec<InvoiceDetails> = InvoiceStore::new(&mut state)
            .list(now)
            .iter()
            .map(InvoiceDetails::from)
            .collect();
        self.store.persist(&state)?;
        Ok(details)
    }

    /// Reconfigures the autoclean policy and stamps the last-clean
    /// timestamp to now.
    pub fn autoclean(&self, cycle_seconds: i64, expired_by: i64) -> Result<()> {
        let mut state = self.store.load()?;
        let now = VirtualClock::with_offset(state.time_offset).now();
        state.autoclean_cycle_seconds = cycle_seconds;
        state.autoclean_last_clean = Some(now);
        state.autoclean_expired_by = expired_by;
        self.store.persist(&state)?;
        debug!(cycle_seconds, expired_by, "autoclean reconfigured");
        Ok(())
    }

    /// Deletes the labelled invoice, which must be in `expected`
    /// status.
    pub fn del_invoice(&self, label: &str, expected: InvoiceStatus) -> Result<()> {
        let mut state = self.store.load()?;
        InvoiceStore::new(&mut state).delete(label, expected)?;
        self.store.persist(&state)?;
        debug!(label, "deleted invoice");
        Ok(())
    }

    /// Marks the labelled invoice paid at the current virtual time.
    pub fn mark_paid(&self, label: &str) -> Result<()> {
        let mut state = self.store.load()?;
        let now = VirtualClock::with_offset(state.time_offset).now();
        InvoiceStore::new(&mut state).mark_paid(label, now)?;
        self.store.persist(&state)?;
        debug!(label, "marked invoice paid");
        Ok(())
    }

    /// Adds `seconds` (positive or negative) to the virtual clock
    /// offset and returns the new offset.
    pub fn advance_time(&self, seconds: i64) -> Result<i64> {
        let mut state = self.store.load()?;
        let mut clock = VirtualClock::with_offset(state.time_offset);
        let offset = clock.advance(seconds);
        state.time_offset = offset;
        self.store.persist(&state)?;
        info!(seconds, offset, "advanced virtual time");
        Ok(offset)
    }

    /// Restores the state to its empty baseline, clearing invoices,
    /// the clock offset and the autoclean configuration.
    pub fn reset(&self) -> Result<()> {
        self.store.persist(&DaemonState::default())?;
        info!("state reset to empty baseline");
        Ok(())
    }

    /// The current virtual time as this node sees it.
    pub fn now(&self) -> Result<i64> {
        let state = self.store.load()?;
        Ok(VirtualClock::with_offset(state.time_offset).now())
    }
}
