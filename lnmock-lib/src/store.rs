//! The invoice state machine over a borrowed daemon state.
//!
//! Status transitions are monotone: unpaid → paid or unpaid → expired,
//! never reversed. Pay indexes come from a persisted high-watermark so
//! an index is never reused, even after the invoice that held it is
//! deleted.

use crate::bolt11::{Bolt11Encoder, Bolt11Request};
use crate::invoice::{generate_preimage, payment_hash, Invoice, InvoiceRequest, InvoiceStatus};
use crate::state::DaemonState;
use crate::{LnMockError, Result, MSAT_PER_BTC, PAID_FEE_MSAT};

/// Invoice collection logic: creation, expiry, payment, deletion and
/// retention, all driven by an externally supplied virtual timestamp.
pub struct InvoiceStore<'a> {
    state: &'a mut DaemonState,
}

impl<'a> InvoiceStore<'a> {
    /// Store view over `state`.
    pub fn new(state: &'a mut DaemonState) -> Self {
        Self { state }
    }

    /// Creates a new unpaid invoice at virtual time `now`.
    ///
    /// Fails with [`LnMockError::DuplicateLabel`] before anything is
    /// generated or encoded, leaving the state untouched.
    pub fn create(
        &mut self,
        request: &InvoiceRequest,
        now: i64,
        encoder: &dyn Bolt11Encoder,
    ) -> Result<Invoice> {
        if self.state.invoices.iter().any(|i| i.label == request.label) {
            return Err(LnMockError::DuplicateLabel(request.label.clone()));
        }

        let preimage = request.preimage.clone().unwrap_or_else(generate_preimage);
        let hash = payment_hash(&preimage)?;
        let bolt11 = encoder.encode(&Bolt11Request {
            currency: "bc".to_string(),
            amount_btc: request.msatoshi as f64 / MSAT_PER_BTC as f64,
            timestamp: now,
            payment_hash: hash.clone(),
            description: request.description.clone(),
            expiry: request.expiry,
        })?;

        let invoice = Invoice {
            label: request.label.clone(),
            bolt11,
            payment_hash: hash,
            msatoshi: request.msatoshi,
            status: InvoiceStatus::Unpaid,
            expires_at: now + request.expiry,
            paid_at: None,
            msatoshi_received: None,
            pay_index: None,
        };
        self.state.invoices.push(invoice.clone());
        Ok(invoice)
    }

    /// Flips every unpaid invoice past its expiry to expired.
    /// Re-checking an already-expired invoice is a no-op.
    pub fn expire_due(&mut self, now: i64) {
        for invoice in &mut self.state.invoices {
            if invoice.status == InvoiceStatus::Unpaid && now > invoice.expires_at {
                invoice.status = InvoiceStatus::Expired;
            }
        }
    }

    /// Re-evaluates expiries, runs autoclean, and returns all remaining
    /// invoices in insertion order. Never fails.
    pub fn list(&mut self, now: i64) -> &[Invoice] {
        self.expire_due(now);
        self.autoclean(now);
        &self.state.invoices
    }

    /// Marks the labelled invoice paid at virtual time `now`.
    ///
    /// Deliberately not idempotent: paying the same label twice re-runs
    /// the transition and assigns a fresh, higher pay index, matching
    /// the original node's observed behavior.
    pub fn mark_paid(&mut self, label: &str, now: i64) -> Result<()> {
        let next_index = self.state.last_pay_index + 1;
        let invoice = self
            .state
            .invoices
            .iter_mut()
            .find(|i| i.label == label)
            .ok_or_else(|| LnMockError::NotFound(label.to_string()))?;

        invoice.status = InvoiceStatus::Paid;
        invoice.paid_at = Some(now);
        invoice.msatoshi_received = Some(invoice.msatoshi + PAID_FEE_MSAT);
        invoice.pay_index = Some(next_index);
        self.state.last_pay_index = next_index;
        Ok(())
    }

    /// Removes the labelled invoice, which must currently be in
    /// `expected` status. The deleted invoice's pay index is never
    /// reclaimed.
    pub fn delete(&mut self, label: &str, expected: InvoiceStatus) -> Result<()> {
        let position = self
            .state
            .invoices
            .iter()
            .position(|i| i.label == label)
            .ok_or_else(|| LnMockError::NotFound(label.to_string()))?;

        let actual = self.state.invoices[position].status;
        if actual != expected {
            return Err(LnMockError::StatusMismatch {
                label: label.to_string(),
                expected,
                actual,
            });
        }
        self.state.invoices.remove(position);
        Ok(())
    }

    /// Prunes expired invoices past the retention window, at most once
    /// per configured cycle. No-op while the cycle is 0.
    pub fn autoclean(&mut self, now: i64) {
        if self.state.autoclean_cycle_seconds == 0 {
            return;
        }
        if let Some(last) = self.state.autoclean_last_clean {
            if now - last < self.state.autoclean_cycle_seconds {
                return;
            }
        }

        let expired_by = self.state.autoclean_expired_by;
        self.state
            .invoices
            .retain(|i| i.status != InvoiceStatus::Expired || now - i.expires_at < expired_by);
        self.state.autoclean_last_clean = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bolt11::StubEncoder;

    fn request(label: &str, expiry: i64) -> InvoiceRequest {
        InvoiceRequest::new(10_000, label, "a test invoice", expiry)
    }

    fn create(state: &mut DaemonState, label: &str, expiry: i64, now: i64) {
        InvoiceStore::new(state)
            .create(&request(label, expiry), now, &StubEncoder)
            .unwrap();
    }

    #[test]
    fn test_duplicate_label_leaves_state_unchanged() {
        let mut state = DaemonState::default();
        create(&mut state, "a", 600, 0);

        let err = InvoiceStore::new(&mut state)
            .create(&request("a", 600), 5, &StubEncoder)
            .unwrap_err();
        assert!(matches!(err, LnMockError::DuplicateLabel(label) if label == "a"));
        assert_eq!(state.invoices.len(), 1);
        assert_eq!(state.invoices[0].expires_at, 600);
    }

    #[test]
    fn test_create_sets_expiry_and_hash() {
        let mut state = DaemonState::default();
        let preimage = "11".repeat(32);
        let invoice = InvoiceStore::new(&mut state)
            .create(
                &request("a", 600).with_preimage(preimage.clone()),
                100,
                &StubEncoder,
            )
            .unwrap();
        assert_eq!(invoice.expires_at, 700);
        assert_eq!(invoice.status, InvoiceStatus::Unpaid);
        assert_eq!(invoice.payment_hash, payment_hash(&preimage).unwrap());
    }

    #[test]
    fn test_list_expires_due_invoices() {
        let mut state = DaemonState::default();
        create(&mut state, "a", 600, 0);
        create(&mut state, "b", 1000, 0);

        let mut store = InvoiceStore::new(&mut state);
        store.expire_due(599);
        assert!(state.invoices.iter().all(|i| i.status == InvoiceStatus::Unpaid));

        let mut store = InvoiceStore::new(&mut state);
        let listed = store.list(601);
        assert_eq!(listed[0].status, InvoiceStatus::Expired);
        assert_eq!(listed[1].status, InvoiceStatus::Unpaid);
    }

    #[test]
    fn test_expire_is_idempotent_and_never_reverses() {
        let mut state = DaemonState::default();
        create(&mut state, "a", 600, 0);
        InvoiceStore::new(&mut state).expire_due(601);
        InvoiceStore::new(&mut state).expire_due(601);
        assert_eq!(state.invoices[0].status, InvoiceStatus::Expired);

        // Marking paid after expiry still requires the label to exist,
        // and a paid invoice never flips back on later expiry checks.
        create(&mut state, "b", 600, 0);
        InvoiceStore::new(&mut state).mark_paid("b", 10).unwrap();
        InvoiceStore::new(&mut state).expire_due(10_000);
        assert_eq!(state.invoices[1].status, InvoiceStatus::Paid);
    }

    #[test]
    fn test_mark_paid_sets_receipt_fields() {
        let mut state = DaemonState::default();
        create(&mut state, "a", 600, 0);
        InvoiceStore::new(&mut state).mark_paid("a", 42).unwrap();

        let invoice = &state.invoices[0];
        assert_eq!(invoice.status, InvoiceStatus::Paid);
        assert_eq!(invoice.paid_at, Some(42));
        assert_eq!(invoice.msatoshi_received, Some(10_033));
        assert_eq!(invoice.pay_index, Some(1));
    }

    #[test]
    fn test_mark_paid_unknown_label() {
        let mut state = DaemonState::default();
        let err = InvoiceStore::new(&mut state).mark_paid("ghost", 0).unwrap_err();
        assert!(matches!(err, LnMockError::NotFound(label) if label == "ghost"));
    }

    #[test]
    fn test_pay_index_survives_deletion() {
        let mut state = DaemonState::default();
        create(&mut state, "a", 600, 0);
        InvoiceStore::new(&mut state).mark_paid("a", 1).unwrap();
        InvoiceStore::new(&mut state)
            .delete("a", InvoiceStatus::Paid)
            .unwrap();

        create(&mut state, "b", 600, 0);
        InvoiceStore::new(&mut state).mark_paid("b", 2).unwrap();
        assert_eq!(state.invoices[0].pay_index, Some(2));
    }

    #[test]
    fn test_double_mark_paid_reassigns_higher_index() {
        // Known fidelity gap with a real node, preserved on purpose.
        let mut state = DaemonState::default();
        create(&mut state, "a", 600, 0);
        InvoiceStore::new(&mut state).mark_paid("a", 1).unwrap();
        InvoiceStore::new(&mut state).mark_paid("a", 2).unwrap();
        assert_eq!(state.invoices[0].pay_index, Some(2));
        assert_eq!(state.last_pay_index, 2);
    }

    #[test]
    fn test_delete_status_mismatch() {
        let mut state = DaemonState::default();
        create(&mut state, "a", 600, 0);
        InvoiceStore::new(&mut state).mark_paid("a", 1).unwrap();

        let err = InvoiceStore::new(&mut state)
            .delete("a", InvoiceStatus::Unpaid)
            .unwrap_err();
        match err {
            LnMockError::StatusMismatch {
                label,
                expected,
                actual,
            } => {
                assert_eq!(label, "a");
                assert_eq!(expected, InvoiceStatus::Unpaid);
                assert_eq!(actual, InvoiceStatus::Paid);
            }
            other => panic!("expected StatusMismatch, got {other:?}"),
        }
        assert_eq!(state.invoices.len(), 1);
    }

    #[test]
    fn test_autoclean_disabled_when_cycle_is_zero() {
        let mut state = DaemonState::default();
        state.autoclean_expired_by = 1;
        create(&mut state, "a", 1, 0);
        let mut store = InvoiceStore::new(&mut state);
        store.list(1_000_000);
        assert_eq!(state.invoices.len(), 1);
        assert!(state.autoclean_last_clean.is_none());
    }

    #[test]
    fn test_autoclean_respects_retention_window() {
        let mut state = DaemonState::default();
        state.autoclean_cycle_seconds = 10;
        state.autoclean_last_clean = Some(0);
        state.autoclean_expired_by = 100;
        create(&mut state, "a", 1, 0);

        // Expired for 49 seconds, still inside the window: retained.
        let mut store = InvoiceStore::new(&mut state);
        store.list(50);
        assert_eq!(state.invoices.len(), 1);
        assert_eq!(state.autoclean_last_clean, Some(50));

        // Expired for 199 seconds: pruned.
        let mut store = InvoiceStore::new(&mut state);
        store.list(200);
        assert!(state.invoices.is_empty());
        assert_eq!(state.autoclean_last_clean, Some(200));
    }

    #[test]
    fn test_autoclean_rate_limited_by_cycle() {
        let mut state = DaemonState::default();
        state.autoclean_cycle_seconds = 3600;
        state.autoclean_last_clean = Some(0);
        state.autoclean_expired_by = 10;
        create(&mut state, "a", 1, 0);

        // Eligible for pruning, but the cycle has not elapsed.
        let mut store = InvoiceStore::new(&mut state);
        store.list(60);
        assert_eq!(state.invoices.len(), 1);
        assert_eq!(state.autoclean_last_clean, Some(0));
    }

    #[test]
    fn test_autoclean_keeps_unexpired_regardless_of_age() {
        let mut state = DaemonState::default();
        state.autoclean_cycle_seconds = 1;
        state.autoclean_last_clean = Some(0);
        state.autoclean_expired_by = 1;
        create(&mut state, "paid", 10, 0);
        InvoiceStore::new(&mut state).mark_paid("paid", 1).unwrap();
        create(&mut state, "open", 1_000_000, 0);

        let mut store = InvoiceStore::new(&mut state);
        store.list(500_000);
        assert_eq!(state.invoices.len(), 2);
    }
}
