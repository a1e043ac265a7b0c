//! Transport facade: three interchangeable node backends.
//!
//! Test code talks to a [`NodeClient`] and never cares whether the
//! node is in-process ([`DirectClient`]), a subprocess driving the
//! standalone `lnmock-node` binary ([`SubprocessClient`]), or a real
//! node behind an RPC client ([`RpcPassthroughClient`]). All three
//! present the identical operation set and error contract; the real
//! backend narrows the set via [`NodeClient::supports`] because the
//! simulation-only controls are meaningless against a real node.

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::json;
use tokio::process::Command;
use tracing::debug;

use crate::invoice::{generate_preimage, InvoiceDetails, InvoiceReceipt, InvoiceRequest, InvoiceStatus};
use crate::node::MockNode;
use crate::{LnMockError, Result};

/// The node's operation set, for capability checks and dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    /// Create an invoice.
    Invoice,
    /// List invoices, expiring and autocleaning as side effects.
    ListInvoices,
    /// Reconfigure the autoclean policy (simulation-only).
    AutoClean,
    /// Delete an invoice with an expected status.
    DelInvoice,
    /// Mark an invoice paid (simulation control).
    MarkPaid,
    /// Shift the virtual clock (simulation-only).
    AdvanceTime,
    /// Restore the empty state baseline.
    Reset,
}

impl Operation {
    /// The wire/CLI name of the operation.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Invoice => "invoice",
            Self::ListInvoices => "listinvoices",
            Self::AutoClean => "autocleaninvoice",
            Self::DelInvoice => "delinvoice",
            Self::MarkPaid => "markpaid",
            Self::AdvanceTime => "advancetime",
            Self::Reset => "reset",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Uniform client interface over the three backends.
#[async_trait]
pub trait NodeClient: Send + Sync {
    /// Whether this backend can execute `op` at all. Unsupported
    /// operations fail fast with [`LnMockError::Unsupported`] instead
    /// of being silently ignored.
    fn supports(&self, op: Operation) -> bool {
        let _ = op;
        true
    }

    /// Creates an invoice.
    async fn invoice(&self, request: &InvoiceRequest) -> Result<InvoiceReceipt>;

    /// Lists all invoices.
    async fn list_invoices(&self) -> Result<Vec<InvoiceDetails>>;

    /// Reconfigures the autoclean retention policy.
    async fn autoclean(&self, cycle_seconds: i64, expired_by: i64) -> Result<()>;

    /// Deletes an invoice that is currently in `expected` status.
    async fn del_invoice(&self, label: &str, expected: InvoiceStatus) -> Result<()>;

    /// Marks an invoice paid.
    async fn mark_paid(&self, label: &str) -> Result<()>;

    /// Shifts the virtual clock by `seconds`.
    async fn advance_time(&self, seconds: i64) -> Result<()>;

    /// Restores the empty state baseline.
    async fn reset(&self) -> Result<()>;
}

/// In-process backend: lowest latency, used for fast unit tests.
pub struct DirectClient {
    node: MockNode,
}

impl DirectClient {
    /// Client over an owned node.
    pub fn new(node: MockNode) -> Self {
        Self { node }
    }

    /// The wrapped node, for assertions that bypass the facade.
    pub fn node(&self) -> &MockNode {
        &self.node
    }
}

#[async_trait]
impl NodeClient for DirectClient {
    async fn invoice(&self, request: &InvoiceRequest) -> Result<InvoiceReceipt> {
        self.node.invoice(request)
    }

    async fn list_invoices(&self) -> Result<Vec<InvoiceDetails>> {
        self.node.list_invoices()
    }

    async fn autoclean(&self, cycle_seconds: i64, expired_by: i64) -> Result<()> {
        self.node.autoclean(cycle_seconds, expired_by)
    }

    async fn del_invoice(&self, label: &str, expected: InvoiceStatus) -> Result<()> {
        self.node.del_invoice(label, expected)
    }

    async fn mark_paid(&self, label: &str) -> Result<()> {
        self.node.mark_paid(label)
    }

    async fn advance_time(&self, seconds: i64) -> Result<()> {
        self.node.advance_time(seconds).map(|_| ())
    }

    async fn reset(&self) -> Result<()> {
        self.node.reset()
    }
}

/// Subprocess backend: serializes each operation to a command-line
/// invocation of the standalone `lnmock-node` executable. Black-box
/// testing of the exact CLI contract consumers will use.
pub struct SubprocessClient {
    program: PathBuf,
    state_file: Option<PathBuf>,
}

impl SubprocessClient {
    /// Client driving `program` against its default state file.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            state_file: None,
        }
    }

    /// Client driving `program` with an explicit `--state-file`.
    pub fn with_state_file(program: impl Into<PathBuf>, state_file: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            state_file: Some(state_file.into()),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new(&self.program);
        if let Some(path) = &self.state_file {
            cmd.arg("--state-file").arg(path);
        }
        cmd.args(args);
        debug!(program = %self.program.display(), ?args, "spawning node subprocess");

        let output = cmd.output().await.map_err(|e| {
            LnMockError::Transport(format!("failed to run {}: {}", self.program.display(), e))
        })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(decode_remote_error(stderr.trim()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Maps a failed subprocess's stderr back onto the error taxonomy.
/// The binary prints a `{code, message}` object; anything else is a
/// plain transport failure.
fn decode_remote_error(stderr: &str) -> LnMockError {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(stderr) {
        if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
            return LnMockError::from_remote(message);
        }
    }
    LnMockError::Transport(stderr.to_string())
}

#[async_trait]
impl NodeClient for SubprocessClient {
    async fn invoice(&self, request: &InvoiceRequest) -> Result<InvoiceReceipt> {
        // The CLI takes the preimage positionally, so generate here
        // when the caller left it out.
        let preimage = request.preimage.clone().unwrap_or_else(generate_preimage);
        let msatoshi = request.msatoshi.to_string();
        let expiry = request.expiry.to_string();
        let stdout = self
            .run(&[
                "invoice",
                &msatoshi,
                &request.label,
                &request.description,
                &expiry,
                &preimage,
            ])
            .await?;
        serde_json::from_str(&stdout).map_err(|e| LnMockError::Serialization(e.to_string()))
    }

    async fn list_invoices(&self) -> Result<Vec<InvoiceDetails>> {
        let stdout = self.run(&["listinvoices"]).await?;
        serde_json::from_str(&stdout).map_err(|e| LnMockError::Serialization(e.to_string()))
    }

    async fn autoclean(&self, cycle_seconds: i64, expired_by: i64) -> Result<()> {
        let cycle_seconds = cycle_seconds.to_string();
        let expired_by = expired_by.to_string();
        self.run(&[
            "autocleaninvoice",
            "--cycle-seconds",
            &cycle_seconds,
            "--expired-by",
            &expired_by,
        ])
        .await
        .map(|_| ())
    }

    async fn del_invoice(&self, label: &str, expected: InvoiceStatus) -> Result<()> {
        self.run(&["delinvoice", label, expected.as_str()])
            .await
            .map(|_| ())
    }

    async fn mark_paid(&self, label: &str) -> Result<()> {
        self.run(&["markpaid", label]).await.map(|_| ())
    }

    async fn advance_time(&self, seconds: i64) -> Result<()> {
        let seconds = seconds.to_string();
        self.run(&["advancetime", &seconds]).await.map(|_| ())
    }

    async fn reset(&self) -> Result<()> {
        self.run(&["reset"]).await.map(|_| ())
    }
}

/// Error surfaced by a real node's RPC client.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct RpcFailure(pub String);

/// The real Lightning node RPC client, specified only at this
/// boundary. Implement it over whatever client the host test suite
/// already carries.
#[async_trait]
pub trait LightningRpc: Send + Sync {
    /// Issues a raw RPC call and returns its JSON result.
    async fn call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> std::result::Result<serde_json::Value, RpcFailure>;
}

/// Passthrough backend: forwards operations to an actual node RPC
/// client. Client failures are converted to [`LnMockError::Transport`]
/// values, never propagated as raw faults. The simulation-only clock
/// and retention controls are unsupported here.
pub struct RpcPassthroughClient<R> {
    rpc: R,
}

impl<R: LightningRpc> RpcPassthroughClient<R> {
    /// Client forwarding to `rpc`.
    pub fn new(rpc: R) -> Self {
        Self { rpc }
    }

    fn op_supported(op: Operation) -> bool {
        !matches!(op, Operation::AutoClean | Operation::AdvanceTime)
    }

    async fn call(&self, op: Operation, params: serde_json::Value) -> Result<serde_json::Value> {
        if !Self::op_supported(op) {
            return Err(LnMockError::Unsupported(op));
        }
        self.rpc
            .call(op.name(), params)
            .await
            .map_err(|e| LnMockError::Transport(format!("{} failed: {}", op.name(), e)))
    }
}

#[async_trait]
impl<R: LightningRpc> NodeClient for RpcPassthroughClient<R> {
    fn supports(&self, op: Operation) -> bool {
        Self::op_supported(op)
    }

    async fn invoice(&self, request: &InvoiceRequest) -> Result<InvoiceReceipt> {
        let mut params = json!({
            "msatoshi": request.msatoshi,
            "label": request.label,
            "description": request.description,
            "expiry": request.expiry,
        });
        if let Some(preimage) = &request.preimage {
            params["preimage"] = json!(preimage);
        }
        let value = self.call(Operation::Invoice, params).await?;
        InvoiceReceipt::from_value(&value)
    }

    async fn list_invoices(&self) -> Result<Vec<InvoiceDetails>> {
        let value = self.call(Operation::ListInvoices, json!({})).await?;
        // A real node wraps the array in {"invoices": [...]}.
        let items = value.get("invoices").cloned().unwrap_or(value);
        let details: Vec<InvoiceDetails> =
            serde_json::from_value(items).map_err(|e| LnMockError::Serialization(e.to_string()))?;
        Ok(details.into_iter().map(InvoiceDetails::normalized).collect())
    }

    async fn autoclean(&self, _cycle_seconds: i64, _expired_by: i64) -> Result<()> {
        Err(LnMockError::Unsupported(Operation::AutoClean))
    }

    async fn del_invoice(&self, label: &str, expected: InvoiceStatus) -> Result<()> {
        self.call(
            Operation::DelInvoice,
            json!({ "label": label, "status": expected.as_str() }),
        )
        .await
        .map(|_| ())
    }

    async fn mark_paid(&self, label: &str) -> Result<()> {
        self.call(Operation::MarkPaid, json!({ "label": label }))
            .await
            .map(|_| ())
    }

    async fn advance_time(&self, _seconds: i64) -> Result<()> {
        Err(LnMockError::Unsupported(Operation::AdvanceTime))
    }

    async fn reset(&self) -> Result<()> {
        self.call(Operation::Reset, json!({})).await.map(|_| ())
    }
}
