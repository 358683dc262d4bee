//! Bounded transparent retry for transient concurrency conflicts.

use contable_core::{DomainError, DomainResult};
use tracing::warn;

/// How many attempts a counter operation gets before its conflict surfaces.
pub const DEFAULT_ATTEMPTS: u32 = 3;

/// Run `op`, retrying transient conflicts up to `attempts` times.
///
/// Deterministic validation failures surface immediately; only
/// [`DomainError::is_transient`] errors are retried. When the budget runs
/// out, the last conflict is surfaced as-is (a transient failure, not a
/// validation error).
pub fn with_retry<R>(attempts: u32, mut op: impl FnMut() -> DomainResult<R>) -> DomainResult<R> {
    let mut remaining = attempts.max(1);
    loop {
        match op() {
            Err(err) if err.is_transient() && remaining > 1 => {
                remaining -= 1;
                warn!(error = %err, remaining, "transient conflict, retrying");
            }
            other => return other,
        }
    }
}
