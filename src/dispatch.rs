//! Fire-and-forget background dispatch with panic isolation.
//!
//! Webhook handlers acknowledge the platform before domain processing runs,
//! so every unit of work handed to [`dispatch`] must survive the death of
//! the triggering request. The caller receives no completion signal; errors
//! are logged and swallowed, panics are caught at the task boundary.

use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use tokio::task::JoinHandle;
use tracing::{error, info_span, Instrument};

use crate::context::ExecutionContext;
use crate::Result;

/// Run a unit of work on its own task, detached from the caller's lifetime.
///
/// The context is detached before spawning so the work cannot observe
/// request cancellation. An `Err` from the future is logged, never
/// re-raised. A panic inside the future is caught, logged with its payload,
/// and does not propagate; the returned handle resolves `Ok(())` either way.
///
/// The handle exists for tests and shutdown joins only — domain callers
/// must not await it.
pub fn dispatch<F>(ctx: &ExecutionContext, label: &'static str, work: F) -> JoinHandle<()>
where
    F: std::future::Future<Output = Result<()>> + Send + 'static,
{
    let ctx = ctx.detached();
    let span = info_span!(
        "dispatch",
        task = label,
        request_id = %ctx.request_id,
        actor = %ctx.identity,
    );

    tokio::spawn(
        async move {
            match AssertUnwindSafe(work).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    error!(%err, task = label, "dispatched work failed");
                }
                Err(panic) => {
                    let payload = panic_message(panic.as_ref());
                    error!(task = label, payload, "dispatched work panicked");
                }
            }
        }
        .instrument(span),
    )
}

/// Best-effort extraction of a human-readable panic payload.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
