//! Task runner: one source, one target, one deadline.
//!
//! [`run_task`] is total. Whatever the source does (finish, hang, return an
//! error, panic) the caller gets back a [`TaskOutcome`]; nothing propagates.
//!
//! ```text
//! Idle ─► Filtering ─┬─► Skipped
//!                    └─► Running ─┬─► Completed  → SiteResults
//!                                 ├─► TimedOut   → ErrorResult(Timeout)
//!                                 └─► Failed     → ErrorResult(SourceFault)
//! ```

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::{FutureExt, StreamExt};
use serde_json::Value;

use crate::error::LookupError;
use crate::source::{Credentials, ProxyConfig, Source, SourceFactory};
use crate::types::{
    ErrorKind, ErrorResult, Finding, SiteOutcome, SiteResults, SourceDescriptor, TargetInfo,
};

/// Everything a task needs besides its own descriptor.
///
/// One context is shared (behind an [`Arc`]) by every task of a wave; all of
/// it is read-only.
#[derive(Clone)]
pub struct TaskContext {
    /// The target of the current wave.
    pub target_info: TargetInfo,
    /// Shared credentials.
    pub credentials: Arc<Credentials>,
    /// Shared proxy settings.
    pub proxies: Arc<ProxyConfig>,
    /// Builds sources from descriptors.
    pub factory: Arc<dyn SourceFactory>,
    /// Passed through to sources.
    pub verbose: bool,
    /// Hard deadline for draining one source.
    pub timeout: Duration,
    /// Pause before each lookup.
    pub delay: Duration,
}

impl std::fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskContext")
            .field("target_info", &self.target_info)
            .field("verbose", &self.verbose)
            .field("timeout", &self.timeout)
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

/// Result of running one task.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    /// The source does not apply to the target's otype.
    Skipped,
    /// The source completed.
    Results(SiteResults),
    /// The source timed out or faulted.
    Error(ErrorResult),
}

impl TaskOutcome {
    /// Drop the skip sentinel, keeping real outcomes.
    pub fn into_outcome(self) -> Option<SiteOutcome> {
        match self {
            Self::Skipped => None,
            Self::Results(site) => Some(SiteOutcome::Results(site)),
            Self::Error(error) => Some(SiteOutcome::Error(error)),
        }
    }
}

/// Run `descriptor` against the context's target.
///
/// The descriptor is deep-copied before `target`, `verbose` and `name` are
/// injected into its config, so the caller's registry is never touched.
/// The pre-delay suspends only this task.
pub async fn run_task(descriptor: &SourceDescriptor, ctx: &TaskContext) -> TaskOutcome {
    let target_info = &ctx.target_info;

    if !descriptor.supports(&target_info.otype) {
        tracing::debug!(
            source = %descriptor.name,
            otype = %target_info.otype,
            "source does not support otype, skipping"
        );
        return TaskOutcome::Skipped;
    }

    let mut descriptor = descriptor.clone();
    descriptor
        .config
        .insert("target".into(), Value::from(target_info.target.clone()));
    descriptor
        .config
        .insert("verbose".into(), Value::from(ctx.verbose));
    descriptor
        .config
        .insert("name".into(), Value::from(descriptor.name.clone()));

    if !ctx.delay.is_zero() {
        tokio::time::sleep(ctx.delay).await;
    }

    let started = Instant::now();

    let mut source = match build_source(&descriptor, ctx) {
        Ok(source) => source,
        Err(message) => return fault(ctx, descriptor, message),
    };

    let drained = AssertUnwindSafe(drain(source.as_mut())).catch_unwind();

    match tokio::time::timeout(ctx.timeout, drained).await {
        Ok(Ok(Ok(results))) => {
            tracing::debug!(
                source = %descriptor.name,
                count = results.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "source completed"
            );
            TaskOutcome::Results(SiteResults {
                descriptor,
                results,
            })
        }
        Ok(Ok(Err(err))) => fault(ctx, descriptor, err.to_string()),
        Ok(Err(panic)) => fault(ctx, descriptor, panic_message(panic.as_ref())),
        Err(_) => {
            tracing::warn!(
                source = %descriptor.name,
                observable = %target_info.target,
                timeout_secs = ctx.timeout.as_secs_f64(),
                "source timed out"
            );
            TaskOutcome::Error(ErrorResult {
                target_info: target_info.clone(),
                descriptor,
                error: ErrorKind::Timeout,
            })
        }
    }
}

/// Construct the source, turning both errors and panics into a message.
fn build_source(
    descriptor: &SourceDescriptor,
    ctx: &TaskContext,
) -> Result<Box<dyn Source>, String> {
    let built = std::panic::catch_unwind(AssertUnwindSafe(|| {
        ctx.factory.build(descriptor, &ctx.credentials, &ctx.proxies)
    }));
    match built {
        Ok(Ok(source)) => Ok(source),
        Ok(Err(err)) => Err(err.to_string()),
        Err(panic) => Err(panic_message(panic.as_ref())),
    }
}

/// Pull the source's findings to completion, stopping at the first fault.
async fn drain(source: &mut dyn Source) -> Result<Vec<Finding>, LookupError> {
    let mut stream = source.run();
    let mut results = Vec::new();
    while let Some(item) = stream.next().await {
        results.push(Finding::from(item?));
    }
    Ok(results)
}

fn fault(ctx: &TaskContext, descriptor: SourceDescriptor, message: String) -> TaskOutcome {
    tracing::warn!(
        source = %descriptor.name,
        observable = %ctx.target_info.target,
        error = %message,
        "source failed"
    );
    TaskOutcome::Error(ErrorResult {
        target_info: ctx.target_info.clone(),
        descriptor,
        error: ErrorKind::SourceFault(message),
    })
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("source panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("source panicked: {message}")
    } else {
        "source panicked".to_owned()
    }
}
