use ferrous_resolver_domain::DomainError;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Deadline, cancellation and session tag carried by every resolve call.
///
/// The inbound tag is threaded through to dispatchers untouched.
#[derive(Debug, Clone, Default)]
pub struct ResolveContext {
    deadline: Option<Instant>,
    cancel: CancellationToken,
    inbound_tag: Option<Arc<str>>,
}

impl ResolveContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new().with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_inbound_tag(mut self, tag: impl Into<Arc<str>>) -> Self {
        self.inbound_tag = Some(tag.into());
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn inbound_tag(&self) -> Option<&str> {
        self.inbound_tag.as_deref()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Derive a context that ends at the earlier of the parent deadline and
    /// `now + timeout`. Cancelling the parent cancels the child.
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let local = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(parent) => parent.min(local),
            None => local,
        };
        Self {
            deadline: Some(deadline),
            cancel: self.cancel.child_token(),
            inbound_tag: self.inbound_tag.clone(),
        }
    }

    /// Error describing why the context ended, if it has.
    pub fn err(&self) -> Option<DomainError> {
        if self.cancel.is_cancelled() {
            return Some(DomainError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(DomainError::QueryTimeout),
            _ => None,
        }
    }

    /// Completes once the context is cancelled or its deadline passes.
    pub async fn done(&self) -> DomainError {
        match self.deadline {
            Some(deadline) => tokio::select! {
                _ = self.cancel.cancelled() => DomainError::Cancelled,
                _ = tokio::time::sleep_until(deadline) => DomainError::QueryTimeout,
            },
            None => {
                self.cancel.cancelled().await;
                DomainError::Cancelled
            }
        }
    }
}
