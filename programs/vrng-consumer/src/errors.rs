use thiserror::Error;

/// Error codes for the VRNG coordinator.
///
/// Every variant aborts the operation that raised it before any state is
/// written, so a failed call is always safe to retry or abandon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CoordinatorError {
    /// A request was attempted while no provider is bound.
    #[error("VRNG provider is not initialized")]
    NotInitialized,
    /// The provider returned an identifier that already exists in coordinator state.
    #[error("Invalid request id")]
    InvalidRequestId,
    /// The request is not in `Requested` status (never requested, or already fulfilled).
    #[error("Invalid fulfillment")]
    InvalidFulfillment,
    /// Fulfillment was attempted by an account other than the bound provider.
    #[error("Only the VRNG provider may fulfill")]
    OnlyProvider,
    /// The normalization method configuration value is out of range.
    #[error("Invalid normalization method: {0}")]
    InvalidNormalizationMethod(u8),
    /// The provider refused to accept the request.
    #[error("Provider rejected the request: {0}")]
    ProviderRejected(ProviderError),
}

/// Failures a [`RandomnessProvider`](crate::provider::RandomnessProvider)
/// may report when asked for a new request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The provider's request counter would overflow.
    #[error("Request counter overflow")]
    CounterOverflow,
    /// The provider's fulfillment queue is closed or full.
    #[error("Provider unavailable")]
    Unavailable,
}

impl From<ProviderError> for CoordinatorError {
    fn from(err: ProviderError) -> Self {
        CoordinatorError::ProviderRejected(err)
    }
}

pub type Result<T, E = CoordinatorError> = std::result::Result<T, E>;
