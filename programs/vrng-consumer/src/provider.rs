use std::fmt;

use primitive_types::U256;

use crate::coordinator::VrngConsumer;
use crate::errors::ProviderError;
use crate::state::Address;

/// External randomness source a coordinator forwards requests to.
///
/// A provider accepts a request synchronously and hands back a fresh request
/// id. At some later point it must call
/// [`VrngConsumer::fulfill`] exactly once for that id, identifying itself
/// with [`RandomnessProvider::address`].
pub trait RandomnessProvider: Send + Sync {
    /// Identity the provider uses when fulfilling.
    fn address(&self) -> Address;

    /// Accept a new request. `trace_id` is an opaque correlation value.
    fn request_random_number(&self, trace_id: U256) -> Result<U256, ProviderError>;
}

impl fmt::Debug for dyn RandomnessProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomnessProvider")
            .field("address", &self.address())
            .finish()
    }
}

/// Host-program extension point run after a request is fulfilled.
///
/// The request has already been committed as fulfilled when this runs, so
/// the hook may call back into the coordinator freely; a nested fulfillment
/// of the same id is rejected.
pub trait FulfillmentHook {
    fn on_fulfilled(
        &mut self,
        consumer: &mut VrngConsumer,
        request_id: U256,
        normalized_value: U256,
    );
}

/// Hook that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHook;

impl FulfillmentHook for NoHook {
    fn on_fulfilled(&mut self, _: &mut VrngConsumer, _: U256, _: U256) {}
}

impl<F> FulfillmentHook for F
where
    F: FnMut(&mut VrngConsumer, U256, U256),
{
    fn on_fulfilled(
        &mut self,
        consumer: &mut VrngConsumer,
        request_id: U256,
        normalized_value: U256,
    ) {
        self(consumer, request_id, normalized_value)
    }
}
