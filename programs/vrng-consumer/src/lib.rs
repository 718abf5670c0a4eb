//! Asynchronous VRNG (verifiable random number) request coordinator.
//!
//! A host program composes a [`VrngConsumer`] to request a single random
//! value from an external [`RandomnessProvider`]. The provider accepts the
//! request synchronously, returning a request id, and later calls back with
//! a raw value. The coordinator authenticates the callback against the bound
//! provider, normalizes the raw value with the [`NormalizationMethod`]
//! chosen at construction, records the result and then runs the host's
//! [`FulfillmentHook`].
//!
//! ## Request lifecycle
//!
//! 1. **Bind**: the host calls [`VrngConsumer::bind_provider`].
//! 2. **Request**: [`VrngConsumer::request_random_number`] forwards a trace
//!    id to the provider and records the returned id as `Requested`.
//! 3. **Fulfill**: the provider calls [`VrngConsumer::fulfill`]; status moves
//!    to `Fulfilled` before the hook is invoked.
//!
//! Requests that are never fulfilled stay `Requested` indefinitely.

pub mod block_history;
pub mod coordinator;
pub mod errors;
pub mod events;
pub mod normalization;
pub mod provider;
pub mod state;

pub use block_history::{BlockHistory, NoHistory, RecentBlocks, BLOCK_HASH_WINDOW, ZERO_HASH};
pub use coordinator::VrngConsumer;
pub use errors::{CoordinatorError, ProviderError};
pub use events::{CoordinatorEvent, RequestCreated, RequestFulfilled};
pub use normalization::NormalizationMethod;
pub use primitive_types::U256;
pub use provider::{FulfillmentHook, NoHook, RandomnessProvider};
pub use state::{Address, Request, RequestStatus};
