use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use primitive_types::U256;
use tracing::{debug, info, warn};

use crate::block_history::{BlockHistory, NoHistory};
use crate::errors::{CoordinatorError, Result};
use crate::events::{CoordinatorEvent, RequestCreated, RequestFulfilled};
use crate::normalization::NormalizationMethod;
use crate::provider::{FulfillmentHook, RandomnessProvider};
use crate::state::{Address, Request, RequestStatus};

/// Request coordinator for a single host program.
///
/// The host holds one of these as an owned field. All state (provider
/// binding and per-request records) lives here and is only mutated through
/// [`bind_provider`](Self::bind_provider),
/// [`request_random_number`](Self::request_random_number) and
/// [`fulfill`](Self::fulfill).
///
/// ## Request lifecycle
///
/// 1. **Request**: the host calls `request_random_number`; the provider
///    assigns an id and the record moves `None -> Requested`.
/// 2. **Fulfill**: the bound provider calls `fulfill` with the raw value;
///    the record moves `Requested -> Fulfilled` and the host hook runs.
pub struct VrngConsumer {
    provider: Option<Arc<dyn RandomnessProvider>>,
    requests: HashMap<U256, Request>,
    method: NormalizationMethod,
    history: Arc<dyn BlockHistory>,
    events: VecDeque<CoordinatorEvent>,
    /// Oldest events are dropped once the log holds this many.
    event_capacity: Option<usize>,
}

impl VrngConsumer {
    /// Build a coordinator from a raw normalization method value.
    ///
    /// Fails with [`CoordinatorError::InvalidNormalizationMethod`] when
    /// `method` does not name a strategy; no instance is created.
    pub fn new(method: u8, history: Arc<dyn BlockHistory>) -> Result<Self> {
        let method = NormalizationMethod::try_from(method)?;
        Ok(Self::with_method(method, history))
    }

    /// Build a coordinator with an already-validated method.
    pub fn with_method(method: NormalizationMethod, history: Arc<dyn BlockHistory>) -> Self {
        debug!(?method, "Coordinator created");
        VrngConsumer {
            provider: None,
            requests: HashMap::new(),
            method,
            history,
            events: VecDeque::new(),
            event_capacity: None,
        }
    }

    /// Coordinator with no block history. Only meaningful for the
    /// methods that do not read it, or for degraded output.
    pub fn without_history(method: NormalizationMethod) -> Self {
        Self::with_method(method, Arc::new(NoHistory))
    }

    /// Set or replace the bound provider. `None` disables requests.
    ///
    /// Access control is the host program's responsibility.
    pub fn bind_provider(&mut self, provider: Option<Arc<dyn RandomnessProvider>>) {
        let previous = self.current_provider();
        self.provider = provider;
        info!(
            previous = ?previous,
            current = ?self.current_provider(),
            "Provider binding updated"
        );
    }

    /// Address of the bound provider, if any.
    pub fn current_provider(&self) -> Option<Address> {
        self.provider.as_ref().map(|p| p.address())
    }

    /// Normalization method fixed at construction.
    pub fn normalization_method(&self) -> NormalizationMethod {
        self.method
    }

    /// Submit a new randomness request to the bound provider.
    ///
    /// 1. Fails with `NotInitialized` when no provider is bound.
    /// 2. Forwards `trace_id` and receives the provider-assigned id.
    /// 3. Fails with `InvalidRequestId` if that id was seen before.
    /// 4. Records the id as `Requested` and emits [`RequestCreated`].
    pub fn request_random_number(&mut self, trace_id: U256) -> Result<U256> {
        let provider = self
            .provider
            .as_ref()
            .ok_or(CoordinatorError::NotInitialized)?;

        let request_id = provider.request_random_number(trace_id)?;

        if self.get_request(request_id).status != RequestStatus::None {
            warn!(%request_id, "Provider returned a reused request id");
            return Err(CoordinatorError::InvalidRequestId);
        }

        self.requests.insert(request_id, Request::requested());
        self.emit(RequestCreated { request_id });
        info!(%request_id, %trace_id, "Randomness requested");

        Ok(request_id)
    }

    /// [`request_random_number`](Self::request_random_number) with a zero trace id.
    pub fn request(&mut self) -> Result<U256> {
        self.request_random_number(U256::zero())
    }

    /// Complete a pending request with the provider's raw output.
    ///
    /// 1. Fails with `OnlyProvider` unless `caller` is the bound provider.
    /// 2. Fails with `InvalidFulfillment` unless the request is `Requested`.
    /// 3. Normalizes `raw_value` and commits the request as `Fulfilled`.
    /// 4. Emits [`RequestFulfilled`], then runs `hook`.
    pub fn fulfill<H>(
        &mut self,
        caller: Address,
        request_id: U256,
        raw_value: U256,
        hook: &mut H,
    ) -> Result<()>
    where
        H: FulfillmentHook + ?Sized,
    {
        if self.current_provider() != Some(caller) {
            warn!(%caller, %request_id, "Fulfillment from unbound caller rejected");
            return Err(CoordinatorError::OnlyProvider);
        }

        if self.get_request(request_id).status != RequestStatus::Requested {
            return Err(CoordinatorError::InvalidFulfillment);
        }

        let normalized_value = self
            .method
            .normalize(raw_value, request_id, self.history.as_ref());

        // Committed before the hook runs so nested calls see `Fulfilled`.
        self.requests
            .insert(request_id, Request::fulfilled(normalized_value));
        self.emit(RequestFulfilled {
            request_id,
            normalized_value,
        });
        info!(%request_id, %normalized_value, "Randomness fulfilled");

        hook.on_fulfilled(self, request_id, normalized_value);
        Ok(())
    }

    /// Snapshot of a request. Unseen ids read as `Request::default()`.
    pub fn get_request(&self, request_id: U256) -> Request {
        self.requests.get(&request_id).copied().unwrap_or_default()
    }

    /// Number of requests still awaiting fulfillment.
    pub fn pending_count(&self) -> usize {
        self.requests
            .values()
            .filter(|r| r.status == RequestStatus::Requested)
            .count()
    }

    /// Drain the observable event log, oldest first.
    pub fn take_events(&mut self) -> Vec<CoordinatorEvent> {
        self.events.drain(..).collect()
    }

    /// Bound the event log. `None` keeps every event until drained.
    ///
    /// Shrinking below the current length drops the oldest events.
    pub fn set_event_capacity(&mut self, capacity: Option<usize>) {
        self.event_capacity = capacity;
        if let Some(cap) = capacity {
            while self.events.len() > cap {
                self.events.pop_front();
            }
        }
    }

    fn emit(&mut self, event: impl Into<CoordinatorEvent>) {
        if let Some(cap) = self.event_capacity {
            if cap == 0 {
                return;
            }
            if self.events.len() == cap {
                self.events.pop_front();
            }
        }
        self.events.push_back(event.into());
    }
}

impl fmt::Debug for VrngConsumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VrngConsumer")
            .field("provider", &self.current_provider())
            .field("method", &self.method)
            .field("requests", &self.requests.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ProviderError;
    use crate::provider::NoHook;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct Counter {
        address: Address,
        next: AtomicU64,
    }

    impl RandomnessProvider for Counter {
        fn address(&self) -> Address {
            self.address
        }

        fn request_random_number(&self, _trace_id: U256) -> Result<U256, ProviderError> {
            Ok(U256::from(self.next.fetch_add(1, Ordering::Relaxed)))
        }
    }

    struct Refusing;

    impl RandomnessProvider for Refusing {
        fn address(&self) -> Address {
            Address::new([9u8; 32])
        }

        fn request_random_number(&self, _trace_id: U256) -> Result<U256, ProviderError> {
            Err(ProviderError::Unavailable)
        }
    }

    fn bound() -> (VrngConsumer, Address) {
        let address = Address::new([1u8; 32]);
        let mut consumer = VrngConsumer::without_history(NormalizationMethod::HyperEfficient);
        consumer.bind_provider(Some(Arc::new(Counter {
            address,
            next: AtomicU64::new(1),
        })));
        (consumer, address)
    }

    #[test]
    fn rebinding_moves_trust() {
        let (mut consumer, old) = bound();
        let id = consumer.request().unwrap();

        let new = Address::new([2u8; 32]);
        consumer.bind_provider(Some(Arc::new(Counter {
            address: new,
            next: AtomicU64::new(100),
        })));

        assert_eq!(
            consumer.fulfill(old, id, U256::one(), &mut NoHook),
            Err(CoordinatorError::OnlyProvider)
        );
        consumer.fulfill(new, id, U256::one(), &mut NoHook).unwrap();
        assert!(consumer.get_request(id).is_fulfilled());
    }

    #[test]
    fn unbinding_disables_requests_and_fulfillment() {
        let (mut consumer, provider) = bound();
        let id = consumer.request().unwrap();
        consumer.bind_provider(None);

        assert_eq!(consumer.current_provider(), None);
        assert_eq!(consumer.request(), Err(CoordinatorError::NotInitialized));
        assert_eq!(
            consumer.fulfill(provider, id, U256::one(), &mut NoHook),
            Err(CoordinatorError::OnlyProvider)
        );
        assert_eq!(consumer.get_request(id).status, RequestStatus::Requested);
    }

    #[test]
    fn provider_refusal_leaves_no_record() {
        let mut consumer = VrngConsumer::without_history(NormalizationMethod::HyperEfficient);
        consumer.bind_provider(Some(Arc::new(Refusing)));

        assert_eq!(
            consumer.request(),
            Err(CoordinatorError::ProviderRejected(ProviderError::Unavailable))
        );
        assert_eq!(consumer.pending_count(), 0);
        assert!(consumer.take_events().is_empty());
    }

    #[test]
    fn pending_count_tracks_outstanding_requests() {
        let (mut consumer, provider) = bound();
        let a = consumer.request().unwrap();
        let _b = consumer.request().unwrap();
        assert_eq!(consumer.pending_count(), 2);

        consumer.fulfill(provider, a, U256::from(5u64), &mut NoHook).unwrap();
        assert_eq!(consumer.pending_count(), 1);
    }

    #[test]
    fn events_are_drained_in_order() {
        let (mut consumer, provider) = bound();
        let id = consumer.request().unwrap();
        consumer.fulfill(provider, id, U256::from(10u64), &mut NoHook).unwrap();

        let events = consumer.take_events();
        assert_eq!(
            events,
            vec![
                CoordinatorEvent::RequestCreated(RequestCreated { request_id: id }),
                CoordinatorEvent::RequestFulfilled(RequestFulfilled {
                    request_id: id,
                    normalized_value: U256::from(11u64),
                }),
            ]
        );
        assert!(consumer.take_events().is_empty());
    }

    #[test]
    fn bounded_event_log_keeps_newest() {
        let (mut consumer, provider) = bound();
        consumer.set_event_capacity(Some(3));

        let mut ids = Vec::new();
        for raw in 0..5u64 {
            let id = consumer.request().unwrap();
            consumer.fulfill(provider, id, U256::from(raw), &mut NoHook).unwrap();
            ids.push(id);
        }

        let events = consumer.take_events();
        assert_eq!(events.len(), 3);
        assert_eq!(
            events.last(),
            Some(&CoordinatorEvent::RequestFulfilled(RequestFulfilled {
                request_id: ids[4],
                normalized_value: ids[4] + U256::from(4u64),
            }))
        );
        assert!(consumer.take_events().is_empty());
    }

    #[test]
    fn shrinking_capacity_drops_oldest() {
        let (mut consumer, _) = bound();
        let first = consumer.request().unwrap();
        let second = consumer.request().unwrap();

        consumer.set_event_capacity(Some(1));
        let events = consumer.take_events();
        assert_eq!(events.len(), 1);
        assert_ne!(events[0].request_id(), first);
        assert_eq!(events[0].request_id(), second);

        consumer.set_event_capacity(Some(0));
        consumer.request().unwrap();
        assert!(consumer.take_events().is_empty());
    }
}
