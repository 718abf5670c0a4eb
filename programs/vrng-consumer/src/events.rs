use primitive_types::U256;
use serde::{Deserialize, Serialize};

/// Emitted when a new randomness request has been accepted by the provider.
///
/// Off-chain indexers may rely on exactly one of these per request id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestCreated {
    pub request_id: U256,
}

/// Emitted when the provider fulfills a request and the value is normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestFulfilled {
    pub request_id: U256,
    pub normalized_value: U256,
}

/// Observable coordinator event, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum CoordinatorEvent {
    RequestCreated(RequestCreated),
    RequestFulfilled(RequestFulfilled),
}

impl CoordinatorEvent {
    /// The request this event refers to.
    pub fn request_id(&self) -> U256 {
        match self {
            CoordinatorEvent::RequestCreated(e) => e.request_id,
            CoordinatorEvent::RequestFulfilled(e) => e.request_id,
        }
    }
}

impl From<RequestCreated> for CoordinatorEvent {
    fn from(event: RequestCreated) -> Self {
        CoordinatorEvent::RequestCreated(event)
    }
}

impl From<RequestFulfilled> for CoordinatorEvent {
    fn from(event: RequestFulfilled) -> Self {
        CoordinatorEvent::RequestFulfilled(event)
    }
}
