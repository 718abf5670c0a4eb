//! Dice game backed by VRNG randomness.
//!
//! Demonstrates how a host program composes the coordinator:
//!
//! 1. **Request**: [`DiceGame::request_roll`] asks the coordinator for a
//!    random number and records a pending [`DiceRoll`].
//! 2. **Wait**: the provider fulfills the request asynchronously.
//! 3. **Settle**: the coordinator's fulfillment hook maps the normalized
//!    value to a face `1..=6` and settles the roll in the same call.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use vrng_consumer::{
    Address, BlockHistory, CoordinatorError, CoordinatorEvent, FulfillmentHook,
    NormalizationMethod, RandomnessProvider, VrngConsumer, U256,
};

/// Number of faces on the die.
pub const DICE_FACES: u64 = 6;

/// A dice roll that is backed by VRNG randomness.
///
/// The `result` field is `0` while the roll is pending and `1..=6` once settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceRoll {
    /// The player who requested the roll.
    pub player: Address,
    /// The VRNG request ID associated with this roll.
    pub vrng_request_id: U256,
    /// Dice outcome: 0 = pending, 1-6 = settled face value.
    pub result: u8,
}

impl DiceRoll {
    pub fn is_settled(&self) -> bool {
        self.result != 0
    }
}

/// Error codes for the roll-dice program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RollDiceError {
    /// Caller is not the game admin.
    #[error("Unauthorized")]
    Unauthorized,
    /// No roll exists for the given request id.
    #[error("Dice roll not found")]
    RollNotFound,
    /// The roll is still waiting for VRNG fulfillment.
    #[error("VRNG request has not been fulfilled")]
    VrngRequestNotFulfilled,
    /// Coordinator rejected the operation.
    #[error(transparent)]
    Vrng(#[from] CoordinatorError),
}

/// Emitted when a player requests a new dice roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceRollRequested {
    pub player: Address,
    pub vrng_request_id: U256,
}

/// Emitted when a dice roll is settled with a final result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceRollSettled {
    pub player: Address,
    pub vrng_request_id: U256,
    pub result: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum DiceEvent {
    DiceRollRequested(DiceRollRequested),
    DiceRollSettled(DiceRollSettled),
}

/// Game-side state, kept apart from the coordinator so the coordinator can
/// call into it as its fulfillment hook.
#[derive(Debug, Default)]
struct RollBook {
    rolls: HashMap<U256, DiceRoll>,
    roll_counts: HashMap<Address, u64>,
    events: VecDeque<DiceEvent>,
    event_capacity: Option<usize>,
}

impl RollBook {
    fn emit(&mut self, event: DiceEvent) {
        if let Some(cap) = self.event_capacity {
            if cap == 0 {
                return;
            }
            if self.events.len() == cap {
                self.events.pop_front();
            }
        }
        self.events.push_back(event);
    }
}

impl FulfillmentHook for RollBook {
    fn on_fulfilled(&mut self, _: &mut VrngConsumer, request_id: U256, normalized_value: U256) {
        let Some(roll) = self.rolls.get_mut(&request_id) else {
            warn!(%request_id, "Fulfillment for unknown dice roll");
            return;
        };

        let result = dice_face(normalized_value);
        roll.result = result;

        let player = roll.player;
        info!(%player, %request_id, result, "Dice rolled");
        self.emit(DiceEvent::DiceRollSettled(DiceRollSettled {
            player,
            vrng_request_id: request_id,
            result,
        }));
    }
}

/// Map a normalized value onto `1..=DICE_FACES`.
pub fn dice_face(value: U256) -> u8 {
    ((value % U256::from(DICE_FACES)).low_u64() + 1) as u8
}

/// On-chain-style dice game powered by the VRNG coordinator.
#[derive(Debug)]
pub struct DiceGame {
    admin: Address,
    vrng: VrngConsumer,
    book: RollBook,
}

impl DiceGame {
    /// Create a game owned by `admin`.
    ///
    /// `method` selects the normalization strategy; out-of-range values fail.
    pub fn new(
        admin: Address,
        method: u8,
        history: Arc<dyn BlockHistory>,
    ) -> Result<Self, RollDiceError> {
        let method = NormalizationMethod::try_from(method)?;
        Ok(Self::with_method(admin, method, history))
    }

    /// Create a game with an already-validated normalization method.
    pub fn with_method(
        admin: Address,
        method: NormalizationMethod,
        history: Arc<dyn BlockHistory>,
    ) -> Self {
        DiceGame {
            admin,
            vrng: VrngConsumer::with_method(method, history),
            book: RollBook::default(),
        }
    }

    pub fn admin(&self) -> Address {
        self.admin
    }

    pub fn normalization_method(&self) -> NormalizationMethod {
        self.vrng.normalization_method()
    }

    /// Bind (or unbind) the randomness provider. Admin only.
    pub fn set_provider(
        &mut self,
        caller: Address,
        provider: Option<Arc<dyn RandomnessProvider>>,
    ) -> Result<(), RollDiceError> {
        if caller != self.admin {
            return Err(RollDiceError::Unauthorized);
        }
        self.vrng.bind_provider(provider);
        Ok(())
    }

    pub fn provider(&self) -> Option<Address> {
        self.vrng.current_provider()
    }

    /// Request a dice roll for `player`.
    ///
    /// The player's running roll count is forwarded as the trace id.
    pub fn request_roll(&mut self, player: Address) -> Result<U256, RollDiceError> {
        let count = self.book.roll_counts.get(&player).copied().unwrap_or(0);
        let request_id = self.vrng.request_random_number(U256::from(count))?;

        self.book.roll_counts.insert(player, count + 1);
        self.book.rolls.insert(
            request_id,
            DiceRoll {
                player,
                vrng_request_id: request_id,
                result: 0,
            },
        );
        self.book
            .emit(DiceEvent::DiceRollRequested(DiceRollRequested {
                player,
                vrng_request_id: request_id,
            }));

        info!(%player, %request_id, "Dice roll requested");
        Ok(request_id)
    }

    /// Provider callback. Settles the matching roll on success.
    pub fn fulfill_randomness(
        &mut self,
        caller: Address,
        request_id: U256,
        raw_value: U256,
    ) -> Result<(), RollDiceError> {
        self.vrng
            .fulfill(caller, request_id, raw_value, &mut self.book)?;
        Ok(())
    }

    pub fn roll(&self, request_id: U256) -> Option<&DiceRoll> {
        self.book.rolls.get(&request_id)
    }

    /// Settled face for a roll.
    pub fn result(&self, request_id: U256) -> Result<u8, RollDiceError> {
        let roll = self.roll(request_id).ok_or(RollDiceError::RollNotFound)?;
        if !roll.is_settled() {
            return Err(RollDiceError::VrngRequestNotFulfilled);
        }
        Ok(roll.result)
    }

    pub fn pending_rolls(&self) -> usize {
        self.vrng.pending_count()
    }

    /// Drain game events, oldest first.
    pub fn take_events(&mut self) -> Vec<DiceEvent> {
        self.book.events.drain(..).collect()
    }

    /// Bound both the game and coordinator event logs, dropping the oldest
    /// entries once full. `None` keeps every event until drained.
    pub fn set_event_capacity(&mut self, capacity: Option<usize>) {
        self.book.event_capacity = capacity;
        if let Some(cap) = capacity {
            while self.book.events.len() > cap {
                self.book.events.pop_front();
            }
        }
        self.vrng.set_event_capacity(capacity);
    }

    /// Drain the coordinator's events, oldest first.
    pub fn take_vrng_events(&mut self) -> Vec<CoordinatorEvent> {
        self.vrng.take_events()
    }
}
