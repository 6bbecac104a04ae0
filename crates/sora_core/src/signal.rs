//! Signal bus
//!
//! Named, typed publish/subscribe. A signal must be declared with a payload
//! signature before anyone can listen to it or emit it. Emission is
//! synchronous: every receiver runs, in registration order, before
//! [`SignalBus::emit_signal`] returns.
//!
//! Receivers get the frame's [`Commands`] so they can request structural
//! changes without holding references into the world.

use crate::command::Commands;
use crate::ids::EntityId;
use crate::math::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tracing::{trace, warn};

/// Declared by the engine. Payload: `(Entity)`.
pub const ENTITY_DEATH: &str = "entity_death";
/// Declared by the engine. Payload: `(Entity, Entity)`.
pub const COLLISION: &str = "collision";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayloadKind {
    Int,
    Float,
    Bool,
    Text,
    Entity,
    Vector,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignalValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Entity(EntityId),
    Vector(Vec2),
}

impl SignalValue {
    pub fn kind(&self) -> PayloadKind {
        match self {
            SignalValue::Int(_) => PayloadKind::Int,
            SignalValue::Float(_) => PayloadKind::Float,
            SignalValue::Bool(_) => PayloadKind::Bool,
            SignalValue::Text(_) => PayloadKind::Text,
            SignalValue::Entity(_) => PayloadKind::Entity,
            SignalValue::Vector(_) => PayloadKind::Vector,
        }
    }

    pub fn as_entity(&self) -> Option<EntityId> {
        match self {
            SignalValue::Entity(id) => Some(*id),
            _ => None,
        }
    }
}

/// Ordered payload types of a signal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Signature(Vec<PayloadKind>);

impl Signature {
    pub fn new(kinds: impl IntoIterator<Item = PayloadKind>) -> Self {
        Self(kinds.into_iter().collect())
    }

    pub fn kinds(&self) -> &[PayloadKind] {
        &self.0
    }

    pub fn arity(&self) -> usize {
        self.0.len()
    }

    pub fn accepts(&self, payload: &[SignalValue]) -> bool {
        payload.len() == self.0.len() && payload.iter().zip(&self.0).all(|(v, k)| v.kind() == *k)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, kind) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{kind:?}")?;
        }
        write!(f, ")")
    }
}

/// What happens when a receiver fails during emission.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReceiverPolicy {
    /// Keep delivering to the remaining receivers, then report every failure.
    #[default]
    Isolate,
    /// Stop at the first failure.
    Propagate,
}

pub type ReceiverError = Box<dyn std::error::Error + Send + Sync>;
pub type Receiver = Box<dyn FnMut(&[SignalValue], &mut Commands) -> Result<(), ReceiverError> + Send>;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ReceiverId(u64);

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("signal '{name}' is not declared")]
    Undeclared { name: String },

    #[error("signal '{name}' is declared as {declared}, not {requested}")]
    SignatureMismatch {
        name: String,
        declared: Signature,
        requested: Signature,
    },

    #[error("signal '{name}' expects payload {expected}, got {actual:?}")]
    PayloadMismatch {
        name: String,
        expected: Signature,
        actual: Vec<PayloadKind>,
    },

    #[error("{} receiver(s) of signal '{name}' failed: {}", .failures.len(), .failures.join("; "))]
    ReceiverFailed { name: String, failures: Vec<String> },
}

struct Channel {
    signature: Signature,
    receivers: Vec<(ReceiverId, Receiver)>,
}

pub struct SignalBus {
    channels: HashMap<String, Channel>,
    policy: ReceiverPolicy,
    next_receiver: u64,
}

impl SignalBus {
    pub fn new() -> Self {
        Self::with_policy(ReceiverPolicy::default())
    }

    pub fn with_policy(policy: ReceiverPolicy) -> Self {
        Self {
            channels: HashMap::new(),
            policy,
            next_receiver: 1,
        }
    }

    pub fn policy(&self) -> ReceiverPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: ReceiverPolicy) {
        self.policy = policy;
    }

    /// Declare a signal. Re-declaring with the same signature is allowed.
    pub fn register_signal(&mut self, name: &str, signature: Signature) -> Result<(), SignalError> {
        if let Some(channel) = self.channels.get(name) {
            if channel.signature != signature {
                return Err(SignalError::SignatureMismatch {
                    name: name.to_string(),
                    declared: channel.signature.clone(),
                    requested: signature,
                });
            }
            return Ok(());
        }
        self.channels.insert(
            name.to_string(),
            Channel {
                signature,
                receivers: Vec::new(),
            },
        );
        Ok(())
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    pub fn signature(&self, name: &str) -> Option<&Signature> {
        self.channels.get(name).map(|channel| &channel.signature)
    }

    pub fn register_receiver<F>(&mut self, name: &str, receiver: F) -> Result<ReceiverId, SignalError>
    where
        F: FnMut(&[SignalValue], &mut Commands) -> Result<(), ReceiverError> + Send + 'static,
    {
        let channel = self.channels.get_mut(name).ok_or_else(|| SignalError::Undeclared {
            name: name.to_string(),
        })?;
        let id = ReceiverId(self.next_receiver);
        self.next_receiver += 1;
        channel.receivers.push((id, Box::new(receiver)));
        Ok(id)
    }

    /// Remove a receiver. Returns `false` if it was not registered.
    pub fn unregister_receiver(&mut self, id: ReceiverId) -> bool {
        for channel in self.channels.values_mut() {
            if let Some(index) = channel.receivers.iter().position(|(rid, _)| *rid == id) {
                channel.receivers.remove(index);
                return true;
            }
        }
        false
    }

    pub fn receiver_count(&self, name: &str) -> usize {
        self.channels.get(name).map_or(0, |channel| channel.receivers.len())
    }

    /// Type-check `payload` and deliver it to every receiver in registration
    /// order. Returns the number of receivers that ran successfully.
    pub fn emit_signal(
        &mut self,
        name: &str,
        payload: &[SignalValue],
        commands: &mut Commands,
    ) -> Result<usize, SignalError> {
        let channel = self.channels.get_mut(name).ok_or_else(|| SignalError::Undeclared {
            name: name.to_string(),
        })?;
        if !channel.signature.accepts(payload) {
            return Err(SignalError::PayloadMismatch {
                name: name.to_string(),
                expected: channel.signature.clone(),
                actual: payload.iter().map(SignalValue::kind).collect(),
            });
        }

        trace!(signal = name, receivers = channel.receivers.len(), "emit");
        let mut delivered = 0;
        let mut failures = Vec::new();
        for (id, receiver) in channel.receivers.iter_mut() {
            match receiver(payload, commands) {
                Ok(()) => delivered += 1,
                Err(err) => {
                    warn!(signal = name, receiver = id.0, error = %err, "signal receiver failed");
                    failures.push(err.to_string());
                    if self.policy == ReceiverPolicy::Propagate {
                        break;
                    }
                }
            }
        }

        if failures.is_empty() {
            Ok(delivered)
        } else {
            Err(SignalError::ReceiverFailed {
                name: name.to_string(),
                failures,
            })
        }
    }
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new()
    }
}
