//! Error types.
//!
//! The runtime degrades silently wherever it can (text coercion, no-op
//! replaces on dead components). The cases below are the ones it refuses
//! to paper over.

use thiserror::Error;

use crate::component::ComponentId;
use crate::reactive::SignalId;

/// Errors raised while propagating signal writes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactiveError {
    /// A subscriber kept writing to the signal that was notifying it.
    #[error("write to {signal} rejected: notification already nested {depth} levels deep (limit {limit})")]
    NotificationDepthExceeded {
        signal: SignalId,
        depth: usize,
        limit: usize,
    },
}

/// Which hook sequence a slot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Signal,
    Effect,
}

impl std::fmt::Display for SlotKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SlotKind::Signal => f.write_str("signal"),
            SlotKind::Effect => f.write_str("effect"),
        }
    }
}

/// Misuse of call-order indexed hook slots.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
    #[error("{component} asked for {kind} slot {index}, but its first render registered only {registered}")]
    SlotOverflow {
        component: ComponentId,
        kind: SlotKind,
        index: usize,
        registered: usize,
    },

    #[error("{component} used {used} {kind} slots, but its first render registered {registered}")]
    SlotCountChanged {
        component: ComponentId,
        kind: SlotKind,
        used: usize,
        registered: usize,
    },

    #[error("{component} {kind} slot {index} does not hold a {expected}")]
    SlotTypeMismatch {
        component: ComponentId,
        kind: SlotKind,
        index: usize,
        expected: &'static str,
    },
}

/// Errors loading a [`RuntimeConfig`](crate::config::RuntimeConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid runtime config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid value {value:?} for {key}")]
    Env { key: &'static str, value: String },
}
