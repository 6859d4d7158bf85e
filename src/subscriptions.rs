//! Per-sprite event subscriptions.
//!
//! Scripts subscribe callbacks to named events; the engine later fires an
//! event for a sprite and the script host delivers it to every callback in
//! the order they were registered.

use bevy_ecs::prelude::{Component, Entity};
use rhai::FnPtr;
use serde::Deserialize;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;

use crate::error::SpriteError;

/// Event fired when something touches a sprite.
pub const TOUCH: &str = "touch";

/// A non-empty, case-sensitive event name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventName(String);

impl EventName {
    pub fn new(name: impl Into<String>) -> Result<Self, SpriteError> {
        let name = name.into();
        if name.is_empty() {
            return Err(SpriteError::InvalidEventName);
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A script function stored across calls.
#[derive(Debug, Clone)]
pub struct Callback(FnPtr);

impl Callback {
    pub fn new(fn_ptr: FnPtr) -> Self {
        Self(fn_ptr)
    }

    pub fn fn_ptr(&self) -> &FnPtr {
        &self.0
    }

    pub fn name(&self) -> &str {
        self.0.fn_name()
    }
}

/// Whether delivered callbacks stay subscribed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryPolicy {
    /// Callbacks fire on every dispatch until the sprite is destroyed.
    #[default]
    Persistent,
    /// Callbacks are removed as they are delivered.
    Once,
}

/// What the dispatcher does when a callback fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    #[default]
    Continue,
    Abort,
}

type Listeners = SmallVec<[Callback; 2]>;

/// Event name to ordered callbacks. Lives on the sprite entity, so every
/// stored callback is released when the sprite is despawned.
#[derive(Component, Default)]
pub struct EventTable {
    listeners: HashMap<EventName, Listeners>,
}

impl EventTable {
    /// Appends `callback`; never replaces earlier subscriptions.
    pub fn subscribe(&mut self, event: EventName, callback: Callback) {
        self.listeners.entry(event).or_default().push(callback);
    }

    /// Callbacks for `event` in registration order, copied out so the
    /// caller can invoke them without holding the table.
    pub fn listeners(&self, event: &EventName) -> Vec<Callback> {
        self.listeners.get(event).map(|list| list.to_vec()).unwrap_or_default()
    }

    /// Removes and returns the callbacks for `event`.
    pub fn take(&mut self, event: &EventName) -> Vec<Callback> {
        self.listeners.remove(event).map(|list| list.into_vec()).unwrap_or_default()
    }

    /// Reinserts `callbacks` at the front of the list for `event`.
    pub fn restore(&mut self, event: EventName, callbacks: Vec<Callback>) {
        if callbacks.is_empty() {
            return;
        }
        self.listeners.entry(event).or_default().insert_many(0, callbacks);
    }

    pub fn listener_count(&self, event: &EventName) -> usize {
        self.listeners.get(event).map_or(0, |list| list.len())
    }
}

/// An event the engine fired for a sprite, waiting for the script host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiredEvent {
    pub entity: Entity,
    pub event: EventName,
}
