//! Event system following Game Engine Architecture Ch 16.8
//! Key principles:
//! - Key-value arguments (no order dependency)
//! - Handler returns bool (true = consumed, stops forwarding)
//! - Registration system (only notify interested handlers)
//! - Queuing support (immediate + deferred delivery)
//!
//! The sound manager uses one instance as its notification channel
//! (value-changed events) and subscribes to the host's instance for focus
//! signals.

use std::collections::HashMap;

/// Event type identification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// Global playback rate changed
    RateChanged,
    /// Global detune changed
    DetuneChanged,
    /// Global mute flag changed
    MuteChanged,
    /// Global volume changed
    VolumeChanged,
    /// Host application lost focus
    FocusLost,
    /// Host application regained focus
    FocusGained,
}

impl EventType {
    /// Human-readable tag carried by the event
    pub fn name(self) -> &'static str {
        match self {
            Self::RateChanged => "rate changed",
            Self::DetuneChanged => "detune changed",
            Self::MuteChanged => "mute changed",
            Self::VolumeChanged => "volume changed",
            Self::FocusLost => "focus lost",
            Self::FocusGained => "focus gained",
        }
    }
}

/// Variant for type-safe event arguments
/// Uses key-value pairs to avoid order dependency problems
#[derive(Debug, Clone, PartialEq)]
pub enum EventArg {
    /// Identifier of the emitting object
    Source(u32),
    /// Numeric payload
    Value(f32),
    /// Boolean payload
    Flag(bool),
}

/// Event with type ID and key-value arguments
#[derive(Debug, Clone)]
pub struct Event {
    /// Type of event
    pub event_type: EventType,
    /// Timestamp when event was created (seconds)
    pub timestamp: f64,
    args: HashMap<&'static str, EventArg>,
}

impl Event {
    /// Create a new event with the given type and timestamp
    pub fn new(event_type: EventType, timestamp: f64) -> Self {
        Self {
            event_type,
            timestamp,
            args: HashMap::new(),
        }
    }

    /// Add an argument to the event (builder pattern)
    pub fn with_arg(mut self, key: &'static str, value: EventArg) -> Self {
        self.args.insert(key, value);
        self
    }

    /// Get an argument by key
    pub fn get_arg(&self, key: &str) -> Option<&EventArg> {
        self.args.get(key)
    }

    /// Tag of this event's kind
    pub fn kind(&self) -> &'static str {
        self.event_type.name()
    }

    /// Get source argument if present
    pub fn get_source(&self) -> Option<u32> {
        if let Some(EventArg::Source(id)) = self.get_arg("source") {
            Some(*id)
        } else {
            None
        }
    }

    /// Get numeric value argument if present
    pub fn get_value(&self) -> Option<f32> {
        if let Some(EventArg::Value(value)) = self.get_arg("value") {
            Some(*value)
        } else {
            None
        }
    }

    /// Get boolean value argument if present
    pub fn get_flag(&self) -> Option<bool> {
        if let Some(EventArg::Flag(flag)) = self.get_arg("value") {
            Some(*flag)
        } else {
            None
        }
    }
}

/// Event handler trait
/// Returns true if event was consumed (stops forwarding)
/// Returns false to allow forwarding to other handlers
pub trait EventHandler {
    /// Handle an event, return true if consumed
    fn on_event(&mut self, event: &Event) -> bool;
}

/// Adapter so closures can be registered as handlers
impl<F> EventHandler for F
where
    F: FnMut(&Event) -> bool,
{
    fn on_event(&mut self, event: &Event) -> bool {
        self(event)
    }
}

/// Registration token returned by [`EventSystem::register_handler`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u32);

/// Event system with registration and queuing
/// Follows chain of responsibility pattern
pub struct EventSystem {
    immediate_queue: Vec<Event>,
    deferred_queue: Vec<(f64, Event)>,
    handlers: HashMap<EventType, Vec<(HandlerId, Box<dyn EventHandler>)>>,
    next_handler_id: u32,
    current_time: f64,
}

impl EventSystem {
    /// Create a new empty event system
    pub fn new() -> Self {
        Self {
            immediate_queue: Vec::new(),
            deferred_queue: Vec::new(),
            handlers: HashMap::new(),
            next_handler_id: 0,
            current_time: 0.0,
        }
    }

    /// Update current time (seconds since start)
    pub fn update_time(&mut self, time: f64) {
        self.current_time = time;
    }

    /// Current time as last set by [`update_time`](Self::update_time)
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Register a handler for a specific event type
    /// Only handlers registered for this type will be notified
    pub fn register_handler(&mut self, event_type: EventType, handler: Box<dyn EventHandler>) -> HandlerId {
        let id = HandlerId(self.next_handler_id);
        self.next_handler_id = self.next_handler_id.wrapping_add(1);
        self.handlers
            .entry(event_type)
            .or_default()
            .push((id, handler));
        id
    }

    /// Remove a previously registered handler, returns whether it was found
    pub fn unregister_handler(&mut self, id: HandlerId) -> bool {
        for handlers in self.handlers.values_mut() {
            if let Some(index) = handlers.iter().position(|(handler_id, _)| *handler_id == id) {
                handlers.remove(index);
                return true;
            }
        }
        false
    }

    /// Number of handlers registered for an event type
    pub fn handler_count(&self, event_type: EventType) -> usize {
        self.handlers.get(&event_type).map_or(0, Vec::len)
    }

    /// Drop every handler and every queued event
    pub fn clear_handlers(&mut self) {
        self.handlers.clear();
        self.clear();
    }

    /// Deliver an event to its handlers right now, bypassing the queues
    pub fn emit(&mut self, event: &Event) {
        self.dispatch_event(event);
    }

    /// Send event for immediate handling this frame
    pub fn send(&mut self, event: Event) {
        self.immediate_queue.push(event);
    }

    /// Post event for deferred delivery at specified time
    pub fn post(&mut self, delivery_time: f64, event: Event) {
        self.deferred_queue.push((delivery_time, event));
    }

    /// Dispatch all pending events
    /// Processes immediate queue first, then due deferred events
    pub fn dispatch(&mut self) {
        let immediate = std::mem::take(&mut self.immediate_queue);
        for event in immediate {
            self.dispatch_event(&event);
        }

        let mut i = 0;
        while i < self.deferred_queue.len() {
            if self.deferred_queue[i].0 <= self.current_time {
                let (_, event) = self.deferred_queue.remove(i);
                self.dispatch_event(&event);
            } else {
                i += 1;
            }
        }
    }

    /// Dispatch single event to registered handlers
    /// Stops on first handler that returns true (consumed)
    fn dispatch_event(&mut self, event: &Event) {
        if let Some(handlers) = self.handlers.get_mut(&event.event_type) {
            for (_, handler) in handlers.iter_mut() {
                if handler.on_event(event) {
                    break;
                }
            }
        }
    }

    /// Clear all queued events (useful for state transitions)
    pub fn clear(&mut self) {
        self.immediate_queue.clear();
        self.deferred_queue.clear();
    }
}

impl Default for EventSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Fire-once listener list
///
/// Listeners are removed as they are taken, so each runs at most once.
pub struct OnceSignal<F> {
    listeners: Vec<F>,
}

impl<F> OnceSignal<F> {
    /// Create an empty signal
    pub fn new() -> Self {
        Self { listeners: Vec::new() }
    }

    /// Add a listener
    pub fn subscribe(&mut self, listener: F) {
        self.listeners.push(listener);
    }

    /// Remove and return every listener, leaving the signal empty
    pub fn take(&mut self) -> Vec<F> {
        std::mem::take(&mut self.listeners)
    }

    /// Drop every listener without running it
    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    /// Number of listeners waiting
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// No listeners waiting
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl<F> Default for OnceSignal<F> {
    fn default() -> Self {
        Self::new()
    }
}
