//! Engine channels.
//!
//! Lock-free SPSC rings between the control thread and the audio callback:
//! commands one way, events the other, and a deferred-drop ring that
//! carries removed module slots back so their storage is freed off the
//! audio thread.

use rtrb::{Consumer, Producer, RingBuffer};

use super::commands::{EngineCommand, EngineEvent};
use super::graph::ModuleSlot;

/// Default capacity of the command queue (control -> audio).
pub const DEFAULT_COMMAND_CAPACITY: usize = 1024;

/// Default capacity of the event queue (audio -> control).
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Default capacity of the deferred-drop queue (audio -> control).
pub const DEFAULT_GARBAGE_CAPACITY: usize = 256;

/// All three rings, before being split across threads.
pub struct EngineChannels {
    command_tx: Producer<EngineCommand>,
    command_rx: Consumer<EngineCommand>,
    event_tx: Producer<EngineEvent>,
    event_rx: Consumer<EngineEvent>,
    garbage_tx: Producer<ModuleSlot>,
    garbage_rx: Consumer<ModuleSlot>,
}

impl EngineChannels {
    /// Creates channels with explicit capacities.
    pub fn new(commands: usize, events: usize, garbage: usize) -> Self {
        let (command_tx, command_rx) = RingBuffer::new(commands);
        let (event_tx, event_rx) = RingBuffer::new(events);
        let (garbage_tx, garbage_rx) = RingBuffer::new(garbage);
        Self {
            command_tx,
            command_rx,
            event_tx,
            event_rx,
            garbage_tx,
            garbage_rx,
        }
    }

    /// Creates channels with the default capacities.
    pub fn with_defaults() -> Self {
        Self::new(
            DEFAULT_COMMAND_CAPACITY,
            DEFAULT_EVENT_CAPACITY,
            DEFAULT_GARBAGE_CAPACITY,
        )
    }

    /// Splits into a control-side and an audio-side handle.
    pub fn split(self) -> (ControlHandle, EngineHandle) {
        let control = ControlHandle {
            command_tx: self.command_tx,
            event_rx: self.event_rx,
            garbage_rx: self.garbage_rx,
        };
        let engine = EngineHandle {
            command_rx: self.command_rx,
            event_tx: self.event_tx,
            garbage_tx: self.garbage_tx,
        };
        (control, engine)
    }
}

/// Control-thread side of the channel pair.
pub struct ControlHandle {
    command_tx: Producer<EngineCommand>,
    event_rx: Consumer<EngineEvent>,
    garbage_rx: Consumer<ModuleSlot>,
}

impl ControlHandle {
    /// Queues a command for the audio callback.
    ///
    /// Never blocks; returns the command back when the ring is full.
    pub fn send_command(&mut self, cmd: EngineCommand) -> Result<(), EngineCommand> {
        self.command_tx
            .push(cmd)
            .map_err(|rtrb::PushError::Full(cmd)| cmd)
    }

    /// Receives one pending event, if any.
    pub fn recv_event(&mut self) -> Option<EngineEvent> {
        self.event_rx.pop().ok()
    }

    /// Drains all pending events.
    pub fn drain_events(&mut self) -> impl Iterator<Item = EngineEvent> + '_ {
        std::iter::from_fn(|| self.recv_event())
    }

    /// Drops every module slot the audio thread has discarded.
    ///
    /// Returns how many slots were freed.
    pub fn collect_garbage(&mut self) -> usize {
        let mut freed = 0;
        while self.garbage_rx.pop().is_ok() {
            freed += 1;
        }
        freed
    }

    /// Free slots left in the command ring.
    pub fn command_slots(&self) -> usize {
        self.command_tx.slots()
    }
}

/// Audio-callback side of the channel pair.
///
/// Every method is non-blocking and allocation-free.
pub struct EngineHandle {
    command_rx: Consumer<EngineCommand>,
    event_tx: Producer<EngineEvent>,
    garbage_tx: Producer<ModuleSlot>,
}

impl EngineHandle {
    /// Receives one pending command, if any.
    pub fn recv_command(&mut self) -> Option<EngineCommand> {
        self.command_rx.pop().ok()
    }

    /// Sends an event, dropping it when the ring is full. Events are
    /// telemetry; losing one is acceptable.
    pub fn send_event_lossy(&mut self, event: EngineEvent) {
        let _ = self.event_tx.push(event);
    }

    /// Hands a removed slot back to the control thread for deallocation.
    ///
    /// If the ring is full the slot is dropped in place, which does free
    /// memory on the audio thread; that case is logged so capacity can be
    /// raised.
    pub fn discard(&mut self, slot: ModuleSlot) {
        if let Err(rtrb::PushError::Full(slot)) = self.garbage_tx.push(slot) {
            log::warn!("garbage ring full, dropping module {} on audio thread", slot.id);
            drop(slot);
        }
    }
}
