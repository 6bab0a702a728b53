//! Lock-free command delivery from the control thread to the render thread.
//!
//! Two `rtrb` rings run in opposite directions:
//!
//! ```text
//!   control thread                          render thread
//!   CommandSender ── commands ───────────▶ CommandReceiver
//!        ▲                                        │
//!        └──────────── retired payloads ◀─────────┘
//! ```
//!
//! The render thread never frees memory. Commands that own a heap payload are
//! passed back through the retire ring and dropped by the sender on its next
//! push.

mod command;

pub use command::Command;

use rtrb::{Consumer, Producer, PushError, RingBuffer};

/// Producer half, owned by the control thread.
pub struct CommandSender {
    commands: Producer<Command>,
    retired: Consumer<Command>,
    capacity: usize,
}

/// Consumer half, owned by the render thread.
pub struct CommandReceiver {
    commands: Consumer<Command>,
    retired: Producer<Command>,
    capacity: usize,
}

/// Create a channel holding up to `capacity - 1` outstanding commands.
///
/// `capacity` is rounded up to a power of two, with a minimum of 2.
pub fn command_channel(capacity: usize) -> (CommandSender, CommandReceiver) {
    let capacity = capacity.max(2).next_power_of_two();
    let (command_tx, command_rx) = RingBuffer::new(capacity - 1);
    // Every retired command was popped from the command ring after the
    // sender's last drain, so this never fills.
    let (retire_tx, retire_rx) = RingBuffer::new(capacity);

    (
        CommandSender {
            commands: command_tx,
            retired: retire_rx,
            capacity,
        },
        CommandReceiver {
            commands: command_rx,
            retired: retire_tx,
            capacity,
        },
    )
}

impl CommandSender {
    /// Enqueue a command, handing it back if the channel is full.
    pub fn push(&mut self, command: Command) -> Result<(), Command> {
        self.collect_garbage();
        match self.commands.push(command) {
            Ok(()) => Ok(()),
            Err(PushError::Full(command)) => Err(command),
        }
    }

    /// Drop every payload the render thread has handed back.
    pub fn collect_garbage(&mut self) -> usize {
        let mut dropped = 0;
        while let Ok(command) = self.retired.pop() {
            drop(command);
            dropped += 1;
        }
        dropped
    }

    /// Commands pushed but not yet popped.
    pub fn len(&self) -> usize {
        self.capacity - 1 - self.commands.slots()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.commands.is_full()
    }

    /// Power-of-two ring size; one slot is always kept free.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl CommandReceiver {
    /// Take the oldest command. Never allocates or frees.
    #[inline]
    pub fn pop(&mut self) -> Option<Command> {
        self.commands.pop().ok()
    }

    /// Return an applied command so its payload is freed off the render thread.
    ///
    /// Plain-data commands are simply dropped here, which frees nothing.
    #[inline]
    pub fn recycle(&mut self, command: Command) {
        if command.owns_heap() {
            // The retire ring is sized so this cannot fail; if it ever did the
            // payload would be freed here rather than leaked.
            let _ = self.retired.push(command);
        }
    }

    pub fn len(&self) -> usize {
        self.commands.slots()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::{SequenceLoad, SequencerEvent};

    fn load() -> Command {
        Command::LoadSequence(Box::new(SequenceLoad::new(
            vec![SequencerEvent::new(60, 1.0, 0.0, 1.0)],
            4.0,
        )))
    }

    #[test]
    fn capacity_rounds_up_to_power_of_two() {
        assert_eq!(command_channel(0).0.capacity(), 2);
        assert_eq!(command_channel(5).0.capacity(), 8);
        assert_eq!(command_channel(256).1.capacity(), 256);
    }

    #[test]
    fn full_channel_hands_the_command_back() {
        let (mut tx, mut rx) = command_channel(4);
        for pitch in 0..3 {
            assert!(tx.push(Command::NoteOff { pitch }).is_ok());
        }
        assert!(tx.is_full());
        assert_eq!(tx.push(Command::AllNotesOff), Err(Command::AllNotesOff));

        assert_eq!(rx.len(), 3);
        assert_eq!(rx.pop(), Some(Command::NoteOff { pitch: 0 }));
        assert!(tx.push(Command::AllNotesOff).is_ok());
    }

    #[test]
    fn pops_in_push_order() {
        let (mut tx, mut rx) = command_channel(16);
        tx.push(Command::StartTransport { bpm: 90.0 }).unwrap();
        tx.push(Command::NoteOn {
            pitch: 60,
            velocity: 0.5,
        })
        .unwrap();
        tx.push(Command::StopTransport).unwrap();

        assert_eq!(rx.pop(), Some(Command::StartTransport { bpm: 90.0 }));
        assert_eq!(
            rx.pop(),
            Some(Command::NoteOn {
                pitch: 60,
                velocity: 0.5
            })
        );
        assert_eq!(rx.pop(), Some(Command::StopTransport));
        assert_eq!(rx.pop(), None);
        assert!(rx.is_empty());
    }

    #[test]
    fn recycled_payloads_are_freed_by_the_sender() {
        let (mut tx, mut rx) = command_channel(8);
        tx.push(load()).unwrap();
        tx.push(Command::ResetMutation).unwrap();

        while let Some(command) = rx.pop() {
            rx.recycle(command);
        }

        // Only the heap-owning command came back
        assert_eq!(tx.collect_garbage(), 1);
        assert_eq!(tx.collect_garbage(), 0);
    }

    #[test]
    fn retire_ring_keeps_up_with_a_saturated_channel() {
        let (mut tx, mut rx) = command_channel(4);
        for _ in 0..50 {
            while tx.push(load()).is_ok() {}
            while let Some(command) = rx.pop() {
                rx.recycle(command);
            }
        }
        assert_eq!(tx.collect_garbage(), 3);
    }
}
