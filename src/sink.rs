//! Ordered output channel between the engine and whatever displays it
//!
//! The engine owns a [`Sink`] and pushes [`OutputEvent`]s into it in program
//! order: `Output` for `PRINT`, `Log` for diagnostics and halting errors.
//! A [`Console`] is the consuming end; the terminal UI, the headless printer
//! and the tests all attach one. Sending never blocks and never waits for the
//! consumer; if the consumer is gone the event is dropped.

use std::sync::mpsc::{self, Receiver, Sender};

/// Which stream an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Output,
    Log,
}

/// One line of text produced by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputEvent {
    pub kind: EventKind,
    pub text: String,
}

/// Producer side of the output channel.
#[derive(Debug, Clone, Default)]
pub struct Sink {
    sender: Option<Sender<OutputEvent>>,
}

impl Sink {
    /// Create a connected sink/receiver pair.
    pub fn channel() -> (Sink, Receiver<OutputEvent>) {
        let (sender, receiver) = mpsc::channel();
        (
            Sink {
                sender: Some(sender),
            },
            receiver,
        )
    }

    /// A sink that drops everything.
    pub fn discard() -> Self {
        Sink { sender: None }
    }

    pub fn output(&self, text: impl Into<String>) {
        self.send(EventKind::Output, text.into());
    }

    pub fn log(&self, text: impl Into<String>) {
        self.send(EventKind::Log, text.into());
    }

    fn send(&self, kind: EventKind, text: String) {
        if let Some(sender) = &self.sender {
            // A closed receiver means nobody is listening any more.
            let _ = sender.send(OutputEvent { kind, text });
        }
    }
}

/// Consumer side: drains the channel into an in-memory event list.
#[derive(Debug)]
pub struct Console {
    receiver: Receiver<OutputEvent>,
    events: Vec<OutputEvent>,
}

impl Console {
    /// Create a sink and a console listening to it.
    pub fn attach() -> (Sink, Console) {
        let (sink, receiver) = Sink::channel();
        (
            sink,
            Console {
                receiver,
                events: Vec::new(),
            },
        )
    }

    /// Pull every pending event off the channel.
    pub fn drain(&mut self) -> usize {
        let before = self.events.len();
        self.events.extend(self.receiver.try_iter());
        self.events.len() - before
    }

    pub fn events(&self) -> &[OutputEvent] {
        &self.events
    }

    /// Text of `Output` events only.
    pub fn output_lines(&self) -> Vec<&str> {
        self.lines_of(EventKind::Output)
    }

    /// Text of `Log` events only.
    pub fn log_lines(&self) -> Vec<&str> {
        self.lines_of(EventKind::Log)
    }

    fn lines_of(&self, kind: EventKind) -> Vec<&str> {
        self.events
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.text.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Forget events past `len` (used when stepping backwards).
    pub fn truncate(&mut self, len: usize) {
        self.events.truncate(len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_arrive_in_order_with_their_kind() {
        let (sink, mut console) = Console::attach();
        sink.output("1");
        sink.log("note");
        sink.output("2");
        assert_eq!(console.drain(), 3);
        assert_eq!(console.output_lines(), vec!["1", "2"]);
        assert_eq!(console.log_lines(), vec!["note"]);
        assert_eq!(console.events()[1].kind, EventKind::Log);
    }

    #[test]
    fn sending_after_consumer_dropped_is_silent() {
        let (sink, console) = Console::attach();
        drop(console);
        sink.output("nobody hears this");
    }

    #[test]
    fn discard_sink_drops_everything() {
        Sink::discard().log("ignored");
    }

    #[test]
    fn truncate_forgets_later_events() {
        let (sink, mut console) = Console::attach();
        sink.output("a");
        sink.output("b");
        console.drain();
        console.truncate(1);
        assert_eq!(console.output_lines(), vec!["a"]);
    }
}
