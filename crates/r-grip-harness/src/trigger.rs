//! ---
//! grip_section: "04-harness"
//! grip_subsection: "module"
//! grip_type: "source"
//! grip_scope: "code"
//! grip_description: "Operator trigger sources feeding the control loop."
//! grip_version: "v0.0.0-prealpha"
//! grip_owner: "tbd"
//! ---
//! Trigger sources drive the control loop.
//!
//! A source blocks until the operator asks for the next actuation, the input
//! ends, or the cancellation token fires. Blocking sources wait in slices of
//! the configured poll interval so cancellation is observed promptly.

use std::collections::VecDeque;
use std::fmt;
use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use r_grip_common::InputConfig;
use tracing::{debug, warn};

use crate::cancel::CancellationToken;

/// Operator request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Drive the actuated joints to the close position.
    Close,
    /// Drive the actuated joints to the open position.
    Open,
}

impl Trigger {
    /// Name used in logs and console input.
    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::Close => "close",
            Trigger::Open => "open",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of operator triggers.
pub trait TriggerSource {
    /// Block until the next trigger. `expected` is the trigger the loop is
    /// waiting for. Returning `None` ends the loop.
    fn next_trigger(&mut self, expected: Trigger, cancel: &CancellationToken) -> Option<Trigger>;
}

/// Fixed sequence of triggers, ending when exhausted.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTriggers {
    queue: VecDeque<Trigger>,
}

impl ScriptedTriggers {
    /// Queue `triggers` in order.
    pub fn new(triggers: impl IntoIterator<Item = Trigger>) -> Self {
        Self {
            queue: triggers.into_iter().collect(),
        }
    }

    /// Triggers not yet consumed.
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl TriggerSource for ScriptedTriggers {
    fn next_trigger(&mut self, _expected: Trigger, cancel: &CancellationToken) -> Option<Trigger> {
        if cancel.is_cancelled() {
            return None;
        }
        self.queue.pop_front()
    }
}

/// Triggers delivered over a channel, typically from another thread.
#[derive(Debug)]
pub struct ChannelTriggers {
    receiver: Receiver<Trigger>,
    poll_interval: Duration,
}

impl ChannelTriggers {
    /// Create a connected sender/source pair.
    pub fn channel(poll_interval: Duration) -> (Sender<Trigger>, Self) {
        let (sender, receiver) = mpsc::channel();
        (
            sender,
            Self {
                receiver,
                poll_interval,
            },
        )
    }
}

impl TriggerSource for ChannelTriggers {
    fn next_trigger(&mut self, _expected: Trigger, cancel: &CancellationToken) -> Option<Trigger> {
        recv_until_cancelled(&self.receiver, self.poll_interval, cancel)
    }
}

fn recv_until_cancelled<T>(
    receiver: &Receiver<T>,
    poll_interval: Duration,
    cancel: &CancellationToken,
) -> Option<T> {
    loop {
        if cancel.is_cancelled() {
            return None;
        }
        match receiver.recv_timeout(poll_interval) {
            Ok(value) => return Some(value),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return None,
        }
    }
}

/// Interactive line-based source.
///
/// Each wait prints a prompt and consumes one line. An empty line (or any
/// unrecognised text) yields the expected trigger, `close`/`c` and `open`/`o`
/// name one explicitly, and a quit word or end of input ends the loop.
pub struct ConsoleTriggers<W: Write = io::Stdout> {
    lines: Receiver<String>,
    prompt: W,
    poll_interval: Duration,
    quit_words: Vec<String>,
}

impl ConsoleTriggers<io::Stdout> {
    /// Read from standard input and prompt on standard output.
    pub fn stdin(config: &InputConfig) -> Self {
        Self::with_io(io::BufReader::new(io::stdin()), io::stdout(), config)
    }
}

impl<W: Write> ConsoleTriggers<W> {
    /// Read lines from `reader` on a background thread and prompt on `prompt`.
    pub fn with_io<R>(reader: R, prompt: W, config: &InputConfig) -> Self
    where
        R: BufRead + Send + 'static,
    {
        let (sender, lines) = mpsc::channel();
        let spawned = thread::Builder::new()
            .name("grip-console".into())
            .spawn(move || {
                for line in reader.lines() {
                    match line {
                        Ok(line) => {
                            if sender.send(line).is_err() {
                                break;
                            }
                        }
                        Err(err) => {
                            warn!(error = %err, "console read failed");
                            break;
                        }
                    }
                }
                debug!("console input closed");
            });
        // A failed spawn drops the sender, which reads as end of input.
        if let Err(err) = spawned {
            warn!(error = %err, "failed to start console reader");
        }

        Self {
            lines,
            prompt,
            poll_interval: config.poll_interval,
            quit_words: config
                .quit_words
                .iter()
                .map(|word| word.trim().to_lowercase())
                .collect(),
        }
    }

    /// Consume the source and return the prompt writer.
    pub fn into_prompt(self) -> W {
        self.prompt
    }

    fn parse(&self, line: &str, expected: Trigger) -> Option<Trigger> {
        let word = line.trim().to_lowercase();
        if self.quit_words.iter().any(|quit| *quit == word) {
            return None;
        }
        match word.as_str() {
            "c" | "close" => Some(Trigger::Close),
            "o" | "open" => Some(Trigger::Open),
            _ => Some(expected),
        }
    }
}

fn prompt_text(expected: Trigger) -> &'static str {
    match expected {
        Trigger::Close => "enter to close the gripper",
        Trigger::Open => "enter to open the gripper",
    }
}

impl<W: Write> TriggerSource for ConsoleTriggers<W> {
    fn next_trigger(&mut self, expected: Trigger, cancel: &CancellationToken) -> Option<Trigger> {
        if cancel.is_cancelled() {
            return None;
        }
        let written = writeln!(self.prompt, "{}", prompt_text(expected))
            .and_then(|_| self.prompt.flush());
        if let Err(err) = written {
            warn!(error = %err, "failed to write console prompt");
        }
        let line = recv_until_cancelled(&self.lines, self.poll_interval, cancel)?;
        self.parse(&line, expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::Instant;

    fn input_config() -> InputConfig {
        InputConfig {
            poll_interval: Duration::from_millis(5),
            ..InputConfig::default()
        }
    }

    #[test]
    fn scripted_triggers_drain_in_order() {
        let cancel = CancellationToken::new();
        let mut source = ScriptedTriggers::new([Trigger::Close, Trigger::Open]);
        assert_eq!(source.next_trigger(Trigger::Close, &cancel), Some(Trigger::Close));
        assert_eq!(source.next_trigger(Trigger::Open, &cancel), Some(Trigger::Open));
        assert_eq!(source.next_trigger(Trigger::Close, &cancel), None);
    }

    #[test]
    fn scripted_triggers_stop_when_cancelled() {
        let cancel = CancellationToken::new();
        let mut source = ScriptedTriggers::new([Trigger::Close]);
        cancel.cancel();
        assert_eq!(source.next_trigger(Trigger::Close, &cancel), None);
        assert_eq!(source.remaining(), 1);
    }

    #[test]
    fn channel_triggers_observe_cancellation_while_waiting() {
        let cancel = CancellationToken::new();
        let (_sender, mut source) = ChannelTriggers::channel(Duration::from_millis(5));
        let canceller = cancel.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            canceller.cancel();
        });
        let started = Instant::now();
        assert_eq!(source.next_trigger(Trigger::Close, &cancel), None);
        assert!(started.elapsed() < Duration::from_secs(5));
        handle.join().expect("canceller thread");
    }

    #[test]
    fn channel_triggers_end_when_sender_dropped() {
        let cancel = CancellationToken::new();
        let (sender, mut source) = ChannelTriggers::channel(Duration::from_millis(5));
        sender.send(Trigger::Open).expect("send");
        drop(sender);
        assert_eq!(source.next_trigger(Trigger::Close, &cancel), Some(Trigger::Open));
        assert_eq!(source.next_trigger(Trigger::Close, &cancel), None);
    }

    #[test]
    fn console_prompts_and_parses_lines() {
        let cancel = CancellationToken::new();
        let input = Cursor::new("\nopen\nsomething\nQuit\n");
        let mut source = ConsoleTriggers::with_io(input, Vec::new(), &input_config());
        assert_eq!(source.next_trigger(Trigger::Close, &cancel), Some(Trigger::Close));
        assert_eq!(source.next_trigger(Trigger::Close, &cancel), Some(Trigger::Open));
        assert_eq!(source.next_trigger(Trigger::Open, &cancel), Some(Trigger::Open));
        assert_eq!(source.next_trigger(Trigger::Close, &cancel), None);

        let prompts = String::from_utf8(source.into_prompt()).expect("utf8 prompts");
        assert_eq!(
            prompts.lines().collect::<Vec<_>>(),
            vec![
                "enter to close the gripper",
                "enter to close the gripper",
                "enter to open the gripper",
                "enter to close the gripper",
            ]
        );
    }

    #[test]
    fn console_end_of_input_ends_loop() {
        let cancel = CancellationToken::new();
        let mut source = ConsoleTriggers::with_io(Cursor::new(""), Vec::new(), &input_config());
        assert_eq!(source.next_trigger(Trigger::Close, &cancel), None);
    }
}
