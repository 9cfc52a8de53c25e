//! The interactive session loop.
//!
//! Reads logical messages, sends each one with the whole conversation, and
//! applies the outcome. Only this loop touches the history.

use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufRead, Lines};

use crate::client::ChatCompletion;
use crate::config::SessionConfig;
use crate::error::ChatError;
use crate::gateway::{Gateway, Outcome};
use crate::history::{History, Message};
use crate::input::{Assembled, LineAssembler, Mode};
use crate::interrupt::Interrupts;
use crate::progress::Spinner;
use crate::render::Renderer;

const QUIT_COMMANDS: &[&str] = &["/quit", "/exit"];

/// Why the session loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    EndOfInput,
    Quit,
    /// Ctrl+C while waiting for input.
    Interrupted,
}

/// How one turn ended, from the user's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    Replied,
    Failed,
    Canceled,
}

pub struct Session<B, O, E> {
    gateway: Gateway<B>,
    renderer: Renderer,
    history: History,
    assembler: LineAssembler,
    spinner: Spinner,
    /// Replies and prompts
    out: O,
    /// Errors, notices and the spinner
    err: E,
}

impl<B, O, E> Session<B, O, E>
where
    B: ChatCompletion,
    O: Write,
    E: Write,
{
    pub fn new(config: &SessionConfig, backend: Arc<B>, out: O, err: E) -> Self {
        Self {
            gateway: Gateway::new(backend, config.model.clone(), config.timeout),
            renderer: Renderer::new(config.style, config.plain),
            history: History::default(),
            assembler: LineAssembler::default(),
            spinner: Spinner::new(config.show_progress),
            out,
            err,
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Run until end of input, a quit command, or Ctrl+C while idle.
    pub async fn run<R>(&mut self, lines: &mut Lines<R>, interrupts: &mut Interrupts) -> Result<Exit>
    where
        R: AsyncBufRead + Unpin,
    {
        loop {
            self.prompt()?;

            let line = tokio::select! {
                biased;

                line = lines.next_line() => line?,
                _ = interrupts.recv() => {
                    writeln!(self.out)?;
                    return Ok(Exit::Interrupted);
                }
            };
            let Some(line) = line else {
                writeln!(self.out)?;
                if self.assembler.mode() == Mode::Collecting {
                    let pending = self.assembler.pending();
                    tracing::debug!(lines = pending, "input ended inside a block, discarding it");
                    writeln!(self.err, "■ unterminated block discarded ({pending} lines)")?;
                }
                return Ok(Exit::EndOfInput);
            };

            let message = match self.assembler.push(&line) {
                None => continue,
                // Commands only count outside a block.
                Some(Assembled::Line(text)) if QUIT_COMMANDS.contains(&text.trim()) => {
                    return Ok(Exit::Quit);
                }
                Some(Assembled::Line(text) | Assembled::Block(text)) => text,
            };

            self.send(message, interrupts).await?;
        }
    }

    /// One turn: record the user message, dispatch, apply the outcome.
    pub async fn send(&mut self, text: String, interrupts: &mut Interrupts) -> Result<Turn> {
        self.history.append(Message::user(text));

        let outcome = self
            .gateway
            .dispatch(&self.history, interrupts, &mut self.spinner, &mut self.err)
            .await;

        let turn = match outcome {
            Outcome::Success(reply) => {
                self.history.append(Message::system(reply.clone()));
                if let Err(e) = self.renderer.render(&mut self.out, &reply) {
                    tracing::warn!(error = %e, "reply could not be written");
                    writeln!(self.err, "✗ could not display reply: {e}")?;
                }
                Turn::Replied
            }
            // The user message stays in history: later turns still carry it.
            Outcome::RemoteError(e) => {
                writeln!(self.err, "✗ {e:#}")?;
                Turn::Failed
            }
            Outcome::Timeout(d) => {
                writeln!(self.err, "✗ {}", ChatError::Timeout(d))?;
                Turn::Failed
            }
            Outcome::Canceled => {
                writeln!(self.err, "■ canceled")?;
                Turn::Canceled
            }
        };
        self.err.flush()?;
        Ok(turn)
    }

    fn prompt(&mut self) -> std::io::Result<()> {
        let marker = match self.assembler.mode() {
            Mode::Normal => "> ",
            Mode::Collecting => ". ",
        };
        write!(self.out, "{marker}")?;
        self.out.flush()
    }
}
