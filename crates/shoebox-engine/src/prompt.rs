//! Operator interaction seam.
//!
//! The resolver asks for a label through this trait. The default
//! implementation talks to the terminal; tests script their answers.

use std::{
    collections::VecDeque,
    io::Write,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::NaiveDate;
use shoebox_types::{Result, ShoeboxError};

#[async_trait]
pub trait LabelPrompt: Send + Sync {
    /// Asks the operator to name the given day. The answer is used verbatim;
    /// an empty string is a valid label.
    async fn request_label(&self, day: NaiveDate) -> Result<String>;
}

/// Interactive prompt on the controlling terminal. The read intentionally
/// blocks the whole run; nothing proceeds until the operator answers.
#[derive(Debug, Clone, Default)]
pub struct ConsolePrompt;

impl ConsolePrompt {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LabelPrompt for ConsolePrompt {
    async fn request_label(&self, day: NaiveDate) -> Result<String> {
        let mut stdout = std::io::stdout();
        write!(stdout, "Label for {day}: ")
            .and_then(|_| stdout.flush())
            .map_err(|err| prompt_error(format!("unable to write prompt: {err}")))?;

        let mut line = String::new();
        let read = std::io::stdin()
            .read_line(&mut line)
            .map_err(|err| prompt_error(format!("unable to read answer: {err}")))?;
        if read == 0 {
            return Err(prompt_error("input stream closed"));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_owned())
    }
}

/// Prompt that replays prepared answers and records every day it was asked
/// about. Serves deterministic tests and batch wiring.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPrompt {
    answers: Arc<Mutex<VecDeque<String>>>,
    asked: Arc<Mutex<Vec<NaiveDate>>>,
}

impl ScriptedPrompt {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Arc::new(Mutex::new(answers.into_iter().map(Into::into).collect())),
            asked: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Days the resolver asked about, in order.
    pub fn asked(&self) -> Vec<NaiveDate> {
        self.asked.lock().map(|days| days.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LabelPrompt for ScriptedPrompt {
    async fn request_label(&self, day: NaiveDate) -> Result<String> {
        self.asked
            .lock()
            .map_err(|_| prompt_error("failed to lock prompt log"))?
            .push(day);
        self.answers
            .lock()
            .map_err(|_| prompt_error("failed to lock prompt answers"))?
            .pop_front()
            .ok_or_else(|| prompt_error(format!("no scripted answer left for {day}")))
    }
}

pub fn prompt_error(message: impl Into<String>) -> ShoeboxError {
    ShoeboxError::Prompt(message.into())
}
