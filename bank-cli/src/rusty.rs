//! A minimal `rustyline` helper: history-aware line completion plus the
//! standard "continue on trailing backslash" validation rule.

use std::borrow::Cow;

use rustyline::completion::Completer;
use rustyline::completion::FilenameCompleter;
use rustyline::completion::Pair;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::ValidationContext;
use rustyline::validate::ValidationResult;
use rustyline::validate::Validator;
use rustyline::Context;
use rustyline::Helper;
use rustyline::Result;

const COMMANDS: &[&str] = &[
    "bootstrap", "deposit", "withdraw", "transfer", "reconcile", "help", "exit", "quit",
];

pub struct CliHelper {
    completer: FilenameCompleter,
}

impl CliHelper {
    pub fn new() -> Self {
        Self {
            completer: FilenameCompleter::new(),
        }
    }
}

impl Default for CliHelper {
    fn default() -> Self {
        Self::new()
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        Cow::Borrowed(line)
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned("\x1b[1m".to_owned() + hint + "\x1b[m")
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<Self::Hint> {
        let last_word = line.split_whitespace().next_back().unwrap_or(line);
        if last_word.is_empty() || pos != line.len() {
            return None;
        }
        COMMANDS
            .iter()
            .find(|cmd| cmd.starts_with(last_word) && **cmd != last_word)
            .map(|cmd| cmd[last_word.len()..].to_string())
    }
}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        ctx: &Context<'_>,
    ) -> std::result::Result<(usize, Vec<Pair>), ReadlineError> {
        let last_word = line[..pos].split_whitespace().next_back().unwrap_or("");
        let candidates: Vec<Pair> = COMMANDS
            .iter()
            .filter(|cmd| cmd.starts_with(last_word))
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();

        if !candidates.is_empty() {
            return Ok((pos - last_word.len(), candidates));
        }
        self.completer.complete(line, pos, ctx)
    }
}

impl Validator for CliHelper {
    fn validate(&self, ctx: &mut ValidationContext<'_>) -> Result<ValidationResult> {
        let input = ctx.input().trim_end();
        if input.strip_suffix('\\').is_some() {
            Ok(ValidationResult::Incomplete)
        } else {
            Ok(ValidationResult::Valid(None))
        }
    }
}

impl Helper for CliHelper {}
