// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command-line option table
//!
//! Options are registered on the application with a short character and a
//! long name, then resolved in one `parse_options` pass over argv. Unknown
//! options and missing mandatory arguments are reported through the
//! application's `invalid_option` / `missing_parameter` signals so callers
//! can react without the parser taking a policy stance.

use crate::application::Application;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    NoArg,
    MandatoryArg,
    OptionalArg,
}

/// How forgiving option matching is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strictness {
    /// `-x` is a short cluster; long names need `--`.
    Strict,
    /// Single-dash words are matched against long names first.
    Flexible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailVerbosity {
    Verbose,
    Silent,
}

struct OptionState {
    set: AtomicBool,
    valid: AtomicBool,
    argument: Mutex<Option<String>>,
}

/// An option registered with the application. Results become valid once
/// `parse_options` has run.
#[derive(Clone)]
pub struct AppOption {
    state: Arc<OptionState>,
}

impl AppOption {
    pub fn new() -> AppOption {
        AppOption {
            state: Arc::new(OptionState {
                set: AtomicBool::new(false),
                valid: AtomicBool::new(false),
                argument: Mutex::new(None),
            }),
        }
    }

    /// Whether the option appeared on the command line.
    pub fn is_set(&self) -> bool {
        self.state.set.load(Ordering::SeqCst)
    }

    /// The argument given to the option, if any.
    pub fn argument(&self) -> Option<String> {
        self.state.argument.lock().clone()
    }

    /// False until `parse_options` has run.
    pub fn is_valid(&self) -> bool {
        self.state.valid.load(Ordering::SeqCst)
    }
}

impl Default for AppOption {
    fn default() -> AppOption {
        AppOption::new()
    }
}

pub(crate) struct OptionEntry {
    short: char,
    long: String,
    kind: OptionKind,
    state: Arc<OptionState>,
}

impl Application {
    pub fn add_option_without_arg(&self, option: &AppOption, short: char, long: &str) {
        self.add_option(option, short, long, OptionKind::NoArg);
    }

    pub fn add_option_with_mandatory_arg(&self, option: &AppOption, short: char, long: &str) {
        self.add_option(option, short, long, OptionKind::MandatoryArg);
    }

    pub fn add_option_with_optional_arg(&self, option: &AppOption, short: char, long: &str) {
        self.add_option(option, short, long, OptionKind::OptionalArg);
    }

    fn add_option(&self, option: &AppOption, short: char, long: &str, kind: OptionKind) {
        let entry = OptionEntry {
            short,
            long: long.to_string(),
            kind,
            state: Arc::clone(&option.state),
        };
        self.inner().options.lock().push(entry);
    }

    /// Parse argv against the registered options. Returns the non-option
    /// arguments in order. Diagnoses through `invalid_option` and
    /// `missing_parameter`.
    pub fn parse_options(
        &self,
        strictness: Strictness,
        verbosity: FailVerbosity,
    ) -> Vec<String> {
        let parser = Parser {
            app: self,
            verbosity,
            strictness,
        };
        let positionals = parser.run();
        for entry in self.inner().options.lock().iter() {
            entry.state.valid.store(true, Ordering::SeqCst);
        }
        positionals
    }
}

struct Parser<'a> {
    app: &'a Application,
    verbosity: FailVerbosity,
    strictness: Strictness,
}

impl Parser<'_> {
    fn run(&self) -> Vec<String> {
        let args: Vec<String> = self.app.args().iter().skip(1).cloned().collect();
        let mut positionals = Vec::new();
        let mut index = 0;
        while index < args.len() {
            let arg = &args[index];
            if arg == "--" {
                positionals.extend(args[index + 1..].iter().cloned());
                break;
            }
            if let Some(long) = arg.strip_prefix("--") {
                index = self.take_long(long, &args, index);
            } else if arg.len() > 1 && arg.starts_with('-') {
                let body = &arg[1..];
                if self.strictness == Strictness::Flexible && self.matches_long(body) {
                    index = self.take_long(body, &args, index);
                } else {
                    index = self.take_shorts(body, &args, index);
                }
            } else {
                positionals.push(arg.clone());
                index += 1;
            }
        }
        positionals
    }

    fn matches_long(&self, body: &str) -> bool {
        let name = body.split('=').next().unwrap_or(body);
        self.with_entries(|entries| entries.iter().any(|e| e.long == name))
    }

    /// Handle `--name`, `--name=value`, `--name value`. Returns the index of
    /// the next unconsumed argument.
    fn take_long(&self, body: &str, args: &[String], index: usize) -> usize {
        let (name, inline_value) = match body.split_once('=') {
            Some((name, value)) => (name, Some(value.to_string())),
            None => (body, None),
        };
        let found = self.with_entries(|entries| {
            entries
                .iter()
                .find(|e| e.long == name)
                .map(|e| (e.kind, Arc::clone(&e.state)))
        });
        let Some((kind, state)) = found else {
            self.invalid(name);
            return index + 1;
        };
        match kind {
            OptionKind::NoArg => {
                state.set.store(true, Ordering::SeqCst);
                index + 1
            }
            OptionKind::OptionalArg => {
                state.set.store(true, Ordering::SeqCst);
                *state.argument.lock() = inline_value;
                index + 1
            }
            OptionKind::MandatoryArg => {
                if let Some(value) = inline_value {
                    state.set.store(true, Ordering::SeqCst);
                    *state.argument.lock() = Some(value);
                    index + 1
                } else if index + 1 < args.len() {
                    state.set.store(true, Ordering::SeqCst);
                    *state.argument.lock() = Some(args[index + 1].clone());
                    index + 2
                } else {
                    self.missing(name);
                    index + 1
                }
            }
        }
    }

    /// Handle a `-abc` short cluster. Returns the index of the next
    /// unconsumed argument.
    fn take_shorts(&self, body: &str, args: &[String], index: usize) -> usize {
        let chars: Vec<char> = body.chars().collect();
        let mut pos = 0;
        while pos < chars.len() {
            let short = chars[pos];
            let found = self.with_entries(|entries| {
                entries
                    .iter()
                    .find(|e| e.short == short)
                    .map(|e| (e.kind, Arc::clone(&e.state)))
            });
            let Some((kind, state)) = found else {
                self.invalid(&short.to_string());
                pos += 1;
                continue;
            };
            match kind {
                OptionKind::NoArg => {
                    state.set.store(true, Ordering::SeqCst);
                    pos += 1;
                }
                OptionKind::OptionalArg => {
                    // only an attached value counts: -ovalue
                    let rest: String = chars[pos + 1..].iter().collect();
                    state.set.store(true, Ordering::SeqCst);
                    *state.argument.lock() =
                        if rest.is_empty() { None } else { Some(rest) };
                    return index + 1;
                }
                OptionKind::MandatoryArg => {
                    let rest: String = chars[pos + 1..].iter().collect();
                    if !rest.is_empty() {
                        state.set.store(true, Ordering::SeqCst);
                        *state.argument.lock() = Some(rest);
                        return index + 1;
                    }
                    if index + 1 < args.len() {
                        state.set.store(true, Ordering::SeqCst);
                        *state.argument.lock() = Some(args[index + 1].clone());
                        return index + 2;
                    }
                    self.missing(&short.to_string());
                    return index + 1;
                }
            }
        }
        index + 1
    }

    fn with_entries<T>(&self, f: impl FnOnce(&[OptionEntry]) -> T) -> T {
        let entries = self.app.inner().options.lock();
        f(&entries)
    }

    fn invalid(&self, name: &str) {
        if self.verbosity == FailVerbosity::Verbose {
            tracing::warn!(option = name, "invalid option");
        }
        self.app.invalid_option.emit(());
    }

    fn missing(&self, name: &str) {
        if self.verbosity == FailVerbosity::Verbose {
            tracing::warn!(option = name, "missing parameter for option");
        }
        self.app.missing_parameter.emit(());
    }
}

#[cfg(test)]
#[path = "options_tests.rs"]
mod tests;
