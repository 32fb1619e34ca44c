// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Errors that calling into [`crate::dispatcher`], [`crate::tree`] or
//! [`crate::parser`] can raise.
//!
//! Every error here is a plain value: parsers and tree routing never panic
//! or throw on recoverable failure, they return one of these.

use std::fmt;

use thiserror::Error;

/// Errors produced while reading from a [`crate::cursor::CommandInputCursor`].
#[derive(Debug, Clone, Error)]
pub enum CursorError {
    /// A double-quoted string was never closed.
    #[error("unclosed double quote starting at byte {0}")]
    UnclosedDoubleQuote(usize),
    /// A single-quoted string was never closed.
    #[error("unclosed single quote starting at byte {0}")]
    UnclosedSingleQuote(usize),
    /// A trailing backslash had nothing left to escape.
    #[error("escaping backslash at end of input")]
    DanglingEscape,
    /// The cursor was empty where a token was required.
    #[error("expected a token but input was exhausted")]
    Exhausted,
}

/// The identifier of a parser, used to attribute failures and captions.
pub type ParserId = &'static str;

/// Errors a [`crate::parser::ArgumentParser`] can produce.
///
/// A parser failure never consumes cursor state (spec invariant: "a
/// parser's failure leaves the cursor unchanged").
#[derive(Debug, Error)]
pub enum ArgumentParseError {
    /// A numeric argument fell outside `[min, max]`, or failed to parse at all.
    #[error("'{input}' is not a valid {type_name} in range [{min}, {max}]")]
    NumberParse {
        /// The offending input fragment.
        input: String,
        /// The inclusive lower bound, formatted.
        min: String,
        /// The inclusive upper bound, formatted.
        max: String,
        /// The numeric type's display name (`"integer"`, `"float"`, ...).
        type_name: &'static str,
    },
    /// A boolean argument was not `true` or `false`.
    #[error("'{0}' is not a boolean")]
    BooleanParse(String),
    /// A single-character argument did not consist of exactly one character.
    #[error("'{0}' is not a single character")]
    CharParse(String),
    /// A string argument failed one of the quoted-string modes.
    #[error("'{0}' is not a valid string in the expected form")]
    StringParse(String),
    /// A UUID argument was malformed.
    #[error("'{0}' is not a valid UUID")]
    UuidParse(String),
    /// An enum argument did not match any known variant.
    #[error("'{input}' is not one of {valid:?}")]
    EnumParse {
        /// The offending input fragment.
        input: String,
        /// The variant names that would have been accepted.
        valid: Vec<&'static str>,
    },
    /// A regex argument did not match the parser's pattern.
    #[error("'{input}' does not match pattern {pattern}")]
    RegexParse {
        /// The offending input fragment.
        input: String,
        /// The source of the pattern that failed to match.
        pattern: String,
    },
    /// A duration argument was malformed (expected `1h30m5s`-style input).
    #[error("'{0}' is not a valid duration")]
    DurationParse(String),
    /// Neither alternative of an `either` parser succeeded.
    #[error("'{input}' matched neither alternative ({left_id} nor {right_id})")]
    Either {
        /// The offending input fragment.
        input: String,
        /// The identifier of the left alternative.
        left_id: ParserId,
        /// The identifier of the right alternative.
        right_id: ParserId,
    },
    /// Both branches of [`crate::parser::first_of`] failed.
    #[error("'{offending_input}' was rejected by both {primary_id} and {fallback_id}")]
    Aggregate {
        /// The offending input fragment.
        offending_input: String,
        /// The identifier of the primary parser.
        primary_id: ParserId,
        /// The identifier of the fallback parser.
        fallback_id: ParserId,
        /// The primary parser's own failure.
        primary_cause: Box<ArgumentParseError>,
        /// The fallback parser's own failure.
        fallback_cause: Box<ArgumentParseError>,
    },
    /// A required component's value was missing entirely (used by
    /// default-value resolution and flag value parsing).
    #[error("missing required argument '{0}'")]
    MissingComponent(&'static str),
    /// A preprocessor rejected the input before the parser ran.
    #[error("preprocessor rejected input: {0}")]
    PreprocessorRejected(String),
    /// The underlying cursor could not produce a token at all.
    #[error(transparent)]
    Cursor(#[from] CursorError),
    /// A host-supplied parser failed for a reason this crate doesn't model.
    #[error("{0}")]
    Custom(String),
}

/// Errors produced while building a [`crate::component::Command`].
#[derive(Debug, Clone, Error)]
pub enum BuilderError {
    /// A required component was added after an optional one in the same
    /// command path (spec invariant 4).
    #[error("required component '{0}' may not follow an optional component")]
    RequiredAfterOptional(&'static str),
}

/// Errors produced while inserting a command into a [`crate::tree::CommandTree`].
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// A command was already attached at the terminal node this
    /// registration would attach to.
    #[error("command already registered at this path (conflicts with '{existing}')")]
    OverlappingCommand {
        /// The name of the command already occupying the terminal node.
        existing: String,
    },
    /// Two children of the same node accept overlapping first tokens with
    /// no literal-vs-variable or specialization tie-break available.
    #[error("ambiguous children at node '{parent}': '{offending}' overlaps with existing siblings")]
    Ambiguous {
        /// The name of the parent node.
        parent: String,
        /// The name of the newly-inserted, offending component.
        offending: String,
        /// The names of every sibling at that node.
        siblings: Vec<String>,
    },
    /// The builder itself was malformed.
    #[error(transparent)]
    Builder(#[from] BuilderError),
}

/// The canonical error taxonomy produced by the execution coordinator.
///
/// One variant per row of the error-handling design: parsers never throw,
/// they return failures that get classified into one of these.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The root had no matching literal child for the first token.
    #[error("no such command: '{input}'")]
    NoSuchCommand {
        /// The offending input.
        input: String,
    },
    /// An intermediate match failed with a non-empty cursor remaining.
    #[error("invalid syntax, expected '{expected_syntax}'")]
    InvalidSyntax {
        /// The syntax that was expected at the point of failure.
        expected_syntax: String,
        /// What remained in the cursor when the failure was raised.
        cursor_remainder: String,
    },
    /// A permission predicate rejected the sender.
    #[error("no permission: '{permission}'")]
    NoPermission {
        /// The permission string that was required.
        permission: String,
    },
    /// The sender was not assignable to the terminal command's bound.
    #[error("invalid sender: expected {expected}, got {actual}")]
    InvalidSender {
        /// The sender's actual type name.
        actual: &'static str,
        /// The sender-type bound the command required.
        expected: &'static str,
    },
    /// An argument parser returned failure.
    #[error("failed to parse argument: {cause}")]
    ArgumentParse {
        /// The wrapped parse failure.
        cause: ArgumentParseError,
        /// The offending input fragment.
        offending_input: String,
        /// The identifier of the parser that failed.
        parser_id: ParserId,
    },
    /// The handler itself returned an error.
    #[error("command execution failed: {cause}")]
    CommandExecution {
        /// The handler's own error, boxed since handler error types vary
        /// per command.
        cause: Box<dyn std::error::Error + Send + Sync>,
    },
    /// A flag failed to parse (unknown flag, duplicate, etc).
    #[error(transparent)]
    Flag(#[from] crate::flag::FlagParseError),
}

impl ExecutionError {
    /// The caption key this error maps onto (spec.md §6/§7).
    #[must_use]
    pub fn caption_key(&self) -> &'static str {
        match self {
            ExecutionError::NoSuchCommand { .. } => "exception.no-such-command",
            ExecutionError::InvalidSyntax { .. } => "exception.invalid-syntax",
            ExecutionError::NoPermission { .. } => "exception.no-permission",
            ExecutionError::InvalidSender { .. } => "exception.invalid-sender",
            ExecutionError::ArgumentParse { .. } => "exception.invalid-argument",
            ExecutionError::CommandExecution { .. } => "exception.unexpected",
            ExecutionError::Flag(_) => "argument.parse.failure.flag",
        }
    }
}

impl fmt::Display for CaptionFormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no caption registered for key '{}'", self.0)
    }
}

/// Raised when [`crate::caption::CaptionRegistry`] is asked to format a key
/// it has no formatter for.
#[derive(Debug, Clone)]
pub struct CaptionFormatError(pub String);

impl std::error::Error for CaptionFormatError {}
