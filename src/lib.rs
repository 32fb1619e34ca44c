// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # command_core
//!
//! A command dispatch framework for chat-driven hosts (game servers, bots,
//! shells). The host declares a hierarchical, typed command grammar; this
//! crate routes a raw input string to the right handler, parses every token
//! into a strongly-typed value, enforces permission and sender-type
//! preconditions, and offers context-sensitive suggestions for
//! partially-written input.
//!
//! * Commands are built with [`component::CommandBuilder`] and registered
//!   with a [`dispatcher::CommandManager`].
//! * Arguments are consumed by [`parser::ArgumentParser`] implementations;
//!   [`parser::standard`] ships the common ones (integers, strings, uuids,
//!   regexes, durations, ...).
//! * [`dispatcher::CommandManager::execute`] walks the [`tree::CommandTree`]
//!   and dispatches to a handler; [`dispatcher::CommandManager::suggest`]
//!   walks the same tree in suggestion mode.
//!
//! This library owns the grammar. It does not own I/O, sender identity, or
//! caption/i18n text sources beyond a registry mechanism — those are the
//! host's responsibility.

#![warn(missing_docs)]
#![deny(
    trivial_numeric_casts,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications
)]

pub mod caption;
pub mod component;
pub mod context;
pub mod cursor;
pub mod dispatcher;
pub mod error;
pub mod flag;
pub mod parser;
pub mod suggestion;
pub mod tree;

pub use caption::{CaptionKey, CaptionRegistry, CaptionVariables};
pub use component::{Command, CommandBuilder, Component, SenderBound};
pub use context::CommandContext;
pub use cursor::CommandInputCursor;
pub use dispatcher::{CommandManager, CommandSettings, Coordinator};
pub use error::{ExecutionError, RegistrationError};
pub use flag::{Flag, FlagAccessor, FlagGroup};
pub use parser::{ArgumentParseResult, ArgumentParser};
pub use suggestion::Suggestion;
