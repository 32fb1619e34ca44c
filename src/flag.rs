// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Flag Sub-grammar
//!
//! A flag group behaves as a single [`crate::component::Component`] within
//! the enclosing command. It owns a set of named `--flag`/`-f` arguments:
//! presence flags (no value), value flags (backed by an
//! [`crate::parser::ArgumentParser`]), and repeatable flags.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::context::CommandContext;
use crate::cursor::CommandInputCursor;
use crate::parser::ErasedParser;

/// Errors raised while parsing the flag sub-grammar (spec §4.4).
#[derive(Debug, Clone, Error)]
pub enum FlagParseError {
    /// A `--name`/`-a` token didn't match any registered flag.
    #[error("unknown flag '{0}'")]
    UnknownFlag(String),
    /// A non-repeatable flag was supplied more than once.
    #[error("duplicate flag '{0}'")]
    DuplicateFlag(String),
    /// A token looked like the start of a flag but matched no prefix rule.
    #[error("no flag started by '{0}'")]
    NoFlagStarted(String),
    /// A value flag had nothing following it.
    #[error("missing argument for flag '{0}'")]
    MissingArgument(String),
    /// The sender lacked the permission this flag requires.
    #[error("no permission for flag '{0}'")]
    FlagNoPermission(String),
}

/// A single named flag, presence or value, optionally repeatable.
pub struct Flag<S> {
    /// The long name, used as `--name` and as the key in the context.
    pub name: &'static str,
    /// Single-character short forms, used as `-a`, clusterable with other
    /// presence flags (`-abc`).
    pub aliases: Vec<char>,
    /// A permission the sender must satisfy to use this flag at all.
    pub permission: Option<String>,
    /// `None` for a presence flag; `Some` for a value flag, wrapping the
    /// parser that consumes its value.
    pub value: Option<Arc<dyn ErasedParser<S>>>,
    /// Whether this flag may be supplied more than once (producing a
    /// vector of values, or a presence count).
    pub repeatable: bool,
}

impl<S> Flag<S> {
    /// A flag with no value: its presence alone is the signal.
    #[must_use]
    pub fn presence(name: &'static str, aliases: &[char]) -> Self {
        Flag {
            name,
            aliases: aliases.to_vec(),
            permission: None,
            value: None,
            repeatable: false,
        }
    }

    /// A flag that takes a value, parsed by `parser`.
    #[must_use]
    pub fn valued(name: &'static str, aliases: &[char], parser: Arc<dyn ErasedParser<S>>) -> Self {
        Flag {
            name,
            aliases: aliases.to_vec(),
            permission: None,
            value: Some(parser),
            repeatable: false,
        }
    }

    /// Mark this flag as repeatable.
    #[must_use]
    pub fn repeatable(mut self, repeatable: bool) -> Self {
        self.repeatable = repeatable;
        self
    }

    /// Attach a permission requirement.
    #[must_use]
    pub fn permission(mut self, permission: impl Into<String>) -> Self {
        self.permission = Some(permission.into());
        self
    }

    fn matches_long(&self, candidate: &str) -> bool {
        candidate == self.name
    }

    fn matches_short(&self, c: char) -> bool {
        self.aliases.contains(&c)
    }
}

/// A group of flags, parsed as a unit at a single position in a command.
pub struct FlagGroup<S> {
    flags: Vec<Flag<S>>,
}

impl<S> Default for FlagGroup<S> {
    fn default() -> Self {
        FlagGroup { flags: Vec::new() }
    }
}

impl<S> FlagGroup<S> {
    /// An empty flag group.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a flag in this group.
    pub fn add(&mut self, flag: Flag<S>) -> &mut Self {
        self.flags.push(flag);
        self
    }

    /// All flags in this group, in registration order.
    #[must_use]
    pub fn flags(&self) -> &[Flag<S>] {
        &self.flags
    }

    fn find_by_long(&self, name: &str) -> Option<&Flag<S>> {
        self.flags.iter().find(|f| f.matches_long(name))
    }

    fn find_by_short(&self, c: char) -> Option<&Flag<S>> {
        self.flags.iter().find(|f| f.matches_short(c))
    }

    /// True if `token` is syntactically a flag invocation (`--name` or
    /// `-x` form, per the crate's flag-token grammar) whose name or alias
    /// is registered in this group. Used by
    /// [`crate::cursor::CommandInputCursor::read_greedy_flag_yielding_string`]
    /// to decide where a greedy string argument must stop.
    #[must_use]
    pub fn looks_like_known_flag(&self, token: &str) -> bool {
        if let Some(long) = token.strip_prefix("--") {
            is_long_flag_token(long) && self.find_by_long(long).is_some()
        } else if let Some(short) = token.strip_prefix('-') {
            is_short_flag_token(short) && short.chars().any(|c| self.find_by_short(c).is_some())
        } else {
            false
        }
    }

    /// Parse every flag invocation present at the cursor's current
    /// position, depositing values into `context`'s flag store.
    ///
    /// Returns once the cursor no longer points at something that looks
    /// like a flag invocation; positional arguments are the caller's
    /// concern.
    pub fn parse(
        &self,
        ctx: &mut CommandContext<S>,
        cursor: &mut CommandInputCursor,
        has_permission: &dyn Fn(&S, &str) -> bool,
    ) -> Result<(), FlagParseError> {
        let mut seen: HashMap<&'static str, usize> = HashMap::new();
        loop {
            let Some(token) = cursor.peek_string() else {
                break;
            };
            if let Some(long) = token.strip_prefix("--") {
                if !is_long_flag_token(long) {
                    break;
                }
                let _ = cursor.read_string();
                self.apply_long(long, ctx, cursor, &mut seen, has_permission)?;
            } else if let Some(short) = token.strip_prefix('-') {
                if !is_short_flag_token(short) {
                    break;
                }
                let _ = cursor.read_string();
                self.apply_short_cluster(short, ctx, cursor, &mut seen, has_permission)?;
            } else {
                break;
            }
        }
        Ok(())
    }

    fn check_permission(
        &self,
        flag: &Flag<S>,
        ctx: &CommandContext<S>,
        has_permission: &dyn Fn(&S, &str) -> bool,
    ) -> Result<(), FlagParseError> {
        if let Some(permission) = &flag.permission {
            if !has_permission(ctx.sender(), permission) {
                return Err(FlagParseError::FlagNoPermission(flag.name.to_string()));
            }
        }
        Ok(())
    }

    fn apply_long(
        &self,
        name: &str,
        ctx: &mut CommandContext<S>,
        cursor: &mut CommandInputCursor,
        seen: &mut HashMap<&'static str, usize>,
        has_permission: &dyn Fn(&S, &str) -> bool,
    ) -> Result<(), FlagParseError> {
        let flag = self
            .find_by_long(name)
            .ok_or_else(|| FlagParseError::UnknownFlag(name.to_string()))?;
        self.check_permission(flag, ctx, has_permission)?;
        self.record_and_consume(flag, ctx, cursor, seen)
    }

    fn apply_short_cluster(
        &self,
        cluster: &str,
        ctx: &mut CommandContext<S>,
        cursor: &mut CommandInputCursor,
        seen: &mut HashMap<&'static str, usize>,
        has_permission: &dyn Fn(&S, &str) -> bool,
    ) -> Result<(), FlagParseError> {
        let chars: Vec<char> = cluster.chars().collect();
        // A cluster of more than one character is only legal when every
        // character names a presence flag; a single character may name a
        // value flag and consume the following token.
        if chars.len() > 1 {
            for c in &chars {
                let flag = self
                    .find_by_short(*c)
                    .ok_or_else(|| FlagParseError::UnknownFlag(c.to_string()))?;
                if flag.value.is_some() {
                    return Err(FlagParseError::MissingArgument(flag.name.to_string()));
                }
                self.check_permission(flag, ctx, has_permission)?;
                self.record_and_consume(flag, ctx, cursor, seen)?;
            }
            return Ok(());
        }
        let c = chars[0];
        let flag = self
            .find_by_short(c)
            .ok_or_else(|| FlagParseError::UnknownFlag(c.to_string()))?;
        self.check_permission(flag, ctx, has_permission)?;
        self.record_and_consume(flag, ctx, cursor, seen)
    }

    fn record_and_consume(
        &self,
        flag: &Flag<S>,
        ctx: &mut CommandContext<S>,
        cursor: &mut CommandInputCursor,
        seen: &mut HashMap<&'static str, usize>,
    ) -> Result<(), FlagParseError> {
        let count = seen.entry(flag.name).or_insert(0);
        *count += 1;
        if *count > 1 && !flag.repeatable {
            return Err(FlagParseError::DuplicateFlag(flag.name.to_string()));
        }
        match &flag.value {
            None => {
                ctx.flags_mut().record_presence(flag.name);
            }
            Some(parser) => {
                let erased = parser
                    .parse_erased(ctx, cursor)
                    .map_err(|_| FlagParseError::MissingArgument(flag.name.to_string()))?;
                ctx.flags_mut().record_value(flag.name, erased, flag.repeatable);
            }
        }
        Ok(())
    }
}

fn is_long_flag_token(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
}

fn is_short_flag_token(cluster: &str) -> bool {
    !cluster.is_empty() && cluster.chars().all(|c| c.is_ascii_alphabetic())
}

/// Accumulated flag values for a single invocation, deposited into the
/// context and read back by handlers via `CommandContext::flags`.
#[derive(Default)]
pub struct FlagAccessor {
    presence: HashMap<&'static str, bool>,
    single: HashMap<&'static str, Box<dyn std::any::Any + Send + Sync>>,
    repeated: HashMap<&'static str, Vec<Box<dyn std::any::Any + Send + Sync>>>,
}

impl FlagAccessor {
    pub(crate) fn record_presence(&mut self, name: &'static str) {
        self.presence.insert(name, true);
    }

    pub(crate) fn record_value(
        &mut self,
        name: &'static str,
        value: Box<dyn std::any::Any + Send + Sync>,
        repeatable: bool,
    ) {
        if repeatable {
            self.repeated.entry(name).or_default().push(value);
        } else {
            self.single.insert(name, value);
        }
    }

    /// Was `name` present at all (presence flag, or value flag supplied)?
    #[must_use]
    pub fn is_present(&self, name: &str) -> bool {
        self.presence.contains_key(name) || self.single.contains_key(name) || self.repeated.contains_key(name)
    }

    /// The value of a non-repeatable value flag named `name`, if present
    /// and of type `T`.
    #[must_use]
    pub fn value<T: 'static>(&self, name: &str) -> Option<&T> {
        self.single.get(name).and_then(|v| v.downcast_ref::<T>())
    }

    /// All values recorded for a repeatable value flag named `name`.
    #[must_use]
    pub fn values<T: 'static>(&self, name: &str) -> Vec<&T> {
        self.repeated
            .get(name)
            .map(|values| values.iter().filter_map(|v| v.downcast_ref::<T>()).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_long_and_short_flag_tokens() {
        let mut group: FlagGroup<()> = FlagGroup::new();
        group.add(Flag::presence("foo", &['o']));
        assert!(group.looks_like_known_flag("--foo"));
        assert!(group.looks_like_known_flag("-o"));
        assert!(!group.looks_like_known_flag("--bar"));
        assert!(!group.looks_like_known_flag("plain"));
    }

    #[test]
    fn parses_presence_flag_by_long_and_short_name() {
        let mut group: FlagGroup<()> = FlagGroup::new();
        group.add(Flag::presence("foo", &['o']));
        let allow_all = |_: &(), _: &str| true;

        let mut ctx = CommandContext::new((), String::new());
        let mut cursor = CommandInputCursor::new("--foo");
        group.parse(&mut ctx, &mut cursor, &allow_all).unwrap();
        assert!(ctx.flags().is_present("foo"));

        let mut ctx = CommandContext::new((), String::new());
        let mut cursor = CommandInputCursor::new("-o");
        group.parse(&mut ctx, &mut cursor, &allow_all).unwrap();
        assert!(ctx.flags().is_present("foo"));
    }

    #[test]
    fn unknown_flag_is_rejected() {
        let group: FlagGroup<()> = FlagGroup::new();
        let allow_all = |_: &(), _: &str| true;
        let mut ctx = CommandContext::new((), String::new());
        let mut cursor = CommandInputCursor::new("--bar");
        let err = group.parse(&mut ctx, &mut cursor, &allow_all).unwrap_err();
        assert!(matches!(err, FlagParseError::UnknownFlag(name) if name == "bar"));
    }

    #[test]
    fn duplicate_non_repeatable_flag_is_rejected() {
        let mut group: FlagGroup<()> = FlagGroup::new();
        group.add(Flag::presence("foo", &['o']));
        let allow_all = |_: &(), _: &str| true;
        let mut ctx = CommandContext::new((), String::new());
        let mut cursor = CommandInputCursor::new("--foo --foo");
        let err = group.parse(&mut ctx, &mut cursor, &allow_all).unwrap_err();
        assert!(matches!(err, FlagParseError::DuplicateFlag(name) if name == "foo"));
    }
}
