// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Context
//!
//! [`CommandContext`] carries everything a single execution or suggestion
//! pass accumulates as it walks the [`crate::tree::CommandTree`]: the
//! sender, the raw input, the typed values parsed so far, and the flags
//! recorded by any [`crate::flag::FlagGroup`] along the path.
//!
//! Values are stored by name; lookups compare the name only; a value that
//! was stored under the right name but the wrong type is reported as
//! absent rather than causing a panic, matching spec §3's context
//! contract ("a mismatched type is treated as not found, never a panic").

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::flag::FlagAccessor;

struct StoredValue {
    type_id: TypeId,
    value: Arc<dyn Any + Send + Sync>,
}

/// The per-invocation bag of parsed values, flags, and sender identity.
pub struct CommandContext<S> {
    sender: S,
    raw_input: String,
    suggestions: bool,
    liberal_flag_parsing: bool,
    values: HashMap<&'static str, StoredValue>,
    flags: FlagAccessor,
}

impl<S> CommandContext<S> {
    /// Begin a fresh context for one execution pass over `raw_input`.
    #[must_use]
    pub fn new(sender: S, raw_input: String) -> Self {
        CommandContext {
            sender,
            raw_input,
            suggestions: false,
            liberal_flag_parsing: false,
            values: HashMap::new(),
            flags: FlagAccessor::default(),
        }
    }

    /// Mark this context as having `LIBERAL_FLAG_PARSING` active, which
    /// lets a `string.greedy_flag_yielding` argument absorb flags that
    /// appear interleaved with, rather than strictly after, its text
    /// (spec §4.4). Set by [`crate::dispatcher::CommandManager`] from its
    /// live [`crate::dispatcher::CommandSettings`] when building the
    /// context for a dispatch.
    pub fn set_liberal_flag_parsing(&mut self, liberal: bool) {
        self.liberal_flag_parsing = liberal;
    }

    /// Whether `LIBERAL_FLAG_PARSING` is active for this dispatch.
    #[must_use]
    pub fn liberal_flag_parsing(&self) -> bool {
        self.liberal_flag_parsing
    }

    /// Begin a fresh context for a suggestion pass; [`is_suggestion`] will
    /// report `true` so parsers can relax validation that only matters at
    /// execution time (spec §9: "suggestion mode never errors on a
    /// partial or invalid trailing token").
    ///
    /// [`is_suggestion`]: Self::is_suggestion
    #[must_use]
    pub fn new_for_suggestions(sender: S, raw_input: String) -> Self {
        let mut ctx = Self::new(sender, raw_input);
        ctx.suggestions = true;
        ctx
    }

    /// The sender that issued this command.
    #[must_use]
    pub fn sender(&self) -> &S {
        &self.sender
    }

    /// The raw, unmodified input this context was built from.
    #[must_use]
    pub fn raw_input(&self) -> &str {
        &self.raw_input
    }

    /// Whether this context is being used to compute suggestions rather
    /// than to execute a command.
    #[must_use]
    pub fn is_suggestion(&self) -> bool {
        self.suggestions
    }

    /// Record a parsed value under `name`, overwriting any prior value of
    /// any type stored under the same name.
    pub fn insert<T: Any + Send + Sync>(&mut self, name: &'static str, value: T) {
        self.values.insert(
            name,
            StoredValue {
                type_id: TypeId::of::<T>(),
                value: Arc::new(value),
            },
        );
    }

    /// Record an already-erased value under `name`. Used by the tree
    /// walker when threading erased parser output (or a resolved default
    /// value) through a homogeneous node without knowing the concrete
    /// type itself; the stored type id is read off the trait object, so
    /// a later typed `get::<T>` still matches correctly.
    pub(crate) fn insert_erased(&mut self, name: &'static str, value: Arc<dyn Any + Send + Sync>) {
        let type_id = (*value).type_id();
        self.values.insert(name, StoredValue { type_id, value });
    }

    /// Look up a value stored under `name`. If a value exists under that
    /// name but was stored as a different type, this returns `None`
    /// rather than panicking.
    #[must_use]
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Option<&T> {
        self.values.get(name).and_then(|stored| {
            if stored.type_id == TypeId::of::<T>() {
                stored.value.downcast_ref::<T>()
            } else {
                None
            }
        })
    }

    /// True if any value, of any type, is stored under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// The flags recorded by any [`crate::flag::FlagGroup`] encountered
    /// while walking the command path.
    #[must_use]
    pub fn flags(&self) -> &FlagAccessor {
        &self.flags
    }

    /// Mutable access to the flag store, used by
    /// [`crate::flag::FlagGroup::parse`] while consuming flag tokens.
    pub fn flags_mut(&mut self) -> &mut FlagAccessor {
        &mut self.flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_and_retrieves_by_name_and_type() {
        let mut ctx = CommandContext::new((), "test".to_string());
        ctx.insert("amount", 42i64);
        assert_eq!(ctx.get::<i64>("amount"), Some(&42));
    }

    #[test]
    fn type_mismatch_is_absent_not_panic() {
        let mut ctx = CommandContext::new((), "test".to_string());
        ctx.insert("amount", 42i64);
        assert_eq!(ctx.get::<String>("amount"), None);
    }

    #[test]
    fn unknown_name_is_absent() {
        let ctx: CommandContext<()> = CommandContext::new((), "test".to_string());
        assert_eq!(ctx.get::<i64>("missing"), None);
    }

    #[test]
    fn suggestion_contexts_report_suggestion_mode() {
        let ctx: CommandContext<()> = CommandContext::new_for_suggestions((), "test".to_string());
        assert!(ctx.is_suggestion());
    }
}
