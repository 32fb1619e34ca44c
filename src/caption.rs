// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Captions
//!
//! Every end-user-visible failure this crate raises passes through a
//! [`CaptionRegistry`] rather than formatting its own message: a host
//! wants to localize or reword "no such command" without patching the
//! crate. A registry ships pre-populated with a default English
//! formatter for every key this crate names (spec §6); a host overwrites
//! entries it wants to translate.

use std::collections::HashMap;

use crate::error::CaptionFormatError;

/// A stable identifier for one user-facing message template.
pub type CaptionKey = &'static str;

/// The substitution variables available when formatting a caption,
/// matching "`<name>` placeholders substituted with the variables
/// supplied at error-raise time" (spec §6).
#[derive(Default, Clone)]
pub struct CaptionVariables {
    entries: HashMap<&'static str, String>,
}

impl CaptionVariables {
    /// An empty variable set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `value` for substitution.
    #[must_use]
    pub fn with(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.entries.insert(name, value.into());
        self
    }

    /// The bound value for `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }
}

/// A formatter for one caption key: renders a template given the
/// variables supplied when the underlying error was raised.
pub type CaptionFormatter = Box<dyn Fn(&CaptionVariables) -> String + Send + Sync>;

/// The set of every known caption key and its formatter.
pub struct CaptionRegistry {
    formatters: HashMap<CaptionKey, CaptionFormatter>,
}

fn substitute(template: &str, variables: &CaptionVariables) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('<') {
        let Some(end) = rest[start..].find('>') else {
            output.push_str(rest);
            return output;
        };
        output.push_str(&rest[..start]);
        let name = &rest[start + 1..start + end];
        match variables.get(name) {
            Some(value) => output.push_str(value),
            None => {
                output.push('<');
                output.push_str(name);
                output.push('>');
            }
        }
        rest = &rest[start + end + 1..];
    }
    output.push_str(rest);
    output
}

fn template(text: &'static str) -> CaptionFormatter {
    Box::new(move |vars| substitute(text, vars))
}

impl Default for CaptionRegistry {
    fn default() -> Self {
        let mut registry = CaptionRegistry {
            formatters: HashMap::new(),
        };
        for (key, text) in DEFAULT_CAPTIONS {
            registry.formatters.insert(*key, template(text));
        }
        registry
    }
}

impl CaptionRegistry {
    /// A registry pre-populated with this crate's default English
    /// captions (spec §6's full key list).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install or replace the formatter for `key`.
    pub fn set(&mut self, key: CaptionKey, formatter: CaptionFormatter) {
        self.formatters.insert(key, formatter);
    }

    /// Render `key` with `variables`.
    ///
    /// # Errors
    ///
    /// Returns [`CaptionFormatError`] if no formatter is registered for
    /// `key`.
    pub fn format(&self, key: CaptionKey, variables: &CaptionVariables) -> Result<String, CaptionFormatError> {
        self.formatters
            .get(key)
            .map(|f| f(variables))
            .ok_or_else(|| CaptionFormatError(key.to_string()))
    }
}

const DEFAULT_CAPTIONS: &[(CaptionKey, &str)] = &[
    ("argument.parse.failure.number", "'<input>' is not a number between <min> and <max>"),
    ("argument.parse.failure.boolean", "'<input>' is not true or false"),
    ("argument.parse.failure.char", "'<input>' is not a single character"),
    ("argument.parse.failure.string", "'<input>' is not a valid string"),
    ("argument.parse.failure.uuid", "'<input>' is not a valid UUID"),
    ("argument.parse.failure.enum", "'<input>' is not one of <valid>"),
    ("argument.parse.failure.regex", "'<input>' does not match <pattern>"),
    ("argument.parse.failure.duration", "'<input>' is not a valid duration"),
    ("argument.parse.failure.either", "'<input>' matched neither <left> nor <right>"),
    ("argument.parse.failure.flag.unknown", "unknown flag '<name>'"),
    ("argument.parse.failure.flag.duplicate", "duplicate flag '<name>'"),
    ("argument.parse.failure.flag.no-flag-started", "no flag started by '<name>'"),
    ("argument.parse.failure.flag.missing-argument", "missing argument for flag '<name>'"),
    ("argument.parse.failure.flag.no-permission", "no permission for flag '<name>'"),
    ("aggregate.missing", "'<input>' did not match any of the expected forms"),
    ("aggregate.component", "could not parse component '<name>': <cause>"),
    ("exception.no-such-command", "no such command: '<input>'"),
    ("exception.invalid-syntax", "invalid syntax, expected: <expected>"),
    ("exception.no-permission", "you do not have permission to do that"),
    ("exception.invalid-sender", "this command cannot be run by <actual>"),
    ("exception.invalid-argument", "invalid argument: <cause>"),
    ("exception.unexpected", "an unexpected error occurred"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_substitution() {
        let registry = CaptionRegistry::new();
        let vars = CaptionVariables::new().with("input", "xyz").with("min", "0").with("max", "10");
        let rendered = registry.format("argument.parse.failure.number", &vars).unwrap();
        assert_eq!(rendered, "'xyz' is not a number between 0 and 10");
    }

    #[test]
    fn unknown_key_is_an_error() {
        let registry = CaptionRegistry::new();
        assert!(registry.format("nonexistent", &CaptionVariables::new()).is_err());
    }

    #[test]
    fn missing_variable_leaves_placeholder_untouched() {
        let registry = CaptionRegistry::new();
        let rendered = registry.format("exception.no-such-command", &CaptionVariables::new()).unwrap();
        assert_eq!(rendered, "no such command: '<input>'");
    }

    #[test]
    fn host_can_override_a_caption() {
        let mut registry = CaptionRegistry::new();
        registry.set("exception.no-permission", template("nope"));
        let rendered = registry.format("exception.no-permission", &CaptionVariables::new()).unwrap();
        assert_eq!(rendered, "nope");
    }
}
