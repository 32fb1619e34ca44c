// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Component Model
//!
//! A [`Component`] is one token's worth of a command's grammar: a literal,
//! a required argument, an optional argument (with a default-value
//! strategy), or an embedded flag group. This is a closed sum type rather
//! than the node trait-object hierarchy the teacher used
//! (`Node`/`NodeData`, `src/parser/nodes.rs`): spec Design Note 9 calls
//! for exactly this swap, and a closed `enum` also lets
//! [`crate::tree::CommandNode`] match on component kind exhaustively
//! instead of downcasting through `Any`.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::context::CommandContext;
use crate::error::{ArgumentParseError, BuilderError};
use crate::flag::FlagGroup;
use crate::parser::ErasedParser;

/// Metadata shared by every component kind, embedded by composition
/// rather than inherited.
#[derive(Default)]
pub struct ComponentMeta {
    /// A permission string the sender must satisfy to reach this
    /// component at all.
    pub permission: Option<String>,
    /// A human-readable description, surfaced by help/introspection.
    pub description: Option<String>,
}

/// How an [`Component::Optional`] component's value is produced when the
/// caller omits it.
pub enum DefaultValue<S> {
    /// Always the same boxed value.
    Constant(Arc<dyn Any + Send + Sync>),
    /// Computed from the context at resolution time.
    Dynamic(Arc<dyn Fn(&mut CommandContext<S>) -> Result<Arc<dyn Any + Send + Sync>, ArgumentParseError> + Send + Sync>),
    /// A literal string, re-parsed through the component's own parser —
    /// shares the validation path with real user input (spec §7).
    Parsed(String),
}

/// A narrower sender-type requirement than the manager's own `S`,
/// checked once at dispatch against the terminal command (spec §4.5
/// "sender-type gating"). `expected` names the bound for
/// [`crate::error::ExecutionError::InvalidSender`]; `check` is the
/// actual assignability predicate a host supplies (e.g. "is this sender
/// a player, not console").
pub struct SenderBound<S> {
    expected: &'static str,
    check: Arc<dyn Fn(&S) -> bool + Send + Sync>,
}

impl<S> SenderBound<S> {
    /// A bound named `expected`, satisfied exactly when `check` returns `true`.
    #[must_use]
    pub fn new(expected: &'static str, check: impl Fn(&S) -> bool + Send + Sync + 'static) -> Self {
        SenderBound {
            expected,
            check: Arc::new(check),
        }
    }

    /// The bound's diagnostic name, reported as `InvalidSender::expected`.
    #[must_use]
    pub fn expected(&self) -> &'static str {
        self.expected
    }

    /// Whether `sender` satisfies this bound.
    #[must_use]
    pub fn is_satisfied_by(&self, sender: &S) -> bool {
        (self.check)(sender)
    }
}

/// One token's worth of grammar.
pub enum Component<S> {
    /// A fixed keyword, plus any aliases that route to the same child.
    Literal {
        /// The canonical spelling.
        name: &'static str,
        /// Additional spellings that route identically.
        aliases: Vec<&'static str>,
        /// Shared metadata.
        meta: ComponentMeta,
    },
    /// A required, typed argument.
    Required {
        /// The name this component's parsed value is stored under.
        name: &'static str,
        /// The parser consuming this argument's tokens.
        parser: Arc<dyn ErasedParser<S>>,
        /// Shared metadata.
        meta: ComponentMeta,
    },
    /// An optional, typed argument with a default-value strategy.
    Optional {
        /// The name this component's parsed value is stored under.
        name: &'static str,
        /// The parser consuming this argument's tokens, when supplied.
        parser: Arc<dyn ErasedParser<S>>,
        /// How to produce a value when the caller omits this argument.
        default: DefaultValue<S>,
        /// Shared metadata.
        meta: ComponentMeta,
    },
    /// An embedded flag sub-grammar.
    Flags {
        /// The flags accepted at this position.
        group: Arc<FlagGroup<S>>,
        /// Shared metadata.
        meta: ComponentMeta,
    },
}

impl<S> Component<S> {
    /// The name this component is keyed by in the context / tree (the
    /// canonical literal spelling, or the argument name).
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Component::Literal { name, .. } => name,
            Component::Required { name, .. } => name,
            Component::Optional { name, .. } => name,
            Component::Flags { .. } => "<flags>",
        }
    }

    /// Shared metadata for this component, if it carries any (flag
    /// groups carry their own per-flag permissions instead).
    #[must_use]
    pub fn meta(&self) -> &ComponentMeta {
        match self {
            Component::Literal { meta, .. }
            | Component::Required { meta, .. }
            | Component::Optional { meta, .. }
            | Component::Flags { meta, .. } => meta,
        }
    }

    /// True for [`Component::Literal`].
    #[must_use]
    pub fn is_literal(&self) -> bool {
        matches!(self, Component::Literal { .. })
    }

    /// True for [`Component::Optional`] (used by the builder's
    /// required-after-optional check).
    #[must_use]
    pub fn is_optional(&self) -> bool {
        matches!(self, Component::Optional { .. })
    }
}

impl<S> fmt::Debug for Component<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Literal { name, aliases, .. } => {
                f.debug_struct("Literal").field("name", name).field("aliases", aliases).finish()
            }
            Component::Required { name, .. } => f.debug_struct("Required").field("name", name).finish(),
            Component::Optional { name, .. } => f.debug_struct("Optional").field("name", name).finish(),
            Component::Flags { .. } => f.debug_struct("Flags").finish(),
        }
    }
}

/// A chain of checks run over the cursor before its component's own
/// parser runs. Each entry takes `&CommandInputCursor`, not `&mut`, so a
/// preprocessor can reject input but never consume it.
pub type Preprocessor<S> = Arc<
    dyn Fn(&mut CommandContext<S>, &crate::cursor::CommandInputCursor<'_>) -> Result<(), ArgumentParseError>
        + Send
        + Sync,
>;

/// A fully-built command: a path of [`Component`]s, a handler, and the
/// metadata the tree needs to route and permission-check it.
pub struct Command<S> {
    /// The path of components from (but not including) the tree root.
    pub path: Vec<Component<S>>,
    /// Preprocessors run, in order, once the whole path has matched.
    pub preprocessors: Vec<Preprocessor<S>>,
    /// A permission the sender must satisfy to execute this command at all.
    pub permission: Option<String>,
    /// A short description, surfaced by introspection.
    pub description: Option<String>,
    /// The type name of the sender bound this command requires, for
    /// diagnostics (spec §7 `InvalidSender`).
    pub sender_type_name: &'static str,
    /// A narrower sender-type bound this command requires beyond being a
    /// valid `S` at all, checked at dispatch (spec §4.5).
    pub sender_bound: Option<SenderBound<S>>,
    handler: Arc<dyn CommandHandler<S>>,
}

impl<S> Command<S> {
    /// Invoke this command's handler.
    pub fn execute(&self, ctx: &mut CommandContext<S>) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.handler.handle(ctx)
    }
}

/// The host-supplied body of a command. Implemented automatically for any
/// `Fn(&mut CommandContext<S>) -> Result<(), E>` via the blanket impl
/// below, mirroring how the teacher's `Command` trait is implemented by
/// closures in its examples.
pub trait CommandHandler<S>: Send + Sync {
    /// Run the handler body against the fully-parsed context.
    fn handle(&self, ctx: &mut CommandContext<S>) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

impl<S, F, E> CommandHandler<S> for F
where
    F: Fn(&mut CommandContext<S>) -> Result<(), E> + Send + Sync,
    E: std::error::Error + Send + Sync + 'static,
{
    fn handle(&self, ctx: &mut CommandContext<S>) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (self)(ctx).map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)
    }
}

/// Incrementally assembles a [`Command`], enforcing build-time invariants
/// (required components may not follow optional ones) before `build()`
/// ever touches the tree.
pub struct CommandBuilder<S> {
    path: Vec<Component<S>>,
    preprocessors: Vec<Preprocessor<S>>,
    permission: Option<String>,
    description: Option<String>,
    sender_type_name: &'static str,
    sender_bound: Option<SenderBound<S>>,
    saw_optional: bool,
}

impl<S> CommandBuilder<S> {
    /// Begin building a command rooted at the literal `name`.
    #[must_use]
    pub fn literal(name: &'static str) -> Self {
        let mut builder = CommandBuilder {
            path: Vec::new(),
            preprocessors: Vec::new(),
            permission: None,
            description: None,
            sender_type_name: std::any::type_name::<S>(),
            sender_bound: None,
            saw_optional: false,
        };
        builder.path.push(Component::Literal {
            name,
            aliases: Vec::new(),
            meta: ComponentMeta::default(),
        });
        builder
    }

    /// Add aliases to the most recently added literal component.
    #[must_use]
    pub fn aliases(mut self, aliases: &[&'static str]) -> Self {
        if let Some(Component::Literal { aliases: slot, .. }) = self.path.last_mut() {
            slot.extend_from_slice(aliases);
        }
        self
    }

    /// Require `permission` of the sender to descend past the most
    /// recently added component (spec §4.5 "component-level permission
    /// gating") — distinct from [`CommandBuilder::permission`], which
    /// gates the whole command rather than one step along its path.
    #[must_use]
    pub fn component_permission(mut self, permission: impl Into<String>) -> Self {
        if let Some(component) = self.path.last_mut() {
            let meta = match component {
                Component::Literal { meta, .. }
                | Component::Required { meta, .. }
                | Component::Optional { meta, .. }
                | Component::Flags { meta, .. } => meta,
            };
            meta.permission = Some(permission.into());
        }
        self
    }

    /// Append another literal to the path.
    #[must_use]
    pub fn then_literal(mut self, name: &'static str) -> Self {
        self.path.push(Component::Literal {
            name,
            aliases: Vec::new(),
            meta: ComponentMeta::default(),
        });
        self
    }

    /// Append a required argument, backed by `parser`.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::RequiredAfterOptional`] if an optional
    /// component already appears earlier in the path.
    pub fn required(
        mut self,
        name: &'static str,
        parser: Arc<dyn ErasedParser<S>>,
    ) -> Result<Self, BuilderError> {
        if self.saw_optional {
            return Err(BuilderError::RequiredAfterOptional(name));
        }
        self.path.push(Component::Required {
            name,
            parser,
            meta: ComponentMeta::default(),
        });
        Ok(self)
    }

    /// Append an optional argument, backed by `parser` and `default`.
    #[must_use]
    pub fn optional(
        mut self,
        name: &'static str,
        parser: Arc<dyn ErasedParser<S>>,
        default: DefaultValue<S>,
    ) -> Self {
        self.saw_optional = true;
        self.path.push(Component::Optional {
            name,
            parser,
            default,
            meta: ComponentMeta::default(),
        });
        self
    }

    /// Append a flag group.
    #[must_use]
    pub fn flags(mut self, group: FlagGroup<S>) -> Self {
        self.path.push(Component::Flags {
            group: Arc::new(group),
            meta: ComponentMeta::default(),
        });
        self
    }

    /// Add a preprocessor, run after the full path matches and before the
    /// handler runs.
    #[must_use]
    pub fn preprocessor(mut self, preprocessor: Preprocessor<S>) -> Self {
        self.preprocessors.push(preprocessor);
        self
    }

    /// Require `permission` of the sender for the whole command.
    #[must_use]
    pub fn permission(mut self, permission: impl Into<String>) -> Self {
        self.permission = Some(permission.into());
        self
    }

    /// Attach a short description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Require the sender to satisfy `bound` at dispatch, beyond simply
    /// being a valid `S` (spec §4.5 "sender-type gating"). A sender that
    /// fails `bound` raises [`crate::error::ExecutionError::InvalidSender`].
    #[must_use]
    pub fn sender_bound(mut self, bound: SenderBound<S>) -> Self {
        self.sender_bound = Some(bound);
        self
    }

    /// Finalize the command with `handler` as its body.
    pub fn build<F, E>(self, handler: F) -> Command<S>
    where
        F: Fn(&mut CommandContext<S>) -> Result<(), E> + Send + Sync + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        Command {
            path: self.path,
            preprocessors: self.preprocessors,
            permission: self.permission,
            description: self.description,
            sender_type_name: self.sender_type_name,
            sender_bound: self.sender_bound,
            handler: Arc::new(handler),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::standard::IntegerParser;

    #[test]
    fn required_after_optional_is_rejected() {
        let builder = CommandBuilder::<()>::literal("give")
            .optional(
                "amount",
                Arc::new(IntegerParser::new(0, 64)),
                DefaultValue::Constant(Arc::new(1i64)),
            );
        let err = builder.required("reason", Arc::new(IntegerParser::new(0, 10)));
        assert!(matches!(err, Err(BuilderError::RequiredAfterOptional(name)) if name == "reason"));
    }

    #[test]
    fn builds_a_command_with_a_handler() {
        let command = CommandBuilder::<()>::literal("ping")
            .description("replies with pong")
            .build(|_ctx: &mut CommandContext<()>| Ok::<(), std::convert::Infallible>(()));
        assert_eq!(command.path.len(), 1);
        assert_eq!(command.description.as_deref(), Some("replies with pong"));
    }
}
