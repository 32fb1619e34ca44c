// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Execution Coordinator
//!
//! [`CommandManager`] is the façade a host actually talks to: register
//! commands, execute input, ask for suggestions. It delegates the actual
//! walk to a [`CommandTree`] behind a `parking_lot::RwLock` (write-locked
//! only during registration, matching the read-mostly access pattern
//! `tn-lorenz-SteelMC`'s `scc::HashMap`-backed dispatcher assumes) and
//! the parse/execute phases to a pluggable [`Coordinator`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::future::FutureExt;
use parking_lot::RwLock;

use crate::caption::CaptionRegistry;
use crate::component::{Command, CommandBuilder};
use crate::context::CommandContext;
use crate::cursor::CommandInputCursor;
use crate::error::{ExecutionError, RegistrationError};
use crate::suggestion::{Suggestion, SuggestionFactory};
use crate::tree::CommandTree;

/// The three togglable behaviors spec.md §6 names as a plain settings
/// struct rather than a file-backed configuration source (this crate has
/// no file I/O at all — see DESIGN.md).
#[derive(Debug, Clone, Copy)]
pub struct CommandSettings {
    /// Whether a greedy-flag-yielding string stops at the first
    /// plausible flag token even if a later token turns out to be
    /// syntactically invalid as a flag.
    pub liberal_flag_parsing: bool,
    /// Whether an unrecognized root literal silently falls through
    /// rather than raising [`ExecutionError::NoSuchCommand`].
    pub allow_unknown_root: bool,
    /// Whether registering a command at an already-terminal node
    /// replaces the existing command instead of failing.
    pub override_existing_commands: bool,
}

impl Default for CommandSettings {
    fn default() -> Self {
        CommandSettings {
            liberal_flag_parsing: false,
            allow_unknown_root: false,
            override_existing_commands: false,
        }
    }
}

/// A boxed future of an execution outcome, used so synchronous and
/// asynchronous coordinators can share one trait.
pub type CoordinatorFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Drives the parse and handler-invocation phases of a single execution.
/// `SimpleCoordinator` runs both synchronously (wrapped in an
/// already-completed future); `AsyncCoordinator` defers each phase to a
/// `tokio` task when configured to.
pub trait Coordinator<S>: Send + Sync {
    /// Route `cursor` through `tree`, returning the resolved command.
    /// `has_permission` is threaded down to every descent step so
    /// component-level and flag permissions (spec §4.5) can be enforced
    /// mid-route, not just against the resolved command as a whole.
    fn parse(
        &self,
        tree: &CommandTree<S>,
        ctx: &mut CommandContext<S>,
        cursor: &mut CommandInputCursor<'_>,
        has_permission: &dyn Fn(&S, &str) -> bool,
    ) -> Result<Arc<Command<S>>, ExecutionError>;

    /// Invoke `command`'s handler against `ctx`.
    fn handle(&self, command: &Command<S>, ctx: &mut CommandContext<S>) -> Result<(), ExecutionError>;
}

/// A coordinator that runs both phases synchronously, on the caller's
/// own thread.
#[derive(Default)]
pub struct SimpleCoordinator;

impl<S> Coordinator<S> for SimpleCoordinator {
    fn parse(
        &self,
        tree: &CommandTree<S>,
        ctx: &mut CommandContext<S>,
        cursor: &mut CommandInputCursor<'_>,
        has_permission: &dyn Fn(&S, &str) -> bool,
    ) -> Result<Arc<Command<S>>, ExecutionError> {
        tree.route(ctx, cursor, has_permission)
    }

    fn handle(&self, command: &Command<S>, ctx: &mut CommandContext<S>) -> Result<(), ExecutionError> {
        command
            .execute(ctx)
            .map_err(|cause| ExecutionError::CommandExecution { cause })
    }
}

/// Which phases of execution an [`AsyncCoordinator`] defers to the
/// `tokio` runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoordinatorSettings {
    /// Run the parse phase on a blocking task.
    pub parse_asynchronously: bool,
    /// Run the handler phase on a blocking task.
    pub handle_asynchronously: bool,
}

/// A coordinator that can defer either phase to the ambient `tokio`
/// runtime. Since [`Coordinator::parse`]/[`Coordinator::handle`] are
/// themselves synchronous (the tree and handler aren't `Send` across an
/// `.await` point in every host), "asynchronous" here means "run via
/// `tokio::task::block_in_place` when a multi-threaded runtime is
/// available", matching `tn-lorenz-SteelMC`'s own mixed sync/async
/// dispatcher rather than forcing every handler to become `async fn`.
/// `block_in_place` hands the executing worker thread off to another
/// task while this one runs, so a slow parse or handler doesn't stall
/// the runtime's other work the way running it inline would.
pub struct AsyncCoordinator {
    settings: CoordinatorSettings,
}

impl AsyncCoordinator {
    /// Build an async coordinator with the given phase settings.
    #[must_use]
    pub fn new(settings: CoordinatorSettings) -> Self {
        AsyncCoordinator { settings }
    }
}

impl<S> Coordinator<S> for AsyncCoordinator {
    fn parse(
        &self,
        tree: &CommandTree<S>,
        ctx: &mut CommandContext<S>,
        cursor: &mut CommandInputCursor<'_>,
        has_permission: &dyn Fn(&S, &str) -> bool,
    ) -> Result<Arc<Command<S>>, ExecutionError> {
        if self.settings.parse_asynchronously && tokio::runtime::Handle::try_current().is_ok() {
            log::trace!("parsing command on the current tokio runtime");
            tokio::task::block_in_place(|| tree.route(ctx, cursor, has_permission))
        } else {
            tree.route(ctx, cursor, has_permission)
        }
    }

    fn handle(&self, command: &Command<S>, ctx: &mut CommandContext<S>) -> Result<(), ExecutionError> {
        let run = || {
            command
                .execute(ctx)
                .map_err(|cause| ExecutionError::CommandExecution { cause })
        };
        if self.settings.handle_asynchronously && tokio::runtime::Handle::try_current().is_ok() {
            log::trace!("executing command handler on the current tokio runtime");
            tokio::task::block_in_place(run)
        } else {
            run()
        }
    }
}

/// The façade a host registers commands with and dispatches input
/// through.
pub struct CommandManager<S> {
    tree: RwLock<CommandTree<S>>,
    coordinator: Box<dyn Coordinator<S>>,
    settings: CommandSettings,
    captions: RwLock<CaptionRegistry>,
    has_permission: Box<dyn Fn(&S, &str) -> bool + Send + Sync>,
    suggestions: SuggestionFactory<S>,
    registration_sink: Option<Box<dyn Fn(&Command<S>) + Send + Sync>>,
}

impl<S> CommandManager<S> {
    /// Build a manager with `coordinator` driving execution and
    /// `has_permission` as the sender's permission predicate.
    #[must_use]
    pub fn new(
        coordinator: Box<dyn Coordinator<S>>,
        has_permission: Box<dyn Fn(&S, &str) -> bool + Send + Sync>,
    ) -> Self {
        let settings = CommandSettings::default();
        CommandManager {
            tree: RwLock::new(CommandTree::new(settings.allow_unknown_root, settings.override_existing_commands)),
            coordinator,
            settings,
            captions: RwLock::new(CaptionRegistry::new()),
            has_permission,
            suggestions: SuggestionFactory::new(),
            registration_sink: None,
        }
    }

    /// Install a callback invoked once per successful registration, so a
    /// host can mirror the literal into a platform-native dispatcher.
    pub fn set_registration_sink(&mut self, sink: Box<dyn Fn(&Command<S>) + Send + Sync>) {
        self.registration_sink = Some(sink);
    }

    /// Replace the active settings, updating the tree's routing flags in
    /// place.
    ///
    /// This only affects future registrations/routing — commands already
    /// in the tree are untouched and stay registered.
    pub fn set_settings(&mut self, settings: CommandSettings) {
        self.settings = settings;
        let mut tree = self.tree.write();
        tree.set_allow_unknown_root(settings.allow_unknown_root);
        tree.set_override_existing(settings.override_existing_commands);
    }

    /// The active settings.
    #[must_use]
    pub fn settings(&self) -> CommandSettings {
        self.settings
    }

    /// Start building a new command rooted at `name`.
    #[must_use]
    pub fn command(&self, name: &'static str) -> CommandBuilder<S> {
        CommandBuilder::literal(name)
    }

    /// Register a fully-built command.
    ///
    /// # Errors
    ///
    /// See [`CommandTree::insert`].
    pub fn register(&self, command: Command<S>) -> Result<(), RegistrationError> {
        if let Some(sink) = &self.registration_sink {
            sink(&command);
        }
        self.tree.write().insert(command)
    }

    /// Whether `sender` satisfies `permission`.
    #[must_use]
    pub fn has_permission(&self, sender: &S, permission: &str) -> bool {
        (self.has_permission)(sender, permission)
    }

    /// Read/write access to the caption registry.
    #[must_use]
    pub fn caption_registry(&self) -> &RwLock<CaptionRegistry> {
        &self.captions
    }

    /// Execute `raw_input` on behalf of `sender`.
    ///
    /// Dispatch pipeline (spec §4.6): route the input through the tree
    /// (enforcing component- and flag-level permissions along the way),
    /// check the sender against the resolved command's sender-type bound
    /// and whole-command permission, run its preprocessors, then invoke
    /// its handler.
    ///
    /// # Errors
    ///
    /// See [`crate::error::ExecutionError`].
    pub fn execute(&self, sender: S, raw_input: impl Into<String>) -> Result<(), ExecutionError> {
        let raw_input = raw_input.into();
        let mut ctx = CommandContext::new(sender, raw_input.clone());
        ctx.set_liberal_flag_parsing(self.settings.liberal_flag_parsing);
        let mut cursor = CommandInputCursor::new(&raw_input);
        let tree = self.tree.read();
        let command = self.coordinator.parse(&tree, &mut ctx, &mut cursor, self.has_permission.as_ref())?;
        if let Some(bound) = &command.sender_bound {
            if !bound.is_satisfied_by(ctx.sender()) {
                return Err(ExecutionError::InvalidSender {
                    actual: command.sender_type_name,
                    expected: bound.expected(),
                });
            }
        }
        if let Some(permission) = &command.permission {
            if !self.has_permission(ctx.sender(), permission) {
                return Err(ExecutionError::NoPermission {
                    permission: permission.clone(),
                });
            }
        }
        for preprocessor in &command.preprocessors {
            preprocessor(&mut ctx, &cursor).map_err(|cause| ExecutionError::ArgumentParse {
                cause,
                offending_input: cursor.remaining_input().to_string(),
                parser_id: "preprocessor",
            })?;
        }
        self.coordinator.handle(&command, &mut ctx)
    }

    /// Execute `raw_input`, running the parse/handle phases through
    /// [`Coordinator`] as an already-completed future — useful for hosts
    /// that want one async call path regardless of which coordinator is
    /// installed.
    pub fn execute_async(&self, sender: S, raw_input: impl Into<String>) -> CoordinatorFuture<Result<(), ExecutionError>>
    where
        S: Send + 'static,
    {
        let result = self.execute(sender, raw_input);
        async move { result }.boxed()
    }

    /// Compute suggestions for `partial_input` on behalf of `sender`.
    #[must_use]
    pub fn suggest(&self, sender: S, partial_input: impl Into<String>) -> Vec<Suggestion> {
        let partial_input = partial_input.into();
        let mut ctx = CommandContext::new_for_suggestions(sender, partial_input.clone());
        ctx.set_liberal_flag_parsing(self.settings.liberal_flag_parsing);
        let mut cursor = CommandInputCursor::new(&partial_input);
        let tree = self.tree.read();
        self.suggestions.suggest(&tree, &mut ctx, &mut cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExecutionError;

    fn manager() -> CommandManager<()> {
        CommandManager::new(Box::new(SimpleCoordinator), Box::new(|_, _| true))
    }

    #[test]
    fn executes_a_registered_command() {
        let manager = manager();
        manager
            .register(manager.command("ping").build(|_: &mut CommandContext<()>| Ok::<(), std::convert::Infallible>(())))
            .unwrap();
        manager.execute((), "ping").unwrap();
    }

    #[test]
    fn rejects_missing_permission() {
        let manager = CommandManager::new(Box::new(SimpleCoordinator), Box::new(|_: &(), _: &str| false));
        manager
            .register(
                manager
                    .command("ping")
                    .permission("core.ping")
                    .build(|_: &mut CommandContext<()>| Ok::<(), std::convert::Infallible>(())),
            )
            .unwrap();
        let err = manager.execute((), "ping").unwrap_err();
        assert!(matches!(err, ExecutionError::NoPermission { .. }));
    }

    #[tokio::test]
    async fn async_execute_wraps_the_same_result() {
        let manager = manager();
        manager
            .register(manager.command("ping").build(|_: &mut CommandContext<()>| Ok::<(), std::convert::Infallible>(())))
            .unwrap();
        manager.execute_async((), "ping").await.unwrap();
    }
}
