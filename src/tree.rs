// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Command Tree
//!
//! An n-ary prefix trie of [`Component`]s. Insertion detects ambiguous
//! siblings at registration time; routing walks the tree literal-first,
//! then variables in registration order, the way the teacher's
//! `CommandTable`/`Parser` pair walked its node graph — but over the
//! closed [`Component`] enum instead of the teacher's `Node` trait
//! objects, and behind `parking_lot::RwLock` rather than `RefCell`, so a
//! `CommandTree` can be shared across the threads an `AsyncCoordinator`
//! dispatches onto.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::component::{Command, Component, DefaultValue};
use crate::context::CommandContext;
use crate::cursor::CommandInputCursor;
use crate::error::{ExecutionError, RegistrationError};
use crate::parser::ErasedParser;

/// One node of the tree: the component that must match to reach it, its
/// children, and (for a terminal node) the command it completes.
pub struct CommandNode<S> {
    component: Option<Component<S>>,
    children: Vec<Arc<RwLock<CommandNode<S>>>>,
    terminal: Option<Arc<Command<S>>>,
    permissions_by_sender_type: HashMap<TypeId, String>,
    parent: Option<Weak<RwLock<CommandNode<S>>>>,
}

impl<S> CommandNode<S> {
    fn root() -> Arc<RwLock<Self>> {
        Arc::new(RwLock::new(CommandNode {
            component: None,
            children: Vec::new(),
            terminal: None,
            permissions_by_sender_type: HashMap::new(),
            parent: None,
        }))
    }

    fn child_for(node: &Arc<RwLock<Self>>, component: Component<S>) -> Arc<RwLock<Self>> {
        Arc::new(RwLock::new(CommandNode {
            component: Some(component),
            children: Vec::new(),
            terminal: None,
            permissions_by_sender_type: HashMap::new(),
            parent: Some(Arc::downgrade(node)),
        }))
    }

    /// The component guarding entry to this node, if any (`None` only
    /// for the root).
    #[must_use]
    pub fn component(&self) -> Option<&Component<S>> {
        self.component.as_ref()
    }

    /// This node's children, literals first (sorted by name), then
    /// variables in registration order.
    #[must_use]
    pub fn children(&self) -> &[Arc<RwLock<CommandNode<S>>>] {
        &self.children
    }

    /// The command completed at this node, if it's terminal.
    #[must_use]
    pub fn terminal(&self) -> Option<&Arc<Command<S>>> {
        self.terminal.as_ref()
    }

    /// This node's parent, if it isn't the root.
    #[must_use]
    pub fn parent(&self) -> Option<Arc<RwLock<CommandNode<S>>>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// The permission [`CommandTree::insert`] propagated to this node for
    /// sender type `type_id`, if any terminal command beneath it declared
    /// one (spec §4.5 step 4). Consulted by help/introspection hosts
    /// deciding whether a subtree is worth descending into; routing
    /// itself never reads this.
    #[must_use]
    pub fn permission_for_sender_type(&self, type_id: TypeId) -> Option<&str> {
        self.permissions_by_sender_type.get(&type_id).map(String::as_str)
    }
}

fn literal_names<S>(component: &Component<S>) -> Vec<&'static str> {
    match component {
        Component::Literal { name, aliases, .. } => {
            let mut names = vec![*name];
            names.extend(aliases.iter().copied());
            names
        }
        _ => Vec::new(),
    }
}

fn components_ambiguous<S>(a: &Component<S>, b: &Component<S>) -> bool {
    match (a, b) {
        (Component::Literal { .. }, Component::Literal { .. }) => {
            let a_names = literal_names(a);
            let b_names = literal_names(b);
            a_names.iter().any(|n| b_names.contains(n))
        }
        (Component::Literal { .. }, _) | (_, Component::Literal { .. }) => false,
        // Two variable children of the same concrete parser kind are
        // presumed to have overlapping domains (no static means in this
        // crate to prove otherwise); different kinds are presumed
        // disjoint, per the ambiguity approximation in the design notes.
        _ => parser_kind(a) == parser_kind(b) && parser_kind(a).is_some(),
    }
}

fn parser_kind<S>(component: &Component<S>) -> Option<&'static str> {
    match component {
        Component::Required { parser, .. } | Component::Optional { parser, .. } => Some(parser.id()),
        Component::Literal { .. } | Component::Flags { .. } => None,
    }
}

/// The tree of every registered command.
pub struct CommandTree<S> {
    root: Arc<RwLock<CommandNode<S>>>,
    allow_unknown_root: bool,
    override_existing: bool,
}

impl<S> CommandTree<S> {
    /// An empty tree.
    #[must_use]
    pub fn new(allow_unknown_root: bool, override_existing: bool) -> Self {
        CommandTree {
            root: CommandNode::root(),
            allow_unknown_root,
            override_existing,
        }
    }

    /// The root node.
    #[must_use]
    pub fn root(&self) -> &Arc<RwLock<CommandNode<S>>> {
        &self.root
    }

    /// Update whether an unmatched root literal falls through instead of
    /// raising [`ExecutionError::NoSuchCommand`], without touching any
    /// registered command.
    pub fn set_allow_unknown_root(&mut self, allow_unknown_root: bool) {
        self.allow_unknown_root = allow_unknown_root;
    }

    /// Update whether registering over an already-terminal node replaces
    /// the existing command instead of failing, without touching any
    /// registered command.
    pub fn set_override_existing(&mut self, override_existing: bool) {
        self.override_existing = override_existing;
    }

    /// Insert `command` into the tree.
    ///
    /// Five-step algorithm (spec §4.5): walk the path component by
    /// component, reusing an existing child when one is compatible with
    /// the incoming component, creating a new child otherwise, rejecting
    /// ambiguous siblings along the way, and finally attaching the
    /// terminal command (rejecting a collision unless
    /// `OVERRIDE_EXISTING_COMMANDS` is set).
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::Ambiguous`] when a new child would be
    /// indistinguishable from an existing sibling, or
    /// [`RegistrationError::OverlappingCommand`] when a command is
    /// already terminal at the insertion point and overriding is
    /// disabled.
    pub fn insert(&mut self, command: Command<S>) -> Result<(), RegistrationError>
    where
        S: 'static,
    {
        let mut cursor = Arc::clone(&self.root);
        for component in command.path.into_iter() {
            // Only literal components can be reused across registrations
            // (that's what lets "test int <n>" and "test foo bar" share a
            // single "test" node). A variable component is never reused:
            // two `required`/`optional` siblings at the same position are
            // either ambiguous (rejected below) or genuinely distinct
            // arguments that must route independently.
            let existing = {
                let node = cursor.read();
                node.children.iter().find_map(|child| {
                    let matches = {
                        let child_ref = child.read();
                        match (child_ref.component.as_ref(), &component) {
                            (Some(Component::Literal { name: a, aliases: aa, .. }), Component::Literal { name: b, aliases: ab, .. }) => {
                                a == b || aa.contains(b) || ab.contains(a)
                            }
                            _ => false,
                        }
                    };
                    matches.then(|| Arc::clone(child))
                })
            };
            if let Some(existing) = existing {
                cursor = existing;
                continue;
            }
            for sibling in &cursor.read().children {
                let sibling_ref = sibling.read();
                if let Some(sibling_component) = sibling_ref.component.as_ref() {
                    if components_ambiguous(sibling_component, &component) {
                        return Err(RegistrationError::Ambiguous {
                            parent: sibling_component.name().to_string(),
                            offending: component.name().to_string(),
                            siblings: cursor
                                .read()
                                .children
                                .iter()
                                .filter_map(|c| c.read().component.as_ref().map(|c| c.name().to_string()))
                                .collect(),
                        });
                    }
                }
            }
            let is_literal = component.is_literal();
            let new_node = CommandNode::child_for(&cursor, component);
            {
                let mut parent = cursor.write();
                if is_literal {
                    let insert_at = parent
                        .children
                        .iter()
                        .position(|c| !c.read().component.as_ref().is_some_and(Component::is_literal))
                        .unwrap_or(parent.children.len());
                    parent.children.insert(insert_at, Arc::clone(&new_node));
                } else {
                    parent.children.push(Arc::clone(&new_node));
                }
            }
            cursor = new_node;
        }
        let already_terminal = cursor.read().terminal.is_some();
        if already_terminal && !self.override_existing {
            let existing = cursor
                .read()
                .terminal
                .as_ref()
                .map(|c| c.sender_type_name.to_string())
                .unwrap_or_default();
            return Err(RegistrationError::OverlappingCommand { existing });
        }
        let permission = command.permission.clone();
        cursor.write().terminal = Some(Arc::new(command));
        // Step 4 (spec §4.5): a whole-command permission is visible to
        // every ancestor node, keyed by sender type, so a host can prune
        // a subtree the sender couldn't reach anything useful in without
        // walking all the way down to the terminal.
        if let Some(permission) = permission {
            let type_id = TypeId::of::<S>();
            let mut ancestor = cursor.read().parent();
            while let Some(node) = ancestor {
                node.write().permissions_by_sender_type.insert(type_id, permission.clone());
                ancestor = node.read().parent();
            }
        }
        Ok(())
    }

    /// Route `cursor`'s input through the tree, resolving a terminal
    /// command and leaving `ctx` populated with every parsed value along
    /// the path.
    ///
    /// Three-step algorithm (spec §4.5): at each node, try literal
    /// children first (sorted by name), then variable children in
    /// registration order; a parser failure on a variable child is not
    /// fatal until every candidate at that node has failed. Once a child
    /// matches, if it bears a permission and the cursor wasn't already
    /// empty at the start of that descent step, `has_permission` must
    /// accept it or routing fails outright.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::NoSuchCommand`] if no child matches at
    /// the root and `ALLOW_UNKNOWN_ROOT` is unset,
    /// [`ExecutionError::InvalidSyntax`] if the path is exhausted with
    /// cursor input still remaining or vice versa,
    /// [`ExecutionError::NoPermission`] if a matched component's own
    /// permission rejects the sender, or [`ExecutionError::ArgumentParse`]
    /// if every candidate parser at some node fails.
    pub fn route(
        &self,
        ctx: &mut CommandContext<S>,
        cursor: &mut CommandInputCursor<'_>,
        has_permission: &dyn Fn(&S, &str) -> bool,
    ) -> Result<Arc<Command<S>>, ExecutionError> {
        let mut node = Arc::clone(&self.root);
        loop {
            // An empty cursor only means "done" once nothing further can
            // match with no more input: an `Optional` still resolves its
            // default, and a `Flags` group still matches vacuously, so a
            // non-terminal node must still try `match_child` before this
            // is treated as a syntax error.
            if cursor.is_empty() {
                if let Some(terminal) = node.read().terminal.clone() {
                    return Ok(terminal);
                }
            }
            let next = self.match_child(&node, ctx, cursor, has_permission)?;
            match next {
                Some(child) => node = child,
                None => {
                    return if cursor.is_empty() {
                        Err(ExecutionError::InvalidSyntax {
                            expected_syntax: describe_children(&node),
                            cursor_remainder: String::new(),
                        })
                    } else {
                        Err(ExecutionError::NoSuchCommand {
                            input: cursor.remaining_input().to_string(),
                        })
                    };
                }
            }
        }
    }

    fn match_child(
        &self,
        node: &Arc<RwLock<CommandNode<S>>>,
        ctx: &mut CommandContext<S>,
        cursor: &mut CommandInputCursor<'_>,
        has_permission: &dyn Fn(&S, &str) -> bool,
    ) -> Result<Option<Arc<RwLock<CommandNode<S>>>>, ExecutionError> {
        // Captured before any token is consumed at this step: a descent
        // that matches with no remaining input (the tail-end `Optional`/
        // `Flags` matches route()'s empty-cursor handling allows) is
        // exempt from the permission gate (spec §4.5: "only when the
        // cursor is non-empty").
        let gate_permission = !cursor.is_empty();
        let children: Vec<_> = node.read().children.iter().cloned().collect();
        let checkpoint = cursor.checkpoint();
        for child in &children {
            let component_is_literal = child.read().component.as_ref().is_some_and(Component::is_literal);
            if !component_is_literal {
                continue;
            }
            if self.try_match_literal(child, cursor) {
                check_descent_permission(child, ctx.sender(), has_permission, gate_permission)?;
                return Ok(Some(Arc::clone(child)));
            }
            cursor.restore(checkpoint);
        }
        for child in &children {
            let component_is_literal = child.read().component.as_ref().is_some_and(Component::is_literal);
            if component_is_literal {
                continue;
            }
            if self.try_match_variable(child, ctx, cursor, has_permission)? {
                check_descent_permission(child, ctx.sender(), has_permission, gate_permission)?;
                return Ok(Some(Arc::clone(child)));
            }
            cursor.restore(checkpoint);
        }
        Ok(None)
    }

    fn try_match_literal(&self, child: &Arc<RwLock<CommandNode<S>>>, cursor: &mut CommandInputCursor<'_>) -> bool {
        let Some(token) = cursor.peek_string() else {
            return false;
        };
        let matches = {
            let node = child.read();
            match node.component.as_ref() {
                Some(Component::Literal { name, aliases, .. }) => *name == token || aliases.contains(&token),
                _ => false,
            }
        };
        if matches {
            let _ = cursor.read_string();
        }
        matches
    }

    fn try_match_variable(
        &self,
        child: &Arc<RwLock<CommandNode<S>>>,
        ctx: &mut CommandContext<S>,
        cursor: &mut CommandInputCursor<'_>,
        has_permission: &dyn Fn(&S, &str) -> bool,
    ) -> Result<bool, ExecutionError> {
        let (name, parser) = {
            let node = child.read();
            match node.component.as_ref() {
                Some(Component::Required { name, parser, .. }) => {
                    if cursor.is_empty() {
                        return Ok(false);
                    }
                    (*name, Arc::clone(parser))
                }
                Some(Component::Optional { name, parser, default, .. }) => {
                    if cursor.is_empty() {
                        if let Some(default) = resolve_default(default, parser, ctx)? {
                            ctx.insert_erased(name, default);
                        }
                        return Ok(true);
                    }
                    (*name, Arc::clone(parser))
                }
                Some(Component::Flags { group, .. }) => {
                    group.parse(ctx, cursor, has_permission)?;
                    return Ok(true);
                }
                _ => return Ok(false),
            }
        };
        match parser.parse_erased(ctx, cursor) {
            Ok(value) => {
                ctx.insert_erased(name, Arc::from(value));
                Ok(true)
            }
            Err(cause) => {
                if ctx.is_suggestion() {
                    return Ok(false);
                }
                let offending_input = cursor.peek_string().unwrap_or("").to_string();
                Err(ExecutionError::ArgumentParse {
                    cause,
                    offending_input,
                    parser_id: parser.id(),
                })
            }
        }
    }
}

/// Component-level permission gating (spec §4.5): if `gate` is set and
/// `child` bears a permission, `has_permission` must accept it or the
/// whole route fails, the same [`ExecutionError::NoPermission`] a
/// whole-command permission failure raises.
fn check_descent_permission<S>(
    child: &Arc<RwLock<CommandNode<S>>>,
    sender: &S,
    has_permission: &dyn Fn(&S, &str) -> bool,
    gate: bool,
) -> Result<(), ExecutionError> {
    if !gate {
        return Ok(());
    }
    let permission = child.read().component.as_ref().and_then(|c| c.meta().permission.clone());
    if let Some(permission) = permission {
        if !has_permission(sender, &permission) {
            return Err(ExecutionError::NoPermission { permission });
        }
    }
    Ok(())
}

fn resolve_default<S>(
    default: &DefaultValue<S>,
    parser: &Arc<dyn ErasedParser<S>>,
    ctx: &mut CommandContext<S>,
) -> Result<Option<Arc<dyn std::any::Any + Send + Sync>>, ExecutionError> {
    match default {
        DefaultValue::Constant(value) => Ok(Some(Arc::clone(value))),
        DefaultValue::Dynamic(f) => f(ctx).map(Some).map_err(|cause| ExecutionError::ArgumentParse {
            cause,
            offending_input: String::new(),
            parser_id: "default.dynamic",
        }),
        DefaultValue::Parsed(literal) => {
            // Re-parse the stored literal through the component's own
            // parser over a throwaway cursor, so a parsed default shares
            // the same validation path as real user input (spec §4.3).
            let mut default_cursor = CommandInputCursor::new(literal);
            parser
                .parse_erased(ctx, &mut default_cursor)
                .map(|value| Some(Arc::from(value)))
                .map_err(|cause| ExecutionError::ArgumentParse {
                    cause,
                    offending_input: literal.clone(),
                    parser_id: parser.id(),
                })
        }
    }
}

fn describe_component<S>(component: &Component<S>) -> String {
    match component {
        Component::Literal { name, .. } => (*name).to_string(),
        Component::Required { name, .. } => format!("<{name}>"),
        Component::Optional { name, .. } => format!("[{name}]"),
        Component::Flags { .. } => "--flags".to_string(),
    }
}

/// The literal/variable path from the root down to `node`, e.g. `["test"]`.
fn path_to_node<S>(node: &Arc<RwLock<CommandNode<S>>>) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = Some(Arc::clone(node));
    while let Some(n) = current {
        let n_ref = n.read();
        if let Some(component) = n_ref.component.as_ref() {
            parts.push(describe_component(component));
        }
        current = n_ref.parent();
    }
    parts.reverse();
    parts
}

/// The expected syntax at `node`: the path taken to reach it, followed by
/// its possible next components (e.g. `"test <s>"`).
fn describe_children<S>(node: &Arc<RwLock<CommandNode<S>>>) -> String {
    let mut parts = path_to_node(node);
    let child_descriptions: Vec<String> = node
        .read()
        .children
        .iter()
        .filter_map(|c| c.read().component.as_ref().map(describe_component))
        .collect();
    if !child_descriptions.is_empty() {
        parts.push(child_descriptions.join(" | "));
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::CommandBuilder;

    #[test]
    fn routes_a_plain_literal_command() {
        let mut tree: CommandTree<()> = CommandTree::new(false, false);
        let command = CommandBuilder::<()>::literal("ping").build(|_: &mut CommandContext<()>| Ok::<(), std::convert::Infallible>(()));
        tree.insert(command).unwrap();

        let mut ctx = CommandContext::new((), "ping".to_string());
        let mut cursor = CommandInputCursor::new("ping");
        let resolved = tree.route(&mut ctx, &mut cursor, &|_, _| true).unwrap();
        assert_eq!(resolved.path.len(), 1);
    }

    #[test]
    fn unknown_root_literal_is_no_such_command() {
        let mut tree: CommandTree<()> = CommandTree::new(false, false);
        let command = CommandBuilder::<()>::literal("ping").build(|_: &mut CommandContext<()>| Ok::<(), std::convert::Infallible>(()));
        tree.insert(command).unwrap();

        let mut ctx = CommandContext::new((), "pong".to_string());
        let mut cursor = CommandInputCursor::new("pong");
        let err = tree.route(&mut ctx, &mut cursor, &|_, _| true).unwrap_err();
        assert!(matches!(err, ExecutionError::NoSuchCommand { .. }));
    }

    #[test]
    fn duplicate_literal_registration_is_rejected_without_override() {
        let mut tree: CommandTree<()> = CommandTree::new(false, false);
        let first = CommandBuilder::<()>::literal("ping").build(|_: &mut CommandContext<()>| Ok::<(), std::convert::Infallible>(()));
        let second = CommandBuilder::<()>::literal("ping").build(|_: &mut CommandContext<()>| Ok::<(), std::convert::Infallible>(()));
        tree.insert(first).unwrap();
        let err = tree.insert(second).unwrap_err();
        assert!(matches!(err, RegistrationError::OverlappingCommand { .. }));
    }
}
