// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Suggestion Factory
//!
//! Drives the same tree-routing walk [`crate::dispatcher::CommandManager::execute`]
//! uses, but in suggestion mode: a failing parser at some node isn't
//! fatal, it's a cue to ask that node's component for candidate
//! completions of the remaining input.

use std::cmp::Ordering;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::component::Component;
use crate::context::CommandContext;
use crate::cursor::CommandInputCursor;
use crate::tree::{CommandNode, CommandTree};

/// One candidate completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    /// The text to offer the caller.
    pub text: String,
    /// An optional human-readable explanation, e.g. for a tooltip.
    pub tooltip: Option<String>,
}

impl Suggestion {
    /// A suggestion with no tooltip.
    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        Suggestion {
            text: text.into(),
            tooltip: None,
        }
    }
}

impl PartialOrd for Suggestion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Suggestion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.text.cmp(&other.text)
    }
}

/// A host-installable post-processing hook over the raw suggestion list,
/// e.g. to filter out suggestions the sender lacks permission for.
pub type SuggestionProcessor<S> = Box<dyn Fn(Vec<Suggestion>, &CommandContext<S>) -> Vec<Suggestion> + Send + Sync>;

/// Computes suggestions for a partially-written command.
pub struct SuggestionFactory<S> {
    processor: Option<SuggestionProcessor<S>>,
}

impl<S> Default for SuggestionFactory<S> {
    fn default() -> Self {
        SuggestionFactory { processor: None }
    }
}

impl<S> SuggestionFactory<S> {
    /// A factory with no post-processing hook installed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a post-processing hook, replacing any previous one.
    pub fn set_processor(&mut self, processor: SuggestionProcessor<S>) {
        self.processor = Some(processor);
    }

    /// Walk `tree` against `ctx`/`cursor` (already in suggestion mode)
    /// and return every candidate completion, stable-sorted by text.
    #[must_use]
    pub fn suggest(&self, tree: &CommandTree<S>, ctx: &mut CommandContext<S>, cursor: &mut CommandInputCursor<'_>) -> Vec<Suggestion> {
        let node = walk_to_frontier(tree, ctx, cursor);
        let partial = cursor.peek_string().unwrap_or("");
        let mut suggestions = collect_from_node(&node, ctx, cursor, partial);
        suggestions.sort();
        suggestions.dedup();
        match &self.processor {
            Some(processor) => processor(suggestions, ctx),
            None => suggestions,
        }
    }
}

fn walk_to_frontier<S>(
    tree: &CommandTree<S>,
    ctx: &mut CommandContext<S>,
    cursor: &mut CommandInputCursor<'_>,
) -> Arc<RwLock<CommandNode<S>>> {
    let mut node = Arc::clone(tree.root());
    loop {
        let Some(token) = cursor.peek_string() else {
            return node;
        };
        let children: Vec<_> = node.read().children().to_vec();
        let remaining_is_last_token = cursor.remaining_input().trim() == token;
        if remaining_is_last_token {
            return node;
        }
        let matched_literal = children.iter().find(|child| {
            matches!(
                child.read().component(),
                Some(Component::Literal { name, aliases, .. }) if *name == token || aliases.contains(&token)
            )
        });
        if let Some(child) = matched_literal {
            let _ = cursor.read_string();
            node = Arc::clone(child);
            continue;
        }
        let mut advanced = false;
        for child in &children {
            let is_variable = !child
                .read()
                .component()
                .is_some_and(Component::is_literal);
            if !is_variable {
                continue;
            }
            let checkpoint = cursor.checkpoint();
            let parsed = match child.read().component() {
                Some(Component::Required { parser, .. }) | Some(Component::Optional { parser, .. }) => {
                    parser.parse_erased(ctx, cursor).is_ok()
                }
                _ => false,
            };
            if parsed && !cursor.remaining_input().trim().is_empty() {
                node = Arc::clone(child);
                advanced = true;
                break;
            }
            cursor.restore(checkpoint);
        }
        if !advanced {
            return node;
        }
    }
}

fn collect_from_node<S>(
    node: &Arc<RwLock<CommandNode<S>>>,
    ctx: &CommandContext<S>,
    cursor: &CommandInputCursor<'_>,
    partial: &str,
) -> Vec<Suggestion> {
    node.read()
        .children()
        .iter()
        .flat_map(|child| match child.read().component() {
            Some(Component::Literal { name, aliases, .. }) => {
                let mut names = vec![*name];
                names.extend(aliases.iter().copied());
                names
                    .into_iter()
                    .filter(|candidate| candidate.starts_with(partial))
                    .map(Suggestion::plain)
                    .collect::<Vec<_>>()
            }
            Some(Component::Required { parser, .. }) | Some(Component::Optional { parser, .. }) => parser
                .suggest_erased(ctx, cursor)
                .into_iter()
                .filter(|candidate| candidate.starts_with(partial))
                .map(Suggestion::plain)
                .collect(),
            Some(Component::Flags { group, .. }) => group
                .flags()
                .iter()
                .map(|flag| format!("--{}", flag.name))
                .filter(|candidate| candidate.starts_with(partial))
                .map(Suggestion::plain)
                .collect(),
            None => Vec::new(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::CommandBuilder;

    #[test]
    fn suggests_literal_children_at_the_root() {
        let mut tree: CommandTree<()> = CommandTree::new(false, false);
        tree.insert(CommandBuilder::<()>::literal("give").build(|_: &mut CommandContext<()>| Ok::<(), std::convert::Infallible>(())))
            .unwrap();
        tree.insert(CommandBuilder::<()>::literal("gamemode").build(|_: &mut CommandContext<()>| Ok::<(), std::convert::Infallible>(())))
            .unwrap();

        let factory: SuggestionFactory<()> = SuggestionFactory::new();
        let mut ctx = CommandContext::new_for_suggestions((), "ga".to_string());
        let mut cursor = CommandInputCursor::new("ga");
        let suggestions = factory.suggest(&tree, &mut ctx, &mut cursor);
        assert_eq!(suggestions, vec![Suggestion::plain("gamemode")]);
    }
}
