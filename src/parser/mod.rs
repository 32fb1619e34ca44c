// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Parser Contract & Combinators
//!
//! [`ArgumentParser`] is the typed contract every argument, flag value,
//! and component ultimately bottoms out in. It's generic over its own
//! output type so host code gets real Rust types out of a parse; the
//! [`ErasedParser`] wrapper (object-safe, implemented for every
//! `ArgumentParser` via a blanket impl) is what the homogeneous
//! [`crate::tree::CommandNode`] actually stores, since a tree node can't
//! be generic over every leaf's output type at once.
//!
//! A parser must never consume cursor state on failure: [`first_of`]
//! relies on this to try a fallback after a primary parser fails.

pub mod standard;

use std::any::{Any, TypeId};
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;

use crate::context::CommandContext;
use crate::cursor::CommandInputCursor;
use crate::error::{ArgumentParseError, ParserId};

/// The result of a single parser invocation.
pub type ArgumentParseResult<T> = Result<T, ArgumentParseError>;

/// A boxed future of a parse outcome, returned by
/// [`ArgumentParser::parse_future`].
pub type ParserFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// A typed argument parser, generic over the sender type `S` (so a
/// parser can consult sender identity, e.g. for permission-scoped enum
/// variants) and producing a concrete `Output` type.
pub trait ArgumentParser<S>: Send + Sync {
    /// The Rust type this parser produces on success.
    type Output: Any + Send + Sync;

    /// A stable identifier for this parser, used to attribute failures
    /// and captions (spec §5).
    fn id(&self) -> ParserId;

    /// Consume input from `cursor`, producing `Output` or leaving the
    /// cursor untouched and returning an error.
    fn parse<'i>(
        &self,
        ctx: &mut CommandContext<S>,
        cursor: &mut CommandInputCursor<'i>,
    ) -> ArgumentParseResult<Self::Output>;

    /// The asynchronous face of [`ArgumentParser::parse`]: every built-in
    /// parser in this crate is synchronous, so the default just runs
    /// `parse` and wraps the outcome as an already-completed future, the
    /// same "run now, wrap after" shape
    /// [`crate::dispatcher::CommandManager::execute_async`] uses.
    /// [`map_success_future`](Self::map_success_future) and
    /// [`flat_map_success`](Self::flat_map_success) inherit this default
    /// too — their own future runs inline via `block_on` inside the
    /// synchronous `parse` this wraps, rather than being polled directly,
    /// since neither combinator's borrowed `ctx`/`cursor` can outlive a
    /// non-`'static` boxed future.
    fn parse_future<'i>(
        &self,
        ctx: &mut CommandContext<S>,
        cursor: &mut CommandInputCursor<'i>,
    ) -> ParserFuture<ArgumentParseResult<Self::Output>> {
        let result = self.parse(ctx, cursor);
        Box::pin(std::future::ready(result))
    }

    /// Candidate completions for the partial token at the cursor. The
    /// default is "no suggestions"; most standard parsers override this.
    fn suggest(&self, ctx: &CommandContext<S>, cursor: &CommandInputCursor<'_>) -> Vec<String> {
        let _ = (ctx, cursor);
        Vec::new()
    }

    /// Transform this parser's output with a pure function.
    fn map<U, F>(self, f: F) -> Map<Self, F, U>
    where
        Self: Sized,
        U: Any + Send + Sync,
        F: Fn(Self::Output) -> U + Send + Sync,
    {
        Map {
            inner: self,
            f,
            _marker: PhantomData,
        }
    }

    /// Transform this parser's output into another `ArgumentParseResult`,
    /// allowing a successful parse to be rejected after the fact (e.g.
    /// range checks that depend on more than one component).
    fn flat_map<U, F>(self, f: F) -> FlatMap<Self, F, U>
    where
        Self: Sized,
        U: Any + Send + Sync,
        F: Fn(Self::Output) -> ArgumentParseResult<U> + Send + Sync,
    {
        FlatMap {
            inner: self,
            f,
            _marker: PhantomData,
        }
    }

    /// Transform this parser's output through an async function that
    /// cannot fail — the asynchronous counterpart to
    /// [`ArgumentParser::map`]. The combinator's synchronous `parse`
    /// blocks on the future via `futures::executor::block_on`; it inherits
    /// the default [`parse_future`](ArgumentParser::parse_future) rather
    /// than polling the future directly, so a caller driving it through
    /// `parse_future` still blocks a thread on `f` under the hood.
    fn map_success_future<Fut, U, F>(self, f: F) -> MapSuccessFuture<Self, F, U>
    where
        Self: Sized,
        Fut: Future<Output = U> + Send,
        U: Any + Send + Sync,
        F: Fn(Self::Output) -> Fut + Send + Sync,
    {
        MapSuccessFuture {
            inner: self,
            f,
            _marker: PhantomData,
        }
    }

    /// Transform this parser's output through an async function that can
    /// still reject the value — the asynchronous counterpart to
    /// [`ArgumentParser::flat_map`].
    fn flat_map_success<Fut, U, F>(self, f: F) -> FlatMapSuccessFuture<Self, F, U>
    where
        Self: Sized,
        Fut: Future<Output = ArgumentParseResult<U>> + Send,
        U: Any + Send + Sync,
        F: Fn(Self::Output) -> Fut + Send + Sync,
    {
        FlatMapSuccessFuture {
            inner: self,
            f,
            _marker: PhantomData,
        }
    }
}

/// See [`ArgumentParser::map`].
pub struct Map<P, F, U> {
    inner: P,
    f: F,
    _marker: PhantomData<fn() -> U>,
}

impl<S, P, F, U> ArgumentParser<S> for Map<P, F, U>
where
    P: ArgumentParser<S>,
    F: Fn(P::Output) -> U + Send + Sync,
    U: Any + Send + Sync,
{
    type Output = U;

    fn id(&self) -> ParserId {
        self.inner.id()
    }

    fn parse<'i>(
        &self,
        ctx: &mut CommandContext<S>,
        cursor: &mut CommandInputCursor<'i>,
    ) -> ArgumentParseResult<Self::Output> {
        self.inner.parse(ctx, cursor).map(&self.f)
    }

    fn suggest(&self, ctx: &CommandContext<S>, cursor: &CommandInputCursor<'_>) -> Vec<String> {
        self.inner.suggest(ctx, cursor)
    }
}

/// See [`ArgumentParser::flat_map`].
pub struct FlatMap<P, F, U> {
    inner: P,
    f: F,
    _marker: PhantomData<fn() -> U>,
}

impl<S, P, F, U> ArgumentParser<S> for FlatMap<P, F, U>
where
    P: ArgumentParser<S>,
    F: Fn(P::Output) -> ArgumentParseResult<U> + Send + Sync,
    U: Any + Send + Sync,
{
    type Output = U;

    fn id(&self) -> ParserId {
        self.inner.id()
    }

    fn parse<'i>(
        &self,
        ctx: &mut CommandContext<S>,
        cursor: &mut CommandInputCursor<'i>,
    ) -> ArgumentParseResult<Self::Output> {
        let checkpoint = cursor.checkpoint();
        match self.inner.parse(ctx, cursor) {
            Ok(value) => (self.f)(value).map_err(|e| {
                cursor.restore(checkpoint);
                e
            }),
            Err(e) => Err(e),
        }
    }

    fn suggest(&self, ctx: &CommandContext<S>, cursor: &CommandInputCursor<'_>) -> Vec<String> {
        self.inner.suggest(ctx, cursor)
    }
}

/// See [`ArgumentParser::map_success_future`].
pub struct MapSuccessFuture<P, F, U> {
    inner: P,
    f: F,
    _marker: PhantomData<fn() -> U>,
}

impl<S, P, Fut, F, U> ArgumentParser<S> for MapSuccessFuture<P, F, U>
where
    P: ArgumentParser<S>,
    Fut: Future<Output = U> + Send,
    F: Fn(P::Output) -> Fut + Send + Sync,
    U: Any + Send + Sync,
{
    type Output = U;

    fn id(&self) -> ParserId {
        self.inner.id()
    }

    fn parse<'i>(
        &self,
        ctx: &mut CommandContext<S>,
        cursor: &mut CommandInputCursor<'i>,
    ) -> ArgumentParseResult<Self::Output> {
        let value = self.inner.parse(ctx, cursor)?;
        Ok(futures::executor::block_on((self.f)(value)))
    }

    fn suggest(&self, ctx: &CommandContext<S>, cursor: &CommandInputCursor<'_>) -> Vec<String> {
        self.inner.suggest(ctx, cursor)
    }
}

/// See [`ArgumentParser::flat_map_success`].
pub struct FlatMapSuccessFuture<P, F, U> {
    inner: P,
    f: F,
    _marker: PhantomData<fn() -> U>,
}

impl<S, P, Fut, F, U> ArgumentParser<S> for FlatMapSuccessFuture<P, F, U>
where
    P: ArgumentParser<S>,
    Fut: Future<Output = ArgumentParseResult<U>> + Send,
    F: Fn(P::Output) -> Fut + Send + Sync,
    U: Any + Send + Sync,
{
    type Output = U;

    fn id(&self) -> ParserId {
        self.inner.id()
    }

    fn parse<'i>(
        &self,
        ctx: &mut CommandContext<S>,
        cursor: &mut CommandInputCursor<'i>,
    ) -> ArgumentParseResult<Self::Output> {
        let checkpoint = cursor.checkpoint();
        let value = self.inner.parse(ctx, cursor)?;
        futures::executor::block_on((self.f)(value)).map_err(|e| {
            cursor.restore(checkpoint);
            e
        })
    }

    fn suggest(&self, ctx: &CommandContext<S>, cursor: &CommandInputCursor<'_>) -> Vec<String> {
        self.inner.suggest(ctx, cursor)
    }
}

/// Try `primary`; on failure (with the cursor left untouched), try
/// `fallback` from the same position. If both fail, the error reports
/// both causes so a host can explain the mismatch precisely (spec §5:
/// "first_of never simply forgets the primary failure").
pub struct FirstOf<L, R> {
    primary: L,
    fallback: R,
}

/// Build a [`FirstOf`] combinator out of two parsers with the same output type.
pub fn first_of<L, R>(primary: L, fallback: R) -> FirstOf<L, R> {
    FirstOf { primary, fallback }
}

impl<S, L, R, T> ArgumentParser<S> for FirstOf<L, R>
where
    L: ArgumentParser<S, Output = T>,
    R: ArgumentParser<S, Output = T>,
    T: Any + Send + Sync,
{
    type Output = T;

    fn id(&self) -> ParserId {
        self.primary.id()
    }

    fn parse<'i>(
        &self,
        ctx: &mut CommandContext<S>,
        cursor: &mut CommandInputCursor<'i>,
    ) -> ArgumentParseResult<Self::Output> {
        let checkpoint = cursor.checkpoint();
        match self.primary.parse(ctx, cursor) {
            Ok(value) => Ok(value),
            Err(primary_cause) => {
                cursor.restore(checkpoint);
                match self.fallback.parse(ctx, cursor) {
                    Ok(value) => Ok(value),
                    Err(fallback_cause) => {
                        cursor.restore(checkpoint);
                        let offending_input = cursor
                            .peek_string()
                            .unwrap_or_else(|| cursor.remaining_input())
                            .to_string();
                        Err(ArgumentParseError::Aggregate {
                            offending_input,
                            primary_id: self.primary.id(),
                            fallback_id: self.fallback.id(),
                            primary_cause: Box::new(primary_cause),
                            fallback_cause: Box::new(fallback_cause),
                        })
                    }
                }
            }
        }
    }

    fn suggest(&self, ctx: &CommandContext<S>, cursor: &CommandInputCursor<'_>) -> Vec<String> {
        let mut suggestions = self.primary.suggest(ctx, cursor);
        suggestions.extend(self.fallback.suggest(ctx, cursor));
        suggestions
    }
}

/// The object-safe form of [`ArgumentParser`], used wherever the concrete
/// `Output` type can't appear (notably [`crate::tree::CommandNode`] and
/// [`crate::flag::Flag`], both of which must store parsers of differing
/// output types side by side). Implemented for every `ArgumentParser` via
/// the blanket impl below; host code should essentially never implement
/// this trait directly.
pub trait ErasedParser<S>: Send + Sync {
    /// Parse and box the result as `Box<dyn Any>`, erasing `Output`.
    fn parse_erased(
        &self,
        ctx: &mut CommandContext<S>,
        cursor: &mut CommandInputCursor<'_>,
    ) -> ArgumentParseResult<Box<dyn Any + Send + Sync>>;

    /// The `TypeId` of the concrete `Output` type, used by the context
    /// store to validate a later typed `get::<T>`.
    fn output_type_id(&self) -> TypeId;

    /// See [`ArgumentParser::id`].
    fn id(&self) -> ParserId;

    /// See [`ArgumentParser::suggest`].
    fn suggest_erased(&self, ctx: &CommandContext<S>, cursor: &CommandInputCursor<'_>) -> Vec<String>;
}

impl<S, P> ErasedParser<S> for P
where
    P: ArgumentParser<S>,
{
    fn parse_erased(
        &self,
        ctx: &mut CommandContext<S>,
        cursor: &mut CommandInputCursor<'_>,
    ) -> ArgumentParseResult<Box<dyn Any + Send + Sync>> {
        self.parse(ctx, cursor)
            .map(|value| Box::new(value) as Box<dyn Any + Send + Sync>)
    }

    fn output_type_id(&self) -> TypeId {
        TypeId::of::<P::Output>()
    }

    fn id(&self) -> ParserId {
        ArgumentParser::id(self)
    }

    fn suggest_erased(&self, ctx: &CommandContext<S>, cursor: &CommandInputCursor<'_>) -> Vec<String> {
        self.suggest(ctx, cursor)
    }
}
