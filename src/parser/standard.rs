// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Standard Parsers
//!
//! The built-in [`crate::parser::ArgumentParser`] implementations every
//! host gets for free: numbers, booleans, characters, the four string
//! modes, UUIDs, closed enums, regex-validated tokens, durations, and a
//! generic `either` combinator over two differently-typed parsers.

use std::any::Any;
use std::time::Duration;

use regex::Regex;
use uuid::Uuid;

use crate::context::CommandContext;
use crate::cursor::{CommandInputCursor, StringMode};
use crate::error::ArgumentParseError;
use crate::flag::FlagGroup;
use crate::parser::{ArgumentParseResult, ArgumentParser};

/// Parses a bounds-checked `i64`.
pub struct IntegerParser {
    min: i64,
    max: i64,
}

impl IntegerParser {
    /// A parser accepting any `i64` in `min..=max`.
    #[must_use]
    pub fn new(min: i64, max: i64) -> Self {
        IntegerParser { min, max }
    }
}

impl Default for IntegerParser {
    fn default() -> Self {
        IntegerParser::new(i64::MIN, i64::MAX)
    }
}

impl<S> ArgumentParser<S> for IntegerParser {
    type Output = i64;

    fn id(&self) -> &'static str {
        "integer"
    }

    fn parse<'i>(
        &self,
        _ctx: &mut CommandContext<S>,
        cursor: &mut CommandInputCursor<'i>,
    ) -> ArgumentParseResult<Self::Output> {
        let checkpoint = cursor.checkpoint();
        let token = cursor.read_single_string()?;
        match token.parse::<i64>() {
            Ok(value) if value >= self.min && value <= self.max => Ok(value),
            _ => {
                cursor.restore(checkpoint);
                Err(ArgumentParseError::NumberParse {
                    input: token.to_string(),
                    min: self.min.to_string(),
                    max: self.max.to_string(),
                    type_name: "integer",
                })
            }
        }
    }
}

/// Parses a bounds-checked `f32`.
pub struct FloatParser {
    min: f32,
    max: f32,
}

impl FloatParser {
    /// A parser accepting any `f32` in `min..=max`.
    #[must_use]
    pub fn new(min: f32, max: f32) -> Self {
        FloatParser { min, max }
    }
}

impl Default for FloatParser {
    fn default() -> Self {
        FloatParser::new(f32::MIN, f32::MAX)
    }
}

impl<S> ArgumentParser<S> for FloatParser {
    type Output = f32;

    fn id(&self) -> &'static str {
        "float"
    }

    fn parse<'i>(
        &self,
        _ctx: &mut CommandContext<S>,
        cursor: &mut CommandInputCursor<'i>,
    ) -> ArgumentParseResult<Self::Output> {
        let checkpoint = cursor.checkpoint();
        let token = cursor.read_single_string()?;
        match token.parse::<f32>() {
            Ok(value) if value >= self.min && value <= self.max => Ok(value),
            _ => {
                cursor.restore(checkpoint);
                Err(ArgumentParseError::NumberParse {
                    input: token.to_string(),
                    min: self.min.to_string(),
                    max: self.max.to_string(),
                    type_name: "float",
                })
            }
        }
    }
}

/// Parses a bounds-checked `f64`.
pub struct DoubleParser {
    min: f64,
    max: f64,
}

impl DoubleParser {
    /// A parser accepting any `f64` in `min..=max`.
    #[must_use]
    pub fn new(min: f64, max: f64) -> Self {
        DoubleParser { min, max }
    }
}

impl Default for DoubleParser {
    fn default() -> Self {
        DoubleParser::new(f64::MIN, f64::MAX)
    }
}

impl<S> ArgumentParser<S> for DoubleParser {
    type Output = f64;

    fn id(&self) -> &'static str {
        "double"
    }

    fn parse<'i>(
        &self,
        _ctx: &mut CommandContext<S>,
        cursor: &mut CommandInputCursor<'i>,
    ) -> ArgumentParseResult<Self::Output> {
        let checkpoint = cursor.checkpoint();
        let token = cursor.read_single_string()?;
        match token.parse::<f64>() {
            Ok(value) if value >= self.min && value <= self.max => Ok(value),
            _ => {
                cursor.restore(checkpoint);
                Err(ArgumentParseError::NumberParse {
                    input: token.to_string(),
                    min: self.min.to_string(),
                    max: self.max.to_string(),
                    type_name: "double",
                })
            }
        }
    }
}

/// Parses `true`/`false`, case-insensitive.
#[derive(Default)]
pub struct BooleanParser;

impl<S> ArgumentParser<S> for BooleanParser {
    type Output = bool;

    fn id(&self) -> &'static str {
        "boolean"
    }

    fn parse<'i>(
        &self,
        _ctx: &mut CommandContext<S>,
        cursor: &mut CommandInputCursor<'i>,
    ) -> ArgumentParseResult<Self::Output> {
        let checkpoint = cursor.checkpoint();
        let token = cursor.read_single_string()?;
        match token.to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => {
                cursor.restore(checkpoint);
                Err(ArgumentParseError::BooleanParse(token.to_string()))
            }
        }
    }

    fn suggest(&self, _ctx: &CommandContext<S>, _cursor: &CommandInputCursor<'_>) -> Vec<String> {
        vec!["true".to_string(), "false".to_string()]
    }
}

/// Parses exactly one `char`.
#[derive(Default)]
pub struct CharParser;

impl<S> ArgumentParser<S> for CharParser {
    type Output = char;

    fn id(&self) -> &'static str {
        "char"
    }

    fn parse<'i>(
        &self,
        _ctx: &mut CommandContext<S>,
        cursor: &mut CommandInputCursor<'i>,
    ) -> ArgumentParseResult<Self::Output> {
        let checkpoint = cursor.checkpoint();
        let token = cursor.read_single_string()?;
        let mut chars = token.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => {
                cursor.restore(checkpoint);
                Err(ArgumentParseError::CharParse(token.to_string()))
            }
        }
    }
}

/// Parses a `String` under one of the four quoted-string modes (spec
/// §4.1/§4.2).
pub struct StringParser<S> {
    mode: StringMode,
    flags: Option<FlagGroup<S>>,
}

impl<S> StringParser<S> {
    /// A single whitespace-delimited token, or one quoted segment.
    #[must_use]
    pub fn single() -> Self {
        StringParser {
            mode: StringMode::Single,
            flags: None,
        }
    }

    /// A `"..."`/`'...'` segment; fails if the next token isn't quoted.
    #[must_use]
    pub fn quoted() -> Self {
        StringParser {
            mode: StringMode::Quoted,
            flags: None,
        }
    }

    /// The entire remaining input, verbatim.
    #[must_use]
    pub fn greedy() -> Self {
        StringParser {
            mode: StringMode::Greedy,
            flags: None,
        }
    }

    /// Greedy, but stopping one token before anything that looks like a
    /// flag registered in `flags`.
    #[must_use]
    pub fn greedy_flag_yielding(flags: FlagGroup<S>) -> Self {
        StringParser {
            mode: StringMode::GreedyFlagYielding,
            flags: Some(flags),
        }
    }
}

impl<S> ArgumentParser<S> for StringParser<S>
where
    S: Send + Sync,
{
    type Output = String;

    fn id(&self) -> &'static str {
        match self.mode {
            StringMode::Single => "string.single",
            StringMode::Quoted => "string.quoted",
            StringMode::Greedy => "string.greedy",
            StringMode::GreedyFlagYielding => "string.greedy_flag_yielding",
        }
    }

    fn parse<'i>(
        &self,
        ctx: &mut CommandContext<S>,
        cursor: &mut CommandInputCursor<'i>,
    ) -> ArgumentParseResult<Self::Output> {
        let checkpoint = cursor.checkpoint();
        if matches!(self.mode, StringMode::GreedyFlagYielding) && ctx.liberal_flag_parsing() {
            let flags = self.flags.as_ref().expect("greedy_flag_yielding always carries a FlagGroup");
            return read_interleaved_text(ctx, cursor, flags).map_err(|cause| {
                cursor.restore(checkpoint);
                cause
            });
        }
        let result = match self.mode {
            StringMode::Single => cursor.read_single_string(),
            StringMode::Quoted => cursor.read_quoted_string(),
            StringMode::Greedy => cursor.read_greedy_string(),
            StringMode::GreedyFlagYielding => {
                let flags = self.flags.as_ref().expect("greedy_flag_yielding always carries a FlagGroup");
                cursor.read_greedy_flag_yielding_string(flags)
            }
        };
        result.map(str::to_string).map_err(|_| {
            cursor.restore(checkpoint);
            ArgumentParseError::StringParse(cursor.remaining_input().to_string())
        })
    }
}

/// Under `LIBERAL_FLAG_PARSING`, a greedy-flag-yielding argument absorbs
/// flag invocations wherever they occur rather than only after its text
/// (spec §4.4, scenario 5): scan every remaining token, delegate runs
/// that look like flags to [`FlagGroup::parse`] (which records them into
/// `ctx` directly), and collect everything else as the argument's text.
fn read_interleaved_text<S>(
    ctx: &mut CommandContext<S>,
    cursor: &mut CommandInputCursor<'_>,
    flags: &FlagGroup<S>,
) -> ArgumentParseResult<String> {
    let has_permission = |_: &S, _: &str| true;
    let mut parts: Vec<String> = Vec::new();
    loop {
        let Some(token) = cursor.peek_string() else {
            break;
        };
        if flags.looks_like_known_flag(token) {
            flags
                .parse(ctx, cursor, &has_permission)
                .map_err(|cause| ArgumentParseError::Custom(cause.to_string()))?;
        } else {
            let token = cursor.read_string()?;
            parts.push(token.to_string());
        }
    }
    if parts.is_empty() {
        return Err(ArgumentParseError::StringParse(String::new()));
    }
    Ok(parts.join(" "))
}

/// Parses a [`Uuid`].
#[derive(Default)]
pub struct UuidParser;

impl<S> ArgumentParser<S> for UuidParser {
    type Output = Uuid;

    fn id(&self) -> &'static str {
        "uuid"
    }

    fn parse<'i>(
        &self,
        _ctx: &mut CommandContext<S>,
        cursor: &mut CommandInputCursor<'i>,
    ) -> ArgumentParseResult<Self::Output> {
        let checkpoint = cursor.checkpoint();
        let token = cursor.read_single_string()?;
        Uuid::parse_str(token).map_err(|_| {
            cursor.restore(checkpoint);
            ArgumentParseError::UuidParse(token.to_string())
        })
    }
}

/// Parses one variant of a closed enum `E`, matching case-insensitively
/// against `E::VARIANTS` via the `variants`/`parse_variant` pair supplied
/// at construction (this crate has no derive macro of its own; hosts
/// typically generate these two functions with `strum` or hand-write
/// them for small enums).
pub struct EnumParser<E> {
    variants: &'static [&'static str],
    parse_variant: fn(&str) -> Option<E>,
}

impl<E> EnumParser<E> {
    /// Build an enum parser from the closed list of `variants` and a
    /// case-sensitive parse function.
    #[must_use]
    pub fn new(variants: &'static [&'static str], parse_variant: fn(&str) -> Option<E>) -> Self {
        EnumParser {
            variants,
            parse_variant,
        }
    }
}

impl<S, E: Any + Send + Sync> ArgumentParser<S> for EnumParser<E> {
    type Output = E;

    fn id(&self) -> &'static str {
        "enum"
    }

    fn parse<'i>(
        &self,
        _ctx: &mut CommandContext<S>,
        cursor: &mut CommandInputCursor<'i>,
    ) -> ArgumentParseResult<Self::Output> {
        let checkpoint = cursor.checkpoint();
        let token = cursor.read_single_string()?;
        match (self.parse_variant)(token) {
            Some(value) => Ok(value),
            None => {
                cursor.restore(checkpoint);
                Err(ArgumentParseError::EnumParse {
                    input: token.to_string(),
                    valid: self.variants.to_vec(),
                })
            }
        }
    }

    fn suggest(&self, _ctx: &CommandContext<S>, _cursor: &CommandInputCursor<'_>) -> Vec<String> {
        self.variants.iter().map(|v| (*v).to_string()).collect()
    }
}

/// Parses a single token, accepting it only if it matches `pattern`.
pub struct RegexParser {
    pattern: Regex,
    pattern_source: String,
}

impl RegexParser {
    /// Build a parser from a compiled regex; the whole token must match.
    #[must_use]
    pub fn new(pattern: Regex) -> Self {
        let pattern_source = pattern.as_str().to_string();
        RegexParser {
            pattern,
            pattern_source,
        }
    }
}

impl<S> ArgumentParser<S> for RegexParser {
    type Output = String;

    fn id(&self) -> &'static str {
        "regex"
    }

    fn parse<'i>(
        &self,
        _ctx: &mut CommandContext<S>,
        cursor: &mut CommandInputCursor<'i>,
    ) -> ArgumentParseResult<Self::Output> {
        let checkpoint = cursor.checkpoint();
        let token = cursor.read_single_string()?;
        if self.pattern.is_match(token) {
            Ok(token.to_string())
        } else {
            cursor.restore(checkpoint);
            Err(ArgumentParseError::RegexParse {
                input: token.to_string(),
                pattern: self.pattern_source.clone(),
            })
        }
    }
}

/// Parses a `1h30m5s`-style duration. Grounded in the crate's own
/// hand-rolled grammar rather than an external duration crate (see
/// `DESIGN.md`): a flat sequence of `<integer><unit>` pairs, units
/// `d`/`h`/`m`/`s`/`ms`, no fractional amounts, summed together.
#[derive(Default)]
pub struct DurationParser;

impl DurationParser {
    fn parse_duration(input: &str) -> Option<Duration> {
        if input.is_empty() {
            return None;
        }
        let mut total = Duration::ZERO;
        let mut rest = input;
        while !rest.is_empty() {
            let digits_end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
            if digits_end == 0 {
                return None;
            }
            let amount: u64 = rest[..digits_end].parse().ok()?;
            rest = &rest[digits_end..];
            let unit_end = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
            let unit = &rest[..unit_end];
            rest = &rest[unit_end..];
            let unit_duration = match unit {
                "ms" => Duration::from_millis(amount),
                "s" => Duration::from_secs(amount),
                "m" => Duration::from_secs(amount * 60),
                "h" => Duration::from_secs(amount * 3600),
                "d" => Duration::from_secs(amount * 86400),
                _ => return None,
            };
            total += unit_duration;
        }
        Some(total)
    }
}

impl<S> ArgumentParser<S> for DurationParser {
    type Output = Duration;

    fn id(&self) -> &'static str {
        "duration"
    }

    fn parse<'i>(
        &self,
        _ctx: &mut CommandContext<S>,
        cursor: &mut CommandInputCursor<'i>,
    ) -> ArgumentParseResult<Self::Output> {
        let checkpoint = cursor.checkpoint();
        let token = cursor.read_single_string()?;
        Self::parse_duration(token).ok_or_else(|| {
            cursor.restore(checkpoint);
            ArgumentParseError::DurationParse(token.to_string())
        })
    }
}

/// The output of an [`EitherParser`]: which alternative matched.
pub enum Either<L, R> {
    /// The left alternative matched.
    Left(L),
    /// The right alternative matched.
    Right(R),
}

/// Tries `left`, then `right`, keeping the two result types distinct
/// (unlike [`crate::parser::first_of`], which requires the same output
/// type on both sides).
pub struct EitherParser<L, R> {
    left: L,
    right: R,
}

impl<L, R> EitherParser<L, R> {
    /// Build an `either` parser out of two differently-typed parsers.
    #[must_use]
    pub fn new(left: L, right: R) -> Self {
        EitherParser { left, right }
    }
}

impl<S, L, R> ArgumentParser<S> for EitherParser<L, R>
where
    L: ArgumentParser<S>,
    R: ArgumentParser<S>,
{
    type Output = Either<L::Output, R::Output>;

    fn id(&self) -> &'static str {
        "either"
    }

    fn parse<'i>(
        &self,
        ctx: &mut CommandContext<S>,
        cursor: &mut CommandInputCursor<'i>,
    ) -> ArgumentParseResult<Self::Output> {
        let checkpoint = cursor.checkpoint();
        match self.left.parse(ctx, cursor) {
            Ok(value) => Ok(Either::Left(value)),
            Err(_left_cause) => {
                cursor.restore(checkpoint);
                match self.right.parse(ctx, cursor) {
                    Ok(value) => Ok(Either::Right(value)),
                    Err(_right_cause) => {
                        cursor.restore(checkpoint);
                        let offending_input = cursor
                            .peek_string()
                            .unwrap_or_else(|| cursor.remaining_input())
                            .to_string();
                        Err(ArgumentParseError::Either {
                            input: offending_input,
                            left_id: self.left.id(),
                            right_id: self.right.id(),
                        })
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> CommandContext<()> {
        CommandContext::new((), String::new())
    }

    #[test]
    fn integer_parser_respects_bounds() {
        let parser = IntegerParser::new(0, 10);
        let mut cursor = CommandInputCursor::new("5");
        let mut c = ctx();
        assert_eq!(ArgumentParser::parse(&parser, &mut c, &mut cursor).unwrap(), 5);

        let mut cursor = CommandInputCursor::new("50");
        assert!(ArgumentParser::parse(&parser, &mut c, &mut cursor).is_err());
    }

    #[test]
    fn boolean_parser_is_case_insensitive() {
        let parser = BooleanParser;
        let mut c = ctx();
        let mut cursor = CommandInputCursor::new("TRUE");
        assert!(ArgumentParser::parse(&parser, &mut c, &mut cursor).unwrap());
    }

    #[test]
    fn uuid_parser_rejects_malformed_input() {
        let parser = UuidParser;
        let mut c = ctx();
        let mut cursor = CommandInputCursor::new("not-a-uuid");
        assert!(ArgumentParser::parse(&parser, &mut c, &mut cursor).is_err());
    }

    #[test]
    fn duration_parser_sums_units() {
        let parser = DurationParser;
        let mut c = ctx();
        let mut cursor = CommandInputCursor::new("1h30m");
        let parsed = ArgumentParser::parse(&parser, &mut c, &mut cursor).unwrap();
        assert_eq!(parsed, Duration::from_secs(3600 + 1800));
    }

    #[test]
    fn regex_parser_matches_whole_token() {
        let parser = RegexParser::new(Regex::new(r"^[a-z]+$").unwrap());
        let mut c = ctx();
        let mut cursor = CommandInputCursor::new("hello");
        assert_eq!(ArgumentParser::parse(&parser, &mut c, &mut cursor).unwrap(), "hello");
        let mut cursor = CommandInputCursor::new("Hello1");
        assert!(ArgumentParser::parse(&parser, &mut c, &mut cursor).is_err());
    }
}
