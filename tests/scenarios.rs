// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Integration tests for the six concrete scenarios named in spec §8,
//! exercised end to end through [`CommandManager`] rather than against
//! any single module in isolation.

use std::sync::{Arc, Mutex};

use command_core::component::DefaultValue;
use command_core::dispatcher::SimpleCoordinator;
use command_core::error::ArgumentParseError;
use command_core::flag::FlagParseError;
use command_core::parser::standard::{IntegerParser, StringParser};
use command_core::{
    CommandContext, CommandManager, CommandSettings, ExecutionError, Flag, FlagGroup, RegistrationError, SenderBound,
};

fn manager() -> CommandManager<()> {
    CommandManager::new(Box::new(SimpleCoordinator), Box::new(|_: &(), _: &str| true))
}

#[test]
fn scenario_1_three_commands_share_a_tree() {
    let manager = manager();
    let log: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

    let log_int = Arc::clone(&log);
    manager
        .register(
            manager
                .command("test")
                .then_literal("int")
                .required("n", Arc::new(IntegerParser::new(0, 100)))
                .unwrap()
                .build(move |ctx: &mut CommandContext<()>| {
                    log_int.lock().unwrap().push(format!("int:{}", ctx.get::<i64>("n").unwrap()));
                    Ok::<(), std::convert::Infallible>(())
                }),
        )
        .unwrap();

    let log_foobar = Arc::clone(&log);
    manager
        .register(
            manager
                .command("test")
                .then_literal("foo")
                .then_literal("bar")
                .build(move |_ctx: &mut CommandContext<()>| {
                    log_foobar.lock().unwrap().push("foobar".to_string());
                    Ok::<(), std::convert::Infallible>(())
                }),
        )
        .unwrap();

    let log_str = Arc::clone(&log);
    manager
        .register(
            manager
                .command("test")
                .required("s", Arc::new(StringParser::<()>::greedy()))
                .unwrap()
                .build(move |ctx: &mut CommandContext<()>| {
                    log_str.lock().unwrap().push(format!("s:{}", ctx.get::<String>("s").unwrap()));
                    Ok::<(), std::convert::Infallible>(())
                }),
        )
        .unwrap();

    manager.execute((), "test int 42").unwrap();
    manager.execute((), "test foo bar").unwrap();
    manager.execute((), "test whatever words").unwrap();

    let log = log.lock().unwrap();
    assert_eq!(
        *log,
        vec!["int:42".to_string(), "foobar".to_string(), "s:whatever words".to_string()]
    );
}

#[test]
fn scenario_2_same_position_required_ints_are_ambiguous() {
    let manager = manager();
    manager
        .register(
            manager
                .command("x")
                .required("a", Arc::new(IntegerParser::default()))
                .unwrap()
                .build(|_: &mut CommandContext<()>| Ok::<(), std::convert::Infallible>(())),
        )
        .unwrap();

    let err = manager
        .register(
            manager
                .command("x")
                .required("b", Arc::new(IntegerParser::default()))
                .unwrap()
                .build(|_: &mut CommandContext<()>| Ok::<(), std::convert::Infallible>(())),
        )
        .unwrap_err();
    assert!(matches!(err, RegistrationError::Ambiguous { .. }));
}

#[test]
fn scenario_3_invalid_syntax_not_no_such_command() {
    let manager = manager();
    manager
        .register(
            manager
                .command("test")
                .required("s", Arc::new(StringParser::<()>::greedy()))
                .unwrap()
                .build(|_: &mut CommandContext<()>| Ok::<(), std::convert::Infallible>(())),
        )
        .unwrap();

    let err = manager.execute((), "test").unwrap_err();
    match err {
        ExecutionError::InvalidSyntax { expected_syntax, .. } => {
            assert_eq!(expected_syntax, "test <s>");
        }
        other => panic!("expected InvalidSyntax, got {other:?}"),
    }
}

#[test]
fn scenario_4_flag_presence_and_unknown_flag() {
    let manager = manager();
    let mut group: FlagGroup<()> = FlagGroup::new();
    group.add(Flag::presence("foo", &['o']));
    manager
        .register(
            manager.command("f").flags(group).build(|ctx: &mut CommandContext<()>| {
                assert!(ctx.flags().is_present("foo"));
                Ok::<(), std::convert::Infallible>(())
            }),
        )
        .unwrap();

    manager.execute((), "f --foo").unwrap();
    manager.execute((), "f -o").unwrap();

    let err = manager.execute((), "f --bar").unwrap_err();
    assert!(matches!(err, ExecutionError::Flag(FlagParseError::UnknownFlag(name)) if name == "bar"));
}

#[test]
fn scenario_5_liberal_flag_parsing_interleaves_with_greedy_text() {
    let mut manager = manager();
    manager.set_settings(CommandSettings {
        liberal_flag_parsing: true,
        ..CommandSettings::default()
    });

    let mut parser_flags: FlagGroup<()> = FlagGroup::new();
    parser_flags.add(Flag::presence("flag", &['f']));
    let mut component_flags: FlagGroup<()> = FlagGroup::new();
    component_flags.add(Flag::presence("flag", &['f']));

    let log: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let log_handler = Arc::clone(&log);
    manager
        .register(
            manager
                .command("t")
                .then_literal("l")
                .required("text", Arc::new(StringParser::greedy_flag_yielding(parser_flags)))
                .unwrap()
                .flags(component_flags)
                .build(move |ctx: &mut CommandContext<()>| {
                    let text = ctx.get::<String>("text").cloned().unwrap_or_default();
                    log_handler.lock().unwrap().push(format!("{text}:{}", ctx.flags().is_present("flag")));
                    Ok::<(), std::convert::Infallible>(())
                }),
        )
        .unwrap();

    for input in ["t l -f a b", "t l a b -f", "t l --flag a b", "t l a b --flag"] {
        manager.execute((), input).unwrap();
    }

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 4);
    for entry in log.iter() {
        assert_eq!(entry, "a b:true");
    }
}

#[test]
fn scenario_6_parser_failure_surfaces_as_argument_parse() {
    let manager = manager();
    manager
        .register(
            manager
                .command("n")
                .required("v", Arc::new(IntegerParser::new(0, 10)))
                .unwrap()
                .build(|_: &mut CommandContext<()>| Ok::<(), std::convert::Infallible>(())),
        )
        .unwrap();

    let err = manager.execute((), "n 999").unwrap_err();
    assert!(matches!(
        err,
        ExecutionError::ArgumentParse {
            cause: ArgumentParseError::NumberParse { .. },
            ..
        }
    ));
}

#[test]
fn optional_parsed_default_runs_through_its_own_parser() {
    let manager = manager();
    manager
        .register(
            manager
                .command("opt")
                .optional(
                    "n",
                    Arc::new(IntegerParser::new(0, 100)),
                    DefaultValue::Parsed("7".to_string()),
                )
                .build(|ctx: &mut CommandContext<()>| {
                    assert_eq!(ctx.get::<i64>("n"), Some(&7));
                    Ok::<(), std::convert::Infallible>(())
                }),
        )
        .unwrap();

    manager.execute((), "opt").unwrap();
}

#[test]
fn optional_parsed_default_out_of_range_fails_like_user_input_would() {
    let manager = manager();
    manager
        .register(
            manager
                .command("opt")
                .optional(
                    "n",
                    Arc::new(IntegerParser::new(0, 10)),
                    DefaultValue::Parsed("999".to_string()),
                )
                .build(|_: &mut CommandContext<()>| Ok::<(), std::convert::Infallible>(())),
        )
        .unwrap();

    let err = manager.execute((), "opt").unwrap_err();
    assert!(matches!(
        err,
        ExecutionError::ArgumentParse {
            cause: ArgumentParseError::NumberParse { .. },
            ..
        }
    ));
}

#[test]
fn sender_bound_rejects_a_sender_that_fails_the_predicate() {
    let manager = manager();
    manager
        .register(
            manager
                .command("shutdown")
                .sender_bound(SenderBound::new("Admin", |_: &()| false))
                .build(|_: &mut CommandContext<()>| Ok::<(), std::convert::Infallible>(())),
        )
        .unwrap();

    let err = manager.execute((), "shutdown").unwrap_err();
    assert!(matches!(
        err,
        ExecutionError::InvalidSender { expected: "Admin", .. }
    ));
}

#[test]
fn component_permission_blocks_descent_before_the_whole_command_runs() {
    let manager = CommandManager::new(
        Box::new(SimpleCoordinator),
        Box::new(|_: &(), permission: &str| permission != "vault.open"),
    );
    manager
        .register(
            manager
                .command("vault")
                .then_literal("open")
                .component_permission("vault.open")
                .build(|_: &mut CommandContext<()>| Ok::<(), std::convert::Infallible>(())),
        )
        .unwrap();

    let err = manager.execute((), "vault open").unwrap_err();
    assert!(matches!(
        err,
        ExecutionError::NoPermission { permission } if permission == "vault.open"
    ));
}

#[test]
fn set_settings_does_not_discard_registered_commands() {
    let mut manager = manager();
    manager
        .register(manager.command("ping").build(|_: &mut CommandContext<()>| Ok::<(), std::convert::Infallible>(())))
        .unwrap();

    manager.set_settings(CommandSettings {
        liberal_flag_parsing: true,
        ..CommandSettings::default()
    });

    manager.execute((), "ping").unwrap();
}
