//! Parser Driver
//!
//! Feeds one character at a time into the expression stack, interprets
//! the returned action (consume, re-feed, pop) as a loop rather than
//! recursion, and emits one color object per character. `parse_string`
//! coalesces the objects into runs for the renderer; `exec` closes the
//! stack bottom-up and evaluates the root command list.

use std::rc::Rc;

use super::context::ExecContext;
use super::expression::{Action, Expression, ScopeDirective};
use super::stack::ExpressionStack;
use super::types::{Completion, ExecError, Object, ParseErrorKind};
use super::value::Value;

/// One run of same-colored characters in a parsed line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectRun {
    pub object: Object,
    pub len: usize,
}

/// Result of `parse_string`: the color runs covering the input and the
/// first error, if any.
#[derive(Debug, Clone, Default)]
pub struct ParsedLine {
    pub runs: Vec<ObjectRun>,
    pub error: Option<ParseErrorKind>,
}

pub struct Parser {
    root_ctx: ExecContext,
    stack: ExpressionStack,
}

impl Parser {
    pub fn new(root_ctx: ExecContext) -> Parser {
        let mut parser = Parser {
            root_ctx,
            stack: ExpressionStack::new(),
        };
        parser.flush();
        parser
    }

    /// Resets the line state: a fresh line scope seeded with a root-mode
    /// command list.
    pub fn flush(&mut self) {
        let line_ctx = self.root_ctx.new_scope();
        self.stack = ExpressionStack::new();
        self.stack.push(line_ctx, Expression::list(true, false));
    }

    /// Feeds one character. Re-feeding (`Repeat`, `GoOut`) is driven by
    /// this loop so nesting depth never grows the call stack.
    pub fn feed(&mut self, c: char) -> Result<Object, ParseErrorKind> {
        loop {
            let (ctx, expr) = match self.stack.pop() {
                Some(frame) => frame,
                None => return Err(ParseErrorKind::Panic),
            };

            let add_result = expr.borrow_mut().add(&ctx, c);
            let step = match add_result {
                Ok(step) => step,
                Err(e) => {
                    self.stack.push(ctx, expr);
                    return Err(e);
                }
            };

            let mut target = expr;
            if let Some(new_expr) = &step.expression {
                if !Rc::ptr_eq(new_expr, &target) && step.action != Action::GoOut {
                    self.stack.push(ctx.clone(), target);
                    target = Rc::clone(new_expr);
                }
            }

            let ctx = match step.scope {
                ScopeDirective::Keep => ctx,
                ScopeDirective::Copied => ctx.copy(),
                ScopeDirective::New => ctx.new_scope(),
            };

            match step.action {
                Action::GoNext => {
                    self.stack.push(ctx, target);
                    return Ok(step.object);
                }
                Action::Repeat => {
                    self.stack.push(ctx, target);
                }
                Action::GoOut => {
                    if self.stack.is_empty() {
                        return Err(ParseErrorKind::Panic);
                    }
                    target.borrow_mut().close(&ctx).map_err(|e| e.kind)?;
                }
            }
        }
    }

    /// Flushes, feeds the whole line and coalesces the emitted objects
    /// into runs. After an error every non-space character paints as
    /// Error until the next space.
    pub fn parse_string(&mut self, s: &str) -> ParsedLine {
        self.flush();

        let mut line = ParsedLine::default();
        let mut run = ObjectRun {
            object: Object::Space,
            len: 0,
        };

        for c in s.chars() {
            let new_object = if line.error.is_none() {
                match self.feed(c) {
                    Ok(object) => object,
                    Err(e) => {
                        line.error = Some(e);
                        if c == ' ' {
                            run.object = Object::Error;
                            Object::Space
                        } else {
                            Object::Error
                        }
                    }
                }
            } else if c == ' ' {
                Object::Space
            } else if run.object == Object::Space {
                Object::None
            } else {
                run.object
            };

            if new_object != run.object {
                if run.object.is_single() || new_object.is_single() {
                    // a name that turned out to be a bare value
                    if new_object == Object::Space
                        && matches!(
                            run.object,
                            Object::OptionalFlag | Object::MandatoryFlag | Object::Unknown
                        )
                    {
                        run.object = Object::Value;
                    }
                    if run.len > 0 {
                        line.runs.push(run);
                    }
                    run = ObjectRun {
                        object: new_object,
                        len: 0,
                    };
                } else {
                    run.object = new_object;
                }
            }
            run.len += 1;
        }

        if run.len > 0 {
            line.runs.push(run);
        }
        line
    }

    /// Closes the stack bottom-up and evaluates the root list.
    pub fn exec(&mut self) -> Result<Value, ExecError> {
        let mut last = None;
        while let Some((ctx, expr)) = self.stack.pop() {
            if let Err(e) = expr.borrow_mut().close(&ctx) {
                return Err(ExecError::Unfinished {
                    kind: e.kind,
                    unclosed: e.unclosed,
                });
            }
            last = Some((ctx, expr));
        }

        let (ctx, expr) = last.ok_or(ExecError::Unfinished {
            kind: ParseErrorKind::Panic,
            unclosed: None,
        })?;
        let value = expr.borrow().value(&ctx)?;
        Ok(value)
    }

    /// Completion for the innermost open expression.
    pub fn complete(&mut self) -> Option<Completion> {
        let (ctx, expr) = self.stack.pop()?;
        let completion = expr.borrow().complete(&ctx);
        self.stack.push(ctx, expr);
        completion
    }

    pub fn root_ctx(&self) -> &ExecContext {
        &self.root_ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::catalog::{
        build_catalog, CommandSpec, ExecFn, Flag, FlagValues, Options, SystemExecFn, ValueType,
    };
    use crate::parser::types::{EvalError, Level};
    use crate::parser::variables::Binding;
    use crate::shell::buffer::OutputBuffer;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tokio::sync::watch;

    type Calls = Rc<RefCell<Vec<(FlagValues, Options)>>>;

    fn recording_exec(calls: &Calls) -> ExecFn {
        let calls = Rc::clone(calls);
        Rc::new(move |_ctx, flags, options| {
            calls.borrow_mut().push((flags.clone(), options.clone()));
            Ok(Value::null())
        })
    }

    fn set_local_exec() -> SystemExecFn {
        Rc::new(|ctx, flags, _options| {
            let name = match flags.get("name") {
                Some(f) => f.value(ctx)?.as_string(),
                None => return Ok(Value::null()),
            };
            let value = match flags.get("value") {
                Some(f) => f.value(ctx)?,
                None => Value::null(),
            };
            ctx.set_local(&name, Binding::Value(value));
            Ok(Value::null())
        })
    }

    fn get_exec() -> ExecFn {
        Rc::new(|_ctx, flags, _options| {
            Ok(flags.get("value").cloned().unwrap_or_else(Value::null))
        })
    }

    /// The catalog most tests run against: `/ip firewall add` with one
    /// unnamed mandatory flag, two optional flags and one option, plus
    /// `set` and `get` helpers.
    fn test_parser(calls: &Calls) -> Parser {
        let catalog = build_catalog(vec![
            CommandSpec::user(&["ip", "firewall"], "add", recording_exec(calls))
                .flag(Flag::new("network", ValueType::String).mandatory().at_position(1))
                .flag(Flag::new("area", ValueType::Number))
                .flag(Flag::new("netlork", ValueType::String))
                .option("verbose"),
            CommandSpec::system("set", set_local_exec(), None)
                .flag(Flag::new("name", ValueType::String).mandatory().at_position(1))
                .flag(Flag::new("value", ValueType::String).mandatory().at_position(2)),
            CommandSpec::user(&[], "get", get_exec())
                .flag(Flag::new("value", ValueType::String).mandatory().at_position(1)),
        ])
        .unwrap();

        let (_tx, rx) = watch::channel(false);
        Parser::new(ExecContext::root(
            catalog,
            Rc::new(RefCell::new(OutputBuffer::new())),
            rx,
        ))
    }

    fn run(parser: &mut Parser, line: &str) -> Result<Value, String> {
        let parsed = parser.parse_string(line);
        if let Some(e) = parsed.error {
            return Err(format!("parse: {e}"));
        }
        parser.exec().map_err(|e| format!("exec: {e}"))
    }

    #[test]
    fn test_paths_and_commands() {
        let calls = Calls::default();
        let mut parser = test_parser(&calls);

        for line in [
            "/;",
            "/ip;",
            ":ip;",
            ": ip f;",
            "  /ip;",
            "  / ip;",
            "/ip firewall;",
            "/ip f;",
        ] {
            assert!(run(&mut parser, line).is_ok(), "expected ok: {line}");
        }

        for line in [
            "/:ip;",
            ":firewall;",
            "/ipf;",
            "/ip g;",
            "/ip f g;",
            "//ip f;",
            "/ip / f;",
            "/ip firewall add n=1 netdf;",
            "/ip firewall add network =11;",
            "/ip firewall add network==n1;",
        ] {
            let parsed = parser.parse_string(line);
            assert_eq!(
                parsed.error,
                Some(ParseErrorKind::WrongRune),
                "expected wrong rune: {line}"
            );
        }
    }

    #[test]
    fn test_persisted_root() {
        let calls = Calls::default();
        let mut parser = test_parser(&calls);

        // a colon path persists its resolved sub-tree for later clauses
        let parsed = parser.parse_string(":ip firewall; add network=n1;");
        assert!(parsed.error.is_none());
        parser.exec().unwrap();
        assert_eq!(calls.borrow().len(), 1);
    }

    #[test]
    fn test_flags_and_options() {
        let calls = Calls::default();
        let mut parser = test_parser(&calls);

        let checks: &[(&str, &[(&str, &str)], &[(&str, bool)])] = &[
            ("/ip firewall add network=n1;", &[("network", "n1")], &[("verbose", false)]),
            ("/ip f a network=n1;", &[("network", "n1")], &[("verbose", false)]),
            (
                "/ip firewall add netw=\"network\";",
                &[("network", "network")],
                &[("verbose", false)],
            ),
            (
                "/ip firewall  add  network=\"network value\" verbose;",
                &[("network", "network value")],
                &[("verbose", true)],
            ),
            (
                "/ip firewall  add  \"network value\" verbose;",
                &[("network", "network value")],
                &[("verbose", true)],
            ),
            (
                "/ip firewall add network verbose;",
                &[("network", "network")],
                &[("verbose", true)],
            ),
            (
                "/ip firewall add network verbose area=15;",
                &[("network", "network"), ("area", "15")],
                &[("verbose", true)],
            ),
            (
                "/ip firewall add \"a b\" verbose area=5;",
                &[("network", "a b"), ("area", "5")],
                &[("verbose", true)],
            ),
            (
                "/i f a network verbo a=15;",
                &[("network", "network"), ("area", "15")],
                &[("verbose", true)],
            ),
            (
                "/ip firewall add (\"n\" . 1) verbose;",
                &[("network", "n1")],
                &[("verbose", true)],
            ),
        ];

        for (line, flags, options) in checks {
            calls.borrow_mut().clear();
            run(&mut parser, line).unwrap_or_else(|e| panic!("{line}: {e}"));
            let recorded = calls.borrow();
            assert_eq!(recorded.len(), 1, "one invocation for {line}");
            let (values, opts) = &recorded[0];
            for (name, expected) in *flags {
                assert_eq!(
                    values.get(*name).map(|v| v.as_string()).as_deref(),
                    Some(*expected),
                    "flag {name} of {line}"
                );
            }
            for (name, expected) in *options {
                assert_eq!(opts.get(*name), Some(expected), "option {name} of {line}");
            }
        }
    }

    #[test]
    fn test_flag_value_from_variable() {
        let calls = Calls::default();
        let mut parser = test_parser(&calls);
        parser
            .root_ctx()
            .set_global("var", Binding::Value(Value::from("network")));

        run(&mut parser, "/ip firewall add network=$var verbose;").unwrap();
        run(&mut parser, "/ip firewall add $var verbose;").unwrap();
        let recorded = calls.borrow();
        assert_eq!(recorded[0].0.get("network").map(|v| v.as_string()).as_deref(), Some("network"));
        assert_eq!(recorded[1].0.get("network").map(|v| v.as_string()).as_deref(), Some("network"));
    }

    #[test]
    fn test_flag_value_from_command_list() {
        let calls = Calls::default();
        let mut parser = test_parser(&calls);

        run(
            &mut parser,
            "/ip firewall add [/ip firewall add network=1234] verbose;",
        )
        .unwrap();
        let recorded = calls.borrow();
        assert_eq!(recorded.len(), 2);
        // the inner invocation ran first, with its own flags
        assert_eq!(recorded[0].0.get("network").map(|v| v.as_string()).as_deref(), Some("1234"));
        assert_eq!(recorded[0].1.get("verbose"), Some(&false));
        assert_eq!(recorded[1].1.get("verbose"), Some(&true));
    }

    #[test]
    fn test_unnamed_after_named_flag_is_refused() {
        let calls = Calls::default();
        let mut parser = test_parser(&calls);
        let parsed = parser.parse_string("/ip firewall add area=5 \"a b\";");
        assert_eq!(parsed.error, Some(ParseErrorKind::WrongRune));
    }

    #[test]
    fn test_no_unnamed_position_left() {
        let calls = Calls::default();
        let mut parser = test_parser(&calls);
        let parsed = parser.parse_string("/ip firewall  add  \"network\" verbose verb;");
        assert_eq!(parsed.error, Some(ParseErrorKind::WrongRune));
    }

    #[test]
    fn test_missing_mandatory_flag() {
        let calls = Calls::default();
        let mut parser = test_parser(&calls);
        let parsed = parser.parse_string("/ip firewall add area=5;");
        assert!(parsed.error.is_none());
        match parser.exec() {
            Err(ExecError::Eval(EvalError::NoMandatoryFlag(name))) => {
                assert_eq!(name, "network")
            }
            other => panic!("expected missing mandatory flag, got {other:?}"),
        }
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_command_lists() {
        let calls = Calls::default();
        let mut parser = test_parser(&calls);

        for line in ["]", "[]]", "[//]", ")", "[)"] {
            let parsed = parser.parse_string(line);
            assert_eq!(
                parsed.error,
                Some(ParseErrorKind::WrongRune),
                "expected wrong rune: {line}"
            );
        }

        // an empty math expression fails the moment it is closed
        let parsed = parser.parse_string("()");
        assert_eq!(parsed.error, Some(ParseErrorKind::NotFinished));

        for line in [
            "[]",
            "[/]",
            "[/;/;/;]",
            "[/;/;/]",
            "([])",
            ";;[];",
            "[{}]",
            "{}",
            "(1 + 2);;",
            "[ $hello]",
        ] {
            assert!(run(&mut parser, line).is_ok(), "expected ok: {line}");
        }

        calls.borrow_mut().clear();
        run(&mut parser, "[ /ip firewall add network=n1]").unwrap();
        assert_eq!(calls.borrow().len(), 1);

        calls.borrow_mut().clear();
        run(&mut parser, "[/ip firewall add network=n1; (1 + 2);;;]").unwrap();
        assert_eq!(calls.borrow().len(), 1);
    }

    #[test]
    fn test_unclosed_bracket_reported() {
        let calls = Calls::default();
        let mut parser = test_parser(&calls);
        let parsed = parser.parse_string("[/ip");
        assert!(parsed.error.is_none());
        match parser.exec() {
            Err(ExecError::Unfinished { kind, unclosed }) => {
                assert_eq!(kind, ParseErrorKind::NotFinished);
                assert_eq!(unclosed, Some('['));
            }
            other => panic!("expected unclosed bracket, got {other:?}"),
        }
    }

    #[test]
    fn test_math_values() {
        let calls = Calls::default();
        let mut parser = test_parser(&calls);

        let numbers: &[(&str, i64)] = &[
            ("(9 *5)", 45),
            ("(3 . 5 + 5)", 310),
            ("(9 * (3+3))", 54),
            ("(5-(8 + 9))", -12),
            ("((5 + 3) * (5 - 3))", 16),
            ("(+5)", 5),
            ("(-5)", -5),
            ("(- (5 + 3))", -8),
            ("(5 / 2)", 2),
            ("(\"5\" . 2)", 52),
            ("([] + 2)", 2),
            ("( [ ]-2)", -2),
        ];
        for (line, expected) in numbers {
            let v = run(&mut parser, line).unwrap_or_else(|e| panic!("{line}: {e}"));
            assert_eq!(v.as_number(), *expected, "{line}");
        }

        let bools: &[(&str, bool)] = &[
            ("(5 = 5)", true),
            ("(5 != 1)", true),
            ("(5 < 5)", false),
            ("(5 <= 5)", true),
            ("(9 > 8)", true),
            ("(! (5 > 3))", false),
            ("(!!(5 > 3))", true),
            ("(1 = 1)", true),
            ("(true = true)", true),
            ("(1 = 1 = true)", true),
            ("(!!true)", true),
        ];
        for (line, expected) in bools {
            let v = run(&mut parser, line).unwrap_or_else(|e| panic!("{line}: {e}"));
            assert_eq!(v.as_bool(), *expected, "{line}");
        }

        assert_eq!(
            run(&mut parser, "(\"n\" . 2)").unwrap().as_string(),
            "n2"
        );
    }

    #[test]
    fn test_math_parse_errors() {
        let calls = Calls::default();
        let mut parser = test_parser(&calls);

        for line in [
            "(*5)", "(1+=5)", "(>= 5)", "(<= 5)", "(< 5)", "(> 5)", "(= 5)", "(!= 5)",
            "(1 != /5)", "(1 ! /5)",
        ] {
            let parsed = parser.parse_string(line);
            assert!(parsed.error.is_some(), "expected parse error: {line}");
        }

        // legal to parse, once evaluated the unary takes a boolean only
        for line in ["(1 + !5)", "(1 / !5)"] {
            let parsed = parser.parse_string(line);
            assert!(parsed.error.is_none(), "expected parse ok: {line}");
            match parser.exec() {
                Err(ExecError::Eval(EvalError::WrongType)) => {}
                other => panic!("{line}: expected wrong type, got {other:?}"),
            }
        }

        let parsed = parser.parse_string("(1 > +5)");
        assert!(parsed.error.is_none());
        assert!(!parser.exec().unwrap().as_bool());
    }

    #[test]
    fn test_math_eval_errors_surface() {
        let calls = Calls::default();
        let mut parser = test_parser(&calls);

        let parsed = parser.parse_string("(5 / 0)");
        assert!(parsed.error.is_none());
        match parser.exec() {
            Err(ExecError::Eval(EvalError::DivisionByZero)) => {}
            other => panic!("expected division by zero, got {other:?}"),
        }

        let parsed = parser.parse_string("(true > false)");
        assert!(parsed.error.is_none());
        match parser.exec() {
            Err(ExecError::Eval(EvalError::WrongType)) => {}
            other => panic!("expected wrong type, got {other:?}"),
        }
    }

    #[test]
    fn test_math_with_variables() {
        let calls = Calls::default();
        let mut parser = test_parser(&calls);
        let ctx = parser.root_ctx().clone();
        ctx.set_global("var", Binding::Value(Value::Number(90)));
        ctx.set_global("var2", Binding::Value(Value::Number(50)));

        assert_eq!(run(&mut parser, "($var + 2)").unwrap().as_number(), 92);
        assert_eq!(run(&mut parser, "($var+$var2)").unwrap().as_number(), 140);
    }

    #[test]
    fn test_global_then_math() {
        let calls = Calls::default();
        let mut parser = test_parser(&calls);
        assert_eq!(
            run(&mut parser, "/global name=x value=42; ($x + 8)")
                .unwrap()
                .as_number(),
            50
        );
    }

    #[test]
    fn test_local_scope_discarded() {
        let calls = Calls::default();
        let mut parser = test_parser(&calls);
        assert_eq!(
            run(
                &mut parser,
                "{/local name=y value=1; /local name=y value=2}; ($y + 0)"
            )
            .unwrap()
            .as_number(),
            0
        );
    }

    #[test]
    fn test_copied_scope_shares_locals() {
        let calls = Calls::default();
        let mut parser = test_parser(&calls);
        assert_eq!(
            run(&mut parser, "[/set ab 123];[get ($ab + 1)]")
                .unwrap()
                .as_number(),
            124
        );
    }

    #[test]
    fn test_variable_values() {
        let calls = Calls::default();
        let mut parser = test_parser(&calls);
        let ctx = parser.root_ctx().clone();
        ctx.set_global("test", Binding::Value(Value::Number(123)));

        assert_eq!(run(&mut parser, "$test").unwrap().as_string(), "123");
        // a prefix of a known name is not an error, it reads as null
        assert_eq!(run(&mut parser, "$tes").unwrap().as_string(), "");
    }

    #[test]
    fn test_variable_function_mode() {
        let calls = Calls::default();
        let mut parser = test_parser(&calls);

        // bind a callable: a command list capturing $v at call time
        run(&mut parser, "/global name=f value=[get $v]").unwrap();
        assert_eq!(run(&mut parser, "$f v=123").unwrap().as_string(), "123");
        assert_eq!(run(&mut parser, "$f   v=hello").unwrap().as_string(), "hello");
        assert_eq!(
            run(&mut parser, "$f v=[get hh; get hello]").unwrap().as_string(),
            "hello"
        );
        assert_eq!(run(&mut parser, "$f v=(1 . 2)").unwrap().as_string(), "12");

        // arguments bind locals of the call scope only
        run(&mut parser, "$f v=42").unwrap();
        assert_eq!(run(&mut parser, "$v").unwrap().as_string(), "");
    }

    #[test]
    fn test_variable_parse_errors() {
        let calls = Calls::default();
        let mut parser = test_parser(&calls);
        for line in ["$tes v 123", "$tes v =123", "$tes =123", "$tes name==123", "$$tes"] {
            let parsed = parser.parse_string(line);
            assert_eq!(
                parsed.error,
                Some(ParseErrorKind::WrongRune),
                "expected wrong rune: {line}"
            );
        }
    }

    #[test]
    fn test_feed_equals_parse_string() {
        let calls = Calls::default();
        let mut by_rune = test_parser(&calls);
        let mut by_string = test_parser(&calls);

        for line in [
            "/ip firewall add network=n1 verbose;",
            "(5 = 5)",
            "/global name=x value=1; ($x + 1)",
        ] {
            by_rune.flush();
            let mut rune_err = None;
            for c in line.chars() {
                if let Err(e) = by_rune.feed(c) {
                    rune_err = Some(e);
                    break;
                }
            }
            let rune_value = by_rune.exec();

            let parsed = by_string.parse_string(line);
            let string_value = by_string.exec();

            assert_eq!(rune_err, parsed.error, "{line}");
            assert_eq!(rune_value, string_value, "{line}");
        }
    }

    #[test]
    fn test_completion_merged_prefix() {
        let calls = Calls::default();
        let mut parser = test_parser(&calls);

        parser.parse_string("/ip f");
        let completion = parser.complete().unwrap();
        assert_eq!(completion.merged, "irewall ");
        assert_eq!(completion.options.len(), 1);
        assert_eq!(completion.options[0].name, "firewall");
        assert_eq!(completion.options[0].level, Level::Path);
    }

    #[test]
    fn test_completion_lists_unused_flags() {
        let calls = Calls::default();
        let catalog = build_catalog(vec![
            CommandSpec::user(&["ip", "firewall"], "add", recording_exec(&calls))
                .flag(Flag::new("network", ValueType::String).mandatory().at_position(1))
                .flag(Flag::new("area", ValueType::Number)),
        ])
        .unwrap();
        let (_tx, rx) = watch::channel(false);
        let mut parser = Parser::new(ExecContext::root(
            catalog,
            Rc::new(RefCell::new(OutputBuffer::new())),
            rx,
        ));

        parser.parse_string("/ip firewall add ");
        let completion = parser.complete().unwrap();
        let names: Vec<&str> = completion.options.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["area", "network"]);
        assert_eq!(completion.merged, "");

        // once network is bound, only area is left and it merges fully
        parser.parse_string("/ip firewall add network=n1 ");
        let completion = parser.complete().unwrap();
        let names: Vec<&str> = completion.options.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["area"]);
        assert_eq!(completion.merged, "area=");
    }

    #[test]
    fn test_completion_for_variables() {
        let calls = Calls::default();
        let mut parser = test_parser(&calls);
        let ctx = parser.root_ctx().clone();
        ctx.set_global("counter", Binding::Value(Value::Number(0)));
        ctx.set_global("count", Binding::Value(Value::Number(0)));

        parser.parse_string("$cou");
        let completion = parser.complete().unwrap();
        let names: Vec<&str> = completion.options.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["count", "counter"]);
        assert_eq!(completion.merged, "nt");
    }

    #[test]
    fn test_colorization_runs_cover_input() {
        let calls = Calls::default();
        let mut parser = test_parser(&calls);

        for line in [
            "/ip firewall add network=n1 verbose;",
            "(5 = 5)",
            "$test",
            "/ip bogus here",
        ] {
            let parsed = parser.parse_string(line);
            let total: usize = parsed.runs.iter().map(|r| r.len).sum();
            assert_eq!(total, line.chars().count(), "{line}");
        }
    }

    #[test]
    fn test_colorization_error_runs() {
        let calls = Calls::default();
        let mut parser = test_parser(&calls);

        let parsed = parser.parse_string("/ip bogus next");
        assert_eq!(parsed.error, Some(ParseErrorKind::WrongRune));
        // the offending token paints as error, later words stay dim
        assert!(parsed.runs.iter().any(|r| r.object == Object::Error));
        assert_eq!(parsed.runs.last().map(|r| r.object), Some(Object::None));
    }

    #[test]
    fn test_variable_name_colorization() {
        let calls = Calls::default();
        let mut parser = test_parser(&calls);
        let ctx = parser.root_ctx().clone();
        ctx.set_global("known", Binding::Value(Value::Number(1)));

        let parsed = parser.parse_string("$known");
        assert!(parsed
            .runs
            .iter()
            .any(|r| r.object == Object::VariableName));

        let parsed = parser.parse_string("$nope");
        assert!(parsed
            .runs
            .iter()
            .any(|r| r.object == Object::VariableWrongName));
    }

    #[test]
    fn test_declared_name_known_within_line() {
        let calls = Calls::default();
        let mut parser = test_parser(&calls);

        // out-fn pre-registers x at the semicolon, before execution
        let parsed = parser.parse_string("/global name=x value=42; $x");
        assert!(parsed.error.is_none());
        assert!(parsed
            .runs
            .iter()
            .any(|r| r.object == Object::VariableName));
    }
}
