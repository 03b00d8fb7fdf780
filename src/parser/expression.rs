//! Expression Dispatch
//!
//! The five expression variants share one interface: consume a character,
//! close, evaluate, complete. Expressions own their sub-expressions while
//! the driver stack holds references into them, so the shared handle is an
//! `Rc<RefCell<..>>` (the parser core is single-threaded).

use std::cell::RefCell;
use std::rc::Rc;

use super::context::ExecContext;
use super::expr_command::CommandExpression;
use super::expr_list::CommandListExpression;
use super::expr_literal::LiteralExpression;
use super::expr_math::MathExpression;
use super::expr_variable::VariableExpression;
use super::types::{CloseError, Completion, EvalError, Object, ParseErrorKind};
use super::value::Value;

pub type ExprRef = Rc<RefCell<Expression>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpressionKind {
    Literal,
    Command,
    CommandList,
    Math,
    Variable,
}

/// What the driver should do after a character was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Consume the character and stay.
    GoNext,
    /// Re-feed the same character, usually into a new sub-expression.
    Repeat,
    /// Close this expression and re-feed the character to the parent.
    GoOut,
}

/// How the context of a freshly pushed frame derives from the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeDirective {
    Keep,
    Copied,
    New,
}

/// Response of `Expression::add` for one character.
pub struct Step {
    pub action: Action,
    pub object: Object,
    pub expression: Option<ExprRef>,
    pub scope: ScopeDirective,
}

impl Step {
    pub fn next(object: Object) -> Step {
        Step {
            action: Action::GoNext,
            object,
            expression: None,
            scope: ScopeDirective::Keep,
        }
    }

    pub fn repeat(expression: ExprRef) -> Step {
        Step {
            action: Action::Repeat,
            object: Object::None,
            expression: Some(expression),
            scope: ScopeDirective::Keep,
        }
    }

    pub fn out() -> Step {
        Step {
            action: Action::GoOut,
            object: Object::None,
            expression: None,
            scope: ScopeDirective::Keep,
        }
    }

    pub fn with_scope(mut self, scope: ScopeDirective) -> Step {
        self.scope = scope;
        self
    }
}

pub enum Expression {
    Literal(LiteralExpression),
    Command(CommandExpression),
    List(CommandListExpression),
    Math(MathExpression),
    Variable(VariableExpression),
}

impl Expression {
    pub fn literal(strict: bool) -> ExprRef {
        Rc::new(RefCell::new(Expression::Literal(LiteralExpression::new(
            strict,
        ))))
    }

    /// A literal preloaded with a value; used for bindings that carry a
    /// plain value rather than parsed input.
    pub fn literal_value(value: Value) -> ExprRef {
        Rc::new(RefCell::new(Expression::Literal(
            LiteralExpression::with_value(value),
        )))
    }

    pub fn command(ctx: &ExecContext) -> ExprRef {
        Rc::new(RefCell::new(Expression::Command(CommandExpression::new(
            ctx,
        ))))
    }

    pub fn list(root_mode: bool, curly: bool) -> ExprRef {
        Rc::new(RefCell::new(Expression::List(CommandListExpression::new(
            root_mode, curly,
        ))))
    }

    pub fn math() -> ExprRef {
        Rc::new(RefCell::new(Expression::Math(MathExpression::new())))
    }

    pub fn variable(function_mode: bool) -> ExprRef {
        Rc::new(RefCell::new(Expression::Variable(VariableExpression::new(
            function_mode,
        ))))
    }

    pub fn kind(&self) -> ExpressionKind {
        match self {
            Expression::Literal(_) => ExpressionKind::Literal,
            Expression::Command(_) => ExpressionKind::Command,
            Expression::List(_) => ExpressionKind::CommandList,
            Expression::Math(_) => ExpressionKind::Math,
            Expression::Variable(_) => ExpressionKind::Variable,
        }
    }

    pub fn add(&mut self, ctx: &ExecContext, c: char) -> Result<Step, ParseErrorKind> {
        match self {
            Expression::Literal(e) => e.add(ctx, c),
            Expression::Command(e) => e.add(ctx, c),
            Expression::List(e) => e.add(ctx, c),
            Expression::Math(e) => e.add(ctx, c),
            Expression::Variable(e) => e.add(ctx, c),
        }
    }

    pub fn close(&mut self, ctx: &ExecContext) -> Result<(), CloseError> {
        match self {
            Expression::Literal(e) => e.close(ctx),
            Expression::Command(e) => e.close(ctx),
            Expression::List(e) => e.close(ctx),
            Expression::Math(e) => e.close(ctx),
            Expression::Variable(e) => e.close(ctx),
        }
    }

    pub fn value(&self, ctx: &ExecContext) -> Result<Value, EvalError> {
        match self {
            Expression::Literal(e) => e.value(ctx),
            Expression::Command(e) => e.value(ctx),
            Expression::List(e) => e.value(ctx),
            Expression::Math(e) => e.value(ctx),
            Expression::Variable(e) => e.value(ctx),
        }
    }

    pub fn complete(&self, ctx: &ExecContext) -> Option<Completion> {
        match self {
            Expression::Literal(e) => e.complete(ctx),
            Expression::Command(e) => e.complete(ctx),
            Expression::List(e) => e.complete(ctx),
            Expression::Math(e) => e.complete(ctx),
            Expression::Variable(e) => e.complete(ctx),
        }
    }
}
