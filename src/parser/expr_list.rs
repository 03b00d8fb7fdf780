//! Command List Expression
//!
//! A sequence of clauses separated by `;`, surrounded by `[` (copied
//! scope) or `{` (fresh locals). The implicit top-level program is a
//! root-mode list that needs no surrounding brackets. The list's value is
//! the value of its last expression; an inner error short-circuits.

use std::collections::HashMap;
use std::rc::Rc;

use super::context::ExecContext;
use super::expr_command::CommandExpression;
use super::expression::{Expression, ExprRef, ScopeDirective, Step};
use super::types::{CloseError, Completion, EvalError, Object, ParseErrorKind};
use super::value::Value;

pub struct CommandListExpression {
    expressions: Vec<ExprRef>,
    inner: Option<ExprRef>,
    root_mode: bool,
    list_char: char,
    open_counts: HashMap<char, i32>,
    closed: bool,
}

impl CommandListExpression {
    pub fn new(root_mode: bool, curly: bool) -> CommandListExpression {
        let list_char = if curly { '{' } else { '[' };
        let mut open_counts = HashMap::new();
        if root_mode {
            // the implicit program behaves as if its opener was consumed
            open_counts.insert(list_char, 1);
        }
        CommandListExpression {
            expressions: Vec::new(),
            inner: None,
            root_mode,
            list_char,
            open_counts,
            closed: false,
        }
    }

    pub fn add(&mut self, ctx: &ExecContext, c: char) -> Result<Step, ParseErrorKind> {
        match c {
            ';' => {
                let inner = match self.inner.take() {
                    None => return Ok(Step::next(Object::Operator)),
                    Some(inner) => inner,
                };
                let _ = inner.borrow_mut().close(ctx);
                self.expressions.push(inner);
                Ok(Step::next(Object::Operator))
            }
            '/' | ':' => self.enter_command(ctx),
            c if c.is_ascii_lowercase() => self.enter_command(ctx),
            ' ' => Ok(Step::next(Object::Space)),
            '$' => {
                let expr = Expression::variable(true);
                self.inner = Some(Rc::clone(&expr));
                Ok(Step::repeat(expr))
            }
            '[' | '{' | '(' => self.open_char(c),
            ']' | '}' | ')' => self.close_char(c),
            _ => Err(ParseErrorKind::WrongRune),
        }
    }

    fn enter_command(&mut self, ctx: &ExecContext) -> Result<Step, ParseErrorKind> {
        let inner = match &self.inner {
            Some(inner) => Rc::clone(inner),
            None => {
                let expr = Expression::command(ctx);
                self.inner = Some(Rc::clone(&expr));
                expr
            }
        };
        Ok(Step::repeat(inner))
    }

    fn count(&self, c: char) -> i32 {
        self.open_counts.get(&c).copied().unwrap_or(0)
    }

    fn open_char(&mut self, c: char) -> Result<Step, ParseErrorKind> {
        if self.count(c) > 0 || self.list_char != c {
            // a nested expression
            let (expr, scope) = match c {
                '[' => (Expression::list(false, false), ScopeDirective::Copied),
                '{' => (Expression::list(false, true), ScopeDirective::New),
                _ => (Expression::math(), ScopeDirective::Keep),
            };
            self.inner = Some(Rc::clone(&expr));
            *self.open_counts.entry(c).or_insert(0) += 1;
            return Ok(Step::repeat(expr).with_scope(scope));
        }
        // our own opener, re-fed by whoever created us
        *self.open_counts.entry(c).or_insert(0) += 1;
        Ok(Step::next(bracket_object(c)))
    }

    fn close_char(&mut self, c: char) -> Result<Step, ParseErrorKind> {
        let opener = match c {
            ']' => '[',
            '}' => '{',
            _ => '(',
        };
        let count = self.count(opener);

        if self.list_char != opener && count != 1 {
            return Err(ParseErrorKind::WrongRune);
        }
        if self.list_char == opener && count < 1 {
            return Err(ParseErrorKind::WrongRune);
        }
        if self.root_mode && self.list_char == opener && count == 1 {
            return Err(ParseErrorKind::WrongRune);
        }

        if let Some(inner) = self.inner.take() {
            self.expressions.push(inner);
        }
        let count = count - 1;
        self.open_counts.insert(opener, count);

        if self.list_char != opener || count == 1 {
            // a child's closer, consumed here
            return Ok(Step::next(bracket_object(opener)));
        }
        self.closed = true;
        Ok(Step::out())
    }

    pub fn close(&mut self, _ctx: &ExecContext) -> Result<(), CloseError> {
        for opener in ['[', '{', '('] {
            let n = self.count(opener);
            if n <= 0 || (self.root_mode && n == 1) {
                continue;
            }
            return Err(CloseError::unclosed(ParseErrorKind::NotFinished, opener));
        }
        if !self.closed {
            if let Some(inner) = self.inner.take() {
                self.expressions.push(inner);
            }
        }
        self.closed = true;
        Ok(())
    }

    pub fn value(&self, ctx: &ExecContext) -> Result<Value, EvalError> {
        let scope = if self.list_char == '{' {
            ctx.new_scope()
        } else {
            ctx.clone()
        };
        let mut value = Value::null();
        for e in &self.expressions {
            value = e.borrow().value(&scope)?;
        }
        Ok(value)
    }

    /// Mid-clause completion is the inner expression's business; an empty
    /// list completes like a fresh command.
    pub fn complete(&self, ctx: &ExecContext) -> Option<Completion> {
        match &self.inner {
            Some(inner) => inner.borrow().complete(ctx),
            None => CommandExpression::new(ctx).complete(ctx),
        }
    }
}

fn bracket_object(opener: char) -> Object {
    match opener {
        '{' | '}' => Object::CurlyBrackets,
        '(' | ')' => Object::RoundBrackets,
        _ => Object::SquareBrackets,
    }
}
