//! Variable Expression
//!
//! Two forms: `$name` reads a binding, and in function mode (a variable
//! standing alone inside a command list) `$name arg=expr ...` calls the
//! binding as a function, with each argument bound as a local of a fresh
//! child scope. While the name is typed it colorizes as a wrong name
//! until the accumulated prefix matches a defined variable.

use std::rc::Rc;

use super::context::ExecContext;
use super::expression::{Expression, ExprRef, Step};
use super::types::{CloseError, Completion, EvalError, Object, ParseErrorKind};
use super::value::Value;
use super::variables::{Binding, VariableIterator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VarState {
    Start,
    Name,
    Argument,
    ArgName,
    ArgValue,
}

struct VarArgument {
    name: String,
    expression: Option<ExprRef>,
}

pub struct VariableExpression {
    name: String,
    state: VarState,
    iterator: Option<VariableIterator>,
    arguments: Vec<VarArgument>,
    current: Option<VarArgument>,
    lists_open: u32,
    maths_open: u32,
    function_mode: bool,
}

impl VariableExpression {
    pub fn new(function_mode: bool) -> VariableExpression {
        VariableExpression {
            name: String::new(),
            state: VarState::Start,
            iterator: None,
            arguments: Vec::new(),
            current: None,
            lists_open: 0,
            maths_open: 0,
            function_mode,
        }
    }

    pub fn add(&mut self, ctx: &ExecContext, c: char) -> Result<Step, ParseErrorKind> {
        match c {
            '$' => self.handle_sigil(ctx),
            c if c.is_ascii_alphanumeric() => self.handle_alpha(ctx, c),
            '=' => self.handle_equal(),
            '[' | ']' => self.handle_list(c),
            '(' | ')' => self.handle_math(c),
            ' ' => self.handle_space(),
            _ => Ok(Step::out()),
        }
    }

    fn handle_sigil(&mut self, ctx: &ExecContext) -> Result<Step, ParseErrorKind> {
        if self.state == VarState::ArgValue {
            let expr = Expression::variable(false);
            if let Some(arg) = &mut self.current {
                arg.expression = Some(Rc::clone(&expr));
            }
            return Ok(Step::repeat(expr));
        }
        if self.state != VarState::Start {
            return Err(ParseErrorKind::WrongRune);
        }
        self.iterator = Some(VariableIterator::new(ctx.variables()));
        self.state = VarState::Name;
        Ok(Step::next(Object::VariableSymbol))
    }

    fn handle_alpha(&mut self, ctx: &ExecContext, c: char) -> Result<Step, ParseErrorKind> {
        match self.state {
            VarState::Name => {
                self.name.push(c);
                if let Some(it) = &mut self.iterator {
                    it.next(c);
                }
                let object = if ctx.variable_exists(&self.name) {
                    Object::VariableName
                } else {
                    Object::VariableWrongName
                };
                Ok(Step::next(object))
            }
            VarState::Argument | VarState::ArgName => {
                if let Some(arg) = &mut self.current {
                    arg.name.push(c);
                }
                self.state = VarState::ArgName;
                Ok(Step::next(Object::VariableName))
            }
            VarState::ArgValue => {
                let expr = Expression::literal(false);
                if let Some(arg) = &mut self.current {
                    arg.expression = Some(Rc::clone(&expr));
                }
                Ok(Step::repeat(expr))
            }
            _ => Err(ParseErrorKind::WrongRune),
        }
    }

    fn handle_equal(&mut self) -> Result<Step, ParseErrorKind> {
        if self.state != VarState::ArgName {
            return Err(ParseErrorKind::WrongRune);
        }
        self.state = VarState::ArgValue;
        Ok(Step::next(Object::EqualSymbol))
    }

    fn handle_list(&mut self, c: char) -> Result<Step, ParseErrorKind> {
        if c == '[' {
            if self.state != VarState::ArgValue {
                return Err(ParseErrorKind::WrongRune);
            }
            self.lists_open += 1;
            let expr = Expression::list(false, false);
            if let Some(arg) = &mut self.current {
                arg.expression = Some(Rc::clone(&expr));
            }
            return Ok(Step::repeat(expr));
        }
        if self.lists_open == 0 {
            return Ok(Step::out());
        }
        self.lists_open -= 1;
        Ok(Step::next(Object::SquareBrackets))
    }

    fn handle_math(&mut self, c: char) -> Result<Step, ParseErrorKind> {
        if c == '(' {
            if self.state != VarState::ArgValue {
                return Err(ParseErrorKind::WrongRune);
            }
            self.maths_open += 1;
            let expr = Expression::math();
            if let Some(arg) = &mut self.current {
                arg.expression = Some(Rc::clone(&expr));
            }
            return Ok(Step::repeat(expr));
        }
        if self.maths_open == 0 {
            return Ok(Step::out());
        }
        self.maths_open -= 1;
        Ok(Step::next(Object::RoundBrackets))
    }

    fn handle_space(&mut self) -> Result<Step, ParseErrorKind> {
        if !self.function_mode {
            return Ok(Step::out());
        }
        match self.state {
            VarState::Name | VarState::ArgValue => {
                if let Some(arg) = self.current.take() {
                    self.arguments.push(arg);
                }
                self.current = Some(VarArgument {
                    name: String::new(),
                    expression: None,
                });
                self.state = VarState::Argument;
                Ok(Step::next(Object::Space))
            }
            VarState::Argument => Ok(Step::next(Object::Space)),
            _ => Err(ParseErrorKind::WrongRune),
        }
    }

    pub fn close(&mut self, _ctx: &ExecContext) -> Result<(), CloseError> {
        if self.name.is_empty() {
            return Err(CloseError::new(ParseErrorKind::NotFinished));
        }
        if self.state == VarState::ArgValue {
            if let Some(arg) = self.current.take() {
                self.arguments.push(arg);
            }
        }
        Ok(())
    }

    pub fn value(&self, ctx: &ExecContext) -> Result<Value, EvalError> {
        if self.iterator.is_none() {
            return Ok(Value::null());
        }
        let binding = ctx.variables().borrow().get(&self.name);
        match binding {
            None => Ok(Value::null()),
            Some(Binding::Value(v)) => Ok(v),
            Some(Binding::Callable(callable)) => {
                if self.function_mode {
                    let inner = ctx.new_scope();
                    for arg in &self.arguments {
                        let payload = match &arg.expression {
                            Some(e) => Binding::Callable(Rc::clone(e)),
                            None => Binding::Value(Value::null()),
                        };
                        inner.set_local(&arg.name, payload);
                    }
                    callable.borrow().value(&inner)
                } else {
                    callable.borrow().value(ctx)
                }
            }
        }
    }

    pub fn complete(&self, _ctx: &ExecContext) -> Option<Completion> {
        if self.state != VarState::Name {
            return None;
        }
        self.iterator.as_ref().map(|it| it.next_options())
    }
}
