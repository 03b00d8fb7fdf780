//! Math Expression
//!
//! Consumes a parenthesized arithmetic / comparison / concatenation
//! expression one character at a time and grows the math tree as tokens
//! finish. Operands are strict literals, quoted strings, variables,
//! bracketed command lists and nested parentheses.

use std::rc::Rc;

use super::context::ExecContext;
use super::expression::{Expression, ExprRef, Step};
use super::math_tree::{MathItem, MathTree, Operator};
use super::types::{CloseError, Completion, EvalError, Object, ParseErrorKind};
use super::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MathState {
    None,
    OpAfterNone,
    OpNotAfterExpression,
    OpNotAfterFinished,
    OpFinished,
    OpNotFinished,
    InExpression,
}

pub struct MathExpression {
    state: MathState,
    tree: MathTree,
    last_expression: Option<ExprRef>,
    last_operator: Option<Operator>,
    quote_open: bool,
    // a nested parenthesis was pushed; its closer is consumed here
    child_paren: bool,
    parens_open: i32,
    lists_open: i32,
    prev_char: char,
}

impl MathExpression {
    pub fn new() -> MathExpression {
        MathExpression {
            state: MathState::None,
            tree: MathTree::new(),
            last_expression: None,
            last_operator: None,
            quote_open: false,
            child_paren: false,
            parens_open: 0,
            lists_open: 0,
            prev_char: '\0',
        }
    }

    pub fn add(&mut self, ctx: &ExecContext, c: char) -> Result<Step, ParseErrorKind> {
        let step = match c {
            ' ' => self.handle_space(),
            c if c.is_ascii_alphanumeric() => self.handle_operand(Expression::literal(true)),
            '"' => self.handle_quote(ctx),
            '!' => self.handle_unary(),
            '.' | '+' | '-' | '/' | '*' => self.handle_operator(c),
            '>' | '<' | '=' => self.handle_compare(c),
            '(' => self.handle_open_paren(),
            ')' => self.handle_close_paren(),
            '[' | ']' => self.handle_list(c),
            '$' => self.handle_operand(Expression::variable(false)),
            _ => Err(ParseErrorKind::WrongRune),
        }?;
        self.prev_char = c;
        Ok(step)
    }

    fn push_last_operator(&mut self) {
        if let Some(op) = self.last_operator {
            self.tree.add(MathItem::Operator(op));
        }
    }

    fn push_last_expression(&mut self) {
        if let Some(e) = &self.last_expression {
            self.tree.add(MathItem::Operand(Rc::clone(e)));
        }
    }

    fn handle_space(&mut self) -> Result<Step, ParseErrorKind> {
        if self.state == MathState::OpNotFinished {
            self.state = MathState::OpFinished;
        }
        Ok(Step::next(Object::Space))
    }

    /// A new operand token: a strict literal, a variable, or anything
    /// else that evaluates to a value.
    fn handle_operand(&mut self, expr: ExprRef) -> Result<Step, ParseErrorKind> {
        if self.state == MathState::InExpression || self.state == MathState::OpNotAfterExpression {
            return Err(ParseErrorKind::WrongRune);
        }
        if self.state != MathState::None {
            self.push_last_operator();
        }
        self.state = MathState::InExpression;
        self.last_expression = Some(Rc::clone(&expr));
        Ok(Step::repeat(expr))
    }

    fn handle_quote(&mut self, ctx: &ExecContext) -> Result<Step, ParseErrorKind> {
        if !self.quote_open {
            if self.state == MathState::InExpression
                || self.state == MathState::OpNotAfterExpression
            {
                return Err(ParseErrorKind::WrongRune);
            }
            if self.state != MathState::None {
                self.push_last_operator();
            }
            self.state = MathState::InExpression;
            self.quote_open = true;
            let expr = Expression::literal(false);
            self.last_expression = Some(Rc::clone(&expr));
            return Ok(Step::repeat(expr));
        }
        // the closing quote handed back by the literal
        if let Some(e) = &self.last_expression {
            let _ = e.borrow_mut().close(ctx);
        }
        self.quote_open = false;
        Ok(Step::next(Object::QuotedSymbol))
    }

    fn handle_unary(&mut self) -> Result<Step, ParseErrorKind> {
        match self.state {
            MathState::None => self.state = MathState::OpAfterNone,
            MathState::InExpression => {
                self.state = MathState::OpNotAfterExpression;
                self.push_last_expression();
            }
            MathState::OpFinished => {
                self.state = MathState::OpNotAfterFinished;
                self.push_last_operator();
            }
            _ => self.push_last_operator(),
        }
        self.last_operator = Some(Operator::Not);
        Ok(Step::next(Object::Operator))
    }

    fn handle_operator(&mut self, c: char) -> Result<Step, ParseErrorKind> {
        match self.state {
            MathState::None => {
                if c == '+' || c == '-' {
                    self.state = MathState::OpAfterNone;
                } else {
                    return Err(ParseErrorKind::WrongRune);
                }
            }
            MathState::OpFinished => {
                if c == '+' || c == '-' {
                    self.push_last_operator();
                } else {
                    return Err(ParseErrorKind::WrongRune);
                }
            }
            MathState::InExpression => {
                self.state = MathState::OpFinished;
                self.push_last_expression();
            }
            _ => return Err(ParseErrorKind::WrongRune),
        }
        self.last_operator = Some(match c {
            '+' => Operator::Plus,
            '-' => Operator::Minus,
            '.' => Operator::Concatenate,
            '/' => Operator::Divide,
            _ => Operator::Multiply,
        });
        Ok(Step::next(Object::Operator))
    }

    fn handle_compare(&mut self, c: char) -> Result<Step, ParseErrorKind> {
        match self.state {
            MathState::OpNotAfterExpression => {
                if c != '=' || self.prev_char == ' ' {
                    return Err(ParseErrorKind::WrongRune);
                }
                self.last_operator = Some(Operator::NotEqual);
                self.state = MathState::OpFinished;
            }
            MathState::OpNotFinished => {
                if c != '=' || self.prev_char == ' ' {
                    return Err(ParseErrorKind::WrongRune);
                }
                self.last_operator = match self.last_operator {
                    Some(Operator::Less) => Some(Operator::LessOrEqual),
                    Some(Operator::Greater) => Some(Operator::GreaterOrEqual),
                    _ => return Err(ParseErrorKind::WrongRune),
                };
                self.state = MathState::OpFinished;
            }
            MathState::InExpression => {
                self.last_operator = Some(match c {
                    '>' => {
                        self.state = MathState::OpNotFinished;
                        Operator::Greater
                    }
                    '<' => {
                        self.state = MathState::OpNotFinished;
                        Operator::Less
                    }
                    _ => {
                        self.state = MathState::OpFinished;
                        Operator::Equal
                    }
                });
                self.push_last_expression();
            }
            _ => return Err(ParseErrorKind::WrongRune),
        }
        Ok(Step::next(Object::Operator))
    }

    fn handle_open_paren(&mut self) -> Result<Step, ParseErrorKind> {
        if self.state == MathState::InExpression || self.state == MathState::OpNotAfterExpression {
            return Err(ParseErrorKind::WrongRune);
        }
        self.parens_open += 1;
        if self.parens_open == 1 {
            // our own opener, re-fed by whoever created us
            return Ok(Step::next(Object::RoundBrackets));
        }
        if self.state != MathState::None {
            self.push_last_operator();
        }
        self.state = MathState::InExpression;
        self.child_paren = true;
        let expr = Expression::math();
        self.last_expression = Some(Rc::clone(&expr));
        Ok(Step::repeat(expr))
    }

    fn handle_close_paren(&mut self) -> Result<Step, ParseErrorKind> {
        if self.state != MathState::None && self.state != MathState::InExpression {
            return Err(ParseErrorKind::WrongRune);
        }
        self.parens_open -= 1;
        if self.child_paren {
            self.child_paren = false;
            return Ok(Step::next(Object::RoundBrackets));
        }
        Ok(Step::out())
    }

    fn handle_list(&mut self, c: char) -> Result<Step, ParseErrorKind> {
        if c == '[' {
            if self.state == MathState::InExpression
                || self.state == MathState::OpNotAfterExpression
            {
                return Err(ParseErrorKind::WrongRune);
            }
            if self.state != MathState::None {
                self.push_last_operator();
            }
            self.lists_open += 1;
            self.state = MathState::InExpression;
            let expr = Expression::list(false, false);
            self.last_expression = Some(Rc::clone(&expr));
            return Ok(Step::repeat(expr));
        }
        if self.lists_open <= 0 {
            return Err(ParseErrorKind::WrongRune);
        }
        self.lists_open -= 1;
        Ok(Step::next(Object::SquareBrackets))
    }

    pub fn close(&mut self, _ctx: &ExecContext) -> Result<(), CloseError> {
        if self.state != MathState::InExpression {
            return Err(CloseError::new(ParseErrorKind::NotFinished));
        }
        self.push_last_expression();
        if self.parens_open > 0 {
            return Err(CloseError::unclosed(ParseErrorKind::NotFinished, '('));
        }
        Ok(())
    }

    pub fn value(&self, ctx: &ExecContext) -> Result<Value, EvalError> {
        self.tree.value(ctx)
    }

    pub fn complete(&self, _ctx: &ExecContext) -> Option<Completion> {
        None
    }
}

impl Default for MathExpression {
    fn default() -> Self {
        Self::new()
    }
}
