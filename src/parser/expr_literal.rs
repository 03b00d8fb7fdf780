//! Literal Expression
//!
//! Scans one string, number or bool token. In strict mode only the exact
//! words `true` and `false` are accepted, letter by letter; non-strict
//! mode takes any alphanumeric run, and a quoted string may contain
//! spaces. The literal is the null value until it has consumed something.

use super::context::ExecContext;
use super::expression::Step;
use super::types::{CloseError, Completion, EvalError, Object, ParseErrorKind};
use super::value::Value;

pub struct LiteralExpression {
    strict: bool,
    quotes: u8,
    bool_template: &'static str,
    bool_progress: usize,
    value: String,
}

impl LiteralExpression {
    pub fn new(strict: bool) -> LiteralExpression {
        LiteralExpression {
            strict,
            quotes: 0,
            bool_template: "",
            bool_progress: 0,
            value: String::new(),
        }
    }

    pub fn with_value(value: Value) -> LiteralExpression {
        let mut e = LiteralExpression::new(false);
        e.value = value.as_string();
        e
    }

    pub fn add(&mut self, _ctx: &ExecContext, c: char) -> Result<Step, ParseErrorKind> {
        match c {
            c if c.is_ascii_alphabetic() => self.handle_alpha(c),
            c if c.is_ascii_digit() => {
                self.value.push(c);
                Ok(Step::next(Object::Value))
            }
            ' ' => self.handle_space(),
            '"' => self.handle_quote(),
            _ => Ok(Step::out()),
        }
    }

    fn handle_alpha(&mut self, c: char) -> Result<Step, ParseErrorKind> {
        if self.quotes >= 2 {
            return Ok(Step::next(Object::Value));
        }
        if self.quotes == 1 {
            self.value.push(c);
            return Ok(Step::next(Object::QuotedString));
        }
        if !self.strict {
            self.value.push(c);
            return Ok(Step::next(Object::Value));
        }

        // strict mode walks the fixed true/false template
        if self.bool_progress == 0 {
            self.bool_template = match c {
                't' => "true",
                'f' => "false",
                _ => return Err(ParseErrorKind::WrongRune),
            };
            self.bool_progress = 1;
            return Ok(Step::next(Object::Value));
        }
        if self.bool_template.as_bytes().get(self.bool_progress) != Some(&(c as u8)) {
            return Err(ParseErrorKind::WrongRune);
        }
        self.bool_progress += 1;
        if self.bool_progress == self.bool_template.len() {
            self.value.push_str(self.bool_template);
        }
        Ok(Step::next(Object::Value))
    }

    fn handle_space(&mut self) -> Result<Step, ParseErrorKind> {
        if self.quotes == 1 {
            self.value.push(' ');
            return Ok(Step::next(Object::Space));
        }
        if self.value.is_empty() {
            return Err(ParseErrorKind::WrongRune);
        }
        if self.strict && self.bool_progress != self.bool_template.len() {
            return Err(ParseErrorKind::WrongRune);
        }
        Ok(Step::out())
    }

    fn handle_quote(&mut self) -> Result<Step, ParseErrorKind> {
        self.quotes += 1;
        if self.quotes == 2 {
            return Ok(Step::out());
        }
        if !self.value.is_empty() {
            // an opening quote after bare content
            return Err(ParseErrorKind::WrongRune);
        }
        Ok(Step::next(Object::QuotedSymbol))
    }

    pub fn close(&mut self, _ctx: &ExecContext) -> Result<(), CloseError> {
        if self.quotes == 1 {
            return Err(CloseError::unclosed(ParseErrorKind::NotFinished, '"'));
        }
        if self.strict && self.bool_progress != self.bool_template.len() {
            return Err(CloseError::new(ParseErrorKind::WrongRune));
        }
        Ok(())
    }

    pub fn value(&self, _ctx: &ExecContext) -> Result<Value, EvalError> {
        Ok(Value::Text(self.value.clone()))
    }

    /// A literal completes with its terminator.
    pub fn complete(&self, _ctx: &ExecContext) -> Option<Completion> {
        Some(Completion {
            options: Vec::new(),
            merged: " ".to_string(),
        })
    }
}
