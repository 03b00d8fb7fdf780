//! Expression Stack
//!
//! Explicit pushdown of (context, expression) frames driving nested
//! parsing; the driver pops the top frame for every character.

use super::context::ExecContext;
use super::expression::ExprRef;

#[derive(Default)]
pub struct ExpressionStack {
    frames: Vec<(ExecContext, ExprRef)>,
}

impl ExpressionStack {
    pub fn new() -> ExpressionStack {
        ExpressionStack { frames: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn push(&mut self, ctx: ExecContext, expression: ExprRef) {
        self.frames.push((ctx, expression));
    }

    pub fn pop(&mut self) -> Option<(ExecContext, ExprRef)> {
        self.frames.pop()
    }
}
