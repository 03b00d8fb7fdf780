//! Command Expression
//!
//! Parses one clause: an optional `/` or `:` root selector, a path, a
//! command name, then flags, options and unnamed positional values, ended
//! by `;`, a closing bracket or the end of input. The clause owns a copy
//! of the command's flag trie so that consumed flags stop completing.

use std::rc::Rc;

use super::catalog::{CommandInstance, Flag, Flags};
use super::context::ExecContext;
use super::expression::{Action, Expression, ExprRef, Step};
use super::trie::{CatalogItem, CommandTree};
use super::trie_iterator::TrieIterator;
use super::types::{CloseError, Completion, EvalError, Level, Object, ParseErrorKind};
use super::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommandState {
    Start,
    Path,
    Command,
    Argument,
    Flag,
    FlagEqual,
    FlagValue,
    Option,
}

pub struct CommandExpression {
    iterator: TrieIterator,
    flag_tree: Option<Rc<CommandTree>>,

    set_relative_root: bool,
    state: CommandState,
    prev_char: char,
    started: bool,

    command: Option<CommandInstance>,

    current_flag: Option<Flag>,
    unnamed_position: u32,
    pending: Vec<char>,
    flags: Flags,
    flag_used: bool,

    opened: i32,
    quote_opened: i32,
}

impl CommandExpression {
    pub fn new(ctx: &ExecContext) -> CommandExpression {
        CommandExpression {
            iterator: ctx.command_root().iterator(),
            flag_tree: None,
            set_relative_root: false,
            state: CommandState::Start,
            prev_char: '\0',
            started: false,
            command: None,
            current_flag: None,
            unnamed_position: 0,
            pending: Vec::new(),
            flags: Flags::new(),
            flag_used: false,
            opened: 0,
            quote_opened: 0,
        }
    }

    pub fn add(&mut self, ctx: &ExecContext, c: char) -> Result<Step, ParseErrorKind> {
        let step = match c {
            '/' => self.handle_slash(ctx),
            ':' => self.handle_colon(ctx),
            ' ' => self.handle_space(ctx),
            ';' => self.handle_semicolon(ctx),
            '=' => self.handle_equal(),
            'a'..='z' => self.handle_lower_alpha(ctx, c),
            '0'..='9' => self.handle_digit(ctx),
            '"' => self.handle_quote(ctx),
            '$' => self.handle_variable(ctx),
            '[' | ']' | '{' | '}' => self.handle_list(ctx, c),
            '(' | ')' => self.handle_math(ctx, c),
            _ => Err(ParseErrorKind::WrongRune),
        }?;

        if !((step.action == Action::Repeat || step.action == Action::GoOut) && c == ' ') {
            self.prev_char = c;
        }
        Ok(step)
    }

    fn handle_slash(&mut self, ctx: &ExecContext) -> Result<Step, ParseErrorKind> {
        if self.state != CommandState::Start || self.started {
            return Err(ParseErrorKind::WrongRune);
        }
        // absolute root, for this clause only
        self.iterator = ctx.command_tree().iterator();
        self.started = true;
        Ok(Step::next(Object::Path))
    }

    fn handle_colon(&mut self, ctx: &ExecContext) -> Result<Step, ParseErrorKind> {
        if self.state != CommandState::Start || self.started {
            return Err(ParseErrorKind::WrongRune);
        }
        // relative to the persisted root; the resolved path is persisted
        // back on clause close
        self.iterator = ctx.command_root().iterator();
        self.set_relative_root = true;
        self.started = true;
        Ok(Step::next(Object::Path))
    }

    fn handle_space(&mut self, ctx: &ExecContext) -> Result<Step, ParseErrorKind> {
        if self.prev_char == ' ' {
            return Ok(Step::next(Object::Space));
        }
        match self.state {
            CommandState::Path => {
                if !self.iterator.go_to_end() {
                    return Err(ParseErrorKind::WrongRune);
                }
                let next_tree = self.iterator.next_tree().ok_or(ParseErrorKind::Panic)?;
                self.iterator = next_tree.iterator();
                self.state = CommandState::Start;
                Ok(Step::next(Object::Space))
            }
            CommandState::Command => {
                if !self.iterator.go_to_end() {
                    return Err(ParseErrorKind::WrongRune);
                }
                self.instantiate_command()?;
                self.state = CommandState::Argument;
                Ok(Step::next(Object::Space))
            }
            CommandState::Flag => self.unnamed_fallback(ctx, Expression::literal(false)),
            CommandState::FlagValue => {
                self.commit_flag(true);
                Ok(Step::next(Object::Space))
            }
            CommandState::Option => {
                self.commit_option()?;
                Ok(Step::next(Object::Space))
            }
            CommandState::FlagEqual => Err(ParseErrorKind::WrongRune),
            CommandState::Start | CommandState::Argument => Ok(Step::next(Object::Space)),
        }
    }

    fn handle_semicolon(&mut self, ctx: &ExecContext) -> Result<Step, ParseErrorKind> {
        match self.state {
            CommandState::Path | CommandState::Command => {
                if !self.iterator.go_to_end() {
                    return Err(ParseErrorKind::WrongRune);
                }
                if self.state == CommandState::Command {
                    self.instantiate_command()?;
                }
            }
            CommandState::FlagValue => self.commit_flag(false),
            CommandState::Option => self.commit_option()?,
            _ => {}
        }
        Ok(self.go_out(ctx))
    }

    fn handle_equal(&mut self) -> Result<Step, ParseErrorKind> {
        if !self.iterator.go_to_end() {
            return Err(ParseErrorKind::WrongRune);
        }
        if self.iterator.level() != Some(Level::Flag) {
            return Err(ParseErrorKind::WrongRune);
        }
        if self.state != CommandState::Flag {
            return Err(ParseErrorKind::WrongRune);
        }
        let payload = self.iterator.payload().ok_or(ParseErrorKind::WrongPayload)?;
        let flag = match payload.item {
            Some(CatalogItem::Flag(f)) => f,
            _ => return Err(ParseErrorKind::WrongPayload),
        };
        self.current_flag = Some(flag.template_copy());
        let tree = self.flag_tree.as_ref().ok_or(ParseErrorKind::Panic)?;
        self.iterator = tree.iterator();
        self.state = CommandState::FlagEqual;
        self.flag_used = true;
        Ok(Step::next(Object::EqualSymbol))
    }

    fn handle_lower_alpha(&mut self, ctx: &ExecContext, c: char) -> Result<Step, ParseErrorKind> {
        match self.state {
            CommandState::Start => {
                if !self.iterator.go_next(c) {
                    return Err(ParseErrorKind::WrongRune);
                }
                let options = self.iterator.next_options();
                if options.level == Some(Level::Command) {
                    self.state = CommandState::Command;
                    Ok(Step::next(Object::Command))
                } else {
                    self.state = CommandState::Path;
                    Ok(Step::next(Object::Path))
                }
            }
            CommandState::Path => {
                if !self.iterator.go_next(c) {
                    return Err(ParseErrorKind::WrongRune);
                }
                Ok(Step::next(Object::Path))
            }
            CommandState::Command => {
                if !self.iterator.go_next(c) {
                    return Err(ParseErrorKind::WrongRune);
                }
                Ok(Step::next(Object::Command))
            }
            CommandState::Argument => {
                if self.prev_char == ' ' {
                    self.unnamed_position += 1;
                }
                let options = self.iterator.next_options();
                if options.options.is_empty() || !self.iterator.go_next(c) {
                    return self.unnamed_fallback(ctx, Expression::literal(false));
                }
                self.pending.push(c);
                match options.level {
                    Some(Level::Flag) => {
                        self.state = CommandState::Flag;
                        Ok(Step::next(Object::OptionalFlag))
                    }
                    Some(Level::Option) => {
                        self.state = CommandState::Option;
                        Ok(Step::next(Object::Option))
                    }
                    _ => Ok(Step::next(Object::Unknown)),
                }
            }
            CommandState::Flag => {
                if !self.iterator.go_next(c) {
                    return self.unnamed_fallback(ctx, Expression::literal(false));
                }
                self.pending.push(c);
                Ok(Step::next(Object::OptionalFlag))
            }
            CommandState::Option => {
                if !self.iterator.go_next(c) {
                    return self.unnamed_fallback(ctx, Expression::literal(false));
                }
                self.pending.push(c);
                Ok(Step::next(Object::Option))
            }
            CommandState::FlagEqual => {
                self.state = CommandState::FlagValue;
                self.bind_flag(Expression::literal(false))
            }
            CommandState::FlagValue => Err(ParseErrorKind::WrongRune),
        }
    }

    fn handle_digit(&mut self, ctx: &ExecContext) -> Result<Step, ParseErrorKind> {
        match self.state {
            CommandState::Argument => {
                if self.prev_char == ' ' {
                    self.unnamed_position += 1;
                }
                self.unnamed_fallback(ctx, Expression::literal(false))
            }
            CommandState::FlagEqual => {
                let flag = self.current_flag.as_ref().ok_or(ParseErrorKind::Panic)?;
                if !flag.value_type.accepts_number() {
                    return Err(ParseErrorKind::WrongRune);
                }
                self.state = CommandState::FlagValue;
                self.bind_flag(Expression::literal(false))
            }
            _ => Err(ParseErrorKind::WrongRune),
        }
    }

    fn handle_quote(&mut self, ctx: &ExecContext) -> Result<Step, ParseErrorKind> {
        match self.state {
            CommandState::Argument => {
                if self.prev_char == ' ' {
                    self.unnamed_position += 1;
                }
                self.quote_opened += 1;
                self.unnamed_fallback(ctx, Expression::literal(false))
            }
            CommandState::FlagEqual => {
                self.state = CommandState::FlagValue;
                self.quote_opened += 1;
                self.bind_flag(Expression::literal(false))
            }
            CommandState::FlagValue => {
                if self.quote_opened <= 0 {
                    return Err(ParseErrorKind::WrongRune);
                }
                self.quote_opened -= 1;
                Ok(Step::next(Object::QuotedSymbol))
            }
            _ => Err(ParseErrorKind::WrongRune),
        }
    }

    fn handle_variable(&mut self, ctx: &ExecContext) -> Result<Step, ParseErrorKind> {
        match self.state {
            CommandState::Argument => {
                if self.prev_char == ' ' {
                    self.unnamed_position += 1;
                }
                self.unnamed_fallback(ctx, Expression::variable(false))
            }
            CommandState::FlagEqual => {
                self.state = CommandState::FlagValue;
                self.bind_flag(Expression::variable(false))
            }
            _ => Err(ParseErrorKind::WrongRune),
        }
    }

    fn handle_list(&mut self, ctx: &ExecContext, c: char) -> Result<Step, ParseErrorKind> {
        match c {
            '[' | '{' => {
                let curly = c == '{';
                match self.state {
                    CommandState::Argument => {
                        if self.prev_char == ' ' {
                            self.unnamed_position += 1;
                        }
                        self.opened += 1;
                        self.unnamed_fallback(ctx, Expression::list(false, curly))
                    }
                    CommandState::FlagEqual => {
                        self.state = CommandState::FlagValue;
                        self.opened += 1;
                        self.bind_flag(Expression::list(false, curly))
                    }
                    _ => Err(ParseErrorKind::WrongRune),
                }
            }
            _ => self.handle_closer(ctx, Object::SquareBrackets),
        }
    }

    fn handle_math(&mut self, ctx: &ExecContext, c: char) -> Result<Step, ParseErrorKind> {
        match c {
            '(' => match self.state {
                CommandState::Argument => {
                    if self.prev_char == ' ' {
                        self.unnamed_position += 1;
                    }
                    self.opened += 1;
                    self.unnamed_fallback(ctx, Expression::math())
                }
                CommandState::FlagEqual => {
                    self.state = CommandState::FlagValue;
                    self.opened += 1;
                    self.bind_flag(Expression::math())
                }
                _ => Err(ParseErrorKind::WrongRune),
            },
            _ => self.handle_closer(ctx, Object::RoundBrackets),
        }
    }

    /// A closing bracket either commits the pending value and is consumed
    /// (an inner expression's closer), or closes the whole clause when no
    /// opener of ours is outstanding.
    fn handle_closer(&mut self, ctx: &ExecContext, object: Object) -> Result<Step, ParseErrorKind> {
        match self.state {
            CommandState::FlagValue => self.commit_flag(true),
            CommandState::Option => self.commit_option()?,
            _ => {}
        }
        if self.opened == 0 {
            return Ok(self.go_out(ctx));
        }
        Ok(Step::next(object))
    }

    fn instantiate_command(&mut self) -> Result<(), ParseErrorKind> {
        let payload = self.iterator.payload().ok_or(ParseErrorKind::WrongPayload)?;
        let command = match payload.item {
            Some(CatalogItem::Command(c)) => c,
            _ => return Err(ParseErrorKind::WrongPayload),
        };
        let subtree = payload.subtree.ok_or(ParseErrorKind::Panic)?;
        let flag_tree = Rc::new(subtree.copy());
        self.command = Some(CommandInstance::new(command));
        self.iterator = flag_tree.iterator();
        self.flag_tree = Some(flag_tree);
        Ok(())
    }

    fn commit_flag(&mut self, reset: bool) {
        if let Some(flag) = self.current_flag.take() {
            let name = flag.name.clone();
            self.flags.insert(name.clone(), flag);
            if reset {
                if let Some(tree) = &self.flag_tree {
                    tree.mark_used(&name);
                    self.iterator = tree.iterator();
                }
            }
        }
        self.pending.clear();
        self.state = CommandState::Argument;
    }

    fn commit_option(&mut self) -> Result<(), ParseErrorKind> {
        if !self.iterator.go_to_end() {
            return Err(ParseErrorKind::WrongRune);
        }
        let name = self.iterator.key();
        let command = self.command.as_mut().ok_or(ParseErrorKind::Panic)?;
        command.set_option(&name);
        if let Some(tree) = &self.flag_tree {
            tree.mark_used(&name);
            self.iterator = tree.iterator();
        }
        self.pending.clear();
        self.state = CommandState::Argument;
        Ok(())
    }

    /// An argument that no flag or option name matches is matched against
    /// the command's unnamed positions; buffered characters are replayed
    /// into the freshly bound value expression.
    fn unnamed_fallback(
        &mut self,
        ctx: &ExecContext,
        expr: ExprRef,
    ) -> Result<Step, ParseErrorKind> {
        if self.flag_used {
            return Err(ParseErrorKind::WrongRune);
        }
        let command = self.command.as_ref().ok_or(ParseErrorKind::WrongRune)?;
        let template = command
            .def()
            .unnamed_flag(self.unnamed_position)
            .ok_or(ParseErrorKind::WrongRune)?;

        let mut flag = template.template_copy();
        flag.bind(Rc::clone(&expr));

        let pending = std::mem::take(&mut self.pending);
        for pc in pending {
            let _ = expr.borrow_mut().add(ctx, pc);
        }

        self.current_flag = Some(flag);
        self.state = CommandState::FlagValue;
        Ok(Step::repeat(expr))
    }

    fn bind_flag(&mut self, expr: ExprRef) -> Result<Step, ParseErrorKind> {
        let flag = self.current_flag.as_mut().ok_or(ParseErrorKind::Panic)?;
        flag.bind(Rc::clone(&expr));
        Ok(Step::repeat(expr))
    }

    fn go_out(&mut self, ctx: &ExecContext) -> Step {
        if let Some(command) = &self.command {
            command.out(ctx, &self.flags);
        }
        Step::out()
    }

    pub fn close(&mut self, ctx: &ExecContext) -> Result<(), CloseError> {
        match self.state {
            CommandState::Start => {
                if !self.set_relative_root {
                    ctx.set_command_root(ctx.command_tree());
                }
                Ok(())
            }
            CommandState::Path => {
                if !self.iterator.go_to_end() {
                    return Err(CloseError::new(ParseErrorKind::WrongRune));
                }
                let resolved = self
                    .iterator
                    .next_tree()
                    .ok_or(CloseError::new(ParseErrorKind::Panic))?;
                ctx.set_command_root(resolved);
                Ok(())
            }
            CommandState::Command => {
                if self.command.is_none() {
                    if !self.iterator.go_to_end() {
                        return Err(CloseError::new(ParseErrorKind::WrongPayload));
                    }
                    self.instantiate_command().map_err(CloseError::new)?;
                }
                Ok(())
            }
            CommandState::FlagValue => {
                self.commit_flag(false);
                Ok(())
            }
            CommandState::Option => self.commit_option().map_err(CloseError::new),
            CommandState::FlagEqual | CommandState::Flag => {
                Err(CloseError::new(ParseErrorKind::NotFinished))
            }
            CommandState::Argument => Ok(()),
        }
    }

    pub fn value(&self, ctx: &ExecContext) -> Result<Value, EvalError> {
        match self.state {
            CommandState::Start | CommandState::Path => Ok(Value::null()),
            _ => match &self.command {
                None => Ok(Value::null()),
                Some(command) => command.exec(ctx, &self.flags),
            },
        }
    }

    pub fn complete(&self, _ctx: &ExecContext) -> Option<Completion> {
        if self.state == CommandState::FlagEqual {
            return None;
        }
        let opts = self.iterator.next_options();
        Some(Completion {
            options: opts.options,
            merged: opts.merged,
        })
    }
}
