//! Command Catalog
//!
//! The embedder hands the parser an ordered list of command records; the
//! builder turns them into the nested catalog trie: path nodes own the
//! next level's sub-tree, command nodes own their flag/option trie.
//! Flags in the catalog are templates; every invocation copies the flag
//! before binding the parsed value expression.

use std::rc::Rc;

use indexmap::IndexMap;

use super::context::ExecContext;
use super::expression::{ExpressionKind, ExprRef};
use super::trie::{CatalogItem, CommandTree, Payload};
use super::types::{CatalogError, EvalError, Level};
use super::value::Value;
use super::variables::Binding;
use crate::shell::buffer::Output;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    String,
    Number,
    Bool,
}

impl ValueType {
    pub fn accepts_number(self) -> bool {
        matches!(self, ValueType::String | ValueType::Number)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    User,
    System,
}

/// Bound flags of one invocation, by name.
pub type Flags = IndexMap<String, Flag>;
/// Evaluated flag values handed to a user command.
pub type FlagValues = IndexMap<String, Value>;
/// Option switches of one invocation.
pub type Options = IndexMap<String, bool>;

pub type ExecFn = Rc<dyn Fn(&ExecContext, &FlagValues, &Options) -> Result<Value, EvalError>>;
pub type SystemExecFn = Rc<dyn Fn(&ExecContext, &Flags, &Options) -> Result<Value, EvalError>>;
pub type OutFn = Rc<dyn Fn(&ExecContext, &Flags, &Options)>;

/// A flag: catalog template and per-invocation bound copy in one.
#[derive(Clone)]
pub struct Flag {
    pub name: String,
    pub mandatory: bool,
    /// Unnamed position, 1-based; 0 means named only.
    pub position: u32,
    pub value_type: ValueType,
    expression: Option<ExprRef>,
}

impl Flag {
    pub fn new(name: &str, value_type: ValueType) -> Flag {
        Flag {
            name: name.to_string(),
            mandatory: false,
            position: 0,
            value_type,
            expression: None,
        }
    }

    pub fn mandatory(mut self) -> Flag {
        self.mandatory = true;
        self
    }

    pub fn at_position(mut self, position: u32) -> Flag {
        self.position = position;
        self
    }

    /// A fresh unbound copy of the template.
    pub fn template_copy(&self) -> Flag {
        Flag {
            name: self.name.clone(),
            mandatory: self.mandatory,
            position: self.position,
            value_type: self.value_type,
            expression: None,
        }
    }

    pub fn bind(&mut self, expression: ExprRef) {
        self.expression = Some(expression);
    }

    pub fn expression(&self) -> Option<&ExprRef> {
        self.expression.as_ref()
    }

    pub fn value(&self, ctx: &ExecContext) -> Result<Value, EvalError> {
        match &self.expression {
            Some(e) => e.borrow().value(ctx),
            None => Ok(Value::null()),
        }
    }
}

impl std::fmt::Debug for Flag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Flag")
            .field("name", &self.name)
            .field("mandatory", &self.mandatory)
            .field("position", &self.position)
            .field("value_type", &self.value_type)
            .field("bound", &self.expression.is_some())
            .finish()
    }
}

/// One command record handed in by the embedder.
pub struct CommandSpec {
    pub kind: CommandKind,
    pub path: Vec<String>,
    pub name: String,
    pub exec: Option<ExecFn>,
    pub system_exec: Option<SystemExecFn>,
    pub out: Option<OutFn>,
    pub flags: Vec<Flag>,
    pub options: Vec<String>,
}

impl CommandSpec {
    pub fn user(path: &[&str], name: &str, exec: ExecFn) -> CommandSpec {
        CommandSpec {
            kind: CommandKind::User,
            path: path.iter().map(|s| s.to_string()).collect(),
            name: name.to_string(),
            exec: Some(exec),
            system_exec: None,
            out: None,
            flags: Vec::new(),
            options: Vec::new(),
        }
    }

    pub fn system(name: &str, exec: SystemExecFn, out: Option<OutFn>) -> CommandSpec {
        CommandSpec {
            kind: CommandKind::System,
            path: Vec::new(),
            name: name.to_string(),
            exec: None,
            system_exec: Some(exec),
            out,
            flags: Vec::new(),
            options: Vec::new(),
        }
    }

    pub fn flag(mut self, flag: Flag) -> CommandSpec {
        self.flags.push(flag);
        self
    }

    pub fn option(mut self, name: &str) -> CommandSpec {
        self.options.push(name.to_string());
        self
    }
}

/// A command as it lives in the catalog.
pub struct Command {
    pub kind: CommandKind,
    pub path: Vec<String>,
    pub name: String,
    exec: Option<ExecFn>,
    system_exec: Option<SystemExecFn>,
    out: Option<OutFn>,
    pub flags: IndexMap<String, Rc<Flag>>,
    pub mandatory: Vec<String>,
    default_options: IndexMap<String, bool>,
    unnamed: IndexMap<u32, Rc<Flag>>,
}

impl Command {
    pub fn unnamed_flag(&self, position: u32) -> Option<Rc<Flag>> {
        self.unnamed.get(&position).cloned()
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("kind", &self.kind)
            .field("path", &self.path)
            .field("name", &self.name)
            .field("flags", &self.flags)
            .field("mandatory", &self.mandatory)
            .field("default_options", &self.default_options)
            .finish()
    }
}

/// One invocation of a command: the shared definition plus this clause's
/// option switches.
pub struct CommandInstance {
    def: Rc<Command>,
    options: Options,
}

impl CommandInstance {
    pub fn new(def: Rc<Command>) -> CommandInstance {
        let options = def.default_options.clone();
        CommandInstance { def, options }
    }

    pub fn def(&self) -> &Rc<Command> {
        &self.def
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn set_option(&mut self, name: &str) {
        self.options.insert(name.to_string(), true);
    }

    pub fn exec(&self, ctx: &ExecContext, flags: &Flags) -> Result<Value, EvalError> {
        for name in &self.def.mandatory {
            if !flags.contains_key(name) {
                return Err(EvalError::NoMandatoryFlag(name.clone()));
            }
        }

        if self.def.kind == CommandKind::System {
            if let Some(exec) = &self.def.system_exec {
                return exec(ctx, flags, &self.options);
            }
        }
        if self.def.kind == CommandKind::User {
            if let Some(exec) = &self.def.exec {
                let mut values = FlagValues::new();
                for (name, flag) in flags {
                    values.insert(name.clone(), flag.value(ctx)?);
                }
                return exec(ctx, &values, &self.options);
            }
        }
        Ok(Value::null())
    }

    /// Runs at parse-close, before execution; system declarations use it
    /// to pre-register variable names.
    pub fn out(&self, ctx: &ExecContext, flags: &Flags) {
        if self.def.kind == CommandKind::System {
            if let Some(out) = &self.def.out {
                out(ctx, flags, &self.options);
            }
        }
    }
}

/// Builds the nested catalog trie from the command list. The reserved
/// system commands (`global`, `local`, `put`) are appended automatically.
pub fn build_catalog(specs: Vec<CommandSpec>) -> Result<Rc<CommandTree>, CatalogError> {
    let root = Rc::new(CommandTree::new());

    for spec in specs.into_iter().chain(system_command_specs()) {
        let mut level_tree = Rc::clone(&root);
        for segment in &spec.path {
            level_tree = match level_tree.payload_of(segment).and_then(|p| p.subtree) {
                Some(subtree) => subtree,
                None => {
                    let subtree = Rc::new(CommandTree::new());
                    level_tree.insert(
                        segment,
                        Payload {
                            level: Level::Path,
                            key: segment.clone(),
                            subtree: Some(Rc::clone(&subtree)),
                            item: None,
                        },
                    );
                    subtree
                }
            };
        }

        if level_tree.payload_of(&spec.name).is_some() {
            // duplicate command names: first registration wins
            continue;
        }

        let mut flags = IndexMap::new();
        let mut mandatory = Vec::new();
        let mut unnamed = IndexMap::new();
        let flag_tree = Rc::new(CommandTree::new());

        for flag in spec.flags {
            if flag.position > 0 {
                if !flag.mandatory {
                    return Err(CatalogError::UnnamedNotMandatory(flag.name));
                }
                if unnamed.contains_key(&flag.position) {
                    return Err(CatalogError::PositionTaken(flag.position));
                }
            }
            if flag.mandatory {
                mandatory.push(flag.name.clone());
            }
            let flag = Rc::new(flag);
            if flag.position > 0 {
                unnamed.insert(flag.position, Rc::clone(&flag));
            }
            flag_tree.insert(
                &flag.name,
                Payload {
                    level: Level::Flag,
                    key: flag.name.clone(),
                    subtree: None,
                    item: Some(CatalogItem::Flag(Rc::clone(&flag))),
                },
            );
            flags.insert(flag.name.clone(), flag);
        }

        for position in 1..=unnamed.len() as u32 {
            if !unnamed.contains_key(&position) {
                return Err(CatalogError::PositionGap);
            }
        }

        let mut default_options = IndexMap::new();
        for option in &spec.options {
            default_options.insert(option.clone(), false);
            flag_tree.insert(
                option,
                Payload {
                    level: Level::Option,
                    key: option.clone(),
                    subtree: None,
                    item: Some(CatalogItem::Switch),
                },
            );
        }

        let command = Rc::new(Command {
            kind: spec.kind,
            path: spec.path,
            name: spec.name.clone(),
            exec: spec.exec,
            system_exec: spec.system_exec,
            out: spec.out,
            flags,
            mandatory,
            default_options,
            unnamed,
        });

        level_tree.insert(
            &spec.name,
            Payload {
                level: Level::Command,
                key: spec.name.clone(),
                subtree: Some(flag_tree),
                item: Some(CatalogItem::Command(command)),
            },
        );
    }

    Ok(root)
}

/// The reserved system commands. Their out-fn runs at parse-close so a
/// declared name colorizes and completes as a known variable in the rest
/// of the same line, even before execution.
fn system_command_specs() -> Vec<CommandSpec> {
    vec![
        CommandSpec::system("global", set_variable_exec(true), Some(declare_out(true)))
            .flag(Flag::new("name", ValueType::String).mandatory().at_position(1))
            .flag(Flag::new("value", ValueType::String).mandatory().at_position(2)),
        CommandSpec::system("local", set_variable_exec(false), Some(declare_out(false)))
            .flag(Flag::new("name", ValueType::String).mandatory().at_position(1))
            .flag(Flag::new("value", ValueType::String).mandatory().at_position(2)),
        CommandSpec::system("put", put_exec(), None)
            .flag(Flag::new("value", ValueType::String).mandatory().at_position(1)),
    ]
}

/// A command-list value is stored as a callable; anything else is
/// evaluated eagerly.
fn binding_of(ctx: &ExecContext, flag: &Flag) -> Result<Binding, EvalError> {
    match flag.expression() {
        Some(e) if e.borrow().kind() == ExpressionKind::CommandList => {
            Ok(Binding::Callable(Rc::clone(e)))
        }
        Some(e) => Ok(Binding::Value(e.borrow().value(ctx)?)),
        None => Ok(Binding::Value(Value::null())),
    }
}

fn set_variable_exec(global: bool) -> SystemExecFn {
    Rc::new(move |ctx, flags, _options| {
        let name = match flags.get("name") {
            Some(flag) => flag.value(ctx)?.as_string(),
            None => return Ok(Value::null()),
        };
        let binding = match flags.get("value") {
            Some(flag) => binding_of(ctx, flag)?,
            None => Binding::Value(Value::null()),
        };
        if global {
            ctx.set_global(&name, binding);
        } else {
            ctx.set_local(&name, binding);
        }
        ctx.logger().write(&format!("set variable {}", name));
        Ok(Value::null())
    })
}

fn declare_out(global: bool) -> OutFn {
    Rc::new(move |ctx, flags, _options| {
        let name = match flags.get("name").map(|f| f.value(ctx)) {
            Some(Ok(v)) => v.as_string(),
            _ => return,
        };
        if name.is_empty() || ctx.variable_exists(&name) {
            return;
        }
        if global {
            ctx.set_global(&name, Binding::Value(Value::null()));
        } else {
            ctx.set_local(&name, Binding::Value(Value::null()));
        }
    })
}

fn put_exec() -> SystemExecFn {
    Rc::new(|ctx, flags, _options| {
        let value = match flags.get("value") {
            Some(flag) => flag.value(ctx)?,
            None => Value::null(),
        };
        ctx.buffer()
            .borrow_mut()
            .push(Output::plain(value.as_string()));
        Ok(Value::null())
    })
}
