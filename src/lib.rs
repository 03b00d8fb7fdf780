//! treesh - an interactive shell for a restricted command language
//!
//! This library provides an incremental streaming parser and evaluator
//! over a registered command catalog: per-keystroke colorization,
//! context-aware tab completion, and a small expression language with
//! commands, command lists, integer math and scoped variables.

pub mod parser;
pub mod shell;

pub use parser::{
    build_catalog, Binding, CatalogError, CommandSpec, CommandTree, Completion, EvalError,
    ExecContext, ExecError, Flag, FlagValues, Flags, Object, Options, ParseErrorKind, Parser,
    Value, ValueType,
};
pub use shell::{Shell, OutputBuffer};
