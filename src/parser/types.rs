//! Parser Types and Constants
//!
//! Shared types used across the parser modules: payload levels, the
//! colorization objects emitted per character, and the error enums.

use thiserror::Error;

/// Classification of a catalog trie payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Path,
    Command,
    Flag,
    Option,
    Variable,
}

/// Colorization object attached to every accepted character.
///
/// `Space` and everything after it are single-character objects; the
/// earlier ones coalesce into runs of the same color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Object {
    None,
    Error,
    Path,
    Command,
    MandatoryFlag,
    OptionalFlag,
    Unknown,
    Value,
    Option,
    VariableName,
    VariableWrongName,
    QuotedString,
    Comment,

    // single-character objects
    Space,
    EqualSymbol,
    VariableSymbol,
    QuotedSymbol,
    Operator,
    SquareBrackets,
    RoundBrackets,
    CurlyBrackets,
}

impl Object {
    pub fn is_single(self) -> bool {
        self >= Object::Space
    }
}

/// One legal continuation offered by the completion engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompleteOption {
    pub level: Level,
    pub name: String,
}

/// Completion result: the legal next tokens plus the longest byte
/// sequence that can be appended unambiguously after the cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub options: Vec<CompleteOption>,
    pub merged: String,
}

/// Errors raised while feeding characters into the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    /// The character is not legal in the current state.
    #[error("wrong rune")]
    WrongRune,
    /// The iterator arrived at a payload of an unexpected level; the
    /// catalog handed to the parser is inconsistent.
    #[error("wrong payload")]
    WrongPayload,
    /// `close` was called while the expression still expects input.
    #[error("not finished")]
    NotFinished,
    /// An internal invariant was violated.
    #[error("internal parser error")]
    Panic,
}

/// Error returned by `Expression::close`, optionally naming the opener
/// that was left unclosed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseError {
    pub kind: ParseErrorKind,
    pub unclosed: Option<char>,
}

impl CloseError {
    pub fn new(kind: ParseErrorKind) -> Self {
        Self { kind, unclosed: None }
    }

    pub fn unclosed(kind: ParseErrorKind, opener: char) -> Self {
        Self { kind, unclosed: Some(opener) }
    }
}

/// Errors raised while evaluating a parsed line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("wrong type")]
    WrongType,
    #[error("wrong operator")]
    WrongOperator,
    #[error("missing operand")]
    MissingOperand,
    #[error("division by zero")]
    DivisionByZero,
    #[error("mandatory flag {0} is missing")]
    NoMandatoryFlag(String),
    #[error("{0}")]
    Command(String),
}

/// Error returned by `Parser::exec`: either the line could not be closed
/// (unbalanced brackets, incomplete flag) or evaluation failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecError {
    #[error("{kind}")]
    Unfinished {
        kind: ParseErrorKind,
        unclosed: Option<char>,
    },
    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// Errors reported to the embedder while building the command catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("flag {0} is unnamed and not mandatory")]
    UnnamedNotMandatory(String),
    #[error("unnamed position {0} is already taken")]
    PositionTaken(u32),
    #[error("unnamed positions are not contiguous")]
    PositionGap,
}
