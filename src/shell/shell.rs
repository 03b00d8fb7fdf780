//! Interactive Shell Loop
//!
//! One blocking reader thread pumps decoded keys onto a bounded channel;
//! the main loop drains completion-synthesized characters first, applies
//! the key to the line editor, re-parses and re-colorizes the whole line
//! and redraws. Enter executes the line and prints the drained output
//! buffer; Ctrl-C (or Ctrl-D on a blank line) signals cancellation and
//! leaves the loop.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::rc::Rc;

use tokio::sync::{mpsc, watch};

use crate::parser::{
    CommandTree, Completion, ExecContext, Level, Object, ParsedLine, Parser,
};
use crate::shell::buffer::{Output, OutputBuffer, Word};
use crate::shell::history::History;
use crate::shell::prompt::Prompt;
use crate::shell::terminal::{Color, Terminal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Tab,
    Enter,
    Backspace,
    CtrlA,
    CtrlB,
    CtrlC,
    CtrlD,
    CtrlE,
    CtrlF,
    CtrlK,
    CtrlL,
    CtrlN,
    CtrlP,
    CtrlT,
    CtrlU,
    CtrlW,
    AltB,
    AltF,
}

/// Decodes one input chunk. Arrow keys fold onto their emacs-style
/// equivalents the way the reader always has.
pub fn decode_key(bytes: &[u8]) -> Option<Key> {
    match bytes {
        [0x1b, b'[', b'A'] => Some(Key::CtrlP),
        [0x1b, b'[', b'B'] => Some(Key::CtrlN),
        [0x1b, b'[', b'C'] => Some(Key::CtrlF),
        [0x1b, b'[', b'D'] => Some(Key::CtrlB),
        [0x1b, b'b'] => Some(Key::AltB),
        [0x1b, b'f'] => Some(Key::AltF),
        [b] => decode_byte(*b),
        bytes => std::str::from_utf8(bytes)
            .ok()
            .and_then(|s| s.chars().next())
            .map(Key::Char),
    }
}

fn decode_byte(b: u8) -> Option<Key> {
    match b {
        1 => Some(Key::CtrlA),
        2 => Some(Key::CtrlB),
        3 => Some(Key::CtrlC),
        4 => Some(Key::CtrlD),
        5 => Some(Key::CtrlE),
        6 => Some(Key::CtrlF),
        8 | 0x7f => Some(Key::Backspace),
        9 => Some(Key::Tab),
        11 => Some(Key::CtrlK),
        12 => Some(Key::CtrlL),
        13 | 10 => Some(Key::Enter),
        14 => Some(Key::CtrlN),
        16 => Some(Key::CtrlP),
        20 => Some(Key::CtrlT),
        21 => Some(Key::CtrlU),
        23 => Some(Key::CtrlW),
        b if b >= 0x20 => Some(Key::Char(b as char)),
        _ => None,
    }
}

/// The colorization palette; per object, defaulting to white.
pub fn default_colors() -> HashMap<Object, Color> {
    HashMap::from([
        (Object::Error, Color::Red),
        (Object::Path, Color::Blue),
        (Object::Command, Color::Blue),
        (Object::OptionalFlag, Color::Yellow),
        (Object::MandatoryFlag, Color::Yellow),
        (Object::Option, Color::Magenta),
        (Object::Value, Color::White),
        (Object::EqualSymbol, Color::Cyan),
        (Object::CurlyBrackets, Color::Yellow),
        (Object::RoundBrackets, Color::Yellow),
        (Object::SquareBrackets, Color::Yellow),
        (Object::Operator, Color::Yellow),
        (Object::QuotedSymbol, Color::Cyan),
        (Object::QuotedString, Color::Cyan),
        (Object::VariableSymbol, Color::Blue),
        (Object::VariableName, Color::Blue),
        (Object::VariableWrongName, Color::Red),
    ])
}

pub struct Shell {
    terminal: Terminal,
    history: History,
    prompt: Prompt,
    parser: Parser,
    buffer: Rc<RefCell<OutputBuffer>>,
    colors: HashMap<Object, Color>,
    pending: VecDeque<char>,
    cancel: watch::Sender<bool>,
    cursor_row: usize,
}

impl Shell {
    pub fn new(catalog: Rc<CommandTree>, hostname: &str, username: &str) -> io::Result<Shell> {
        let terminal = Terminal::new()?;
        let buffer = Rc::new(RefCell::new(OutputBuffer::new()));
        let (cancel, cancel_rx) = watch::channel(false);
        let parser = Parser::new(ExecContext::root(catalog, Rc::clone(&buffer), cancel_rx));

        Ok(Shell {
            terminal,
            history: History::new(),
            prompt: Prompt::new(hostname, username),
            parser,
            buffer,
            colors: default_colors(),
            pending: VecDeque::new(),
            cancel,
            cursor_row: 0,
        })
    }

    pub fn set_colors(&mut self, colors: HashMap<Object, Color>) {
        self.colors = colors;
    }

    fn color_of(&self, object: Object) -> Color {
        self.colors.get(&object).copied().unwrap_or(Color::White)
    }

    pub async fn run(mut self) {
        let (tx, mut rx) = mpsc::channel::<Key>(8);
        std::thread::spawn(move || {
            use std::io::Read;
            let mut stdin = std::io::stdin();
            let mut buf = [0u8; 16];
            loop {
                let n = match stdin.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => n,
                };
                if let Some(key) = decode_key(&buf[..n]) {
                    if tx.blocking_send(key).is_err() {
                        break;
                    }
                }
            }
        });

        self.render();

        loop {
            // completion characters drain ahead of real keystrokes
            let key = match self.pending.pop_front() {
                Some(c) => Key::Char(c),
                None => match rx.recv().await {
                    Some(key) => key,
                    None => break,
                },
            };

            match key {
                Key::CtrlC => {
                    let _ = self.cancel.send(true);
                    self.terminal.newline();
                    break;
                }
                Key::CtrlD => {
                    if self.history.cursor().is_blank() {
                        let _ = self.cancel.send(true);
                        self.terminal.newline();
                        break;
                    }
                    self.history.cursor().delete();
                }
                Key::Tab => self.complete(),
                Key::Enter => self.enter(),
                Key::Backspace => {
                    self.history.cursor().backspace();
                }
                Key::CtrlA => self.history.cursor().move_to_start(),
                Key::CtrlE => self.history.cursor().move_to_end(),
                Key::CtrlB => {
                    self.history.cursor().move_backward();
                }
                Key::CtrlF => {
                    self.history.cursor().move_forward();
                }
                Key::CtrlK => {
                    self.history.cursor().delete_to_end();
                }
                Key::CtrlU => {
                    self.history.cursor().delete_to_start();
                }
                Key::CtrlW => {
                    self.history.cursor().delete_to_prev_word();
                }
                Key::CtrlT => {
                    self.history.cursor().swap();
                }
                Key::AltB => self.history.cursor().move_to_prev_word(),
                Key::AltF => self.history.cursor().move_to_next_word(),
                Key::CtrlP => {
                    if self.history.prev() {
                        self.history.cursor().move_to_end();
                    }
                }
                Key::CtrlN => {
                    if self.history.next() {
                        self.history.cursor().move_to_end();
                    }
                }
                Key::CtrlL => {
                    self.terminal.erase_screen();
                    self.cursor_row = 0;
                }
                Key::Char(c) => {
                    self.history.cursor().insert(c);
                }
            }

            self.render();
        }
    }

    /// Re-parses the typed line and redraws prompt, colorized text and
    /// cursor.
    fn render(&mut self) {
        let typed = self.history.cursor().typed();
        let parsed = self.parser.parse_string(&typed);

        self.terminal.hide_cursor();
        self.terminal.carriage_return();
        self.terminal.move_up(self.cursor_row);
        self.terminal.erase_below();

        for (text, color) in self.prompt.segments() {
            self.terminal.set_color(color);
            self.terminal.write(&text);
        }
        self.paint(&typed, &parsed);
        self.terminal.reset_color();

        let width = self.terminal.width().max(1);
        let end = self.prompt.width() + typed.chars().count();
        let offset = self.prompt.width() + self.history.cursor().position();
        let end_row = end / width;
        let cursor_row = offset / width;

        if end_row > cursor_row {
            self.terminal.move_up(end_row - cursor_row);
        }
        self.terminal.move_to_column(offset % width);
        self.terminal.show_cursor();
        self.cursor_row = cursor_row;
    }

    fn paint(&mut self, typed: &str, parsed: &ParsedLine) {
        let mut chars = typed.chars();
        for run in &parsed.runs {
            self.terminal.set_color(self.color_of(run.object));
            let text: String = chars.by_ref().take(run.len).collect();
            self.terminal.write(&text);
        }
        let rest: String = chars.collect();
        if !rest.is_empty() {
            self.terminal.reset_color();
            self.terminal.write(&rest);
        }
    }

    /// Executes the line, prints the drained buffer and the result value,
    /// then starts a fresh prompt.
    fn enter(&mut self) {
        let typed = self.history.cursor().typed();
        self.terminal.newline();
        self.cursor_row = 0;

        let parsed = self.parser.parse_string(&typed);
        if parsed.error.is_none() {
            match self.parser.exec() {
                Ok(value) => {
                    tracing::debug!(target: "treesh::shell", "exec ok: {}", value.as_string());
                    if !value.is_null() {
                        self.buffer.borrow_mut().push(Output::plain(value.as_string()));
                    }
                }
                Err(e) => {
                    self.buffer.borrow_mut().push(Output::plain(format!("error: {e}")));
                }
            }
        }

        self.print_buffer();
        self.history.push();
        self.parser.flush();
    }

    /// Tab: feed the merged prefix through the normal character path, or
    /// print the option table when nothing merges.
    fn complete(&mut self) {
        let cursor = self.history.cursor();
        if cursor.position() + 1 != cursor.len() {
            return;
        }

        let typed = cursor.typed();
        let parsed = self.parser.parse_string(&typed);
        if parsed.error.is_some() {
            return;
        }

        let completion = match self.parser.complete() {
            Some(completion) => completion,
            None => return,
        };

        if !completion.merged.is_empty() {
            self.pending.extend(completion.merged.chars());
            return;
        }
        if !completion.options.is_empty() {
            let table = self.completion_table(&completion);
            self.terminal.newline();
            self.cursor_row = 0;
            self.buffer.borrow_mut().push(table);
            self.print_buffer();
        }
    }

    fn completion_table(&self, completion: &Completion) -> Output {
        let words = completion
            .options
            .iter()
            .map(|option| {
                let object = match option.level {
                    Level::Path => Object::Path,
                    Level::Command => Object::Command,
                    Level::Flag => Object::MandatoryFlag,
                    Level::Option => Object::Option,
                    Level::Variable => Object::VariableName,
                };
                Word::new(&option.name, self.color_of(object))
            })
            .collect();
        Output::table(words)
    }

    fn print_buffer(&mut self) {
        loop {
            let output = match self.buffer.borrow_mut().pop() {
                Some(output) => output,
                None => break,
            };
            for word in output.words(self.terminal.width().max(1)) {
                if word.text == "\n" {
                    self.terminal.newline();
                    continue;
                }
                self.terminal.set_color(word.color);
                self.terminal.write(&word.text);
            }
            self.terminal.newline();
        }
        self.terminal.reset_color();
    }
}
