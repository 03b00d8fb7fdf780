//! History Ring
//!
//! Committed lines plus one draft record at the tail. Every record keeps
//! its own edit cursor, so navigating away and back preserves in-place
//! edits until the next commit re-snapshots them.

use super::cursor::Cursor;

struct Record {
    value: String,
    cursor: Cursor,
}

pub struct History {
    records: Vec<Record>,
    current: usize,
}

impl History {
    pub fn new() -> History {
        History {
            records: vec![Record {
                value: String::new(),
                cursor: Cursor::new(),
            }],
            current: 0,
        }
    }

    /// Seeds the history with committed lines, oldest first.
    pub fn load(&mut self, lines: &[&str]) {
        self.records = lines
            .iter()
            .map(|line| Record {
                value: line.to_string(),
                cursor: Cursor::from_text(line),
            })
            .collect();
        self.records.push(Record {
            value: String::new(),
            cursor: Cursor::new(),
        });
        self.current = self.records.len() - 1;
    }

    pub fn prev(&mut self) -> bool {
        if self.current == 0 {
            return false;
        }
        self.current -= 1;
        true
    }

    pub fn next(&mut self) -> bool {
        if self.current + 1 >= self.records.len() {
            return false;
        }
        self.current += 1;
        true
    }

    pub fn cursor(&mut self) -> &mut Cursor {
        &mut self.records[self.current].cursor
    }

    pub fn value(&self) -> &str {
        &self.records[self.current].value
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Commits the line under the cursor: the edited record is restored
    /// from its committed value, the draft takes the committed text and a
    /// fresh draft is appended.
    pub fn push(&mut self) -> bool {
        let committed = self.records[self.current].cursor.typed();
        if committed.trim().is_empty() {
            return false;
        }

        let value = self.records[self.current].value.clone();
        self.records[self.current].cursor = Cursor::from_text(&value);

        let last = self.records.len() - 1;
        self.records[last].value = committed.clone();
        self.records[last].cursor = Cursor::from_text(&committed);

        self.records.push(Record {
            value: String::new(),
            cursor: Cursor::new(),
        });
        self.current = self.records.len() - 1;
        true
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}
