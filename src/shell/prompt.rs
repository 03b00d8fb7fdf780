//! Prompt
//!
//! `[hostname@username] >` with per-segment colors.

use super::terminal::Color;

pub struct Prompt {
    hostname: String,
    username: String,
    start_char: char,
}

impl Prompt {
    pub fn new(hostname: &str, username: &str) -> Prompt {
        Prompt {
            hostname: hostname.to_string(),
            username: username.to_string(),
            start_char: '>',
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn start_char(&self) -> char {
        self.start_char
    }

    /// The prompt as colored segments, ready for the terminal.
    pub fn segments(&self) -> Vec<(String, Color)> {
        let mut segments = vec![("[".to_string(), Color::White)];
        segments.push((self.hostname.clone(), Color::Green));
        if !self.username.is_empty() {
            segments.push(("@".to_string(), Color::White));
            segments.push((self.username.clone(), Color::Blue));
        }
        segments.push(("]".to_string(), Color::White));
        segments.push((format!(" {} ", self.start_char), Color::White));
        segments
    }

    /// Printed width of the prompt.
    pub fn width(&self) -> usize {
        self.segments().iter().map(|(s, _)| s.chars().count()).sum()
    }
}
