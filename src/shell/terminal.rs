//! Raw Terminal Driver
//!
//! Puts the TTY into raw mode through termios, reads the window size,
//! and writes ANSI color and cursor escapes. The saved termios state is
//! restored when the terminal is dropped.

use std::io::{self, Write};
use std::mem::MaybeUninit;
use std::os::unix::io::RawFd;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
}

impl Color {
    fn ansi(self) -> u8 {
        30 + match self {
            Color::Black => 0,
            Color::Red => 1,
            Color::Green => 2,
            Color::Yellow => 3,
            Color::Blue => 4,
            Color::Magenta => 5,
            Color::Cyan => 6,
            Color::White => 7,
        }
    }
}

pub struct Terminal {
    fd: RawFd,
    saved: libc::termios,
    width: usize,
    height: usize,
    color: Color,
}

impl Terminal {
    /// Switches stdin to raw mode and queries the window size.
    pub fn new() -> io::Result<Terminal> {
        let fd = libc::STDIN_FILENO;

        let saved = unsafe {
            let mut term = MaybeUninit::<libc::termios>::uninit();
            if libc::tcgetattr(fd, term.as_mut_ptr()) != 0 {
                return Err(io::Error::last_os_error());
            }
            term.assume_init()
        };

        let mut raw = saved;
        raw.c_iflag &= !(libc::ISTRIP | libc::INLCR | libc::ICRNL | libc::IGNCR | libc::IXON | libc::IXOFF);
        raw.c_lflag &= !(libc::ECHO | libc::ICANON | libc::ISIG);
        if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &raw) } != 0 {
            return Err(io::Error::last_os_error());
        }

        let (width, height) = window_size(fd)?;

        Ok(Terminal {
            fd,
            saved,
            width,
            height,
            color: Color::White,
        })
    }

    pub fn restore(&self) {
        unsafe {
            libc::tcsetattr(self.fd, libc::TCSANOW, &self.saved);
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn write(&mut self, s: &str) -> usize {
        let mut stdout = io::stdout();
        let _ = stdout.write_all(s.as_bytes());
        let _ = stdout.flush();
        s.chars().count()
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn set_color(&mut self, color: Color) {
        if self.color != color {
            self.write(&format!("\x1b[{}m", color.ansi()));
            self.color = color;
        }
    }

    pub fn reset_color(&mut self) {
        self.write("\x1b[0m");
        self.color = Color::White;
    }

    pub fn move_to_column(&mut self, column: usize) {
        self.write(&format!("\x1b[{}G", column + 1));
    }

    pub fn carriage_return(&mut self) {
        self.write("\r");
    }

    pub fn move_up(&mut self, lines: usize) {
        if lines > 0 {
            self.write(&format!("\x1b[{}A", lines));
        }
    }

    pub fn move_down(&mut self, lines: usize) {
        if lines > 0 {
            self.write(&format!("\x1b[{}B", lines));
        }
    }

    pub fn erase_line(&mut self) {
        self.write("\x1b[2K");
    }

    pub fn erase_below(&mut self) {
        self.write("\x1b[0J");
    }

    pub fn erase_screen(&mut self) {
        self.write("\x1b[2J\x1b[H");
    }

    pub fn show_cursor(&mut self) {
        self.write("\x1b[?25h");
    }

    pub fn hide_cursor(&mut self) {
        self.write("\x1b[?25l");
    }

    pub fn newline(&mut self) {
        self.write("\r\n");
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        self.restore();
    }
}

fn window_size(fd: RawFd) -> io::Result<(usize, usize)> {
    let mut ws = MaybeUninit::<libc::winsize>::uninit();
    if unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, ws.as_mut_ptr()) } != 0 {
        return Err(io::Error::last_os_error());
    }
    let ws = unsafe { ws.assume_init() };
    Ok((ws.ws_col as usize, ws.ws_row as usize))
}
