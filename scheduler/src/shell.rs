//! The submission front-end's prompt plumbing.
//!
//! Command parsing is a pure function; line input works on the raw stdin
//! descriptor because std's buffered stdin silently retries interrupted
//! reads, which would swallow the EINTR the front-end relies on to notice
//! Ctrl-C during a blocking read.

use liboslab::error::{Errno, Error};

/// Parsed front-end command.
#[derive(Debug, PartialEq, Eq)]
pub enum Command<'a> {
    /// `submit <path>`; extra words are ignored.
    Submit(&'a str),
    /// `submit` with no path.
    SubmitMissingPath,
    Exit,
    Empty,
    Unknown(&'a str),
}

/// Parse one prompt line.
pub fn parse_command(line: &str) -> Command<'_> {
    let mut words = line.split_whitespace();
    match words.next() {
        None => Command::Empty,
        Some("exit") => Command::Exit,
        Some("submit") => match words.next() {
            Some(path) => Command::Submit(path),
            None => Command::SubmitMissingPath,
        },
        Some(other) => Command::Unknown(other),
    }
}

/// One read attempt's outcome.
#[derive(Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    /// End of input; any unterminated trailing bytes were already returned
    /// as a final line.
    Eof,
    /// A signal interrupted the blocking read before any bytes arrived.
    Interrupted,
}

/// Line reader over a raw descriptor.
pub struct LineReader {
    fd: libc::c_int,
    buf: Vec<u8>,
}

impl LineReader {
    pub fn new(fd: libc::c_int) -> Self {
        LineReader {
            fd,
            buf: Vec::new(),
        }
    }

    /// Block for the next line. A chunked read may deliver several lines
    /// at once; they are handed out one by one.
    pub fn next_line(&mut self) -> Result<ReadOutcome, Error> {
        loop {
            if let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
                let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
                line.pop();
                return Ok(ReadOutcome::Line(
                    String::from_utf8_lossy(&line).into_owned(),
                ));
            }
            let mut chunk = [0u8; 1024];
            let n = unsafe {
                libc::read(
                    self.fd,
                    chunk.as_mut_ptr() as *mut libc::c_void,
                    chunk.len(),
                )
            };
            match n {
                -1 => {
                    let e = Errno::last();
                    if e == Errno(libc::EINTR) {
                        return Ok(ReadOutcome::Interrupted);
                    }
                    return Err(Error::Os(e));
                }
                0 => {
                    if self.buf.is_empty() {
                        return Ok(ReadOutcome::Eof);
                    }
                    let line = std::mem::take(&mut self.buf);
                    return Ok(ReadOutcome::Line(
                        String::from_utf8_lossy(&line).into_owned(),
                    ));
                }
                n => self.buf.extend_from_slice(&chunk[..n as usize]),
            }
        }
    }
}
