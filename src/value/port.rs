use core::fmt;
use std::{
    any::Any,
    cell::{RefCell, RefMut},
    fs::{File, OpenOptions},
    io::{self, BufRead, BufReader, Cursor, Write},
    path::Path,
    sync::{Arc, Mutex},
};

use crate::heap::Allocation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Input,
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => write!(f, "input"),
            Direction::Output => write!(f, "output"),
        }
    }
}

/// An open (or closed) stream with a direction.
///
/// Closing drops the underlying handle but leaves the port object alive; every
/// later operation on it fails, and closing it again reports that it already was.
pub enum Port {
    Input(RefCell<InputPort>),
    Output(RefCell<OutputPort>),
}

impl Port {
    pub fn open_input_file(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::open(path.as_ref())?;
        tracing::debug!(path = %path.as_ref().display(), "opened input file");
        Ok(Self::Input(RefCell::new(InputPort::new(BufReader::new(file)))))
    }

    /// Opens `path` for writing, truncating it unless `append` is set.
    pub fn open_output_file(path: impl AsRef<Path>, append: bool) -> io::Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .append(append)
            .truncate(!append)
            .open(path.as_ref())?;
        tracing::debug!(path = %path.as_ref().display(), append, "opened output file");
        Ok(Self::Output(RefCell::new(OutputPort::new(Arc::new(
            Mutex::new(file),
        )))))
    }

    pub fn direction(&self) -> Direction {
        match self {
            Port::Input(_) => Direction::Input,
            Port::Output(_) => Direction::Output,
        }
    }

    pub fn is_closed(&self) -> bool {
        match self {
            Port::Input(port) => port.borrow().is_closed(),
            Port::Output(port) => port.borrow().is_closed(),
        }
    }

    /// Closes the port. Returns `false` if it was already closed.
    pub fn close(&self) -> bool {
        let closed = match self {
            Port::Input(port) => port.borrow_mut().close(),
            Port::Output(port) => port.borrow_mut().close(),
        };
        tracing::debug!(direction = %self.direction(), closed, "closing port");
        closed
    }

    pub fn input(&self) -> Option<RefMut<'_, InputPort>> {
        match self {
            Port::Input(port) => Some(port.borrow_mut()),
            Port::Output(_) => None,
        }
    }

    pub fn output(&self) -> Option<RefMut<'_, OutputPort>> {
        match self {
            Port::Output(port) => Some(port.borrow_mut()),
            Port::Input(_) => None,
        }
    }
}

impl From<InputPort> for Port {
    fn from(value: InputPort) -> Self {
        Self::Input(RefCell::new(value))
    }
}

impl From<OutputPort> for Port {
    fn from(value: OutputPort) -> Self {
        Self::Output(RefCell::new(value))
    }
}

fn closed_error(direction: Direction) -> io::Error {
    io::Error::new(
        io::ErrorKind::Other,
        format!("{direction} port has been closed"),
    )
}

/// Input port
///
/// Text is pulled from the source a line at a time into a pending buffer, which
/// both `read-char` and the datum reader consume from. Reads block until a line
/// or end of input arrives.
pub struct InputPort {
    port: Option<Box<dyn BufRead>>,
    buffer: String,
    pos: usize,
    /// set by `#!fold-case`, persists across reads
    pub(crate) fold_case: bool,
    _alloc: Allocation,
}

impl InputPort {
    pub fn new(reader: impl BufRead + 'static) -> Self {
        Self {
            port: Some(Box::new(reader)),
            buffer: String::new(),
            pos: 0,
            fold_case: false,
            _alloc: Allocation::new(),
        }
    }

    /// A port reading from an in-memory string.
    pub fn from_source(source: impl Into<String>) -> Self {
        Self::new(Cursor::new(source.into().into_bytes()))
    }

    pub fn is_closed(&self) -> bool {
        self.port.is_none()
    }

    pub fn close(&mut self) -> bool {
        self.buffer.clear();
        self.pos = 0;
        self.port.take().is_some()
    }

    /// Pulls one more line into the pending buffer. Returns `false` at end of input.
    pub fn fill(&mut self) -> io::Result<bool> {
        let Some(port) = self.port.as_mut() else {
            return Err(closed_error(Direction::Input));
        };
        self.buffer.drain(..self.pos);
        self.pos = 0;
        Ok(port.read_line(&mut self.buffer)? > 0)
    }

    pub fn read_char(&mut self) -> io::Result<Option<char>> {
        let chr = self.peek_char()?;
        if let Some(chr) = chr {
            self.pos += chr.len_utf8();
        }
        Ok(chr)
    }

    pub fn peek_char(&mut self) -> io::Result<Option<char>> {
        loop {
            if self.is_closed() {
                return Err(closed_error(Direction::Input));
            }
            if let Some(chr) = self.pending().chars().next() {
                return Ok(Some(chr));
            }
            if !self.fill()? {
                return Ok(None);
            }
        }
    }

    /// Pushes `chr` back so the next read returns it.
    pub fn unread_char(&mut self, chr: char) -> io::Result<()> {
        if self.is_closed() {
            return Err(closed_error(Direction::Input));
        }
        let len = chr.len_utf8();
        let previous = self.pos.checked_sub(len).and_then(|at| self.buffer.get(at..));
        if previous.is_some_and(|text| text.starts_with(chr)) {
            self.pos -= len;
        } else {
            self.buffer.insert(self.pos, chr);
        }
        Ok(())
    }

    /// Text that has been pulled from the source but not consumed yet.
    pub(crate) fn pending(&self) -> &str {
        &self.buffer[self.pos..]
    }

    pub(crate) fn consume(&mut self, len: usize) {
        self.pos = (self.pos + len).min(self.buffer.len());
    }
}

impl fmt::Debug for InputPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#<input port {}>", if self.is_closed() { "closed" } else { "open" })
    }
}

// I/O ports that provide a threadsafe way to output bytes
pub trait Writeable: Write + Any {}
impl<T: Write + Any> Writeable for T {}

/// Output port
///
/// The writer is shared, so a host can keep a handle to what a program prints.
pub struct OutputPort {
    port: Option<Arc<Mutex<dyn Writeable>>>,
    _alloc: Allocation,
}

impl OutputPort {
    pub fn new(port: Arc<Mutex<dyn Writeable>>) -> Self {
        Self {
            port: Some(port),
            _alloc: Allocation::new(),
        }
    }

    pub fn stdout() -> Self {
        Self::new(Arc::new(Mutex::new(io::stdout())))
    }

    pub fn is_closed(&self) -> bool {
        self.port.is_none()
    }

    /// Flushes and drops the writer. Returns `false` if it was already closed.
    pub fn close(&mut self) -> bool {
        match self.port.take() {
            Some(port) => {
                if let Ok(mut writer) = port.lock() {
                    _ = writer.flush();
                }
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for OutputPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#<output port {}>", if self.is_closed() { "closed" } else { "open" })
    }
}

impl Write for OutputPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let Some(port) = self.port.as_ref() else {
            return Err(closed_error(Direction::Output));
        };
        match port.lock() {
            Ok(mut writer) => writer.write(buf),
            Err(_) => Err(io::Error::new(
                io::ErrorKind::Other,
                "output port was poisoned",
            )),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        let Some(port) = self.port.as_ref() else {
            return Err(closed_error(Direction::Output));
        };
        match port.lock() {
            Ok(mut writer) => writer.flush(),
            Err(_) => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "output port was poisoned",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::Write,
        sync::{Arc, Mutex},
    };

    use assert2::{check, let_assert};

    use super::{InputPort, OutputPort, Port};

    #[test]
    fn read_and_unread_characters() {
        let mut port = InputPort::from_source("ab\ncd");
        check!(port.read_char().ok() == Some(Some('a')));
        port.unread_char('a').unwrap();
        check!(port.read_char().ok() == Some(Some('a')));
        check!(port.read_char().ok() == Some(Some('b')));
        check!(port.read_char().ok() == Some(Some('\n')));
        port.unread_char('x').unwrap();
        check!(port.read_char().ok() == Some(Some('x')));
        check!(port.read_char().ok() == Some(Some('c')));
        check!(port.read_char().ok() == Some(Some('d')));
        check!(port.read_char().ok() == Some(None));
    }

    #[test]
    fn closed_ports_refuse_io() {
        let port = Port::from(InputPort::from_source("abc"));
        check!(port.close());
        check!(!port.close());
        check!(port.is_closed());
        let_assert!(Some(mut input) = port.input());
        check!(input.read_char().is_err());
    }

    #[test]
    fn output_is_shared_with_the_host() {
        let sink = Arc::new(Mutex::new(Vec::<u8>::new()));
        let mut port = OutputPort::new(sink.clone());
        write!(port, "coolio").unwrap();
        check!(port.close());
        check!(write!(port, "again").is_err());
        check!(sink.lock().unwrap().as_slice() == b"coolio");
    }
}
