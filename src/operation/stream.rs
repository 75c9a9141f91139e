//! Closeable element streams
//!
//! Backends may hand out streams backed by open resources. A stream is made
//! of parts, each with an optional closer; chaining streams concatenates
//! their parts. Closing runs every closer in part order even when some of
//! them fail. Dropping an unclosed stream closes it.

use crate::element::Element;
use std::collections::VecDeque;
use std::fmt;
use tracing::warn;

type Closer = Box<dyn FnOnce() -> Result<(), String> + Send>;

struct Part {
    label: String,
    source: Box<dyn Iterator<Item = Element> + Send>,
    closer: Option<Closer>,
}

/// Failures collected while closing a stream, as `(part label, message)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseError {
    pub failures: Vec<(String, String)>,
}

impl fmt::Display for CloseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to close {} stream part(s)", self.failures.len())?;
        for (label, message) in &self.failures {
            write!(f, "; {}: {}", label, message)?;
        }
        Ok(())
    }
}

impl std::error::Error for CloseError {}

/// Lazily evaluated, closeable sequence of elements
pub struct ElementStream {
    parts: VecDeque<Part>,
    exhausted: Vec<Part>,
    closed: bool,
}

impl ElementStream {
    pub fn empty() -> Self {
        ElementStream {
            parts: VecDeque::new(),
            exhausted: Vec::new(),
            closed: false,
        }
    }

    /// Stream over an iterator with nothing to close
    pub fn new<I>(label: impl Into<String>, source: I) -> Self
    where
        I: IntoIterator<Item = Element>,
        I::IntoIter: Send + 'static,
    {
        let mut stream = ElementStream::empty();
        stream.parts.push_back(Part {
            label: label.into(),
            source: Box::new(source.into_iter()),
            closer: None,
        });
        stream
    }

    /// Stream over an iterator whose resources are released by `closer`
    pub fn with_closer<I, C>(label: impl Into<String>, source: I, closer: C) -> Self
    where
        I: IntoIterator<Item = Element>,
        I::IntoIter: Send + 'static,
        C: FnOnce() -> Result<(), String> + Send + 'static,
    {
        let mut stream = ElementStream::new(label, source);
        if let Some(part) = stream.parts.back_mut() {
            part.closer = Some(Box::new(closer));
        }
        stream
    }

    pub fn from_vec(elements: Vec<Element>) -> Self {
        ElementStream::new("elements", elements)
    }

    /// Concatenate streams, keeping every part and closer in order
    pub fn chain<I>(streams: I) -> Self
    where
        I: IntoIterator<Item = ElementStream>,
    {
        let mut chained = ElementStream::empty();
        for mut stream in streams {
            chained.exhausted.append(&mut stream.exhausted);
            chained.parts.append(&mut stream.parts);
            stream.closed = true;
        }
        chained
    }

    /// Labels of the parts, in order
    pub fn labels(&self) -> Vec<&str> {
        self.exhausted
            .iter()
            .chain(self.parts.iter())
            .map(|p| p.label.as_str())
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Close every part. Later parts are closed even if earlier ones fail.
    pub fn close(&mut self) -> Result<(), CloseError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let mut failures = Vec::new();
        let parts = self.exhausted.drain(..).chain(self.parts.drain(..));
        for part in parts {
            if let Some(closer) = part.closer {
                if let Err(message) = closer() {
                    warn!(part = %part.label, error = %message, "failed to close stream part");
                    failures.push((part.label, message));
                }
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(CloseError { failures })
        }
    }

    /// Drain the stream into a vector and close it
    pub fn collect_all(mut self) -> Result<Vec<Element>, CloseError> {
        let elements: Vec<Element> = self.by_ref().collect();
        self.close()?;
        Ok(elements)
    }
}

impl Iterator for ElementStream {
    type Item = Element;

    fn next(&mut self) -> Option<Element> {
        if self.closed {
            return None;
        }
        while let Some(part) = self.parts.front_mut() {
            if let Some(element) = part.source.next() {
                return Some(element);
            }
            if let Some(done) = self.parts.pop_front() {
                self.exhausted.push(done);
            }
        }
        None
    }
}

impl Drop for ElementStream {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "element stream dropped with close failures");
        }
    }
}

impl fmt::Debug for ElementStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementStream")
            .field("parts", &self.labels())
            .field("closed", &self.closed)
            .finish()
    }
}
