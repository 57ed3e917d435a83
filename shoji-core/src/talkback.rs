//! Replies from the emulator to the session
//!
//! Device-attribute and status queries answer through a single outbound
//! sink owned by the screen. The session installs the sink; the screen
//! never holds a back-reference to session internals, so there is no
//! cycle to break at disposal time.

use std::fmt;

use crate::error::{Error, Result};

/// The session side of talkback: anything that accepts reply bytes.
pub trait SessionSink {
    fn send(&mut self, bytes: &[u8]);
}

/// Closures work as sinks directly.
impl<F: FnMut(&[u8])> SessionSink for F {
    fn send(&mut self, bytes: &[u8]) {
        self(bytes)
    }
}

/// Routing state for emulator-generated replies.
#[derive(Default)]
pub struct Talkback {
    sink: Option<Box<dyn SessionSink>>,
    dropped_replies: u64,
}

impl Talkback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install or remove the listening session.
    pub fn set_session(&mut self, sink: Option<Box<dyn SessionSink>>) {
        self.sink = sink;
    }

    pub fn has_session(&self) -> bool {
        self.sink.is_some()
    }

    /// Forward reply bytes; without a session the bytes are dropped and
    /// the caller reports `NoListeningSession`.
    pub fn reply(&mut self, bytes: &[u8]) -> Result<()> {
        match self.sink.as_mut() {
            Some(sink) => {
                sink.send(bytes);
                Ok(())
            }
            None => {
                self.dropped_replies += 1;
                Err(Error::NoListeningSession)
            }
        }
    }

    /// Replies dropped so far for lack of a session.
    pub fn dropped_replies(&self) -> u64 {
        self.dropped_replies
    }
}

impl fmt::Debug for Talkback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Talkback")
            .field("has_session", &self.sink.is_some())
            .field("dropped_replies", &self.dropped_replies)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_reply_reaches_session() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let mut talkback = Talkback::new();
        talkback.set_session(Some(Box::new(move |bytes: &[u8]| {
            sink.borrow_mut().extend_from_slice(bytes)
        })));

        talkback.reply(b"\x1b[0n").unwrap();
        assert_eq!(*seen.borrow(), b"\x1b[0n");
    }

    #[test]
    fn test_reply_without_session_is_counted() {
        let mut talkback = Talkback::new();
        assert_eq!(talkback.reply(b"x"), Err(Error::NoListeningSession));
        assert_eq!(talkback.reply(b"y"), Err(Error::NoListeningSession));
        assert_eq!(talkback.dropped_replies(), 2);
    }

    #[test]
    fn test_clearing_session() {
        let mut talkback = Talkback::new();
        talkback.set_session(Some(Box::new(|_: &[u8]| {})));
        assert!(talkback.has_session());
        talkback.set_session(None);
        assert!(!talkback.has_session());
    }
}
