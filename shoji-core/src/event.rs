//! Change notification
//!
//! Consumers subscribe per change kind and are called synchronously, in
//! registration order, whenever the screen fires an event of that kind.
//! Listeners receive only the event payload, never the screen itself, so a
//! listener cannot re-enter `process_bytes` on the screen that is
//! notifying it. Text edits are coalesced per region into one minimum
//! bounding range per `process_bytes` call before anything fires.

use std::fmt;

use crate::color::RgbColor16;
use crate::iterator::Region;
use crate::line::LineId;

/// The monitorable change kinds.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Change {
    /// The bell rang
    AudioEvent,
    /// The bell was enabled or disabled
    AudioState,
    /// The cursor moved
    CursorLocation,
    /// The cursor was shown or hidden
    CursorState,
    /// The malformed-sequence counter crossed its threshold (fires once)
    ExcessiveErrors,
    /// LNM toggled
    LineFeedNewLineMode,
    /// An LED changed
    NewLedState,
    /// The terminal was reset
    Reset,
    /// Rows or columns changed
    ScreenSize,
    /// Lines moved into or out of the scrollback
    ScrollActivity,
    /// Text changed inside the described range
    TextEdited,
    /// Text in the described range is about to be destroyed
    TextRemoved,
    /// Reverse video toggled
    VideoMode,
    /// A new window title arrived
    WindowFrameTitle,
    /// A new icon title arrived
    WindowIconTitle,
    /// The application asked to minimize or restore the window
    WindowMinimization,
    /// A palette entry changed
    XtermColor,
}

impl fmt::Debug for Change {
    /// Keeps the historical four-character tags for log output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Change::AudioEvent => "Bell",
            Change::AudioState => "BEnD",
            Change::CursorLocation => "Curs",
            Change::CursorState => "CurV",
            Change::ExcessiveErrors => "Errr",
            Change::LineFeedNewLineMode => "LFNL",
            Change::NewLedState => "LEDS",
            Change::Reset => "Rset",
            Change::ScreenSize => "SSiz",
            Change::ScrollActivity => "^v<>",
            Change::TextEdited => "UpdT",
            Change::TextRemoved => "DelT",
            Change::VideoMode => "RevV",
            Change::WindowFrameTitle => "WinT",
            Change::WindowIconTitle => "IcnT",
            Change::WindowMinimization => "MnmR",
            Change::XtermColor => "XTCl",
        };
        write!(f, "Change({tag})")
    }
}

/// A row/column range touched by an edit, search match, or removal.
/// Columns are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeDescription {
    pub region: Region,
    pub first_row: LineId,
    pub last_row: LineId,
    pub first_column: usize,
    pub last_column: usize,
    pub rectangular: bool,
}

/// How a scroll moved content, for scroll-bar maintenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollDescription {
    /// Negative when content moved up into the scrollback, positive when
    /// it moved down, zero when the scrollback changed some other way
    pub row_delta: i32,
}

/// A palette entry assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XtermColorDescription {
    /// Palette index, 16..=255
    pub index: u16,
    pub color: RgbColor16,
}

/// A fired notification.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    AudioEvent,
    AudioState { enabled: bool },
    CursorLocation { row: usize, column: usize },
    CursorState { visible: bool },
    ExcessiveErrors,
    LineFeedNewLineMode { enabled: bool },
    NewLedState { leds: [bool; 4] },
    Reset,
    ScreenSize { columns: usize, rows: usize },
    ScrollActivity(ScrollDescription),
    TextEdited(RangeDescription),
    TextRemoved(RangeDescription),
    VideoMode { reverse: bool },
    WindowFrameTitle { title: String },
    WindowIconTitle { title: String },
    WindowMinimization { minimize: bool },
    XtermColor(XtermColorDescription),
}

impl Event {
    /// The topic this event fires under.
    pub fn change(&self) -> Change {
        match self {
            Event::AudioEvent => Change::AudioEvent,
            Event::AudioState { .. } => Change::AudioState,
            Event::CursorLocation { .. } => Change::CursorLocation,
            Event::CursorState { .. } => Change::CursorState,
            Event::ExcessiveErrors => Change::ExcessiveErrors,
            Event::LineFeedNewLineMode { .. } => Change::LineFeedNewLineMode,
            Event::NewLedState { .. } => Change::NewLedState,
            Event::Reset => Change::Reset,
            Event::ScreenSize { .. } => Change::ScreenSize,
            Event::ScrollActivity(_) => Change::ScrollActivity,
            Event::TextEdited(_) => Change::TextEdited,
            Event::TextRemoved(_) => Change::TextRemoved,
            Event::VideoMode { .. } => Change::VideoMode,
            Event::WindowFrameTitle { .. } => Change::WindowFrameTitle,
            Event::WindowIconTitle { .. } => Change::WindowIconTitle,
            Event::WindowMinimization { .. } => Change::WindowMinimization,
            Event::XtermColor(_) => Change::XtermColor,
        }
    }
}

/// A subscriber: one capability object exposing one method.
pub trait ChangeListener {
    fn handle_change(&self, event: &Event);
}

/// Blanket implementation so plain closures subscribe directly.
impl<F: Fn(&Event)> ChangeListener for F {
    fn handle_change(&self, event: &Event) {
        self(event)
    }
}

/// Identity of one registration, used to stop monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerToken(u64);

struct Registration {
    token: ListenerToken,
    change: Change,
    listener: Box<dyn ChangeListener>,
}

/// Per-screen listener registry.
#[derive(Default)]
pub struct ListenerBus {
    registrations: Vec<Registration>,
    next_token: u64,
}

impl ListenerBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, change: Change, listener: Box<dyn ChangeListener>) -> ListenerToken {
        let token = ListenerToken(self.next_token);
        self.next_token += 1;
        self.registrations.push(Registration {
            token,
            change,
            listener,
        });
        token
    }

    /// Remove a registration; true when it existed.
    pub fn unsubscribe(&mut self, token: ListenerToken) -> bool {
        let before = self.registrations.len();
        self.registrations.retain(|r| r.token != token);
        self.registrations.len() != before
    }

    /// Deliver to every subscriber of the event's topic, in registration
    /// order.
    pub fn fire(&self, event: &Event) {
        let change = event.change();
        for registration in &self.registrations {
            if registration.change == change {
                registration.listener.handle_change(event);
            }
        }
    }

    /// True when someone subscribed to this change kind.
    pub fn has_listeners(&self, change: Change) -> bool {
        self.registrations.iter().any(|r| r.change == change)
    }
}

impl fmt::Debug for ListenerBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerBus")
            .field("registrations", &self.registrations.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder() -> (Rc<RefCell<Vec<Event>>>, Box<dyn ChangeListener>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let listener = Box::new(move |event: &Event| sink.borrow_mut().push(event.clone()));
        (seen, listener)
    }

    #[test]
    fn test_fire_reaches_matching_topic_only() {
        let mut bus = ListenerBus::new();
        let (seen, listener) = recorder();
        bus.subscribe(Change::AudioEvent, listener);

        bus.fire(&Event::AudioEvent);
        bus.fire(&Event::Reset);

        assert_eq!(*seen.borrow(), vec![Event::AudioEvent]);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let mut bus = ListenerBus::new();
        let (seen, listener) = recorder();
        let token = bus.subscribe(Change::Reset, listener);

        bus.fire(&Event::Reset);
        assert!(bus.unsubscribe(token));
        bus.fire(&Event::Reset);

        assert_eq!(seen.borrow().len(), 1);
        assert!(!bus.unsubscribe(token));
    }

    #[test]
    fn test_delivery_in_registration_order() {
        let mut bus = ListenerBus::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let sink = order.clone();
            bus.subscribe(
                Change::Reset,
                Box::new(move |_: &Event| sink.borrow_mut().push(tag)),
            );
        }
        bus.fire(&Event::Reset);
        assert_eq!(*order.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_debug_tags() {
        assert_eq!(format!("{:?}", Change::TextEdited), "Change(UpdT)");
        assert_eq!(format!("{:?}", Change::XtermColor), "Change(XTCl)");
    }

    #[test]
    fn test_event_topic_mapping() {
        assert_eq!(Event::AudioEvent.change(), Change::AudioEvent);
        assert_eq!(
            Event::ScreenSize {
                columns: 80,
                rows: 24
            }
            .change(),
            Change::ScreenSize
        );
    }
}
