//! Tag-presence & door arbiter.
//!
//! Decides when the feeder door servo opens and closes:
//!
//! ```text
//!            tag read                      button press
//!  CLOSED ──────────────▶ OPEN_BY_TAG ──────────────────▶ OPEN_BY_BUTTON
//!    ▲                        │      ▲                         │
//!    │  no tag for timeout    │      │ release, tag in window  │
//!    └────────────────────────┘      └─────────────────────────┘
//!                                         release, tag stale → CLOSED
//! ```
//!
//! The button is the highest-priority input: while held, the door stays
//! open no matter what the tag timeout says.  On release the arbiter falls
//! back to whatever the tag situation justifies.  Every completed reader
//! emission counts as a tag sighting (including parity-failed Wiegand
//! reads — see [`crate::rfid`]).

/// Door states.  The variant is also the reason the door is where it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorState {
    Closed,
    OpenByTag,
    OpenByButton,
}

/// Commands the arbiter issues to the servo layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorCommand {
    Open,
    Close,
}

pub struct DoorArbiter {
    state: DoorState,
    tag_timeout_ms: u32,
    /// Timestamp of the most recent tag sighting.
    last_tag_seen_ms: u32,
    /// False until the first sighting; guards the release fallback.
    tag_seen: bool,
}

impl DoorArbiter {
    pub fn new(tag_timeout_ms: u32) -> Self {
        Self {
            state: DoorState::Closed,
            tag_timeout_ms,
            last_tag_seen_ms: 0,
            tag_seen: false,
        }
    }

    pub fn state(&self) -> DoorState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state != DoorState::Closed
    }

    /// A completed reader emission — tag is present at the flap.
    pub fn on_tag(&mut self, now_ms: u32) -> Option<DoorCommand> {
        self.last_tag_seen_ms = now_ms;
        self.tag_seen = true;

        match self.state {
            DoorState::Closed => {
                self.state = DoorState::OpenByTag;
                Some(DoorCommand::Open)
            }
            // Already open: refresh the sighting only.  The button keeps
            // its priority; the tag time still counts for release fallback.
            DoorState::OpenByTag | DoorState::OpenByButton => None,
        }
    }

    /// Debounced door-button transition.
    pub fn on_button(&mut self, pressed: bool, now_ms: u32) -> Option<DoorCommand> {
        if pressed {
            let was_closed = self.state == DoorState::Closed;
            self.state = DoorState::OpenByButton;
            return was_closed.then_some(DoorCommand::Open);
        }

        if self.state != DoorState::OpenByButton {
            return None;
        }

        if self.tag_seen && !self.tag_stale(now_ms) {
            self.state = DoorState::OpenByTag;
            None // Door stays open on the tag's authority.
        } else {
            self.state = DoorState::Closed;
            Some(DoorCommand::Close)
        }
    }

    /// Periodic timeout check.  Call once per control tick.
    pub fn tick(&mut self, now_ms: u32) -> Option<DoorCommand> {
        if self.state == DoorState::OpenByTag && self.tag_stale(now_ms) {
            self.state = DoorState::Closed;
            return Some(DoorCommand::Close);
        }
        None
    }

    fn tag_stale(&self, now_ms: u32) -> bool {
        now_ms.wrapping_sub(self.last_tag_seen_ms) > self.tag_timeout_ms
    }
}
