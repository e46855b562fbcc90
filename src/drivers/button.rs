//! Level-debounced button input.
//!
//! ## Hardware
//!
//! Active-low momentary switch with external pull-up.  The main loop reads
//! the raw pin level each control tick and feeds it to [`DebouncedInput::poll`],
//! which commits a new level only after it has been stable for the debounce
//! window and reports the committed transition.
//!
//! This is a level debouncer, not an edge-capture: the poll interval must be
//! shorter than the debounce window, and pulses shorter than the window are
//! dropped.  Press *and* release both matter here — the door button holds
//! the door open and the feed button runs the auger only while held.

/// Committed button transitions after debouncing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Pressed,
    Released,
}

/// Debounce state for one physical button.
pub struct DebouncedInput {
    debounce_ms: u32,
    /// Raw level seen on the previous poll (true = pressed).
    last_raw: bool,
    /// Timestamp of the last raw level change.
    last_change_ms: u32,
    /// Committed (debounced) level.
    debounced: bool,
}

impl DebouncedInput {
    pub fn new(debounce_ms: u32) -> Self {
        Self {
            debounce_ms,
            last_raw: false,
            last_change_ms: 0,
            debounced: false,
        }
    }

    /// Feed one raw sample.  `raw_pressed` is the electrical state mapped to
    /// "button held" (LOW on the wire for a pull-up switch).  Returns the
    /// committed transition, if the sample completed one.
    pub fn poll(&mut self, raw_pressed: bool, now_ms: u32) -> Option<Transition> {
        if raw_pressed != self.last_raw {
            self.last_change_ms = now_ms;
            self.last_raw = raw_pressed;
        }

        if now_ms.wrapping_sub(self.last_change_ms) > self.debounce_ms
            && raw_pressed != self.debounced
        {
            self.debounced = raw_pressed;
            return Some(if raw_pressed {
                Transition::Pressed
            } else {
                Transition::Released
            });
        }

        None
    }

    /// Committed level: true while the button is held.
    pub fn is_pressed(&self) -> bool {
        self.debounced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_press_commits_after_window() {
        let mut btn = DebouncedInput::new(50);
        assert_eq!(btn.poll(true, 0), None);
        assert_eq!(btn.poll(true, 30), None); // within window
        assert_eq!(btn.poll(true, 51), Some(Transition::Pressed));
        assert!(btn.is_pressed());
    }

    #[test]
    fn bounce_restarts_the_window() {
        let mut btn = DebouncedInput::new(50);
        btn.poll(true, 0);
        btn.poll(false, 20); // contact bounce
        btn.poll(true, 40); // window restarts at 40
        assert_eq!(btn.poll(true, 80), None); // only 40ms stable
        assert_eq!(btn.poll(true, 95), Some(Transition::Pressed));
    }

    #[test]
    fn short_glitch_is_dropped() {
        let mut btn = DebouncedInput::new(50);
        btn.poll(true, 0);
        assert_eq!(btn.poll(false, 10), None); // released before commit
        assert_eq!(btn.poll(false, 100), None); // level never committed high
        assert!(!btn.is_pressed());
    }

    #[test]
    fn release_emits_transition() {
        let mut btn = DebouncedInput::new(50);
        btn.poll(true, 0);
        assert_eq!(btn.poll(true, 60), Some(Transition::Pressed));
        btn.poll(false, 100);
        assert_eq!(btn.poll(false, 160), Some(Transition::Released));
        assert!(!btn.is_pressed());
    }

    #[test]
    fn no_repeat_events_while_held() {
        let mut btn = DebouncedInput::new(50);
        btn.poll(true, 0);
        assert_eq!(btn.poll(true, 60), Some(Transition::Pressed));
        for t in (70..500).step_by(10) {
            assert_eq!(btn.poll(true, t), None);
        }
    }
}
