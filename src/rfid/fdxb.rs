//! FDX-B serial reader framer.
//!
//! The reader module does the RF work and forwards decoded tag data over
//! UART.  Two shipping firmwares differ in how they delimit a read:
//!
//! - **StxEtx** — 15-byte frames: `0x02`, 13 tag-data bytes, `0x03`.
//! - **Line**   — ASCII tag id terminated by CR and/or LF.
//!
//! Bytes accumulate in a fixed buffer; a buffer that fills without a
//! complete frame is dropped whole, and bytes past capacity are discarded
//! until the next reset.  Noise between frames is absorbed silently.

use super::{RfidDecoder, TagEvent, TagId};

/// Start-of-frame marker (ASCII STX).
const STX: u8 = 0x02;
/// End-of-frame marker (ASCII ETX).
const ETX: u8 = 0x03;

/// Total frame length in StxEtx mode, markers included.
pub const FRAME_LEN: usize = 15;
/// Tag data bytes carried by one frame.
pub const TAG_DATA_LEN: usize = FRAME_LEN - 2;

/// Accumulation buffer capacity.
pub const BUFFER_CAP: usize = 64;

/// Frame delimiting style emitted by the attached reader module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    StxEtx,
    Line,
}

pub struct FdxbDecoder {
    framing: Framing,
    buf: heapless::Vec<u8, BUFFER_CAP>,
    /// Line mode: a terminated, non-empty line waiting for poll().
    pending: Option<TagId>,
}

impl FdxbDecoder {
    pub fn new(framing: Framing) -> Self {
        Self {
            framing,
            buf: heapless::Vec::new(),
            pending: None,
        }
    }

    /// Scan the buffer for a complete STX..ETX frame and extract its
    /// interior bytes.  Leaves the buffer untouched when no frame is ready.
    fn scan_frame(&mut self) -> Option<TagId> {
        let len = self.buf.len();
        if len < FRAME_LEN {
            return None;
        }

        for start in 0..=(len - FRAME_LEN) {
            if self.buf[start] == STX && self.buf[start + FRAME_LEN - 1] == ETX {
                let id = TagId::from_slice(&self.buf[start + 1..start + FRAME_LEN - 1])
                    .unwrap_or_default();
                self.buf.clear();
                return Some(id);
            }
        }
        None
    }

    fn take_line(&mut self) {
        if !self.buf.is_empty() {
            self.pending = Some(TagId::from_slice(&self.buf).unwrap_or_default());
        }
        self.buf.clear();
    }
}

impl RfidDecoder for FdxbDecoder {
    fn feed_byte(&mut self, byte: u8) {
        match self.framing {
            Framing::StxEtx => {
                // Past capacity the byte is lost; poll() drops the dead
                // buffer and accumulation restarts clean.
                let _ = self.buf.push(byte);
            }
            Framing::Line => {
                if byte == b'\r' || byte == b'\n' {
                    self.take_line();
                } else {
                    let _ = self.buf.push(byte);
                }
            }
        }
    }

    fn poll(&mut self, now_ms: u32) -> Option<TagEvent> {
        match self.framing {
            Framing::StxEtx => {
                if let Some(id) = self.scan_frame() {
                    return Some(TagEvent {
                        id,
                        valid: true,
                        at_ms: now_ms,
                    });
                }
                if self.buf.is_full() {
                    log::warn!("fdxb: buffer full with no frame, dropping {} bytes", self.buf.len());
                    self.buf.clear();
                }
                None
            }
            Framing::Line => self.pending.take().map(|id| TagEvent {
                id,
                valid: true,
                at_ms: now_ms,
            }),
        }
    }

    fn reset(&mut self) {
        self.buf.clear();
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(dec: &mut FdxbDecoder, bytes: &[u8]) {
        for &b in bytes {
            dec.feed_byte(b);
        }
    }

    #[test]
    fn complete_frame_yields_interior_bytes() {
        let mut dec = FdxbDecoder::new(Framing::StxEtx);
        let data: [u8; TAG_DATA_LEN] = *b"9000012345678";

        dec.feed_byte(STX);
        feed(&mut dec, &data);
        dec.feed_byte(ETX);

        let ev = dec.poll(500).expect("frame should parse");
        assert!(ev.valid);
        assert_eq!(ev.id.as_slice(), &data);
        assert_eq!(ev.at_ms, 500);
    }

    #[test]
    fn frame_preceded_by_noise_still_parses() {
        let mut dec = FdxbDecoder::new(Framing::StxEtx);
        feed(&mut dec, &[0xFF, 0x00, 0x55]); // line noise before the frame
        dec.feed_byte(STX);
        feed(&mut dec, &[0x11; TAG_DATA_LEN]);
        dec.feed_byte(ETX);

        let ev = dec.poll(0).unwrap();
        assert_eq!(ev.id.as_slice(), &[0x11; TAG_DATA_LEN]);
    }

    #[test]
    fn missing_end_marker_yields_nothing() {
        let mut dec = FdxbDecoder::new(Framing::StxEtx);
        dec.feed_byte(STX);
        feed(&mut dec, &[0x22; TAG_DATA_LEN]);
        dec.feed_byte(0x7F); // wrong terminator

        assert_eq!(dec.poll(0), None);
    }

    #[test]
    fn full_buffer_without_frame_is_dropped() {
        let mut dec = FdxbDecoder::new(Framing::StxEtx);
        feed(&mut dec, &[0xAA; BUFFER_CAP + 16]); // overflow bytes are lost
        assert_eq!(dec.poll(0), None); // drops the dead buffer

        // Accumulation restarts cleanly after the drop.
        dec.feed_byte(STX);
        feed(&mut dec, &[0x33; TAG_DATA_LEN]);
        dec.feed_byte(ETX);
        assert!(dec.poll(0).is_some());
    }

    #[test]
    fn stx_without_enough_bytes_keeps_accumulating() {
        let mut dec = FdxbDecoder::new(Framing::StxEtx);
        dec.feed_byte(STX);
        feed(&mut dec, &[0x44; 5]);
        assert_eq!(dec.poll(0), None);

        feed(&mut dec, &[0x44; TAG_DATA_LEN - 5]);
        dec.feed_byte(ETX);
        assert_eq!(dec.poll(0).unwrap().id.as_slice(), &[0x44; TAG_DATA_LEN]);
    }

    #[test]
    fn line_mode_emits_on_terminator() {
        let mut dec = FdxbDecoder::new(Framing::Line);
        feed(&mut dec, b"982000123456789");
        assert_eq!(dec.poll(0), None); // no terminator yet

        dec.feed_byte(b'\r');
        let ev = dec.poll(10).unwrap();
        assert!(ev.valid);
        assert_eq!(ev.id.as_slice(), b"982000123456789");
    }

    #[test]
    fn line_mode_ignores_blank_lines() {
        let mut dec = FdxbDecoder::new(Framing::Line);
        dec.feed_byte(b'\r');
        dec.feed_byte(b'\n');
        assert_eq!(dec.poll(0), None);

        // CRLF after a line must not produce a second, empty event.
        feed(&mut dec, b"12345\r\n");
        assert!(dec.poll(0).is_some());
        assert_eq!(dec.poll(0), None);
    }

    #[test]
    fn reset_discards_partial_state() {
        let mut dec = FdxbDecoder::new(Framing::StxEtx);
        dec.feed_byte(STX);
        feed(&mut dec, &[0x55; 6]);
        dec.reset();

        feed(&mut dec, &[0x55; TAG_DATA_LEN - 6]);
        dec.feed_byte(ETX);
        assert_eq!(dec.poll(0), None); // pre-reset STX is gone
    }
}
