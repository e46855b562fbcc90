//! RFID tag ingestion.
//!
//! Two reader variants ship on PetFeeder boards: a two-wire Wiegand-26
//! access-control reader (edge interrupts) and a serial FDX-B animal-tag
//! reader module (framed or line-terminated byte stream).  Both are exposed
//! through the [`RfidDecoder`] capability and selected once at boot from
//! [`SystemConfig::reader`](crate::config::ReaderKind); the door arbiter
//! consumes their [`TagEvent`]s identically.

pub mod fdxb;
pub mod wiegand;

use crate::config::ReaderKind;

/// Upper bound for a raw tag identifier (3 bytes Wiegand, 13 bytes FDX-B
/// framed, up to a full line for line-mode readers).
pub const TAG_ID_CAP: usize = 32;

/// Raw tag identifier bytes as the reader delivered them.
pub type TagId = heapless::Vec<u8, TAG_ID_CAP>;

/// A completed read from the reader hardware.
///
/// `valid` is false for Wiegand reads that completed with a parity
/// mismatch.  Such reads are still emitted: the arbiter treats any
/// completed read as tag presence, so a noisy read still opens the door.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagEvent {
    pub id: TagId,
    pub valid: bool,
    /// Monotonic timestamp the read completed at.
    pub at_ms: u32,
}

/// Capability implemented by every decoder variant.
pub trait RfidDecoder {
    /// Feed one raw byte from a serial-attached reader.  No-op for
    /// decoders fed by edge interrupts.
    fn feed_byte(&mut self, byte: u8);

    /// Drain pending edge/byte state and return a completed read, if any.
    /// Call once per control tick.
    fn poll(&mut self, now_ms: u32) -> Option<TagEvent>;

    /// Discard all partial state.
    fn reset(&mut self);
}

/// The boot-selected decoder variant.
pub enum ReaderDecoder {
    Wiegand(wiegand::WiegandDecoder),
    Fdxb(fdxb::FdxbDecoder),
}

impl ReaderDecoder {
    pub fn from_config(kind: ReaderKind, wiegand_idle_reset_ms: u32) -> Self {
        match kind {
            ReaderKind::Wiegand => {
                Self::Wiegand(wiegand::WiegandDecoder::new(wiegand_idle_reset_ms))
            }
            ReaderKind::FdxbFramed => Self::Fdxb(fdxb::FdxbDecoder::new(fdxb::Framing::StxEtx)),
            ReaderKind::FdxbLine => Self::Fdxb(fdxb::FdxbDecoder::new(fdxb::Framing::Line)),
        }
    }
}

impl RfidDecoder for ReaderDecoder {
    fn feed_byte(&mut self, byte: u8) {
        match self {
            Self::Wiegand(d) => d.feed_byte(byte),
            Self::Fdxb(d) => d.feed_byte(byte),
        }
    }

    fn poll(&mut self, now_ms: u32) -> Option<TagEvent> {
        match self {
            Self::Wiegand(d) => d.poll(now_ms),
            Self::Fdxb(d) => d.poll(now_ms),
        }
    }

    fn reset(&mut self) {
        match self {
            Self::Wiegand(d) => d.reset(),
            Self::Fdxb(d) => d.reset(),
        }
    }
}
