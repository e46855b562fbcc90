//! Wiegand-26 decoder.
//!
//! The reader pulses one of two open-collector lines per transmitted bit:
//! DATA0 for a 0, DATA1 for a 1.  The GPIO ISRs do the minimum possible —
//! shift the bit into a packed atomic — and the main-loop poll path drains
//! and interprets the accumulated bits.
//!
//! Frame layout (26 bits):
//!
//! | bit 1        | bits 2–25           | bit 26      |
//! |--------------|---------------------|-------------|
//! | even parity  | 24-bit payload, MSB-first | odd parity |
//!
//! The even group covers payload bits 1–12, the odd group bits 13–24.
//! A read is `valid` only when **both** groups check out.  Reads that
//! complete with bad parity are still emitted — the arbiter counts any
//! completed read as tag presence, which keeps the door working with
//! readers that occasionally drop a pulse.  A read that stalls short of
//! 26 bits is abandoned after an idle window.

use core::sync::atomic::{AtomicU64, Ordering};

use super::{RfidDecoder, TagEvent, TagId};

/// Wiegand-26 frame length in bits.
const FRAME_BITS: u8 = 26;

// ── ISR-side accumulator ──────────────────────────────────────
//
// Count and bits are packed into one atomic so an ISR shift-in and the
// poll-side claim can never observe each other half-done.
// Layout: bits 56–63 = pulse count, bits 0–55 = bit values, oldest first.

static PULSE_STATE: AtomicU64 = AtomicU64::new(0);

const COUNT_SHIFT: u32 = 56;
/// Bit-slot capacity of the packed accumulator.
const PULSE_CAP: u32 = 56;
const BITS_MASK: u64 = (1u64 << COUNT_SHIFT) - 1;

fn record_pulse(is_one: bool) {
    loop {
        let state = PULSE_STATE.load(Ordering::Acquire);
        let count = (state >> COUNT_SHIFT) as u32;
        if count >= PULSE_CAP {
            return; // Accumulator full; poll side will claim and reset.
        }

        let bits = (state & BITS_MASK) << 1 | u64::from(is_one);
        let next = (u64::from(count + 1) << COUNT_SHIFT) | (bits & BITS_MASK);

        if PULSE_STATE
            .compare_exchange(state, next, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            return;
        }
        // Lost the race against the other data line's ISR — retry.
    }
}

/// DATA0 falling-edge handler: one 0-bit.
/// Safe in interrupt context (lock-free atomic CAS only).
pub fn isr_data0() {
    record_pulse(false);
}

/// DATA1 falling-edge handler: one 1-bit.
/// Safe in interrupt context (lock-free atomic CAS only).
pub fn isr_data1() {
    record_pulse(true);
}

/// Atomically claim and clear every pulse accumulated since the last claim.
/// Returns (count, bits) with the oldest pulse in the highest of `count` bits.
fn claim_pulses() -> (u32, u64) {
    let state = PULSE_STATE.swap(0, Ordering::AcqRel);
    ((state >> COUNT_SHIFT) as u32, state & BITS_MASK)
}

// ── Poll-side decoder ─────────────────────────────────────────

pub struct WiegandDecoder {
    /// Bits consumed so far for the in-progress frame (0..=26).
    bit_count: u8,
    even_bit: u8,
    odd_bit: u8,
    /// Payload bits 2–25 packed MSB-first.
    card: [u8; 3],
    read_complete: bool,
    /// Timestamp of the most recent pulse; drives the stall reset.
    last_activity_ms: u32,
    idle_reset_ms: u32,
}

impl WiegandDecoder {
    pub fn new(idle_reset_ms: u32) -> Self {
        Self {
            bit_count: 0,
            even_bit: 0,
            odd_bit: 0,
            card: [0; 3],
            read_complete: false,
            last_activity_ms: 0,
            idle_reset_ms,
        }
    }

    /// Consume one bit in arrival order.
    pub fn push_bit(&mut self, is_one: bool, now_ms: u32) {
        if self.read_complete {
            return; // Hold the finished frame until poll() emits it.
        }
        self.last_activity_ms = now_ms;
        self.bit_count += 1;

        match self.bit_count {
            1 => self.even_bit = u8::from(is_one),
            2..=25 => {
                if is_one {
                    let idx = usize::from(self.bit_count - 2);
                    self.card[idx / 8] |= 0x80 >> (idx % 8);
                }
            }
            _ => {
                self.odd_bit = u8::from(is_one);
                self.read_complete = true;
            }
        }
    }

    /// Recompute both parity groups over the packed payload.
    ///
    /// Even group: payload bits 1–12 plus the leading parity bit must sum
    /// even.  Odd group: payload bits 13–24 plus the trailing parity bit
    /// must sum odd.  Both must hold.
    fn check_parity(&self) -> bool {
        let even_count = self.card[0].count_ones() + (self.card[1] >> 4).count_ones();
        let odd_count = (self.card[1] & 0x0F).count_ones() + self.card[2].count_ones();

        even_count % 2 == u32::from(self.even_bit) && odd_count % 2 != u32::from(self.odd_bit)
    }

    fn clear(&mut self) {
        self.bit_count = 0;
        self.even_bit = 0;
        self.odd_bit = 0;
        self.card = [0; 3];
        self.read_complete = false;
    }

    /// 8-bit facility code / 16-bit card number split of a decoded payload.
    pub fn split_payload(id: &[u8]) -> (u8, u16) {
        if id.len() < 3 {
            return (0, 0);
        }
        (id[0], u16::from_be_bytes([id[1], id[2]]))
    }
}

impl RfidDecoder for WiegandDecoder {
    fn feed_byte(&mut self, _byte: u8) {
        // Edge-interrupt reader; no serial input.
    }

    fn poll(&mut self, now_ms: u32) -> Option<TagEvent> {
        // Drain whatever the ISRs accumulated since the last tick.
        let (count, bits) = claim_pulses();
        for i in (0..count).rev() {
            self.push_bit((bits >> i) & 1 == 1, now_ms);
        }

        if self.read_complete {
            let valid = self.check_parity();
            if !valid {
                log::warn!("wiegand: parity check failed, emitting as presence-only read");
            }
            let event = TagEvent {
                id: TagId::from_slice(&self.card).unwrap_or_default(),
                valid,
                at_ms: now_ms,
            };
            self.clear();
            return Some(event);
        }

        // A stalled partial read (reader unplugged mid-frame, noise burst)
        // is abandoned after the idle window.
        if self.bit_count > 0
            && now_ms.wrapping_sub(self.last_activity_ms) > self.idle_reset_ms
        {
            log::warn!(
                "wiegand: discarding stalled read ({} of {} bits)",
                self.bit_count,
                FRAME_BITS
            );
            self.clear();
        }

        None
    }

    fn reset(&mut self) {
        claim_pulses();
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build the 26-bit frame for a 24-bit payload with correct parity.
    fn frame_for(payload: u32) -> [bool; 26] {
        let mut bits = [false; 26];
        for i in 0..24 {
            bits[1 + i] = (payload >> (23 - i)) & 1 == 1;
        }
        let upper_ones = (payload >> 12).count_ones();
        let lower_ones = (payload & 0xFFF).count_ones();
        bits[0] = upper_ones % 2 == 1; // even parity over first 12 bits
        bits[25] = lower_ones % 2 == 0; // odd parity over last 12 bits
        bits
    }

    fn push_frame(dec: &mut WiegandDecoder, bits: &[bool]) {
        for (i, &b) in bits.iter().enumerate() {
            dec.push_bit(b, i as u32);
        }
    }

    #[test]
    fn correct_frame_decodes_valid() {
        let mut dec = WiegandDecoder::new(2000);
        push_frame(&mut dec, &frame_for(0x00AB_CDEF));

        let ev = dec.poll(100).expect("frame should complete");
        assert!(ev.valid);
        assert_eq!(ev.id.as_slice(), &[0xAB, 0xCD, 0xEF]);
    }

    #[test]
    fn flipped_payload_bit_fails_parity_but_still_emits() {
        let mut dec = WiegandDecoder::new(2000);
        let mut bits = frame_for(0x00AB_CDEF);
        bits[5] = !bits[5]; // corrupt a payload bit in the even group

        push_frame(&mut dec, &bits);
        let ev = dec.poll(100).expect("completed frames always emit");
        assert!(!ev.valid);
    }

    #[test]
    fn both_parity_groups_must_hold() {
        let mut dec = WiegandDecoder::new(2000);
        let mut bits = frame_for(0x00AB_CDEF);
        bits[25] = !bits[25]; // corrupt only the odd parity bit

        push_frame(&mut dec, &bits);
        assert!(!dec.poll(100).expect("emits regardless").valid);
    }

    #[test]
    fn facility_and_card_split() {
        let (facility, card) = WiegandDecoder::split_payload(&[0xAB, 0xCD, 0xEF]);
        assert_eq!(facility, 0xAB);
        assert_eq!(card, 0xCDEF);
    }

    #[test]
    fn stalled_read_resets_after_idle_window() {
        let mut dec = WiegandDecoder::new(2000);
        for i in 0..10 {
            dec.push_bit(true, i);
        }
        assert_eq!(dec.poll(100), None);
        assert_eq!(dec.bit_count, 10);

        // Past the idle window the partial read is dropped.
        assert_eq!(dec.poll(2101), None);
        assert_eq!(dec.bit_count, 0);

        // A fresh full frame decodes normally afterwards.
        let bits = frame_for(0x0012_3456);
        for (i, &b) in bits.iter().enumerate() {
            dec.push_bit(b, 3000 + i as u32);
        }
        let ev = dec.poll(3100).unwrap();
        assert!(ev.valid);
        assert_eq!(ev.id.as_slice(), &[0x12, 0x34, 0x56]);
    }

    #[test]
    fn decoder_state_clears_after_emission() {
        let mut dec = WiegandDecoder::new(2000);
        push_frame(&mut dec, &frame_for(0x00FF_0001));
        assert!(dec.poll(50).is_some());
        assert_eq!(dec.bit_count, 0);
        assert_eq!(dec.card, [0; 3]);
        assert_eq!(dec.poll(60), None);
    }

    #[test]
    fn all_zero_payload_has_valid_parity() {
        // 0 ones in the even group (even ✓ with parity bit 0); 0 ones in the
        // odd group, so the odd parity bit must be 1.
        let mut dec = WiegandDecoder::new(2000);
        push_frame(&mut dec, &frame_for(0));
        let ev = dec.poll(10).unwrap();
        assert!(ev.valid);
        assert_eq!(ev.id.as_slice(), &[0, 0, 0]);
    }
}
