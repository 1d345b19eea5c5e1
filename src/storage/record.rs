use std::cmp::Ordering;
use bytes::{Buf, BufMut};
use crate::core::types::{Fingerprint, Move, MAX_PLY, VALUE_INFINITE};

/// Every record occupies one fixed-size slot regardless of format
pub const RECORD_SIZE: usize = 24;

/// Trailing bytes of a V1 slot. V2 keeps its count in the same place.
pub const V1_SENTINEL: [u8; 4] = [0x00, 0xFF, 0x00, 0xFF];

pub const COUNT_MAX: u16 = u16::MAX;

/// On-disk schema of one slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    V1,
    V2,
}

impl Format {
    pub const CURRENT: Format = Format::V2;
}

/// One learned fact: (position, move, score, depth, count).
///
/// The in-memory form is version-erased; `Format` only matters for how two
/// records are merged or ranked and for how a slot is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record {
    pub key: Fingerprint,
    pub mv: Move,
    pub value: i32,
    pub depth: i32,
    pub count: u16,
}

/// A decoded slot together with the format it was written in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedSlot {
    pub format: Format,
    pub record: Record,
}

impl Record {
    pub fn new(key: Fingerprint, mv: Move, value: i32, depth: i32, count: u16) -> Self {
        Record { key, mv, value, depth, count }
    }

    /// Builds a single-observation record, clamping value and depth into range.
    pub fn clamped(key: Fingerprint, mv: Move, value: i32, depth: i32) -> Self {
        Record {
            key,
            mv,
            value: value.clamp(-VALUE_INFINITE, VALUE_INFINITE),
            depth: depth.clamp(0, MAX_PLY),
            count: 1,
        }
    }

    pub fn same_fact(&self, other: &Record) -> bool {
        self.key == other.key && self.mv == other.mv
    }

    /// Folds `other` into `self`. Deeper evidence wins; equal depths average
    /// the values (truncated toward zero). V2 also sums the counts.
    pub fn merge(&mut self, other: &Record, format: Format) {
        debug_assert!(self.same_fact(other));

        if format == Format::V2 {
            let sum = self.count as u32 + other.count as u32;
            self.count = sum.min(COUNT_MAX as u32) as u16;
        }

        if self.depth > other.depth {
            return;
        }

        if self.depth == other.depth {
            self.value = ((self.value as i64 + other.value as i64) / 2) as i32;
        } else {
            self.value = other.value;
            self.depth = other.depth;
        }
    }

    fn rank(&self, format: Format) -> i64 {
        let value = self.value as i64;
        let depth = self.depth as i64;
        match format {
            Format::V1 => value * (depth / 5).max(1),
            Format::V2 => value * (depth / 10).max(1) * (self.count as i64 / 3).max(1),
        }
    }

    /// Orders two candidate moves of the same position; `Greater` means `self`
    /// is the better one.
    pub fn compare(&self, other: &Record, format: Format) -> Ordering {
        let by_rank = self.rank(format).cmp(&other.rank(format));
        match format {
            Format::V1 => by_rank.then(self.depth.cmp(&other.depth)),
            Format::V2 => by_rank
                .then(self.count.cmp(&other.count))
                .then(self.depth.cmp(&other.depth)),
        }
    }

    pub fn encode<B: BufMut>(&self, format: Format, buf: &mut B) {
        buf.put_u64_le(self.key.0);
        buf.put_u32_le(self.mv.0 as u32);
        buf.put_i32_le(self.value);
        buf.put_i32_le(self.depth);
        match format {
            Format::V1 => buf.put_slice(&V1_SENTINEL),
            Format::V2 => {
                buf.put_u16_le(self.count);
                buf.put_u16_le(0);
            }
        }
    }

    pub fn to_bytes(&self, format: Format) -> [u8; RECORD_SIZE] {
        let mut slot = [0u8; RECORD_SIZE];
        let mut cursor = &mut slot[..];
        self.encode(format, &mut cursor);
        slot
    }
}

/// Classifies and decodes one slot. A V2 slot whose trailing bytes happen to
/// equal the V1 sentinel is read as V1.
pub fn decode_slot(slot: &[u8; RECORD_SIZE]) -> DecodedSlot {
    let format = if slot[20..24] == V1_SENTINEL { Format::V1 } else { Format::V2 };

    let mut buf = &slot[..];
    let key = Fingerprint(buf.get_u64_le());
    let mv = Move((buf.get_u32_le() & 0xFFFF) as u16);
    let value = buf.get_i32_le();
    let depth = buf.get_i32_le();
    let count = match format {
        Format::V1 => 1,
        Format::V2 => buf.get_u16_le(),
    };

    DecodedSlot {
        format,
        record: Record { key, mv, value, depth, count },
    }
}
