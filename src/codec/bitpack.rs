//! Bit packing primitives
//!
//! `bit_pack`/`bit_unpack` handle fields up to 32 bits. The `double_*`
//! variants handle record pointers up to 64 bits by splitting them into a
//! high part and a 32-bit low word, in one of two historical orders.

/// Order in which the two halves of a wide field are laid out.
///
/// Older writers stored the low 32-bit word first; everything written by this
/// library uses the high part first, which is identical to packing the whole
/// value MSB-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerOrder {
    /// High `(width - 32)` bits, then the low 32 bits.
    #[default]
    Modern,

    /// Low 32 bits, then the high `(width - 32)` bits.
    Legacy,
}

/// Pack the low `numbits` bits of `value` into `buffer` at bit `start`.
///
/// `numbits` must be in `0..=32`; a width of zero writes nothing. Bits of
/// `value` above `numbits` are discarded.
pub fn bit_pack(buffer: &mut [u8], start: usize, numbits: u32, value: u32) {
    if numbits == 0 {
        return;
    }

    let value = truncate(value, numbits);
    let mut remaining = numbits as usize;
    let mut pos = start;

    while remaining > 0 {
        let byte = pos / 8;
        let avail = 8 - pos % 8;
        let take = avail.min(remaining);

        // Top `take` bits of what is left of the value
        let chunk = ((value >> (remaining - take)) as u8) & low_mask(take);
        let shift = avail - take;
        let mask = low_mask(take) << shift;

        buffer[byte] = (buffer[byte] & !mask) | (chunk << shift);

        remaining -= take;
        pos += take;
    }
}

/// Unpack a `numbits`-wide unsigned value from `buffer` at bit `start`.
pub fn bit_unpack(buffer: &[u8], start: usize, numbits: u32) -> u32 {
    let mut value: u32 = 0;
    let mut remaining = numbits as usize;
    let mut pos = start;

    while remaining > 0 {
        let byte = pos / 8;
        let avail = 8 - pos % 8;
        let take = avail.min(remaining);
        let shift = avail - take;

        let chunk = (buffer[byte] >> shift) & low_mask(take);
        value = (value << take) | chunk as u32;

        remaining -= take;
        pos += take;
    }

    value
}

/// Pack a field of up to 64 bits.
///
/// Widths of 32 bits or less are delegated to [`bit_pack`] and are not
/// affected by `order`.
pub fn double_bit_pack(buffer: &mut [u8], start: usize, numbits: u32, value: u64, order: PointerOrder) {
    if numbits <= 32 {
        bit_pack(buffer, start, numbits, value as u32);
        return;
    }

    let high_bits = numbits - 32;
    let high = (value >> 32) as u32;
    let low = value as u32;

    match order {
        PointerOrder::Modern => {
            bit_pack(buffer, start, high_bits, high);
            bit_pack(buffer, start + high_bits as usize, 32, low);
        }
        PointerOrder::Legacy => {
            bit_pack(buffer, start, 32, low);
            bit_pack(buffer, start + 32, high_bits, high);
        }
    }
}

/// Unpack a field of up to 64 bits written by [`double_bit_pack`].
pub fn double_bit_unpack(buffer: &[u8], start: usize, numbits: u32, order: PointerOrder) -> u64 {
    if numbits <= 32 {
        return bit_unpack(buffer, start, numbits) as u64;
    }

    let high_bits = numbits - 32;

    let (high, low) = match order {
        PointerOrder::Modern => (
            bit_unpack(buffer, start, high_bits),
            bit_unpack(buffer, start + high_bits as usize, 32),
        ),
        PointerOrder::Legacy => (
            bit_unpack(buffer, start + 32, high_bits),
            bit_unpack(buffer, start, 32),
        ),
    };

    ((high as u64) << 32) | low as u64
}

// =============================================================================
// Private Helpers
// =============================================================================

fn truncate(value: u32, numbits: u32) -> u32 {
    if numbits >= 32 {
        value
    } else {
        value & ((1u32 << numbits) - 1)
    }
}

/// Mask with the low `bits` bits set (`bits` in 1..=8)
fn low_mask(bits: usize) -> u8 {
    (0xffu16 >> (8 - bits)) as u8
}
