//! Fixed-width bit packing for sensor words and table entries

/// Accumulates fields most-significant first.
///
/// Each `push` shifts the existing word left by the field width and ORs the
/// masked value in, so the first field pushed ends up in the top bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BitField {
    value: u32,
    width: u32,
}

impl BitField {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `bits` low bits of `value`; anything above is masked away
    pub fn push(&mut self, value: u32, bits: u32) -> &mut Self {
        if bits > 0 {
            self.value = (self.value << bits) | (value & mask(bits));
            self.width += bits;
        }
        self
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn width(&self) -> u32 {
        self.width
    }
}

#[inline]
pub fn mask(bits: u32) -> u32 {
    if bits >= 32 {
        u32::MAX
    } else {
        (1u32 << bits) - 1
    }
}

/// Split a packed word back into fields of the given widths (first width = top bits)
pub fn unpack(mut value: u32, widths: &[u32]) -> Vec<u32> {
    let mut out = vec![0; widths.len()];
    for (slot, &bits) in out.iter_mut().zip(widths).rev() {
        *slot = value & mask(bits);
        value = if bits >= 32 { 0 } else { value >> bits };
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_field_is_most_significant() {
        let mut field = BitField::new();
        field.push(0b11, 2).push(0b01, 2);
        assert_eq!(field.value(), 0b1101);
        assert_eq!(field.width(), 4);
    }

    #[test]
    fn test_values_are_masked_to_width() {
        let mut field = BitField::new();
        field.push(0b111, 2);
        assert_eq!(field.value(), 0b11);
    }

    #[test]
    fn test_zero_width_field_is_skipped() {
        let mut field = BitField::new();
        field.push(1, 1).push(0xff, 0).push(0, 1);
        assert_eq!(field.value(), 0b10);
        assert_eq!(field.width(), 2);
    }

    #[test]
    fn test_unpack_matches_push_order() {
        let mut field = BitField::new();
        field.push(2, 2).push(5, 3).push(0, 0).push(1, 1);
        assert_eq!(unpack(field.value(), &[2, 3, 0, 1]), vec![2, 5, 0, 1]);
    }
}
