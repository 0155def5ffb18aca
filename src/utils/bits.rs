use crate::error::{Result, VdkError};

/// A bit-level reader for H.264/H.265 RBSP data.
///
/// Implements the reads slice and parameter set headers need:
/// - single flags and fixed-width fields up to 32 bits
/// - unsigned exponential Golomb codes (ue(v))
/// - signed exponential Golomb codes (se(v))
///
/// Every read fails cleanly with [`VdkError::InvalidData`] on overrun, so a
/// truncated header never yields a partially decoded value.
///
/// Example:
/// ```
/// use vdkes::utils::BitReader;
///
/// let data = [0b10110011];
/// let mut reader = BitReader::new(&data);
///
/// assert_eq!(reader.read_bit().unwrap(), true);   // 1
/// assert_eq!(reader.read_bits(3).unwrap(), 0b011); // 011
/// ```
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    byte_offset: usize,
    bit_offset: u8,
}

impl<'a> BitReader<'a> {
    /// Creates a new BitReader from a byte slice
    pub fn new(data: &'a [u8]) -> Self {
        BitReader {
            data,
            byte_offset: 0,
            bit_offset: 0,
        }
    }

    /// Reads a single bit; true for 1.
    pub fn read_bit(&mut self) -> Result<bool> {
        let byte = *self
            .data
            .get(self.byte_offset)
            .ok_or_else(|| VdkError::InvalidData("bit reader overrun".into()))?;

        let bit = (byte >> (7 - self.bit_offset)) & 1;
        self.bit_offset += 1;
        if self.bit_offset == 8 {
            self.bit_offset = 0;
            self.byte_offset += 1;
        }

        Ok(bit == 1)
    }

    /// Reads `n` bits MSB first. `n` must not exceed 32.
    pub fn read_bits(&mut self, n: u32) -> Result<u32> {
        if n > 32 {
            return Err(VdkError::InvalidData(format!(
                "cannot read {} bits at once",
                n
            )));
        }
        if n as usize > self.available_bits() {
            return Err(VdkError::InvalidData(format!(
                "bit reader overrun: {} bits requested, {} available",
                n,
                self.available_bits()
            )));
        }

        let mut value = 0u64;
        let mut remaining = n;
        while remaining > 0 {
            let in_byte = 8 - self.bit_offset as u32;
            let take = in_byte.min(remaining);
            let shift = in_byte - take;
            let mask = ((1u32 << take) - 1) as u8;
            let bits = (self.data[self.byte_offset] >> shift) & mask;

            value = (value << take) | bits as u64;
            remaining -= take;
            self.bit_offset += take as u8;
            if self.bit_offset == 8 {
                self.bit_offset = 0;
                self.byte_offset += 1;
            }
        }

        Ok(value as u32)
    }

    /// Reads `n` bits (at most 64) into a u64.
    pub fn read_bits_u64(&mut self, n: u32) -> Result<u64> {
        if n > 64 {
            return Err(VdkError::InvalidData(format!(
                "cannot read {} bits at once",
                n
            )));
        }
        let high_bits = n.saturating_sub(32);
        let high = self.read_bits(high_bits)? as u64;
        let low = self.read_bits(n - high_bits)? as u64;
        Ok((high << (n - high_bits)) | low)
    }

    /// Reads an unsigned exponential Golomb code (ue(v)).
    ///
    /// `M` leading zeros, a one, then `M` info bits: value = 2^M + INFO - 1.
    pub fn read_golomb(&mut self) -> Result<u32> {
        let mut leading_zeros = 0;
        while !self.read_bit()? {
            leading_zeros += 1;
            if leading_zeros > 31 {
                return Err(VdkError::InvalidData("invalid Golomb code".into()));
            }
        }

        if leading_zeros == 0 {
            return Ok(0);
        }

        let info = self.read_bits(leading_zeros)? as u64;
        Ok(((1u64 << leading_zeros) + info - 1) as u32)
    }

    /// Reads a signed exponential Golomb code (se(v)).
    ///
    /// Odd codes map to positive values, even codes to negative ones.
    pub fn read_signed_golomb(&mut self) -> Result<i32> {
        let k = self.read_golomb()? as i64;
        let magnitude = (k + 1) >> 1;
        let value = if k & 1 == 1 { magnitude } else { -magnitude };
        Ok(value as i32)
    }

    /// Reads a ue(v) value and rejects anything above `max`.
    pub fn read_golomb_max(&mut self, max: u32, name: &str) -> Result<u32> {
        let value = self.read_golomb()?;
        if value > max {
            return Err(VdkError::InvalidData(format!("{} {} out of range", name, value)));
        }
        Ok(value)
    }

    /// Skips one ue(v) value.
    pub fn skip_golomb(&mut self) -> Result<()> {
        self.read_golomb().map(|_| ())
    }

    /// Skips `n` bits.
    pub fn skip_bits(&mut self, n: u32) -> Result<()> {
        if n as usize > self.available_bits() {
            return Err(VdkError::InvalidData(format!(
                "bit reader overrun: cannot skip {} bits",
                n
            )));
        }
        let position = self.bit_position() + n as usize;
        self.byte_offset = position / 8;
        self.bit_offset = (position % 8) as u8;
        Ok(())
    }

    /// Aligns reader to next byte boundary by skipping remaining bits in current byte.
    pub fn align_byte(&mut self) {
        if self.bit_offset != 0 {
            self.bit_offset = 0;
            self.byte_offset += 1;
        }
    }

    /// Number of bits consumed so far.
    pub fn bit_position(&self) -> usize {
        self.byte_offset * 8 + self.bit_offset as usize
    }

    /// Returns number of bits available to read.
    pub fn available_bits(&self) -> usize {
        (self.data.len() * 8).saturating_sub(self.bit_position())
    }
}

/// MSB-first bit writer, the counterpart of [`BitReader`].
///
/// Used to pack the bit fields of configuration records and to synthesize
/// headers.
#[derive(Debug, Default, Clone)]
pub struct BitWriter {
    data: Vec<u8>,
    bit_count: usize,
}

impl BitWriter {
    /// Creates an empty writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a single bit.
    pub fn write_bit(&mut self, bit: bool) {
        if self.bit_count % 8 == 0 {
            self.data.push(0);
        }
        if bit {
            let last = self.data.len() - 1;
            self.data[last] |= 1 << (7 - (self.bit_count % 8));
        }
        self.bit_count += 1;
    }

    /// Appends the lowest `n` bits of `value`, MSB first.
    pub fn write_bits(&mut self, value: u64, n: u32) {
        for i in (0..n).rev() {
            self.write_bit((value >> i) & 1 == 1);
        }
    }

    /// Appends an unsigned exponential Golomb code.
    pub fn write_golomb(&mut self, value: u32) {
        let code = value as u64 + 1;
        let bits = 64 - code.leading_zeros();
        self.write_bits(0, bits - 1);
        self.write_bits(code, bits);
    }

    /// Appends a signed exponential Golomb code.
    pub fn write_signed_golomb(&mut self, value: i32) {
        let code = if value > 0 {
            (value as i64) * 2 - 1
        } else {
            -(value as i64) * 2
        };
        self.write_golomb(code as u32);
    }

    /// Appends the rbsp_stop_one_bit and zero bits up to the next byte boundary.
    pub fn write_trailing_bits(&mut self) {
        self.write_bit(true);
        self.align_byte();
    }

    /// Pads with zero bits up to the next byte boundary.
    pub fn align_byte(&mut self) {
        while self.bit_count % 8 != 0 {
            self.write_bit(false);
        }
    }

    /// Number of bits written so far.
    pub fn bit_len(&self) -> usize {
        self.bit_count
    }

    /// Consumes the writer; a partial last byte is zero padded.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}
