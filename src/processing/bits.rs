use crate::{Error, Result};

/// MSB-first bit reader with Exp-Golomb decoding, for SPS parsing.
///
/// Operates on RBSP data; strip emulation prevention bytes first with
/// [`remove_emulation_prevention`].
pub struct BitReader<'a> {
    data: &'a [u8],
    byte_pos: usize,
    /// Bit within the current byte, 0 is the MSB
    bit_pos: u8,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        BitReader {
            data,
            byte_pos: 0,
            bit_pos: 0,
        }
    }

    /// Current position in bits
    pub fn position(&self) -> usize {
        self.byte_pos * 8 + self.bit_pos as usize
    }

    pub fn read_bit(&mut self) -> Result<u8> {
        let byte = *self
            .data
            .get(self.byte_pos)
            .ok_or_else(|| Error::protocol("Bitstream read past end"))?;
        let bit = (byte >> (7 - self.bit_pos)) & 1;

        self.bit_pos += 1;
        if self.bit_pos == 8 {
            self.bit_pos = 0;
            self.byte_pos += 1;
        }
        Ok(bit)
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_bit()? == 1)
    }

    /// Read N bits as u32 (N <= 32)
    pub fn read_bits(&mut self, n: u32) -> Result<u32> {
        if n > 32 {
            return Err(Error::protocol("Cannot read more than 32 bits at once"));
        }
        let mut value = 0u32;
        for _ in 0..n {
            value = (value << 1) | self.read_bit()? as u32;
        }
        Ok(value)
    }

    pub fn skip_bits(&mut self, n: u32) -> Result<()> {
        for _ in 0..n {
            self.read_bit()?;
        }
        Ok(())
    }

    /// Unsigned Exp-Golomb ue(v)
    pub fn read_ue(&mut self) -> Result<u32> {
        let mut leading_zeros = 0u32;
        while self.read_bit()? == 0 {
            leading_zeros += 1;
            if leading_zeros > 31 {
                return Err(Error::protocol("Exp-Golomb code too long"));
            }
        }
        if leading_zeros == 0 {
            return Ok(0);
        }
        let suffix = self.read_bits(leading_zeros)?;
        Ok(((1u64 << leading_zeros) - 1 + suffix as u64) as u32)
    }

    /// Signed Exp-Golomb se(v): 1, 2, 3, 4 map to 1, -1, 2, -2
    pub fn read_se(&mut self) -> Result<i32> {
        let k = self.read_ue()? as i64;
        let value = if k % 2 == 1 { (k + 1) / 2 } else { -(k / 2) };
        Ok(value as i32)
    }
}

/// Drop the 0x03 in every 0x00 0x00 0x03 sequence of a NAL unit
pub fn remove_emulation_prevention(nal: &[u8]) -> Vec<u8> {
    let mut rbsp = Vec::with_capacity(nal.len());
    let mut zeros = 0;
    for &byte in nal {
        if zeros >= 2 && byte == 0x03 {
            zeros = 0;
            continue;
        }
        zeros = if byte == 0 { zeros + 1 } else { 0 };
        rbsp.push(byte);
    }
    rbsp
}
