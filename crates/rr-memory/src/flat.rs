//! Flat RAM bus
//!
//! A contiguous byte array implementing [`MemoryBus`]. Addresses wrap
//! around the array size, the way a partially decoded address bus mirrors
//! its RAM.

use rr_core::MemoryBus;

/// Byte order of multi-byte accesses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endianness {
    #[default]
    Little,
    Big,
}

/// Contiguous RAM
#[derive(Debug, Clone)]
pub struct FlatMemory {
    data: Vec<u8>,
    endianness: Endianness,
}

impl FlatMemory {
    /// Create zeroed RAM of `size` bytes (minimum one byte)
    pub fn new(size: usize, endianness: Endianness) -> Self {
        Self {
            data: vec![0; size.max(1)],
            endianness,
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Copy `bytes` in starting at `addr`
    pub fn load(&mut self, addr: u32, bytes: &[u8]) {
        for (i, &b) in bytes.iter().enumerate() {
            self.write_byte(addr.wrapping_add(i as u32), b);
        }
    }

    #[inline]
    fn index(&self, addr: u32) -> usize {
        addr as usize % self.data.len()
    }

    fn read_bytes<const N: usize>(&self, addr: u32) -> [u8; N] {
        let mut out = [0u8; N];
        for (i, b) in out.iter_mut().enumerate() {
            *b = self.data[self.index(addr.wrapping_add(i as u32))];
        }
        out
    }

    fn write_bytes(&mut self, addr: u32, bytes: &[u8]) {
        for (i, &b) in bytes.iter().enumerate() {
            let idx = self.index(addr.wrapping_add(i as u32));
            self.data[idx] = b;
        }
    }
}

impl MemoryBus for FlatMemory {
    #[inline]
    fn read_byte(&self, addr: u32) -> u8 {
        self.data[self.index(addr)]
    }

    fn read_word(&self, addr: u32) -> u16 {
        let bytes = self.read_bytes::<2>(addr);
        match self.endianness {
            Endianness::Little => u16::from_le_bytes(bytes),
            Endianness::Big => u16::from_be_bytes(bytes),
        }
    }

    fn read_dword(&self, addr: u32) -> u32 {
        let bytes = self.read_bytes::<4>(addr);
        match self.endianness {
            Endianness::Little => u32::from_le_bytes(bytes),
            Endianness::Big => u32::from_be_bytes(bytes),
        }
    }

    #[inline]
    fn write_byte(&mut self, addr: u32, value: u8) {
        let idx = self.index(addr);
        self.data[idx] = value;
    }

    fn write_word(&mut self, addr: u32, value: u16) {
        let bytes = match self.endianness {
            Endianness::Little => value.to_le_bytes(),
            Endianness::Big => value.to_be_bytes(),
        };
        self.write_bytes(addr, &bytes);
    }

    fn write_dword(&mut self, addr: u32, value: u32) {
        let bytes = match self.endianness {
            Endianness::Little => value.to_le_bytes(),
            Endianness::Big => value.to_be_bytes(),
        };
        self.write_bytes(addr, &bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endianness() {
        let mut le = FlatMemory::new(8, Endianness::Little);
        le.write_dword(0, 0x1122_3344);
        assert_eq!(le.read_byte(0), 0x44);
        assert_eq!(le.read_word(2), 0x1122);

        let mut be = FlatMemory::new(8, Endianness::Big);
        be.write_dword(0, 0x1122_3344);
        assert_eq!(be.read_byte(0), 0x11);
        assert_eq!(be.read_word(2), 0x3344);
    }

    #[test]
    fn test_address_wraps() {
        let mut mem = FlatMemory::new(4, Endianness::Big);
        mem.write_word(3, 0xABCD);
        assert_eq!(mem.read_byte(3), 0xAB);
        assert_eq!(mem.read_byte(0), 0xCD);
        assert_eq!(mem.read_byte(0x1000), 0xCD);
    }
}
