//! Sized reads and writes

use rr_core::MemoryBus;

/// Width of a script memory access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessWidth {
    Byte,
    Word,
    Dword,
}

impl AccessWidth {
    pub fn bytes(&self) -> u32 {
        match self {
            AccessWidth::Byte => 1,
            AccessWidth::Word => 2,
            AccessWidth::Dword => 4,
        }
    }
}

/// Read a value, sign-extending it when `signed` is set
#[inline]
pub fn read_sized<B: MemoryBus + ?Sized>(bus: &B, addr: u32, width: AccessWidth, signed: bool) -> i64 {
    match (width, signed) {
        (AccessWidth::Byte, false) => bus.read_byte(addr) as i64,
        (AccessWidth::Byte, true) => bus.read_byte(addr) as i8 as i64,
        (AccessWidth::Word, false) => bus.read_word(addr) as i64,
        (AccessWidth::Word, true) => bus.read_word(addr) as i16 as i64,
        (AccessWidth::Dword, false) => bus.read_dword(addr) as i64,
        (AccessWidth::Dword, true) => bus.read_dword(addr) as i32 as i64,
    }
}

/// Write a value truncated to `width`
#[inline]
pub fn write_sized<B: MemoryBus + ?Sized>(bus: &mut B, addr: u32, width: AccessWidth, value: i64) {
    match width {
        AccessWidth::Byte => bus.write_byte(addr, value as u8),
        AccessWidth::Word => bus.write_word(addr, value as u16),
        AccessWidth::Dword => bus.write_dword(addr, value as u32),
    }
}

/// Read `len` consecutive bytes starting at `addr`.
///
/// A negative length reads the `-len` bytes that end just before `addr`.
pub fn read_range<B: MemoryBus + ?Sized>(bus: &B, addr: u32, len: i64) -> Vec<u8> {
    let (start, count) = if len < 0 {
        (addr.wrapping_sub(len.unsigned_abs() as u32), len.unsigned_abs())
    } else {
        (addr, len as u64)
    };

    (0..count)
        .map(|offset| bus.read_byte(start.wrapping_add(offset as u32)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flat::{Endianness, FlatMemory};

    #[test]
    fn test_signed_reads() {
        let mut mem = FlatMemory::new(16, Endianness::Little);
        mem.write_dword(0, 0xFFFF_FF80);

        assert_eq!(read_sized(&mem, 0, AccessWidth::Byte, false), 0x80);
        assert_eq!(read_sized(&mem, 0, AccessWidth::Byte, true), -128);
        assert_eq!(read_sized(&mem, 0, AccessWidth::Word, true), -128);
        assert_eq!(read_sized(&mem, 0, AccessWidth::Dword, false), 0xFFFF_FF80);
        assert_eq!(read_sized(&mem, 0, AccessWidth::Dword, true), -128);
    }

    #[test]
    fn test_write_truncates() {
        let mut mem = FlatMemory::new(16, Endianness::Little);
        write_sized(&mut mem, 4, AccessWidth::Byte, 0x1234);
        assert_eq!(mem.read_byte(4), 0x34);
        assert_eq!(mem.read_byte(5), 0);

        write_sized(&mut mem, 8, AccessWidth::Word, -1);
        assert_eq!(mem.read_word(8), 0xFFFF);
        assert_eq!(mem.read_byte(10), 0);
    }

    #[test]
    fn test_read_range() {
        let mut mem = FlatMemory::new(16, Endianness::Little);
        for i in 0..16 {
            mem.write_byte(i, i as u8 * 2);
        }

        assert_eq!(read_range(&mem, 2, 3), vec![4, 6, 8]);
        assert_eq!(read_range(&mem, 5, -2), vec![6, 8]);
        assert!(read_range(&mem, 5, 0).is_empty());
    }
}
