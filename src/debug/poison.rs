//! Memory poisoning.
//!
//! Fills released memory with known patterns so reads through stale
//! pointers show up as obviously wrong data.

/// Pattern written over free-list blocks on deallocation.
pub const FREED_PATTERN: u8 = 0xCD;

/// Pattern written over an arena's used region on reset.
pub const RESET_PATTERN: u8 = 0xDD;

/// Poison a region of memory with the given pattern.
///
/// # Safety
///
/// The memory region must be valid and writable.
pub(crate) unsafe fn poison(ptr: *mut u8, size: usize, pattern: u8) {
    std::ptr::write_bytes(ptr, pattern, size);
}

/// Check whether every byte of a region holds `pattern`.
///
/// # Safety
///
/// The memory region must be valid for reads.
pub unsafe fn is_poisoned(ptr: *const u8, size: usize, pattern: u8) -> bool {
    std::slice::from_raw_parts(ptr, size).iter().all(|&b| b == pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poison_roundtrip() {
        let mut buf = [0u8; 32];
        unsafe {
            poison(buf.as_mut_ptr().add(8), 16, FREED_PATTERN);
            assert!(is_poisoned(buf.as_ptr().add(8), 16, FREED_PATTERN));
            assert!(!is_poisoned(buf.as_ptr(), 16, FREED_PATTERN));
        }
    }
}
