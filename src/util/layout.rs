//! Layout utilities.

/// Align a size up to the given alignment.
#[inline]
pub const fn align_up(size: usize, align: usize) -> usize {
    (size + align - 1) & !(align - 1)
}

/// Align a size up, returning `None` on overflow.
#[inline]
pub const fn checked_align_up(size: usize, align: usize) -> Option<usize> {
    match size.checked_add(align - 1) {
        Some(v) => Some(v & !(align - 1)),
        None => None,
    }
}

/// Calculate padding needed to align a size.
#[inline]
pub const fn padding_for(size: usize, align: usize) -> usize {
    let aligned = align_up(size, align);
    aligned - size
}

/// Padding from `addr` to the first aligned address that leaves at least
/// `header_size` bytes in front of it.
///
/// The result is the distance from `addr` to the usable (aligned) address,
/// so it always includes the header itself.
#[inline]
pub const fn padding_with_header(addr: usize, align: usize, header_size: usize) -> usize {
    let mut padding = padding_for(addr, align);
    if padding < header_size {
        let needed = header_size - padding;
        padding += align_up(needed, align);
    }
    padding
}
