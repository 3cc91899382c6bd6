//! Allocation backends.
//!
//! All pointer arithmetic over backing buffers lives in these modules.

pub(crate) mod arena;
pub(crate) mod backing;
pub(crate) mod free_list;
