//! Alignment math and byte-size helpers.

pub(crate) mod layout;
pub mod size;
