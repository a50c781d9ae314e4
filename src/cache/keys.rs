//! Cache key shapes for blog content.

use std::fmt;

/// Prefix shared by every key that caches a collection of posts.
///
/// Single-post keys use `post:` and therefore never match it.
pub const POST_LISTS_PREFIX: &str = "posts:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKey {
    /// One post with its tags.
    Post(i64),
    /// One page of the newest-first listing.
    Page { page: u32, size: u32 },
    /// The full, unpaginated listing.
    All,
}

impl ContentKey {
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Post(id) => write!(f, "post:{id}"),
            Self::Page { page, size } => write!(f, "{POST_LISTS_PREFIX}p={page}:s={size}"),
            Self::All => write!(f, "{POST_LISTS_PREFIX}all"),
        }
    }
}
