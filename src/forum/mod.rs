//! Forum and thread directory over the page store.

pub mod context;
pub mod forums;
pub mod mode;
pub mod props;
pub mod service;
pub mod threads;

pub use context::{PageContext, PageKind};
pub use forums::{Forum, ForumDirectory, ForumSummary};
pub use mode::ListingMode;
pub use props::ThreadPropertyStore;
pub use service::{FlagChange, ForumThreadService, ReplyReceipt};
pub use threads::{ThreadDetail, ThreadDirectory, ThreadListing, ThreadSummary};

/// Skip `offset` rows, then keep `limit + 1`. The extra row only signals that another
/// page exists and is dropped before returning.
pub(crate) fn paginate<T>(rows: impl IntoIterator<Item = T>, limit: usize, offset: usize) -> (Vec<T>, bool) {
    let mut window: Vec<T> = rows
        .into_iter()
        .skip(offset)
        .take(limit.saturating_add(1))
        .collect();
    let has_more = window.len() > limit;
    window.truncate(limit);
    (window, has_more)
}
