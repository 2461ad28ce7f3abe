use redb::TableDefinition;

use crate::page_store::PageId;

/// Forum rows: forum page id -> ForumRecord (msgpack)
pub const FORUMS: TableDefinition<PageId, &[u8]> = TableDefinition::new("forums");

/// Thread rows: thread page id -> ThreadRecord (msgpack)
pub const THREADS: TableDefinition<PageId, &[u8]> = TableDefinition::new("threads");

/// Forum index: forum page id -> msgpack Vec of thread page ids
pub const FORUM_THREADS: TableDefinition<PageId, &[u8]> = TableDefinition::new("forum_threads");

/// Thread flags: thread page id -> ThreadProps (msgpack). Absent row = defaults.
pub const THREAD_PROPERTIES: TableDefinition<PageId, &[u8]> =
    TableDefinition::new("thread_properties");
