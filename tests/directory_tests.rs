use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use forum_directory::actor::Actor;
use forum_directory::forum::{
    Forum, ForumDirectory, ListingMode, PageContext, ThreadDirectory, ThreadPropertyStore,
};
use forum_directory::page_store::{PageEdit, PageRef, PageStore, RedbPageStore};
use forum_directory::replication::MetadataWriter;
use forum_directory::storage::models::{ThreadFlag, ThreadRecord};
use forum_directory::storage::{Database, MetadataCapabilities};
use forum_directory::title::{Namespace, Title};

struct Fixture {
    _dir: tempfile::TempDir,
    db: Database,
    pages: Arc<dyn PageStore>,
    forums: ForumDirectory,
    threads: ThreadDirectory,
    props: ThreadPropertyStore,
}

impl Fixture {
    fn new(metadata: bool) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = if metadata {
            Database::open(dir.path().join("data")).unwrap()
        } else {
            Database::open_bare(dir.path().join("data")).unwrap()
        };
        let pages: Arc<dyn PageStore> =
            Arc::new(RedbPageStore::open(dir.path().join("pages")).unwrap());
        let writer: Arc<dyn MetadataWriter> = Arc::new(db.clone());

        let forums = ForumDirectory::new(db.clone(), Arc::clone(&pages), Arc::clone(&writer));
        let threads = ThreadDirectory::new(
            db.clone(),
            Arc::clone(&pages),
            Arc::clone(&writer),
            forums.clone(),
        );
        let props = ThreadPropertyStore::new(db.clone(), Arc::clone(&pages), writer);

        Self {
            _dir: dir,
            db,
            pages,
            forums,
            threads,
            props,
        }
    }

    async fn page(&self, namespace: Namespace, text: &str) -> PageRef {
        let title = Title::new(namespace, text).unwrap();
        self.pages
            .create(&title, PageEdit::new("", "test", Some(1)))
            .await
            .unwrap()
            .page_ref()
    }

    /// A forum page with its metadata row.
    async fn forum(&self, name: &str) -> Forum {
        let page = self.page(Namespace::Forum, name).await;
        self.forums
            .record_page_save(&PageContext::for_page(page.clone()), &Actor::registered(1, "Mod"))
            .await
            .unwrap();
        Forum {
            id: page.id,
            title: page.title,
        }
    }

    /// A thread page with its metadata row, created `created` ago.
    async fn thread(&self, forum: &Forum, subject: &str, created: DateTime<Utc>) -> PageRef {
        let page = self
            .page(Namespace::Thread, &format!("{}/{subject}", forum.title.text()))
            .await;
        self.threads
            .register_thread(ThreadRecord {
                page_id: page.id,
                forum_page_id: forum.id,
                subject: subject.to_string(),
                created,
                creator: Some(2),
                last_reply: None,
                last_reply_user: None,
            })
            .await
            .unwrap();
        page
    }
}

fn ids(listing: &forum_directory::forum::ThreadListing) -> Vec<u64> {
    listing.threads.iter().map(|t| t.id).collect()
}

// ============================================================================
// Listing modes
// ============================================================================

#[test]
fn test_listing_mode_from_capabilities() {
    let full = MetadataCapabilities {
        forums: true,
        threads: true,
        thread_properties: true,
    };
    assert_eq!(
        ListingMode::for_threads(full),
        ListingMode::MetadataBacked { properties: true }
    );

    let no_props = MetadataCapabilities {
        thread_properties: false,
        ..full
    };
    assert_eq!(
        ListingMode::for_threads(no_props),
        ListingMode::MetadataBacked { properties: false }
    );

    assert_eq!(
        ListingMode::for_forums(MetadataCapabilities::default()),
        ListingMode::TitleScanOnly
    );
    assert_eq!(
        ListingMode::for_threads(MetadataCapabilities::default()),
        ListingMode::TitleScanOnly
    );
}

// ============================================================================
// Threads
// ============================================================================

#[tokio::test]
async fn test_sticky_threads_sort_first() {
    let fx = Fixture::new(true);
    let forum = fx.forum("General").await;
    let now = Utc::now();

    let old = fx.thread(&forum, "Old", now - Duration::days(10)).await;
    let new = fx.thread(&forum, "New", now).await;
    let middle = fx.thread(&forum, "Middle", now - Duration::days(1)).await;

    fx.props.set_sticky(old.id, true).await.unwrap();

    let listing = fx.threads.list_threads(&forum, 10, 0).await.unwrap();
    assert_eq!(ids(&listing), vec![old.id, new.id, middle.id]);
    assert!(listing.threads[0].sticky);
    assert!(!listing.has_more);
}

#[tokio::test]
async fn test_last_reply_counts_as_activity() {
    let fx = Fixture::new(true);
    let forum = fx.forum("General").await;
    let now = Utc::now();

    let quiet = fx.thread(&forum, "Quiet", now - Duration::hours(1)).await;
    let busy = fx.thread(&forum, "Busy", now - Duration::days(3)).await;

    assert!(fx
        .threads
        .touch_last_reply(busy.id, Some(9), Some(now))
        .await
        .unwrap());

    let listing = fx.threads.list_threads(&forum, 10, 0).await.unwrap();
    assert_eq!(ids(&listing), vec![busy.id, quiet.id]);
    assert_eq!(listing.threads[0].last_reply, Some(now));
    assert_eq!(listing.threads[0].last_reply_user, Some(9));
}

#[tokio::test]
async fn test_equal_activity_breaks_ties_by_newest_page() {
    let fx = Fixture::new(true);
    let forum = fx.forum("General").await;
    let at = Utc::now();

    let a = fx.thread(&forum, "A", at).await;
    let b = fx.thread(&forum, "B", at).await;
    let c = fx.thread(&forum, "C", at).await;

    let listing = fx.threads.list_threads(&forum, 10, 0).await.unwrap();
    assert_eq!(ids(&listing), vec![c.id, b.id, a.id]);
}

#[tokio::test]
async fn test_pagination_is_complete() {
    let fx = Fixture::new(true);
    let forum = fx.forum("General").await;
    let now = Utc::now();

    let mut all = Vec::new();
    for i in 0..7 {
        let page = fx
            .thread(&forum, &format!("Thread {i}"), now - Duration::minutes(i))
            .await;
        all.push(page.id);
    }
    fx.props.set_sticky(all[4], true).await.unwrap();
    all.sort();

    for k in 1..=8 {
        let mut seen = Vec::new();
        let mut offset = 0;
        loop {
            let listing = fx.threads.list_threads(&forum, k, offset).await.unwrap();
            assert!(listing.threads.len() <= k);
            seen.extend(ids(&listing));
            if !listing.has_more {
                break;
            }
            offset += k;
        }
        seen.sort();
        assert_eq!(seen, all, "page size {k}");
    }
}

#[tokio::test]
async fn test_threads_are_scoped_to_their_forum() {
    let fx = Fixture::new(true);
    let general = fx.forum("General").await;
    let help = fx.forum("Help").await;

    let here = fx.thread(&general, "Here", Utc::now()).await;
    fx.thread(&help, "There", Utc::now()).await;

    let listing = fx.threads.list_threads(&general, 10, 0).await.unwrap();
    assert_eq!(ids(&listing), vec![here.id]);
}

#[tokio::test]
async fn test_deleted_thread_page_drops_out_of_listing() {
    let fx = Fixture::new(true);
    let forum = fx.forum("General").await;
    let keep = fx.thread(&forum, "Keep", Utc::now()).await;
    let gone = fx.thread(&forum, "Gone", Utc::now()).await;

    fx.pages.delete(gone.id).await.unwrap();

    let listing = fx.threads.list_threads(&forum, 10, 0).await.unwrap();
    assert_eq!(ids(&listing), vec![keep.id]);
}

#[tokio::test]
async fn test_title_scan_lists_newest_first() {
    let fx = Fixture::new(false);
    let forum_page = fx.page(Namespace::Forum, "General").await;
    let forum = Forum {
        id: forum_page.id,
        title: forum_page.title,
    };

    let first = fx.page(Namespace::Thread, "General/First").await;
    let second = fx.page(Namespace::Thread, "General/Second").await;
    fx.page(Namespace::Thread, "General Chat/Elsewhere").await;

    // Flags exist but the scan reports none of them
    fx.props.set_sticky(first.id, true).await.unwrap();

    let listing = fx.threads.list_threads(&forum, 1, 0).await.unwrap();
    assert_eq!(ids(&listing), vec![second.id]);
    assert!(listing.has_more);

    let listing = fx.threads.list_threads(&forum, 1, 1).await.unwrap();
    assert_eq!(ids(&listing), vec![first.id]);
    assert!(!listing.has_more);

    let thread = &listing.threads[0];
    assert_eq!(thread.subject, "First");
    assert!(!thread.sticky);
    assert!(thread.created.is_none());
    assert!(thread.creator.is_none());
}

#[tokio::test]
async fn test_get_thread_resolves_forum() {
    let fx = Fixture::new(true);
    let forum = fx.forum("General").await;
    let thread = fx.thread(&forum, "Hello", Utc::now()).await;
    fx.props.set_locked(thread.id, true).await.unwrap();

    let detail = fx.threads.get_thread(thread.id).await.unwrap().unwrap();
    assert_eq!(detail.summary.subject, "Hello");
    assert_eq!(detail.summary.creator, Some(2));
    assert!(detail.summary.locked);
    assert_eq!(detail.forum, Some(forum));

    // Forum ids are not thread ids
    assert!(fx.threads.get_thread(detail.summary.id + 100).await.unwrap().is_none());
    let forum_id = detail.forum.unwrap().id;
    assert!(fx.threads.get_thread(forum_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_get_thread_falls_back_to_title_prefix() {
    let fx = Fixture::new(false);
    let forum_page = fx.page(Namespace::Forum, "General").await;
    let thread = fx.page(Namespace::Thread, "General/Hello").await;
    let stray = fx.page(Namespace::Thread, "Nowhere/Hello").await;

    let detail = fx.threads.get_thread(thread.id).await.unwrap().unwrap();
    assert_eq!(detail.forum.map(|f| f.id), Some(forum_page.id));
    assert!(detail.summary.created.is_none());

    let detail = fx.threads.get_thread(stray.id).await.unwrap().unwrap();
    assert!(detail.forum.is_none());
}

#[tokio::test]
async fn test_touch_last_reply_without_row_is_noop() {
    let fx = Fixture::new(true);
    let page = fx.page(Namespace::Thread, "General/Unregistered").await;

    assert!(!fx
        .threads
        .touch_last_reply(page.id, Some(1), None)
        .await
        .unwrap());
    assert!(fx.db.get_thread_row(page.id).unwrap().is_none());
}

// ============================================================================
// Thread properties
// ============================================================================

#[tokio::test]
async fn test_flags_default_to_false() {
    let fx = Fixture::new(true);
    let page = fx.page(Namespace::Thread, "General/Hello").await;

    assert!(!fx.props.is_locked(page.id).await.unwrap());
    assert!(!fx.props.is_sticky(page.id).await.unwrap());
}

#[tokio::test]
async fn test_flags_are_idempotent_and_independent() {
    let fx = Fixture::new(true);
    let page = fx.page(Namespace::Thread, "General/Hello").await;

    fx.props.set_locked(page.id, true).await.unwrap();
    fx.props.set_locked(page.id, true).await.unwrap();
    assert!(fx.props.is_locked(page.id).await.unwrap());
    assert!(!fx.props.is_sticky(page.id).await.unwrap());

    fx.props.set_sticky(page.id, true).await.unwrap();
    fx.props.set_locked(page.id, false).await.unwrap();
    assert!(!fx.props.is_locked(page.id).await.unwrap());
    assert!(fx.props.is_sticky(page.id).await.unwrap());
}

#[tokio::test]
async fn test_flags_ignore_non_thread_pages() {
    let fx = Fixture::new(true);
    let forum = fx.page(Namespace::Forum, "General").await;

    fx.props.set_locked(forum.id, true).await.unwrap();
    assert!(!fx.props.is_locked(forum.id).await.unwrap());
    assert!(fx.db.get_thread_props(forum.id).unwrap().is_none());

    // Missing page
    fx.props.set_sticky(999, true).await.unwrap();
    assert!(fx.db.get_thread_props(999).unwrap().is_none());
    assert!(!fx.props.flag(999, ThreadFlag::Sticky).await.unwrap());
}

// ============================================================================
// Forums
// ============================================================================

#[tokio::test]
async fn test_forum_listing_from_metadata() {
    let fx = Fixture::new(true);
    let zebra = fx.forum("Zebra").await;
    let alpha = fx.forum("Alpha").await;
    let gone = fx.forum("Gone").await;
    fx.pages.delete(gone.id).await.unwrap();

    // A forum page without a row is not listed in metadata mode
    fx.page(Namespace::Forum, "Unrecorded").await;

    let forums = fx.forums.list_forums(10, 0).await.unwrap();
    let listed: Vec<u64> = forums.iter().map(|f| f.id).collect();
    assert_eq!(listed, vec![alpha.id, zebra.id]);
    assert!(forums[0].created.is_some());
    assert_eq!(forums[0].creator, Some(1));

    let page = fx.forums.list_forums(1, 1).await.unwrap();
    assert_eq!(page[0].id, zebra.id);
}

#[tokio::test]
async fn test_forum_listing_by_title_scan() {
    let fx = Fixture::new(false);
    let b = fx.page(Namespace::Forum, "Beta").await;
    let a = fx.page(Namespace::Forum, "Alpha").await;
    fx.page(Namespace::Thread, "Alpha/Hello").await;

    let forums = fx.forums.list_forums(10, 0).await.unwrap();
    let listed: Vec<u64> = forums.iter().map(|f| f.id).collect();
    assert_eq!(listed, vec![a.id, b.id]);
    assert!(forums.iter().all(|f| f.created.is_none() && f.creator.is_none()));
}

#[tokio::test]
async fn test_record_page_save_only_tracks_forums() {
    let fx = Fixture::new(true);
    let actor = Actor::registered(3, "Editor");

    let forum = fx.page(Namespace::Forum, "General").await;
    let thread = fx.page(Namespace::Thread, "General/Hello").await;
    let main = fx.page(Namespace::Main, "Home").await;

    for page in [&forum, &thread, &main] {
        let context = PageContext::for_page(page.clone());
        let recorded = fx.forums.record_page_save(&context, &actor).await.unwrap();
        assert_eq!(recorded, page.id == forum.id);
    }

    let row = fx.db.get_forum_row(forum.id).unwrap().unwrap();
    assert_eq!(row.title, "General");
    assert_eq!(row.creator, Some(3));
    assert_eq!(fx.db.all_forum_rows().unwrap().len(), 1);
}

#[tokio::test]
async fn test_record_page_save_without_forum_table() {
    let fx = Fixture::new(false);
    let forum = fx.page(Namespace::Forum, "General").await;

    let context = PageContext::for_page(forum);
    assert!(context.is_forum());
    assert!(!fx
        .forums
        .record_page_save(&context, &Actor::registered(1, "Mod"))
        .await
        .unwrap());
    assert!(!fx.db.capabilities().unwrap().forums);
}

#[tokio::test]
async fn test_get_forum_checks_namespace() {
    let fx = Fixture::new(true);
    let forum = fx.forum("General").await;
    let thread = fx.thread(&forum, "Hello", Utc::now()).await;

    assert_eq!(fx.forums.get_forum(forum.id).await.unwrap(), Some(forum.clone()));
    assert!(fx.forums.get_forum(thread.id).await.unwrap().is_none());
    assert_eq!(
        fx.forums.get_forum_by_title(&forum.title).await.unwrap(),
        Some(forum)
    );
}
