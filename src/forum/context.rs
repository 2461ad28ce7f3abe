use crate::page_store::PageRef;
use crate::title::Namespace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Forum,
    Thread,
    Other,
}

/// What a request's page is, worked out once and handed to whoever needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContext {
    page: PageRef,
    kind: PageKind,
}

impl PageContext {
    pub fn for_page(page: PageRef) -> Self {
        let kind = match page.title.namespace() {
            Namespace::Forum => PageKind::Forum,
            Namespace::Thread => PageKind::Thread,
            Namespace::Main => PageKind::Other,
        };
        Self { page, kind }
    }

    pub fn page(&self) -> &PageRef {
        &self.page
    }

    pub fn kind(&self) -> PageKind {
        self.kind
    }

    /// True for forum and thread pages alike.
    pub fn is_forum(&self) -> bool {
        self.kind != PageKind::Other
    }
}
