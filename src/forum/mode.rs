use crate::storage::MetadataCapabilities;

/// How a listing is resolved, decided once per call from the probed store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingMode {
    /// Metadata rows joined with page identity. `properties` is set when thread flags
    /// can be joined in as well.
    MetadataBacked { properties: bool },
    /// Structure inferred from page titles alone.
    TitleScanOnly,
}

impl ListingMode {
    pub fn for_forums(caps: MetadataCapabilities) -> Self {
        if caps.forums {
            ListingMode::MetadataBacked { properties: false }
        } else {
            ListingMode::TitleScanOnly
        }
    }

    pub fn for_threads(caps: MetadataCapabilities) -> Self {
        if caps.threads {
            ListingMode::MetadataBacked {
                properties: caps.thread_properties,
            }
        } else {
            ListingMode::TitleScanOnly
        }
    }

    pub fn is_metadata_backed(self) -> bool {
        matches!(self, ListingMode::MetadataBacked { .. })
    }
}
