//! Playlist classifier — resolves a playlist id to its classification fields.

use std::sync::Arc;

use triage_core::cache::LookupCache;
use triage_core::model::{ClassificationFields, ClassificationRecord, PlayerState};

use crate::store::ClassificationLookup;

pub struct Classifier {
    store: Arc<dyn ClassificationLookup>,
    records: LookupCache<String, Option<ClassificationRecord>>,
    overflow_label: String,
}

impl Classifier {
    pub fn new(
        store: Arc<dyn ClassificationLookup>,
        cache_capacity: usize,
        overflow_label: String,
    ) -> Self {
        Self {
            store,
            records: LookupCache::new(cache_capacity),
            overflow_label,
        }
    }

    /// Classification is stable while a playlist stays current, so an
    /// unchanged id reuses the previous state's fields without touching the
    /// store. Everything else goes through the memoized record lookup.
    pub async fn classify(
        &self,
        playlist_id: &str,
        previous: Option<&PlayerState>,
    ) -> anyhow::Result<ClassificationFields> {
        if let Some(prev) = previous {
            if prev.playlist_id.as_deref() == Some(playlist_id) {
                return Ok(prev.classification_fields());
            }
        }

        let store = Arc::clone(&self.store);
        let lookup_id = playlist_id.to_string();
        let record = self
            .records
            .get_or_fetch(playlist_id.to_string(), move || async move {
                store.find_record(&lookup_id).await
            })
            .await?;

        Ok(match record {
            Some(record) => {
                ClassificationFields::from_record(playlist_id, &record, &self.overflow_label)
            }
            None => ClassificationFields::default(),
        })
    }
}
