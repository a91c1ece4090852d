//! Record collections and pagination
//!
//! The query collaborator hands over rows that are already searched,
//! ordered and counted. The adapter only slices them.

use std::fmt;
use std::sync::Arc;

use crate::options::DatatableOptions;
use crate::value::RowSource;

/// Filtered and ordered rows with their associated counts.
#[derive(Clone, Default)]
pub struct RecordCollection {
    records: Vec<Arc<dyn RowSource>>,
    total_initial_record_count: usize,
    unpaged_record_count: usize,
}

impl RecordCollection {
    /// `total` is the unfiltered count, `unpaged` the post-filter count.
    pub fn new(records: Vec<Arc<dyn RowSource>>, total: usize, unpaged: usize) -> Self {
        Self {
            records,
            total_initial_record_count: total,
            unpaged_record_count: unpaged,
        }
    }

    /// Unfiltered rows: both counts equal the row count.
    pub fn from_records(records: Vec<Arc<dyn RowSource>>) -> Self {
        let len = records.len();
        Self::new(records, len, len)
    }

    pub fn total_initial_record_count(&self) -> usize {
        self.total_initial_record_count
    }

    pub fn unpaged_record_count(&self) -> usize {
        self.unpaged_record_count
    }

    pub fn records(&self) -> &[Arc<dyn RowSource>] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rows on the page selected by `options`; every row when unpaged.
    pub fn paginate(&self, options: &DatatableOptions) -> &[Arc<dyn RowSource>] {
        paginate(&self.records, options)
    }
}

impl fmt::Debug for RecordCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordCollection")
            .field("len", &self.records.len())
            .field("total_initial_record_count", &self.total_initial_record_count)
            .field("unpaged_record_count", &self.unpaged_record_count)
            .finish()
    }
}

/// Slice `records` to `[start_offset, start_offset + page_length)`, clamped
/// to the available rows. A page length of -1 returns everything.
pub fn paginate<'a, T>(records: &'a [T], options: &DatatableOptions) -> &'a [T] {
    if !options.is_paged() {
        return records;
    }
    let length = usize::try_from(options.page_length).unwrap_or(0);
    let begin = options.start_offset.min(records.len());
    let end = options
        .start_offset
        .saturating_add(length)
        .min(records.len());
    &records[begin..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Record, Value};

    fn page(start_offset: usize, page_length: i64) -> DatatableOptions {
        DatatableOptions {
            start_offset,
            page_length,
            ..Default::default()
        }
    }

    #[test]
    fn test_paginate_middle_page() {
        let items: Vec<usize> = (0..100).collect();
        let slice = paginate(&items, &page(50, 25));
        assert_eq!(slice, (50..75).collect::<Vec<_>>().as_slice());
    }

    #[test]
    fn test_paginate_unpaged() {
        let items: Vec<usize> = (0..100).collect();
        assert_eq!(paginate(&items, &page(50, -1)).len(), 100);
    }

    #[test]
    fn test_paginate_clamps() {
        let items: Vec<usize> = (0..10).collect();
        assert_eq!(paginate(&items, &page(8, 25)), &[8, 9]);
        assert!(paginate(&items, &page(40, 25)).is_empty());
    }

    #[test]
    fn test_collection_counts() {
        let records: Vec<Arc<dyn RowSource>> = (0..3)
            .map(|i| Arc::new(Record::new(i)) as Arc<dyn RowSource>)
            .collect();
        let collection = RecordCollection::new(records, 40, 3);
        assert_eq!(collection.total_initial_record_count(), 40);
        assert_eq!(collection.unpaged_record_count(), 3);
        let first = &collection.paginate(&page(1, 5))[0];
        assert_eq!(first.pk(), Value::Int(1));
    }
}
