//! Tracks how many of the most recent requests found nothing.

use crate::error::Result;
use crate::index::SearchIndex;
use crate::ranking::status_filter;
use crate::{DocId, Document, DocumentStatus};
use std::collections::VecDeque;

/// Requests remembered by default: one per minute for a day.
pub const REQUEST_WINDOW: usize = 1440;

pub struct RequestQueue<'a> {
    index: &'a SearchIndex,
    window: usize,
    // true = the request returned no documents
    requests: VecDeque<bool>,
    no_result_count: usize,
}

impl<'a> RequestQueue<'a> {
    pub fn new(index: &'a SearchIndex) -> Self {
        Self::with_window(index, REQUEST_WINDOW)
    }

    /// A window of zero is treated as one.
    pub fn with_window(index: &'a SearchIndex, window: usize) -> Self {
        let window = window.max(1);
        Self { index, window, requests: VecDeque::with_capacity(window), no_result_count: 0 }
    }

    pub fn add_find_request(&mut self, raw_query: &str) -> Result<Vec<Document>> {
        self.add_find_request_by_status(raw_query, DocumentStatus::Actual)
    }

    pub fn add_find_request_by_status(
        &mut self,
        raw_query: &str,
        status: DocumentStatus,
    ) -> Result<Vec<Document>> {
        self.add_find_request_by(raw_query, status_filter(status))
    }

    /// Run the query and record whether it found anything. Failed queries are not recorded.
    pub fn add_find_request_by<P>(&mut self, raw_query: &str, predicate: P) -> Result<Vec<Document>>
    where
        P: Fn(DocId, DocumentStatus, i32) -> bool + Sync,
    {
        let result = self.index.find_top_documents_by(raw_query, predicate)?;
        self.record(result.is_empty());
        Ok(result)
    }

    /// Requests in the current window that returned no documents.
    pub fn no_result_requests(&self) -> usize {
        self.no_result_count
    }

    fn record(&mut self, no_result: bool) {
        if self.requests.len() == self.window && self.requests.pop_front() == Some(true) {
            self.no_result_count -= 1;
        }
        self.requests.push_back(no_result);
        if no_result {
            self.no_result_count += 1;
        }
    }
}
