//! Page type
//!
//! A page is one response of the paginated data endpoint after decoding.

use crate::types::JsonObject;

/// One decoded page: flat records plus the provider's completion flag
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    /// Flat records, in response order
    pub records: Vec<JsonObject>,
    /// `true` when the provider has no more data after this call
    pub is_load_complete: bool,
}

impl Page {
    /// Create a page
    pub fn new(records: Vec<JsonObject>, is_load_complete: bool) -> Self {
        Self {
            records,
            is_load_complete,
        }
    }

    /// Number of records on the page
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the page carries no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// End of stream: the provider reports completion and sent nothing
    ///
    /// A complete page that still carries rows is not terminal.
    pub fn is_terminal(&self) -> bool {
        self.is_load_complete && self.is_empty()
    }
}
