//! ledgerq-ops: search and guarded bulk mutation over a paged remote ledger.

pub mod bulk;
pub mod request;
pub mod search;
pub mod tools;

pub use bulk::{
    BulkDeleteRequest, BulkError, BulkResponse, BulkStats, BulkUpdateRequest, DEFAULT_WRITE_DELAY,
    ErrorKind, ItemResult, MutationOptions, RecordMutator, bulk_delete, bulk_update,
};
pub use request::{
    BulkDeleteParams, BulkUpdateParams, DateRange, RequestError, SearchParams, parse_bulk_delete,
    parse_bulk_update, parse_search,
};
pub use search::{SearchMeta, SearchRequest, SearchResponse, search, sort_newest_first};
pub use tools::LedgerTools;
