//! Read requests against the single table.
//!
//! This module provides the typed read requests the store understands:
//! - Querying one partition, optionally range-filtered by sort key prefix
//! - Batch retrieving rows by primary key

/// Batch point reads, chunked to the store's per-request key limit.
pub mod batch_get_item;

/// Partition queries with continuation.
pub mod query;
