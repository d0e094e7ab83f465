use crate::common::key;

use aws_sdk_dynamodb::{error, types};

/// Maximum number of write requests in one `BatchWriteItem` call.
pub const MAX_BATCH_WRITE_ITEMS: usize = 25;

/// Batch delete of rows in the single table.
///
/// Batch writes are not transactional: each row is deleted independently, and the store may
/// hand back a subset as unprocessed.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BatchDelete {
    /// Rows to delete; at most [`MAX_BATCH_WRITE_ITEMS`] per request.
    pub keys: Vec<key::TableKey>,
}

impl BatchDelete {
    /// Split `keys` into requests that each fit a single batch call.
    pub fn chunked(keys: Vec<key::TableKey>) -> Vec<Self> {
        keys.chunks(MAX_BATCH_WRITE_ITEMS)
            .map(|chunk| Self {
                keys: chunk.to_vec(),
            })
            .collect()
    }
}

impl TryFrom<BatchDelete> for Vec<types::WriteRequest> {
    type Error = error::BuildError;

    fn try_from(batch_delete: BatchDelete) -> Result<Self, Self::Error> {
        let mut requests = Vec::with_capacity(batch_delete.keys.len());
        for keys in batch_delete.keys {
            let delete_request = types::DeleteRequest::builder()
                .set_key(Some(keys.into()))
                .build()?;
            let request = types::WriteRequest::builder()
                .delete_request(delete_request)
                .build();
            requests.push(request);
        }
        Ok(requests)
    }
}

/// Keys of the delete requests DynamoDB left unprocessed.
pub(crate) fn unprocessed_keys(requests: Vec<types::WriteRequest>) -> Vec<key::TableKey> {
    requests
        .into_iter()
        .filter_map(|request| request.delete_request)
        .filter_map(|delete_request| key::TableKey::of(&delete_request.key))
        .collect()
}
