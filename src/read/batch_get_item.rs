use crate::common::{Item, key};

use aws_sdk_dynamodb::{error, types};

/// Maximum number of keys in one `BatchGetItem` call.
pub const MAX_BATCH_GET_ITEMS: usize = 100;

/// Batch point read of rows in the single table.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BatchGet {
    /// Rows to read; at most [`MAX_BATCH_GET_ITEMS`] per request.
    pub keys: Vec<key::TableKey>,
}

impl BatchGet {
    /// Split `keys` into requests that each fit a single batch call.
    pub fn chunked(keys: Vec<key::TableKey>) -> Vec<Self> {
        keys.chunks(MAX_BATCH_GET_ITEMS)
            .map(|chunk| Self {
                keys: chunk.to_vec(),
            })
            .collect()
    }
}

impl TryFrom<BatchGet> for types::KeysAndAttributes {
    type Error = error::BuildError;

    fn try_from(batch_get: BatchGet) -> Result<Self, Self::Error> {
        let keys: Vec<Item> = batch_get.keys.into_iter().map(Into::into).collect();
        Self::builder().set_keys(Some(keys)).build()
    }
}

/// Result of one batch read.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchGetOutput {
    /// Rows found, in no particular order. Missing rows are simply absent.
    pub items: Vec<Item>,
    /// Keys the store did not get to; they should be requested again.
    pub unprocessed_keys: Vec<key::TableKey>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunked_respects_limit() {
        let keys: Vec<key::TableKey> = (0..250).map(|index| key::deck(&index.to_string())).collect();
        let sizes: Vec<usize> = BatchGet::chunked(keys)
            .iter()
            .map(|batch| batch.keys.len())
            .collect();
        assert_eq!(sizes, vec![100, 100, 50]);
    }

    #[test]
    fn test_keys_and_attributes() {
        let batch = BatchGet {
            keys: vec![key::deck("d1"), key::deck("d2")],
        };
        let keys_and_attributes: types::KeysAndAttributes = batch.try_into().unwrap();
        assert_eq!(keys_and_attributes.keys.len(), 2);
        assert_eq!(keys_and_attributes.keys[0], Item::from(key::deck("d1")));
        assert_eq!(keys_and_attributes.consistent_read, None);
        assert_eq!(keys_and_attributes.projection_expression, None);
    }
}
