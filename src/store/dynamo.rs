use crate::common::{Item, condition, key};
use crate::read::{batch_get_item, query};
use crate::store::{Error, Result, Store};
use crate::write::{self, batch_write_item, transact_write_items, update_item};

use async_trait::async_trait;
use aws_sdk_dynamodb::{Client, types};

impl From<aws_sdk_dynamodb::Error> for Error {
    fn from(error: aws_sdk_dynamodb::Error) -> Self {
        use aws_sdk_dynamodb::Error as DynamoError;
        let classified = match &error {
            DynamoError::ConditionalCheckFailedException(_) => Some(Self::ConditionFailed),
            DynamoError::TransactionConflictException(_) => Some(Self::TransactionConflict),
            DynamoError::TransactionCanceledException(canceled) => classify_cancellation(canceled),
            _ => None,
        };
        classified.unwrap_or_else(|| Self::Dynamo(Box::new(error)))
    }
}

/// A cancelled transaction carries one reason per operation; `None` marks the ones that
/// did not cause the cancellation.
fn classify_cancellation(canceled: &types::error::TransactionCanceledException) -> Option<Error> {
    let codes: Vec<&str> = canceled
        .cancellation_reasons()
        .iter()
        .filter_map(|reason| reason.code())
        .collect();
    if codes.contains(&"ConditionalCheckFailed") {
        Some(Error::ConditionFailed)
    } else if codes.contains(&"TransactionConflict") {
        Some(Error::TransactionConflict)
    } else {
        None
    }
}

fn table_key(item: &Item) -> Result<key::TableKey> {
    key::TableKey::of(item).ok_or_else(|| Error::MalformedItem(format!("{item:?}")))
}

/// [`Store`] over a DynamoDB table with string `PK` and `SK` and no secondary indexes.
///
/// ```rust,no_run
/// use deck_access::{config, store::dynamo::DynamoStore};
///
/// # async fn example() {
/// let settings = config::Settings::from_env();
/// let client = config::create_client(&settings).await;
/// let store = DynamoStore::new(client, settings.table_name);
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct DynamoStore {
    client: Client,
    table_name: String,
}

impl DynamoStore {
    /// Wrap an already configured client.
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    /// Create the table with its `PK`/`SK` key schema, on demand billing.
    ///
    /// Succeeds if the table already exists. Intended for local DynamoDB and test setups.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "deck_access.create_table", skip(self), fields(table = %self.table_name), err)
    )]
    pub async fn create_table(&self) -> Result<()> {
        let key_schema = [
            (key::PARTITION_KEY, types::KeyType::Hash),
            (key::SORT_KEY, types::KeyType::Range),
        ];
        let mut builder = self
            .client
            .create_table()
            .table_name(&self.table_name)
            .billing_mode(types::BillingMode::PayPerRequest);
        for (name, key_type) in key_schema {
            builder = builder
                .key_schema(
                    types::KeySchemaElement::builder()
                        .attribute_name(name)
                        .key_type(key_type)
                        .build()?,
                )
                .attribute_definitions(
                    types::AttributeDefinition::builder()
                        .attribute_name(name)
                        .attribute_type(types::ScalarAttributeType::S)
                        .build()?,
                );
        }
        match builder.send().await.map_err(aws_sdk_dynamodb::Error::from) {
            Ok(_) | Err(aws_sdk_dynamodb::Error::ResourceInUseException(_)) => Ok(()),
            Err(error) => Err(error.into()),
        }
    }
}

#[async_trait]
impl Store for DynamoStore {
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "deck_access.get_item", skip(self), err)
    )]
    async fn get_item(&self, key: key::TableKey) -> Result<Option<Item>> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .set_key(Some(key.into()))
            .consistent_read(true)
            .send()
            .await
            .map_err(aws_sdk_dynamodb::Error::from)?;
        Ok(output.item)
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "deck_access.put_item", skip_all, err)
    )]
    async fn put_item(
        &self,
        item: Item,
        condition: Option<condition::ConditionExpression>,
    ) -> Result<()> {
        let input = write::WriteInput::new(&self.table_name, condition, None);
        let builder = self.client.put_item().set_item(Some(item));
        crate::apply_write_input!(builder, input)
            .send()
            .await
            .map_err(aws_sdk_dynamodb::Error::from)?;
        Ok(())
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "deck_access.update_item", skip(self, update, condition), err)
    )]
    async fn update_item(
        &self,
        key: key::TableKey,
        update: update_item::UpdateExpression,
        condition: Option<condition::ConditionExpression>,
    ) -> Result<()> {
        let input = write::WriteInput::new(&self.table_name, condition, Some(update));
        let builder = self
            .client
            .update_item()
            .set_key(Some(key.into()))
            .set_update_expression(input.update_expression.clone());
        crate::apply_write_input!(builder, input)
            .send()
            .await
            .map_err(aws_sdk_dynamodb::Error::from)?;
        Ok(())
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "deck_access.delete_item", skip(self, condition), err)
    )]
    async fn delete_item(
        &self,
        key: key::TableKey,
        condition: Option<condition::ConditionExpression>,
    ) -> Result<()> {
        let input = write::WriteInput::new(&self.table_name, condition, None);
        let builder = self.client.delete_item().set_key(Some(key.into()));
        crate::apply_write_input!(builder, input)
            .send()
            .await
            .map_err(aws_sdk_dynamodb::Error::from)?;
        Ok(())
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "deck_access.query", skip(self), err)
    )]
    async fn query(
        &self,
        query: query::KeyQuery,
        exclusive_start_key: Option<key::TableKey>,
    ) -> Result<query::Page> {
        let input = query::QueryInput::new(&self.table_name, query, exclusive_start_key);
        let output = self
            .client
            .query()
            .table_name(input.table_name)
            .key_condition_expression(input.key_condition_expression)
            .set_expression_attribute_names(input.expression_attribute_names)
            .set_expression_attribute_values(input.expression_attribute_values)
            .set_exclusive_start_key(input.exclusive_start_key)
            .consistent_read(input.consistent_read)
            .send()
            .await
            .map_err(aws_sdk_dynamodb::Error::from)?;
        let last_evaluated_key = output
            .last_evaluated_key
            .as_ref()
            .map(table_key)
            .transpose()?;
        Ok(query::Page {
            items: output.items.unwrap_or_default(),
            last_evaluated_key,
        })
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "deck_access.batch_get_item",
            skip_all,
            fields(keys = batch_get.keys.len()),
            err
        )
    )]
    async fn batch_get_item(
        &self,
        batch_get: batch_get_item::BatchGet,
    ) -> Result<batch_get_item::BatchGetOutput> {
        let keys_and_attributes: types::KeysAndAttributes = batch_get.try_into()?;
        let output = self
            .client
            .batch_get_item()
            .request_items(&self.table_name, keys_and_attributes)
            .send()
            .await
            .map_err(aws_sdk_dynamodb::Error::from)?;
        let items = output
            .responses
            .and_then(|mut responses| responses.remove(&self.table_name))
            .unwrap_or_default();
        let unprocessed_keys = match output
            .unprocessed_keys
            .and_then(|mut unprocessed| unprocessed.remove(&self.table_name))
        {
            Some(unprocessed) => unprocessed
                .keys
                .iter()
                .map(table_key)
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };
        Ok(batch_get_item::BatchGetOutput {
            items,
            unprocessed_keys,
        })
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "deck_access.batch_delete_item",
            skip_all,
            fields(keys = batch_delete.keys.len()),
            err
        )
    )]
    async fn batch_delete_item(
        &self,
        batch_delete: batch_write_item::BatchDelete,
    ) -> Result<Vec<key::TableKey>> {
        let requests: Vec<types::WriteRequest> = batch_delete.try_into()?;
        let output = self
            .client
            .batch_write_item()
            .request_items(&self.table_name, requests)
            .send()
            .await
            .map_err(aws_sdk_dynamodb::Error::from)?;
        let unprocessed = output
            .unprocessed_items
            .and_then(|mut unprocessed| unprocessed.remove(&self.table_name))
            .unwrap_or_default();
        Ok(batch_write_item::unprocessed_keys(unprocessed))
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "deck_access.transact_write_items",
            skip_all,
            fields(operations = items.len()),
            err
        )
    )]
    async fn transact_write_items(
        &self,
        items: Vec<transact_write_items::TransactItem>,
    ) -> Result<()> {
        if items.len() > transact_write_items::MAX_TRANSACTION_ITEMS {
            return Err(Error::Validation(format!(
                "transaction of {} operations exceeds the limit of {}",
                items.len(),
                transact_write_items::MAX_TRANSACTION_ITEMS
            )));
        }
        let mut transact_items = Vec::with_capacity(items.len());
        for item in items {
            transact_items.push(item.into_transact_write_item(&self.table_name)?);
        }
        self.client
            .transact_write_items()
            .set_transact_items(Some(transact_items))
            .send()
            .await
            .map_err(aws_sdk_dynamodb::Error::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    fn canceled(codes: &[&str]) -> aws_sdk_dynamodb::Error {
        let reasons = codes
            .iter()
            .map(|code| types::CancellationReason::builder().code(*code).build())
            .collect();
        aws_sdk_dynamodb::Error::TransactionCanceledException(
            types::error::TransactionCanceledException::builder()
                .set_cancellation_reasons(Some(reasons))
                .build(),
        )
    }

    #[rstest]
    #[case::guard_failed(canceled(&["ConditionalCheckFailed", "None"]), "ConditionFailed")]
    #[case::guard_failed_later(canceled(&["None", "None", "ConditionalCheckFailed"]), "ConditionFailed")]
    #[case::conflict(canceled(&["None", "TransactionConflict"]), "TransactionConflict")]
    #[case::throttled(canceled(&["ThrottlingError", "None"]), "Dynamo")]
    #[case::single_item_guard(
        aws_sdk_dynamodb::Error::ConditionalCheckFailedException(
            types::error::ConditionalCheckFailedException::builder().build()
        ),
        "ConditionFailed"
    )]
    #[case::not_found(
        aws_sdk_dynamodb::Error::ResourceNotFoundException(
            types::error::ResourceNotFoundException::builder().build()
        ),
        "Dynamo"
    )]
    fn test_error_classification(#[case] error: aws_sdk_dynamodb::Error, #[case] expected: &str) {
        let actual = match Error::from(error) {
            Error::ConditionFailed => "ConditionFailed",
            Error::TransactionConflict => "TransactionConflict",
            Error::Dynamo(_) => "Dynamo",
            _ => "other",
        };
        assert_eq!(actual, expected);
    }
}
