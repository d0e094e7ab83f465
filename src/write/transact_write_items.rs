use crate::common::{Item, condition, key};
use crate::write::{self, update_item};

use aws_sdk_dynamodb::{error, types};

/// Maximum number of operations DynamoDB accepts in one transaction, as used by this crate.
pub const MAX_TRANSACTION_ITEMS: usize = 25;

/// A single operation within a transaction.
///
/// Every operation may carry a condition; if any condition fails the whole transaction is
/// cancelled and nothing is written.
#[derive(Clone, Debug, PartialEq)]
pub enum TransactItem {
    /// Create or replace a row.
    Put {
        /// The full row, including its `PK` and `SK` attributes.
        item: Item,
        /// Guard evaluated against the existing row.
        condition: Option<condition::ConditionExpression>,
    },
    /// Modify attributes of a row.
    Update {
        /// The row to update.
        key: key::TableKey,
        /// The changes to apply.
        update: update_item::UpdateExpression,
        /// Guard evaluated against the existing row.
        condition: Option<condition::ConditionExpression>,
    },
    /// Remove a row. Deleting an absent row is not an error.
    Delete {
        /// The row to delete.
        key: key::TableKey,
        /// Guard evaluated against the existing row.
        condition: Option<condition::ConditionExpression>,
    },
}

impl TransactItem {
    /// Unconditional put.
    pub fn put(item: Item) -> Self {
        Self::Put {
            item,
            condition: None,
        }
    }

    /// Unconditional delete.
    pub fn delete(key: key::TableKey) -> Self {
        Self::Delete {
            key,
            condition: None,
        }
    }

    /// The row this operation targets, `None` for a put whose item lacks key attributes.
    pub fn key(&self) -> Option<key::TableKey> {
        match self {
            Self::Put { item, .. } => key::TableKey::of(item),
            Self::Update { key, .. } | Self::Delete { key, .. } => Some(key.clone()),
        }
    }

    /// The guard attached to this operation.
    pub fn condition(&self) -> Option<&condition::ConditionExpression> {
        match self {
            Self::Put { condition, .. }
            | Self::Update { condition, .. }
            | Self::Delete { condition, .. } => condition.as_ref(),
        }
    }

    pub(crate) fn into_transact_write_item(
        self,
        table_name: &str,
    ) -> Result<types::TransactWriteItem, error::BuildError> {
        let builder = types::TransactWriteItem::builder();
        let transact_write_item = match self {
            Self::Put { item, condition } => {
                let input = write::WriteInput::new(table_name, condition, None);
                let put = crate::apply_write_input!(types::Put::builder().set_item(Some(item)), input)
                    .build()?;
                builder.put(put).build()
            }
            Self::Update {
                key,
                update,
                condition,
            } => {
                let input = write::WriteInput::new(table_name, condition, Some(update));
                let update = crate::apply_write_input!(
                    types::Update::builder()
                        .set_key(Some(key.into()))
                        .set_update_expression(input.update_expression),
                    input
                )
                .build()?;
                builder.update(update).build()
            }
            Self::Delete { key, condition } => {
                let input = write::WriteInput::new(table_name, condition, None);
                let delete =
                    crate::apply_write_input!(types::Delete::builder().set_key(Some(key.into())), input)
                        .build()?;
                builder.delete(delete).build()
            }
        };
        Ok(transact_write_item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::common::AttributePath;

    fn s(value: &str) -> types::AttributeValue {
        types::AttributeValue::S(value.to_string())
    }

    #[test]
    fn test_put_with_guard() {
        let mut item: Item = key::deck("d1").into();
        item.insert("name".to_string(), s("Focus"));
        let transact_item = TransactItem::Put {
            item: item.clone(),
            condition: Some(condition::ConditionExpression::and(vec![
                condition::KeyCondition {
                    path: "PK".into(),
                    condition: condition::Condition::Null,
                },
            ])),
        };
        assert_eq!(transact_item.key(), Some(key::deck("d1")));
        let actual = transact_item.into_transact_write_item("DoDeck").unwrap();
        let put = actual.put.unwrap();
        assert_eq!(put.table_name, "DoDeck");
        assert_eq!(put.item, item);
        assert_eq!(put.condition_expression.as_deref(), Some("attribute_not_exists(#n0)"));
        assert_eq!(put.expression_attribute_values, None);
    }

    #[test]
    fn test_update_renders_update_and_condition() {
        let transact_item = TransactItem::Update {
            key: key::deck("d1"),
            update: update_item::UpdateExpression::default()
                .remove(AttributePath::nested(["collaborators", "b@x.com"])),
            condition: Some(condition::ConditionExpression::and(vec![
                condition::KeyCondition {
                    path: "ownerSub".into(),
                    condition: condition::Condition::Equals(s("auth0|a")),
                },
            ])),
        };
        let update = transact_item
            .into_transact_write_item("DoDeck")
            .unwrap()
            .update
            .unwrap();
        assert_eq!(update.update_expression, "REMOVE #n0.#n1");
        assert_eq!(update.condition_expression.as_deref(), Some("#n2 = :v0"));
        assert_eq!(update.key, Item::from(key::deck("d1")));
    }

    #[test]
    fn test_delete_without_guard() {
        let delete = TransactItem::delete(key::owner_access("a", "focus", "d1"))
            .into_transact_write_item("DoDeck")
            .unwrap()
            .delete
            .unwrap();
        assert_eq!(delete.condition_expression, None);
        assert_eq!(delete.expression_attribute_names, None);
    }
}
