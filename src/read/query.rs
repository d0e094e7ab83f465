use crate::common::{self, Item, condition, key};

use aws_sdk_dynamodb::types;
use std::collections;

/// Query of a single partition.
///
/// ```rust
/// use deck_access::read::query::KeyQuery;
///
/// let query = KeyQuery::partition("ACCESS#USER#auth0|a").with_sort_key_prefix("DECK#focus");
/// assert_eq!(query.sort_key_prefix.as_deref(), Some("DECK#focus"));
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct KeyQuery {
    /// Whether to use a strongly consistent read.
    pub consistent_read: bool,
    /// The `PK` value to query.
    pub partition_key: String,
    /// Optional `begins_with` filter on `SK`.
    pub sort_key_prefix: Option<String>,
}

impl KeyQuery {
    /// Every row of a partition.
    pub fn partition(partition_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            ..Default::default()
        }
    }

    /// Restrict to rows whose sort key starts with `prefix`.
    pub fn with_sort_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.sort_key_prefix = Some(prefix.into());
        self
    }

    /// Whether a row falls inside this query's key range.
    pub fn matches(&self, keys: &key::TableKey) -> bool {
        keys.partition_key == self.partition_key
            && self
                .sort_key_prefix
                .as_deref()
                .is_none_or(|prefix| keys.sort_key.starts_with(prefix))
    }

    fn key_condition(self) -> condition::ConditionExpression {
        let mut conditions = vec![condition::KeyCondition {
            path: key::PARTITION_KEY.into(),
            condition: condition::Condition::Equals(types::AttributeValue::S(self.partition_key)),
        }];
        if let Some(prefix) = self.sort_key_prefix {
            conditions.push(condition::KeyCondition {
                path: key::SORT_KEY.into(),
                condition: condition::Condition::BeginsWith(prefix),
            });
        }
        condition::ConditionExpression::and(conditions)
    }
}

/// One page of query results.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
    /// Rows in sort key order.
    pub items: Vec<Item>,
    /// Continuation key; `None` once the partition is exhausted.
    pub last_evaluated_key: Option<key::TableKey>,
}

/// query operation
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct QueryInput {
    pub(crate) consistent_read: bool,
    pub(crate) exclusive_start_key: Option<Item>,
    pub(crate) expression_attribute_names: Option<collections::HashMap<String, String>>,
    pub(crate) expression_attribute_values:
        Option<collections::HashMap<String, types::AttributeValue>>,
    pub(crate) key_condition_expression: String,
    pub(crate) table_name: String,
}

impl QueryInput {
    pub(crate) fn new(
        table_name: &str,
        query: KeyQuery,
        exclusive_start_key: Option<key::TableKey>,
    ) -> Self {
        let consistent_read = query.consistent_read;
        let mut input = common::ExpressionInput::default();
        let key_condition_expression = query.key_condition().render(&mut input);
        let (expression_attribute_names, expression_attribute_values) = input.into_parts();
        Self {
            consistent_read,
            exclusive_start_key: exclusive_start_key.map(Into::into),
            expression_attribute_names,
            expression_attribute_values,
            key_condition_expression,
            table_name: table_name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case::partition_only(
        KeyQuery::partition("DECK#d1"),
        "#n0 = :v0",
        1
    )]
    #[case::with_prefix(
        KeyQuery::partition("ACCESS#USER#a").with_sort_key_prefix("DECK#foc"),
        "#n0 = :v0 AND begins_with(#n1, :v1)",
        2
    )]
    fn test_query_input(
        #[case] query: KeyQuery,
        #[case] expected: &str,
        #[case] placeholders: usize,
    ) {
        let input = QueryInput::new("DoDeck", query, None);
        assert_eq!(input.key_condition_expression, expected);
        assert_eq!(
            input.expression_attribute_values.map(|values| values.len()),
            Some(placeholders)
        );
        assert_eq!(input.exclusive_start_key, None);
        assert_eq!(input.table_name, "DoDeck");
    }

    #[test]
    fn test_exclusive_start_key_is_serialized() {
        let start = key::owner_access("a", "focus", "d1");
        let input = QueryInput::new("DoDeck", KeyQuery::partition("ACCESS#USER#a"), Some(start.clone()));
        assert_eq!(input.exclusive_start_key, Some(Item::from(start)));
    }

    #[rstest]
    #[case::same_partition_no_prefix(KeyQuery::partition("DECK#d1"), key::do_item("d1", "x"), true)]
    #[case::other_partition(KeyQuery::partition("DECK#d2"), key::do_item("d1", "x"), false)]
    #[case::prefix_hit(
        KeyQuery::partition("DECK#d1").with_sort_key_prefix("DO#"),
        key::do_item("d1", "x"),
        true
    )]
    #[case::prefix_miss(
        KeyQuery::partition("DECK#d1").with_sort_key_prefix("DO#"),
        key::deck("d1"),
        false
    )]
    fn test_matches(#[case] query: KeyQuery, #[case] keys: key::TableKey, #[case] expected: bool) {
        assert_eq!(query.matches(&keys), expected);
    }
}
