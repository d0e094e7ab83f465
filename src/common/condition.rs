use crate::common::{self, AttributePath, Item};

use aws_sdk_dynamodb::types;

const AND: &str = " AND ";

/// Condition types for DynamoDB expressions.
///
/// Only the predicates this crate's guards and key conditions need are modelled.
#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    /// Checks if a string attribute begins with a specified prefix.
    BeginsWith(String),
    /// Checks if an attribute value equals a specified value.
    Equals(types::AttributeValue),
    /// Checks if an attribute exists.
    NotNull,
    /// Checks if an attribute does not exist.
    Null,
}

impl Condition {
    fn render(self, path: &str, input: &mut common::ExpressionInput) -> String {
        match self {
            Self::BeginsWith(prefix) => {
                let value = input.value(types::AttributeValue::S(prefix));
                format!("begins_with({path}, {value})")
            }
            Self::Equals(value) => {
                let value = input.value(value);
                format!("{path} = {value}")
            }
            Self::NotNull => format!("attribute_exists({path})"),
            Self::Null => format!("attribute_not_exists({path})"),
        }
    }

    fn evaluate(&self, value: Option<&types::AttributeValue>) -> bool {
        match (self, value) {
            (Self::BeginsWith(prefix), Some(types::AttributeValue::S(actual))) => {
                actual.starts_with(prefix.as_str())
            }
            (Self::BeginsWith(_), _) => false,
            (Self::Equals(expected), Some(actual)) => expected == actual,
            (Self::Equals(_), None) => false,
            (Self::NotNull, value) => value.is_some(),
            (Self::Null, value) => value.is_none(),
        }
    }
}

/// Condition applied to an attribute path.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyCondition {
    /// The condition to apply to the attribute.
    pub condition: Condition,
    /// The attribute the condition applies to.
    pub path: AttributePath,
}

/// A flat conjunction of conditions.
///
/// ```rust
/// use deck_access::common::condition;
///
/// let guard = condition::ConditionExpression::and(vec![condition::KeyCondition {
///     path: "PK".into(),
///     condition: condition::Condition::Null,
/// }]);
/// assert_eq!(guard.conditions.len(), 1);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ConditionExpression {
    /// Every condition in the expression; all must hold.
    pub conditions: Vec<KeyCondition>,
}

impl ConditionExpression {
    /// All conditions must hold.
    pub fn and(conditions: Vec<KeyCondition>) -> Self {
        Self { conditions }
    }

    /// Render into an expression string, registering placeholders in `input`.
    pub(crate) fn render(self, input: &mut common::ExpressionInput) -> String {
        let mut expressions = Vec::with_capacity(self.conditions.len());
        for key_condition in self.conditions {
            let path = input.path(&key_condition.path);
            expressions.push(key_condition.condition.render(&path, input));
        }
        expressions.join(AND)
    }

    /// Evaluate against the current version of an item, `None` if it does not exist.
    pub fn evaluate(&self, item: Option<&Item>) -> bool {
        self.conditions.iter().all(|key_condition| {
            let value = item.and_then(|item| key_condition.path.resolve(item));
            key_condition.condition.evaluate(value)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::common::attribute;
    use rstest::rstest;
    use std::collections;

    fn s(value: &str) -> types::AttributeValue {
        types::AttributeValue::S(value.to_string())
    }

    fn deck_item() -> Item {
        Item::from([
            ("PK".to_string(), s("DECK#d1")),
            (attribute::OWNER_SUB.to_string(), s("auth0|a")),
            (
                attribute::COLLABORATORS.to_string(),
                types::AttributeValue::M(collections::HashMap::from([(
                    "b@x.com".to_string(),
                    types::AttributeValue::M(collections::HashMap::new()),
                )])),
            ),
        ])
    }

    #[rstest]
    #[case::not_exists(
        ConditionExpression::and(vec![
            KeyCondition {
                path: "PK".into(),
                condition: Condition::Null,
            },
        ]),
        "attribute_not_exists(#n0)",
        vec![("#n0", "PK")],
        vec![]
    )]
    #[case::owner_and_missing_collaborator(
        ConditionExpression::and(vec![
            KeyCondition {
                path: "ownerSub".into(),
                condition: Condition::Equals(s("auth0|a")),
            },
            KeyCondition {
                path: AttributePath::nested(["collaborators", "b@x.com"]),
                condition: Condition::Null,
            },
        ]),
        "#n0 = :v0 AND attribute_not_exists(#n1.#n2)",
        vec![("#n0", "ownerSub"), ("#n1", "collaborators"), ("#n2", "b@x.com")],
        vec![(":v0", "auth0|a")]
    )]
    #[case::key_condition(
        ConditionExpression::and(vec![
            KeyCondition {
                path: "PK".into(),
                condition: Condition::Equals(s("ACCESS#USER#a")),
            },
            KeyCondition {
                path: "SK".into(),
                condition: Condition::BeginsWith("DECK#foc".to_string()),
            },
        ]),
        "#n0 = :v0 AND begins_with(#n1, :v1)",
        vec![("#n0", "PK"), ("#n1", "SK")],
        vec![(":v0", "ACCESS#USER#a"), (":v1", "DECK#foc")]
    )]
    fn test_render(
        #[case] condition: ConditionExpression,
        #[case] expected: &str,
        #[case] names: Vec<(&str, &str)>,
        #[case] values: Vec<(&str, &str)>,
    ) {
        let mut input = common::ExpressionInput::default();
        let actual = condition.render(&mut input);
        assert_eq!(actual, expected);
        let names: collections::HashMap<String, String> = names
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let values: collections::HashMap<String, types::AttributeValue> = values
            .into_iter()
            .map(|(k, v)| (k.to_string(), s(v)))
            .collect();
        assert_eq!(input.expression_attribute_names, names);
        assert_eq!(input.expression_attribute_values, values);
    }

    #[rstest]
    #[case::absent_row_is_fresh(None, Condition::Null, "PK", true)]
    #[case::present_row_is_not_fresh(Some(deck_item()), Condition::Null, "PK", false)]
    #[case::owner_matches(Some(deck_item()), Condition::Equals(s("auth0|a")), "ownerSub", true)]
    #[case::owner_differs(Some(deck_item()), Condition::Equals(s("auth0|z")), "ownerSub", false)]
    #[case::equals_on_absent_row(None, Condition::Equals(s("auth0|a")), "ownerSub", false)]
    #[case::begins_with(Some(deck_item()), Condition::BeginsWith("DECK#".to_string()), "PK", true)]
    fn test_evaluate_top_level(
        #[case] item: Option<Item>,
        #[case] condition: Condition,
        #[case] path: &str,
        #[case] expected: bool,
    ) {
        let expression = ConditionExpression::and(vec![KeyCondition {
            path: path.into(),
            condition,
        }]);
        assert_eq!(expression.evaluate(item.as_ref()), expected);
    }

    #[test]
    fn test_evaluate_nested_collaborator() {
        let item = deck_item();
        let present = ConditionExpression::and(vec![KeyCondition {
            path: AttributePath::nested(["collaborators", "b@x.com"]),
            condition: Condition::NotNull,
        }]);
        let absent = ConditionExpression::and(vec![KeyCondition {
            path: AttributePath::nested(["collaborators", "c@x.com"]),
            condition: Condition::NotNull,
        }]);
        assert!(present.evaluate(Some(&item)));
        assert!(!absent.evaluate(Some(&item)));
    }
}
