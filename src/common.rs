//! Common utilities for building DynamoDB expressions.
//!
//! This module provides shared types used across read and write requests,
//! including table keys, condition expressions and placeholder allocation.

/// Attribute names shared by records, updates and guards.
pub mod attribute;

/// Condition expressions for guards and key conditions.
pub mod condition;

/// Physical key layout of the single table.
pub mod key;

use aws_sdk_dynamodb::types;
use std::collections;

/// A single DynamoDB item, as sent to and returned by the store.
pub type Item = collections::HashMap<String, types::AttributeValue>;

/// Path to an attribute, one segment per map level.
///
/// ```rust
/// use deck_access::common::AttributePath;
///
/// let path = AttributePath::nested(["collaborators", "b@x.com"]);
/// assert_eq!(path.segments().len(), 2);
/// ```
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct AttributePath(Vec<String>);

impl AttributePath {
    /// Build a path from its segments, outermost first.
    pub fn nested<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// The path segments, outermost first.
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Resolve the path against an item.
    pub(crate) fn resolve<'a>(&self, item: &'a Item) -> Option<&'a types::AttributeValue> {
        let (first, rest) = self.0.split_first()?;
        let mut current = item.get(first)?;
        for segment in rest {
            match current {
                types::AttributeValue::M(map) => current = map.get(segment)?,
                _ => return None,
            }
        }
        Some(current)
    }
}

impl From<&str> for AttributePath {
    fn from(name: &str) -> Self {
        Self(vec![name.to_string()])
    }
}

/// Accumulates the placeholders of one request.
///
/// Condition, key condition and update expressions of a single request share the
/// same `ExpressionAttributeNames` and `ExpressionAttributeValues` maps, so they are
/// all rendered through one `ExpressionInput`. Names are deduplicated, values are not.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct ExpressionInput {
    pub(crate) expression_attribute_names: collections::HashMap<String, String>,
    pub(crate) expression_attribute_values: collections::HashMap<String, types::AttributeValue>,
}

impl ExpressionInput {
    /// Placeholder for a single attribute name.
    pub(crate) fn name(&mut self, name: &str) -> String {
        if let Some((placeholder, _)) = self
            .expression_attribute_names
            .iter()
            .find(|(_, existing)| existing.as_str() == name)
        {
            return placeholder.clone();
        }
        let placeholder = format!("#n{}", self.expression_attribute_names.len());
        self.expression_attribute_names
            .insert(placeholder.clone(), name.to_string());
        placeholder
    }

    /// Placeholder path (`#n0.#n1`) for a nested attribute.
    pub(crate) fn path(&mut self, path: &AttributePath) -> String {
        let placeholders: Vec<String> = path
            .segments()
            .iter()
            .map(|segment| self.name(segment))
            .collect();
        placeholders.join(".")
    }

    /// Placeholder for an attribute value.
    pub(crate) fn value(&mut self, value: types::AttributeValue) -> String {
        let placeholder = format!(":v{}", self.expression_attribute_values.len());
        self.expression_attribute_values
            .insert(placeholder.clone(), value);
        placeholder
    }

    /// Split into the optional maps the SDK builders expect.
    ///
    /// DynamoDB rejects empty placeholder maps, so empty maps become `None`.
    pub(crate) fn into_parts(
        self,
    ) -> (
        Option<collections::HashMap<String, String>>,
        Option<collections::HashMap<String, types::AttributeValue>>,
    ) {
        let names = Some(self.expression_attribute_names).filter(|names| !names.is_empty());
        let values = Some(self.expression_attribute_values).filter(|values| !values.is_empty());
        (names, values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[test]
    fn test_names_are_deduplicated() {
        let mut input = ExpressionInput::default();
        let first = input.name("ownerSub");
        let second = input.name("ownerSub");
        let third = input.name("name");
        assert_eq!(first, "#n0");
        assert_eq!(second, "#n0");
        assert_eq!(third, "#n1");
    }

    #[test]
    fn test_path_reuses_shared_segments() {
        let mut input = ExpressionInput::default();
        let first = input.path(&AttributePath::nested(["collaborators", "b@x.com"]));
        let second = input.path(&AttributePath::nested(["collaborators", "c@x.com"]));
        assert_eq!(first, "#n0.#n1");
        assert_eq!(second, "#n0.#n2");
    }

    #[test]
    fn test_empty_input_has_no_parts() {
        let (names, values) = ExpressionInput::default().into_parts();
        assert_eq!(names, None);
        assert_eq!(values, None);
    }

    #[rstest]
    #[case::top_level(AttributePath::from("name"), Some(types::AttributeValue::S("a".to_string())))]
    #[case::nested(
        AttributePath::nested(["collaborators", "b@x.com"]),
        Some(types::AttributeValue::Bool(true))
    )]
    #[case::missing_leaf(AttributePath::nested(["collaborators", "c@x.com"]), None)]
    #[case::through_scalar(AttributePath::nested(["name", "x"]), None)]
    fn test_resolve(#[case] path: AttributePath, #[case] expected: Option<types::AttributeValue>) {
        let item = Item::from([
            ("name".to_string(), types::AttributeValue::S("a".to_string())),
            (
                "collaborators".to_string(),
                types::AttributeValue::M(collections::HashMap::from([(
                    "b@x.com".to_string(),
                    types::AttributeValue::Bool(true),
                )])),
            ),
        ]);
        assert_eq!(path.resolve(&item), expected.as_ref());
    }
}
