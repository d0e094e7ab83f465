use crate::common::{self, AttributePath, Item};
use crate::store;

use aws_sdk_dynamodb::types;
use std::collections;

/// One action of an update expression.
#[derive(Clone, Debug, PartialEq)]
pub enum UpdateAction {
    /// Assign a new value to the attribute (replaces existing value).
    Set(AttributePath, types::AttributeValue),
    /// Remove the attribute from the item.
    Remove(AttributePath),
}

/// Update expression.
///
/// ```rust
/// use aws_sdk_dynamodb::types::AttributeValue;
/// use deck_access::write::update_item::UpdateExpression;
///
/// let update = UpdateExpression::default()
///     .set("name", AttributeValue::S("Focus".to_string()))
///     .remove("draft");
/// assert_eq!(update.actions.len(), 2);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UpdateExpression {
    /// Actions, applied in order.
    pub actions: Vec<UpdateAction>,
}

impl UpdateExpression {
    /// Append a SET action.
    pub fn set(mut self, path: impl Into<AttributePath>, value: types::AttributeValue) -> Self {
        self.actions.push(UpdateAction::Set(path.into(), value));
        self
    }

    /// Append a REMOVE action.
    pub fn remove(mut self, path: impl Into<AttributePath>) -> Self {
        self.actions.push(UpdateAction::Remove(path.into()));
        self
    }

    /// Render into an expression string, registering placeholders in `input`.
    pub(crate) fn render(self, input: &mut common::ExpressionInput) -> String {
        let mut sets = Vec::new();
        let mut removes = Vec::new();
        for action in self.actions {
            match action {
                UpdateAction::Set(path, value) => {
                    let path = input.path(&path);
                    let value = input.value(value);
                    sets.push(format!("{path} = {value}"));
                }
                UpdateAction::Remove(path) => removes.push(input.path(&path)),
            }
        }
        let mut clauses = Vec::with_capacity(2);
        if !sets.is_empty() {
            clauses.push(format!("SET {}", sets.join(", ")));
        }
        if !removes.is_empty() {
            clauses.push(format!("REMOVE {}", removes.join(", ")));
        }
        clauses.join(" ")
    }

    /// Apply the actions to an item in place.
    ///
    /// Mirrors DynamoDB: setting below a missing or non-map parent is a validation error,
    /// removing a missing attribute is not.
    pub(crate) fn apply(self, item: &mut Item) -> Result<(), store::Error> {
        for action in self.actions {
            match action {
                UpdateAction::Set(path, value) => {
                    let (parent, leaf) = parent_map(item, &path)?;
                    parent.insert(leaf, value);
                }
                UpdateAction::Remove(path) => {
                    if let Ok((parent, leaf)) = parent_map(item, &path) {
                        parent.remove(&leaf);
                    }
                }
            }
        }
        Ok(())
    }
}

fn parent_map<'a>(
    item: &'a mut Item,
    path: &AttributePath,
) -> Result<(&'a mut collections::HashMap<String, types::AttributeValue>, String), store::Error> {
    let invalid = || store::Error::Validation(format!("invalid document path {path:?}"));
    let (leaf, parents) = path.segments().split_last().ok_or_else(invalid)?;
    let mut current = item;
    for segment in parents {
        match current.get_mut(segment) {
            Some(types::AttributeValue::M(map)) => current = map,
            _ => return Err(invalid()),
        }
    }
    Ok((current, leaf.clone()))
}
