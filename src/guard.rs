//! Conditional guards and their domain meaning.
//!
//! Every guarded write names exactly one [`Guard`]. A cancelled transaction therefore maps
//! back to a single domain error without inspecting which operation failed.

use crate::common::{AttributePath, attribute, condition, key};
use crate::error::{Error, Result};
use crate::model::Deck;
use crate::store;

use aws_sdk_dynamodb::types;
use serde_dynamo::to_attribute_value;

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Guard {
    /// The deck row must not exist yet.
    FreshDeck { deck_id: String },
    /// The deck row must exist, belong to `owner_sub` and still carry `updated_at`.
    Unchanged {
        deck_id: String,
        owner_sub: String,
        updated_at: types::AttributeValue,
    },
    /// The deck row must belong to `owner_sub` and be named `name_lower`, and `email` must
    /// not collaborate yet.
    NewCollaborator {
        deck_id: String,
        owner_sub: String,
        name_lower: String,
        email: String,
    },
    /// As [`Guard::NewCollaborator`], but `email` must collaborate.
    ExistingCollaborator {
        deck_id: String,
        owner_sub: String,
        name_lower: String,
        email: String,
    },
    /// The item row must not exist yet.
    FreshDo { deck_id: String },
    /// The item row must exist.
    ExistingDo { deck_id: String, do_id: String },
}

fn equals(path: &str, value: types::AttributeValue) -> condition::KeyCondition {
    condition::KeyCondition {
        path: path.into(),
        condition: condition::Condition::Equals(value),
    }
}

fn string(value: &str) -> types::AttributeValue {
    types::AttributeValue::S(value.to_string())
}

fn row(condition: condition::Condition) -> condition::KeyCondition {
    condition::KeyCondition {
        path: key::PARTITION_KEY.into(),
        condition,
    }
}

fn collaborator(email: &str, condition: condition::Condition) -> condition::KeyCondition {
    condition::KeyCondition {
        path: AttributePath::nested([attribute::COLLABORATORS, email]),
        condition,
    }
}

impl Guard {
    /// Guard a write on `deck` being the current version of its row.
    pub(crate) fn unchanged(deck: &Deck) -> Result<Self> {
        Ok(Self::Unchanged {
            deck_id: deck.deck_id.clone(),
            owner_sub: deck.owner_sub.clone(),
            updated_at: to_attribute_value(deck.updated_at)?,
        })
    }

    pub(crate) fn deck_id(&self) -> &str {
        match self {
            Self::FreshDeck { deck_id }
            | Self::Unchanged { deck_id, .. }
            | Self::NewCollaborator { deck_id, .. }
            | Self::ExistingCollaborator { deck_id, .. }
            | Self::FreshDo { deck_id }
            | Self::ExistingDo { deck_id, .. } => deck_id,
        }
    }

    pub(crate) fn condition(&self) -> condition::ConditionExpression {
        let conditions = match self {
            Self::FreshDeck { .. } | Self::FreshDo { .. } => {
                vec![row(condition::Condition::Null)]
            }
            Self::Unchanged {
                owner_sub,
                updated_at,
                ..
            } => vec![
                equals(attribute::OWNER_SUB, string(owner_sub)),
                equals(attribute::UPDATED_AT, updated_at.clone()),
            ],
            Self::NewCollaborator {
                owner_sub,
                name_lower,
                email,
                ..
            } => vec![
                equals(attribute::OWNER_SUB, string(owner_sub)),
                equals(attribute::NAME_LOWER, string(name_lower)),
                collaborator(email, condition::Condition::Null),
            ],
            Self::ExistingCollaborator {
                owner_sub,
                name_lower,
                email,
                ..
            } => vec![
                equals(attribute::OWNER_SUB, string(owner_sub)),
                equals(attribute::NAME_LOWER, string(name_lower)),
                collaborator(email, condition::Condition::NotNull),
            ],
            Self::ExistingDo { .. } => vec![row(condition::Condition::NotNull)],
        };
        condition::ConditionExpression::and(conditions)
    }

    /// The domain error for a failed guard.
    pub(crate) fn violation(self) -> Error {
        match self {
            Self::FreshDeck { deck_id }
            | Self::Unchanged { deck_id, .. }
            | Self::FreshDo { deck_id } => Error::Conflict { deck_id },
            Self::NewCollaborator { deck_id, email, .. } => {
                Error::DuplicateCollaborator { deck_id, email }
            }
            Self::ExistingCollaborator { deck_id, email, .. } => {
                Error::CollaboratorNotFound { deck_id, email }
            }
            Self::ExistingDo { deck_id, do_id } => Error::DoNotFound { deck_id, do_id },
        }
    }

    /// Translate a store failure of the write this guard protected.
    pub(crate) fn translate(self, error: store::Error) -> Error {
        match error {
            store::Error::ConditionFailed => self.violation(),
            store::Error::TransactionConflict => Error::Conflict {
                deck_id: self.deck_id().to_string(),
            },
            other => other.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::common::Item;
    use rstest::rstest;
    use std::collections;

    const VERSION: &str = "2026-01-02T03:04:05Z";

    fn deck_row(collaborators: &[&str]) -> Item {
        let collaborators = collaborators
            .iter()
            .map(|email| {
                (
                    email.to_string(),
                    types::AttributeValue::M(collections::HashMap::new()),
                )
            })
            .collect();
        let mut item: Item = key::deck("d1").into();
        item.insert(attribute::OWNER_SUB.to_string(), string("auth0|a"));
        item.insert(attribute::NAME_LOWER.to_string(), string("focus"));
        item.insert(attribute::UPDATED_AT.to_string(), string(VERSION));
        item.insert(
            attribute::COLLABORATORS.to_string(),
            types::AttributeValue::M(collaborators),
        );
        item
    }

    fn unchanged(owner_sub: &str, updated_at: &str) -> Guard {
        Guard::Unchanged {
            deck_id: "d1".to_string(),
            owner_sub: owner_sub.to_string(),
            updated_at: string(updated_at),
        }
    }

    fn new_collaborator(owner_sub: &str, name_lower: &str) -> Guard {
        Guard::NewCollaborator {
            deck_id: "d1".to_string(),
            owner_sub: owner_sub.to_string(),
            name_lower: name_lower.to_string(),
            email: "b@x.com".to_string(),
        }
    }

    fn existing_collaborator(name_lower: &str) -> Guard {
        Guard::ExistingCollaborator {
            deck_id: "d1".to_string(),
            owner_sub: "auth0|a".to_string(),
            name_lower: name_lower.to_string(),
            email: "b@x.com".to_string(),
        }
    }

    #[rstest]
    #[case::fresh_on_absent(Guard::FreshDeck { deck_id: "d1".to_string() }, None, true)]
    #[case::fresh_on_present(Guard::FreshDeck { deck_id: "d1".to_string() }, Some(deck_row(&[])), false)]
    #[case::unchanged(unchanged("auth0|a", VERSION), Some(deck_row(&[])), true)]
    #[case::unchanged_on_absent(unchanged("auth0|a", VERSION), None, false)]
    #[case::unchanged_wrong_owner(unchanged("auth0|z", VERSION), Some(deck_row(&[])), false)]
    #[case::unchanged_newer_row(unchanged("auth0|a", "2026-01-01T00:00:00Z"), Some(deck_row(&[])), false)]
    #[case::new_collaborator(new_collaborator("auth0|a", "focus"), Some(deck_row(&[])), true)]
    #[case::duplicate_collaborator(new_collaborator("auth0|a", "focus"), Some(deck_row(&["b@x.com"])), false)]
    #[case::collaborator_wrong_owner(new_collaborator("auth0|z", "focus"), Some(deck_row(&[])), false)]
    #[case::collaborator_renamed_deck(new_collaborator("auth0|a", "later"), Some(deck_row(&[])), false)]
    #[case::existing_collaborator(existing_collaborator("focus"), Some(deck_row(&["b@x.com"])), true)]
    #[case::missing_collaborator(existing_collaborator("focus"), Some(deck_row(&["c@x.com"])), false)]
    #[case::existing_renamed_deck(existing_collaborator("later"), Some(deck_row(&["b@x.com"])), false)]
    #[case::do_exists(
        Guard::ExistingDo { deck_id: "d1".to_string(), do_id: "x".to_string() },
        Some(key::do_item("d1", "x").into()),
        true
    )]
    #[case::do_missing(
        Guard::ExistingDo { deck_id: "d1".to_string(), do_id: "x".to_string() },
        None,
        false
    )]
    fn test_condition(#[case] guard: Guard, #[case] row: Option<Item>, #[case] expected: bool) {
        assert_eq!(guard.condition().evaluate(row.as_ref()), expected);
    }

    #[test]
    fn test_unchanged_matches_stored_deck() {
        let deck = Deck {
            deck_id: "d1".to_string(),
            name: "Focus".to_string(),
            name_lower: "focus".to_string(),
            owner_sub: "auth0|a".to_string(),
            collaborators: collections::BTreeMap::new(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        let item = deck.to_item().unwrap();
        let guard = Guard::unchanged(&deck).unwrap();
        assert!(guard.condition().evaluate(Some(&item)));
        let stale = Guard::unchanged(&Deck {
            updated_at: deck.updated_at - chrono::Duration::seconds(1),
            ..deck.clone()
        })
        .unwrap();
        assert!(!stale.condition().evaluate(Some(&item)));
    }

    #[test]
    fn test_violation_mapping() {
        assert!(matches!(
            new_collaborator("auth0|a", "focus").violation(),
            Error::DuplicateCollaborator { deck_id, email } if deck_id == "d1" && email == "b@x.com"
        ));
        assert!(matches!(
            existing_collaborator("focus").violation(),
            Error::CollaboratorNotFound { .. }
        ));
        assert!(matches!(
            unchanged("auth0|a", VERSION).violation(),
            Error::Conflict { deck_id } if deck_id == "d1"
        ));
        assert!(matches!(
            Guard::FreshDo { deck_id: "d1".to_string() }.violation(),
            Error::Conflict { deck_id } if deck_id == "d1"
        ));
    }

    #[test]
    fn test_translate() {
        assert!(matches!(
            existing_collaborator("focus").translate(store::Error::TransactionConflict),
            Error::Conflict { .. }
        ));
        assert!(matches!(
            existing_collaborator("focus").translate(store::Error::ConditionFailed),
            Error::CollaboratorNotFound { .. }
        ));
        assert!(matches!(
            existing_collaborator("focus").translate(store::Error::Validation("bad".to_string())),
            Error::Store(store::Error::Validation(_))
        ));
    }
}
