//! Write requests against the single table.
//!
//! This module provides the typed write requests the store understands:
//! - Conditional single-row puts, updates and deletes
//! - Multi-row transactions
//! - Chunked batch deletes

/// Batch delete requests, chunked to the store's batch-size limit.
pub mod batch_write_item;

/// Transactional (all-or-nothing) multi-row writes.
pub mod transact_write_items;

/// Update expressions (SET / REMOVE).
pub mod update_item;

use crate::common::{self, condition};

use aws_sdk_dynamodb::types;
use std::collections;

/// Processed parameters of one conditional write.
///
/// Holds the rendered condition and update expressions together with the placeholder
/// maps they share, ready to be applied to any SDK write builder.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct WriteInput {
    pub(crate) condition_expression: Option<String>,
    pub(crate) expression_attribute_names: Option<collections::HashMap<String, String>>,
    pub(crate) expression_attribute_values:
        Option<collections::HashMap<String, types::AttributeValue>>,
    pub(crate) table_name: String,
    pub(crate) update_expression: Option<String>,
}

impl WriteInput {
    pub(crate) fn new(
        table_name: &str,
        condition: Option<condition::ConditionExpression>,
        update: Option<update_item::UpdateExpression>,
    ) -> Self {
        let mut input = common::ExpressionInput::default();
        let update_expression = update.map(|update| update.render(&mut input));
        let condition_expression = condition.map(|condition| condition.render(&mut input));
        let (expression_attribute_names, expression_attribute_values) = input.into_parts();
        Self {
            condition_expression,
            expression_attribute_names,
            expression_attribute_values,
            table_name: table_name.to_string(),
            update_expression,
        }
    }
}

/// apply common conditional write settings to a builder
#[macro_export]
macro_rules! apply_write_input {
    ($builder:expr, $write_input:expr) => {
        $builder
            .set_condition_expression($write_input.condition_expression)
            .set_expression_attribute_names($write_input.expression_attribute_names)
            .set_expression_attribute_values($write_input.expression_attribute_values)
            .table_name($write_input.table_name)
    };
}
