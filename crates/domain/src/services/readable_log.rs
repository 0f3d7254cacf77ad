//! Human-readable rendering of stored log records.
//!
//! Rendering happens at read time only. The stored record keeps its raw diff;
//! the readable message is the stored message followed by one German clause per
//! changed field.

use serde_json::Value as JsonValue;

use crate::models::{FieldChange, LogRecord, ReadableLog};

/// A phrasing rule for a single changed field.
struct ClauseRule {
    applies: fn(&str, &FieldChange) -> bool,
    format: fn(&str, &FieldChange) -> String,
}

/// Rules in priority order; the first matching rule phrases the field.
const RULES: &[ClauseRule] = &[
    ClauseRule {
        applies: is_status,
        format: status_clause,
    },
    ClauseRule {
        applies: is_assignment,
        format: assignment_clause,
    },
    ClauseRule {
        applies: is_money_field,
        format: money_clause,
    },
    ClauseRule {
        applies: is_resized_array,
        format: array_length_clause,
    },
    ClauseRule {
        applies: always,
        format: default_clause,
    },
];

/// Monetary fields and their display names.
const MONEY_FIELDS: [(&str, &str); 3] = [
    ("totalAmount", "Gesamtbetrag"),
    ("subtotal", "Zwischensumme"),
    ("taxAmount", "Steuerbetrag"),
];

fn is_status(field: &str, _: &FieldChange) -> bool {
    field == "status"
}

fn status_clause(_: &str, change: &FieldChange) -> String {
    format!(
        "Status von \"{}\" zu \"{}\" geändert",
        display_value(&change.old),
        display_value(&change.new)
    )
}

fn is_assignment(field: &str, _: &FieldChange) -> bool {
    field == "assignedTo"
}

fn assignment_clause(_: &str, change: &FieldChange) -> String {
    if is_blank(&change.new) {
        "Zuständigkeit entfernt".to_string()
    } else if is_blank(&change.old) {
        "Zuständigkeit hinzugefügt".to_string()
    } else {
        "Zuständigkeit geändert".to_string()
    }
}

fn is_money_field(field: &str, _: &FieldChange) -> bool {
    MONEY_FIELDS.iter().any(|(name, _)| *name == field)
}

fn money_clause(field: &str, change: &FieldChange) -> String {
    let label = MONEY_FIELDS
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, label)| *label)
        .unwrap_or(field);
    format!(
        "{} von {} € auf {} € geändert",
        label,
        display_amount(&change.old),
        display_amount(&change.new)
    )
}

fn array_len(value: &JsonValue) -> usize {
    value.as_array().map(Vec::len).unwrap_or(0)
}

/// Array fields whose length changed. Same-length edits use the default clause.
fn is_resized_array(_: &str, change: &FieldChange) -> bool {
    change.new.is_array() && array_len(&change.old) != array_len(&change.new)
}

fn array_length_clause(field: &str, change: &FieldChange) -> String {
    format!(
        "Anzahl der {} von {} auf {} geändert",
        field,
        array_len(&change.old),
        array_len(&change.new)
    )
}

fn always(_: &str, _: &FieldChange) -> bool {
    true
}

fn default_clause(field: &str, _: &FieldChange) -> String {
    format!("{} geändert", field)
}

fn is_blank(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::String(s) => s.is_empty(),
        JsonValue::Bool(b) => !b,
        JsonValue::Number(n) => n.as_f64() == Some(0.0),
        _ => false,
    }
}

fn display_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn display_amount(value: &JsonValue) -> String {
    match value {
        JsonValue::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            Some(f) => format!("{}", f),
            None => n.to_string(),
        },
        JsonValue::Null => "0".to_string(),
        other => display_value(other),
    }
}

/// Phrase a single changed field.
pub fn describe_change(field: &str, change: &FieldChange) -> String {
    RULES
        .iter()
        .find(|rule| (rule.applies)(field, change))
        .map(|rule| (rule.format)(field, change))
        .unwrap_or_else(|| default_clause(field, change))
}

/// The stored message extended with the per-field clauses.
pub fn readable_message(record: &LogRecord) -> String {
    if record.changes.is_empty() {
        return record.message.clone();
    }

    let clauses: Vec<String> = record
        .changes
        .iter()
        .map(|(field, change)| describe_change(field, change))
        .collect();

    format!("{}: {}", record.message, clauses.join(", "))
}

/// Render a record for display.
pub fn render(record: &LogRecord) -> ReadableLog {
    ReadableLog {
        id: record.id,
        timestamp: record.timestamp,
        level: record.level,
        message: readable_message(record),
        user_name: record.user_name.clone(),
        source: record.source,
        module: record.module.clone(),
        action: record.action.clone(),
        entity: record.entity.clone(),
    }
}
