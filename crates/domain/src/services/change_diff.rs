//! Change tracking between two snapshots of an entity.
//!
//! Snapshots are JSON objects. A field counts as changed when the serialized
//! form of its old and new value differ, so arrays are compared as a whole and
//! any reordering is a change.

use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::models::{Changes, FieldChange, LogLevel, LogSource, NewLogRecord};

/// Field values of an entity at one point in time.
pub type Snapshot = JsonMap<String, JsonValue>;

/// Identity and bookkeeping fields that never count as a change.
pub const IGNORED_FIELDS: [&str; 7] = [
    "id",
    "_id",
    "__v",
    "createdAt",
    "updatedAt",
    "created_at",
    "updated_at",
];

/// Compute the changed fields of `new` relative to `old`.
///
/// Only keys present in `new` are considered. A key missing from `old` is
/// reported with an old value of `null`.
pub fn diff_snapshots(old: &Snapshot, new: &Snapshot) -> Changes {
    let mut changes = Changes::new();

    for (key, new_value) in new {
        if IGNORED_FIELDS.contains(&key.as_str()) {
            continue;
        }

        let old_value = old.get(key);
        let old_serialized = old_value.map(JsonValue::to_string);
        if old_serialized.as_deref() == Some(new_value.to_string().as_str()) {
            continue;
        }

        changes.insert(
            key.clone(),
            FieldChange::new(old_value.cloned().unwrap_or(JsonValue::Null), new_value.clone()),
        );
    }

    changes
}

/// The entity and actor a change record is about.
#[derive(Debug, Clone)]
pub struct ChangeContext {
    /// Singular entity type, e.g. `order`.
    pub entity_type: String,
    pub entity_id: String,
    /// Human label used in the default message, e.g. `Auftrag A-1001`.
    pub entity_label: String,
    pub actor_id: String,
    pub actor_name: String,
    pub message: Option<String>,
    pub source: LogSource,
}

impl ChangeContext {
    pub fn new(
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        entity_label: impl Into<String>,
    ) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            entity_label: entity_label.into(),
            actor_id: crate::models::SYSTEM_ACTOR.to_string(),
            actor_name: crate::models::SYSTEM_ACTOR.to_string(),
            message: None,
            source: LogSource::DataOperation,
        }
    }

    pub fn by(mut self, actor_id: impl Into<String>, actor_name: impl Into<String>) -> Self {
        self.actor_id = actor_id.into();
        self.actor_name = actor_name.into();
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_source(mut self, source: LogSource) -> Self {
        self.source = source;
        self
    }
}

/// Build the update record for a mutation, or `None` when nothing changed.
pub fn change_record(ctx: &ChangeContext, old: &Snapshot, new: &Snapshot) -> Option<NewLogRecord> {
    let changes = diff_snapshots(old, new);
    if changes.is_empty() {
        return None;
    }

    let message = ctx
        .message
        .clone()
        .unwrap_or_else(|| format!("{} wurde aktualisiert", ctx.entity_label));

    Some(
        NewLogRecord::new(LogLevel::Info, message)
            .with_actor(ctx.actor_id.clone(), ctx.actor_name.clone())
            .with_module(format!("{}s", ctx.entity_type))
            .with_action("update")
            .on_entity(ctx.entity_type.clone(), Some(ctx.entity_id.clone()))
            .with_changes(changes)
            .with_source(ctx.source),
    )
}
