//! Reserved top-level JSON keys and document lifecycle stamping (spec §6):
//! `_id`, `_ctime`, `_mtime`, `_vers`, `_deletedAt`.

use time::OffsetDateTime;
use uuid::Uuid;

pub const ID_KEY: &str = "_id";
pub const CTIME_KEY: &str = "_ctime";
pub const MTIME_KEY: &str = "_mtime";
pub const VERS_KEY: &str = "_vers";
pub const DELETED_AT_KEY: &str = "_deletedAt";

/// `true` for any of the five reserved keys a caller must never set
/// directly through `$set`/`$inc` — lifecycle stamping owns them.
#[must_use]
pub fn is_reserved_key(key: &str) -> bool {
    matches!(
        key,
        ID_KEY | CTIME_KEY | MTIME_KEY | VERS_KEY | DELETED_AT_KEY
    )
}

/// Milliseconds since the Unix epoch, the unit every reserved timestamp
/// field stores.
#[must_use]
pub fn now_millis() -> f64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as f64
}

/// A new collection-prefixed unique identifier, e.g. `users_3f2a...`.
#[must_use]
pub fn generate_id(collection: &str) -> String {
    format!("{collection}_{}", Uuid::new_v4().simple())
}

/// Stamps a freshly-built document's `_id`/`_ctime`/`_mtime`/`_vers` in
/// place, ahead of its first INSERT. Called once per `create`.
pub fn stamp_create(doc: &mut serde_json::Map<String, serde_json::Value>, collection: &str) {
    let now = now_millis();
    doc.insert(ID_KEY.to_string(), serde_json::Value::String(generate_id(collection)));
    doc.insert(CTIME_KEY.to_string(), serde_json::json!(now));
    doc.insert(MTIME_KEY.to_string(), serde_json::json!(now));
    doc.insert(VERS_KEY.to_string(), serde_json::json!(1));
}

/// Bumps `_mtime` and `_vers` ahead of a `save()`/`updateOne` write.
/// Returns the version the row is expected to currently hold.
pub fn stamp_update(doc: &mut serde_json::Map<String, serde_json::Value>) -> i64 {
    let expected = doc
        .get(VERS_KEY)
        .and_then(serde_json::Value::as_i64)
        .unwrap_or(1);
    doc.insert(MTIME_KEY.to_string(), serde_json::json!(now_millis()));
    doc.insert(VERS_KEY.to_string(), serde_json::json!(expected + 1));
    expected
}
