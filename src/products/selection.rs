use uuid::Uuid;

use super::model::ProductRecord;

/// Picks the record to show after `deleted` is removed from `recent`:
/// the one after it, else the one before it. When `deleted` is not in the
/// list, the first remaining record.
pub fn select_fallback(recent: &[ProductRecord], deleted: Uuid) -> Option<&ProductRecord> {
    let Some(pos) = recent.iter().position(|r| r.id == deleted) else {
        return recent.iter().find(|r| r.id != deleted);
    };
    recent
        .get(pos + 1)
        .or_else(|| pos.checked_sub(1).and_then(|prev| recent.get(prev)))
}
