use time::OffsetDateTime;
use tracing::{debug, info};

use super::model::{ProductRecord, RawProduct};
use super::store::Stored;
use crate::derive::{derive_attributes, DeriveOptions};
use crate::state::AppState;

/// Derives scores for `raw` and stores it unless its barcode is already
/// known, in which case the existing record comes back untouched.
pub async fn persist_raw(state: &AppState, raw: RawProduct) -> anyhow::Result<Stored> {
    let barcode = raw.barcode.trim();
    if let Some(existing) = state.store.find_by_barcode(barcode).await? {
        debug!(%barcode, id = %existing.id, "product already stored");
        return Ok(Stored {
            record: existing,
            created: false,
        });
    }

    let opts = DeriveOptions {
        fallback_environment: state.config.fallback_environment,
    };
    let derived = {
        let mut rng = rand::thread_rng();
        derive_attributes(&raw, opts, &mut rng)
    };
    let candidate = ProductRecord::from_raw(raw, derived, OffsetDateTime::now_utc());

    let stored = state.store.create_if_absent(candidate).await?;
    if stored.created {
        info!(
            barcode = %stored.record.barcode,
            green_score = stored.record.derived.green_score,
            match_score = stored.record.derived.match_score,
            provenance = stored.record.derived.environment_provenance.as_str(),
            "product stored"
        );
    }
    Ok(stored)
}
