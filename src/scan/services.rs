use tokio::sync::oneshot;
use tracing::{debug, info, instrument};

use super::ScanError;
use crate::capture::{CaptureLoop, CaptureOutcome, FrameSource, RawSymbolResult, StopHandle, SymbolDecoder};
use crate::lookup::validate_barcode;
use crate::products::model::ProductRecord;
use crate::products::services::persist_raw;
use crate::state::AppState;

/// Returns the stored record for `barcode`, looking it up upstream and
/// persisting it on first sight.
#[instrument(skip(state))]
pub async fn resolve_barcode(state: &AppState, barcode: &str) -> Result<ProductRecord, ScanError> {
    let barcode = validate_barcode(barcode)?;

    if let Some(existing) = state.store.find_by_barcode(barcode).await.map_err(ScanError::Store)? {
        debug!(id = %existing.id, "barcode already known");
        return Ok(existing);
    }

    let raw = state.lookup.lookup(barcode).await?;
    let stored = persist_raw(state, raw).await.map_err(ScanError::Store)?;
    Ok(stored.record)
}

/// A capture loop whose decoded text is resolved into a product record.
pub struct ScanSession<S, D>
where
    S: FrameSource,
    D: SymbolDecoder<S::Frame>,
{
    capture: CaptureLoop<S, D>,
    decoded: oneshot::Receiver<RawSymbolResult>,
}

impl<S, D> ScanSession<S, D>
where
    S: FrameSource,
    D: SymbolDecoder<S::Frame>,
{
    pub fn new(source: S, decoder: D) -> Self {
        let (tx, rx) = oneshot::channel();
        let mut tx = Some(tx);
        let capture = CaptureLoop::new(source, decoder, move |symbol| {
            if let Some(tx) = tx.take() {
                let _ = tx.send(symbol);
            }
        });
        Self {
            capture,
            decoded: rx,
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.capture.stop_handle()
    }

    /// Runs the capture loop to completion, then resolves what it decoded.
    /// `Ok(None)` when the scan was cancelled before a symbol was read.
    pub async fn resolve(mut self, state: &AppState) -> Result<Option<ProductRecord>, ScanError> {
        let outcome = self.capture.run().await?;
        drop(self.capture);

        let symbol = match (outcome, self.decoded.try_recv()) {
            (CaptureOutcome::Decoded, Ok(symbol)) => symbol,
            _ => {
                info!("scan cancelled before a symbol was decoded");
                return Ok(None);
            }
        };

        info!(format = ?symbol.format, "resolving scanned symbol");
        resolve_barcode(state, &symbol.text).await.map(Some)
    }
}

/// Runs one capture session and resolves the decoded barcode.
pub async fn scan_and_resolve<S, D>(
    state: &AppState,
    source: S,
    decoder: D,
) -> Result<Option<ProductRecord>, ScanError>
where
    S: FrameSource,
    D: SymbolDecoder<S::Frame>,
{
    ScanSession::new(source, decoder).resolve(state).await
}
