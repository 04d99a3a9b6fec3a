//! Barcode/QR capture: a frame-driven state machine over an owned
//! [`FrameSource`], with structured cancellation through [`StopHandle`].

mod capture_loop;
mod source;

pub use capture_loop::{
    CaptureLoop, CaptureOutcome, CaptureState, DecodeCallback, StopHandle, Tick,
};
pub use source::{DeviceError, FrameSource, RawSymbolResult, SymbolDecoder, SymbolFormat};

#[cfg(test)]
pub(crate) use capture_loop::testing;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("capture device failed: {0}")]
    Device(#[from] DeviceError),
    #[error("capture loop has failed; create a new one")]
    Terminated,
}
