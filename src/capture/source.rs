use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Barcode symbologies the decoders report.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolFormat {
    Ean13,
    Ean8,
    UpcA,
    UpcE,
    Code128,
    Code39,
    QrCode,
    Other(String),
}

impl SymbolFormat {
    /// Maps the names used by common decoders (`EAN_13`, `EAN13`, `QRCODE`, ...).
    pub fn from_name(name: &str) -> Self {
        let key: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_uppercase();
        match key.as_str() {
            "EAN13" => SymbolFormat::Ean13,
            "EAN8" => SymbolFormat::Ean8,
            "UPCA" => SymbolFormat::UpcA,
            "UPCE" => SymbolFormat::UpcE,
            "CODE128" => SymbolFormat::Code128,
            "CODE39" => SymbolFormat::Code39,
            "QRCODE" | "QR" => SymbolFormat::QrCode,
            _ => SymbolFormat::Other(name.to_string()),
        }
    }
}

/// One successful decode. Produced once per loop run and handed straight to
/// the decode callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSymbolResult {
    pub text: String,
    pub format: SymbolFormat,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    #[error("camera access denied")]
    PermissionDenied,
    #[error("no camera device available")]
    Unavailable,
    #[error("camera stream ended")]
    StreamEnded,
    #[error("camera error: {0}")]
    Other(String),
}

/// A camera or video source. The capture loop owns it exclusively.
#[async_trait]
pub trait FrameSource: Send {
    type Frame: Send + Sync;

    async fn acquire(&mut self) -> Result<(), DeviceError>;

    /// Resolves when the next frame is available; this is the loop's cadence.
    async fn next_frame(&mut self) -> Result<Self::Frame, DeviceError>;

    /// Gives the device back. Called at most once per `acquire`, including
    /// after an `acquire` that failed half-way.
    fn release(&mut self);
}

/// Decode primitive. "Nothing in this frame" is `None`, never an error.
#[async_trait]
pub trait SymbolDecoder<F: Send + Sync>: Send {
    async fn decode(&mut self, frame: &F) -> Option<RawSymbolResult>;
}
