use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::source::{DeviceError, FrameSource, RawSymbolResult, SymbolDecoder};
use super::CaptureError;

pub type DecodeCallback = Box<dyn FnMut(RawSymbolResult) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Armed,
    Sampling,
    Decoded,
    Released,
    Error,
}

/// Result of a single frame attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// No symbol in the frame; still sampling.
    Miss,
    /// The callback fired and the device was released.
    Decoded,
    /// A stop was observed and the device was released.
    Cancelled,
    /// Not sampling, nothing attempted.
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    Decoded,
    Cancelled,
}

/// Requests a stop from outside the task driving the loop. The loop notices
/// at its next suspension point.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Frame-driven scan loop: `Idle → Armed → Sampling → Decoded → Released`.
///
/// The device is released exactly once per acquisition on every exit path:
/// decode, stop, device error, or drop.
pub struct CaptureLoop<S, D>
where
    S: FrameSource,
    D: SymbolDecoder<S::Frame>,
{
    source: S,
    decoder: D,
    on_decode: DecodeCallback,
    state: CaptureState,
    holding_device: bool,
    failed: bool,
    attempts: u64,
    stop_tx: Arc<watch::Sender<bool>>,
    stop_rx: watch::Receiver<bool>,
}

impl<S, D> CaptureLoop<S, D>
where
    S: FrameSource,
    D: SymbolDecoder<S::Frame>,
{
    pub fn new<F>(source: S, decoder: D, on_decode: F) -> Self
    where
        F: FnMut(RawSymbolResult) + Send + 'static,
    {
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            source,
            decoder,
            on_decode: Box::new(on_decode),
            state: CaptureState::Idle,
            holding_device: false,
            failed: false,
            attempts: 0,
            stop_tx: Arc::new(stop_tx),
            stop_rx,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Decode attempts made since the last `start`.
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            tx: self.stop_tx.clone(),
        }
    }

    /// Acquires the device and begins sampling. No-op while already armed or
    /// sampling; from `Released` it returns to `Idle`, clears earlier stop
    /// requests and re-arms. A loop that hit a device error never restarts.
    pub async fn start(&mut self) -> Result<(), CaptureError> {
        if self.failed {
            return Err(CaptureError::Terminated);
        }
        match self.state {
            CaptureState::Armed | CaptureState::Sampling | CaptureState::Decoded => return Ok(()),
            CaptureState::Error => return Err(CaptureError::Terminated),
            CaptureState::Released => {
                self.stop_tx.send_replace(false);
                self.state = CaptureState::Idle;
            }
            CaptureState::Idle => {}
        }

        if self.stop_requested() {
            self.finish();
            return Ok(());
        }

        self.state = CaptureState::Armed;
        self.holding_device = true;
        self.attempts = 0;
        debug!("acquiring capture device");

        let acquired = tokio::select! {
            biased;
            _ = self.stop_rx.wait_for(|stop| *stop) => None,
            res = self.source.acquire() => Some(res),
        };

        match acquired {
            None => {
                debug!("stop requested while acquiring device");
                self.finish();
                Ok(())
            }
            Some(Ok(())) => {
                self.state = CaptureState::Sampling;
                Ok(())
            }
            Some(Err(e)) => Err(self.fail(e)),
        }
    }

    /// Waits for one frame and tries to decode it.
    pub async fn tick(&mut self) -> Result<Tick, CaptureError> {
        match self.state {
            CaptureState::Sampling => {}
            CaptureState::Error => return Err(CaptureError::Terminated),
            _ => return Ok(Tick::Inactive),
        }

        if self.stop_requested() {
            self.finish();
            return Ok(Tick::Cancelled);
        }

        let frame = tokio::select! {
            biased;
            _ = self.stop_rx.wait_for(|stop| *stop) => None,
            frame = self.source.next_frame() => Some(frame),
        };
        let frame = match frame {
            None => {
                self.finish();
                return Ok(Tick::Cancelled);
            }
            Some(Err(e)) => return Err(self.fail(e)),
            Some(Ok(frame)) => frame,
        };

        self.attempts += 1;
        let decoded = tokio::select! {
            biased;
            _ = self.stop_rx.wait_for(|stop| *stop) => None,
            found = self.decoder.decode(&frame) => Some(found),
        };
        let symbol = match decoded {
            None => {
                self.finish();
                return Ok(Tick::Cancelled);
            }
            Some(None) => return Ok(Tick::Miss),
            Some(Some(symbol)) => symbol,
        };

        // a stop that landed while the decode was in flight wins
        if self.stop_requested() {
            debug!(attempts = self.attempts, "discarding decode that raced a stop");
            self.finish();
            return Ok(Tick::Cancelled);
        }

        self.state = CaptureState::Decoded;
        info!(format = ?symbol.format, attempts = self.attempts, "symbol decoded");
        (self.on_decode)(symbol);
        self.finish();
        Ok(Tick::Decoded)
    }

    /// Drives `start` and `tick` until a decode, a stop, or a device error.
    pub async fn run(&mut self) -> Result<CaptureOutcome, CaptureError> {
        self.start().await?;
        loop {
            match self.tick().await? {
                Tick::Miss => tokio::task::yield_now().await,
                Tick::Decoded => return Ok(CaptureOutcome::Decoded),
                Tick::Cancelled | Tick::Inactive => return Ok(CaptureOutcome::Cancelled),
            }
        }
    }

    /// Ends the loop from any state, `Error` included, in `Released`. Safe to
    /// call repeatedly; the device is released at most once.
    pub fn stop(&mut self) {
        self.stop_tx.send_replace(true);
        self.finish();
    }

    fn stop_requested(&self) -> bool {
        *self.stop_rx.borrow()
    }

    fn finish(&mut self) {
        self.release_device();
        self.state = CaptureState::Released;
    }

    fn fail(&mut self, err: DeviceError) -> CaptureError {
        warn!(error = %err, "capture device error");
        self.release_device();
        self.failed = true;
        self.state = CaptureState::Error;
        CaptureError::Device(err)
    }

    fn release_device(&mut self) {
        if self.holding_device {
            self.holding_device = false;
            self.source.release();
            debug!("capture device released");
        }
    }
}

impl<S, D> Drop for CaptureLoop<S, D>
where
    S: FrameSource,
    D: SymbolDecoder<S::Frame>,
{
    fn drop(&mut self) {
        self.release_device();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted sources and decoders shared by the capture and scan tests.

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use crate::capture::{DeviceError, FrameSource, RawSymbolResult, SymbolDecoder, SymbolFormat};

    #[derive(Debug, Default)]
    pub struct Counters {
        pub acquires: AtomicUsize,
        pub releases: AtomicUsize,
        pub decodes: AtomicUsize,
    }

    impl Counters {
        pub fn acquires(&self) -> usize {
            self.acquires.load(Ordering::SeqCst)
        }
        pub fn releases(&self) -> usize {
            self.releases.load(Ordering::SeqCst)
        }
        pub fn decodes(&self) -> usize {
            self.decodes.load(Ordering::SeqCst)
        }
    }

    /// Emits frames numbered 1, 2, 3, ...
    pub struct ScriptedSource {
        pub counters: Arc<Counters>,
        pub deny: Option<DeviceError>,
        pub frames_before_failure: Option<u32>,
        next: u32,
    }

    impl ScriptedSource {
        pub fn new(counters: Arc<Counters>) -> Self {
            Self {
                counters,
                deny: None,
                frames_before_failure: None,
                next: 0,
            }
        }
    }

    #[async_trait]
    impl FrameSource for ScriptedSource {
        type Frame = u32;

        async fn acquire(&mut self) -> Result<(), DeviceError> {
            self.counters.acquires.fetch_add(1, Ordering::SeqCst);
            match &self.deny {
                Some(e) => Err(e.clone()),
                None => Ok(()),
            }
        }

        async fn next_frame(&mut self) -> Result<u32, DeviceError> {
            if self.frames_before_failure.is_some_and(|n| self.next >= n) {
                return Err(DeviceError::StreamEnded);
            }
            self.next += 1;
            Ok(self.next)
        }

        fn release(&mut self) {
            self.counters.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Finds `text` in frame number `hit_on`; `None` never finds anything.
    pub struct FrameNumberDecoder {
        pub counters: Arc<Counters>,
        pub hit_on: Option<u32>,
        pub text: String,
    }

    #[async_trait]
    impl SymbolDecoder<u32> for FrameNumberDecoder {
        async fn decode(&mut self, frame: &u32) -> Option<RawSymbolResult> {
            self.counters.decodes.fetch_add(1, Ordering::SeqCst);
            (self.hit_on == Some(*frame)).then(|| RawSymbolResult {
                text: self.text.clone(),
                format: SymbolFormat::Ean13,
            })
        }
    }
}

#[cfg(test)]
mod capture_tests {
    use std::sync::atomic::Ordering;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::testing::{Counters, FrameNumberDecoder, ScriptedSource};
    use super::*;
    use crate::capture::SymbolFormat;

    type Seen = Arc<Mutex<Vec<RawSymbolResult>>>;

    fn recorder() -> (Seen, impl FnMut(RawSymbolResult) + Send + 'static) {
        let seen: Seen = Arc::default();
        let sink = seen.clone();
        (seen, move |r| sink.lock().unwrap().push(r))
    }

    fn scripted(hit_on: Option<u32>) -> (Arc<Counters>, ScriptedSource, FrameNumberDecoder) {
        let counters = Arc::new(Counters::default());
        let source = ScriptedSource::new(counters.clone());
        let decoder = FrameNumberDecoder {
            counters: counters.clone(),
            hit_on,
            text: "3017620422003".into(),
        };
        (counters, source, decoder)
    }

    #[tokio::test]
    async fn stop_while_missing_releases_exactly_once() {
        let (counters, source, decoder) = scripted(None);
        let (seen, cb) = recorder();
        let mut capture = CaptureLoop::new(source, decoder, cb);

        capture.start().await.unwrap();
        assert_eq!(capture.state(), CaptureState::Sampling);
        for _ in 0..5 {
            assert_eq!(capture.tick().await.unwrap(), Tick::Miss);
        }

        capture.stop();
        assert_eq!(capture.state(), CaptureState::Released);
        capture.stop();
        assert_eq!(capture.state(), CaptureState::Released);
        assert_eq!(capture.tick().await.unwrap(), Tick::Inactive);
        drop(capture);

        assert_eq!(counters.acquires(), 1);
        assert_eq!(counters.releases(), 1);
        assert_eq!(counters.decodes(), 5);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn stop_from_idle_goes_straight_to_released() {
        let (counters, source, decoder) = scripted(None);
        let (_seen, cb) = recorder();
        let mut capture = CaptureLoop::new(source, decoder, cb);

        capture.stop();
        assert_eq!(capture.state(), CaptureState::Released);
        assert_eq!(counters.acquires(), 0);
        assert_eq!(counters.releases(), 0);
    }

    #[tokio::test]
    async fn third_frame_hit_fires_callback_once() {
        let (counters, source, decoder) = scripted(Some(3));
        let (seen, cb) = recorder();
        let mut capture = CaptureLoop::new(source, decoder, cb);

        let outcome = capture.run().await.unwrap();
        assert_eq!(outcome, CaptureOutcome::Decoded);
        assert_eq!(capture.state(), CaptureState::Released);
        assert_eq!(capture.attempts(), 3);

        // nothing else gets scheduled afterwards
        assert_eq!(capture.tick().await.unwrap(), Tick::Inactive);
        assert_eq!(capture.tick().await.unwrap(), Tick::Inactive);
        capture.stop();
        drop(capture);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].text, "3017620422003");
        assert_eq!(seen[0].format, SymbolFormat::Ean13);
        assert_eq!(counters.decodes(), 3);
        assert_eq!(counters.releases(), 1);
    }

    #[tokio::test]
    async fn start_is_idempotent() {
        let (counters, source, decoder) = scripted(None);
        let (_seen, cb) = recorder();
        let mut capture = CaptureLoop::new(source, decoder, cb);

        capture.start().await.unwrap();
        capture.start().await.unwrap();
        assert_eq!(capture.state(), CaptureState::Sampling);
        assert_eq!(counters.acquires(), 1);
    }

    #[tokio::test]
    async fn released_loop_can_be_restarted() {
        let (counters, source, decoder) = scripted(Some(1));
        let (seen, cb) = recorder();
        let mut capture = CaptureLoop::new(source, decoder, cb);

        assert_eq!(capture.run().await.unwrap(), CaptureOutcome::Decoded);
        capture.stop();
        capture.start().await.unwrap();
        assert_eq!(capture.state(), CaptureState::Sampling);
        capture.stop();

        assert_eq!(counters.acquires(), 2);
        assert_eq!(counters.releases(), 2);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stop_before_run_skips_acquisition() {
        let (counters, source, decoder) = scripted(Some(1));
        let (seen, cb) = recorder();
        let mut capture = CaptureLoop::new(source, decoder, cb);

        capture.stop_handle().stop();
        assert_eq!(capture.run().await.unwrap(), CaptureOutcome::Cancelled);
        assert_eq!(capture.state(), CaptureState::Released);
        assert_eq!(counters.acquires(), 0);
        assert_eq!(counters.releases(), 0);
        assert!(seen.lock().unwrap().is_empty());
    }

    /// Succeeds, but only after asking the loop to stop: the stop arrives
    /// while the decode is in flight.
    struct StopsMidDecode {
        handle: Option<StopHandle>,
    }

    #[async_trait]
    impl SymbolDecoder<u32> for StopsMidDecode {
        async fn decode(&mut self, _frame: &u32) -> Option<RawSymbolResult> {
            if let Some(h) = &self.handle {
                h.stop();
            }
            Some(RawSymbolResult {
                text: "late".into(),
                format: SymbolFormat::QrCode,
            })
        }
    }

    #[tokio::test]
    async fn stop_racing_a_successful_decode_wins() {
        let counters = Arc::new(Counters::default());
        let source = ScriptedSource::new(counters.clone());
        let (seen, cb) = recorder();
        let mut capture = CaptureLoop::new(source, StopsMidDecode { handle: None }, cb);
        capture.decoder.handle = Some(capture.stop_handle());

        assert_eq!(capture.run().await.unwrap(), CaptureOutcome::Cancelled);
        assert_eq!(capture.state(), CaptureState::Released);
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(counters.releases(), 1);
    }

    /// Never finishes decoding.
    struct Hangs(Arc<Counters>);

    #[async_trait]
    impl SymbolDecoder<u32> for Hangs {
        async fn decode(&mut self, _frame: &u32) -> Option<RawSymbolResult> {
            self.0.decodes.fetch_add(1, Ordering::SeqCst);
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn stop_from_another_task_interrupts_a_pending_decode() {
        let counters = Arc::new(Counters::default());
        let source = ScriptedSource::new(counters.clone());
        let (seen, cb) = recorder();
        let mut capture = CaptureLoop::new(source, Hangs(counters.clone()), cb);
        let handle = capture.stop_handle();

        let task = tokio::spawn(async move {
            let outcome = capture.run().await;
            (outcome, capture.state())
        });
        while counters.decodes() == 0 {
            tokio::task::yield_now().await;
        }
        handle.stop();
        assert!(handle.is_stopped());

        let (outcome, state) = task.await.unwrap();
        assert_eq!(outcome.unwrap(), CaptureOutcome::Cancelled);
        assert_eq!(state, CaptureState::Released);
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(counters.releases(), 1);
    }

    #[tokio::test]
    async fn denied_device_is_terminal_and_released() {
        let (counters, mut source, decoder) = scripted(Some(1));
        source.deny = Some(DeviceError::PermissionDenied);
        let (seen, cb) = recorder();
        let mut capture = CaptureLoop::new(source, decoder, cb);

        let err = capture.run().await.unwrap_err();
        assert!(matches!(err, CaptureError::Device(DeviceError::PermissionDenied)));
        assert_eq!(capture.state(), CaptureState::Error);
        assert!(matches!(capture.start().await, Err(CaptureError::Terminated)));
        assert!(matches!(capture.tick().await, Err(CaptureError::Terminated)));

        capture.stop();
        assert_eq!(capture.state(), CaptureState::Released);
        assert!(matches!(capture.start().await, Err(CaptureError::Terminated)));
        assert_eq!(capture.state(), CaptureState::Released);
        assert!(matches!(capture.tick().await, Ok(Tick::Inactive)));
        capture.stop();
        drop(capture);
        assert_eq!(counters.releases(), 1);
        assert_eq!(counters.decodes(), 0);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn stream_failure_mid_sampling_releases_once() {
        let (counters, mut source, decoder) = scripted(None);
        source.frames_before_failure = Some(2);
        let (_seen, cb) = recorder();
        let mut capture = CaptureLoop::new(source, decoder, cb);

        let err = capture.run().await.unwrap_err();
        assert!(matches!(err, CaptureError::Device(DeviceError::StreamEnded)));
        assert_eq!(capture.attempts(), 2);
        drop(capture);
        assert_eq!(counters.releases(), 1);
    }
}
