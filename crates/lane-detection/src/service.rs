//! Lane Detection Service
//!
//! Runs the detector over the live primary-camera stream on its own
//! thread and publishes the latest state through a watch channel.

use crate::config::LaneConfig;
use crate::detector::LaneDetector;
use crate::state::LaneState;
use crate::LaneError;
use camera_pipeline::VideoFrame;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// Cadence of the detection loop when frames are flowing
const DETECT_INTERVAL: Duration = Duration::from_millis(33);

/// Back-off when the stream yields no frame
const IDLE_INTERVAL: Duration = Duration::from_millis(100);

/// Background lane detection over a frame source
pub struct LaneService {
    state_rx: watch::Receiver<Option<LaneState>>,
    shutdown: Arc<AtomicBool>,
    handle: std::thread::JoinHandle<()>,
}

impl LaneService {
    /// Spawn the detection loop over a frame source.
    ///
    /// The source is polled at the detection cadence; `None` frames are
    /// skipped, matching a stream that drops frames under load.
    pub fn spawn<F>(fetch_frame: F, config: LaneConfig) -> Result<Self, LaneError>
    where
        F: Fn() -> Option<VideoFrame> + Send + 'static,
    {
        let detector = LaneDetector::new(config)?;
        let (state_tx, state_rx) = watch::channel(None);
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_flag = shutdown.clone();

        info!("Lane detection started");
        let handle = std::thread::spawn(move || {
            while !shutdown_flag.load(Ordering::SeqCst) {
                let Some(frame) = fetch_frame() else {
                    std::thread::sleep(IDLE_INTERVAL);
                    continue;
                };

                match detector.detect(&frame) {
                    Ok(state) => {
                        let _ = state_tx.send(Some(state));
                    }
                    Err(e) => warn!("Lane detection error: {}", e),
                }
                std::thread::sleep(DETECT_INTERVAL);
            }
            info!("Lane detection stopped");
        });

        Ok(Self {
            state_rx,
            shutdown,
            handle,
        })
    }

    /// Latest detection state, if any frame has been processed
    pub fn latest(&self) -> Option<LaneState> {
        self.state_rx.borrow().clone()
    }

    /// Whether the detection thread is alive
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stop the detection loop
    pub fn stop(self) {
        self.shutdown.store(true, Ordering::SeqCst);
        let _ = self.handle.join();
    }
}
