//! Fix Polling Service

use nmea_protocol::{GpsClient, GpsFix, Sentence};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Monitor configuration
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// A fix older than this is reported as absent
    pub stale_after: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            stale_after: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
struct FixUpdate {
    fix: GpsFix,
    received: Instant,
}

/// Cloneable read handle onto the monitor's published fix
#[derive(Debug, Clone)]
pub struct FixReader {
    rx: watch::Receiver<Option<FixUpdate>>,
    stale_after: Duration,
}

impl FixReader {
    /// Latest fix, or `None` if there is no fix or it has gone stale
    pub fn current_fix(&self) -> Option<GpsFix> {
        let update = self.rx.borrow();
        update
            .as_ref()
            .and_then(|u| (u.received.elapsed() < self.stale_after).then(|| u.fix.clone()))
    }
}

/// Background GPS fix monitor.
///
/// Owns a reader task that folds incoming sentences into the current fix and
/// publishes it whenever the receiver reports a valid position.
pub struct GpsMonitor {
    fix_rx: watch::Receiver<Option<FixUpdate>>,
    shutdown: Arc<AtomicBool>,
    handle: JoinHandle<()>,
    port_name: String,
    config: MonitorConfig,
}

impl GpsMonitor {
    /// Spawn the monitor over an open client
    pub fn spawn(mut client: GpsClient, config: MonitorConfig) -> Self {
        let port_name = client.port_name().to_string();
        let (fix_tx, fix_rx) = watch::channel(None);
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_flag = shutdown.clone();

        info!("Starting GPS monitor on {}", port_name);

        let handle = tokio::spawn(async move {
            let mut merged = GpsFix::default();

            while !shutdown_flag.load(Ordering::SeqCst) {
                match client.next_sentence().await {
                    Ok(Some(sentence)) => {
                        if matches!(sentence, Sentence::Unsupported(_)) {
                            continue;
                        }
                        merged.update_from_sentence(&sentence);
                        if merged.has_fix && merged.has_position() {
                            let _ = fix_tx.send(Some(FixUpdate {
                                fix: merged.clone(),
                                received: Instant::now(),
                            }));
                        }
                    }
                    Ok(None) => {
                        warn!("GPS stream ended");
                        break;
                    }
                    Err(e) => {
                        // Corrupt sentences are routine on serial links
                        debug!("GPS sentence skipped: {}", e);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                }
            }
        });

        Self {
            fix_rx,
            shutdown,
            handle,
            port_name,
            config,
        }
    }

    /// Latest fix, or `None` if there is no fix or it has gone stale
    pub fn current_fix(&self) -> Option<GpsFix> {
        self.reader().current_fix()
    }

    /// Cloneable handle for readers that outlive borrows of the monitor
    pub fn reader(&self) -> FixReader {
        FixReader {
            rx: self.fix_rx.clone(),
            stale_after: self.config.stale_after,
        }
    }

    /// Age of the last published fix
    pub fn last_fix_age(&self) -> Option<Duration> {
        self.fix_rx.borrow().as_ref().map(|u| u.received.elapsed())
    }

    /// Wait until a fix is published or the timeout elapses
    pub async fn wait_for_fix(&mut self, timeout: Duration) -> Option<GpsFix> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(fix) = self.current_fix() {
                return Some(fix);
            }
            let remaining = deadline.checked_duration_since(Instant::now())?;
            if tokio::time::timeout(remaining, self.fix_rx.changed())
                .await
                .ok()?
                .is_err()
            {
                return None;
            }
        }
    }

    /// Name of the underlying serial port
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Whether the reader task is still running
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stop the reader task
    pub fn stop(&self) {
        info!("Stopping GPS monitor on {}", self.port_name);
        self.shutdown.store(true, Ordering::SeqCst);
        self.handle.abort();
    }
}

impl Drop for GpsMonitor {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.handle.abort();
    }
}

/// Probe outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    /// Receiver streaming with a valid fix
    Ok,
    /// Receiver streaming but no fix yet
    WaitingForFix,
    /// No NMEA data received
    NoData,
}

/// Result of a GPS connection probe
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub status: ProbeStatus,
    pub message: String,
    /// Sentences seen during the probe window
    pub sentences_seen: usize,
    /// Sample fix, if one was obtained
    pub fix: Option<GpsFix>,
}

/// Read from the client for up to `timeout` and report receiver health.
///
/// Mirrors the operator workflow: a freshly powered receiver streams
/// sentences immediately but may take minutes to acquire a fix, and the two
/// conditions need different guidance.
pub async fn probe(client: &mut GpsClient, timeout: Duration) -> ProbeReport {
    let deadline = Instant::now() + timeout;
    let mut merged = GpsFix::default();
    let mut sentences_seen = 0usize;

    while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
        let next = tokio::time::timeout(remaining, client.next_sentence()).await;
        match next {
            Ok(Ok(Some(sentence))) => {
                sentences_seen += 1;
                merged.update_from_sentence(&sentence);
                if merged.has_fix && merged.has_position() {
                    return ProbeReport {
                        status: ProbeStatus::Ok,
                        message: format!(
                            "GPS fix: {:.6}, {:.6} with {} satellites",
                            merged.latitude.unwrap_or(0.0),
                            merged.longitude.unwrap_or(0.0),
                            merged.satellites.map_or("?".to_string(), |s| s.to_string()),
                        ),
                        sentences_seen,
                        fix: Some(merged),
                    };
                }
            }
            Ok(Ok(None)) => break,
            Ok(Err(_)) => continue,
            Err(_) => break,
        }
    }

    if sentences_seen > 0 {
        ProbeReport {
            status: ProbeStatus::WaitingForFix,
            message: "GPS connected but waiting for fix".to_string(),
            sentences_seen,
            fix: None,
        }
    } else {
        ProbeReport {
            status: ProbeStatus::NoData,
            message: "No GPS data received".to_string(),
            sentences_seen,
            fix: None,
        }
    }
}
