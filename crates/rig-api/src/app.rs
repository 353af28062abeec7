//! Rig Service Orchestration
//!
//! Owns the device, pipeline, GPS monitor, lane service and capture
//! storage, and wires the background work that runs while connected:
//! ROI re-application, the recording pump, the status monitor and the
//! GPS distance-interval auto-capture loop.

use crate::config::AppConfig;
use camera_pipeline::{
    CameraCommand, CameraError, CameraSocket, DeviceInfo, RigDevice, RigPipeline, VideoFrame,
};
use capture_store::{CaptureStore, FileKind, ImageFormat, SessionRecorder, StoreError};
use gps_monitor::{probe, DistanceTrigger, GpsMonitor, MonitorConfig, ProbeReport, TrackLog};
use lane_detection::{LaneConfig, LaneError, LaneService, LaneState};
use nmea_protocol::{GpsClient, GpsFix, NmeaError};
use rig_control::{ControlError, ControlSink, RoiManager, RoiSettings, SettingsManager};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Cadence of the connected-state status monitor
const STATUS_INTERVAL: Duration = Duration::from_secs(1);

/// Track points are logged every this many status ticks
const TRACK_LOG_TICKS: u64 = 5;

/// Cadence of the GPS auto-capture check
const AUTO_CAPTURE_INTERVAL: Duration = Duration::from_millis(500);

/// Service errors surfaced to the API layer
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Rig is not connected")]
    NotConnected,

    #[error("{0}")]
    Unavailable(String),

    #[error(transparent)]
    Camera(#[from] CameraError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Control(#[from] ControlError),

    #[error(transparent)]
    Lane(#[from] LaneError),

    #[error(transparent)]
    Nmea(#[from] NmeaError),

    #[error(transparent)]
    Monitor(#[from] gps_monitor::MonitorError),
}

/// Sink used while no pipeline is up; commands are stored state only
struct NullSink;

impl ControlSink for NullSink {
    fn send_all(&self, _command: CameraCommand) {}

    fn send_to(&self, _socket: CameraSocket, _command: CameraCommand) -> Result<(), ControlError> {
        Ok(())
    }
}

/// Connection outcome
#[derive(Debug, Serialize)]
pub struct ConnectReport {
    pub message: String,
    pub cameras: Vec<CameraSocket>,
    pub device: Option<DeviceInfo>,
    pub gps: String,
}

/// Capture outcome
#[derive(Debug, Serialize)]
pub struct CaptureReport {
    pub saved: Vec<PathBuf>,
    pub gps_tagged: bool,
}

/// Full rig status snapshot
#[derive(Debug, Serialize)]
pub struct RigStatus {
    pub connected: bool,
    pub streaming: bool,
    pub device: Option<DeviceInfo>,
    pub cameras: Vec<CameraSocket>,
    pub recording: bool,
    pub recording_seconds: Option<f64>,
    pub gps_port: Option<String>,
    pub gps_fix: Option<GpsFix>,
    pub lane: Option<LaneState>,
    pub disk_free_gb: f64,
    pub disk_total_gb: f64,
    pub capture_dir: PathBuf,
}

/// Settings view returned by the API
#[derive(Debug, Serialize)]
pub struct SettingsView {
    pub settings: rig_control::RigSettings,
    pub auto_modes: rig_control::AutoModes,
}

/// Partial settings update; absent fields are untouched
#[derive(Debug, Default, Deserialize)]
pub struct SettingsUpdate {
    pub exposure_us: Option<u32>,
    pub iso: Option<u32>,
    pub focus: Option<u8>,
    pub brightness: Option<i8>,
    pub contrast: Option<i8>,
    pub saturation: Option<i8>,
    pub sharpness: Option<u8>,
    pub white_balance_k: Option<u32>,
    pub luma_denoise: Option<u8>,
    pub chroma_denoise: Option<u8>,
    pub auto_exposure: Option<bool>,
    pub auto_focus: Option<bool>,
    pub auto_white_balance: Option<bool>,
    pub auto_exposure_lock: Option<bool>,
    pub auto_white_balance_lock: Option<bool>,
    pub anti_banding_index: Option<usize>,
    pub effect_index: Option<usize>,
    pub trigger_autofocus: Option<bool>,
    pub stream_width: Option<u32>,
    pub stream_height: Option<u32>,
    pub stream_fps: Option<u32>,
    pub gps_interval_m: Option<f64>,
}

/// Partial ROI update for one socket
#[derive(Debug, Deserialize)]
pub struct RoiUpdate {
    pub socket: CameraSocket,
    pub enabled: Option<bool>,
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub exposure_compensation: Option<i8>,
    pub focus_region: Option<bool>,
}

/// The rig orchestrator
pub struct RigService {
    config: AppConfig,
    device: RigDevice,
    pipeline: Option<Arc<Mutex<RigPipeline>>>,
    settings: Arc<Mutex<SettingsManager>>,
    roi: Arc<Mutex<RoiManager>>,
    store: Arc<Mutex<CaptureStore>>,
    recorder: Arc<Mutex<SessionRecorder>>,
    track_log: Arc<Mutex<TrackLog>>,
    gps: Option<GpsMonitor>,
    lane: Option<LaneService>,
    shutdown: Arc<AtomicBool>,
    threads: Vec<std::thread::JoinHandle<()>>,
    tasks: Vec<tokio::task::JoinHandle<()>>,
    connected: bool,
}

impl RigService {
    /// Create the service; the capture directory is created eagerly
    pub fn new(config: AppConfig) -> Result<Self, ApiError> {
        let store = CaptureStore::new(&config.capture_dir)?;
        let recorder = SessionRecorder::new(&config.capture_dir);
        let track_log = TrackLog::new(config.capture_dir.join("gps_data"))?;

        let mut settings = SettingsManager::new();
        settings.set_stream(config.stream_width, config.stream_height, config.stream_fps);
        settings.set_gps_interval(config.gps_interval_m);

        let device = Self::make_device(&config);

        Ok(Self {
            config,
            device,
            pipeline: None,
            settings: Arc::new(Mutex::new(settings)),
            roi: Arc::new(Mutex::new(RoiManager::new())),
            store: Arc::new(Mutex::new(store)),
            recorder: Arc::new(Mutex::new(recorder)),
            track_log: Arc::new(Mutex::new(track_log)),
            gps: None,
            lane: None,
            shutdown: Arc::new(AtomicBool::new(false)),
            threads: Vec::new(),
            tasks: Vec::new(),
            connected: false,
        })
    }

    fn make_device(config: &AppConfig) -> RigDevice {
        if config.mock_camera {
            info!("Using mock camera link");
            return RigDevice::mock();
        }
        #[cfg(feature = "poe-device")]
        {
            RigDevice::new(Box::new(camera_pipeline::ffi::PoeLink::new()))
        }
        #[cfg(not(feature = "poe-device"))]
        {
            warn!("Built without the poe-device feature; using the mock link");
            RigDevice::mock()
        }
    }

    /// Whether the rig is connected
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Connect the device, start streaming and spawn the background work.
    ///
    /// GPS is best-effort: a missing receiver downgrades to a log line and
    /// captures simply go untagged.
    pub fn connect(&mut self) -> Result<ConnectReport, ApiError> {
        if self.connected {
            return Ok(ConnectReport {
                message: "Already connected".to_string(),
                cameras: self.device.sockets().to_vec(),
                device: self.device.device_info(),
                gps: self.gps_status_line(),
            });
        }

        let sockets = self.device.connect()?;

        // GPS comes up in parallel with the pipeline; a rig without a
        // receiver still captures.
        match self.open_gps_client() {
            Ok(client) => {
                self.gps = Some(GpsMonitor::spawn(client, MonitorConfig::default()));
            }
            Err(e) => warn!("GPS not available: {}", e),
        }

        let stream_config = {
            let settings = self.settings.lock().expect("settings lock");
            camera_pipeline::StreamConfig {
                width: settings.settings().resolution_width,
                height: settings.settings().resolution_height,
                fps: settings.settings().fps,
            }
        };

        let mut pipeline = RigPipeline::build(&self.device, stream_config)?;
        pipeline.start_streaming()?;
        let pipeline = Arc::new(Mutex::new(pipeline));
        self.pipeline = Some(pipeline.clone());

        // Replay the stored settings onto the freshly started cameras
        self.settings
            .lock()
            .expect("settings lock")
            .apply_all(pipeline.as_ref());

        self.roi.lock().expect("roi lock").initialize_for(&sockets);

        self.shutdown = Arc::new(AtomicBool::new(false));
        self.spawn_roi_reapply(&sockets, &pipeline);
        self.spawn_recording_pump(&sockets, &pipeline, stream_config.fps);
        self.spawn_status_monitor();
        self.spawn_auto_capture(&pipeline);

        let fetch_pipeline = pipeline.clone();
        self.lane = Some(LaneService::spawn(
            move || {
                fetch_pipeline
                    .lock()
                    .expect("pipeline lock")
                    .get_frame(CameraSocket::CamA)
            },
            LaneConfig::default(),
        )?);

        self.connected = true;
        let names: Vec<&str> = sockets.iter().map(|s| s.as_str()).collect();
        Ok(ConnectReport {
            message: format!(
                "Connected to OAK device with {} cameras: {}",
                sockets.len(),
                names.join(", ")
            ),
            cameras: sockets,
            device: self.device.device_info(),
            gps: self.gps_status_line(),
        })
    }

    fn open_gps_client(&self) -> Result<GpsClient, NmeaError> {
        if self.config.mock_gps {
            return Ok(GpsClient::mock());
        }
        match &self.config.gps_port {
            Some(port) => GpsClient::open(port, self.config.gps_baud),
            None => GpsClient::autodetect(self.config.gps_baud),
        }
    }

    fn gps_status_line(&self) -> String {
        match &self.gps {
            Some(monitor) => format!("GPS monitoring on {}", monitor.port_name()),
            None => "GPS not found".to_string(),
        }
    }

    /// Stop recording, background work, streaming and the device session
    pub fn disconnect(&mut self) {
        if !self.connected {
            return;
        }
        info!("Disconnecting rig");

        if self.recorder.lock().expect("recorder lock").is_recording() {
            if let Err(e) = self.recorder.lock().expect("recorder lock").stop() {
                warn!("Error stopping recording on disconnect: {}", e);
            }
        }

        self.shutdown.store(true, Ordering::SeqCst);
        for handle in self.threads.drain(..) {
            let _ = handle.join();
        }
        for task in self.tasks.drain(..) {
            task.abort();
        }

        if let Some(lane) = self.lane.take() {
            lane.stop();
        }
        if let Some(gps) = self.gps.take() {
            gps.stop();
        }
        if let Some(pipeline) = self.pipeline.take() {
            pipeline.lock().expect("pipeline lock").stop_streaming();
        }
        self.device.disconnect();
        self.connected = false;
    }

    /// Capture one frame from every camera, GPS-tagged when a fix exists
    pub fn capture_all(&self) -> Result<CaptureReport, ApiError> {
        let pipeline = self.pipeline.as_ref().ok_or(ApiError::NotConnected)?;
        let fix = self.gps.as_ref().and_then(|m| m.current_fix());
        let (saved, gps_tagged) =
            capture_and_tag(pipeline, &self.store, fix.as_ref())?;
        info!("Captured {} images (gps_tagged: {})", saved.len(), gps_tagged);
        Ok(CaptureReport { saved, gps_tagged })
    }

    /// Start a recording session for every streaming camera
    pub fn start_recording(&self) -> Result<(), ApiError> {
        let pipeline = self.pipeline.as_ref().ok_or(ApiError::NotConnected)?;
        let pipeline = pipeline.lock().expect("pipeline lock");

        let fps = self.settings.lock().expect("settings lock").settings().fps;
        let cameras: Vec<(CameraSocket, u32, u32)> = pipeline
            .sockets()
            .iter()
            .filter_map(|&socket| {
                pipeline
                    .config(socket)
                    .map(|c| (socket, c.width, c.height))
            })
            .collect();
        drop(pipeline);

        self.recorder
            .lock()
            .expect("recorder lock")
            .start(&cameras, fps)?;
        Ok(())
    }

    /// Stop the running recording; returns the session directories
    pub fn stop_recording(&self) -> Result<Vec<PathBuf>, ApiError> {
        Ok(self.recorder.lock().expect("recorder lock").stop()?)
    }

    /// Full status snapshot
    pub fn status(&self) -> RigStatus {
        let (disk_free_gb, disk_total_gb) = self
            .store
            .lock()
            .expect("store lock")
            .available_space()
            .unwrap_or((0.0, 0.0));
        let recorder = self.recorder.lock().expect("recorder lock");

        RigStatus {
            connected: self.connected,
            streaming: self
                .pipeline
                .as_ref()
                .map(|p| p.lock().expect("pipeline lock").is_running())
                .unwrap_or(false),
            device: self.device.device_info(),
            cameras: self.device.sockets().to_vec(),
            recording: recorder.is_recording(),
            recording_seconds: recorder.duration().map(|d| d.as_secs_f64()),
            gps_port: self.gps.as_ref().map(|m| m.port_name().to_string()),
            gps_fix: self.gps.as_ref().and_then(|m| m.current_fix()),
            lane: self.lane.as_ref().and_then(|l| l.latest()),
            disk_free_gb,
            disk_total_gb,
            capture_dir: self.store.lock().expect("store lock").root().to_path_buf(),
        }
    }

    /// Current settings and auto modes
    pub fn settings_view(&self) -> SettingsView {
        let settings = self.settings.lock().expect("settings lock");
        SettingsView {
            settings: settings.settings().clone(),
            auto_modes: *settings.auto_modes(),
        }
    }

    /// Apply a partial settings update
    pub fn apply_settings(&self, update: SettingsUpdate) -> SettingsView {
        let mut settings = self.settings.lock().expect("settings lock");
        let sink: &dyn ControlSink = match &self.pipeline {
            Some(p) => p.as_ref(),
            None => &NullSink,
        };

        if let Some(v) = update.auto_exposure {
            settings.set_auto_exposure(v, sink);
        }
        if let Some(v) = update.auto_focus {
            settings.set_auto_focus(v, sink);
        }
        if let Some(v) = update.auto_white_balance {
            settings.set_auto_white_balance(v, sink);
        }
        if let Some(v) = update.exposure_us {
            settings.set_exposure(v, sink);
        }
        if let Some(v) = update.iso {
            settings.set_iso(v, sink);
        }
        if let Some(v) = update.focus {
            settings.set_focus(v, sink);
        }
        if let Some(v) = update.brightness {
            settings.set_brightness(v, sink);
        }
        if let Some(v) = update.contrast {
            settings.set_contrast(v, sink);
        }
        if let Some(v) = update.saturation {
            settings.set_saturation(v, sink);
        }
        if let Some(v) = update.sharpness {
            settings.set_sharpness(v, sink);
        }
        if let Some(v) = update.white_balance_k {
            settings.set_white_balance(v, sink);
        }
        if let Some(v) = update.luma_denoise {
            settings.set_luma_denoise(v, sink);
        }
        if let Some(v) = update.chroma_denoise {
            settings.set_chroma_denoise(v, sink);
        }
        if let Some(v) = update.auto_exposure_lock {
            settings.set_auto_exposure_lock(v, sink);
        }
        if let Some(v) = update.auto_white_balance_lock {
            settings.set_auto_white_balance_lock(v, sink);
        }
        if let Some(v) = update.anti_banding_index {
            settings.set_anti_banding_mode(v, sink);
        }
        if let Some(v) = update.effect_index {
            settings.set_effect_mode(v, sink);
        }
        if update.trigger_autofocus.unwrap_or(false) {
            settings.trigger_autofocus(sink);
        }

        if update.stream_width.is_some()
            || update.stream_height.is_some()
            || update.stream_fps.is_some()
        {
            let current = settings.settings().clone();
            settings.set_stream(
                update.stream_width.unwrap_or(current.resolution_width),
                update.stream_height.unwrap_or(current.resolution_height),
                update.stream_fps.unwrap_or(current.fps),
            );
        }
        if let Some(v) = update.gps_interval_m {
            settings.set_gps_interval(v);
        }

        SettingsView {
            settings: settings.settings().clone(),
            auto_modes: *settings.auto_modes(),
        }
    }

    /// Reset camera settings to defaults and re-apply them
    pub fn reset_settings(&self) -> SettingsView {
        let mut settings = self.settings.lock().expect("settings lock");
        let sink: &dyn ControlSink = match &self.pipeline {
            Some(p) => p.as_ref(),
            None => &NullSink,
        };
        settings.reset_to_defaults(sink);
        SettingsView {
            settings: settings.settings().clone(),
            auto_modes: *settings.auto_modes(),
        }
    }

    /// ROI settings for every managed socket
    pub fn roi_view(&self) -> HashMap<String, RoiSettings> {
        let roi = self.roi.lock().expect("roi lock");
        roi.sockets()
            .into_iter()
            .filter_map(|socket| roi.get(socket).map(|s| (socket.to_string(), s)))
            .collect()
    }

    /// Apply a partial ROI update
    pub fn apply_roi(&self, update: RoiUpdate) -> Result<HashMap<String, RoiSettings>, ApiError> {
        let mut roi = self.roi.lock().expect("roi lock");
        let current = roi.get(update.socket).ok_or_else(|| {
            ApiError::Unavailable(format!("No ROI managed for {}", update.socket))
        })?;

        if update.x.is_some() || update.y.is_some() {
            roi.set_position(
                update.socket,
                update.x.unwrap_or(current.x),
                update.y.unwrap_or(current.y),
            );
        }
        if update.width.is_some() || update.height.is_some() {
            roi.set_size(
                update.socket,
                update.width.unwrap_or(current.width),
                update.height.unwrap_or(current.height),
            );
        }
        if let Some(v) = update.exposure_compensation {
            roi.set_exposure_compensation(update.socket, v);
        }
        if let Some(v) = update.focus_region {
            roi.set_focus_region(update.socket, v);
        }
        if let Some(v) = update.enabled {
            roi.enable(update.socket, v);
        }
        drop(roi);
        Ok(self.roi_view())
    }

    /// Reset every managed ROI
    pub fn reset_roi(&self) -> HashMap<String, RoiSettings> {
        self.roi.lock().expect("roi lock").reset_all();
        self.roi_view()
    }

    /// Current GPS fix, if fresh
    pub fn gps_fix(&self) -> Option<GpsFix> {
        self.gps.as_ref().and_then(|m| m.current_fix())
    }

    /// Write the current fix to a standalone timestamped JSON
    pub fn gps_capture(&self) -> Result<PathBuf, ApiError> {
        let fix = self
            .gps_fix()
            .ok_or_else(|| ApiError::Unavailable("No GPS fix yet".to_string()))?;
        Ok(self.store.lock().expect("store lock").save_gps_capture(&fix)?)
    }

    /// Probe the receiver for up to five seconds.
    ///
    /// Opens its own client, so it is meant for pre-connect diagnostics.
    pub async fn gps_probe(&self) -> Result<ProbeReport, ApiError> {
        let mut client = self.open_gps_client()?;
        Ok(probe(&mut client, Duration::from_secs(5)).await)
    }

    /// Change the capture directory (rejected while recording)
    pub fn set_capture_dir(&self, dir: PathBuf) -> Result<(), ApiError> {
        self.recorder
            .lock()
            .expect("recorder lock")
            .set_root(&dir)?;
        self.store.lock().expect("store lock").set_root(&dir)?;
        *self.track_log.lock().expect("track log lock") = TrackLog::new(dir.join("gps_data"))?;
        Ok(())
    }

    /// Captured files, newest first
    pub fn list_captures(&self, kind: FileKind) -> Vec<PathBuf> {
        self.store.lock().expect("store lock").list_captures(kind)
    }

    fn spawn_roi_reapply(&mut self, sockets: &[CameraSocket], pipeline: &Arc<Mutex<RigPipeline>>) {
        let dimensions: HashMap<CameraSocket, (u32, u32)> = {
            let pipeline = pipeline.lock().expect("pipeline lock");
            sockets
                .iter()
                .filter_map(|&s| pipeline.config(s).map(|c| (s, (c.width, c.height))))
                .collect()
        };
        let sink: Arc<dyn ControlSink> = pipeline.clone();
        self.threads.push(rig_control::roi::spawn_reapply(
            self.roi.clone(),
            sink,
            dimensions,
            self.shutdown.clone(),
        ));
    }

    fn spawn_recording_pump(
        &mut self,
        sockets: &[CameraSocket],
        pipeline: &Arc<Mutex<RigPipeline>>,
        fps: u32,
    ) {
        let sockets = sockets.to_vec();
        let pipeline = pipeline.clone();
        let recorder = self.recorder.clone();
        let shutdown = self.shutdown.clone();
        let interval = Duration::from_micros(1_000_000 / fps.max(1) as u64);

        self.threads.push(std::thread::spawn(move || {
            while !shutdown.load(Ordering::SeqCst) {
                if recorder.lock().expect("recorder lock").is_recording() {
                    for &socket in &sockets {
                        let frame = pipeline.lock().expect("pipeline lock").get_frame(socket);
                        if let Some(frame) = frame {
                            let written =
                                recorder.lock().expect("recorder lock").write_frame(&frame);
                            if let Err(e) = written {
                                warn!("Video frame write error for {}: {}", socket, e);
                            }
                        }
                    }
                }
                std::thread::sleep(interval);
            }
        }));
    }

    fn spawn_status_monitor(&mut self) {
        let store = self.store.clone();
        let recorder = self.recorder.clone();
        let track_log = self.track_log.clone();
        let reader = self.gps.as_ref().map(|m| m.reader());

        self.tasks.push(tokio::spawn(async move {
            let mut tick: u64 = 0;
            loop {
                tokio::time::sleep(STATUS_INTERVAL).await;
                tick += 1;

                match store.lock().expect("store lock").available_space() {
                    Ok((free, total)) => {
                        debug!("Disk space: {:.1} GB free of {:.1} GB", free, total)
                    }
                    Err(e) => warn!("Disk space check error: {}", e),
                }

                if let Some(duration) = recorder.lock().expect("recorder lock").duration() {
                    debug!("Recording... {:.1}s", duration.as_secs_f64());
                }

                if tick % TRACK_LOG_TICKS == 0 {
                    if let Some(fix) = reader.as_ref().and_then(|r| r.current_fix()) {
                        if let Err(e) = track_log.lock().expect("track log lock").append(&fix) {
                            warn!("Track log error: {}", e);
                        }
                    }
                }
            }
        }));
    }

    fn spawn_auto_capture(&mut self, pipeline: &Arc<Mutex<RigPipeline>>) {
        let Some(reader) = self.gps.as_ref().map(|m| m.reader()) else {
            return;
        };
        let pipeline = pipeline.clone();
        let store = self.store.clone();
        let settings = self.settings.clone();

        self.tasks.push(tokio::spawn(async move {
            let mut trigger = DistanceTrigger::new(
                settings
                    .lock()
                    .expect("settings lock")
                    .settings()
                    .gps_interval_m,
            );
            loop {
                tokio::time::sleep(AUTO_CAPTURE_INTERVAL).await;

                let interval = settings
                    .lock()
                    .expect("settings lock")
                    .settings()
                    .gps_interval_m;
                trigger.set_interval(interval);

                let Some(fix) = reader.current_fix() else {
                    continue;
                };
                if !trigger.check(&fix) {
                    continue;
                }

                match capture_and_tag(&pipeline, &store, Some(&fix)) {
                    Ok((saved, _)) => {
                        info!("GPS-interval capture saved {} images", saved.len())
                    }
                    Err(e) => debug!("GPS-interval capture skipped: {}", e),
                }
            }
        }));
    }
}

impl Drop for RigService {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Grab one queued frame per socket, write the batch and tag it with the
/// fix when one is present
fn capture_and_tag(
    pipeline: &Arc<Mutex<RigPipeline>>,
    store: &Arc<Mutex<CaptureStore>>,
    fix: Option<&GpsFix>,
) -> Result<(Vec<PathBuf>, bool), ApiError> {
    let frames: Vec<VideoFrame> = {
        let pipeline = pipeline.lock().expect("pipeline lock");
        pipeline
            .sockets()
            .iter()
            .filter_map(|&socket| pipeline.get_frame(socket))
            .collect()
    };
    if frames.is_empty() {
        return Err(ApiError::Unavailable(
            "No frames queued on any camera".to_string(),
        ));
    }

    let store = store.lock().expect("store lock");
    let saved = store.capture_batch(&frames, ImageFormat::Jpeg)?;

    let mut gps_tagged = false;
    if let Some(fix) = fix {
        for path in &saved {
            if let Err(e) = store.save_gps_sidecar(path, fix) {
                warn!("GPS sidecar error for {}: {}", path.display(), e);
            } else {
                gps_tagged = true;
            }
        }
    }

    Ok((saved, gps_tagged))
}
