//! Vendor SDK bindings (feature `poe-device`)
//!
//! Binds the DepthAI C API for real OAK PoE hardware. The build script
//! links `depthai-core` when this feature is enabled.

use crate::control::CameraCommand;
use crate::frame::VideoFrame;
use crate::link::{DeviceLink, DeviceRecord};
use crate::{CameraError, CameraSocket, StreamConfig};
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Discovery record (matches the C struct)
#[repr(C)]
pub struct CDeviceRecord {
    pub mxid: [c_char; 32],
    pub address: [c_char; 48],
    pub platform: [c_char; 16],
}

/// Frame header returned by the SDK (pixel data follows in the mapped buffer)
#[repr(C)]
pub struct CFrameHeader {
    pub socket: c_int,
    pub width: u32,
    pub height: u32,
    pub sequence: u32,
    pub timestamp_us: u64,
}

/// Control message (matches the C struct; negative sentinel = not set)
#[repr(C)]
pub struct CCameraControl {
    pub exposure_us: i64,
    pub iso: i64,
    pub auto_exposure: c_int,
    pub ae_lock: c_int,
    pub ae_region: [i64; 4],
    pub ae_compensation: i64,
    pub focus_mode: c_int,
    pub af_trigger: c_int,
    pub lens_position: i64,
    pub af_region: [i64; 4],
    pub auto_white_balance: c_int,
    pub awb_lock: c_int,
    pub white_balance_k: i64,
    pub brightness: i64,
    pub contrast: i64,
    pub saturation: i64,
    pub sharpness: i64,
    pub luma_denoise: i64,
    pub chroma_denoise: i64,
    pub anti_banding: c_int,
    pub effect: c_int,
}

const UNSET: i64 = i64::MIN;
const UNSET_INT: c_int = -1;

extern "C" {
    fn dai_discover(records: *mut CDeviceRecord, max_records: c_int) -> c_int;
    fn dai_open(mxid: *const c_char) -> c_int;
    fn dai_close();
    fn dai_connected_sockets(sockets: *mut c_int, max_sockets: c_int) -> c_int;
    fn dai_set_ir_laser_intensity(intensity: f32) -> c_int;
    fn dai_configure_stream(socket: c_int, width: u32, height: u32, fps: u32) -> c_int;
    fn dai_start_streams() -> c_int;
    fn dai_stop_streams();
    fn dai_poll_frame(socket: c_int, header: *mut CFrameHeader, data: *mut u8, max_len: usize)
        -> c_int;
    fn dai_send_control(socket: c_int, control: *const CCameraControl) -> c_int;
    fn dai_device_name(name: *mut c_char, max_len: c_int) -> c_int;
    fn dai_last_error() -> *const c_char;
}

fn last_error() -> String {
    unsafe {
        let ptr = dai_last_error();
        if ptr.is_null() {
            "unknown error".to_string()
        } else {
            CStr::from_ptr(ptr).to_string_lossy().into_owned()
        }
    }
}

fn fixed_str(buf: &[c_char]) -> String {
    let bytes: Vec<u8> = buf
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

fn socket_id(socket: CameraSocket) -> c_int {
    match socket {
        CameraSocket::CamA => 0,
        CameraSocket::CamB => 1,
        CameraSocket::CamC => 2,
        CameraSocket::CamD => 3,
    }
}

fn socket_from_id(id: c_int) -> Option<CameraSocket> {
    match id {
        0 => Some(CameraSocket::CamA),
        1 => Some(CameraSocket::CamB),
        2 => Some(CameraSocket::CamC),
        3 => Some(CameraSocket::CamD),
        _ => None,
    }
}

impl CCameraControl {
    fn from_command(command: &CameraCommand) -> Self {
        let region = |r: Option<crate::control::RegionRect>| match r {
            Some(r) => [r.x as i64, r.y as i64, r.width as i64, r.height as i64],
            None => [UNSET; 4],
        };
        let flag = |b: Option<bool>| match b {
            Some(true) => 1,
            Some(false) => 0,
            None => UNSET_INT,
        };

        Self {
            exposure_us: command.manual_exposure.map_or(UNSET, |(e, _)| e as i64),
            iso: command.manual_exposure.map_or(UNSET, |(_, i)| i as i64),
            auto_exposure: flag(command.auto_exposure),
            ae_lock: flag(command.auto_exposure_lock),
            ae_region: region(command.auto_exposure_region),
            ae_compensation: command
                .auto_exposure_compensation
                .map_or(UNSET, |c| c as i64),
            focus_mode: command.focus_mode.map_or(UNSET_INT, |m| m as c_int),
            af_trigger: command.autofocus_trigger as c_int,
            lens_position: command.manual_focus.map_or(UNSET, |f| f as i64),
            af_region: region(command.auto_focus_region),
            auto_white_balance: flag(command.auto_white_balance),
            awb_lock: flag(command.auto_white_balance_lock),
            white_balance_k: command.manual_white_balance.map_or(UNSET, |w| w as i64),
            brightness: command.brightness.map_or(UNSET, |v| v as i64),
            contrast: command.contrast.map_or(UNSET, |v| v as i64),
            saturation: command.saturation.map_or(UNSET, |v| v as i64),
            sharpness: command.sharpness.map_or(UNSET, |v| v as i64),
            luma_denoise: command.luma_denoise.map_or(UNSET, |v| v as i64),
            chroma_denoise: command.chroma_denoise.map_or(UNSET, |v| v as i64),
            anti_banding: command.anti_banding.map_or(UNSET_INT, |m| m as c_int),
            effect: command.effect.map_or(UNSET_INT, |m| m as c_int),
        }
    }
}

/// Device link over the vendor SDK
pub struct PoeLink {
    open: bool,
    frame_buf: Vec<u8>,
}

impl PoeLink {
    /// Maximum frame payload the poll buffer accepts (4K RGB)
    const MAX_FRAME_BYTES: usize = 3840 * 2160 * 3;

    pub fn new() -> Self {
        Self {
            open: false,
            frame_buf: vec![0u8; Self::MAX_FRAME_BYTES],
        }
    }
}

impl Default for PoeLink {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceLink for PoeLink {
    fn discover(&mut self) -> Result<Vec<DeviceRecord>, CameraError> {
        const MAX: usize = 8;
        let mut raw: Vec<CDeviceRecord> = (0..MAX)
            .map(|_| CDeviceRecord {
                mxid: [0; 32],
                address: [0; 48],
                platform: [0; 16],
            })
            .collect();

        let count = unsafe { dai_discover(raw.as_mut_ptr(), MAX as c_int) };
        if count < 0 {
            return Err(CameraError::Open(last_error()));
        }

        Ok(raw
            .iter()
            .take(count as usize)
            .map(|r| DeviceRecord {
                mxid: fixed_str(&r.mxid),
                address: fixed_str(&r.address),
                platform: fixed_str(&r.platform),
            })
            .collect())
    }

    fn open(&mut self, record: &DeviceRecord) -> Result<(), CameraError> {
        let mxid = CString::new(record.mxid.as_str())
            .map_err(|e| CameraError::Open(e.to_string()))?;
        let ret = unsafe { dai_open(mxid.as_ptr()) };
        if ret != 0 {
            return Err(CameraError::Open(last_error()));
        }
        self.open = true;
        debug!("PoE session open for {}", record.mxid);
        Ok(())
    }

    fn close(&mut self) {
        if self.open {
            unsafe { dai_close() };
            self.open = false;
        }
    }

    fn connected_sockets(&self) -> Result<Vec<CameraSocket>, CameraError> {
        if !self.open {
            return Err(CameraError::NotConnected);
        }
        let mut ids = [UNSET_INT; 4];
        let count = unsafe { dai_connected_sockets(ids.as_mut_ptr(), 4) };
        if count < 0 {
            return Err(CameraError::Open(last_error()));
        }
        Ok(ids
            .iter()
            .take(count as usize)
            .filter_map(|&id| socket_from_id(id))
            .collect())
    }

    fn set_ir_laser_intensity(&mut self, intensity: f32) -> Result<bool, CameraError> {
        let ret = unsafe { dai_set_ir_laser_intensity(intensity) };
        match ret {
            0 => Ok(true),
            1 => Ok(false),
            _ => Err(CameraError::Open(last_error())),
        }
    }

    fn configure_stream(
        &mut self,
        socket: CameraSocket,
        config: &StreamConfig,
    ) -> Result<(), CameraError> {
        let ret = unsafe {
            dai_configure_stream(socket_id(socket), config.width, config.height, config.fps)
        };
        if ret != 0 {
            return Err(CameraError::Pipeline(last_error()));
        }
        Ok(())
    }

    fn start_streams(&mut self) -> Result<(), CameraError> {
        let ret = unsafe { dai_start_streams() };
        if ret != 0 {
            return Err(CameraError::Stream(last_error()));
        }
        Ok(())
    }

    fn stop_streams(&mut self) {
        unsafe { dai_stop_streams() };
    }

    fn poll_frame(&mut self, socket: CameraSocket) -> Result<Option<VideoFrame>, CameraError> {
        let mut header = CFrameHeader {
            socket: UNSET_INT,
            width: 0,
            height: 0,
            sequence: 0,
            timestamp_us: 0,
        };
        let ret = unsafe {
            dai_poll_frame(
                socket_id(socket),
                &mut header,
                self.frame_buf.as_mut_ptr(),
                self.frame_buf.len(),
            )
        };
        match ret {
            0 => Ok(None),
            n if n > 0 => {
                let len = (header.width * header.height * 3) as usize;
                if len > self.frame_buf.len() {
                    warn!("Frame larger than poll buffer, dropping");
                    return Ok(None);
                }
                let timestamp_ms = if header.timestamp_us > 0 {
                    header.timestamp_us / 1000
                } else {
                    SystemTime::now()
                        .duration_since(UNIX_EPOCH)
                        .map(|d| d.as_millis() as u64)
                        .unwrap_or(0)
                };
                Ok(Some(VideoFrame::new(
                    socket,
                    self.frame_buf[..len].to_vec(),
                    header.width,
                    header.height,
                    timestamp_ms,
                    header.sequence,
                )))
            }
            _ => Err(CameraError::Stream(last_error())),
        }
    }

    fn send_control(
        &mut self,
        socket: CameraSocket,
        command: &CameraCommand,
    ) -> Result<(), CameraError> {
        let control = CCameraControl::from_command(command);
        let ret = unsafe { dai_send_control(socket_id(socket), &control) };
        if ret != 0 {
            return Err(CameraError::ControlQueueClosed(socket));
        }
        Ok(())
    }

    fn device_name(&self) -> String {
        let mut buf = [0 as c_char; 64];
        let ret = unsafe { dai_device_name(buf.as_mut_ptr(), buf.len() as c_int) };
        if ret == 0 {
            fixed_str(&buf)
        } else {
            "Unknown".to_string()
        }
    }
}

impl Drop for PoeLink {
    fn drop(&mut self) {
        self.close();
    }
}
