//! C layouts and constants of the ZWO ASI camera SDK (`ASICamera2.h`).
//!
//! The SDK is loaded at runtime (see [`crate::sdk`]), so only the types and
//! the function signatures are declared here.
#![allow(non_upper_case_globals, non_camel_case_types, non_snake_case, dead_code)]

use std::ffi::{c_char, c_int, c_long, c_uchar};

pub type ASI_BOOL = c_int;
pub const ASI_BOOL_ASI_FALSE: ASI_BOOL = 0;
pub const ASI_BOOL_ASI_TRUE: ASI_BOOL = 1;

pub type ASI_BAYER_PATTERN = c_int;
pub const ASI_BAYER_PATTERN_ASI_BAYER_RG: ASI_BAYER_PATTERN = 0;
pub const ASI_BAYER_PATTERN_ASI_BAYER_BG: ASI_BAYER_PATTERN = 1;
pub const ASI_BAYER_PATTERN_ASI_BAYER_GR: ASI_BAYER_PATTERN = 2;
pub const ASI_BAYER_PATTERN_ASI_BAYER_GB: ASI_BAYER_PATTERN = 3;

pub type ASI_IMG_TYPE = c_int;
pub const ASI_IMG_TYPE_ASI_IMG_RAW8: ASI_IMG_TYPE = 0;
pub const ASI_IMG_TYPE_ASI_IMG_RGB24: ASI_IMG_TYPE = 1;
pub const ASI_IMG_TYPE_ASI_IMG_RAW16: ASI_IMG_TYPE = 2;
pub const ASI_IMG_TYPE_ASI_IMG_Y8: ASI_IMG_TYPE = 3;
pub const ASI_IMG_TYPE_ASI_IMG_END: ASI_IMG_TYPE = -1;

pub type ASI_EXPOSURE_STATUS = c_int;
pub const ASI_EXPOSURE_STATUS_ASI_EXP_IDLE: ASI_EXPOSURE_STATUS = 0;
pub const ASI_EXPOSURE_STATUS_ASI_EXP_WORKING: ASI_EXPOSURE_STATUS = 1;
pub const ASI_EXPOSURE_STATUS_ASI_EXP_SUCCESS: ASI_EXPOSURE_STATUS = 2;
pub const ASI_EXPOSURE_STATUS_ASI_EXP_FAILED: ASI_EXPOSURE_STATUS = 3;

pub type ASI_FLIP_STATUS = c_int;
pub const ASI_FLIP_STATUS_ASI_FLIP_NONE: ASI_FLIP_STATUS = 0;
pub const ASI_FLIP_STATUS_ASI_FLIP_HORIZ: ASI_FLIP_STATUS = 1;
pub const ASI_FLIP_STATUS_ASI_FLIP_VERT: ASI_FLIP_STATUS = 2;
pub const ASI_FLIP_STATUS_ASI_FLIP_BOTH: ASI_FLIP_STATUS = 3;

pub type ASI_CONTROL_TYPE = c_int;
pub const ASI_CONTROL_TYPE_ASI_GAIN: ASI_CONTROL_TYPE = 0;
pub const ASI_CONTROL_TYPE_ASI_EXPOSURE: ASI_CONTROL_TYPE = 1;
pub const ASI_CONTROL_TYPE_ASI_GAMMA: ASI_CONTROL_TYPE = 2;
pub const ASI_CONTROL_TYPE_ASI_WB_R: ASI_CONTROL_TYPE = 3;
pub const ASI_CONTROL_TYPE_ASI_WB_B: ASI_CONTROL_TYPE = 4;
pub const ASI_CONTROL_TYPE_ASI_OFFSET: ASI_CONTROL_TYPE = 5;
pub const ASI_CONTROL_TYPE_ASI_BANDWIDTHOVERLOAD: ASI_CONTROL_TYPE = 6;
pub const ASI_CONTROL_TYPE_ASI_OVERCLOCK: ASI_CONTROL_TYPE = 7;
/// Reported as ten times the temperature in °C.
pub const ASI_CONTROL_TYPE_ASI_TEMPERATURE: ASI_CONTROL_TYPE = 8;
pub const ASI_CONTROL_TYPE_ASI_FLIP: ASI_CONTROL_TYPE = 9;
pub const ASI_CONTROL_TYPE_ASI_AUTO_MAX_GAIN: ASI_CONTROL_TYPE = 10;
pub const ASI_CONTROL_TYPE_ASI_AUTO_MAX_EXP: ASI_CONTROL_TYPE = 11;
pub const ASI_CONTROL_TYPE_ASI_AUTO_TARGET_BRIGHTNESS: ASI_CONTROL_TYPE = 12;
pub const ASI_CONTROL_TYPE_ASI_HARDWARE_BIN: ASI_CONTROL_TYPE = 13;
pub const ASI_CONTROL_TYPE_ASI_HIGH_SPEED_MODE: ASI_CONTROL_TYPE = 14;
pub const ASI_CONTROL_TYPE_ASI_COOLER_POWER_PERC: ASI_CONTROL_TYPE = 15;
/// Plain °C, not scaled.
pub const ASI_CONTROL_TYPE_ASI_TARGET_TEMP: ASI_CONTROL_TYPE = 16;
pub const ASI_CONTROL_TYPE_ASI_COOLER_ON: ASI_CONTROL_TYPE = 17;
pub const ASI_CONTROL_TYPE_ASI_MONO_BIN: ASI_CONTROL_TYPE = 18;
pub const ASI_CONTROL_TYPE_ASI_FAN_ON: ASI_CONTROL_TYPE = 19;
pub const ASI_CONTROL_TYPE_ASI_PATTERN_ADJUST: ASI_CONTROL_TYPE = 20;
pub const ASI_CONTROL_TYPE_ASI_ANTI_DEW_HEATER: ASI_CONTROL_TYPE = 21;

pub type ASI_ERROR_CODE = c_int;
pub const ASI_ERROR_CODE_ASI_SUCCESS: ASI_ERROR_CODE = 0;
pub const ASI_ERROR_CODE_ASI_ERROR_INVALID_INDEX: ASI_ERROR_CODE = 1;
pub const ASI_ERROR_CODE_ASI_ERROR_INVALID_ID: ASI_ERROR_CODE = 2;
pub const ASI_ERROR_CODE_ASI_ERROR_INVALID_CONTROL_TYPE: ASI_ERROR_CODE = 3;
pub const ASI_ERROR_CODE_ASI_ERROR_CAMERA_CLOSED: ASI_ERROR_CODE = 4;
pub const ASI_ERROR_CODE_ASI_ERROR_CAMERA_REMOVED: ASI_ERROR_CODE = 5;
pub const ASI_ERROR_CODE_ASI_ERROR_INVALID_PATH: ASI_ERROR_CODE = 6;
pub const ASI_ERROR_CODE_ASI_ERROR_INVALID_FILEFORMAT: ASI_ERROR_CODE = 7;
pub const ASI_ERROR_CODE_ASI_ERROR_INVALID_SIZE: ASI_ERROR_CODE = 8;
pub const ASI_ERROR_CODE_ASI_ERROR_INVALID_IMGTYPE: ASI_ERROR_CODE = 9;
pub const ASI_ERROR_CODE_ASI_ERROR_OUTOF_BOUNDARY: ASI_ERROR_CODE = 10;
pub const ASI_ERROR_CODE_ASI_ERROR_TIMEOUT: ASI_ERROR_CODE = 11;
pub const ASI_ERROR_CODE_ASI_ERROR_INVALID_SEQUENCE: ASI_ERROR_CODE = 12;
pub const ASI_ERROR_CODE_ASI_ERROR_BUFFER_TOO_SMALL: ASI_ERROR_CODE = 13;
pub const ASI_ERROR_CODE_ASI_ERROR_VIDEO_MODE_ACTIVE: ASI_ERROR_CODE = 14;
pub const ASI_ERROR_CODE_ASI_ERROR_EXPOSURE_IN_PROGRESS: ASI_ERROR_CODE = 15;
pub const ASI_ERROR_CODE_ASI_ERROR_GENERAL_ERROR: ASI_ERROR_CODE = 16;
pub const ASI_ERROR_CODE_ASI_ERROR_INVALID_MODE: ASI_ERROR_CODE = 17;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ASI_CAMERA_INFO {
    pub Name: [c_char; 64],
    pub CameraID: c_int,
    pub MaxHeight: c_long,
    pub MaxWidth: c_long,
    pub IsColorCam: ASI_BOOL,
    pub BayerPattern: ASI_BAYER_PATTERN,
    /// Terminated by 0.
    pub SupportedBins: [c_int; 16],
    /// Terminated by `ASI_IMG_END`.
    pub SupportedVideoFormat: [ASI_IMG_TYPE; 8],
    /// Micrometres.
    pub PixelSize: f64,
    pub MechanicalShutter: ASI_BOOL,
    pub ST4Port: ASI_BOOL,
    pub IsCoolerCam: ASI_BOOL,
    pub IsUSB3Host: ASI_BOOL,
    pub IsUSB3Camera: ASI_BOOL,
    pub ElecPerADU: f32,
    pub BitDepth: c_int,
    pub IsTriggerCam: ASI_BOOL,
    pub Unused: [c_char; 16],
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ASI_CONTROL_CAPS {
    pub Name: [c_char; 64],
    pub Description: [c_char; 128],
    pub MaxValue: c_long,
    pub MinValue: c_long,
    pub DefaultValue: c_long,
    pub IsAutoSupported: ASI_BOOL,
    pub IsWritable: ASI_BOOL,
    pub ControlType: ASI_CONTROL_TYPE,
    pub Unused: [c_char; 32],
}

impl Default for ASI_CAMERA_INFO {
    fn default() -> Self {
        Self {
            Name: [0; 64],
            CameraID: Default::default(),
            MaxHeight: Default::default(),
            MaxWidth: Default::default(),
            IsColorCam: Default::default(),
            BayerPattern: Default::default(),
            SupportedBins: Default::default(),
            SupportedVideoFormat: [ASI_IMG_TYPE_ASI_IMG_END; 8],
            PixelSize: Default::default(),
            MechanicalShutter: Default::default(),
            ST4Port: Default::default(),
            IsCoolerCam: Default::default(),
            IsUSB3Host: Default::default(),
            IsUSB3Camera: Default::default(),
            ElecPerADU: Default::default(),
            BitDepth: Default::default(),
            IsTriggerCam: Default::default(),
            Unused: Default::default(),
        }
    }
}

impl Default for ASI_CONTROL_CAPS {
    fn default() -> Self {
        Self {
            Name: [0; 64],
            Description: [0; 128],
            MaxValue: Default::default(),
            MinValue: Default::default(),
            DefaultValue: Default::default(),
            IsAutoSupported: Default::default(),
            IsWritable: Default::default(),
            ControlType: Default::default(),
            Unused: [0; 32],
        }
    }
}

pub type ASIGetNumOfConnectedCameras = unsafe extern "C" fn() -> c_int;
pub type ASIGetCameraProperty = unsafe extern "C" fn(*mut ASI_CAMERA_INFO, c_int) -> ASI_ERROR_CODE;
pub type ASIOpenCamera = unsafe extern "C" fn(c_int) -> ASI_ERROR_CODE;
pub type ASIInitCamera = unsafe extern "C" fn(c_int) -> ASI_ERROR_CODE;
pub type ASICloseCamera = unsafe extern "C" fn(c_int) -> ASI_ERROR_CODE;
pub type ASIGetNumOfControls = unsafe extern "C" fn(c_int, *mut c_int) -> ASI_ERROR_CODE;
pub type ASIGetControlCaps =
    unsafe extern "C" fn(c_int, c_int, *mut ASI_CONTROL_CAPS) -> ASI_ERROR_CODE;
pub type ASIGetControlValue =
    unsafe extern "C" fn(c_int, ASI_CONTROL_TYPE, *mut c_long, *mut ASI_BOOL) -> ASI_ERROR_CODE;
pub type ASISetControlValue =
    unsafe extern "C" fn(c_int, ASI_CONTROL_TYPE, c_long, ASI_BOOL) -> ASI_ERROR_CODE;
pub type ASISetROIFormat =
    unsafe extern "C" fn(c_int, c_int, c_int, c_int, ASI_IMG_TYPE) -> ASI_ERROR_CODE;
pub type ASIGetROIFormat = unsafe extern "C" fn(
    c_int,
    *mut c_int,
    *mut c_int,
    *mut c_int,
    *mut ASI_IMG_TYPE,
) -> ASI_ERROR_CODE;
pub type ASISetStartPos = unsafe extern "C" fn(c_int, c_int, c_int) -> ASI_ERROR_CODE;
pub type ASIGetStartPos = unsafe extern "C" fn(c_int, *mut c_int, *mut c_int) -> ASI_ERROR_CODE;
pub type ASIStartExposure = unsafe extern "C" fn(c_int, ASI_BOOL) -> ASI_ERROR_CODE;
pub type ASIStopExposure = unsafe extern "C" fn(c_int) -> ASI_ERROR_CODE;
pub type ASIGetExpStatus = unsafe extern "C" fn(c_int, *mut ASI_EXPOSURE_STATUS) -> ASI_ERROR_CODE;
pub type ASIGetDataAfterExp = unsafe extern "C" fn(c_int, *mut c_uchar, c_long) -> ASI_ERROR_CODE;
pub type ASIStopVideoCapture = unsafe extern "C" fn(c_int) -> ASI_ERROR_CODE;
pub type ASIDisableDarkSubtract = unsafe extern "C" fn(c_int) -> ASI_ERROR_CODE;
pub type ASIGetSDKVersion = unsafe extern "C" fn() -> *const c_char;
