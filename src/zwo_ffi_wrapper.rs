use std::{
    ffi::{c_char, c_int},
    fmt::{self, Display},
};

use crate::zwo_ffi::*;

/// Error codes returned by the ASI SDK.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum AsiError {
    #[error("success")]
    Success = ASI_ERROR_CODE_ASI_SUCCESS,
    #[error("no camera connected or index out of range")]
    InvalidIndex = ASI_ERROR_CODE_ASI_ERROR_INVALID_INDEX,
    #[error("invalid camera ID")]
    InvalidId = ASI_ERROR_CODE_ASI_ERROR_INVALID_ID,
    #[error("invalid control type")]
    InvalidControlType = ASI_ERROR_CODE_ASI_ERROR_INVALID_CONTROL_TYPE,
    #[error("camera is not open")]
    CameraClosed = ASI_ERROR_CODE_ASI_ERROR_CAMERA_CLOSED,
    #[error("camera was removed")]
    CameraRemoved = ASI_ERROR_CODE_ASI_ERROR_CAMERA_REMOVED,
    #[error("invalid path")]
    InvalidPath = ASI_ERROR_CODE_ASI_ERROR_INVALID_PATH,
    #[error("invalid file format")]
    InvalidFileFormat = ASI_ERROR_CODE_ASI_ERROR_INVALID_FILEFORMAT,
    #[error("invalid video format size")]
    InvalidSize = ASI_ERROR_CODE_ASI_ERROR_INVALID_SIZE,
    #[error("unsupported image type")]
    InvalidImageType = ASI_ERROR_CODE_ASI_ERROR_INVALID_IMGTYPE,
    #[error("start position out of boundary")]
    OutOfBounds = ASI_ERROR_CODE_ASI_ERROR_OUTOF_BOUNDARY,
    #[error("timeout")]
    Timeout = ASI_ERROR_CODE_ASI_ERROR_TIMEOUT,
    #[error("invalid sequence, stop capture first")]
    InvalidSequence = ASI_ERROR_CODE_ASI_ERROR_INVALID_SEQUENCE,
    #[error("buffer too small")]
    BufferTooSmall = ASI_ERROR_CODE_ASI_ERROR_BUFFER_TOO_SMALL,
    #[error("video mode active")]
    VideoModeActive = ASI_ERROR_CODE_ASI_ERROR_VIDEO_MODE_ACTIVE,
    #[error("exposure in progress")]
    ExposureInProgress = ASI_ERROR_CODE_ASI_ERROR_EXPOSURE_IN_PROGRESS,
    #[error("general error")]
    GeneralError = ASI_ERROR_CODE_ASI_ERROR_GENERAL_ERROR,
    #[error("invalid mode")]
    InvalidMode = ASI_ERROR_CODE_ASI_ERROR_INVALID_MODE,
}

impl From<c_int> for AsiError {
    fn from(val: c_int) -> Self {
        match val {
            ASI_ERROR_CODE_ASI_SUCCESS => AsiError::Success,
            ASI_ERROR_CODE_ASI_ERROR_INVALID_INDEX => AsiError::InvalidIndex,
            ASI_ERROR_CODE_ASI_ERROR_INVALID_ID => AsiError::InvalidId,
            ASI_ERROR_CODE_ASI_ERROR_INVALID_CONTROL_TYPE => AsiError::InvalidControlType,
            ASI_ERROR_CODE_ASI_ERROR_CAMERA_CLOSED => AsiError::CameraClosed,
            ASI_ERROR_CODE_ASI_ERROR_CAMERA_REMOVED => AsiError::CameraRemoved,
            ASI_ERROR_CODE_ASI_ERROR_INVALID_PATH => AsiError::InvalidPath,
            ASI_ERROR_CODE_ASI_ERROR_INVALID_FILEFORMAT => AsiError::InvalidFileFormat,
            ASI_ERROR_CODE_ASI_ERROR_INVALID_SIZE => AsiError::InvalidSize,
            ASI_ERROR_CODE_ASI_ERROR_INVALID_IMGTYPE => AsiError::InvalidImageType,
            ASI_ERROR_CODE_ASI_ERROR_OUTOF_BOUNDARY => AsiError::OutOfBounds,
            ASI_ERROR_CODE_ASI_ERROR_TIMEOUT => AsiError::Timeout,
            ASI_ERROR_CODE_ASI_ERROR_INVALID_SEQUENCE => AsiError::InvalidSequence,
            ASI_ERROR_CODE_ASI_ERROR_BUFFER_TOO_SMALL => AsiError::BufferTooSmall,
            ASI_ERROR_CODE_ASI_ERROR_VIDEO_MODE_ACTIVE => AsiError::VideoModeActive,
            ASI_ERROR_CODE_ASI_ERROR_EXPOSURE_IN_PROGRESS => AsiError::ExposureInProgress,
            ASI_ERROR_CODE_ASI_ERROR_INVALID_MODE => AsiError::InvalidMode,
            _ => AsiError::GeneralError,
        }
    }
}

/// Camera controls known to the SDK.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ASIControlType {
    Gain = ASI_CONTROL_TYPE_ASI_GAIN,
    Exposure = ASI_CONTROL_TYPE_ASI_EXPOSURE,
    Gamma = ASI_CONTROL_TYPE_ASI_GAMMA,
    WhiteBalR = ASI_CONTROL_TYPE_ASI_WB_R,
    WhiteBalB = ASI_CONTROL_TYPE_ASI_WB_B,
    /// Also called "brightness" by older SDK releases.
    Offset = ASI_CONTROL_TYPE_ASI_OFFSET,
    BWOvld = ASI_CONTROL_TYPE_ASI_BANDWIDTHOVERLOAD,
    Overclock = ASI_CONTROL_TYPE_ASI_OVERCLOCK,
    Temperature = ASI_CONTROL_TYPE_ASI_TEMPERATURE,
    Flip = ASI_CONTROL_TYPE_ASI_FLIP,
    AutoExpMaxGain = ASI_CONTROL_TYPE_ASI_AUTO_MAX_GAIN,
    AutoExpMaxExp = ASI_CONTROL_TYPE_ASI_AUTO_MAX_EXP,
    AutoExpTgtBrightness = ASI_CONTROL_TYPE_ASI_AUTO_TARGET_BRIGHTNESS,
    HWBin = ASI_CONTROL_TYPE_ASI_HARDWARE_BIN,
    HighSpeedMode = ASI_CONTROL_TYPE_ASI_HIGH_SPEED_MODE,
    CoolerPowerPercent = ASI_CONTROL_TYPE_ASI_COOLER_POWER_PERC,
    TargetTemp = ASI_CONTROL_TYPE_ASI_TARGET_TEMP,
    CoolerOn = ASI_CONTROL_TYPE_ASI_COOLER_ON,
    MonoBin = ASI_CONTROL_TYPE_ASI_MONO_BIN,
    FanOn = ASI_CONTROL_TYPE_ASI_FAN_ON,
    PatternAdjust = ASI_CONTROL_TYPE_ASI_PATTERN_ADJUST,
    AntiDewHeater = ASI_CONTROL_TYPE_ASI_ANTI_DEW_HEATER,
}

impl ASIControlType {
    pub(crate) fn from_raw(val: c_int) -> Option<Self> {
        use ASIControlType::*;
        Some(match val {
            ASI_CONTROL_TYPE_ASI_GAIN => Gain,
            ASI_CONTROL_TYPE_ASI_EXPOSURE => Exposure,
            ASI_CONTROL_TYPE_ASI_GAMMA => Gamma,
            ASI_CONTROL_TYPE_ASI_WB_R => WhiteBalR,
            ASI_CONTROL_TYPE_ASI_WB_B => WhiteBalB,
            ASI_CONTROL_TYPE_ASI_OFFSET => Offset,
            ASI_CONTROL_TYPE_ASI_BANDWIDTHOVERLOAD => BWOvld,
            ASI_CONTROL_TYPE_ASI_OVERCLOCK => Overclock,
            ASI_CONTROL_TYPE_ASI_TEMPERATURE => Temperature,
            ASI_CONTROL_TYPE_ASI_FLIP => Flip,
            ASI_CONTROL_TYPE_ASI_AUTO_MAX_GAIN => AutoExpMaxGain,
            ASI_CONTROL_TYPE_ASI_AUTO_MAX_EXP => AutoExpMaxExp,
            ASI_CONTROL_TYPE_ASI_AUTO_TARGET_BRIGHTNESS => AutoExpTgtBrightness,
            ASI_CONTROL_TYPE_ASI_HARDWARE_BIN => HWBin,
            ASI_CONTROL_TYPE_ASI_HIGH_SPEED_MODE => HighSpeedMode,
            ASI_CONTROL_TYPE_ASI_COOLER_POWER_PERC => CoolerPowerPercent,
            ASI_CONTROL_TYPE_ASI_TARGET_TEMP => TargetTemp,
            ASI_CONTROL_TYPE_ASI_COOLER_ON => CoolerOn,
            ASI_CONTROL_TYPE_ASI_MONO_BIN => MonoBin,
            ASI_CONTROL_TYPE_ASI_FAN_ON => FanOn,
            ASI_CONTROL_TYPE_ASI_PATTERN_ADJUST => PatternAdjust,
            ASI_CONTROL_TYPE_ASI_ANTI_DEW_HEATER => AntiDewHeater,
            _ => return None,
        })
    }
}

/// Pixel formats delivered by the SDK.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ASIImageFormat {
    /// 8-bit raw image.
    ImageRAW8 = ASI_IMG_TYPE_ASI_IMG_RAW8,
    /// 24-bit image, BGR interleaved.
    ImageRGB24 = ASI_IMG_TYPE_ASI_IMG_RGB24,
    /// 16-bit raw image, host byte order.
    ImageRAW16 = ASI_IMG_TYPE_ASI_IMG_RAW16,
    /// 8-bit luminance.
    ImageY8 = ASI_IMG_TYPE_ASI_IMG_Y8,
}

impl ASIImageFormat {
    pub(crate) fn from_raw(val: c_int) -> Option<Self> {
        match val {
            ASI_IMG_TYPE_ASI_IMG_RAW8 => Some(ASIImageFormat::ImageRAW8),
            ASI_IMG_TYPE_ASI_IMG_RGB24 => Some(ASIImageFormat::ImageRGB24),
            ASI_IMG_TYPE_ASI_IMG_RAW16 => Some(ASIImageFormat::ImageRAW16),
            ASI_IMG_TYPE_ASI_IMG_Y8 => Some(ASIImageFormat::ImageY8),
            _ => None,
        }
    }

    /// Bytes per pixel in the SDK download buffer.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            ASIImageFormat::ImageRAW8 | ASIImageFormat::ImageY8 => 1,
            ASIImageFormat::ImageRAW16 => 2,
            ASIImageFormat::ImageRGB24 => 3,
        }
    }
}

/// State of the single-frame exposure engine.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ASIExposureStatus {
    Idle = ASI_EXPOSURE_STATUS_ASI_EXP_IDLE,
    Working = ASI_EXPOSURE_STATUS_ASI_EXP_WORKING,
    Success = ASI_EXPOSURE_STATUS_ASI_EXP_SUCCESS,
    Failed = ASI_EXPOSURE_STATUS_ASI_EXP_FAILED,
}

impl ASIExposureStatus {
    pub(crate) fn from_raw(val: c_int) -> Option<Self> {
        match val {
            ASI_EXPOSURE_STATUS_ASI_EXP_IDLE => Some(ASIExposureStatus::Idle),
            ASI_EXPOSURE_STATUS_ASI_EXP_WORKING => Some(ASIExposureStatus::Working),
            ASI_EXPOSURE_STATUS_ASI_EXP_SUCCESS => Some(ASIExposureStatus::Success),
            ASI_EXPOSURE_STATUS_ASI_EXP_FAILED => Some(ASIExposureStatus::Failed),
            _ => None,
        }
    }
}

impl Display for ASIExposureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ASIExposureStatus::Idle => write!(f, "Idle"),
            ASIExposureStatus::Working => write!(f, "Working"),
            ASIExposureStatus::Success => write!(f, "Success"),
            ASIExposureStatus::Failed => write!(f, "Failed"),
        }
    }
}

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ASIBayerPattern {
    BayerRG = ASI_BAYER_PATTERN_ASI_BAYER_RG,
    BayerBG = ASI_BAYER_PATTERN_ASI_BAYER_BG,
    BayerGR = ASI_BAYER_PATTERN_ASI_BAYER_GR,
    BayerGB = ASI_BAYER_PATTERN_ASI_BAYER_GB,
}

impl ASIBayerPattern {
    pub(crate) fn from_raw(val: c_int) -> Option<Self> {
        match val {
            ASI_BAYER_PATTERN_ASI_BAYER_RG => Some(ASIBayerPattern::BayerRG),
            ASI_BAYER_PATTERN_ASI_BAYER_BG => Some(ASIBayerPattern::BayerBG),
            ASI_BAYER_PATTERN_ASI_BAYER_GR => Some(ASIBayerPattern::BayerGR),
            ASI_BAYER_PATTERN_ASI_BAYER_GB => Some(ASIBayerPattern::BayerGB),
            _ => None,
        }
    }

    /// The pattern as written to the `BAYERPAT` FITS keyword.
    pub fn as_fits_str(&self) -> &'static str {
        match self {
            ASIBayerPattern::BayerRG => "RGGB",
            ASIBayerPattern::BayerBG => "BGGR",
            ASIBayerPattern::BayerGR => "GRBG",
            ASIBayerPattern::BayerGB => "GBRG",
        }
    }
}

/// Static description of a connected camera.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraProps {
    pub name: String,
    pub id: i32,
    pub max_width: u32,
    pub max_height: u32,
    pub is_color_cam: bool,
    pub bayer_pattern: Option<ASIBayerPattern>,
    pub supported_bins: Vec<u32>,
    pub supported_formats: Vec<ASIImageFormat>,
    /// Micrometres.
    pub pixel_size: f64,
    pub mechanical_shutter: bool,
    pub st4_port: bool,
    pub is_cooler_cam: bool,
    pub is_usb3_host: bool,
    pub is_usb3_camera: bool,
    pub e_per_adu: f32,
    pub bit_depth: i32,
    pub is_trigger_cam: bool,
}

impl From<ASI_CAMERA_INFO> for CameraProps {
    fn from(value: ASI_CAMERA_INFO) -> Self {
        let is_color_cam = value.IsColorCam == ASI_BOOL_ASI_TRUE;
        Self {
            name: string_from_char(&value.Name),
            id: value.CameraID,
            max_width: value.MaxWidth as _,
            max_height: value.MaxHeight as _,
            is_color_cam,
            bayer_pattern: if is_color_cam {
                ASIBayerPattern::from_raw(value.BayerPattern)
            } else {
                None
            },
            supported_bins: get_bins(&value.SupportedBins, 0),
            supported_formats: get_pixfmt(&value.SupportedVideoFormat, ASI_IMG_TYPE_ASI_IMG_END),
            pixel_size: value.PixelSize,
            mechanical_shutter: value.MechanicalShutter == ASI_BOOL_ASI_TRUE,
            st4_port: value.ST4Port == ASI_BOOL_ASI_TRUE,
            is_cooler_cam: value.IsCoolerCam == ASI_BOOL_ASI_TRUE,
            is_usb3_host: value.IsUSB3Host == ASI_BOOL_ASI_TRUE,
            is_usb3_camera: value.IsUSB3Camera == ASI_BOOL_ASI_TRUE,
            e_per_adu: value.ElecPerADU,
            bit_depth: value.BitDepth,
            is_trigger_cam: value.IsTriggerCam == ASI_BOOL_ASI_TRUE,
        }
    }
}

impl CameraProps {
    /// Property names and values, in the order the SDK lists them.
    pub fn describe(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Name", self.name.clone()),
            ("CameraID", self.id.to_string()),
            ("MaxHeight", self.max_height.to_string()),
            ("MaxWidth", self.max_width.to_string()),
            ("IsColorCam", self.is_color_cam.to_string()),
            (
                "BayerPattern",
                self.bayer_pattern
                    .map(|p| p.as_fits_str().to_owned())
                    .unwrap_or_else(|| "None".to_owned()),
            ),
            ("SupportedBins", format!("{:?}", self.supported_bins)),
            ("SupportedVideoFormat", format!("{:?}", self.supported_formats)),
            ("PixelSize", self.pixel_size.to_string()),
            ("MechanicalShutter", self.mechanical_shutter.to_string()),
            ("ST4Port", self.st4_port.to_string()),
            ("IsCoolerCam", self.is_cooler_cam.to_string()),
            ("IsUSB3Host", self.is_usb3_host.to_string()),
            ("IsUSB3Camera", self.is_usb3_camera.to_string()),
            ("ElecPerADU", self.e_per_adu.to_string()),
            ("BitDepth", self.bit_depth.to_string()),
            ("IsTriggerCam", self.is_trigger_cam.to_string()),
        ]
    }
}

impl Display for CameraProps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Camera {}\n\tID: {}\n\tDetector: {} x {}\n\tColor: {}, Shutter: {}, Cooler: {}, USB3: {}, Trigger: {}\n\tBayer Pattern: {:?}\n\tBins: {:?}\n\tPixel Size: {} um, e/ADU: {}, Bit Depth: {}",
            self.name,
            self.id,
            self.max_width,
            self.max_height,
            self.is_color_cam,
            self.mechanical_shutter,
            self.is_cooler_cam,
            self.is_usb3_camera,
            self.is_trigger_cam,
            self.bayer_pattern,
            self.supported_bins,
            self.pixel_size,
            self.e_per_adu,
            self.bit_depth,
        )
    }
}

/// Range and access flags of a single control.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlCaps {
    pub control: ASIControlType,
    pub name: String,
    pub description: String,
    pub min_value: i64,
    pub max_value: i64,
    pub default_value: i64,
    pub is_auto_supported: bool,
    pub is_writable: bool,
}

impl ControlCaps {
    /// Returns `None` for control types this crate does not know.
    pub(crate) fn from_raw(obj: &ASI_CONTROL_CAPS) -> Option<Self> {
        Some(Self {
            control: ASIControlType::from_raw(obj.ControlType)?,
            name: string_from_char(&obj.Name),
            description: string_from_char(&obj.Description),
            min_value: obj.MinValue as _,
            max_value: obj.MaxValue as _,
            default_value: obj.DefaultValue as _,
            is_auto_supported: obj.IsAutoSupported == ASI_BOOL_ASI_TRUE,
            is_writable: obj.IsWritable == ASI_BOOL_ASI_TRUE,
        })
    }
}

impl Display for ControlCaps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Control: {} - {:?}\n\tDescription: {}\n\tRange: {} - {}\n\tDefault: {}\n\tAuto: {}, Writable: {}",
            self.name,
            self.control,
            self.description,
            self.min_value,
            self.max_value,
            self.default_value,
            self.is_auto_supported,
            self.is_writable,
        )
    }
}

/// Size, binning and pixel format of the region that will be read out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoiFormat {
    /// Binned pixels.
    pub width: i32,
    /// Binned pixels.
    pub height: i32,
    pub bin: i32,
    pub fmt: ASIImageFormat,
}

impl RoiFormat {
    /// Size of the download buffer in bytes.
    pub fn buffer_size(&self) -> usize {
        self.width.max(0) as usize * self.height.max(0) as usize * self.fmt.bytes_per_pixel()
    }
}

pub(crate) fn get_pixfmt(list: &[c_int], end: c_int) -> Vec<ASIImageFormat> {
    list.iter()
        .take_while(|x| **x != end)
        .filter_map(|x| ASIImageFormat::from_raw(*x))
        .collect()
}

pub(crate) fn get_bins(list: &[c_int], end: c_int) -> Vec<u32> {
    list.iter()
        .take_while(|x| **x != end)
        .filter_map(|x| if *x > 0 { Some(*x as _) } else { None })
        .collect()
}

pub(crate) fn string_from_char<const N: usize>(inp: &[c_char; N]) -> String {
    let bytes: Vec<u8> = inp
        .iter()
        .take_while(|c| **c != 0)
        .map(|c| *c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).trim().to_string()
}
