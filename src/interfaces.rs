use std::{
    collections::BTreeMap,
    fmt::{self, Display},
    str::FromStr,
    sync::{atomic::AtomicBool, Arc, Mutex},
    time::Duration,
};

use crate::{
    error::{Error, Result},
    image::Image,
};

/// A camera that can take exposures.
pub trait Camera {
    fn name(&self) -> &str;

    /// Take one exposure.
    ///
    /// `abort` is polled while the exposure runs; `status` is moved to
    /// [`ExposureStatus::Readout`] once the exposure is done. The caller resets it.
    fn expose(
        &self,
        exposure_time: Duration,
        open_shutter: bool,
        abort: &AtomicBool,
        status: &ExposureState,
    ) -> Result<Image>;

    fn abort_exposure(&self) -> Result<()>;
}

pub trait WindowControl {
    fn get_full_frame(&self) -> Window;
    fn get_window(&self) -> Window;
    fn set_window(&mut self, window: Window) -> Result<()>;
}

pub trait BinningControl {
    fn get_binning(&self) -> (u32, u32);
    fn set_binning(&mut self, x: u32, y: u32) -> Result<()>;
    fn list_binnings(&self) -> Vec<(u32, u32)>;
}

pub trait ImageFormatControl {
    fn get_image_format(&self) -> ImageFormat;
    fn set_image_format(&mut self, format: ImageFormat) -> Result<()>;
    fn list_image_formats(&self) -> Vec<ImageFormat>;
}

pub trait Cooling {
    fn get_cooling_status(&self) -> Result<CoolingStatus>;
    /// Temperatures in degrees Celsius, by sensor name.
    fn get_temperatures(&self) -> Result<BTreeMap<String, f64>>;
    fn set_cooling(&self, enabled: bool, setpoint: f64) -> Result<()>;
}

/// Region of the detector, in unbinned pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl Window {
    pub fn new(left: u32, top: u32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

impl Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.left, self.top, self.width, self.height
        )
    }
}

impl FromStr for Window {
    type Err = Error;

    /// Parses `left,top,width,height`.
    fn from_str(s: &str) -> Result<Self> {
        let vals = s
            .split(',')
            .map(|v| v.trim().parse::<u32>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::InvalidValue(format!("window {s:?}: {e}")))?;
        match vals[..] {
            [left, top, width, height] => Ok(Window::new(left, top, width, height)),
            _ => Err(Error::InvalidValue(format!(
                "window {s:?} needs four values"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExposureStatus {
    Idle,
    Exposing,
    Readout,
}

impl Display for ExposureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExposureStatus::Idle => "idle",
            ExposureStatus::Exposing => "exposing",
            ExposureStatus::Readout => "readout",
        })
    }
}

/// Shared exposure status, cheap to clone.
#[derive(Debug, Clone)]
pub struct ExposureState(Arc<Mutex<ExposureStatus>>);

impl Default for ExposureState {
    fn default() -> Self {
        Self(Arc::new(Mutex::new(ExposureStatus::Idle)))
    }
}

impl ExposureState {
    pub fn get(&self) -> ExposureStatus {
        *self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set(&self, status: ExposureStatus) {
        let mut cur = self.0.lock().unwrap_or_else(|e| e.into_inner());
        if *cur != status {
            log::debug!("Changing exposure status from {} to {}.", *cur, status);
            *cur = status;
        }
    }

    /// Move from idle to exposing; fails if an exposure is already running.
    pub(crate) fn begin(&self) -> Result<()> {
        let mut cur = self.0.lock().unwrap_or_else(|e| e.into_inner());
        if *cur != ExposureStatus::Idle {
            return Err(Error::ExposureInProgress);
        }
        *cur = ExposureStatus::Exposing;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoolingStatus {
    pub enabled: bool,
    /// Degrees Celsius.
    pub setpoint: f64,
    /// Percent.
    pub power: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Int8,
    Int16,
    Rgb24,
}

impl ImageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Int8 => "int8",
            ImageFormat::Int16 => "int16",
            ImageFormat::Rgb24 => "rgb24",
        }
    }
}

impl Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "int8" => Ok(ImageFormat::Int8),
            "int16" => Ok(ImageFormat::Int16),
            "rgb24" => Ok(ImageFormat::Rgb24),
            _ => Err(Error::InvalidValue(format!("unknown image format {s:?}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageType {
    #[default]
    Object,
    Bias,
    Dark,
    Flat,
    SkyFlat,
    Acquisition,
    Focus,
}

impl ImageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageType::Object => "object",
            ImageType::Bias => "bias",
            ImageType::Dark => "dark",
            ImageType::Flat => "flat",
            ImageType::SkyFlat => "skyflat",
            ImageType::Acquisition => "acquisition",
            ImageType::Focus => "focus",
        }
    }

    pub fn opens_shutter(&self) -> bool {
        !matches!(self, ImageType::Bias | ImageType::Dark)
    }
}

impl Display for ImageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.to_lowercase().as_str() {
            "object" => ImageType::Object,
            "bias" => ImageType::Bias,
            "dark" => ImageType::Dark,
            "flat" => ImageType::Flat,
            "skyflat" => ImageType::SkyFlat,
            "acquisition" => ImageType::Acquisition,
            "focus" => ImageType::Focus,
            _ => return Err(Error::InvalidValue(format!("unknown image type {s:?}"))),
        })
    }
}
