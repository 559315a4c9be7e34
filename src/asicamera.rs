use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::sleep,
    time::Duration,
};

use chrono::Utc;
use log::{debug, info, warn};

use crate::{
    asihandle::AsiHandle,
    driver::{find_camera, list_cameras, AsiDriver},
    error::{Error, Result},
    image::{Image, PixelData},
    interfaces::{
        BinningControl, Camera, ExposureState, ExposureStatus, ImageFormat, ImageFormatControl,
        Window, WindowControl,
    },
    zwo_ffi_wrapper::{
        ASIControlType, ASIExposureStatus, ASIImageFormat, CameraProps, ControlCaps, RoiFormat,
    },
};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Control values written when a camera is opened.
const DEFAULT_CONTROLS: &[(ASIControlType, i64)] = &[
    (ASIControlType::Gain, 150),
    (ASIControlType::WhiteBalB, 99),
    (ASIControlType::WhiteBalR, 75),
    (ASIControlType::Gamma, 50),
    (ASIControlType::Offset, 50),
    (ASIControlType::Flip, 0),
];

fn to_asi_format(fmt: ImageFormat) -> ASIImageFormat {
    match fmt {
        ImageFormat::Int8 => ASIImageFormat::ImageRAW8,
        ImageFormat::Int16 => ASIImageFormat::ImageRAW16,
        ImageFormat::Rgb24 => ASIImageFormat::ImageRGB24,
    }
}

fn from_asi_format(fmt: ASIImageFormat) -> ImageFormat {
    match fmt {
        ASIImageFormat::ImageRAW8 | ASIImageFormat::ImageY8 => ImageFormat::Int8,
        ASIImageFormat::ImageRAW16 => ImageFormat::Int16,
        ASIImageFormat::ImageRGB24 => ImageFormat::Rgb24,
    }
}

/// A ZWO ASI camera.
///
/// Implements [`Camera`], [`WindowControl`], [`BinningControl`] and
/// [`ImageFormatControl`]. The window is kept in unbinned pixels and applied
/// to the camera at the start of every exposure.
#[derive(Debug)]
pub struct AsiCamera {
    handle: Arc<AsiHandle>,
    props: CameraProps,
    caps: HashMap<ASIControlType, ControlCaps>,
    window: Window,
    binning: u32,
    image_format: ImageFormat,
}

impl AsiCamera {
    /// Open the first connected camera called `camera_name`.
    ///
    /// Applies default gain, white balance, gamma, offset and flip, selects
    /// 16-bit readout when available and reads the initial window and binning
    /// from the camera.
    ///
    /// # Errors
    ///  - [`Error::NoCamerasAvailable`] - No cameras are connected.
    ///  - [`Error::CameraNotFound`] - No connected camera has this name.
    pub fn open(driver: Arc<dyn AsiDriver>, camera_name: &str) -> Result<Self> {
        if driver.num_cameras() <= 0 {
            return Err(Error::NoCamerasAvailable);
        }
        let cameras = list_cameras(driver.as_ref());
        debug!("Found cameras: {cameras:?}");
        if !cameras.iter().any(|c| c == camera_name) {
            return Err(Error::CameraNotFound(camera_name.to_owned()));
        }
        let props = find_camera(driver.as_ref(), camera_name)
            .ok_or_else(|| Error::CameraNotFound(camera_name.to_owned()))?;

        info!("Opening camera {} (ID {})...", props.name, props.id);
        let handle = Arc::new(AsiHandle::open(driver, props.id)?);
        info!("Camera info:");
        for (key, val) in props.describe() {
            info!("  - {key}: {val}");
        }

        let caps = handle
            .driver()
            .control_caps(handle.id())?
            .into_iter()
            .map(|c| (c.control, c))
            .collect();

        let mut cam = Self {
            handle,
            props,
            caps,
            window: Window::new(0, 0, 0, 0),
            binning: 1,
            image_format: ImageFormat::Int16,
        };
        cam.apply_defaults()?;

        let (driver, id) = (cam.handle.driver(), cam.handle.id());
        driver.stop_video_capture(id)?;
        driver.stop_exposure(id)?;

        let roi = driver.roi_format(id)?;
        let (x, y) = driver.start_pos(id)?;
        let bin = roi.bin.max(1);
        cam.binning = bin as _;
        cam.window = Window::new(
            (x * bin) as _,
            (y * bin) as _,
            (roi.width * bin) as _,
            (roi.height * bin) as _,
        );
        cam.image_format = from_asi_format(roi.fmt);
        info!(
            "Initial window {} with binning {}x{}, format {}.",
            cam.window, cam.binning, cam.binning, cam.image_format
        );
        Ok(cam)
    }

    fn apply_defaults(&self) -> Result<()> {
        let (driver, id) = (self.handle.driver(), self.handle.id());
        driver.disable_dark_subtract(id)?;
        for (ctrl, value) in DEFAULT_CONTROLS {
            match self.caps.get(ctrl) {
                Some(cap) if cap.is_writable => {
                    let value = (*value).clamp(cap.min_value, cap.max_value);
                    debug!("Setting {ctrl:?} to {value}");
                    self.handle.set(*ctrl, value)?;
                }
                _ => debug!("Camera has no writable {ctrl:?} control"),
            }
        }
        if self
            .props
            .supported_formats
            .contains(&ASIImageFormat::ImageRAW16)
        {
            let roi = driver.roi_format(id)?;
            driver.set_roi_format(
                id,
                RoiFormat {
                    fmt: ASIImageFormat::ImageRAW16,
                    ..roi
                },
            )?;
        }
        Ok(())
    }

    pub fn props(&self) -> &CameraProps {
        &self.props
    }

    /// Caps of the control `ctrl`, if the camera has it.
    pub fn control_caps(&self, ctrl: ASIControlType) -> Option<&ControlCaps> {
        self.caps.get(&ctrl)
    }

    pub(crate) fn handle(&self) -> &Arc<AsiHandle> {
        &self.handle
    }

    fn download(&self, roi: &RoiFormat) -> Result<(Vec<usize>, PixelData)> {
        let (driver, id) = (self.handle.driver(), self.handle.id());
        let (w, h) = (roi.width.max(0) as usize, roi.height.max(0) as usize);
        let size = roi.buffer_size();
        debug!("Downloading {size} bytes ({w}x{h}, {:?})", roi.fmt);
        Ok(match roi.fmt {
            ASIImageFormat::ImageRAW8 | ASIImageFormat::ImageY8 => {
                let mut buf = vec![0u8; size];
                driver.data_after_exposure(id, &mut buf)?;
                (vec![h, w], PixelData::U8(buf))
            }
            ASIImageFormat::ImageRAW16 => {
                let mut buf = vec![0u16; size / 2];
                driver.data_after_exposure(id, bytemuck::cast_slice_mut(&mut buf))?;
                (vec![h, w], PixelData::U16(buf))
            }
            ASIImageFormat::ImageRGB24 => {
                let mut buf = vec![0u8; size];
                driver.data_after_exposure(id, &mut buf)?;
                // interleaved BGR to planar RGB
                let n = w * h;
                let mut planes = vec![0u8; 3 * n];
                for (i, px) in buf.chunks_exact(3).enumerate() {
                    planes[i] = px[2];
                    planes[n + i] = px[1];
                    planes[2 * n + i] = px[0];
                }
                (vec![3, h, w], PixelData::U8(planes))
            }
        })
    }
}

impl Camera for AsiCamera {
    fn name(&self) -> &str {
        &self.props.name
    }

    fn expose(
        &self,
        exposure_time: Duration,
        open_shutter: bool,
        abort: &AtomicBool,
        status: &ExposureState,
    ) -> Result<Image> {
        let (driver, id) = (self.handle.driver(), self.handle.id());
        let fmt = to_asi_format(self.image_format);

        // binned size, rounded to what the SDK accepts
        let bin = self.binning.max(1);
        let width = (self.window.width / bin) / 8 * 8;
        let height = (self.window.height / bin) / 2 * 2;
        if width == 0 || height == 0 {
            return Err(Error::OutOfBounds(format!(
                "window {} too small for binning {bin}",
                self.window
            )));
        }
        info!(
            "Set window to {}x{} (binned {}x{} with {}x{}) at {},{}.",
            self.window.width,
            self.window.height,
            width,
            height,
            bin,
            bin,
            self.window.left,
            self.window.top
        );
        driver.set_roi_format(
            id,
            RoiFormat {
                width: width as _,
                height: height as _,
                bin: bin as _,
                fmt,
            },
        )?;
        driver.set_start_pos(id, (self.window.left / bin) as _, (self.window.top / bin) as _)?;
        self.handle
            .set(ASIControlType::Exposure, exposure_time.as_micros() as _)?;

        info!(
            "Starting exposure with {} shutter for {:.2} seconds...",
            if open_shutter { "open" } else { "closed" },
            exposure_time.as_secs_f64()
        );
        let date_obs = Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string();
        driver.start_exposure(id, !open_shutter)?;
        sleep(POLL_INTERVAL);

        let stat = loop {
            let stat = driver.exposure_status(id)?;
            if stat != ASIExposureStatus::Working {
                break stat;
            }
            if abort.load(Ordering::SeqCst) {
                if let Err(e) = driver.stop_exposure(id) {
                    warn!("Failed to stop exposure: {e:?}");
                }
                status.set(ExposureStatus::Idle);
                return Err(Error::Aborted);
            }
            sleep(POLL_INTERVAL);
        };
        if stat != ASIExposureStatus::Success {
            return Err(Error::GrabImage(format!("Could not capture image: {stat}")));
        }

        info!("Exposure finished, reading out...");
        status.set(ExposureStatus::Readout);
        let roi = driver.roi_format(id)?;
        let (shape, data) = self.download(&roi)?;
        let mut image = Image::new(shape, data)?;

        let (min, max, mean) = image.stats();
        let hdr = &mut image.header;
        hdr.set("DATE-OBS", date_obs, "Date and time of start of exposure");
        hdr.set("EXPTIME", exposure_time.as_secs_f64(), "Exposure time [s]");
        hdr.set("INSTRUME", self.props.name.as_str(), "Name of instrument");
        for key in ["XBINNING", "DET-BIN1"] {
            hdr.set(key, bin, "Binning factor used on X axis");
        }
        for key in ["YBINNING", "DET-BIN2"] {
            hdr.set(key, bin, "Binning factor used on Y axis");
        }
        hdr.set("XORGSUBF", self.window.left, "Subframe origin on X axis");
        hdr.set("YORGSUBF", self.window.top, "Subframe origin on Y axis");
        hdr.set("DATAMIN", min, "Minimum data value");
        hdr.set("DATAMAX", max, "Maximum data value");
        hdr.set("DATAMEAN", mean, "Mean data value");
        hdr.set(
            "DET-PIXL",
            self.props.pixel_size / 1000.0,
            "Size of detector pixels (square) [mm]",
        );
        hdr.set("DET-GAIN", self.props.e_per_adu, "Detector gain [e-/ADU]");
        if matches!(
            roi.fmt,
            ASIImageFormat::ImageRAW8 | ASIImageFormat::ImageRAW16
        ) {
            if let Some(pattern) = self.props.bayer_pattern {
                for key in ["BAYERPAT", "COLORTYP"] {
                    hdr.set(key, pattern.as_fits_str(), "Bayer pattern for colors");
                }
            }
        }
        image.set_biassec_trimsec(
            self.window.left as _,
            self.window.top as _,
            (width * bin) as _,
            (height * bin) as _,
        );

        info!("Readout finished.");
        Ok(image)
    }

    fn abort_exposure(&self) -> Result<()> {
        self.handle.driver().stop_exposure(self.handle.id())?;
        Ok(())
    }
}

impl WindowControl for AsiCamera {
    fn get_full_frame(&self) -> Window {
        Window::new(0, 0, self.props.max_width, self.props.max_height)
    }

    fn get_window(&self) -> Window {
        self.window
    }

    fn set_window(&mut self, window: Window) -> Result<()> {
        let full = self.get_full_frame();
        let exceeds = |offset: u32, size: u32, limit: u32| {
            offset.checked_add(size).map_or(true, |end| end > limit)
        };
        if window.width == 0
            || window.height == 0
            || exceeds(window.left, window.width, full.width)
            || exceeds(window.top, window.height, full.height)
        {
            return Err(Error::OutOfBounds(format!(
                "window {window} outside of full frame {full}"
            )));
        }
        info!(
            "Setting window to {}x{} at {},{}...",
            window.width, window.height, window.left, window.top
        );
        self.window = window;
        Ok(())
    }
}

impl BinningControl for AsiCamera {
    fn get_binning(&self) -> (u32, u32) {
        (self.binning, self.binning)
    }

    fn set_binning(&mut self, x: u32, y: u32) -> Result<()> {
        if x != y {
            return Err(Error::InvalidValue(format!(
                "binning {x}x{y} is not symmetric"
            )));
        }
        if !self.props.supported_bins.contains(&x) {
            return Err(Error::InvalidValue(format!("binning {x}x{y} not supported")));
        }
        info!("Setting binning to {x}x{x}...");
        self.binning = x;
        Ok(())
    }

    fn list_binnings(&self) -> Vec<(u32, u32)> {
        self.props.supported_bins.iter().map(|b| (*b, *b)).collect()
    }
}

impl ImageFormatControl for AsiCamera {
    fn get_image_format(&self) -> ImageFormat {
        self.image_format
    }

    fn set_image_format(&mut self, format: ImageFormat) -> Result<()> {
        if !self.list_image_formats().contains(&format) {
            return Err(Error::InvalidValue("Unsupported image format.".to_owned()));
        }
        info!("Setting image format to {format}...");
        self.image_format = format;
        Ok(())
    }

    fn list_image_formats(&self) -> Vec<ImageFormat> {
        [ImageFormat::Int8, ImageFormat::Int16, ImageFormat::Rgb24]
            .into_iter()
            .filter(|f| self.props.supported_formats.contains(&to_asi_format(*f)))
            .collect()
    }
}
