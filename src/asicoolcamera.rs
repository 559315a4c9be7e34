use std::{
    collections::BTreeMap,
    sync::{atomic::AtomicBool, Arc},
    time::Duration,
};

use log::info;

use crate::{
    asicamera::AsiCamera,
    asihandle::AsiHandle,
    driver::AsiDriver,
    error::{Error, Result},
    image::Image,
    interfaces::{
        BinningControl, Camera, Cooling, CoolingStatus, ExposureState, ImageFormat,
        ImageFormatControl, Window, WindowControl,
    },
    zwo_ffi_wrapper::ASIControlType,
};

const SETPOINT_RANGE: std::ops::RangeInclusive<f64> = -80.0..=20.0;

/// Cooling controls of an open camera.
///
/// Cheap to clone and safe to use from a housekeeping thread while the
/// camera is exposing.
#[derive(Debug, Clone)]
pub struct CoolingHandle {
    handle: Arc<AsiHandle>,
}

impl Cooling for CoolingHandle {
    fn get_cooling_status(&self) -> Result<CoolingStatus> {
        Ok(CoolingStatus {
            enabled: self.handle.get(ASIControlType::CoolerOn)? != 0,
            setpoint: self.handle.get(ASIControlType::TargetTemp)? as f64,
            power: self.handle.get(ASIControlType::CoolerPowerPercent)? as f64,
        })
    }

    fn get_temperatures(&self) -> Result<BTreeMap<String, f64>> {
        let temp = self.handle.get(ASIControlType::Temperature)? as f64 / 10.0;
        Ok(BTreeMap::from([("CCD".to_owned(), temp)]))
    }

    /// Enable cooling at `setpoint` (°C, truncated to whole degrees) or disable it.
    ///
    /// # Errors
    ///  - [`Error::InvalidValue`] - Setpoint is outside of -80 °C to 20 °C.
    fn set_cooling(&self, enabled: bool, setpoint: f64) -> Result<()> {
        if enabled {
            if !SETPOINT_RANGE.contains(&setpoint) {
                return Err(Error::InvalidValue(format!(
                    "setpoint {setpoint} outside of {}..{} °C",
                    SETPOINT_RANGE.start(),
                    SETPOINT_RANGE.end()
                )));
            }
            info!("Enabling cooling with a setpoint of {setpoint:.2}°C...");
            self.handle
                .set(ASIControlType::TargetTemp, setpoint.trunc() as i64)?;
            self.handle.set(ASIControlType::CoolerOn, 1)?;
        } else {
            info!("Disabling cooling...");
            self.handle.set(ASIControlType::CoolerOn, 0)?;
        }
        Ok(())
    }
}

/// A ZWO ASI camera with a cooler.
#[derive(Debug)]
pub struct AsiCoolCamera {
    camera: AsiCamera,
    cooling: CoolingHandle,
}

impl AsiCoolCamera {
    /// Open the camera and start cooling to `setpoint`.
    ///
    /// # Errors
    ///  - [`Error::InvalidControlType`] - The camera has no cooler.
    ///  - Everything [`AsiCamera::open`] returns.
    pub fn open(driver: Arc<dyn AsiDriver>, camera_name: &str, setpoint: f64) -> Result<Self> {
        let camera = AsiCamera::open(driver, camera_name)?;
        if !camera.props().is_cooler_cam {
            return Err(Error::InvalidControlType(
                "Camera has no support for cooling.".to_owned(),
            ));
        }
        let cooling = CoolingHandle {
            handle: camera.handle().clone(),
        };
        cooling.set_cooling(true, setpoint)?;
        Ok(Self { camera, cooling })
    }

    pub fn camera(&self) -> &AsiCamera {
        &self.camera
    }

    pub fn cooling_handle(&self) -> CoolingHandle {
        self.cooling.clone()
    }
}

impl Cooling for AsiCoolCamera {
    fn get_cooling_status(&self) -> Result<CoolingStatus> {
        self.cooling.get_cooling_status()
    }

    fn get_temperatures(&self) -> Result<BTreeMap<String, f64>> {
        self.cooling.get_temperatures()
    }

    fn set_cooling(&self, enabled: bool, setpoint: f64) -> Result<()> {
        self.cooling.set_cooling(enabled, setpoint)
    }
}

impl Camera for AsiCoolCamera {
    fn name(&self) -> &str {
        self.camera.name()
    }

    fn expose(
        &self,
        exposure_time: Duration,
        open_shutter: bool,
        abort: &AtomicBool,
        status: &ExposureState,
    ) -> Result<Image> {
        let mut image = self
            .camera
            .expose(exposure_time, open_shutter, abort, status)?;
        let temps = self.get_temperatures()?;
        let cooling = self.get_cooling_status()?;
        let hdr = &mut image.header;
        if let Some(temp) = temps.get("CCD") {
            hdr.set("DET-TEMP", *temp, "Detector temperature [C]");
        }
        hdr.set("DET-COOL", cooling.power, "Cooler power [percent]");
        hdr.set("DET-TSET", cooling.setpoint, "Cooler setpoint [C]");
        Ok(image)
    }

    fn abort_exposure(&self) -> Result<()> {
        self.camera.abort_exposure()
    }
}

impl WindowControl for AsiCoolCamera {
    fn get_full_frame(&self) -> Window {
        self.camera.get_full_frame()
    }

    fn get_window(&self) -> Window {
        self.camera.get_window()
    }

    fn set_window(&mut self, window: Window) -> Result<()> {
        self.camera.set_window(window)
    }
}

impl BinningControl for AsiCoolCamera {
    fn get_binning(&self) -> (u32, u32) {
        self.camera.get_binning()
    }

    fn set_binning(&mut self, x: u32, y: u32) -> Result<()> {
        self.camera.set_binning(x, y)
    }

    fn list_binnings(&self) -> Vec<(u32, u32)> {
        self.camera.list_binnings()
    }
}

impl ImageFormatControl for AsiCoolCamera {
    fn get_image_format(&self) -> ImageFormat {
        self.camera.get_image_format()
    }

    fn set_image_format(&mut self, format: ImageFormat) -> Result<()> {
        self.camera.set_image_format(format)
    }

    fn list_image_formats(&self) -> Vec<ImageFormat> {
        self.camera.list_image_formats()
    }
}
