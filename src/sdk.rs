use std::{
    ffi::{c_long, c_uchar, CStr},
    fmt,
    path::{Path, PathBuf},
    sync::Mutex,
};

use lazy_static::lazy_static;
use libloading::Library;

use crate::{
    driver::AsiDriver,
    error::Error,
    zwo_ffi::*,
    zwo_ffi_wrapper::{
        ASIControlType, ASIExposureStatus, ASIImageFormat, AsiError, CameraProps, ControlCaps,
        RoiFormat,
    },
};

lazy_static! {
    /// The SDK is not re-entrant; every call goes through this lock.
    pub(crate) static ref SDK_LOCK: Mutex<()> = Mutex::new(());
}

macro_rules! ASICALL {
    ($sdk:expr, $func:ident($($arg:expr),*)) => {
        {
            let _guard = $crate::sdk::SDK_LOCK.lock().unwrap_or_else(|e| e.into_inner());
            #[allow(clippy::macro_metavars_in_unsafe)]
            let res = unsafe { ($sdk.$func)($($arg),*) };
            drop(_guard);
            if res != $crate::zwo_ffi_wrapper::AsiError::Success as _ {
                log::warn!("Error calling {}(): {:?}", stringify!($func), $crate::zwo_ffi_wrapper::AsiError::from(res));
                return Err($crate::zwo_ffi_wrapper::AsiError::from(res));
            }
        }
    };
}

/// The ASI SDK shared library, loaded at runtime.
pub struct AsiSdk {
    path: PathBuf,
    get_num_cameras: ASIGetNumOfConnectedCameras,
    get_camera_property: ASIGetCameraProperty,
    open_camera: ASIOpenCamera,
    init_camera: ASIInitCamera,
    close_camera: ASICloseCamera,
    get_num_controls: ASIGetNumOfControls,
    get_control_caps: ASIGetControlCaps,
    get_control_value: ASIGetControlValue,
    set_control_value: ASISetControlValue,
    set_roi_format: ASISetROIFormat,
    get_roi_format: ASIGetROIFormat,
    set_start_pos: ASISetStartPos,
    get_start_pos: ASIGetStartPos,
    start_exposure: ASIStartExposure,
    stop_exposure: ASIStopExposure,
    get_exp_status: ASIGetExpStatus,
    get_data_after_exp: ASIGetDataAfterExp,
    stop_video_capture: ASIStopVideoCapture,
    disable_dark_subtract: ASIDisableDarkSubtract,
    get_sdk_version: ASIGetSDKVersion,
    _lib: Library,
}

fn load_symbol<T: Copy>(lib: &Library, name: &str) -> Result<T, Error> {
    let cname = format!("{name}\0");
    match unsafe { lib.get::<T>(cname.as_bytes()) } {
        Ok(sym) => Ok(*sym),
        Err(e) => {
            log::error!("Failed to load ASI function '{name}': {e}");
            Err(Error::SdkSymbol(name.to_owned()))
        }
    }
}

impl AsiSdk {
    /// Load the SDK from `path` and resolve every function this crate uses.
    ///
    /// # Errors
    ///  - [`Error::SdkLoad`] - The library could not be opened.
    ///  - [`Error::SdkSymbol`] - A required function is missing from the library.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        log::debug!("Loading ASI SDK from {}", path.display());
        let lib = unsafe { Library::new(&path) }.map_err(|source| Error::SdkLoad {
            path: path.clone(),
            source,
        })?;
        let sdk = Self {
            get_num_cameras: load_symbol(&lib, "ASIGetNumOfConnectedCameras")?,
            get_camera_property: load_symbol(&lib, "ASIGetCameraProperty")?,
            open_camera: load_symbol(&lib, "ASIOpenCamera")?,
            init_camera: load_symbol(&lib, "ASIInitCamera")?,
            close_camera: load_symbol(&lib, "ASICloseCamera")?,
            get_num_controls: load_symbol(&lib, "ASIGetNumOfControls")?,
            get_control_caps: load_symbol(&lib, "ASIGetControlCaps")?,
            get_control_value: load_symbol(&lib, "ASIGetControlValue")?,
            set_control_value: load_symbol(&lib, "ASISetControlValue")?,
            set_roi_format: load_symbol(&lib, "ASISetROIFormat")?,
            get_roi_format: load_symbol(&lib, "ASIGetROIFormat")?,
            set_start_pos: load_symbol(&lib, "ASISetStartPos")?,
            get_start_pos: load_symbol(&lib, "ASIGetStartPos")?,
            start_exposure: load_symbol(&lib, "ASIStartExposure")?,
            stop_exposure: load_symbol(&lib, "ASIStopExposure")?,
            get_exp_status: load_symbol(&lib, "ASIGetExpStatus")?,
            get_data_after_exp: load_symbol(&lib, "ASIGetDataAfterExp")?,
            stop_video_capture: load_symbol(&lib, "ASIStopVideoCapture")?,
            disable_dark_subtract: load_symbol(&lib, "ASIDisableDarkSubtract")?,
            get_sdk_version: load_symbol(&lib, "ASIGetSDKVersion")?,
            path,
            _lib: lib,
        };
        log::info!(
            "Loaded ASI SDK {} from {}",
            sdk.sdk_version(),
            sdk.path.display()
        );
        Ok(sdk)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Debug for AsiSdk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsiSdk").field("path", &self.path).finish()
    }
}

impl AsiDriver for AsiSdk {
    fn num_cameras(&self) -> i32 {
        let _guard = SDK_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        unsafe { (self.get_num_cameras)() }
    }

    fn camera_property(&self, index: i32) -> Result<CameraProps, AsiError> {
        let mut info = ASI_CAMERA_INFO::default();
        ASICALL!(self, get_camera_property(&mut info, index));
        Ok(info.into())
    }

    fn open_camera(&self, id: i32) -> Result<(), AsiError> {
        ASICALL!(self, open_camera(id));
        Ok(())
    }

    fn init_camera(&self, id: i32) -> Result<(), AsiError> {
        ASICALL!(self, init_camera(id));
        Ok(())
    }

    fn close_camera(&self, id: i32) -> Result<(), AsiError> {
        ASICALL!(self, close_camera(id));
        Ok(())
    }

    fn control_caps(&self, id: i32) -> Result<Vec<ControlCaps>, AsiError> {
        let mut num_ctrl = 0;
        ASICALL!(self, get_num_controls(id, &mut num_ctrl));
        let mut caps = Vec::with_capacity(num_ctrl.max(0) as _);
        for i in 0..num_ctrl {
            let mut cap = ASI_CONTROL_CAPS::default();
            let res = {
                let _guard = SDK_LOCK.lock().unwrap_or_else(|e| e.into_inner());
                unsafe { (self.get_control_caps)(id, i, &mut cap) }
            };
            if res != AsiError::Success as _ {
                log::warn!(
                    "Error calling ASIGetControlCaps({id}, {i}): {:?}",
                    AsiError::from(res)
                );
                continue;
            }
            match ControlCaps::from_raw(&cap) {
                Some(cap) => caps.push(cap),
                None => log::debug!("Skipping unknown control type {}", cap.ControlType),
            }
        }
        Ok(caps)
    }

    fn control_value(&self, id: i32, ctrl: ASIControlType) -> Result<(i64, bool), AsiError> {
        let mut value: c_long = 0;
        let mut auto: ASI_BOOL = ASI_BOOL_ASI_FALSE;
        ASICALL!(self, get_control_value(id, ctrl as _, &mut value, &mut auto));
        Ok((value as _, auto == ASI_BOOL_ASI_TRUE))
    }

    fn set_control_value(
        &self,
        id: i32,
        ctrl: ASIControlType,
        value: i64,
        auto: bool,
    ) -> Result<(), AsiError> {
        let auto = if auto {
            ASI_BOOL_ASI_TRUE
        } else {
            ASI_BOOL_ASI_FALSE
        };
        ASICALL!(self, set_control_value(id, ctrl as _, value as c_long, auto));
        Ok(())
    }

    fn roi_format(&self, id: i32) -> Result<RoiFormat, AsiError> {
        let (mut width, mut height, mut bin, mut fmt) = (0, 0, 0, ASI_IMG_TYPE_ASI_IMG_END);
        ASICALL!(
            self,
            get_roi_format(id, &mut width, &mut height, &mut bin, &mut fmt)
        );
        let fmt = ASIImageFormat::from_raw(fmt).ok_or(AsiError::InvalidImageType)?;
        Ok(RoiFormat {
            width,
            height,
            bin,
            fmt,
        })
    }

    fn set_roi_format(&self, id: i32, roi: RoiFormat) -> Result<(), AsiError> {
        ASICALL!(
            self,
            set_roi_format(id, roi.width, roi.height, roi.bin, roi.fmt as _)
        );
        Ok(())
    }

    fn start_pos(&self, id: i32) -> Result<(i32, i32), AsiError> {
        let (mut x, mut y) = (0, 0);
        ASICALL!(self, get_start_pos(id, &mut x, &mut y));
        Ok((x, y))
    }

    fn set_start_pos(&self, id: i32, x: i32, y: i32) -> Result<(), AsiError> {
        ASICALL!(self, set_start_pos(id, x, y));
        Ok(())
    }

    fn start_exposure(&self, id: i32, is_dark: bool) -> Result<(), AsiError> {
        let is_dark = if is_dark {
            ASI_BOOL_ASI_TRUE
        } else {
            ASI_BOOL_ASI_FALSE
        };
        ASICALL!(self, start_exposure(id, is_dark));
        Ok(())
    }

    fn stop_exposure(&self, id: i32) -> Result<(), AsiError> {
        ASICALL!(self, stop_exposure(id));
        Ok(())
    }

    fn exposure_status(&self, id: i32) -> Result<ASIExposureStatus, AsiError> {
        let mut stat = ASI_EXPOSURE_STATUS_ASI_EXP_IDLE;
        ASICALL!(self, get_exp_status(id, &mut stat));
        ASIExposureStatus::from_raw(stat).ok_or(AsiError::GeneralError)
    }

    fn data_after_exposure(&self, id: i32, buf: &mut [u8]) -> Result<(), AsiError> {
        let ptr = buf.as_mut_ptr() as *mut c_uchar;
        let len = buf.len() as c_long;
        ASICALL!(self, get_data_after_exp(id, ptr, len));
        Ok(())
    }

    fn stop_video_capture(&self, id: i32) -> Result<(), AsiError> {
        ASICALL!(self, stop_video_capture(id));
        Ok(())
    }

    fn disable_dark_subtract(&self, id: i32) -> Result<(), AsiError> {
        ASICALL!(self, disable_dark_subtract(id));
        Ok(())
    }

    fn sdk_version(&self) -> String {
        let ptr = {
            let _guard = SDK_LOCK.lock().unwrap_or_else(|e| e.into_inner());
            unsafe { (self.get_sdk_version)() }
        };
        if ptr.is_null() {
            return "unknown".to_owned();
        }
        unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_library_reports_path() {
        let err = AsiSdk::load("/nonexistent/libASICamera2.so").unwrap_err();
        match err {
            Error::SdkLoad { path, .. } => {
                assert_eq!(path, PathBuf::from("/nonexistent/libASICamera2.so"))
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
