use crate::zwo_ffi_wrapper::{
    ASIControlType, ASIExposureStatus, AsiError, CameraProps, ControlCaps, RoiFormat,
};

/// Access to the ASI SDK, one call per SDK function.
///
/// Camera IDs are the `CameraID` values reported by [`AsiDriver::camera_property`],
/// not the enumeration index.
pub trait AsiDriver: Send + Sync {
    fn num_cameras(&self) -> i32;
    fn camera_property(&self, index: i32) -> Result<CameraProps, AsiError>;
    fn open_camera(&self, id: i32) -> Result<(), AsiError>;
    fn init_camera(&self, id: i32) -> Result<(), AsiError>;
    fn close_camera(&self, id: i32) -> Result<(), AsiError>;
    /// Caps of every control the camera exposes; unknown control types are left out.
    fn control_caps(&self, id: i32) -> Result<Vec<ControlCaps>, AsiError>;
    /// Returns the value and whether the control is in auto mode.
    fn control_value(&self, id: i32, ctrl: ASIControlType) -> Result<(i64, bool), AsiError>;
    fn set_control_value(
        &self,
        id: i32,
        ctrl: ASIControlType,
        value: i64,
        auto: bool,
    ) -> Result<(), AsiError>;
    fn roi_format(&self, id: i32) -> Result<RoiFormat, AsiError>;
    fn set_roi_format(&self, id: i32, roi: RoiFormat) -> Result<(), AsiError>;
    /// Start position in binned pixels.
    fn start_pos(&self, id: i32) -> Result<(i32, i32), AsiError>;
    fn set_start_pos(&self, id: i32, x: i32, y: i32) -> Result<(), AsiError>;
    fn start_exposure(&self, id: i32, is_dark: bool) -> Result<(), AsiError>;
    fn stop_exposure(&self, id: i32) -> Result<(), AsiError>;
    fn exposure_status(&self, id: i32) -> Result<ASIExposureStatus, AsiError>;
    fn data_after_exposure(&self, id: i32, buf: &mut [u8]) -> Result<(), AsiError>;
    fn stop_video_capture(&self, id: i32) -> Result<(), AsiError>;
    fn disable_dark_subtract(&self, id: i32) -> Result<(), AsiError>;
    fn sdk_version(&self) -> String;
}

/// Names of all connected cameras, in index order.
///
/// Cameras whose properties cannot be read are skipped with a warning.
pub fn list_cameras(driver: &dyn AsiDriver) -> Vec<String> {
    (0..driver.num_cameras())
        .filter_map(|idx| match driver.camera_property(idx) {
            Ok(props) => Some(props.name),
            Err(e) => {
                log::warn!("Failed to get camera property for {idx}: {e:?}");
                None
            }
        })
        .collect()
}

/// Properties of the first connected camera called `name`.
pub(crate) fn find_camera(driver: &dyn AsiDriver, name: &str) -> Option<CameraProps> {
    (0..driver.num_cameras())
        .filter_map(|idx| driver.camera_property(idx).ok())
        .find(|props| props.name == name)
}
