use std::{fmt, sync::Arc};

use log::warn;

use crate::{
    driver::AsiDriver,
    zwo_ffi_wrapper::{ASIControlType, AsiError},
};

/// An open, initialised camera.
///
/// Shared through `Arc` between the camera object and housekeeping handles.
/// Dropping the last reference stops any running exposure and closes the camera.
pub(crate) struct AsiHandle {
    id: i32,
    driver: Arc<dyn AsiDriver>,
}

impl AsiHandle {
    /// Open and initialise camera `id`.
    pub(crate) fn open(driver: Arc<dyn AsiDriver>, id: i32) -> Result<Self, AsiError> {
        driver.open_camera(id)?;
        // constructed before init so a failed init still closes the camera
        let handle = Self { id, driver };
        handle.driver.init_camera(id)?;
        Ok(handle)
    }

    pub(crate) fn id(&self) -> i32 {
        self.id
    }

    pub(crate) fn driver(&self) -> &dyn AsiDriver {
        self.driver.as_ref()
    }

    pub(crate) fn get(&self, ctrl: ASIControlType) -> Result<i64, AsiError> {
        Ok(self.driver.control_value(self.id, ctrl)?.0)
    }

    pub(crate) fn set(&self, ctrl: ASIControlType, value: i64) -> Result<(), AsiError> {
        self.driver.set_control_value(self.id, ctrl, value, false)
    }
}

impl fmt::Debug for AsiHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsiHandle").field("id", &self.id).finish()
    }
}

impl Drop for AsiHandle {
    fn drop(&mut self) {
        if let Err(e) = self.driver.stop_exposure(self.id) {
            warn!("Failed to stop exposure: {e:?}");
        }
        if let Err(e) = self.driver.close_camera(self.id) {
            warn!("Failed to close camera: {e:?}");
        }
    }
}
