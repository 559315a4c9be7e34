//! Simulated SDK for tests.

use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
};

use crate::{
    driver::AsiDriver,
    zwo_ffi_wrapper::{
        ASIBayerPattern, ASIControlType, ASIExposureStatus, ASIImageFormat, AsiError, CameraProps,
        ControlCaps, RoiFormat,
    },
};

#[derive(Debug, Clone)]
pub(crate) struct SimCamera {
    pub props: CameraProps,
    pub caps: Vec<ControlCaps>,
}

#[derive(Debug, Default)]
struct SimState {
    cameras: Vec<SimCamera>,
    open: HashSet<i32>,
    values: HashMap<(i32, ASIControlType), i64>,
    writes: Vec<(ASIControlType, i64)>,
    roi: HashMap<i32, RoiFormat>,
    start: HashMap<i32, (i32, i32)>,
    status: HashMap<i32, ASIExposureStatus>,
    working_polls: u32,
    polls_left: u32,
    dark_flags: Vec<bool>,
    stops: u32,
    dark_subtract_disabled: bool,
    video_stopped: bool,
    fail_init: bool,
    fail_exposure: bool,
}

/// In-memory stand-in for the ASI SDK. Camera IDs equal their index.
pub(crate) struct SimDriver {
    state: Mutex<SimState>,
}

fn cap(control: ASIControlType, min: i64, max: i64, default: i64, writable: bool) -> ControlCaps {
    ControlCaps {
        control,
        name: format!("{control:?}"),
        description: String::new(),
        min_value: min,
        max_value: max,
        default_value: default,
        is_auto_supported: false,
        is_writable: writable,
    }
}

impl SimDriver {
    pub fn with_cameras(cameras: Vec<SimCamera>) -> Self {
        let mut state = SimState {
            working_polls: 3,
            ..Default::default()
        };
        for (idx, mut cam) in cameras.into_iter().enumerate() {
            let id = idx as i32;
            cam.props.id = id;
            for c in &cam.caps {
                state.values.insert((id, c.control), c.default_value);
            }
            state.values.insert((id, ASIControlType::Temperature), 215);
            state.roi.insert(
                id,
                RoiFormat {
                    width: cam.props.max_width as _,
                    height: cam.props.max_height as _,
                    bin: 1,
                    fmt: ASIImageFormat::ImageRAW8,
                },
            );
            state.cameras.push(cam);
        }
        Self {
            state: Mutex::new(state),
        }
    }

    /// Cooled mono camera.
    pub fn mono() -> SimCamera {
        use ASIControlType::*;
        SimCamera {
            props: CameraProps {
                name: "ZWO ASI1600MM Pro".into(),
                id: 0,
                max_width: 4656,
                max_height: 3520,
                is_color_cam: false,
                bayer_pattern: None,
                supported_bins: vec![1, 2, 3, 4],
                supported_formats: vec![ASIImageFormat::ImageRAW8, ASIImageFormat::ImageRAW16],
                pixel_size: 3.8,
                mechanical_shutter: false,
                st4_port: false,
                is_cooler_cam: true,
                is_usb3_host: true,
                is_usb3_camera: true,
                e_per_adu: 0.2,
                bit_depth: 12,
                is_trigger_cam: false,
            },
            caps: vec![
                cap(Gain, 0, 300, 0, true),
                cap(Exposure, 32, 2_000_000_000, 10_000, true),
                cap(Offset, 0, 80, 10, true),
                cap(Flip, 0, 3, 0, true),
                cap(BWOvld, 40, 100, 50, true),
                cap(Temperature, -500, 1000, 20, false),
                cap(CoolerPowerPercent, 0, 100, 0, false),
                cap(TargetTemp, -40, 30, 0, true),
                cap(CoolerOn, 0, 1, 0, true),
            ],
        }
    }

    /// Uncooled colour camera.
    pub fn color() -> SimCamera {
        use ASIControlType::*;
        SimCamera {
            props: CameraProps {
                name: "ZWO ASI294MC".into(),
                id: 0,
                max_width: 4144,
                max_height: 2822,
                is_color_cam: true,
                bayer_pattern: Some(ASIBayerPattern::BayerRG),
                supported_bins: vec![1, 2, 4],
                supported_formats: vec![
                    ASIImageFormat::ImageRAW8,
                    ASIImageFormat::ImageRGB24,
                    ASIImageFormat::ImageRAW16,
                    ASIImageFormat::ImageY8,
                ],
                pixel_size: 4.63,
                mechanical_shutter: false,
                st4_port: true,
                is_cooler_cam: false,
                is_usb3_host: true,
                is_usb3_camera: true,
                e_per_adu: 3.9,
                bit_depth: 14,
                is_trigger_cam: false,
            },
            caps: vec![
                cap(Gain, 0, 570, 200, true),
                cap(Exposure, 32, 2_000_000_000, 10_000, true),
                cap(Gamma, 1, 100, 50, true),
                cap(WhiteBalR, 1, 99, 52, true),
                cap(WhiteBalB, 1, 99, 95, true),
                cap(Offset, 0, 40, 8, true),
                cap(Flip, 0, 3, 0, true),
                cap(Temperature, -500, 1000, 20, false),
            ],
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimState> {
        self.state.lock().unwrap()
    }

    pub fn is_open(&self, id: i32) -> bool {
        self.lock().open.contains(&id)
    }

    pub fn fail_init(&self, fail: bool) {
        self.lock().fail_init = fail;
    }

    pub fn fail_exposure(&self, fail: bool) {
        self.lock().fail_exposure = fail;
    }

    /// Number of status polls that report "working" after a start.
    pub fn set_working_polls(&self, polls: u32) {
        self.lock().working_polls = polls;
    }

    pub fn value(&self, id: i32, ctrl: ASIControlType) -> Option<i64> {
        self.lock().values.get(&(id, ctrl)).copied()
    }

    pub fn set_value(&self, id: i32, ctrl: ASIControlType, value: i64) {
        self.lock().values.insert((id, ctrl), value);
    }

    pub fn writes(&self) -> Vec<(ASIControlType, i64)> {
        self.lock().writes.clone()
    }

    pub fn dark_flags(&self) -> Vec<bool> {
        self.lock().dark_flags.clone()
    }

    pub fn stops(&self) -> u32 {
        self.lock().stops
    }

    pub fn start(&self, id: i32) -> (i32, i32) {
        self.lock().start.get(&id).copied().unwrap_or_default()
    }

    pub fn roi(&self, id: i32) -> RoiFormat {
        self.lock().roi[&id]
    }

    pub fn prepared(&self) -> (bool, bool) {
        let state = self.lock();
        (state.dark_subtract_disabled, state.video_stopped)
    }

    fn camera(state: &SimState, id: i32) -> Result<&SimCamera, AsiError> {
        if !state.open.contains(&id) {
            return Err(AsiError::CameraClosed);
        }
        state.cameras.get(id as usize).ok_or(AsiError::InvalidId)
    }
}

/// Pixel value the simulator produces at `idx`.
pub(crate) fn sim_pixel(idx: usize) -> u16 {
    100 + (idx % 1000) as u16
}

impl AsiDriver for SimDriver {
    fn num_cameras(&self) -> i32 {
        self.lock().cameras.len() as _
    }

    fn camera_property(&self, index: i32) -> Result<CameraProps, AsiError> {
        self.lock()
            .cameras
            .get(index as usize)
            .map(|c| c.props.clone())
            .ok_or(AsiError::InvalidIndex)
    }

    fn open_camera(&self, id: i32) -> Result<(), AsiError> {
        let mut state = self.lock();
        if id < 0 || id as usize >= state.cameras.len() {
            return Err(AsiError::InvalidId);
        }
        state.open.insert(id);
        Ok(())
    }

    fn init_camera(&self, id: i32) -> Result<(), AsiError> {
        let state = self.lock();
        Self::camera(&state, id)?;
        if state.fail_init {
            return Err(AsiError::GeneralError);
        }
        Ok(())
    }

    fn close_camera(&self, id: i32) -> Result<(), AsiError> {
        self.lock().open.remove(&id);
        Ok(())
    }

    fn control_caps(&self, id: i32) -> Result<Vec<ControlCaps>, AsiError> {
        let state = self.lock();
        Ok(Self::camera(&state, id)?.caps.clone())
    }

    fn control_value(&self, id: i32, ctrl: ASIControlType) -> Result<(i64, bool), AsiError> {
        let state = self.lock();
        let cam = Self::camera(&state, id)?;
        if !cam.caps.iter().any(|c| c.control == ctrl) {
            return Err(AsiError::InvalidControlType);
        }
        Ok((state.values.get(&(id, ctrl)).copied().unwrap_or(0), false))
    }

    fn set_control_value(
        &self,
        id: i32,
        ctrl: ASIControlType,
        value: i64,
        _auto: bool,
    ) -> Result<(), AsiError> {
        let mut state = self.lock();
        let cam = Self::camera(&state, id)?;
        let cap = cam
            .caps
            .iter()
            .find(|c| c.control == ctrl)
            .ok_or(AsiError::InvalidControlType)?;
        if !cap.is_writable {
            return Err(AsiError::InvalidControlType);
        }
        let value = value.clamp(cap.min_value, cap.max_value);
        if ctrl == ASIControlType::CoolerOn {
            let power = if value == 1 { 42 } else { 0 };
            state
                .values
                .insert((id, ASIControlType::CoolerPowerPercent), power);
        }
        state.values.insert((id, ctrl), value);
        state.writes.push((ctrl, value));
        Ok(())
    }

    fn roi_format(&self, id: i32) -> Result<RoiFormat, AsiError> {
        let state = self.lock();
        Self::camera(&state, id)?;
        Ok(state.roi[&id])
    }

    fn set_roi_format(&self, id: i32, roi: RoiFormat) -> Result<(), AsiError> {
        let mut state = self.lock();
        let props = &Self::camera(&state, id)?.props;
        if roi.width % 8 != 0 || roi.height % 2 != 0 || roi.width <= 0 || roi.height <= 0 {
            return Err(AsiError::InvalidSize);
        }
        if !props.supported_bins.contains(&(roi.bin as u32)) {
            return Err(AsiError::InvalidSize);
        }
        if roi.width * roi.bin > props.max_width as i32
            || roi.height * roi.bin > props.max_height as i32
        {
            return Err(AsiError::InvalidSize);
        }
        if !props.supported_formats.contains(&roi.fmt) {
            return Err(AsiError::InvalidImageType);
        }
        state.roi.insert(id, roi);
        state.start.insert(id, (0, 0));
        Ok(())
    }

    fn start_pos(&self, id: i32) -> Result<(i32, i32), AsiError> {
        let state = self.lock();
        Self::camera(&state, id)?;
        Ok(state.start.get(&id).copied().unwrap_or_default())
    }

    fn set_start_pos(&self, id: i32, x: i32, y: i32) -> Result<(), AsiError> {
        let mut state = self.lock();
        let props = &Self::camera(&state, id)?.props;
        let roi = state.roi[&id];
        if x < 0
            || y < 0
            || (x + roi.width) * roi.bin > props.max_width as i32
            || (y + roi.height) * roi.bin > props.max_height as i32
        {
            return Err(AsiError::OutOfBounds);
        }
        state.start.insert(id, (x, y));
        Ok(())
    }

    fn start_exposure(&self, id: i32, is_dark: bool) -> Result<(), AsiError> {
        let mut state = self.lock();
        Self::camera(&state, id)?;
        if state.status.get(&id) == Some(&ASIExposureStatus::Working) {
            return Err(AsiError::ExposureInProgress);
        }
        state.dark_flags.push(is_dark);
        state.polls_left = state.working_polls;
        state.status.insert(id, ASIExposureStatus::Working);
        Ok(())
    }

    fn stop_exposure(&self, id: i32) -> Result<(), AsiError> {
        let mut state = self.lock();
        state.stops += 1;
        if state.status.get(&id) == Some(&ASIExposureStatus::Working) {
            state.status.insert(id, ASIExposureStatus::Failed);
        }
        Ok(())
    }

    fn exposure_status(&self, id: i32) -> Result<ASIExposureStatus, AsiError> {
        let mut state = self.lock();
        Self::camera(&state, id)?;
        let status = state
            .status
            .get(&id)
            .copied()
            .unwrap_or(ASIExposureStatus::Idle);
        if status != ASIExposureStatus::Working {
            return Ok(status);
        }
        if state.polls_left > 0 {
            state.polls_left -= 1;
            return Ok(ASIExposureStatus::Working);
        }
        let done = if state.fail_exposure {
            ASIExposureStatus::Failed
        } else {
            ASIExposureStatus::Success
        };
        state.status.insert(id, done);
        Ok(done)
    }

    fn data_after_exposure(&self, id: i32, buf: &mut [u8]) -> Result<(), AsiError> {
        let mut state = self.lock();
        Self::camera(&state, id)?;
        let roi = state.roi[&id];
        if buf.len() < roi.buffer_size() {
            return Err(AsiError::BufferTooSmall);
        }
        if state.status.get(&id) != Some(&ASIExposureStatus::Success) {
            return Err(AsiError::GeneralError);
        }
        match roi.fmt {
            ASIImageFormat::ImageRAW8 | ASIImageFormat::ImageY8 => {
                for (i, b) in buf.iter_mut().enumerate() {
                    *b = (sim_pixel(i) % 256) as u8;
                }
            }
            ASIImageFormat::ImageRAW16 => {
                for (i, px) in buf.chunks_exact_mut(2).enumerate() {
                    px.copy_from_slice(&sim_pixel(i).to_ne_bytes());
                }
            }
            ASIImageFormat::ImageRGB24 => {
                // BGR
                for px in buf.chunks_exact_mut(3) {
                    px.copy_from_slice(&[30, 20, 10]);
                }
            }
        }
        state.status.insert(id, ASIExposureStatus::Idle);
        Ok(())
    }

    fn stop_video_capture(&self, id: i32) -> Result<(), AsiError> {
        let mut state = self.lock();
        Self::camera(&state, id)?;
        state.video_stopped = true;
        Ok(())
    }

    fn disable_dark_subtract(&self, id: i32) -> Result<(), AsiError> {
        let mut state = self.lock();
        Self::camera(&state, id)?;
        state.dark_subtract_disabled = true;
        Ok(())
    }

    fn sdk_version(&self) -> String {
        "1, 31, 0, 0".to_owned()
    }
}
