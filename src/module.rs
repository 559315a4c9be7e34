use std::{
    fs,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use chrono::{DateTime, Days, Timelike, Utc};
use chrono_tz::Tz;
use log::info;

use crate::{
    config::ModuleConfig,
    error::Result,
    filenames::FilenameFormatter,
    fits::write_fits,
    image::{HeaderValue, Image},
    interfaces::{Camera, ExposureState, ExposureStatus, ImageType, WindowControl},
};

/// Sets the abort flag of a running exposure. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn abort(&self) {
        info!("Aborting exposure...");
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Date of the observing night that `now` belongs to: the local date,
/// minus one day before local noon.
pub fn day_obs(now: DateTime<Utc>, tz: Tz) -> String {
    let local = now.with_timezone(&tz);
    let date = if local.hour() < 12 {
        local
            .date_naive()
            .checked_sub_days(Days::new(1))
            .unwrap_or(local.date_naive())
    } else {
        local.date_naive()
    };
    date.format("%Y-%m-%d").to_string()
}

/// Host-side duties around a camera: exposure status, abort, frame numbering,
/// site and static headers, flipping and FITS output.
pub struct CameraModule<C> {
    camera: C,
    config: ModuleConfig,
    tz: Tz,
    formatter: FilenameFormatter,
    frame_num: u64,
    status: ExposureState,
    abort: Arc<AtomicBool>,
}

impl<C: Camera + WindowControl> CameraModule<C> {
    pub fn new(camera: C, config: ModuleConfig) -> Result<Self> {
        let tz = config.tz()?;
        let formatter = FilenameFormatter::new(&config.filenames)?;
        Ok(Self {
            camera,
            config,
            tz,
            formatter,
            frame_num: 0,
            status: ExposureState::default(),
            abort: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn camera(&self) -> &C {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut C {
        &mut self.camera
    }

    pub fn config(&self) -> &ModuleConfig {
        &self.config
    }

    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle(self.abort.clone())
    }

    pub fn exposure_status(&self) -> ExposureStatus {
        self.status.get()
    }

    /// Shared status, for observers on other threads.
    pub fn status(&self) -> &ExposureState {
        &self.status
    }

    /// Take an image and add the module's headers.
    ///
    /// Bias frames are taken with zero exposure time; bias and dark frames
    /// keep the shutter closed. The status is back to idle on return.
    pub fn grab_image(&mut self, exposure_time: Duration, image_type: ImageType) -> Result<Image> {
        self.status.begin()?;
        self.abort.store(false, Ordering::SeqCst);

        let exposure_time = if image_type == ImageType::Bias {
            Duration::ZERO
        } else {
            exposure_time
        };
        let res = self.camera.expose(
            exposure_time,
            image_type.opens_shutter(),
            &self.abort,
            &self.status,
        );
        self.status.set(ExposureStatus::Idle);
        let mut image = res?;

        if self.config.flip {
            image.flip_rows();
        }
        self.frame_num += 1;
        self.add_headers(&mut image, image_type, Utc::now());
        Ok(image)
    }

    fn add_headers(&self, image: &mut Image, image_type: ImageType, now: DateTime<Utc>) {
        let hdr = &mut image.header;
        hdr.set("IMAGETYP", image_type.as_str(), "Image type");
        hdr.set("FRAMENUM", self.frame_num as i64, "Sequential frame number");
        hdr.set("DAY-OBS", day_obs(now, self.tz), "Night of observation");

        if let Some(loc) = &self.config.location {
            hdr.set("LATITUDE", loc.latitude, "Latitude of telescope [deg N]");
            hdr.set("LONGITUD", loc.longitude, "Longitude of telescope [deg E]");
            hdr.set("HEIGHT", loc.elevation, "Altitude of telescope [m]");
        }

        for (key, (value, comment)) in &self.config.fits_headers {
            hdr.set(key, value.clone(), comment);
        }

        let (cx, cy) = self.config.centre.unwrap_or_else(|| {
            let full = self.camera.get_full_frame();
            (
                full.left as f64 + full.width as f64 / 2.0,
                full.top as f64 + full.height as f64 / 2.0,
            )
        });
        hdr.set("DET-CPX1", cx, "x-pixel on mechanical axis in unbinned image");
        hdr.set("DET-CPX2", cy, "y-pixel on mechanical axis in unbinned image");
        let get = |key: &str| hdr.get(key).and_then(HeaderValue::as_f64);
        if let (Some(xorg), Some(yorg), Some(xbin), Some(ybin)) =
            (get("XORGSUBF"), get("YORGSUBF"), get("XBINNING"), get("YBINNING"))
        {
            let crpix1 = (cx - xorg) / xbin;
            let crpix2 = (cy - yorg) / ybin;
            hdr.set("CRPIX1", crpix1, "Reference x-pixel position in binned image");
            hdr.set("CRPIX2", crpix2, "Reference y-pixel position in binned image");
        }
        hdr.set(
            "DET-ROT",
            self.config.rotation,
            "Rotation of the detector [deg E of N]",
        );
    }

    /// Write `image` to the path given by the filename template.
    pub fn save_image(&self, image: &Image) -> Result<PathBuf> {
        let filename = self.formatter.format(&image.header)?;
        let path = self.config.output_path(&filename)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        write_fits(&path, image)?;
        info!("Saved image to {}.", path.display());
        Ok(path)
    }

    /// Grab an image and save it.
    pub fn expose(&mut self, exposure_time: Duration, image_type: ImageType) -> Result<PathBuf> {
        let image = self.grab_image(exposure_time, image_type)?;
        self.save_image(&image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        asicamera::AsiCamera,
        error::Error,
        image::PixelData,
        interfaces::Window,
        testing::{sim_pixel, SimDriver},
    };
    use chrono::TimeZone;

    fn module(extra: &str) -> (Arc<SimDriver>, CameraModule<AsiCamera>) {
        let sim = Arc::new(SimDriver::with_cameras(vec![SimDriver::mono()]));
        let mut cam = AsiCamera::open(sim.clone(), "ZWO ASI1600MM Pro").unwrap();
        cam.set_window(Window::new(0, 0, 64, 4)).unwrap();
        let config =
            ModuleConfig::from_yaml_str(&format!("camera: ZWO ASI1600MM Pro\n{extra}")).unwrap();
        (sim, CameraModule::new(cam, config).unwrap())
    }

    #[test]
    fn day_obs_switches_at_local_noon() {
        let berlin = chrono_tz::Europe::Berlin;
        let morning = Utc.with_ymd_and_hms(2024, 3, 10, 5, 0, 0).unwrap();
        let afternoon = Utc.with_ymd_and_hms(2024, 3, 10, 13, 0, 0).unwrap();
        assert_eq!(day_obs(morning, berlin), "2024-03-09");
        assert_eq!(day_obs(afternoon, berlin), "2024-03-10");
        // 11:30 UTC is already past noon in Berlin
        let late = Utc.with_ymd_and_hms(2024, 3, 1, 11, 30, 0).unwrap();
        assert_eq!(day_obs(late, berlin), "2024-03-01");
        assert_eq!(day_obs(late, Tz::UTC), "2024-02-29");
    }

    #[test]
    fn adds_module_headers() {
        let (_sim, mut module) = module(
            "fits_headers:\n  observer: ['Jane Doe', 'Observer']\nlocation: {longitude: 9.94, latitude: 51.56, elevation: 201}\nrotation: 12.5\ncentre: [32, 2]\n",
        );
        let img = module
            .grab_image(Duration::from_millis(20), ImageType::Object)
            .unwrap();
        let hdr = &img.header;
        assert_eq!(hdr.get("IMAGETYP"), Some(&"object".into()));
        assert_eq!(hdr.get("FRAMENUM"), Some(&HeaderValue::Int(1)));
        assert_eq!(hdr.get("OBSERVER"), Some(&"Jane Doe".into()));
        assert_eq!(hdr.get("LATITUDE"), Some(&HeaderValue::Float(51.56)));
        assert_eq!(hdr.get("HEIGHT"), Some(&HeaderValue::Float(201.0)));
        assert_eq!(hdr.get("DET-ROT"), Some(&HeaderValue::Float(12.5)));
        assert_eq!(hdr.get("DET-CPX1"), Some(&HeaderValue::Float(32.0)));
        assert_eq!(hdr.get("CRPIX2"), Some(&HeaderValue::Float(2.0)));
        assert!(hdr.contains("DAY-OBS"));
        assert_eq!(module.exposure_status(), ExposureStatus::Idle);

        let img = module
            .grab_image(Duration::from_millis(20), ImageType::Flat)
            .unwrap();
        assert_eq!(img.header.get("FRAMENUM"), Some(&HeaderValue::Int(2)));
    }

    #[test]
    fn centre_defaults_to_full_frame() {
        let (_sim, mut module) = module("");
        let img = module
            .grab_image(Duration::from_millis(20), ImageType::Object)
            .unwrap();
        assert_eq!(img.header.get("DET-CPX1"), Some(&HeaderValue::Float(2328.0)));
        assert_eq!(img.header.get("DET-CPX2"), Some(&HeaderValue::Float(1760.0)));
    }

    #[test]
    fn bias_is_zero_second_dark() {
        let (sim, mut module) = module("");
        let img = module
            .grab_image(Duration::from_secs(5), ImageType::Bias)
            .unwrap();
        assert_eq!(img.header.get("EXPTIME"), Some(&HeaderValue::Float(0.0)));
        assert_eq!(img.header.get("IMAGETYP"), Some(&"bias".into()));
        module
            .grab_image(Duration::from_millis(20), ImageType::Dark)
            .unwrap();
        module
            .grab_image(Duration::from_millis(20), ImageType::SkyFlat)
            .unwrap();
        assert_eq!(sim.dark_flags(), vec![true, true, false]);
    }

    #[test]
    fn flips_rows_when_configured() {
        let (_sim, mut module) = module("flip: true\n");
        let img = module
            .grab_image(Duration::from_millis(20), ImageType::Object)
            .unwrap();
        match img.data() {
            PixelData::U16(v) => {
                assert_eq!(v[0], sim_pixel(3 * 64));
                assert_eq!(v[3 * 64], sim_pixel(0));
            }
            other => panic!("unexpected data {other:?}"),
        }
    }

    #[test]
    fn rejects_exposure_while_busy() {
        let (_sim, mut module) = module("");
        module.status().set(ExposureStatus::Exposing);
        assert!(matches!(
            module.grab_image(Duration::from_millis(20), ImageType::Object),
            Err(Error::ExposureInProgress)
        ));
    }

    #[test]
    fn failure_returns_to_idle() {
        let (sim, mut module) = module("");
        sim.fail_exposure(true);
        assert!(module
            .grab_image(Duration::from_millis(20), ImageType::Object)
            .is_err());
        assert_eq!(module.exposure_status(), ExposureStatus::Idle);
    }

    #[test]
    fn abort_from_other_thread() {
        let (sim, mut module) = module("");
        sim.set_working_polls(u32::MAX);
        let abort = module.abort_handle();
        let t = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            abort.abort();
        });
        let res = module.grab_image(Duration::from_secs(60), ImageType::Object);
        t.join().unwrap();
        assert!(matches!(res, Err(Error::Aborted)));
        assert_eq!(module.exposure_status(), ExposureStatus::Idle);
    }

    #[test]
    fn saves_through_vfs_root() {
        let dir = tempfile::tempdir().unwrap();
        let (_sim, mut module) = module(&format!(
            "vfs:\n  class: pyobs.vfs.VirtualFileSystem\n  roots:\n    cache:\n      class: pyobs.vfs.LocalFile\n      root: '{}'\n",
            dir.path().join("images").display()
        ));
        let path = module
            .expose(Duration::from_millis(20), ImageType::Object)
            .unwrap();
        assert!(path.starts_with(dir.path().join("images")));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("pyobs-"));
        assert!(name.ends_with("-0001-e00.fits"));
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len() % 2880, 0);
        assert!(bytes.starts_with(b"SIMPLE  ="));
    }
}
