use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use chrono_tz::Tz;
use serde::Deserialize;

use crate::{
    error::{Error, Result},
    filenames::FilenameFormatter,
    fits::check_card,
    image::HeaderValue,
};

pub const DEFAULT_SDK: &str = "/usr/local/lib/libASICamera2.so";
pub const DEFAULT_FILENAMES: &str =
    "/cache/pyobs-{DAY-OBS|date:}-{FRAMENUM|string:04d}-{IMAGETYP|type}00.fits";

fn default_sdk() -> PathBuf {
    PathBuf::from(DEFAULT_SDK)
}

fn default_setpoint() -> f64 {
    -20.0
}

fn default_filenames() -> String {
    DEFAULT_FILENAMES.to_owned()
}

fn default_timezone() -> String {
    "utc".to_owned()
}

/// Which camera kind to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum CameraClass {
    #[default]
    #[serde(rename = "pyobs_asi.AsiCamera", alias = "AsiCamera")]
    AsiCamera,
    #[serde(rename = "pyobs_asi.AsiCoolCamera", alias = "AsiCoolCamera")]
    AsiCoolCamera,
}

/// Observatory site.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Location {
    /// Degrees east.
    pub longitude: f64,
    /// Degrees north.
    pub latitude: f64,
    /// Metres above sea level.
    #[serde(default)]
    pub elevation: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VfsRoot {
    #[serde(default)]
    pub class: Option<String>,
    /// Local directory for this root.
    #[serde(default)]
    pub root: Option<PathBuf>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// Mapping of virtual file system roots to local directories.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VfsConfig {
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub roots: BTreeMap<String, VfsRoot>,
}

impl VfsConfig {
    /// Map `/<root>/<rest>` to `<roots.root.root>/<rest>`.
    pub fn resolve(&self, path: &str) -> Result<PathBuf> {
        let trimmed = path.trim_start_matches('/');
        let (name, rest) = trimmed
            .split_once('/')
            .ok_or_else(|| Error::Config(format!("path {path:?} has no VFS root")))?;
        let root = self
            .roots
            .get(name)
            .ok_or_else(|| Error::Config(format!("unknown VFS root {name:?}")))?;
        let dir = root
            .root
            .as_ref()
            .ok_or_else(|| Error::Config(format!("VFS root {name:?} has no local directory")))?;
        Ok(dir.join(rest))
    }
}

/// Configuration of the camera module.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleConfig {
    #[serde(default)]
    pub class: CameraClass,
    /// Camera name as reported by the SDK.
    pub camera: String,
    #[serde(default = "default_sdk")]
    pub sdk: PathBuf,
    /// Cooling setpoint in °C, cooled cameras only.
    #[serde(default = "default_setpoint")]
    pub setpoint: f64,
    #[serde(default = "default_filenames")]
    pub filenames: String,
    /// Static header cards: `KEY: [value, comment]`.
    #[serde(default)]
    pub fits_headers: BTreeMap<String, (HeaderValue, String)>,
    /// Optical centre in unbinned pixels.
    #[serde(default)]
    pub centre: Option<(f64, f64)>,
    /// Degrees east of north.
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub flip: bool,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub comm: Option<serde_yaml::Value>,
    #[serde(default)]
    pub vfs: Option<VfsConfig>,
}

fn valid_key(key: &str) -> bool {
    (1..=8).contains(&key.len())
        && key
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

impl ModuleConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let mut config: Self = serde_yaml::from_str(yaml)?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("Reading configuration from {}", path.display());
        Self::from_yaml_str(&std::fs::read_to_string(path)?)
    }

    fn normalize(&mut self) {
        if let Some(stripped) = self.filenames.strip_suffix(".gz") {
            log::warn!("Compressed output is not supported, writing {stripped} instead.");
            self.filenames = stripped.to_owned();
        }
        self.fits_headers = std::mem::take(&mut self.fits_headers)
            .into_iter()
            .map(|(k, v)| (k.to_uppercase(), v))
            .collect();
    }

    pub fn validate(&self) -> Result<()> {
        if self.camera.trim().is_empty() {
            return Err(Error::Config("camera name must not be empty".into()));
        }
        if let Some(key) = self.fits_headers.keys().find(|k| !valid_key(k)) {
            return Err(Error::Config(format!("invalid FITS header key {key:?}")));
        }
        for (key, (value, comment)) in &self.fits_headers {
            check_card(key, value, comment)
                .map_err(|e| Error::Config(format!("fits_headers: {e}")))?;
        }
        if !self.rotation.is_finite() {
            return Err(Error::Config("rotation must be finite".into()));
        }
        if let Some((x, y)) = self.centre {
            if !x.is_finite() || !y.is_finite() {
                return Err(Error::Config("centre must be finite".into()));
            }
        }
        if let Some(loc) = &self.location {
            if !(-90.0..=90.0).contains(&loc.latitude) {
                return Err(Error::Config(format!("latitude {} out of range", loc.latitude)));
            }
            if !(-180.0..=360.0).contains(&loc.longitude) {
                return Err(Error::Config(format!(
                    "longitude {} out of range",
                    loc.longitude
                )));
            }
            if !loc.elevation.is_finite() {
                return Err(Error::Config("elevation must be finite".into()));
            }
        }
        if !self.setpoint.is_finite() {
            return Err(Error::Config("setpoint must be finite".into()));
        }
        self.tz()?;
        FilenameFormatter::new(&self.filenames)
            .map_err(|e| Error::Config(format!("filenames: {e}")))?;
        Ok(())
    }

    /// The site timezone.
    pub fn tz(&self) -> Result<Tz> {
        if self.timezone.eq_ignore_ascii_case("utc") {
            return Ok(Tz::UTC);
        }
        self.timezone
            .parse()
            .map_err(|_| Error::Config(format!("unknown timezone {:?}", self.timezone)))
    }

    /// Local path for an output filename, mapped through the VFS roots when configured.
    pub fn output_path(&self, filename: &str) -> Result<PathBuf> {
        match &self.vfs {
            Some(vfs) => vfs.resolve(filename),
            None => Ok(PathBuf::from(filename)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
class: pyobs_asi.AsiCoolCamera
camera: ZWO ASI1600MM Pro
sdk: /opt/asi/lib/x64/libASICamera2.so
setpoint: -15
filenames: '/cache/asi-{DAY-OBS|date:}-{FRAMENUM|string:04d}.fits.gz'
fits_headers:
  observer: ['Jane Doe', 'Name of observer']
  TELESCOP: ['MONET/N', 'Telescope']
  FOCALLEN: [1500.0, 'Focal length [mm]']
centre: [2328, 1760.5]
rotation: 90
flip: true
timezone: Europe/Berlin
location:
  longitude: 9.944333
  latitude: 51.560583
  elevation: 201.0
comm:
  jid: asi@example.com
  password: secret
vfs:
  class: pyobs.vfs.VirtualFileSystem
  roots:
    cache:
      class: pyobs.vfs.LocalFile
      root: /data/cache
"#;

    #[test]
    fn parses_full_config() {
        let cfg = ModuleConfig::from_yaml_str(FULL).unwrap();
        assert_eq!(cfg.class, CameraClass::AsiCoolCamera);
        assert_eq!(cfg.camera, "ZWO ASI1600MM Pro");
        assert_eq!(cfg.setpoint, -15.0);
        assert_eq!(
            cfg.filenames,
            "/cache/asi-{DAY-OBS|date:}-{FRAMENUM|string:04d}.fits"
        );
        assert_eq!(
            cfg.fits_headers.get("OBSERVER"),
            Some(&(HeaderValue::from("Jane Doe"), "Name of observer".to_owned()))
        );
        assert_eq!(
            cfg.fits_headers.get("FOCALLEN").map(|v| &v.0),
            Some(&HeaderValue::Float(1500.0))
        );
        assert_eq!(cfg.centre, Some((2328.0, 1760.5)));
        assert_eq!(cfg.rotation, 90.0);
        assert!(cfg.flip);
        assert_eq!(cfg.tz().unwrap(), chrono_tz::Europe::Berlin);
        assert_eq!(cfg.location.as_ref().unwrap().elevation, 201.0);
        assert!(cfg.comm.is_some());
        assert_eq!(
            cfg.output_path("/cache/a/b.fits").unwrap(),
            PathBuf::from("/data/cache/a/b.fits")
        );
    }

    #[test]
    fn defaults() {
        let cfg = ModuleConfig::from_yaml_str("camera: ZWO ASI294MC").unwrap();
        assert_eq!(cfg.class, CameraClass::AsiCamera);
        assert_eq!(cfg.sdk, PathBuf::from(DEFAULT_SDK));
        assert_eq!(cfg.setpoint, -20.0);
        assert_eq!(cfg.filenames, DEFAULT_FILENAMES);
        assert_eq!(cfg.centre, None);
        assert_eq!(cfg.rotation, 0.0);
        assert!(!cfg.flip);
        assert_eq!(cfg.tz().unwrap(), Tz::UTC);
        assert_eq!(
            cfg.output_path("/cache/x.fits").unwrap(),
            PathBuf::from("/cache/x.fits")
        );
    }

    #[test]
    fn short_class_names() {
        let cfg = ModuleConfig::from_yaml_str("class: AsiCoolCamera\ncamera: x").unwrap();
        assert_eq!(cfg.class, CameraClass::AsiCoolCamera);
        assert!(ModuleConfig::from_yaml_str("class: pyobs_asi.Other\ncamera: x").is_err());
    }

    #[test]
    fn rejects_wrong_types() {
        for yaml in [
            "camera: x\ncentre: [1, 2, 3]",
            "camera: x\ncentre: middle",
            "camera: x\nrotation: north",
            "camera: x\nflip: 'yes'",
            "camera: x\nflip: 1",
        ] {
            assert!(
                matches!(ModuleConfig::from_yaml_str(yaml), Err(Error::Yaml(_))),
                "{yaml}"
            );
        }
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(matches!(
            ModuleConfig::from_yaml_str("camera: x\nexposure: 1"),
            Err(Error::Yaml(_))
        ));
        assert!(ModuleConfig::from_yaml_str("sdk: /tmp/lib.so").is_err());
    }

    #[test]
    fn rejects_invalid_values() {
        for yaml in [
            "camera: ''",
            "camera: x\ntimezone: Mars/Olympus_Mons",
            "camera: x\nfits_headers:\n  TOOLONGKEY: [1, 'c']",
            "camera: x\nfits_headers:\n  'BAD KEY': [1, 'c']",
            "camera: x\nlocation: {longitude: 10, latitude: 95}",
            "camera: x\nfilenames: '/cache/{FRAMENUM'",
            "camera: x\nrotation: .nan",
            "camera: x\nlocation: {longitude: -181, latitude: 50}",
            "camera: x\nlocation: {longitude: 361, latitude: 50}",
            "camera: x\nfits_headers:\n  OBSERVER: ['Jürgen', 'Observer']",
            "camera: x\nfits_headers:\n  OBSERVER: ['Jane', 'Beobachter (männlich)']",
            "camera: x\nfits_headers:\n  TEMP: [.nan, 'Temperature']",
            "camera: x\nfits_headers:\n  TEMP: [.inf, 'Temperature']",
        ] {
            assert!(
                matches!(ModuleConfig::from_yaml_str(yaml), Err(Error::Config(_))),
                "{yaml}"
            );
        }
    }

    #[test]
    fn location_bounds_are_inclusive() {
        for (lon, lat) in [(360.0, 90.0), (-180.0, -90.0)] {
            let cfg = ModuleConfig::from_yaml_str(&format!(
                "camera: x\nlocation: {{longitude: {lon:?}, latitude: {lat:?}, elevation: 0.0}}"
            ))
            .unwrap();
            assert_eq!(cfg.location.map(|l| l.longitude), Some(lon));
        }
    }

    #[test]
    fn header_strings_must_fit_on_a_card() {
        let yaml = |len: usize| {
            format!(
                "camera: x\nfits_headers:\n  OBJECT: ['{}', 'Object']",
                "x".repeat(len)
            )
        };
        assert!(ModuleConfig::from_yaml_str(&yaml(68)).is_ok());
        assert!(matches!(
            ModuleConfig::from_yaml_str(&yaml(69)),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn unknown_vfs_root() {
        let vfs = VfsConfig {
            class: None,
            roots: BTreeMap::new(),
        };
        assert!(vfs.resolve("/archive/x.fits").is_err());
        assert!(vfs.resolve("x.fits").is_err());
    }

    #[test]
    fn reads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("asi.yaml");
        std::fs::write(&path, "camera: ZWO ASI294MC\nflip: true\n").unwrap();
        let cfg = ModuleConfig::from_path(&path).unwrap();
        assert!(cfg.flip);
        assert!(matches!(
            ModuleConfig::from_path(dir.path().join("missing.yaml")),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn sample_config_is_valid() {
        let cfg = ModuleConfig::from_path(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/config/asicam.yaml"
        ))
        .unwrap();
        assert_eq!(cfg.class, CameraClass::AsiCoolCamera);
        assert_eq!(cfg.tz().unwrap(), chrono_tz::Europe::Berlin);
        assert_eq!(
            cfg.output_path("/cache/a.fits").unwrap(),
            PathBuf::from("/var/lib/asicam/cache/a.fits")
        );
    }
}
