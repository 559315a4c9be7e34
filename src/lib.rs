//! Observatory camera module for ZWO ASI cameras.
//!
//! The ASI SDK is loaded at runtime ([`AsiSdk::load`]) and accessed through
//! the [`AsiDriver`] trait. [`AsiCamera`] and [`AsiCoolCamera`] implement the
//! camera interfaces; [`CameraModule`] adds exposure bookkeeping, FITS headers
//! and file output, configured by [`ModuleConfig`].

mod asicamera;
mod asicoolcamera;
mod asihandle;
mod config;
mod driver;
mod error;
mod filenames;
mod fits;
mod image;
mod interfaces;
mod module;
mod sdk;
#[cfg(test)]
mod testing;
mod zwo_ffi;
mod zwo_ffi_wrapper;

pub use asicamera::AsiCamera;
pub use asicoolcamera::{AsiCoolCamera, CoolingHandle};
pub use config::{
    CameraClass, Location, ModuleConfig, VfsConfig, VfsRoot, DEFAULT_FILENAMES, DEFAULT_SDK,
};
pub use driver::{list_cameras, AsiDriver};
pub use error::{Error, Result};
pub use filenames::FilenameFormatter;
pub use fits::write_fits;
pub use image::{Card, FitsHeader, HeaderValue, Image, PixelData};
pub use interfaces::{
    BinningControl, Camera, Cooling, CoolingStatus, ExposureState, ExposureStatus, ImageFormat,
    ImageFormatControl, ImageType, Window, WindowControl,
};
pub use module::{day_obs, AbortHandle, CameraModule};
pub use sdk::AsiSdk;
pub use zwo_ffi_wrapper::{
    ASIBayerPattern, ASIControlType, ASIExposureStatus, ASIImageFormat, AsiError, CameraProps,
    ControlCaps, RoiFormat,
};
