use std::path::PathBuf;

use thiserror::Error;

use crate::zwo_ffi_wrapper::AsiError;

/// Errors returned by this crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Could not load ASI SDK from {path}: {source}")]
    SdkLoad {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },
    #[error("ASI SDK is missing symbol {0}")]
    SdkSymbol(String),
    #[error("No cameras available")]
    NoCamerasAvailable,
    #[error("Could not find camera {0}")]
    CameraNotFound(String),
    #[error("Invalid camera ID {0}")]
    InvalidId(i32),
    #[error("Camera closed")]
    CameraClosed,
    #[error("Camera removed")]
    CameraRemoved,
    #[error("{0}")]
    InvalidControlType(String),
    #[error("Invalid value: {0}")]
    InvalidValue(String),
    #[error("Out of bounds: {0}")]
    OutOfBounds(String),
    #[error("Exposure in progress")]
    ExposureInProgress,
    #[error("Exposure aborted")]
    Aborted,
    #[error("Could not grab image: {0}")]
    GrabImage(String),
    #[error("Timed out")]
    TimedOut,
    #[error("ASI SDK error: {0}")]
    Sdk(AsiError),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Could not parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Could not format filename: {0}")]
    Filename(String),
    #[error("Could not write FITS file: {0}")]
    Fits(String),
    #[error("FITS error: {0}")]
    Fitsio(#[from] fitsio::errors::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<AsiError> for Error {
    fn from(err: AsiError) -> Self {
        match err {
            AsiError::CameraClosed => Error::CameraClosed,
            AsiError::CameraRemoved => Error::CameraRemoved,
            AsiError::InvalidControlType => {
                Error::InvalidControlType("Invalid control type".to_owned())
            }
            AsiError::OutOfBounds => Error::OutOfBounds("start position".to_owned()),
            AsiError::Timeout => Error::TimedOut,
            AsiError::ExposureInProgress => Error::ExposureInProgress,
            other => Error::Sdk(other),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
