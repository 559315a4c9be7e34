//! FITS output.
//!
//! A single primary HDU written through cfitsio. Unsigned 16-bit data is
//! stored by cfitsio as signed with `BZERO = 32768`.

use std::{ffi::CString, path::Path};

use fitsio::{
    images::{ImageDescription, ImageType},
    FitsFile,
};

use crate::{
    error::{Error, Result},
    image::{HeaderValue, Image, PixelData},
};

/// Longest string value that fits on one card, quotes excluded.
const MAX_STRING: usize = 68;

/// Keys written by cfitsio from the image structure and never copied from the header.
const RESERVED: &[&str] = &[
    "SIMPLE", "BITPIX", "NAXIS", "NAXIS1", "NAXIS2", "NAXIS3", "EXTEND", "BZERO", "BSCALE", "END",
];

/// Check that a card can be written as a fixed-format FITS keyword.
pub(crate) fn check_card(key: &str, value: &HeaderValue, comment: &str) -> Result<()> {
    if key.is_empty() || key.len() > 8 || !key.is_ascii() {
        return Err(Error::Fits(format!("invalid keyword {key:?}")));
    }
    if !comment.is_ascii() || comment.contains('\0') {
        return Err(Error::Fits(format!("non-ASCII comment for {key}")));
    }
    match value {
        HeaderValue::Float(f) if !f.is_finite() => Err(Error::Fits(format!(
            "cannot write non-finite value {f} for {key}"
        ))),
        HeaderValue::Str(s) if !s.is_ascii() || s.contains('\0') => Err(Error::Fits(format!(
            "non-ASCII string {s:?} for {key}"
        ))),
        HeaderValue::Str(s) if s.replace('\'', "''").len() > MAX_STRING => Err(Error::Fits(
            format!("string for {key} longer than {MAX_STRING} characters"),
        )),
        _ => Ok(()),
    }
}

fn write_logical(fptr: &mut FitsFile, key: &str, value: bool, comment: &str) -> Result<()> {
    let c_key = CString::new(key).map_err(|e| Error::Fits(e.to_string()))?;
    let c_comment = CString::new(comment).map_err(|e| Error::Fits(e.to_string()))?;
    let mut status = 0;
    unsafe {
        fitsio::sys::ffpkyl(
            fptr.as_raw(),
            c_key.as_ptr(),
            value as _,
            c_comment.as_ptr(),
            &mut status,
        );
    }
    if status != 0 {
        return Err(Error::Fits(format!(
            "cfitsio status {status} writing {key}"
        )));
    }
    Ok(())
}

/// Write an image and its header to `path`, replacing any existing file.
///
/// Header cards are written in header order after the structural keywords.
///
/// # Errors
///  - [`Error::Fits`] - A card cannot be represented in FITS.
///  - [`Error::Fitsio`] - cfitsio failed to create or write the file.
pub fn write_fits(path: &Path, image: &Image) -> Result<()> {
    let cards: Vec<_> = image
        .header
        .iter()
        .filter(|c| !RESERVED.contains(&c.key.as_str()))
        .collect();
    for card in &cards {
        check_card(&card.key, &card.value, &card.comment)?;
    }

    let description = ImageDescription {
        data_type: match image.data() {
            PixelData::U8(_) => ImageType::UnsignedByte,
            PixelData::U16(_) => ImageType::UnsignedShort,
        },
        dimensions: image.shape(),
    };
    let mut fptr = FitsFile::create(path)
        .with_custom_primary(&description)
        .overwrite()
        .open()?;
    let hdu = fptr.primary_hdu()?;
    match image.data() {
        PixelData::U8(v) => hdu.write_image(&mut fptr, v.as_slice())?,
        PixelData::U16(v) => hdu.write_image(&mut fptr, v.as_slice())?,
    }

    for card in cards {
        let (key, comment) = (card.key.as_str(), card.comment.as_str());
        match &card.value {
            HeaderValue::Bool(b) => write_logical(&mut fptr, key, *b, comment)?,
            HeaderValue::Int(i) => hdu.write_key(&mut fptr, key, (*i, comment))?,
            HeaderValue::Float(f) => hdu.write_key(&mut fptr, key, (*f, comment))?,
            HeaderValue::Str(s) => hdu.write_key(&mut fptr, key, (s.as_str(), comment))?,
        }
    }
    log::debug!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fitsio::hdu::HduInfo;

    fn header_text(path: &Path) -> String {
        let bytes = std::fs::read(path).unwrap();
        String::from_utf8_lossy(&bytes[..2880]).into_owned()
    }

    #[test]
    fn invalid_cards_are_rejected() {
        assert!(check_card("TOOLONGKEY", &1i64.into(), "").is_err());
        assert!(check_card("TEMP", &f64::NAN.into(), "").is_err());
        assert!(check_card("OBJECT", &"Mörk".into(), "").is_err());
        assert!(check_card("OBJECT", &"x".repeat(69).into(), "").is_err());
        assert!(check_card("OBJECT", &"x".repeat(68).into(), "").is_ok());
        assert!(check_card("OBSERVER", &"Jane".into(), "Name of observer").is_ok());
    }

    #[test]
    fn u16_image_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("u16.fits");
        let mut img =
            Image::new(vec![2, 3], PixelData::U16(vec![0, 1, 32768, 65535, 7, 8])).unwrap();
        img.header.set("IMAGETYP", "bias", "Image type");
        img.header.set("EXPTIME", 0.5, "Exposure time [s]");
        img.header.set("FRAMENUM", 7i64, "Sequential frame number");
        img.header.set("BZERO", 0i64, "ignored");
        write_fits(&path, &img).unwrap();

        let mut f = FitsFile::open(&path).unwrap();
        let hdu = f.primary_hdu().unwrap();
        match &hdu.info {
            HduInfo::ImageInfo { shape, image_type } => {
                assert_eq!(shape, &vec![2, 3]);
                assert!(matches!(image_type, ImageType::UnsignedShort));
            }
            other => panic!("unexpected HDU {other:?}"),
        }
        let data: Vec<u16> = hdu.read_image(&mut f).unwrap();
        assert_eq!(data, vec![0, 1, 32768, 65535, 7, 8]);
        assert_eq!(hdu.read_key::<i64>(&mut f, "BZERO").unwrap(), 32768);
        assert_eq!(hdu.read_key::<i64>(&mut f, "FRAMENUM").unwrap(), 7);
        assert_eq!(hdu.read_key::<f64>(&mut f, "EXPTIME").unwrap(), 0.5);
        assert_eq!(
            hdu.read_key::<String>(&mut f, "IMAGETYP").unwrap(),
            "bias"
        );
    }

    #[test]
    fn cards_keep_header_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("order.fits");
        let mut img = Image::new(vec![1, 2], PixelData::U8(vec![1, 2])).unwrap();
        img.header.set("OBSERVER", "Jane", "Name of observer");
        img.header.set("AIRMASS", 1.25, "");
        img.header.set("FLIPPED", true, "Image flipped");
        write_fits(&path, &img).unwrap();

        let text = header_text(&path);
        let pos = |key: &str| text.find(&format!("{key:<8}=")).unwrap();
        assert!(pos("NAXIS2") < pos("OBSERVER"));
        assert!(pos("OBSERVER") < pos("AIRMASS"));
        assert!(pos("AIRMASS") < pos("FLIPPED"));
        let flipped = &text[pos("FLIPPED")..pos("FLIPPED") + 80];
        assert_eq!(flipped[10..30].trim(), "T");
        assert!(flipped.contains("/ Image flipped"));
    }

    #[test]
    fn rgb_image_has_three_axes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rgb.fits");
        let img = Image::new(vec![3, 2, 2], PixelData::U8((0..12).collect())).unwrap();
        write_fits(&path, &img).unwrap();

        let mut f = FitsFile::open(&path).unwrap();
        let hdu = f.primary_hdu().unwrap();
        match &hdu.info {
            HduInfo::ImageInfo { shape, .. } => assert_eq!(shape, &vec![3, 2, 2]),
            other => panic!("unexpected HDU {other:?}"),
        }
        let data: Vec<u8> = hdu.read_image(&mut f).unwrap();
        assert_eq!(data, (0..12).collect::<Vec<u8>>());
        assert_eq!(hdu.read_key::<i64>(&mut f, "NAXIS3").unwrap(), 3);
    }

    #[test]
    fn existing_file_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("again.fits");
        std::fs::write(&path, b"not a FITS file").unwrap();
        let img = Image::new(vec![1, 1], PixelData::U8(vec![42])).unwrap();
        write_fits(&path, &img).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 2 * 2880);
    }

    #[test]
    fn invalid_header_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.fits");
        let mut img = Image::new(vec![1, 1], PixelData::U8(vec![42])).unwrap();
        img.header.set("TEMP", f64::INFINITY, "");
        assert!(matches!(write_fits(&path, &img), Err(Error::Fits(_))));
        assert!(!path.exists());
    }
}
