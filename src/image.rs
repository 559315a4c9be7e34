use std::fmt::{self, Display};

use serde::Deserialize;

use crate::error::{Error, Result};

/// Value of a FITS header card.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum HeaderValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl HeaderValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            HeaderValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            HeaderValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HeaderValue::Float(f) => Some(*f),
            HeaderValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderValue::Bool(b) => write!(f, "{b}"),
            HeaderValue::Int(i) => write!(f, "{i}"),
            HeaderValue::Float(x) => write!(f, "{x}"),
            HeaderValue::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for HeaderValue {
    fn from(value: bool) -> Self {
        HeaderValue::Bool(value)
    }
}

impl From<i64> for HeaderValue {
    fn from(value: i64) -> Self {
        HeaderValue::Int(value)
    }
}

impl From<i32> for HeaderValue {
    fn from(value: i32) -> Self {
        HeaderValue::Int(value as _)
    }
}

impl From<u32> for HeaderValue {
    fn from(value: u32) -> Self {
        HeaderValue::Int(value as _)
    }
}

impl From<f64> for HeaderValue {
    fn from(value: f64) -> Self {
        HeaderValue::Float(value)
    }
}

impl From<f32> for HeaderValue {
    fn from(value: f32) -> Self {
        HeaderValue::Float(value as _)
    }
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        HeaderValue::Str(value.to_owned())
    }
}

impl From<String> for HeaderValue {
    fn from(value: String) -> Self {
        HeaderValue::Str(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub key: String,
    pub value: HeaderValue,
    pub comment: String,
}

/// Ordered FITS header. Keys are stored uppercase.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FitsHeader {
    cards: Vec<Card>,
}

impl FitsHeader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a card, replacing an existing one with the same key in place.
    pub fn set(&mut self, key: &str, value: impl Into<HeaderValue>, comment: &str) {
        let key = key.to_uppercase();
        let value = value.into();
        match self.cards.iter_mut().find(|c| c.key == key) {
            Some(card) => {
                card.value = value;
                card.comment = comment.to_owned();
            }
            None => self.cards.push(Card {
                key,
                value,
                comment: comment.to_owned(),
            }),
        }
    }

    pub fn get(&self, key: &str) -> Option<&HeaderValue> {
        let key = key.to_uppercase();
        self.cards.iter().find(|c| c.key == key).map(|c| &c.value)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&mut self, key: &str) -> Option<HeaderValue> {
        let key = key.to_uppercase();
        let idx = self.cards.iter().position(|c| c.key == key)?;
        Some(self.cards.remove(idx).value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Card> {
        self.cards.iter()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PixelData {
    U8(Vec<u8>),
    U16(Vec<u16>),
}

impl PixelData {
    pub fn len(&self) -> usize {
        match self {
            PixelData::U8(v) => v.len(),
            PixelData::U16(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Image data with its FITS header.
///
/// `shape` is row-major: `[height, width]` for single-plane images and
/// `[planes, height, width]` for RGB.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    shape: Vec<usize>,
    data: PixelData,
    pub header: FitsHeader,
}

impl Image {
    pub fn new(shape: Vec<usize>, data: PixelData) -> Result<Self> {
        if shape.len() < 2 || shape.len() > 3 {
            return Err(Error::InvalidValue(format!(
                "image must have 2 or 3 axes, got {}",
                shape.len()
            )));
        }
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(Error::InvalidValue(format!(
                "shape {shape:?} needs {expected} pixels, got {}",
                data.len()
            )));
        }
        Ok(Self {
            shape,
            data,
            header: FitsHeader::new(),
        })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &PixelData {
        &self.data
    }

    pub fn width(&self) -> usize {
        self.shape[self.shape.len() - 1]
    }

    pub fn height(&self) -> usize {
        self.shape[self.shape.len() - 2]
    }

    fn planes(&self) -> usize {
        if self.shape.len() == 3 {
            self.shape[0]
        } else {
            1
        }
    }

    /// Minimum, maximum and mean pixel value.
    pub fn stats(&self) -> (f64, f64, f64) {
        fn calc<T: Copy + Into<f64>>(v: &[T]) -> (f64, f64, f64) {
            if v.is_empty() {
                return (0.0, 0.0, 0.0);
            }
            let (mut min, mut max, mut sum) = (f64::MAX, f64::MIN, 0.0);
            for x in v.iter().map(|x| (*x).into()) {
                min = min.min(x);
                max = max.max(x);
                sum += x;
            }
            (min, max, sum / v.len() as f64)
        }
        match &self.data {
            PixelData::U8(v) => calc(v),
            PixelData::U16(v) => calc(v),
        }
    }

    /// Mirror the image vertically: reverse the row order of every plane.
    pub fn flip_rows(&mut self) {
        let (w, h, planes) = (self.width(), self.height(), self.planes());
        fn flip<T>(v: &mut [T], w: usize, h: usize, planes: usize) {
            if w == 0 {
                return;
            }
            for plane in v.chunks_exact_mut(w * h).take(planes) {
                for row in 0..h / 2 {
                    let (top, bottom) = plane.split_at_mut((h - 1 - row) * w);
                    top[row * w..(row + 1) * w].swap_with_slice(&mut bottom[..w]);
                }
            }
        }
        match &mut self.data {
            PixelData::U8(v) => flip(v, w, h, planes),
            PixelData::U16(v) => flip(v, w, h, planes),
        }
    }

    /// Set `TRIMSEC`, `DATASEC` and `BIASSEC` for a data area given in unbinned pixels.
    ///
    /// Requires `XORGSUBF`, `YORGSUBF`, `XBINNING` and `YBINNING` in the header.
    /// Prescan or overscan is supported along one axis only.
    pub fn set_biassec_trimsec(&mut self, left: i64, top: i64, width: i64, height: i64) {
        let get = |key: &str| self.header.get(key).and_then(HeaderValue::as_i64);
        let (Some(img_left), Some(img_top), Some(xbin), Some(ybin)) = (
            get("XORGSUBF"),
            get("YORGSUBF"),
            get("XBINNING"),
            get("YBINNING"),
        ) else {
            log::warn!("Cannot set BIASSEC/TRIMSEC without subframe and binning headers.");
            return;
        };
        if xbin <= 0 || ybin <= 0 {
            log::warn!("Cannot set BIASSEC/TRIMSEC with binning {xbin}x{ybin}.");
            return;
        }
        let naxis1 = self.width() as i64;
        let naxis2 = self.height() as i64;
        let img_width = naxis1 * xbin;
        let img_height = naxis2 * ybin;

        // intersection of data area and image
        let is_left = left.max(img_left);
        let is_right = (left + width).min(img_left + img_width);
        let is_top = top.max(img_top);
        let is_bottom = (top + height).min(img_top + img_height);

        if (left < is_left || left + width > is_right) && (top < is_top || top + height > is_bottom)
        {
            log::warn!(
                "BIASSEC/TRIMSEC can only be calculated with a prescan/overscan area in only one direction."
            );
            return;
        }

        let c_bias = "Bias overscan area [x1:x2,y1:y2] (binned)";
        let c_trim = "Image area [x1:x2,y1:y2] (binned)";

        if is_right <= is_left || is_bottom <= is_top {
            self.header
                .set("BIASSEC", format!("[1:{naxis1},1:{naxis2}]"), c_bias);
            return;
        }

        let x1 = (is_left - img_left) / xbin + 1;
        let x2 = (is_right - img_left) / xbin;
        let y1 = (is_top - img_top) / ybin + 1;
        let y2 = (is_bottom - img_top) / ybin;
        let sec = format!("[{x1}:{x2},{y1}:{y2}]");
        self.header.set("TRIMSEC", sec.as_str(), c_trim);
        self.header.set("DATASEC", sec, c_trim);

        if img_left + img_width > left + width {
            let x = (is_right - img_left) / xbin + 1;
            self.header
                .set("BIASSEC", format!("[{x}:{naxis1},1:{naxis2}]"), c_bias);
        } else if img_left < left {
            let x = (is_left - img_left) / xbin;
            self.header
                .set("BIASSEC", format!("[1:{x},1:{naxis2}]"), c_bias);
        } else if img_top + img_height > top + height {
            let y = (is_bottom - img_top) / ybin + 1;
            self.header
                .set("BIASSEC", format!("[1:{naxis1},{y}:{naxis2}]"), c_bias);
        } else if img_top < top {
            let y = (is_top - img_top) / ybin;
            self.header
                .set("BIASSEC", format!("[1:{naxis1},1:{y}]"), c_bias);
        }
    }
}
