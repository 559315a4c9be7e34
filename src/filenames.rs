use std::fmt::{self, Display};

use crate::{
    error::{Error, Result},
    image::{FitsHeader, HeaderValue},
};

#[derive(Debug, Clone, PartialEq)]
struct FormatSpec {
    zero: bool,
    width: usize,
    precision: Option<usize>,
    kind: char,
}

impl FormatSpec {
    fn parse(spec: &str) -> Result<Self> {
        let err = || Error::Filename(format!("invalid format spec {spec:?}"));
        let kind = spec.chars().last().ok_or_else(err)?;
        if !matches!(kind, 'd' | 'f' | 's') {
            return Err(err());
        }
        let mut rest = &spec[..spec.len() - 1];
        let zero = rest.starts_with('0');
        if zero {
            rest = &rest[1..];
        }
        let (width, precision) = match rest.split_once('.') {
            Some((w, p)) => (w, Some(p.parse().map_err(|_| err())?)),
            None => (rest, None),
        };
        let width = if width.is_empty() {
            0
        } else {
            width.parse().map_err(|_| err())?
        };
        Ok(Self {
            zero,
            width,
            precision,
            kind,
        })
    }

    fn apply(&self, key: &str, value: &HeaderValue) -> Result<String> {
        let width = self.width;
        match self.kind {
            'd' => {
                let v = value
                    .as_i64()
                    .ok_or_else(|| Error::Filename(format!("{key} is not an integer")))?;
                Ok(if self.zero {
                    format!("{v:0width$}")
                } else {
                    format!("{v:>width$}")
                })
            }
            'f' => {
                let v = value
                    .as_f64()
                    .ok_or_else(|| Error::Filename(format!("{key} is not a number")))?;
                let prec = self.precision.unwrap_or(6);
                Ok(if self.zero {
                    format!("{v:0width$.prec$}")
                } else {
                    format!("{v:>width$.prec$}")
                })
            }
            _ => {
                let mut s = value.to_string();
                if let Some(prec) = self.precision {
                    s = s.chars().take(prec).collect();
                }
                Ok(format!("{s:<width$}"))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Filter {
    /// Replace the dashes of a date with a separator.
    Date(String),
    Format(FormatSpec),
    /// Single-letter code for the image type.
    Type,
}

impl Filter {
    fn parse(name: &str, arg: Option<&str>) -> Result<Self> {
        match (name, arg) {
            ("date", arg) => Ok(Filter::Date(arg.unwrap_or_default().to_owned())),
            ("string", Some(spec)) => Ok(Filter::Format(FormatSpec::parse(spec)?)),
            ("string", None) => Err(Error::Filename("string filter needs a format".into())),
            ("type", _) => Ok(Filter::Type),
            (other, _) => Err(Error::Filename(format!("unknown filter {other:?}"))),
        }
    }

    fn apply(&self, key: &str, value: &HeaderValue) -> Result<String> {
        match self {
            Filter::Date(sep) => Ok(value.to_string().replace('-', sep)),
            Filter::Format(spec) => spec.apply(key, value),
            Filter::Type => Ok(match value.to_string().to_lowercase().as_str() {
                "bias" => "b",
                "dark" => "d",
                "object" => "e",
                "flat" | "skyflat" => "f",
                _ => "",
            }
            .to_owned()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Part {
    Literal(String),
    Field { key: String, filter: Option<Filter> },
}

/// Builds filenames from a template like
/// `/cache/{DAY-OBS|date:}-{FRAMENUM|string:04d}-{IMAGETYP|type}00.fits`,
/// filling each `{KEY}` or `{KEY|filter:arg}` from a FITS header.
#[derive(Debug, Clone, PartialEq)]
pub struct FilenameFormatter {
    template: String,
    parts: Vec<Part>,
}

impl FilenameFormatter {
    pub fn new(template: &str) -> Result<Self> {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars();
        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    let mut field = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some('{') | None => {
                                return Err(Error::Filename(format!(
                                    "unbalanced braces in {template:?}"
                                )))
                            }
                            Some(c) => field.push(c),
                        }
                    }
                    if !literal.is_empty() {
                        parts.push(Part::Literal(std::mem::take(&mut literal)));
                    }
                    parts.push(Self::parse_field(&field)?);
                }
                '}' => {
                    return Err(Error::Filename(format!(
                        "unbalanced braces in {template:?}"
                    )))
                }
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            parts.push(Part::Literal(literal));
        }
        Ok(Self {
            template: template.to_owned(),
            parts,
        })
    }

    fn parse_field(field: &str) -> Result<Part> {
        let (key, filter) = match field.split_once('|') {
            Some((key, filter)) => {
                let (name, arg) = match filter.split_once(':') {
                    Some((name, arg)) => (name, Some(arg)),
                    None => (filter, None),
                };
                (key, Some(Filter::parse(name.trim(), arg)?))
            }
            None => (field, None),
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(Error::Filename("empty placeholder".into()));
        }
        Ok(Part::Field {
            key: key.to_uppercase(),
            filter,
        })
    }

    /// Fill the template from `header`. Every referenced key must be present.
    pub fn format(&self, header: &FitsHeader) -> Result<String> {
        let mut out = String::with_capacity(self.template.len());
        for part in &self.parts {
            match part {
                Part::Literal(s) => out.push_str(s),
                Part::Field { key, filter } => {
                    let value = header
                        .get(key)
                        .ok_or_else(|| Error::Filename(format!("missing header {key}")))?;
                    match filter {
                        Some(f) => out.push_str(&f.apply(key, value)?),
                        None => out.push_str(&value.to_string()),
                    }
                }
            }
        }
        Ok(out)
    }
}

impl Display for FilenameFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.template)
    }
}
