use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

/// The sizes added by the preset flags, in the order they are requested.
pub const PRESET_SIZES: [u16; 5] = [16, 24, 32, 48, 256];

/// The edge length of a square entry, always within `1..=256`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IconSize(u16);

impl IconSize {
    pub const MIN: u16 = 1;
    pub const MAX: u16 = 256;

    pub fn new(size: u16) -> Result<Self, RequestError> {
        if (Self::MIN..=Self::MAX).contains(&size) {
            Ok(Self(size))
        } else {
            Err(RequestError::SizeOutOfRange(size.to_string()))
        }
    }

    pub fn get(self) -> u16 {
        self.0
    }

    /// The value stored in the width and height bytes of a directory entry.
    pub fn directory_byte(self) -> u8 {
        if self.0 == Self::MAX {
            0
        } else {
            self.0 as u8
        }
    }
}

impl Display for IconSize {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.0, self.0)
    }
}

impl FromStr for IconSize {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let size = s
            .trim()
            .parse::<u32>()
            .map_err(|_| RequestError::InvalidNumber(s.to_owned()))?;

        u16::try_from(size)
            .ok()
            .and_then(|size| Self::new(size).ok())
            .ok_or_else(|| RequestError::SizeOutOfRange(s.to_owned()))
    }
}

/// A cursor hotspot in normalized coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Hotspot {
    pub x: f64,
    pub y: f64,
}

impl Hotspot {
    pub fn new(x: f64, y: f64) -> Result<Self, RequestError> {
        Ok(Self {
            x: check_unit_interval(x)?,
            y: check_unit_interval(y)?,
        })
    }

    /// Converts the hotspot into pixel offsets within an entry of the given size.
    ///
    /// Coordinates are rounded to the nearest pixel, so 1.0 maps to `size` itself.
    pub fn to_pixels(self, size: IconSize) -> (u16, u16) {
        let size = size.get() as f64;
        let scale = |v: f64| (v * size).round() as u16;
        (scale(self.x), scale(self.y))
    }
}

fn check_unit_interval(value: f64) -> Result<f64, RequestError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(RequestError::CoordinateOutOfRange(value.to_string()))
    }
}

/// Parses a hotspot coordinate.
///
/// Accepts either a number in `[0, 1]` or an integer ratio such as `4/16`.
pub fn parse_coordinate(s: &str) -> Result<f64, RequestError> {
    let invalid = || RequestError::InvalidNumber(s.to_owned());

    let value = match s.trim().split_once('/') {
        Some((numerator, denominator)) => {
            let numerator = numerator.trim().parse::<u32>().map_err(|_| invalid())?;
            let denominator = denominator.trim().parse::<u32>().map_err(|_| invalid())?;
            if denominator == 0 {
                return Err(invalid());
            }

            numerator as f64 / denominator as f64
        }
        None => s.trim().parse::<f64>().map_err(|_| invalid())?,
    };

    if value.is_nan() {
        return Err(invalid());
    }

    check_unit_interval(value).map_err(|_| RequestError::CoordinateOutOfRange(s.to_owned()))
}

/// A single requested output size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputRequest {
    pub size: IconSize,
    pub hotspot: Hotspot,

    /// Whether any hotspot was defined before this request was made
    pub hotspot_set: bool,
}

/// The requested output sizes, unique by size.
#[derive(Debug, Clone, Default)]
pub struct OutputRequestTable {
    requests: Vec<OutputRequest>,
}

impl OutputRequestTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a request, replacing any earlier request for the same size.
    pub fn insert(&mut self, request: OutputRequest) {
        match self.requests.iter_mut().find(|r| r.size == request.size) {
            Some(existing) => *existing = request,
            None => self.requests.push(request),
        }
    }

    pub fn get(&self, size: IconSize) -> Option<&OutputRequest> {
        self.requests.iter().find(|r| r.size == size)
    }

    /// Iterates the requests in the order their sizes were first requested.
    pub fn iter(&self) -> std::slice::Iter<'_, OutputRequest> {
        self.requests.iter()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Whether the table describes a cursor rather than an icon.
    pub fn is_cursor(&self) -> bool {
        self.requests.iter().any(|r| r.hotspot_set)
    }
}

/// Builds a request table from an ordered stream of hotspot and size declarations.
///
/// The most recent hotspot applies to every size requested after it.
#[derive(Debug, Default)]
pub struct RequestTableBuilder {
    table: OutputRequestTable,
    hotspot: Hotspot,
    hotspot_set: bool,
}

impl RequestTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hotspot_x(&mut self, x: f64) -> Result<&mut Self, RequestError> {
        self.hotspot.x = check_unit_interval(x)?;
        self.hotspot_set = true;
        Ok(self)
    }

    pub fn hotspot_y(&mut self, y: f64) -> Result<&mut Self, RequestError> {
        self.hotspot.y = check_unit_interval(y)?;
        self.hotspot_set = true;
        Ok(self)
    }

    pub fn request(&mut self, size: IconSize) -> &mut Self {
        self.table.insert(OutputRequest {
            size,
            hotspot: self.hotspot,
            hotspot_set: self.hotspot_set,
        });
        self
    }

    /// Requests every preset size.
    pub fn request_presets(&mut self) -> &mut Self {
        for size in PRESET_SIZES {
            self.request(IconSize(size));
        }
        self
    }

    pub fn build(self) -> OutputRequestTable {
        self.table
    }
}

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("{0:?} is not a valid number")]
    InvalidNumber(String),

    #[error("size {0} is outside of the range 1 to 256")]
    SizeOutOfRange(String),

    #[error("hotspot coordinate {0} is outside of the range 0 to 1")]
    CoordinateOutOfRange(String),
}
