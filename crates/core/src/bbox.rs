use crate::{Error, Result};
use geo::{Coord, Rect};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A bounding box, in either two or three dimensions.
///
/// The order is `[xmin, ymin, xmax, ymax]` or `[xmin, ymin, zmin, xmax, ymax,
/// zmax]`. A box whose `xmin` is greater than its `xmax` crosses the
/// antimeridian.
///
/// # Examples
///
/// ```
/// use stac_search::Bbox;
///
/// let bbox: Bbox = "-106,40,-105,41".parse().unwrap();
/// assert_eq!(bbox, Bbox::new(-106., 40., -105., 41.));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub enum Bbox {
    /// A two-dimensional bounding box.
    TwoDimensional([f64; 4]),

    /// A three-dimensional bounding box.
    ThreeDimensional([f64; 6]),
}

impl Bbox {
    /// Creates a new two-dimensional bounding box.
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Bbox {
        Bbox::TwoDimensional([xmin, ymin, xmax, ymax])
    }

    /// Returns the minimum x value.
    pub fn xmin(&self) -> f64 {
        match self {
            Bbox::TwoDimensional(b) => b[0],
            Bbox::ThreeDimensional(b) => b[0],
        }
    }

    /// Returns the minimum y value.
    pub fn ymin(&self) -> f64 {
        match self {
            Bbox::TwoDimensional(b) => b[1],
            Bbox::ThreeDimensional(b) => b[1],
        }
    }

    /// Returns the maximum x value.
    pub fn xmax(&self) -> f64 {
        match self {
            Bbox::TwoDimensional(b) => b[2],
            Bbox::ThreeDimensional(b) => b[3],
        }
    }

    /// Returns the maximum y value.
    pub fn ymax(&self) -> f64 {
        match self {
            Bbox::TwoDimensional(b) => b[3],
            Bbox::ThreeDimensional(b) => b[4],
        }
    }

    /// Returns true if this box crosses the antimeridian.
    ///
    /// # Examples
    ///
    /// ```
    /// use stac_search::Bbox;
    ///
    /// assert!(Bbox::new(170., -10., -170., 10.).crosses_antimeridian());
    /// assert!(!Bbox::new(-170., -10., 170., 10.).crosses_antimeridian());
    /// ```
    pub fn crosses_antimeridian(&self) -> bool {
        self.xmin() > self.xmax()
    }

    /// Returns the planar rectangles covered by this box.
    ///
    /// A box that crosses the antimeridian is split in two.
    pub fn rects(&self) -> Vec<Rect> {
        let rect = |xmin, xmax| {
            Rect::new(
                Coord {
                    x: xmin,
                    y: self.ymin(),
                },
                Coord {
                    x: xmax,
                    y: self.ymax(),
                },
            )
        };
        if self.crosses_antimeridian() {
            vec![rect(self.xmin(), 180.), rect(-180., self.xmax())]
        } else {
            vec![rect(self.xmin(), self.xmax())]
        }
    }

    fn validate(self) -> Result<Bbox> {
        let values: Vec<f64> = self.into();
        if values.iter().any(|v| !v.is_finite()) || self.ymin() > self.ymax() {
            return Err(Error::InvalidBbox(values));
        }
        if let Bbox::ThreeDimensional(b) = self {
            if b[2] > b[5] {
                return Err(Error::InvalidBbox(values));
            }
        }
        Ok(self)
    }
}

impl TryFrom<Vec<f64>> for Bbox {
    type Error = Error;

    fn try_from(value: Vec<f64>) -> Result<Bbox> {
        let bbox = match value.len() {
            4 => Bbox::TwoDimensional([value[0], value[1], value[2], value[3]]),
            6 => Bbox::ThreeDimensional([
                value[0], value[1], value[2], value[3], value[4], value[5],
            ]),
            _ => return Err(Error::InvalidBbox(value)),
        };
        bbox.validate()
    }
}

impl From<Bbox> for Vec<f64> {
    fn from(bbox: Bbox) -> Vec<f64> {
        match bbox {
            Bbox::TwoDimensional(b) => b.to_vec(),
            Bbox::ThreeDimensional(b) => b.to_vec(),
        }
    }
}

impl FromStr for Bbox {
    type Err = Error;

    fn from_str(s: &str) -> Result<Bbox> {
        let values = s
            .split(',')
            .map(|v| {
                v.trim()
                    .parse::<f64>()
                    .map_err(|_| Error::InvalidBbox(Vec::new()))
            })
            .collect::<Result<Vec<_>>>()?;
        values.try_into()
    }
}

impl std::fmt::Display for Bbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let values: Vec<f64> = (*self).into();
        let strings: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        f.write_str(&strings.join(","))
    }
}
