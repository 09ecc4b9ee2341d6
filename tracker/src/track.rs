use nalgebra::{DVector, Point2, Vector2};
use serde::{Deserialize, Serialize};

use crate::{Error, MovingAverage, Result};

/// An axis-aligned detection box given by its top-left `(x1, y1)` and bottom-right `(x2, y2)`
/// corners.
///
/// Serialized as `[x1, y1, x2, y2]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(into = "[f64; 4]", try_from = "Vec<f64>")]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// The midpoint of the diagonal.
    #[inline]
    pub fn centroid(&self) -> Point2<f64> {
        Point2::new((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    /// Fails when a coordinate is not finite or the corners are inverted.
    pub fn validate(&self) -> Result<()> {
        if ![self.x1, self.y1, self.x2, self.y2]
            .iter()
            .all(|value| value.is_finite())
        {
            return Err(Error::Validation(format!(
                "{self:?} has a non-finite coordinate"
            )));
        }
        if self.x1 > self.x2 || self.y1 > self.y2 {
            return Err(Error::Validation(format!(
                "{self:?} has its corners inverted"
            )));
        }

        Ok(())
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from([x1, y1, x2, y2]: [f64; 4]) -> Self {
        Self::new(x1, y1, x2, y2)
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(bbox: BoundingBox) -> Self {
        [bbox.x1, bbox.y1, bbox.x2, bbox.y2]
    }
}

impl TryFrom<&[f64]> for BoundingBox {
    type Error = Error;

    fn try_from(values: &[f64]) -> Result<Self> {
        let coordinates = <[f64; 4]>::try_from(values).map_err(|_| {
            Error::Validation(format!(
                "expected 4 coordinates (x1, y1, x2, y2), got {}",
                values.len()
            ))
        })?;

        Ok(Self::from(coordinates))
    }
}

impl TryFrom<Vec<f64>> for BoundingBox {
    type Error = Error;

    fn try_from(values: Vec<f64>) -> Result<Self> {
        Self::try_from(values.as_slice())
    }
}

/// A persistently identified object followed across frames.
#[derive(Debug, Clone)]
pub struct Track {
    id: u64,
    centroid: Point2<f64>,
    /// [`None`] until the first successful match.
    bounding_box: Option<BoundingBox>,
    /// Previous centroid minus current centroid of the latest match.
    velocity: Vector2<f64>,
    smoothed_velocity: Vector2<f64>,
    velocity_average: MovingAverage,
    confidence: i64,
    missing_count: u32,
}

impl Track {
    const MATCH_CONFIDENCE: i64 = 2;
    const MISS_CONFIDENCE: i64 = 1;

    pub(crate) fn new(id: u64, centroid: Point2<f64>, velocity_window: usize) -> Result<Self> {
        Ok(Self {
            id,
            centroid,
            bounding_box: None,
            velocity: Vector2::zeros(),
            smoothed_velocity: Vector2::zeros(),
            velocity_average: MovingAverage::with_initial(velocity_window, DVector::zeros(2))?,
            confidence: 0,
            missing_count: 0,
        })
    }

    /// Moves the track onto a matched detection.
    pub(crate) fn update(
        &mut self,
        centroid: Point2<f64>,
        bounding_box: BoundingBox,
    ) -> Result<()> {
        let velocity = self.centroid - centroid;
        let smoothed = self
            .velocity_average
            .update(DVector::from_column_slice(velocity.as_slice()))?;

        self.smoothed_velocity = Vector2::new(smoothed[0], smoothed[1]);
        self.velocity = velocity;
        self.centroid = centroid;
        self.bounding_box = Some(bounding_box);
        self.missing_count = 0;
        self.confidence += Self::MATCH_CONFIDENCE;
        Ok(())
    }

    /// Records one missed update cycle.
    pub(crate) fn mark_missing(&mut self) {
        self.missing_count += 1;
        self.confidence -= Self::MISS_CONFIDENCE;
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn centroid(&self) -> Point2<f64> {
        self.centroid
    }

    #[inline]
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.bounding_box
    }

    #[inline]
    pub fn velocity(&self) -> Vector2<f64> {
        self.velocity
    }

    #[inline]
    pub fn smoothed_velocity(&self) -> Vector2<f64> {
        self.smoothed_velocity
    }

    #[inline]
    pub fn confidence(&self) -> i64 {
        self.confidence
    }

    #[inline]
    pub fn missing_count(&self) -> u32 {
        self.missing_count
    }

    pub fn snapshot(&self) -> TrackSnapshot {
        TrackSnapshot {
            id: self.id,
            centroid: [self.centroid.x, self.centroid.y],
            bounding_box: self.bounding_box,
            velocity: [self.velocity.x, self.velocity.y],
            smoothed_velocity: [self.smoothed_velocity.x, self.smoothed_velocity.y],
            confidence: self.confidence,
            missing_count: self.missing_count,
        }
    }
}

/// A copy of a [`Track`] state handed back to the caller after each update.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrackSnapshot {
    pub id: u64,
    pub centroid: [f64; 2],
    pub bounding_box: Option<BoundingBox>,
    pub velocity: [f64; 2],
    pub smoothed_velocity: [f64; 2],
    pub confidence: i64,
    pub missing_count: u32,
}

#[cfg(test)]
mod test {
    use nalgebra::{Point2, Vector2};

    use super::{BoundingBox, Track};
    use crate::Error;

    #[test]
    fn centroid_is_diagonal_midpoint() {
        let bbox = BoundingBox::new(10.0, 20.0, 31.0, 40.0);

        assert_eq!(bbox.centroid(), Point2::new(20.5, 30.0));
    }

    #[test]
    fn validate_rejects_inverted_and_non_finite() {
        assert!(BoundingBox::new(0.0, 0.0, 10.0, 10.0).validate().is_ok());
        assert!(BoundingBox::new(5.0, 5.0, 5.0, 5.0).validate().is_ok());
        assert!(matches!(
            BoundingBox::new(10.0, 0.0, 0.0, 10.0).validate(),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            BoundingBox::new(0.0, 10.0, 10.0, 0.0).validate(),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            BoundingBox::new(0.0, f64::NAN, 10.0, 10.0).validate(),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            BoundingBox::new(0.0, 0.0, f64::INFINITY, 10.0).validate(),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn try_from_rejects_wrong_arity() {
        assert_eq!(
            BoundingBox::try_from([1.0, 2.0, 3.0, 4.0].as_slice()),
            Ok(BoundingBox::new(1.0, 2.0, 3.0, 4.0))
        );
        assert!(matches!(
            BoundingBox::try_from([1.0, 2.0, 3.0].as_slice()),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            BoundingBox::try_from(vec![1.0, 2.0, 3.0, 4.0, 5.0]),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn deserialize_from_array() {
        let boxes = serde_json::from_str::<Vec<BoundingBox>>("[[0, 0, 10, 20], [5.5, 1, 6, 2]]")
            .unwrap();

        assert_eq!(
            boxes,
            vec![
                BoundingBox::new(0.0, 0.0, 10.0, 20.0),
                BoundingBox::new(5.5, 1.0, 6.0, 2.0)
            ]
        );
        assert!(serde_json::from_str::<BoundingBox>("[0, 0, 10]").is_err());
    }

    #[test]
    fn new_track_is_at_rest() {
        let track = Track::new(3, Point2::new(4.0, 5.0), 10).unwrap();

        assert_eq!(track.id(), 3);
        assert_eq!(track.centroid(), Point2::new(4.0, 5.0));
        assert_eq!(track.bounding_box(), None);
        assert_eq!(track.velocity(), Vector2::zeros());
        assert_eq!(track.smoothed_velocity(), Vector2::zeros());
        assert_eq!(track.confidence(), 0);
        assert_eq!(track.missing_count(), 0);
    }

    #[test]
    fn update_points_velocity_from_new_to_old_centroid() {
        let mut track = Track::new(0, Point2::new(10.0, 10.0), 2).unwrap();
        track.mark_missing();

        track
            .update(Point2::new(14.0, 7.0), BoundingBox::new(12.0, 5.0, 16.0, 9.0))
            .unwrap();

        assert_eq!(track.velocity(), Vector2::new(-4.0, 3.0));
        assert_eq!(track.smoothed_velocity(), Vector2::new(-2.0, 1.5));
        assert_eq!(track.centroid(), Point2::new(14.0, 7.0));
        assert_eq!(
            track.bounding_box(),
            Some(BoundingBox::new(12.0, 5.0, 16.0, 9.0))
        );
        assert_eq!(track.missing_count(), 0);
        assert_eq!(track.confidence(), 1);
    }
}
