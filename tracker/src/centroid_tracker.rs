use log::{debug, trace};
use nalgebra::{DMatrix, Point2};
use ordered_hash_map::OrderedHashMap;

use crate::{BoundingBox, Result, Track, TrackSnapshot, TrackerConfig, UnmatchedPolicy};

/// Follows detections across frames by greedily pairing them with the nearest tracked centroid.
///
/// Every track keeps a confidence score that goes up by 2 on a match and down by 1 on a miss
/// without bounds. A track missing for more than [`TrackerConfig::max_missing_count`]
/// consecutive updates is deregistered by the update that crosses the threshold. Ids come from
/// a per-instance counter and are never handed out twice.
///
/// Calls must be serialized by the caller. One instance per camera stream.
#[derive(Debug)]
pub struct CentroidTracker {
    config: TrackerConfig,
    /// Live tracks in registration order.
    tracks: OrderedHashMap<u64, Track>,
    next_id: u64,
}

impl Default for CentroidTracker {
    fn default() -> Self {
        let config = TrackerConfig::default();
        Self {
            next_id: config.first_id,
            config,
            tracks: OrderedHashMap::new(),
        }
    }
}

impl CentroidTracker {
    pub fn new(config: TrackerConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            next_id: config.first_id,
            config,
            tracks: OrderedHashMap::new(),
        })
    }

    #[inline]
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// The id the next registered track will get.
    #[inline]
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    #[inline]
    pub fn get(&self, id: u64) -> Option<&Track> {
        self.tracks.get(&id)
    }

    /// Live tracks in registration order.
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    /// Starts tracking `centroid` under a fresh id and returns that id.
    pub fn register(&mut self, centroid: Point2<f64>) -> Result<u64> {
        let id = self.next_id;
        let track = Track::new(id, centroid, self.config.velocity_window)?;

        self.tracks.insert(id, track);
        self.next_id += 1;
        debug!(
            target: "tracker",
            "registered track {id} at ({:.1}, {:.1})",
            centroid.x,
            centroid.y
        );

        Ok(id)
    }

    /// Stops tracking `id`, returning its last state.
    pub fn deregister(&mut self, id: u64) -> Option<Track> {
        let track = self.tracks.remove(&id)?;
        debug!(
            target: "tracker",
            "deregistered track {id} after {} missed updates with confidence {}",
            track.missing_count(),
            track.confidence()
        );

        Some(track)
    }

    /// Advances the tracker by one frame of `detections` and returns every live track.
    ///
    /// When box validation is enabled, a malformed box fails the call before any track is
    /// touched.
    pub fn update(&mut self, detections: &[BoundingBox]) -> Result<Vec<TrackSnapshot>> {
        if self.config.validate_boxes {
            for detection in detections {
                detection.validate()?;
            }
        }

        if detections.is_empty() {
            let ids = self.tracks.keys().copied().collect::<Vec<_>>();
            self.mark_missing(&ids);
            return Ok(self.snapshot());
        }

        let centroids = detections
            .iter()
            .map(BoundingBox::centroid)
            .collect::<Vec<_>>();
        if self.tracks.is_empty() {
            for centroid in centroids {
                self.register(centroid)?;
            }
        } else {
            self.match_detections(detections, &centroids)?;
        }

        Ok(self.snapshot())
    }

    pub fn snapshot(&self) -> Vec<TrackSnapshot> {
        self.tracks.values().map(Track::snapshot).collect()
    }

    fn match_detections(
        &mut self,
        detections: &[BoundingBox],
        centroids: &[Point2<f64>],
    ) -> Result<()> {
        let ids = self.tracks.keys().copied().collect::<Vec<_>>();
        let tracked = self
            .tracks
            .values()
            .map(Track::centroid)
            .collect::<Vec<_>>();
        let distances = DMatrix::from_fn(tracked.len(), centroids.len(), |row, col| {
            nalgebra::distance(&tracked[row], &centroids[col])
        });
        let (matches, unmatched_rows, unmatched_cols) =
            greedy_assignment(&distances, self.config.max_distance);

        for (row, col) in matches {
            if let Some(track) = self.tracks.get_mut(&ids[row]) {
                track.update(centroids[col], detections[col])?;
                trace!(
                    target: "tracker",
                    "matched track {} to detection {col} at distance {:.2}",
                    ids[row],
                    distances[(row, col)]
                );
            }
        }

        let (mark_rows, register_cols) = match self.config.unmatched_policy {
            UnmatchedPolicy::CountGated => {
                let at_least_as_many_tracks = tracked.len() >= centroids.len();
                (at_least_as_many_tracks, !at_least_as_many_tracks)
            }
            UnmatchedPolicy::Always => (true, true),
        };
        if mark_rows {
            let missing = unmatched_rows
                .into_iter()
                .map(|row| ids[row])
                .collect::<Vec<_>>();
            self.mark_missing(&missing);
        }
        if register_cols {
            for col in unmatched_cols {
                self.register(centroids[col])?;
            }
        }

        Ok(())
    }

    fn mark_missing(&mut self, ids: &[u64]) {
        for id in ids {
            let Some(track) = self.tracks.get_mut(id) else {
                continue;
            };
            track.mark_missing();
            if track.missing_count() > self.config.max_missing_count {
                self.deregister(*id);
            }
        }
    }
}

/// Greedily pairs rows (tracks) with columns (detections) of `distances`.
///
/// Rows are visited by their own minimum distance ascending, ties kept in row order. Each row
/// only tries its closest column, taking the first on ties, and gives up if that column is
/// taken or farther than `max_distance`.
///
/// Returns the `(row, col)` matches, the unmatched rows and the unmatched columns.
fn greedy_assignment(
    distances: &DMatrix<f64>,
    max_distance: f64,
) -> (Vec<(usize, usize)>, Vec<usize>, Vec<usize>) {
    let (n, m) = distances.shape();
    if n == 0 || m == 0 {
        return (vec![], (0..n).collect(), (0..m).collect());
    }

    let mut candidates = (0..n)
        .map(|row| {
            let mut col = 0;
            for j in 1..m {
                if distances[(row, j)] < distances[(row, col)] {
                    col = j;
                }
            }
            (row, col, distances[(row, col)])
        })
        .collect::<Vec<_>>();
    candidates.sort_by(|a, b| a.2.total_cmp(&b.2));

    let mut matches = Vec::new();
    let mut used_rows = vec![false; n];
    let mut used_cols = vec![false; m];
    for (row, col, distance) in candidates {
        if used_rows[row] || used_cols[col] || distance > max_distance {
            continue;
        }
        used_rows[row] = true;
        used_cols[col] = true;
        matches.push((row, col));
    }

    let unmatched_rows = (0..n).filter(|row| !used_rows[*row]).collect();
    let unmatched_cols = (0..m).filter(|col| !used_cols[*col]).collect();

    (matches, unmatched_rows, unmatched_cols)
}
