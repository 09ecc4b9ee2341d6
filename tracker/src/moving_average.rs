use std::{collections::VecDeque, iter};

use nalgebra::DVector;

use crate::{Error, Result};

/// A sliding window mean over vector samples of a fixed dimension.
///
/// The window starts as `window_size` zero vectors shaped by the first sample and the mean is
/// maintained incrementally as `mean += (sample - oldest) / window_size`. Nothing re-sums the
/// window, so floating-point error accumulates over very long runs and is not corrected.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    window_size: usize,
    /// Oldest sample first. Empty until the first sample decides the dimension.
    samples: VecDeque<DVector<f64>>,
    mean: DVector<f64>,
}

impl MovingAverage {
    pub fn new(window_size: usize) -> Result<Self> {
        if window_size == 0 {
            return Err(Error::Configuration {
                field: "window_size",
                reason: "must be greater than 0".to_string(),
            });
        }

        Ok(Self {
            window_size,
            samples: VecDeque::with_capacity(window_size),
            mean: DVector::zeros(0),
        })
    }

    /// Creates a [`MovingAverage`] whose zero-filled window is shaped by `sample` and then
    /// pushes `sample` into it.
    pub fn with_initial(window_size: usize, sample: DVector<f64>) -> Result<Self> {
        let mut average = Self::new(window_size)?;
        average.update(sample)?;
        Ok(average)
    }

    /// Pushes `sample`, evicting the oldest one, and returns the updated mean.
    ///
    /// Fails with [`Error::ShapeMismatch`] without touching the window when `sample` does not
    /// have the dimension established by the first sample.
    pub fn update(&mut self, sample: DVector<f64>) -> Result<&DVector<f64>> {
        if self.samples.is_empty() {
            self.samples.extend(iter::repeat_n(
                DVector::zeros(sample.len()),
                self.window_size,
            ));
            self.mean = DVector::zeros(sample.len());
        } else if sample.len() != self.mean.len() {
            return Err(Error::ShapeMismatch {
                expected: self.mean.len(),
                actual: sample.len(),
            });
        }

        if let Some(oldest) = self.samples.pop_front() {
            self.mean += (&sample - oldest) / self.window_size as f64;
        }
        self.samples.push_back(sample);

        Ok(&self.mean)
    }

    #[inline]
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// The current mean or [`None`] if no sample has been pushed yet.
    #[inline]
    pub fn mean(&self) -> Option<&DVector<f64>> {
        (!self.samples.is_empty()).then_some(&self.mean)
    }

    #[inline]
    pub fn dimension(&self) -> Option<usize> {
        (!self.samples.is_empty()).then_some(self.mean.len())
    }

    /// The window contents, oldest first.
    pub fn samples(&self) -> impl Iterator<Item = &DVector<f64>> {
        self.samples.iter()
    }
}
