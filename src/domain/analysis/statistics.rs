//! Descriptive statistics and simple linear regression

use std::cmp::Ordering;

/// Rounds half up to the given number of decimals, non-finite values become zero
pub fn round(value: f64, scale: i32) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }

    let factor = 10f64.powi(scale);
    (value * factor + 0.5).floor() / factor
}

/// Sample of values which can be queried for common statistics
///
/// Statistics of an empty sample are `NaN`.
#[derive(Debug, Clone, Default)]
pub struct Sample {
    sorted: Vec<f64>,
}

impl Sample {
    /// Number of values
    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    /// Whether the sample contains no values
    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    /// Arithmetic mean
    pub fn mean(&self) -> f64 {
        if self.sorted.is_empty() {
            return f64::NAN;
        }

        self.sorted.iter().sum::<f64>() / self.sorted.len() as f64
    }

    /// Bias corrected standard deviation, zero for a single value
    pub fn standard_deviation(&self) -> f64 {
        match self.sorted.len() {
            0 => f64::NAN,
            1 => 0.0,
            n => {
                let mean = self.mean();
                let squares: f64 = self.sorted.iter().map(|v| (v - mean).powi(2)).sum();
                (squares / (n - 1) as f64).sqrt()
            }
        }
    }

    /// Estimates the `p`th percentile (`0 < p <= 100`)
    ///
    /// Interpolates between the closest ranks at position `p * (n + 1) / 100` and clamps
    /// positions outside of the sample to its minimum and maximum.
    pub fn percentile(&self, p: f64) -> f64 {
        let n = self.sorted.len();

        match n {
            0 => f64::NAN,
            1 => self.sorted[0],
            _ => {
                let position = p * (n + 1) as f64 / 100.0;
                let floor = position.floor();
                let fraction = position - floor;

                if position < 1.0 {
                    self.sorted[0]
                } else if position >= n as f64 {
                    self.sorted[n - 1]
                } else {
                    let lower = self.sorted[floor as usize - 1];
                    let upper = self.sorted[floor as usize];
                    lower + fraction * (upper - lower)
                }
            }
        }
    }

    /// Most frequent values in ascending order
    pub fn modes(&self) -> Vec<f64> {
        let mut modes = Vec::new();
        let mut highest = 0;

        let mut start = 0;

        while start < self.sorted.len() {
            let value = self.sorted[start];
            let run = self.sorted[start..]
                .iter()
                .take_while(|v| **v == value)
                .count();

            match run.cmp(&highest) {
                Ordering::Greater => {
                    highest = run;
                    modes.clear();
                    modes.push(value);
                }
                Ordering::Equal => modes.push(value),
                Ordering::Less => {}
            }

            start += run;
        }

        modes
    }
}

impl FromIterator<f64> for Sample {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut sorted: Vec<f64> = iter.into_iter().collect();
        sorted.sort_by(f64::total_cmp);
        Self { sorted }
    }
}

/// Ordinary least squares fit of `y = slope * x + intercept`
#[derive(Debug, Clone, Default)]
pub struct Regression {
    points: Vec<(f64, f64)>,
}

impl Regression {
    /// Adds an observation
    pub fn add(&mut self, x: f64, y: f64) {
        self.points.push((x, y));
    }

    fn means(&self) -> (f64, f64) {
        let n = self.points.len() as f64;
        let x = self.points.iter().map(|(x, _)| x).sum::<f64>() / n;
        let y = self.points.iter().map(|(_, y)| y).sum::<f64>() / n;
        (x, y)
    }

    fn sums_of_squares(&self) -> (f64, f64, f64) {
        let (x_mean, y_mean) = self.means();

        self.points
            .iter()
            .fold((0.0, 0.0, 0.0), |(xx, xy, yy), (x, y)| {
                let dx = x - x_mean;
                let dy = y - y_mean;
                (xx + dx * dx, xy + dx * dy, yy + dy * dy)
            })
    }

    /// Gradient of the fitted line, `NaN` with fewer than two observations
    pub fn slope(&self) -> f64 {
        if self.points.len() < 2 {
            return f64::NAN;
        }

        let (xx, xy, _) = self.sums_of_squares();
        xy / xx
    }

    /// Value of the fitted line at `x = 0`
    pub fn intercept(&self) -> f64 {
        let (x_mean, y_mean) = self.means();
        y_mean - self.slope() * x_mean
    }

    /// Coefficient of determination
    pub fn r_squared(&self) -> f64 {
        if self.points.len() < 2 {
            return f64::NAN;
        }

        let (xx, xy, yy) = self.sums_of_squares();
        let explained = xy * xy / xx;
        explained / yy
    }

    /// Pearson correlation coefficient, carrying the sign of the slope
    pub fn r(&self) -> f64 {
        let magnitude = self.r_squared().sqrt();

        if self.slope() < 0.0 {
            -magnitude
        } else {
            magnitude
        }
    }

    /// Value of the fitted line at `x`
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept() + self.slope() * x
    }
}
