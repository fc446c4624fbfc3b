use serde::{Deserialize, Serialize};

use super::{Metric, RegistryError};

/// Range `[lower_bound, upper_bound)` mapped to a named label. With
/// `upper_inclusive` the range becomes `[lower_bound, upper_bound]` and the
/// shared cut point belongs to this band rather than the next one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdBand {
    pub name: String,
    pub jurisdiction: String,
    pub metric: Metric,
    pub lower_bound: f64,
    /// `None` marks the open-ended top band.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper_bound: Option<f64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub upper_inclusive: bool,
    pub label: String,
    /// Contribution of the band when used as a scoring factor.
    #[serde(default)]
    pub points: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance: Option<String>,
}

impl ThresholdBand {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower_bound
            && self.upper_bound.map_or(true, |upper| {
                value < upper || (self.upper_inclusive && value == upper)
            })
    }
}

/// Ordered, contiguous and non-overlapping bands for one jurisdiction/metric.
#[derive(Debug, Clone, PartialEq)]
pub struct BandTable {
    bands: Vec<ThresholdBand>,
}

impl BandTable {
    pub(crate) fn new(
        jurisdiction: &str,
        metric: Metric,
        mut bands: Vec<ThresholdBand>,
    ) -> Result<Self, RegistryError> {
        let invalid = |band: &ThresholdBand| RegistryError::InvalidBand {
            jurisdiction: jurisdiction.to_string(),
            metric,
            band: band.name.clone(),
        };

        for band in &bands {
            if !band.lower_bound.is_finite() || !band.points.is_finite() {
                return Err(invalid(band));
            }
            if let Some(upper) = band.upper_bound {
                if !upper.is_finite() || upper <= band.lower_bound {
                    return Err(invalid(band));
                }
            }
        }

        bands.sort_by(|a, b| a.lower_bound.total_cmp(&b.lower_bound));

        for pair in bands.windows(2) {
            let (first, second) = (&pair[0], &pair[1]);
            let Some(upper) = first.upper_bound else {
                return Err(RegistryError::UnboundedBand {
                    jurisdiction: jurisdiction.to_string(),
                    metric,
                    band: first.name.clone(),
                });
            };
            if upper > second.lower_bound {
                return Err(RegistryError::OverlappingBands {
                    jurisdiction: jurisdiction.to_string(),
                    metric,
                    first: first.name.clone(),
                    second: second.name.clone(),
                });
            }
            if upper < second.lower_bound {
                return Err(RegistryError::GapBetweenBands {
                    jurisdiction: jurisdiction.to_string(),
                    metric,
                    first: first.name.clone(),
                    second: second.name.clone(),
                });
            }
        }

        Ok(Self { bands })
    }

    /// The single band containing `value`, or `None` when the value lies
    /// outside the table (including NaN). Bands are scanned in ascending
    /// order, so an inclusive upper bound claims the cut point it shares
    /// with the next band.
    pub fn classify(&self, value: f64) -> Option<&ThresholdBand> {
        if value.is_nan() {
            return None;
        }
        self.bands.iter().find(|band| band.contains(value))
    }

    pub fn bands(&self) -> &[ThresholdBand] {
        &self.bands
    }

    pub fn max_points(&self) -> f64 {
        self.bands
            .iter()
            .map(|band| band.points)
            .fold(0.0, f64::max)
    }
}
