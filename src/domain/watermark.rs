// High/low watermark for one metric
use serde::Serialize;

/// Extreme values of one metric inside a series, with the timestamps
/// (epoch seconds) at which they were seen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Watermark {
    pub high: f64,
    pub high_at: f64,
    pub low: f64,
    pub low_at: f64,
}

impl Watermark {
    pub fn starting_at(value: f64, at: f64) -> Self {
        Self {
            high: value,
            high_at: at,
            low: value,
            low_at: at,
        }
    }

    /// Fold one more sample in. Comparisons are strict, so on ties the
    /// earlier sample keeps the mark.
    pub fn observe(&mut self, value: f64, at: f64) {
        if value > self.high {
            self.high = value;
            self.high_at = at;
        }
        if value < self.low {
            self.low = value;
            self.low_at = at;
        }
    }
}

/// Running watermark that is absent until the first sample arrives.
pub fn track(mark: &mut Option<Watermark>, value: f64, at: f64) {
    match mark {
        Some(mark) => mark.observe(value, at),
        None => *mark = Some(Watermark::starting_at(value, at)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sample_sets_both_bounds() {
        let mut mark = None;
        track(&mut mark, 18.0, 10.0);
        assert_eq!(mark, Some(Watermark::starting_at(18.0, 10.0)));
    }

    #[test]
    fn test_tracks_extremes() {
        let mut mark = None;
        for (at, value) in [(1.0, 15.0), (2.0, 19.5), (3.0, 12.0), (4.0, 14.0)] {
            track(&mut mark, value, at);
        }

        let mark = mark.unwrap();
        assert_eq!((mark.high, mark.high_at), (19.5, 2.0));
        assert_eq!((mark.low, mark.low_at), (12.0, 3.0));
    }

    #[test]
    fn test_ties_keep_earliest() {
        let mut mark = Watermark::starting_at(20.0, 1.0);
        mark.observe(20.0, 2.0);
        assert_eq!(mark.high_at, 1.0);
        assert_eq!(mark.low_at, 1.0);
    }

    #[test]
    fn test_negative_values() {
        let mut mark = None;
        for (at, value) in [(1.0, -5.0), (2.0, -12.5)] {
            track(&mut mark, value, at);
        }
        let mark = mark.unwrap();
        assert_eq!(mark.high, -5.0);
        assert_eq!(mark.low, -12.5);
    }
}
