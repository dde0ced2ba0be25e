use std::fmt;

/// Median of one worker's per-round entry counts. Sorts `entries` in place.
pub fn median(entries: &mut [usize]) -> usize {
    assert!(!entries.is_empty(), "median of no rounds");
    entries.sort_unstable();
    let mid = entries.len() / 2;
    if entries.len() % 2 == 0 {
        (entries[mid - 1] + entries[mid]) / 2
    } else {
        entries[mid]
    }
}

/// Aggregate throughput and fairness of one experiment, printed as `N T sum mean stddev cv%`.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub threads: usize,
    pub seconds: u64,
    pub entries: Vec<usize>,
    pub sum: f64,
    pub mean: f64,
    pub std_dev: f64,
    /// Coefficient of variation in percent.
    pub cv: f64,
}

impl Summary {
    pub fn new(threads: usize, seconds: u64, entries: Vec<usize>) -> Self {
        let workers = entries.len() as f64;
        let sum = entries.iter().map(|&e| e as f64).sum::<f64>();
        let mean = sum / workers;
        let variance = entries
            .iter()
            .map(|&e| {
                let diff = e as f64 - mean;
                diff * diff
            })
            .sum::<f64>()
            / workers;
        let std_dev = variance.sqrt();
        Self {
            threads,
            seconds,
            entries,
            sum,
            mean,
            std_dev,
            cv: std_dev / mean * 100.0,
        }
    }

    /// A worker that got no entries at all in its median round.
    pub fn starved(&self) -> bool {
        self.entries.iter().any(|&e| e == 0)
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {:.0} {:.1} {:.1} {:.1}%",
            self.threads, self.seconds, self.sum, self.mean, self.std_dev, self.cv
        )
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(vec![5] => 5)]
    #[test_case(vec![9, 1, 5, 3, 7] => 5)]
    #[test_case(vec![4, 1, 3, 2] => 2)]
    #[test_case(vec![100, 0, 100, 100, 0] => 100)]
    fn median_of_rounds(mut entries: Vec<usize>) -> usize {
        median(&mut entries)
    }

    #[test]
    fn fixture_reduction() {
        let s = Summary::new(5, 10, vec![10, 20, 15, 25, 30]);
        assert_eq!(s.sum, 100.0);
        assert_eq!(s.mean, 20.0);
        assert!((s.std_dev - 7.0711).abs() < 1e-4);
        assert!((s.cv - 35.3553).abs() < 1e-4);
        assert!(!s.starved());
        assert_eq!(s.to_string(), "5 10 100 20.0 7.1 35.4%");
    }

    #[test]
    fn even_shares_have_no_dispersion() {
        let s = Summary::new(4, 1, vec![7, 7, 7, 7]);
        assert_eq!(s.std_dev, 0.0);
        assert_eq!(s.cv, 0.0);
    }

    #[test]
    fn zero_share_is_starvation() {
        let s = Summary::new(3, 1, vec![10, 0, 12]);
        assert!(s.starved());
    }
}
