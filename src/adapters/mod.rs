pub mod blockchain_btc;
pub mod blockchain_eth;
pub mod crypto;
pub mod explorer;
pub mod fundamentals;
pub mod llm_adapter;
pub mod mock;
pub mod stock;

use crate::dto::ChartPoint;

/// Downsamples a chronologically-ordered series to at most 100 points by
/// keeping every `ceil(N/100)`-th entry (spec §4.6 crypto chart rule,
/// reused by the stock adapter's chart downsampling too). Preserves
/// ascending timestamp order; the first point's index is always kept.
pub fn downsample_to_at_most_100(points: Vec<ChartPoint>) -> Vec<ChartPoint> {
    if points.len() <= 100 {
        return points;
    }
    let step = (points.len() as f64 / 100.0).ceil() as usize;
    points
        .into_iter()
        .enumerate()
        .filter(|(i, _)| i % step == 0)
        .map(|(_, p)| p)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(n: usize) -> Vec<ChartPoint> {
        (0..n)
            .map(|i| ChartPoint {
                timestamp: i as i64,
                price: i as f64,
                open: None,
                high: None,
                low: None,
                close: None,
                volume: None,
            })
            .collect()
    }

    #[test]
    fn downsamples_500_points_into_50_to_100_range() {
        let result = downsample_to_at_most_100(series(500));
        assert!(result.len() >= 50 && result.len() <= 100, "len={}", result.len());
        let timestamps: Vec<i64> = result.iter().map(|p| p.timestamp).collect();
        assert!(timestamps.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(timestamps.first(), Some(&0));
    }

    #[test]
    fn leaves_short_series_untouched() {
        let result = downsample_to_at_most_100(series(42));
        assert_eq!(result.len(), 42);
    }

    #[test]
    fn exactly_100_is_untouched() {
        let result = downsample_to_at_most_100(series(100));
        assert_eq!(result.len(), 100);
    }
}
