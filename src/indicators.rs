//! Indicator helpers exposed to strategy scripts. All outputs are
//! aligned 1:1 with the input slice; warm-up positions are seeded with
//! a neutral value so scripts can index freely.

pub fn sma(prices: &[f64], period: usize) -> Vec<f64> {
    if prices.is_empty() {
        return Vec::new();
    }
    if period <= 1 || prices.len() < period {
        return prices.to_vec();
    }

    let mut values = Vec::with_capacity(prices.len());
    for _ in 0..period - 1 {
        values.push(prices[0]);
    }

    let mut window_sum: f64 = prices[..period].iter().sum();
    values.push(window_sum / period as f64);
    for i in period..prices.len() {
        window_sum += prices[i] - prices[i - period];
        values.push(window_sum / period as f64);
    }

    values
}

pub fn ema(prices: &[f64], period: usize) -> Vec<f64> {
    if prices.is_empty() {
        return Vec::new();
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut values = Vec::with_capacity(prices.len());
    values.push(prices[0]);
    for i in 1..prices.len() {
        let next = prices[i] * multiplier + values[i - 1] * (1.0 - multiplier);
        values.push(next);
    }

    values
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else if avg_gain == 0.0 {
        0.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

/// Wilder-smoothed RSI; warm-up bars read as neutral 50.
pub fn rsi(prices: &[f64], period: usize) -> Vec<f64> {
    if prices.is_empty() {
        return Vec::new();
    }
    if period == 0 || prices.len() < period + 1 {
        return vec![50.0; prices.len()];
    }

    let mut values = vec![50.0; prices.len()];
    let mut sum_gain = 0.0f64;
    let mut sum_loss = 0.0f64;
    for i in 1..=period {
        let delta = prices[i] - prices[i - 1];
        if delta >= 0.0 {
            sum_gain += delta;
        } else {
            sum_loss -= delta;
        }
    }

    let mut avg_gain = sum_gain / period as f64;
    let mut avg_loss = sum_loss / period as f64;
    values[period] = rsi_from_averages(avg_gain, avg_loss);

    for i in (period + 1)..prices.len() {
        let delta = prices[i] - prices[i - 1];
        let gain = delta.max(0.0);
        let loss = (-delta).max(0.0);
        avg_gain = (avg_gain * (period as f64 - 1.0) + gain) / period as f64;
        avg_loss = (avg_loss * (period as f64 - 1.0) + loss) / period as f64;
        values[i] = rsi_from_averages(avg_gain, avg_loss);
    }

    values
}

/// MACD line, signal line and histogram.
pub fn macd(
    prices: &[f64],
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let fast = ema(prices, fast_period);
    let slow = ema(prices, slow_period);

    let line: Vec<f64> = fast.iter().zip(slow.iter()).map(|(f, s)| f - s).collect();
    let signal = ema(&line, signal_period);
    let histogram: Vec<f64> = line
        .iter()
        .zip(signal.iter())
        .map(|(l, s)| l - s)
        .collect();

    (line, signal, histogram)
}

/// Bollinger bands around an SMA midline; warm-up bars collapse onto
/// the midline.
pub fn bollinger_bands(prices: &[f64], period: usize, std_dev: f64) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let middle = sma(prices, period);
    if period <= 1 || prices.len() < period {
        return (middle.clone(), middle.clone(), middle);
    }

    let mut upper = middle.clone();
    let mut lower = middle.clone();
    for i in (period - 1)..prices.len() {
        let window = &prices[i + 1 - period..=i];
        let mean = middle[i];
        let variance =
            window.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / period as f64;
        let deviation = variance.sqrt() * std_dev;
        upper[i] = mean + deviation;
        lower[i] = mean - deviation;
    }

    (upper, middle, lower)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_matches_hand_computed_window() {
        let prices = [1.0, 2.0, 3.0, 4.0, 5.0];
        let values = sma(&prices, 3);
        assert_eq!(values.len(), prices.len());
        assert_eq!(values[2], 2.0);
        assert_eq!(values[4], 4.0);
    }

    #[test]
    fn ema_starts_at_first_price() {
        let prices = [10.0, 11.0, 12.0];
        let values = ema(&prices, 2);
        assert_eq!(values[0], 10.0);
        assert!(values[2] > values[1]);
    }

    #[test]
    fn rsi_saturates_on_monotone_series() {
        let rising: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let values = rsi(&rising, 14);
        assert_eq!(values[5], 50.0); // warm-up
        assert_eq!(values[19], 100.0);

        let falling: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();
        assert_eq!(rsi(&falling, 14)[19], 0.0);
    }

    #[test]
    fn macd_is_zero_on_constant_prices() {
        let prices = vec![50.0; 40];
        let (line, signal, histogram) = macd(&prices, 12, 26, 9);
        assert!(line.iter().all(|v| v.abs() < 1e-12));
        assert!(signal.iter().all(|v| v.abs() < 1e-12));
        assert!(histogram.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn bollinger_bands_bracket_the_midline() {
        let prices: Vec<f64> = (0..30).map(|i| 100.0 + (i % 5) as f64).collect();
        let (upper, middle, lower) = bollinger_bands(&prices, 20, 2.0);
        for i in 19..prices.len() {
            assert!(upper[i] > middle[i]);
            assert!(lower[i] < middle[i]);
        }
    }
}
