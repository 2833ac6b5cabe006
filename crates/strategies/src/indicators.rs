//! Oscillators recomputed from the full history window on every call.
//!
//! Nothing here carries state between calls: the window is the only input,
//! which keeps the values free of drift between restarts and evictions.

use crate::window::HistoryWindow;
use serde::{Deserialize, Serialize};

/// The three lines of the KDJ oscillator for the latest bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Kdj {
    pub k: f64,
    pub d: f64,
    pub j: f64,
}

/// The indicator values for the most recent bar in a window.
///
/// A `None` means the window is still shorter than that indicator's look-back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub rsi: Option<f64>,
    pub kdj: Option<Kdj>,
}

impl IndicatorSnapshot {
    /// The oscillator the classifier acts on.
    pub fn j(&self) -> Option<f64> {
        self.kdj.map(|kdj| kdj.j)
    }
}

/// Indicator periods, usually taken from `StrategyParams`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorPeriods {
    pub rsi: usize,
    pub kdj_length: usize,
    pub kdj_signal: usize,
}

impl Default for IndicatorPeriods {
    fn default() -> Self {
        Self {
            rsi: 14,
            kdj_length: 9,
            kdj_signal: 3,
        }
    }
}

/// Computes every oscillator over the whole window.
pub fn compute(window: &HistoryWindow, periods: IndicatorPeriods) -> IndicatorSnapshot {
    let closes = window.closes();
    let rsi = rsi(&closes, periods.rsi);
    let kdj = kdj(
        &window.highs(),
        &window.lows(),
        &closes,
        periods.kdj_length,
        periods.kdj_signal,
    );
    IndicatorSnapshot { rsi, kdj }
}

/// Wilder's relative strength of the last close.
///
/// Gains and losses between consecutive closes are each smoothed with [`rma`],
/// so `period` price changes (`period + 1` closes) are needed. A window with no
/// movement at all has no defined value.
pub fn rsi(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() <= period {
        return None;
    }
    let (gains, losses): (Vec<f64>, Vec<f64>) = closes
        .windows(2)
        .map(|pair| {
            let change = pair[1] - pair[0];
            (change.max(0.0), (-change).max(0.0))
        })
        .unzip();
    let gain = *rma(&gains, period).last()?;
    let loss = *rma(&losses, period).last()?;
    Some(100.0 * gain / (gain + loss)).filter(|v| v.is_finite())
}

/// KDJ over `length` bars with `signal`-period smoothing.
///
/// `RSV = 100 * (close - lowest low) / (highest high - lowest low)`, `K` and `D`
/// are successive Wilder-style moving averages of it and `J = 3K - 2D`. The first
/// value appears once `length + 2 * (signal - 1)` bars are available.
pub fn kdj(highs: &[f64], lows: &[f64], closes: &[f64], length: usize, signal: usize) -> Option<Kdj> {
    let n = closes.len();
    if length == 0 || signal == 0 || n < length || highs.len() != n || lows.len() != n {
        return None;
    }

    let rsv: Vec<f64> = (length - 1..n)
        .map(|i| {
            let start = i + 1 - length;
            let lowest = lows[start..=i].iter().copied().fold(f64::INFINITY, f64::min);
            let highest = highs[start..=i].iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let range = highest - lowest;
            // A flat range puts the close exactly on the low.
            if range == 0.0 { 0.0 } else { 100.0 * (closes[i] - lowest) / range }
        })
        .collect();

    let k = rma(&rsv, signal);
    let d = rma(&k, signal);
    let (k, d) = (*k.last()?, *d.last()?);
    Some(Kdj { k, d, j: 3.0 * k - 2.0 * d })
}

/// Exponentially weighted mean with `alpha = 1 / period` and adjusted weights.
///
/// Every output uses all inputs seen so far, weighted `(1 - alpha)^age` and
/// normalised by the weight sum. The first `period - 1` outputs are withheld, so
/// the result is `values.len() - period + 1` long (or empty).
pub fn rma(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }
    let decay = 1.0 - 1.0 / period as f64;
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    let mut out = Vec::with_capacity(values.len() + 1 - period);
    for (i, value) in values.iter().enumerate() {
        numerator = value + decay * numerator;
        denominator = 1.0 + decay * denominator;
        if i + 1 >= period {
            out.push(numerator / denominator);
        }
    }
    out
}
