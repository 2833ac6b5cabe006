use configuration::StrategyParams;
use core_types::Bar;

use crate::classifier::Classifier;
use crate::error::StrategyError;
use crate::indicators::{self, IndicatorPeriods};
use crate::window::HistoryWindow;
use crate::{Evaluation, Strategy};

/// The KDJ extreme-reading strategy.
///
/// Every bar goes into a bounded history window, RSI and KDJ are recomputed
/// over the whole window, and the `J` line alone decides the action.
pub struct KdjThreshold {
    window: HistoryWindow,
    periods: IndicatorPeriods,
    classifier: Classifier,
}

impl KdjThreshold {
    /// Creates a new `KdjThreshold` instance.
    pub fn new(params: &StrategyParams) -> Result<Self, StrategyError> {
        if params.rsi_period == 0 || params.kdj_length == 0 || params.kdj_signal == 0 {
            return Err(StrategyError::InvalidParameters(
                "Indicator periods cannot be zero".to_string(),
            ));
        }
        if params.window_size == 0 {
            return Err(StrategyError::InvalidParameters(
                "History window cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            window: HistoryWindow::new(params.window_size),
            periods: IndicatorPeriods {
                rsi: params.rsi_period,
                kdj_length: params.kdj_length,
                kdj_signal: params.kdj_signal,
            },
            classifier: Classifier::from(params),
        })
    }

    pub fn window(&self) -> &HistoryWindow {
        &self.window
    }
}

impl Strategy for KdjThreshold {
    fn evaluate(&mut self, bar: &Bar) -> Result<Evaluation, StrategyError> {
        self.window.update(bar.clone());
        let snapshot = indicators::compute(&self.window, self.periods);
        let action = self.classifier.classify(snapshot.j());

        tracing::debug!(
            bars = self.window.len(),
            rsi = ?snapshot.rsi,
            j = ?snapshot.j(),
            action = %action,
            "Evaluated bar"
        );

        Ok(Evaluation { snapshot, action })
    }

    fn history_len(&self) -> usize {
        self.window.len()
    }
}
