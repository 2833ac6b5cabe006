use configuration::StrategyParams;
use core_types::Action;

/// Maps the `J` oscillator to an action with two fixed thresholds.
///
/// The thresholds sit outside the oscillator's usual 0-100 range on purpose:
/// only an extreme reading produces a buy or a sell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classifier {
    pub buy_below: f64,
    pub sell_above: f64,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            buy_below: -12.0,
            sell_above: 121.0,
        }
    }
}

impl From<&StrategyParams> for Classifier {
    fn from(params: &StrategyParams) -> Self {
        Self {
            buy_below: params.buy_below,
            sell_above: params.sell_above,
        }
    }
}

impl Classifier {
    /// Classifies an oscillator reading. Missing or NaN readings count as 0.0.
    pub fn classify(&self, value: Option<f64>) -> Action {
        let value = value.filter(|v| !v.is_nan()).unwrap_or(0.0);
        if value < self.buy_below {
            Action::Buy
        } else if value > self.sell_above {
            Action::Sell
        } else {
            Action::Hold
        }
    }
}
