//! # Sentinel Strategy Library
//!
//! The pure signal logic of the system: a bounded price history, the oscillators
//! derived from it, and the threshold rule that turns an oscillator into an action.
//!
//! ## Architectural Principles
//!
//! - **Pure Logic:** No knowledge of databases, HTTP or timers. It depends only on
//!   `core-types` and `configuration`.
//! - **Recompute, don't accumulate:** Indicators are recomputed from the window on
//!   every bar. The window is the only state a strategy carries.
//!
//! ## Public API
//!
//! - `Strategy`: The trait the engine drives, one bar at a time.
//! - `KdjThreshold`: The KDJ extreme-reading strategy.
//! - `HistoryWindow`, `compute`, `Classifier`: The building blocks, usable on their own.

pub mod classifier;
pub mod error;
pub mod indicators;
pub mod kdj_threshold;
pub mod window;

pub use classifier::Classifier;
pub use error::StrategyError;
pub use indicators::{IndicatorPeriods, IndicatorSnapshot, Kdj, compute};
pub use kdj_threshold::KdjThreshold;
pub use window::HistoryWindow;

use core_types::{Action, Bar};

/// What a strategy concluded about the latest bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub snapshot: IndicatorSnapshot,
    pub action: Action,
}

/// The core trait the live engine drives.
///
/// The `Send + Sync` bounds let the engine own a boxed strategy inside a spawned task.
pub trait Strategy: Send + Sync {
    /// Records `bar` in the strategy's history and classifies the updated history.
    fn evaluate(&mut self, bar: &Bar) -> Result<Evaluation, StrategyError>;

    /// Number of bars currently held in the history.
    fn history_len(&self) -> usize;
}
