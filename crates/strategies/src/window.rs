use core_types::Bar;
use std::collections::VecDeque;

/// The rolling price history the indicators are computed from.
///
/// Bars are kept in insertion order and the window never holds more than
/// `capacity` of them; the oldest bar is evicted first.
#[derive(Debug, Clone)]
pub struct HistoryWindow {
    bars: VecDeque<Bar>,
    capacity: usize,
}

impl HistoryWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            bars: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Appends `bar` and drops the oldest entries beyond capacity.
    pub fn update(&mut self, bar: Bar) {
        self.bars.push_back(bar);
        while self.bars.len() > self.capacity {
            self.bars.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&Bar> {
        self.bars.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bar> {
        self.bars.iter()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(Bar::close_f64).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(Bar::high_f64).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(Bar::low_f64).collect()
    }
}
