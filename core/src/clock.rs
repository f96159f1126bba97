//! Host clock: counts host ticks and decides which periodic work is due.

use crate::types::Tick;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HostClock {
    pub current_tick: Tick,
}

impl HostClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance one tick. Returns the new tick number.
    pub fn advance(&mut self) -> Tick {
        self.current_tick += 1;
        self.current_tick
    }

    /// True when work with this interval runs on the current tick.
    /// An interval of zero never runs.
    pub fn is_due(&self, interval: Tick) -> bool {
        interval > 0 && self.current_tick > 0 && self.current_tick % interval == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_fires_on_multiples_only() {
        let mut clock = HostClock::new();
        let fired: Vec<Tick> = (0..10)
            .filter_map(|_| {
                let t = clock.advance();
                clock.is_due(4).then_some(t)
            })
            .collect();
        assert_eq!(fired, vec![4, 8]);
        assert!(!clock.is_due(0));
    }
}
