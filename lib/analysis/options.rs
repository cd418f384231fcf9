use crate::analysis::dftype::MAX_RANGE_INTERVALS;
use serde::{Deserialize, Serialize};
use std::default;
use std::time::Duration;

/// Various options that can be passed to `analyze`. Options bound how long an
/// analysis may run, and how precise it stays around loops.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct Options {
    widening_threshold: usize,
    max_range_intervals: usize,
    max_call_depth: usize,
    max_steps: usize,
    cancellation_check_interval: usize,
    time_budget: Option<Duration>,
}

impl Options {
    /// Create a new set of Options with the default settings.
    pub fn new() -> Options {
        Options::default()
    }

    /// The number of times the state at a loop header may change before it
    /// is widened.
    pub fn widening_threshold(&self) -> usize {
        self.widening_threshold
    }

    pub fn set_widening_threshold(&mut self, widening_threshold: usize) {
        self.widening_threshold = widening_threshold;
    }

    /// A join producing more integer intervals than this is widened to
    /// `Top`.
    pub fn max_range_intervals(&self) -> usize {
        self.max_range_intervals
    }

    pub fn set_max_range_intervals(&mut self, max_range_intervals: usize) {
        self.max_range_intervals = max_range_intervals;
    }

    /// The deepest nesting of inlined calls. A `Call` beyond this depth is
    /// treated as an opaque call.
    pub fn max_call_depth(&self) -> usize {
        self.max_call_depth
    }

    pub fn set_max_call_depth(&mut self, max_call_depth: usize) {
        self.max_call_depth = max_call_depth;
    }

    /// The number of worklist entries processed before the analysis is
    /// aborted.
    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    pub fn set_max_steps(&mut self, max_steps: usize) {
        self.max_steps = max_steps;
    }

    /// How many worklist entries are processed between checks for
    /// cancellation and the time budget.
    pub fn cancellation_check_interval(&self) -> usize {
        self.cancellation_check_interval
    }

    pub fn set_cancellation_check_interval(&mut self, cancellation_check_interval: usize) {
        self.cancellation_check_interval = cancellation_check_interval;
    }

    /// The wall-clock time an analysis may take. `None` means no limit.
    pub fn time_budget(&self) -> Option<Duration> {
        self.time_budget
    }

    pub fn set_time_budget(&mut self, time_budget: Option<Duration>) {
        self.time_budget = time_budget;
    }
}

impl default::Default for Options {
    fn default() -> Options {
        Options {
            widening_threshold: 3,
            max_range_intervals: MAX_RANGE_INTERVALS,
            max_call_depth: 8,
            max_steps: 100_000,
            cancellation_check_interval: 64,
            time_budget: None,
        }
    }
}

/// Create your options with the builder pattern.
///
/// For more details on the options, see `analysis::Options`
pub struct OptionsBuilder {
    options: Options,
}

impl OptionsBuilder {
    /// Create a new builder for analysis options.
    pub fn new() -> OptionsBuilder {
        OptionsBuilder {
            options: Options::default(),
        }
    }

    /// By default this is 3.
    pub fn widening_threshold(mut self, widening_threshold: usize) -> OptionsBuilder {
        self.options.widening_threshold = widening_threshold;
        self
    }

    /// By default this is 16.
    pub fn max_range_intervals(mut self, max_range_intervals: usize) -> OptionsBuilder {
        self.options.max_range_intervals = max_range_intervals;
        self
    }

    /// By default this is 8.
    pub fn max_call_depth(mut self, max_call_depth: usize) -> OptionsBuilder {
        self.options.max_call_depth = max_call_depth;
        self
    }

    /// By default this is 100,000.
    pub fn max_steps(mut self, max_steps: usize) -> OptionsBuilder {
        self.options.max_steps = max_steps;
        self
    }

    /// By default this is 64.
    pub fn cancellation_check_interval(
        mut self,
        cancellation_check_interval: usize,
    ) -> OptionsBuilder {
        self.options.cancellation_check_interval = cancellation_check_interval;
        self
    }

    pub fn time_budget(mut self, time_budget: Duration) -> OptionsBuilder {
        self.options.time_budget = Some(time_budget);
        self
    }

    pub fn build(self) -> Options {
        self.options
    }
}

impl default::Default for OptionsBuilder {
    fn default() -> OptionsBuilder {
        OptionsBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let options = OptionsBuilder::new()
            .widening_threshold(1)
            .max_steps(10)
            .build();
        assert_eq!(options.widening_threshold(), 1);
        assert_eq!(options.max_steps(), 10);
        assert_eq!(options.max_call_depth(), Options::default().max_call_depth());
    }

    #[test]
    fn partial_json() {
        let options: Options = serde_json::from_str("{\"max_call_depth\": 2}").unwrap();
        assert_eq!(options.max_call_depth(), 2);
        assert_eq!(options.widening_threshold(), 3);
        assert_eq!(options.time_budget(), None);
    }
}
