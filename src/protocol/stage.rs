use serde::{Deserialize, Serialize};

/// Protocol stages in strict linear order. `Closed` is the only terminal
/// stage; no stage re-enters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Deposits,
    Commitments,
    Choose,
    Open,
    Dispute,
    Labels,
    Settle,
    Closed,
}

/// Default per-stage response window in seconds.
pub const DEFAULT_STAGE_WINDOW: u64 = 3_600;

/// Per-stage response windows, frozen at session creation. A stage can never
/// extend its own deadline mid-flight.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeouts {
    pub deposits: u64,
    pub commitments: u64,
    pub choose: u64,
    pub open: u64,
    pub dispute: u64,
    pub labels: u64,
    pub settle: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::uniform(DEFAULT_STAGE_WINDOW)
    }
}

impl Timeouts {
    /// The same window for every stage.
    pub fn uniform(seconds: u64) -> Self {
        Self {
            deposits: seconds,
            commitments: seconds,
            choose: seconds,
            open: seconds,
            dispute: seconds,
            labels: seconds,
            settle: seconds,
        }
    }

    /// Response window for a stage; `Closed` has none.
    pub fn window(&self, stage: Stage) -> u64 {
        match stage {
            Stage::Deposits => self.deposits,
            Stage::Commitments => self.commitments,
            Stage::Choose => self.choose,
            Stage::Open => self.open,
            Stage::Dispute => self.dispute,
            Stage::Labels => self.labels,
            Stage::Settle => self.settle,
            Stage::Closed => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_windows_are_one_hour() {
        let timeouts = Timeouts::default();
        for stage in [
            Stage::Deposits,
            Stage::Commitments,
            Stage::Choose,
            Stage::Open,
            Stage::Dispute,
            Stage::Labels,
            Stage::Settle,
        ] {
            assert_eq!(timeouts.window(stage), DEFAULT_STAGE_WINDOW);
        }
        assert_eq!(timeouts.window(Stage::Closed), 0);
    }

    #[test]
    fn test_windows_are_per_stage() {
        let timeouts = Timeouts {
            dispute: 7_200,
            ..Timeouts::uniform(600)
        };
        assert_eq!(timeouts.window(Stage::Dispute), 7_200);
        assert_eq!(timeouts.window(Stage::Open), 600);
    }
}
