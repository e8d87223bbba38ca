pub const DEFAULT_HIGH_RISK_THRESHOLD: i64 = 44;

/// The four warehouse-computed risk indicators for one provider-month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RiskFlags {
    pub billed_over_capacity: bool,
    pub placed_over_capacity: bool,
    pub same_address: bool,
    pub distance_traveled: bool,
}

impl RiskFlags {
    /// Missing flags count as not raised.
    pub fn from_nullable(
        billed_over_capacity: Option<bool>,
        placed_over_capacity: Option<bool>,
        same_address: Option<bool>,
        distance_traveled: Option<bool>,
    ) -> Self {
        Self {
            billed_over_capacity: billed_over_capacity.unwrap_or(false),
            placed_over_capacity: placed_over_capacity.unwrap_or(false),
            same_address: same_address.unwrap_or(false),
            distance_traveled: distance_traveled.unwrap_or(false),
        }
    }

    /// Monthly overall risk score: how many of the four flags are raised.
    pub fn score(&self) -> u8 {
        [
            self.billed_over_capacity,
            self.placed_over_capacity,
            self.same_address,
            self.distance_traveled,
        ]
        .iter()
        .filter(|raised| **raised)
        .count() as u8
    }
}

/// Per-year counts of months in which each flag was raised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct YearlyCounts {
    pub billed_over_capacity: i64,
    pub placed_over_capacity: i64,
    pub same_address: i64,
    pub distance_traveled: i64,
}

impl YearlyCounts {
    /// Yearly overall risk score: the plain sum of the four counts.
    pub fn score(&self) -> i64 {
        self.billed_over_capacity
            + self.placed_over_capacity
            + self.same_address
            + self.distance_traveled
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskPolicy {
    pub high_risk_threshold: i64,
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self {
            high_risk_threshold: DEFAULT_HIGH_RISK_THRESHOLD,
        }
    }
}

impl RiskPolicy {
    pub fn is_high_risk(&self, yearly_score: i64) -> bool {
        yearly_score >= self.high_risk_threshold
    }
}

/// Dashboard rendering of a single flag.
pub fn flag_label(raised: bool) -> &'static str {
    if raised {
        "Yes"
    } else {
        "--"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monthly_score_counts_raised_flags() {
        assert_eq!(RiskFlags::default().score(), 0);
        let flags = RiskFlags {
            billed_over_capacity: true,
            placed_over_capacity: false,
            same_address: true,
            distance_traveled: true,
        };
        assert_eq!(flags.score(), 3);
        let all = RiskFlags {
            billed_over_capacity: true,
            placed_over_capacity: true,
            same_address: true,
            distance_traveled: true,
        };
        assert_eq!(all.score(), 4);
    }

    #[test]
    fn null_flags_are_not_raised() {
        let flags = RiskFlags::from_nullable(Some(true), None, None, Some(false));
        assert_eq!(flags.score(), 1);
        assert!(!flags.placed_over_capacity);
    }

    #[test]
    fn yearly_score_is_unbounded_sum() {
        let counts = YearlyCounts {
            billed_over_capacity: 12,
            placed_over_capacity: 12,
            same_address: 11,
            distance_traveled: 9,
        };
        assert_eq!(counts.score(), 44);
    }

    #[test]
    fn high_risk_threshold_is_inclusive() {
        let policy = RiskPolicy::default();
        assert!(policy.is_high_risk(44));
        assert!(policy.is_high_risk(48));
        assert!(!policy.is_high_risk(43));

        let strict = RiskPolicy {
            high_risk_threshold: 10,
        };
        assert!(strict.is_high_risk(10));
    }

    #[test]
    fn flags_render_as_yes_or_dashes() {
        assert_eq!(flag_label(true), "Yes");
        assert_eq!(flag_label(false), "--");
    }
}
