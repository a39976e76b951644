// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::shim::{clock::ChainEpoch, policy::Policy};

use super::quantize::QuantSpec;

/// Deadline calculations with respect to a current epoch.
/// "Deadline" refers to the window during which proofs may be submitted.
/// Windows are non-overlapping ranges [Open, Close), but the challenge epoch for a window occurs before
/// the window opens.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DeadlineInfo {
    /// Epoch at which this info was calculated.
    pub current_epoch: ChainEpoch,
    /// First epoch of the proving period (<= CurrentEpoch).
    pub period_start: ChainEpoch,
    /// Current deadline index, in [0..WPoStProvingPeriodDeadlines).
    pub index: u64,
    /// First epoch from which a proof may be submitted (>= CurrentEpoch).
    pub open: ChainEpoch,
    /// First epoch from which a proof may no longer be submitted (>= Open).
    pub close: ChainEpoch,
    /// Epoch at which to sample the chain for challenge (< Open).
    pub challenge: ChainEpoch,
    /// First epoch at which a fault declaration is rejected (< Open).
    pub fault_cutoff: ChainEpoch,

    w_post_period_deadlines: u64,
    w_post_proving_period: ChainEpoch,
    w_post_challenge_window: ChainEpoch,
    w_post_challenge_lookback: ChainEpoch,
    fault_declaration_cutoff: ChainEpoch,
}

impl DeadlineInfo {
    pub fn new(
        period_start: ChainEpoch,
        deadline_idx: u64,
        current_epoch: ChainEpoch,
        policy: &Policy,
    ) -> Self {
        let (open, close, challenge, fault_cutoff) =
            if deadline_idx < policy.wpost_period_deadlines {
                let deadline_open =
                    period_start + deadline_idx as ChainEpoch * policy.wpost_challenge_window;
                (
                    deadline_open,
                    deadline_open + policy.wpost_challenge_window,
                    deadline_open - policy.wpost_challenge_lookback,
                    deadline_open - policy.fault_declaration_cutoff,
                )
            } else {
                let after_last_deadline = period_start + policy.wpost_proving_period;
                (after_last_deadline, after_last_deadline, after_last_deadline, 0)
            };
        Self {
            current_epoch,
            period_start,
            index: deadline_idx,
            open,
            close,
            challenge,
            fault_cutoff,
            w_post_period_deadlines: policy.wpost_period_deadlines,
            w_post_proving_period: policy.wpost_proving_period,
            w_post_challenge_window: policy.wpost_challenge_window,
            w_post_challenge_lookback: policy.wpost_challenge_lookback,
            fault_declaration_cutoff: policy.fault_declaration_cutoff,
        }
    }

    fn policy(&self) -> Policy {
        Policy {
            wpost_proving_period: self.w_post_proving_period,
            wpost_challenge_window: self.w_post_challenge_window,
            wpost_period_deadlines: self.w_post_period_deadlines,
            wpost_challenge_lookback: self.w_post_challenge_lookback,
            fault_declaration_cutoff: self.fault_declaration_cutoff,
        }
    }

    /// Whether the proving period has begun.
    pub fn period_started(&self) -> bool {
        self.current_epoch >= self.period_start
    }

    /// Whether the proving period has elapsed.
    pub fn period_elapsed(&self) -> bool {
        self.current_epoch >= self.next_period_start()
    }

    /// The last epoch in the proving period.
    pub fn period_end(&self) -> ChainEpoch {
        self.period_start + self.w_post_proving_period - 1
    }

    /// The first epoch in the next proving period.
    pub fn next_period_start(&self) -> ChainEpoch {
        self.period_start + self.w_post_proving_period
    }

    /// Whether the current deadline is currently open.
    pub fn is_open(&self) -> bool {
        self.current_epoch >= self.open && self.current_epoch < self.close
    }

    /// Whether the current deadline has already closed.
    pub fn has_elapsed(&self) -> bool {
        self.current_epoch >= self.close
    }

    /// The last epoch during which a proof may be submitted.
    pub fn last(&self) -> ChainEpoch {
        self.close - 1
    }

    /// Epoch at which the subsequent deadline opens.
    pub fn next_open(&self) -> ChainEpoch {
        self.close
    }

    /// Whether the deadline's fault cutoff has passed.
    pub fn fault_cutoff_passed(&self) -> bool {
        self.current_epoch >= self.fault_cutoff
    }

    /// Returns the next instance of this deadline that has not yet elapsed.
    /// Without a positive proving period there is no next instance, and the
    /// deadline is returned as is.
    pub fn next_not_elapsed(self) -> Self {
        if !self.has_elapsed() || self.w_post_proving_period <= 0 {
            return self;
        }

        // has elapsed, advance by some multiples of w_post_proving_period
        let gap = self.current_epoch - self.close;
        let delta_periods = 1 + gap / self.w_post_proving_period;

        Self::new(
            self.period_start + self.w_post_proving_period * delta_periods,
            self.index,
            self.current_epoch,
            &self.policy(),
        )
    }

    pub fn quant_spec(&self) -> QuantSpec {
        QuantSpec {
            unit: self.w_post_proving_period,
            offset: self.last(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn first_deadline_windows() {
        let policy = Policy::mainnet();
        let info = DeadlineInfo::new(100, 0, 100, &policy);
        assert_eq!(info.open, 100);
        assert_eq!(info.close, 160);
        assert_eq!(info.last(), 159);
        assert_eq!(info.challenge, 80);
        assert_eq!(info.fault_cutoff, 30);
        assert!(info.is_open());
        assert!(info.period_started());
        assert!(!info.period_elapsed());
        assert_eq!(info.period_end(), 100 + 2880 - 1);
    }

    #[test]
    fn index_past_last_deadline_points_after_the_period() {
        let policy = Policy::devnet();
        let info = DeadlineInfo::new(0, policy.wpost_period_deadlines, 5, &policy);
        assert_eq!(info.open, 96);
        assert_eq!(info.close, 96);
        assert_eq!(info.challenge, 96);
        assert_eq!(info.fault_cutoff, 0);
    }

    #[test]
    fn next_not_elapsed_skips_whole_periods() {
        let policy = Policy::devnet();
        let info = DeadlineInfo::new(0, 3, 500, &policy);
        assert!(info.has_elapsed());
        let next = info.next_not_elapsed();
        assert!(!next.has_elapsed());
        assert_eq!(next.index, 3);
        assert_eq!(next.period_start, 576);
        assert_eq!(next.open, 582);
        assert_eq!(next.next_not_elapsed(), next);
    }

    #[test]
    fn zero_proving_period_does_not_advance() {
        let policy = Policy {
            wpost_proving_period: 0,
            ..Policy::devnet()
        };
        let info = DeadlineInfo::new(0, 3, 500, &policy);
        assert!(info.has_elapsed());
        assert_eq!(info.next_not_elapsed(), info);
        assert_eq!(info.quant_spec().quantize_up(7), 7);
    }

    #[test]
    fn quant_spec_lands_on_deadline_last_epoch() {
        let policy = Policy::mainnet();
        let info = DeadlineInfo::new(0, 1, 0, &policy);
        let q = info.quant_spec();
        assert_eq!(q.quantize_up(1), 119);
        assert_eq!(q.quantize_up(120), 119 + 2880);
    }
}
