// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::shim::clock::ChainEpoch;
use serde::{Deserialize, Serialize};

/// Window PoSt scheduling parameters that shape the deadline and partition
/// layout of a miner's state.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct Policy {
    /// Period over which all of a miner's active sectors are challenged.
    pub wpost_proving_period: ChainEpoch,
    /// Duration of a single deadline's challenge window.
    pub wpost_challenge_window: ChainEpoch,
    /// Number of non-overlapping challenge windows in a proving period.
    pub wpost_period_deadlines: u64,
    /// Lookback from a deadline's opening to its challenge epoch.
    pub wpost_challenge_lookback: ChainEpoch,
    /// Minimum gap between a fault declaration and the deadline it targets.
    pub fault_declaration_cutoff: ChainEpoch,
}

impl Default for Policy {
    fn default() -> Self {
        Self::mainnet()
    }
}

impl Policy {
    pub fn mainnet() -> Self {
        Self {
            wpost_proving_period: 2880,
            wpost_challenge_window: 60,
            wpost_period_deadlines: 48,
            wpost_challenge_lookback: 20,
            fault_declaration_cutoff: 70,
        }
    }

    /// Fast-cycling parameters for local development networks.
    pub fn devnet() -> Self {
        Self {
            wpost_proving_period: 96,
            wpost_challenge_window: 2,
            wpost_period_deadlines: 48,
            wpost_challenge_lookback: 20,
            fault_declaration_cutoff: 4,
        }
    }

    /// Checks that the proving period is exactly covered by its deadlines.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.wpost_challenge_window > 0,
            "challenge window must be positive, got {}",
            self.wpost_challenge_window
        );
        anyhow::ensure!(
            self.wpost_period_deadlines > 0,
            "a proving period needs at least one deadline"
        );
        let covered = i64::try_from(self.wpost_period_deadlines)?
            .checked_mul(self.wpost_challenge_window)
            .ok_or_else(|| anyhow::anyhow!("proving period overflows"))?;
        anyhow::ensure!(
            covered == self.wpost_proving_period,
            "{} deadlines of {} epochs do not cover a proving period of {} epochs",
            self.wpost_period_deadlines,
            self.wpost_challenge_window,
            self.wpost_proving_period
        );
        Ok(())
    }
}
