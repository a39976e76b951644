// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::shim::clock::ChainEpoch;

/// A spec for epoch quantization. Epochs are rounded to the nearest
/// `offset + k * unit`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct QuantSpec {
    /// The unit of quantization.
    pub unit: ChainEpoch,
    /// The offset from zero from which to base the modulus.
    pub offset: ChainEpoch,
}

/// Quantization with a unit of one, leaving every epoch unchanged.
pub const NO_QUANTIZATION: QuantSpec = QuantSpec { unit: 1, offset: 0 };

impl QuantSpec {
    /// Rounds `epoch` to the nearest exact multiple of the quantization unit
    /// offset by `offset % unit`, rounding up.
    ///
    /// Epochs before the offset round toward zero, matching the ledger's
    /// integer division. A non-positive unit leaves `epoch` unchanged.
    pub fn quantize_up(&self, epoch: ChainEpoch) -> ChainEpoch {
        if self.unit <= 0 {
            return epoch;
        }
        let offset = self.offset % self.unit;

        let remainder = (epoch - offset) % self.unit;
        let quotient = (epoch - offset) / self.unit;

        // Don't round if epoch falls on a quantization epoch
        if remainder == 0
            // Negative truncating division rounds up
            || epoch - offset < 0
        {
            self.unit * quotient + offset
        } else {
            self.unit * (quotient + 1) + offset
        }
    }

    /// Rounds `epoch` down to the previous quantization boundary.
    pub fn quantize_down(&self, epoch: ChainEpoch) -> ChainEpoch {
        let next = self.quantize_up(epoch);
        if epoch == next {
            next
        } else {
            next - self.unit
        }
    }
}
