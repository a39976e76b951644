// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

pub mod bigint;
pub mod policy;
pub mod sector;

pub mod address {
    pub use super::fvm_shared_latest::address::Address;
}

pub mod clock {
    pub use super::fvm_shared_latest::clock::ChainEpoch;
}

pub mod deal {
    pub use super::fvm_shared_latest::deal::DealID;
}

pub mod econ {
    pub use super::fvm_shared_latest::econ::TokenAmount;
}

mod fvm_shared_latest {
    pub use fvm_shared4::*;
}
