// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

pub use super::fvm_shared_latest::sector::{
    RegisteredSealProof, SectorNumber, SectorSize, StoragePower,
};

