// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Read-only queries over a storage provider's miner actor state.
//!
//! Given a content-addressed miner state root, this crate answers where a
//! sector lives (deadline and partition), when it expires (on-time and early),
//! and which sectors are allocated, faulty or recovering. The state is never
//! mutated; every query is a pure function of the snapshot and its blockstore.

pub mod db;
pub mod miner;
pub mod networks;
pub mod shim;
#[cfg(test)]
mod test_utils;
pub mod utils;

pub use db::MemoryDB;
pub use miner::{
    Deadline, Error, FilteredArrayView, Partition, SectorExpiration, SectorLocation, State,
};
pub use networks::{ChainConfig, NetworkChain};
pub use shim::policy::Policy;
