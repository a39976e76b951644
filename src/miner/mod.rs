// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Version-independent view of the storage miner actor's state.
//!
//! A [`State`] is decoded once from an actor code and head CID; every query
//! after that goes through the common enums here, regardless of which schema
//! the chain used at that height.

mod array;
mod deadline;
mod deadline_info;
mod error;
mod expiration_queue;
mod filtered_array;
mod lookup;
mod quantize;
mod state;
pub mod types;
pub mod v0;
pub mod v2;

use cid::Cid;
use serde::{Deserialize, Serialize};

pub use self::deadline::{Deadline, Partition};
pub use self::deadline_info::DeadlineInfo;
pub use self::error::Error;
pub use self::expiration_queue::{ExpirationQueue, ExpirationSet};
pub use self::filtered_array::{
    FilteredArrayView, IndexFilter, ReadOnlyArray, SectorsArray, SetFilter,
};
pub use self::quantize::{NO_QUANTIZATION, QuantSpec};
pub use self::state::State;
pub use self::types::{SectorPreCommitInfo, SectorPreCommitOnChainInfo};

use crate::shim::{
    address::Address,
    bigint::BigInt,
    clock::ChainEpoch,
    deal::DealID,
    econ::TokenAmount,
    sector::{RegisteredSealProof, SectorNumber, SectorSize},
};

/// Bit width of the pre-commit HAMT.
pub const HAMT_BIT_WIDTH: u32 = 5;

/// Miner actor code versions with a known state layout.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum ActorVersion {
    V0,
    V2,
}

impl ActorVersion {
    /// Multicodec for raw binary blocks, used by builtin actor codes.
    const RAW_CODEC: u64 = 0x55;
    /// Identity multihash code. The digest of a builtin actor code is its name.
    const IDENTITY_HASH: u64 = 0x00;

    /// The name embedded in the builtin actor code CID.
    pub fn code_name(self) -> &'static str {
        match self {
            ActorVersion::V0 => "fil/1/storageminer",
            ActorVersion::V2 => "fil/2/storageminer",
        }
    }

    /// Maps an actor code CID to the miner state layout it implies.
    pub fn from_code(code: &Cid) -> Option<Self> {
        if code.codec() != Self::RAW_CODEC || code.hash().code() != Self::IDENTITY_HASH {
            return None;
        }
        <Self as strum::IntoEnumIterator>::iter()
            .find(|v| code.hash().digest() == v.code_name().as_bytes())
    }
}

/// Where a sector currently lives.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SectorLocation {
    pub deadline: u64,
    pub partition: u64,
}

/// Effective expiration of a live sector. An epoch of zero means the sector
/// has no expiration of that kind.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SectorExpiration {
    pub on_time: ChainEpoch,
    /// Non-zero if the sector is faulty and will expire before its scheduled
    /// on-time expiration.
    pub early: ChainEpoch,
}

/// Funds held by the miner that cannot be withdrawn.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LockedFunds {
    pub vesting_funds: TokenAmount,
    pub initial_pledge_requirement: TokenAmount,
    pub pre_commit_deposits: TokenAmount,
}

impl LockedFunds {
    pub fn total(&self) -> TokenAmount {
        &(&self.vesting_funds + &self.initial_pledge_requirement) + &self.pre_commit_deposits
    }
}

/// Static information about miner
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MinerInfo {
    pub owner: Address,
    pub worker: Address,
    pub new_worker: Option<Address>,
    pub control_addresses: Vec<Address>, // Must all be ID addresses.
    /// Epoch at which `new_worker` takes effect, `-1` if no change is pending.
    pub worker_change_epoch: ChainEpoch,
    /// Raw libp2p identity bytes.
    pub peer_id: Vec<u8>,
    pub multiaddrs: Vec<Vec<u8>>,
    pub seal_proof_type: RegisteredSealProof,
    pub sector_size: SectorSize,
    pub window_post_partition_sectors: u64,
    /// `-1` for layouts that predate consensus fault tracking.
    pub consensus_fault_elapsed: ChainEpoch,
    pub pending_owner_address: Option<Address>,
}

impl From<v0::MinerInfo> for MinerInfo {
    fn from(info: v0::MinerInfo) -> Self {
        Self {
            owner: info.owner,
            worker: info.worker,
            new_worker: info.pending_worker_key.as_ref().map(|k| k.new_worker),
            control_addresses: info.control_addresses,
            worker_change_epoch: info
                .pending_worker_key
                .map(|k| k.effective_at)
                .unwrap_or(-1),
            peer_id: info.peer_id,
            multiaddrs: info
                .multi_address
                .iter()
                .map(|addr| addr.bytes().to_vec())
                .collect(),
            seal_proof_type: info.seal_proof_type,
            sector_size: info.sector_size,
            window_post_partition_sectors: info.window_post_partition_sectors,
            consensus_fault_elapsed: -1,
            pending_owner_address: None,
        }
    }
}

impl From<v2::MinerInfo> for MinerInfo {
    fn from(info: v2::MinerInfo) -> Self {
        Self {
            owner: info.owner,
            worker: info.worker,
            new_worker: info.pending_worker_key.as_ref().map(|k| k.new_worker),
            control_addresses: info.control_addresses,
            worker_change_epoch: info
                .pending_worker_key
                .map(|k| k.effective_at)
                .unwrap_or(-1),
            peer_id: info.peer_id,
            multiaddrs: info
                .multi_address
                .iter()
                .map(|addr| addr.bytes().to_vec())
                .collect(),
            seal_proof_type: info.seal_proof_type,
            sector_size: info.sector_size,
            window_post_partition_sectors: info.window_post_partition_sectors,
            consensus_fault_elapsed: info.consensus_fault_elapsed,
            pending_owner_address: info.pending_owner_address,
        }
    }
}

/// Information stored on-chain for a proven sector, across all layouts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SectorOnChainInfo {
    pub sector_number: SectorNumber,
    /// The seal proof type implies the PoSt proofs
    pub seal_proof: RegisteredSealProof,
    /// `CommR`
    pub sealed_cid: Cid,
    pub deal_ids: Vec<DealID>,
    /// Epoch during which the sector proof was accepted
    pub activation: ChainEpoch,
    /// Epoch during which the sector expires
    pub expiration: ChainEpoch,
    /// Integral of active deals over sector lifetime
    pub deal_weight: BigInt,
    /// Integral of active verified deals over sector lifetime
    pub verified_deal_weight: BigInt,
    /// Pledge collected to commit this sector
    pub initial_pledge: TokenAmount,
    /// Expected one day projection of reward for sector computed at activation time
    pub expected_day_reward: TokenAmount,
    /// Expected twenty day projection of reward for sector computed at activation time
    pub expected_storage_pledge: TokenAmount,
    /// Age of sector this sector replaced or zero
    pub replaced_sector_age: ChainEpoch,
    /// Day reward of sector this sector replace or zero
    pub replaced_day_reward: TokenAmount,
}

impl From<v0::SectorOnChainInfo> for SectorOnChainInfo {
    fn from(info: v0::SectorOnChainInfo) -> Self {
        Self {
            sector_number: info.sector_number,
            seal_proof: info.seal_proof,
            sealed_cid: info.sealed_cid,
            deal_ids: info.deal_ids,
            activation: info.activation,
            expiration: info.expiration,
            deal_weight: info.deal_weight,
            verified_deal_weight: info.verified_deal_weight,
            initial_pledge: info.initial_pledge,
            expected_day_reward: info.expected_day_reward,
            expected_storage_pledge: info.expected_storage_pledge,
            replaced_sector_age: 0,
            replaced_day_reward: TokenAmount::default(),
        }
    }
}

impl From<v2::SectorOnChainInfo> for SectorOnChainInfo {
    fn from(info: v2::SectorOnChainInfo) -> Self {
        Self {
            sector_number: info.sector_number,
            seal_proof: info.seal_proof,
            sealed_cid: info.sealed_cid,
            deal_ids: info.deal_ids,
            activation: info.activation,
            expiration: info.expiration,
            deal_weight: info.deal_weight,
            verified_deal_weight: info.verified_deal_weight,
            initial_pledge: info.initial_pledge,
            expected_day_reward: info.expected_day_reward,
            expected_storage_pledge: info.expected_storage_pledge,
            replaced_sector_age: info.replaced_sector_age,
            replaced_day_reward: info.replaced_day_reward,
        }
    }
}
