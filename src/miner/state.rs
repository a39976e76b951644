// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::ops::ControlFlow;

use cid::Cid;
use fvm_ipld_bitfield::BitField;
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_hamt::{BytesKey, Hamtv0};
use integer_encoding::VarInt as _;
use num_traits::Zero as _;
use tracing::debug;

use super::{
    ActorVersion, Deadline, DeadlineInfo, Error, FilteredArrayView, HAMT_BIT_WIDTH, LockedFunds,
    MinerInfo, QuantSpec, SectorOnChainInfo, SectorPreCommitOnChainInfo, SectorsArray, SetFilter,
    array,
    error::load_record,
    filtered_array::ReadOnlyArray as _,
    types::{Deadlines, VestingFunds},
    v0, v2,
};
use crate::shim::{clock::ChainEpoch, econ::TokenAmount, policy::Policy, sector::SectorNumber};

/// Miner actor state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum State {
    V0(v0::State),
    V2(v2::State),
}

impl State {
    /// Decodes the state at `head` using the layout implied by the actor
    /// `code`.
    pub fn load<BS: Blockstore>(store: &BS, code: &Cid, head: &Cid) -> Result<Self, Error> {
        let version = ActorVersion::from_code(code).ok_or(Error::UnknownActorCode(*code))?;
        let state = match version {
            ActorVersion::V0 => State::V0(load_record(store, head, "miner state")?),
            ActorVersion::V2 => State::V2(load_record(store, head, "miner state")?),
        };
        debug!(%version, %head, "loaded miner state");
        Ok(state)
    }

    pub fn version(&self) -> ActorVersion {
        match self {
            State::V0(_) => ActorVersion::V0,
            State::V2(_) => ActorVersion::V2,
        }
    }

    fn info_root(&self) -> &Cid {
        match self {
            State::V0(st) => &st.info,
            State::V2(st) => &st.info,
        }
    }

    fn sectors_root(&self) -> &Cid {
        match self {
            State::V0(st) => &st.sectors,
            State::V2(st) => &st.sectors,
        }
    }

    fn deadlines_root(&self) -> &Cid {
        match self {
            State::V0(st) => &st.deadlines,
            State::V2(st) => &st.deadlines,
        }
    }

    fn precommits_root(&self) -> &Cid {
        match self {
            State::V0(st) => &st.pre_committed_sectors,
            State::V2(st) => &st.pre_committed_sectors,
        }
    }

    pub fn proving_period_start(&self) -> ChainEpoch {
        match self {
            State::V0(st) => st.proving_period_start,
            State::V2(st) => st.proving_period_start,
        }
    }

    pub fn current_deadline(&self) -> u64 {
        match self {
            State::V0(st) => st.current_deadline,
            State::V2(st) => st.current_deadline,
        }
    }

    pub fn info<BS: Blockstore>(&self, store: &BS) -> Result<MinerInfo, Error> {
        let root = self.info_root();
        Ok(match self {
            State::V0(_) => load_record::<v0::MinerInfo, _>(store, root, "miner info")?.into(),
            State::V2(_) => load_record::<v2::MinerInfo, _>(store, root, "miner info")?.into(),
        })
    }

    /// Loads a specific sector number. A sector that was never proven, or has
    /// since been removed, is `None`.
    pub fn get_sector<BS: Blockstore>(
        &self,
        store: &BS,
        sector_num: SectorNumber,
    ) -> Result<Option<SectorOnChainInfo>, Error> {
        let root = self.sectors_root();
        Ok(match self {
            State::V0(_) => array::get_from_amt::<v0::SectorOnChainInfo, _>(
                store, root, "sectors", sector_num,
            )?
            .map(From::from),
            State::V2(_) => array::get_from_amt::<v2::SectorOnChainInfo, _>(
                store, root, "sectors", sector_num,
            )?
            .map(From::from),
        })
    }

    /// Gets pre-committed on chain info
    pub fn get_precommitted_sector<BS: Blockstore>(
        &self,
        store: &BS,
        sector_num: SectorNumber,
    ) -> Result<Option<SectorPreCommitOnChainInfo>, Error> {
        let root = self.precommits_root();
        let precommits = load_precommits(store, root)?;
        let info = precommits
            .get(&sector_key(sector_num))
            .map_err(|e| Error::collection("pre-committed sectors", root, e))?;
        Ok(info.cloned())
    }

    /// Visits every pre-committed sector in map order until `f` breaks. Nodes
    /// past the break are never loaded.
    pub fn for_each_precommit<BS, F>(
        &self,
        store: &BS,
        mut f: F,
    ) -> Result<ControlFlow<()>, Error>
    where
        BS: Blockstore,
        F: FnMut(SectorNumber, &SectorPreCommitOnChainInfo) -> Result<ControlFlow<()>, Error>,
    {
        let root = self.precommits_root();
        let precommits = load_precommits(store, root)?;
        for entry in precommits.iter() {
            let (key, info) =
                entry.map_err(|e| Error::collection("pre-committed sectors", root, e))?;
            let Some((sector_num, _)) = SectorNumber::decode_var(&key.0) else {
                return Err(Error::IllegalState(format!(
                    "pre-commit key {:?} is not a sector number",
                    key.0
                )));
            };
            if f(sector_num, info)?.is_break() {
                return Ok(ControlFlow::Break(()));
            }
        }
        Ok(ControlFlow::Continue(()))
    }

    /// Whether the sector number has ever been allocated.
    pub fn is_allocated<BS: Blockstore>(
        &self,
        store: &BS,
        sector_num: SectorNumber,
    ) -> Result<bool, Error> {
        let root = match self {
            State::V0(st) => &st.allocated_sectors,
            State::V2(st) => &st.allocated_sectors,
        };
        let allocated: BitField = load_record(store, root, "allocated sectors")?;
        Ok(allocated.get(sector_num))
    }

    pub(crate) fn load_deadlines<BS: Blockstore>(&self, store: &BS) -> Result<Deadlines, Error> {
        load_record(store, self.deadlines_root(), "deadlines")
    }

    fn decode_deadline<BS: Blockstore>(&self, store: &BS, cid: &Cid) -> Result<Deadline, Error> {
        Ok(match self {
            State::V0(_) => Deadline::V0(load_record(store, cid, "deadline")?),
            State::V2(_) => Deadline::V2(load_record(store, cid, "deadline")?),
        })
    }

    /// Loads deadlines for a miner's state, in index order, until `f` breaks.
    pub fn for_each_deadline<BS, F>(
        &self,
        store: &BS,
        mut f: F,
    ) -> Result<ControlFlow<()>, Error>
    where
        BS: Blockstore,
        F: FnMut(u64, Deadline) -> Result<ControlFlow<()>, Error>,
    {
        let deadlines = self.load_deadlines(store)?;
        for (idx, cid) in (0u64..).zip(deadlines.due.iter()) {
            let deadline = self.decode_deadline(store, cid)?;
            if f(idx, deadline)?.is_break() {
                return Ok(ControlFlow::Break(()));
            }
        }
        Ok(ControlFlow::Continue(()))
    }

    /// Loads deadline at index for a miner's state
    pub fn load_deadline<BS: Blockstore>(&self, store: &BS, idx: u64) -> Result<Deadline, Error> {
        let deadlines = self.load_deadlines(store)?;
        let max = deadlines.due.len() as u64;
        let cid = usize::try_from(idx)
            .ok()
            .and_then(|i| deadlines.due.get(i))
            .ok_or(Error::InvalidDeadline { index: idx, max })?;
        self.decode_deadline(store, cid)
    }

    pub fn num_deadlines(&self, policy: &Policy) -> u64 {
        policy.wpost_period_deadlines
    }

    /// Whether the deadlines differ from `other`'s. States of different
    /// layouts always count as changed.
    pub fn deadlines_changed(&self, other: &State) -> bool {
        match (self, other) {
            (State::V0(a), State::V0(b)) => a.deadlines != b.deadlines,
            (State::V2(a), State::V2(b)) => a.deadlines != b.deadlines,
            _ => true,
        }
    }

    /// Deadline calculations for the current deadline at `epoch`.
    pub fn deadline_info(&self, policy: &Policy, epoch: ChainEpoch) -> DeadlineInfo {
        DeadlineInfo::new(
            self.proving_period_start(),
            self.current_deadline(),
            epoch,
            policy,
        )
    }

    /// Quantization of the expiration queues in deadline `idx`: one proving
    /// period, offset to the deadline's last epoch.
    pub fn quant_spec_for_deadline(&self, policy: &Policy, idx: u64) -> QuantSpec {
        DeadlineInfo::new(self.proving_period_start(), idx, 0, policy).quant_spec()
    }

    /// Loads sectors corresponding to the bitfield. If no bitfield is passed in, return all.
    pub fn load_sectors<BS: Blockstore>(
        &self,
        store: &BS,
        sectors: Option<&BitField>,
    ) -> Result<Vec<SectorOnChainInfo>, Error> {
        let array = self.sectors_array(store)?;
        match sectors {
            Some(sectors) => sectors
                .iter()
                .map(|num| {
                    array.get(num)?.ok_or_else(|| {
                        Error::IllegalState(format!("sector {num} not found in sectors array"))
                    })
                })
                .collect(),
            None => {
                let mut infos = Vec::with_capacity(usize::try_from(array.count()).unwrap_or(0));
                array.for_each_while(|_, info| {
                    infos.push(info.clone());
                    Ok(ControlFlow::Continue(()))
                })?;
                Ok(infos)
            }
        }
    }

    /// A view of the sector array restricted to (or, with `filter_out`,
    /// excluding) the sectors in `filter`. No filter shows every sector.
    pub fn load_sectors_from_set<'db, BS: Blockstore>(
        &self,
        store: &'db BS,
        filter: Option<&BitField>,
        filter_out: bool,
    ) -> Result<FilteredArrayView<SectorsArray<'db, BS>, SetFilter>, Error> {
        Ok(FilteredArrayView::new(
            self.sectors_array(store)?,
            SetFilter::new(filter.cloned(), filter_out),
        ))
    }

    fn sectors_array<'db, BS: Blockstore>(
        &self,
        store: &'db BS,
    ) -> Result<SectorsArray<'db, BS>, Error> {
        match self {
            State::V0(st) => SectorsArray::load_v0(store, &st.sectors),
            State::V2(st) => SectorsArray::load_v2(store, &st.sectors),
        }
    }

    pub fn fee_debt(&self) -> TokenAmount {
        match self {
            State::V0(_) => TokenAmount::zero(),
            State::V2(st) => st.fee_debt.clone(),
        }
    }

    pub fn initial_pledge(&self) -> TokenAmount {
        match self {
            State::V0(st) => st.initial_pledge_requirement.clone(),
            State::V2(st) => st.initial_pledge.clone(),
        }
    }

    pub fn pre_commit_deposits(&self) -> TokenAmount {
        match self {
            State::V0(st) => st.pre_commit_deposits.clone(),
            State::V2(st) => st.pre_commit_deposits.clone(),
        }
    }

    pub fn locked_funds(&self) -> LockedFunds {
        let vesting_funds = match self {
            State::V0(st) => st.locked_funds.clone(),
            State::V2(st) => st.locked_funds.clone(),
        };
        LockedFunds {
            vesting_funds,
            initial_pledge_requirement: self.initial_pledge(),
            pre_commit_deposits: self.pre_commit_deposits(),
        }
    }

    /// Balance that is neither locked, deposited nor pledged, less any fee
    /// debt. The first layout allows the result to go negative; later layouts
    /// reject a negative unlocked balance as an illegal state.
    pub fn available_balance(&self, actor_balance: &TokenAmount) -> Result<TokenAmount, Error> {
        let unlocked = actor_balance - &self.locked_funds().total();
        match self {
            State::V0(_) => Ok(unlocked),
            State::V2(st) => {
                if unlocked < TokenAmount::zero() {
                    return Err(Error::IllegalState(format!(
                        "negative unlocked balance {unlocked}"
                    )));
                }
                Ok(&unlocked - &st.fee_debt)
            }
        }
    }

    /// Sum of the vesting table entries that vested strictly before `epoch`.
    pub fn vested_funds<BS: Blockstore>(
        &self,
        store: &BS,
        epoch: ChainEpoch,
    ) -> Result<TokenAmount, Error> {
        let root = match self {
            State::V0(st) => &st.vesting_funds,
            State::V2(st) => &st.vesting_funds,
        };
        let funds: VestingFunds = load_record(store, root, "vesting funds")?;
        Ok(funds.vested_before(epoch))
    }
}

fn load_precommits<'db, BS: Blockstore>(
    store: &'db BS,
    root: &Cid,
) -> Result<Hamtv0<&'db BS, SectorPreCommitOnChainInfo>, Error> {
    Hamtv0::load_with_bit_width(root, store, HAMT_BIT_WIDTH)
        .map_err(|e| Error::collection("pre-committed sectors", root, e))
}

/// HAMT key for a sector number: its unsigned varint encoding.
pub(crate) fn sector_key(sector_num: SectorNumber) -> BytesKey {
    BytesKey(sector_num.encode_var_vec())
}
