// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Fixtures that write real miner state records into a [`MemoryDB`].

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use ahash::HashSet;
use cid::Cid;
use cid::multihash::Multihash;
use fvm_ipld_amt::Amtv0;
use fvm_ipld_bitfield::BitField;
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::{DAG_CBOR, RawBytes};
use fvm_ipld_hamt::{BytesKey, Hamtv0};
use integer_encoding::VarInt as _;
use multihash_codetable::{Code, MultihashDigest as _};

use crate::db::MemoryDB;
use crate::miner::{
    ActorVersion, ExpirationSet, HAMT_BIT_WIDTH, SectorPreCommitInfo,
    SectorPreCommitOnChainInfo, State,
    types::{Deadlines, PowerPair, VestingFund, VestingFunds, WorkerKeyChange},
    v0, v2,
};
use crate::shim::{
    address::Address,
    clock::ChainEpoch,
    econ::TokenAmount,
    policy::Policy,
    sector::{RegisteredSealProof, SectorNumber, SectorSize},
};
use crate::utils::db::CborStoreExt as _;

/// Installs a test-writer subscriber honoring `RUST_LOG`. Safe to call more
/// than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// The builtin actor code CID for a miner state layout.
pub fn actor_code(version: ActorVersion) -> Cid {
    Cid::new_v1(
        0x55,
        Multihash::wrap(0x00, version.code_name().as_bytes()).unwrap(),
    )
}

/// A stand-in `CommR` derived from the sector number.
pub fn sealed_cid(sector: SectorNumber) -> Cid {
    Cid::new_v1(DAG_CBOR, Code::Blake2b256.digest(&sector.to_be_bytes()))
}

fn bits(nums: &[u64]) -> BitField {
    BitField::try_from_bits(nums.iter().copied())
        .expect("sector numbers fit in a bitfield")
}

/// One partition of a deadline, along with its expiration queue.
#[derive(Clone, Debug, Default)]
pub struct PartitionFixture {
    sectors: Vec<u64>,
    faults: Vec<u64>,
    recoveries: Vec<u64>,
    terminated: Vec<u64>,
    unproven: Vec<u64>,
    queue: BTreeMap<u64, ExpirationSet>,
}

impl PartitionFixture {
    pub fn new(sectors: &[u64]) -> Self {
        Self {
            sectors: sectors.to_vec(),
            ..Default::default()
        }
    }

    pub fn faults(mut self, sectors: &[u64]) -> Self {
        self.faults = sectors.to_vec();
        self
    }

    pub fn recoveries(mut self, sectors: &[u64]) -> Self {
        self.recoveries = sectors.to_vec();
        self
    }

    pub fn terminated(mut self, sectors: &[u64]) -> Self {
        self.terminated = sectors.to_vec();
        self
    }

    pub fn unproven(mut self, sectors: &[u64]) -> Self {
        self.unproven = sectors.to_vec();
        self
    }

    /// Adds on-time expirations at an already quantized epoch.
    pub fn on_time(mut self, epoch: u64, sectors: &[u64]) -> Self {
        let set = self.queue.entry(epoch).or_default();
        set.on_time_sectors = &set.on_time_sectors | &bits(sectors);
        self
    }

    /// Adds early expirations at an already quantized epoch.
    pub fn early(mut self, epoch: u64, sectors: &[u64]) -> Self {
        let set = self.queue.entry(epoch).or_default();
        set.early_sectors = &set.early_sectors | &bits(sectors);
        self
    }

    fn write_queue(&self, store: &MemoryDB) -> anyhow::Result<Cid> {
        let mut amt = Amtv0::new(store);
        for (epoch, set) in &self.queue {
            amt.set(*epoch, set.clone())?;
        }
        Ok(amt.flush()?)
    }
}

/// Builds a complete miner state, deadlines and partitions included.
#[derive(Clone, Debug)]
pub struct StateBuilder {
    version: ActorVersion,
    policy: Policy,
    proving_period_start: ChainEpoch,
    current_deadline: u64,
    deadlines: BTreeMap<u64, Vec<PartitionFixture>>,
    post_submissions: BTreeMap<u64, Vec<u64>>,
    sectors: Vec<SectorNumber>,
    allocated: Vec<SectorNumber>,
    precommits: Vec<(SectorNumber, ChainEpoch)>,
    vesting: Vec<(ChainEpoch, u64)>,
    locked_funds: TokenAmount,
    pre_commit_deposits: TokenAmount,
    initial_pledge: TokenAmount,
    fee_debt: TokenAmount,
    pending_worker: Option<(Address, ChainEpoch)>,
}

impl StateBuilder {
    pub fn new(version: ActorVersion) -> Self {
        Self {
            version,
            policy: Policy::mainnet(),
            proving_period_start: 0,
            current_deadline: 0,
            deadlines: BTreeMap::new(),
            post_submissions: BTreeMap::new(),
            sectors: Vec::new(),
            allocated: Vec::new(),
            precommits: Vec::new(),
            vesting: Vec::new(),
            locked_funds: TokenAmount::default(),
            pre_commit_deposits: TokenAmount::default(),
            initial_pledge: TokenAmount::default(),
            fee_debt: TokenAmount::default(),
            pending_worker: None,
        }
    }

    pub fn proving_period(mut self, start: ChainEpoch, current_deadline: u64) -> Self {
        self.proving_period_start = start;
        self.current_deadline = current_deadline;
        self
    }

    /// Appends a partition to `deadline`. Its sectors also get sector infos
    /// and are marked allocated.
    pub fn partition(mut self, deadline: u64, partition: PartitionFixture) -> Self {
        self.sectors.extend(&partition.sectors);
        self.allocated.extend(&partition.sectors);
        self.deadlines.entry(deadline).or_default().push(partition);
        self
    }

    pub fn post_submissions(mut self, deadline: u64, partitions: &[u64]) -> Self {
        self.post_submissions.insert(deadline, partitions.to_vec());
        self
    }

    /// Stores sector infos for sectors not placed in any partition.
    pub fn sector_infos(mut self, sectors: &[SectorNumber]) -> Self {
        self.sectors.extend(sectors);
        self.allocated.extend(sectors);
        self
    }

    pub fn allocated(mut self, sectors: &[SectorNumber]) -> Self {
        self.allocated.extend(sectors);
        self
    }

    pub fn precommit(mut self, sector: SectorNumber, expiration: ChainEpoch) -> Self {
        self.precommits.push((sector, expiration));
        self.allocated.push(sector);
        self
    }

    pub fn vesting(mut self, epoch: ChainEpoch, atto: u64) -> Self {
        self.vesting.push((epoch, atto));
        self
    }

    pub fn balances(
        mut self,
        locked_funds: u64,
        pre_commit_deposits: u64,
        initial_pledge: u64,
        fee_debt: u64,
    ) -> Self {
        self.locked_funds = TokenAmount::from_atto(locked_funds);
        self.pre_commit_deposits = TokenAmount::from_atto(pre_commit_deposits);
        self.initial_pledge = TokenAmount::from_atto(initial_pledge);
        self.fee_debt = TokenAmount::from_atto(fee_debt);
        self
    }

    pub fn pending_worker(mut self, new_worker: Address, effective_at: ChainEpoch) -> Self {
        self.pending_worker = Some((new_worker, effective_at));
        self
    }

    /// Writes every record and returns the actor code and state head.
    pub fn build(&self, store: &MemoryDB) -> anyhow::Result<(Cid, Cid)> {
        let deadlines = self.write_deadlines(store)?;
        let sectors = self.write_sectors(store)?;
        let pre_committed_sectors = self.write_precommits(store)?;
        let pre_committed_sectors_expiry = Amtv0::<BitField, _>::new(store).flush()?;
        let allocated_sectors = store.put_cbor_default(&bits(&self.allocated))?;
        let vesting_funds = store.put_cbor_default(&VestingFunds {
            funds: self
                .vesting
                .iter()
                .map(|(epoch, atto)| VestingFund {
                    epoch: *epoch,
                    amount: TokenAmount::from_atto(*atto),
                })
                .collect(),
        })?;
        let info = self.write_info(store)?;

        let head = match self.version {
            ActorVersion::V0 => store.put_cbor_default(&v0::State {
                info,
                pre_commit_deposits: self.pre_commit_deposits.clone(),
                locked_funds: self.locked_funds.clone(),
                vesting_funds,
                initial_pledge_requirement: self.initial_pledge.clone(),
                pre_committed_sectors,
                pre_committed_sectors_expiry,
                allocated_sectors,
                sectors,
                proving_period_start: self.proving_period_start,
                current_deadline: self.current_deadline,
                deadlines,
                early_terminations: BitField::new(),
            })?,
            ActorVersion::V2 => store.put_cbor_default(&v2::State {
                info,
                pre_commit_deposits: self.pre_commit_deposits.clone(),
                locked_funds: self.locked_funds.clone(),
                vesting_funds,
                fee_debt: self.fee_debt.clone(),
                initial_pledge: self.initial_pledge.clone(),
                pre_committed_sectors,
                pre_committed_sectors_expiry,
                allocated_sectors,
                sectors,
                proving_period_start: self.proving_period_start,
                current_deadline: self.current_deadline,
                deadlines,
                early_terminations: BitField::new(),
            })?,
        };
        Ok((actor_code(self.version), head))
    }

    /// Builds the state and loads it back through [`State::load`].
    pub fn load(&self, store: &MemoryDB) -> anyhow::Result<State> {
        let (code, head) = self.build(store)?;
        Ok(State::load(store, &code, &head)?)
    }

    fn write_deadlines(&self, store: &MemoryDB) -> anyhow::Result<Cid> {
        let empty_epochs = Amtv0::<BitField, _>::new(store).flush()?;
        let mut due = Vec::new();
        for idx in 0..self.policy.wpost_period_deadlines {
            let partitions = self.deadlines.get(&idx).map(Vec::as_slice).unwrap_or_default();
            let root = self.write_partitions(store, partitions)?;
            let live = partitions
                .iter()
                .map(|p| bits(&p.sectors).len() - bits(&p.terminated).len())
                .sum();
            let total = partitions.iter().map(|p| bits(&p.sectors).len()).sum();
            let deadline = v0::Deadline {
                partitions: root,
                expirations_epochs: empty_epochs,
                post_submissions: bits(
                    self.post_submissions
                        .get(&idx)
                        .map(Vec::as_slice)
                        .unwrap_or_default(),
                ),
                early_terminations: BitField::new(),
                live_sectors: live,
                total_sectors: total,
                faulty_power: PowerPair::zero(),
            };
            due.push(store.put_cbor_default(&deadline)?);
        }
        store.put_cbor_default(&Deadlines { due })
    }

    fn write_partitions(
        &self,
        store: &MemoryDB,
        partitions: &[PartitionFixture],
    ) -> anyhow::Result<Cid> {
        let early_terminated = Amtv0::<BitField, _>::new(store).flush()?;
        match self.version {
            ActorVersion::V0 => {
                let mut amt = Amtv0::new(store);
                for (idx, p) in (0u64..).zip(partitions) {
                    amt.set(
                        idx,
                        v0::Partition {
                            sectors: bits(&p.sectors),
                            faults: bits(&p.faults),
                            recoveries: bits(&p.recoveries),
                            terminated: bits(&p.terminated),
                            expirations_epochs: p.write_queue(store)?,
                            early_terminated,
                            live_power: PowerPair::zero(),
                            faulty_power: PowerPair::zero(),
                            recovering_power: PowerPair::zero(),
                        },
                    )?;
                }
                Ok(amt.flush()?)
            }
            ActorVersion::V2 => {
                let mut amt = Amtv0::new(store);
                for (idx, p) in (0u64..).zip(partitions) {
                    amt.set(
                        idx,
                        v2::Partition {
                            sectors: bits(&p.sectors),
                            unproven: bits(&p.unproven),
                            faults: bits(&p.faults),
                            recoveries: bits(&p.recoveries),
                            terminated: bits(&p.terminated),
                            expirations_epochs: p.write_queue(store)?,
                            early_terminated,
                            live_power: PowerPair::zero(),
                            unproven_power: PowerPair::zero(),
                            faulty_power: PowerPair::zero(),
                            recovering_power: PowerPair::zero(),
                        },
                    )?;
                }
                Ok(amt.flush()?)
            }
        }
    }

    fn write_sectors(&self, store: &MemoryDB) -> anyhow::Result<Cid> {
        match self.version {
            ActorVersion::V0 => {
                let mut amt = Amtv0::new(store);
                for num in &self.sectors {
                    amt.set(*num, sector_info_v0(*num))?;
                }
                Ok(amt.flush()?)
            }
            ActorVersion::V2 => {
                let mut amt = Amtv0::new(store);
                for num in &self.sectors {
                    amt.set(*num, sector_info_v2(*num))?;
                }
                Ok(amt.flush()?)
            }
        }
    }

    fn write_precommits(&self, store: &MemoryDB) -> anyhow::Result<Cid> {
        let mut hamt: Hamtv0<_, SectorPreCommitOnChainInfo> =
            Hamtv0::new_with_bit_width(store, HAMT_BIT_WIDTH);
        for (num, expiration) in &self.precommits {
            hamt.set(
                BytesKey(num.encode_var_vec()),
                precommit_info(*num, *expiration),
            )?;
        }
        Ok(hamt.flush()?)
    }

    fn write_info(&self, store: &MemoryDB) -> anyhow::Result<Cid> {
        let pending_worker_key = self
            .pending_worker
            .map(|(new_worker, effective_at)| WorkerKeyChange {
                new_worker,
                effective_at,
            });
        let multi_address = vec![RawBytes::new(b"/ip4/127.0.0.1/tcp/1347".to_vec())];
        match self.version {
            ActorVersion::V0 => store.put_cbor_default(&v0::MinerInfo {
                owner: Address::new_id(100),
                worker: Address::new_id(101),
                control_addresses: vec![Address::new_id(102)],
                pending_worker_key,
                peer_id: b"peer".to_vec(),
                multi_address,
                seal_proof_type: RegisteredSealProof::StackedDRG32GiBV1,
                sector_size: SectorSize::_32GiB,
                window_post_partition_sectors: 2349,
            }),
            ActorVersion::V2 => store.put_cbor_default(&v2::MinerInfo {
                owner: Address::new_id(100),
                worker: Address::new_id(101),
                control_addresses: vec![Address::new_id(102)],
                pending_worker_key,
                peer_id: b"peer".to_vec(),
                multi_address,
                seal_proof_type: RegisteredSealProof::StackedDRG32GiBV1P1,
                sector_size: SectorSize::_32GiB,
                window_post_partition_sectors: 2349,
                consensus_fault_elapsed: 77,
                pending_owner_address: Some(Address::new_id(103)),
            }),
        }
    }
}

pub fn sector_info_v0(num: SectorNumber) -> v0::SectorOnChainInfo {
    v0::SectorOnChainInfo {
        sector_number: num,
        seal_proof: RegisteredSealProof::StackedDRG32GiBV1,
        sealed_cid: sealed_cid(num),
        deal_ids: vec![num * 10],
        activation: 10,
        expiration: 1000 + num as ChainEpoch,
        deal_weight: 0.into(),
        verified_deal_weight: 0.into(),
        initial_pledge: TokenAmount::from_atto(num),
        expected_day_reward: TokenAmount::from_atto(1),
        expected_storage_pledge: TokenAmount::from_atto(2),
    }
}

pub fn sector_info_v2(num: SectorNumber) -> v2::SectorOnChainInfo {
    v2::SectorOnChainInfo {
        sector_number: num,
        seal_proof: RegisteredSealProof::StackedDRG32GiBV1P1,
        sealed_cid: sealed_cid(num),
        deal_ids: vec![num * 10],
        activation: 10,
        expiration: 1000 + num as ChainEpoch,
        deal_weight: 0.into(),
        verified_deal_weight: 0.into(),
        initial_pledge: TokenAmount::from_atto(num),
        expected_day_reward: TokenAmount::from_atto(1),
        expected_storage_pledge: TokenAmount::from_atto(2),
        replaced_sector_age: 5,
        replaced_day_reward: TokenAmount::from_atto(3),
    }
}

pub fn precommit_info(num: SectorNumber, expiration: ChainEpoch) -> SectorPreCommitOnChainInfo {
    SectorPreCommitOnChainInfo {
        info: SectorPreCommitInfo {
            seal_proof: RegisteredSealProof::StackedDRG32GiBV1P1,
            sector_number: num,
            sealed_cid: sealed_cid(num),
            seal_rand_epoch: 1,
            deal_ids: Vec::new(),
            expiration,
            replace_capacity: false,
            replace_sector_deadline: 0,
            replace_sector_partition: 0,
            replace_sector_number: 0,
        },
        pre_commit_deposit: TokenAmount::from_atto(num),
        pre_commit_epoch: 2,
        deal_weight: 0.into(),
        verified_deal_weight: 0.into(),
    }
}

/// Wraps a [`MemoryDB`], counting reads and failing the ones for chosen keys.
pub struct FlakyStore<'a> {
    inner: &'a MemoryDB,
    broken: HashSet<Cid>,
    reads: AtomicUsize,
}

impl<'a> FlakyStore<'a> {
    pub fn new(inner: &'a MemoryDB) -> Self {
        Self {
            inner,
            broken: HashSet::default(),
            reads: AtomicUsize::new(0),
        }
    }

    pub fn fail_on(mut self, cid: Cid) -> Self {
        self.broken.insert(cid);
        self
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }
}

impl Blockstore for FlakyStore<'_> {
    fn get(&self, k: &Cid) -> anyhow::Result<Option<Vec<u8>>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        anyhow::ensure!(!self.broken.contains(k), "injected read failure for {k}");
        self.inner.get(k)
    }

    fn put_keyed(&self, k: &Cid, block: &[u8]) -> anyhow::Result<()> {
        self.inner.put_keyed(k, block)
    }
}
