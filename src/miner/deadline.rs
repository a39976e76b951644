// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::borrow::Cow;
use std::ops::ControlFlow;

use cid::Cid;
use fvm_ipld_bitfield::BitField;
use fvm_ipld_blockstore::Blockstore;

use super::{Error, ExpirationQueue, QuantSpec, array, v0, v2};

/// Deadline holds the state for all sectors due at a specific deadline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Deadline {
    V0(v0::Deadline),
    V2(v2::Deadline),
}

impl Deadline {
    fn partitions_root(&self) -> &Cid {
        match self {
            Deadline::V0(dl) => &dl.partitions,
            Deadline::V2(dl) => &dl.partitions,
        }
    }

    /// Loads the partition at `idx`. A missing index is a caller error.
    pub fn load_partition<BS: Blockstore>(
        &self,
        store: &BS,
        idx: u64,
    ) -> Result<Partition<'static>, Error> {
        let root = self.partitions_root();
        let partition = match self {
            Deadline::V0(_) => {
                array::get_from_amt::<v0::Partition, _>(store, root, "partitions", idx)?
                    .map(|p| Partition::V0(Cow::Owned(p)))
            }
            Deadline::V2(_) => {
                array::get_from_amt::<v2::Partition, _>(store, root, "partitions", idx)?
                    .map(|p| Partition::V2(Cow::Owned(p)))
            }
        };
        partition.ok_or(Error::InvalidPartition { partition: idx })
    }

    /// For each partition of the deadline, in index order, until `f` breaks.
    pub fn for_each_partition<BS, F>(
        &self,
        store: &BS,
        mut f: F,
    ) -> Result<ControlFlow<()>, Error>
    where
        BS: Blockstore,
        F: FnMut(u64, Partition<'_>) -> Result<ControlFlow<()>, Error>,
    {
        let root = self.partitions_root();
        match self {
            Deadline::V0(_) => {
                let amt = array::load_amt::<v0::Partition, _>(store, root, "partitions")?;
                array::for_each_while(&amt, root, "partitions", |idx, part| {
                    f(idx, Partition::V0(Cow::Borrowed(part)))
                })
            }
            Deadline::V2(_) => {
                let amt = array::load_amt::<v2::Partition, _>(store, root, "partitions")?;
                array::for_each_while(&amt, root, "partitions", |idx, part| {
                    f(idx, Partition::V2(Cow::Borrowed(part)))
                })
            }
        }
    }

    /// Whether the partitions differ from `other`'s. Deadlines from different
    /// layouts always count as changed.
    pub fn partitions_changed(&self, other: &Deadline) -> bool {
        match (self, other) {
            (Deadline::V0(a), Deadline::V0(b)) => a.partitions != b.partitions,
            (Deadline::V2(a), Deadline::V2(b)) => a.partitions != b.partitions,
            _ => true,
        }
    }

    /// Partition indices with a PoSt submitted in the current proving period.
    pub fn post_submissions(&self) -> &BitField {
        match self {
            Deadline::V0(dl) => &dl.post_submissions,
            Deadline::V2(dl) => &dl.post_submissions,
        }
    }

    pub fn live_sectors(&self) -> u64 {
        match self {
            Deadline::V0(dl) => dl.live_sectors,
            Deadline::V2(dl) => dl.live_sectors,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Partition<'a> {
    V0(Cow<'a, v0::Partition>),
    V2(Cow<'a, v2::Partition>),
}

impl Partition<'_> {
    /// Sector numbers in this partition, including faulty and terminated sectors.
    pub fn all_sectors(&self) -> &BitField {
        match self {
            Partition::V0(p) => &p.sectors,
            Partition::V2(p) => &p.sectors,
        }
    }

    pub fn faulty_sectors(&self) -> &BitField {
        match self {
            Partition::V0(p) => &p.faults,
            Partition::V2(p) => &p.faults,
        }
    }

    pub fn recovering_sectors(&self) -> &BitField {
        match self {
            Partition::V0(p) => &p.recoveries,
            Partition::V2(p) => &p.recoveries,
        }
    }

    pub fn terminated_sectors(&self) -> &BitField {
        match self {
            Partition::V0(p) => &p.terminated,
            Partition::V2(p) => &p.terminated,
        }
    }

    /// Sectors awaiting their first Window PoSt. Always empty before v2.
    pub fn unproven_sectors(&self) -> BitField {
        match self {
            Partition::V0(_) => BitField::new(),
            Partition::V2(p) => p.unproven.clone(),
        }
    }

    pub fn live_sectors(&self) -> BitField {
        match self {
            Partition::V0(p) => p.live_sectors(),
            Partition::V2(p) => p.live_sectors(),
        }
    }

    pub fn active_sectors(&self) -> BitField {
        match self {
            Partition::V0(p) => p.active_sectors(),
            Partition::V2(p) => p.active_sectors(),
        }
    }

    fn expirations_root(&self) -> &Cid {
        match self {
            Partition::V0(p) => &p.expirations_epochs,
            Partition::V2(p) => &p.expirations_epochs,
        }
    }

    /// Opens the partition's expiration queue with the deadline's quantization.
    pub fn load_expiration_queue<'db, BS: Blockstore>(
        &self,
        store: &'db BS,
        quant: QuantSpec,
    ) -> Result<ExpirationQueue<'db, BS>, Error> {
        ExpirationQueue::load(store, self.expirations_root(), quant)
    }
}
