// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::ops::ControlFlow;

use cid::Cid;
use fvm_ipld_amt::Amtv0;
use fvm_ipld_bitfield::BitField;
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::tuple::*;

use super::{Error, QuantSpec, types::PowerPair};
use crate::shim::{clock::ChainEpoch, econ::TokenAmount};

/// Sectors due to expire at one quantized epoch, split by whether they are
/// expiring on time or early.
#[derive(Serialize_tuple, Deserialize_tuple, Clone, Debug, Default, PartialEq, Eq)]
pub struct ExpirationSet {
    /// Sectors expiring "on time" at the end of their committed life
    pub on_time_sectors: BitField,
    /// Sectors expiring "early" due to being faulty for too long
    pub early_sectors: BitField,
    /// Pledge total for the on-time sectors
    pub on_time_pledge: TokenAmount,
    /// Power that is currently active (not faulty)
    pub active_power: PowerPair,
    /// Power that is currently faulty
    pub faulty_power: PowerPair,
}

impl ExpirationSet {
    pub fn is_empty(&self) -> bool {
        self.on_time_sectors.is_empty() && self.early_sectors.is_empty()
    }

    /// Count of all sectors in the set.
    pub fn len(&self) -> u64 {
        self.on_time_sectors.len() + self.early_sectors.len()
    }
}

/// A partition's expiration queue: an AMT from quantized epoch to the
/// [`ExpirationSet`] due at that epoch. Keys are visited in ascending order.
pub struct ExpirationQueue<'db, BS> {
    amt: Amtv0<ExpirationSet, &'db BS>,
    root: Cid,
    quant: QuantSpec,
}

impl<'db, BS: Blockstore> ExpirationQueue<'db, BS> {
    pub fn load(store: &'db BS, root: &Cid, quant: QuantSpec) -> Result<Self, Error> {
        let amt = Amtv0::load(root, store)
            .map_err(|e| Error::collection("expiration queue", root, e))?;
        Ok(Self {
            amt,
            root: *root,
            quant,
        })
    }

    pub fn quant(&self) -> QuantSpec {
        self.quant
    }

    /// Number of non-empty epochs in the queue.
    pub fn len(&self) -> u64 {
        self.amt.count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the set scheduled for the quantized epoch `raw_epoch` falls into.
    pub fn get(&self, raw_epoch: ChainEpoch) -> Result<Option<ExpirationSet>, Error> {
        let epoch = self.quant.quantize_up(raw_epoch);
        let Ok(key) = u64::try_from(epoch) else {
            return Ok(None);
        };
        let set = self
            .amt
            .get(key)
            .map_err(|e| Error::collection("expiration queue", &self.root, e))?;
        Ok(set.cloned())
    }

    /// Visits each entry in ascending epoch order until `f` breaks. Returns
    /// `Break` if the traversal was cut short.
    pub fn for_each_while<F>(&self, mut f: F) -> Result<ControlFlow<()>, Error>
    where
        F: FnMut(ChainEpoch, &ExpirationSet) -> ControlFlow<()>,
    {
        let mut flow = ControlFlow::Continue(());
        let mut bad_key = None;
        self.amt
            .for_each_while(|key, set| {
                let Ok(epoch) = ChainEpoch::try_from(key) else {
                    bad_key = Some(key);
                    return Ok(false);
                };
                flow = f(epoch, set);
                Ok(flow.is_continue())
            })
            .map_err(|e| Error::collection("expiration queue", &self.root, e))?;
        if let Some(key) = bad_key {
            return Err(Error::IllegalState(format!(
                "expiration queue key {key} is not a valid epoch"
            )));
        }
        Ok(flow)
    }
}
