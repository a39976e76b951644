// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::ops::ControlFlow;

use cid::Cid;
use fvm_ipld_amt::Amtv0;
use fvm_ipld_bitfield::BitField;
use fvm_ipld_blockstore::Blockstore;

use super::{Error, SectorOnChainInfo, array, v0, v2};

/// Indexed, ordered, read-only access to a persistent array.
pub trait ReadOnlyArray {
    type Item;

    fn get(&self, index: u64) -> Result<Option<Self::Item>, Error>;

    /// Visits entries in ascending index order until `f` breaks. Returns
    /// `Break` if the traversal was cut short.
    fn for_each_while<F>(&self, f: F) -> Result<ControlFlow<()>, Error>
    where
        F: FnMut(u64, &Self::Item) -> Result<ControlFlow<()>, Error>;
}

/// Decides which indices of an array are visible through a
/// [`FilteredArrayView`].
pub trait IndexFilter {
    fn includes(&self, index: u64) -> bool;
}

impl<F: Fn(u64) -> bool> IndexFilter for F {
    fn includes(&self, index: u64) -> bool {
        self(index)
    }
}

/// Membership filter over a bitfield. With `filter_out` set, members are
/// hidden instead of shown. No bitfield means everything is visible.
#[derive(Clone, Debug, Default)]
pub struct SetFilter {
    set: Option<BitField>,
    filter_out: bool,
}

impl SetFilter {
    pub fn new(set: Option<BitField>, filter_out: bool) -> Self {
        Self { set, filter_out }
    }
}

impl IndexFilter for SetFilter {
    fn includes(&self, index: u64) -> bool {
        match &self.set {
            Some(set) => set.get(index) != self.filter_out,
            None => true,
        }
    }
}

/// A lazy view over an array that hides every index its filter rejects.
/// Nothing is copied; each lookup and traversal consults the filter.
pub struct FilteredArrayView<A, P> {
    array: A,
    filter: P,
}

impl<A, P> FilteredArrayView<A, P>
where
    A: ReadOnlyArray,
    P: IndexFilter,
{
    pub fn new(array: A, filter: P) -> Self {
        Self { array, filter }
    }

    /// Returns `None` for filtered indices even if the array holds a value.
    pub fn get(&self, index: u64) -> Result<Option<A::Item>, Error> {
        if !self.filter.includes(index) {
            return Ok(None);
        }
        self.array.get(index)
    }

    pub fn for_each_while<F>(&self, mut f: F) -> Result<ControlFlow<()>, Error>
    where
        F: FnMut(u64, &A::Item) -> Result<ControlFlow<()>, Error>,
    {
        self.array.for_each_while(|index, item| {
            if self.filter.includes(index) {
                f(index, item)
            } else {
                Ok(ControlFlow::Continue(()))
            }
        })
    }

    /// Collects the visible entries in index order.
    pub fn to_vec(&self) -> Result<Vec<(u64, A::Item)>, Error>
    where
        A::Item: Clone,
    {
        let mut out = Vec::new();
        self.for_each_while(|index, item| {
            out.push((index, item.clone()));
            Ok(ControlFlow::Continue(()))
        })?;
        Ok(out)
    }

    pub fn into_inner(self) -> A {
        self.array
    }
}

enum SectorsAmt<'db, BS> {
    V0(Amtv0<v0::SectorOnChainInfo, &'db BS>),
    V2(Amtv0<v2::SectorOnChainInfo, &'db BS>),
}

/// The miner's sector info AMT, decoded to the common [`SectorOnChainInfo`].
pub struct SectorsArray<'db, BS> {
    amt: SectorsAmt<'db, BS>,
    root: Cid,
}

impl<'db, BS: Blockstore> SectorsArray<'db, BS> {
    pub(crate) fn load_v0(store: &'db BS, root: &Cid) -> Result<Self, Error> {
        Ok(Self {
            amt: SectorsAmt::V0(array::load_amt(store, root, "sectors")?),
            root: *root,
        })
    }

    pub(crate) fn load_v2(store: &'db BS, root: &Cid) -> Result<Self, Error> {
        Ok(Self {
            amt: SectorsAmt::V2(array::load_amt(store, root, "sectors")?),
            root: *root,
        })
    }

    /// Number of sectors in the array, ignoring any filter.
    pub fn count(&self) -> u64 {
        match &self.amt {
            SectorsAmt::V0(amt) => amt.count(),
            SectorsAmt::V2(amt) => amt.count(),
        }
    }
}

impl<BS: Blockstore> ReadOnlyArray for SectorsArray<'_, BS> {
    type Item = SectorOnChainInfo;

    fn get(&self, index: u64) -> Result<Option<SectorOnChainInfo>, Error> {
        let root = &self.root;
        Ok(match &self.amt {
            SectorsAmt::V0(amt) => amt
                .get(index)
                .map_err(|e| Error::collection("sectors", root, e))?
                .cloned()
                .map(From::from),
            SectorsAmt::V2(amt) => amt
                .get(index)
                .map_err(|e| Error::collection("sectors", root, e))?
                .cloned()
                .map(From::from),
        })
    }

    fn for_each_while<F>(&self, mut f: F) -> Result<ControlFlow<()>, Error>
    where
        F: FnMut(u64, &SectorOnChainInfo) -> Result<ControlFlow<()>, Error>,
    {
        match &self.amt {
            SectorsAmt::V0(amt) => array::for_each_while(amt, &self.root, "sectors", |i, info| {
                f(i, &info.clone().into())
            }),
            SectorsAmt::V2(amt) => array::for_each_while(amt, &self.root, "sectors", |i, info| {
                f(i, &info.clone().into())
            }),
        }
    }
}
