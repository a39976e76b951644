// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Sector location and expiration lookups. Both walk deadlines, then
//! partitions, in index order and stop at the first partition that decides the
//! answer.

use std::ops::ControlFlow;

use fvm_ipld_blockstore::Blockstore;
use tracing::trace;

use super::{Error, SectorExpiration, SectorLocation, State};
use crate::shim::{policy::Policy, sector::SectorNumber};

impl State {
    /// Returns the deadline and partition index for a sector number, or `None`
    /// if no partition holds it.
    pub fn find_sector<BS: Blockstore>(
        &self,
        store: &BS,
        sector_num: SectorNumber,
    ) -> Result<Option<SectorLocation>, Error> {
        let mut location = None;
        self.for_each_deadline(store, |deadline_idx, deadline| {
            deadline.for_each_partition(store, |partition_idx, partition| {
                if !partition.all_sectors().get(sector_num) {
                    return Ok(ControlFlow::Continue(()));
                }
                location = Some(SectorLocation {
                    deadline: deadline_idx,
                    partition: partition_idx,
                });
                Ok(ControlFlow::Break(()))
            })
        })?;
        Ok(location)
    }

    /// Returns the effective expiration of the given sector.
    ///
    /// If the sector isn't found or has already been terminated, this returns
    /// `None`. If the sector does not expire early, the `early` epoch is 0.
    ///
    /// Within a partition's queue an early entry does not end the scan; only
    /// an on-time entry does, including one in the same set as the early
    /// entry.
    #[tracing::instrument(level = "trace", skip(self, store, policy))]
    pub fn get_sector_expiration<BS: Blockstore>(
        &self,
        store: &BS,
        policy: &Policy,
        sector_num: SectorNumber,
    ) -> Result<Option<SectorExpiration>, Error> {
        policy.validate().map_err(Error::InvalidPolicy)?;
        let mut out = SectorExpiration::default();
        let mut terminated = false;
        self.for_each_deadline(store, |deadline_idx, deadline| {
            let quant = self.quant_spec_for_deadline(policy, deadline_idx);
            deadline.for_each_partition(store, |partition_idx, partition| {
                if !partition.all_sectors().get(sector_num) {
                    return Ok(ControlFlow::Continue(()));
                }
                if partition.terminated_sectors().get(sector_num) {
                    trace!(deadline_idx, partition_idx, "sector already terminated");
                    terminated = true;
                    return Ok(ControlFlow::Break(()));
                }
                trace!(deadline_idx, partition_idx, "scanning expiration queue");

                let queue = partition.load_expiration_queue(store, quant)?;
                queue.for_each_while(|epoch, set| {
                    if set.early_sectors.get(sector_num) {
                        trace!(epoch, "early expiration");
                        out.early = epoch;
                    }
                    if set.on_time_sectors.get(sector_num) {
                        trace!(epoch, "on-time expiration");
                        out.on_time = epoch;
                        return ControlFlow::Break(());
                    }
                    ControlFlow::Continue(())
                })
            })
        })?;

        if terminated || (out.early == 0 && out.on_time == 0) {
            return Ok(None);
        }
        Ok(Some(out))
    }
}
