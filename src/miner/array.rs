// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::ops::ControlFlow;

use cid::Cid;
use fvm_ipld_amt::Amtv0;
use fvm_ipld_blockstore::Blockstore;
use serde::{Serialize, de::DeserializeOwned};

use super::Error;

pub(crate) fn load_amt<'db, V, BS>(
    store: &'db BS,
    root: &Cid,
    what: &'static str,
) -> Result<Amtv0<V, &'db BS>, Error>
where
    V: Serialize + DeserializeOwned,
    BS: Blockstore,
{
    Amtv0::load(root, store).map_err(|e| Error::collection(what, root, e))
}

pub(crate) fn get_from_amt<V, BS>(
    store: &BS,
    root: &Cid,
    what: &'static str,
    index: u64,
) -> Result<Option<V>, Error>
where
    V: Serialize + DeserializeOwned + Clone,
    BS: Blockstore,
{
    let amt = load_amt::<V, _>(store, root, what)?;
    let value = amt
        .get(index)
        .map_err(|e| Error::collection(what, root, e))?;
    Ok(value.cloned())
}

/// Visits the AMT at `root` in index order until `f` breaks or fails. A
/// failure from `f` is returned as is, without being wrapped as a traversal
/// error.
pub(crate) fn for_each_while<V, BS, F>(
    amt: &Amtv0<V, BS>,
    root: &Cid,
    what: &'static str,
    mut f: F,
) -> Result<ControlFlow<()>, Error>
where
    V: Serialize + DeserializeOwned,
    BS: Blockstore,
    F: FnMut(u64, &V) -> Result<ControlFlow<()>, Error>,
{
    let mut flow = ControlFlow::Continue(());
    let mut failure = None;
    amt.for_each_while(|index, value| match f(index, value) {
        Ok(next) => {
            flow = next;
            Ok(flow.is_continue())
        }
        Err(e) => {
            failure = Some(e);
            Ok(false)
        }
    })
    .map_err(|e| Error::collection(what, root, e))?;
    match failure {
        Some(e) => Err(e),
        None => Ok(flow),
    }
}
