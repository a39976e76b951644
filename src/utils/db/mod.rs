// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use anyhow::Context as _;
use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::DAG_CBOR;
use multihash_codetable::{Code, MultihashDigest as _};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Extension methods for reading and writing DAG-CBOR records with the
/// hashing defaults used on chain.
pub trait CborStoreExt: Blockstore {
    /// Serializes `obj`, keys it by its `Blake2b256` DAG-CBOR CID and stores it.
    fn put_cbor_default<S: Serialize>(&self, obj: &S) -> anyhow::Result<Cid> {
        let bytes = fvm_ipld_encoding::to_vec(obj)?;
        let cid = Cid::new_v1(DAG_CBOR, Code::Blake2b256.digest(&bytes));
        self.put_keyed(&cid, &bytes)?;
        Ok(cid)
    }

    /// Like `CborStore::get_cbor`, but a missing block is an error.
    fn get_cbor_required<T: DeserializeOwned>(&self, cid: &Cid) -> anyhow::Result<T> {
        let bytes = self
            .get(cid)?
            .with_context(|| format!("Failed to load CID {cid} from the blockstore"))?;
        fvm_ipld_encoding::from_slice(&bytes)
            .with_context(|| format!("Failed to decode the record at {cid}"))
    }
}

impl<T: Blockstore> CborStoreExt for T {}
