// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use serde::de::DeserializeOwned;

/// Failures of a miner state query. A record that is simply absent is never an
/// error; queries return `Ok(None)` for it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The store could not produce the block, either because reading failed or
    /// because the block is missing.
    #[error("failed to load {what} at {cid}")]
    Storage {
        what: &'static str,
        cid: Cid,
        #[source]
        source: anyhow::Error,
    },
    /// The block exists but does not decode as the expected record.
    #[error("failed to decode {what} at {cid}")]
    Decode {
        what: &'static str,
        cid: Cid,
        #[source]
        source: anyhow::Error,
    },
    /// An AMT or HAMT rooted at `root` could not be loaded or traversed.
    #[error("failed to traverse {what} rooted at {root}")]
    Collection {
        what: &'static str,
        root: Cid,
        #[source]
        source: anyhow::Error,
    },
    /// A caller supplied visitor failed.
    #[error(transparent)]
    Callback(#[from] anyhow::Error),
    #[error("deadline index {index} out of range [0, {max})")]
    InvalidDeadline { index: u64, max: u64 },
    #[error("partition {partition} does not exist in deadline")]
    InvalidPartition { partition: u64 },
    /// The network parameters cannot describe a proving period.
    #[error("invalid network policy")]
    InvalidPolicy(#[source] anyhow::Error),
    #[error("unknown miner actor code {0}")]
    UnknownActorCode(Cid),
    #[error("illegal state: {0}")]
    IllegalState(String),
}

impl Error {
    pub(crate) fn collection(
        what: &'static str,
        root: &Cid,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Collection {
            what,
            root: *root,
            source: source.into(),
        }
    }
}

/// Loads and decodes a single DAG-CBOR record, keeping store failures apart
/// from decode failures.
pub(crate) fn load_record<T, BS>(store: &BS, cid: &Cid, what: &'static str) -> Result<T, Error>
where
    T: DeserializeOwned,
    BS: Blockstore,
{
    let bytes = store
        .get(cid)
        .map_err(|source| Error::Storage {
            what,
            cid: *cid,
            source,
        })?
        .ok_or_else(|| Error::Storage {
            what,
            cid: *cid,
            source: anyhow::anyhow!("block not found"),
        })?;
    fvm_ipld_encoding::from_slice(&bytes).map_err(|e| Error::Decode {
        what,
        cid: *cid,
        source: e.into(),
    })
}
