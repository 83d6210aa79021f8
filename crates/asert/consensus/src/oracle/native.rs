//! Oracle backed by the prebuilt `aserti3416` library
//!
//! The library exposes opaque block-index, header and parameter objects
//! through a C ABI. Each object is owned by a guard that destructs it on drop.
//!
//! Besides `CAPI_GetNextASERTWorkRequired`, the library must export the
//! object lifecycle wrappers declared below. Builds that ship only the retarget
//! entry point need these added next to it, each a thin `extern "C"` shim:
//!
//! | Symbol | Wraps |
//! |---|---|
//! | `CAPI_CBlockIndex_construct` / `_destruct` | `new CBlockIndex` / `delete` |
//! | `CAPI_CBlockIndex_set_nHeight` / `_set_nTime` / `_set_nBits` | field setters |
//! | `CAPI_CBlockIndex_set_pprev` | `pprev` link to the parent index |
//! | `CAPI_CBlockHeader_construct` / `_destruct` | `new CBlockHeader` / `delete` |
//! | `CAPI_Params_GetDefaultMainnetConsensusParams` | heap copy of mainnet `Consensus::Params` |
//! | `CAPI_Params_destruct` | `delete` of that copy |

use std::ffi::c_void;

use super::{ConsensusOracle, OracleBlock, OracleError};

#[link(name = "aserti3416")]
unsafe extern "C" {
    fn CAPI_CBlockIndex_construct() -> *mut c_void;
    fn CAPI_CBlockIndex_destruct(ptr: *mut c_void);
    fn CAPI_CBlockIndex_set_nHeight(ptr: *mut c_void, height: i32);
    fn CAPI_CBlockIndex_set_nTime(ptr: *mut c_void, time: u32);
    fn CAPI_CBlockIndex_set_nBits(ptr: *mut c_void, bits: u32);
    fn CAPI_CBlockIndex_set_pprev(ptr: *mut c_void, prev: *mut c_void);
    fn CAPI_CBlockHeader_construct() -> *mut c_void;
    fn CAPI_CBlockHeader_destruct(ptr: *mut c_void);
    fn CAPI_Params_GetDefaultMainnetConsensusParams() -> *mut c_void;
    fn CAPI_Params_destruct(ptr: *mut c_void);
    fn CAPI_GetNextASERTWorkRequired(
        pindex_prev: *const c_void,
        pblock: *const c_void,
        params: *const c_void,
        fork_height: i32,
    ) -> u32;
}

/// Owned native object
struct Handle {
    ptr: *mut c_void,
    destruct: unsafe extern "C" fn(*mut c_void),
}

impl Handle {
    fn new(ptr: *mut c_void, destruct: unsafe extern "C" fn(*mut c_void), what: &str) -> Result<Self, OracleError> {
        if ptr.is_null() {
            return Err(OracleError::CallFailed(format!("{what} construction returned null")));
        }
        Ok(Self { ptr, destruct })
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        // SAFETY: `ptr` came from the matching constructor and is dropped once.
        unsafe { (self.destruct)(self.ptr) }
    }
}

/// Reference implementation of the mode-3, 416-block ASERT variant
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeOracle;

impl ConsensusOracle for NativeOracle {
    fn name(&self) -> &'static str {
        "aserti3416"
    }

    fn reference_next_bits(&self, window: &[OracleBlock], fork_height: u64) -> Result<u32, OracleError> {
        if window.is_empty() {
            return Err(OracleError::EmptyWindow);
        }
        let fork_height = i32::try_from(fork_height).map_err(|_| OracleError::FieldOverflow)?;

        let mut blocks = Vec::with_capacity(window.len());
        for block in window {
            let height = i32::try_from(block.height).map_err(|_| OracleError::FieldOverflow)?;
            let time = u32::try_from(block.timestamp).map_err(|_| OracleError::FieldOverflow)?;

            // SAFETY: constructor has no preconditions; the handle owns the result.
            let handle = Handle::new(unsafe { CAPI_CBlockIndex_construct() }, CAPI_CBlockIndex_destruct, "block index")?;
            // SAFETY: `handle.ptr` is a live block index.
            unsafe {
                CAPI_CBlockIndex_set_nHeight(handle.ptr, height);
                CAPI_CBlockIndex_set_nTime(handle.ptr, time);
                CAPI_CBlockIndex_set_nBits(handle.ptr, block.bits);
            }
            blocks.push(handle);
        }

        for pair in blocks.windows(2) {
            // SAFETY: both block indices stay alive until `blocks` is dropped.
            unsafe { CAPI_CBlockIndex_set_pprev(pair[1].ptr, pair[0].ptr) };
        }

        // SAFETY: constructors have no preconditions.
        let header = Handle::new(unsafe { CAPI_CBlockHeader_construct() }, CAPI_CBlockHeader_destruct, "header")?;
        let params = Handle::new(
            unsafe { CAPI_Params_GetDefaultMainnetConsensusParams() },
            CAPI_Params_destruct,
            "consensus params",
        )?;

        let tip = blocks.last().ok_or(OracleError::EmptyWindow)?;
        // SAFETY: every pointer is live and the block chain is fully linked.
        let bits = unsafe { CAPI_GetNextASERTWorkRequired(tip.ptr, header.ptr, params.ptr, fork_height) };
        Ok(bits)
    }
}
