//! Fallible allocation helpers.
//!
//! The checker never aborts on allocation failure. All of its allocations go
//! through the helpers of this module, which are built on `try_reserve` and
//! report failure as [`XmlNoMemory`].
//!
//! For testing, [`xml_mem_setup_failure`] arranges for a chosen allocation to
//! fail. The counters are thread-local, so tests running in parallel do not
//! interfere with each other.

use std::cell::Cell;

/// Allocation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XmlNoMemory;

impl std::fmt::Display for XmlNoMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("out of memory")
    }
}

impl std::error::Error for XmlNoMemory {}

thread_local! {
    static DEBUG_MEM_BLOCKS: Cell<u64> = const { Cell::new(0) };
    static MEM_FAIL_COUNTDOWN: Cell<Option<u64>> = const { Cell::new(None) };
}

/// Count one allocation, failing it if injection says so.
fn xml_mem_account() -> Result<(), XmlNoMemory> {
    if let Some(countdown) = MEM_FAIL_COUNTDOWN.get() {
        if countdown == 0 {
            MEM_FAIL_COUNTDOWN.set(None);
            return Err(XmlNoMemory);
        }
        MEM_FAIL_COUNTDOWN.set(Some(countdown - 1));
    }
    DEBUG_MEM_BLOCKS.set(DEBUG_MEM_BLOCKS.get() + 1);
    Ok(())
}

/// Make the allocation after the next `after` successful ones fail.
///
/// Only one failure is injected: allocations after the failing one succeed
/// again. `None` cancels a pending injection.
#[doc(alias = "xmlMemSetup")]
pub fn xml_mem_setup_failure(after: Option<u64>) {
    MEM_FAIL_COUNTDOWN.set(after);
}

/// Check if an injected failure is still pending.
pub fn xml_mem_failure_pending() -> bool {
    MEM_FAIL_COUNTDOWN.get().is_some()
}

/// Number of allocations performed on this thread.
#[doc(alias = "xmlMemBlocks")]
pub fn xml_mem_blocks() -> u64 {
    DEBUG_MEM_BLOCKS.get()
}

/// Make sure `vec` can hold `additional` more elements.
///
/// Nothing is allocated if the spare capacity is already enough.
pub fn xml_try_reserve<T>(vec: &mut Vec<T>, additional: usize) -> Result<(), XmlNoMemory> {
    if vec.capacity() - vec.len() >= additional {
        return Ok(());
    }
    xml_mem_account()?;
    vec.try_reserve(additional).map_err(|_| XmlNoMemory)
}

pub fn xml_try_push<T>(vec: &mut Vec<T>, value: T) -> Result<(), XmlNoMemory> {
    xml_try_reserve(vec, 1)?;
    vec.push(value);
    Ok(())
}

/// Make sure `s` can hold `additional` more bytes.
pub fn xml_str_reserve(s: &mut String, additional: usize) -> Result<(), XmlNoMemory> {
    if s.capacity() - s.len() >= additional {
        return Ok(());
    }
    xml_mem_account()?;
    s.try_reserve(additional).map_err(|_| XmlNoMemory)
}

/// Duplicate `s` into a new buffer.
#[doc(alias = "xmlStrndup")]
pub fn xml_strndup(s: &str) -> Result<String, XmlNoMemory> {
    let mut res = String::new();
    xml_strcpy(&mut res, s)?;
    Ok(res)
}

/// Replace the content of `dst` with `src`, reusing its capacity.
pub fn xml_strcpy(dst: &mut String, src: &str) -> Result<(), XmlNoMemory> {
    dst.clear();
    xml_str_reserve(dst, src.len())?;
    dst.push_str(src);
    Ok(())
}
