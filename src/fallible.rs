//! Allocation that reports failure instead of aborting.
//!
//! `store` must not touch the table when memory runs out, so every node it
//! needs is allocated up front through these helpers.

use std::alloc::{self, Layout};

use crate::error::{Error, Result};

#[cfg(test)]
thread_local! {
    static FAIL_AFTER: std::cell::Cell<Option<usize>> = const { std::cell::Cell::new(None) };
}

/// Let the next `n` allocations on this thread succeed and fail every one
/// after them. `None` turns failures off again.
#[cfg(test)]
pub(crate) fn fail_after(n: Option<usize>) {
    FAIL_AFTER.with(|c| c.set(n));
}

#[cfg(test)]
fn injected_failure() -> bool {
    FAIL_AFTER.with(|c| match c.get() {
        Some(0) => true,
        Some(n) => {
            c.set(Some(n - 1));
            false
        }
        None => false,
    })
}

#[cfg(not(test))]
#[inline(always)]
fn injected_failure() -> bool {
    false
}

/// Move `value` into a new heap allocation, or report the failed size.
pub(crate) fn try_box<T>(value: T) -> Result<Box<T>> {
    let layout = Layout::new::<T>();
    if injected_failure() {
        return Err(Error::OutOfMemory {
            bytes: layout.size(),
        });
    }
    if layout.size() == 0 {
        return Ok(Box::new(value));
    }

    // SAFETY: layout has a non-zero size.
    let ptr = unsafe { alloc::alloc(layout) }.cast::<T>();
    if ptr.is_null() {
        return Err(Error::OutOfMemory {
            bytes: layout.size(),
        });
    }

    // SAFETY: ptr was just allocated by the global allocator with T's layout,
    // which is exactly what Box expects to own and later free.
    unsafe {
        ptr.write(value);
        Ok(Box::from_raw(ptr))
    }
}

/// Allocate an empty buffer with room for exactly `len` bytes.
pub(crate) fn try_buffer(len: usize) -> Result<Vec<u8>> {
    if injected_failure() {
        return Err(Error::OutOfMemory { bytes: len });
    }
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| Error::OutOfMemory { bytes: len })?;
    Ok(buf)
}
