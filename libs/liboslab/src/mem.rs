//! Memory-mapping wrappers
//!
//! Two mapping shapes: a shared anonymous region created before a fork and
//! inherited by the child (the scheduler's cross-process state), and a
//! fixed-address anonymous page (the demand pager's unit of allocation).

use crate::error::Error;

/// Map a zeroed shared anonymous region sized for `T`. The mapping is
/// inherited across fork, giving both processes the same physical pages.
///
/// # Safety
///
/// The caller must ensure every bit pattern of all-zeroes is a valid `T`,
/// and must uphold whatever cross-process access discipline `T` requires.
pub unsafe fn map_shared<T>() -> Result<*mut T, Error> {
    let ptr = libc::mmap(
        std::ptr::null_mut(),
        std::mem::size_of::<T>(),
        libc::PROT_READ | libc::PROT_WRITE,
        libc::MAP_SHARED | libc::MAP_ANONYMOUS,
        -1,
        0,
    );
    if ptr == libc::MAP_FAILED {
        Err(Error::last_os())
    } else {
        Ok(ptr as *mut T)
    }
}

/// Map `len` bytes of anonymous readable-writable-executable memory at
/// exactly `addr`.
///
/// Async-signal-safe; the demand pager calls this from its fault handler.
///
/// # Safety
///
/// `addr` must be page-aligned and must not overlap any mapping the caller
/// still needs: MAP_FIXED replaces whatever was there.
pub unsafe fn map_fixed_rwx(addr: usize, len: usize) -> Result<*mut u8, Error> {
    let ptr = libc::mmap(
        addr as *mut libc::c_void,
        len,
        libc::PROT_READ | libc::PROT_WRITE | libc::PROT_EXEC,
        libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_FIXED,
        -1,
        0,
    );
    if ptr == libc::MAP_FAILED {
        Err(Error::last_os())
    } else {
        Ok(ptr as *mut u8)
    }
}

/// Unmap `len` bytes at `addr`.
///
/// # Safety
///
/// `addr` must be the page-aligned start of a live mapping of at least
/// `len` bytes, and nothing may reference the range afterwards.
pub unsafe fn unmap(addr: *mut libc::c_void, len: usize) -> Result<(), Error> {
    Error::check(libc::munmap(addr, len)).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_region_arrives_zeroed_and_unmaps() {
        unsafe {
            let ptr = map_shared::<[u64; 512]>().unwrap();
            assert!((*ptr).iter().all(|&w| w == 0));
            (*ptr)[0] = 0xdead_beef;
            assert_eq!((*ptr)[0], 0xdead_beef);
            unmap(ptr as *mut libc::c_void, std::mem::size_of::<[u64; 512]>()).unwrap();
        }
    }
}
