//! CPU affinity for the pipeline workers.
//!
//! Pinning the three workers to distinct cores removes migration noise from
//! throughput measurements. It is a performance hint only: pin failures are
//! reported and the run proceeds unpinned.
//!
//! Linux only (`pthread_setaffinity_np`); other platforms return
//! `Unsupported`.

use std::io;

/// Pins the current thread to a zero-indexed CPU core.
#[cfg(target_os = "linux")]
pub fn pin_current_thread_to_core(core: usize) -> io::Result<()> {
    // cpu_set_t is a fixed-size bitmask; indices past it are undefined
    // behavior in CPU_SET.
    let capacity = std::mem::size_of::<libc::cpu_set_t>() * 8;
    if core >= capacity {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("core index {core} exceeds cpu_set_t capacity ({capacity})"),
        ));
    }

    // SAFETY: `set` is a properly initialized cpu_set_t and `core` is in
    // bounds; pthread_self() is always valid for the calling thread.
    unsafe {
        let mut set: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_ZERO(&mut set);
        libc::CPU_SET(core, &mut set);
        let rc = libc::pthread_setaffinity_np(
            libc::pthread_self(),
            std::mem::size_of::<libc::cpu_set_t>(),
            &set,
        );
        if rc != 0 {
            return Err(io::Error::from_raw_os_error(rc));
        }
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn pin_current_thread_to_core(_core: usize) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "thread affinity is only supported on Linux",
    ))
}
