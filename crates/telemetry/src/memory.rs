//! Resident-memory sampling for the optional memory metric series.

/// Peak resident set size of this process in megabytes, or `None` when
/// the platform does not expose it.
#[cfg(unix)]
pub fn resident_memory_mb() -> Option<f64> {
    use std::mem::MaybeUninit;

    // SAFETY: getrusage fills the whole struct on success (return 0).
    let usage = unsafe {
        let mut usage = MaybeUninit::<libc::rusage>::uninit();
        if libc::getrusage(libc::RUSAGE_SELF, usage.as_mut_ptr()) != 0 {
            return None;
        }
        usage.assume_init()
    };

    let max_rss = usage.ru_maxrss as f64;

    // ru_maxrss is bytes on macOS, kilobytes elsewhere.
    #[cfg(target_os = "macos")]
    let mb = max_rss / (1024.0 * 1024.0);
    #[cfg(not(target_os = "macos"))]
    let mb = max_rss / 1024.0;

    Some(mb)
}

#[cfg(not(unix))]
pub fn resident_memory_mb() -> Option<f64> {
    None
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn reports_nonzero_resident_memory() {
        let mb = resident_memory_mb().expect("unix exposes getrusage");
        assert!(mb > 0.0);
    }
}
