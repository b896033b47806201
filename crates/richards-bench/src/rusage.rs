//! Process resource usage snapshots.
//!
//! Thin wrapper over `getrusage(RUSAGE_SELF)`: user and system CPU time plus
//! the peak resident set size.  `getrusage` is a syscall, so snapshots are
//! taken by the sampler at coarse intervals, never inside the run loop.
//!
//! | Platform | `ru_maxrss` units |
//! |----------|-------------------|
//! | Linux, Android, BSDs | KiB |
//! | macOS | bytes |
//! | other | reported as 0 |

use std::time::Duration;

/// Process resource usage snapshot.
///
/// All fields are best-effort: if `getrusage` fails they are zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProcUsage {
    pub user_time: Duration,
    pub sys_time: Duration,
    /// Peak RSS since process start, in bytes.  Only ever grows.
    pub max_rss_bytes: u64,
}

impl ProcUsage {
    /// User plus system CPU time.
    #[inline]
    pub fn total_cpu_time(&self) -> Duration {
        self.user_time.saturating_add(self.sys_time)
    }

    /// CPU time consumed since `earlier`.
    #[inline]
    pub fn cpu_time_since(&self, earlier: &ProcUsage) -> Duration {
        self.total_cpu_time()
            .saturating_sub(earlier.total_cpu_time())
    }
}

#[cfg(unix)]
#[inline]
fn timeval_to_duration(tv: libc::timeval) -> Duration {
    let secs = if tv.tv_sec < 0 { 0 } else { tv.tv_sec as u64 };
    let usec = tv.tv_usec.clamp(0, 999_999) as u64;
    Duration::from_secs(secs) + Duration::from_micros(usec)
}

#[cfg(unix)]
#[inline]
fn maxrss_to_bytes(ru_maxrss: libc::c_long) -> u64 {
    let rss = if ru_maxrss <= 0 { 0 } else { ru_maxrss as u64 };

    #[cfg(any(
        target_os = "linux",
        target_os = "android",
        target_os = "freebsd",
        target_os = "netbsd",
        target_os = "openbsd",
        target_os = "dragonfly"
    ))]
    {
        rss.saturating_mul(1024)
    }

    #[cfg(target_os = "macos")]
    {
        rss
    }

    #[cfg(not(any(
        target_os = "linux",
        target_os = "android",
        target_os = "freebsd",
        target_os = "netbsd",
        target_os = "openbsd",
        target_os = "dragonfly",
        target_os = "macos"
    )))]
    {
        let _ = rss;
        0
    }
}

/// Resource usage of the current process.
#[cfg(unix)]
pub fn rusage_self() -> ProcUsage {
    // SAFETY: a zeroed `rusage` is a valid out-parameter and the return code
    // is checked before any field is read.
    let ru = unsafe {
        let mut ru: libc::rusage = std::mem::zeroed();
        if libc::getrusage(libc::RUSAGE_SELF, &mut ru) != 0 {
            return ProcUsage::default();
        }
        ru
    };

    ProcUsage {
        user_time: timeval_to_duration(ru.ru_utime),
        sys_time: timeval_to_duration(ru.ru_stime),
        max_rss_bytes: maxrss_to_bytes(ru.ru_maxrss),
    }
}

/// Non-Unix fallback: zero values.
#[cfg(not(unix))]
pub fn rusage_self() -> ProcUsage {
    ProcUsage::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_time_since_saturates() {
        let earlier = ProcUsage {
            user_time: Duration::from_millis(30),
            sys_time: Duration::from_millis(10),
            max_rss_bytes: 0,
        };
        let later = ProcUsage {
            user_time: Duration::from_millis(50),
            sys_time: Duration::from_millis(15),
            max_rss_bytes: 0,
        };
        assert_eq!(later.cpu_time_since(&earlier), Duration::from_millis(25));
        assert_eq!(earlier.cpu_time_since(&later), Duration::ZERO);
    }

    #[cfg(unix)]
    #[test]
    fn self_usage_is_populated() {
        // Burn a little CPU so user time is very likely non-zero.
        let mut acc = 0u64;
        for i in 0..2_000_000u64 {
            acc = acc.wrapping_add(i * i);
        }
        std::hint::black_box(acc);

        let usage = rusage_self();
        assert!(usage.max_rss_bytes > 0);
    }

    #[cfg(unix)]
    #[test]
    fn cpu_time_is_monotonic() {
        let first = rusage_self();
        let second = rusage_self();
        assert!(second.total_cpu_time() >= first.total_cpu_time());
    }
}
