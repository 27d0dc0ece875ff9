/// Reports free memory for the diagnostic record a threshold-0 sink receives.
pub trait MemoryProbe {
    /// Forces a reclamation cycle where the platform has one, then returns the
    /// number of free bytes.
    fn reclaim(&self) -> u64;
}

/// Host memory as seen by the operating system. Rust has no collector to run,
/// so `reclaim` only samples.
#[derive(Debug, Default, Clone)]
pub struct SystemMemory {}

impl SystemMemory {
    pub fn new() -> Self {
        Self {}
    }
}

#[cfg(target_os = "linux")]
impl MemoryProbe for SystemMemory {
    fn reclaim(&self) -> u64 {
        std::fs::read_to_string("/proc/meminfo")
            .ok()
            .and_then(|info| parse_meminfo(&info))
            .unwrap_or(0)
    }
}

#[cfg(not(target_os = "linux"))]
impl MemoryProbe for SystemMemory {
    fn reclaim(&self) -> u64 {
        0
    }
}

/// Extracts `MemAvailable` (falling back to `MemFree`) in bytes.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_meminfo(info: &str) -> Option<u64> {
    let field = |key: &str| {
        info.lines()
            .find_map(|line| line.strip_prefix(key))
            .and_then(|rest| rest.trim().trim_end_matches("kB").trim().parse::<u64>().ok())
            .map(|kb| kb * 1024)
    };

    field("MemAvailable:").or_else(|| field("MemFree:"))
}

impl<F> MemoryProbe for F
where
    F: Fn() -> u64,
{
    fn reclaim(&self) -> u64 {
        self()
    }
}
