use log::debug;
use serde::Serialize;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// Memory regions of the harness process at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProcessMemory {
    pub resident_bytes: u64,
    pub virtual_bytes: u64,
}

impl ProcessMemory {
    pub fn snapshot() -> Self {
        let pid = Pid::from_u32(std::process::id());
        let mut system = System::new();
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_memory(),
        );
        match system.process(pid) {
            Some(process) => Self {
                resident_bytes: process.memory(),
                virtual_bytes: process.virtual_memory(),
            },
            None => {
                debug!("process {pid} not visible to sysinfo, reporting zero memory");
                Self::default()
            }
        }
    }

    /// Per-region `self - earlier`. Negative values are kept.
    pub fn delta_since(&self, earlier: &ProcessMemory) -> MemoryDelta {
        MemoryDelta {
            resident_bytes: self.resident_bytes as i64 - earlier.resident_bytes as i64,
            virtual_bytes: self.virtual_bytes as i64 - earlier.virtual_bytes as i64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MemoryDelta {
    pub resident_bytes: i64,
    pub virtual_bytes: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_keeps_shrinkage() {
        let before = ProcessMemory {
            resident_bytes: 4096,
            virtual_bytes: 10_000,
        };
        let after = ProcessMemory {
            resident_bytes: 1024,
            virtual_bytes: 12_000,
        };
        let delta = after.delta_since(&before);
        assert_eq!(delta.resident_bytes, -3072);
        assert_eq!(delta.virtual_bytes, 2000);
    }

    #[test]
    fn test_snapshot_sees_own_process() {
        let memory = ProcessMemory::snapshot();
        assert!(memory.resident_bytes > 0);
    }
}
