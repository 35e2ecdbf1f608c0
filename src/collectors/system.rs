use crate::collectors::{bytes_to_gb, DiskSample, MemorySample, MetricsSource};
use std::thread;
use std::time::Duration;
use sysinfo::{CpuExt, DiskExt, System, SystemExt};
use tracing::debug;

pub struct SysinfoSource {
    system: System,
    cpu_window: Duration,
}

impl SysinfoSource {
    pub fn new(cpu_window: Duration) -> Self {
        Self {
            system: System::new(),
            cpu_window,
        }
    }
}

impl MetricsSource for SysinfoSource {
    fn sample_cpu(&mut self) -> Option<f64> {
        // Usage is a delta between two refreshes, so the first one only primes it.
        self.system.refresh_cpu();
        thread::sleep(self.cpu_window.max(System::MINIMUM_CPU_UPDATE_INTERVAL));
        self.system.refresh_cpu();

        let cpus = self.system.cpus();
        if cpus.is_empty() {
            debug!("sysinfo reported no CPUs");
            return None;
        }
        let sum: f32 = cpus.iter().map(|c| c.cpu_usage()).sum();
        Some((sum / cpus.len() as f32) as f64)
    }

    fn sample_memory(&mut self) -> Option<MemorySample> {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        if total == 0 {
            debug!("sysinfo reported zero total memory");
            return None;
        }
        Some(MemorySample {
            total_gb: bytes_to_gb(total),
            available_gb: bytes_to_gb(self.system.available_memory()),
        })
    }

    fn sample_disks(&mut self) -> Option<Vec<DiskSample>> {
        self.system.refresh_disks_list();
        self.system.refresh_disks();

        let mut disks = Vec::with_capacity(self.system.disks().len());
        for d in self.system.disks() {
            let mount = d.mount_point().to_string_lossy().to_string();
            let total = d.total_space();
            if total == 0 {
                debug!(mount = %mount, "skipping partition without readable size");
                continue;
            }
            let name = d.name().to_string_lossy();
            let device = if name.trim().is_empty() {
                mount
            } else {
                name.to_string()
            };
            disks.push(DiskSample {
                device,
                free_gb: bytes_to_gb(d.available_space()),
                total_gb: bytes_to_gb(total),
            });
        }

        debug!(
            disks = disks.len(),
            first_device = disks.first().map(|d| d.device.as_str()),
            "disk sampling finished"
        );
        Some(disks)
    }
}
