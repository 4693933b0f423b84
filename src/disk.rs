use crate::data::DiskSample;
use crate::units::SizeValue;
use std::path::MAIN_SEPARATOR;
use sysinfo::Disks;

/// A mounted partition as reported by the disk-info capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub device: String,
    pub mount_point: String,
}

/// Free/used byte counts for one mount point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageCounts {
    pub free: u64,
    pub used: u64,
}

/// Capability boundary over the OS disk primitives, swapped out in tests.
pub trait DiskInfoProvider: Send + Sync {
    fn partitions(&self) -> Vec<Partition>;
    fn usage(&self, mount_point: &str) -> Option<UsageCounts>;
}

/// Production provider backed by sysinfo, refreshed on every query.
pub struct SystemDisks;

impl DiskInfoProvider for SystemDisks {
    fn partitions(&self) -> Vec<Partition> {
        let disks = Disks::new_with_refreshed_list();
        disks
            .iter()
            .map(|disk| Partition {
                device: disk.name().to_string_lossy().into_owned(),
                mount_point: disk.mount_point().to_string_lossy().into_owned(),
            })
            .collect()
    }

    fn usage(&self, mount_point: &str) -> Option<UsageCounts> {
        let wanted = normalize_mount_point(mount_point);
        let disks = Disks::new_with_refreshed_list();
        for disk in disks.iter() {
            let mount = normalize_mount_point(&disk.mount_point().to_string_lossy());
            if mount == wanted {
                let free = disk.available_space();
                return Some(UsageCounts {
                    free,
                    used: disk.total_space().saturating_sub(free),
                });
            }
        }
        None
    }
}

/// Trims a trailing path separator, except when the path is exactly the
/// root separator.
pub fn normalize_mount_point(path: &str) -> String {
    let trimmed = path.trim_end_matches(MAIN_SEPARATOR);
    if trimmed.is_empty() {
        MAIN_SEPARATOR.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Normalized mount points of all partitions backed by a real block device.
pub fn list_mount_points(provider: &dyn DiskInfoProvider) -> Vec<String> {
    provider
        .partitions()
        .iter()
        .filter(|p| p.device.contains("/dev/"))
        .map(|p| normalize_mount_point(&p.mount_point))
        .collect()
}

pub fn mount_point_exists(provider: &dyn DiskInfoProvider, mount_point: &str) -> bool {
    list_mount_points(provider)
        .iter()
        .any(|m| m == mount_point)
}

/// Queries free/used byte counts for a mount point. Returns None when the
/// provider has no usage data for it.
pub fn sample_disk(provider: &dyn DiskInfoProvider, mount_point: &str) -> Option<DiskSample> {
    let counts = provider.usage(mount_point)?;
    tracing::debug!("Getting disk size for {mount_point}");
    Some(DiskSample {
        free_bytes: counts.free,
        used_bytes: counts.used,
        free_size: SizeValue::from_bytes(counts.free as f64),
        used_size: SizeValue::from_bytes(counts.used as f64),
    })
}
