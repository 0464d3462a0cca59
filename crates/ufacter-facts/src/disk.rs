//! Mount point and block device facts

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use nix::sys::statvfs::statvfs;
use tracing::{debug, instrument};
use ufacter_core::{Fact, FactSink, ReportOptions, Reporter};

use crate::error::FactsError;
use crate::paths::{HostPaths, read_attribute, read_to_string};
use crate::units::{human_bytes, percent, used_percent};

/// One line of `/proc/mounts`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub device: String,
    pub mount_point: String,
    pub fs_type: String,
    pub options: Vec<String>,
}

/// Space figures of one mounted filesystem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountUsage {
    pub total: u64,
    pub available: u64,
}

/// Filesystem types backed by a device, from `/proc/filesystems`
#[must_use]
pub fn parse_filesystems(content: &str) -> HashSet<String> {
    content
        .lines()
        .filter(|line| !line.starts_with("nodev"))
        .map(str::trim)
        .filter(|fs| !fs.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `/proc/mounts`, keeping device-backed filesystems only
///
/// Every mount is kept when `physical` is empty.
#[must_use]
pub fn parse_mounts(content: &str, physical: &HashSet<String>) -> Vec<MountEntry> {
    content
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let device = fields.next()?;
            let mount_point = fields.next()?;
            let fs_type = fields.next()?;
            let options = fields.next().unwrap_or_default();
            Some(MountEntry {
                device: unescape(device),
                mount_point: unescape(mount_point),
                fs_type: fs_type.to_string(),
                options: options.split(',').map(str::to_string).collect(),
            })
        })
        .filter(|entry| physical.is_empty() || physical.contains(&entry.fs_type))
        .collect()
}

/// Decode the octal escapes the kernel uses for whitespace in mount fields
fn unescape(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\'
            && let Some(octal) = field.get(i + 1..i + 4)
            && let Ok(byte) = u8::from_str_radix(octal, 8)
        {
            out.push(byte);
            i += 4;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Loop and device-mapper nodes are views onto other devices
#[must_use]
pub fn is_virtual_block_device(name: &str) -> bool {
    ["loop", "dm-"].iter().any(|prefix| {
        name.strip_prefix(prefix)
            .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
    })
}

/// Facts under `mountpoints.<mount point>`
///
/// Without usage figures only the identity of the mount is reported.
#[must_use]
pub fn mount_facts(entry: &MountEntry, usage: Option<MountUsage>) -> Vec<Fact> {
    let mount = entry.mount_point.as_str();
    let path = |key: &'static str| ["mountpoints", mount, key];
    let mut facts = vec![
        Fact::new(path("device"), entry.device.as_str()),
        Fact::new(path("filesystem"), entry.fs_type.as_str()),
        Fact::new(path("options"), entry.options.clone()),
    ];
    let Some(usage) = usage else {
        return facts;
    };
    let used = usage.total.saturating_sub(usage.available);
    facts.extend([
        Fact::new(path("capacity"), percent(used_percent(used, usage.total))).volatile(),
        Fact::new(path("size_bytes"), usage.total),
        Fact::new(path("size"), human_bytes(usage.total)),
        Fact::new(path("available_bytes"), usage.available).volatile(),
        Fact::new(path("available"), human_bytes(usage.available)).volatile(),
        Fact::new(path("used_bytes"), used).volatile(),
        Fact::new(path("used"), human_bytes(used)).volatile(),
    ]);
    facts
}

/// Reports `mountpoints.*` and `disks.*`
#[derive(Debug, Clone)]
pub struct DiskReporter {
    paths: HostPaths,
}

impl DiskReporter {
    pub fn new(paths: HostPaths) -> Self {
        Self { paths }
    }

    async fn report_mountpoints(&self, sink: &FactSink) {
        let mounts = match read_to_string(&self.paths.proc.join("mounts")).await {
            Ok(content) => content,
            Err(e) => {
                sink.error(e, &["partitions"]).await;
                return;
            }
        };
        let physical = match read_to_string(&self.paths.proc.join("filesystems")).await {
            Ok(content) => parse_filesystems(&content),
            Err(e) => {
                debug!(error = %e, "cannot read filesystem types, keeping all mounts");
                HashSet::new()
            }
        };

        let entries = parse_mounts(&mounts, &physical);
        let points: Vec<String> = entries.iter().map(|e| e.mount_point.clone()).collect();
        let usage = match tokio::task::spawn_blocking(move || {
            points.iter().map(|point| mount_usage(point)).collect::<Vec<_>>()
        })
        .await
        {
            Ok(usage) => usage,
            Err(e) => {
                sink.error(e, &["usage"]).await;
                Vec::new()
            }
        };

        for (i, entry) in entries.iter().enumerate() {
            let usage = match usage.get(i) {
                Some(Ok(usage)) => Some(*usage),
                Some(Err(e)) => {
                    sink.error(e, &["usage", entry.mount_point.as_str()]).await;
                    None
                }
                None => None,
            };
            for fact in mount_facts(entry, usage) {
                sink.send(fact).await;
            }
        }
    }

    async fn report_block_devices(&self, sink: &FactSink) {
        let block = self.paths.sys.join("block");
        let devices = match list_block_devices(&block).await {
            Ok(devices) => devices,
            Err(e) => {
                sink.error(e, &["block_devices"]).await;
                return;
            }
        };

        for device in devices {
            let dir = block.join(&device);
            let path = |key: &'static str| ["disks", device.as_str(), key];

            match read_attribute(&dir.join("size")).await {
                Ok(Some(sectors)) => match parse_sectors(&sectors) {
                    Ok(sectors) => {
                        let bytes = sectors.saturating_mul(512);
                        sink.send(Fact::new(path("size_bytes"), bytes)).await;
                        sink.send(Fact::new(path("size"), human_bytes(bytes))).await;
                    }
                    Err(e) => sink.error(e, &["block_device_size", device.as_str()]).await,
                },
                Ok(None) => {}
                Err(e) => sink.error(e, &["block_device_size", device.as_str()]).await,
            }

            for key in ["model", "vendor"] {
                match read_attribute(&dir.join("device").join(key)).await {
                    Ok(Some(value)) => sink.send(Fact::new(path(key), value)).await,
                    Ok(None) => {}
                    Err(e) => {
                        let what = format!("block_device_{key}");
                        sink.error(e, &[what.as_str(), device.as_str()]).await;
                    }
                }
            }
        }
    }
}

/// Sector count from a sysfs `size` attribute
fn parse_sectors(raw: &str) -> Result<u64, FactsError> {
    raw.parse()
        .map_err(|e| FactsError::ParseError(format!("block device size {raw:?}: {e}")))
}

/// Space figures of the filesystem mounted at `mount_point`
#[allow(clippy::useless_conversion)]
fn mount_usage(mount_point: &str) -> Result<MountUsage, FactsError> {
    let stat = statvfs(mount_point).map_err(|e| FactsError::ReadError {
        path: mount_point.to_string(),
        reason: e.to_string(),
    })?;
    let fragment = u64::from(stat.fragment_size());
    Ok(MountUsage {
        total: u64::from(stat.blocks()).saturating_mul(fragment),
        available: u64::from(stat.blocks_available()).saturating_mul(fragment),
    })
}

/// Sorted block device names, without loop and device-mapper nodes
async fn list_block_devices(dir: &Path) -> Result<Vec<String>, FactsError> {
    let read_error = |e: std::io::Error| FactsError::ReadError {
        path: dir.display().to_string(),
        reason: e.to_string(),
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(read_error)?;
    let mut devices = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(read_error)? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !is_virtual_block_device(&name) {
            devices.push(name);
        }
    }
    devices.sort();
    Ok(devices)
}

#[async_trait]
impl Reporter for DiskReporter {
    fn name(&self) -> &'static str {
        "disk"
    }

    #[instrument(skip_all, fields(reporter = "disk"))]
    async fn report(&self, sink: &FactSink, _options: ReportOptions) {
        self.report_mountpoints(sink).await;
        self.report_block_devices(sink).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{capture, fact, value_of};
    use ufacter_core::FactValue;

    const FILESYSTEMS: &str = "nodev\tsysfs\nnodev\tproc\nnodev\ttmpfs\n\text4\n\tvfat\n";

    const MOUNTS: &str = "\
sysfs /sys sysfs rw,nosuid,nodev,noexec,relatime 0 0
proc /proc proc rw,nosuid,nodev,noexec,relatime 0 0
/dev/nvme0n1p2 / ext4 rw,relatime,errors=remount-ro 0 0
/dev/nvme0n1p1 /boot/efi vfat rw,relatime,fmask=0077 0 0
/dev/sdb1 /mnt/backup\\040disk ext4 ro,relatime 0 0
tmpfs /run tmpfs rw,nosuid,nodev,size=1631512k 0 0
";

    #[test]
    fn test_parse_mounts_keeps_physical() {
        let physical = parse_filesystems(FILESYSTEMS);
        assert_eq!(physical.len(), 2);

        let mounts = parse_mounts(MOUNTS, &physical);
        let points: Vec<&str> = mounts.iter().map(|m| m.mount_point.as_str()).collect();
        assert_eq!(points, vec!["/", "/boot/efi", "/mnt/backup disk"]);
        assert_eq!(mounts[0].device, "/dev/nvme0n1p2");
        assert_eq!(mounts[0].options, vec!["rw", "relatime", "errors=remount-ro"]);
    }

    #[test]
    fn test_parse_mounts_without_filter() {
        assert_eq!(parse_mounts(MOUNTS, &HashSet::new()).len(), 6);
    }

    #[test]
    fn test_virtual_block_devices() {
        assert!(is_virtual_block_device("loop0"));
        assert!(is_virtual_block_device("dm-12"));
        assert!(!is_virtual_block_device("sda"));
        assert!(!is_virtual_block_device("nvme0n1"));
        assert!(!is_virtual_block_device("loop"));
        assert!(!is_virtual_block_device("dm-x"));
    }

    #[test]
    fn test_parse_sectors() {
        assert_eq!(parse_sectors("2048").unwrap(), 2048);
        assert!(matches!(
            parse_sectors("lots"),
            Err(FactsError::ParseError(_))
        ));
    }

    #[test]
    fn test_mount_facts() {
        let entry = parse_mounts(MOUNTS, &parse_filesystems(FILESYSTEMS)).remove(0);
        let facts = mount_facts(
            &entry,
            Some(MountUsage {
                total: 100 * 1024 * 1024 * 1024,
                available: 75 * 1024 * 1024 * 1024,
            }),
        );

        assert_eq!(
            value_of(&facts, "mountpoints./.used"),
            Some(&FactValue::from("25.00 GiB"))
        );
        assert_eq!(
            value_of(&facts, "mountpoints./.capacity"),
            Some(&FactValue::from("25.00%"))
        );
        assert!(!fact(&facts, "mountpoints./.size_bytes").unwrap().is_volatile());
        assert!(fact(&facts, "mountpoints./.available_bytes").unwrap().is_volatile());
    }

    #[test]
    fn test_mount_facts_without_usage() {
        let entry = parse_mounts(MOUNTS, &parse_filesystems(FILESYSTEMS)).remove(0);
        let facts = mount_facts(&entry, None);

        assert_eq!(facts.len(), 3);
        assert_eq!(
            value_of(&facts, "mountpoints./.device"),
            Some(&FactValue::from("/dev/nvme0n1p2"))
        );
        assert!(value_of(&facts, "mountpoints./.size_bytes").is_none());
    }

    #[tokio::test]
    async fn test_mountpoints_follow_host_proc() {
        let root = tempfile::tempdir().unwrap();
        let paths = HostPaths::under(root.path());
        std::fs::create_dir_all(&paths.proc).unwrap();
        std::fs::write(paths.proc.join("filesystems"), FILESYSTEMS).unwrap();
        let mounted = root.path().to_string_lossy().into_owned();
        std::fs::write(
            paths.proc.join("mounts"),
            format!(
                "/dev/sdz1 {mounted} ext4 rw,relatime 0 0\n\
                 /dev/sdz2 /nonexistent/ufacter/data ext4 ro 0 0\n\
                 tmpfs /run tmpfs rw 0 0\n"
            ),
        )
        .unwrap();

        let reporter = DiskReporter::new(paths);
        let (tx, mut rx) = tokio::sync::mpsc::channel(64);
        let sink = FactSink::new(tx, "disk");
        reporter.report_mountpoints(&sink).await;
        drop(sink);
        let mut facts = Vec::new();
        while let Some(fact) = rx.recv().await {
            facts.push(fact);
        }

        let under = |mount: &str, key: &str| {
            facts
                .iter()
                .find(|f| f.path() == ["mountpoints", mount, key])
                .and_then(Fact::value)
        };
        assert_eq!(under(&mounted, "device"), Some(&FactValue::from("/dev/sdz1")));
        assert_eq!(under(&mounted, "filesystem"), Some(&FactValue::from("ext4")));
        assert!(matches!(
            under(&mounted, "size_bytes"),
            Some(FactValue::UInt(total)) if *total > 0
        ));

        let missing = "/nonexistent/ufacter/data";
        assert_eq!(under(missing, "device"), Some(&FactValue::from("/dev/sdz2")));
        assert!(under(missing, "size_bytes").is_none());
        assert!(facts.iter().any(|f| {
            f.path() == ["ufacter", "errors", "disk", "usage", missing]
        }));
        assert!(facts.iter().all(|f| f.path()[1] != "/run"));
    }

    #[tokio::test]
    async fn test_block_devices_from_sysfs() {
        let root = tempfile::tempdir().unwrap();
        let paths = HostPaths::under(root.path());
        let block = paths.sys.join("block");
        for dev in ["sda", "loop0", "dm-0"] {
            std::fs::create_dir_all(block.join(dev).join("device")).unwrap();
            std::fs::write(block.join(dev).join("size"), "2048\n").unwrap();
        }
        std::fs::write(block.join("sda/device/model"), "QEMU HARDDISK   \n").unwrap();
        std::fs::write(block.join("sda/device/vendor"), "ATA     \n").unwrap();

        let reporter = DiskReporter::new(paths);
        let (tx, mut rx) = tokio::sync::mpsc::channel(64);
        let sink = FactSink::new(tx, "disk");
        reporter.report_block_devices(&sink).await;
        drop(sink);
        let mut facts = Vec::new();
        while let Some(fact) = rx.recv().await {
            facts.push(fact);
        }

        assert_eq!(
            value_of(&facts, "disks.sda.size_bytes"),
            Some(&FactValue::UInt(1_048_576))
        );
        assert_eq!(
            value_of(&facts, "disks.sda.size"),
            Some(&FactValue::from("1.00 MiB"))
        );
        assert_eq!(
            value_of(&facts, "disks.sda.model"),
            Some(&FactValue::from("QEMU HARDDISK"))
        );
        assert_eq!(value_of(&facts, "disks.sda.vendor"), Some(&FactValue::from("ATA")));
        assert!(facts.iter().all(|f| f.path()[1] == "sda"));
    }

    #[tokio::test]
    async fn test_missing_sources_are_reported() {
        let root = tempfile::tempdir().unwrap();
        let facts = capture(
            &DiskReporter::new(HostPaths::under(root.path())),
            ReportOptions::default(),
        )
        .await;

        assert!(value_of(&facts, "ufacter.errors.disk.partitions").is_some());
        assert!(value_of(&facts, "ufacter.errors.disk.block_devices").is_some());
    }
}
