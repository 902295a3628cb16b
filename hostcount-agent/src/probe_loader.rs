//! eBPF program loading, map setup and readback

use anyhow::{anyhow, Context, Result};
use aya::{
    maps::{Array, HashMap, MapData},
    programs::{TracePoint, Xdp, XdpFlags},
    Ebpf,
};
use hostcount::control::{host_key, key_addr, CounterEntry, ResultEntry};
use hostcount::handler::{results, source_counter};
use hostcount::ControlPlaneConfig;
use hostcount_common::results::slot;
use hostcount_common::{check_license, control, maps, InsertPolicy, ProgramMeta};
use log::{debug, info, warn};
use std::path::Path;

/// Owns the loaded eBPF objects. Dropping it detaches every program.
pub struct ProbeManager {
    counter: Ebpf,
    harness: Option<Ebpf>,
}

impl ProbeManager {
    /// Run pre-flight checks, load the source counter and prepare its maps.
    ///
    /// Nothing is attached yet; counting starts with [`attach_counter`].
    ///
    /// [`attach_counter`]: ProbeManager::attach_counter
    pub fn new(config: &ControlPlaneConfig) -> Result<Self> {
        config.validate()?;
        run_preflight_checks()?;
        deploy_check(&source_counter::META, &config.license)?;

        info!("Loading source counter...");
        let mut counter = Ebpf::load(aya::include_bytes_aligned!(concat!(
            env!("OUT_DIR"),
            "/source_counter"
        )))
        .context("Failed to load source counter")?;

        write_insert_policy(&mut counter, config.insert_policy.into())?;
        seed_known_hosts(&mut counter, config)?;

        Ok(Self {
            counter,
            harness: None,
        })
    }

    /// Attach the source counter to `iface` at XDP ingress
    pub fn attach_counter(&mut self, iface: &str) -> Result<()> {
        info!("Attaching {} to {}...", source_counter::META.name, iface);

        let program: &mut Xdp = self
            .counter
            .program_mut(source_counter::META.name)
            .ok_or_else(|| anyhow!("{} not found in eBPF object", source_counter::META.name))?
            .try_into()?;

        program.load()?;

        if let Err(e) = program.attach(iface, XdpFlags::default()) {
            warn!("Native XDP attach failed ({}), falling back to SKB mode", e);
            program
                .attach(iface, XdpFlags::SKB_MODE)
                .with_context(|| format!("Failed to attach to {}", iface))?;
        }

        info!("Source counter attached to {}", iface);
        Ok(())
    }

    /// Load the results harness and attach it to the execve tracepoint
    pub fn attach_harness(&mut self, license: &str) -> Result<()> {
        deploy_check(&results::META, license)?;

        let mut harness = Ebpf::load(aya::include_bytes_aligned!(concat!(
            env!("OUT_DIR"),
            "/results_harness"
        )))
        .context("Failed to load results harness")?;

        let program: &mut TracePoint = harness
            .program_mut(results::META.name)
            .ok_or_else(|| anyhow!("{} not found in eBPF object", results::META.name))?
            .try_into()?;

        program.load()?;
        program
            .attach("syscalls", "sys_enter_execve")
            .context("Failed to attach to syscalls/sys_enter_execve")?;

        info!("Results harness attached to syscalls/sys_enter_execve");
        self.harness = Some(harness);
        Ok(())
    }

    /// Read every counter, sorted by address
    pub fn counters(&self) -> Result<Vec<CounterEntry>> {
        let map = self
            .counter
            .map(maps::CONNECTION_COUNTER)
            .ok_or_else(|| missing_map(&self.counter, maps::CONNECTION_COUNTER))?;
        let table: HashMap<&MapData, u32, u64> = HashMap::try_from(map)?;

        let mut entries = Vec::new();
        for item in table.iter() {
            let (key, count) = item?;
            entries.push(CounterEntry {
                addr: key_addr(key),
                key,
                count,
            });
        }
        entries.sort_by_key(|e| e.addr);
        Ok(entries)
    }

    /// Read the named result slots, if the harness is attached
    pub fn results(&self) -> Result<Vec<ResultEntry>> {
        let Some(harness) = &self.harness else {
            return Ok(Vec::new());
        };

        let map = harness
            .map(maps::RESULTS)
            .ok_or_else(|| missing_map(harness, maps::RESULTS))?;
        let array: Array<&MapData, u64> = Array::try_from(map)?;

        slot::NAMES
            .iter()
            .map(|(index, name)| {
                Ok(ResultEntry {
                    slot: *index,
                    name: *name,
                    value: array.get(index, 0)?,
                })
            })
            .collect()
    }

    /// Detach and unload all programs
    pub fn unload(self) {
        info!("Unloading eBPF programs...");
        drop(self.harness);
        drop(self.counter);
        info!("Programs unloaded");
    }
}

fn deploy_check(meta: &ProgramMeta, license: &str) -> Result<()> {
    check_license(meta.name, license, meta.requires)?;
    debug!("{} ({}) passed the load-time check", meta.name, meta.section);
    Ok(())
}

fn write_insert_policy(bpf: &mut Ebpf, policy: InsertPolicy) -> Result<()> {
    let map = bpf
        .map_mut(maps::CONTROL)
        .ok_or_else(|| anyhow!("{} map not found in eBPF object", maps::CONTROL))?;
    let mut control_map: Array<&mut MapData, u32> = Array::try_from(map)?;

    control_map
        .set(control::SLOT_INSERT_POLICY, policy.as_raw(), 0)
        .context("Failed to write insert policy")?;

    info!("Insert policy: {}", policy.as_str());
    Ok(())
}

fn seed_known_hosts(bpf: &mut Ebpf, config: &ControlPlaneConfig) -> Result<()> {
    let map = bpf
        .map_mut(maps::CONNECTION_COUNTER)
        .ok_or_else(|| anyhow!("{} map not found in eBPF object", maps::CONNECTION_COUNTER))?;
    let mut table: HashMap<&mut MapData, u32, u64> = HashMap::try_from(map)?;

    for addr in &config.known_hosts {
        table
            .insert(host_key(*addr), 0, 0)
            .with_context(|| format!("Failed to seed {}", addr))?;
        debug!("Seeded {}", addr);
    }

    info!("Seeded {} known hosts", config.known_hosts.len());
    Ok(())
}

fn missing_map(bpf: &Ebpf, name: &str) -> anyhow::Error {
    let available: Vec<_> = bpf.maps().map(|(name, _)| name.to_string()).collect();
    anyhow!(
        "{} map not found in eBPF object. Available maps: {:?}",
        name,
        available
    )
}

/// Run pre-flight checks to validate the system can run eBPF programs
fn run_preflight_checks() -> Result<()> {
    info!("Running pre-flight checks...");

    check_kernel_version()?;
    check_btf()?;
    check_privileges()?;

    info!("Pre-flight checks passed");
    Ok(())
}

/// Check if kernel version is >= 5.8
fn check_kernel_version() -> Result<()> {
    let output = std::process::Command::new("uname")
        .arg("-r")
        .output()
        .context("Failed to get kernel version")?;

    let version_str = String::from_utf8(output.stdout)?;
    let (major, minor) = parse_kernel_version(&version_str)?;

    if major < 5 || (major == 5 && minor < 8) {
        return Err(anyhow!(
            "Kernel {} is too old. hostcount requires kernel 5.8+",
            version_str.trim()
        ));
    }

    info!("Kernel version: {} (supported)", version_str.trim());
    Ok(())
}

fn parse_kernel_version(version_str: &str) -> Result<(u32, u32)> {
    let parts: Vec<&str> = version_str.split('.').collect();

    if parts.len() < 2 {
        return Err(anyhow!("Could not parse kernel version: {}", version_str));
    }

    let major: u32 = parts[0]
        .trim()
        .parse()
        .context("Invalid kernel major version")?;

    let minor_str = parts[1].split('-').next().unwrap_or(parts[1]);
    let minor: u32 = minor_str
        .trim()
        .parse()
        .context("Invalid kernel minor version")?;

    Ok((major, minor))
}

/// Check if BTF (BPF Type Format) is available
fn check_btf() -> Result<()> {
    let btf_path = Path::new("/sys/kernel/btf/vmlinux");

    if !btf_path.exists() {
        warn!("BTF not found at /sys/kernel/btf/vmlinux");
        return Ok(());
    }

    info!("BTF available");
    Ok(())
}

fn check_privileges() -> Result<()> {
    let euid = unsafe { libc::geteuid() };

    if euid != 0 {
        warn!(
            "Not running as root (euid={}). Ensure CAP_BPF and CAP_NET_ADMIN are granted.",
            euid
        );
    } else {
        info!("Running with root privileges");
    }

    Ok(())
}
