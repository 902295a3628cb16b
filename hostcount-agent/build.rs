use anyhow::{anyhow, Context};
use std::env;

/// Probe objects the agent embeds with `include_bytes_aligned!`
const PROBES: [&str; 2] = ["source_counter", "results_harness"];

fn main() -> anyhow::Result<()> {
    // Skip eBPF build if we're already building for the eBPF target
    if env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_default() == "bpf" {
        return Ok(());
    }

    if env::consts::OS != "linux" {
        println!(
            "cargo:warning=eBPF compilation skipped on {}",
            env::consts::OS
        );
        return Ok(());
    }

    // Skip eBPF build in CI (no bpf-linker available)
    if env::var("CI").is_ok() {
        println!("cargo:warning=eBPF compilation skipped in CI. Use dedicated eBPF build job.");
        return Ok(());
    }

    let aya_build::cargo_metadata::Metadata { packages, .. } =
        aya_build::cargo_metadata::MetadataCommand::new()
            .no_deps()
            .exec()
            .context("MetadataCommand::exec")?;

    let ebpf_package = packages
        .into_iter()
        .find(|pkg| pkg.name == "hostcount-probes")
        .ok_or_else(|| anyhow!("hostcount-probes package not found"))?;

    aya_build::build_ebpf([ebpf_package])?;

    let out_dir = env::var("OUT_DIR")?;
    for probe in PROBES {
        let probe_path = format!("{}/{}", out_dir, probe);
        if !std::path::Path::new(&probe_path).exists() {
            return Err(anyhow!(
                "eBPF probe compilation failed: {} not found",
                probe_path
            ));
        }
    }

    Ok(())
}
