//! License and capability declarations
//!
//! Every program carries a static license string. Programs that need
//! restricted capabilities must declare a GPL-compatible license or the
//! loader refuses them. This check happens once, before deployment, never
//! during an invocation.

use core::fmt;

/// License string as placed in the `license` section (without the NUL).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct License(pub &'static str);

impl License {
    pub const GPL: License = License("GPL");

    /// License strings the kernel treats as GPL-compatible
    pub const GPL_COMPATIBLE: [&'static str; 6] = [
        "GPL",
        "GPL v2",
        "GPL and additional rights",
        "Dual BSD/GPL",
        "Dual MIT/GPL",
        "Dual MPL/GPL",
    ];

    pub fn as_str(&self) -> &'static str {
        self.0
    }

    pub fn is_gpl_compatible(&self) -> bool {
        is_gpl_compatible(self.0)
    }
}

impl fmt::Display for License {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// GPL-compatibility test for a license string from any source.
pub fn is_gpl_compatible(license: &str) -> bool {
    License::GPL_COMPATIBLE.iter().any(|l| *l == license)
}

/// Capabilities a program requires from the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities(u32);

impl Capabilities {
    pub const NONE: Capabilities = Capabilities(0);
    /// Atomic increments on a shared counting table
    pub const SHARED_TABLE_ATOMICS: Capabilities = Capabilities(1 << 0);
    /// Writes to the shared results slots
    pub const RESULTS_SLOTS: Capabilities = Capabilities(1 << 1);

    /// Capabilities that are only granted to GPL-compatible programs
    pub const RESTRICTED: Capabilities = Capabilities(1 << 0);

    pub const fn contains(self, other: Capabilities) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: Capabilities) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn bits(self) -> u32 {
        self.0
    }
}

/// Static description of one program, consumed by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramMeta {
    pub name: &'static str,
    /// ELF section, e.g. `xdp` or `tracepoint/syscalls/sys_enter_execve`
    pub section: &'static str,
    pub license: License,
    pub requires: Capabilities,
}

/// Load-time rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityError {
    pub program: &'static str,
    pub missing: Capabilities,
}

impl fmt::Display for CapabilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "program {} requires restricted capabilities {:#x} but its license is not GPL-compatible",
            self.program,
            self.missing.bits()
        )
    }
}

#[cfg(feature = "userspace")]
impl std::error::Error for CapabilityError {}

/// Check a program's declaration the way the loader does.
pub fn check_capabilities(meta: &ProgramMeta) -> Result<(), CapabilityError> {
    check_license(meta.name, meta.license.as_str(), meta.requires)
}

/// Same check with a license supplied at deploy time.
pub fn check_license(
    program: &'static str,
    license: &str,
    requires: Capabilities,
) -> Result<(), CapabilityError> {
    if requires.intersects(Capabilities::RESTRICTED) && !is_gpl_compatible(license) {
        return Err(CapabilityError {
            program,
            missing: Capabilities(requires.bits() & Capabilities::RESTRICTED.bits()),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(license: &'static str, requires: Capabilities) -> ProgramMeta {
        ProgramMeta {
            name: "filter_packets",
            section: "xdp",
            license: License(license),
            requires,
        }
    }

    #[test]
    fn test_gpl_accepted() {
        assert!(check_capabilities(&meta("GPL", Capabilities::SHARED_TABLE_ATOMICS)).is_ok());
        assert!(
            check_capabilities(&meta("Dual MIT/GPL", Capabilities::SHARED_TABLE_ATOMICS)).is_ok()
        );
    }

    #[test]
    fn test_proprietary_rejected_for_restricted() {
        let err = check_capabilities(&meta("Proprietary", Capabilities::SHARED_TABLE_ATOMICS))
            .unwrap_err();
        assert_eq!(err.program, "filter_packets");
        assert!(err.missing.contains(Capabilities::SHARED_TABLE_ATOMICS));
    }

    #[test]
    fn test_unrestricted_program_any_license() {
        assert!(check_capabilities(&meta("MIT", Capabilities::NONE)).is_ok());
        assert!(check_capabilities(&meta("MIT", Capabilities::RESULTS_SLOTS)).is_ok());
        assert!(check_license("results_harness", "MIT", Capabilities::RESULTS_SLOTS).is_ok());
    }

    #[test]
    fn test_license_match_is_exact() {
        assert!(!is_gpl_compatible("gpl"));
        assert!(!is_gpl_compatible("GPL "));
        assert!(is_gpl_compatible("GPL v2"));
    }
}
