//! Control plane
//!
//! Owns table and result-slot creation, key seeding, load-time capability
//! checks and read-only inspection. Handlers only ever receive clones of
//! the shared handles created here.

use crate::config::ControlPlaneConfig;
use crate::handler::{
    FrameClassifier, MessageGate, Program, ResultsHarness, SharedResults, SharedTable,
    SockAddrGate, SocketGate, SourceCounter,
};
use crate::{HostcountError, Result};
use hostcount_common::results::slot;
use hostcount_common::{check_license, CountingTable, InsertPolicy, License, ResultsSlots};
use serde::Serialize;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Table key for an address: the four octets in wire order, read as a
/// native-endian word, exactly as the kernel program loads them.
pub fn host_key(addr: Ipv4Addr) -> u32 {
    u32::from_ne_bytes(addr.octets())
}

/// Inverse of [`host_key`].
pub fn key_addr(key: u32) -> Ipv4Addr {
    Ipv4Addr::from(key.to_ne_bytes())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterEntry {
    pub addr: Ipv4Addr,
    pub key: u32,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSnapshot {
    pub policy: &'static str,
    pub capacity: usize,
    pub len: usize,
    pub entries: Vec<CounterEntry>,
}

impl TableSnapshot {
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|e| e.count).sum()
    }

    pub fn count_for(&self, addr: Ipv4Addr) -> Option<u64> {
        self.entries.iter().find(|e| e.addr == addr).map(|e| e.count)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultEntry {
    pub slot: u32,
    pub name: &'static str,
    pub value: u64,
}

pub struct ControlPlane {
    table: SharedTable,
    results: SharedResults,
    license: String,
}

impl ControlPlane {
    /// Create empty shared state with the given insert policy.
    pub fn new(policy: InsertPolicy) -> Self {
        Self {
            table: Arc::new(CountingTable::with_policy(policy)),
            results: Arc::new(ResultsSlots::new()),
            license: License::GPL.as_str().to_string(),
        }
    }

    /// Create shared state and seed every known host.
    pub fn from_config(config: &ControlPlaneConfig) -> Result<Self> {
        config.validate()?;

        let mut plane = Self::new(config.insert_policy.into());
        plane.license = config.license.clone();

        for addr in &config.known_hosts {
            plane.seed(*addr)?;
        }

        info!(
            "Counting table ready: {} known hosts, policy {}",
            plane.table.len(),
            plane.table.policy().as_str()
        );
        if plane.table.policy() == InsertPolicy::LookupOrInsert {
            warn!("lookup_or_insert enabled: unseeded sources will claim table slots");
        }

        Ok(plane)
    }

    pub fn seed(&self, addr: Ipv4Addr) -> Result<()> {
        debug!("Seeding {}", addr);
        self.table
            .seed(host_key(addr))
            .map_err(|full| HostcountError::TableFull {
                capacity: full.capacity,
                addr,
            })
    }

    /// Load-time check. A program that fails it is never handed out.
    pub fn deploy<P: Program>(&self, program: P) -> Result<P> {
        let meta = program.meta();
        check_license(meta.name, &self.license, meta.requires)?;
        debug!(
            "Deployed {} ({}) on {}",
            meta.name,
            meta.section,
            program.context()
        );
        Ok(program)
    }

    pub fn source_counter(&self) -> Result<SourceCounter> {
        self.deploy(SourceCounter::new(self.table.clone()))
    }

    pub fn frame_classifier(&self) -> Result<FrameClassifier> {
        self.deploy(FrameClassifier::new())
    }

    pub fn socket_gate(&self) -> Result<SocketGate> {
        self.deploy(SocketGate::new())
    }

    pub fn message_gate(&self) -> Result<MessageGate> {
        self.deploy(MessageGate::new())
    }

    pub fn sock_addr_gate(&self) -> Result<SockAddrGate> {
        self.deploy(SockAddrGate::new())
    }

    pub fn results_harness(&self, lhs: u64, rhs: u64) -> Result<ResultsHarness> {
        self.deploy(ResultsHarness::new(self.results.clone(), lhs, rhs))
    }

    pub fn table(&self) -> &SharedTable {
        &self.table
    }

    /// Read every counter, sorted by address.
    pub fn snapshot(&self) -> TableSnapshot {
        let mut entries: Vec<CounterEntry> = self
            .table
            .iter()
            .map(|(key, count)| CounterEntry {
                addr: key_addr(key),
                key,
                count,
            })
            .collect();
        entries.sort_by_key(|e| e.addr);

        TableSnapshot {
            policy: self.table.policy().as_str(),
            capacity: self.table.capacity(),
            len: entries.len(),
            entries,
        }
    }

    /// Read the named result slots.
    pub fn results_snapshot(&self) -> Vec<ResultEntry> {
        slot::NAMES
            .iter()
            .filter_map(|(index, name)| {
                self.results.load(*index).map(|value| ResultEntry {
                    slot: *index,
                    name: *name,
                    value,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Policy;
    use crate::handler::Handler;
    use hostcount_common::{CapabilityError, Capabilities};

    #[test]
    fn test_host_key_matches_wire_order() {
        let addr = Ipv4Addr::new(10, 0, 0, 5);
        assert_eq!(host_key(addr).to_ne_bytes(), [10, 0, 0, 5]);
        assert_eq!(key_addr(host_key(addr)), addr);
    }

    #[test]
    fn test_from_config_seeds_hosts() {
        let config = ControlPlaneConfig {
            known_hosts: vec![Ipv4Addr::new(10, 0, 0, 2), Ipv4Addr::new(10, 0, 0, 1)],
            ..Default::default()
        };
        let plane = ControlPlane::from_config(&config).unwrap();

        let snapshot = plane.snapshot();
        assert_eq!(snapshot.len, 2);
        assert_eq!(snapshot.policy, "lookup_only");
        assert_eq!(snapshot.entries[0].addr, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(snapshot.total(), 0);
    }

    #[test]
    fn test_non_gpl_license_blocks_counting_program() {
        let config = ControlPlaneConfig {
            license: "Proprietary".to_string(),
            ..Default::default()
        };
        let plane = ControlPlane::from_config(&config).unwrap();

        match plane.source_counter() {
            Err(HostcountError::CapabilityViolation(CapabilityError { program, missing })) => {
                assert_eq!(program, "filter_packets");
                assert!(missing.contains(Capabilities::SHARED_TABLE_ATOMICS));
            }
            other => panic!("expected capability violation, got {:?}", other.map(|_| ())),
        }

        // Programs without restricted capabilities still deploy
        assert!(plane.frame_classifier().is_ok());
        assert!(plane.socket_gate().is_ok());
        assert!(plane.message_gate().is_ok());
        assert!(plane.sock_addr_gate().is_ok());
        assert!(plane.results_harness(10, 20).is_ok());
    }

    #[test]
    fn test_lookup_or_insert_counts_unseeded_source() {
        let config = ControlPlaneConfig {
            insert_policy: Policy::LookupOrInsert,
            ..Default::default()
        };
        let plane = ControlPlane::from_config(&config).unwrap();
        let handler = plane.source_counter().unwrap();

        let mut frame = [0u8; 34];
        frame[26..30].copy_from_slice(&[172, 16, 0, 9]);
        handler.invoke(&frame);
        handler.invoke(&frame);

        assert_eq!(
            plane.snapshot().count_for(Ipv4Addr::new(172, 16, 0, 9)),
            Some(2)
        );
    }

    #[test]
    fn test_results_snapshot() {
        let plane = ControlPlane::new(InsertPolicy::LookupOnly);
        plane.results_harness(10, 20).unwrap().fire();

        let values: Vec<(&str, u64)> = plane
            .results_snapshot()
            .into_iter()
            .map(|e| (e.name, e.value))
            .collect();
        assert_eq!(
            values,
            vec![
                ("sum", 30),
                ("difference", 10),
                ("product", 200),
                ("quotient", 2),
                ("remainder", 0)
            ]
        );
    }
}
