use crate::control::{ResultEntry, TableSnapshot};
use crate::metrics::collector::ReplaySummary;
use crate::Result;
use prometheus::{IntGauge, IntGaugeVec, Opts, Registry, TextEncoder};
use tracing::debug;

/// Renders table, result-slot and replay state in the Prometheus text
/// format. Values are gauges set from snapshots, so `update` can be called
/// repeatedly.
pub struct PrometheusExporter {
    registry: Registry,
    source_packets: IntGaugeVec,
    table_entries: IntGauge,
    results: IntGaugeVec,
    invocations: IntGaugeVec,
    verdicts: IntGaugeVec,
}

impl PrometheusExporter {
    pub fn new() -> Result<Self> {
        let registry = Registry::new_custom(Some("hostcount".to_string()), None)?;

        let source_packets = IntGaugeVec::new(
            Opts::new("source_packets", "Packets counted per source address"),
            &["source"],
        )?;
        let table_entries = IntGauge::new("table_entries", "Occupied counting-table slots")?;
        let results = IntGaugeVec::new(
            Opts::new("result_slot", "Value stored in each result slot"),
            &["slot"],
        )?;
        let invocations = IntGaugeVec::new(
            Opts::new("invocations", "Handler invocations by outcome"),
            &["outcome"],
        )?;
        let verdicts = IntGaugeVec::new(
            Opts::new("verdicts", "Handler invocations by returned verdict"),
            &["verdict"],
        )?;

        registry.register(Box::new(source_packets.clone()))?;
        registry.register(Box::new(table_entries.clone()))?;
        registry.register(Box::new(results.clone()))?;
        registry.register(Box::new(invocations.clone()))?;
        registry.register(Box::new(verdicts.clone()))?;

        Ok(Self {
            registry,
            source_packets,
            table_entries,
            results,
            invocations,
            verdicts,
        })
    }

    pub fn record_table(&self, snapshot: &TableSnapshot) {
        self.table_entries.set(snapshot.len as i64);
        for entry in &snapshot.entries {
            self.source_packets
                .with_label_values(&[entry.addr.to_string().as_str()])
                .set(entry.count as i64);
        }
    }

    pub fn record_results(&self, results: &[ResultEntry]) {
        for entry in results {
            self.results
                .with_label_values(&[entry.name])
                .set(entry.value as i64);
        }
    }

    pub fn record_replay(&self, summary: &ReplaySummary) {
        let outcomes = [
            ("short_frame", summary.short_frames),
            ("parsed", summary.parsed),
            ("counted", summary.counted),
            ("inserted", summary.inserted),
            ("missed", summary.missed),
        ];
        for (outcome, value) in outcomes {
            self.invocations
                .with_label_values(&[outcome])
                .set(value as i64);
        }
        for (verdict, value) in &summary.verdicts {
            self.verdicts
                .with_label_values(&[*verdict])
                .set(*value as i64);
        }
    }

    pub fn render(&self) -> Result<String> {
        let families = self.registry.gather();
        debug!("Rendering {} metric families", families.len());
        Ok(TextEncoder::new().encode_to_string(&families)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::CounterEntry;
    use std::net::Ipv4Addr;

    #[test]
    fn test_render_table_and_results() {
        let exporter = PrometheusExporter::new().unwrap();
        exporter.record_table(&TableSnapshot {
            policy: "lookup_only",
            capacity: 1024,
            len: 1,
            entries: vec![CounterEntry {
                addr: Ipv4Addr::new(10, 0, 0, 1),
                key: u32::from_ne_bytes([10, 0, 0, 1]),
                count: 7,
            }],
        });
        exporter.record_results(&[ResultEntry {
            slot: 0,
            name: "sum",
            value: 30,
        }]);

        let text = exporter.render().unwrap();
        assert!(text.contains("hostcount_source_packets{source=\"10.0.0.1\"} 7"));
        assert!(text.contains("hostcount_table_entries 1"));
        assert!(text.contains("hostcount_result_slot{slot=\"sum\"} 30"));
    }

    #[test]
    fn test_render_replay() {
        let exporter = PrometheusExporter::new().unwrap();
        let mut summary = ReplaySummary {
            invocations: 3,
            short_frames: 1,
            counted: 2,
            ..Default::default()
        };
        summary.verdicts.insert("XDP_PASS", 3);
        exporter.record_replay(&summary);

        let text = exporter.render().unwrap();
        assert!(text.contains("hostcount_invocations{outcome=\"counted\"} 2"));
        assert!(text.contains("hostcount_verdicts{verdict=\"XDP_PASS\"} 3"));
    }
}
