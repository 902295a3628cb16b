use super::{AttachContext, Handler, Observed, Outcome, Program, SharedTable};
use hostcount_common::frame::SRC_ADDR;
use hostcount_common::{Capabilities, FrameReader, Invocation, License, ProgramMeta, XdpAction};

pub const META: ProgramMeta = ProgramMeta {
    name: "filter_packets",
    section: "xdp",
    license: License::GPL,
    requires: Capabilities::SHARED_TABLE_ATOMICS,
};

/// Ingress filter counting frames per IPv4 source address.
#[derive(Debug, Clone)]
pub struct SourceCounter {
    table: SharedTable,
}

impl SourceCounter {
    pub fn new(table: SharedTable) -> Self {
        Self { table }
    }
}

impl Program for SourceCounter {
    fn meta(&self) -> ProgramMeta {
        META
    }

    fn context(&self) -> AttachContext {
        AttachContext::IngressFilter
    }
}

impl Handler for SourceCounter {
    type Verdict = XdpAction;

    fn observe(&self, frame: &[u8]) -> Observed<XdpAction> {
        let reader = FrameReader::new(frame);
        let mut outcome = Outcome::InsufficientData;

        let verdict = Invocation::<XdpAction>::new().run(
            || reader.read(SRC_ADDR),
            |key| {
                let increment = self.table.increment(key);
                outcome = Outcome::Counted(increment);
                Some(increment)
            },
        );

        Observed { verdict, outcome }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostcount_common::{CountingTable, Increment};
    use std::sync::Arc;

    fn frame_from(src: [u8; 4], len: usize) -> Vec<u8> {
        let mut frame = vec![0u8; len.max(30)];
        frame[26..30].copy_from_slice(&src);
        frame.truncate(len);
        frame
    }

    #[test]
    fn test_counts_seeded_source() {
        let table: SharedTable = Arc::new(CountingTable::new());
        let key = u32::from_ne_bytes([10, 0, 0, 1]);
        table.seed(key).unwrap();

        let handler = SourceCounter::new(table.clone());
        let observed = handler.observe(&frame_from([10, 0, 0, 1], 64));

        assert_eq!(observed.verdict, XdpAction::Pass);
        assert_eq!(observed.outcome, Outcome::Counted(Increment::Updated(1)));
        assert_eq!(table.get(key), Some(1));
    }

    #[test]
    fn test_short_frame_touches_nothing() {
        let table: SharedTable = Arc::new(CountingTable::new());
        table.seed(0).unwrap();

        let handler = SourceCounter::new(table.clone());
        let observed = handler.observe(&[0u8; 29]);

        assert_eq!(observed.verdict, XdpAction::Pass);
        assert_eq!(observed.outcome, Outcome::InsufficientData);
        assert_eq!(table.get(0), Some(0));
    }
}
