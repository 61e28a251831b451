//! Dump encoding
//!
//! Summary file (one per thread):
//!
//! ```text
//! <file>:<line> = <event_id>, <occurrence_count>
//! ...
//! <source_id> -> <target_id>: <count>
//! ...
//! ```
//!
//! Latency files (one per `(source, target)` reservoir): one `{:.6}` value per
//! line, in reservoir slot order.

use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::call_site::CallSite;
use crate::output::{create_latency_file, latency_file_name, SummarySink, ThreadIds};
use crate::registry::EventRegistry;
use crate::reservoir::Reservoir;
use crate::sparse::Targeted;

/// Line written to the summary file when a call site is lost to overflow
pub fn overflow_marker(site: CallSite) -> String {
    format!("ERROR: Lost event type: {}:{}!\n", site.file, site.line)
}

/// Write event lines then transition lines
pub fn write_summary<W: Write>(out: &mut W, registry: &EventRegistry) -> io::Result<()> {
    for (id, record) in registry.occupied() {
        if let Some(site) = record.site() {
            writeln!(
                out,
                "{}:{} = {}, {}",
                site.file,
                site.line,
                id,
                record.occurrence_count()
            )?;
        }
    }

    for (id, record) in registry.occupied() {
        for transition in record.transitions() {
            writeln!(out, "{} -> {}: {}", id, transition.target, transition.count)?;
        }
    }

    Ok(())
}

/// Write one reservoir's samples in slot order
pub fn write_reservoir<W: Write>(out: &mut W, reservoir: &Reservoir) -> io::Result<()> {
    for value in reservoir.samples() {
        writeln!(out, "{:.6}", value)?;
    }
    Ok(())
}

/// Write and close the summary file
pub fn dump_summary(mut sink: SummarySink, registry: &EventRegistry) {
    let path = sink.path().to_path_buf();
    let mut out = BufWriter::new(sink.file_mut());
    let result = write_summary(&mut out, registry).and_then(|()| out.flush());
    if let Err(e) = result {
        tracing::warn!("could not write trace summary {}: {}", path.display(), e);
    }
}

/// Write every latency file; returns how many were written in full
pub fn dump_latency_files(dir: &Path, registry: &EventRegistry, ids: ThreadIds) -> usize {
    let mut written = 0;

    for (_, record) in registry.occupied() {
        let Some(from) = record.site() else { continue };
        for reservoir in record.latencies() {
            let Some(to) = registry.get(reservoir.target()).and_then(|r| r.site()) else {
                continue;
            };
            let path = dir.join(latency_file_name(from, to, ids));
            let file = match create_latency_file(&path) {
                Ok(file) => file,
                Err(e) => {
                    tracing::warn!("could not open latency file {}: {}", path.display(), e);
                    continue;
                }
            };
            let mut out = BufWriter::new(file);
            match write_reservoir(&mut out, reservoir).and_then(|()| out.flush()) {
                Ok(()) => written += 1,
                Err(e) => tracing::warn!("could not write {}: {}", path.display(), e),
            }
        }
    }

    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prng::FastRand;
    use crate::reservoir::observe_latency;
    use crate::transitions::record_transition;

    static FILE: &str = "walsender.c";

    #[test]
    fn test_overflow_marker() {
        let site = CallSite::new("src/walsender.c", 88);
        assert_eq!(overflow_marker(site), "ERROR: Lost event type: walsender.c:88!\n");
    }

    #[test]
    fn test_summary_format() {
        let mut registry = EventRegistry::new(16).unwrap();
        let a = registry.resolve(CallSite::new(FILE, 1)).unwrap();
        let b = registry.resolve(CallSite::new(FILE, 2)).unwrap();
        registry.get_mut(a).unwrap().count = 2;
        registry.get_mut(b).unwrap().count = 1;
        record_transition(registry.get_mut(a).unwrap(), b);
        record_transition(registry.get_mut(b).unwrap(), a);

        let mut out = Vec::new();
        write_summary(&mut out, &registry).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines.contains(&format!("walsender.c:1 = {}, 2", a).as_str()));
        assert!(lines.contains(&format!("walsender.c:2 = {}, 1", b).as_str()));
        // events come before transitions
        assert!(!lines[0].contains("->") && !lines[1].contains("->"));
        assert!(lines.contains(&format!("{} -> {}: 1", a, b).as_str()));
        assert!(lines.contains(&format!("{} -> {}: 1", b, a).as_str()));
    }

    #[test]
    fn test_reservoir_format() {
        let mut rng = FastRand::new(1);
        let mut reservoir = Reservoir::new(crate::registry::EventId::new(0));
        reservoir.observe(1.5, &mut rng);
        reservoir.observe(0.0001234, &mut rng);
        let mut out = Vec::new();
        write_reservoir(&mut out, &reservoir).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "1.500000\n0.000123\n");
        assert_eq!(reservoir.target().index(), 0);
    }

    #[test]
    fn test_latency_files_written() {
        let dir = tempfile::TempDir::new().unwrap();
        let ids = ThreadIds { pid: 1, tid: 2 };
        let mut rng = FastRand::new(9);
        let mut registry = EventRegistry::new(16).unwrap();
        let a = registry.resolve(CallSite::new(FILE, 10)).unwrap();
        let b = registry.resolve(CallSite::new(FILE, 20)).unwrap();
        observe_latency(registry.get_mut(a).unwrap(), b, 2.0, &mut rng);
        observe_latency(registry.get_mut(a).unwrap(), b, 3.0, &mut rng);

        assert_eq!(dump_latency_files(dir.path(), &registry, ids), 1);
        let path = dir.path().join("event-flat-walsender.c:10-walsender.c:20-1-2-im");
        let text = std::fs::read_to_string(path).unwrap();
        assert_eq!(text, "2.000000\n3.000000\n");
    }
}
