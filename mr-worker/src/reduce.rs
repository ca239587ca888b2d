use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use bytes::Bytes;
use tracing::{debug, info};

use common::codec::RecordReader;
use common::layout::Layout;
use common::{KeyValue, Workload};

/// Gather every intermediate record of `partition`, group by key, and write
/// one `<key> <result>` line per distinct key to the partition's output file.
pub fn perform_reduce(
    partition: u32,
    layout: &Layout,
    workload: Workload,
    aux: Bytes,
) -> Result<PathBuf> {
    info!(partition, "Starting reduce task");

    let mut records = read_partition(partition, layout)?;

    // Stable, so equal keys keep their relative order.
    records.sort_by(|a, b| a.key.cmp(&b.key));

    let out_path = layout.output_path(partition);
    let mut out = BufWriter::new(
        File::create(&out_path).with_context(|| format!("cannot create {}", out_path.display()))?,
    );

    let reduce_fn = workload.reduce_fn;
    let mut keys = 0;
    let mut start = 0;
    while start < records.len() {
        let key = records[start].key();
        let end = start
            + records[start..]
                .iter()
                .take_while(|kv| kv.key == key)
                .count();

        let values = records[start..end].iter().map(KeyValue::value);
        let result = reduce_fn(key.clone(), Box::new(values), aux.clone())?;

        writeln!(
            out,
            "{} {}",
            String::from_utf8_lossy(&key),
            String::from_utf8_lossy(&result)
        )?;

        keys += 1;
        start = end;
    }
    out.flush()?;

    info!(partition, keys, "Done with reduce task");
    Ok(out_path)
}

fn read_partition(partition: u32, layout: &Layout) -> Result<Vec<KeyValue>> {
    let mut records = Vec::new();

    for path in layout.intermediate_files(partition)? {
        debug!("Reading {}", path.display());
        let file = File::open(&path).with_context(|| format!("cannot open {}", path.display()))?;
        for kv in RecordReader::new(BufReader::new(file)) {
            records.push(kv.with_context(|| format!("cannot decode {}", path.display()))?);
        }
    }

    Ok(records)
}
