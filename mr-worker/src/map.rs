use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, ErrorKind};
use std::path::Path;

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use tempfile::{NamedTempFile, PersistError};
use tracing::{debug, info};

use common::codec::RecordWriter;
use common::layout::{Layout, SCRATCH_PREFIX};
use common::{partition, KeyValue, WorkerId, Workload};

type ScratchWriter = RecordWriter<BufWriter<NamedTempFile>>;

/// Run `workload`'s map function over `file` and commit one intermediate
/// file per partition under `worker`'s name.
pub fn perform_map(
    worker: &WorkerId,
    file: &str,
    n_reduce: u32,
    layout: &Layout,
    workload: Workload,
    aux: Bytes,
) -> Result<()> {
    if n_reduce == 0 {
        bail!("map task for `{}` has no reduce partitions", file);
    }

    let input_path = layout.input_path(file);
    let contents =
        fs::read(&input_path).with_context(|| format!("cannot read {}", input_path.display()))?;
    info!(file, bytes = contents.len(), "Starting map task");

    let records = (workload.map_fn)(KeyValue::new(file.to_owned(), contents), aux)?;

    let mut buckets = (0..n_reduce)
        .map(|_| create_scratch(layout))
        .collect::<Result<Vec<_>>>()?;

    for kv in records {
        let kv = kv?;
        let bucket = partition(&kv.key, n_reduce) as usize;
        buckets[bucket].write(&kv)?;
    }

    for (index, bucket) in buckets.into_iter().enumerate() {
        let written = bucket.written();
        let scratch = bucket
            .into_inner()?
            .into_inner()
            .map_err(|e| e.into_error())?;
        let target = layout.intermediate_path(index as u32, worker);
        commit(scratch, &target)?;
        debug!(partition = index, records = written, "Committed {}", target.display());
    }

    info!(file, "Done with map task");
    Ok(())
}

fn create_scratch(layout: &Layout) -> Result<ScratchWriter> {
    let file = tempfile::Builder::new()
        .prefix(SCRATCH_PREFIX)
        .tempfile_in(layout.root())
        .with_context(|| format!("cannot create scratch file in {}", layout.root().display()))?;

    Ok(RecordWriter::new(BufWriter::new(file)))
}

/// Move a fully written scratch file to `target`.
///
/// The rename never replaces an existing file. If `target` already exists the
/// scratch contents are appended to it instead, so committed records are
/// never lost.
pub fn commit(scratch: NamedTempFile, target: &Path) -> Result<()> {
    match scratch.persist_noclobber(target) {
        Ok(_) => Ok(()),
        Err(PersistError { error, file }) if error.kind() == ErrorKind::AlreadyExists => {
            let mut existing = OpenOptions::new()
                .append(true)
                .open(target)
                .with_context(|| format!("cannot open {} for append", target.display()))?;
            let mut contents = file.reopen()?;
            io::copy(&mut contents, &mut existing)
                .with_context(|| format!("cannot append to {}", target.display()))?;
            Ok(())
        }
        Err(e) => Err(e.error).with_context(|| format!("cannot commit {}", target.display())),
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::io::{BufReader, Write};

    use common::codec::decode_all;

    use super::*;

    fn wc() -> Workload {
        workload::try_named("wc").unwrap()
    }

    fn read_partition(layout: &Layout, partition: u32) -> Vec<KeyValue> {
        let mut records = Vec::new();
        for path in layout.intermediate_files(partition).unwrap() {
            records.extend(decode_all(BufReader::new(File::open(path).unwrap())).unwrap());
        }
        records
    }

    #[test]
    fn records_are_routed_by_partition() {
        let dir = tempfile::TempDir::new().unwrap();
        let layout = Layout::new(dir.path());
        fs::write(dir.path().join("in.txt"), "a b a c").unwrap();
        let worker = WorkerId::from("w1");

        perform_map(&worker, "in.txt", 3, &layout, wc(), Bytes::new()).unwrap();

        let mut total = 0;
        for p in 0..3 {
            assert!(layout.intermediate_path(p, &worker).is_file());
            for kv in read_partition(&layout, p) {
                assert_eq!(partition(&kv.key, 3), p);
                total += 1;
            }
        }
        assert_eq!(total, 4);
    }

    #[test]
    fn scratch_files_do_not_survive_commit() {
        let dir = tempfile::TempDir::new().unwrap();
        let layout = Layout::new(dir.path());
        fs::write(dir.path().join("in.txt"), "x y").unwrap();

        perform_map(&WorkerId::from("w1"), "in.txt", 2, &layout, wc(), Bytes::new()).unwrap();

        let leftovers = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(SCRATCH_PREFIX))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn second_map_by_same_worker_appends() {
        let dir = tempfile::TempDir::new().unwrap();
        let layout = Layout::new(dir.path());
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::write(dir.path().join("b.txt"), "a").unwrap();
        let worker = WorkerId::from("w1");

        perform_map(&worker, "a.txt", 1, &layout, wc(), Bytes::new()).unwrap();
        perform_map(&worker, "b.txt", 1, &layout, wc(), Bytes::new()).unwrap();

        assert_eq!(layout.intermediate_files(0).unwrap().len(), 1);
        assert_eq!(
            read_partition(&layout, 0),
            vec![KeyValue::new("a", "1"), KeyValue::new("a", "1")]
        );
    }

    #[test]
    fn commit_appends_to_existing_target() {
        let dir = tempfile::TempDir::new().unwrap();
        let target = dir.path().join("mr-0-w1");
        fs::write(&target, "first\n").unwrap();

        let mut scratch = NamedTempFile::new_in(dir.path()).unwrap();
        scratch.write_all(b"second\n").unwrap();
        commit(scratch, &target).unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn missing_input_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let layout = Layout::new(dir.path());

        let err = perform_map(&WorkerId::from("w1"), "nope.txt", 1, &layout, wc(), Bytes::new())
            .unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }
}
