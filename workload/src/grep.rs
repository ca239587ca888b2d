//! Distributed grep: every line containing the pattern given as the
//! auxiliary argument, with the sorted list of files it appears in.
//!
//! The reduce output does not change when a file is reported more than
//! once, so duplicated map output is harmless.

use std::collections::BTreeSet;

use anyhow::{anyhow, Result};
use bytes::Bytes;

use common::utils::string_from_bytes;
use common::{KeyValue, MapOutput};

pub fn map(kv: KeyValue, aux: Bytes) -> MapOutput {
    let pattern = string_from_bytes(aux)?;
    if pattern.is_empty() {
        return Err(anyhow!("grep requires a pattern"));
    }

    let file = kv.key;
    let contents = string_from_bytes(kv.value)?;

    let matches = contents
        .lines()
        .filter(|line| line.contains(pattern.as_str()))
        .map(|line| Ok(KeyValue::new(line.to_owned(), file.clone())))
        .collect::<Vec<_>>();

    Ok(Box::new(matches.into_iter()))
}

pub fn reduce(
    _key: Bytes,
    values: Box<dyn Iterator<Item = Bytes> + '_>,
    _aux: Bytes,
) -> Result<Bytes> {
    let files = values
        .map(string_from_bytes)
        .collect::<Result<BTreeSet<_>>>()?;

    Ok(Bytes::from(files.into_iter().collect::<Vec<_>>().join(",")))
}
