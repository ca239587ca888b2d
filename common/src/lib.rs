//! Users can specify map and reduce functions, and then distribute
//! those tasks to workers polling a single coordinator. Data is exchanged
//! through a shared filesystem namespace following the naming convention
//! in [`layout`].

use std::fmt;
use std::fmt::Formatter;
use std::hash::Hasher;
use std::str::FromStr;

use anyhow::anyhow;
use bytes::Bytes;
use rand::distributions::Alphanumeric;
use rand::Rng;

pub mod codec;
pub mod layout;
pub mod rpc;
pub mod utils;

/////////////////////////////////////////////////////////////////////////////
// MapReduce application types
/////////////////////////////////////////////////////////////////////////////

/// The output of an application map function.
///
/// There are 2 layers of [`anyhow::Result`]s here. The outer layer
/// accounts for errors that arise while creating the iterator.
/// The inner layer accounts for errors that occur during iteration.
///
/// This accomodates both batch (all keys emitted at once) and lazy
/// (keys only emitted when the iterator is consumed) map operations.
pub type MapOutput = anyhow::Result<Box<dyn Iterator<Item = anyhow::Result<KeyValue>>>>;

/// A map function takes a key-value pair and auxiliary arguments.
///
/// The key is the input file name and the value is its full contents.
/// It returns an iterator that yields new key-value pairs.
pub type MapFn = fn(kv: KeyValue, aux: Bytes) -> MapOutput;

/// A reduce function takes in a key, an iterator over values for that key,
/// and an auxiliary argument. It returns an [`anyhow::Result`]
/// containing a single output value.
pub type ReduceFn = fn(
    key: Bytes,
    values: Box<dyn Iterator<Item = Bytes> + '_>,
    aux: Bytes,
) -> anyhow::Result<Bytes>;

/// A map reduce application.
#[derive(Copy, Clone)]
pub struct Workload {
    pub map_fn: MapFn,
    pub reduce_fn: ReduceFn,
}

/////////////////////////////////////////////////////////////////////////////
// Key-value pairs
/////////////////////////////////////////////////////////////////////////////

/// A single key-value pair.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct KeyValue {
    /// The key.
    pub key: Bytes,

    /// The value.
    pub value: Bytes,
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            String::from_utf8_lossy(&self.key),
            String::from_utf8_lossy(&self.value)
        )
    }
}

impl KeyValue {
    /// Construct a new key-value pair from the given key and value.
    pub fn new(key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Get the key of this key-value pair.
    ///
    /// This method is cheap, since [`Bytes`] are cheaply cloneable.
    #[inline]
    pub fn key(&self) -> Bytes {
        self.key.clone()
    }

    /// Get the value of this key-value pair.
    ///
    /// This method is cheap, since [`Bytes`] are cheaply cloneable.
    #[inline]
    pub fn value(&self) -> Bytes {
        self.value.clone()
    }

    /// Consumes the key-value pair and returns the key.
    #[inline]
    pub fn into_key(self) -> Bytes {
        self.key
    }

    /// Consumes the key-value pair and returns the value.
    #[inline]
    pub fn into_value(self) -> Bytes {
        self.value
    }
}

/////////////////////////////////////////////////////////////////////////////
// Partitioning
/////////////////////////////////////////////////////////////////////////////

/// Hashes an intermediate key with FNV-1a, keeping the low 31 bits.
pub fn ihash(key: &[u8]) -> u32 {
    let mut hasher = fnv::FnvHasher::default();
    hasher.write(key);
    (hasher.finish() & 0x7fff_ffff) as u32
}

/// Compute the reduce partition of a key by calculating `ihash(key) % n_reduce`.
///
/// `n_reduce` must be non-zero.
#[inline]
pub fn partition(key: &[u8], n_reduce: u32) -> u32 {
    ihash(key) % n_reduce
}

/////////////////////////////////////////////////////////////////////////////
// Workers and tasks
/////////////////////////////////////////////////////////////////////////////

const WORKER_ID_LEN: usize = 20;

/// Identity of a worker process.
///
/// Generated once when the worker starts and sent with every call. The
/// coordinator trusts it as-is.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct WorkerId(String);

impl WorkerId {
    /// Generate a random alphanumeric identity.
    ///
    /// Alphanumeric characters only, so the id can be embedded in
    /// intermediate file names without clashing with the `-` separator.
    pub fn generate() -> Self {
        let id = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(WORKER_ID_LEN)
            .map(char::from)
            .collect();
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for WorkerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for WorkerId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The phase a task belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkType {
    Map,
    Reduce,
}

impl WorkType {
    /// Wire representation used in [`rpc::AssignmentReply::work_type`].
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkType::Map => "map",
            WorkType::Reduce => "reduce",
        }
    }
}

impl FromStr for WorkType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "map" => Ok(WorkType::Map),
            "reduce" => Ok(WorkType::Reduce),
            other => Err(anyhow!("unknown work type `{}`", other)),
        }
    }
}

impl fmt::Display for WorkType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
