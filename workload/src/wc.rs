//! Word count: the number of occurrences of each word across all inputs.

use anyhow::Result;
use bytes::Bytes;

use common::utils::string_from_bytes;
use common::{KeyValue, MapOutput};

pub fn map(kv: KeyValue, _aux: Bytes) -> MapOutput {
    let contents = string_from_bytes(kv.value)?;

    let words = contents
        .split(|c: char| !c.is_alphabetic())
        .filter(|word| !word.is_empty())
        .map(|word| Ok(KeyValue::new(word.to_owned(), "1")))
        .collect::<Vec<_>>();

    Ok(Box::new(words.into_iter()))
}

pub fn reduce(
    _key: Bytes,
    values: Box<dyn Iterator<Item = Bytes> + '_>,
    _aux: Bytes,
) -> Result<Bytes> {
    let mut count = 0u64;

    for value in values {
        count += string_from_bytes(value)?.parse::<u64>()?;
    }

    Ok(Bytes::from(count.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_splits_on_non_letters() {
        let kv = KeyValue::new("in.txt", "a b, a\nthe-end 42");
        let words = map(kv, Bytes::new())
            .unwrap()
            .map(|kv| String::from_utf8(kv.unwrap().key.to_vec()).unwrap())
            .collect::<Vec<_>>();

        assert_eq!(words, ["a", "b", "a", "the", "end"]);
    }

    #[test]
    fn reduce_sums_counts() {
        let values = vec![Bytes::from("1"), Bytes::from("1"), Bytes::from("3")];
        let out = reduce(Bytes::from("a"), Box::new(values.into_iter()), Bytes::new()).unwrap();

        assert_eq!(out, Bytes::from("5"));
    }

    #[test]
    fn reduce_rejects_non_numeric_values() {
        let values = vec![Bytes::from("x")];
        assert!(reduce(Bytes::from("a"), Box::new(values.into_iter()), Bytes::new()).is_err());
    }
}
