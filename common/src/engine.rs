use fnv::FnvHasher;
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    hash::Hasher,
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{debug, warn};

/// One record emitted by a map callback.
///
/// Field names are capitalised on disk (`{"Key":..,"Value":..}`) so shards
/// stay readable by other implementations of the same file convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Map callback: `(input name, input contents) -> records`.
pub type MapFn = fn(&str, &str) -> Vec<KeyValue>;

/// Reduce callback: `(key, every value for key) -> result`.
pub type ReduceFn = fn(&str, &[String]) -> String;

/// What a reduce task does when a `partition-<m>-<r>` file is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingShards {
    /// Log and treat the shard as empty.
    #[default]
    Skip,
    /// Fail the reduce task.
    Fail,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("cannot read input {}: {source}", path.display())]
    Input { path: PathBuf, source: io::Error },

    #[error("cannot write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("cannot read shard {}: {source}", path.display())]
    Shard { path: PathBuf, source: io::Error },

    #[error("malformed record in {} at line {line}: {source}", path.display())]
    Decode {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },

    #[error("missing intermediate shard {}", path.display())]
    MissingShard { path: PathBuf },
}

pub type Result<T> = std::result::Result<T, EngineError>;

/* =========================
   File naming
   ========================= */

pub fn partition_name(map_id: usize, reduce_id: usize) -> String {
    format!("partition-{}-{}", map_id, reduce_id)
}

pub fn output_name(reduce_id: usize) -> String {
    format!("output-{}", reduce_id)
}

/// Reduce id of a name produced by [`output_name`].
pub fn output_reduce_id(name: &str) -> Option<usize> {
    let rest = name.strip_prefix("output-")?;
    if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    rest.parse().ok()
}

/// True for names produced by [`output_name`].
pub fn is_output_name(name: &str) -> bool {
    output_reduce_id(name).is_some()
}

/* =========================
   Hashing / partitioning
   ========================= */

/// FNV-1a (64-bit) of `key`, truncated to 31 bits.
///
/// Every worker process must agree on the bucket of a key, so this cannot
/// depend on the std hasher, whose output may change between releases.
pub fn ihash(key: &str) -> u32 {
    let mut hasher = FnvHasher::default();
    hasher.write(key.as_bytes());
    (hasher.finish() & 0x7fff_ffff) as u32
}

pub fn bucket_for(key: &str, n_reduce: usize) -> usize {
    ihash(key) as usize % n_reduce
}

/// Splits map output into `n_reduce` buckets, keeping emission order inside
/// each bucket.
pub fn partition(pairs: Vec<KeyValue>, n_reduce: usize) -> Vec<Vec<KeyValue>> {
    let mut buckets: Vec<Vec<KeyValue>> = (0..n_reduce).map(|_| Vec::new()).collect();
    for kv in pairs {
        let b = bucket_for(&kv.key, n_reduce);
        buckets[b].push(kv);
    }
    buckets
}

/* =========================
   Atomic writes
   ========================= */

/// Writes `dir/name` through a temp file in `dir` that is renamed into place
/// only after it has been flushed and synced. Readers see either no file or
/// the complete file.
pub fn write_atomically<F>(dir: &Path, name: &str, fill: F) -> Result<PathBuf>
where
    F: FnOnce(&mut dyn Write) -> io::Result<()>,
{
    let final_path = dir.join(name);
    let wrap = |source: io::Error| EngineError::Write {
        path: final_path.clone(),
        source,
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(&format!(".{}-", name))
        .tempfile_in(dir)
        .map_err(wrap)?;

    {
        let mut writer = BufWriter::new(&mut tmp);
        fill(&mut writer).map_err(wrap)?;
        writer.flush().map_err(wrap)?;
    }
    tmp.as_file().sync_all().map_err(wrap)?;
    tmp.persist(&final_path).map_err(|e| wrap(e.error))?;

    Ok(final_path)
}

/* =========================
   Shards
   ========================= */

/// Writes one shard as JSON lines.
pub fn write_partition(
    dir: &Path,
    map_id: usize,
    reduce_id: usize,
    pairs: &[KeyValue],
) -> Result<PathBuf> {
    write_atomically(dir, &partition_name(map_id, reduce_id), |w| {
        for kv in pairs {
            serde_json::to_writer(&mut *w, kv)?;
            w.write_all(b"\n")?;
        }
        Ok(())
    })
}

/// Reads every record of a shard. Blank lines are ignored, anything else that
/// does not decode is an error.
pub fn read_partition(path: &Path) -> Result<Vec<KeyValue>> {
    let file = File::open(path).map_err(|source| EngineError::Shard {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| EngineError::Shard {
            path: path.to_path_buf(),
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let kv: KeyValue = serde_json::from_str(&line).map_err(|source| EngineError::Decode {
            path: path.to_path_buf(),
            line: idx + 1,
            source,
        })?;
        out.push(kv);
    }
    Ok(out)
}

/// Concatenates shards `partition-<m>-<reduce_id>` for every `m < n_map`.
pub fn gather_partitions(
    dir: &Path,
    reduce_id: usize,
    n_map: usize,
    missing: MissingShards,
) -> Result<Vec<KeyValue>> {
    let mut all = Vec::new();
    for map_id in 0..n_map {
        let path = dir.join(partition_name(map_id, reduce_id));
        match read_partition(&path) {
            Ok(mut kvs) => all.append(&mut kvs),
            Err(EngineError::Shard { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                match missing {
                    MissingShards::Skip => {
                        warn!(shard = %path.display(), "intermediate shard not found, skipping");
                    }
                    MissingShards::Fail => return Err(EngineError::MissingShard { path }),
                }
            }
            Err(e) => return Err(e),
        }
    }
    Ok(all)
}

/* =========================
   Reduce
   ========================= */

/// Sorts by key and calls `reducef` once per distinct key, in ascending key
/// order. Values keep their relative order within a key.
pub fn reduce_sorted(mut pairs: Vec<KeyValue>, reducef: ReduceFn) -> Vec<KeyValue> {
    pairs.sort_by(|a, b| a.key.cmp(&b.key));

    let mut out = Vec::new();
    let mut iter = pairs.into_iter().peekable();
    while let Some(first) = iter.next() {
        let key = first.key;
        let mut values = vec![first.value];
        while let Some(next) = iter.next_if(|kv| kv.key == key) {
            values.push(next.value);
        }
        let result = reducef(&key, &values);
        out.push(KeyValue::new(key, result));
    }
    out
}

/// Writes `<key> <value>` lines.
pub fn write_output(dir: &Path, name: &str, results: &[KeyValue]) -> Result<PathBuf> {
    write_atomically(dir, name, |w| {
        for kv in results {
            writeln!(w, "{} {}", kv.key, kv.value)?;
        }
        Ok(())
    })
}

/* =========================
   Task execution
   ========================= */

/// Reads a whole input file. Bytes that are not valid UTF-8 are replaced
/// with U+FFFD; only I/O failures are errors.
pub fn read_input(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|source| EngineError::Input {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Runs one map task: read input, call `mapf`, write all `n_reduce` shards
/// (empty buckets included) into `dir`.
pub fn execute_map(
    dir: &Path,
    map_id: usize,
    input: &str,
    n_reduce: usize,
    mapf: MapFn,
) -> Result<Vec<PathBuf>> {
    let contents = read_input(Path::new(input))?;
    let pairs = mapf(input, &contents);
    debug!(map_id, records = pairs.len(), "map callback finished");

    let mut written = Vec::with_capacity(n_reduce);
    for (reduce_id, bucket) in partition(pairs, n_reduce).iter().enumerate() {
        written.push(write_partition(dir, map_id, reduce_id, bucket)?);
    }
    Ok(written)
}

/// Runs one reduce task over every shard addressed to `reduce_id` and writes
/// `output-<reduce_id>` into `dir`.
pub fn execute_reduce(
    dir: &Path,
    reduce_id: usize,
    n_map: usize,
    reducef: ReduceFn,
    missing: MissingShards,
) -> Result<PathBuf> {
    let pairs = gather_partitions(dir, reduce_id, n_map, missing)?;
    let results = reduce_sorted(pairs, reducef);
    debug!(reduce_id, keys = results.len(), "reduce callback finished");
    write_output(dir, &output_name(reduce_id), &results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn count(_key: &str, values: &[String]) -> String {
        values.len().to_string()
    }

    fn join(_key: &str, values: &[String]) -> String {
        values.join(",")
    }

    fn words(_name: &str, contents: &str) -> Vec<KeyValue> {
        contents
            .split_whitespace()
            .map(|w| KeyValue::new(w, "1"))
            .collect()
    }

    #[test]
    fn file_names_follow_the_shared_convention() {
        assert_eq!(partition_name(0, 1), "partition-0-1");
        assert_eq!(partition_name(12, 3), "partition-12-3");
        assert_eq!(output_name(7), "output-7");

        assert!(is_output_name("output-0"));
        assert!(is_output_name("output-42"));
        assert!(!is_output_name("output-"));
        assert!(!is_output_name("output-sequential"));
        assert!(!is_output_name("partition-0-0"));
        assert!(!is_output_name("output-+1"));

        assert_eq!(output_reduce_id("output-12"), Some(12));
        assert_eq!(output_reduce_id("output-sequential"), None);
    }

    #[test]
    fn ihash_is_fnv1a_truncated_to_31_bits() {
        // FNV-1a 64 of "" is the offset basis, of "a" is 0xaf63dc4c8601ec8c.
        assert_eq!(ihash(""), 0x0422_2325);
        assert_eq!(ihash("a"), 0x0601_ec8c);
        assert!(ihash("some longer key") <= 0x7fff_ffff);
    }

    #[test]
    fn bucket_for_spreads_sample_keys() {
        assert_eq!(bucket_for("x", 2), 1);
        assert_eq!(bucket_for("y", 2), 0);
        assert_eq!(bucket_for("z", 2), 1);
    }

    #[test]
    fn partition_keeps_every_record_in_its_bucket_and_order() {
        let pairs = vec![
            KeyValue::new("x", "1"),
            KeyValue::new("y", "2"),
            KeyValue::new("x", "3"),
            KeyValue::new("z", "4"),
        ];
        let buckets = partition(pairs, 3);
        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets.iter().map(Vec::len).sum::<usize>(), 4);

        for (idx, bucket) in buckets.iter().enumerate() {
            for kv in bucket {
                assert_eq!(bucket_for(&kv.key, 3), idx);
            }
        }

        let x_bucket = &buckets[bucket_for("x", 3)];
        let xs: Vec<&str> = x_bucket
            .iter()
            .filter(|kv| kv.key == "x")
            .map(|kv| kv.value.as_str())
            .collect();
        assert_eq!(xs, vec!["1", "3"]);
    }

    #[test]
    fn shards_are_json_lines_with_capitalised_fields() {
        let tmp = TempDir::new().unwrap();
        let path = write_partition(
            tmp.path(),
            2,
            0,
            &[KeyValue::new("hello", "1"), KeyValue::new("world", "1")],
        )
        .unwrap();

        assert_eq!(path, tmp.path().join("partition-2-0"));
        let raw = fs::read_to_string(&path).unwrap();
        assert_eq!(
            raw,
            "{\"Key\":\"hello\",\"Value\":\"1\"}\n{\"Key\":\"world\",\"Value\":\"1\"}\n"
        );

        let back = read_partition(&path).unwrap();
        assert_eq!(back[1], KeyValue::new("world", "1"));
    }

    #[test]
    fn atomic_write_leaves_no_temp_files_behind() {
        let tmp = TempDir::new().unwrap();
        write_partition(tmp.path(), 0, 0, &[KeyValue::new("a", "1")]).unwrap();
        // Overwriting an existing shard (a re-executed task) is fine.
        write_partition(tmp.path(), 0, 0, &[KeyValue::new("b", "1")]).unwrap();

        let names: Vec<String> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["partition-0-0".to_string()]);
        assert_eq!(
            read_partition(&tmp.path().join("partition-0-0")).unwrap(),
            vec![KeyValue::new("b", "1")]
        );
    }

    #[test]
    fn failed_fill_does_not_publish_the_file() {
        let tmp = TempDir::new().unwrap();
        let res = write_atomically(tmp.path(), "output-0", |w| {
            w.write_all(b"partial")?;
            Err(io::Error::new(io::ErrorKind::Other, "boom"))
        });

        assert!(matches!(res, Err(EngineError::Write { .. })));
        assert!(!tmp.path().join("output-0").exists());
    }

    #[test]
    fn malformed_shard_reports_path_and_line() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("partition-0-0");
        fs::write(&path, "{\"Key\":\"a\",\"Value\":\"1\"}\n\nnot json\n").unwrap();

        match read_partition(&path) {
            Err(EngineError::Decode { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected decode error, got {:?}", other),
        }
    }

    #[test]
    fn missing_shards_are_skipped_by_default() {
        let tmp = TempDir::new().unwrap();
        write_partition(tmp.path(), 1, 0, &[KeyValue::new("k", "v")]).unwrap();

        let got = gather_partitions(tmp.path(), 0, 3, MissingShards::Skip).unwrap();
        assert_eq!(got, vec![KeyValue::new("k", "v")]);
    }

    #[test]
    fn missing_shards_fail_under_strict_policy() {
        let tmp = TempDir::new().unwrap();
        write_partition(tmp.path(), 0, 0, &[]).unwrap();

        let res = gather_partitions(tmp.path(), 0, 2, MissingShards::Fail);
        match res {
            Err(EngineError::MissingShard { path }) => {
                assert_eq!(path, tmp.path().join("partition-1-0"))
            }
            other => panic!("expected missing shard, got {:?}", other),
        }
    }

    #[test]
    fn reduce_sorted_groups_equal_keys_in_ascending_order() {
        let pairs = vec![
            KeyValue::new("b", "1"),
            KeyValue::new("a", "x"),
            KeyValue::new("b", "2"),
            KeyValue::new("a", "y"),
            KeyValue::new("B", "z"),
        ];
        let out = reduce_sorted(pairs, join);
        assert_eq!(
            out,
            vec![
                KeyValue::new("B", "z"),
                KeyValue::new("a", "x,y"),
                KeyValue::new("b", "1,2"),
            ]
        );
    }

    #[test]
    fn reduce_of_nothing_writes_an_empty_output() {
        let tmp = TempDir::new().unwrap();
        let path = execute_reduce(tmp.path(), 0, 0, count, MissingShards::Fail).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "");
    }

    #[test]
    fn map_then_reduce_counts_words() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("in.txt");
        fs::write(&input, "x y x\nz").unwrap();
        let input = input.to_string_lossy().to_string();

        let shards = execute_map(tmp.path(), 0, &input, 2, words).unwrap();
        assert_eq!(shards.len(), 2);
        assert!(shards.iter().all(|p| p.exists()));

        let mut lines = Vec::new();
        for r in 0..2 {
            let out = execute_reduce(tmp.path(), r, 1, count, MissingShards::Fail).unwrap();
            let content = fs::read_to_string(out).unwrap();
            let file_lines: Vec<String> = content.lines().map(str::to_string).collect();
            let mut sorted = file_lines.clone();
            sorted.sort();
            assert_eq!(file_lines, sorted);
            lines.extend(file_lines);
        }
        lines.sort();
        assert_eq!(lines, vec!["x 2", "y 1", "z 1"]);
    }

    #[test]
    fn map_fails_when_input_is_missing() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope.txt");

        let res = execute_map(tmp.path(), 0, &missing.to_string_lossy(), 2, words);
        assert!(matches!(res, Err(EngineError::Input { .. })));
        assert!(!tmp.path().join("partition-0-0").exists());
    }

    #[test]
    fn map_accepts_input_that_is_not_utf8() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("latin1.txt");
        fs::write(&input, b"caf\xe9 x").unwrap();

        let written = execute_map(tmp.path(), 0, &input.to_string_lossy(), 2, words).unwrap();

        let mut keys: Vec<String> = written
            .iter()
            .flat_map(|p| read_partition(p).unwrap())
            .map(|kv| kv.key)
            .collect();
        keys.sort();
        assert_eq!(keys, vec!["caf\u{fffd}".to_string(), "x".to_string()]);
    }
}
