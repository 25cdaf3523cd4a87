use anyhow::{Context, Result};
use common::{engine, App};
use std::{
    fs,
    path::{Path, PathBuf},
};

pub const SEQUENTIAL_OUTPUT: &str = "output-sequential";

/// Runs `app` over every input in this process, no coordinator involved, and
/// writes one sorted `output-sequential` file into `work_dir`.
pub fn run_sequential(app: App, work_dir: &Path, inputs: &[String]) -> Result<PathBuf> {
    let (mapf, reducef) = app.callbacks();

    let mut intermediate = Vec::new();
    for input in inputs {
        let contents = engine::read_input(Path::new(input))?;
        intermediate.extend(mapf(input, &contents));
    }

    let results = engine::reduce_sorted(intermediate, reducef);
    let path = engine::write_output(work_dir, SEQUENTIAL_OUTPUT, &results)?;
    Ok(path)
}

/// Every line of every listed output file, sorted.
pub fn merge_outputs(dir: &Path, files: &[String]) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    for name in files {
        let path = dir.join(name);
        let content = fs::read_to_string(&path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        lines.extend(content.lines().map(str::to_string));
    }
    lines.sort();
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn inputs(dir: &TempDir) -> Vec<String> {
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        fs::write(&a, "x y x").unwrap();
        fs::write(&b, "y z").unwrap();
        vec![a.display().to_string(), b.display().to_string()]
    }

    #[test]
    fn sequential_word_count_matches_expected_totals() {
        let dir = TempDir::new().unwrap();
        let files = inputs(&dir);

        let path = run_sequential(App::WordCount, dir.path(), &files).unwrap();
        assert_eq!(path, dir.path().join(SEQUENTIAL_OUTPUT));
        assert_eq!(fs::read_to_string(path).unwrap(), "x 2\ny 2\nz 1\n");
    }

    #[test]
    fn sequential_indexer_lists_documents_per_word() {
        let dir = TempDir::new().unwrap();
        let files = inputs(&dir);

        let path = run_sequential(App::Indexer, dir.path(), &files).unwrap();
        let content = fs::read_to_string(path).unwrap();
        let y = content.lines().find(|l| l.starts_with("y ")).unwrap();
        assert_eq!(y, format!("y 2 {},{}", files[0], files[1]));
    }

    #[test]
    fn sequential_fails_on_missing_input() {
        let dir = TempDir::new().unwrap();
        let missing = vec![dir.path().join("nope.txt").display().to_string()];

        assert!(run_sequential(App::WordCount, dir.path(), &missing).is_err());
        assert!(!dir.path().join(SEQUENTIAL_OUTPUT).exists());
    }

    #[test]
    fn merge_sorts_lines_across_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("output-0"), "y 2\n").unwrap();
        fs::write(dir.path().join("output-1"), "x 2\nz 1\n").unwrap();

        let merged =
            merge_outputs(dir.path(), &["output-0".into(), "output-1".into()]).unwrap();
        assert_eq!(merged, vec!["x 2", "y 2", "z 1"]);
    }
}
