use anyhow::{Context, Result};
use glob::glob;

fn is_pattern(arg: &str) -> bool {
    arg.contains(['*', '?', '['])
}

/// Turns command line arguments into the ordered list of map inputs.
///
/// Arguments with glob metacharacters are expanded (matches sorted, only
/// regular files kept); plain paths are kept verbatim, even if they do not
/// exist yet, so a bad path surfaces as a worker read failure.
pub fn expand_inputs(args: &[String]) -> Result<Vec<String>> {
    let mut out = Vec::new();

    for arg in args {
        if !is_pattern(arg) {
            out.push(arg.clone());
            continue;
        }

        let mut matched: Vec<String> = glob(arg)
            .with_context(|| format!("invalid input pattern '{}'", arg))?
            .filter_map(|entry| entry.ok())
            .filter(|path| path.is_file())
            .map(|path| path.to_string_lossy().to_string())
            .collect();
        matched.sort();
        out.extend(matched);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn plain_paths_are_kept_in_order() {
        let args = vec!["b.txt".to_string(), "a.txt".to_string()];
        assert_eq!(expand_inputs(&args).unwrap(), args);
    }

    #[test]
    fn patterns_expand_to_sorted_files_only() {
        let tmp = TempDir::new().unwrap();
        for name in ["pg-2.txt", "pg-1.txt", "other.md"] {
            fs::write(tmp.path().join(name), "x").unwrap();
        }
        fs::create_dir(tmp.path().join("pg-dir.txt")).unwrap();

        let pattern = tmp.path().join("pg-*.txt").to_string_lossy().to_string();
        let got = expand_inputs(&[pattern]).unwrap();

        let names: Vec<String> = got
            .iter()
            .map(|p| {
                std::path::Path::new(p)
                    .file_name()
                    .unwrap()
                    .to_string_lossy()
                    .to_string()
            })
            .collect();
        assert_eq!(names, vec!["pg-1.txt", "pg-2.txt"]);
    }

    #[test]
    fn broken_pattern_is_an_error() {
        assert!(expand_inputs(&["data/[".to_string()]).is_err());
    }
}
