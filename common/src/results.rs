use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResults {
    /// Directory holding the final `output-*` files
    pub output_dir: String,
    /// Output file names inside output_dir, sorted
    pub files: Vec<String>,
}
