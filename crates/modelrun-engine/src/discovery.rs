//! Model file discovery

use modelrun_core::Config;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// All `.sql` files under `dir`, recursively, sorted by path
///
/// A missing directory yields no files.
pub fn discover_models(dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        tracing::warn!("Models directory {} does not exist", dir.display());
        return Vec::new();
    }

    let mut sql_files = Vec::new();

    for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
        if entry.file_type().is_file() {
            if let Some(ext) = entry.path().extension() {
                if ext == "sql" {
                    sql_files.push(entry.path().to_path_buf());
                }
            }
        }
    }

    sql_files.sort();
    sql_files
}

/// Definition files named by a config, in run order
///
/// Explicit `models` entries come first, followed by files discovered in
/// `models_dir` that were not already listed.
pub fn model_paths(config: &Config) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = config.models.iter().map(|p| config.resolve(p)).collect();

    if let Some(dir) = &config.models_dir {
        for path in discover_models(&config.resolve(dir)) {
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    }

    paths
}
