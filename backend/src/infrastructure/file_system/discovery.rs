/// File discovery utilities for finding transcript batch files
use std::path::{Path, PathBuf};
use tokio::fs;

/// Discover all .json files in a directory recursively, sorted by path
pub async fn discover_transcript_files(dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut files = collect_json_files(dir.to_path_buf()).await?;
    files.sort();
    Ok(files)
}

fn collect_json_files(
    dir: PathBuf,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<PathBuf>, std::io::Error>> + Send>> {
    Box::pin(async move {
        let mut files = Vec::new();
        let mut entries = fs::read_dir(&dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let file_type = entry.file_type().await?;

            if file_type.is_file() {
                if path.extension().is_some_and(|ext| ext == "json") {
                    files.push(path);
                }
            } else if file_type.is_dir() {
                // Skip hidden directories
                if let Some(dir_name) = path.file_name().and_then(|n| n.to_str()) {
                    if !dir_name.starts_with('.') {
                        let mut sub_files = collect_json_files(path).await?;
                        files.append(&mut sub_files);
                    }
                }
            }
        }

        Ok(files)
    })
}
