//! Chunk sources on disk.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use chunkmesh_core::Chunk;

/// Chunk the file at `path` into `chunk_size` pieces.
pub fn chunk_file(path: &Path, chunk_size: usize) -> Result<Vec<Chunk>> {
    let file =
        File::open(path).with_context(|| format!("failed to open file: {}", path.display()))?;
    let chunks = chunkmesh_core::chunk(BufReader::new(file), chunk_size)
        .with_context(|| format!("failed to chunk file: {}", path.display()))?;

    tracing::info!(
        path = %path.display(),
        chunks = chunks.len(),
        bytes = chunks.iter().map(|c| c.size).sum::<u64>(),
        "file chunked"
    );
    Ok(chunks)
}

/// Load a topology snapshot (JSON) from disk.
pub fn load_topology(path: &Path) -> Result<chunkmesh_core::Topology> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read topology: {}", path.display()))?;
    chunkmesh_core::Topology::from_json(&text)
        .with_context(|| format!("invalid topology: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_file_splits_and_hashes() {
        let dir = std::env::temp_dir().join(format!("chunkmesh-src-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let file_path = dir.join("test.txt");
        std::fs::write(&file_path, b"hello world").unwrap();

        let chunks = chunk_file(&file_path, 4).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].size, 3);
        assert_eq!(chunks[0].content_hash, chunkmesh_core::ContentHash::of(b"hell"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = chunk_file(Path::new("/nonexistent/chunkmesh/file"), 16).unwrap_err();
        assert!(err.to_string().contains("failed to open file"));
    }

    #[test]
    fn load_topology_reads_snapshot() {
        let dir = std::env::temp_dir().join(format!("chunkmesh-topo-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("net.json");

        let mut t = chunkmesh_core::Topology::new();
        t.add_node(chunkmesh_core::Node::new("a", "A")).unwrap();
        t.add_node(chunkmesh_core::Node::new("b", "B")).unwrap();
        t.add_connection(chunkmesh_core::Connection::new("ab", "a", "b", 5.0, 10.0))
            .unwrap();
        std::fs::write(&path, t.to_json().unwrap()).unwrap();

        let loaded = load_topology(&path).unwrap();
        assert_eq!(loaded.connections(), t.connections());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
