//! On-disk tile layout and atomic file writes.
//!
//! ```text
//! <cache_root>/tiles/live/<z>/<x>/<y>.png
//! <cache_root>/tiles/trips/<trip_id>/<z>/<x>/<y>.png
//! ```

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::coord::TileCoord;
use crate::store::Partition;

const TILES_DIR: &str = "tiles";
const LIVE_DIR: &str = "live";
const TRIPS_DIR: &str = "trips";
const TILE_EXTENSION: &str = "png";
const TEMP_EXTENSION: &str = "tmp";

/// Directory holding every tile of a partition.
///
/// # Example
///
/// ```
/// use std::path::{Path, PathBuf};
/// use slippycache::cache::partition_directory;
/// use slippycache::store::Partition;
///
/// let root = Path::new("/cache");
/// assert_eq!(partition_directory(root, &Partition::Live), PathBuf::from("/cache/tiles/live"));
/// assert_eq!(
///     partition_directory(root, &Partition::trip("alps").unwrap()),
///     PathBuf::from("/cache/tiles/trips/alps")
/// );
/// ```
pub fn partition_directory(cache_root: &Path, partition: &Partition) -> PathBuf {
    let tiles = cache_root.join(TILES_DIR);
    match partition {
        Partition::Live => tiles.join(LIVE_DIR),
        Partition::Trip(id) => tiles.join(TRIPS_DIR).join(id),
    }
}

/// Final path of a cached tile image.
///
/// # Example
///
/// ```
/// use std::path::{Path, PathBuf};
/// use slippycache::cache::tile_path;
/// use slippycache::coord::TileCoord;
/// use slippycache::store::Partition;
///
/// let path = tile_path(Path::new("/cache"), &Partition::Live, &TileCoord::new(15, 16372, 10896));
/// assert_eq!(path, PathBuf::from("/cache/tiles/live/15/16372/10896.png"));
/// ```
pub fn tile_path(cache_root: &Path, partition: &Partition, tile: &TileCoord) -> PathBuf {
    partition_directory(cache_root, partition)
        .join(tile.zoom.to_string())
        .join(tile.x.to_string())
        .join(format!("{}.{}", tile.y, TILE_EXTENSION))
}

/// Temporary sibling used while writing `path`.
pub fn temp_path(path: &Path) -> PathBuf {
    path.with_extension(TEMP_EXTENSION)
}

/// Write `data` to `path` through a `.tmp` sibling and an atomic rename.
///
/// A file observed at `path` is always complete. On failure the temp
/// file is removed before the error is returned.
pub async fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let temp = temp_path(path);
    let result = async {
        tokio::fs::write(&temp, data).await?;
        tokio::fs::rename(&temp, path).await
    }
    .await;

    if let Err(e) = &result {
        warn!(path = %path.display(), error = %e, "Tile write failed");
        if let Err(cleanup) = tokio::fs::remove_file(&temp).await {
            if cleanup.kind() != io::ErrorKind::NotFound {
                debug!(path = %temp.display(), error = %cleanup, "Failed to remove temp file");
            }
        }
    }

    result
}

/// Remove a tile file, treating an already-missing file as success.
pub async fn remove_tile_file(path: &Path) -> io::Result<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Delete orphaned `.tmp` files left under `<cache_root>/tiles` by an
/// interrupted write. Returns the number of files removed.
pub async fn cleanup_temp_files(cache_root: &Path) -> io::Result<usize> {
    let root = cache_root.join(TILES_DIR);
    tokio::task::spawn_blocking(move || cleanup_temp_files_blocking(&root))
        .await
        .map_err(io::Error::other)?
}

fn cleanup_temp_files_blocking(root: &Path) -> io::Result<usize> {
    if !root.exists() {
        return Ok(0);
    }

    let mut removed = 0;
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(dir = %dir.display(), error = %e, "Skipping unreadable directory");
                continue;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let Ok(file_type) = entry.file_type() else {
                continue;
            };

            if file_type.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == TEMP_EXTENSION) {
                match std::fs::remove_file(&path) {
                    Ok(()) => removed += 1,
                    Err(e) => debug!(path = %path.display(), error = %e, "Failed to remove temp file"),
                }
            }
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_tile_path_live() {
        let path = tile_path(Path::new("/cache"), &Partition::Live, &TileCoord::new(3, 5, 2));
        assert_eq!(path, PathBuf::from("/cache/tiles/live/3/5/2.png"));
    }

    #[test]
    fn test_tile_path_trip() {
        let path = tile_path(
            Path::new("/cache"),
            &Partition::trip("iceland").unwrap(),
            &TileCoord::new(10, 511, 340),
        );
        assert_eq!(path, PathBuf::from("/cache/tiles/trips/iceland/10/511/340.png"));
    }

    #[test]
    fn test_temp_path_is_sibling() {
        let path = PathBuf::from("/cache/tiles/live/3/5/2.png");
        let temp = temp_path(&path);
        assert_eq!(temp, PathBuf::from("/cache/tiles/live/3/5/2.tmp"));
        assert_eq!(temp.parent(), path.parent());
    }

    #[tokio::test]
    async fn test_write_atomic_creates_file() {
        let temp = TempDir::new().unwrap();
        let path = tile_path(temp.path(), &Partition::Live, &TileCoord::new(1, 0, 1));

        write_atomic(&path, b"tile-bytes").await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"tile-bytes");
        assert!(!temp_path(&path).exists());
    }

    #[tokio::test]
    async fn test_write_atomic_failure_leaves_no_temp() {
        let temp = TempDir::new().unwrap();
        // Final path is an existing directory, so the rename fails
        let path = temp.path().join("tiles").join("blocked.png");
        std::fs::create_dir_all(path.join("child")).unwrap();

        assert!(write_atomic(&path, b"data").await.is_err());
        assert!(!temp_path(&path).exists());
    }

    #[tokio::test]
    async fn test_remove_tile_file_missing_is_ok() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nope.png");
        assert!(!remove_tile_file(&path).await.unwrap());

        std::fs::write(&path, b"x").unwrap();
        assert!(remove_tile_file(&path).await.unwrap());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_cleanup_temp_files() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("tiles").join("live").join("4").join("3");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("1.tmp"), b"partial").unwrap();
        std::fs::write(dir.join("2.png"), b"complete").unwrap();

        let removed = cleanup_temp_files(temp.path()).await.unwrap();

        assert_eq!(removed, 1);
        assert!(!dir.join("1.tmp").exists());
        assert!(dir.join("2.png").exists());
    }

    #[tokio::test]
    async fn test_cleanup_without_tiles_dir() {
        let temp = TempDir::new().unwrap();
        assert_eq!(cleanup_temp_files(temp.path()).await.unwrap(), 0);
    }
}
