//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::path::PathBuf;
use std::process;

use slippycache::app::AppError;
use slippycache::config::ConfigError;
use slippycache::coord::{CoordError, TileCoord};
use slippycache::store::PartitionError;
use slippycache::TileCacheError;

/// Exit code for a tile that could not be served (offline or download failed).
pub const EXIT_UNAVAILABLE: i32 = 2;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration file could not be loaded
    Config(ConfigError),
    /// Invalid coordinates or tile address on the command line
    Coordinates(CoordError),
    /// Invalid trip name on the command line
    Trip(PartitionError),
    /// Failed to start the tile cache
    Startup(AppError),
    /// Cache operation failed
    Cache(TileCacheError),
    /// Tile is neither cached nor downloadable right now
    Unavailable(TileCoord),
    /// Failed to write output file
    FileWrite { path: PathBuf, error: std::io::Error },
    /// Async runtime or signal handler setup failed
    Runtime(String),
    /// Failed to serialize output
    Output(serde_json::Error),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Unavailable(_) => EXIT_UNAVAILABLE,
            _ => 1,
        }
    }

    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Unavailable(_) => {
                eprintln!();
                eprintln!("The tile is not in the cache and could not be downloaded.");
                eprintln!("Check network access, or prefetch the area while online.");
            }
            CliError::Startup(AppError::CacheDirectory(_)) => {
                eprintln!();
                eprintln!("Make sure the cache directory is writable, or pick another");
                eprintln!("one with --cache-dir.");
            }
            _ => {}
        }

        process::exit(self.exit_code())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::Coordinates(e) => write!(f, "Invalid tile: {}", e),
            CliError::Trip(e) => write!(f, "Invalid trip: {}", e),
            CliError::Startup(e) => write!(f, "Failed to start tile cache: {}", e),
            CliError::Cache(e) => write!(f, "Cache error: {}", e),
            CliError::Unavailable(tile) => write!(f, "Tile {} is unavailable", tile),
            CliError::FileWrite { path, error } => {
                write!(f, "Failed to write file '{}': {}", path.display(), error)
            }
            CliError::Runtime(msg) => write!(f, "Runtime error: {}", msg),
            CliError::Output(e) => write!(f, "Failed to format output: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Coordinates(e) => Some(e),
            CliError::Trip(e) => Some(e),
            CliError::Startup(e) => Some(e),
            CliError::Cache(e) => Some(e),
            CliError::FileWrite { error, .. } => Some(error),
            CliError::Output(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<PartitionError> for CliError {
    fn from(e: PartitionError) -> Self {
        CliError::Trip(e)
    }
}

impl From<AppError> for CliError {
    fn from(e: AppError) -> Self {
        CliError::Startup(e)
    }
}

impl From<TileCacheError> for CliError {
    fn from(e: TileCacheError) -> Self {
        CliError::Cache(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_has_distinct_exit_code() {
        let err = CliError::Unavailable(TileCoord::new(15, 16372, 10896));
        assert_eq!(err.exit_code(), EXIT_UNAVAILABLE);
        assert_eq!(err.to_string(), "Tile 15/16372/10896 is unavailable");
    }

    #[test]
    fn test_other_errors_exit_with_one() {
        let err = CliError::Runtime("no runtime".to_string());
        assert_eq!(err.exit_code(), 1);
        assert!(std::error::Error::source(&err).is_none());
    }

    #[test]
    fn test_trip_error_names_the_trip() {
        let err = CliError::from(PartitionError::InvalidTripId("../live".to_string()));
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("../live"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_file_write_keeps_source() {
        let err = CliError::FileWrite {
            path: PathBuf::from("/readonly/tile.png"),
            error: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("/readonly/tile.png"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
