use std::io::Read;
use std::path::{Path, PathBuf};

use snafu::prelude::*;
use tracing::debug;

use super::best_effort_path_ext::{BestEffortPathExt, STDIN_PLACEHOLDER};

/// Reads a whole input file, or stdin when the path is `-`.
pub fn read_file_or_stdin(path: &Path) -> Result<String, InputError> {
    debug!("Reading input from {}", path.best_effort_path_display());
    if path.as_os_str() == STDIN_PLACEHOLDER {
        return read_to_string(std::io::stdin().lock(), path);
    }
    let file = std::fs::File::open(path).context(ReadSnafu {
        path: path.to_path_buf(),
    })?;
    read_to_string(file, path)
}

fn read_to_string(mut reader: impl Read, path: &Path) -> Result<String, InputError> {
    let mut contents = String::new();
    reader.read_to_string(&mut contents).context(ReadSnafu {
        path: path.to_path_buf(),
    })?;
    debug!("Read {} bytes", contents.len());
    Ok(contents)
}

#[derive(Debug, Snafu)]
pub enum InputError {
    #[snafu(display("Failed to read input from {}", path.best_effort_path_display()))]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
}
