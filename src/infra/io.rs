use std::path::Path;

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::error::InfraError;

const STDIN_MARKER: &str = "-";

/// Read an input file, or standard input when the path is `-`.
pub async fn read_input(path: &Path) -> Result<String, InfraError> {
    if path.as_os_str() == STDIN_MARKER {
        let mut buffer = String::new();
        tokio::io::stdin().read_to_string(&mut buffer).await?;
        return Ok(buffer);
    }

    Ok(tokio::fs::read_to_string(path).await?)
}

/// Write command output to standard output, newline-terminated.
pub async fn write_output(output: &str) -> Result<(), InfraError> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(output.as_bytes()).await?;
    if !output.ends_with('\n') {
        stdout.write_all(b"\n").await?;
    }
    stdout.flush().await?;
    Ok(())
}
