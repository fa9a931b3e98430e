use async_trait::async_trait;
use chrono::Local;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::sanitize_component;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Sample, ROW_HEADER};
use crate::domain::ports::Recorder;

const WRITE_PROBE: &str = ".welltemp-write-probe";

/// Append-only CSV log, one file per scan session.
#[derive(Debug, Clone)]
pub struct RowLog {
    path: PathBuf,
}

impl RowLog {
    /// Create `dir` if needed and check that files can be written in it.
    pub async fn prepare_directory(dir: &Path) -> DomainResult<()> {
        fs::create_dir_all(dir).await?;
        let probe = dir.join(WRITE_PROBE);
        fs::write(&probe, b"").await?;
        fs::remove_file(&probe).await?;
        Ok(())
    }

    /// Create a fresh session file containing only the header.
    ///
    /// The name is `wt-<session>-<YYYYmmddTHHMMSS>.csv`; a numeric suffix is
    /// added if that file already exists.
    pub async fn create(dir: &Path, session_id: &str) -> DomainResult<Self> {
        Self::prepare_directory(dir).await?;

        let stem = format!(
            "wt-{}-{}",
            sanitize_component(session_id),
            Local::now().format("%Y%m%dT%H%M%S")
        );

        for attempt in 0..100u32 {
            let name = if attempt == 0 {
                format!("{stem}.csv")
            } else {
                format!("{stem}-{attempt}.csv")
            };
            let path = dir.join(name);

            match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(mut file) => {
                    file.write_all(format!("{ROW_HEADER}\n").as_bytes()).await?;
                    file.flush().await?;
                    info!(path = %path.display(), "session file created");
                    return Ok(Self { path });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
                Err(e) => return Err(e.into()),
            }
        }

        Err(DomainError::Io(format!(
            "could not find a free file name for {stem} in {}",
            dir.display()
        )))
    }

    /// Bind to an existing file without touching it.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every sample back, skipping the header.
    pub async fn read_samples(path: &Path) -> DomainResult<Vec<Sample>> {
        let contents = fs::read_to_string(path).await?;
        contents
            .lines()
            .skip_while(|line| *line == ROW_HEADER)
            .filter(|line| !line.is_empty())
            .map(Sample::from_row)
            .collect()
    }
}

#[async_trait]
impl Recorder for RowLog {
    async fn append(&self, sample: &Sample) -> DomainResult<()> {
        let mut file = OpenOptions::new().append(true).open(&self.path).await?;
        file.write_all(format!("{}\n", sample.to_row()).as_bytes())
            .await?;
        file.flush().await?;
        debug!(counter = sample.counter, "row appended");
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
