use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::info;
use uuid::Uuid;

use super::sanitize_component;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{CalibrationPoint, Medium};

/// Header of a calibration point log.
pub const POINT_HEADER: &str = "Reference,Measured";

/// Point log for one calibration session: `cal-<medium>-<session id>.csv`.
#[derive(Debug, Clone)]
pub struct CalibrationLog {
    path: PathBuf,
}

impl CalibrationLog {
    pub async fn create(dir: &Path, medium: Medium, session_id: Uuid) -> DomainResult<Self> {
        fs::create_dir_all(dir).await?;
        let name = format!(
            "cal-{}-{}.csv",
            medium,
            sanitize_component(&session_id.to_string())
        );
        let path = dir.join(name);
        fs::write(&path, format!("{POINT_HEADER}\n")).await?;
        info!(path = %path.display(), "calibration log created");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&self, point: &CalibrationPoint) -> DomainResult<()> {
        let mut file = OpenOptions::new().append(true).open(&self.path).await?;
        file.write_all(format!("{:?},{:?}\n", point.reference_x, point.measured_y).as_bytes())
            .await?;
        file.flush().await?;
        Ok(())
    }

    pub async fn read_points(path: &Path) -> DomainResult<Vec<CalibrationPoint>> {
        let contents = fs::read_to_string(path).await?;
        contents
            .lines()
            .filter(|line| !line.is_empty() && *line != POINT_HEADER)
            .map(|line| {
                let (x, y) = line
                    .split_once(',')
                    .ok_or_else(|| DomainError::RowParse(format!("expected 2 fields: {line}")))?;
                let parse = |field: &str| {
                    field
                        .trim()
                        .parse::<f64>()
                        .map_err(|e| DomainError::RowParse(format!("'{field}': {e}")))
                };
                Ok(CalibrationPoint::new(parse(x)?, parse(y)?))
            })
            .collect()
    }
}
