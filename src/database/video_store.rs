use std::path::{Path, PathBuf};

use crate::{data_types::request::VideoUpload, error::Result, logvbln, logwarn};

/// Files written for one request, waiting to be moved into the route directory.
#[derive(Debug)]
pub struct Staging {
    dir: PathBuf,
    route_dir: PathBuf,
    // (staged, final)
    files: Vec<(PathBuf, PathBuf)>,
}

/// Uploaded and annotated videos, kept under `<static_dir>/videos/<route_id>/`.
pub struct VideoStore {
    root: PathBuf,
}

impl VideoStore {
    const CC: &'static str = "VideoStore";

    pub fn new(static_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: static_dir.into(),
        }
    }

    pub fn route_dir(&self, route_id: &str) -> PathBuf {
        self.root.join("videos").join(route_id)
    }

    /// Opens a private directory under the route's one. Nothing becomes visible at
    /// the final paths until `commit`.
    pub fn staging(&self, route_id: &str) -> Staging {
        let route_dir = self.route_dir(route_id);

        Staging {
            dir: route_dir.join(format!(".staging-{}", uuid::Uuid::new_v4())),
            route_dir,
            files: Vec::new(),
        }
    }

    /// Stages the upload; returns the path it will have once committed.
    pub async fn save_original(&self, staging: &mut Staging, route_id: &str, video: &VideoUpload) -> Result<PathBuf> {
        let name = format!("{}.{}", route_id, video.extension());
        self.stage(staging, name, &video.data).await
    }

    pub async fn save_annotated(&self, staging: &mut Staging, route_id: &str, data: &[u8]) -> Result<PathBuf> {
        let name = format!("annotated_{}.mp4", route_id);
        self.stage(staging, name, data).await
    }

    async fn stage(&self, staging: &mut Staging, name: String, data: &[u8]) -> Result<PathBuf> {
        let staged = staging.dir.join(&name);
        self.write(&staged, data).await?;

        let target = staging.route_dir.join(name);
        staging.files.push((staged, target.clone()));
        Ok(target)
    }

    /// Moves every staged file to its final path.
    pub async fn commit(&self, staging: Staging) -> Result<()> {
        let mut failure = None;
        for (staged, target) in &staging.files {
            if let Err(err) = tokio::fs::rename(staged, target).await {
                failure = Some(err);
                break;
            }
        }

        match failure {
            Some(err) => {
                self.discard(staging).await;
                Err(err.into())
            }
            None => {
                let _ = tokio::fs::remove_dir(&staging.dir).await;
                Ok(())
            }
        }
    }

    /// Drops the staged files. Files already at their final paths are left alone.
    pub async fn discard(&self, staging: Staging) {
        if let Err(err) = tokio::fs::remove_dir_all(&staging.dir).await {
            if err.kind() != std::io::ErrorKind::NotFound {
                logwarn!("Could not remove staging dir {}: {}", staging.dir.display(), err);
            }
        }

        // only succeeds once the directory is empty
        let _ = tokio::fs::remove_dir(&staging.route_dir).await;
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }

        if let Err(err) = tokio::fs::write(path, data).await {
            // don't leave a truncated file behind
            let _ = tokio::fs::remove_file(path).await;
            return Err(err.into());
        }

        logvbln!("Stored {} ({} bytes)", path.display(), data.len());
        Ok(())
    }

    /// Removes a stored file; a file that is already gone is not an error.
    pub async fn remove(&self, path: &Path) -> Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Best effort: failures are only logged.
    pub async fn remove_all(&self, route_id: &str, paths: &[&str]) {
        for path in paths {
            if let Err(err) = self.remove(Path::new(path)).await {
                logwarn!("Could not remove video file {}: {}", path, err);
            }
        }

        // only succeeds once the directory is empty
        let _ = tokio::fs::remove_dir(self.route_dir(route_id)).await;
    }
}
