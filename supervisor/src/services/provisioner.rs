//! Distribution provisioning
//!
//! Makes sure an extracted node distribution exists in the working
//! directory. The archive is fetched at most once and extracted at most
//! once; an existing distribution directory short-circuits both steps.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use url::Url;

use super::absolute_path;
use crate::error::{SupervisorError, SupervisorResult};
use crate::traits::ArtifactFetcher;
use shared::{component_debug, component_info, Component};

const ARCHIVE_SUFFIXES: [&str; 3] = [".tar.gz", ".tgz", ".tar"];

/// Fetcher for `http(s)://` and `file://` artifacts
pub struct HttpArtifactFetcher {
    client: reqwest::Client,
}

impl HttpArtifactFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpArtifactFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArtifactFetcher for HttpArtifactFetcher {
    async fn fetch(&self, url: &Url, dest: &Path) -> SupervisorResult<u64> {
        match url.scheme() {
            "file" => {
                let source = url
                    .to_file_path()
                    .map_err(|_| SupervisorError::provisioning(url.as_str(), "not a local file path"))?;
                Ok(fs::copy(source, dest).await?)
            }
            "http" | "https" => {
                let mut response = self.client.get(url.clone()).send().await?.error_for_status()?;
                let mut file = fs::File::create(dest).await?;
                let mut written = 0u64;

                while let Some(chunk) = response.chunk().await? {
                    file.write_all(&chunk).await?;
                    written += chunk.len() as u64;
                }
                file.flush().await?;

                Ok(written)
            }
            other => Err(SupervisorError::provisioning(
                url.as_str(),
                format!("unsupported scheme '{other}'"),
            )),
        }
    }
}

/// Local paths derived from an artifact URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    pub url: Url,
    /// Downloaded archive, e.g. `<work>/crate-0.50.2.tar.gz`
    pub archive: PathBuf,
    /// Extracted distribution root, e.g. `<work>/crate-0.50.2`
    pub distribution: PathBuf,
}

pub struct ArtifactProvisioner<F: ArtifactFetcher = HttpArtifactFetcher> {
    working_dir: PathBuf,
    fetcher: F,
}

impl ArtifactProvisioner {
    pub fn new<P: Into<PathBuf>>(working_dir: P) -> Self {
        Self::with_fetcher(working_dir, HttpArtifactFetcher::new())
    }
}

impl<F: ArtifactFetcher> ArtifactProvisioner<F> {
    pub fn with_fetcher<P: Into<PathBuf>>(working_dir: P, fetcher: F) -> Self {
        Self {
            working_dir: working_dir.into(),
            fetcher,
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Work out where the archive and its extracted distribution live
    pub fn layout(&self, uri: &str) -> SupervisorResult<ArtifactLayout> {
        let url = Url::parse(uri).map_err(|e| SupervisorError::provisioning(uri, e))?;

        let file_name = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| SupervisorError::provisioning(uri, "URI has no file name"))?
            .to_string();

        let dist_name = ARCHIVE_SUFFIXES
            .iter()
            .find_map(|suffix| file_name.strip_suffix(suffix))
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                SupervisorError::provisioning(uri, format!("'{file_name}' is not a tar archive"))
            })?
            .to_string();

        let working_dir = absolute_path(&self.working_dir)?;

        Ok(ArtifactLayout {
            url,
            archive: working_dir.join(&file_name),
            distribution: working_dir.join(dist_name),
        })
    }

    /// Ensure the distribution for `uri` is available locally and return its root
    pub async fn ensure(&self, uri: &str) -> SupervisorResult<PathBuf> {
        let layout = self.layout(uri)?;

        if layout.distribution.is_dir() {
            component_debug!(
                Component::Provisioner,
                "Distribution already present at {}",
                layout.distribution.display()
            );
            return Ok(layout.distribution);
        }

        fs::create_dir_all(absolute_path(&self.working_dir)?).await?;

        if !layout.archive.is_file() {
            self.download(uri, &layout).await?;
        } else {
            component_debug!(
                Component::Provisioner,
                "Archive already downloaded at {}",
                layout.archive.display()
            );
        }

        self.extract(uri, &layout).await?;
        Ok(layout.distribution)
    }

    /// Remove the archive and extracted distribution for `uri`
    pub async fn cleanup(&self, uri: &str) -> SupervisorResult<()> {
        let layout = self.layout(uri)?;

        match fs::remove_dir_all(&layout.distribution).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e.into()),
            _ => {}
        }
        match fs::remove_file(&layout.archive).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e.into()),
            _ => {}
        }

        component_debug!(Component::Provisioner, "🧹 Removed artifacts for {}", uri);
        Ok(())
    }

    async fn download(&self, uri: &str, layout: &ArtifactLayout) -> SupervisorResult<()> {
        component_info!(Component::Provisioner, "📥 Downloading {}", uri);

        let mut partial = layout.archive.clone().into_os_string();
        partial.push(".part");
        let partial = PathBuf::from(partial);

        match self.fetcher.fetch(&layout.url, &partial).await {
            Ok(bytes) => {
                fs::rename(&partial, &layout.archive).await?;
                component_debug!(
                    Component::Provisioner,
                    "Fetched {} bytes to {}",
                    bytes,
                    layout.archive.display()
                );
                Ok(())
            }
            Err(e) => {
                let _ = fs::remove_file(&partial).await;
                Err(SupervisorError::provisioning(uri, format!("fetch failed: {e}")))
            }
        }
    }

    async fn extract(&self, uri: &str, layout: &ArtifactLayout) -> SupervisorResult<()> {
        let working_dir = absolute_path(&self.working_dir)?;
        component_info!(
            Component::Provisioner,
            "📦 Extracting {} into {}",
            layout.archive.display(),
            working_dir.display()
        );

        let output = Command::new("tar")
            .arg("-C")
            .arg(&working_dir)
            .arg("-xf")
            .arg(&layout.archive)
            .current_dir(&working_dir)
            .output()
            .await
            .map_err(|e| SupervisorError::provisioning(uri, format!("cannot run tar: {e}")))?;

        if !output.status.success() {
            return Err(SupervisorError::provisioning(
                uri,
                format!(
                    "tar exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }

        if !layout.distribution.is_dir() {
            return Err(SupervisorError::provisioning(
                uri,
                format!(
                    "archive did not contain {}",
                    layout.distribution.display()
                ),
            ));
        }

        Ok(())
    }
}
