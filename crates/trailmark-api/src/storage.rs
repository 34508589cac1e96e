//! On-disk bucket storage for uploaded objects.
//!
//! Each bucket is a directory under the storage root; objects are addressed
//! by `{directory}/{random_token}.{ext}` keys and exposed through public
//! URLs of the form `{public_base}/storage/{bucket}/{key}`. Keys are
//! randomized for every upload, avatars included.

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

pub const BUCKET_PHOTOS: &str = "photos";
pub const BUCKET_AVATARS: &str = "avatars";

pub struct Storage {
    root: PathBuf,
    public_base: String,
}

impl Storage {
    pub async fn new(root: PathBuf, public_base: impl Into<String>) -> Result<Self> {
        fs::create_dir_all(&root).await?;
        info!("Object storage root: {}", root.display());
        Ok(Self {
            root,
            public_base: public_base.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store a blob under a collision-resistant key and return its public
    /// URL. The extension comes from the original filename; validating it
    /// against an allow-list is the caller's job.
    pub async fn upload(
        &self,
        bucket: &str,
        directory: &str,
        filename: &str,
        bytes: &[u8],
    ) -> Result<String> {
        let ext = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .context("filename has no extension")?;
        let key = format!("{}/{}.{}", directory, Uuid::new_v4().simple(), ext);

        let path = self.root.join(bucket).join(&key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, bytes).await?;

        Ok(format!("{}/storage/{}/{}", self.public_base, bucket, key))
    }

    /// Remove the object a public URL points at. The key is the last two
    /// path segments of the URL. A missing object is logged and ignored so
    /// dependent database deletes can proceed.
    pub async fn delete(&self, bucket: &str, public_url: &str) -> Result<()> {
        let Some(key) = object_key_from_url(public_url) else {
            bail!("Cannot derive storage key from URL: {}", public_url);
        };

        let path = self.root.join(bucket).join(&key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Object {}/{} already gone", bucket, key);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Last two path segments of a public URL, i.e. `{directory}/{file}`.
pub fn object_key_from_url(public_url: &str) -> Option<String> {
    let mut segments = public_url.rsplit('/');
    let file = segments.next().filter(|s| !s.is_empty())?;
    let directory = segments.next().filter(|s| !s.is_empty())?;
    Some(format!("{directory}/{file}"))
}
