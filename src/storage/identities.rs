/// Identity document store
///
/// This node hosts identity documents only for DIDs under its configured
/// accepted domains. A hosted document lives at
/// `{domain directory}/{path segments}/identity.json`, where the segments
/// come from the DID itself, so the web tier can serve them at the exact
/// URLs the DID resolution scheme derives.
use crate::{
    config::IdentityDomain,
    error::{BroadcasterError, BroadcasterResult},
    identity::did,
};
use std::path::PathBuf;
use tokio::fs;

#[derive(Clone)]
pub struct IdentityStore {
    domains: Vec<IdentityDomain>,
}

impl IdentityStore {
    pub fn new(domains: Vec<IdentityDomain>) -> Self {
        Self { domains }
    }

    pub async fn get(&self, did: &str) -> BroadcasterResult<Option<String>> {
        match fs::read_to_string(self.document_path(did)?).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn put(&self, did: &str, document: &str) -> BroadcasterResult<()> {
        let path = self.document_path(did)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::write(&path, document).await?;

        Ok(())
    }

    /// Remove an identity document, pruning its directory if nothing else
    /// remains.
    pub async fn delete(&self, did: &str) -> BroadcasterResult<()> {
        let path = self.document_path(did)?;

        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        }

        if let Some(parent) = path.parent() {
            let mut entries = fs::read_dir(parent).await?;
            if entries.next_entry().await?.is_none() {
                fs::remove_dir(parent).await?;
            }
        }

        Ok(())
    }

    /// Map a DID onto its hosted document path.
    ///
    /// Fails when the DID's domain prefix is not one this node accepts.
    pub fn document_path(&self, did: &str) -> BroadcasterResult<PathBuf> {
        let (domain, segments) = did::storage_segments(did)?;

        let hosted = self
            .domains
            .iter()
            .find(|d| d.prefix == domain)
            .ok_or_else(|| {
                BroadcasterError::Validation(
                    "This is not an acceptable DID subdomain.".to_string(),
                )
            })?;

        if segments.iter().any(|s| s == "." || s == "..") {
            return Err(BroadcasterError::InvalidDidSyntax(format!(
                "DID '{}' does not map to a valid storage location",
                did
            )));
        }

        let mut path = hosted.directory.clone();
        for segment in &segments {
            path.push(segment);
        }
        path.push("identity.json");

        Ok(path)
    }
}
