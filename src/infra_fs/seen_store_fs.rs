use crate::domain_port::SeenStore;
use anyhow::Context;
use std::collections::HashSet;
use std::path::PathBuf;

/// Seen ledgers as one JSON file per ledger under a base directory. This is
/// the per-device durable storage; a missing file is an empty ledger.
pub struct FsSeenStore {
    base_dir: PathBuf,
}

impl FsSeenStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn path_for(&self, ledger: &str) -> PathBuf {
        let safe: String = ledger
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.base_dir.join(format!("{safe}.json"))
    }
}

#[async_trait::async_trait]
impl SeenStore for FsSeenStore {
    async fn load(&self, ledger: &str) -> anyhow::Result<HashSet<String>> {
        let path = self.path_for(ledger);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashSet::new()),
            Err(e) => return Err(e).context(format!("reading {}", path.display())),
        };
        serde_json::from_slice(&raw).context(format!("decoding {}", path.display()))
    }

    async fn save(&self, ledger: &str, ids: &HashSet<String>) -> anyhow::Result<()> {
        let path = self.path_for(ledger);
        tokio::fs::create_dir_all(&self.base_dir)
            .await
            .context(format!("creating {}", self.base_dir.display()))?;
        let raw = serde_json::to_vec(ids)?;
        tokio::fs::write(&path, raw)
            .await
            .context(format!("writing {}", path.display()))
    }
}
