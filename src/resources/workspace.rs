use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::debug;

use super::documents::Resources;

/// Where `kam bootstrap` writes the generated GitOps tree.
pub const BOOTSTRAP_OUTPUT_DIR: &str = "bootstrapresources";

/// Local clone of the GitOps repository; never the workspace itself.
pub const CHECKOUT_DIR: &str = "gitops-checkout";

/// Directories produced by a previous run.
pub const GENERATED_DIRS: [&str; 3] = [BOOTSTRAP_OUTPUT_DIR, "secrets", CHECKOUT_DIR];

pub fn checkout_dir(root: &Path) -> PathBuf {
    root.join(CHECKOUT_DIR)
}

pub fn clear_workspace(root: &Path) -> Result<()> {
    for dir in GENERATED_DIRS {
        let path = root.join(dir);
        match fs::remove_dir_all(&path) {
            Ok(()) => debug!(path = %path.display(), "removed generated directory"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to remove {}", path.display()));
            }
        }
    }
    Ok(())
}

/// Serialize every document under `root`. Returns the written paths relative
/// to `root`, in a stable order.
pub fn write_resources(root: &Path, resources: &Resources) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(resources.len());

    for (relative, document) in resources.iter() {
        if relative.is_absolute() {
            bail!("resource path {} must be relative", relative.display());
        }

        let target = root.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Unable to create directory {}", parent.display()))?;
        }

        let yaml = serde_yaml::to_string(document)
            .with_context(|| format!("Failed to serialize {}", relative.display()))?;
        fs::write(&target, yaml)
            .with_context(|| format!("Failed to write {}", target.display()))?;

        debug!(path = %target.display(), "wrote resource");
        written.push(relative.clone());
    }

    Ok(written)
}
