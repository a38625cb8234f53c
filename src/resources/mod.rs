//! Sample Kubernetes resources added to the GitOps repository, and the
//! workspace plumbing that writes and publishes them.

mod documents;
mod publisher;
mod workspace;

use std::path::Path;

use documents::{Kustomization, deployment};

pub use documents::Resources;
pub use publisher::{GitPublisher, ResourcePublisher};
pub use workspace::{BOOTSTRAP_OUTPUT_DIR, checkout_dir, clear_workspace, write_resources};

pub const SERVICE_CONFIG_PATH: &str =
    "bootstrapresources/environments/new-env/apps/app-bus/services/bus/base/config";
pub const SAMPLE_APPLICATION: &str = "app-bus";
pub const SAMPLE_ENVIRONMENT: &str = "new-env";
pub const SAMPLE_SERVICE: &str = "bus";
pub const SAMPLE_IMAGE: &str = "nginxinc/nginx-unprivileged:latest";
pub const SAMPLE_PORT: u16 = 8080;

/// The `bus` service deployment plus the kustomization that includes it.
pub fn sample_resources() -> Resources {
    let dir = Path::new(SERVICE_CONFIG_PATH);
    let mut resources = Resources::new();
    resources.insert(
        dir.join("deployment.yaml"),
        deployment(
            SAMPLE_APPLICATION,
            SAMPLE_ENVIRONMENT,
            SAMPLE_SERVICE,
            SAMPLE_IMAGE,
            SAMPLE_PORT,
        ),
    );
    resources.insert(
        dir.join("kustomization.yaml"),
        Kustomization::new(["deployment.yaml"]),
    );
    resources
}
