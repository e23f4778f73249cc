//! Kubernetes client construction

use kube::Client;
use kube::config::{KubeConfigOptions, Kubeconfig};

use crate::error::Result;

/// Connect to the cluster
///
/// Without a context this follows the usual discovery: in-cluster service account,
/// then `$KUBECONFIG`, then `~/.kube/config`. With a context the kubeconfig is read
/// and that context is selected.
pub async fn connect(context: Option<&str>) -> Result<Client> {
    let client = match context {
        Some(context) => {
            tracing::debug!("connecting with kubeconfig context {}", context);
            let options = KubeConfigOptions {
                context: Some(context.to_string()),
                ..Default::default()
            };
            let config = kube::Config::from_kubeconfig(&options).await?;
            Client::try_from(config)?
        }
        None => Client::try_default().await?,
    };
    Ok(client)
}

/// Names of the contexts in the local kubeconfig
pub fn available_contexts() -> Result<Vec<String>> {
    let kubeconfig = Kubeconfig::read()?;
    Ok(kubeconfig.contexts.into_iter().map(|c| c.name).collect())
}
