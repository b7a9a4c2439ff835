//! Peer discovery through the Kubernetes API
//!
//! Beacons are deployments carrying the `genteelbeacon` label in the
//! gearsmith's own namespace; their pods carry `genteelbeacon=<name>`.
//! The namespace comes from the mounted service-account file, so the
//! gearsmith only runs inside the target cluster.

use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Pod;
use kube::{api::ListParams, Api, Client};
use thiserror::Error;
use tracing::debug;

/// Label that marks a deployment as a beacon
pub const BEACON_LABEL: &str = "genteelbeacon";

#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The service-account namespace file is absent; not running in-cluster
    #[error("Namespace not found")]
    NamespaceNotFound,
    #[error("could not read namespace file: {0}")]
    NamespaceUnreadable(std::io::Error),
}

/// Read the pod's own namespace from the mounted service-account file
pub fn read_namespace(path: &str) -> Result<String, DiscoveryError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(contents.trim().to_string()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(DiscoveryError::NamespaceNotFound)
        }
        Err(e) => Err(DiscoveryError::NamespaceUnreadable(e)),
    }
}

/// Cluster queries the poll cycle depends on
#[async_trait]
pub trait PeerLister: Send + Sync {
    /// Names of the beacon deployments in the local namespace
    async fn beacons(&self) -> Result<Vec<String>>;

    /// IP addresses of the running pods behind one beacon
    async fn pod_addresses(&self, beacon: &str) -> Result<Vec<String>>;
}

/// `PeerLister` backed by the in-cluster Kubernetes API
pub struct KubeDiscovery {
    deployments: Api<Deployment>,
    pods: Api<Pod>,
}

impl KubeDiscovery {
    /// Build a discovery client against the in-cluster API server
    pub async fn connect(namespace: &str) -> Result<Self> {
        let client = Client::try_default()
            .await
            .context("could not build the Kubernetes client")?;
        Ok(Self::new(client, namespace))
    }

    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            deployments: Api::namespaced(client.clone(), namespace),
            pods: Api::namespaced(client, namespace),
        }
    }
}

#[async_trait]
impl PeerLister for KubeDiscovery {
    async fn beacons(&self) -> Result<Vec<String>> {
        let params = ListParams::default().labels(BEACON_LABEL);
        let deployments = self
            .deployments
            .list(&params)
            .await
            .context("error listing beacon deployments")?;

        let names: Vec<String> = deployments
            .items
            .into_iter()
            .filter_map(|deployment| deployment.metadata.name)
            .collect();
        debug!(beacons = ?names, "Discovered beacon deployments");

        Ok(names)
    }

    async fn pod_addresses(&self, beacon: &str) -> Result<Vec<String>> {
        let selector = format!("{BEACON_LABEL}={beacon}");
        let params = ListParams::default().labels(&selector);
        let pods = self
            .pods
            .list(&params)
            .await
            .with_context(|| format!("error listing pods for label {selector}"))?;

        Ok(pods
            .items
            .into_iter()
            .filter_map(|pod| pod.status.and_then(|status| status.pod_ip))
            .collect())
    }
}
