use crate::{
    admission::Admission,
    core::Engine,
    k8s::{self, Initializer},
    lookup::KubeLookup,
    metrics::AdmissionMetrics,
};
use anyhow::{bail, Result};
use clap::Parser;
use kube::{Client, Resource};
use prometheus_client::registry::Registry;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[clap(
    name = "volume-initializer",
    about = "Injects init containers into pods that mount matching PVCs"
)]
pub struct Args {
    #[clap(
        long,
        default_value = "volume_initializer=info,warn",
        env = "VOLUME_INITIALIZER_LOG"
    )]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: kubert::LogFormat,

    #[clap(flatten)]
    client: kubert::ClientArgs,

    #[clap(flatten)]
    server: kubert::ServerArgs,

    #[clap(flatten)]
    admin: kubert::AdminArgs,

    /// Upper bound on the time spent deciding on a single pod, including all
    /// API lookups.
    #[clap(long, default_value = "10000")]
    decision_timeout_ms: u64,

    /// Namespace label naming the tenant workspace that owns the namespace.
    #[clap(long, default_value = k8s::WORKSPACE_LABEL)]
    workspace_label: String,
}

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            admin,
            client,
            log_level,
            log_format,
            server,
            decision_timeout_ms,
            workspace_label,
        } = self;

        let mut prom = <Registry>::default();
        let admission_metrics =
            AdmissionMetrics::register(prom.sub_registry_with_prefix("admission"));
        let rt_metrics = kubert::RuntimeMetrics::register(prom.sub_registry_with_prefix("kube"));

        let runtime = kubert::Runtime::builder()
            .with_log(log_level, log_format)
            .with_metrics(rt_metrics)
            .with_admin(admin.into_builder().with_prometheus(prom))
            .with_client(client)
            .with_server(server)
            .build()
            .await?;

        if !api_resource_exists::<Initializer>(&runtime.client()).await {
            warn!("initializers.storage.kubesphere.io resource kind not found, pods mounting PVCs will be denied until it is installed");
        }

        let lookup = KubeLookup::new(runtime.client());
        let engine = Engine::new(Arc::new(lookup)).with_workspace_label(workspace_label);
        let admission = Admission::new(
            engine,
            Duration::from_millis(decision_timeout_ms),
            admission_metrics,
        );
        info!(timeout_ms = decision_timeout_ms, "Serving pod admission");
        let runtime = runtime.spawn_server(admission);

        // Block the main thread on the shutdown signal. Once it fires, wait for the background tasks to
        // complete before exiting.
        if runtime.run().await.is_err() {
            bail!("Aborted");
        }

        Ok(())
    }
}

async fn api_resource_exists<T>(client: &Client) -> bool
where
    T: Resource,
    T::DynamicType: Default,
{
    let dt = Default::default();
    client
        .list_api_group_resources(&T::api_version(&dt))
        .await
        .ok()
        .iter()
        .flat_map(|r| r.resources.iter())
        .any(|r| r.kind == T::kind(&dt))
}
