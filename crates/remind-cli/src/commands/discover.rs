use remind_core::config::SyncSettings;
use remind_core::transport::probe_status;

use crate::commands::common::tv_discovery;
use crate::error::CliError;

pub async fn run_discover(settings: &SyncSettings) -> Result<(), CliError> {
    let Some((client, discovery)) = tv_discovery(settings)? else {
        return Err(CliError::DiscoveryDisabled);
    };

    let endpoints = discovery.discover().await?;
    if endpoints.is_empty() {
        println!("No TV found ({} discovery).", discovery.name());
        return Ok(());
    }

    for endpoint in endpoints {
        let state = if probe_status(&client, &endpoint).await {
            "reachable"
        } else {
            "unreachable"
        };
        println!("{endpoint}  {state}");
    }
    Ok(())
}
