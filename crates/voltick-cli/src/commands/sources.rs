use serde::Serialize;
use voltick_core::{CapabilitySet, ProviderId, QuoteRouter};

use crate::cli::SourcesArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct SourceRow {
    id: ProviderId,
    status: &'static str,
    rate_available: bool,
    endpoints: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    capabilities: Option<CapabilitySet>,
}

#[derive(Debug, Serialize)]
struct SourcesResponseData {
    sources: Vec<SourceRow>,
}

pub async fn run(args: &SourcesArgs, router: &QuoteRouter) -> Result<CommandResult, CliError> {
    let rows = router
        .snapshots()
        .await
        .into_iter()
        .map(|snapshot| SourceRow {
            id: snapshot.id,
            status: snapshot.status_label(),
            rate_available: snapshot.health.rate_available,
            endpoints: snapshot.capabilities.supported_endpoints(),
            capabilities: args.verbose.then_some(snapshot.capabilities),
        })
        .collect();

    let data = serde_json::to_value(SourcesResponseData { sources: rows })?;
    Ok(CommandResult::ok(data, router.config().providers.clone()))
}
