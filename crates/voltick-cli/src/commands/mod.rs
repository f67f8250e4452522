mod chain;
mod hv;
mod iv;
mod market;
mod price;
mod sources;
mod spot;
mod strategy;

use std::time::Duration;

use serde_json::Value;
use voltick_core::{Envelope, EnvelopeError, ProviderId, QuoteRouter, QuoteRouterBuilder};

use crate::cli::{Cli, Command, ProviderSelector};
use crate::error::CliError;
use crate::metadata::Metadata;

pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    pub errors: Vec<EnvelopeError>,
    pub latency_ms: u64,
    pub cache_hit: bool,
    pub source_chain: Vec<ProviderId>,
}

impl CommandResult {
    pub fn ok(data: Value, source_chain: Vec<ProviderId>) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            errors: Vec::new(),
            latency_ms: 0,
            cache_hit: false,
            source_chain,
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn with_errors(mut self, errors: Vec<EnvelopeError>) -> Self {
        self.errors.extend(errors);
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn with_cache_hit(mut self, cache_hit: bool) -> Self {
        self.cache_hit = cache_hit;
        self
    }
}

pub async fn run(cli: &Cli) -> Result<Envelope<Value>, CliError> {
    let router = build_router(cli);

    let deadline = Duration::from_millis(cli.timeout_ms);
    let command_result = tokio::time::timeout(deadline, dispatch(cli, &router))
        .await
        .map_err(|_| CliError::Timeout {
            timeout_ms: cli.timeout_ms,
        })??;

    let CommandResult {
        data,
        warnings,
        errors,
        latency_ms,
        cache_hit,
        source_chain,
    } = command_result;

    let mut metadata = Metadata::new(source_chain, latency_ms, cache_hit)?;
    for warning in warnings {
        metadata.push_warning(warning);
    }
    let meta = metadata.into_envelope_meta("v1.0.0")?;

    Envelope::with_errors(meta, data, errors).map_err(CliError::from)
}

async fn dispatch(cli: &Cli, router: &QuoteRouter) -> Result<CommandResult, CliError> {
    match &cli.command {
        Command::Spot(args) => spot::run(args, router).await,
        Command::Chain(args) => chain::run(args, router).await,
        Command::Hv(args) => hv::run(args, router).await,
        Command::Price(args) => price::run(args, router).await,
        Command::Iv(args) => iv::run(args, router).await,
        Command::Strategy(args) => strategy::run(args, router).await,
        Command::Sources(args) => sources::run(args, router).await,
    }
}

fn build_router(cli: &Cli) -> QuoteRouter {
    let mut builder = QuoteRouterBuilder::new();
    if cli.offline {
        builder = builder.offline();
    }
    if let Some(selectors) = &cli.providers {
        builder = builder.with_providers(selectors.iter().map(|s| to_provider_id(*s)).collect());
    }
    if cli.no_cache {
        builder = builder.with_cache_ttl(Duration::ZERO);
    }
    builder.build()
}

fn to_provider_id(selector: ProviderSelector) -> ProviderId {
    match selector {
        ProviderSelector::Yahoo => ProviderId::Yahoo,
        ProviderSelector::Polygon => ProviderId::Polygon,
        ProviderSelector::Alpaca => ProviderId::Alpaca,
    }
}
