use std::io::Write;

use tracing::Instrument;
use uuid::Uuid;

use crate::config::{Endpoints, RetrieverConfig};
use crate::error::{Result, EXIT_NO_POLICIES};
use crate::fetch::PolicyFetcher;
use crate::http::build_client;
use crate::model::{RetrievalResult, Service};
use crate::report::{Reporter, Summary};
use crate::token::TokenAcquirer;

/// What a completed run retrieved
#[derive(Debug)]
pub struct RunReport {
    pub results: Vec<RetrievalResult>,
    pub summary: Summary,
}

impl RunReport {
    /// 0 when at least one service answered, even with zero policies.
    pub fn exit_code(&self) -> i32 {
        if self.results.iter().any(RetrievalResult::succeeded) {
            0
        } else {
            EXIT_NO_POLICIES
        }
    }
}

/// Runs the token exchange and both policy fetches in order
pub struct Retriever {
    config: RetrieverConfig,
    endpoints: Endpoints,
    acquirer: TokenAcquirer,
    fetcher: PolicyFetcher,
}

impl Retriever {
    /// Retriever against the production endpoints of the configured tenant
    pub fn new(config: RetrieverConfig) -> Result<Self> {
        let endpoints = Endpoints::from_config(&config);
        Self::with_endpoints(config, endpoints)
    }

    pub fn with_endpoints(config: RetrieverConfig, endpoints: Endpoints) -> Result<Self> {
        let client = build_client(&config.http)?;

        Ok(Retriever {
            acquirer: TokenAcquirer::new(client.clone(), endpoints.token_url.clone()),
            fetcher: PolicyFetcher::new(client),
            config,
            endpoints,
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Authenticate, fetch SCA then SIA, and print the report.
    ///
    /// Returns `Err` only when the run must abort (authentication or output
    /// failure). A failed fetch is part of the report.
    pub async fn run<W: Write>(&self, reporter: &mut Reporter<W>) -> Result<RunReport> {
        let span = tracing::info_span!("retrieval", run_id = %Uuid::new_v4());
        self.run_stages(reporter).instrument(span).await
    }

    async fn run_stages<W: Write>(&self, reporter: &mut Reporter<W>) -> Result<RunReport> {
        reporter.stage(1, "Authenticating via OAuth 2.0")?;
        let token = match self
            .acquirer
            .acquire(&self.config.client_id, &self.config.client_secret)
            .await
        {
            Ok(token) => token,
            Err(e) => {
                reporter.stage_failed("Authentication failed")?;
                return Err(e);
            }
        };
        reporter.stage_ok("Bearer token acquired")?;

        let mut results = Vec::with_capacity(Service::ALL.len());
        for (offset, service) in Service::ALL.into_iter().enumerate() {
            reporter.stage(offset + 2, &format!("Retrieving {} policies", service.tag()))?;

            let result = self
                .fetcher
                .fetch(
                    service,
                    self.endpoints.policies(service),
                    &token,
                    &service.field_map(),
                )
                .await;

            if result.succeeded() {
                reporter.stage_ok("Done")?;
            } else {
                reporter.stage_failed("Failed")?;
            }
            results.push(result);
        }

        for result in &results {
            reporter.section(result)?;
        }

        let summary = Summary::from_results(&results);
        reporter.summary(&summary)?;

        tracing::info!(
            sca = summary.sca,
            sia = summary.sia,
            total = summary.total(),
            "retrieval complete"
        );

        Ok(RunReport { results, summary })
    }
}
