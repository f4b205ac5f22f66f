//! Context enrichment: optional organizational snippets attached to the
//! prompt. Strictly best-effort; a failing knowledge service never fails
//! the task.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use docuflow_core::defaults::{ENRICHMENT_MAX_SNIPPETS, ENRICHMENT_TIMEOUT_SECS, ENV_ENRICHMENT_BASE_URL};
use docuflow_core::{Department, Error, Result};

#[async_trait]
pub trait ContextEnricher: Send + Sync {
    /// Short text snippets relevant to the department and keywords.
    async fn enrich(
        &self,
        department: Option<Department>,
        keywords: &[String],
    ) -> Result<Vec<String>>;
}

/// Enricher that never returns anything. Used when no knowledge service is
/// configured.
pub struct NoopEnricher;

#[async_trait]
impl ContextEnricher for NoopEnricher {
    async fn enrich(
        &self,
        _department: Option<Department>,
        _keywords: &[String],
    ) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

#[derive(Serialize)]
struct EnrichmentQuery<'a> {
    department: Option<Department>,
    keywords: &'a [String],
    limit: usize,
}

#[derive(Deserialize)]
struct EnrichmentResponse {
    #[serde(default)]
    snippets: Vec<String>,
}

/// Knowledge-service client.
pub struct HttpEnricher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpEnricher {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(ENRICHMENT_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self { client, base_url }
    }

    pub fn from_env() -> Option<Self> {
        std::env::var(ENV_ENRICHMENT_BASE_URL).ok().map(Self::new)
    }
}

#[async_trait]
impl ContextEnricher for HttpEnricher {
    async fn enrich(
        &self,
        department: Option<Department>,
        keywords: &[String],
    ) -> Result<Vec<String>> {
        let url = format!("{}/v1/context/search", self.base_url.trim_end_matches('/'));
        let query = EnrichmentQuery {
            department,
            keywords,
            limit: ENRICHMENT_MAX_SNIPPETS,
        };

        let response = self.client.post(&url).json(&query).send().await?;
        if !response.status().is_success() {
            return Err(Error::Request(format!(
                "enrichment service returned {}",
                response.status()
            )));
        }

        let mut body: EnrichmentResponse = response.json().await?;
        body.snippets.truncate(ENRICHMENT_MAX_SNIPPETS);
        Ok(body.snippets)
    }
}

/// Run the enricher and degrade any failure to an empty list.
pub async fn enrich_best_effort(
    enricher: &dyn ContextEnricher,
    department: Option<Department>,
    keywords: &[String],
) -> Vec<String> {
    match enricher.enrich(department, keywords).await {
        Ok(snippets) => {
            debug!(snippet_count = snippets.len(), "Context enrichment complete");
            snippets
        }
        Err(e) => {
            warn!(error = %e, "Context enrichment failed, continuing without it");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingEnricher;

    #[async_trait]
    impl ContextEnricher for FailingEnricher {
        async fn enrich(
            &self,
            _department: Option<Department>,
            _keywords: &[String],
        ) -> Result<Vec<String>> {
            Err(Error::Request("knowledge service down".to_string()))
        }
    }

    #[tokio::test]
    async fn test_noop_returns_empty() {
        let snippets = NoopEnricher
            .enrich(Some(Department::Engineering), &["auth".to_string()])
            .await
            .unwrap();
        assert!(snippets.is_empty());
    }

    #[tokio::test]
    async fn test_best_effort_swallows_failure() {
        let snippets = enrich_best_effort(
            &FailingEnricher,
            Some(Department::Support),
            &["billing".to_string()],
        )
        .await;
        assert!(snippets.is_empty());
    }

    #[tokio::test]
    async fn test_best_effort_passes_through_success() {
        struct Fixed;
        #[async_trait]
        impl ContextEnricher for Fixed {
            async fn enrich(
                &self,
                _department: Option<Department>,
                _keywords: &[String],
            ) -> Result<Vec<String>> {
                Ok(vec!["login flow doc".to_string()])
            }
        }
        let snippets = enrich_best_effort(&Fixed, None, &[]).await;
        assert_eq!(snippets, vec!["login flow doc".to_string()]);
    }
}
