//! GitHub GraphQL API support
//!
//! Open pull requests are fetched with one query per repository; the REST API
//! would need a request per pull request for reviews and review requests.

use crate::{Error, GitHubClient, Result};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

/// GraphQL query response wrapper
#[derive(Debug, Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQLError>>,
}

/// GraphQL error
#[derive(Debug, Deserialize)]
struct GraphQLError {
    message: String,
}

impl GitHubClient {
    /// Execute a GraphQL query
    pub(crate) async fn graphql_query<T: for<'de> Deserialize<'de>>(
        &self,
        query: &str,
        variables: &serde_json::Value,
    ) -> Result<T> {
        let url = self.graphql_url();
        debug!(url = %url, "Executing GraphQL query");

        let request_body = json!({
            "query": query,
            "variables": variables,
        });

        let response = self
            .http()
            .post(&url)
            .bearer_auth(self.token())
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response".to_string());
            return Err(Error::Other(format!(
                "GraphQL request failed with status {}: {}",
                status, text
            )));
        }

        let graphql_response: GraphQLResponse<T> = response
            .json()
            .await
            .map_err(|e| Error::Parse(format!("Failed to parse GraphQL response: {}", e)))?;

        into_data(graphql_response)
    }
}

fn into_data<T>(response: GraphQLResponse<T>) -> Result<T> {
    if let Some(errors) = response.errors.filter(|errors| !errors.is_empty()) {
        let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
        return Err(Error::GraphQl(messages.join(", ")));
    }

    response
        .data
        .ok_or_else(|| Error::Other("GraphQL response missing data".to_string()))
}
