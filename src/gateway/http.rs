use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, StatusCode};

use crate::game::ScoreRecord;

use super::{GatewayError, GatewayResult, LeaderboardGateway};

const SCORES_PATH: &str = "/api/scores";

/// Gateway posting to another leaderboard service's `/api/scores`.
#[derive(Clone)]
pub struct HttpLeaderboardGateway {
    client: Client,
    base_url: Arc<str>,
}

impl HttpLeaderboardGateway {
    /// Client for the leaderboard service at `base_url`.
    pub fn new(base_url: &str) -> GatewayResult<Self> {
        let client = Client::builder().build().map_err(|source| GatewayError::Remote {
            message: "failed to build HTTP client".into(),
            source: Some(Box::new(source)),
        })?;
        Ok(Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
        })
    }

    fn url(&self) -> String {
        format!("{}{SCORES_PATH}", self.base_url)
    }
}

fn send_error(source: reqwest::Error) -> GatewayError {
    GatewayError::Remote {
        message: "request failed".into(),
        source: Some(Box::new(source)),
    }
}

fn status_error(status: StatusCode) -> GatewayError {
    GatewayError::Remote {
        message: format!("unexpected status {status}"),
        source: None,
    }
}

impl LeaderboardGateway for HttpLeaderboardGateway {
    fn submit(&self, record: ScoreRecord) -> BoxFuture<'static, GatewayResult<()>> {
        let gateway = self.clone();
        Box::pin(async move {
            let response = gateway
                .client
                .post(gateway.url())
                .json(&record)
                .send()
                .await
                .map_err(send_error)?;
            if response.status().is_success() {
                Ok(())
            } else {
                Err(status_error(response.status()))
            }
        })
    }

    fn list(&self, limit: usize) -> BoxFuture<'static, GatewayResult<Vec<ScoreRecord>>> {
        let gateway = self.clone();
        Box::pin(async move {
            let response = gateway
                .client
                .get(gateway.url())
                .send()
                .await
                .map_err(send_error)?;
            if !response.status().is_success() {
                return Err(status_error(response.status()));
            }
            let mut records = response
                .json::<Vec<ScoreRecord>>()
                .await
                .map_err(send_error)?;
            records.truncate(limit);
            Ok(records)
        })
    }
}
