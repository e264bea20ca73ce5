use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use tracing::warn;

use crate::dao::{
    models::{ScoreEntity, sort_for_leaderboard},
    score_store::ScoreStore,
    storage::StorageResult,
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{AllDocsResponse, CouchScoreDocument, END_SUFFIX, SCORE_PREFIX},
};

/// Score store backed by a CouchDB database, one document per submission.
#[derive(Clone)]
pub struct CouchScoreStore {
    client: Client,
    base_url: Arc<str>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

impl CouchScoreStore {
    /// Connect and make sure the database exists.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let store = Self {
            client,
            base_url: Arc::from(config.base_url.trim_end_matches('/')),
            database: Arc::from(config.database),
            auth: config
                .username
                .zip(config.password)
                .map(|(user, pass)| (Arc::from(user), Arc::from(pass))),
        };

        store.ensure_database().await?;
        Ok(store)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            Some((user, pass)) => builder.basic_auth(user.as_ref(), Some(pass.as_ref())),
            None => builder,
        }
    }

    fn database_url(&self) -> String {
        format!("{}/{}", self.base_url, self.database)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.database_url(), path);
        self.authorize(self.client.request(method, url))
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.to_string();
        let url = self.database_url();

        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|source| CouchDaoError::Database {
                database: database.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let create = self
                    .authorize(self.client.put(&url))
                    .send()
                    .await
                    .map_err(|source| CouchDaoError::Database {
                        database: database.clone(),
                        source,
                    })?;
                if create.status().is_success() {
                    Ok(())
                } else {
                    Err(CouchDaoError::DatabaseStatus {
                        database,
                        status: create.status(),
                    })
                }
            }
            status => Err(CouchDaoError::DatabaseStatus { database, status }),
        }
    }

    async fn put_score(&self, document: &CouchScoreDocument) -> CouchResult<()> {
        let response = self
            .request(Method::PUT, &document.id)
            .json(document)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: document.id.clone(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(CouchDaoError::RequestStatus {
                path: document.id.clone(),
                status: response.status(),
            })
        }
    }

    async fn all_scores(&self) -> CouchResult<Vec<ScoreEntity>> {
        const ALL_DOCS: &str = "_all_docs";
        let query = [
            ("include_docs", "true".to_owned()),
            ("startkey", format!("\"{SCORE_PREFIX}\"")),
            ("endkey", format!("\"{SCORE_PREFIX}{END_SUFFIX}\"")),
        ];

        let response = self
            .request(Method::GET, ALL_DOCS)
            .query(&query)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: ALL_DOCS.to_owned(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CouchDaoError::RequestStatus {
                path: ALL_DOCS.to_owned(),
                status: response.status(),
            });
        }

        let payload = response.json::<AllDocsResponse>().await.map_err(|source| {
            CouchDaoError::DecodeResponse {
                path: ALL_DOCS.to_owned(),
                source,
            }
        })?;

        let mut scores = Vec::with_capacity(payload.rows.len());
        for row in payload.rows {
            let Some(doc) = row.doc else { continue };
            match CouchScoreDocument::from_row(&row.id, doc) {
                Ok(doc) => scores.push(doc.into_entity()),
                Err(err) => warn!(error = %err, "skipping unreadable score document"),
            }
        }
        Ok(scores)
    }
}

impl ScoreStore for CouchScoreStore {
    fn submit_score(&self, score: ScoreEntity) -> BoxFuture<'static, StorageResult<ScoreEntity>> {
        let store = self.clone();
        Box::pin(async move {
            store.put_score(&CouchScoreDocument::from(&score)).await?;
            Ok(score)
        })
    }

    // Sorted client-side: the database holds no views, only score documents.
    fn list_scores(&self, limit: usize) -> BoxFuture<'static, StorageResult<Vec<ScoreEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut scores = store.all_scores().await?;
            sort_for_leaderboard(&mut scores);
            scores.truncate(limit);
            Ok(scores)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let url = store.database_url();
            let response = store
                .authorize(store.client.get(&url))
                .send()
                .await
                .map_err(|source| CouchDaoError::RequestSend {
                    path: url.clone(),
                    source,
                })?;

            if response.status().is_success() {
                Ok(())
            } else {
                Err(CouchDaoError::RequestStatus {
                    path: url,
                    status: response.status(),
                }
                .into())
            }
        })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}
