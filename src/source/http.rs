use async_trait::async_trait;
use tracing::debug;

use super::{checked_relative, DataSource, SourceError};

/// Reads the static site from a web server
#[derive(Debug, Clone)]
pub struct HttpSource {
    base_url: String,
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> Result<String, SourceError> {
        Ok(format!("{}/{}", self.base_url, checked_relative(path)?))
    }
}

#[async_trait]
impl DataSource for HttpSource {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, SourceError> {
        let response = self.client.get(self.url(path)?).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            return Err(SourceError::Status {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }

    async fn exists(&self, path: &str) -> bool {
        let Ok(url) = self.url(path) else {
            return false;
        };
        match self.client.head(url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("HEAD {} failed: {}", path, e);
                false
            }
        }
    }

    fn describe(&self) -> String {
        self.base_url.clone()
    }
}
