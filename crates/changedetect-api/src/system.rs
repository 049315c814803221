// Instance-level endpoints: system info, search, bulk import.

use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use crate::client::ChangeDetectionClient;
use crate::error::Error;
use crate::types::{ImportOptions, SystemInfo};

impl ChangeDetectionClient {
    /// `GET /systeminfo`
    pub async fn systeminfo(&self) -> Result<SystemInfo, Error> {
        self.fetch(self.request(Method::GET, "systeminfo")?).await
    }

    /// Search watches by URL or title.
    ///
    /// `GET /search?q=...[&tag=...][&partial=1]`
    ///
    /// Returns loosely-typed JSON because the result shape differs
    /// between server versions.
    pub async fn search(
        &self,
        query: &str,
        tag: Option<&str>,
        partial: bool,
    ) -> Result<serde_json::Value, Error> {
        let mut params = vec![("q", query)];
        if let Some(tag) = tag {
            params.push(("tag", tag));
        }
        if partial {
            params.push(("partial", "1"));
        }
        self.fetch(self.request(Method::GET, "search")?.query(&params))
            .await
    }

    /// Import newline-separated URLs, returning the UUIDs of created watches.
    ///
    /// `POST /import` with a `text/plain` body
    pub async fn bulk_import(
        &self,
        urls_text: &str,
        options: &ImportOptions,
    ) -> Result<Vec<String>, Error> {
        debug!(lines = urls_text.lines().count(), "bulk import");
        self.fetch(
            self.request(Method::POST, "import")?
                .query(&options.query())
                .header(CONTENT_TYPE, "text/plain")
                .body(urls_text.to_owned()),
        )
        .await
    }
}
