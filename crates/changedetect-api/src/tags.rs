// Tag endpoints

use std::collections::BTreeMap;

use reqwest::Method;

use crate::client::{ChangeDetectionClient, Payload};
use crate::error::Error;
use crate::types::{CreateTagRequest, Tag, UpdateTagRequest};

impl ChangeDetectionClient {
    /// List all tags, keyed by UUID.
    ///
    /// `GET /tags`
    pub async fn list_tags(&self) -> Result<BTreeMap<String, Tag>, Error> {
        self.fetch(self.request(Method::GET, "tags")?).await
    }

    /// `POST /tag`
    pub async fn create_tag(&self, body: &CreateTagRequest) -> Result<Payload, Error> {
        self.fetch_payload(self.request(Method::POST, "tag")?.json(body))
            .await
    }

    /// `GET /tag/{uuid}`
    pub async fn get_tag(&self, uuid: &str) -> Result<Tag, Error> {
        self.fetch(self.request(Method::GET, &format!("tag/{uuid}"))?)
            .await
    }

    /// Recheck every watch in the tag. `GET /tag/{uuid}?recheck=true`
    pub async fn recheck_tag(&self, uuid: &str) -> Result<Payload, Error> {
        self.fetch_payload(
            self.request(Method::GET, &format!("tag/{uuid}"))?
                .query(&[("recheck", "true")]),
        )
        .await
    }

    /// `GET /tag/{uuid}?muted=muted|unmuted`
    pub async fn set_tag_muted(&self, uuid: &str, muted: bool) -> Result<Payload, Error> {
        let value = if muted { "muted" } else { "unmuted" };
        self.fetch_payload(
            self.request(Method::GET, &format!("tag/{uuid}"))?
                .query(&[("muted", value)]),
        )
        .await
    }

    /// `PUT /tag/{uuid}`
    pub async fn update_tag(&self, uuid: &str, body: &UpdateTagRequest) -> Result<Payload, Error> {
        self.fetch_payload(self.request(Method::PUT, &format!("tag/{uuid}"))?.json(body))
            .await
    }

    /// `DELETE /tag/{uuid}`
    pub async fn delete_tag(&self, uuid: &str) -> Result<(), Error> {
        self.fetch_empty(self.request(Method::DELETE, &format!("tag/{uuid}"))?)
            .await
    }
}
