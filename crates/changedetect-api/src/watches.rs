// Watch endpoints
//
// CRUD on `/watch`, the pause/mute/recheck toggles (which the service
// exposes as query flags on `GET /watch/{uuid}`), and history access.

use std::collections::BTreeMap;

use bytes::Bytes;
use reqwest::Method;
use tracing::debug;

use crate::client::{ChangeDetectionClient, Payload};
use crate::error::Error;
use crate::types::{CreateWatchRequest, DiffOptions, UpdateWatchRequest, Watch};

impl ChangeDetectionClient {
    /// List all watches, keyed by UUID.
    ///
    /// `GET /watch[?tag=...][&recheck_all=1]`
    pub async fn list_watches(
        &self,
        tag: Option<&str>,
        recheck_all: bool,
    ) -> Result<BTreeMap<String, Watch>, Error> {
        let mut params: Vec<(&str, &str)> = Vec::new();
        if let Some(tag) = tag {
            params.push(("tag", tag));
        }
        if recheck_all {
            params.push(("recheck_all", "1"));
        }
        self.fetch(self.request(Method::GET, "watch")?.query(&params))
            .await
    }

    /// `POST /watch`
    pub async fn create_watch(&self, body: &CreateWatchRequest) -> Result<Payload, Error> {
        debug!(url = %body.url, "creating watch");
        self.fetch_payload(self.request(Method::POST, "watch")?.json(body))
            .await
    }

    /// `GET /watch/{uuid}`
    pub async fn get_watch(&self, uuid: &str) -> Result<Watch, Error> {
        self.fetch(self.request(Method::GET, &format!("watch/{uuid}"))?)
            .await
    }

    /// Queue an immediate recheck. `GET /watch/{uuid}?recheck=true`
    pub async fn recheck_watch(&self, uuid: &str) -> Result<Payload, Error> {
        self.watch_flag(uuid, "recheck", "true").await
    }

    /// `GET /watch/{uuid}?paused=paused|unpaused`
    pub async fn set_watch_paused(&self, uuid: &str, paused: bool) -> Result<Payload, Error> {
        let value = if paused { "paused" } else { "unpaused" };
        self.watch_flag(uuid, "paused", value).await
    }

    /// `GET /watch/{uuid}?muted=muted|unmuted`
    pub async fn set_watch_muted(&self, uuid: &str, muted: bool) -> Result<Payload, Error> {
        let value = if muted { "muted" } else { "unmuted" };
        self.watch_flag(uuid, "muted", value).await
    }

    async fn watch_flag(&self, uuid: &str, key: &str, value: &str) -> Result<Payload, Error> {
        self.fetch_payload(
            self.request(Method::GET, &format!("watch/{uuid}"))?
                .query(&[(key, value)]),
        )
        .await
    }

    /// `PUT /watch/{uuid}`
    pub async fn update_watch(
        &self,
        uuid: &str,
        body: &UpdateWatchRequest,
    ) -> Result<Payload, Error> {
        self.fetch_payload(
            self.request(Method::PUT, &format!("watch/{uuid}"))?
                .json(body),
        )
        .await
    }

    /// `DELETE /watch/{uuid}`
    pub async fn delete_watch(&self, uuid: &str) -> Result<(), Error> {
        self.fetch_empty(self.request(Method::DELETE, &format!("watch/{uuid}"))?)
            .await
    }

    // ── History ──────────────────────────────────────────────────────

    /// Snapshot timestamps mapped to their server-side locations.
    ///
    /// `GET /watch/{uuid}/history`
    pub async fn watch_history(&self, uuid: &str) -> Result<BTreeMap<String, String>, Error> {
        self.fetch(self.request(Method::GET, &format!("watch/{uuid}/history"))?)
            .await
    }

    /// One stored snapshot; `timestamp` may be `latest`.
    ///
    /// `GET /watch/{uuid}/history/{timestamp}[?html=1]`
    pub async fn watch_snapshot(
        &self,
        uuid: &str,
        timestamp: &str,
        html: bool,
    ) -> Result<Payload, Error> {
        let mut req = self.request(Method::GET, &format!("watch/{uuid}/history/{timestamp}"))?;
        if html {
            req = req.query(&[("html", "1")]);
        }
        self.fetch_payload(req).await
    }

    /// Difference between two snapshots; `from`/`to` accept timestamps or
    /// `previous`/`latest`.
    ///
    /// `GET /watch/{uuid}/difference/{from}/{to}`
    pub async fn watch_diff(
        &self,
        uuid: &str,
        from: &str,
        to: &str,
        options: &DiffOptions,
    ) -> Result<Payload, Error> {
        self.fetch_payload(
            self.request(
                Method::GET,
                &format!("watch/{uuid}/difference/{from}/{to}"),
            )?
            .query(&options.query()),
        )
        .await
    }

    /// `GET /watch/{uuid}/favicon`
    pub async fn watch_favicon(&self, uuid: &str) -> Result<Bytes, Error> {
        self.fetch_bytes(self.request(Method::GET, &format!("watch/{uuid}/favicon"))?)
            .await
    }
}
