// Global notification URL endpoints
//
// All three writes carry the same `{"notification_urls": [...]}` body.

use reqwest::Method;

use crate::client::{ChangeDetectionClient, Payload};
use crate::error::Error;
use crate::types::{NotificationUrls, NotificationUrlsBody};

impl ChangeDetectionClient {
    /// `GET /notifications`
    pub async fn get_notifications(&self) -> Result<Vec<String>, Error> {
        let urls: NotificationUrls = self
            .fetch(self.request(Method::GET, "notifications")?)
            .await?;
        Ok(urls.into())
    }

    /// Append URLs. `POST /notifications`
    pub async fn add_notifications(&self, urls: &[String]) -> Result<Payload, Error> {
        self.fetch_payload(
            self.request(Method::POST, "notifications")?
                .json(&NotificationUrlsBody {
                    notification_urls: urls,
                }),
        )
        .await
    }

    /// Replace the whole list. `PUT /notifications`
    pub async fn replace_notifications(&self, urls: &[String]) -> Result<Payload, Error> {
        self.fetch_payload(
            self.request(Method::PUT, "notifications")?
                .json(&NotificationUrlsBody {
                    notification_urls: urls,
                }),
        )
        .await
    }

    /// Remove the given URLs. `DELETE /notifications`
    pub async fn delete_notifications(&self, urls: &[String]) -> Result<(), Error> {
        self.fetch_empty(
            self.request(Method::DELETE, "notifications")?
                .json(&NotificationUrlsBody {
                    notification_urls: urls,
                }),
        )
        .await
    }
}
