//! Collaborator implementations over the control API.

use http::Method;
use serde::Serialize;
use urlencoding::encode;

use standby_core::{
    DatabaseControl, EndpointDescriptor, NotificationSink, ProviderError, ProviderFuture,
    RoutingControl, WeightedRecord,
};

use crate::client::ControlApiClient;

#[derive(Serialize)]
struct PromoteRequest {
    backup_retention_days: u32,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    action: &'static str,
    records: &'a [WeightedRecord],
}

#[derive(Serialize)]
struct PublishRequest<'a> {
    subject: &'a str,
    body: &'a str,
}

fn to_json<T: Serialize>(value: &T) -> Result<Vec<u8>, ProviderError> {
    serde_json::to_vec(value)
        .map_err(|e| ProviderError::rejected(format!("failed to encode request: {e}")))
}

impl DatabaseControl for ControlApiClient {
    fn describe<'a>(&'a self, endpoint_id: &'a str) -> ProviderFuture<'a, EndpointDescriptor> {
        Box::pin(async move {
            let path = format!("/v1/instances/{}", encode(endpoint_id));
            let body = self.send(Method::GET, &path, None).await?;
            serde_json::from_slice(&body).map_err(|e| {
                ProviderError::rejected(format!("malformed descriptor for {endpoint_id}: {e}"))
            })
        })
    }

    fn promote<'a>(
        &'a self,
        endpoint_id: &'a str,
        backup_retention_days: u32,
    ) -> ProviderFuture<'a, ()> {
        Box::pin(async move {
            let path = format!("/v1/instances/{}/promote", encode(endpoint_id));
            let body = to_json(&PromoteRequest {
                backup_retention_days,
            })?;
            self.send(Method::POST, &path, Some(body)).await?;
            Ok(())
        })
    }
}

impl RoutingControl for ControlApiClient {
    fn upsert_weighted_records<'a>(
        &'a self,
        record_name: &'a str,
        records: &'a [WeightedRecord],
    ) -> ProviderFuture<'a, ()> {
        Box::pin(async move {
            let path = format!("/v1/records/{}/batch", encode(record_name));
            let body = to_json(&UpsertRequest {
                action: "UPSERT",
                records,
            })?;
            self.send(Method::POST, &path, Some(body)).await?;
            Ok(())
        })
    }
}

impl NotificationSink for ControlApiClient {
    fn publish<'a>(
        &'a self,
        topic: &'a str,
        subject: &'a str,
        body: &'a str,
    ) -> ProviderFuture<'a, ()> {
        Box::pin(async move {
            let path = format!("/v1/topics/{}/messages", encode(topic));
            let payload = to_json(&PublishRequest { subject, body })?;
            self.send(Method::POST, &path, Some(payload)).await?;
            Ok(())
        })
    }
}
