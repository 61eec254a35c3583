//! HTTP surface of the store.

pub mod error;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use decentral_store::{AnchorContext, MetadataService};
use rocket::data::ByteUnit;
use rocket::fairing::AdHoc;
use rocket::{routes, Build, Rocket};
use tokio_util::sync::CancellationToken;
use tracing::info;

pub struct AppState {
    pub service: Arc<MetadataService>,
    pub anchor_timeout: Duration,
    pub max_upload: ByteUnit,
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(service: MetadataService, anchor_timeout: Duration, max_upload: ByteUnit) -> Self {
        Self {
            service: Arc::new(service),
            anchor_timeout,
            max_upload,
            shutdown: CancellationToken::new(),
        }
    }

    /// Bounds for one request's anchor wait. Server shutdown cancels it.
    pub fn anchor_context(&self) -> AnchorContext {
        AnchorContext::with_timeout(self.anchor_timeout).with_cancellation(self.shutdown.child_token())
    }
}

pub fn build(state: AppState) -> Rocket<Build> {
    let shutdown = state.shutdown.clone();
    rocket::build()
        .manage(state)
        .mount(
            "/",
            routes![
                routes::health,
                routes::upload,
                routes::list,
                routes::download,
                routes::remove,
                routes::provenance,
            ],
        )
        .attach(AdHoc::on_shutdown("Cancel anchor waits", move |_| {
            Box::pin(async move {
                info!("shutting down, cancelling pending anchor waits");
                shutdown.cancel();
            })
        }))
}
