use std::{io, net::SocketAddr, sync::Arc};

use axum::{http::Request, Router};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::{config::ApplicationSettings, store::Database};

mod account;
pub mod error;
mod health;
mod mailing_list;
mod subscription;

#[derive(Clone)]
pub struct AppState {
    db: Arc<dyn Database>,
}

fn app_router() -> Router<AppState> {
    health::router()
        .merge(mailing_list::router())
        .merge(account::router())
        .merge(subscription::router())
}

pub struct App {
    listener: TcpListener,
    addr: SocketAddr,
}

impl App {
    pub async fn with(config: &ApplicationSettings) -> io::Result<Self> {
        let listener = TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;
        let addr = listener.local_addr()?;

        Ok(Self { listener, addr })
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub async fn serve(self, db: Arc<dyn Database>) -> Result<(), io::Error> {
        let app = app_router().with_state(AppState { db }).layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                let id = uuid::Uuid::new_v4();
                tracing::info_span!(
                    "request",
                    method = ?request.method(),
                    uri = ?request.uri(),
                    %id,
                )
            }),
        );

        tracing::info!(addr = %self.addr, "serving mailing list membership");
        axum::serve(self.listener, app.into_make_service()).await
    }
}
