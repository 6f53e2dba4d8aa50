//! Demo binary: connect to a daemon and watch peer/order traffic.
//!
//! Usage: `bazaar-demo <host> <port>`

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bazaar_connector::{Connector, ConnectorEvent};

fn summarize(payload: &serde_json::Value) -> String {
    let text = payload.to_string();
    if text.chars().count() > 100 {
        let prefix: String = text.chars().take(100).collect();
        format!("{prefix}...")
    } else {
        text
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bazaar_connector=debug,bazaar_demo=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(host), Some(port)) = (args.next(), args.next()) else {
        eprintln!("Usage: bazaar-demo <host> <port>");
        std::process::exit(1);
    };
    let Ok(port) = port.parse::<u16>() else {
        eprintln!("Usage: bazaar-demo <host> <port> (port must be numeric)");
        std::process::exit(1);
    };

    let connector = Connector::new(&host, port);
    tracing::info!("connecting to {}", connector.url());

    connector.on_event(|event| match event {
        ConnectorEvent::Connected => tracing::info!("socket connected"),
        ConnectorEvent::Reconnected => tracing::info!("socket reconnected"),
        ConnectorEvent::Disconnected => tracing::info!("socket disconnected"),
        ConnectorEvent::Error(message) => tracing::error!("socket error: {}", message),
        ConnectorEvent::Data(payload) => tracing::debug!("raw data: {}", summarize(&payload)),
    });

    connector.subscribe("peers", None, |payload| {
        tracing::info!("peers update: {}", summarize(&payload));
    });

    connector
        .send_command(
            "peers",
            None,
            Some(Box::new(|payload| {
                tracing::info!("got peers once: {}", summarize(&payload));
            })),
        )
        .send_command(
            "peers",
            None,
            Some(Box::new(|payload| {
                tracing::info!("got peers again: {}", summarize(&payload));
            })),
        )
        .send_command(
            "check_order_count",
            None,
            Some(Box::new(|payload| {
                tracing::info!("order count: {}", summarize(&payload));
            })),
        )
        .send_command(
            "check_inbox_count",
            None,
            Some(Box::new(|payload| {
                tracing::info!("inbox count: {}", summarize(&payload));
            })),
        );

    connector.connect();

    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("shutting down");
        connector.disconnect();
    }
}
