use std::sync::Arc;

use env_logger::Env;
use log::{error, info};

use guestbook::config::Config;
use guestbook::schema::{build_schema, SharedStore};
use guestbook::server;
use guestbook::store::InMemoryStore;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let store: SharedStore = if config.seed_welcome {
        Arc::new(InMemoryStore::seeded())
    } else {
        Arc::new(InMemoryStore::new())
    };
    let schema = build_schema(store);

    let addr = config.socket_addr();
    info!("HTTP ready at http://{}/{}", addr, server::GRAPHQL_PATH);
    info!("WS ready at ws://{}/{}", addr, server::GRAPHQL_PATH);

    warp::serve(server::routes(schema)).run(addr).await;
}
