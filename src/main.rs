use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use petition_bot::audit;
use petition_bot::config::BotConfig;
use petition_bot::discord::RestClient;
use petition_bot::events::ReactionDispatcher;
use petition_bot::persistence::PetitionStore;
use petition_bot::server::{AppState, build_router};
use petition_bot::service::{PetitionEngineSubscriber, PetitionService};

const STORE_PATH: &str = "data/petitions.json";

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "petition_bot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = BotConfig::from_env().unwrap();
    let client = RestClient::from_env().unwrap();
    let store = PetitionStore::open(STORE_PATH).unwrap();

    let service = Arc::new(PetitionService::new(config, store, client));

    let mut dispatcher = ReactionDispatcher::new();
    dispatcher.subscribe(Arc::new(PetitionEngineSubscriber::new(Arc::clone(&service))));

    tokio::spawn(audit::staggered_startup(Arc::clone(&service)));

    let app = build_router(AppState {
        dispatcher: Arc::new(dispatcher),
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
