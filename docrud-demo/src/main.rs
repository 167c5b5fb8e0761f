use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use docrud::{
    DocumentStoreClient,
    backend::{DynStoreBackend, StoreBackendBuilder},
    memory::InMemoryStore,
    mongodb::MongoDbStore,
};

mod script;

/// Runs a scripted tour of the CRUD operations against a product catalogue.
#[derive(Debug, Parser)]
#[command(name = "docrud-demo", version, about)]
struct Args {
    /// MongoDB host, with an optional port.
    #[arg(long, env = "MONGODB_HOST", default_value = "localhost:27017")]
    host: String,

    #[arg(long, env = "MONGODB_DATABASE", default_value = "docrud_demo")]
    database: String,

    #[arg(long, env = "MONGODB_COLLECTION", default_value = "products")]
    collection: String,

    /// Use the in-memory store instead of a MongoDB server.
    #[arg(long)]
    memory: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; the environment and flags still apply.
    dotenvy::dotenv().ok();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .init();

    let args = Args::parse();

    let backend: Box<dyn DynStoreBackend> = if args.memory {
        info!("using the in-memory store");
        Box::new(InMemoryStore::builder().build().await?)
    } else {
        let uri = format!("mongodb://{}/", args.host);
        info!(%uri, "using MongoDB");
        Box::new(
            MongoDbStore::builder(uri)
                .app_name("docrud-demo")
                .build()
                .await?,
        )
    };

    let client = DocumentStoreClient::connect(backend, &args.database, &args.collection).await?;

    let outcome = script::run(&client).await;
    client.close().await?;

    outcome
}
