pub mod models;
pub mod queries;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use mongodb::{
    Client, ClientSession, Collection, Database,
    bson::{Document, doc},
    options::{Acknowledgment, ClientOptions, CollectionOptions, WriteConcern},
};

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::store::{DocumentCursor, DocumentStore, id_to_string};

const APP_NAME: &str = "rate-store";

/// Create MongoDB connection
pub async fn create_client(config: &StoreConfig) -> StoreResult<Client> {
    let mut options = ClientOptions::parse(config.dsn.as_str()).await?;
    options.app_name = Some(APP_NAME.to_string());
    apply_credentials(&mut options, config);

    let client = Client::with_options(options)?;

    // Ping to verify connection and credentials
    let ping = client
        .database("admin")
        .run_command(doc! { "ping": 1 })
        .await;
    if let Err(e) = ping {
        client.shutdown().await;
        return Err(e.into());
    }

    tracing::info!("Successfully connected to MongoDB");
    Ok(client)
}

/// Set username and password from the config on top of whatever credential
/// the descriptor carried. `authSource` from the descriptor survives unless
/// the config names one.
fn apply_credentials(options: &mut ClientOptions, config: &StoreConfig) {
    let mut credential = options.credential.take().unwrap_or_default();
    credential.username = Some(config.username.clone());
    credential.password = Some(config.password.clone());
    if let Some(source) = &config.auth_source {
        credential.source = Some(source.clone());
    }
    options.credential = Some(credential);
}

/// Whether a `hello` reply comes from a deployment that runs transactions:
/// a replica set member or a mongos router.
pub fn supports_transactions(hello: &Document) -> bool {
    hello.get_str("setName").is_ok() || hello.get_str("msg").is_ok_and(|m| m == "isdbgrid")
}

/// Every acknowledged write is on a majority of nodes and in the journal
fn durable_write_concern() -> WriteConcern {
    let mut concern = WriteConcern::default();
    concern.w = Some(Acknowledgment::Majority);
    concern.journal = Some(true);
    concern
}

/// Document store backed by a MongoDB-compatible server.
pub struct MongoStore {
    client: Option<Client>,
    database: Database,
    transactions: bool,
    session: Option<ClientSession>,
}

impl MongoStore {
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let client = create_client(config).await?;

        let hello = match client.database("admin").run_command(doc! { "hello": 1 }).await {
            Ok(hello) => hello,
            Err(e) => {
                client.shutdown().await;
                return Err(e.into());
            }
        };

        if config.transactions && !supports_transactions(&hello) {
            client.shutdown().await;
            return Err(StoreError::Unsupported(
                "transactional commits need a replica set or sharded cluster".to_string(),
            ));
        }

        tracing::info!(
            database = %config.database,
            transactions = config.transactions,
            "Opened document store"
        );

        Ok(Self {
            database: client.database(&config.database),
            client: Some(client),
            transactions: config.transactions,
            session: None,
        })
    }

    fn client(&self) -> StoreResult<&Client> {
        self.client.as_ref().ok_or(StoreError::Closed)
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        if self.transactions {
            // Write concern is set on the transaction, not the operation
            return self.database.collection(name);
        }
        let mut options = CollectionOptions::default();
        options.write_concern = Some(durable_write_concern());
        self.database.collection_with_options(name, options)
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn ensure_collection(&mut self, name: &str) -> StoreResult<()> {
        self.client()?;
        if queries::ensure_collection(&self.database, name).await? {
            tracing::info!(collection = name, "Created collection");
        } else {
            tracing::debug!(collection = name, "Collection already exists");
        }
        Ok(())
    }

    async fn insert_one(&mut self, collection: &str, document: Document) -> StoreResult<String> {
        let client = self.client()?.clone();
        let target = self.collection(collection);

        if self.transactions && self.session.is_none() {
            let mut session = client.start_session().await?;
            session.start_transaction().await?;
            self.session = Some(session);
        }
        let inserted_id =
            queries::insert_document(&target, document, self.session.as_mut()).await?;

        let id = id_to_string(&inserted_id);
        tracing::debug!(collection, id = %id, "Inserted document");
        Ok(id)
    }

    async fn commit(&mut self) -> StoreResult<()> {
        self.client()?;
        match self.session.take() {
            Some(mut session) => {
                session.commit_transaction().await?;
                tracing::info!("Committed transaction");
            }
            None => tracing::debug!("Nothing pending to commit"),
        }
        Ok(())
    }

    async fn find_all(&mut self, collection: &str) -> StoreResult<DocumentCursor> {
        self.client()?;
        let cursor = queries::find_all(&self.collection(collection)).await?;
        Ok(cursor.map_err(StoreError::from).boxed())
    }

    async fn close(&mut self) -> StoreResult<()> {
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.abort_transaction().await {
                tracing::warn!("Failed to abort open transaction: {}", e);
            }
        }
        if let Some(client) = self.client.take() {
            client.shutdown().await;
            tracing::info!("Disconnected from MongoDB");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replica_set_supports_transactions() {
        let hello = doc! { "isWritablePrimary": true, "setName": "rs0", "maxWireVersion": 21 };
        assert!(supports_transactions(&hello));
    }

    #[test]
    fn test_mongos_supports_transactions() {
        let hello = doc! { "isWritablePrimary": true, "msg": "isdbgrid" };
        assert!(supports_transactions(&hello));
    }

    #[test]
    fn test_standalone_lacks_transactions() {
        let hello = doc! { "isWritablePrimary": true, "maxWireVersion": 21 };
        assert!(!supports_transactions(&hello));
    }

    fn config_for(dsn: &str, auth_source: Option<&str>) -> StoreConfig {
        StoreConfig {
            username: "rates".to_string(),
            password: "s3cret".to_string(),
            dsn: dsn.to_string(),
            database: "rates".to_string(),
            collection: "exchange_rate".to_string(),
            auth_source: auth_source.map(str::to_string),
            transactions: false,
        }
    }

    async fn credential_for(config: &StoreConfig) -> mongodb::options::Credential {
        let mut options = ClientOptions::parse(config.dsn.as_str()).await.unwrap();
        apply_credentials(&mut options, config);
        options.credential.unwrap()
    }

    #[tokio::test]
    async fn test_descriptor_auth_source_is_kept() {
        let config = config_for("mongodb://u:p@localhost:27017/?authSource=fx", None);
        let credential = credential_for(&config).await;
        assert_eq!(credential.source.as_deref(), Some("fx"));
        assert_eq!(credential.username.as_deref(), Some("rates"));
        assert_eq!(credential.password.as_deref(), Some("s3cret"));
    }

    #[tokio::test]
    async fn test_configured_auth_source_wins() {
        let config = config_for("mongodb://u:p@localhost:27017/?authSource=fx", Some("ops"));
        let credential = credential_for(&config).await;
        assert_eq!(credential.source.as_deref(), Some("ops"));
    }

    #[tokio::test]
    async fn test_credentials_added_to_bare_descriptor() {
        let config = config_for("mongodb://localhost:27017", None);
        let credential = credential_for(&config).await;
        assert_eq!(credential.username.as_deref(), Some("rates"));
        assert_eq!(credential.source, None);
    }

    #[tokio::test]
    async fn test_unreachable_server_fails_fast() {
        let config = config_for("mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=200", None);
        let result = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            MongoStore::connect(&config),
        )
        .await
        .expect("failed connect should release the client without hanging");
        assert!(matches!(result, Err(StoreError::Driver(_))));
    }

    #[test]
    fn test_durable_write_concern() {
        let concern = durable_write_concern();
        assert_eq!(concern.w, Some(Acknowledgment::Majority));
        assert_eq!(concern.journal, Some(true));
    }

    /// Needs a reachable server: DB_USER, DB_PASS and DB_URL_PODMAN must be set.
    #[tokio::test]
    #[ignore]
    async fn test_live_round_trip() {
        use crate::db_mongo::models::{ExchangeRate, is_exchange_rate_shape};

        dotenvy::dotenv().ok();
        let mut config = StoreConfig::from_env().unwrap();
        config.collection = format!("exchange_rate_test_{}", uuid::Uuid::new_v4().simple());

        let mut store = MongoStore::connect(&config).await.unwrap();
        store.ensure_collection(&config.collection).await.unwrap();
        store.ensure_collection(&config.collection).await.unwrap();
        let document = ExchangeRate::usd_mxn().to_document().unwrap();
        store.insert_one(&config.collection, document).await.unwrap();
        store.commit().await.unwrap();

        let docs: Vec<Document> = store
            .find_all(&config.collection)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert!(is_exchange_rate_shape(&docs[0]));

        store.database.collection::<Document>(&config.collection).drop().await.unwrap();
        store.close().await.unwrap();
    }
}
