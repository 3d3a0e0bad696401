//! Document-store lookup for playlist classification groups.
//!
//! Records live in a MongoDB collection, one document per classification
//! group, keyed by member playlist id under `members`. The store is reached
//! with `MONGO_*` environment credentials; an unreachable store at startup is
//! fatal before the polling loop starts.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use mongodb::bson::{doc, Document};
use mongodb::options::{ClientOptions, Credential, ServerAddress};
use mongodb::{Client, Collection};
use tracing::info;

use triage_core::config::StoreConfig;
use triage_core::model::ClassificationRecord;

/// The lookup surface the classifier consumes.
#[async_trait]
pub trait ClassificationLookup: Send + Sync {
    /// Find the record whose member set contains `playlist_id`. A missing
    /// record is a valid "unclassified" outcome, not an error.
    async fn find_record(&self, playlist_id: &str)
        -> anyhow::Result<Option<ClassificationRecord>>;
}

pub struct MongoStore {
    collection: Collection<ClassificationRecord>,
}

impl MongoStore {
    pub async fn connect(config: &StoreConfig) -> anyhow::Result<Self> {
        let user = required_env("MONGO_USER")?;
        let pass = required_env("MONGO_PASS")?;
        let host = required_env("MONGO_HOST")?;
        let port: u16 = required_env("MONGO_PORT")?
            .parse()
            .context("MONGO_PORT is not a valid port number")?;
        let db_name = required_env("MONGO_DB")?;

        let credential = Credential::builder().username(user).password(pass).build();
        let options = ClientOptions::builder()
            .hosts(vec![ServerAddress::Tcp {
                host: host.clone(),
                port: Some(port),
            }])
            .credential(credential)
            .server_selection_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build();

        let client = Client::with_options(options).context("invalid document store options")?;
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .context("document store unreachable")?;
        info!("connected to document store at {host}:{port}");

        Ok(Self {
            collection: client.database(&db_name).collection(&config.collection),
        })
    }
}

#[async_trait]
impl ClassificationLookup for MongoStore {
    async fn find_record(
        &self,
        playlist_id: &str,
    ) -> anyhow::Result<Option<ClassificationRecord>> {
        let mut filter = Document::new();
        filter.insert(format!("members.{playlist_id}"), doc! { "$exists": true });
        self.collection
            .find_one(filter)
            .await
            .context("classification lookup failed")
    }
}

fn required_env(name: &str) -> anyhow::Result<String> {
    std::env::var(name).with_context(|| format!("environment variable {name} is not set"))
}
