use log::info;
use mongodb::bson::{Bson, Document, doc};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Database, IndexModel};

use crate::config::AppConfig;
use crate::models::news::{NEWS_COLLECTION, NewsPost};
use crate::models::newsletter::{NEWSLETTER_COLLECTION, NewsletterSubscription};
use crate::models::post::{Post, SECTION_COLLECTIONS};
use crate::models::user::{USERS_COLLECTION, UserProfile};

/// Connect to MongoDB and verify the server answers before serving traffic.
pub async fn get_database(config: &AppConfig) -> mongodb::error::Result<Database> {
    let mut options = ClientOptions::parse(&config.mongodb_uri).await?;
    options.app_name = Some("autograph".to_string());
    let client = Client::with_options(options)?;
    let db = client.database(&config.mongodb_database);

    db.run_command(doc! { "ping": 1 }).await?;
    info!("MongoDB connected, database '{}'", config.mongodb_database);
    Ok(db)
}

fn unique_on(field: &str) -> IndexModel {
    IndexModel::builder()
        .keys(doc! { field: 1 })
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

/// Unique constraints backing the content endpoints' conflict responses.
pub async fn ensure_content_indexes(db: &Database) -> mongodb::error::Result<()> {
    let news = db.collection::<NewsPost>(NEWS_COLLECTION);
    news.create_index(unique_on("title")).await?;
    news.create_index(unique_on("slug")).await?;

    db.collection::<NewsletterSubscription>(NEWSLETTER_COLLECTION)
        .create_index(unique_on("email"))
        .await?;

    for name in SECTION_COLLECTIONS {
        let posts = db.collection::<Post>(name);
        posts.create_index(unique_on("title")).await?;
        posts.create_index(unique_on("slug")).await?;
    }

    db.collection::<UserProfile>(USERS_COLLECTION)
        .create_index(unique_on("email"))
        .await?;

    info!(
        "Ensured unique indexes on news, newsletter, users and {} post sections",
        SECTION_COLLECTIONS.len()
    );
    Ok(())
}

/// Whether a write failed on a unique index.
pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};

    match &*err.kind {
        ErrorKind::Command(command) => command.code == 11000,
        ErrorKind::Write(WriteFailure::WriteError(write)) => write.code == 11000,
        _ => false,
    }
}

/// Reads a numeric aggregation output regardless of the BSON integer width
/// the server chose for it.
pub fn count_field(doc: &Document, key: &str) -> u64 {
    match doc.get(key) {
        Some(Bson::Int32(n)) => (*n).max(0) as u64,
        Some(Bson::Int64(n)) => (*n).max(0) as u64,
        Some(Bson::Double(n)) if *n > 0.0 => *n as u64,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_accept_any_numeric_width() {
        let counts = doc! { "a": 3_i32, "b": 5_i64, "c": 2.0, "d": -1_i32, "e": "x" };
        assert_eq!(count_field(&counts, "a"), 3);
        assert_eq!(count_field(&counts, "b"), 5);
        assert_eq!(count_field(&counts, "c"), 2);
        assert_eq!(count_field(&counts, "d"), 0);
        assert_eq!(count_field(&counts, "e"), 0);
        assert_eq!(count_field(&counts, "missing"), 0);
    }
}
