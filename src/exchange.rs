use std::io::Write;

use futures::StreamExt;
use mongodb::bson::{Bson, Document};

use crate::db_mongo::models::ExchangeRate;
use crate::error::StoreResult;
use crate::store::DocumentStore;

pub const DOCUMENT_PREFIX: &str = "Document: ";

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub inserted_id: String,
    pub printed: usize,
}

/// Insert the USD/MXN rate into `collection`, commit, and print every
/// document of the collection to `out`.
///
/// The store is closed before returning, on success and on failure alike.
/// If the run fails and closing fails too, the run's error wins.
pub async fn run<S, W>(store: &mut S, collection: &str, out: &mut W) -> StoreResult<RunSummary>
where
    S: DocumentStore + ?Sized,
    W: Write + ?Sized,
{
    let result = insert_and_print(store, collection, out).await;
    let closed = store.close().await;

    match (result, closed) {
        (Ok(summary), Ok(())) => Ok(summary),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(close_err)) => {
            tracing::warn!("Failed to close connection after error: {}", close_err);
            Err(e)
        }
    }
}

async fn insert_and_print<S, W>(
    store: &mut S,
    collection: &str,
    out: &mut W,
) -> StoreResult<RunSummary>
where
    S: DocumentStore + ?Sized,
    W: Write + ?Sized,
{
    store.ensure_collection(collection).await?;

    let document = ExchangeRate::usd_mxn().to_document()?;
    let inserted_id = store.insert_one(collection, document).await?;
    store.commit().await?;
    tracing::info!(collection, id = %inserted_id, "Inserted exchange rate");

    let mut cursor = store.find_all(collection).await?;
    let mut printed = 0;
    while let Some(document) = cursor.next().await {
        writeln!(out, "{}{}", DOCUMENT_PREFIX, render_content(document?))?;
        printed += 1;
    }
    out.flush()?;

    Ok(RunSummary {
        inserted_id,
        printed,
    })
}

/// Document content as relaxed extended JSON, without the store key
pub fn render_content(mut document: Document) -> String {
    document.remove("_id");
    Bson::Document(document).into_relaxed_extjson().to_string()
}
