use super::client::{CreateOutcome, DeleteOutcome, TypesenseClient};
use super::error::SearchError;
use crate::models::CollectionSchema;
use log::{info, warn};

/// Recreate the collection from `schema`.
///
/// The delete is best-effort: an absent collection is expected and any other failure
/// is only logged. Creation must succeed (or report that the collection already
/// exists); everything else is returned and aborts the run.
pub async fn provision(
    client: &TypesenseClient,
    schema: &CollectionSchema,
) -> Result<CreateOutcome, SearchError> {
    match client.delete_collection(&schema.name).await {
        Ok(DeleteOutcome::Deleted) => {
            info!("provision: deleted existing collection '{}'", schema.name)
        }
        Ok(DeleteOutcome::Absent) => {
            info!("provision: no existing collection '{}' to delete", schema.name)
        }
        Err(err) => warn!(
            "provision: could not delete collection '{}': {err}",
            schema.name
        ),
    }

    let outcome = client.create_collection(schema).await?;
    match outcome {
        CreateOutcome::Created => info!(
            "provision: created collection '{}' sorted by '{}'",
            schema.name, schema.default_sort_field
        ),
        CreateOutcome::AlreadyExists => {
            info!("provision: collection '{}' already exists", schema.name)
        }
    }
    Ok(outcome)
}

/// Pre-run drop requested from the command line. Every outcome is logged only.
pub async fn drop_collection(client: &TypesenseClient, name: &str) {
    match client.delete_collection(name).await {
        Ok(DeleteOutcome::Deleted) => info!("provision: dropped collection '{name}'"),
        Ok(DeleteOutcome::Absent) => info!("provision: collection '{name}' does not exist"),
        Err(err) => warn!("provision: failed to drop collection '{name}': {err}"),
    }
}
