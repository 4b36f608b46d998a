//! Status writes with compare-and-swap retry

use tracing::warn;

use super::error::ControllerError;
use crate::api::{ComponentDetectionQuery, ComponentDetectionQueryStatus};
use crate::cluster::CdqStore;

/// Result of a status update
#[derive(Debug)]
pub enum StatusWrite {
    Written(ComponentDetectionQuery),
    /// The mutation found nothing to change
    Unchanged(ComponentDetectionQuery),
    /// The CDQ no longer exists or is being deleted
    Gone,
}

/// Read-modify-write the status of `namespace/name`.
///
/// `mutate` returns `false` when the current status already holds what it
/// would write; nothing is written then. Conflicts re-read the object and
/// retry up to `attempts` times.
pub async fn update_status<F>(
    store: &dyn CdqStore,
    namespace: &str,
    name: &str,
    attempts: u32,
    mutate: F,
) -> Result<StatusWrite, ControllerError>
where
    F: Fn(&mut ComponentDetectionQueryStatus) -> bool,
{
    for attempt in 1..=attempts.max(1) {
        let Some(current) = store.get(namespace, name).await? else {
            return Ok(StatusWrite::Gone);
        };
        if current.is_being_deleted() {
            return Ok(StatusWrite::Gone);
        }

        let mut status = current.status.clone().unwrap_or_default();
        if !mutate(&mut status) {
            return Ok(StatusWrite::Unchanged(current));
        }

        let mut desired = current;
        desired.status = Some(status);
        match store.replace_status(&desired).await {
            Ok(updated) => return Ok(StatusWrite::Written(updated)),
            Err(err) if err.is_conflict() => {
                warn!(namespace, name, attempt, "Status update conflicted, retrying");
            }
            Err(err) => return Err(err.into()),
        }
    }

    Err(ControllerError::ConflictRetriesExhausted(
        format!("{namespace}/{name}"),
        attempts,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{CdqCondition, ComponentDetectionQuerySpec};
    use crate::cluster::InMemoryCluster;

    fn add_processing(status: &mut ComponentDetectionQueryStatus) -> bool {
        if status.conditions.iter().any(|c| c.type_ == "Processing") {
            return false;
        }
        status.conditions.push(CdqCondition::processing(1));
        true
    }

    #[tokio::test]
    async fn test_retries_through_conflicts() {
        let cluster = InMemoryCluster::new();
        cluster.create_cdq("ns", "q", ComponentDetectionQuerySpec::default());
        cluster.inject_status_conflicts(2);

        let result = update_status(&cluster, "ns", "q", 3, add_processing).await.unwrap();
        assert!(matches!(result, StatusWrite::Written(_)));
        assert_eq!(cluster.status_writes(), 1);

        let again = update_status(&cluster, "ns", "q", 3, add_processing).await.unwrap();
        assert!(matches!(again, StatusWrite::Unchanged(_)));
        assert_eq!(cluster.status_writes(), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_attempts() {
        let cluster = InMemoryCluster::new();
        cluster.create_cdq("ns", "q", ComponentDetectionQuerySpec::default());
        cluster.inject_status_conflicts(5);

        let err = update_status(&cluster, "ns", "q", 2, add_processing).await.unwrap_err();
        assert!(matches!(err, ControllerError::ConflictRetriesExhausted(_, 2)));
    }

    #[tokio::test]
    async fn test_missing_or_deleting_is_gone() {
        let cluster = InMemoryCluster::new();
        assert!(matches!(
            update_status(&cluster, "ns", "q", 1, add_processing).await.unwrap(),
            StatusWrite::Gone
        ));

        cluster.create_cdq("ns", "q", ComponentDetectionQuerySpec::default());
        cluster.mark_deleting("ns", "q");
        assert!(matches!(
            update_status(&cluster, "ns", "q", 1, add_processing).await.unwrap(),
            StatusWrite::Gone
        ));
    }
}
