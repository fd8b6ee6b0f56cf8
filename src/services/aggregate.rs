use crate::models::{FailedEntry, PipelineResult, UploadOutcome};

/// Partition upload outcomes into succeeded ids and failure records, keeping input order.
pub fn aggregate(outcomes: Vec<UploadOutcome>) -> PipelineResult {
    let mut result = PipelineResult::default();

    for outcome in outcomes {
        match outcome {
            UploadOutcome::Success { remote_id } => result.succeeded.push(remote_id),
            UploadOutcome::Failure { entry_name, reason } => result.failed.push(FailedEntry {
                name: entry_name,
                reason,
            }),
        }
    }

    result
}
