//! Push, pull and fetch against a fit daemon.

use fit_pack::PackReader;
use fit_protocol::{FitCodec, PushStatus, Request};
use fit_refs::RefStore;
use fit_store::{Commit, ObjectKind, ObjectStore};
use fit_types::ObjectId;
use tracing::{info, warn};

use crate::error::{SyncError, SyncResult};
use crate::transport::Exchange;
use crate::types::{FetchResult, PullResult, PushResult, Remote};

/// Send the history of local `branch` and move the remote branch to its tip.
///
/// Succeeds only once the daemon confirms the branch moved.
pub async fn push(
    store: &dyn ObjectStore,
    refs: &dyn RefStore,
    remote: &Remote,
    branch: &str,
) -> SyncResult<PushResult> {
    let tip = refs
        .read_ref(branch)?
        .ok_or_else(|| SyncError::UnknownBranch(branch.to_string()))?;
    let ids = fit_dag::transfer_set(store, &tip)?;

    let mut pack = Vec::new();
    let summary = fit_pack::pack(store, &ids, &mut pack)?;

    let request = Request::PushBranch {
        branch: branch.to_string(),
        tip,
    };
    let reply = Exchange::connect(remote).await?.run(&request, &pack).await?;
    if reply.is_empty() {
        return Err(SyncError::NoAcknowledgement {
            remote: remote.to_string(),
        });
    }
    if let PushStatus::Rejected(reason) = FitCodec::decode_status(&reply)? {
        return Err(SyncError::Rejected {
            remote: remote.to_string(),
            reason,
        });
    }

    info!(remote = %remote, branch, tip = %tip.short_hex(), objects = summary.objects, "pushed");
    Ok(PushResult {
        branch: branch.to_string(),
        tip,
        objects_sent: summary.objects,
        bytes_transferred: pack.len() as u64,
    })
}

/// Send `ids` with the legacy `SEND_OBJECTS` command.
///
/// The daemon moves its `main` branch to the first object when that object
/// is a commit, so callers put the tip first.
pub async fn send_objects(
    store: &dyn ObjectStore,
    remote: &Remote,
    ids: &[ObjectId],
) -> SyncResult<usize> {
    let mut pack = Vec::new();
    let summary = fit_pack::pack(store, ids, &mut pack)?;
    Exchange::connect(remote)
        .await?
        .run(&Request::SendObjects, &pack)
        .await?;
    info!(remote = %remote, objects = summary.objects, "sent objects");
    Ok(summary.objects)
}

/// Download the history of remote `branch` into `store`. Refs are untouched.
pub async fn fetch(
    store: &dyn ObjectStore,
    remote: &Remote,
    branch: &str,
) -> SyncResult<FetchResult> {
    let request = Request::RequestObjects {
        branch: branch.to_string(),
    };
    let reply = Exchange::connect(remote).await?.run(&request, &[]).await?;

    let summary = fit_pack::unpack(store, reply.as_slice())?;
    let tip = match PackReader::first_record(reply.as_slice())? {
        None => None,
        Some(header) if header.kind == ObjectKind::Commit => summary.ids.first().copied(),
        Some(_) => return Err(SyncError::NotACommit),
    };
    if summary.mismatched > 0 {
        warn!(count = summary.mismatched, "remote sent objects under the wrong hash");
    }

    Ok(FetchResult {
        tip,
        objects_received: summary.objects(),
        mismatched: summary.mismatched,
        bytes_transferred: reply.len() as u64,
    })
}

/// Fetch remote `branch` and set the local branch of the same name to the
/// remote tip.
pub async fn pull(
    store: &dyn ObjectStore,
    refs: &dyn RefStore,
    remote: &Remote,
    branch: &str,
) -> SyncResult<PullResult> {
    fit_refs::validate_branch_name(branch)?;
    let fetched = fetch(store, remote, branch).await?;
    let tip = fetched.tip.ok_or_else(|| SyncError::RemoteBranchNotFound {
        remote: remote.to_string(),
        branch: branch.to_string(),
    })?;
    Commit::read_from(store, &tip)?;

    let previous = refs.read_ref(branch)?;
    refs.write_ref(branch, &tip)?;
    info!(
        remote = %remote,
        branch,
        tip = %tip.short_hex(),
        objects = fetched.objects_received,
        "pulled"
    );
    Ok(PullResult {
        branch: branch.to_string(),
        fetch: fetched,
        previous,
        tip,
    })
}
