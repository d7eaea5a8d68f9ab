//! Per-connection request handling.
//!
//! One request per connection. Pushes stream a pack until the client closes
//! its write half; the pack is spooled to a temp file before any object is
//! inserted so a truncated upload never reaches the ref update. A
//! `PUSH_BRANCH` is always answered with a [`PushStatus`].

use std::io::{BufReader, Seek, SeekFrom, Write};
use std::sync::Arc;

use fit_pack::{PackReader, UnpackSummary};
use fit_protocol::{FitCodec, PushStatus, Request};
use fit_refs::{validate_branch_name, RefStore};
use fit_store::{Commit, ObjectKind, ObjectStore};
use fit_types::ObjectId;
use tempfile::NamedTempFile;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::error::{ServerError, ServerResult};

/// Branch moved by the legacy `SEND_OBJECTS` command.
pub const LEGACY_BRANCH: &str = "main";

const SPOOL_CHUNK: usize = 64 * 1024;

/// What a handled connection did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Served {
    /// A pack was received. `updated` names the branch moved, if any.
    Received {
        objects: usize,
        updated: Option<(String, ObjectId)>,
    },
    /// A pack for `branch` was sent. `tip` is `None` for an unknown branch.
    Sent {
        branch: String,
        tip: Option<ObjectId>,
        objects: usize,
    },
}

/// Serves requests against one repository's object and ref stores.
#[derive(Clone)]
pub struct RepoService {
    store: Arc<dyn ObjectStore>,
    refs: Arc<dyn RefStore>,
    max_pack_size: u64,
}

impl RepoService {
    pub fn new(store: Arc<dyn ObjectStore>, refs: Arc<dyn RefStore>, max_pack_size: u64) -> Self {
        Self {
            store,
            refs,
            max_pack_size,
        }
    }

    /// Read one request from `stream` and answer it.
    pub async fn handle<S>(&self, stream: &mut S) -> ServerResult<Served>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let request = FitCodec::read_request(stream).await?;
        debug!(command = request.command().name(), "handling request");
        match request {
            Request::SendObjects => self.receive_legacy(stream).await,
            Request::RequestObjects { branch } => self.send_branch(stream, branch).await,
            Request::PushBranch { branch, tip } => {
                let result = self.receive_branch(stream, branch, tip).await;
                let status = match &result {
                    Ok(_) => PushStatus::Accepted,
                    Err(e) => PushStatus::Rejected(e.to_string()),
                };
                if let Err(e) = FitCodec::write_status(stream, &status).await {
                    warn!(error = %e, "could not send push status");
                }
                result
            }
        }
    }

    /// `SEND_OBJECTS`: store the pack, then move `main` to its first record
    /// when that record is a commit.
    async fn receive_legacy<S>(&self, stream: &mut S) -> ServerResult<Served>
    where
        S: AsyncRead + Unpin,
    {
        let mut spool = self.spool(stream).await?;
        let summary = self.unpack_spool(&mut spool)?;

        spool.as_file_mut().seek(SeekFrom::Start(0))?;
        let first = PackReader::first_record(BufReader::new(spool.as_file()))?;
        let updated = match first {
            Some(header) if header.kind == ObjectKind::Commit => {
                match Commit::read_from(self.store.as_ref(), &header.id) {
                    Ok(_) => {
                        self.refs.write_ref(LEGACY_BRANCH, &header.id)?;
                        info!(branch = LEGACY_BRANCH, tip = %header.id.short_hex(), "updated branch");
                        Some((LEGACY_BRANCH.to_string(), header.id))
                    }
                    Err(e) => {
                        warn!(error = %e, "first pack record is not a readable commit");
                        None
                    }
                }
            }
            _ => None,
        };

        Ok(Served::Received {
            objects: summary.objects(),
            updated,
        })
    }

    /// `PUSH_BRANCH`: store the pack, verify `tip` is a commit, move `branch`.
    async fn receive_branch<S>(
        &self,
        stream: &mut S,
        branch: String,
        tip: ObjectId,
    ) -> ServerResult<Served>
    where
        S: AsyncRead + Unpin,
    {
        validate_branch_name(&branch)?;
        let mut spool = self.spool(stream).await?;
        let summary = self.unpack_spool(&mut spool)?;

        Commit::read_from(self.store.as_ref(), &tip).map_err(|e| {
            ServerError::Rejected(format!("tip {} is not a commit: {e}", tip.short_hex()))
        })?;
        self.refs.write_ref(&branch, &tip)?;
        info!(branch = %branch, tip = %tip.short_hex(), "updated branch");

        Ok(Served::Received {
            objects: summary.objects(),
            updated: Some((branch, tip)),
        })
    }

    /// `REQUEST_OBJECTS`: answer with a pack of the branch's history. An
    /// unknown branch gets an empty pack.
    async fn send_branch<S>(&self, stream: &mut S, branch: String) -> ServerResult<Served>
    where
        S: AsyncWrite + Unpin,
    {
        let tip = self.refs.read_ref(&branch)?;
        let ids = match tip {
            Some(tip) => fit_dag::transfer_set(self.store.as_ref(), &tip)?,
            None => {
                debug!(branch = %branch, "unknown branch, sending empty pack");
                Vec::new()
            }
        };

        let mut pack = Vec::new();
        let summary = fit_pack::pack(self.store.as_ref(), &ids, &mut pack)?;
        stream.write_all(&pack).await?;
        stream.flush().await?;
        stream.shutdown().await?;

        Ok(Served::Sent {
            branch,
            tip,
            objects: summary.objects,
        })
    }

    /// Copy the rest of the stream into a temp file, enforcing the size limit.
    async fn spool<R>(&self, reader: &mut R) -> ServerResult<NamedTempFile>
    where
        R: AsyncRead + Unpin,
    {
        let mut spool = tempfile::Builder::new()
            .prefix(&format!("fit-recv-{}-", std::process::id()))
            .suffix(".pack")
            .tempfile()?;
        let mut buf = vec![0u8; SPOOL_CHUNK];
        let mut total = 0u64;
        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            total += n as u64;
            if total > self.max_pack_size {
                return Err(ServerError::PackTooLarge {
                    limit: self.max_pack_size,
                });
            }
            spool.write_all(&buf[..n])?;
        }
        spool.flush()?;
        debug!(bytes = total, path = %spool.path().display(), "spooled pack");
        Ok(spool)
    }

    fn unpack_spool(&self, spool: &mut NamedTempFile) -> ServerResult<UnpackSummary> {
        spool.as_file_mut().seek(SeekFrom::Start(0))?;
        Ok(fit_pack::unpack(
            self.store.as_ref(),
            BufReader::new(spool.as_file()),
        )?)
    }
}

impl std::fmt::Debug for RepoService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepoService")
            .field("max_pack_size", &self.max_pack_size)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fit_refs::InMemoryRefStore;
    use fit_store::{Blob, EntryMode, InMemoryObjectStore, Tree, TreeEntry};
    use tokio::io::duplex;

    struct Fixture {
        store: Arc<InMemoryObjectStore>,
        refs: Arc<InMemoryRefStore>,
        service: RepoService,
    }

    fn fixture(max_pack_size: u64) -> Fixture {
        let store = Arc::new(InMemoryObjectStore::new());
        let refs = Arc::new(InMemoryRefStore::new());
        let service = RepoService::new(store.clone(), refs.clone(), max_pack_size);
        Fixture {
            store,
            refs,
            service,
        }
    }

    /// Build a two-commit history in `store`; returns (tip, transfer set, blob).
    fn history(store: &dyn ObjectStore) -> (ObjectId, Vec<ObjectId>, ObjectId) {
        let blob = store
            .write(&Blob::new(b"hello\n".to_vec()).to_stored_object())
            .unwrap();
        let tree = Tree::new(vec![TreeEntry::new(EntryMode::Regular, "a.txt", blob)])
            .write_to(store)
            .unwrap();
        let first = Commit::new(tree, ObjectId::null(), "ann", 1, "one")
            .write_to(store)
            .unwrap();
        let second = Commit::new(tree, first, "ann", 2, "two")
            .write_to(store)
            .unwrap();
        (second, fit_dag::transfer_set(store, &second).unwrap(), blob)
    }

    fn pack_of(store: &dyn ObjectStore, ids: &[ObjectId]) -> Vec<u8> {
        let mut buf = Vec::new();
        fit_pack::pack(store, ids, &mut buf).unwrap();
        buf
    }

    async fn exchange(service: &RepoService, request: Vec<u8>) -> (ServerResult<Served>, Vec<u8>) {
        let (mut client, mut server) = duplex(1 << 20);
        client.write_all(&request).await.unwrap();
        client.shutdown().await.unwrap();
        let served = service.handle(&mut server).await;
        drop(server);
        let mut reply = Vec::new();
        client.read_to_end(&mut reply).await.unwrap();
        (served, reply)
    }

    /// Refs that refuse every write.
    #[derive(Default)]
    struct ReadOnlyRefs(InMemoryRefStore);

    impl RefStore for ReadOnlyRefs {
        fn read_ref(&self, branch: &str) -> fit_refs::Result<Option<ObjectId>> {
            self.0.read_ref(branch)
        }
        fn write_ref(&self, _branch: &str, _target: &ObjectId) -> fit_refs::Result<()> {
            Err(fit_refs::RefError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only ref store",
            )))
        }
        fn delete_ref(&self, branch: &str) -> fit_refs::Result<bool> {
            self.0.delete_ref(branch)
        }
        fn list_refs(&self) -> fit_refs::Result<Vec<fit_refs::Ref>> {
            self.0.list_refs()
        }
        fn head(&self) -> fit_refs::Result<Option<fit_refs::Head>> {
            self.0.head()
        }
        fn set_head(&self, branch: &str) -> fit_refs::Result<()> {
            self.0.set_head(branch)
        }
        fn set_head_detached(&self, target: &ObjectId) -> fit_refs::Result<()> {
            self.0.set_head_detached(target)
        }
    }

    fn with_pack(req: &Request, pack: &[u8]) -> Vec<u8> {
        let mut bytes = FitCodec::encode(req).unwrap();
        bytes.extend_from_slice(pack);
        bytes
    }

    #[tokio::test]
    async fn push_branch_updates_ref() {
        let src = InMemoryObjectStore::new();
        let (tip, ids, _) = history(&src);
        let fx = fixture(1 << 20);

        let req = Request::PushBranch {
            branch: "feature".into(),
            tip,
        };
        let (served, reply) = exchange(&fx.service, with_pack(&req, &pack_of(&src, &ids))).await;
        assert_eq!(
            served.unwrap(),
            Served::Received {
                objects: ids.len(),
                updated: Some(("feature".into(), tip)),
            }
        );
        assert_eq!(FitCodec::decode_status(&reply).unwrap(), PushStatus::Accepted);
        assert_eq!(fx.refs.read_ref("feature").unwrap(), Some(tip));
        for id in &ids {
            assert!(fx.store.exists(id).unwrap());
        }
    }

    #[tokio::test]
    async fn push_rejects_tip_that_is_not_a_commit() {
        let src = InMemoryObjectStore::new();
        let (_, ids, blob) = history(&src);
        let fx = fixture(1 << 20);

        let req = Request::PushBranch {
            branch: "main".into(),
            tip: blob,
        };
        let (served, reply) = exchange(&fx.service, with_pack(&req, &pack_of(&src, &ids))).await;
        assert!(matches!(served, Err(ServerError::Rejected(_))));
        assert!(matches!(
            FitCodec::decode_status(&reply).unwrap(),
            PushStatus::Rejected(reason) if reason.contains("not a commit")
        ));
        assert_eq!(fx.refs.read_ref("main").unwrap(), None);
    }

    #[tokio::test]
    async fn push_rejects_missing_tip() {
        let fx = fixture(1 << 20);
        let empty = pack_of(fx.store.as_ref(), &[]);
        let req = Request::PushBranch {
            branch: "main".into(),
            tip: ObjectId::digest(b"never sent"),
        };
        let (served, _) = exchange(&fx.service, with_pack(&req, &empty)).await;
        assert!(matches!(served, Err(ServerError::Rejected(_))));
    }

    #[tokio::test]
    async fn push_rejects_invalid_branch_name() {
        let fx = fixture(1 << 20);
        let req = Request::PushBranch {
            branch: "../escape".into(),
            tip: ObjectId::digest(b"x"),
        };
        let (served, _) = exchange(&fx.service, with_pack(&req, &[])).await;
        assert!(matches!(served, Err(ServerError::Ref(_))));
    }

    #[tokio::test]
    async fn oversized_pack_is_refused() {
        let src = InMemoryObjectStore::new();
        let (tip, ids, _) = history(&src);
        let fx = fixture(16);

        let req = Request::PushBranch {
            branch: "main".into(),
            tip,
        };
        let (served, reply) = exchange(&fx.service, with_pack(&req, &pack_of(&src, &ids))).await;
        assert!(matches!(served, Err(ServerError::PackTooLarge { limit: 16 })));
        assert!(!FitCodec::decode_status(&reply).unwrap().is_accepted());
        assert!(fx.store.is_empty());
        assert_eq!(fx.refs.read_ref("main").unwrap(), None);
    }

    #[tokio::test]
    async fn failed_ref_update_is_reported_to_client() {
        let src = InMemoryObjectStore::new();
        let (tip, ids, _) = history(&src);
        let store = Arc::new(InMemoryObjectStore::new());
        let service = RepoService::new(store, Arc::new(ReadOnlyRefs::default()), 1 << 20);

        let req = Request::PushBranch {
            branch: "main".into(),
            tip,
        };
        let (served, reply) = exchange(&service, with_pack(&req, &pack_of(&src, &ids))).await;
        assert!(matches!(served, Err(ServerError::Ref(_))));
        assert!(matches!(
            FitCodec::decode_status(&reply).unwrap(),
            PushStatus::Rejected(reason) if reason.contains("read-only")
        ));
    }

    #[tokio::test]
    async fn legacy_send_moves_main_to_first_commit() {
        let src = InMemoryObjectStore::new();
        let (tip, ids, _) = history(&src);
        let fx = fixture(1 << 20);

        let (served, _) =
            exchange(&fx.service, with_pack(&Request::SendObjects, &pack_of(&src, &ids))).await;
        assert_eq!(
            served.unwrap(),
            Served::Received {
                objects: ids.len(),
                updated: Some((LEGACY_BRANCH.into(), tip)),
            }
        );
        assert_eq!(fx.refs.read_ref("main").unwrap(), Some(tip));
    }

    #[tokio::test]
    async fn legacy_send_without_leading_commit_keeps_refs() {
        let src = InMemoryObjectStore::new();
        let (_, ids, blob) = history(&src);
        let fx = fixture(1 << 20);

        let (served, _) =
            exchange(&fx.service, with_pack(&Request::SendObjects, &pack_of(&src, &[blob]))).await;
        assert_eq!(
            served.unwrap(),
            Served::Received {
                objects: 1,
                updated: None,
            }
        );
        assert!(fx.refs.list_refs().unwrap().is_empty());
        assert!(fx.store.exists(&blob).unwrap());
    }

    #[tokio::test]
    async fn request_objects_streams_transfer_set() {
        let fx = fixture(1 << 20);
        let (tip, ids, _) = history(fx.store.as_ref());
        fx.refs.write_ref("main", &tip).unwrap();

        let req = FitCodec::encode(&Request::RequestObjects {
            branch: "main".into(),
        })
        .unwrap();
        let (served, reply) = exchange(&fx.service, req).await;
        assert_eq!(
            served.unwrap(),
            Served::Sent {
                branch: "main".into(),
                tip: Some(tip),
                objects: ids.len(),
            }
        );

        let received: Vec<ObjectId> = PackReader::new(reply.as_slice())
            .unwrap()
            .map(|r| r.unwrap().header.id)
            .collect();
        assert_eq!(received, ids);
        assert_eq!(received[0], tip);
    }

    #[tokio::test]
    async fn request_unknown_branch_gets_empty_pack() {
        let fx = fixture(1 << 20);
        let req = FitCodec::encode(&Request::RequestObjects {
            branch: "nope".into(),
        })
        .unwrap();
        let (served, reply) = exchange(&fx.service, req).await;
        assert!(matches!(served.unwrap(), Served::Sent { tip: None, objects: 0, .. }));
        assert_eq!(PackReader::new(reply.as_slice()).unwrap().declared_count(), 0);
    }

    #[tokio::test]
    async fn version_mismatch_is_an_error() {
        let fx = fixture(1 << 20);
        let (served, reply) = exchange(&fx.service, vec![9, 1]).await;
        assert!(matches!(served, Err(ServerError::Protocol(_))));
        assert!(reply.is_empty());
    }
}
