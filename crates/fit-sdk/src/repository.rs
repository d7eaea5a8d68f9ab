use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fit_dag::{GcOptions, GcReport, MAX_CHAIN_LENGTH};
use fit_index::{Index, IndexEntry};
use fit_refs::{validate_branch_name, FsRefStore, RefError, RefStore};
use fit_store::{Commit, LooseObjectStore, ObjectStore};
use fit_sync::{PullResult, PushResult, Remote};
use fit_types::{ObjectId, HASH_HEX_LEN};
use tracing::{debug, info};

use crate::commit::{BranchInfo, CheckoutTarget, CommitResult, LogEntry, RepoStatus};
use crate::config::RepoConfig;
use crate::error::{SdkError, SdkResult};
use crate::workdir;

/// Repository directory inside the working tree.
pub const FIT_DIR: &str = ".fit";
/// Branch HEAD names in a fresh repository.
pub const DEFAULT_BRANCH: &str = "main";
/// Shortest hex prefix accepted as a revision.
pub const MIN_PREFIX_LEN: usize = 4;
/// `log` limit when the caller has no preference.
pub const DEFAULT_LOG_LIMIT: usize = MAX_CHAIN_LENGTH;

const INDEX_FILE: &str = "index";
const CONFIG_FILE: &str = "config";
const GC_LOCK_FILE: &str = "gc.lock";

/// An on-disk fit repository: a working tree plus its `.fit` directory.
///
/// Every operation goes through the paths held here; nothing depends on the
/// process working directory.
pub struct Repository {
    workdir: PathBuf,
    fit_dir: PathBuf,
    config: RepoConfig,
    store: Arc<LooseObjectStore>,
    refs: Arc<FsRefStore>,
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("workdir", &self.workdir)
            .finish_non_exhaustive()
    }
}

impl Repository {
    /// Create `.fit` under `workdir` with HEAD on `main`, an empty index and
    /// a default config.
    pub fn init(workdir: impl AsRef<Path>) -> SdkResult<Self> {
        let workdir = workdir.as_ref();
        fs::create_dir_all(workdir)?;
        let workdir = workdir.canonicalize()?;
        let fit_dir = workdir.join(FIT_DIR);
        if fit_dir.exists() {
            return Err(SdkError::AlreadyInitialized(fit_dir));
        }

        let config = RepoConfig::default();
        let repo = Self::assemble(workdir, config)?;
        repo.store.init()?;
        repo.refs.init()?;
        repo.refs.set_head(DEFAULT_BRANCH)?;
        fs::write(repo.fit_dir.join(INDEX_FILE), b"")?;
        repo.config.save(&repo.fit_dir.join(CONFIG_FILE))?;
        info!(path = %repo.fit_dir.display(), "initialized repository");
        Ok(repo)
    }

    /// Open the repository whose working tree is `workdir`.
    pub fn open(workdir: impl AsRef<Path>) -> SdkResult<Self> {
        let workdir = workdir.as_ref();
        let fit_dir = workdir.join(FIT_DIR);
        if !fit_dir.is_dir() {
            return Err(SdkError::NotInitialized(workdir.to_path_buf()));
        }
        let config = RepoConfig::load(&fit_dir.join(CONFIG_FILE))?;
        Self::assemble(workdir.canonicalize()?, config)
    }

    /// Open the repository containing `start`, searching parent directories.
    pub fn discover(start: impl AsRef<Path>) -> SdkResult<Self> {
        let start = start.as_ref().canonicalize()?;
        let found = start.ancestors().find(|dir| dir.join(FIT_DIR).is_dir());
        match found {
            Some(dir) => Self::open(dir),
            None => Err(SdkError::NotInitialized(start)),
        }
    }

    fn assemble(workdir: PathBuf, config: RepoConfig) -> SdkResult<Self> {
        let fit_dir = workdir.join(FIT_DIR);
        let store = LooseObjectStore::new(fit_dir.join("objects"))
            .with_compression_level(config.core.compression_level);
        let refs = FsRefStore::new(&fit_dir);
        Ok(Self {
            workdir,
            fit_dir,
            config,
            store: Arc::new(store),
            refs: Arc::new(refs),
        })
    }

    // ---- Accessors ----

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn fit_dir(&self) -> &Path {
        &self.fit_dir
    }

    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<LooseObjectStore> {
        Arc::clone(&self.store)
    }

    pub fn refs(&self) -> Arc<FsRefStore> {
        Arc::clone(&self.refs)
    }

    /// Load the staging index.
    pub fn index(&self) -> SdkResult<Index> {
        let store: Arc<dyn ObjectStore> = self.store.clone();
        Ok(Index::load(self.fit_dir.join(INDEX_FILE), store)?)
    }

    /// Parse a remote address, using the configured default port.
    pub fn remote(&self, spec: &str) -> SdkResult<Remote> {
        Ok(Remote::parse_with_default(
            spec,
            self.config.remote.default_port,
        )?)
    }

    /// The commit HEAD resolves to, `None` before the first commit.
    pub fn head_commit(&self) -> SdkResult<Option<ObjectId>> {
        match self.refs.resolve_head() {
            Ok(id) => Ok(Some(id)),
            Err(RefError::NoCommits) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // ---- Staging and committing ----

    /// Stage files or directories (paths relative to the working tree).
    pub fn add<S: AsRef<str>>(&self, paths: &[S]) -> SdkResult<Vec<IndexEntry>> {
        let mut index = self.index()?;
        let mut staged = Vec::new();
        for path in paths {
            staged.extend(index.add(&self.workdir, path.as_ref())?);
        }
        Ok(staged)
    }

    /// Record the index as a new commit on top of HEAD.
    pub fn commit(&self, message: &str) -> SdkResult<CommitResult> {
        let index = self.index()?;
        self.commit_index(&index, message)
    }

    /// Stage every file in the working tree, then commit.
    pub fn snapshot(&self, message: &str) -> SdkResult<CommitResult> {
        let mut index = self.index()?;
        let tracked = index.add_all(&self.workdir)?;
        debug!(tracked, "snapshot staged working tree");
        self.commit_index(&index, message)
    }

    fn commit_index(&self, index: &Index, message: &str) -> SdkResult<CommitResult> {
        let tree = index.write_tree(self.config.core.tree_layout)?;
        let parent = self.head_commit()?;
        let commit = Commit::new(
            tree,
            parent.unwrap_or_else(ObjectId::null),
            self.config.author(),
            chrono::Utc::now().timestamp(),
            message,
        );
        let id = commit.write_to(self.store.as_ref())?;
        self.refs.update_head(&id)?;
        let branch = self.refs.current_branch()?;
        info!(id = %id.short_hex(), branch = ?branch, "committed");
        Ok(CommitResult {
            id,
            tree,
            parent,
            branch,
        })
    }

    // ---- History and status ----

    /// Up to `limit` commits from HEAD, newest first. Empty before the first
    /// commit.
    pub fn log(&self, limit: usize) -> SdkResult<Vec<LogEntry>> {
        let Some(head) = self.head_commit()? else {
            return Ok(Vec::new());
        };
        let chain = fit_dag::walk_chain(self.store.as_ref(), &head, limit)?;
        Ok(chain.into_iter().map(LogEntry::from).collect())
    }

    pub fn status(&self) -> SdkResult<RepoStatus> {
        let head = self.head_commit()?;
        let head_tree = match head {
            Some(id) => Some(Commit::read_from(self.store.as_ref(), &id)?.tree),
            None => None,
        };
        let changes = self.index()?.status(&self.workdir, head_tree.as_ref())?;
        Ok(RepoStatus {
            branch: self.refs.current_branch()?,
            head,
            changes,
        })
    }

    // ---- Branches ----

    pub fn branches(&self) -> SdkResult<Vec<BranchInfo>> {
        let current = self.refs.current_branch()?;
        Ok(self
            .refs
            .list_refs()?
            .into_iter()
            .map(|r| BranchInfo {
                current: current.as_deref() == Some(r.name.as_str()),
                name: r.name,
                target: r.target,
            })
            .collect())
    }

    /// Create branch `name` at the HEAD commit.
    pub fn create_branch(&self, name: &str) -> SdkResult<ObjectId> {
        validate_branch_name(name)?;
        if self.refs.read_ref(name)?.is_some() {
            return Err(SdkError::BranchExists(name.to_string()));
        }
        let head = self.head_commit()?.ok_or(SdkError::NoCommits)?;
        self.refs.write_ref(name, &head)?;
        info!(branch = name, target = %head.short_hex(), "created branch");
        Ok(head)
    }

    pub fn delete_branch(&self, name: &str) -> SdkResult<()> {
        if !self.refs.delete_ref(name)? {
            return Err(SdkError::BranchNotFound(name.to_string()));
        }
        Ok(())
    }

    // ---- Revisions, checkout and restore ----

    /// Resolve a branch name, full hash or unique hash prefix to a commit.
    pub fn resolve_revision(&self, spec: &str) -> SdkResult<ObjectId> {
        if validate_branch_name(spec).is_ok() {
            if let Some(id) = self.refs.read_ref(spec)? {
                return Ok(id);
            }
        }

        let is_hex = spec.len() >= MIN_PREFIX_LEN
            && spec.len() <= HASH_HEX_LEN
            && spec.chars().all(|c| c.is_ascii_hexdigit());
        if !is_hex {
            return Err(SdkError::UnknownRevision(spec.to_string()));
        }
        let prefix = spec.to_ascii_lowercase();
        let matches: Vec<ObjectId> = self
            .store
            .list()?
            .into_iter()
            .filter(|id| id.to_hex().starts_with(&prefix))
            .collect();
        let id = match matches.as_slice() {
            [] => return Err(SdkError::UnknownRevision(spec.to_string())),
            [id] => *id,
            _ => {
                return Err(SdkError::AmbiguousRevision {
                    prefix,
                    matches: matches.len(),
                })
            }
        };
        self.read_commit(&id)?;
        Ok(id)
    }

    fn read_commit(&self, id: &ObjectId) -> SdkResult<Commit> {
        match Commit::read_from(self.store.as_ref(), id) {
            Ok(commit) => Ok(commit),
            Err(fit_store::StoreError::CorruptObject { .. }) => Err(SdkError::NotACommit(id.to_hex())),
            Err(e) => Err(e.into()),
        }
    }

    /// Switch to a branch (symbolic HEAD) or a commit (detached HEAD) and
    /// update the working tree and index to match.
    ///
    /// Refuses to run over uncommitted changes to tracked files.
    pub fn checkout(&self, target: &str) -> SdkResult<CheckoutTarget> {
        let branch_tip = match validate_branch_name(target) {
            Ok(()) => self.refs.read_ref(target)?,
            Err(_) => None,
        };
        let result = match branch_tip {
            Some(commit) => CheckoutTarget::Branch {
                name: target.to_string(),
                commit,
            },
            None => CheckoutTarget::Detached {
                commit: self.resolve_revision(target)?,
            },
        };

        self.ensure_clean()?;
        self.switch_worktree(&result.commit())?;
        match &result {
            CheckoutTarget::Branch { name, .. } => self.refs.set_head(name)?,
            CheckoutTarget::Detached { commit } => self.refs.set_head_detached(commit)?,
        }
        info!(revision = target, commit = %result.commit().short_hex(), "checked out");
        Ok(result)
    }

    /// Write the files of a commit into the working tree. HEAD and the index
    /// are left alone. Returns the number of files written.
    pub fn restore(&self, revision: &str) -> SdkResult<usize> {
        let id = self.resolve_revision(revision)?;
        let commit = self.read_commit(&id)?;
        let written = workdir::write_tree(self.store.as_ref(), &commit.tree, &self.workdir)?;
        info!(commit = %id.short_hex(), files = written.len(), "restored");
        Ok(written.len())
    }

    fn ensure_clean(&self) -> SdkResult<()> {
        let pending = self.status()?.pending_changes();
        if pending > 0 {
            return Err(SdkError::DirtyWorkingTree(pending));
        }
        Ok(())
    }

    /// Make the working tree and index match `commit`, removing files that
    /// were tracked before but are absent from it.
    fn switch_worktree(&self, commit: &ObjectId) -> SdkResult<()> {
        let tree = self.read_commit(commit)?.tree;
        let mut index = self.index()?;
        let previous: Vec<String> = index.entries().iter().map(|e| e.path.clone()).collect();

        let written = workdir::write_tree(self.store.as_ref(), &tree, &self.workdir)?;
        let kept: HashSet<&str> = written.iter().map(|e| e.path.as_str()).collect();
        for path in previous.iter().filter(|p| !kept.contains(p.as_str())) {
            workdir::remove_file(&self.workdir, path)?;
        }

        index.read_tree(&tree)?;
        index.save()?;
        Ok(())
    }

    // ---- Maintenance ----

    /// Delete objects unreachable from any branch or a detached HEAD.
    ///
    /// Holds `.fit/gc.lock` for the duration; a concurrent run fails with
    /// [`SdkError::Locked`].
    pub fn gc(&self, options: GcOptions) -> SdkResult<GcReport> {
        let _lock = GcLock::acquire(self.fit_dir.join(GC_LOCK_FILE))?;
        Ok(fit_dag::collect_garbage(
            self.store.as_ref(),
            self.refs.as_ref(),
            options,
        )?)
    }

    // ---- Remotes ----

    /// Push local `branch` to the daemon at `remote`.
    pub async fn push(&self, remote: &Remote, branch: &str) -> SdkResult<PushResult> {
        Ok(fit_sync::push(self.store.as_ref(), self.refs.as_ref(), remote, branch).await?)
    }

    /// Pull `branch` from `remote`. When it is the checked-out branch the
    /// working tree follows, which requires no uncommitted changes.
    pub async fn pull(&self, remote: &Remote, branch: &str) -> SdkResult<PullResult> {
        let is_current = self.refs.current_branch()?.as_deref() == Some(branch);
        if is_current {
            self.ensure_clean()?;
        }
        let result = fit_sync::pull(self.store.as_ref(), self.refs.as_ref(), remote, branch).await?;
        if is_current && !result.up_to_date() {
            self.switch_worktree(&result.tip)?;
        }
        Ok(result)
    }

    /// Create a repository at `dir`, pull `branch` from `remote` and check it
    /// out. The new `.fit` directory is removed if the pull fails.
    pub async fn clone_from(remote: &Remote, branch: &str, dir: impl AsRef<Path>) -> SdkResult<Self> {
        let repo = Self::init(dir)?;
        if let Err(e) = repo.pull(remote, branch).await {
            fs::remove_dir_all(&repo.fit_dir)?;
            return Err(e);
        }
        repo.refs.set_head(branch)?;
        let tip = repo.head_commit()?.ok_or(SdkError::NoCommits)?;
        repo.switch_worktree(&tip)?;
        info!(remote = %remote, branch, path = %repo.workdir.display(), "cloned");
        Ok(repo)
    }
}

/// Exclusive `gc.lock`, removed on drop.
struct GcLock {
    path: PathBuf,
}

impl GcLock {
    fn acquire(path: PathBuf) -> SdkResult<Self> {
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                writeln!(file, "{}", std::process::id())?;
                Ok(Self { path })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Err(SdkError::Locked(path)),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for GcLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
