use std::ops::Deref;
use std::sync::Arc;

use gvc_refs::{names, InMemoryRefStore, RefStore, RefValue};
use gvc_store::{InMemoryObjectStore, ObjectStore, ObjectStoreExt, RevTree};
use tracing::info;

use crate::config::RepositoryConfig;
use crate::context::RepoContext;
use crate::error::{RepoError, RepoResult};
use crate::transaction::Transaction;

/// A GVC repository: an object store and its refs. Everything else,
/// including the conflicts of an interrupted merge, is reachable from them.
///
/// All operations come from [`RepoContext`] through `Deref`.
pub struct Repository {
    ctx: RepoContext,
    reinitialized: bool,
}

impl Repository {
    /// Initialize a repository over `store` and `refs`.
    ///
    /// `HEAD` is pointed at the (still unborn) default branch and both the
    /// working tree and staging area start out empty. Running it on an
    /// initialized repository changes nothing and sets
    /// [`reinitialized`](Self::reinitialized).
    pub fn init(
        store: Arc<dyn ObjectStore>,
        refs: Arc<dyn RefStore>,
        config: RepositoryConfig,
    ) -> RepoResult<Self> {
        if refs.read(names::HEAD)?.is_some() {
            info!("repository reinitialized");
            return Ok(Self {
                ctx: RepoContext::new(store, refs, config),
                reinitialized: true,
            });
        }

        names::validate_branch_name(&config.default_branch)?;
        let empty = store.put_tree(&RevTree::empty())?;
        refs.compare_and_swap(
            names::HEAD,
            None,
            Some(RefValue::Symbolic(names::branch_ref(&config.default_branch))),
        )?;
        for head in [names::WORK_HEAD, names::STAGE_HEAD] {
            refs.compare_and_swap(head, None, Some(RefValue::Direct(empty)))?;
        }
        info!(branch = %config.default_branch, "repository initialized");
        Ok(Self {
            ctx: RepoContext::new(store, refs, config),
            reinitialized: false,
        })
    }

    /// Open an initialized repository.
    pub fn open(
        store: Arc<dyn ObjectStore>,
        refs: Arc<dyn RefStore>,
        config: RepositoryConfig,
    ) -> RepoResult<Self> {
        if refs.read(names::HEAD)?.is_none() {
            return Err(RepoError::NotInitialized);
        }
        Ok(Self {
            ctx: RepoContext::new(store, refs, config),
            reinitialized: false,
        })
    }

    /// A fresh repository held entirely in memory.
    pub fn in_memory(config: RepositoryConfig) -> RepoResult<Self> {
        Self::init(
            Arc::new(InMemoryObjectStore::new()),
            Arc::new(InMemoryRefStore::new()),
            config,
        )
    }

    pub fn reinitialized(&self) -> bool {
        self.reinitialized
    }

    pub fn context(&self) -> &RepoContext {
        &self.ctx
    }

    /// Start a transaction over a copy of this repository's refs.
    pub fn begin_transaction(&self) -> RepoResult<Transaction<'_>> {
        Transaction::begin(self)
    }
}

impl Deref for Repository {
    type Target = RepoContext;

    fn deref(&self) -> &RepoContext {
        &self.ctx
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("default_branch", &self.ctx.config().default_branch)
            .field("reinitialized", &self.reinitialized)
            .finish()
    }
}
