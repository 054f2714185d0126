//! Command execution against document-backed aggregates.

use std::marker::PhantomData;

use doc_store::{Document, DocumentQuery, DocumentStore, DocumentStoreExt, PutOptions, Version};

use crate::aggregate::Aggregate;
use crate::error::DomainError;

/// Attempts made by [`Repository::execute_with_retry`] when none is given.
pub const DEFAULT_MAX_ATTEMPTS: usize = 5;

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult<A: Aggregate> {
    /// The aggregate after applying the new events.
    pub aggregate: A,

    /// The events that were generated and persisted.
    pub events: Vec<A::Event>,

    /// The stored version after the command.
    pub new_version: Version,
}

/// Loads aggregates, runs commands against them and stores the result.
///
/// Every write states the version it was computed from, so two requests
/// racing on the same aggregate cannot both succeed.
pub struct Repository<S, A>
where
    S: DocumentStore,
    A: Aggregate,
{
    store: S,
    _phantom: PhantomData<A>,
}

impl<S, A> Clone for Repository<S, A>
where
    S: DocumentStore + Clone,
    A: Aggregate,
{
    fn clone(&self) -> Self {
        Self::new(self.store.clone())
    }
}

impl<S, A> Repository<S, A>
where
    S: DocumentStore,
    A: Aggregate,
{
    /// Creates a new repository over the given store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    fn decode(document: Document) -> Result<A, DomainError> {
        let mut aggregate: A = document.decode()?;
        aggregate.set_version(document.version);
        Ok(aggregate)
    }

    /// Loads an aggregate, returning None if it doesn't exist.
    pub async fn load(&self, key: &str) -> Result<Option<A>, DomainError> {
        self.store
            .get(A::collection(), key)
            .await?
            .map(Self::decode)
            .transpose()
    }

    /// Loads an aggregate that must exist.
    pub async fn get(&self, key: &str) -> Result<A, DomainError> {
        self.load(key).await?.ok_or_else(|| DomainError::NotFound {
            collection: A::collection(),
            key: key.to_string(),
        })
    }

    /// Loads every aggregate among `keys` that exists, in key order.
    pub async fn load_many(&self, keys: &[String]) -> Result<Vec<A>, DomainError> {
        self.store
            .get_many(A::collection(), keys)
            .await?
            .into_iter()
            .map(Self::decode)
            .collect()
    }

    /// Writes an aggregate back at the version it was loaded at.
    ///
    /// An aggregate that was never stored is inserted.
    pub async fn save(&self, aggregate: &A) -> Result<Version, DomainError> {
        self.persist(aggregate, aggregate.version()).await
    }

    /// Stores a fully built aggregate that must not exist yet.
    pub async fn insert(&self, aggregate: &A) -> Result<Version, DomainError> {
        self.persist(aggregate, Version::initial()).await
    }

    /// Runs a creation command against a blank aggregate and stores the result.
    ///
    /// Fails with a concurrency conflict if an aggregate with the resulting
    /// key already exists.
    pub async fn create<F>(&self, command_fn: F) -> Result<CommandResult<A>, DomainError>
    where
        A: Default,
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        self.run(A::default(), command_fn).await
    }

    /// Executes a command against an existing aggregate and persists the result.
    ///
    /// The command function receives the current state and returns either
    /// the events to apply, or an error. An empty event list is a no-op.
    pub async fn execute<F>(&self, key: &str, command_fn: F) -> Result<CommandResult<A>, DomainError>
    where
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let aggregate = self.get(key).await?;
        self.run(aggregate, command_fn).await
    }

    /// Like [`Repository::execute`], but starts from `init()` when the
    /// aggregate has never been stored.
    pub async fn execute_or_init<I, F>(
        &self,
        key: &str,
        init: I,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        I: FnOnce() -> A,
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let aggregate = match self.load(key).await? {
            Some(aggregate) => aggregate,
            None => init(),
        };
        self.run(aggregate, command_fn).await
    }

    /// Executes a command, reloading and re-running it when another writer
    /// got there first.
    ///
    /// Gives up after `max_attempts` conflicts and returns the last one.
    pub async fn execute_with_retry<F>(
        &self,
        key: &str,
        max_attempts: usize,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: Fn(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let mut attempt = 1;
        loop {
            match self.execute(key, &command_fn).await {
                Err(e) if e.is_conflict() && attempt < max_attempts.max(1) => {
                    metrics::counter!("aggregate_write_retries_total", "collection" => A::collection())
                        .increment(1);
                    tracing::debug!(collection = A::collection(), %key, attempt, "retrying after write conflict");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Loads every aggregate matching a query.
    ///
    /// The query's collection is forced to this aggregate's collection.
    pub async fn find(&self, mut query: DocumentQuery) -> Result<Vec<A>, DomainError> {
        query.collection = A::collection().to_string();
        self.store
            .query(query)
            .await?
            .into_iter()
            .map(Self::decode)
            .collect()
    }

    /// Counts aggregates matching a query's filters.
    pub async fn count(&self, mut query: DocumentQuery) -> Result<u64, DomainError> {
        query.collection = A::collection().to_string();
        Ok(self.store.count(&query).await?)
    }

    async fn run<F>(&self, mut aggregate: A, command_fn: F) -> Result<CommandResult<A>, DomainError>
    where
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let current_version = aggregate.version();

        // Execute command to get events
        let events = command_fn(&aggregate)?;

        if events.is_empty() {
            return Ok(CommandResult {
                aggregate,
                events: vec![],
                new_version: current_version,
            });
        }

        for event in &events {
            aggregate.apply(event.clone());
        }

        let new_version = self.persist(&aggregate, current_version).await?;
        aggregate.set_version(new_version);

        Ok(CommandResult {
            aggregate,
            events,
            new_version,
        })
    }

    async fn persist(&self, aggregate: &A, current_version: Version) -> Result<Version, DomainError> {
        let write = Document::builder()
            .collection(A::collection())
            .key(aggregate.key())
            .body(aggregate)?
            .build()?;

        let stored = self
            .store
            .put(write, PutOptions::expecting(current_version))
            .await?;
        Ok(stored.version)
    }
}
