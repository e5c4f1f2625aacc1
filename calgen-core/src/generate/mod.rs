//! Generation runs.
//!
//! A run makes one completion call for the whole batch of users, stores
//! every valid user, then makes one call per stored user for that user's
//! events. Calls happen strictly one after another. Errors for which
//! `CoreError::is_recoverable` holds are counted and the run moves on;
//! anything else, such as a store failure, ends the run.
//!
//! Ids and creation times are always assigned here, whatever the model
//! put in its response.

mod stats;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;

use crate::constants::USER_ID_PREFIX;
use crate::error::{CoreError, CoreResult};
use crate::event_range::EventRange;
use crate::kv::KvStore;
use crate::llm::{CompletionOptions, LlmProvider};
use crate::parse;
use crate::prompt::Prompts;
use crate::record::{Preferences, User};
use crate::store::Store;

pub use stats::GenerationStats;

/// Fields the model may fill in but never gets to choose.
const ASSIGNED_FIELDS: [&str; 3] = ["user_id", "event_id", "created_at"];

/// Extract the completion's array with every assigned field removed.
fn extract_unassigned(raw: &str) -> CoreResult<Vec<Value>> {
    let mut entries = parse::extract_array(raw)?;
    for entry in &mut entries {
        if let Value::Object(fields) = entry {
            for name in ASSIGNED_FIELDS {
                fields.remove(name);
            }
        }
    }
    Ok(entries)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationRequest {
    pub users: u32,
    pub events_per_user: EventRange,
}

impl GenerationRequest {
    fn validate(&self) -> CoreResult<()> {
        if self.users == 0 {
            return Err(CoreError::Config("User count must be a positive integer".into()));
        }
        Ok(())
    }
}

pub struct Generator<'a, K: KvStore> {
    llm: &'a dyn LlmProvider,
    store: &'a Store<K>,
    prompts: &'a Prompts,
    options: CompletionOptions,
    rng: StdRng,
}

impl<'a, K: KvStore> Generator<'a, K> {
    pub fn new(
        llm: &'a dyn LlmProvider,
        store: &'a Store<K>,
        prompts: &'a Prompts,
        options: CompletionOptions,
    ) -> Self {
        Generator {
            llm,
            store,
            prompts,
            options,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Fix the event-count draws, for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub async fn run(&mut self, request: &GenerationRequest) -> CoreResult<GenerationStats> {
        request.validate()?;

        let mut stats = GenerationStats::start(false);
        stats.users_requested = request.users;

        let users = self.generate_users(request.users, &mut stats).await?;

        for user in &users {
            self.generate_events(user, request.events_per_user, &mut stats)
                .await?;
        }

        let stats = stats.finish();
        tracing::info!(
            users = stats.users_created,
            events = stats.events_created,
            failures = stats.failures(),
            "generation finished"
        );
        Ok(stats)
    }

    /// One completion attempt, never retried. Recoverable failures are
    /// counted and come back as `None`.
    async fn complete(
        &self,
        prompt: &str,
        stats: &mut GenerationStats,
    ) -> CoreResult<Option<String>> {
        stats.api_calls += 1;

        match self.llm.complete(prompt, &self.options).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.is_recoverable() => {
                tracing::warn!(error = %e, "completion failed");
                stats.api_failures += 1;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn generate_users(
        &mut self,
        count: u32,
        stats: &mut GenerationStats,
    ) -> CoreResult<Vec<User>> {
        tracing::info!(count, "generating users");

        let prompt = self.prompts.users(count);
        let Some(raw) = self.complete(&prompt, stats).await? else {
            return Ok(Vec::new());
        };

        let batch = match extract_unassigned(&raw) {
            Ok(entries) => parse::build_users(entries, count as usize),
            Err(e) if e.is_recoverable() => {
                tracing::warn!(error = %e, "user response not usable");
                stats.parse_failures += 1;
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        stats.rejected_records += batch.rejected as u32;
        if batch.shortfall() > 0 {
            tracing::warn!(
                requested = count,
                received = batch.records.len(),
                "provider returned fewer users than requested"
            );
        }

        let mut users = Vec::with_capacity(batch.records.len());
        for user in batch.records {
            self.store.put_user(&user).await?;
            stats.users_created += 1;
            tracing::info!(user_id = %user.user_id, name = %user.name, "created user");
            users.push(user);
        }

        Ok(users)
    }

    async fn generate_events(
        &mut self,
        user: &User,
        range: EventRange,
        stats: &mut GenerationStats,
    ) -> CoreResult<()> {
        let count = range.sample(&mut self.rng);
        stats.events_requested += count;

        if count == 0 {
            return Ok(());
        }

        tracing::info!(user_id = %user.user_id, count, "generating events");

        let prompt = self.prompts.events(user, count);
        let Some(raw) = self.complete(&prompt, stats).await? else {
            stats.failed_users.push(user.user_id.clone());
            return Ok(());
        };

        let batch = match extract_unassigned(&raw) {
            Ok(entries) => parse::build_events(entries, count as usize, &user.user_id),
            Err(e) if e.is_recoverable() => {
                tracing::warn!(user_id = %user.user_id, error = %e, "event response not usable");
                stats.parse_failures += 1;
                stats.failed_users.push(user.user_id.clone());
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        stats.rejected_records += batch.rejected as u32;
        if batch.records.is_empty() {
            stats.failed_users.push(user.user_id.clone());
        }

        for event in batch.records {
            self.store.put_event(&event).await?;
            stats.events_created += 1;
        }

        Ok(())
    }
}

/// Walk a run without calling the provider or touching the store.
///
/// Prompts are built and logged at debug level; counts report what a real
/// run would ask for.
pub fn dry_run<R: Rng + ?Sized>(
    prompts: &Prompts,
    request: &GenerationRequest,
    rng: &mut R,
) -> CoreResult<GenerationStats> {
    request.validate()?;

    let mut stats = GenerationStats::start(true);
    stats.users_requested = request.users;
    stats.users_created = request.users;

    tracing::debug!(prompt = %prompts.users(request.users), "user prompt");

    for i in 1..=request.users {
        let user = placeholder_user(i);
        let count = request.events_per_user.sample(rng);
        stats.events_requested += count;
        tracing::debug!(
            user = %user.name,
            count,
            prompt = %prompts.events(&user, count),
            "event prompt"
        );
    }

    stats.events_created = stats.events_requested;
    Ok(stats.finish())
}

fn placeholder_user(n: u32) -> User {
    User {
        user_id: format!("{}dryrun{}", USER_ID_PREFIX, n),
        name: format!("User {}", n),
        email: format!("user{}@example.com", n),
        timezone: crate::constants::DEFAULT_TIMEZONE.to_string(),
        profession: crate::constants::DEFAULT_PROFESSION.to_string(),
        preferences: Preferences::default(),
        created_at: Utc::now(),
    }
}
