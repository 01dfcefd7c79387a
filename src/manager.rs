//! Project lifecycle manager - orchestrates every mutation.
//!
//! The manager owns the canonical in-memory state (the Active and Completed
//! partitions plus the journal), derives new state through the core engine,
//! writes through the remote adapter while online, defers to the pending
//! queue while offline, and mirrors every result into the local cache.
//!
//! Methods take `&mut self`: one logical operation runs to completion before
//! the next begins, which is what serializes dependent operations on the same
//! project id. Remote push events and connectivity transitions are fed in by
//! the host through [`ProjectLifecycleManager::handle_remote_event`] and
//! [`ProjectLifecycleManager::handle_connectivity`].

use crate::{
    cache::{CacheSlotKey, LocalCacheStore},
    config::AppConfig,
    connectivity::{ConnectivityEvent, ConnectivityMonitor},
    core::{progress, report, streak},
    errors::{Error, Result},
    models::{
        Category, ChangeOp, GoalFrequency, JournalEntry, NotificationPrefs, PendingChange, Project,
    },
    notify::Notifier,
    queue::PendingChangeQueue,
    remote::{
        self, RemoteEvent, RemoteStore, journal_entry_path, progress_entry_path, project_path,
    },
    sync::{self, SyncOutcome},
};
use chrono::{NaiveDate, Utc};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Caller-supplied fields for a new project.
#[derive(Debug, Clone)]
pub struct NewProject {
    /// Display title
    pub title: String,
    /// Free-form description
    pub description: String,
    /// Starting capital
    pub initial_capital: f64,
    /// Capital to accumulate beyond the starting point
    pub target_amount: f64,
    /// Goal window open
    pub start_date: NaiveDate,
    /// Goal window close
    pub target_date: NaiveDate,
    /// One of the four fixed categories
    pub category: Category,
    /// Contribution goal per cadence period
    pub goal_amount: f64,
    /// Cadence of the contribution goal
    pub goal_frequency: GoalFrequency,
}

/// Fields that may change on an existing project. `None` leaves a field
/// untouched.
#[derive(Debug, Clone, Default)]
pub struct ProjectPatch {
    /// New title
    pub title: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New target amount (re-derives the percentage)
    pub target_amount: Option<f64>,
    /// New window close date
    pub target_date: Option<NaiveDate>,
    /// New category
    pub category: Option<Category>,
    /// New goal amount
    pub goal_amount: Option<f64>,
    /// New goal cadence
    pub goal_frequency: Option<GoalFrequency>,
}

/// Orchestrates project and journal mutations across the remote store, the
/// pending queue, and the local cache.
pub struct ProjectLifecycleManager<R: RemoteStore, N: Notifier> {
    remote: R,
    cache: LocalCacheStore,
    connectivity: Arc<ConnectivityMonitor>,
    queue: PendingChangeQueue,
    notifier: N,
    user_id: Option<String>,
    prefs: NotificationPrefs,
    report_months: u32,
    active: Vec<Project>,
    completed: Vec<Project>,
    journal: Vec<JournalEntry>,
}

impl<R: RemoteStore, N: Notifier> ProjectLifecycleManager<R, N> {
    /// Builds a manager, restoring the last cached snapshots and the pending
    /// queue. Nothing touches the remote store until a user is set or a
    /// connectivity event arrives.
    pub async fn new(
        remote: R,
        cache: LocalCacheStore,
        connectivity: Arc<ConnectivityMonitor>,
        notifier: N,
        config: &AppConfig,
    ) -> Result<Self> {
        let queue = PendingChangeQueue::restore(&cache).await?;
        let active = cache
            .read_slot(CacheSlotKey::Projects)
            .await?
            .unwrap_or_default();
        let completed = cache
            .read_slot(CacheSlotKey::CompletedProjects)
            .await?
            .unwrap_or_default();
        let journal = cache
            .read_slot(CacheSlotKey::Journal)
            .await?
            .unwrap_or_default();
        let prefs = cache
            .read_slot(CacheSlotKey::NotificationPrefs)
            .await?
            .unwrap_or(config.notifications);

        Ok(Self {
            remote,
            cache,
            connectivity,
            queue,
            notifier,
            user_id: None,
            prefs,
            report_months: config.report_months,
            active,
            completed,
            journal,
        })
    }

    /// Active partition, as last observed.
    #[must_use]
    pub fn active_projects(&self) -> &[Project] {
        &self.active
    }

    /// Completed partition, as last observed.
    #[must_use]
    pub fn completed_projects(&self) -> &[Project] {
        &self.completed
    }

    /// All journal entries.
    #[must_use]
    pub fn journal_entries(&self) -> &[JournalEntry] {
        &self.journal
    }

    /// Pending changes awaiting reconciliation, oldest first.
    #[must_use]
    pub fn pending_changes(&self) -> &[PendingChange] {
        self.queue.changes()
    }

    /// Current notification preferences.
    #[must_use]
    pub fn notification_prefs(&self) -> NotificationPrefs {
        self.prefs
    }

    /// Updates and persists notification preferences.
    pub async fn set_notification_prefs(&mut self, prefs: NotificationPrefs) -> Result<()> {
        self.prefs = prefs;
        self.cache
            .write_slot(CacheSlotKey::NotificationPrefs, &prefs)
            .await
    }

    /// Switches the signed-in user (or signs out with `None`) and, when
    /// online, refreshes state from the new user's namespace. The host should
    /// also re-drive [`Self::subscribe_remote`] after this.
    pub async fn set_user(&mut self, user_id: Option<String>) -> Result<()> {
        self.user_id = user_id;
        if self.user_id.is_some() {
            self.refresh_from_remote().await?;
        }
        Ok(())
    }

    /// Live snapshot events for the current user, if one is signed in.
    #[must_use]
    pub fn subscribe_remote(&self) -> Option<tokio::sync::broadcast::Receiver<RemoteEvent>> {
        self.user_id
            .as_deref()
            .map(|user| self.remote.subscribe(user))
    }

    /// Reacts to a connectivity transition. Reconnecting first drains the
    /// pending queue, then refreshes state from the remote store.
    pub async fn handle_connectivity(&mut self, event: ConnectivityEvent) -> Result<SyncOutcome> {
        match event {
            ConnectivityEvent::Connected => {
                let outcome = self.reconcile().await?;
                self.refresh_from_remote().await?;
                Ok(outcome)
            }
            ConnectivityEvent::Disconnected => Ok(SyncOutcome::default()),
        }
    }

    /// Drains the pending queue against the remote store.
    pub async fn reconcile(&mut self) -> Result<SyncOutcome> {
        sync::reconcile(
            &mut self.queue,
            &self.cache,
            &self.remote,
            self.user_id.as_deref(),
            &self.notifier,
            self.prefs.sync_alerts,
        )
        .await
    }

    /// Applies a push event from the remote store. Snapshots replace local
    /// state wholesale; nothing is diffed or merged in place.
    pub async fn handle_remote_event(&mut self, event: RemoteEvent) -> Result<()> {
        match event {
            RemoteEvent::Projects { active, completed } => {
                self.replace_partitions(active, completed);
            }
            RemoteEvent::Journal(journal) => {
                self.journal = journal;
            }
        }
        self.mirror_cache().await
    }

    /// Creates a project. Online, the remote store assigns the id; offline
    /// (or when the remote write fails), the project keeps a temporary
    /// `local-` id and the add is queued for reconciliation.
    pub async fn create_project(&mut self, input: NewProject) -> Result<Project> {
        if input.title.trim().is_empty() {
            return Err(Error::Config {
                message: "Project title cannot be empty".to_string(),
            });
        }
        if !input.initial_capital.is_finite() || input.initial_capital < 0.0 {
            return Err(Error::InvalidAmount {
                amount: input.initial_capital,
            });
        }
        if !input.target_amount.is_finite() || input.target_amount <= 0.0 {
            return Err(Error::InvalidAmount {
                amount: input.target_amount,
            });
        }
        if !input.goal_amount.is_finite() || input.goal_amount < 0.0 {
            return Err(Error::InvalidAmount {
                amount: input.goal_amount,
            });
        }

        let now = Utc::now();
        let today = now.date_naive();
        let mut project = Project {
            id: format!("local-{}", uuid::Uuid::new_v4()),
            title: input.title.trim().to_string(),
            description: input.description,
            initial_capital: input.initial_capital,
            current_balance: input.initial_capital,
            target_amount: input.target_amount,
            start_date: input.start_date,
            target_date: input.target_date,
            category: input.category,
            goal_amount: input.goal_amount,
            goal_frequency: input.goal_frequency,
            milestones: progress::milestone_schedule(input.start_date, input.target_date, today),
            progress_percentage: 0.0,
            completed: false,
            progress_history: Vec::new(),
            last_updated: now,
        };

        let mut created_remotely = false;
        if self.connectivity.is_online() {
            if let Some(user) = self.user_id.as_deref() {
                match self.remote.create_project(user, &project).await {
                    Ok(id) => {
                        project.id = id;
                        created_remotely = true;
                    }
                    Err(e) => {
                        warn!("Remote create failed, deferring to queue: {}", e);
                    }
                }
            }
        }
        if !created_remotely {
            self.queue.push(PendingChange {
                path: project_path(&project.id),
                payload: remote::project_document(&project)?,
                operation: ChangeOp::Add,
                queued_at: now,
            });
        }
        self.queue.persist(&self.cache).await?;

        info!("Created project '{}' ({}).", project.title, project.id);
        self.active.push(project.clone());
        self.mirror_cache().await?;
        Ok(project)
    }

    /// Edits project fields and re-derives the percentage when the target
    /// amount changes. The completion partition never changes here; only
    /// [`Self::append_progress`] can complete a project.
    pub async fn update_project(&mut self, id: &str, patch: ProjectPatch) -> Result<Project> {
        if let Some(title) = &patch.title {
            if title.trim().is_empty() {
                return Err(Error::Config {
                    message: "Project title cannot be empty".to_string(),
                });
            }
        }
        if let Some(amount) = patch.target_amount {
            if !amount.is_finite() || amount <= 0.0 {
                return Err(Error::InvalidAmount { amount });
            }
        }
        if let Some(amount) = patch.goal_amount {
            if !amount.is_finite() || amount < 0.0 {
                return Err(Error::InvalidAmount { amount });
            }
        }

        let mut project = self.take_project(id)?;

        if let Some(title) = patch.title {
            project.title = title.trim().to_string();
        }
        if let Some(description) = patch.description {
            project.description = description;
        }
        if let Some(target_amount) = patch.target_amount {
            project.target_amount = target_amount;
        }
        if let Some(target_date) = patch.target_date {
            project.target_date = target_date;
        }
        if let Some(category) = patch.category {
            project.category = category;
        }
        if let Some(goal_amount) = patch.goal_amount {
            project.goal_amount = goal_amount;
        }
        if let Some(goal_frequency) = patch.goal_frequency {
            project.goal_frequency = goal_frequency;
        }
        project.progress_percentage = progress::progress_percentage(
            project.initial_capital,
            project.target_amount,
            project.current_balance,
        );
        project.last_updated = Utc::now();

        let mut payload = remote::project_document(&project)?;
        if let serde_json::Value::Object(fields) = &mut payload {
            fields.remove("id");
        }
        self.write_through(project_path(&project.id), payload, ChangeOp::Update)
            .await?;

        self.restore_project(project.clone());
        self.mirror_cache().await?;
        Ok(project)
    }

    /// Appends a progress entry: derives the new balance, percentage,
    /// milestone flags, and the one-shot completion transition, then writes
    /// the entry document and a project merge patch.
    pub async fn append_progress(
        &mut self,
        id: &str,
        amount: f64,
        date: NaiveDate,
    ) -> Result<Project> {
        let mut project = self.take_project(id)?;

        let outcome = match progress::append_entry(&mut project, amount, date, Utc::now()) {
            Ok(outcome) => outcome,
            Err(e) => {
                // No partial state: put the untouched project back.
                self.restore_project(project);
                return Err(e);
            }
        };

        let entry_payload = remote::entry_document(&outcome.entry)?;
        self.write_through(
            progress_entry_path(&project.id, &outcome.entry.id),
            entry_payload,
            ChangeOp::Add,
        )
        .await?;

        let project_patch = json!({
            "currentBalance": project.current_balance,
            "progressPercentage": project.progress_percentage,
            "milestones": serde_json::to_value(&project.milestones)?,
            "completed": project.completed,
            "lastUpdated": project.last_updated.to_rfc3339(),
        });
        self.write_through(project_path(&project.id), project_patch, ChangeOp::Update)
            .await?;

        if self.prefs.milestone_alerts {
            for threshold in &outcome.achieved_thresholds {
                self.notifier.notify(
                    "Milestone reached",
                    &format!("{}: {threshold}% of the way there", project.title),
                    None,
                );
            }
            if outcome.completed_now {
                self.notifier
                    .notify("Goal achieved", &format!("{} is complete!", project.title), None);
            }
        }
        if outcome.completed_now {
            info!("Project '{}' moved to the completed partition.", project.title);
        }

        self.restore_project(project.clone());
        self.mirror_cache().await?;
        Ok(project)
    }

    /// Deletes a project, cascading to its progress history (handled by the
    /// remote store under the project path) and its journal entries.
    pub async fn delete_project(&mut self, id: &str) -> Result<()> {
        let project = self.take_project(id)?;

        let orphaned: Vec<JournalEntry> = self
            .journal
            .iter()
            .filter(|entry| entry.project_id == project.id)
            .cloned()
            .collect();
        self.journal.retain(|entry| entry.project_id != project.id);

        for entry in orphaned {
            self.write_through(
                journal_entry_path(&entry.id),
                serde_json::Value::Null,
                ChangeOp::Delete,
            )
            .await?;
        }
        self.write_through(
            project_path(&project.id),
            serde_json::Value::Null,
            ChangeOp::Delete,
        )
        .await?;

        info!("Deleted project '{}' ({}).", project.title, project.id);
        self.mirror_cache().await
    }

    /// Adds a journal entry to a project. The entry's date counts toward the
    /// activity streak.
    pub async fn add_journal_entry(
        &mut self,
        project_id: &str,
        content: String,
        date: NaiveDate,
    ) -> Result<JournalEntry> {
        if content.trim().is_empty() {
            return Err(Error::Config {
                message: "Journal entry content cannot be empty".to_string(),
            });
        }
        if self.find_project(project_id).is_none() {
            return Err(Error::ProjectNotFound {
                id: project_id.to_string(),
            });
        }

        let entry = JournalEntry {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            content,
            date,
        };

        self.write_through(
            journal_entry_path(&entry.id),
            serde_json::to_value(&entry)?,
            ChangeOp::Add,
        )
        .await?;

        self.journal.push(entry.clone());
        self.mirror_cache().await?;
        Ok(entry)
    }

    /// Deletes a single journal entry.
    pub async fn delete_journal_entry(&mut self, id: &str) -> Result<()> {
        if !self.journal.iter().any(|entry| entry.id == id) {
            return Err(Error::JournalEntryNotFound { id: id.to_string() });
        }

        // Write first; the local entry is only dropped once the delete has
        // been applied or durably queued.
        self.write_through(journal_entry_path(id), serde_json::Value::Null, ChangeOp::Delete)
            .await?;
        self.journal.retain(|entry| entry.id != id);
        self.mirror_cache().await
    }

    /// Consecutive-day activity streak ending at `today`, across both
    /// partitions and the journal.
    #[must_use]
    pub fn streak(&self, today: NaiveDate) -> u32 {
        let dates = streak::activity_dates(
            self.active.iter().chain(self.completed.iter()),
            &self.journal,
        );
        streak::streak_as_of(&dates, today)
    }

    /// Trailing-month profit/goal aggregate across both partitions. `None`
    /// uses the configured `report_months` window.
    #[must_use]
    pub fn monthly_report(
        &self,
        months_back: Option<u32>,
        today: NaiveDate,
    ) -> Vec<report::MonthlySummary> {
        let months_back = months_back.unwrap_or(self.report_months);
        let all: Vec<Project> = self
            .active
            .iter()
            .chain(self.completed.iter())
            .cloned()
            .collect();
        report::monthly_aggregate(&all, months_back, today)
    }

    /// Initial capital summed by category across both partitions.
    #[must_use]
    pub fn capital_distribution(&self) -> BTreeMap<Category, f64> {
        let all: Vec<Project> = self
            .active
            .iter()
            .chain(self.completed.iter())
            .cloned()
            .collect();
        report::type_distribution(&all)
    }

    /// Routes one mutation: online it goes straight to the remote store
    /// (falling back to the queue if the write fails), offline it is queued.
    /// Either way the queue is persisted before returning.
    async fn write_through(
        &mut self,
        path: String,
        payload: serde_json::Value,
        operation: ChangeOp,
    ) -> Result<()> {
        let proceed = self.queue.enqueue(
            &self.connectivity,
            path.clone(),
            payload.clone(),
            operation,
        );

        if proceed {
            let change = PendingChange {
                path,
                payload,
                operation,
                queued_at: Utc::now(),
            };
            match self.user_id.as_deref() {
                Some(user) => {
                    if let Err(e) = self.remote.apply_change(user, &change).await {
                        warn!(
                            "Remote {:?} of {} failed, deferring to queue: {}",
                            change.operation, change.path, e
                        );
                        self.queue.push(change);
                    }
                }
                // No user to write under; hold the change until sign-in.
                None => self.queue.push(change),
            }
        }

        self.queue.persist(&self.cache).await
    }

    /// Refreshes local state from the remote store, falling back to the last
    /// cached snapshot on failure.
    async fn refresh_from_remote(&mut self) -> Result<()> {
        let Some(user) = self.user_id.as_deref() else {
            return Ok(());
        };
        if !self.connectivity.is_online() {
            return Ok(());
        }

        match self.remote.fetch_snapshot(user).await {
            Ok(snapshot) => {
                self.replace_partitions(snapshot.active, snapshot.completed);
                self.journal = snapshot.journal;
                self.mirror_cache().await?;
            }
            Err(e) => {
                warn!("Remote read failed, keeping cached snapshot: {}", e);
            }
        }
        Ok(())
    }

    /// Replaces both partitions wholesale, enforcing that a project flagged
    /// completed never re-enters the active partition.
    fn replace_partitions(&mut self, active: Vec<Project>, completed: Vec<Project>) {
        self.completed = completed;
        self.active = Vec::new();
        for project in active {
            if project.completed {
                self.completed.push(project);
            } else {
                self.active.push(project);
            }
        }
    }

    fn find_project(&self, id: &str) -> Option<&Project> {
        self.active
            .iter()
            .chain(self.completed.iter())
            .find(|project| project.id == id)
    }

    /// Removes a project from whichever partition holds it.
    fn take_project(&mut self, id: &str) -> Result<Project> {
        if let Some(index) = self.active.iter().position(|p| p.id == id) {
            return Ok(self.active.remove(index));
        }
        if let Some(index) = self.completed.iter().position(|p| p.id == id) {
            return Ok(self.completed.remove(index));
        }
        Err(Error::ProjectNotFound { id: id.to_string() })
    }

    /// Puts a project back into the partition its completion flag dictates.
    fn restore_project(&mut self, project: Project) {
        if project.completed {
            self.completed.push(project);
        } else {
            self.active.push(project);
        }
    }

    /// Mirrors the current partitions and journal into their cache slots.
    async fn mirror_cache(&self) -> Result<()> {
        self.cache
            .write_slot(CacheSlotKey::Projects, &self.active)
            .await?;
        self.cache
            .write_slot(CacheSlotKey::CompletedProjects, &self.completed)
            .await?;
        self.cache.write_slot(CacheSlotKey::Journal, &self.journal).await
    }
}
