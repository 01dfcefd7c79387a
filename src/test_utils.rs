//! Shared test utilities.
//!
//! Common fixtures for the unit tests: tracing setup, sample domain values
//! with sensible defaults, a recording notifier, and a fully wired manager
//! against the in-memory remote.

use crate::{
    cache::LocalCacheStore,
    config::AppConfig,
    connectivity::ConnectivityMonitor,
    errors::Result,
    manager::{NewProject, ProjectLifecycleManager},
    models::{
        Category, ChangeOp, GoalFrequency, JournalEntry, PendingChange, Project,
    },
    notify::Notifier,
    remote::memory::MemoryRemote,
};
use chrono::NaiveDate;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

/// Installs a test tracing subscriber once; safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Shorthand for a calendar date that is known to be valid.
#[must_use]
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
}

/// A project with the Scenario A numbers: initial capital 1000, target
/// amount 500 (total target 1500), spanning all of 2025, monthly goal 200.
#[must_use]
pub fn sample_project(id: &str) -> Project {
    let start = date(2025, 1, 1);
    let target = date(2025, 12, 31);
    Project {
        id: id.to_string(),
        title: format!("Project {id}"),
        description: "test project".to_string(),
        initial_capital: 1000.0,
        current_balance: 1000.0,
        target_amount: 500.0,
        start_date: start,
        target_date: target,
        category: Category::Savings,
        goal_amount: 200.0,
        goal_frequency: GoalFrequency::Monthly,
        milestones: crate::core::progress::milestone_schedule(start, target, start),
        progress_percentage: 0.0,
        completed: false,
        progress_history: Vec::new(),
        last_updated: date(2025, 6, 1).and_hms_opt(12, 0, 0).expect("valid time").and_utc(),
    }
}

/// The matching [`NewProject`] input for [`sample_project`].
#[must_use]
pub fn sample_input(title: &str) -> NewProject {
    NewProject {
        title: title.to_string(),
        description: "test project".to_string(),
        initial_capital: 1000.0,
        target_amount: 500.0,
        start_date: date(2025, 1, 1),
        target_date: date(2025, 12, 31),
        category: Category::Savings,
        goal_amount: 200.0,
        goal_frequency: GoalFrequency::Monthly,
    }
}

/// A journal entry with fixed content.
#[must_use]
pub fn journal_entry(id: &str, project_id: &str, entry_date: NaiveDate) -> JournalEntry {
    JournalEntry {
        id: id.to_string(),
        project_id: project_id.to_string(),
        content: "note".to_string(),
        date: entry_date,
    }
}

/// An add-operation pending change queued "now".
#[must_use]
pub fn pending_add(path: &str, payload: serde_json::Value) -> PendingChange {
    PendingChange {
        path: path.to_string(),
        payload,
        operation: ChangeOp::Add,
        queued_at: chrono::Utc::now(),
    }
}

/// Notifier that records every (title, body) pair for assertions.
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingNotifier {
    /// Titles of every notification sent so far, in order.
    #[must_use]
    pub fn titles(&self) -> Vec<String> {
        self.sent
            .lock()
            .expect("notifier poisoned")
            .iter()
            .map(|(title, _)| title.clone())
            .collect()
    }

    /// Bodies of every notification sent so far, in order.
    #[must_use]
    pub fn bodies(&self) -> Vec<String> {
        self.sent
            .lock()
            .expect("notifier poisoned")
            .iter()
            .map(|(_, body)| body.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, body: &str, _icon: Option<&str>) -> bool {
        self.sent
            .lock()
            .expect("notifier poisoned")
            .push((title.to_string(), body.to_string()));
        true
    }
}

/// Everything a manager test needs to poke at from the outside.
pub struct ManagerFixture {
    /// The manager under test
    pub manager: ProjectLifecycleManager<Arc<MemoryRemote>, RecordingNotifier>,
    /// Shared handle to the remote the manager writes through
    pub remote: Arc<MemoryRemote>,
    /// Shared handle to the connectivity monitor
    pub connectivity: Arc<ConnectivityMonitor>,
    /// Clone of the manager's notifier
    pub notifier: RecordingNotifier,
}

/// Wires a manager against a fresh in-memory remote and cache, signed in as
/// `"user-1"`.
pub async fn manager_fixture(online: bool) -> Result<ManagerFixture> {
    init_test_tracing();
    let remote = Arc::new(MemoryRemote::new());
    let connectivity = Arc::new(ConnectivityMonitor::new(online));
    let cache = LocalCacheStore::in_memory().await?;
    let notifier = RecordingNotifier::default();

    let mut manager = ProjectLifecycleManager::new(
        Arc::clone(&remote),
        cache,
        Arc::clone(&connectivity),
        notifier.clone(),
        &AppConfig::default(),
    )
    .await?;
    manager.set_user(Some("user-1".to_string())).await?;

    Ok(ManagerFixture {
        manager,
        remote,
        connectivity,
        notifier,
    })
}
