//! Integration tests for discovery, the harvest pipeline and full runs
//!
//! Most tests drive the pipeline against an in-memory `RemoteApi` that
//! serves a fixed friends graph and counts every call it receives. The last
//! tests run the whole harvest against a wiremock server.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use steam_harvest::api::{
    FriendEntry, OwnedItems, ProfileSummary, QuotaState, RateLimitedClient, RemoteApi,
    RemoteError, RetryPolicy,
};
use steam_harvest::config::{
    ApiConfig, Config, HarvestConfig, OutputConfig, QuotaConfig, RetryConfig,
};
use steam_harvest::harvest::{run_harvest, run_harvest_with_api, run_harvest_with_store, Harvester};
use steam_harvest::ledger::{
    lock_store, Ledger, LedgerStore, Outcome, RunRecord, RunStatus, SharedStore,
    SqliteLedgerStore, StorageError, StorageResult,
};
use steam_harvest::HarvestError;
use steam_harvest::output::ErrorLog;
use steam_harvest::{discover, NodeId};
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Endpoint {
    Profile,
    OwnedItems,
    Friends,
}

/// In-memory Steam stand-in with scripted failures and call counting
#[derive(Default)]
struct FakeSteam {
    friends: HashMap<NodeId, Vec<FriendEntry>>,
    failures: HashMap<(Endpoint, NodeId), RemoteError>,
    calls: Mutex<Vec<(Endpoint, NodeId)>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeSteam {
    fn with_graph(edges: &[(&str, &[&str])]) -> Self {
        let friends = edges
            .iter()
            .map(|(from, to)| {
                let entries: Vec<FriendEntry> = to
                    .iter()
                    .map(|id| FriendEntry::new(*id, Some(1_500_000_000)))
                    .collect();
                (NodeId::from(*from), entries)
            })
            .collect();
        Self {
            friends,
            ..Default::default()
        }
    }

    fn failing(mut self, endpoint: Endpoint, id: &str, err: RemoteError) -> Self {
        self.failures.insert((endpoint, NodeId::from(id)), err);
        self
    }

    fn calls_to(&self, endpoint: Endpoint, id: &str) -> usize {
        let id = NodeId::from(id);
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(e, called)| *e == endpoint && *called == id)
            .count()
    }

    fn calls_for(&self, id: &str) -> usize {
        let id = NodeId::from(id);
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, called)| *called == id)
            .count()
    }

    fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    async fn answer(&self, endpoint: Endpoint, id: &NodeId) -> Result<(), RemoteError> {
        self.calls.lock().unwrap().push((endpoint, id.clone()));

        if let Some(delay) = self.delay {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }

        match self.failures.get(&(endpoint, id.clone())) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteApi for FakeSteam {
    async fn player_summaries(&self, ids: &[NodeId]) -> Result<Vec<ProfileSummary>, RemoteError> {
        let mut players = Vec::new();
        for id in ids {
            self.answer(Endpoint::Profile, id).await?;
            players.push(ProfileSummary::new(id.clone(), format!("player-{}", id)));
        }
        Ok(players)
    }

    async fn owned_items(&self, id: &NodeId) -> Result<OwnedItems, RemoteError> {
        self.answer(Endpoint::OwnedItems, id).await?;
        Ok(OwnedItems {
            item_count: Some(0),
            items: Vec::new(),
        })
    }

    async fn friend_list(&self, id: &NodeId) -> Result<Vec<FriendEntry>, RemoteError> {
        self.answer(Endpoint::Friends, id).await?;
        Ok(self.friends.get(id).cloned().unwrap_or_default())
    }
}

/// Shared pieces of one simulated run
struct Harness {
    ledger: Arc<Ledger>,
    error_log: Arc<ErrorLog>,
    client: Arc<RateLimitedClient>,
}

impl Harness {
    fn new(api: Arc<FakeSteam>, store: &SharedStore) -> Self {
        let error_log = Arc::new(ErrorLog::in_memory());
        let client = RateLimitedClient::new(
            api,
            QuotaState::new(10_000, Duration::from_secs(3600)),
            RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_millis(1000),
            },
        )
        .with_error_log(Arc::clone(&error_log));

        Self {
            ledger: Arc::new(Ledger::load(Arc::clone(store), None).unwrap()),
            error_log,
            client: Arc::new(client),
        }
    }

    fn harvester(&self, workers: usize) -> Harvester {
        Harvester::new(
            Arc::clone(&self.client),
            Arc::clone(&self.ledger),
            Arc::clone(&self.error_log),
            workers,
        )
    }
}

fn memory_store() -> SharedStore {
    Arc::new(Mutex::new(SqliteLedgerStore::new_in_memory().unwrap()))
}

fn ids(items: &[&str]) -> HashSet<NodeId> {
    items.iter().map(|id| NodeId::from(*id)).collect()
}

#[tokio::test]
async fn test_discover_then_harvest_all_succeed() {
    let api = Arc::new(FakeSteam::with_graph(&[
        ("A", &["B", "C"]),
        ("B", &["D"]),
        ("C", &[]),
        ("D", &["E"]),
    ]));
    let store = memory_store();
    let harness = Harness::new(api.clone(), &store);

    let discovered = discover(
        &harness.client,
        &NodeId::from("A"),
        2,
        &harness.error_log,
        &CancellationToken::new(),
    )
    .await;
    assert_eq!(discovered, ids(&["A", "B", "C", "D"]));

    let report = harness.harvester(4).harvest(&discovered).await.unwrap();

    assert_eq!(report.candidates, 4);
    assert_eq!(report.succeeded, 4);
    assert_eq!(report.records.len(), 4);
    assert_eq!(harness.ledger.succeeded(), discovered);
    assert!(harness.error_log.entries().is_empty());

    let a = report
        .records
        .iter()
        .find(|r| r.node_id == NodeId::from("A"))
        .unwrap();
    assert_eq!(a.profile.as_ref().unwrap().persona_name, "player-A");
    assert!(a.owned_items.is_some());
    let friends: HashSet<_> = a
        .friends
        .as_ref()
        .unwrap()
        .iter()
        .map(|f| f.friend_id.clone())
        .collect();
    assert_eq!(friends, ids(&["B", "C"]));
}

#[tokio::test]
async fn test_denied_friend_list_lands_only_in_denied() {
    let api = Arc::new(FakeSteam::default().failing(
        Endpoint::Friends,
        "X",
        RemoteError::Unauthorized("HTTP 401".to_string()),
    ));
    let store = memory_store();
    let harness = Harness::new(api.clone(), &store);

    let report = harness.harvester(2).harvest(&ids(&["X"])).await.unwrap();

    assert_eq!(report.denied, 1);
    assert_eq!(harness.ledger.denied(), ids(&["X"]));
    assert!(harness.ledger.succeeded().is_empty());
    assert!(harness.ledger.pending_retry().is_empty());

    // Denials are not retried
    assert_eq!(api.calls_to(Endpoint::Friends, "X"), 1);

    let record = &report.records[0];
    assert!(record.profile.is_some());
    assert!(record.owned_items.is_some());
    assert!(record.friends.is_none());

    assert!(harness
        .error_log
        .entries()
        .iter()
        .any(|line| line.contains("Error processing account X")));
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_owned_items_keeps_profile_only() {
    let api = Arc::new(FakeSteam::default().failing(
        Endpoint::OwnedItems,
        "Y",
        RemoteError::RateLimited,
    ));
    let store = memory_store();
    let harness = Harness::new(api.clone(), &store);
    let start = tokio::time::Instant::now();

    let report = harness.harvester(2).harvest(&ids(&["Y"])).await.unwrap();

    assert_eq!(report.pending_retry, 1);
    assert_eq!(harness.ledger.pending_retry(), ids(&["Y"]));
    assert!(harness.ledger.denied().is_empty());

    let record = &report.records[0];
    assert!(record.profile.is_some());
    assert!(record.owned_items.is_none());
    assert!(record.friends.is_none());

    assert_eq!(api.calls_to(Endpoint::OwnedItems, "Y"), 3);
    assert_eq!(api.calls_to(Endpoint::Friends, "Y"), 0);
    // 1s + 2s + 4s of backoff
    assert!(start.elapsed() >= Duration::from_secs(7));
    assert!(harness
        .error_log
        .entries()
        .iter()
        .any(|line| line.contains("Max retries exceeded")));
}

#[tokio::test]
async fn test_second_run_skips_succeeded_accounts() {
    let store = memory_store();

    let first_api = Arc::new(FakeSteam::default());
    let first = Harness::new(first_api.clone(), &store);
    first
        .harvester(2)
        .harvest(&ids(&["A", "B"]))
        .await
        .unwrap();
    assert_eq!(first_api.total_calls(), 6);

    // A fresh process: new client, ledger reloaded from the same store
    let second_api = Arc::new(FakeSteam::default());
    let second = Harness::new(second_api.clone(), &store);
    let report = second
        .harvester(2)
        .harvest(&ids(&["A", "B", "C"]))
        .await
        .unwrap();

    assert_eq!(report.skipped, 2);
    assert_eq!(report.candidates, 1);
    assert_eq!(second_api.calls_for("A"), 0);
    assert_eq!(second_api.calls_for("B"), 0);
    assert_eq!(second_api.calls_for("C"), 3);
    assert_eq!(second.ledger.succeeded(), ids(&["A", "B", "C"]));
}

#[tokio::test]
async fn test_pending_retry_is_retried_next_run() {
    let store = memory_store();

    let failing = Arc::new(FakeSteam::default().failing(
        Endpoint::Profile,
        "Y",
        RemoteError::Other("HTTP 500".to_string()),
    ));
    let first = Harness::new(failing, &store);
    let report = first.harvester(1).harvest(&ids(&["Y"])).await.unwrap();
    assert_eq!(report.pending_retry, 1);
    assert!(report.records[0].is_empty());

    let healthy = Arc::new(FakeSteam::default());
    let second = Harness::new(healthy.clone(), &store);
    let report = second.harvester(1).harvest(&ids(&["Y"])).await.unwrap();

    assert_eq!(report.skipped, 0);
    assert_eq!(report.succeeded, 1);
    assert_eq!(healthy.calls_for("Y"), 3);
    assert_eq!(second.ledger.succeeded(), ids(&["Y"]));
    assert!(second.ledger.pending_retry().is_empty());
}

#[tokio::test]
async fn test_denied_accounts_skipped_unless_retry_denied() {
    let store = memory_store();

    let denying = Arc::new(FakeSteam::default().failing(
        Endpoint::Profile,
        "X",
        RemoteError::Unauthorized("HTTP 403".to_string()),
    ));
    Harness::new(denying, &store)
        .harvester(1)
        .harvest(&ids(&["X"]))
        .await
        .unwrap();

    let api = Arc::new(FakeSteam::default());
    let harness = Harness::new(api.clone(), &store);
    let report = harness.harvester(1).harvest(&ids(&["X"])).await.unwrap();
    assert_eq!(report.skipped, 1);
    assert_eq!(api.total_calls(), 0);

    let report = harness
        .harvester(1)
        .with_retry_denied(true)
        .harvest(&ids(&["X"]))
        .await
        .unwrap();
    assert_eq!(report.succeeded, 1);
    assert_eq!(api.calls_for("X"), 3);
    assert_eq!(harness.ledger.succeeded(), ids(&["X"]));
    assert!(harness.ledger.denied().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_outcome_classes_stay_disjoint() {
    let all: Vec<String> = (0..30).map(|i| format!("node-{}", i)).collect();
    let mut api = FakeSteam::default();
    for (i, id) in all.iter().enumerate() {
        api = match i % 3 {
            0 => api,
            1 => api.failing(
                Endpoint::Friends,
                id,
                RemoteError::Unauthorized("HTTP 401".to_string()),
            ),
            _ => api.failing(Endpoint::OwnedItems, id, RemoteError::RateLimited),
        };
    }
    let store = memory_store();
    let harness = Harness::new(Arc::new(api), &store);
    let discovered: HashSet<NodeId> = all.iter().map(|id| NodeId::from(id.as_str())).collect();

    let report = harness.harvester(4).harvest(&discovered).await.unwrap();

    let succeeded = harness.ledger.succeeded();
    let denied = harness.ledger.denied();
    let pending = harness.ledger.pending_retry();
    assert_eq!(succeeded.len(), 10);
    assert_eq!(denied.len(), 10);
    assert_eq!(pending.len(), 10);
    assert!(succeeded.is_disjoint(&denied));
    assert!(succeeded.is_disjoint(&pending));
    assert!(denied.is_disjoint(&pending));

    let union: HashSet<NodeId> = succeeded
        .union(&denied)
        .cloned()
        .collect::<HashSet<_>>()
        .union(&pending)
        .cloned()
        .collect();
    assert_eq!(union, discovered);
    assert_eq!(report.records.len(), 30);

    // Exactly one ledger event per processed account
    let events = lock_store(&store).unwrap().load_outcomes().unwrap();
    assert_eq!(events.len(), 30);
}

#[tokio::test(start_paused = true)]
async fn test_worker_limit_bounds_concurrency() {
    let api = Arc::new(FakeSteam {
        delay: Some(Duration::from_millis(100)),
        ..Default::default()
    });
    let store = memory_store();
    let harness = Harness::new(api.clone(), &store);

    let report = harness
        .harvester(2)
        .harvest(&ids(&["A", "B", "C", "D", "E", "F"]))
        .await
        .unwrap();

    assert_eq!(report.succeeded, 6);
    assert_eq!(api.max_in_flight.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_cancelled_harvest_marks_nothing() {
    let api = Arc::new(FakeSteam::default());
    let store = memory_store();
    let harness = Harness::new(api.clone(), &store);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = harness
        .harvester(2)
        .with_cancellation(cancel)
        .harvest(&ids(&["A", "B", "C"]))
        .await
        .unwrap();

    assert_eq!(report.cancelled, 3);
    assert!(report.records.is_empty());
    assert_eq!(api.total_calls(), 0);
    assert_eq!(harness.ledger.counts().total(), 0);
    assert!(lock_store(&store).unwrap().load_outcomes().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_breaks_out_of_quota_wait() {
    let api = Arc::new(FakeSteam::default());
    let store = memory_store();
    let ledger = Arc::new(Ledger::load(Arc::clone(&store), None).unwrap());
    let error_log = Arc::new(ErrorLog::in_memory());
    let cancel = CancellationToken::new();
    let client = RateLimitedClient::new(
        api.clone(),
        QuotaState::new(1, Duration::from_secs(86_400)),
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        },
    )
    .with_cancellation(cancel.clone());

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.cancel();
    });
    let start = tokio::time::Instant::now();

    // The profile lookup spends the whole quota; owned items must wait a day
    let report = Harvester::new(Arc::new(client), Arc::clone(&ledger), error_log.clone(), 1)
        .with_cancellation(cancel)
        .harvest(&ids(&["A"]))
        .await
        .unwrap();

    assert!(start.elapsed() < Duration::from_secs(60));
    assert_eq!(report.cancelled, 1);
    assert!(report.records.is_empty());
    assert_eq!(api.calls_to(Endpoint::Profile, "A"), 1);
    assert_eq!(api.calls_to(Endpoint::OwnedItems, "A"), 0);
    assert_eq!(ledger.counts().total(), 0);
    assert!(lock_store(&store).unwrap().load_outcomes().unwrap().is_empty());
    assert!(error_log.entries().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_unstarted_accounts_never_reach_the_api_after_cancel() {
    let api = Arc::new(FakeSteam {
        delay: Some(Duration::from_millis(100)),
        ..Default::default()
    });
    let store = memory_store();
    let harness = Harness::new(api.clone(), &store);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        trigger.cancel();
    });

    let report = harness
        .harvester(2)
        .with_cancellation(cancel)
        .harvest(&ids(&["A", "B", "C", "D", "E", "F"]))
        .await
        .unwrap();

    assert_eq!(report.cancelled, 6);
    assert_eq!(api.calls_for("A"), 2);
    assert_eq!(api.calls_for("B"), 2);
    assert_eq!(api.total_calls(), 4);
    assert_eq!(harness.ledger.counts().total(), 0);
}

/// Ledger backend whose outcome writes start failing after a set number
struct FlakyStore {
    inner: SqliteLedgerStore,
    appends_left: usize,
}

impl LedgerStore for FlakyStore {
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        self.inner.create_run(config_hash)
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.inner.get_run(run_id)
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        self.inner.get_latest_run()
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        self.inner.finish_run(run_id, status)
    }

    fn count_runs(&self) -> StorageResult<u64> {
        self.inner.count_runs()
    }

    fn append_outcome(
        &mut self,
        node_id: &NodeId,
        outcome: Outcome,
        run_id: Option<i64>,
    ) -> StorageResult<()> {
        if self.appends_left == 0 {
            return Err(StorageError::Database("disk full".to_string()));
        }
        self.appends_left -= 1;
        self.inner.append_outcome(node_id, outcome, run_id)
    }

    fn load_outcomes(&self) -> StorageResult<Vec<(NodeId, Outcome)>> {
        self.inner.load_outcomes()
    }

    fn count_run_outcomes(&self, run_id: i64) -> StorageResult<Vec<(Outcome, u64)>> {
        self.inner.count_run_outcomes(run_id)
    }
}

#[tokio::test]
async fn test_ledger_failure_still_writes_harvested_records() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path(), "A", "https://api.steampowered.com");
    config.harvest.max_workers = 1;
    let api = Arc::new(FakeSteam::with_graph(&[("A", &["B"])]));
    let store: SharedStore = Arc::new(Mutex::new(FlakyStore {
        inner: SqliteLedgerStore::new_in_memory().unwrap(),
        appends_left: 1,
    }));

    let result = run_harvest_with_store(
        config.clone(),
        "hash",
        api,
        Arc::clone(&store),
        CancellationToken::new(),
    )
    .await;

    assert!(matches!(result, Err(HarvestError::Storage(_))));

    // A was recorded; B was fetched but its outcome could not be stored
    let records = read_records(&config);
    assert_eq!(records.len(), 2);
    assert!(records.iter().any(|r| r["node_id"] == "B" && r["friends"].is_array()));

    let summary = std::fs::read_to_string(&config.output.summary_path).unwrap();
    assert!(summary.contains("- **Status**: failed"));

    let guard = lock_store(&store).unwrap();
    assert_eq!(guard.get_latest_run().unwrap().unwrap().status, RunStatus::Failed);
    assert_eq!(
        guard.load_outcomes().unwrap(),
        vec![(NodeId::from("A"), Outcome::Succeeded)]
    );
}

fn test_config(dir: &Path, seed: &str, base_url: &str) -> Config {
    let out = |name: &str| dir.join(name).to_string_lossy().into_owned();
    Config {
        harvest: HarvestConfig {
            seed: seed.to_string(),
            max_depth: 1,
            max_workers: 4,
            retry_denied: false,
        },
        quota: QuotaConfig {
            daily_limit: 1000,
            reset_window_secs: 3600,
        },
        retry: RetryConfig {
            max_retries: 3,
            base_delay_ms: 10,
        },
        api: ApiConfig {
            base_url: base_url.to_string(),
            api_key: Some("test-key".to_string()),
            request_timeout_secs: 5,
        },
        output: OutputConfig {
            database_path: out("data/progress.db"),
            results_path: out("data/all_steam_data.json"),
            summary_path: out("data/summary.md"),
            error_log_path: out("data/error_log.txt"),
        },
    }
}

fn read_records(config: &Config) -> Vec<serde_json::Value> {
    let content = std::fs::read_to_string(&config.output.results_path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&content).unwrap();
    value["records"].as_array().unwrap().clone()
}

#[tokio::test]
async fn test_full_run_is_resumable() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), "A", "https://api.steampowered.com");
    let api = Arc::new(
        FakeSteam::with_graph(&[("A", &["B", "X"])]).failing(
            Endpoint::OwnedItems,
            "X",
            RemoteError::Unauthorized("HTTP 401".to_string()),
        ),
    );

    let summary = run_harvest_with_api(
        config.clone(),
        "hash-1",
        api.clone(),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(summary.status, "completed");
    assert_eq!(summary.discovered, 3);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.denied, 1);
    assert_eq!(summary.records_written, 3);
    assert_eq!(read_records(&config).len(), 3);

    let markdown = std::fs::read_to_string(&config.output.summary_path).unwrap();
    assert!(markdown.contains("| Denied | 1 |"));
    let error_log = std::fs::read_to_string(&config.output.error_log_path).unwrap();
    assert!(error_log.contains("Error processing account X"));

    // Second run: discovery walks again, nothing is harvested again
    let rerun_api = Arc::new(FakeSteam::with_graph(&[("A", &["B", "X"])]));
    let summary = run_harvest_with_api(
        config.clone(),
        "hash-1",
        rerun_api.clone(),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(summary.skipped, 3);
    assert_eq!(summary.candidates, 0);
    assert_eq!(rerun_api.total_calls(), rerun_api.calls_to(Endpoint::Friends, "A"));
    assert!(read_records(&config).is_empty());
    assert_eq!(
        summary.ledger_totals.total(),
        3,
        "ledger keeps every account across runs"
    );

    let store = SqliteLedgerStore::new(Path::new(&config.output.database_path)).unwrap();
    assert_eq!(store.count_runs().unwrap(), 2);
}

#[tokio::test]
async fn test_cancelled_run_is_interrupted() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), "A", "https://api.steampowered.com");
    let api = Arc::new(FakeSteam::with_graph(&[("A", &["B"])]));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let summary = run_harvest_with_api(config.clone(), "hash", api.clone(), cancel)
        .await
        .unwrap();

    assert_eq!(summary.status, "interrupted");
    assert_eq!(summary.discovered, 1);
    assert_eq!(summary.cancelled, 1);
    assert_eq!(summary.ledger_totals.total(), 0);
    assert_eq!(api.total_calls(), 0);

    let store = SqliteLedgerStore::new(Path::new(&config.output.database_path)).unwrap();
    let run = store.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Interrupted);
    assert!(run.finished_at.is_some());
}

const SEED: &str = "76561197960287930";
const FRIEND: &str = "76561197960287931";

async fn mount_account(server: &MockServer, id: &str, friends: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/ISteamUser/GetPlayerSummaries/v2/"))
        .and(query_param("steamids", id))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "response": { "players": [{ "steamid": id, "personaname": format!("p{}", id) }] }
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/IPlayerService/GetOwnedGames/v1/"))
        .and(query_param("steamid", id))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "response": {
                "game_count": 1,
                "games": [{ "appid": 440, "name": "Team Fortress 2", "playtime_forever": 90 }]
            }
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/ISteamUser/GetFriendList/v1/"))
        .and(query_param("steamid", id))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "friendslist": { "friends": friends } })),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_run_against_steam_web_api() {
    let server = MockServer::start().await;
    mount_account(
        &server,
        SEED,
        serde_json::json!([
            { "steamid": FRIEND, "relationship": "friend", "friend_since": 1_500_000_000 }
        ]),
    )
    .await;
    mount_account(&server, FRIEND, serde_json::json!([])).await;

    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), SEED, &server.uri());

    let summary = run_harvest(config.clone(), "hash", CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.status, "completed");
    assert_eq!(summary.discovered, 2);
    assert_eq!(summary.succeeded, 2);
    // 1 discovery lookup + 3 sub-calls per account
    assert_eq!(summary.api_calls, 7);

    let records = read_records(&config);
    let seed = records.iter().find(|r| r["node_id"] == SEED).unwrap();
    assert_eq!(seed["profile"]["personaname"], format!("p{}", SEED));
    assert_eq!(seed["owned_items"]["games"][0]["appid"], 440);
    assert_eq!(seed["friends"][0]["friend_id"], FRIEND);
    assert_eq!(seed["friends"][0]["friend_since"], "2017-07-14");
}

#[tokio::test]
async fn test_run_without_api_key_fails_early() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path(), SEED, "http://127.0.0.1:9");
    config.api.api_key = Some(String::new());
    if std::env::var(steam_harvest::config::API_KEY_ENV).is_ok() {
        return;
    }

    let result = run_harvest(config.clone(), "hash", CancellationToken::new()).await;

    assert!(result.is_err());
    assert!(!Path::new(&config.output.database_path).exists());
}
