use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reelrank_core::{CreatorRef, Field, VideoMetrics, VideoSummary};
use reelrank_scraper::{Fetcher, FetcherFactory, ScraperError};

use super::*;

#[derive(Clone)]
enum Behavior {
    Videos(Vec<VideoSummary>),
    ListingFails,
    DetailFails(Vec<VideoSummary>),
    Panics,
    Hangs,
    DetailHangs(Vec<VideoSummary>),
    DetailPanics(Vec<VideoSummary>),
}

#[derive(Default)]
struct Counters {
    acquired: AtomicUsize,
    closed: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

#[derive(Clone)]
struct FakeFactory {
    behaviors: Arc<HashMap<String, Behavior>>,
    counters: Arc<Counters>,
    fail_acquire: bool,
}

impl FakeFactory {
    fn new(behaviors: Vec<(&str, Behavior)>) -> Self {
        Self {
            behaviors: Arc::new(
                behaviors
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect(),
            ),
            counters: Arc::new(Counters::default()),
            fail_acquire: false,
        }
    }
}

struct FakeFetcher {
    behaviors: Arc<HashMap<String, Behavior>>,
    counters: Arc<Counters>,
    current: Option<Behavior>,
}

impl FetcherFactory for FakeFactory {
    type Fetcher = FakeFetcher;

    async fn acquire(&self) -> Result<FakeFetcher, ScraperError> {
        if self.fail_acquire {
            return Err(ScraperError::WebDriver {
                error: "session not created".to_string(),
                message: "no browser".to_string(),
            });
        }
        self.counters.acquired.fetch_add(1, Ordering::SeqCst);
        let now = self.counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_in_flight.fetch_max(now, Ordering::SeqCst);
        Ok(FakeFetcher {
            behaviors: Arc::clone(&self.behaviors),
            counters: Arc::clone(&self.counters),
            current: None,
        })
    }
}

impl Fetcher for FakeFetcher {
    async fn creator_videos(
        &mut self,
        creator: &CreatorRef,
    ) -> Result<Vec<VideoSummary>, ScraperError> {
        tokio::time::sleep(Duration::from_millis(10)).await;
        let behavior = self
            .behaviors
            .get(creator.as_str())
            .cloned()
            .unwrap_or(Behavior::Videos(Vec::new()));
        self.current = Some(behavior.clone());
        match behavior {
            Behavior::Videos(videos)
            | Behavior::DetailFails(videos)
            | Behavior::DetailHangs(videos)
            | Behavior::DetailPanics(videos) => Ok(videos),
            Behavior::ListingFails => Err(ScraperError::ElementNotFound {
                selector: "post list".to_string(),
            }),
            Behavior::Panics => panic!("fetcher blew up"),
            Behavior::Hangs => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Vec::new())
            }
        }
    }

    async fn video_detail(&mut self, link: &str) -> Result<VideoMetrics, ScraperError> {
        match self.current {
            Some(Behavior::DetailFails(_)) => {
                return Err(ScraperError::UnexpectedStatus {
                    status: 500,
                    url: link.to_string(),
                });
            }
            Some(Behavior::DetailHangs(_)) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            Some(Behavior::DetailPanics(_)) => panic!("detail page blew up"),
            _ => {}
        }
        Ok(VideoMetrics {
            title: Field::Available(format!("detail of {link}")),
            like_count: Field::Available("1".to_string()),
            ..VideoMetrics::unavailable(link)
        })
    }

    async fn close(self) {
        self.counters.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
    }
}

fn video(link: &str, likes: &str) -> VideoSummary {
    VideoSummary {
        title: format!("title {link}"),
        like_count_raw: Some(likes.to_string()),
        link: link.to_string(),
    }
}

fn creators(names: &[&str]) -> Vec<CreatorRef> {
    names.iter().copied().map(CreatorRef::from).collect()
}

fn options(max_workers: usize) -> OrchestratorOptions {
    OrchestratorOptions {
        max_workers,
        ..OrchestratorOptions::default()
    }
}

#[test]
fn zero_workers_is_a_configuration_error() {
    let factory = FakeFactory::new(vec![]);
    let counters = Arc::clone(&factory.counters);

    let result = Orchestrator::new(factory, options(0));

    assert!(matches!(result, Err(PipelineError::Configuration(_))));
    assert_eq!(counters.acquired.load(Ordering::SeqCst), 0);
}

#[test]
fn zero_task_timeout_is_rejected() {
    let opts = OrchestratorOptions {
        task_timeout: Some(Duration::ZERO),
        ..OrchestratorOptions::default()
    };
    assert!(Orchestrator::new(FakeFactory::new(vec![]), opts).is_err());
}

#[test]
fn options_default_to_four_workers() {
    let opts = OrchestratorOptions::default();
    assert_eq!(opts.max_workers, 4);
    assert!(opts.task_timeout.is_none());
    assert!(opts.run_deadline.is_none());
}

#[tokio::test]
async fn selects_most_liked_video_and_attaches_creator() {
    let factory = FakeFactory::new(vec![(
        "alice",
        Behavior::Videos(vec![
            video("https://v/1", "10"),
            video("https://v/2", "1.2万"),
            video("https://v/3", "999"),
        ]),
    )]);
    let orchestrator = Orchestrator::new(factory, options(2)).unwrap();

    let run = orchestrator.run(creators(&["alice"]), None).await;

    assert_eq!(run.outcomes.len(), 1);
    let detail = run.outcomes[0].detail().expect("alice should succeed");
    assert_eq!(detail.link(), "https://v/2");
    assert_eq!(detail.creator.as_str(), "alice");
    assert_eq!(
        detail.metrics.title,
        Field::Available("detail of https://v/2".to_string())
    );
}

#[tokio::test]
async fn progress_counts_every_creator_once() {
    let factory = FakeFactory::new(vec![
        ("a", Behavior::Videos(vec![video("https://v/a", "1")])),
        ("b", Behavior::ListingFails),
        ("c", Behavior::Videos(vec![video("https://v/c", "2")])),
        ("d", Behavior::Videos(vec![])),
    ]);
    let orchestrator = Orchestrator::new(factory, options(2)).unwrap();

    let mut seen = Vec::new();
    let mut record = |completed: usize, total: usize| seen.push((completed, total));
    let run = orchestrator
        .run(creators(&["a", "b", "c", "d"]), Some(&mut record))
        .await;

    assert_eq!(seen, vec![(1, 4), (2, 4), (3, 4), (4, 4)]);
    assert_eq!(run.outcomes.len(), 4);
    assert_eq!(run.success_count(), 2);
}

#[tokio::test]
async fn failures_are_absorbed_per_creator() {
    let factory = FakeFactory::new(vec![
        ("listing", Behavior::ListingFails),
        ("empty", Behavior::Videos(vec![])),
        ("unrankable", Behavior::Videos(vec![video("https://v/x", "lots")])),
        ("detail", Behavior::DetailFails(vec![video("https://v/y", "5")])),
        ("ok", Behavior::Videos(vec![video("https://v/ok", "5")])),
    ]);
    let orchestrator = Orchestrator::new(factory, options(3)).unwrap();

    let run = orchestrator
        .run(
            creators(&["listing", "empty", "unrankable", "detail", "ok"]),
            None,
        )
        .await;

    let by_name: HashMap<_, _> = run
        .outcomes
        .iter()
        .map(|o| (o.creator.as_str().to_string(), &o.result))
        .collect();
    assert!(matches!(
        by_name["listing"],
        Err(TaskFailure::Fetch { stage: Stage::Listing, .. })
    ));
    assert!(matches!(by_name["empty"], Err(TaskFailure::EmptyListing)));
    assert!(matches!(by_name["unrankable"], Err(TaskFailure::Rank(_))));
    assert!(matches!(
        by_name["detail"],
        Err(TaskFailure::Fetch { stage: Stage::Detail, .. })
    ));
    assert!(by_name["ok"].is_ok());
}

#[tokio::test]
async fn every_acquired_fetcher_is_closed() {
    let factory = FakeFactory::new(vec![
        ("ok", Behavior::Videos(vec![video("https://v/ok", "5")])),
        ("listing", Behavior::ListingFails),
        ("empty", Behavior::Videos(vec![])),
        ("detail", Behavior::DetailFails(vec![video("https://v/d", "5")])),
        ("panics", Behavior::Panics),
    ]);
    let counters = Arc::clone(&factory.counters);
    let orchestrator = Orchestrator::new(factory, options(2)).unwrap();

    orchestrator
        .run(
            creators(&["ok", "listing", "empty", "detail", "panics"]),
            None,
        )
        .await;

    assert_eq!(counters.acquired.load(Ordering::SeqCst), 5);
    assert_eq!(counters.closed.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn panic_inside_fetcher_becomes_no_result() {
    let factory = FakeFactory::new(vec![
        ("panics", Behavior::Panics),
        ("ok", Behavior::Videos(vec![video("https://v/ok", "5")])),
    ]);
    let orchestrator = Orchestrator::new(factory, options(2)).unwrap();

    let run = orchestrator.run(creators(&["panics", "ok"]), None).await;

    assert_eq!(run.outcomes.len(), 2);
    assert_eq!(run.success_count(), 1);
    let panicked = run
        .outcomes
        .iter()
        .find(|o| o.creator.as_str() == "panics")
        .unwrap();
    assert!(matches!(
        panicked.result,
        Err(TaskFailure::Panicked {
            stage: Stage::Listing
        })
    ));
}

#[tokio::test]
async fn in_flight_pipelines_never_exceed_max_workers() {
    let behaviors: Vec<(&str, Behavior)> = ["a", "b", "c", "d", "e", "f", "g"]
        .into_iter()
        .map(|name| (name, Behavior::Videos(vec![video("https://v/1", "1")])))
        .collect();
    let factory = FakeFactory::new(behaviors);
    let counters = Arc::clone(&factory.counters);
    let orchestrator = Orchestrator::new(factory, options(3)).unwrap();

    let run = orchestrator
        .run(creators(&["a", "b", "c", "d", "e", "f", "g"]), None)
        .await;

    assert_eq!(run.success_count(), 7);
    let peak = counters.max_in_flight.load(Ordering::SeqCst);
    assert!(peak <= 3, "peak in-flight was {peak}");
    assert!(peak >= 2, "expected some overlap, peak was {peak}");
}

#[tokio::test(start_paused = true)]
async fn task_timeout_still_closes_fetcher() {
    let factory = FakeFactory::new(vec![
        ("slow", Behavior::Hangs),
        ("ok", Behavior::Videos(vec![video("https://v/ok", "5")])),
    ]);
    let counters = Arc::clone(&factory.counters);
    let opts = OrchestratorOptions {
        max_workers: 2,
        task_timeout: Some(Duration::from_secs(5)),
        run_deadline: None,
    };
    let orchestrator = Orchestrator::new(factory, opts).unwrap();

    let run = orchestrator.run(creators(&["slow", "ok"]), None).await;

    let slow = run
        .outcomes
        .iter()
        .find(|o| o.creator.as_str() == "slow")
        .unwrap();
    assert!(matches!(
        slow.result,
        Err(TaskFailure::TimedOut {
            stage: Stage::Listing,
            limit
        }) if limit == Duration::from_secs(5)
    ));
    assert_eq!(run.success_count(), 1);
    assert_eq!(counters.closed.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn acquire_failure_records_acquire_stage() {
    let mut factory = FakeFactory::new(vec![]);
    factory.fail_acquire = true;
    let counters = Arc::clone(&factory.counters);
    let orchestrator = Orchestrator::new(factory, options(1)).unwrap();

    let run = orchestrator.run(creators(&["a", "b"]), None).await;

    assert_eq!(run.outcomes.len(), 2);
    for outcome in &run.outcomes {
        assert!(matches!(
            outcome.result,
            Err(TaskFailure::Fetch { stage: Stage::Acquire, .. })
        ));
        assert_eq!(outcome.result.as_ref().unwrap_err().stage(), Stage::Acquire);
    }
    assert_eq!(counters.closed.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn run_deadline_skips_unstarted_creators() {
    let factory = FakeFactory::new(vec![
        ("slow", Behavior::Hangs),
        ("late1", Behavior::Videos(vec![video("https://v/1", "1")])),
        ("late2", Behavior::Videos(vec![video("https://v/2", "1")])),
    ]);
    let counters = Arc::clone(&factory.counters);
    let opts = OrchestratorOptions {
        max_workers: 1,
        task_timeout: Some(Duration::from_secs(30)),
        run_deadline: Some(Duration::from_secs(10)),
    };
    let orchestrator = Orchestrator::new(factory, opts).unwrap();

    let ticks = Mutex::new(Vec::new());
    let mut record = |completed: usize, total: usize| {
        ticks.lock().unwrap().push((completed, total));
    };
    let run = orchestrator
        .run(creators(&["slow", "late1", "late2"]), Some(&mut record))
        .await;

    let results: HashMap<_, _> = run
        .outcomes
        .iter()
        .map(|o| (o.creator.as_str().to_string(), &o.result))
        .collect();
    assert!(matches!(results["slow"], Err(TaskFailure::TimedOut { .. })));
    assert!(matches!(results["late1"], Err(TaskFailure::DeadlineExpired)));
    assert!(matches!(results["late2"], Err(TaskFailure::DeadlineExpired)));
    assert_eq!(counters.acquired.load(Ordering::SeqCst), 1);
    assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    assert_eq!(ticks.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn duplicate_creators_are_processed_independently() {
    let factory = FakeFactory::new(vec![(
        "alice",
        Behavior::Videos(vec![video("https://v/1", "1")]),
    )]);
    let counters = Arc::clone(&factory.counters);
    let orchestrator = Orchestrator::new(factory, options(2)).unwrap();

    let run = orchestrator.run(creators(&["alice", "alice"]), None).await;

    assert_eq!(run.success_count(), 2);
    assert_eq!(counters.acquired.load(Ordering::SeqCst), 2);
    let mut indexes: Vec<_> = run.outcomes.iter().map(|o| o.index).collect();
    indexes.sort_unstable();
    assert_eq!(indexes, vec![0, 1]);
}

#[tokio::test(start_paused = true)]
async fn interrupted_tasks_report_the_stage_they_were_in() {
    let factory = FakeFactory::new(vec![
        ("hangs-listing", Behavior::Hangs),
        ("panics-listing", Behavior::Panics),
        (
            "hangs-detail",
            Behavior::DetailHangs(vec![video("https://v/h", "1")]),
        ),
        (
            "panics-detail",
            Behavior::DetailPanics(vec![video("https://v/p", "1")]),
        ),
    ]);
    let counters = Arc::clone(&factory.counters);
    let opts = OrchestratorOptions {
        max_workers: 4,
        task_timeout: Some(Duration::from_secs(5)),
        run_deadline: None,
    };
    let orchestrator = Orchestrator::new(factory, opts).unwrap();

    let run = orchestrator
        .run(
            creators(&["hangs-listing", "panics-listing", "hangs-detail", "panics-detail"]),
            None,
        )
        .await;

    let stages: HashMap<_, _> = run
        .outcomes
        .iter()
        .map(|o| {
            let failure = o.result.as_ref().expect_err("every creator should fail");
            (o.creator.as_str().to_string(), (failure.stage(), failure.to_string()))
        })
        .collect();
    assert_eq!(stages["hangs-listing"].0, Stage::Listing);
    assert_eq!(stages["panics-listing"].0, Stage::Listing);
    assert_eq!(stages["hangs-detail"].0, Stage::Detail);
    assert_eq!(stages["panics-detail"].0, Stage::Detail);
    assert_eq!(stages["hangs-listing"].1, "listing stage still running after 5s");
    assert_eq!(stages["panics-detail"].1, "task panicked during detail");
    assert_eq!(counters.closed.load(Ordering::SeqCst), 4);
}

#[test]
fn failure_stage_labels() {
    assert_eq!(TaskFailure::EmptyListing.stage(), Stage::Ranking);
    assert_eq!(TaskFailure::DeadlineExpired.stage(), Stage::Schedule);
    assert_eq!(
        TaskFailure::Panicked {
            stage: Stage::Listing
        }
        .stage(),
        Stage::Listing
    );
    assert_eq!(Stage::Listing.to_string(), "listing");
}
