use crate::{
    collector::{
        Subcollector,
        SubcollectorKind,
    },
    sample::{
        fq_name,
        Desc,
        MetricError,
        Sample,
        NAMESPACE,
    },
    sink::{
        SampleSender,
        SampleSink,
        SampleStream,
        WorkingWindow,
    },
};
use brigade_exporter_service::Service;
use eyre::Result;
use futures::stream::{
    FuturesUnordered,
    StreamExt,
};
use std::{
    collections::BTreeMap,
    sync::Arc,
    time::Duration,
};
use strum::IntoEnumIterator;
use tokio::{
    task::JoinError,
    time::{
        sleep_until,
        Instant,
    },
};
use tracing::Instrument;

pub const DEFAULT_COLLECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Which subcollectors run and how long a cycle may take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExporterConfig {
    /// Bounds a whole cycle. Zero is honoured as is.
    pub collect_timeout: Duration,
    pub disable_projects: bool,
    pub disable_builds: bool,
    pub disable_jobs: bool,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            collect_timeout: DEFAULT_COLLECT_TIMEOUT,
            disable_projects: false,
            disable_builds: false,
            disable_jobs: false,
        }
    }
}

impl ExporterConfig {
    pub fn is_enabled(&self, kind: SubcollectorKind) -> bool {
        match kind {
            SubcollectorKind::Projects => !self.disable_projects,
            SubcollectorKind::Builds => !self.disable_builds,
            SubcollectorKind::Jobs => !self.disable_jobs,
        }
    }
}

/// How a subcollector did in one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutcome {
    pub collector: SubcollectorKind,
    pub elapsed: Duration,
    pub success: bool,
}

#[derive(Debug)]
struct OutcomeDescs {
    duration: Arc<Desc>,
    success: Arc<Desc>,
}

impl OutcomeDescs {
    fn new() -> Result<Self> {
        Ok(Self {
            duration: Arc::new(Desc::new(
                fq_name(NAMESPACE, "exporter", "collector_duration_seconds"),
                "Collector time duration.",
                &["collector"],
            )?),
            success: Arc::new(Desc::new(
                fq_name(NAMESPACE, "exporter", "collector_success"),
                "Whether a collector succeeded.",
                &["collector"],
            )?),
        })
    }

    fn samples(&self, outcome: &CycleOutcome) -> Result<[Sample; 2], MetricError> {
        let collector = outcome.collector.to_string();
        Ok([
            Sample::new(
                Arc::clone(&self.duration),
                outcome.elapsed.as_secs_f64(),
                [collector.as_str()],
            )?,
            Sample::new(
                Arc::clone(&self.success),
                if outcome.success { 1.0 } else { 0.0 },
                [collector],
            )?,
        ])
    }
}

/// Runs every enabled subcollector concurrently on each scrape.
pub struct Orchestrator {
    subcollectors: BTreeMap<SubcollectorKind, Arc<dyn Subcollector>>,
    collect_timeout: Duration,
    descs: Arc<OutcomeDescs>,
}

impl Orchestrator {
    pub fn new(config: ExporterConfig, service: Arc<dyn Service>) -> Result<Self> {
        let subcollectors = SubcollectorKind::iter()
            .filter(|kind| {
                let enabled = config.is_enabled(*kind);
                if !enabled {
                    warn!(collector = %kind, "collector disabled");
                }
                enabled
            })
            .map(|kind| -> Result<_> { Ok((kind, kind.subcollector(Arc::clone(&service))?)) })
            .collect::<Result<BTreeMap<_, _>>>()?;
        Self::with_subcollectors(config.collect_timeout, subcollectors)
    }

    pub fn with_subcollectors(
        collect_timeout: Duration,
        subcollectors: BTreeMap<SubcollectorKind, Arc<dyn Subcollector>>,
    ) -> Result<Self> {
        Ok(Self {
            subcollectors,
            collect_timeout,
            descs: Arc::new(OutcomeDescs::new()?),
        })
    }

    pub fn enabled(&self) -> impl Iterator<Item = SubcollectorKind> + '_ {
        self.subcollectors.keys().copied()
    }

    /// Starts a collection cycle in the background and returns its samples.
    ///
    /// The stream ends once every subcollector finished or the collect
    /// timeout passed, whichever comes first, and always carries a duration
    /// and a success sample per enabled subcollector.
    pub fn run_cycle(&self) -> SampleStream {
        let (sink, stream) = SampleSink::channel();
        let cycle = Cycle {
            subcollectors: self.subcollectors.clone(),
            window: WorkingWindow::new(self.collect_timeout),
            sink,
            descs: Arc::clone(&self.descs),
        };
        tokio::spawn(cycle.run().instrument(debug_span!("cycle")));
        stream
    }
}

struct Cycle {
    subcollectors: BTreeMap<SubcollectorKind, Arc<dyn Subcollector>>,
    window: WorkingWindow,
    sink: SampleSink,
    descs: Arc<OutcomeDescs>,
}

impl Cycle {
    async fn run(self) {
        debug!("starting collect");
        let started = Instant::now();

        let mut running = FuturesUnordered::new();
        for (kind, subcollector) in &self.subcollectors {
            let kind = *kind;
            let subcollector = Arc::clone(subcollector);
            let sender = SampleSender::new(self.sink.clone(), self.window.clone());
            let task = tokio::spawn(
                async move {
                    debug!("starting subcollection");
                    let started = Instant::now();
                    let result = subcollector.collect(&sender).await;
                    (started.elapsed(), result)
                }
                .instrument(info_span!("subcollect", collector = %kind)),
            );
            running.push(async move { (kind, task.await) });
        }

        let mut outcomes = BTreeMap::new();
        let deadline = sleep_until(self.window.deadline());
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                biased;
                _ = &mut deadline => break,
                finished = running.next() => match finished {
                    Some((kind, joined)) => {
                        outcomes.insert(kind, outcome(kind, joined, started));
                    }
                    None => break,
                },
            }
        }

        // Stragglers are detached, not aborted; the closed window makes their
        // next send fail.
        self.window.close();
        drop(running);

        for kind in self.subcollectors.keys() {
            let outcome = outcomes.entry(*kind).or_insert_with(|| {
                warn!(collector = %kind, "subcollection did not finish before the collect timeout");
                CycleOutcome {
                    collector: *kind,
                    elapsed: started.elapsed(),
                    success: false,
                }
            });
            let samples = match self.descs.samples(outcome) {
                Ok(samples) => samples,
                Err(err) => {
                    error!(collector = %kind, "Failed to build outcome samples: {err}");
                    continue;
                }
            };
            for sample in samples {
                if self.sink.send(sample).is_err() {
                    debug!("sample stream dropped before the cycle finished");
                    break;
                }
            }
        }

        self.sink.close();
        debug!(elapsed = ?started.elapsed(), "finished collect");
    }
}

fn outcome(
    collector: SubcollectorKind,
    joined: Result<(Duration, Result<()>), JoinError>,
    started: Instant,
) -> CycleOutcome {
    let (elapsed, success) = match joined {
        Ok((elapsed, Ok(()))) => {
            debug!(%collector, ?elapsed, "subcollection finished");
            (elapsed, true)
        }
        Ok((elapsed, Err(err))) => {
            warn!(%collector, ?elapsed, "subcollection failed: {err:#}");
            (elapsed, false)
        }
        Err(err) => {
            error!(%collector, "subcollection task did not complete: {err}");
            (started.elapsed(), false)
        }
    };
    CycleOutcome {
        collector,
        elapsed,
        success,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        rendered,
        StaticService,
    };
    use brigade_exporter_service::{
        records::{
            BuildRecord,
            JobRecord,
            ProjectRecord,
        },
        Brigade,
        Store,
    };
    use eyre::eyre;
    use futures::future::BoxFuture;
    use pretty_assertions::assert_eq;

    async fn cycle(orchestrator: &Orchestrator) -> Vec<Sample> {
        orchestrator.run_cycle().collect().await
    }

    fn successes(samples: &[Sample]) -> BTreeMap<String, f64> {
        samples
            .iter()
            .filter(|s| s.name() == "brigade_exporter_collector_success")
            .map(|s| (s.label("collector").unwrap_or_default().to_string(), s.value()))
            .collect()
    }

    fn data_samples(samples: &[Sample]) -> Vec<&Sample> {
        samples
            .iter()
            .filter(|s| !s.name().starts_with("brigade_exporter_"))
            .collect()
    }

    fn count(samples: &[Sample], name: &str) -> usize {
        samples.iter().filter(|s| s.name() == name).count()
    }

    #[tokio::test]
    async fn full_cycle_reports_every_entity_and_collector() {
        let orchestrator = Orchestrator::new(ExporterConfig::default(), Arc::new(StaticService::default())).unwrap();
        let samples = cycle(&orchestrator).await;

        assert_eq!(
            successes(&samples),
            BTreeMap::from([("builds".into(), 1.0), ("jobs".into(), 1.0), ("projects".into(), 1.0)])
        );
        assert_eq!(count(&samples, "brigade_exporter_collector_duration_seconds"), 3);

        assert_eq!(count(&samples, "brigade_project_info"), 3);
        assert_eq!(count(&samples, "brigade_build_info"), 3);
        assert_eq!(count(&samples, "brigade_build_status"), 3);
        assert_eq!(count(&samples, "brigade_build_duration_seconds"), 3);
        assert_eq!(count(&samples, "brigade_job_info"), 3);
        assert_eq!(count(&samples, "brigade_job_status"), 3);
        assert_eq!(count(&samples, "brigade_job_duration_seconds"), 3);
        assert_eq!(count(&samples, "brigade_job_create_time_seconds"), 3);
        assert_eq!(count(&samples, "brigade_job_start_time_seconds"), 3);

        let lines = rendered(&samples);
        assert!(lines.contains(&r#"brigade_build_duration_seconds{id="id3"} 18"#.to_string()));
        assert!(lines.contains(&r#"brigade_build_status{id="id1",status="Running"} 1"#.to_string()));
    }

    #[tokio::test]
    async fn disabled_collectors_are_absent() {
        let config = ExporterConfig {
            disable_builds: true,
            disable_jobs: true,
            ..Default::default()
        };
        let orchestrator = Orchestrator::new(config, Arc::new(StaticService::default())).unwrap();
        assert_eq!(orchestrator.enabled().collect::<Vec<_>>(), vec![SubcollectorKind::Projects]);

        for _ in 0..2 {
            let samples = cycle(&orchestrator).await;
            assert_eq!(successes(&samples), BTreeMap::from([("projects".into(), 1.0)]));
            assert_eq!(count(&samples, "brigade_exporter_collector_duration_seconds"), 1);
            assert!(samples.iter().all(|s| !s.name().starts_with("brigade_build_")));
            assert!(samples.iter().all(|s| !s.name().starts_with("brigade_job_")));
            assert_eq!(count(&samples, "brigade_project_info"), 3);
        }
    }

    #[tokio::test]
    async fn zero_timeout_fails_every_collector_without_data() {
        let config = ExporterConfig {
            collect_timeout: Duration::ZERO,
            ..Default::default()
        };
        let orchestrator = Orchestrator::new(config, Arc::new(StaticService::default())).unwrap();
        let samples = cycle(&orchestrator).await;

        assert_eq!(
            successes(&samples),
            BTreeMap::from([("builds".into(), 0.0), ("jobs".into(), 0.0), ("projects".into(), 0.0)])
        );
        assert!(data_samples(&samples).is_empty());
    }

    #[tokio::test]
    async fn failing_source_only_fails_its_collector() {
        let failing: Arc<dyn Service> = Arc::new(StaticService::failing());
        let healthy: Arc<dyn Service> = Arc::new(StaticService::default());
        let orchestrator = Orchestrator::with_subcollectors(
            DEFAULT_COLLECT_TIMEOUT,
            BTreeMap::from([
                (SubcollectorKind::Projects, SubcollectorKind::Projects.subcollector(failing).unwrap()),
                (SubcollectorKind::Builds, SubcollectorKind::Builds.subcollector(Arc::clone(&healthy)).unwrap()),
                (SubcollectorKind::Jobs, SubcollectorKind::Jobs.subcollector(healthy).unwrap()),
            ]),
        )
        .unwrap();
        let samples = cycle(&orchestrator).await;

        assert_eq!(
            successes(&samples),
            BTreeMap::from([("builds".into(), 1.0), ("jobs".into(), 1.0), ("projects".into(), 0.0)])
        );
        assert_eq!(count(&samples, "brigade_project_info"), 0);
        assert_eq!(count(&samples, "brigade_build_info"), 3);
    }

    #[tokio::test]
    async fn slow_collector_times_out_while_others_succeed() {
        let slow: Arc<dyn Service> = Arc::new(StaticService {
            delay: Duration::from_secs(30),
            ..Default::default()
        });
        let fast: Arc<dyn Service> = Arc::new(StaticService::default());
        let orchestrator = Orchestrator::with_subcollectors(
            Duration::from_millis(200),
            BTreeMap::from([
                (SubcollectorKind::Projects, SubcollectorKind::Projects.subcollector(fast).unwrap()),
                (SubcollectorKind::Jobs, SubcollectorKind::Jobs.subcollector(slow).unwrap()),
            ]),
        )
        .unwrap();

        let started = Instant::now();
        let samples = cycle(&orchestrator).await;
        assert!(started.elapsed() < Duration::from_secs(5));

        assert_eq!(
            successes(&samples),
            BTreeMap::from([("jobs".into(), 0.0), ("projects".into(), 1.0)])
        );
        assert_eq!(count(&samples, "brigade_job_info"), 0);
        assert_eq!(count(&samples, "brigade_project_info"), 3);
    }

    struct PanickingCollector;

    async fn explode() -> Result<()> {
        panic!("boom")
    }

    impl Subcollector for PanickingCollector {
        fn collect<'a>(&'a self, _sender: &'a SampleSender) -> BoxFuture<'a, Result<()>> {
            Box::pin(explode())
        }
    }

    #[tokio::test]
    async fn panicking_collector_is_recorded_as_failed() {
        let orchestrator = Orchestrator::with_subcollectors(
            DEFAULT_COLLECT_TIMEOUT,
            BTreeMap::from([
                (SubcollectorKind::Builds, Arc::new(PanickingCollector) as Arc<dyn Subcollector>),
                (
                    SubcollectorKind::Projects,
                    SubcollectorKind::Projects.subcollector(Arc::new(StaticService::default())).unwrap(),
                ),
            ]),
        )
        .unwrap();
        let samples = cycle(&orchestrator).await;
        assert_eq!(
            successes(&samples),
            BTreeMap::from([("builds".into(), 0.0), ("projects".into(), 1.0)])
        );
    }

    /// Writes one sample, then keeps writing after the cycle gave up on it.
    struct LingeringCollector {
        sent_after_timeout: Arc<std::sync::Mutex<Option<crate::sink::SendError>>>,
    }

    impl LingeringCollector {
        async fn linger(&self, sender: &SampleSender) -> Result<()> {
            let desc = Arc::new(Desc::new("brigade_project_info", "Brigade project information.", &["id"])?);
            sender.send(Sample::new(Arc::clone(&desc), 1.0, ["early"])?)?;
            tokio::time::sleep(Duration::from_millis(300)).await;
            let result = sender.send(Sample::new(desc, 1.0, ["late"])?);
            *self.sent_after_timeout.lock().unwrap() = result.err();
            result?;
            Ok(())
        }
    }

    impl Subcollector for LingeringCollector {
        fn collect<'a>(&'a self, sender: &'a SampleSender) -> BoxFuture<'a, Result<()>> {
            Box::pin(self.linger(sender))
        }
    }

    #[tokio::test]
    async fn writes_after_the_deadline_are_rejected() {
        let rejected = Arc::new(std::sync::Mutex::new(None));
        let orchestrator = Orchestrator::with_subcollectors(
            Duration::from_millis(100),
            BTreeMap::from([(
                SubcollectorKind::Projects,
                Arc::new(LingeringCollector {
                    sent_after_timeout: Arc::clone(&rejected),
                }) as Arc<dyn Subcollector>,
            )]),
        )
        .unwrap();

        let samples = cycle(&orchestrator).await;
        let lines = rendered(&samples);
        assert!(lines.contains(&r#"brigade_project_info{id="early"} 1"#.to_string()));
        assert!(!lines.iter().any(|l| l.contains("late")));
        assert_eq!(successes(&samples), BTreeMap::from([("projects".into(), 0.0)]));

        // The detached task keeps running and observes the closed window.
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(*rejected.lock().unwrap(), Some(crate::sink::SendError::WindowClosed));
    }

    #[tokio::test]
    async fn no_enabled_collectors_yield_an_empty_cycle() {
        let config = ExporterConfig {
            disable_projects: true,
            disable_builds: true,
            disable_jobs: true,
            ..Default::default()
        };
        let orchestrator = Orchestrator::new(config, Arc::new(StaticService::default())).unwrap();
        assert!(cycle(&orchestrator).await.is_empty());
    }

    /// Store where the job lookup of one build fails.
    struct PartialStore;

    impl Store for PartialStore {
        fn list_projects(&self) -> BoxFuture<'_, Result<Vec<ProjectRecord>>> {
            Box::pin(async { Ok(Vec::new()) })
        }

        fn list_builds(&self) -> BoxFuture<'_, Result<Vec<BuildRecord>>> {
            Box::pin(async {
                Ok((1..=3)
                    .map(|i| BuildRecord {
                        id: format!("bld{i}"),
                        ..Default::default()
                    })
                    .collect())
            })
        }

        fn list_jobs<'a>(&'a self, build: &'a BuildRecord) -> BoxFuture<'a, Result<Vec<JobRecord>>> {
            Box::pin(async move {
                if build.id == "bld2" {
                    return Err(eyre!("jobs of {} are gone", build.id));
                }
                Ok(vec![JobRecord {
                    id: format!("{}-job", build.id),
                    ..Default::default()
                }])
            })
        }
    }

    #[tokio::test]
    async fn partial_job_lookup_failure_is_absorbed() {
        let config = ExporterConfig {
            disable_projects: true,
            disable_builds: true,
            ..Default::default()
        };
        let orchestrator = Orchestrator::new(config, Arc::new(Brigade::new(Arc::new(PartialStore)))).unwrap();
        let samples = cycle(&orchestrator).await;

        assert_eq!(successes(&samples), BTreeMap::from([("jobs".into(), 1.0)]));
        let mut jobs: Vec<_> = samples
            .iter()
            .filter(|s| s.name() == "brigade_job_info")
            .map(|s| s.label("build_id").unwrap_or_default().to_string())
            .collect();
        jobs.sort();
        assert_eq!(jobs, vec!["bld1", "bld3"]);
    }
}
