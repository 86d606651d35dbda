//! Pipeline service - orchestrates the delivery pipeline
//!
//! Composes the three stages (Source, Build, Deployment) in strict order with
//! a single active stage, owns the run-scoped artifact store, and fails the
//! whole run on the first stage failure. Later stages never start after a
//! failure, and there is no pipeline-level retry.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::Local;
use colored::Colorize;
use tracing::{debug, info, warn};

use crate::config::DeployConfig;
use crate::domain::artifact::{Artifact, ArtifactStore};
use crate::domain::image::{revision_tag, ImageReference};
use crate::domain::manifest::{
    content_digest, parse_image_definitions, render_image_definitions, ImageDefinition,
};
use crate::domain::run::{BuildStep, PipelineStage, RunPhase, RunSummary, StageResult, StepResult};
use crate::error::{DeploymentError, PipelineError, RegistryError};
use crate::infrastructure::engine::{registry_host, ContainerEngine, DockerEngine};
use crate::infrastructure::identity::{IdentityProvider, StsIdentity};
use crate::infrastructure::orchestrator::{EcsOrchestrator, Orchestrator, Rollout, ServiceTarget};
use crate::infrastructure::source::{GitSource, SourceProvider};
use crate::ui;

/// What a completed Build stage hands over
#[derive(Debug, Clone)]
pub struct BuildProducts {
    pub image: ImageReference,
    pub tag: String,
    pub manifest_content: String,
}

/// Values the build steps resolve as they execute, in step order
#[derive(Default)]
struct BuildState {
    registry_uri: String,
    tag: String,
    manifest_content: String,
}

/// Service for orchestrating pipeline runs
pub struct PipelineService {
    config: DeployConfig,
    source: Box<dyn SourceProvider>,
    engine: Box<dyn ContainerEngine>,
    identity: Box<dyn IdentityProvider>,
    orchestrator: Box<dyn Orchestrator>,
}

impl PipelineService {
    /// Create a pipeline service with explicit collaborators
    pub fn new(
        config: DeployConfig,
        source: Box<dyn SourceProvider>,
        engine: Box<dyn ContainerEngine>,
        identity: Box<dyn IdentityProvider>,
        orchestrator: Box<dyn Orchestrator>,
    ) -> Self {
        Self {
            config,
            source,
            engine,
            identity,
            orchestrator,
        }
    }

    /// Create a pipeline service with the production adapters
    pub fn production(config: DeployConfig) -> Self {
        let region = config.project.region.clone();
        Self::new(
            config,
            Box::new(GitSource::new()),
            Box::new(DockerEngine::new(region.clone())),
            Box::new(StsIdentity::new(region.clone())),
            Box::new(EcsOrchestrator::new(region)),
        )
    }

    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    /// Execute a full pipeline run.
    ///
    /// `cancel` is checked at stage boundaries only: an operator cancellation
    /// stops later stages but never rolls back work a finished stage already
    /// did (a pushed `latest` tag stays pushed).
    pub async fn run(&self, cancel: &AtomicBool) -> Result<RunSummary, PipelineError> {
        let mut summary = RunSummary::new();
        self.print_header(&summary);

        let mut store = ArtifactStore::new()?;
        let mut revision = String::new();

        for stage in PipelineStage::SEQUENCE {
            if cancel.load(Ordering::SeqCst) {
                summary.phase = RunPhase::Cancelled(stage);
                warn!("🛑 Run cancelled before {} stage", stage.name());
                self.print_summary(&summary);
                return Err(PipelineError::Cancelled {
                    stage: stage.name().to_string(),
                });
            }

            summary.phase = RunPhase::InProgress(stage);
            info!("{} Stage: {}", stage.emoji(), stage.name());

            let start = Instant::now();
            let result = match stage {
                PipelineStage::Source => self.run_source_stage(&mut store, &mut revision).await,
                PipelineStage::Build => {
                    self.run_build_stage(&mut store, &revision, &mut summary).await
                }
                PipelineStage::Deployment => {
                    self.run_deployment_stage(&store).await.map(|_| ())
                }
            };
            let duration = start.elapsed();

            match result {
                Ok(()) => {
                    info!(
                        "{} {} stage completed in {:.1}s",
                        "✅".green(),
                        stage.name(),
                        duration.as_secs_f64()
                    );
                    summary.stages.push(StageResult::success(stage, duration));
                }
                Err(e) => {
                    let message = e.to_string();
                    info!("{} {} stage failed: {}", "❌".red(), stage.name(), message);
                    summary.stages.push(StageResult::failure(stage, duration, &message));
                    summary.phase = RunPhase::Failed(stage);
                    self.print_summary(&summary);
                    return Err(e);
                }
            }
        }

        summary.phase = RunPhase::Completed;
        self.print_summary(&summary);
        Ok(summary)
    }

    /// Source stage: fetch the branch head into the source artifact
    async fn run_source_stage(
        &self,
        store: &mut ArtifactStore,
        revision_out: &mut String,
    ) -> Result<(), PipelineError> {
        let artifact = store.declare(&self.config.pipeline.source_artifact)?;
        let revision = self
            .source
            .fetch(
                &self.config.source_repository(),
                &self.config.pipeline.branch,
                artifact.dir(),
            )
            .await?;
        store.publish(&artifact)?;
        debug!(
            "source artifact digest {}",
            store.digest(&self.config.pipeline.source_artifact)?
        );
        *revision_out = revision.id;
        Ok(())
    }

    /// Build stage: six gated steps, then publish the manifest artifact
    async fn run_build_stage(
        &self,
        store: &mut ArtifactStore,
        revision: &str,
        summary: &mut RunSummary,
    ) -> Result<(), PipelineError> {
        let source = store.open(&self.config.pipeline.source_artifact)?;
        let manifest_artifact = store.declare(&self.config.pipeline.manifest_artifact)?;

        self.run_build_steps(
            source.dir(),
            revision,
            &manifest_artifact,
            &mut summary.build_steps,
        )
        .await?;

        // Only a fully successful stage publishes its artifact
        store.publish(&manifest_artifact)?;
        debug!(
            "manifest artifact digest {}",
            store.digest(&self.config.pipeline.manifest_artifact)?
        );
        Ok(())
    }

    /// Run the build steps in order, recording a result per step
    async fn run_build_steps(
        &self,
        source_dir: &Path,
        revision: &str,
        manifest_artifact: &Artifact,
        results: &mut Vec<StepResult>,
    ) -> Result<BuildProducts, PipelineError> {
        let mut state = BuildState::default();
        info!("Build started on {}", Local::now().format("%a %b %e %H:%M:%S %Y"));

        let total = BuildStep::SEQUENCE.len();
        for (index, step) in BuildStep::SEQUENCE.iter().enumerate() {
            ui::print_step(index + 1, total, step.name());

            let start = Instant::now();
            let result = self
                .execute_build_step(*step, source_dir, revision, manifest_artifact, &mut state)
                .await;
            let duration = start.elapsed();

            match result {
                Ok(()) => {
                    info!(
                        "{} {} completed in {:.1}s",
                        "✅".green(),
                        step.name(),
                        duration.as_secs_f64()
                    );
                    results.push(StepResult::success(*step, duration));
                }
                Err(e) => {
                    let message = e.to_string();
                    info!("{} {} failed: {}", "❌".red(), step.name(), message);
                    results.push(StepResult::failure(*step, duration, &message));
                    return Err(e);
                }
            }
        }

        info!("Build completed on {}", Local::now().format("%a %b %e %H:%M:%S %Y"));
        Ok(BuildProducts {
            image: ImageReference::new(&state.registry_uri, &state.tag),
            tag: state.tag,
            manifest_content: state.manifest_content,
        })
    }

    /// Execute a single build step
    async fn execute_build_step(
        &self,
        step: BuildStep,
        source_dir: &Path,
        revision: &str,
        manifest_artifact: &Artifact,
        state: &mut BuildState,
    ) -> Result<(), PipelineError> {
        match step {
            BuildStep::Authenticate => {
                let limit = self.config.pipeline.auth_timeout();
                let account = match &self.config.project.account {
                    Some(account) if !account.is_empty() => account.clone(),
                    _ => {
                        with_timeout(limit, self.identity.account_id(), || {
                            RegistryError::AuthTimeout {
                                timeout_secs: limit.as_secs(),
                            }
                        })
                        .await?
                    }
                };
                let registry_uri = self.config.registry_uri(&account);
                let host = registry_host(&registry_uri);
                with_timeout(limit, self.engine.login(&host), || RegistryError::AuthTimeout {
                    timeout_secs: limit.as_secs(),
                })
                .await?;
                state.registry_uri = registry_uri;
                Ok(())
            }
            BuildStep::ResolveTag => {
                state.tag = revision_tag(revision);
                info!("🏷️  Image tag resolved: {}", state.tag);
                Ok(())
            }
            BuildStep::BuildImage => {
                let image = ImageReference::latest(&state.registry_uri);
                let env = self.build_env(&state.registry_uri, revision);
                self.engine.build(source_dir, &image, &env).await?;
                Ok(())
            }
            BuildStep::TagImage => {
                let latest = ImageReference::latest(&state.registry_uri);
                let tagged = latest.with_tag(&state.tag);
                self.engine.tag(&latest, &tagged).await?;
                Ok(())
            }
            BuildStep::Push => {
                let latest = ImageReference::latest(&state.registry_uri);
                let tagged = latest.with_tag(&state.tag);
                for image in [latest, tagged] {
                    self.push_with_attempts(&image).await?;
                }
                Ok(())
            }
            BuildStep::EmitManifest => {
                let image = ImageReference::new(&state.registry_uri, &state.tag);
                let definition =
                    ImageDefinition::new(&self.config.service.container_name, &image);
                let content = render_image_definitions(&[definition]);
                manifest_artifact.write_file(&self.config.pipeline.manifest_file, &content)?;
                info!("📝 Manifest: {}", content);
                debug!("manifest content digest {}", content_digest(&content));
                state.manifest_content = content;
                Ok(())
            }
        }
    }

    /// Push one tag, retrying up to the configured attempt count
    async fn push_with_attempts(&self, image: &ImageReference) -> Result<(), PipelineError> {
        let max_attempts = self.config.pipeline.push_attempts.max(1);
        let limit = self.config.pipeline.push_timeout();
        let mut attempts = 0;

        loop {
            attempts += 1;
            let result = with_timeout(limit, self.engine.push(image), || {
                RegistryError::PushTimeout {
                    timeout_secs: limit.as_secs(),
                }
            })
            .await;

            match result {
                Ok(()) => {
                    info!("✅ Pushed {} (attempt {}/{})", image, attempts, max_attempts);
                    return Ok(());
                }
                Err(e) if attempts < max_attempts => {
                    warn!(
                        "⚠️  Push attempt {}/{} failed for {}: {}",
                        attempts, max_attempts, image, e
                    );
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
                Err(e) => {
                    return Err(RegistryError::PushFailed {
                        attempts,
                        message: push_message(&e),
                    }
                    .into());
                }
            }
        }
    }

    /// Deployment stage: open the published manifest and submit the rollout
    async fn run_deployment_stage(&self, store: &ArtifactStore) -> Result<Rollout, PipelineError> {
        let artifact = store.open(&self.config.pipeline.manifest_artifact)?;
        let content = artifact.read_file(&self.config.pipeline.manifest_file)?;
        let definitions = parse_image_definitions(&content)?;
        self.submit_deployment(&definitions).await
    }

    /// Submit a rolling update for the given image definitions
    pub async fn submit_deployment(
        &self,
        definitions: &[ImageDefinition],
    ) -> Result<Rollout, PipelineError> {
        let target = ServiceTarget {
            cluster: self.config.cluster_name(),
            service: self.config.service.name.clone(),
            task_family: self.config.task_family(),
        };
        let limit = self.config.pipeline.deploy_timeout();

        let rollout = with_timeout(
            limit,
            self.orchestrator.submit_rolling_update(&target, definitions),
            || DeploymentError::SubmitTimeout {
                timeout_secs: limit.as_secs(),
            },
        )
        .await?;

        info!(
            "Rollout policy: min {}% / max {}% healthy, circuit breaker {}",
            self.config.service.min_healthy_percent,
            self.config.service.max_healthy_percent,
            if self.config.service.circuit_breaker_rollback {
                "on"
            } else {
                "off"
            }
        );
        Ok(rollout)
    }

    /// Build stage standalone, against an existing source tree.
    ///
    /// Used by the `build` command; the manifest still goes through a
    /// run-scoped artifact before the caller exports it.
    pub async fn execute_build(
        &self,
        source_dir: &Path,
        revision: &str,
    ) -> Result<(BuildProducts, Vec<StepResult>), PipelineError> {
        let mut store = ArtifactStore::new()?;
        let manifest_artifact = store.declare(&self.config.pipeline.manifest_artifact)?;
        let mut results = Vec::new();
        let products = self
            .run_build_steps(source_dir, revision, &manifest_artifact, &mut results)
            .await?;
        store.publish(&manifest_artifact)?;
        Ok((products, results))
    }

    fn build_env(&self, registry_uri: &str, revision: &str) -> Vec<(String, String)> {
        let mut env = vec![
            ("REPOSITORY_URI".to_string(), registry_uri.to_string()),
            (
                "ECS_CONTAINER_NAME".to_string(),
                self.config.service.container_name.clone(),
            ),
        ];
        if !revision.is_empty() {
            env.push(("RESOLVED_SOURCE_VERSION".to_string(), revision.to_string()));
        }
        env
    }

    fn print_header(&self, summary: &RunSummary) {
        ui::print_header(&format!("Pipeline Run: {}", self.config.project.prefix));
        info!("Run ID: {}", summary.run_id);
        info!(
            "Repository: {} (branch {})",
            self.config.source_repository(),
            self.config.pipeline.branch
        );
        info!(
            "Service: {}/{}",
            self.config.cluster_name(),
            self.config.service.name
        );
        println!();
    }

    fn print_summary(&self, summary: &RunSummary) {
        println!();
        println!(
            "{}",
            "════════════════════════════════════════════════════════════".bright_blue()
        );

        match summary.phase {
            RunPhase::Completed => {
                println!(
                    "{}",
                    format!("✅ Pipeline completed: {}", self.config.project.prefix)
                        .bright_green()
                        .bold()
                );
            }
            RunPhase::Failed(stage) => {
                println!(
                    "{}",
                    format!("❌ Pipeline failed at {} stage", stage.name())
                        .bright_red()
                        .bold()
                );
            }
            RunPhase::Cancelled(stage) => {
                println!(
                    "{}",
                    format!("🛑 Pipeline cancelled before {} stage", stage.name())
                        .bright_yellow()
                        .bold()
                );
            }
            _ => {}
        }

        println!();
        for result in &summary.stages {
            let status = if result.success { "✅" } else { "❌" };
            println!(
                "   {} {} ({:.1}s)",
                status,
                result.stage.name(),
                result.duration.as_secs_f64()
            );
            if result.stage == PipelineStage::Build {
                for step in &summary.build_steps {
                    let status = if step.success { "✅" } else { "❌" };
                    println!(
                        "      {} {} ({:.1}s)",
                        status,
                        step.step.name(),
                        step.duration.as_secs_f64()
                    );
                }
            }
        }
        if let Some(message) = summary
            .stages
            .iter()
            .find(|result| !result.success)
            .and_then(|result| result.message.as_deref())
        {
            println!();
            println!("   {}", message.bright_red());
        }
        println!();
        info!(
            "Run {} finished in {:.1}s",
            summary.run_id,
            summary.total_duration().as_secs_f64()
        );
    }
}

async fn with_timeout<T, E, F>(
    limit: Duration,
    future: F,
    on_timeout: impl FnOnce() -> E,
) -> Result<T, E>
where
    F: std::future::Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => Err(on_timeout()),
    }
}

/// Keep the underlying push message when wrapping the final attempt count
fn push_message(e: &RegistryError) -> String {
    match e {
        RegistryError::PushFailed { message, .. } => message.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use crate::infrastructure::source::SourceRevision;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicBool;
    use std::sync::{Arc, Mutex};

    struct FakeSource {
        revision: String,
        fail: bool,
    }

    #[async_trait]
    impl SourceProvider for FakeSource {
        async fn fetch(
            &self,
            repository: &str,
            _branch: &str,
            dest: &Path,
        ) -> Result<SourceRevision, SourceError> {
            if self.fail {
                return Err(SourceError::RepositoryNotFound {
                    repository: repository.to_string(),
                });
            }
            std::fs::write(dest.join("Dockerfile"), "FROM nginx:alpine\n").map_err(|e| {
                SourceError::FetchFailed {
                    message: e.to_string(),
                }
            })?;
            Ok(SourceRevision {
                id: self.revision.clone(),
            })
        }
    }

    #[derive(Default)]
    struct EngineCalls {
        logins: Vec<String>,
        builds: Vec<String>,
        tags: Vec<(String, String)>,
        pushes: Vec<String>,
    }

    struct FakeEngine {
        calls: Arc<Mutex<EngineCalls>>,
        fail_push: bool,
        fail_tag: bool,
        cancel_after_push: Option<Arc<AtomicBool>>,
    }

    impl FakeEngine {
        fn new(calls: Arc<Mutex<EngineCalls>>) -> Self {
            Self {
                calls,
                fail_push: false,
                fail_tag: false,
                cancel_after_push: None,
            }
        }
    }

    #[async_trait]
    impl ContainerEngine for FakeEngine {
        async fn login(&self, registry_host: &str) -> Result<(), RegistryError> {
            self.calls.lock().unwrap().logins.push(registry_host.to_string());
            Ok(())
        }

        async fn build(
            &self,
            _context: &Path,
            image: &ImageReference,
            env: &[(String, String)],
        ) -> Result<(), crate::error::BuildError> {
            assert!(env.iter().any(|(k, _)| k == "REPOSITORY_URI"));
            assert!(env.iter().any(|(k, _)| k == "ECS_CONTAINER_NAME"));
            self.calls.lock().unwrap().builds.push(image.uri());
            Ok(())
        }

        async fn tag(
            &self,
            from: &ImageReference,
            to: &ImageReference,
        ) -> Result<(), crate::error::BuildError> {
            if self.fail_tag {
                return Err(crate::error::BuildError::TagFailed {
                    image: to.uri(),
                    message: "no such image".to_string(),
                });
            }
            self.calls.lock().unwrap().tags.push((from.uri(), to.uri()));
            Ok(())
        }

        async fn push(&self, image: &ImageReference) -> Result<(), RegistryError> {
            if self.fail_push {
                return Err(RegistryError::PushFailed {
                    attempts: 1,
                    message: "connection reset by registry".to_string(),
                });
            }
            self.calls.lock().unwrap().pushes.push(image.uri());
            if let Some(flag) = &self.cancel_after_push {
                flag.store(true, Ordering::SeqCst);
            }
            Ok(())
        }
    }

    struct FakeIdentity;

    #[async_trait]
    impl IdentityProvider for FakeIdentity {
        async fn account_id(&self) -> Result<String, RegistryError> {
            Ok("123456789012".to_string())
        }
    }

    struct FakeOrchestrator {
        submissions: Arc<Mutex<Vec<Vec<ImageDefinition>>>>,
        fail: bool,
    }

    #[async_trait]
    impl Orchestrator for FakeOrchestrator {
        async fn submit_rolling_update(
            &self,
            _target: &ServiceTarget,
            definitions: &[ImageDefinition],
        ) -> Result<Rollout, DeploymentError> {
            if self.fail {
                return Err(DeploymentError::SubmitFailed {
                    message: "orchestrator unreachable".to_string(),
                });
            }
            self.submissions.lock().unwrap().push(definitions.to_vec());
            Ok(Rollout {
                deployment_id: "ecs-svc/9223370528887261".to_string(),
                task_definition: "arn:aws:ecs:ap-northeast-1:123456789012:task-definition/app:4"
                    .to_string(),
            })
        }
    }

    struct Harness {
        service: PipelineService,
        engine_calls: Arc<Mutex<EngineCalls>>,
        submissions: Arc<Mutex<Vec<Vec<ImageDefinition>>>>,
    }

    fn harness(configure: impl FnOnce(&mut DeployConfig, &mut FakeSource, &mut FakeEngine, &mut FakeOrchestrator)) -> Harness {
        let mut config = DeployConfig::default();
        let engine_calls = Arc::new(Mutex::new(EngineCalls::default()));
        let submissions = Arc::new(Mutex::new(Vec::new()));

        let mut source = FakeSource {
            revision: "a1b2c3d4e5f6".to_string(),
            fail: false,
        };
        let mut engine = FakeEngine::new(engine_calls.clone());
        let mut orchestrator = FakeOrchestrator {
            submissions: submissions.clone(),
            fail: false,
        };

        configure(&mut config, &mut source, &mut engine, &mut orchestrator);

        let service = PipelineService::new(
            config,
            Box::new(source),
            Box::new(engine),
            Box::new(FakeIdentity),
            Box::new(orchestrator),
        );
        Harness {
            service,
            engine_calls,
            submissions,
        }
    }

    const EXPECTED_URI: &str =
        "123456789012.dkr.ecr.ap-northeast-1.amazonaws.com/ecs-fargate-rolling-update-nginx";

    #[tokio::test]
    async fn test_full_run_produces_exact_manifest() {
        let h = harness(|_, _, _, _| {});
        let cancel = AtomicBool::new(false);

        let summary = h.service.run(&cancel).await.unwrap();

        assert_eq!(summary.phase, RunPhase::Completed);
        assert_eq!(summary.stages.len(), 3);
        assert!(summary.stages.iter().all(|s| s.success));
        assert_eq!(summary.build_steps.len(), 6);
        assert!(summary.build_steps.iter().all(|s| s.success));

        let calls = h.engine_calls.lock().unwrap();
        assert_eq!(calls.logins, vec!["123456789012.dkr.ecr.ap-northeast-1.amazonaws.com"]);
        assert_eq!(calls.builds, vec![format!("{}:latest", EXPECTED_URI)]);
        assert_eq!(
            calls.tags,
            vec![(format!("{}:latest", EXPECTED_URI), format!("{}:a1b2c3d", EXPECTED_URI))]
        );
        assert_eq!(
            calls.pushes,
            vec![format!("{}:latest", EXPECTED_URI), format!("{}:a1b2c3d", EXPECTED_URI)]
        );

        let submissions = h.submissions.lock().unwrap();
        assert_eq!(submissions.len(), 1);
        assert_eq!(
            submissions[0],
            vec![ImageDefinition {
                name: "application".to_string(),
                image_uri: format!("{}:a1b2c3d", EXPECTED_URI),
            }]
        );
    }

    #[tokio::test]
    async fn test_execute_build_manifest_bytes() {
        let h = harness(|_, _, _, _| {});
        let dir = tempfile::tempdir().unwrap();

        let (products, steps) = h
            .service
            .execute_build(dir.path(), "a1b2c3d4e5f6")
            .await
            .unwrap();

        assert_eq!(
            products.manifest_content,
            format!("[{{\"name\":\"application\",\"imageUri\":\"{}:a1b2c3d\"}}]", EXPECTED_URI)
        );
        assert_eq!(products.tag, "a1b2c3d");
        assert_eq!(steps.len(), 6);
    }

    #[tokio::test]
    async fn test_build_idempotent_for_same_revision() {
        let h = harness(|_, _, _, _| {});
        let dir = tempfile::tempdir().unwrap();

        let (first, _) = h.service.execute_build(dir.path(), "0f45c2ea77d9").await.unwrap();
        let (second, _) = h.service.execute_build(dir.path(), "0f45c2ea77d9").await.unwrap();

        assert_eq!(first.tag, second.tag);
        assert_eq!(first.manifest_content, second.manifest_content);
        assert_eq!(
            content_digest(&first.manifest_content),
            content_digest(&second.manifest_content)
        );
    }

    #[tokio::test]
    async fn test_short_revision_falls_back_to_latest() {
        let h = harness(|_, source, _, _| {
            source.revision = "ab12".to_string();
        });
        let cancel = AtomicBool::new(false);

        h.service.run(&cancel).await.unwrap();

        let submissions = h.submissions.lock().unwrap();
        assert_eq!(
            submissions[0][0].image_uri,
            format!("{}:latest", EXPECTED_URI)
        );
        // Both pushes carry the fallback tag
        let calls = h.engine_calls.lock().unwrap();
        assert_eq!(
            calls.pushes,
            vec![format!("{}:latest", EXPECTED_URI), format!("{}:latest", EXPECTED_URI)]
        );
    }

    #[tokio::test]
    async fn test_push_failure_blocks_manifest_and_deployment() {
        let h = harness(|_, _, engine, _| {
            engine.fail_push = true;
        });
        let cancel = AtomicBool::new(false);

        let err = h.service.run(&cancel).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Registry(RegistryError::PushFailed { attempts: 1, .. })
        ));

        // Build ran, but nothing was submitted downstream
        let calls = h.engine_calls.lock().unwrap();
        assert_eq!(calls.builds.len(), 1);
        assert!(calls.pushes.is_empty());
        assert!(h.submissions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_push_retries_honor_configured_attempts() {
        let h = harness(|config, _, engine, _| {
            config.pipeline.push_attempts = 3;
            engine.fail_push = true;
        });
        let cancel = AtomicBool::new(false);

        let err = h.service.run(&cancel).await.unwrap_err();
        match err {
            PipelineError::Registry(RegistryError::PushFailed { attempts, message }) => {
                assert_eq!(attempts, 3);
                assert_eq!(message, "connection reset by registry");
            }
            other => panic!("expected PushFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_source_failure_stops_pipeline_immediately() {
        let h = harness(|_, source, _, _| {
            source.fail = true;
        });
        let cancel = AtomicBool::new(false);

        let err = h.service.run(&cancel).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Source(SourceError::RepositoryNotFound { .. })
        ));

        let calls = h.engine_calls.lock().unwrap();
        assert!(calls.logins.is_empty());
        assert!(calls.builds.is_empty());
        assert!(h.submissions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deployment_failure_is_fatal_but_pushes_remain() {
        let h = harness(|_, _, _, orchestrator| {
            orchestrator.fail = true;
        });
        let cancel = AtomicBool::new(false);

        let err = h.service.run(&cancel).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Deployment(DeploymentError::SubmitFailed { .. })
        ));

        // The registry already holds both tags; nothing reverts them
        let calls = h.engine_calls.lock().unwrap();
        assert_eq!(calls.pushes.len(), 2);
    }

    #[tokio::test]
    async fn test_cancellation_at_stage_boundary_skips_deployment() {
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = cancel.clone();
        let h = harness(move |_, _, engine, _| {
            engine.cancel_after_push = Some(flag);
        });

        let err = h.service.run(&cancel).await.unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled { ref stage } if stage == "Deployment"));

        // Build side effects stay in place; the deployment never started
        let calls = h.engine_calls.lock().unwrap();
        assert_eq!(calls.pushes.len(), 2);
        assert!(h.submissions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deployment_requires_published_manifest() {
        let h = harness(|_, _, _, _| {});
        let mut store = ArtifactStore::new().unwrap();
        store.declare("imageDetail").unwrap();

        let err = h.service.run_deployment_stage(&store).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Artifact(crate::error::ArtifactError::NotPublished { .. })
        ));
        assert!(h.submissions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tag_failure_aborts_before_push() {
        let h = harness(|_, _, engine, _| {
            engine.fail_tag = true;
        });
        let cancel = AtomicBool::new(false);

        let err = h.service.run(&cancel).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Build(crate::error::BuildError::TagFailed { .. })
        ));

        let calls = h.engine_calls.lock().unwrap();
        assert!(calls.pushes.is_empty());
        assert!(h.submissions.lock().unwrap().is_empty());
    }
}
