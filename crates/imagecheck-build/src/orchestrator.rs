//! 変更イメージのビルドとpush
//!
//! 親イメージを子イメージより先にビルドし、各バージョンを
//! [`RetryPolicy`] に従ってリトライします。ビルド済みのイメージは
//! 実行中のビジット集合で管理し、同じイメージを2回ビルドしません。

use crate::builder::{BuildInvocation, BuildRunner};
use crate::retry::RetryPolicy;
use imagecheck_config::ParentFailurePolicy;
use imagecheck_core::{BuildResult, BuildStatus, BuildTag, ImageGraph, ImageNode};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{info, warn};

/// ビルド実行の設定
#[derive(Debug, Clone)]
pub struct BuildSettings {
    /// ビルドコンテキストの基準ディレクトリ（リポジトリのルート）
    pub workspace: PathBuf,
    /// ビルドログの出力先
    pub log_dir: PathBuf,
    pub push: bool,
}

pub struct BuildOrchestrator<R> {
    runner: R,
    settings: BuildSettings,
    retry: RetryPolicy,
    on_parent_failure: ParentFailurePolicy,
    /// 全バージョンの処理が終わったイメージのパス
    built: HashSet<String>,
    /// 1つ以上のバージョンが失敗（またはスキップ）したイメージのパス
    failed: HashSet<String>,
}

impl<R: BuildRunner> BuildOrchestrator<R> {
    pub fn new(runner: R, settings: BuildSettings) -> Self {
        Self {
            runner,
            settings,
            retry: RetryPolicy::default(),
            on_parent_failure: ParentFailurePolicy::default(),
            built: HashSet::new(),
            failed: HashSet::new(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_parent_failure_policy(mut self, policy: ParentFailurePolicy) -> Self {
        self.on_parent_failure = policy;
        self
    }

    pub fn is_built(&self, path: &str) -> bool {
        self.built.contains(path)
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// グラフ内の全イメージを親から順にビルド
    pub async fn build_all(
        &mut self,
        graph: &ImageGraph,
        versions: &[String],
    ) -> imagecheck_core::Result<Vec<BuildResult>> {
        let mut results = Vec::new();
        for node in graph.topological_order()? {
            results.extend(self.build_with_ancestors(graph, &node.path, versions).await);
        }
        Ok(results)
    }

    /// 未ビルドの祖先をルート側から順にビルドしてから、指定イメージをビルド
    ///
    /// ビルド済みのイメージに対しては何もせず空を返します。
    pub async fn build_with_ancestors(
        &mut self,
        graph: &ImageGraph,
        path: &str,
        versions: &[String],
    ) -> Vec<BuildResult> {
        let mut results = Vec::new();
        let Some(node) = graph.get(path) else {
            warn!("Image '{}' is not part of the build graph", path);
            return results;
        };
        if self.is_built(path) {
            return results;
        }

        let mut chain = graph.ancestors(path);
        chain.push(node);

        for image in chain {
            if self.is_built(&image.path) {
                continue;
            }

            let parent = graph.parent_of(&image.path);
            let parent_failed = parent.is_some_and(|p| self.failed.contains(&p.path));
            if parent_failed && self.on_parent_failure == ParentFailurePolicy::SkipDependents {
                results.extend(self.skip_image(image, versions));
                continue;
            }

            results.extend(
                self.build_single_image(image, versions, parent.is_some())
                    .await,
            );
        }

        results
    }

    /// 1イメージの全バージョンをビルド
    ///
    /// バージョンごとに最大 `max_attempts` 回試行し、失敗するたびに
    /// バックオフ分だけ待ちます。失敗したバージョンがあっても残りのバージョンは
    /// 続行し、最後にイメージをビルド済みにします。
    pub async fn build_single_image(
        &mut self,
        image: &ImageNode,
        versions: &[String],
        child: bool,
    ) -> Vec<BuildResult> {
        info!("Image will be pushed with versions {}", versions.join(", "));
        let mut results = Vec::with_capacity(versions.len());

        for version in versions {
            let tag = BuildTag::new(&image.repo, version);
            let mut outcome = None;

            for attempt in 0..self.retry.max_attempts {
                let (success, build_log) = self.build_and_push_one(image, version, child).await;
                if success {
                    outcome = Some(BuildResult::new(&tag, Some(build_log), BuildStatus::Ok));
                    break;
                }

                let delay = self.retry.backoff.delay(attempt);
                info!(
                    "Got error will retry {} time and sleep for {} seconds",
                    attempt,
                    delay.as_secs_f64()
                );
                tokio::time::sleep(delay).await;
                outcome = Some(BuildResult::new(&tag, Some(build_log), BuildStatus::Fail));
            }

            let result =
                outcome.unwrap_or_else(|| BuildResult::new(&tag, None, BuildStatus::Fail));
            if !result.status.is_ok() {
                warn!("Failed to build {} after {} attempts", tag, self.retry.max_attempts);
                self.failed.insert(image.path.clone());
            }
            results.push(result);
        }

        info!("Processing finished");
        self.built.insert(image.path.clone());
        results
    }

    /// `docker buildx build` を1回実行
    ///
    /// 戻り値は（成功したか, ビルドログのパス）。
    pub async fn build_and_push_one(
        &self,
        image: &ImageNode,
        version: &str,
        child: bool,
    ) -> (bool, PathBuf) {
        let context = self.settings.workspace.join(&image.path);
        info!(
            "Building docker image {} with version {} from path {}",
            image.repo,
            version,
            context.display()
        );

        let invocation = BuildInvocation {
            tag: BuildTag::new(&image.repo, version),
            context,
            // 親は同じ実行内で同じバージョンのタグでビルドされている
            from_tag: child.then(|| version.to_string()),
            push: self.settings.push,
        };
        let build_log = self.settings.log_dir.join(invocation.log_file_name());

        match self.runner.run(&invocation, &build_log).await {
            Ok(true) => {
                info!("Processing of {} successfully finished", image.repo);
                (true, build_log)
            }
            Ok(false) => (false, build_log),
            Err(e) => {
                warn!("{}", e.user_message());
                (false, build_log)
            }
        }
    }

    fn skip_image(&mut self, image: &ImageNode, versions: &[String]) -> Vec<BuildResult> {
        warn!(
            "Skipping docker image '{}' ({}) because its parent image failed to build",
            image.repo, image.path
        );
        self.failed.insert(image.path.clone());
        self.built.insert(image.path.clone());

        versions
            .iter()
            .map(|version| {
                BuildResult::new(
                    &BuildTag::new(&image.repo, version),
                    None,
                    BuildStatus::Skipped,
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::retry::Backoff;
    use imagecheck_core::{CatalogEntry, ImageCatalog, detect_changed_images, expand_dependents};
    use std::cell::RefCell;
    use std::collections::{HashMap, VecDeque};
    use std::path::Path;
    use std::time::Duration;

    /// 呼び出しを記録し、タグごとに決められた結果を返すランナー
    #[derive(Default)]
    struct ScriptedRunner {
        outcomes: RefCell<HashMap<String, VecDeque<bool>>>,
        calls: RefCell<Vec<BuildInvocation>>,
    }

    impl ScriptedRunner {
        fn script(self, tag: &str, outcomes: &[bool]) -> Self {
            self.outcomes
                .borrow_mut()
                .insert(tag.to_string(), outcomes.iter().copied().collect());
            self
        }

        fn tags(&self) -> Vec<String> {
            self.calls.borrow().iter().map(|c| c.tag.to_string()).collect()
        }
    }

    impl BuildRunner for ScriptedRunner {
        async fn run(&self, invocation: &BuildInvocation, _log_path: &Path) -> Result<bool> {
            self.calls.borrow_mut().push(invocation.clone());
            let outcome = self
                .outcomes
                .borrow_mut()
                .get_mut(&invocation.tag.to_string())
                .and_then(|q| q.pop_front())
                .unwrap_or(true);
            Ok(outcome)
        }
    }

    fn settings() -> BuildSettings {
        BuildSettings {
            workspace: PathBuf::from("/repo"),
            log_dir: PathBuf::from("/tmp/docker_images_check"),
            push: true,
        }
    }

    fn versions() -> Vec<String> {
        vec!["1".to_string(), "1-abc".to_string()]
    }

    fn graph_from(entries: Vec<(&str, &str, Vec<&str>)>, changed: &[&str]) -> ImageGraph {
        let catalog = ImageCatalog::from_entries(entries.into_iter().map(|(path, name, deps)| {
            (
                path.to_string(),
                CatalogEntry {
                    name: name.to_string(),
                    dependent: deps.iter().map(|d| d.to_string()).collect(),
                },
            )
        }));
        let seeds = detect_changed_images(&catalog, changed);
        ImageGraph::from_set(expand_dependents(seeds, &catalog).unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn test_parent_versions_built_before_child() {
        let graph = graph_from(
            vec![("a", "img-a", vec!["b"]), ("b", "img-b", vec![])],
            &["a/Dockerfile"],
        );
        let mut orchestrator = BuildOrchestrator::new(ScriptedRunner::default(), settings());

        let results = orchestrator.build_all(&graph, &versions()).await.unwrap();

        let calls = orchestrator.runner().calls.borrow();
        let contexts: Vec<String> = calls.iter().map(|c| c.context.display().to_string()).collect();
        assert_eq!(contexts, vec!["/repo/a", "/repo/a", "/repo/b", "/repo/b"]);

        // 子ビルドだけ FROM_TAG を渡す
        assert_eq!(calls[0].from_tag, None);
        assert_eq!(calls[2].from_tag.as_deref(), Some("1"));
        assert_eq!(calls[3].from_tag.as_deref(), Some("1-abc"));

        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|r| r.status == BuildStatus::Ok));
        assert!(orchestrator.is_built("a"));
        assert!(orchestrator.is_built("b"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_build_order_independent_of_set_order() {
        let graph = graph_from(
            vec![
                ("base", "img-base", vec!["mid"]),
                ("mid", "img-mid", vec!["leaf"]),
                ("leaf", "img-leaf", vec![]),
            ],
            &["base/Dockerfile"],
        );
        // 展開結果の集合は子が先に並んでいる
        assert_eq!(graph.nodes().next().unwrap().path, "leaf");

        let runner = ScriptedRunner::default();
        let mut orchestrator = BuildOrchestrator::new(runner, settings());
        let results = orchestrator
            .build_with_ancestors(&graph, "leaf", &["7".to_string()])
            .await;

        let contexts: Vec<String> = orchestrator
            .runner()
            .calls
            .borrow()
            .iter()
            .map(|c| c.context.display().to_string())
            .collect();
        assert_eq!(contexts, vec!["/repo/base", "/repo/mid", "/repo/leaf"]);
        assert_eq!(results.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_built_image_is_not_rebuilt() {
        let graph = graph_from(
            vec![
                ("base", "img-base", vec!["left", "right"]),
                ("left", "img-left", vec![]),
                ("right", "img-right", vec![]),
            ],
            &["base/Dockerfile"],
        );
        let mut orchestrator = BuildOrchestrator::new(ScriptedRunner::default(), settings());
        let versions = vec!["5".to_string()];

        orchestrator.build_with_ancestors(&graph, "left", &versions).await;
        orchestrator.build_with_ancestors(&graph, "right", &versions).await;
        let again = orchestrator.build_with_ancestors(&graph, "base", &versions).await;
        let rest = orchestrator.build_all(&graph, &versions).await.unwrap();

        assert!(again.is_empty());
        assert!(rest.is_empty());
        let contexts: Vec<String> = orchestrator
            .runner()
            .calls
            .borrow()
            .iter()
            .map(|c| c.context.display().to_string())
            .collect();
        assert_eq!(contexts, vec!["/repo/base", "/repo/left", "/repo/right"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_until_fifth_attempt_succeeds() {
        let runner =
            ScriptedRunner::default().script("img:1", &[false, false, false, false, true]);
        let mut orchestrator = BuildOrchestrator::new(runner, settings());
        let image = ImageNode::new("docker/img", "img");

        let start = tokio::time::Instant::now();
        let results = orchestrator
            .build_single_image(&image, &["1".to_string()], false)
            .await;

        // 0 + 5 + 10 + 15 秒
        assert_eq!(start.elapsed(), Duration::from_secs(30));
        assert_eq!(orchestrator.runner().tags().len(), 5);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, BuildStatus::Ok);
        assert_eq!(results[0].tag, "img:1");
        assert_eq!(
            results[0].log.as_deref(),
            Some(Path::new(
                "/tmp/docker_images_check/build_and_push_log_img_1"
            ))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_version_continues_with_next() {
        let runner = ScriptedRunner::default().script("img:1", &[false; 5]);
        let mut orchestrator = BuildOrchestrator::new(runner, settings());
        let image = ImageNode::new("docker/img", "img");

        let results = orchestrator
            .build_single_image(&image, &versions(), false)
            .await;

        assert_eq!(orchestrator.runner().tags().len(), 6);
        assert_eq!(results[0].status, BuildStatus::Fail);
        assert!(results[0].log.is_some());
        assert_eq!(results[1].status, BuildStatus::Ok);
        // 失敗しても処理済みになる
        assert!(orchestrator.is_built("docker/img"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_injected_retry_policy() {
        let runner = ScriptedRunner::default().script("img:1", &[false; 5]);
        let mut orchestrator = BuildOrchestrator::new(runner, settings())
            .with_retry(RetryPolicy::new(2, Backoff::None));
        let image = ImageNode::new("docker/img", "img");

        let start = tokio::time::Instant::now();
        let results = orchestrator
            .build_single_image(&image, &["1".to_string()], false)
            .await;

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(orchestrator.runner().tags().len(), 2);
        assert_eq!(results[0].status, BuildStatus::Fail);
    }

    #[tokio::test(start_paused = true)]
    async fn test_best_effort_builds_child_of_failed_parent() {
        let graph = graph_from(
            vec![("a", "img-a", vec!["b"]), ("b", "img-b", vec![])],
            &["a/Dockerfile"],
        );
        let runner = ScriptedRunner::default().script("img-a:1", &[false]);
        let mut orchestrator = BuildOrchestrator::new(runner, settings())
            .with_retry(RetryPolicy::new(1, Backoff::None));

        let results = orchestrator
            .build_all(&graph, &["1".to_string()])
            .await
            .unwrap();

        let statuses: Vec<BuildStatus> = results.iter().map(|r| r.status).collect();
        assert_eq!(statuses, vec![BuildStatus::Fail, BuildStatus::Ok]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_dependents_of_failed_parent() {
        let graph = graph_from(
            vec![
                ("a", "img-a", vec!["b"]),
                ("b", "img-b", vec!["c"]),
                ("c", "img-c", vec![]),
            ],
            &["a/Dockerfile"],
        );
        let runner = ScriptedRunner::default().script("img-a:1", &[false]);
        let mut orchestrator = BuildOrchestrator::new(runner, settings())
            .with_retry(RetryPolicy::new(1, Backoff::None))
            .with_parent_failure_policy(ParentFailurePolicy::SkipDependents);

        let results = orchestrator
            .build_all(&graph, &["1".to_string()])
            .await
            .unwrap();

        let statuses: Vec<BuildStatus> = results.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![BuildStatus::Fail, BuildStatus::Skipped, BuildStatus::Skipped]
        );
        assert_eq!(orchestrator.runner().tags().len(), 1);
        assert!(results[1].log.is_none());
        assert!(orchestrator.is_built("c"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_push_flag_is_forwarded() {
        let mut no_push = settings();
        no_push.push = false;
        let orchestrator = BuildOrchestrator::new(ScriptedRunner::default(), no_push);
        let image = ImageNode::new("docker/img", "org/img");

        let (success, log) = orchestrator.build_and_push_one(&image, "3", false).await;

        assert!(success);
        assert!(log.ends_with("build_and_push_log_org_img_3"));
        assert!(!orchestrator.runner().calls.borrow()[0].push);
    }

    #[tokio::test]
    async fn test_spawn_failure_counts_as_failed_attempt() {
        let temp_dir = tempfile::tempdir().unwrap();
        let settings = BuildSettings {
            workspace: PathBuf::from("/repo"),
            log_dir: temp_dir.path().to_path_buf(),
            push: false,
        };
        let runner = crate::builder::BuildxRunner::with_program("imagecheck-no-such-program");
        let orchestrator = BuildOrchestrator::new(runner, settings);
        let image = ImageNode::new("docker/img", "img");

        let (success, log) = orchestrator.build_and_push_one(&image, "1", false).await;

        assert!(!success);
        assert_eq!(log, temp_dir.path().join("build_and_push_log_img_1"));
    }
}
