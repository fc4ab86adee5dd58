//! 変更イメージのチェック（検出 → 展開 → ビルド → 集計）

use crate::output::{self, ChangedImages, CheckReport};
use crate::pr_info::PrInfo;
use anyhow::Context;
use colored::Colorize;
use imagecheck_build::{
    ArtifactStore, Backoff, BuildOrchestrator, BuildSettings, BuildxRunner, LocalArtifactStore,
    OverallStatus, RetryPolicy, aggregate,
};
use imagecheck_config::RunConfig;
use imagecheck_core::{
    ImageCatalog, ImageGraph, changed_images_file_name, changes_description, detect_changed_images,
    expand_dependents, gen_versions, report_path_prefix,
};
use std::time::{Duration, Instant};

/// アップロードしたログとレポートを置くディレクトリ名（作業ディレクトリ配下）
const ARTIFACTS_DIR: &str = "artifacts";

/// バックオフの単位
const BACKOFF_STEP: Duration = Duration::from_secs(5);

/// チェックを実行
pub async fn handle_check_command(
    config: &RunConfig,
    pr_info: &PrInfo,
    docker_program: &str,
) -> anyhow::Result<OverallStatus> {
    let started = Instant::now();
    let start_time = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();

    config
        .reset_temp_dir()
        .with_context(|| format!("{} を初期化できません", config.temp_path.display()))?;

    // 変更イメージの検出と依存イメージの展開
    let catalog = ImageCatalog::load(&config.images_path())?;
    tracing::info!(
        "Changed files for PR {} @ {}: {:?}",
        pr_info.number,
        pr_info.sha,
        pr_info.changed_files
    );
    let seeds = detect_changed_images(&catalog, pr_info.changed_files.as_slice());
    let changed_images = expand_dependents(seeds, &catalog)?;
    let graph = ImageGraph::from_set(changed_images);
    let build_order = graph.topological_order()?;
    tracing::info!(
        "Has changed images {}",
        build_order
            .iter()
            .map(|n| n.path.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let (versions, result_version) =
        gen_versions(pr_info.number, &pr_info.sha, config.suffix.as_deref());

    // ビルド
    let settings = BuildSettings {
        workspace: config.workspace.clone(),
        log_dir: config.temp_path.clone(),
        push: config.push,
    };
    let runner = BuildxRunner::with_program(docker_program);
    let mut orchestrator = BuildOrchestrator::new(runner, settings)
        .with_retry(RetryPolicy::new(
            config.max_attempts,
            Backoff::Linear(BACKOFF_STEP),
        ))
        .with_parent_failure_policy(config.on_parent_failure);
    let results = orchestrator.build_all(&graph, &versions).await?;

    let changed: ChangedImages = build_order
        .iter()
        .map(|node| (node.repo.clone(), result_version.clone()))
        .collect();
    let repos: Vec<&str> = build_order.iter().map(|n| n.repo.as_str()).collect();
    let description = changes_description(repos.as_slice());

    let changed_json = config
        .temp_path
        .join(changed_images_file_name(config.suffix.as_deref()));
    output::write_changed_images(&changed_json, &changed)?;

    // 集計とレポート
    let prefix = report_path_prefix(pr_info.number, &pr_info.sha, &config.check_name);
    let store = LocalArtifactStore::new(config.temp_path.join(ARTIFACTS_DIR));
    // --no-reports ではログをアップロードしない
    let store_ref = config.reports.then_some(&store as &dyn ArtifactStore);
    let (status, rows) = aggregate(&results, store_ref, &prefix);

    print_summary(&description, status, &rows);

    if config.reports {
        let report = CheckReport {
            check_name: &config.check_name,
            description: &description,
            status,
            pr_number: pr_info.number,
            sha: &pr_info.sha,
            repo_prefix: &config.repo_prefix,
            start_time,
            duration_seconds: started.elapsed().as_secs_f64(),
            results: &rows,
        };
        let url = output::write_report(store.root(), &prefix, &report)?;

        println!("::notice ::Report url: {}", url);
        println!("::set-output name=url_output::\"{}\"", url);
    }

    Ok(status)
}

fn print_summary(description: &str, status: OverallStatus, rows: &[imagecheck_build::DisplayRow]) {
    println!();
    println!("{}", description.bold());
    for row in rows {
        let status_label = if row.status.is_ok() {
            row.status.as_str().green()
        } else {
            row.status.as_str().red()
        };
        println!("  {} {}", status_label, row.label);
    }

    match status {
        OverallStatus::Success => println!("{}", "✓ success".green()),
        OverallStatus::Failure => println!("{}", "✗ failure".red().bold()),
    }
}
