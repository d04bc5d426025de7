use std::{
    pin::pin,
    sync::Arc,
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

use anyhow::Result;
use console::style;
use scenecast_core::{
    MemoryStatusStore, PipelineConfig, PipelineError, RenderedVideo, RunRecord, StatusStore,
    append_run_record, format_render_summary, format_run_record, format_scenes,
    load_run_records, parse_scenes, status,
};
use tokio::time::MissedTickBehavior;
use tracing::{error, warn};
use uuid::Uuid;

use crate::progress::{StageReporter, create_spinner, done_line};

fn exit_with(message: impl std::fmt::Display) -> ! {
    eprintln!("{} {}", style("Error:").red().bold(), message);
    std::process::exit(1);
}

fn banner(subtitle: &str) {
    println!(
        "\n{}  {}\n",
        style("scenecast").cyan().bold(),
        style(subtitle).dim()
    );
}

/// Fail fast on keys the run cannot do without. A missing speech key only degrades narration.
fn validate_keys(config: &PipelineConfig, needs_llm: bool) {
    let visual = config.visual.config();
    if config.api_key(visual.env_var).is_none() {
        exit_with(format!(
            "{} environment variable not set (needed by {})",
            visual.env_var,
            config.visual.name()
        ));
    }

    if needs_llm {
        let llm = config.llm.config();
        if config.api_key(llm.env_var).is_none() {
            exit_with(format!(
                "{} environment variable not set (needed by {})",
                llm.env_var,
                config.llm.name()
            ));
        }
    }

    let speech = config.speech.config();
    if config.api_key(speech.env_var).is_none() {
        warn!(
            "{} not set; every scene will get a silent placeholder narration",
            speech.env_var
        );
    }
}

pub async fn render(config: &PipelineConfig, plan: &str) -> Result<()> {
    validate_keys(config, false);
    banner("Scene Renderer");

    render_and_record(config, plan, None, None).await?;
    Ok(())
}

pub fn scenes(plan: &str, json: bool) -> Result<()> {
    let scenes = parse_scenes(plan);
    if scenes.is_empty() {
        return Err(PipelineError::SegmentationEmpty.into());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&scenes)?);
    } else {
        println!("{}", format_scenes(&scenes));
    }
    Ok(())
}

pub async fn plan(config: &PipelineConfig, script: &str) -> Result<()> {
    let llm = config.llm.config();
    if config.api_key(llm.env_var).is_none() {
        exit_with(format!("{} environment variable not set", llm.env_var));
    }

    let started = Instant::now();
    let spinner = create_spinner(&format!("Planning shots with {}...", config.llm.name()));
    let plan = config.script_writer().plan_scenes(script).await?;
    spinner.finish_with_message(done_line("Plan ready", started));

    println!("{}", style("─".repeat(60)).dim());
    println!("{}", plan);
    Ok(())
}

pub async fn auto(config: &PipelineConfig, topic: Option<String>, every: Option<u64>) -> Result<()> {
    validate_keys(config, true);
    banner("Autopilot");

    let Some(minutes) = every else {
        produce(config, topic).await?;
        return Ok(());
    };

    let mut ticker = tokio::time::interval(Duration::from_secs(minutes * 60));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ctrl_c = pin!(tokio::signal::ctrl_c());

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = produce(config, topic.clone()).await {
                    error!("Scheduled run failed: {}", e);
                    eprintln!("{} {}", style("✗").red().bold(), e);
                }
                println!(
                    "{}",
                    style(format!("Next run in {} min (Ctrl-C to stop)", minutes)).dim()
                );
            }
            _ = &mut ctrl_c => {
                println!("{} Stopped", style("✓").green().bold());
                break;
            }
        }
    }
    Ok(())
}

pub async fn history(config: &PipelineConfig) -> Result<()> {
    let records = load_run_records(&config.layout().history_path()).await?;
    if records.is_empty() {
        println!("No runs recorded in {}", config.work_dir.display());
        return Ok(());
    }

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    for record in &records {
        println!("{}", format_run_record(record, now));
    }
    Ok(())
}

/// Topic, script, plan and thumbnail concept from the language model, then a render.
async fn produce(config: &PipelineConfig, topic: Option<String>) -> Result<RenderedVideo> {
    let writer = config.script_writer();

    let generated = async {
        let topic = match topic.clone() {
            Some(topic) => topic,
            None => {
                let started = Instant::now();
                let spinner = create_spinner("Scouting a trending topic...");
                let topic = writer.suggest_topic().await?;
                spinner.finish_with_message(done_line(
                    &format!("Topic: {}", topic.lines().next().unwrap_or_default()),
                    started,
                ));
                topic
            }
        };

        let started = Instant::now();
        let spinner = create_spinner("Writing script...");
        let script = writer.write_script(&topic).await?;
        spinner.finish_with_message(done_line("Script written", started));

        let started = Instant::now();
        let spinner = create_spinner("Planning shots...");
        let plan = writer.plan_scenes(&script).await?;
        spinner.finish_with_message(done_line("Plan ready", started));

        let (title, description) = split_topic(&topic);
        let started = Instant::now();
        let spinner = create_spinner("Designing thumbnail...");
        let thumbnail = writer.thumbnail_concept(title, description).await?;
        spinner.finish_with_message(done_line("Thumbnail concept ready", started));

        Ok::<_, PipelineError>((topic, plan, thumbnail))
    }
    .await;

    let (topic, plan, thumbnail) = match generated {
        Ok(generated) => generated,
        Err(e) => {
            let record = RunRecord::failed(Uuid::new_v4(), &e, 0, topic);
            record_run(config, &record).await;
            return Err(e.into());
        }
    };

    render_and_record(config, &plan, Some(topic), Some(thumbnail)).await
}

/// First line is the title, the rest describes the video.
fn split_topic(topic: &str) -> (&str, &str) {
    let topic = topic.trim();
    match topic.split_once('\n') {
        Some((title, description)) => (title.trim(), description.trim()),
        None => (topic, ""),
    }
}

async fn render_and_record(
    config: &PipelineConfig,
    plan: &str,
    topic: Option<String>,
    thumbnail: Option<String>,
) -> Result<RenderedVideo> {
    let store = Arc::new(MemoryStatusStore::new());
    let pipeline = config.build_pipeline(store.clone());
    let total_start = Instant::now();

    let mut reporter = StageReporter::new();
    let result = pipeline
        .run_with_progress(plan, |progress| reporter.handle(progress))
        .await;

    match result {
        Ok(video) => {
            let record = RunRecord::succeeded(&video, topic).with_thumbnail(thumbnail.clone());
            record_run(config, &record).await;

            println!("{}", style("─".repeat(60)).dim());
            print!("{}", format_render_summary(&video));
            if let Some(thumbnail) = &thumbnail {
                println!("\n{}\n{}", style("Thumbnail:").bold(), thumbnail);
            }
            println!(
                "\n{} {}",
                style("Done!").green().bold(),
                style(format!(
                    "Total time: {}",
                    crate::progress::format_duration(total_start.elapsed())
                ))
                .dim()
            );
            Ok(video)
        }
        Err(e) => {
            let run_id = store
                .get(status::RUN_ID)
                .and_then(|v| v.as_text().and_then(|s| s.parse().ok()))
                .unwrap_or_else(Uuid::new_v4);
            let scenes = store
                .get(status::SCENES_TOTAL)
                .and_then(|v| v.as_count())
                .unwrap_or(0) as usize;
            let record = RunRecord::failed(run_id, &e, scenes, topic).with_thumbnail(thumbnail);
            record_run(config, &record).await;
            Err(e.into())
        }
    }
}

/// History is best-effort; a write failure never fails the run.
async fn record_run(config: &PipelineConfig, record: &RunRecord) {
    let path = config.layout().history_path();
    if let Err(e) = append_run_record(&path, record).await {
        warn!("Could not write {}: {}", path.display(), e);
    }
}
