use std::time::{Duration, Instant};

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use scenecast_core::{Progress, Stage};

pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", (secs / 60.0).floor(), secs % 60.0)
    }
}

pub fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn done_line(msg: &str, started: Instant) -> String {
    format!(
        "{} {} {}",
        style("✓").green().bold(),
        msg,
        style(format!("[{}]", format_duration(started.elapsed()))).dim()
    )
}

/// Turns pipeline progress into one spinner per stage.
pub struct StageReporter {
    spinner: Option<ProgressBar>,
    step_start: Instant,
    label: &'static str,
}

impl StageReporter {
    pub fn new() -> Self {
        Self {
            spinner: None,
            step_start: Instant::now(),
            label: "",
        }
    }

    pub fn handle(&mut self, progress: Progress) {
        match progress {
            Progress::Stage(Stage::Segmenting) => {}
            Progress::ScenesFound(total) => {
                println!("{} Found {} scenes", style("✓").green().bold(), total);
            }
            Progress::Stage(Stage::Synthesizing) => self.start("Generating visuals and narration"),
            Progress::SceneSynthesized {
                index,
                total,
                placeholder,
            } => {
                if let Some(pb) = &self.spinner {
                    if placeholder {
                        pb.println(format!(
                            "{} Scene {:02}: narration unavailable, using silence",
                            style("!").yellow().bold(),
                            index
                        ));
                    }
                    pb.set_message(format!("{}... {}/{}", self.label, index + 1, total));
                }
            }
            Progress::Stage(Stage::Composing) => {
                self.finish("Assets generated");
                self.start("Composing segments");
            }
            Progress::SegmentComposed { index, total } => {
                if let Some(pb) = &self.spinner {
                    pb.set_message(format!("{}... {}/{}", self.label, index + 1, total));
                }
            }
            Progress::Stage(Stage::Concatenating) => {
                self.finish("Segments composed");
                self.start("Joining segments");
            }
            Progress::Stage(Stage::Done) => self.finish("Video joined"),
            Progress::Stage(Stage::Failed) => {
                if let Some(pb) = self.spinner.take() {
                    pb.finish_with_message(format!("{} {}", style("✗").red().bold(), self.label));
                }
            }
        }
    }

    fn start(&mut self, label: &'static str) {
        self.label = label;
        self.step_start = Instant::now();
        self.spinner = Some(create_spinner(&format!("{}...", label)));
    }

    fn finish(&mut self, msg: &str) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_with_message(done_line(msg, self.step_start));
        }
    }
}
