use crate::{
    history::{RunOutcome, RunRecord},
    types::{RenderedVideo, Scene},
};

/// Format an elapsed number of seconds as a coarse age: `45s`, `12m`, `1h 30m`, `2d 3h`.
pub fn format_age(seconds: u64) -> String {
    const MINUTE: u64 = 60;
    const HOUR: u64 = 60 * MINUTE;
    const DAY: u64 = 24 * HOUR;

    match seconds {
        s if s < MINUTE => format!("{}s", s),
        s if s < HOUR => format!("{}m", s / MINUTE),
        s if s < DAY => format!("{}h {}m", s / HOUR, s % HOUR / MINUTE),
        s => format!("{}d {}h", s / DAY, s % DAY / HOUR),
    }
}

/// Format scenes as a numbered list
pub fn format_scenes(scenes: &[Scene]) -> String {
    scenes
        .iter()
        .enumerate()
        .map(|(i, scene)| {
            format!(
                "Scene {:02}\n  Narration: {}\n  Prompt:    {}",
                i,
                scene.narration.trim(),
                scene.visual_prompt.trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn format_render_summary(video: &RenderedVideo) -> String {
    let mut output = String::new();
    output.push_str(&format!("Run:      {}\n", video.run_id));
    output.push_str(&format!("Output:   {}\n", video.output.display()));
    output.push_str(&format!("Scenes:   {}\n", video.scenes.len()));

    if video.placeholder_scenes.is_empty() {
        output.push_str("Narration: all scenes voiced\n");
    } else {
        let indices = video
            .placeholder_scenes
            .iter()
            .map(|i| format!("{:02}", i))
            .collect::<Vec<_>>()
            .join(", ");
        output.push_str(&format!("Narration: silent placeholder in scene {}\n", indices));
    }

    output
}

/// One line per run, relative to `now` (seconds since the Unix epoch).
pub fn format_run_record(record: &RunRecord, now: u64) -> String {
    let age = format_age(now.saturating_sub(record.finished_at));
    let status = match record.outcome {
        RunOutcome::Succeeded => "ok  ",
        RunOutcome::Failed => "FAIL",
    };
    let detail = match (&record.output, &record.error) {
        (Some(output), _) => output.display().to_string(),
        (None, Some(error)) => error.clone(),
        (None, None) => String::new(),
    };

    let mut line = format!(
        "{} {} {} ago  {} scenes",
        status,
        &record.run_id.simple().to_string()[..8],
        age,
        record.scenes
    );
    if record.placeholders > 0 {
        line.push_str(&format!(" ({} silent)", record.placeholders));
    }
    line.push_str(&format!("  {}", detail));
    if let Some(topic) = &record.topic {
        line.push_str(&format!("  [{}]", topic.lines().next().unwrap_or_default()));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use uuid::Uuid;

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(0), "0s");
        assert_eq!(format_age(45), "45s");
        assert_eq!(format_age(12 * 60 + 59), "12m");
        assert_eq!(format_age(90 * 60), "1h 30m");
        assert_eq!(format_age(2 * 86_400 + 3 * 3_600 + 59), "2d 3h");
    }

    #[test]
    fn test_format_scenes_numbers_from_zero() {
        let scenes = vec![
            Scene {
                narration: "Wake up.".into(),
                visual_prompt: "sunrise".into(),
            },
            Scene {
                narration: "Drink coffee.".into(),
                visual_prompt: "coffee cup".into(),
            },
        ];
        let text = format_scenes(&scenes);
        assert!(text.starts_with("Scene 00\n  Narration: Wake up."));
        assert!(text.contains("Scene 01\n  Narration: Drink coffee.\n  Prompt:    coffee cup"));
    }

    #[test]
    fn test_summary_lists_placeholders() {
        let video = RenderedVideo {
            run_id: Uuid::nil(),
            output: PathBuf::from("out/final_video.mp4"),
            scenes: Vec::new(),
            segments: Vec::new(),
            placeholder_scenes: vec![0, 2],
        };
        let summary = format_render_summary(&video);
        assert!(summary.contains("Output:   out/final_video.mp4"));
        assert!(summary.contains("silent placeholder in scene 00, 02"));
    }

    #[test]
    fn test_run_record_line() {
        let record = RunRecord {
            run_id: Uuid::nil(),
            finished_at: 1_000,
            outcome: RunOutcome::Failed,
            output: None,
            error: Some("ffmpeg not found".into()),
            scenes: 4,
            placeholders: 0,
            topic: Some("Morning rituals\nwhy they work".into()),
            thumbnail: None,
        };
        let line = format_run_record(&record, 1_000 + 90 * 60);
        assert_eq!(
            line,
            "FAIL 00000000 1h 30m ago  4 scenes  ffmpeg not found  [Morning rituals]"
        );
    }

    #[test]
    fn test_recent_run_is_not_shown_in_hours() {
        let record = RunRecord {
            run_id: Uuid::nil(),
            finished_at: 1_000,
            outcome: RunOutcome::Succeeded,
            output: Some(PathBuf::from("out/final_video.mp4")),
            error: None,
            scenes: 2,
            placeholders: 1,
            topic: None,
            thumbnail: None,
        };
        assert_eq!(
            format_run_record(&record, 1_045),
            "ok   00000000 45s ago  2 scenes (1 silent)  out/final_video.mp4"
        );
        // A clock that went backwards reads as just finished.
        assert!(format_run_record(&record, 0).contains(" 0s ago "));
    }
}
