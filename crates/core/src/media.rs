//! FFmpeg invocations used by the pipeline.
//!
//! Three command shapes: a per-scene segment encode, a stream-copy concat of
//! those segments, and a silent narration placeholder.

use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

use async_trait::async_trait;
use tokio::{fs, process::Command};
use tracing::debug;

use crate::{error::ToolError, types::VisualKind};

/// Encoding parameters shared by every segment.
///
/// Stream-copy concatenation only works when all inputs agree on codec,
/// resolution, frame rate, pixel format and audio layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeProfile {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub video_codec: String,
    pub pixel_format: String,
    pub audio_codec: String,
    pub audio_bitrate: String,
    pub sample_rate: u32,
}

impl Default for EncodeProfile {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            fps: 30,
            video_codec: "libx264".to_string(),
            pixel_format: "yuv420p".to_string(),
            audio_codec: "aac".to_string(),
            audio_bitrate: "192k".to_string(),
            sample_rate: 44100,
        }
    }
}

impl EncodeProfile {
    /// Fit the visual inside the frame without cropping, padding the rest.
    fn frame_filter(&self) -> String {
        format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1",
            w = self.width,
            h = self.height
        )
    }
}

#[async_trait]
pub trait MediaTool: Send + Sync {
    /// Name shown in errors and logs.
    fn name(&self) -> String;

    /// Resolve the tool on this host.
    async fn locate(&self) -> Result<PathBuf, ToolError>;

    /// Render `seconds` of silence as an mp3 narration track.
    async fn render_silence(&self, seconds: u32, output: &Path) -> Result<(), ToolError>;

    /// Combine one visual and one audio track into a segment, cut to the shorter stream.
    async fn encode_segment(
        &self,
        visual: &Path,
        kind: VisualKind,
        audio: &Path,
        output: &Path,
    ) -> Result<(), ToolError>;

    /// Join the files listed in a concat manifest without re-encoding.
    async fn concat(&self, manifest: &Path, output: &Path) -> Result<(), ToolError>;
}

/// FFmpeg CLI wrapper.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    binary: PathBuf,
    profile: EncodeProfile,
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl Ffmpeg {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            profile: EncodeProfile::default(),
        }
    }

    pub fn with_profile(mut self, profile: EncodeProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn profile(&self) -> &EncodeProfile {
        &self.profile
    }

    pub fn silence_args(&self, seconds: u32, output: &Path) -> Vec<String> {
        let mut args = base_args();
        args.extend(strings(&["-f", "lavfi", "-i"]));
        args.push(format!("anullsrc=r={}:cl=stereo", self.profile.sample_rate));
        args.extend(["-t".to_string(), seconds.to_string()]);
        args.extend(strings(&["-c:a", "libmp3lame", "-b:a", "128k"]));
        args.push(path_arg(output));
        args
    }

    pub fn segment_args(
        &self,
        visual: &Path,
        kind: VisualKind,
        audio: &Path,
        output: &Path,
    ) -> Vec<String> {
        let p = &self.profile;
        let mut args = base_args();

        if kind == VisualKind::Image {
            args.extend(strings(&["-loop", "1"]));
        }
        args.extend(["-i".to_string(), path_arg(visual)]);
        args.extend(["-i".to_string(), path_arg(audio)]);

        // Take the picture from the visual and the sound from the narration,
        // even when a generated clip carries its own audio track.
        args.extend(strings(&["-map", "0:v:0", "-map", "1:a:0"]));
        args.extend(["-vf".to_string(), p.frame_filter()]);
        args.extend(["-r".to_string(), p.fps.to_string()]);
        args.extend(["-c:v".to_string(), p.video_codec.clone()]);
        if kind == VisualKind::Image {
            args.extend(strings(&["-tune", "stillimage"]));
        }
        args.extend(["-pix_fmt".to_string(), p.pixel_format.clone()]);
        args.extend(["-c:a".to_string(), p.audio_codec.clone()]);
        args.extend(["-b:a".to_string(), p.audio_bitrate.clone()]);
        args.extend(["-ar".to_string(), p.sample_rate.to_string()]);
        args.extend(strings(&["-ac", "2", "-shortest"]));
        args.push(path_arg(output));
        args
    }

    pub fn concat_args(&self, manifest: &Path, output: &Path) -> Vec<String> {
        let mut args = base_args();
        args.extend(strings(&["-f", "concat", "-safe", "0", "-i"]));
        args.push(path_arg(manifest));
        args.extend(strings(&["-c", "copy"]));
        args.push(path_arg(output));
        args
    }

    async fn run(&self, args: Vec<String>, output: &Path) -> Result<(), ToolError> {
        let program = self.locate().await?;
        debug!("Running: {} {}", program.display(), args.join(" "));

        let result = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await;

        let finished = match result {
            Ok(finished) => finished,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ToolError::Unavailable { tool: self.name() });
            }
            Err(e) => return Err(e.into()),
        };

        if !finished.status.success() {
            discard(output).await;
            return Err(ToolError::Failed {
                exit_code: finished.status.code(),
                stderr: tail(&String::from_utf8_lossy(&finished.stderr), 12),
            });
        }

        match fs::metadata(output).await {
            Ok(meta) if meta.len() > 0 => Ok(()),
            _ => {
                discard(output).await;
                Err(ToolError::MissingOutput(output.to_path_buf()))
            }
        }
    }
}

#[async_trait]
impl MediaTool for Ffmpeg {
    fn name(&self) -> String {
        self.binary.display().to_string()
    }

    async fn locate(&self) -> Result<PathBuf, ToolError> {
        which::which(&self.binary).map_err(|_| ToolError::Unavailable { tool: self.name() })
    }

    async fn render_silence(&self, seconds: u32, output: &Path) -> Result<(), ToolError> {
        self.run(self.silence_args(seconds, output), output).await
    }

    async fn encode_segment(
        &self,
        visual: &Path,
        kind: VisualKind,
        audio: &Path,
        output: &Path,
    ) -> Result<(), ToolError> {
        self.run(self.segment_args(visual, kind, audio, output), output)
            .await
    }

    async fn concat(&self, manifest: &Path, output: &Path) -> Result<(), ToolError> {
        self.run(self.concat_args(manifest, output), output).await
    }
}

fn base_args() -> Vec<String> {
    strings(&["-y", "-hide_banner", "-v", "error"])
}

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| a.to_string()).collect()
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// Remove whatever a failed invocation left at `output`.
async fn discard(output: &Path) {
    if let Err(e) = fs::remove_file(output).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            debug!("Could not remove partial output {}: {}", output.display(), e);
        }
    }
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(args: &[String], needle: &str) -> Option<usize> {
        args.iter().position(|a| a == needle)
    }

    #[test]
    fn test_still_image_segment_loops_and_stops_at_shortest() {
        let ffmpeg = Ffmpeg::default();
        let args = ffmpeg.segment_args(
            Path::new("out/scene_00.png"),
            VisualKind::Image,
            Path::new("out/audio_00.mp3"),
            Path::new("out/segment_00.mp4"),
        );

        let loop_at = position(&args, "-loop").unwrap();
        let first_input = position(&args, "-i").unwrap();
        assert!(loop_at < first_input, "-loop must precede the image input");
        assert_eq!(args[first_input + 1], "out/scene_00.png");
        assert!(args.contains(&"-shortest".to_string()));
        assert!(args.contains(&"stillimage".to_string()));
        assert!(args.contains(&"yuv420p".to_string()));
        assert_eq!(args.last().unwrap(), "out/segment_00.mp4");
    }

    #[test]
    fn test_video_segment_does_not_loop() {
        let ffmpeg = Ffmpeg::default();
        let args = ffmpeg.segment_args(
            Path::new("scene_01.mp4"),
            VisualKind::Video,
            Path::new("audio_01.mp3"),
            Path::new("segment_01.mp4"),
        );

        assert!(position(&args, "-loop").is_none());
        assert!(position(&args, "stillimage").is_none());
        assert!(args.contains(&"1:a:0".to_string()));
        assert!(args.contains(&"-shortest".to_string()));
    }

    #[test]
    fn test_segments_share_one_profile() {
        let profile = EncodeProfile {
            width: 720,
            height: 1280,
            fps: 24,
            ..EncodeProfile::default()
        };
        let ffmpeg = Ffmpeg::default().with_profile(profile);
        let image = ffmpeg.segment_args(
            Path::new("a.png"),
            VisualKind::Image,
            Path::new("a.mp3"),
            Path::new("a.mp4"),
        );
        let video = ffmpeg.segment_args(
            Path::new("b.mp4"),
            VisualKind::Video,
            Path::new("b.mp3"),
            Path::new("b_out.mp4"),
        );

        for args in [&image, &video] {
            let vf = position(args, "-vf").unwrap();
            assert!(args[vf + 1].starts_with("scale=720:1280"));
            let rate = position(args, "-r").unwrap();
            assert_eq!(args[rate + 1], "24");
            let ar = position(args, "-ar").unwrap();
            assert_eq!(args[ar + 1], "44100");
        }
    }

    #[test]
    fn test_concat_is_stream_copy() {
        let args = Ffmpeg::default().concat_args(Path::new("segments.txt"), Path::new("final.mp4"));
        let joined = args.join(" ");
        assert!(joined.contains("-f concat -safe 0 -i segments.txt -c copy final.mp4"));
    }

    #[test]
    fn test_silence_duration_is_passed_through() {
        let args = Ffmpeg::default().silence_args(5, Path::new("audio_02.mp3"));
        let t = position(&args, "-t").unwrap();
        assert_eq!(args[t + 1], "5");
        assert!(args.iter().any(|a| a.starts_with("anullsrc=")));
    }

    #[test]
    fn test_tail_keeps_last_lines() {
        let text = "one\n\ntwo\nthree\nfour\n";
        assert_eq!(tail(text, 2), "three\nfour");
        assert_eq!(tail(text, 10), "one\ntwo\nthree\nfour");
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let ffmpeg = Ffmpeg::new("scenecast-no-such-ffmpeg-binary");
        let err = ffmpeg.locate().await.unwrap_err();
        assert!(matches!(err, ToolError::Unavailable { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_run_removes_partial_output() {
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        let dir = TempDir::new().unwrap();
        let stub = dir.path().join("fake-ffmpeg");
        // Writes to its last argument, then fails.
        std::fs::write(
            &stub,
            "#!/bin/sh\nfor last; do :; done\necho partial > \"$last\"\nexit 3\n",
        )
        .unwrap();
        std::fs::set_permissions(&stub, std::fs::Permissions::from_mode(0o755)).unwrap();

        let manifest = dir.path().join("segments.txt");
        std::fs::write(&manifest, "").unwrap();
        let output = dir.path().join("final_video.mp4");

        let err = Ffmpeg::new(&stub)
            .concat(&manifest, &output)
            .await
            .unwrap_err();

        match err {
            ToolError::Failed { exit_code, .. } => assert_eq!(exit_code, Some(3)),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!output.exists());
    }
}
