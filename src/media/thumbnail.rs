//! Thumbnail extraction
//!
//! One frame one second into each video is written as `<filename>.jpg`
//! under `thumbnails/`. Extraction is best effort: a file that is not a
//! video, a corrupt stream, a missing `ffmpeg` or a hung process all end up
//! as a [`ThumbnailFailure`] and the row falls back to the placeholder.
//!
//! The extractor sits behind [`FrameExtractor`] so the pipeline can be
//! driven without a real `ffmpeg` on the machine.

use super::MediaFile;
use crate::error::{ReportError, Result};
use crate::layout::LOGO_FILE;
use crate::progress;
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Seek position handed to the extractor
pub const SEEK_OFFSET: &str = "00:00:01.000";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const PLACEHOLDER_NAME: &str = "generic_thumb.svg";

const PLACEHOLDER_SVG: &str = include_str!("generic_thumb.svg");
const POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("extractor exited with {status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },

    #[error("extractor timed out after {0:?}")]
    TimedOut(Duration),

    #[error("extractor succeeded but wrote no image")]
    NoOutput,

    #[error("I/O error while waiting for extractor: {0}")]
    Io(#[from] io::Error),
}

/// Pulls a single frame out of a video.
pub trait FrameExtractor: Send + Sync {
    fn extract(&self, input: &Path, output: &Path) -> std::result::Result<(), ExtractError>;
}

/// Runs the `ffmpeg` binary once per file.
#[derive(Debug, Clone)]
pub struct FfmpegExtractor {
    program: PathBuf,
    seek: String,
    timeout: Duration,
}

impl Default for FfmpegExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegExtractor {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
            seek: SEEK_OFFSET.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// `ffmpeg -i <input> -ss 00:00:01.000 -vframes 1 <output>`, quiet and
    /// overwriting.
    pub fn command(&self, input: &Path, output: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-nostdin")
            .arg("-y")
            .arg("-i")
            .arg(input)
            .arg("-ss")
            .arg(&self.seek)
            .arg("-vframes")
            .arg("1")
            .arg(output);
        cmd
    }
}

impl FrameExtractor for FfmpegExtractor {
    fn extract(&self, input: &Path, output: &Path) -> std::result::Result<(), ExtractError> {
        let mut child = self
            .command(input, output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ExtractError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        // Drain stderr on the side so a chatty child can't fill the pipe and stall
        let stderr = child.stderr.take();
        let reader = thread::spawn(move || {
            let mut buf = String::new();
            if let Some(mut pipe) = stderr {
                let _ = pipe.read_to_string(&mut buf);
            }
            buf
        });

        let started = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if started.elapsed() >= self.timeout {
                let _ = child.kill();
                let _ = child.wait();
                let _ = reader.join();
                return Err(ExtractError::TimedOut(self.timeout));
            }
            thread::sleep(POLL_INTERVAL);
        };

        let stderr = reader.join().unwrap_or_default();
        if !status.success() {
            return Err(ExtractError::Failed {
                status,
                stderr: stderr.trim().to_string(),
            });
        }
        if !output.is_file() {
            return Err(ExtractError::NoOutput);
        }
        Ok(())
    }
}

/// Image shown when a row has no extracted frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Placeholder {
    /// Generic image bundled with the binary
    #[default]
    Builtin,
    /// User-supplied image, copied under its own file name
    File(PathBuf),
}

impl Placeholder {
    pub fn file_name(&self) -> String {
        match self {
            Placeholder::Builtin => PLACEHOLDER_NAME.to_string(),
            Placeholder::File(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| PLACEHOLDER_NAME.to_string()),
        }
    }

    /// Copy the placeholder into `dir`, returning where it landed.
    pub fn install(&self, dir: &Path) -> Result<PathBuf> {
        let dest = dir.join(self.file_name());
        match self {
            Placeholder::Builtin => {
                fs::write(&dest, PLACEHOLDER_SVG).map_err(|e| ReportError::io(&dest, e))?;
            }
            Placeholder::File(src) => {
                // Copying a file onto itself truncates it
                if is_same_file(src, &dest) {
                    return Ok(dest);
                }
                fs::copy(src, &dest).map_err(|e| ReportError::io(src, e))?;
            }
        }
        Ok(dest)
    }
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Name of the thumbnail written for `filename`.
pub fn thumbnail_name(filename: &str) -> String {
    format!("{}.jpg", filename)
}

#[derive(Debug, Clone, Serialize)]
pub struct ThumbnailFailure {
    pub filename: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct ThumbnailRun {
    pub generated: usize,
    pub failed: Vec<ThumbnailFailure>,
    /// Files not sent to the extractor (logo, placeholder, or extraction off)
    pub not_attempted: usize,
    pub placeholder_path: PathBuf,
}

/// Install the placeholder and extract one frame per media file.
///
/// With `extractor` set to `None` only the placeholder is installed.
pub fn generate_thumbnails(
    files: &[MediaFile],
    out_dir: &Path,
    extractor: Option<&dyn FrameExtractor>,
    placeholder: &Placeholder,
    show_progress: bool,
) -> Result<ThumbnailRun> {
    fs::create_dir_all(out_dir).map_err(|e| ReportError::io(out_dir, e))?;
    let placeholder_path = placeholder.install(out_dir)?;
    let placeholder_name = placeholder.file_name();

    let Some(extractor) = extractor else {
        // Frames from an earlier run would otherwise still be linked
        for file in files {
            let name = thumbnail_name(&file.filename);
            if name != placeholder_name {
                let _ = fs::remove_file(out_dir.join(name));
            }
        }
        return Ok(ThumbnailRun {
            not_attempted: files.len(),
            placeholder_path,
            ..ThumbnailRun::default()
        });
    };

    let (targets, reserved): (Vec<&MediaFile>, Vec<&MediaFile>) = files
        .iter()
        .partition(|f| f.filename != LOGO_FILE && f.filename != placeholder_name);

    tracing::info!(count = targets.len(), dir = %out_dir.display(), "extracting thumbnails");
    let pb = progress::bar(targets.len(), "thumbnails", show_progress);

    let outcomes: Vec<(&MediaFile, std::result::Result<(), ExtractError>)> = targets
        .into_par_iter()
        .map(|file| {
            let output = out_dir.join(thumbnail_name(&file.filename));
            // A frame left over from an earlier run must not mask a failure now
            let _ = fs::remove_file(&output);
            let result = extractor.extract(&file.path, &output);
            if result.is_err() {
                // Partial output from a failed or killed run
                let _ = fs::remove_file(&output);
            }
            pb.inc(1);
            pb.set_message(file.filename.clone());
            (file, result)
        })
        .collect();

    pb.finish_and_clear();

    let mut run = ThumbnailRun {
        not_attempted: reserved.len(),
        placeholder_path,
        ..ThumbnailRun::default()
    };
    for (file, result) in outcomes {
        match result {
            Ok(()) => {
                tracing::debug!(file = %file.filename, "thumbnail written");
                run.generated += 1;
            }
            Err(e) => {
                tracing::warn!(file = %file.filename, error = %e, "no thumbnail, using placeholder");
                run.failed.push(ThumbnailFailure {
                    filename: file.filename.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// Writes a fake JPEG. Inputs named "broken" fail with nothing written,
    /// inputs named "partial" fail after writing a truncated frame.
    #[derive(Default)]
    struct FakeExtractor {
        calls: Mutex<Vec<String>>,
    }

    impl FrameExtractor for FakeExtractor {
        fn extract(&self, input: &Path, output: &Path) -> std::result::Result<(), ExtractError> {
            let name = input.file_name().unwrap().to_string_lossy().into_owned();
            self.calls.lock().unwrap().push(name.clone());
            if name.contains("broken") {
                return Err(ExtractError::NoOutput);
            }
            fs::write(output, b"\xFF\xD8\xFF")?;
            if name.contains("partial") {
                return Err(ExtractError::TimedOut(Duration::from_millis(1)));
            }
            Ok(())
        }
    }

    fn media(dir: &Path, name: &str) -> MediaFile {
        MediaFile {
            path: dir.join(name),
            filename: name.to_string(),
            size: 0,
            md5: String::new(),
            sha1: String::new(),
        }
    }

    #[test]
    fn test_thumbnail_name() {
        assert_eq!(thumbnail_name("clip.mp4"), "clip.mp4.jpg");
    }

    #[test]
    fn test_ffmpeg_command_line() {
        let ex = FfmpegExtractor::new().with_program("/opt/ffmpeg");
        let cmd = ex.command(Path::new("/case/media/a.mp4"), Path::new("/case/thumbnails/a.mp4.jpg"));
        let args: Vec<String> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();

        assert_eq!(cmd.get_program(), "/opt/ffmpeg");
        let i = args.iter().position(|a| a == "-i").unwrap();
        assert_eq!(args[i + 1], "/case/media/a.mp4");
        let ss = args.iter().position(|a| a == "-ss").unwrap();
        assert_eq!(args[ss + 1], "00:00:01.000");
        let vf = args.iter().position(|a| a == "-vframes").unwrap();
        assert_eq!(args[vf + 1], "1");
        assert_eq!(args.last().unwrap(), "/case/thumbnails/a.mp4.jpg");
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let dir = tempdir().unwrap();
        let ex = FfmpegExtractor::new().with_program(dir.path().join("no-such-ffmpeg"));
        let err = ex
            .extract(&dir.path().join("a.mp4"), &dir.path().join("a.mp4.jpg"))
            .unwrap_err();
        assert!(matches!(err, ExtractError::Spawn { .. }), "got {:?}", err);
    }

    /// Executable shell script standing in for ffmpeg
    #[cfg(unix)]
    fn fake_program(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-ffmpeg");
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn test_hung_extractor_is_killed_at_timeout() {
        let dir = tempdir().unwrap();
        let ex = FfmpegExtractor::new()
            .with_program(fake_program(dir.path(), "exec sleep 5"))
            .with_timeout(Duration::from_millis(200));

        let started = Instant::now();
        let err = ex
            .extract(&dir.path().join("a.mp4"), &dir.path().join("a.mp4.jpg"))
            .unwrap_err();

        assert!(matches!(err, ExtractError::TimedOut(t) if t == Duration::from_millis(200)), "got {:?}", err);
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_carries_stderr() {
        let dir = tempdir().unwrap();
        let ex = FfmpegExtractor::new().with_program(fake_program(dir.path(), "echo boom >&2\nexit 3"));

        let err = ex
            .extract(&dir.path().join("a.mp4"), &dir.path().join("a.mp4.jpg"))
            .unwrap_err();

        match err {
            ExtractError::Failed { status, stderr } => {
                assert_eq!(status.code(), Some(3));
                assert_eq!(stderr, "boom");
            }
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_clean_exit_without_image_is_no_output() {
        let dir = tempdir().unwrap();
        let ex = FfmpegExtractor::new().with_program(fake_program(dir.path(), "exit 0"));

        let err = ex
            .extract(&dir.path().join("a.mp4"), &dir.path().join("a.mp4.jpg"))
            .unwrap_err();
        assert!(matches!(err, ExtractError::NoOutput), "got {:?}", err);
    }

    #[test]
    fn test_placeholder_installed_builtin() {
        let dir = tempdir().unwrap();
        let path = Placeholder::Builtin.install(dir.path()).unwrap();
        assert_eq!(path, dir.path().join(PLACEHOLDER_NAME));
        let svg = fs::read_to_string(path).unwrap();
        assert!(svg.starts_with("<svg"));
    }

    #[test]
    fn test_placeholder_from_file_keeps_name() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("custom.png");
        fs::write(&src, b"png").unwrap();
        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();

        let placeholder = Placeholder::File(src);
        assert_eq!(placeholder.file_name(), "custom.png");
        let installed = placeholder.install(&out).unwrap();
        assert_eq!(fs::read(installed).unwrap(), b"png");
    }

    #[test]
    fn test_placeholder_already_in_place_is_kept() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("custom.png");
        fs::write(&src, b"png").unwrap();

        let installed = Placeholder::File(src.clone()).install(dir.path()).unwrap();

        assert_eq!(installed, src);
        assert_eq!(fs::read(&src).unwrap(), b"png");
    }

    #[test]
    fn test_generate_creates_dir_and_records_failures() {
        let dir = tempdir().unwrap();
        let media_dir = dir.path().join("media");
        let out = dir.path().join("thumbnails");
        let files = vec![
            media(&media_dir, "a.mp4"),
            media(&media_dir, "broken.mp4"),
            media(&media_dir, "logo.png"),
        ];
        let ex = FakeExtractor::default();

        let run = generate_thumbnails(&files, &out, Some(&ex), &Placeholder::Builtin, false).unwrap();

        assert!(out.join(PLACEHOLDER_NAME).is_file());
        assert!(out.join("a.mp4.jpg").is_file());
        assert!(!out.join("broken.mp4.jpg").exists());
        assert_eq!(run.generated, 1);
        assert_eq!(run.failed.len(), 1);
        assert_eq!(run.failed[0].filename, "broken.mp4");
        assert_eq!(run.not_attempted, 1, "logo is never sent to the extractor");

        let calls = ex.calls.lock().unwrap();
        assert!(!calls.contains(&"logo.png".to_string()));
    }

    #[test]
    fn test_stale_thumbnail_removed_on_failure() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("thumbnails");
        fs::create_dir(&out).unwrap();
        fs::write(out.join("broken.mp4.jpg"), b"old").unwrap();
        let files = vec![media(dir.path(), "broken.mp4")];

        let ex = FakeExtractor::default();
        generate_thumbnails(&files, &out, Some(&ex), &Placeholder::Builtin, false).unwrap();

        assert!(!out.join("broken.mp4.jpg").exists());
    }

    #[test]
    fn test_no_extractor_only_installs_placeholder() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("thumbnails");
        let files = vec![media(dir.path(), "a.mp4")];

        let run = generate_thumbnails(&files, &out, None, &Placeholder::Builtin, false).unwrap();

        assert_eq!(run.generated, 0);
        assert_eq!(run.not_attempted, 1);
        assert!(out.join(PLACEHOLDER_NAME).is_file());
        assert!(!out.join("a.mp4.jpg").exists());
    }

    #[test]
    fn test_partial_frame_removed_on_failure() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("thumbnails");
        let files = vec![media(dir.path(), "partial.mp4")];

        let ex = FakeExtractor::default();
        let run = generate_thumbnails(&files, &out, Some(&ex), &Placeholder::Builtin, false).unwrap();

        assert_eq!(run.failed.len(), 1);
        assert!(!out.join("partial.mp4.jpg").exists());
    }

    #[test]
    fn test_no_extractor_removes_frames_from_earlier_run() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("thumbnails");
        fs::create_dir(&out).unwrap();
        fs::write(out.join("a.mp4.jpg"), b"old run").unwrap();
        let files = vec![media(dir.path(), "a.mp4")];

        generate_thumbnails(&files, &out, None, &Placeholder::Builtin, false).unwrap();

        assert!(!out.join("a.mp4.jpg").exists());
        assert!(out.join(PLACEHOLDER_NAME).is_file());
    }
}
