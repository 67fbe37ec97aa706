use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::{ChildStdin, Command};

use super::{Voice, VoiceEngine};
use crate::error::AppError;

/// Offline engine backed by the `espeak-ng` command line tool.
///
/// Every call spawns its own process with voice and rate passed as
/// arguments, so concurrent requests never share engine state.
pub struct EspeakEngine {
    binary: String,
    base_rate: u32,
}

impl EspeakEngine {
    pub fn new(binary: impl Into<String>, base_rate: u32) -> Self {
        Self {
            binary: binary.into(),
            base_rate,
        }
    }

    fn spawn_error(&self, e: std::io::Error) -> AppError {
        AppError::TtsError(format!(
            "Failed to run {} (is it installed?): {}",
            self.binary, e
        ))
    }
}

#[async_trait]
impl VoiceEngine for EspeakEngine {
    fn base_rate(&self) -> u32 {
        self.base_rate
    }

    async fn voices(&self) -> Result<Vec<Voice>, AppError> {
        let output = Command::new(&self.binary)
            .arg("--voices")
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::TtsError(format!(
                "{} --voices failed: {}",
                self.binary, stderr
            )));
        }

        Ok(parse_voices(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn synthesize(
        &self,
        text: &str,
        voice: &Voice,
        rate: u32,
        output: &Path,
    ) -> Result<(), AppError> {
        let mut child = Command::new(&self.binary)
            .arg("-v")
            .arg(&voice.identifier)
            .arg("-s")
            .arg(rate.to_string())
            .arg("-w")
            .arg(output)
            .arg("--stdin")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let fed = match child.stdin.take() {
            Some(stdin) => feed_stdin(stdin, text).await,
            None => Ok(()),
        };

        // Always reap the child so its stderr explains an early exit.
        let result = child.wait_with_output().await?;
        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(AppError::TtsError(format!(
                "{} failed: {}",
                self.binary,
                stderr.trim()
            )));
        }

        fed?;
        Ok(())
    }
}

/// Write the text and close stdin. A closed pipe means the synthesizer
/// exited early, which its exit status reports.
async fn feed_stdin(mut stdin: ChildStdin, text: &str) -> Result<(), AppError> {
    let result = async {
        stdin.write_all(text.as_bytes()).await?;
        stdin.shutdown().await
    }
    .await;

    match result {
        Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
        other => Ok(other?),
    }
}

/// Parse the table printed by `espeak-ng --voices`.
///
/// Columns: `Pty Language Age/Gender VoiceName File [Other Languages]`.
pub fn parse_voices(listing: &str) -> Vec<Voice> {
    listing
        .lines()
        .filter(|line| !line.trim_start().starts_with("Pty"))
        .filter_map(|line| {
            let cols: Vec<&str> = line.split_whitespace().collect();
            if cols.len() < 5 || cols[0].parse::<u32>().is_err() {
                return None;
            }

            Some(Voice {
                name: cols[3].replace('_', " "),
                identifier: cols[4].to_string(),
                language: Some(cols[1].to_string()).filter(|l| !l.is_empty()),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const LISTING: &str = "\
Pty Language       Age/Gender VoiceName          File                 Other Languages
 5  af              --/M      Afrikaans          gmw/af
 5  en-gb           --/M      English_(Great_Britain) gmw/en           (en 2)
 2  en-us           --/M      English_(America)  gmw/en-US            (en 3)
 5  fr-fr           --/M      French_(France)    roa/fr               (fr 5)
";

    #[test]
    fn test_parse_voices() {
        let voices = parse_voices(LISTING);
        assert_eq!(voices.len(), 4);
        assert_eq!(
            voices[1],
            Voice {
                name: "English (Great Britain)".into(),
                identifier: "gmw/en".into(),
                language: Some("en-gb".into()),
            }
        );
        assert_eq!(voices[3].identifier, "roa/fr");
    }

    #[test]
    fn test_parse_voices_skips_malformed_rows() {
        let listing = "Pty Language Age/Gender VoiceName File\n\ngarbage line\n 5 de --/M German gmw/de\n";
        let voices = parse_voices(listing);
        assert_eq!(voices.len(), 1);
        assert_eq!(voices[0].name, "German");
    }

    #[test]
    fn test_parse_empty_listing() {
        assert!(parse_voices("").is_empty());
    }

    #[cfg(unix)]
    fn write_script(dir: &Path, name: &str, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn voice(identifier: &str) -> Voice {
        Voice {
            name: "English".into(),
            identifier: identifier.into(),
            language: Some("en".into()),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_voices_from_binary() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(
            dir.path(),
            "espeak-voices",
            &format!("cat <<'EOF'\n{}EOF\n", LISTING),
        );

        let voices = EspeakEngine::new(script, 200).voices().await.unwrap();
        assert_eq!(voices.len(), 4);
        assert_eq!(voices[0].identifier, "gmw/af");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_synthesize_passes_voice_rate_and_output() {
        let dir = tempfile::tempdir().unwrap();
        let args_file = dir.path().join("args.txt");
        let stdin_file = dir.path().join("stdin.txt");
        let fixture = dir.path().join("fixture.wav");

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&fixture, spec).unwrap();
        for _ in 0..16000 {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        let script = write_script(
            dir.path(),
            "espeak-ok",
            &format!(
                r#"printf '%s\n' "$@" > "{args}"
cat > "{stdin}"
out=""
while [ $# -gt 0 ]; do
  if [ "$1" = "-w" ]; then out="$2"; fi
  shift
done
cp "{wav}" "$out"
"#,
                args = args_file.display(),
                stdin = stdin_file.display(),
                wav = fixture.display(),
            ),
        );

        let output = dir.path().join("speech.wav");
        EspeakEngine::new(script, 200)
            .synthesize("Hello from the shell", &voice("gmw/en-US"), 250, &output)
            .await
            .unwrap();

        let args = std::fs::read_to_string(&args_file).unwrap();
        let args: Vec<&str> = args.lines().collect();
        let output_arg = output.display().to_string();
        assert_eq!(
            args,
            vec!["-v", "gmw/en-US", "-s", "250", "-w", output_arg.as_str(), "--stdin"]
        );
        assert_eq!(
            std::fs::read_to_string(&stdin_file).unwrap(),
            "Hello from the shell"
        );

        let audio = std::fs::read(&output).unwrap();
        let seconds = super::super::wav_duration_seconds(&audio).unwrap();
        assert!((seconds - 1.0).abs() < f32::EPSILON);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_early_exit_reports_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(
            dir.path(),
            "espeak-fail",
            "echo 'voice does not exist' >&2\nexit 1\n",
        );

        // Large enough to overflow the pipe buffer after the process is gone.
        let text = "a".repeat(2 * 1024 * 1024);
        let output = dir.path().join("speech.wav");
        let err = EspeakEngine::new(script, 200)
            .synthesize(&text, &voice("nope"), 200, &output)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::TtsError(_)), "{:?}", err);
        assert!(err.to_string().contains("voice does not exist"));
    }

    #[tokio::test]
    async fn test_missing_binary_is_tts_error() {
        let engine = EspeakEngine::new("definitely-not-a-real-espeak-binary", 200);
        let err = engine.voices().await.unwrap_err();
        assert!(matches!(err, AppError::TtsError(_)));
        assert!(err.to_string().contains("is it installed?"));
    }
}
