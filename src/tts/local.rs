use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::interface::{SpeechOptions, SpeechSynthesizer, Voice, VoiceQuality};
use crate::error::{SpeechError, SpeechResult};

/// espeak-style on-device synthesizer driven through its command line.
pub struct CommandSynthesizer {
    program: String,
    args: Vec<String>,
    enhanced_args: Vec<String>,
    voices_args: Vec<String>,
    current: Mutex<Option<Child>>,
}

impl CommandSynthesizer {
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        enhanced_args: Vec<String>,
        voices_args: Vec<String>,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            enhanced_args,
            voices_args,
            current: Mutex::new(None),
        }
    }

    fn speak_args(&self, text: &str, options: &SpeechOptions) -> Vec<String> {
        let mut args = self.args.clone();
        if options.quality == VoiceQuality::Enhanced {
            args.extend(self.enhanced_args.iter().cloned());
        }
        args.push("-v".to_string());
        args.push(options.language.clone());
        args.push("-p".to_string());
        args.push(pitch_arg(options.pitch).to_string());
        args.push("-s".to_string());
        args.push(rate_arg(options.rate).to_string());
        args.push("--".to_string());
        args.push(text.to_string());
        args
    }
}

/// espeak pitch is 0..=99 with 50 as neutral.
fn pitch_arg(pitch: f32) -> u32 {
    (pitch * 50.0).round().clamp(0.0, 99.0) as u32
}

/// espeak speed is words per minute; 175 is the normal rate.
fn rate_arg(rate: f32) -> u32 {
    (rate * 175.0).round().clamp(80.0, 500.0) as u32
}

/// Drop the tracked utterance if it already exited, reaping the process.
fn reap_finished(current: &mut Option<Child>) -> SpeechResult<()> {
    let Some(child) = current.as_mut() else {
        return Ok(());
    };
    match child.try_wait() {
        Ok(None) => Ok(()),
        Ok(Some(status)) => {
            debug!("Utterance finished with {}", status);
            *current = None;
            Ok(())
        }
        Err(e) => Err(SpeechError::Synthesizer(format!(
            "Failed to query speech synthesizer: {}",
            e
        ))),
    }
}

/// SIGSTOP / SIGCONT the synthesizer process.
#[cfg(unix)]
fn set_suspended(child: &Child, suspended: bool) -> SpeechResult<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        return Ok(());
    };
    let signal = if suspended {
        Signal::SIGSTOP
    } else {
        Signal::SIGCONT
    };
    kill(Pid::from_raw(pid as i32), signal).map_err(|e| {
        SpeechError::Synthesizer(format!(
            "Failed to send {:?} to speech synthesizer: {}",
            signal, e
        ))
    })
}

#[cfg(not(unix))]
fn set_suspended(_child: &Child, _suspended: bool) -> SpeechResult<()> {
    Err(SpeechError::Synthesizer(
        "Pausing local speech is not supported on this platform".to_string(),
    ))
}

/// Parse the table printed by `espeak-ng --voices`.
pub fn parse_voice_list(output: &str) -> Vec<Voice> {
    output
        .lines()
        .filter(|line| !line.trim_start().starts_with("Pty"))
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 5 {
                return None;
            }
            Some(Voice {
                identifier: fields[4].to_string(),
                name: fields[3].to_string(),
                language: fields[1].to_string(),
                quality: VoiceQuality::Default,
            })
        })
        .collect()
}

#[async_trait]
impl SpeechSynthesizer for CommandSynthesizer {
    async fn speak(&self, text: &str, options: &SpeechOptions) -> SpeechResult<()> {
        let mut current = self.current.lock().await;
        if let Err(e) = reap_finished(&mut current) {
            warn!("{}", e);
        }
        if let Some(mut previous) = current.take() {
            if let Err(e) = previous.kill().await {
                debug!("Previous utterance already ended: {}", e);
            }
        }

        let args = self.speak_args(text, options);
        debug!("Speaking locally with {} ({})", self.program, options.language);
        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                SpeechError::Synthesizer(format!(
                    "Failed to start speech synthesizer '{}': {}",
                    self.program, e
                ))
            })?;

        *current = Some(child);
        Ok(())
    }

    async fn stop(&self) -> SpeechResult<()> {
        if let Some(mut child) = self.current.lock().await.take() {
            if let Err(e) = child.kill().await {
                warn!("Failed to stop speech synthesizer: {}", e);
            }
        }
        Ok(())
    }

    async fn pause(&self) -> SpeechResult<()> {
        let mut current = self.current.lock().await;
        reap_finished(&mut current)?;
        match current.as_ref() {
            Some(child) => set_suspended(child, true),
            None => Ok(()),
        }
    }

    async fn resume(&self) -> SpeechResult<()> {
        let mut current = self.current.lock().await;
        reap_finished(&mut current)?;
        match current.as_ref() {
            Some(child) => set_suspended(child, false),
            None => Ok(()),
        }
    }

    async fn is_speaking(&self) -> SpeechResult<bool> {
        let mut current = self.current.lock().await;
        reap_finished(&mut current)?;
        Ok(current.is_some())
    }

    async fn voices(&self) -> SpeechResult<Vec<Voice>> {
        let output = Command::new(&self.program)
            .args(&self.voices_args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                SpeechError::Synthesizer(format!(
                    "Failed to list voices with '{}': {}",
                    self.program, e
                ))
            })?;

        if !output.status.success() {
            return Err(SpeechError::Synthesizer(format!(
                "Listing voices failed with {}",
                output.status
            )));
        }

        Ok(parse_voice_list(&String::from_utf8_lossy(&output.stdout)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VOICES: &str = "\
Pty Language       Age/Gender VoiceName          File                 Other Languages
 5  af              --/M      Afrikaans          gmw/af
 5  en-gb           --/M      English_(Great_Britain) gmw/en            (en 2)
 5  es              --/M      Spanish_(Spain)    roa/es
";

    #[test]
    fn test_parse_voice_list() {
        let voices = parse_voice_list(VOICES);
        assert_eq!(voices.len(), 3);
        assert_eq!(voices[1].language, "en-gb");
        assert_eq!(voices[1].identifier, "gmw/en");
        assert_eq!(voices[2].name, "Spanish_(Spain)");
    }

    #[test]
    fn test_option_mapping() {
        assert_eq!(pitch_arg(1.0), 50);
        assert_eq!(pitch_arg(5.0), 99);
        assert_eq!(pitch_arg(-1.0), 0);
        assert_eq!(rate_arg(1.0), 175);
        assert_eq!(rate_arg(0.1), 80);
    }

    #[test]
    fn test_speak_args() {
        let synth = CommandSynthesizer::new(
            "espeak-ng",
            vec!["-a".to_string(), "120".to_string()],
            vec!["-k".to_string(), "5".to_string()],
            Vec::new(),
        );
        let options = SpeechOptions {
            language: "fr".to_string(),
            pitch: 1.2,
            rate: 1.2,
            quality: VoiceQuality::Enhanced,
        };
        let args = synth.speak_args("-bonjour", &options);
        assert_eq!(
            args,
            vec!["-a", "120", "-k", "5", "-v", "fr", "-p", "60", "-s", "210", "--", "-bonjour"]
        );

        let plain = synth.speak_args("hi", &SpeechOptions::default());
        assert!(!plain.contains(&"-k".to_string()));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let synth = CommandSynthesizer::new("no-such-synth-binary", Vec::new(), Vec::new(), Vec::new());
        let err = synth.speak("hello", &SpeechOptions::default()).await.unwrap_err();
        assert!(matches!(err, SpeechError::Synthesizer(_)));
        assert!(synth.voices().await.is_err());
        assert!(!synth.is_speaking().await.unwrap());
    }

    #[tokio::test]
    async fn test_speak_then_stop() {
        let synth = CommandSynthesizer::new(
            "sh",
            vec!["-c".to_string(), "sleep 30".to_string()],
            Vec::new(),
            Vec::new(),
        );
        synth.speak("hello", &SpeechOptions::default()).await.unwrap();
        assert!(synth.is_speaking().await.unwrap());
        synth.stop().await.unwrap();
        assert!(!synth.is_speaking().await.unwrap());
    }

    fn sleeper() -> CommandSynthesizer {
        CommandSynthesizer::new(
            "sh",
            vec!["-c".to_string(), "sleep 30".to_string()],
            Vec::new(),
            Vec::new(),
        )
    }

    #[cfg(target_os = "linux")]
    async fn process_state(synth: &CommandSynthesizer) -> Option<char> {
        let pid = synth.current.lock().await.as_ref()?.id()?;
        let stat = std::fs::read_to_string(format!("/proc/{}/stat", pid)).ok()?;
        let after_name = stat.rsplit_once(") ")?.1;
        after_name.chars().next()
    }

    #[cfg(target_os = "linux")]
    async fn wait_for_state(synth: &CommandSynthesizer, wanted: fn(char) -> bool) -> bool {
        for _ in 0..100 {
            if process_state(synth).await.map(wanted).unwrap_or(false) {
                return true;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        false
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_pause_and_resume_suspend_the_process() {
        let synth = sleeper();
        synth.speak("hello", &SpeechOptions::default()).await.unwrap();

        synth.pause().await.unwrap();
        assert!(wait_for_state(&synth, |s| s == 'T' || s == 't').await);
        assert!(synth.is_speaking().await.unwrap());

        synth.resume().await.unwrap();
        assert!(wait_for_state(&synth, |s| s == 'S' || s == 'R').await);

        synth.pause().await.unwrap();
        synth.stop().await.unwrap();
        assert!(!synth.is_speaking().await.unwrap());
    }

    #[tokio::test]
    async fn test_pause_without_utterance_is_noop() {
        let synth = sleeper();
        synth.pause().await.unwrap();
        synth.resume().await.unwrap();
        assert!(!synth.is_speaking().await.unwrap());
    }

    #[tokio::test]
    async fn test_finished_utterance_is_reaped() {
        let synth = CommandSynthesizer::new("true", Vec::new(), Vec::new(), Vec::new());
        synth.speak("hello", &SpeechOptions::default()).await.unwrap();
        let child_id = synth.current.lock().await.as_ref().and_then(|c| c.id());
        assert!(child_id.is_some());

        for _ in 0..100 {
            if !synth.is_speaking().await.unwrap() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(synth.current.lock().await.is_none());

        synth.speak("again", &SpeechOptions::default()).await.unwrap();
        synth.pause().await.unwrap();
        synth.stop().await.unwrap();
    }
}
