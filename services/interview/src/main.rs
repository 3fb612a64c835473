mod config;

use crate::config::{Config, INPUT_CHUNK_SIZE, OUTPUT_CHUNK_SIZE, OUTPUT_LATENCY_MS};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FrameCount, StreamConfig};
use interview_core::Command;
use interview_core::gemini::GeminiClient;
use interview_core::prompt::Persona;
use interview_core::session::{
    InterviewConfig, InterviewSession, MAX_QUESTIONS, MIN_QUESTIONS, Phase, SessionEvent,
};
use interview_speech::stt::Transcriber;
use interview_speech::tts::{Synthesizer, Utterance};
use interview_speech::{STT_SAMPLE_RATE, device, pcm};
use ringbuf::HeapProd;
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use rubato::Resampler;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::AsyncBufReadExt;
use tracing_subscriber::fmt::time::ChronoLocal;

/// CLI mirror of [`Persona`]; clap needs its own derive surface.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum PersonaArg {
    Standard,
    Confused,
    Efficient,
    Chatty,
    EdgeCase,
}

impl From<PersonaArg> for Persona {
    fn from(value: PersonaArg) -> Self {
        match value {
            PersonaArg::Standard => Persona::Standard,
            PersonaArg::Confused => Persona::Confused,
            PersonaArg::Efficient => Persona::Efficient,
            PersonaArg::Chatty => Persona::Chatty,
            PersonaArg::EdgeCase => Persona::EdgeCase,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "interview", about = "Voice-enabled interview practice partner")]
struct Cli {
    /// Target role to interview for
    #[arg(long, default_value = "Software Engineer")]
    role: String,

    /// Interview length in questions
    #[arg(long, default_value_t = 5,
          value_parser = clap::value_parser!(u8).range(MIN_QUESTIONS as i64..=MAX_QUESTIONS as i64))]
    questions: u8,

    /// Candidate persona to simulate (hint passed to the interviewer)
    #[arg(long, value_enum, default_value = "standard")]
    persona: PersonaArg,

    /// BCP-47 language code for speech (overrides SPEECH_LANGUAGE)
    #[arg(long)]
    language: Option<String>,

    /// Disable audio entirely; type answers, read questions
    #[arg(long)]
    text_only: bool,

    /// Audio input device name (defaults to the system default)
    #[arg(long)]
    input_device: Option<String>,

    /// Audio output device name (defaults to the system default)
    #[arg(long)]
    output_device: Option<String>,
}

/// The audio front end: a microphone stream gated by a recording flag and
/// an output stream fed from a ring buffer. Both streams run for the whole
/// session; silence plays when the buffer is empty.
struct VoiceIo {
    _input_stream: cpal::Stream,
    _output_stream: cpal::Stream,
    playback_tx: HeapProd<f32>,
    captured_rx: tokio::sync::mpsc::Receiver<Vec<f32>>,
    recording: Arc<AtomicBool>,
    input_sample_rate: f64,
    output_sample_rate: f64,
}

fn build_voice_io(input_name: Option<String>, output_name: Option<String>) -> Result<VoiceIo> {
    let (captured_tx, captured_rx) = tokio::sync::mpsc::channel::<Vec<f32>>(1024);
    let recording = Arc::new(AtomicBool::new(false));

    // Microphone side.
    let input = device::get_or_default_input(input_name)?;
    tracing::info!("Using input device: {:?}", input.name()?);
    let input_config = input
        .default_input_config()
        .context("Failed to get default input config")?;
    let input_config = StreamConfig {
        channels: input_config.channels(),
        sample_rate: input_config.sample_rate(),
        buffer_size: cpal::BufferSize::Fixed(FrameCount::from(INPUT_CHUNK_SIZE as u32)),
    };
    let input_channel_count = input_config.channels as usize;
    let input_sample_rate = input_config.sample_rate.0 as f64;
    tracing::debug!("Input stream config: {:?}", &input_config);

    let recording_flag = recording.clone();
    // Downmixes to mono and forwards captured chunks while recording is on.
    let input_data_fn = move |data: &[f32], _: &cpal::InputCallbackInfo| {
        if !recording_flag.load(Ordering::Relaxed) {
            return;
        }
        let audio = if input_channel_count > 1 {
            data.chunks(input_channel_count)
                .map(|c| c.iter().sum::<f32>() / input_channel_count as f32)
                .collect::<Vec<f32>>()
        } else {
            data.to_vec()
        };
        if let Err(e) = captured_tx.try_send(audio) {
            tracing::warn!("Failed to buffer captured audio: {:?}", e);
        }
    };
    let input_stream = input.build_input_stream(
        &input_config,
        input_data_fn,
        move |err| tracing::error!("An error occurred on input stream: {}", err),
        None,
    )?;
    input_stream.play()?;

    // Playback side.
    let output = device::get_or_default_output(output_name)?;
    tracing::info!("Using output device: {:?}", output.name()?);
    let output_config = output
        .default_output_config()
        .context("Failed to get default output config")?;
    let output_config = StreamConfig {
        channels: output_config.channels(),
        sample_rate: output_config.sample_rate(),
        buffer_size: cpal::BufferSize::Fixed(FrameCount::from(OUTPUT_CHUNK_SIZE as u32)),
    };
    let output_channel_count = output_config.channels as usize;
    let output_sample_rate = output_config.sample_rate.0 as f64;
    tracing::debug!("Output stream config: {:?}", &output_config);

    let buffer_len = output_sample_rate as usize * OUTPUT_LATENCY_MS / 1000;
    let (playback_tx, mut playback_rx) = pcm::shared_buffer(buffer_len).split();

    // Pulls mono samples from the ring buffer, duplicating onto the first
    // two channels; silence when the buffer is empty.
    let output_data_fn = move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
        let mut sample_index = 0;
        while sample_index < data.len() {
            let sample = playback_rx.try_pop().unwrap_or(0.0);
            if sample_index < data.len() {
                data[sample_index] = sample;
                sample_index += 1;
            }
            if output_channel_count > 1 && sample_index < data.len() {
                data[sample_index] = sample;
                sample_index += 1;
            }
            sample_index += output_channel_count.saturating_sub(2);
        }
    };
    let output_stream = output.build_output_stream(
        &output_config,
        output_data_fn,
        move |err| tracing::error!("An error occurred on output stream: {}", err),
        None,
    )?;
    output_stream.play()?;

    Ok(VoiceIo {
        _input_stream: input_stream,
        _output_stream: output_stream,
        playback_tx,
        captured_rx,
        recording,
        input_sample_rate,
        output_sample_rate,
    })
}

impl VoiceIo {
    /// Decodes, resamples and plays one synthesized utterance, returning
    /// once the ring buffer has drained.
    async fn play(&mut self, utterance: &Utterance) -> Result<()> {
        let samples = pcm::decode_pcm16(&utterance.audio_base64);
        if samples.is_empty() {
            anyhow::bail!("Synthesized payload decoded to no samples");
        }

        let mut resampler = pcm::create_resampler(
            utterance.sample_rate as f64,
            self.output_sample_rate,
            OUTPUT_CHUNK_SIZE,
        )?;
        let chunk_size = resampler.input_frames_next();
        for chunk in pcm::split_for_chunks(&samples, chunk_size) {
            let resampled = resampler.process(&[chunk.as_slice()], None)?;
            if let Some(resampled) = resampled.first() {
                for &sample in resampled {
                    // Backpressure: the buffer holds about a second of audio.
                    while self.playback_tx.try_push(sample).is_err() {
                        tokio::time::sleep(Duration::from_millis(20)).await;
                    }
                }
            }
        }

        while self.playback_tx.occupied_len() > 0 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        Ok(())
    }

    fn start_recording(&mut self) {
        // Discard any stale chunks from a previous recording.
        while self.captured_rx.try_recv().is_ok() {}
        self.recording.store(true, Ordering::Relaxed);
    }

    fn stop_recording(&mut self) -> Vec<f32> {
        self.recording.store(false, Ordering::Relaxed);
        let mut captured = Vec::new();
        while let Ok(chunk) = self.captured_rx.try_recv() {
            captured.extend(chunk);
        }
        captured
    }

    /// Resamples a captured recording to the recognition rate and encodes
    /// it as the base64 PCM16 payload the transcription service expects.
    fn encode_for_recognition(&self, captured: &[f32]) -> Result<String> {
        let mut resampler = pcm::create_resampler(
            self.input_sample_rate,
            STT_SAMPLE_RATE as f64,
            INPUT_CHUNK_SIZE,
        )?;
        let mut resampled: Vec<f32> = Vec::new();
        for chunk in pcm::split_for_chunks(captured, INPUT_CHUNK_SIZE) {
            let out = resampler.process(&[chunk.as_slice()], None)?;
            if let Some(out) = out.first() {
                resampled.extend_from_slice(out);
            }
        }
        Ok(pcm::encode_pcm16(&resampled))
    }
}

async fn speak(
    voice: &mut VoiceIo,
    synthesizer: &Synthesizer,
    text: &str,
    language: &str,
) -> Result<()> {
    let utterance = synthesizer
        .synthesize(text, language)
        .await
        .context("Text-to-speech call failed")?;
    voice.play(&utterance).await
}

/// Executes the side effects the state machine emitted for the last event.
async fn drain_commands(
    command_rx: &mut tokio::sync::mpsc::Receiver<Command>,
    mut voice: Option<&mut VoiceIo>,
    synthesizer: &Synthesizer,
    language: &str,
) {
    while let Ok(command) = command_rx.try_recv() {
        match command {
            Command::SpeakText(text) => {
                println!("\nInterviewer: {text}\n");
                if let Some(voice) = voice.as_deref_mut() {
                    if let Err(e) = speak(voice, synthesizer, &text, language).await {
                        tracing::warn!("Skipping playback for this turn: {:?}", e);
                        println!("(audio playback unavailable for this turn)");
                    }
                }
            }
            Command::SessionComplete(message) => {
                println!("\n{message}\n");
            }
            Command::ReportReady(report) => {
                println!("\n=== Performance Report ===\n{report}\n");
            }
        }
    }
}

fn print_prompt(phase: Phase) {
    match phase {
        Phase::AwaitingAnswer => print!("Your answer (or /record, /restart, /quit) > "),
        Phase::Concluded => print!("/report for feedback, /restart, /quit > "),
        Phase::ReportGenerated => print!("/restart to practice again, /quit > "),
        Phase::Idle | Phase::AwaitingFirstQuestion => print!("> "),
    }
    let _ = std::io::stdout().flush();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    // Missing credentials are fatal before any session can begin.
    let config = Config::from_env().context("Failed to load application configuration")?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    let language_code = args
        .language
        .clone()
        .unwrap_or_else(|| config.language_code.clone());

    let gateway = GeminiClient::new(config.gemini_api_key.clone(), config.chat_model.clone());
    let synthesizer = Synthesizer::new(config.gemini_api_key.clone());
    let transcriber = Transcriber::new(config.gemini_api_key.clone());

    // Audio trouble never blocks the interview; it degrades to text-only.
    let mut voice = if args.text_only {
        None
    } else {
        match build_voice_io(args.input_device.clone(), args.output_device.clone()) {
            Ok(io) => Some(io),
            Err(e) => {
                tracing::warn!("Audio unavailable, continuing text-only: {:?}", e);
                println!("Audio setup failed; continuing in text-only mode.");
                None
            }
        }
    };

    let interview_config = InterviewConfig {
        role: args.role.clone(),
        persona: args.persona.into(),
        target_questions: args.questions,
    };

    println!(
        "Interview practice — role: {}, {} questions, persona: {}",
        interview_config.role, interview_config.target_questions, interview_config.persona
    );

    let (command_tx, mut command_rx) = tokio::sync::mpsc::channel::<Command>(32);
    let mut session = InterviewSession::new();

    println!("The interviewer is preparing the first question...");
    session
        .handle(
            &gateway,
            &interview_config,
            SessionEvent::Start,
            command_tx.clone(),
        )
        .await?;
    drain_commands(
        &mut command_rx,
        voice.as_mut(),
        &synthesizer,
        &language_code,
    )
    .await;

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    print_prompt(session.phase);

    while let Some(line) = lines.next_line().await? {
        let text = line.trim().to_string();
        match text.as_str() {
            "" => {}
            "/quit" | "/q" => break,
            "/restart" => {
                println!("Restarting the interview...");
                session
                    .handle(
                        &gateway,
                        &interview_config,
                        SessionEvent::Start,
                        command_tx.clone(),
                    )
                    .await?;
            }
            "/report" => {
                if session.phase == Phase::Concluded {
                    println!("Analyzing communication, technical depth, and behavior...");
                    session
                        .handle(
                            &gateway,
                            &interview_config,
                            SessionEvent::RequestReport,
                            command_tx.clone(),
                        )
                        .await?;
                } else {
                    println!("The report is available once the interview has concluded.");
                }
            }
            "/record" | "/r" => match voice.as_mut() {
                None => println!("Voice input is unavailable in text-only mode."),
                Some(io) => {
                    io.start_recording();
                    println!("Recording... press Enter to stop.");
                    lines.next_line().await?;
                    let captured = io.stop_recording();

                    // Anything shorter than a quarter second is a misfire.
                    if captured.len() < (io.input_sample_rate / 4.0) as usize {
                        println!("The recording was too short; please try again.");
                    } else {
                        match transcribe(io, &transcriber, &captured, &language_code).await
                        {
                            Ok(answer) => {
                                println!("You said: {answer}");
                                session
                                    .handle(
                                        &gateway,
                                        &interview_config,
                                        SessionEvent::Answer(answer),
                                        command_tx.clone(),
                                    )
                                    .await?;
                            }
                            Err(e) => {
                                tracing::warn!("Transcription failed: {:?}", e);
                                println!("Could not transcribe the recording; type your answer instead.");
                            }
                        }
                    }
                }
            },
            answer => {
                session
                    .handle(
                        &gateway,
                        &interview_config,
                        SessionEvent::Answer(answer.to_string()),
                        command_tx.clone(),
                    )
                    .await?;
            }
        }

        drain_commands(
            &mut command_rx,
            voice.as_mut(),
            &synthesizer,
            &language_code,
        )
        .await;
        print_prompt(session.phase);
    }

    println!("Goodbye.");
    Ok(())
}

async fn transcribe(
    io: &VoiceIo,
    transcriber: &Transcriber,
    captured: &[f32],
    language: &str,
) -> Result<String> {
    let payload = io.encode_for_recognition(captured)?;
    let answer = transcriber
        .recognize(&payload, STT_SAMPLE_RATE, language)
        .await
        .context("Speech-to-text call failed")?;
    Ok(answer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn help_renders_before_any_configuration_is_loaded() {
        // Argument parsing happens before the credential check, so --help
        // must succeed on clap's side alone.
        let err = Cli::try_parse_from(["interview", "--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn language_flag_is_optional_and_overrides_the_environment() {
        let cli = Cli::try_parse_from(["interview"]).unwrap();
        assert!(cli.language.is_none());

        let cli = Cli::try_parse_from(["interview", "--language", "de-DE"]).unwrap();
        assert_eq!(cli.language.as_deref(), Some("de-DE"));
    }

    #[test]
    fn question_count_is_bounded_at_parse_time() {
        assert!(Cli::try_parse_from(["interview", "--questions", "2"]).is_err());
        assert!(Cli::try_parse_from(["interview", "--questions", "11"]).is_err());

        let cli = Cli::try_parse_from(["interview", "--questions", "10"]).unwrap();
        assert_eq!(cli.questions, 10);
    }
}
