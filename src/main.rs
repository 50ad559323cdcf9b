use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use dub_editor::api::client::{download_file_name, BackendClient};
use dub_editor::api::types::ProcessedVideo;
use dub_editor::core::config::AppConfig;
use dub_editor::core::media::{MediaFile, MediaKind};
use dub_editor::core::subtitle::{format_clock, Subtitle};
use dub_editor::playback::controller::PlaybackController;
use dub_editor::playback::element::{SimulatedElement, SimulatedOpener};
use dub_editor::preview::ffmpeg::FfmpegTools;
use dub_editor::preview::thumbnail::{extract_thumbnails, write_thumbnails, FfmpegFrameSource, ThumbnailOptions};
use dub_editor::preview::waveform::render_to_png;
use dub_editor::session::EditorSession;

#[derive(Parser)]
#[command(about = "Edit dubbed subtitles and drive the rendering backend")]
struct Cli {
    #[arg(long, value_name = "URL", help = "Backend base URL. Overrides the configured one.")]
    backend: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a video for transcription and dubbing
    Process {
        video: PathBuf,
        #[arg(short, long, default_value = "")]
        prompt: String,
    },
    /// Show the source URL and transcripts of a processed video
    Detail { video_id: String },
    /// Validate edited transcripts and send them for re-rendering
    Save {
        video_id: String,
        #[arg(short, long, value_name = "FILE", help = "JSON array of subtitles")]
        transcripts: PathBuf,
        #[arg(long, value_name = "ID")]
        voice: Option<String>,
    },
    /// Download the rendered video
    Download {
        video_id: String,
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// List available text-to-speech voices
    Voices,
    /// Download one synthesized speech clip
    FetchAudio {
        audio_id: String,
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Render a waveform bitmap
    Waveform {
        media: PathBuf,
        #[arg(short, long, value_name = "PNG")]
        output: PathBuf,
        #[arg(long)]
        width: Option<u32>,
        #[arg(long)]
        height: Option<u32>,
    },
    /// Extract evenly spaced thumbnails
    Thumbnails {
        video: PathBuf,
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,
        #[arg(short, long)]
        count: Option<usize>,
    },
    /// Run the playback controller against simulated media and print its state
    Simulate {
        video_seconds: f64,
        #[arg(long)]
        audio_seconds: Option<f64>,
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        offset: f64,
        #[arg(long, allow_hyphen_values = true)]
        seek: Vec<f64>,
        #[arg(long, help = "Play for this many seconds after the last seek")]
        play: Option<f64>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::init();

    if let Err(err) = run().await {
        eprintln!("An error occurred: {}", err);
        for cause in err.chain().skip(1) {
            eprintln!("    {}", cause);
        }
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load()?;
    if let Some(backend) = cli.backend {
        config.backend_url = backend;
    }
    let client = BackendClient::new(config.backend_base());
    let tools = FfmpegTools::from_config(&config);

    match cli.command {
        Command::Process { video, prompt } => {
            let file = MediaFile::from_path(&video)
                .filter(|f| f.kind == MediaKind::Video)
                .with_context(|| format!("{} is not a supported video file", video.display()))?;
            let processed = client.process_video(&file, &prompt).await?;
            println!("video id: {}", processed.video_id);
            print_subtitles(&processed.subtitles);
        }
        Command::Detail { video_id } => {
            let detail = client.video_detail(&video_id).await?;
            println!("video url: {}", detail.video_url.as_deref().unwrap_or("-"));
            print_subtitles(&detail.transcripts);
        }
        Command::Save { video_id, transcripts, voice } => {
            let content = std::fs::read_to_string(&transcripts)
                .with_context(|| format!("Failed to read {}", transcripts.display()))?;
            let subtitles: Vec<Subtitle> = serde_json::from_str(&content)
                .with_context(|| format!("{} is not a subtitle list", transcripts.display()))?;

            // Saving never opens media
            let opener = SimulatedOpener::new(|_: &std::path::Path| None);
            let mut session = EditorSession::new(config.clone(), Box::new(opener));
            session.load_processed(ProcessedVideo { video_id, subtitles });
            if let Some(voice) = voice {
                session.voice_id = voice;
            }
            let record = session.save(&client).await?;
            println!(
                "saved {} transcripts for {} at {}",
                record.transcript_count,
                record.video_id,
                record.saved_at.to_rfc3339()
            );
            println!("rendered video: {}", client.rendered_video_url(&record.video_id));
        }
        Command::Download { video_id, output } => {
            let output = output.unwrap_or_else(|| PathBuf::from(download_file_name(&video_id)));
            let written = client.download_video(&video_id, &output).await?;
            println!("wrote {} bytes to {}", written, output.display());
        }
        Command::Voices => {
            for model in client.tts_models().await? {
                println!("{}\t{}", model.id, model.name);
            }
        }
        Command::FetchAudio { audio_id, output } => {
            let output = output.unwrap_or_else(|| PathBuf::from(format!("{}.wav", audio_id)));
            let bytes = client.fetch_audio(&audio_id).await?;
            std::fs::write(&output, &bytes).with_context(|| format!("Failed to write {}", output.display()))?;
            println!("wrote {} bytes to {}", bytes.len(), output.display());
        }
        Command::Waveform { media, output, width, height } => {
            let preview = &config.preview;
            let envelope = render_to_png(
                &media,
                &output,
                width.unwrap_or(preview.waveform_width),
                height.unwrap_or(preview.waveform_height),
                preview.waveform_fill,
                preview.waveform_background,
                &tools,
            )?;
            println!("wrote {} columns to {}", envelope.columns.len(), output.display());
        }
        Command::Thumbnails { video, output, count } => {
            let mut options = ThumbnailOptions::from(&config.preview);
            if let Some(count) = count {
                options.count = count;
            }
            let mut source = FfmpegFrameSource::open(&video, tools.clone())?;
            let thumbnails = extract_thumbnails(&mut source, options)?;
            for (path, thumbnail) in write_thumbnails(&thumbnails, &output)?.iter().zip(&thumbnails) {
                println!("{}\t{}", format_clock(thumbnail.time), path.display());
            }
        }
        Command::Simulate { video_seconds, audio_seconds, offset, seek, play } => {
            simulate(&config, video_seconds, audio_seconds, offset, &seek, play)?;
        }
    }
    Ok(())
}

fn print_subtitles(subtitles: &[Subtitle]) {
    for subtitle in subtitles {
        let clip = match (&subtitle.audio_id, subtitle.audio_length) {
            (Some(id), Some(length)) => format!("  [{} {:.2}s]", id, length),
            _ => String::new(),
        };
        println!("{} - {}  {}{}", subtitle.start, subtitle.end, subtitle.text, clip);
    }
}

fn simulate(config: &AppConfig, video_seconds: f64, audio_seconds: Option<f64>, offset: f64, seeks: &[f64], play: Option<f64>) -> Result<()> {
    anyhow::ensure!(
        video_seconds.is_finite() && video_seconds > 0.0,
        "video length must be a positive number of seconds"
    );
    if let Some(audio_seconds) = audio_seconds {
        anyhow::ensure!(
            audio_seconds.is_finite() && audio_seconds > 0.0,
            "audio length must be a positive number of seconds"
        );
    }

    let mut controller = PlaybackController::new(config.playback.clone());
    controller.attach_video(Box::new(SimulatedElement::new(video_seconds)));
    if let Some(audio_seconds) = audio_seconds {
        controller.attach_audio(Box::new(SimulatedElement::new(audio_seconds)));
    }
    controller.set_audio_offset(offset);

    for &target in seeks {
        let position = controller.seek(target);
        report(&controller, &format!("seek {}", target));
        log::debug!("Seek {} landed at {}", target, position);
    }

    if let Some(seconds) = play {
        anyhow::ensure!(seconds.is_finite() && seconds >= 0.0, "play duration must be a non-negative number");
        controller.set_playing(true);
        let interval = controller.progress_interval();
        let mut remaining = Duration::from_secs_f64(seconds);
        while !remaining.is_zero() && controller.state().playing {
            let step = interval.min(remaining);
            controller.advance(step);
            remaining -= step;
        }
        report(&controller, &format!("play {}", seconds));
    }

    println!("{}", serde_json::to_string_pretty(controller.state())?);
    Ok(())
}

fn report(controller: &PlaybackController, label: &str) {
    let state = controller.state();
    let audio = controller
        .audio()
        .map(|audio| {
            let element = audio.element();
            let status = if element.is_paused() { "paused" } else { "playing" };
            format!("audio {} ({})", format_clock(element.current_time()), status)
        })
        .unwrap_or_else(|| "no audio".to_string());
    println!(
        "{:<12} position {} / {}  {}  {}",
        label,
        format_clock(state.position),
        format_clock(state.duration),
        if state.playing { "playing" } else { "paused" },
        audio
    );
}
