use anyhow::{Context, Result, bail};
use avsync_player::config::{app_name, version};
use avsync_player::engine::sim::{
    self, CountingRenderer, SimulatedAudioEngine, SimulatedVideoEngine, VideoProfile,
};
use avsync_player::utils::sos::SignalOfStop;
use avsync_player::{DecodeType, Player, PlayerConfig, PlayerEvent, PlayerListener, SurfaceHandle};
use clap::{Arg, ArgAction, ArgMatches, Command};
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use std::{panic, process};

/// Prints every notification and flags the end of the session.
struct ConsoleListener {
    json: bool,
    finished: SignalOfStop,
}

impl ConsoleListener {
    fn print(&self, event: PlayerEvent) {
        if self.json {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!("failed to serialize {:?}: {}", event, e),
            }
        } else {
            println!("{:?}", event);
        }
    }
}

impl PlayerListener for ConsoleListener {
    fn on_prepared(&self, duration_ms: i64) {
        self.print(PlayerEvent::Prepared { duration_ms });
    }

    fn on_completion(&self) {
        self.print(PlayerEvent::Completion);
        self.finished.cancel();
    }

    fn on_error(&self, code: i32, extra: i32) {
        self.print(PlayerEvent::Error { code, extra });
        self.finished.cancel();
    }

    fn on_progress(&self, position_ms: i64) {
        self.print(PlayerEvent::Progress { position_ms });
    }

    fn on_end_resume(&self) {
        self.print(PlayerEvent::EndResume);
    }
}

fn cli() -> Command {
    Command::new(app_name())
        .version(version())
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .arg(
            Arg::new("source")
                .value_name("SOURCE")
                .help("Media source handed to the engines")
                .default_value("sim://demo"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("JSON player configuration"),
        )
        .arg(
            Arg::new("duration")
                .short('d')
                .long("duration-ms")
                .value_name("MS")
                .help("Length of the simulated media")
                .value_parser(clap::value_parser!(i64))
                .default_value("3000"),
        )
        .arg(
            Arg::new("fps")
                .long("fps")
                .value_parser(clap::value_parser!(u32))
                .default_value("30"),
        )
        .arg(
            Arg::new("size")
                .long("size")
                .value_name("WxH")
                .help("Simulated video size")
                .default_value("320x180"),
        )
        .arg(
            Arg::new("hardware")
                .long("hardware")
                .help("Decode straight to the output surface")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("buffering-every")
                .long("buffering-every")
                .value_name("N")
                .help("Report buffering once every N frames")
                .value_parser(clap::value_parser!(u64))
                .default_value("0"),
        )
        .arg(
            Arg::new("seek")
                .long("seek")
                .value_name("MS")
                .help("Seek once playback has started")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("preview")
                .long("preview")
                .value_name("MS,MS,...")
                .help("Scrub through these positions, then resume at the last one")
                .value_delimiter(',')
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print notifications as JSON lines")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("More logging (-v debug, -vv trace)")
                .action(ArgAction::Count),
        )
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn parse_size(raw: &str) -> Result<(u32, u32)> {
    let Some((w, h)) = raw.split_once(['x', 'X']) else {
        bail!("expected WxH, got {}", raw);
    };
    let width = w.trim().parse().with_context(|| format!("invalid width in {}", raw))?;
    let height = h.trim().parse().with_context(|| format!("invalid height in {}", raw))?;
    Ok((width, height))
}

fn video_profile(matches: &ArgMatches) -> Result<VideoProfile> {
    let (width, height) = parse_size(matches.get_one::<String>("size").map_or("320x180", String::as_str))?;
    Ok(VideoProfile {
        width,
        height,
        fps: matches.get_one::<u32>("fps").copied().unwrap_or(30),
        duration_ms: matches.get_one::<i64>("duration").copied().unwrap_or(3_000),
        decode_type: if matches.get_flag("hardware") {
            DecodeType::Hardware
        } else {
            DecodeType::Software
        },
        buffering_every: matches.get_one::<u64>("buffering-every").copied().unwrap_or(0),
    })
}

/// Scripted interaction: optional seek, optional scrub, then wait for completion.
fn run_session(player: &mut Player, matches: &ArgMatches, finished: &SignalOfStop, limit: Duration) {
    player.play();

    if let Some(&target) = matches.get_one::<i64>("seek") {
        if finished.wait_timeout(Duration::from_millis(300)) {
            return;
        }
        info!("seeking to {} ms", target);
        player.seek_to(target);
    }

    let preview: Vec<i64> = matches
        .get_many::<i64>("preview")
        .map(|values| values.copied().collect())
        .unwrap_or_default();
    if let Some(&last) = preview.last() {
        if finished.wait_timeout(Duration::from_millis(300)) {
            return;
        }
        player.begin_seek_preview();
        for target in &preview {
            player.update_seek_preview(*target);
            if finished.wait_timeout(Duration::from_millis(100)) {
                return;
            }
        }
        player.end_seek_preview(last, true);
    }

    if !finished.wait_timeout(limit) {
        warn!("session did not finish within {:?}", limit);
    }
}

fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_logging(matches.get_count("verbose"));

    // kill the process as soon as a secondary thread panics
    let orig_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        orig_hook(panic_info);
        process::exit(105);
    }));

    let config = match matches.get_one::<String>("config") {
        Some(path) => PlayerConfig::from_file(path)?,
        None => PlayerConfig::default(),
    };
    let profile = video_profile(&matches)?;
    let source = matches
        .get_one::<String>("source")
        .cloned()
        .unwrap_or_default();

    // stop the session cleanly on SIGINT, SIGTERM, or SIGHUP
    let finished = SignalOfStop::new();
    let on_signal = finished.clone();
    ctrlc::set_handler(move || on_signal.cancel()).context("failed to set Ctrl-C handler")?;

    sim::init();
    let audio = Arc::new(SimulatedAudioEngine::new(profile.duration_ms));
    let video = Arc::new(SimulatedVideoEngine::new(profile));
    let renderer = Arc::new(CountingRenderer::new());

    info!("{} {} playing {}", app_name(), version(), source);
    let mut player = Player::new(audio, video, renderer.clone(), config);
    player.set_listener(Box::new(ConsoleListener {
        json: matches.get_flag("json"),
        finished: finished.clone(),
    }))?;
    player.set_surface(Some(SurfaceHandle(1)));
    player.prepare(&source).context("failed to prepare source")?;

    let limit = Duration::from_millis(profile.duration_ms.max(0) as u64) + Duration::from_secs(5);
    run_session(&mut player, &matches, &finished, limit);

    let stats = player.stats();
    player.release();
    info!(
        "{} frames presented, {}",
        renderer.frames_presented(),
        stats
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("640x360").unwrap(), (640, 360));
        assert_eq!(parse_size("2X2").unwrap(), (2, 2));
        assert!(parse_size("640").is_err());
        assert!(parse_size("ax2").is_err());
    }

    #[test]
    fn test_cli_defaults() {
        let matches = cli().get_matches_from(["avsync-player"]);
        let profile = video_profile(&matches).unwrap();
        assert_eq!((profile.width, profile.height), (320, 180));
        assert_eq!(profile.fps, 30);
        assert_eq!(profile.decode_type, DecodeType::Software);
        assert_eq!(
            matches.get_one::<String>("source").map(String::as_str),
            Some("sim://demo")
        );
    }

    #[test]
    fn test_cli_preview_list() {
        let matches = cli().get_matches_from([
            "avsync-player",
            "--preview",
            "100,200,300",
            "--hardware",
            "-vv",
        ]);
        let preview: Vec<i64> = matches.get_many::<i64>("preview").unwrap().copied().collect();
        assert_eq!(preview, vec![100, 200, 300]);
        assert_eq!(matches.get_count("verbose"), 2);
        assert_eq!(video_profile(&matches).unwrap().decode_type, DecodeType::Hardware);
    }
}
