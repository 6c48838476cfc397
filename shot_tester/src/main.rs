use anyhow::Context;
use clap::Parser;
use futures::StreamExt;
use shot_vision::core_modules::utils::image_helper::image_helper;
use shot_vision::{
    BaselineRequest, CommandSender, DetectorConfig, DetectorEvent, DetectorHandle, Frame,
    FrameRequest, Roi, ShotGroup,
};
use std::path::{Path, PathBuf};

/// Feeds a baseline image and a sequence of frame images through the shot
/// detector and prints every shot it reports.
#[derive(Parser, Debug)]
#[command(name = "shot_tester", version)]
struct Cli {
    /// Image of the untouched target.
    #[arg(long)]
    baseline: PathBuf,

    /// Frame images, processed in the order given.
    #[arg(required = true)]
    frames: Vec<PathBuf>,

    /// JSON file with detector settings; missing fields keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Align frames to the baseline using the colored markers.
    #[arg(long)]
    stabilize: bool,

    /// Crop every image to X,Y,W,H before detection.
    #[arg(long, value_parser = parse_roi)]
    roi: Option<Roi>,

    /// Command queue capacity.
    #[arg(long, default_value_t = shot_vision::parallel_pipeline::DEFAULT_QUEUE_CAPACITY)]
    queue: usize,

    /// Print events as JSON lines instead of text.
    #[arg(long)]
    json: bool,
}

fn parse_roi(s: &str) -> Result<Roi, String> {
    let parts: Vec<u32> = s
        .split(',')
        .map(|p| p.trim().parse::<u32>().map_err(|e| format!("{p:?}: {e}")))
        .collect::<Result<_, _>>()?;
    match parts.as_slice() {
        &[x, y, width, height] if width > 0 && height > 0 => Ok(Roi { x, y, width, height }),
        _ => Err("expected X,Y,W,H with non-zero W and H".to_string()),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<DetectorConfig> {
    let Some(path) = path else {
        return Ok(DetectorConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let config: DetectorConfig = serde_json::from_str(&text)
        .with_context(|| format!("parsing {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

fn load_frame(path: &Path, roi: Option<Roi>) -> anyhow::Result<Frame> {
    let frame = image_helper::load(path).with_context(|| format!("opening {}", path.display()))?;
    match roi {
        Some(roi) => frame
            .crop(&roi)
            .with_context(|| format!("cropping {}", path.display())),
        None => Ok(frame),
    }
}

async fn feed(commands: CommandSender, cli: &Cli) -> anyhow::Result<()> {
    let baseline = load_frame(&cli.baseline, cli.roi)?;
    log::info!(
        "baseline {} ({}x{})",
        cli.baseline.display(),
        baseline.width,
        baseline.height
    );
    commands
        .set_baseline(BaselineRequest {
            frame: baseline,
            stabilize: cli.stabilize,
        })
        .await?;

    for path in &cli.frames {
        let frame = match load_frame(path, cli.roi) {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("skipping {}: {e:#}", path.display());
                continue;
            }
        };
        let mut request = FrameRequest::new(frame).with_stabilize(cli.stabilize);
        request.roi = cli.roi;
        commands.submit_frame(request).await?;
        log::debug!("queued {}", path.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    let handle = DetectorHandle::spawn(config, cli.queue)?;
    let commands = handle.commands();
    let mut events = Box::pin(handle.into_event_stream());

    // The stream ends once `feed` drops the last sender and the queue is drained.
    let producer = async move { feed(commands, &cli).await.map(|_| cli.json) };
    let consumer = async {
        let mut group = ShotGroup::new();
        let mut collected = Vec::new();
        while let Some(event) = events.next().await {
            if let DetectorEvent::Shots(batch) = &event {
                let added = group.extend(batch.shots.iter().map(|s| s.position()));
                if added < batch.shots.len() {
                    log::debug!("{} shots already in the group", batch.shots.len() - added);
                }
            }
            collected.push((event, group.len(), group.diameter()));
        }
        collected
    };
    let (json, collected) = tokio::join!(producer, consumer);
    let json = json?;

    for (event, shot_count, diameter) in &collected {
        if json {
            println!("{}", serde_json::to_string(event)?);
            continue;
        }
        match event {
            DetectorEvent::Shots(batch) => {
                for shot in &batch.shots {
                    println!(
                        "[{:>8.3}s] shot at ({:.1}, {:.1})",
                        batch.timestamp.as_secs_f64(),
                        shot.x,
                        shot.y
                    );
                }
                println!("           group: {shot_count} shots, {diameter:.1} px");
            }
            DetectorEvent::Error { message } => eprintln!("detector error: {message}"),
        }
    }

    println!("Processing complete. {} events.", collected.len());
    Ok(())
}
