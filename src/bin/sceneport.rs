use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use sceneport::{
    AnimationMode, ExportFormat, ExportOutcome, ExportTarget, Extension, FileTarget, HostHandles,
    LiveTarget, MemoryScene, RecordingEngine, RenderSettings, SimOptions, SimRuntime,
};

#[derive(Parser, Debug)]
#[command(name = "sceneport", version)]
struct Cli {
    /// Log at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export a scene to vrscene files.
    Export(ExportArgs),
    /// Render a scene with the simulated renderer and save the combined pass as a PNG.
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Input scene JSON.
    #[arg(long)]
    scene: PathBuf,

    /// Render settings JSON (defaults apply when omitted).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Output vrscene path; overrides the settings' target.
    #[arg(long)]
    out: Option<PathBuf>,

    /// List encoding when `--out` is given.
    #[arg(long, value_enum, default_value_t = FormatChoice::Plain)]
    format: FormatChoice,

    /// Split plugins into per-category files when `--out` is given.
    #[arg(long)]
    split: bool,

    /// Override the settings' animation mode.
    #[arg(long, value_enum)]
    animation: Option<AnimationChoice>,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input scene JSON.
    #[arg(long)]
    scene: PathBuf,

    /// Render settings JSON (the target is always a live renderer).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Progressive refinement steps per frame.
    #[arg(long, default_value_t = 4)]
    steps: u32,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatChoice {
    Plain,
    Hex,
    Zip,
}

impl From<FormatChoice> for ExportFormat {
    fn from(c: FormatChoice) -> Self {
        match c {
            FormatChoice::Plain => ExportFormat::Plain,
            FormatChoice::Hex => ExportFormat::Hex,
            FormatChoice::Zip => ExportFormat::Zip,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AnimationChoice {
    Off,
    Timeline,
    CameraLoop,
}

impl From<AnimationChoice> for AnimationMode {
    fn from(c: AnimationChoice) -> Self {
        match c {
            AnimationChoice::Off => AnimationMode::Off,
            AnimationChoice::Timeline => AnimationMode::Timeline,
            AnimationChoice::CameraLoop => AnimationMode::CameraLoop,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Command::Export(args) => cmd_export(args),
        Command::Render(args) => cmd_render(args),
    }
}

fn read_inputs(
    scene: &Path,
    settings: Option<&Path>,
) -> anyhow::Result<(MemoryScene, RenderSettings)> {
    let scene = MemoryScene::from_path(scene)
        .with_context(|| format!("load scene '{}'", scene.display()))?;
    let settings = match settings {
        Some(p) => RenderSettings::from_path(p)
            .with_context(|| format!("load settings '{}'", p.display()))?,
        None => RenderSettings::default(),
    };
    Ok((scene, settings))
}

fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let (scene, mut settings) = read_inputs(&args.scene, args.settings.as_deref())?;
    if let Some(out) = &args.out {
        settings.target = ExportTarget::File(FileTarget {
            path: out.clone(),
            format: args.format.into(),
            split: args.split,
        });
    }
    if let Some(mode) = args.animation {
        settings.animation.mode = mode.into();
    }
    let target = settings
        .file_target()
        .map(|f| f.path.clone())
        .context("no file target: pass --out or set target.file in the settings")?;

    let engine = Arc::new(RecordingEngine::new());
    let mut ext = Extension::new();
    let id = ext.init(HostHandles {
        engine: Some(engine.clone()),
        scene: Some(Arc::new(scene)),
        settings: Some(settings),
        ..HostHandles::default()
    })?;
    let outcome = ext.export(id)?;
    ext.free(id);

    finish(&outcome)?;
    eprintln!("wrote {}", target.display());
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let (scene, mut settings) = read_inputs(&args.scene, args.settings.as_deref())?;
    settings.target = ExportTarget::Live(LiveTarget {
        show_frame_buffer: false,
        interactive: false,
    });

    let engine = Arc::new(RecordingEngine::new());
    let mut ext = Extension::new();
    ext.load(Box::new(SimRuntime::new(SimOptions {
        steps: args.steps.max(1),
        ..SimOptions::default()
    })));
    let id = ext.init(HostHandles {
        engine: Some(engine.clone()),
        scene: Some(Arc::new(scene)),
        settings: Some(settings),
        ..HostHandles::default()
    })?;
    let outcome = ext.export(id)?;
    ext.unload();

    finish(&outcome)?;
    let log = engine.log();
    let image = log
        .results_ended
        .iter()
        .rev()
        .find(|(_, cancel)| !cancel)
        .and_then(|(result, _)| result.combined())
        .context("renderer produced no combined pass")?;
    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image
        .save_png(&args.out)
        .with_context(|| format!("write png '{}'", args.out.display()))?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn finish(outcome: &ExportOutcome) -> anyhow::Result<()> {
    match outcome {
        ExportOutcome::Completed { frames } => {
            tracing::info!(frames, "export completed");
            Ok(())
        }
        ExportOutcome::Interrupted {
            frames_done,
            frames_total,
        } => anyhow::bail!("interrupted after {frames_done} of {frames_total} frames"),
        ExportOutcome::Aborted {
            frames_done,
            reason,
        } => anyhow::bail!("aborted after {frames_done} frames: {reason}"),
    }
}
