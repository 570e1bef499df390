use std::collections::BTreeMap;
use std::env;
use std::sync::mpsc::Receiver;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use log::info;

use shader_backdrop::gl::{
    CallLog, FailurePoint, GlCall, HeadlessContext, HeadlessSurface, ShaderStage,
};
use shader_backdrop::host::{
    ContainerRect, HeadlessCanvas, HostController, HostState, Transcript, TranscriptEntry,
    TranscriptPort,
};
use shader_backdrop::{
    EffectKind, PipelineConfig, PropSet, SurfaceSize, UniformValue, WorkerMessage, WorkerThread,
};

const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

type PreviewPort = TranscriptPort<WorkerThread<HeadlessSurface>>;
type PreviewController = HostController<HeadlessCanvas, PreviewPort>;

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;
    let config = match &options.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    let (width, height) = options.size;
    let log = CallLog::new();
    let mut surface = HeadlessSurface::new(width, height).with_log(log.clone());
    if options.fail_compile {
        surface = surface.failing_at(FailurePoint::Compile(ShaderStage::Fragment));
    }

    let transcript = Transcript::new();
    let mut replies = None;
    let mut controller: PreviewController = HostController::mount(
        options.effect,
        &options.props,
        config.clone(),
        HeadlessCanvas::new(surface),
        || {
            let (worker, inbox) =
                WorkerThread::spawn::<HeadlessContext>(options.effect, config.clone())?;
            replies = Some(inbox);
            Ok(TranscriptPort::new(worker, transcript.clone()))
        },
    );
    let replies = replies.ok_or_else(|| anyhow!("render worker was not started"))?;
    controller.resize(ContainerRect::new(0.0, 0.0, width as f32, height as f32), 1.0);

    println!("effect: {}", options.effect);
    let outcome = drive(&mut controller, &replies, &log, &options);
    for err in controller.unmount() {
        eprintln!("warning: {err}");
    }
    if options.transcript {
        print_transcript(&transcript)?;
    }
    outcome?;
    print_uniforms(&log);
    Ok(())
}

fn drive(
    controller: &mut PreviewController,
    replies: &Receiver<WorkerMessage>,
    log: &CallLog,
    options: &CliOptions,
) -> Result<()> {
    let reply = replies
        .recv_timeout(REPLY_TIMEOUT)
        .context("render worker did not answer init")?;
    let failure = match &reply {
        WorkerMessage::Error { message } => Some(message.clone()),
        WorkerMessage::Ready => None,
    };
    controller.handle_worker_message(reply);
    if let Some(message) = failure {
        println!("ready: no");
        bail!("render worker never became ready: {message}");
    }
    if controller.state() != HostState::Ready {
        bail!("host ended in state {:?}", controller.state());
    }
    println!("ready: yes");

    wait_for_draws(log, options.frames)?;
    if let Some(update) = &options.update {
        controller.set_props(update);
        let drawn = log.draw_count();
        wait_for_draws(log, drawn + options.frames)?;
    }
    let size = log
        .snapshot()
        .iter()
        .rev()
        .find_map(|call| match call {
            GlCall::ResizeSurface(size) => Some(*size),
            _ => None,
        })
        .unwrap_or_else(|| SurfaceSize::new(options.size.0, options.size.1));
    println!("surface: {}x{}", size.width, size.height);
    println!("frames drawn: {}", log.draw_count());
    info!("preview finished after {} draw call(s)", log.draw_count());
    Ok(())
}

fn wait_for_draws(log: &CallLog, count: usize) -> Result<()> {
    let deadline = Instant::now() + REPLY_TIMEOUT;
    while log.draw_count() < count {
        if Instant::now() >= deadline {
            bail!("render worker drew {} of {count} frame(s)", log.draw_count());
        }
        thread::sleep(Duration::from_millis(2));
    }
    Ok(())
}

fn print_uniforms(log: &CallLog) {
    let mut latest: BTreeMap<String, UniformValue> = BTreeMap::new();
    for call in log.snapshot() {
        if let GlCall::SetUniform { name, value } = call {
            latest.insert(name, value);
        }
    }
    println!("uniforms:");
    for (name, value) in &latest {
        println!(" - {name} = {value}");
    }
}

fn print_transcript(transcript: &Transcript) -> Result<()> {
    println!("transcript:");
    for entry in transcript.entries() {
        match entry {
            TranscriptEntry::Posted(message) => println!(" -> {}", message.to_json()?),
            TranscriptEntry::Terminated => println!(" -> (terminate)"),
        }
    }
    Ok(())
}

struct CliOptions {
    effect: EffectKind,
    frames: usize,
    size: (u32, u32),
    props: PropSet,
    update: Option<PropSet>,
    config: Option<String>,
    fail_compile: bool,
    transcript: bool,
}

impl CliOptions {
    fn parse() -> Result<Self> {
        let mut args = env::args().skip(1);
        let Some(effect) = args.next() else {
            return Err(anyhow!(
                "Usage: shader-backdrop <effect> [--frames N] [--size WxH] [--props JSON] \
                 [--update JSON] [--config PATH] [--fail-compile] [--transcript]"
            ));
        };
        let mut options = Self {
            effect: effect.parse()?,
            frames: 3,
            size: (640, 360),
            props: PropSet::new(),
            update: None,
            config: None,
            fail_compile: false,
            transcript: false,
        };
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--frames" => {
                    let value = value_of(&mut args, "--frames")?;
                    options.frames = value
                        .parse()
                        .with_context(|| format!("invalid frame count `{value}`"))?;
                }
                "--size" => options.size = parse_size(&value_of(&mut args, "--size")?)?,
                "--props" => {
                    options.props = PropSet::from_json_str(&value_of(&mut args, "--props")?)?;
                }
                "--update" => {
                    options.update = Some(PropSet::from_json_str(&value_of(&mut args, "--update")?)?);
                }
                "--config" => options.config = Some(value_of(&mut args, "--config")?),
                "--fail-compile" => options.fail_compile = true,
                "--transcript" => options.transcript = true,
                other => {
                    return Err(anyhow!(
                        "Unknown argument: {other}. Expected --frames, --size, --props, \
                         --update, --config, --fail-compile or --transcript"
                    ));
                }
            }
        }
        Ok(options)
    }
}

fn value_of(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    args.next()
        .ok_or_else(|| anyhow!("{flag} expects a value"))
}

fn parse_size(value: &str) -> Result<(u32, u32)> {
    let (width, height) = value
        .split_once('x')
        .ok_or_else(|| anyhow!("invalid size `{value}`, expected WxH"))?;
    let width: u32 = width
        .parse()
        .with_context(|| format!("invalid width in `{value}`"))?;
    let height: u32 = height
        .parse()
        .with_context(|| format!("invalid height in `{value}`"))?;
    Ok((width.max(1), height.max(1)))
}
