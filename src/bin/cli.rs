use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use webcam_capture::platform::{native_controller, NativeController};
use webcam_capture::{CaptureConfig, DirectorySaver, FacingMode};

const USAGE: &str = "Usage: webcam-capture-cli <command> [args]

Commands:
  list-devices [--json]
  snapshot <out.jpg> [--device <id>] [--facing front|back]
  record <seconds> [--device <id>] [--facing front|back] [--out-dir <dir>]";

fn main() -> Result<()> {
    webcam_capture::init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("{}", USAGE);
        std::process::exit(1);
    }

    let config = CaptureConfig::load_with_env(CaptureConfig::default_path())?;

    match args[1].as_str() {
        "list-devices" => cmd_list_devices(&args, config),
        "snapshot" => cmd_snapshot(&args, config),
        "record" => cmd_record(&args, config),
        other => {
            eprintln!("Unknown command: {}\n\n{}", other, USAGE);
            std::process::exit(1);
        }
    }
}

/// Options shared by the capture commands
struct CaptureArgs {
    positional: Option<String>,
    device: Option<String>,
    facing: Option<FacingMode>,
    out_dir: Option<String>,
    json: bool,
}

fn parse_args(args: &[String]) -> Result<CaptureArgs> {
    let mut parsed = CaptureArgs {
        positional: None,
        device: None,
        facing: None,
        out_dir: None,
        json: false,
    };

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--device" => {
                i += 1;
                parsed.device = Some(args.get(i).context("--device needs a value")?.clone());
            }
            "--facing" => {
                i += 1;
                let value = args.get(i).context("--facing needs a value")?;
                parsed.facing = Some(value.parse().map_err(|e: String| anyhow!(e))?);
            }
            "--out-dir" => {
                i += 1;
                parsed.out_dir = Some(args.get(i).context("--out-dir needs a value")?.clone());
            }
            "--json" => parsed.json = true,
            other => {
                if parsed.positional.is_none() {
                    parsed.positional = Some(other.to_string());
                }
            }
        }
        i += 1;
    }

    Ok(parsed)
}

fn prepare(config: CaptureConfig, args: &CaptureArgs) -> NativeController {
    let mut controller = native_controller(config);
    controller.enumerate_devices();

    if let Some(facing) = args.facing {
        if controller.session().facing_mode != facing {
            controller.toggle_facing();
        }
    }
    if let Some(device) = &args.device {
        controller.select_device(device.clone());
    }
    controller
}

fn cmd_list_devices(args: &[String], config: CaptureConfig) -> Result<()> {
    let parsed = parse_args(args)?;
    let mut controller = native_controller(config);
    controller.enumerate_devices();
    let devices = controller.snapshot().devices;

    if parsed.json {
        println!("{}", serde_json::to_string(&devices)?);
    } else if devices.is_empty() {
        println!("No cameras found");
    } else {
        for d in devices {
            println!("{}: {}", d.id, d.label);
        }
    }
    Ok(())
}

fn cmd_snapshot(args: &[String], config: CaptureConfig) -> Result<()> {
    let parsed = parse_args(args)?;
    let out = parsed.positional.clone().context("output path required")?;

    let mut controller = prepare(config, &parsed);
    controller.bind_stream()?;

    let still = controller
        .capture_still()?
        .context("no frame captured")?
        .clone();
    std::fs::write(&out, &still.data).with_context(|| format!("writing {}", out))?;
    println!("Saved {}x{} still to {}", still.width, still.height, out);

    controller.release_stream()?;
    Ok(())
}

fn cmd_record(args: &[String], config: CaptureConfig) -> Result<()> {
    let parsed = parse_args(args)?;
    let seconds: f64 = parsed
        .positional
        .as_deref()
        .context("duration in seconds required")?
        .parse()
        .context("duration must be a number")?;
    if !seconds.is_finite() || seconds <= 0.0 {
        bail!("duration must be positive");
    }

    let out_dir = parsed
        .out_dir
        .clone()
        .unwrap_or_else(|| config.storage.output_directory.clone());
    let saver = DirectorySaver::new(out_dir);

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = interrupted.clone();
        ctrlc::set_handler(move || interrupted.store(true, Ordering::SeqCst))?;
    }

    let mut controller = prepare(config, &parsed);
    controller.bind_stream()?;
    let recording_id = controller.start_recording()?;
    println!("Recording {} for {:.1}s (Ctrl-C to stop early)", recording_id, seconds);

    let deadline = Instant::now() + Duration::from_secs_f64(seconds);
    while Instant::now() < deadline && !interrupted.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(50));
        controller.dispatch_pending_events();
        if !controller.is_recording() {
            bail!("recording ended unexpectedly");
        }
    }

    controller.stop_recording()?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    let saved = runtime.block_on(controller.download_recording(&saver))?;
    controller.release_stream()?;

    match saved {
        Some(path) => println!("Saved recording to {}", path.display()),
        None => println!("Nothing was recorded"),
    }
    Ok(())
}
