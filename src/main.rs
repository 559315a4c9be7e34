use std::{
    path::PathBuf,
    process::ExitCode,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use clap::Parser;
use log::{error, info, warn};
use obs_camera_asi::{
    list_cameras, AbortHandle, AsiCamera, AsiCoolCamera, AsiDriver, AsiSdk, BinningControl,
    Camera, CameraClass, CameraModule, Cooling, CoolingHandle, Error, ImageFormat,
    ImageFormatControl, ImageType, ModuleConfig, Window, WindowControl,
};

#[derive(Parser, Debug)]
#[command(version, about = "Take exposures with a ZWO ASI camera", long_about = None)]
struct Args {
    /// Module configuration (YAML)
    config: PathBuf,
    /// Exposure time in seconds
    #[arg(short, long, default_value_t = 1.0)]
    exptime: f64,
    /// Number of exposures
    #[arg(short = 'n', long, default_value_t = 1)]
    count: u32,
    /// Image type (object, bias, dark, flat, skyflat, acquisition, focus)
    #[arg(short = 't', long, default_value = "object")]
    image_type: ImageType,
    /// Readout window in unbinned pixels: LEFT,TOP,WIDTH,HEIGHT
    #[arg(short, long)]
    window: Option<Window>,
    /// Symmetric binning factor
    #[arg(short, long)]
    binning: Option<u32>,
    /// Image format (int8, int16, rgb24)
    #[arg(short, long)]
    format: Option<ImageFormat>,
    /// List connected cameras and exit
    #[arg(long)]
    list: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Error> {
    let config = ModuleConfig::from_path(&args.config)?;
    let sdk: Arc<dyn AsiDriver> = Arc::new(AsiSdk::load(&config.sdk)?);

    if args.list {
        for name in list_cameras(sdk.as_ref()) {
            println!("{name}");
        }
        return Ok(());
    }

    let done = Arc::new(AtomicBool::new(false));
    match config.class {
        CameraClass::AsiCamera => {
            let camera = AsiCamera::open(sdk, &config.camera)?;
            let module = CameraModule::new(camera, config)?;
            capture(module, &args, done)
        }
        CameraClass::AsiCoolCamera => {
            let camera = AsiCoolCamera::open(sdk, &config.camera, config.setpoint)?;
            let cooling = camera.cooling_handle();
            let module = CameraModule::new(camera, config)?;
            let housekeeping = {
                let done = done.clone();
                thread::spawn(move || housekeeping(cooling, done))
            };
            let res = capture(module, &args, done.clone());
            done.store(true, Ordering::SeqCst);
            if housekeeping.join().is_err() {
                warn!("Housekeeping thread panicked.");
            }
            res
        }
    }
}

fn housekeeping(cooling: CoolingHandle, done: Arc<AtomicBool>) {
    while !done.load(Ordering::SeqCst) {
        match (cooling.get_temperatures(), cooling.get_cooling_status()) {
            (Ok(temps), Ok(status)) => {
                let temp = temps.get("CCD").copied().unwrap_or(f64::NAN);
                info!(
                    "Temperature: {temp:.1} °C, setpoint: {:.0} °C, cooler power: {:.0} %",
                    status.setpoint, status.power
                );
            }
            (Err(err), _) | (_, Err(err)) => warn!("Could not read cooling status: {err}"),
        }
        for _ in 0..10 {
            if done.load(Ordering::SeqCst) {
                return;
            }
            thread::sleep(Duration::from_millis(100));
        }
    }
}

fn capture<C>(mut module: CameraModule<C>, args: &Args, done: Arc<AtomicBool>) -> Result<(), Error>
where
    C: Camera + WindowControl + BinningControl + ImageFormatControl,
{
    let camera = module.camera_mut();
    if let Some(format) = args.format {
        camera.set_image_format(format)?;
    }
    if let Some(bin) = args.binning {
        camera.set_binning(bin, bin)?;
    }
    if let Some(window) = args.window {
        camera.set_window(window)?;
    }

    let abort: AbortHandle = module.abort_handle();
    {
        let done = done.clone();
        if let Err(err) = ctrlc::set_handler(move || {
            done.store(true, Ordering::SeqCst);
            abort.abort();
        }) {
            warn!("Could not install Ctrl+C handler: {err}");
        }
    }

    let exptime = Duration::try_from_secs_f64(args.exptime)
        .map_err(|err| Error::InvalidValue(format!("exposure time {}: {err}", args.exptime)))?;

    'main_loop: for idx in 0..args.count {
        if done.load(Ordering::SeqCst) {
            break 'main_loop;
        }
        info!(
            "Exposure {}/{}: {} s {}",
            idx + 1,
            args.count,
            exptime.as_secs_f64(),
            args.image_type
        );
        match module.expose(exptime, args.image_type) {
            Ok(_) => {}
            Err(Error::Aborted) => {
                info!("Exposure aborted.");
                break 'main_loop;
            }
            Err(err @ (Error::CameraClosed | Error::CameraRemoved | Error::InvalidId(_))) => {
                return Err(err);
            }
            Err(err) => {
                error!("Exposure failed: {err}");
                continue 'main_loop;
            }
        }
    }
    info!("Exiting");
    Ok(())
}
