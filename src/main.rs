use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use anvil_convert::catalog::{BiomeCatalog, BlockCatalog};
use anvil_convert::chunk::VoidGenerator;
use anvil_convert::config::Args;
use anvil_convert::convert::{ConversionState, ShutdownHandle, WorldConverter};
use anvil_convert::world::World;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let blocks = BlockCatalog::from_path(&args.blocks)?;
    let biomes = match &args.biomes {
        Some(path) => BiomeCatalog::from_path(path)?,
        None => BiomeCatalog::builtin()?,
    };
    log::info!("Block catalog: {} blocks", blocks.len());

    let dims = args.dimensions()?;
    let storage = args.open_storage()?;
    let world = Arc::new(World::new(
        storage,
        dims,
        Arc::new(VoidGenerator::new(biomes.default_biome())),
    ));

    let converter = WorldConverter::new(Arc::new(blocks), Arc::new(biomes), args.converter_config());

    let shutdown = converter.shutdown_handle();
    tokio::spawn(async move {
        if wait_for_abort(tokio::signal::ctrl_c, shutdown).await {
            log::error!("Second Ctrl+C, aborting");
            std::process::exit(130);
        }
    });

    log::info!("Converting {} (y {}..{})", args.world.display(), dims.min_y, dims.max_y());
    let converted = converter.convert(&args.world, world).await;
    let report = &converted.report;

    match report.state {
        ConversionState::NoRegions => {
            log::warn!("{} has no region files, nothing converted", args.world.display())
        }
        ConversionState::Interrupted => log::warn!("Conversion interrupted: {report}"),
        _ => log::info!("{report}"),
    }
    if report.chunk_failures > 0 || report.failed > 0 {
        log::warn!(
            "{} region files skipped, {} chunks failed; see warnings above",
            report.failed,
            report.chunk_failures
        );
    }
    Ok(())
}

/// First interrupt requests a clean shutdown; true once a second one arrives.
async fn wait_for_abort<F, Fut>(mut interrupt: F, shutdown: ShutdownHandle) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if interrupt().await.is_err() {
        return false;
    }
    log::warn!("Ctrl+C received, stopping after the running chunks (press again to abort)");
    shutdown.shutdown();
    interrupt().await.is_ok()
}
