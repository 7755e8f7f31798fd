use anyhow::Result;
use log::*;

use engine::config::EngineConfig;
use engine::Engine;

fn main() -> Result<()> {
    pretty_env_logger::init();

    let engine = Engine::new(EngineConfig::default())?;
    engine.run()?;

    info!("Bye.");
    Ok(())
}
