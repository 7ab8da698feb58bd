use super::launch;
use crate::cli::{NetworkOverrides, PresetsArgs};
use crate::config::build_config;
use crate::error::Result;

pub fn run(args: PresetsArgs) -> Result<()> {
    let config = build_config(&args.viewer, &NetworkOverrides::default())?;
    let mut session = launch(&config)?;

    let result = session.presets();
    session.shutdown();
    let presets = result?;

    if presets.is_empty() {
        println!("The viewer reported no presets.");
    }
    for preset in presets {
        println!("{}", preset);
    }
    Ok(())
}
