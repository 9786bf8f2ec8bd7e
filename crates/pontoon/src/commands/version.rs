//! Version command

use anyhow::Result;
use clap::Args;

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Print only the version number
    #[arg(long)]
    pub short: bool,
}

pub fn run(args: VersionArgs) -> Result<()> {
    if args.short {
        println!("{}", env!("CARGO_PKG_VERSION"));
    } else {
        println!("pontoon {}", env!("CARGO_PKG_VERSION"));
    }
    Ok(())
}
