use clap::Parser;

use crate::settings::{CliArgs, OperationMode};
use crate::tagging::TagConfig;

mod cleanup;
mod house;
mod settings;
mod tagging;

fn main() -> Result<(), anyhow::Error> {
    env_logger::init();

    let args = CliArgs::parse();
    log::trace!("Starting with args: {:?}", args);

    match &args.operation_mode {
        OperationMode::Tag {
            in_usd,
            in_tbox_usd,
            out_abox_usd,
        } => tagging::auto_sem_tag(in_usd, in_tbox_usd, out_abox_usd, &TagConfig::default()),
        OperationMode::Clean { in_usd, out_usd } => cleanup::clean_up(in_usd, out_usd),
        OperationMode::House { house, dataset } => house::dump_house(dataset, *house),
    }
}
