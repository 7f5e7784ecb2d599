use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "ontotag")]
#[command(version)]
#[command(about = "Batch utilities for ontology-based semantic tagging of scene descriptions")]
pub struct CliArgs {
    #[command(subcommand)]
    pub operation_mode: OperationMode,
}

#[derive(Subcommand, Debug)]
pub enum OperationMode {
    /// Attach ontology class labels to a scene, derived from prim names
    Tag {
        #[arg(long = "in_usd", help = "Input ABox USD")]
        in_usd: String,
        #[arg(long = "in_TBox_usd", help = "Input TBox USD")]
        in_tbox_usd: String,
        #[arg(long = "out_ABox_usd", help = "Output ABox USD")]
        out_abox_usd: String,
    },
    /// Strip instance data, keeping only the ontology classes still referenced
    Clean {
        #[arg(long = "in_usd", help = "Input USD")]
        in_usd: String,
        #[arg(long = "out_usd", help = "Output USD")]
        out_usd: String,
    },
    /// Dump one house layout from the dataset as JSON
    House {
        #[arg(long, help = "Index of the layout to dump")]
        house: usize,
        #[arg(long, default_value = "procthor-10k", env = "ONTOTAG_DATASET_DIR")]
        dataset: String,
    },
}
