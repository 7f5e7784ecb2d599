use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{bail, Context};


/// Dumps one house layout from the dataset's train split to
/// `house_<index>.json` in the working directory.
///
/// The dataset directory holds the layouts as one JSON object per line in
/// `train.jsonl`.
pub fn dump_house(dataset_dir: &str, house_index: usize) -> Result<(), anyhow::Error> {
    let train_path = Path::new(dataset_dir).join("train.jsonl");
    let reader = BufReader::new(
        File::open(&train_path)
            .with_context(|| format!("Failed to open dataset split {}", train_path.display()))?,
    );

    for (line_index, line) in reader.lines().enumerate() {
        let line = line?;
        if line_index < house_index {
            continue;
        }

        let house: serde_json::Value = serde_json::from_str(&line)
            .with_context(|| format!("Malformed layout at index {}", house_index))?;
        let out_path = format!("house_{}.json", house_index);
        std::fs::write(&out_path, serde_json::to_string_pretty(&house)?)?;
        println!("Wrote {}", out_path);
        return Ok(());
    }

    bail!("House index {} is out of range for {}", house_index, train_path.display())
}
