use std::env;

use anyhow::{Context, bail};
use log::info;

use cnn_grid_search::{CnnFactory, Config, GridSearch, dataset};

const USAGE: &str = "usage: cnn-grid-search auto <config.json> <dataset.csv>\n       \
                     cnn-grid-search manual <config.json> <dataset.csv> <partition_key>";

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let (command, config_path, dataset_path) = match args.as_slice() {
        [command, config, dataset, ..] => (command.as_str(), config, dataset),
        _ => bail!(USAGE),
    };

    let config = Config::from_json_file(config_path)
        .with_context(|| format!("loading config {config_path}"))?;
    let series = dataset::load_series(dataset_path, &config.dataset)?;
    let callbacks = config.callbacks();

    let factory = CnnFactory::from_config(&config);
    let search = GridSearch::new(config, factory)?;
    info!("grid search run {}", search.timestamp());

    match command {
        "auto" => {
            let outcomes = search.run_auto(&series, &callbacks)?;
            for outcome in outcomes {
                info!("batch {}: {}", outcome.key, outcome.state);
            }
        }
        "manual" => {
            let Some(key) = args.get(3) else {
                bail!(USAGE);
            };
            let key: usize = key
                .parse()
                .with_context(|| format!("invalid partition key {key}"))?;

            let Some(partition) = search.partitions()?.into_iter().find(|p| p.key == key) else {
                bail!("no partition keyed {key}");
            };

            let outcome = search.run_manual(partition, &series, &callbacks)?;
            info!("batch {}: {}", outcome.key, outcome.state);
        }
        other => bail!("unknown command {other}\n{USAGE}"),
    }

    Ok(())
}
