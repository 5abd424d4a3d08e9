use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, ValueEnum, error::ErrorKind};

use crate::config::{DatasetLimit, Direction, EnumerationStrategy, TrainOptions};
use crate::metrics::group_skew;
use crate::source::AlignedDataset;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LayoutArg {
    Ade20k,
    AdvnetPaired,
    AdvnetCyclic,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DirectionArg {
    #[value(name = "AtoB")]
    AtoB,
    #[value(name = "BtoA")]
    BtoA,
}

impl From<DirectionArg> for Direction {
    fn from(value: DirectionArg) -> Self {
        match value {
            DirectionArg::AtoB => Direction::AtoB,
            DirectionArg::BtoA => Direction::BtoA,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "inspect_dataset",
    disable_help_subcommand = true,
    about = "Enumerate a layered dataset and report alignment",
    long_about = "Enumerate every role of a dataset layout, enforce index alignment, and print per-role and per-group counts.",
    after_help = "Either --dataroot with a --layout preset, or --options pointing at a JSON TrainOptions file, is required."
)]
/// CLI for `inspect_dataset`.
///
/// Common usage:
/// - Grouped cyclic layout: `--dataroot datasets/advnet --layout advnet-cyclic`
/// - ADE20K pairs: `--dataroot datasets/ade20k --layout ade20k --dataset-class bathroom`
/// - Saved options: `--options run/options.json`
struct InspectDatasetCli {
    #[arg(long, value_name = "PATH", help = "Dataset root directory")]
    dataroot: Option<PathBuf>,
    #[arg(
        long,
        value_enum,
        default_value = "advnet-cyclic",
        help = "Built-in layout preset"
    )]
    layout: LayoutArg,
    #[arg(long, help = "Phase directory (train, test, ...)")]
    phase: Option<String>,
    #[arg(
        long = "dataset-class",
        default_value = "bathroom",
        help = "Scene class used by the ade20k layout"
    )]
    dataset_class: String,
    #[arg(
        long = "group",
        value_name = "GROUP",
        help = "Group identifier for grouped layouts, repeat as needed in group order"
    )]
    groups: Vec<String>,
    #[arg(
        long = "max-dataset-size",
        value_parser = parse_dataset_limit,
        help = "Global sample cap (integer or \"inf\")"
    )]
    max_dataset_size: Option<DatasetLimit>,
    #[arg(long, value_enum, help = "Translation direction")]
    direction: Option<DirectionArg>,
    #[arg(
        long,
        value_name = "OPTIONS_JSON",
        conflicts_with = "dataroot",
        help = "Load TrainOptions from a JSON file instead of a preset"
    )]
    options: Option<PathBuf>,
    #[arg(
        long,
        default_value_t = 3,
        help = "Number of leading samples whose paths are printed"
    )]
    show: usize,
    #[arg(long, help = "Decode the first sample and print slot shapes")]
    decode: bool,
    #[arg(long = "emit-options", help = "Print the resolved options as JSON")]
    emit_options: bool,
}

/// Enumerate a dataset from command-line arguments and print its alignment report.
pub fn run_inspect_dataset<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let Some(cli) = parse_cli::<InspectDatasetCli, _>(
        std::iter::once("inspect_dataset".to_string()).chain(args_iter),
    )?
    else {
        return Ok(());
    };

    let options = resolve_options(&cli)?;
    options.validate()?;
    if cli.emit_options {
        println!("{}", serde_json::to_string_pretty(&options)?);
    }

    let dataset = AlignedDataset::from_train_options(&options)?;
    println!(
        "Dataset {} (phase '{}', direction {})",
        options.dataset.dataroot.display(),
        options.dataset.phase,
        options.dataset.direction.as_str()
    );
    println!("  samples: {}", dataset.len());
    match &options.dataset.strategy {
        EnumerationStrategy::Pair { dataset_class, .. } => {
            println!("  layout: pair ({dataset_class})");
        }
        EnumerationStrategy::Grouped { groups } => {
            println!("  layout: grouped ({})", groups.join(", "));
        }
    }

    println!("Roles:");
    for slot in &options.dataset.roles.slots {
        for part in &slot.parts {
            let count = dataset
                .role_paths(&part.role)
                .map(<[PathBuf]>::len)
                .unwrap_or(0);
            println!(
                "  {:<10} slot {:<3} part {:<3} channels {}  files {}",
                part.role, slot.name, part.part, part.channels, count
            );
        }
    }

    println!("Groups:");
    for span in dataset.groups() {
        println!(
            "  {:<10} indices {}..{} ({} samples)",
            span.group,
            span.start,
            span.start + span.len,
            span.len
        );
    }
    if let Some(skew) = group_skew(dataset.groups())
        && skew.groups > 1
    {
        println!(
            "  skew: min {} max {} ratio {:.2} max share {:.1}%",
            skew.min,
            skew.max,
            skew.ratio,
            skew.max_share * 100.0
        );
    }

    let shown = cli.show.min(dataset.len());
    if shown > 0 {
        println!("First {shown} samples:");
    }
    for index in 0..shown {
        println!("  [{index}]");
        for role in dataset.roles() {
            if let Some(path) = dataset.role_paths(role).and_then(|paths| paths.get(index)) {
                println!("    {:<10} {}", role, path.display());
            }
        }
    }

    if cli.decode {
        if dataset.is_empty() {
            println!("Nothing to decode: the dataset is empty.");
        } else {
            let sample = dataset.get(0)?;
            println!("Decoded sample 0:");
            for (slot, data) in &sample.slots {
                println!("  slot {slot}: shape {:?}", data.shape);
            }
        }
    }
    Ok(())
}

fn resolve_options(cli: &InspectDatasetCli) -> Result<TrainOptions, Box<dyn Error>> {
    let mut options = if let Some(path) = &cli.options {
        TrainOptions::from_json_path(path)?
    } else {
        let Some(dataroot) = cli.dataroot.clone() else {
            return Err("either --dataroot or --options is required".into());
        };
        match cli.layout {
            LayoutArg::Ade20k => TrainOptions::ade20k(dataroot, cli.dataset_class.clone()),
            LayoutArg::AdvnetPaired => TrainOptions::advnet_paired(dataroot),
            LayoutArg::AdvnetCyclic => TrainOptions::advnet_cyclic(dataroot),
        }
    };
    if let Some(phase) = &cli.phase {
        options.dataset.phase = phase.clone();
    }
    if let Some(limit) = cli.max_dataset_size {
        options.dataset.max_dataset_size = limit;
    }
    if let Some(direction) = cli.direction {
        options.dataset.direction = direction.into();
    }
    if !cli.groups.is_empty() {
        match &mut options.dataset.strategy {
            EnumerationStrategy::Grouped { groups } => groups.clone_from(&cli.groups),
            EnumerationStrategy::Pair { .. } => {
                return Err("--group only applies to grouped layouts".into());
            }
        }
    }
    Ok(options)
}

fn parse_dataset_limit(raw: &str) -> Result<DatasetLimit, String> {
    let quoted = serde_json::Value::String(raw.to_string());
    let value = match raw.trim().parse::<u64>() {
        Ok(count) => serde_json::Value::from(count),
        Err(_) => quoted,
    };
    serde_json::from_value(value).map_err(|err| format!("invalid --max-dataset-size: {err}"))
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_limit_argument_accepts_counts_and_infinity() {
        assert_eq!(parse_dataset_limit("40").unwrap(), DatasetLimit::Max(40));
        assert_eq!(parse_dataset_limit("inf").unwrap(), DatasetLimit::Unlimited);
        assert!(parse_dataset_limit("many").is_err());
    }

    #[test]
    fn cli_overrides_apply_to_preset() {
        let cli = InspectDatasetCli::try_parse_from([
            "inspect_dataset",
            "--dataroot",
            "data",
            "--layout",
            "advnet-paired",
            "--group",
            "cola",
            "--group",
            "tea",
            "--max-dataset-size",
            "8",
            "--phase",
            "test",
        ])
        .unwrap();
        let options = resolve_options(&cli).unwrap();
        assert_eq!(options.dataset.phase, "test");
        assert_eq!(options.dataset.max_dataset_size, DatasetLimit::Max(8));
        assert_eq!(
            options.dataset.strategy,
            EnumerationStrategy::Grouped {
                groups: vec!["cola".to_string(), "tea".to_string()]
            }
        );
    }

    #[test]
    fn group_flag_is_rejected_for_pair_layouts() {
        let cli = InspectDatasetCli::try_parse_from([
            "inspect_dataset",
            "--dataroot",
            "data",
            "--layout",
            "ade20k",
            "--group",
            "cola",
        ])
        .unwrap();
        assert!(resolve_options(&cli).is_err());
    }

    #[test]
    fn help_exits_without_error() {
        assert!(parse_cli::<InspectDatasetCli, _>(["inspect_dataset", "--help"])
            .unwrap()
            .is_none());
    }
}
