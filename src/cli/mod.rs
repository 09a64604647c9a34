// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction. Parses arguments with
// `clap` and delegates the work to Layer 2 (application).
//
// Three commands are supported:
//   1. `partition` — build the global and every client shard
//   2. `rank`      — build the shard of one distributed rank
//   3. `encode`    — show the token IDs of some sentences
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EncodeArgs, PartitionArgs, RankArgs};

use crate::domain::client_map::ClientSelection;

#[derive(Parser, Debug)]
#[command(
    name = "fedshard",
    version,
    about = "Partition federated CIFAR-100 and StackOverflow archives into per-client shards."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the use case; this layer only routes and prints.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Partition(args) => run_partition(args),
            Commands::Rank(args) => run_rank(args),
            Commands::Encode(args) => run_encode(args),
        }
    }
}

fn run_partition(args: PartitionArgs) -> Result<()> {
    use crate::application::partition_use_case::PartitionUseCase;

    let summary = PartitionUseCase::new(args.dataset.resolve()?).execute()?;
    println!(
        "{}: {} train / {} test samples over {} clients, output_dim = {}",
        summary.dataset,
        summary.train_data_num,
        summary.test_data_num,
        summary.client_num,
        summary.output_dim
    );
    Ok(())
}

fn run_rank(args: RankArgs) -> Result<()> {
    use crate::application::partition_use_case::PartitionUseCase;

    let summary = PartitionUseCase::new(args.dataset.resolve()?).execute_rank(args.rank)?;
    let owner = match summary.selection {
        ClientSelection::Global => "global data".to_string(),
        ClientSelection::Local(idx) => format!("client {idx}"),
    };
    println!(
        "{} rank {} ({}): {} train / {} test samples, {} / {} batches, output_dim = {}",
        summary.dataset,
        summary.rank,
        owner,
        summary.sizes.train_samples,
        summary.sizes.test_samples,
        summary.sizes.train_batches,
        summary.sizes.test_batches,
        summary.output_dim
    );
    Ok(())
}

fn run_encode(args: EncodeArgs) -> Result<()> {
    use crate::application::encode_use_case::EncodeUseCase;

    let use_case = EncodeUseCase::new(
        &args.word_counts,
        args.vocab_size,
        args.max_seq_len,
        args.num_oov_buckets,
    )?;

    for encoded in use_case.encode(&args.sentences, args.shift)? {
        let tokens: Vec<&str> = encoded.ids.iter().map(|&id| use_case.describe(id)).collect();
        println!("{}", encoded.sentence);
        println!("  ids:     {:?}", encoded.ids);
        println!("  tokens:  {}", tokens.join(" "));
        if let Some((inputs, targets)) = &encoded.shifted {
            println!("  inputs:  {inputs:?}");
            println!("  targets: {targets:?}");
        }
    }
    Ok(())
}
