//! zkdeposit CLI - roots, witnesses and deposit proofs
//!
//! Commands:
//! - root: Print the root of a fresh tree
//! - witness: Write the witness for a leaf slot
//! - prove: Build a deposit proof from a witness file
//! - verify: Check a proof file
//! - simulate: Run deposits against a local ledger

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use zkdeposit::{
    empty_root, DepositProgram, DepositProof, MerkleTree, ProgramConfig, SET, TREE_HEIGHT,
};

mod simulate;
mod types;

use types::WitnessFile;

#[derive(Parser)]
#[command(name = "zkdeposit")]
#[command(about = "Proof-gated deposits over a Poseidon Merkle commitment", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the root of a fresh tree
    Root {
        #[arg(long, default_value_t = TREE_HEIGHT)]
        height: usize,
    },

    /// Write the inclusion witness for a leaf slot
    Witness {
        /// Leaf index to deposit into
        #[arg(short, long)]
        index: u64,

        #[arg(long, default_value_t = TREE_HEIGHT)]
        height: usize,

        /// Slots already deposited into
        #[arg(long, value_delimiter = ',')]
        set: Vec<u64>,

        /// Output witness file
        #[arg(short, long, default_value = "witness.json")]
        output: PathBuf,
    },

    /// Build a deposit proof from a witness file
    Prove {
        #[arg(short, long, default_value = "witness.json")]
        witness: PathBuf,

        /// Output proof file
        #[arg(short, long, default_value = "proof.bin")]
        output: PathBuf,
    },

    /// Verify a proof file
    Verify {
        #[arg(short, long, default_value = "proof.bin")]
        proof: PathBuf,
    },

    /// Deploy, init and deposit on a local ledger, then replay the first proof
    Simulate {
        #[arg(short, long, default_value_t = 3)]
        deposits: u64,

        #[arg(long, default_value_t = TREE_HEIGHT)]
        height: usize,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Root { height } => cmd_root(height),
        Commands::Witness {
            index,
            height,
            set,
            output,
        } => cmd_witness(index, height, &set, &output),
        Commands::Prove { witness, output } => cmd_prove(&witness, &output),
        Commands::Verify { proof } => cmd_verify(&proof),
        Commands::Simulate { deposits, height } => simulate::run(height, deposits),
    }
}

fn program_config(height: usize) -> ProgramConfig {
    ProgramConfig::default().with_height(height)
}

fn cmd_root(height: usize) -> Result<(), Box<dyn Error>> {
    let root = empty_root(height)?;
    println!("{}", root);
    Ok(())
}

fn cmd_witness(index: u64, height: usize, set: &[u64], output: &Path) -> Result<(), Box<dyn Error>> {
    println!("🌳 zkdeposit - witness for slot {index}\n");

    let mut tree = MerkleTree::new(height)?;
    for &slot in set {
        tree.set_leaf(slot, SET)?;
    }
    if tree.get_leaf(index)? == SET {
        return Err(format!("slot {} is already set", index).into());
    }

    let file = WitnessFile {
        height,
        index,
        root: tree.root(),
        witness: tree.get_witness(index)?,
    };
    fs::write(output, serde_json::to_string_pretty(&file)?)?;

    let input = file.transition();
    println!("   Height:   {}", height);
    println!("   Pre-root: {}", input.pre_root);
    println!("   Pos-root: {}", input.pos_root);
    println!("\n✅ Witness saved to {:?}", output);
    Ok(())
}

fn cmd_prove(witness_path: &Path, output: &Path) -> Result<(), Box<dyn Error>> {
    println!("🔐 zkdeposit - generating deposit proof\n");

    let file: WitnessFile = serde_json::from_str(&fs::read_to_string(witness_path)?)?;
    let program = DepositProgram::compile(program_config(file.height))?;
    let input = file.transition();

    let proof = program.create_deposit_proof(&input, &file.witness)?;
    let bytes = proof.to_bytes();
    fs::write(output, &bytes)?;

    println!("   Slot:       {}", file.witness.calculate_index());
    println!("   Transition: {}", input);
    println!("   Proof size: {} bytes", bytes.len());
    println!("\n✅ Proof saved to {:?}", output);
    Ok(())
}

fn cmd_verify(proof_path: &Path) -> Result<(), Box<dyn Error>> {
    println!("🔎 zkdeposit - verifying proof\n");

    let proof = DepositProof::from_bytes(&fs::read(proof_path)?)?;
    let program = DepositProgram::compile(program_config(proof.tree_height()))?;

    println!("   Pre-root: {}", proof.pre_root());
    println!("   Pos-root: {}", proof.pos_root());
    program.verify(&proof)?;
    println!("\n✅ Proof is VALID");
    Ok(())
}
