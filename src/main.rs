mod dump;
mod seeds;

use std::{
    fs,
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use aidledger_core::{
    client::ReadClient,
    instruction::{self, SubmitBatchArgs},
    pda,
    tag::classify,
    AccountRecord, BatchRecord, Keypair, NgoRecord, Pubkey, RecordKind, Trailing,
    DEFAULT_PROGRAM_ID,
};

use anyhow::{bail, Context};
use base64::{engine::general_purpose, Engine as _};
use clap::{Args, Parser, Subcommand};
use rand::{rngs::OsRng, RngCore};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::dump::DumpSource;

//==================== CLI ====================//

#[derive(Parser)]
#[command(name = "aidledger")]
#[command(about = "Inspect and build AidLedger program accounts")]
struct Cli {
    /// Program that owns the NGO and batch accounts
    #[arg(long, global = true, env = "AIDLEDGER_PROGRAM_ID", default_value = DEFAULT_PROGRAM_ID)]
    program_id: Pubkey,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a keypair file (JSON array of 64 bytes)
    Keygen {
        #[arg(long)]
        out: PathBuf,
    },
    /// Print the public key of a keypair file
    Pubkey { keypair: PathBuf },
    /// Derive program addresses
    #[command(subcommand)]
    Derive(DeriveCmd),
    /// Classify and decode one account's data
    Decode(DecodeArgs),
    /// Decode all accounts of a kind from a getProgramAccounts dump
    #[command(subcommand)]
    List(ListCmd),
    /// Look up one account by its derived address in a dump
    #[command(subcommand)]
    Fetch(FetchCmd),
    /// Encode a program instruction
    #[command(subcommand)]
    Instruction(InstructionCmd),
}

#[derive(Subcommand)]
enum DeriveCmd {
    /// NGO account of an admin
    Ngo {
        #[arg(long)]
        admin: Pubkey,
    },
    /// Batch account of an NGO account
    Batch {
        #[arg(long)]
        ngo: Pubkey,
        #[arg(long)]
        index: u64,
    },
    /// Arbitrary seeds: str:<text>, hex:<bytes>, pk:<base58>, u64:<n>
    Seeds {
        #[arg(required = true)]
        seeds: Vec<String>,
    },
}

#[derive(Args)]
struct DecodeArgs {
    /// File with raw account bytes
    #[arg(long, conflicts_with = "base64", required_unless_present = "base64")]
    file: Option<PathBuf>,
    /// Account data as base64
    #[arg(long)]
    base64: Option<String>,
    #[command(flatten)]
    padding: PaddingArg,
}

#[derive(Args)]
struct PaddingArg {
    /// Accept zero bytes after the last field
    #[arg(long)]
    allow_padding: bool,
}

impl PaddingArg {
    fn trailing(&self) -> Trailing {
        if self.allow_padding {
            Trailing::AllowZeroPadding
        } else {
            Trailing::Reject
        }
    }
}

#[derive(Subcommand)]
enum ListCmd {
    Ngos {
        #[arg(long)]
        accounts: PathBuf,
        #[command(flatten)]
        padding: PaddingArg,
    },
    /// Batches of one NGO account, by batch index
    Batches {
        #[arg(long)]
        ngo: Pubkey,
        #[arg(long)]
        accounts: PathBuf,
        #[command(flatten)]
        padding: PaddingArg,
    },
}

#[derive(Subcommand)]
enum FetchCmd {
    Ngo {
        #[arg(long)]
        admin: Pubkey,
        #[arg(long)]
        accounts: PathBuf,
        #[command(flatten)]
        padding: PaddingArg,
    },
    Batch {
        #[arg(long)]
        ngo: Pubkey,
        #[arg(long)]
        index: u64,
        #[arg(long)]
        accounts: PathBuf,
        #[command(flatten)]
        padding: PaddingArg,
    },
}

#[derive(Args)]
struct AdminArg {
    /// Admin public key
    #[arg(long, conflicts_with = "keypair", required_unless_present = "keypair")]
    admin: Option<Pubkey>,
    /// Keypair file of the admin
    #[arg(long)]
    keypair: Option<PathBuf>,
}

impl AdminArg {
    fn resolve(&self) -> anyhow::Result<Pubkey> {
        match (&self.admin, &self.keypair) {
            (Some(admin), _) => Ok(*admin),
            (None, Some(path)) => Ok(read_keypair(path)?.pubkey()),
            (None, None) => bail!("one of --admin or --keypair is required"),
        }
    }
}

#[derive(Subcommand)]
enum InstructionCmd {
    RegisterNgo {
        #[command(flatten)]
        admin: AdminArg,
        #[arg(long)]
        metadata_uri: String,
    },
    SubmitBatch {
        #[command(flatten)]
        admin: AdminArg,
        #[arg(long)]
        index: u64,
        /// 32-byte merkle root in hex (default: zeros)
        #[arg(long)]
        merkle_root: Option<String>,
        #[arg(long)]
        data_uri: Option<String>,
        #[arg(long)]
        region: Option<String>,
        #[arg(long)]
        program_tag: Option<String>,
        /// Unix seconds (default: now)
        #[arg(long)]
        start_time: Option<i64>,
        /// Unix seconds (default: start + 7 days)
        #[arg(long)]
        end_time: Option<i64>,
    },
}

//==================== Общие утилиты ====================//

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_keypair(path: &Path) -> anyhow::Result<Keypair> {
    let json = Zeroizing::new(
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?,
    );
    Keypair::from_json(&json).with_context(|| format!("load keypair {}", path.display()))
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn read_client(
    program_id: Pubkey,
    accounts: &Path,
    padding: &PaddingArg,
) -> anyhow::Result<ReadClient<DumpSource>> {
    let source = DumpSource::load(accounts)?;
    Ok(ReadClient::new(source, program_id).with_trailing(padding.trailing()))
}

//==================== Сервисные: keygen / pubkey ====================//

fn keygen_cmd(out: &Path) -> anyhow::Result<()> {
    let mut secret = Zeroizing::new([0u8; 32]);
    OsRng.fill_bytes(&mut *secret);
    let keypair = Keypair::from_secret(&secret);

    if let Some(parent) = out.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
    }
    // create_new: never overwrite an existing wallet
    let mut f = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(out)
        .with_context(|| format!("create {}", out.display()))?;
    f.write_all(keypair.to_json().as_bytes())?;

    info!(path = %out.display(), "keypair written");
    println!("{}", keypair.pubkey());
    Ok(())
}

fn pubkey_cmd(path: &Path) -> anyhow::Result<()> {
    println!("{}", read_keypair(path)?.pubkey());
    Ok(())
}

//==================== PDA: derive ====================//

fn derive_cmd(program_id: &Pubkey, cmd: DeriveCmd) -> anyhow::Result<()> {
    let (address, bump) = match cmd {
        DeriveCmd::Ngo { admin } => pda::ngo_address(&admin, program_id)?,
        DeriveCmd::Batch { ngo, index } => pda::batch_address(&ngo, index, program_id)?,
        DeriveCmd::Seeds { seeds } => {
            let parsed = seeds
                .iter()
                .map(|s| crate::seeds::parse_seed(s))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let refs: Vec<&[u8]> = parsed.iter().map(Vec::as_slice).collect();
            pda::find_program_address(&refs, program_id)?
        }
    };
    print_json(&json!({
        "address": address,
        "bump": bump,
        "programId": program_id,
    }))
}

//==================== Разбор аккаунтов: decode ====================//

fn decode_cmd(args: DecodeArgs) -> anyhow::Result<()> {
    let data = match (&args.file, &args.base64) {
        (Some(path), _) => fs::read(path).with_context(|| format!("read {}", path.display()))?,
        (None, Some(b64)) => general_purpose::STANDARD
            .decode(b64.trim())
            .context("invalid base64")?,
        (None, None) => bail!("one of --file or --base64 is required"),
    };
    debug!(len = data.len(), "decoding account data");

    let trailing = args.padding.trailing();
    let Some(kind) = classify(&data) else {
        bail!("unknown record kind ({} bytes)", data.len());
    };
    let account = match kind {
        RecordKind::Ngo => serde_json::to_value(NgoRecord::decode_with(&data, trailing)?)?,
        RecordKind::Batch => {
            let batch = BatchRecord::decode_with(&data, trailing)?;
            if batch.has_inverted_window() {
                tracing::warn!(
                    start_time = batch.start_time,
                    end_time = batch.end_time,
                    "batch window ends before it starts"
                );
            }
            serde_json::to_value(batch)?
        }
    };
    print_json(&json!({ "kind": kind, "account": account }))
}

//==================== Выборки: list / fetch ====================//

fn list_cmd(program_id: Pubkey, cmd: ListCmd) -> anyhow::Result<()> {
    match cmd {
        ListCmd::Ngos { accounts, padding } => {
            let client = read_client(program_id, &accounts, &padding)?;
            let listing = client.list_ngos()?;
            info!(
                ngos = listing.records().count(),
                failed = listing.failures().count(),
                "listed ngos"
            );
            print_json(&json!({ "ok": true, "ngos": listing }))
        }
        ListCmd::Batches {
            ngo,
            accounts,
            padding,
        } => {
            let client = read_client(program_id, &accounts, &padding)?;
            let listing = client.list_batches_for_ngo(&ngo)?;
            info!(
                %ngo,
                batches = listing.records().count(),
                failed = listing.failures().count(),
                "listed batches"
            );
            print_json(&json!({ "ok": true, "ngo": ngo, "batches": listing }))
        }
    }
}

fn fetch_cmd(program_id: Pubkey, cmd: FetchCmd) -> anyhow::Result<()> {
    let found = match cmd {
        FetchCmd::Ngo {
            admin,
            accounts,
            padding,
        } => read_client(program_id, &accounts, &padding)?
            .fetch_ngo(&admin)?
            .map(|(address, ngo)| json!({ "pubkey": address, "account": ngo })),
        FetchCmd::Batch {
            ngo,
            index,
            accounts,
            padding,
        } => read_client(program_id, &accounts, &padding)?
            .fetch_batch(&ngo, index)?
            .map(|(address, batch)| json!({ "pubkey": address, "account": batch })),
    };
    match found {
        Some(value) => print_json(&value),
        None => bail!("account not found"),
    }
}

//==================== Инструкции ====================//

fn instruction_cmd(program_id: &Pubkey, cmd: InstructionCmd) -> anyhow::Result<()> {
    let ix = match cmd {
        InstructionCmd::RegisterNgo {
            admin,
            metadata_uri,
        } => {
            instruction::register_ngo(program_id, &admin.resolve()?, &metadata_uri)?
        }
        InstructionCmd::SubmitBatch {
            admin,
            index,
            merkle_root,
            data_uri,
            region,
            program_tag,
            start_time,
            end_time,
        } => {
            let mut args = SubmitBatchArgs::demo(index, start_time.unwrap_or_else(now_unix));
            if let Some(root) = merkle_root {
                let bytes = hex::decode(root.trim()).context("invalid --merkle-root")?;
                args.merkle_root = bytes
                    .try_into()
                    .map_err(|b: Vec<u8>| {
                        anyhow::anyhow!("--merkle-root must be 32 bytes, got {}", b.len())
                    })?;
            }
            if let Some(v) = data_uri {
                args.data_uri = v;
            }
            if let Some(v) = region {
                args.region = v;
            }
            if let Some(v) = program_tag {
                args.program_tag = v;
            }
            if let Some(v) = end_time {
                args.end_time = v;
            }
            if args.start_time > args.end_time {
                tracing::warn!(
                    start_time = args.start_time,
                    end_time = args.end_time,
                    "batch window ends before it starts"
                );
            }
            instruction::submit_batch(program_id, &admin.resolve()?, &args)?
        }
    };
    print_json(&ix)
}

//==================== main ====================//

fn init_logging(verbose: bool) -> anyhow::Result<()> {
    let default = if verbose {
        "aidledger=debug,aidledger_core=debug"
    } else {
        "aidledger=info,aidledger_core=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(default))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;
    debug!(program_id = %cli.program_id, "starting");

    let program_id = cli.program_id;
    match cli.cmd {
        Command::Keygen { out } => keygen_cmd(&out),
        Command::Pubkey { keypair } => pubkey_cmd(&keypair),
        Command::Derive(cmd) => derive_cmd(&program_id, cmd),
        Command::Decode(args) => decode_cmd(args),
        Command::List(cmd) => list_cmd(program_id, cmd),
        Command::Fetch(cmd) => fetch_cmd(program_id, cmd),
        Command::Instruction(cmd) => instruction_cmd(&program_id, cmd),
    }
}
