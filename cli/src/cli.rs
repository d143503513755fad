//! # CLI Interface
//!
//! Argument structure for `vault-gate`, via `clap` derive. Every flag that
//! configures the gate or names a key also reads an environment variable.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use vault_gate_protocol::config::{ALLOWANCE_PERIOD_SECS, DEFAULT_EXPIRY_WINDOW};
use vault_gate_protocol::crypto::Address;

use crate::logging::LogFormat;

/// Vault Gate: multi-party, time-locked access control for a custodial
/// vault, run against a local ledger.
#[derive(Parser, Debug)]
#[command(
    name = "vault-gate",
    about = "Vault Gate access-control program",
    version,
    propagate_version = true
)]
pub struct VaultGateCli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Directory holding the sled ledger and generated keys.
    #[arg(
        long,
        short = 'd',
        global = true,
        env = "VAULT_GATE_DATA_DIR",
        default_value = ".vault-gate"
    )]
    pub data_dir: PathBuf,

    /// Sequence numbers a pending action survives.
    #[arg(long, global = true, env = "VAULT_GATE_EXPIRY_WINDOW", default_value_t = DEFAULT_EXPIRY_WINDOW)]
    pub expiry_window: u64,

    /// Seconds before an untouched allowance lapses.
    #[arg(long, global = true, env = "VAULT_GATE_ALLOWANCE_PERIOD", default_value_t = ALLOWANCE_PERIOD_SECS)]
    pub allowance_period: i64,

    /// Log format on stderr.
    #[arg(long, global = true, env = "VAULT_GATE_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Default filter when `RUST_LOG` is unset.
    #[arg(
        long,
        global = true,
        default_value = "vault_gate_cli=info,vault_gate_contracts=info,vault_gate_protocol=warn"
    )]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate an Ed25519 keypair and store it in the data directory.
    Keygen(KeygenArgs),
    /// Create a vault and its policy.
    Initialize(InitializeArgs),
    /// Propose an action against a vault.
    Propose(ProposeArgs),
    /// Approve the outstanding pending action.
    Approve(PendingArgs),
    /// Cancel the outstanding pending action.
    Cancel(PendingArgs),
    /// Print a vault, its policy, and its pending action as JSON.
    Show(ShowArgs),
    /// Print version information.
    Version,
}

/// Who signs the instruction.
#[derive(Args, Debug, Clone)]
pub struct SignerArgs {
    /// Hex Ed25519 secret key. Repeat for co-signers.
    ///
    /// **Avoid outside development**: prefer `--key-file`.
    #[arg(long = "key", env = "VAULT_GATE_KEY", value_delimiter = ',')]
    pub keys: Vec<String>,

    /// File containing a hex secret key, as written by `keygen`. Repeatable.
    #[arg(long = "key-file")]
    pub key_files: Vec<PathBuf>,
}

#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Key file name inside `<data-dir>/keys/`.
    #[arg(long, default_value = "default")]
    pub name: String,

    /// Overwrite an existing key file.
    #[arg(long)]
    pub force: bool,
}

/// Rule, signers, and unlock of a policy.
#[derive(Args, Debug, Clone)]
pub struct PolicyArgs {
    /// Required approvals. Omit for an owner-only policy.
    #[arg(long)]
    pub threshold: Option<u8>,

    /// Authorized signer address (hex or base58). Repeatable.
    #[arg(long = "signer")]
    pub signers: Vec<Address>,

    /// Unlock time: unix seconds or RFC 3339.
    #[arg(long)]
    pub unlock_at: Option<String>,
}

#[derive(Args, Debug)]
pub struct InitializeArgs {
    #[command(flatten)]
    pub signer: SignerArgs,

    /// Distinguishes several vaults of one owner.
    #[arg(long, default_value_t = 0)]
    pub vault_id: u64,

    #[command(flatten)]
    pub policy: PolicyArgs,
}

#[derive(Args, Debug)]
pub struct ProposeArgs {
    #[command(flatten)]
    pub signer: SignerArgs,

    /// Vault address.
    #[arg(long)]
    pub vault: Address,

    /// Sequence to build against. Defaults to the vault's current sequence.
    #[arg(long)]
    pub sequence: Option<u64>,

    #[command(subcommand)]
    pub action: ActionCommand,
}

#[derive(Subcommand, Debug)]
pub enum ActionCommand {
    /// Credit the vault.
    Deposit {
        #[arg(long)]
        amount: u64,
    },
    /// Pay out to a beneficiary within their allowance.
    Withdraw {
        #[arg(long)]
        beneficiary: Address,
        #[arg(long)]
        amount: u64,
    },
    /// Burn from the vault balance.
    Slash {
        #[arg(long)]
        amount: u64,
    },
    /// Set a beneficiary's withdrawal limit. Zero revokes.
    SetAllowance {
        #[arg(long)]
        beneficiary: Address,
        #[arg(long)]
        limit: u64,
    },
    /// Replace the rule and signers. The unlock must be restated unchanged.
    UpdatePolicy(PolicyArgs),
}

#[derive(Args, Debug)]
pub struct PendingArgs {
    #[command(flatten)]
    pub signer: SignerArgs,

    #[arg(long)]
    pub vault: Address,

    /// Pending action address. Defaults to the vault's outstanding one.
    #[arg(long)]
    pub pending: Option<Address>,

    #[arg(long)]
    pub sequence: Option<u64>,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    #[arg(long)]
    pub vault: Address,

    /// Also show this beneficiary's allowance.
    #[arg(long)]
    pub beneficiary: Option<Address>,
}
