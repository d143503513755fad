// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Vault Gate CLI
//!
//! Entry point for the `vault-gate` binary. Opens the sled ledger in the
//! data directory, signs instructions with the supplied keys, runs them
//! through the gate, and prints receipts and account views as JSON.
//!
//! - `keygen`     — generate a signing key
//! - `initialize` — create a vault and its policy
//! - `propose`    — propose an action
//! - `approve`    — approve the outstanding pending action
//! - `cancel`     — cancel the outstanding pending action
//! - `show`       — inspect vault, policy, pending action, allowance
//! - `version`    — print build version information

mod cli;
mod logging;

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use chrono::DateTime;
use clap::Parser;
use serde_json::{json, Value};

use vault_gate_contracts::{
    Allowance, GateAction, GateConfig, GatePolicy, GateRule, Instruction, Outcome, PendingAction,
    PolicyTerms, Receipt, Vault, VaultGate,
};
use vault_gate_protocol::clock::SystemClock;
use vault_gate_protocol::crypto::{Address, Keypair};
use vault_gate_protocol::storage::SledLedger;

use cli::{ActionCommand, Commands, GlobalArgs, PolicyArgs, SignerArgs, VaultGateCli};

type Gate = VaultGate<SledLedger, SystemClock>;

fn main() -> Result<()> {
    let cli = VaultGateCli::parse();
    logging::init_logging(&cli.global.log_level, cli.global.log_format);

    let output = match cli.command {
        Commands::Keygen(args) => keygen(&cli.global, args)?,
        Commands::Initialize(args) => {
            let gate = open_gate(&cli.global)?;
            let keys = load_keys(&args.signer)?;
            let owner = keys[0].address();
            let terms = policy_terms(&args.policy)?;
            let ix = Instruction::initialize_with(owner, args.vault_id, terms);
            submit(&gate, ix, &keys)?
        }
        Commands::Propose(args) => {
            let gate = open_gate(&cli.global)?;
            let keys = load_keys(&args.signer)?;
            let sequence = resolve_sequence(&gate, &args.vault, args.sequence)?;
            let action = gate_action(args.action)?;
            submit(&gate, Instruction::propose(args.vault, sequence, action), &keys)?
        }
        Commands::Approve(args) => {
            let gate = open_gate(&cli.global)?;
            let keys = load_keys(&args.signer)?;
            let sequence = resolve_sequence(&gate, &args.vault, args.sequence)?;
            let pending = resolve_pending(&gate, &args.vault, args.pending)?;
            submit(&gate, Instruction::approve(args.vault, sequence, pending), &keys)?
        }
        Commands::Cancel(args) => {
            let gate = open_gate(&cli.global)?;
            let keys = load_keys(&args.signer)?;
            let sequence = resolve_sequence(&gate, &args.vault, args.sequence)?;
            let pending = resolve_pending(&gate, &args.vault, args.pending)?;
            submit(&gate, Instruction::cancel(args.vault, sequence, pending), &keys)?
        }
        Commands::Show(args) => {
            let gate = open_gate(&cli.global)?;
            show(&gate, &args.vault, args.beneficiary.as_ref())?
        }
        Commands::Version => version_json(),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

fn gate_config(global: &GlobalArgs) -> GateConfig {
    GateConfig {
        expiry_window: global.expiry_window,
        allowance_period_secs: global.allowance_period,
    }
}

fn open_gate(global: &GlobalArgs) -> Result<Gate> {
    let ledger_path = global.data_dir.join("ledger");
    std::fs::create_dir_all(&ledger_path).with_context(|| {
        format!("failed to create ledger directory: {}", ledger_path.display())
    })?;

    let ledger = SledLedger::open(&ledger_path)
        .with_context(|| format!("failed to open ledger at {}", ledger_path.display()))?;
    tracing::debug!(path = %ledger_path.display(), accounts = ledger.account_count(), "ledger opened");

    Ok(VaultGate::with_config(ledger, SystemClock, gate_config(global)))
}

/// Keys from `--key` first, then `--key-file`, in the order given.
fn load_keys(args: &SignerArgs) -> Result<Vec<Keypair>> {
    let mut keys = Vec::with_capacity(args.keys.len() + args.key_files.len());
    for (i, hex_key) in args.keys.iter().enumerate() {
        let kp = Keypair::from_hex(hex_key.trim())
            .with_context(|| format!("--key #{} is not a valid secret key", i + 1))?;
        keys.push(kp);
    }
    for path in &args.key_files {
        keys.push(read_key_file(path)?);
    }
    if keys.is_empty() {
        bail!("no signing key: pass --key, --key-file, or set VAULT_GATE_KEY");
    }
    Ok(keys)
}

fn read_key_file(path: &Path) -> Result<Keypair> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read key file {}", path.display()))?;
    Keypair::from_hex(contents.trim())
        .with_context(|| format!("key file {} does not hold a valid secret key", path.display()))
}

// ---------------------------------------------------------------------------
// Argument conversion
// ---------------------------------------------------------------------------

/// Unix seconds, or an RFC 3339 timestamp.
fn parse_timestamp(s: &str) -> Result<i64> {
    if let Ok(secs) = s.parse::<i64>() {
        return Ok(secs);
    }
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.timestamp())
        .with_context(|| format!("invalid timestamp {s:?}: expected unix seconds or RFC 3339"))
}

fn policy_terms(args: &PolicyArgs) -> Result<PolicyTerms> {
    let rule = match args.threshold {
        Some(required) => GateRule::Threshold { required },
        None => GateRule::OwnerOnly,
    };
    let unlock_at = args.unlock_at.as_deref().map(parse_timestamp).transpose()?;
    let terms = PolicyTerms {
        rule,
        signers: args.signers.clone(),
        unlock_at,
    };
    terms
        .validate()
        .map_err(|reason| anyhow!("invalid policy: {reason}"))?;
    Ok(terms)
}

fn gate_action(command: ActionCommand) -> Result<GateAction> {
    Ok(match command {
        ActionCommand::Deposit { amount } => GateAction::Deposit { amount },
        ActionCommand::Withdraw {
            beneficiary,
            amount,
        } => GateAction::Withdraw {
            beneficiary,
            amount,
        },
        ActionCommand::Slash { amount } => GateAction::Slash { amount },
        ActionCommand::SetAllowance { beneficiary, limit } => {
            GateAction::SetAllowance { beneficiary, limit }
        }
        ActionCommand::UpdatePolicy(policy) => GateAction::UpdatePolicy {
            terms: policy_terms(&policy)?,
        },
    })
}

fn resolve_sequence(gate: &Gate, vault: &Address, explicit: Option<u64>) -> Result<u64> {
    match explicit {
        Some(sequence) => Ok(sequence),
        None => Ok(gate
            .vault(vault)
            .with_context(|| format!("failed to load vault {vault}"))?
            .sequence),
    }
}

fn resolve_pending(gate: &Gate, vault: &Address, explicit: Option<Address>) -> Result<Address> {
    if let Some(pending) = explicit {
        return Ok(pending);
    }
    gate.vault(vault)
        .with_context(|| format!("failed to load vault {vault}"))?
        .pending
        .ok_or_else(|| anyhow!("vault {vault} has no pending action"))
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn keygen(global: &GlobalArgs, args: cli::KeygenArgs) -> Result<Value> {
    let key_dir = global.data_dir.join("keys");
    std::fs::create_dir_all(&key_dir)
        .with_context(|| format!("failed to create key directory: {}", key_dir.display()))?;

    let key_path = key_dir.join(format!("{}.key", args.name));
    if key_path.exists() && !args.force {
        bail!("{} already exists; pass --force to overwrite", key_path.display());
    }

    let keypair = Keypair::generate();
    std::fs::write(&key_path, keypair.to_hex())
        .with_context(|| format!("failed to write key to {}", key_path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&key_path, std::fs::Permissions::from_mode(0o600))?;
    }

    let address = keypair.address();
    tracing::info!(%address, key_path = %key_path.display(), "keypair generated");

    Ok(json!({
        "address": address.to_base58(),
        "address_hex": address.to_hex(),
        "key_file": key_path.display().to_string(),
    }))
}

fn submit(gate: &Gate, ix: Instruction, keys: &[Keypair]) -> Result<Value> {
    let name = ix.payload.name();
    let vault = ix.vault;
    let signers: Vec<&Keypair> = keys.iter().collect();
    let signed = ix.sign(&signers).context("failed to sign instruction")?;

    let receipt = gate
        .process(&signed)
        .with_context(|| format!("{name} on vault {vault} rejected"))?;
    Ok(receipt_json(&receipt))
}

fn show(gate: &Gate, vault_address: &Address, beneficiary: Option<&Address>) -> Result<Value> {
    let vault = gate
        .vault(vault_address)
        .with_context(|| format!("failed to load vault {vault_address}"))?;
    let policy = gate
        .policy(vault_address)
        .with_context(|| format!("failed to load policy of {vault_address}"))?;
    let pending = gate.pending(vault_address)?;

    let mut view = json!({
        "vault": vault_json(vault_address, &vault),
        "policy": policy_json(&policy),
        "pending": pending.as_ref().map(pending_json),
    });

    if let Some(beneficiary) = beneficiary {
        let allowance = gate.allowance(vault_address, beneficiary)?;
        view["allowance"] = match allowance {
            Some(a) => allowance_json(&a, gate.config().allowance_period_secs),
            None => Value::Null,
        };
    }
    Ok(view)
}

fn version_json() -> Value {
    json!({
        "vault-gate": env!("CARGO_PKG_VERSION"),
        "protocol": vault_gate_protocol::config::PROTOCOL_VERSION,
    })
}

// ---------------------------------------------------------------------------
// JSON views
// ---------------------------------------------------------------------------

fn receipt_json(receipt: &Receipt) -> Value {
    let outcome = match &receipt.outcome {
        Outcome::Initialized => json!({ "status": "initialized" }),
        Outcome::Executed { action } => json!({ "status": "executed", "action": action }),
        Outcome::Pending { pending, missing } => json!({
            "status": "pending",
            "pending": pending.to_base58(),
            "missing": missing,
        }),
        Outcome::Cancelled { pending } => {
            json!({ "status": "cancelled", "pending": pending.to_base58() })
        }
        Outcome::Expired { pending } => {
            json!({ "status": "expired", "pending": pending.to_base58() })
        }
    };
    json!({
        "tx_id": receipt.tx_id,
        "vault": receipt.vault.to_base58(),
        "sequence": receipt.sequence,
        "outcome": outcome,
    })
}

fn vault_json(address: &Address, vault: &Vault) -> Value {
    json!({
        "address": address.to_base58(),
        "owner": vault.owner.to_base58(),
        "balance": vault.balance,
        "sequence": vault.sequence,
        "policy": vault.policy.to_base58(),
        "pending": vault.pending.map(|p| p.to_base58()),
    })
}

fn policy_json(policy: &GatePolicy) -> Value {
    let terms = &policy.terms;
    let threshold = match terms.rule {
        GateRule::OwnerOnly => None,
        GateRule::Threshold { required } => Some(required),
    };
    json!({
        "kind": terms.kind().to_string(),
        "threshold": threshold,
        "signers": terms.signers.iter().map(Address::to_base58).collect::<Vec<_>>(),
        "time_locked": terms.is_time_locked(),
        "unlock_at": terms.unlock_at,
    })
}

fn pending_json(pending: &PendingAction) -> Value {
    json!({
        "address": pending.address().to_base58(),
        "action": pending.action.to_string(),
        "proposer": pending.proposer.to_base58(),
        "approvals": pending.approvals.iter().map(Address::to_base58).collect::<Vec<_>>(),
        "created_sequence": pending.created_sequence,
        "expiry_sequence": pending.expiry_sequence,
    })
}

fn allowance_json(allowance: &Allowance, period_secs: i64) -> Value {
    let now = chrono::Utc::now().timestamp();
    json!({
        "beneficiary": allowance.beneficiary.to_base58(),
        "limit": allowance.limit,
        "available": allowance.available(now, period_secs),
        "last_updated": allowance.last_updated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn global(dir: &Path) -> GlobalArgs {
        GlobalArgs {
            data_dir: dir.to_path_buf(),
            expiry_window: 8,
            allowance_period: 60,
            log_format: logging::LogFormat::Json,
            log_level: "off".to_string(),
        }
    }

    #[test]
    fn timestamps_accept_seconds_and_rfc3339() {
        assert_eq!(parse_timestamp("1700000000").unwrap(), 1_700_000_000);
        assert_eq!(parse_timestamp("1970-01-01T00:01:00Z").unwrap(), 60);
        assert!(parse_timestamp("tomorrow").is_err());
    }

    #[test]
    fn policy_args_are_validated() {
        let a = Address::new([1; 32]);
        let ok = PolicyArgs {
            threshold: Some(1),
            signers: vec![a],
            unlock_at: Some("100".to_string()),
        };
        let terms = policy_terms(&ok).unwrap();
        assert_eq!(terms.rule, GateRule::Threshold { required: 1 });
        assert_eq!(terms.unlock_at, Some(100));

        let bad = PolicyArgs {
            threshold: Some(2),
            signers: vec![a],
            unlock_at: None,
        };
        assert!(policy_terms(&bad).is_err());
    }

    #[test]
    fn missing_keys_are_an_error() {
        let args = SignerArgs {
            keys: vec![],
            key_files: vec![],
        };
        assert!(load_keys(&args).is_err());
    }

    #[test]
    fn keygen_writes_a_loadable_key() {
        let dir = tempfile::tempdir().unwrap();
        let g = global(dir.path());
        let out = keygen(
            &g,
            cli::KeygenArgs {
                name: "alice".to_string(),
                force: false,
            },
        )
        .unwrap();

        let path = dir.path().join("keys").join("alice.key");
        let kp = read_key_file(&path).unwrap();
        assert_eq!(out["address"], json!(kp.address().to_base58()));

        let again = keygen(
            &g,
            cli::KeygenArgs {
                name: "alice".to_string(),
                force: false,
            },
        );
        assert!(again.is_err());
    }

    #[test]
    fn initialize_then_deposit_then_show() {
        let dir = tempfile::tempdir().unwrap();
        let g = global(dir.path());
        let owner = Keypair::from_seed(&[4; 32]);
        let vault = Vault::address_for(&owner.address(), 0);

        {
            let gate = open_gate(&g).unwrap();
            let init = submit(&gate, Instruction::initialize(owner.address(), 0), &[owner.clone()])
                .unwrap();
            assert_eq!(init["outcome"]["status"], json!("initialized"));

            let seq = resolve_sequence(&gate, &vault, None).unwrap();
            let deposit = Instruction::propose(vault, seq, GateAction::Deposit { amount: 9 });
            let receipt = submit(&gate, deposit, &[owner.clone()]).unwrap();
            assert_eq!(receipt["sequence"], json!(1));
            assert!(resolve_pending(&gate, &vault, None).is_err());
        }

        let gate = open_gate(&g).unwrap();
        let view = show(&gate, &vault, None).unwrap();
        assert_eq!(view["vault"]["balance"], json!(9));
        assert_eq!(view["policy"]["kind"], json!("owner-only"));
        assert_eq!(view["policy"]["time_locked"], json!(false));
        assert_eq!(view["pending"], Value::Null);
    }
}
