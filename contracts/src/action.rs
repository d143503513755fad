//! # Gate Actions
//!
//! The closed set of operations a vault can be asked to perform, and their
//! effect once the policy allows them. Execution only stages writes; the
//! dispatcher commits them together with the vault's sequence bump.

use std::fmt;

use serde::{Deserialize, Serialize};
use vault_gate_protocol::crypto::Address;
use vault_gate_protocol::storage::{Ledger, WriteSet};

use crate::dispatcher::GateConfig;
use crate::error::{GateError, GateResult};
use crate::state::{load_optional, persist, Allowance, GatePolicy, PolicyTerms, Vault};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateAction {
    /// Credit the vault balance.
    Deposit { amount: u64 },
    /// Pay `amount` out to `beneficiary`, bounded by balance and the
    /// beneficiary's live allowance.
    Withdraw { beneficiary: Address, amount: u64 },
    /// Burn `amount` from the vault balance.
    Slash { amount: u64 },
    /// Create or overwrite a beneficiary's allowance. A zero limit revokes.
    SetAllowance { beneficiary: Address, limit: u64 },
    /// Replace the rule and signer set. The unlock must stay the same.
    UpdatePolicy { terms: PolicyTerms },
}

impl GateAction {
    pub fn name(&self) -> &'static str {
        match self {
            GateAction::Deposit { .. } => "deposit",
            GateAction::Withdraw { .. } => "withdraw",
            GateAction::Slash { .. } => "slash",
            GateAction::SetAllowance { .. } => "set_allowance",
            GateAction::UpdatePolicy { .. } => "update_policy",
        }
    }
}

impl fmt::Display for GateAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateAction::Deposit { amount } | GateAction::Slash { amount } => {
                write!(f, "{} {amount}", self.name())
            }
            GateAction::Withdraw { beneficiary, amount } => {
                write!(f, "withdraw {amount} to {beneficiary}")
            }
            GateAction::SetAllowance { beneficiary, limit } => {
                write!(f, "set_allowance {beneficiary} = {limit}")
            }
            GateAction::UpdatePolicy { terms } => {
                write!(f, "update_policy to {} of {} signers", terms.kind(), terms.signers.len())
            }
        }
    }
}

/// Everything an allowed action may read or stage.
pub(crate) struct ExecutionContext<'a, L: Ledger + ?Sized> {
    pub ledger: &'a L,
    pub vault_address: Address,
    pub vault: &'a mut Vault,
    pub writes: &'a mut WriteSet,
    pub now: i64,
    pub config: &'a GateConfig,
}

/// Apply an allowed action. The vault record itself is staged by the
/// caller after this returns.
pub(crate) fn execute<L: Ledger + ?Sized>(
    action: &GateAction,
    ctx: ExecutionContext<'_, L>,
) -> GateResult<()> {
    match action {
        GateAction::Deposit { amount } => ctx.vault.credit(*amount),

        GateAction::Withdraw {
            beneficiary,
            amount,
        } => {
            ctx.vault.debit(*amount)?;

            let address = Allowance::address_for(&ctx.vault_address, beneficiary);
            let mut allowance = load_optional::<Allowance, _>(ctx.ledger, &address)?.ok_or(
                GateError::AllowanceExceeded {
                    requested: *amount,
                    available: 0,
                },
            )?;
            allowance.spend(*amount, ctx.now, ctx.config.allowance_period_secs)?;
            persist(ctx.writes, address, &allowance)
        }

        GateAction::Slash { amount } => ctx.vault.debit(*amount),

        GateAction::SetAllowance { beneficiary, limit } => {
            let allowance = Allowance {
                vault: ctx.vault_address,
                beneficiary: *beneficiary,
                limit: *limit,
                last_updated: ctx.now,
            };
            persist(
                ctx.writes,
                Allowance::address_for(&ctx.vault_address, beneficiary),
                &allowance,
            )
        }

        GateAction::UpdatePolicy { terms } => {
            terms.validate().map_err(GateError::InvalidPolicy)?;
            let policy = GatePolicy {
                vault: ctx.vault_address,
                terms: terms.clone(),
            };
            persist(ctx.writes, ctx.vault.policy, &policy)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::decode;
    use vault_gate_protocol::storage::{AccountWrite, MemoryLedger};

    fn setup() -> (MemoryLedger, Address, Vault) {
        let owner = Address::new([1; 32]);
        let address = Vault::address_for(&owner, 0);
        (MemoryLedger::new(), address, Vault::new(owner, &address))
    }

    fn run(
        ledger: &MemoryLedger,
        address: Address,
        vault: &mut Vault,
        writes: &mut WriteSet,
        action: GateAction,
        now: i64,
    ) -> GateResult<()> {
        let config = GateConfig::default();
        execute(
            &action,
            ExecutionContext {
                ledger,
                vault_address: address,
                vault,
                writes,
                now,
                config: &config,
            },
        )
    }

    #[test]
    fn names_and_display() {
        assert_eq!(GateAction::Slash { amount: 3 }.name(), "slash");
        assert_eq!(GateAction::Deposit { amount: 5 }.to_string(), "deposit 5");
    }

    #[test]
    fn deposit_then_slash() {
        let (ledger, address, mut vault) = setup();
        let mut writes = WriteSet::new();
        run(&ledger, address, &mut vault, &mut writes, GateAction::Deposit { amount: 100 }, 0).unwrap();
        run(&ledger, address, &mut vault, &mut writes, GateAction::Slash { amount: 30 }, 0).unwrap();
        assert_eq!(vault.balance, 70);
        assert!(writes.is_empty());
    }

    #[test]
    fn withdraw_without_allowance_is_refused() {
        let (ledger, address, mut vault) = setup();
        vault.balance = 50;
        let mut writes = WriteSet::new();
        let err = run(
            &ledger,
            address,
            &mut vault,
            &mut writes,
            GateAction::Withdraw {
                beneficiary: Address::new([7; 32]),
                amount: 10,
            },
            0,
        )
        .unwrap_err();
        assert!(matches!(err, GateError::AllowanceExceeded { available: 0, .. }));
    }

    #[test]
    fn set_allowance_stages_record() {
        let (ledger, address, mut vault) = setup();
        let beneficiary = Address::new([7; 32]);
        let mut writes = WriteSet::new();
        run(
            &ledger,
            address,
            &mut vault,
            &mut writes,
            GateAction::SetAllowance {
                beneficiary,
                limit: 25,
            },
            42,
        )
        .unwrap();

        let slot = Allowance::address_for(&address, &beneficiary);
        match writes.get(&slot) {
            Some(AccountWrite::Put(bytes)) => {
                let allowance: Allowance = decode(&slot, bytes).unwrap();
                assert_eq!(allowance.limit, 25);
                assert_eq!(allowance.last_updated, 42);
            }
            other => panic!("unexpected write: {other:?}"),
        }
    }

    #[test]
    fn update_policy_revalidates() {
        let (ledger, address, mut vault) = setup();
        let mut writes = WriteSet::new();
        let bad = PolicyTerms::threshold(2, vec![Address::new([2; 32])]);
        assert!(matches!(
            run(&ledger, address, &mut vault, &mut writes, GateAction::UpdatePolicy { terms: bad }, 0),
            Err(GateError::InvalidPolicy(_))
        ));
        assert!(writes.is_empty());
    }
}
