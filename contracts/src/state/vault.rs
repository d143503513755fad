//! The vault account: owner, balance, sequence, and the link to its policy
//! and outstanding pending action.

use serde::{Deserialize, Serialize};
use vault_gate_protocol::config::VAULT_SPACE;
use vault_gate_protocol::crypto::Address;

use super::layout::AccountLayout;
use super::policy::GatePolicy;
use crate::error::{GateError, GateResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    pub owner: Address,
    pub balance: u64,
    pub policy: Address,
    pub initialized: bool,
    /// Bumped by exactly one per committed instruction.
    pub sequence: u64,
    /// Address of the outstanding pending action, if any.
    pub pending: Option<Address>,
}

impl Vault {
    /// A fresh vault at sequence 0 with no funds.
    pub fn new(owner: Address, address: &Address) -> Self {
        Self {
            owner,
            balance: 0,
            policy: GatePolicy::address_for(address),
            initialized: true,
            sequence: 0,
            pending: None,
        }
    }

    /// `derive(["vault", owner, vault_id LE])`
    ///
    /// One owner may run many vaults, told apart by `vault_id`.
    pub fn address_for(owner: &Address, vault_id: u64) -> Address {
        Address::derive(&[b"vault", owner.as_ref(), &vault_id.to_le_bytes()])
    }

    /// Advance the sequence by one.
    pub fn bump_sequence(&mut self) -> GateResult<u64> {
        self.sequence = self
            .sequence
            .checked_add(1)
            .ok_or(GateError::SequenceExhausted)?;
        Ok(self.sequence)
    }

    pub fn credit(&mut self, amount: u64) -> GateResult<()> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(GateError::AmountOverflow)?;
        Ok(())
    }

    pub fn debit(&mut self, amount: u64) -> GateResult<()> {
        self.balance = self
            .balance
            .checked_sub(amount)
            .ok_or(GateError::InsufficientFunds {
                requested: amount,
                available: self.balance,
            })?;
        Ok(())
    }
}

impl AccountLayout for Vault {
    const NAME: &'static str = "Vault";
    const SPACE: usize = VAULT_SPACE;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::layout::encode;
    use vault_gate_protocol::config::ACCOUNT_HEADER_LEN;

    #[test]
    fn address_depends_on_owner_and_id() {
        let owner = Address::new([1; 32]);
        assert_eq!(Vault::address_for(&owner, 0), Vault::address_for(&owner, 0));
        assert_ne!(Vault::address_for(&owner, 0), Vault::address_for(&owner, 1));
        assert_ne!(
            Vault::address_for(&owner, 0),
            Vault::address_for(&Address::new([2; 32]), 0)
        );
    }

    #[test]
    fn balance_arithmetic_is_checked() {
        let owner = Address::new([1; 32]);
        let mut vault = Vault::new(owner, &Vault::address_for(&owner, 0));
        vault.credit(10).unwrap();
        assert!(matches!(vault.credit(u64::MAX), Err(GateError::AmountOverflow)));
        assert!(matches!(
            vault.debit(11),
            Err(GateError::InsufficientFunds { requested: 11, available: 10 })
        ));
        vault.debit(10).unwrap();
        assert_eq!(vault.balance, 0);
    }

    #[test]
    fn sequence_exhaustion() {
        let owner = Address::new([1; 32]);
        let mut vault = Vault::new(owner, &Vault::address_for(&owner, 0));
        assert_eq!(vault.bump_sequence().unwrap(), 1);
        vault.sequence = u64::MAX;
        assert!(matches!(vault.bump_sequence(), Err(GateError::SequenceExhausted)));
    }

    #[test]
    fn payload_size_with_pending() {
        let owner = Address::new([1; 32]);
        let mut vault = Vault::new(owner, &Vault::address_for(&owner, 0));
        vault.pending = Some(Address::new([3; 32]));
        let slot = encode(&vault).unwrap();
        let mut len = [0u8; 4];
        len.copy_from_slice(&slot[12..16]);
        assert_eq!(u32::from_le_bytes(len) as usize, 114);
        assert!(ACCOUNT_HEADER_LEN + 114 <= VAULT_SPACE);
    }
}
