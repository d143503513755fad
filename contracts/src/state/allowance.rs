//! Per-beneficiary withdrawal allowance.
//!
//! An allowance caps how much one beneficiary may withdraw. It is refreshed
//! by every withdrawal and by `SetAllowance`; one left untouched for longer
//! than the allowance period has lapsed and reads as zero.

use serde::{Deserialize, Serialize};
use vault_gate_protocol::config::ALLOWANCE_SPACE;
use vault_gate_protocol::crypto::Address;

use super::layout::AccountLayout;
use crate::error::{GateError, GateResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allowance {
    pub vault: Address,
    pub beneficiary: Address,
    pub limit: u64,
    pub last_updated: i64,
}

impl Allowance {
    /// `derive(["allowance", vault, beneficiary])`
    pub fn address_for(vault: &Address, beneficiary: &Address) -> Address {
        Address::derive(&[b"allowance", vault.as_ref(), beneficiary.as_ref()])
    }

    /// The limit still usable at `now`.
    pub fn available(&self, now: i64, period_secs: i64) -> u64 {
        if now.saturating_sub(self.last_updated) > period_secs {
            0
        } else {
            self.limit
        }
    }

    /// Spend `amount` out of the live limit and stamp the update time.
    pub fn spend(&mut self, amount: u64, now: i64, period_secs: i64) -> GateResult<()> {
        let available = self.available(now, period_secs);
        self.limit = available
            .checked_sub(amount)
            .ok_or(GateError::AllowanceExceeded {
                requested: amount,
                available,
            })?;
        self.last_updated = now;
        Ok(())
    }
}

impl AccountLayout for Allowance {
    const NAME: &'static str = "Allowance";
    const SPACE: usize = ALLOWANCE_SPACE;
}
