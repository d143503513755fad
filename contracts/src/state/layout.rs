//! # Account Layout
//!
//! Every gate account is a fixed-capacity byte slot:
//!
//! ```text
//! [0..8]    discriminator   sha256("account:<Name>")[..8]
//! [8]       schema version  ACCOUNT_SCHEMA_VERSION
//! [9..12]   reserved        zero
//! [12..16]  payload length  u32 little-endian
//! [16..]    payload         bincode (fixint, little-endian)
//! [..SPACE] padding         zero
//! ```
//!
//! Loading fails closed. A wrong discriminator, a different version, a slot
//! of the wrong size, non-zero reserved or padding bytes, or a payload that
//! does not decode exactly are all errors; nothing is defaulted.

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;

use vault_gate_protocol::config::{ACCOUNT_HEADER_LEN, ACCOUNT_SCHEMA_VERSION};
use vault_gate_protocol::crypto::{sha256_array, Address};
use vault_gate_protocol::storage::{Ledger, WriteSet};

use crate::error::{GateError, GateResult};

/// A typed account stored in a fixed-capacity slot.
pub trait AccountLayout: Serialize + DeserializeOwned {
    /// Type name hashed into the discriminator.
    const NAME: &'static str;
    /// Slot capacity in bytes, header included. Never changes.
    const SPACE: usize;

    fn discriminator() -> [u8; 8] {
        let digest = sha256_array(format!("account:{}", Self::NAME).as_bytes());
        let mut disc = [0u8; 8];
        disc.copy_from_slice(&digest[..8]);
        disc
    }
}

pub(crate) fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .reject_trailing_bytes()
}

/// Encode an account into a full slot of `T::SPACE` bytes.
pub fn encode<T: AccountLayout>(account: &T) -> GateResult<Vec<u8>> {
    let payload = codec()
        .serialize(account)
        .map_err(|e| GateError::Serialization(e.to_string()))?;

    let needed = ACCOUNT_HEADER_LEN + payload.len();
    if needed > T::SPACE {
        return Err(GateError::SerializationOverflow {
            account: T::NAME,
            needed,
            capacity: T::SPACE,
        });
    }

    let mut slot = vec![0u8; T::SPACE];
    slot[0..8].copy_from_slice(&T::discriminator());
    slot[8] = ACCOUNT_SCHEMA_VERSION;
    slot[12..16].copy_from_slice(&(payload.len() as u32).to_le_bytes());
    slot[ACCOUNT_HEADER_LEN..needed].copy_from_slice(&payload);
    Ok(slot)
}

/// Decode a slot read from `address`.
pub fn decode<T: AccountLayout>(address: &Address, data: &[u8]) -> GateResult<T> {
    let malformed = |reason: String| GateError::MalformedAccount {
        address: *address,
        reason,
    };

    if data.len() < ACCOUNT_HEADER_LEN {
        return Err(malformed(format!("{} bytes is shorter than the header", data.len())));
    }
    if data[0..8] != T::discriminator() {
        return Err(GateError::AccountTypeMismatch {
            address: *address,
            expected: T::NAME,
        });
    }
    if data[8] != ACCOUNT_SCHEMA_VERSION {
        return Err(GateError::UnsupportedVersion {
            address: *address,
            found: data[8],
            supported: ACCOUNT_SCHEMA_VERSION,
        });
    }
    if data.len() != T::SPACE {
        return Err(malformed(format!(
            "slot is {} bytes, expected {}",
            data.len(),
            T::SPACE
        )));
    }
    if data[9..12] != [0u8; 3] {
        return Err(malformed("reserved header bytes are set".to_string()));
    }

    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&data[12..16]);
    let payload_len = u32::from_le_bytes(len_bytes) as usize;
    let end = ACCOUNT_HEADER_LEN
        .checked_add(payload_len)
        .filter(|end| *end <= data.len())
        .ok_or_else(|| malformed(format!("payload length {payload_len} overruns the slot")))?;

    if data[end..].iter().any(|b| *b != 0) {
        return Err(malformed("non-zero padding after payload".to_string()));
    }

    codec()
        .deserialize(&data[ACCOUNT_HEADER_LEN..end])
        .map_err(|e| malformed(e.to_string()))
}

/// Load and decode the account at `address`.
pub fn load<T: AccountLayout, L: Ledger + ?Sized>(ledger: &L, address: &Address) -> GateResult<T> {
    load_optional(ledger, address)?.ok_or(GateError::AccountNotFound(*address))
}

/// Like [`load`], but a missing account is `None` instead of an error.
pub fn load_optional<T: AccountLayout, L: Ledger + ?Sized>(
    ledger: &L,
    address: &Address,
) -> GateResult<Option<T>> {
    match ledger.read(address)? {
        Some(data) => decode(address, &data).map(Some),
        None => Ok(None),
    }
}

/// Encode `account` and stage it for the next commit.
pub fn persist<T: AccountLayout>(
    writes: &mut WriteSet,
    address: Address,
    account: &T,
) -> GateResult<()> {
    writes.put(address, encode(account)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use vault_gate_protocol::storage::MemoryLedger;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Probe {
        value: u64,
        blob: Vec<u8>,
    }

    impl AccountLayout for Probe {
        const NAME: &'static str = "Probe";
        const SPACE: usize = 64;
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Other {
        value: u64,
    }

    impl AccountLayout for Other {
        const NAME: &'static str = "Other";
        const SPACE: usize = 64;
    }

    fn addr() -> Address {
        Address::new([5u8; 32])
    }

    #[test]
    fn encode_decode_roundtrip_fills_slot() {
        let probe = Probe {
            value: 42,
            blob: vec![1, 2, 3],
        };
        let slot = encode(&probe).unwrap();
        assert_eq!(slot.len(), Probe::SPACE);
        assert_eq!(slot[8], ACCOUNT_SCHEMA_VERSION);
        assert_eq!(decode::<Probe>(&addr(), &slot).unwrap(), probe);
    }

    #[test]
    fn oversized_payload_overflows() {
        let probe = Probe {
            value: 1,
            blob: vec![0xAA; 64],
        };
        assert!(matches!(
            encode(&probe),
            Err(GateError::SerializationOverflow { account: "Probe", capacity: 64, .. })
        ));
    }

    #[test]
    fn wrong_discriminator_is_type_mismatch() {
        let slot = encode(&Other { value: 1 }).unwrap();
        assert!(matches!(
            decode::<Probe>(&addr(), &slot),
            Err(GateError::AccountTypeMismatch { expected: "Probe", .. })
        ));
    }

    #[test]
    fn other_version_is_rejected() {
        let mut slot = encode(&Probe { value: 1, blob: vec![] }).unwrap();
        slot[8] = ACCOUNT_SCHEMA_VERSION + 1;
        assert!(matches!(
            decode::<Probe>(&addr(), &slot),
            Err(GateError::UnsupportedVersion { found, .. }) if found == ACCOUNT_SCHEMA_VERSION + 1
        ));
    }

    #[test]
    fn dirty_padding_and_bad_length_fail_closed() {
        let clean = encode(&Probe { value: 1, blob: vec![] }).unwrap();

        let mut dirty = clean.clone();
        *dirty.last_mut().unwrap() = 1;
        assert!(matches!(
            decode::<Probe>(&addr(), &dirty),
            Err(GateError::MalformedAccount { .. })
        ));

        let mut overrun = clean.clone();
        overrun[12..16].copy_from_slice(&1000u32.to_le_bytes());
        assert!(matches!(
            decode::<Probe>(&addr(), &overrun),
            Err(GateError::MalformedAccount { .. })
        ));

        assert!(matches!(
            decode::<Probe>(&addr(), &clean[..10]),
            Err(GateError::MalformedAccount { .. })
        ));
    }

    #[test]
    fn load_missing_account() {
        let ledger = MemoryLedger::new();
        assert!(matches!(
            load::<Probe, _>(&ledger, &addr()),
            Err(GateError::AccountNotFound(a)) if a == addr()
        ));
        assert!(load_optional::<Probe, _>(&ledger, &addr()).unwrap().is_none());
    }

    #[test]
    fn persist_then_load() {
        let ledger = MemoryLedger::new();
        let mut writes = WriteSet::new();
        let probe = Probe {
            value: 9,
            blob: vec![9; 4],
        };
        persist(&mut writes, addr(), &probe).unwrap();
        ledger.commit(writes).unwrap();
        assert_eq!(load::<Probe, _>(&ledger, &addr()).unwrap(), probe);
    }
}
