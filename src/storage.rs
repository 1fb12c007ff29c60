//! Non-volatile storage for the single stored credential.
//!
//! The credential uses A/B double-buffering so an update is never observed
//! half-written: a power loss during a write leaves the previous slot intact.
//!
//! Slot layout (little-endian):
//!   [4 bytes: magic] [4 bytes: CRC32 of sequence + digits]
//!   [4 bytes: sequence] [PASS_LEN bytes: digits]
//!
//! On write: always write to the slot with the lower (or invalid) sequence
//! number, then read it back.
//! On read: use the slot with the higher sequence number whose magic and CRC
//! check out. A medium with no valid slot reads as the all-zero credential.
//! If either slot cannot be read at all, `load` and `save` both fail.
//!
//! Nothing is cached: every `load` goes to the medium, so a change made by
//! another path is always authoritative. On flash, the two slots must sit in
//! different erase sectors.

use core::fmt;

use embedded_storage::{ReadStorage, Storage};
use zeroize::Zeroize;

use crate::config::PASS_LEN;
use crate::credential::Credential;

const STORAGE_MAGIC: u32 = 0x444C_434B; // "DLCK"

const HEADER_LEN: usize = 12;
pub const SLOT_LEN: usize = HEADER_LEN + PASS_LEN;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageError {
    /// A slot could not be read from the medium.
    Read,
    Write,
    /// The slot read back after a write did not hold what was written.
    Verify,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Read => f.write_str("storage read failed"),
            StorageError::Write => f.write_str("storage write failed"),
            StorageError::Verify => f.write_str("storage verify failed"),
        }
    }
}

/// Reflected CRC-32 (ISO-HDLC polynomial, as used by zip and Ethernet) over a
/// slot payload.
pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ 0xEDB8_8320
            } else {
                crc >> 1
            };
        }
    }
    !crc
}

enum SlotRead {
    Valid { sequence: u32, credential: Credential },
    Invalid,
    Failed,
}

/// Passive medium for the stored credential.
pub struct CredentialStore<S> {
    storage: S,
    slot_a: u32,
    slot_b: u32,
}

impl<S: Storage> CredentialStore<S> {
    /// `slot_a` and `slot_b` are byte offsets of the two slots on `storage`.
    pub fn new(storage: S, slot_a: u32, slot_b: u32) -> Self {
        if slot_a.abs_diff(slot_b) < SLOT_LEN as u32 {
            log::error!("storage: slots at 0x{:X} and 0x{:X} overlap", slot_a, slot_b);
        }
        Self {
            storage,
            slot_a,
            slot_b,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    fn read_slot(&mut self, offset: u32) -> SlotRead {
        let mut buf = [0u8; SLOT_LEN];
        if self.storage.read(offset, &mut buf).is_err() {
            log::warn!("storage: read of slot at 0x{:X} failed", offset);
            return SlotRead::Failed;
        }

        let magic = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        if magic != STORAGE_MAGIC {
            return SlotRead::Invalid;
        }

        let stored_crc = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
        let data_crc = crc32(&buf[8..]);
        if data_crc != stored_crc {
            log::warn!(
                "storage: slot at 0x{:X} CRC mismatch (stored={:08X}, computed={:08X})",
                offset,
                stored_crc,
                data_crc
            );
            return SlotRead::Invalid;
        }

        let sequence = u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]);
        let mut digits = [0u8; PASS_LEN];
        digits.copy_from_slice(&buf[HEADER_LEN..]);
        buf.zeroize();

        SlotRead::Valid {
            sequence,
            credential: Credential::new(digits),
        }
    }

    /// Read the current stored credential from the medium.
    pub fn load(&mut self) -> Result<Credential, StorageError> {
        let slot_a = self.read_slot(self.slot_a);
        let slot_b = self.read_slot(self.slot_b);

        match (slot_a, slot_b) {
            // Either slot may hold the newest credential; never guess.
            (SlotRead::Failed, _) | (_, SlotRead::Failed) => Err(StorageError::Read),
            (
                SlotRead::Valid { sequence: seq_a, credential: a },
                SlotRead::Valid { sequence: seq_b, credential: b },
            ) => {
                if seq_b > seq_a {
                    log::debug!("storage: using slot B (seq={})", seq_b);
                    Ok(b)
                } else {
                    log::debug!("storage: using slot A (seq={})", seq_a);
                    Ok(a)
                }
            }
            (SlotRead::Valid { sequence, credential }, _) => {
                log::debug!("storage: using slot A (seq={}), slot B invalid", sequence);
                Ok(credential)
            }
            (_, SlotRead::Valid { sequence, credential }) => {
                log::debug!("storage: using slot B (seq={}), slot A invalid", sequence);
                Ok(credential)
            }
            _ => {
                log::info!("storage: no credential stored yet");
                Ok(Credential::blank())
            }
        }
    }

    fn slot_sequence(&mut self, offset: u32) -> Result<Option<u32>, StorageError> {
        match self.read_slot(offset) {
            SlotRead::Valid { sequence, .. } => Ok(Some(sequence)),
            SlotRead::Invalid => Ok(None),
            SlotRead::Failed => Err(StorageError::Read),
        }
    }

    /// Persist `credential` into the older slot.
    pub fn save(&mut self, credential: &Credential) -> Result<(), StorageError> {
        // An unreadable slot may be the newer one
        let seq_a = self.slot_sequence(self.slot_a)?;
        let seq_b = self.slot_sequence(self.slot_b)?;

        // Write to the slot with the lower sequence number (older data).
        // If both are invalid (fresh medium), start with slot A.
        let (target, slot_name) = match (seq_a, seq_b) {
            (Some(a), Some(b)) if b < a => (self.slot_b, "B"),
            (Some(_), Some(_)) => (self.slot_a, "A"),
            (None, Some(_)) => (self.slot_a, "A"),
            (Some(_), None) => (self.slot_b, "B"),
            (None, None) => (self.slot_a, "A"),
        };
        let sequence = seq_a.max(seq_b).unwrap_or(0).saturating_add(1);

        let mut buf = [0u8; SLOT_LEN];
        buf[0..4].copy_from_slice(&STORAGE_MAGIC.to_le_bytes());
        buf[8..12].copy_from_slice(&sequence.to_le_bytes());
        buf[HEADER_LEN..].copy_from_slice(credential.digits());
        let data_crc = crc32(&buf[8..]);
        buf[4..8].copy_from_slice(&data_crc.to_le_bytes());

        let write_result = self.storage.write(target, &buf);
        buf.zeroize();
        if write_result.is_err() {
            log::error!("storage: write to slot {} failed", slot_name);
            return Err(StorageError::Write);
        }

        match self.read_slot(target) {
            SlotRead::Valid {
                sequence: written,
                credential: ref stored,
            } if written == sequence && stored.matches(credential) => {
                log::info!("storage: credential saved to slot {} (seq={})", slot_name, sequence);
                Ok(())
            }
            _ => {
                log::error!("storage: slot {} did not verify after write", slot_name);
                Err(StorageError::Verify)
            }
        }
    }
}
