//! # Proof Codecs (§4.3)
//!
//! Conversions between the full [`MerkleProof`] form and its compact,
//! serialized-v1, binary-envelope, and QR-pointer wire forms. All
//! full-form round-trips (`full -> compact -> full`, `full -> v1 -> full`,
//! `compact -> binary -> compact`) are pure functions and must be identities
//! (§4.3 round-trip laws, §8 property 5).

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use ledger_types::{CompactProof, Direction, Hash, MerkleProof, QrPayload, SerializedProofV1};
use thiserror::Error;

const PROOF_VERSION: u8 = 1;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    #[error("unsupported proof version {0}; only v{PROOF_VERSION} is understood")]
    UnsupportedVersion(u8),
    #[error("sibling pool string length {0} is not a multiple of 64")]
    MisalignedSiblingPool(usize),
    #[error("directions length {directions} does not match sibling count {siblings}")]
    DirectionCountMismatch { directions: usize, siblings: usize },
    #[error("invalid direction bit `{0}`, expected '0' or '1'")]
    InvalidDirectionBit(char),
    #[error("invalid hash in proof: {0}")]
    InvalidHash(#[from] ledger_types::HashShapeError),
    #[error("truncated binary envelope at offset {0}")]
    TruncatedEnvelope(usize),
    #[error("invalid base64 encoding: {0}")]
    InvalidBase64(String),
}

// ---------------------------------------------------------------------------
// Full <-> Compact
// ---------------------------------------------------------------------------

pub fn full_to_compact(proof: &MerkleProof) -> CompactProof {
    let p = proof.proof.iter().map(|h| h.as_str()).collect::<String>();
    let d = proof
        .directions
        .iter()
        .map(|dir| dir.as_bit())
        .collect::<String>();
    CompactProof {
        v: PROOF_VERSION,
        l: proof.leaf.clone(),
        r: proof.root.clone(),
        i: proof.index,
        p,
        d,
    }
}

pub fn compact_to_full(compact: &CompactProof) -> Result<MerkleProof, CodecError> {
    if compact.v != PROOF_VERSION {
        return Err(CodecError::UnsupportedVersion(compact.v));
    }
    if compact.p.len() % 64 != 0 {
        return Err(CodecError::MisalignedSiblingPool(compact.p.len()));
    }
    let siblings = compact
        .p
        .as_bytes()
        .chunks(64)
        .map(|chunk| Hash::from_hex(std::str::from_utf8(chunk).unwrap()))
        .collect::<Result<Vec<_>, _>>()?;

    if compact.d.chars().count() != siblings.len() {
        return Err(CodecError::DirectionCountMismatch {
            directions: compact.d.chars().count(),
            siblings: siblings.len(),
        });
    }
    let directions = compact
        .d
        .chars()
        .map(|c| Direction::from_bit(c).ok_or(CodecError::InvalidDirectionBit(c)))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(MerkleProof {
        leaf: compact.l.clone(),
        index: compact.i,
        proof: siblings,
        directions,
        root: compact.r.clone(),
    })
}

// ---------------------------------------------------------------------------
// Full <-> Serialized v1
// ---------------------------------------------------------------------------

pub fn full_to_serialized_v1(proof: &MerkleProof) -> SerializedProofV1 {
    SerializedProofV1 {
        v: PROOF_VERSION,
        l: proof.leaf.clone(),
        i: proof.index,
        p: proof.proof.clone(),
        d: proof.directions.iter().map(|d| d.as_bit() as u8 - b'0').collect(),
        r: proof.root.clone(),
    }
}

pub fn serialized_v1_to_full(serialized: &SerializedProofV1) -> Result<MerkleProof, CodecError> {
    if serialized.v != PROOF_VERSION {
        return Err(CodecError::UnsupportedVersion(serialized.v));
    }
    if serialized.p.len() != serialized.d.len() {
        return Err(CodecError::DirectionCountMismatch {
            directions: serialized.d.len(),
            siblings: serialized.p.len(),
        });
    }
    let directions = serialized
        .d
        .iter()
        .map(|&bit| match bit {
            0 => Ok(Direction::Left),
            1 => Ok(Direction::Right),
            other => Err(CodecError::InvalidDirectionBit((b'0' + other.min(9)) as char)),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(MerkleProof {
        leaf: serialized.l.clone(),
        index: serialized.i,
        proof: serialized.p.clone(),
        directions,
        root: serialized.r.clone(),
    })
}

// ---------------------------------------------------------------------------
// Compact <-> Binary envelope
// ---------------------------------------------------------------------------
//
// A CBOR-like length-prefixed sequence of byte strings plus a single
// integer, as named in §4.3. Layout (all multi-byte integers little-endian):
//
//   u8  version
//   [len:u32, bytes]  leaf        (32 bytes)
//   [len:u32, bytes]  root        (32 bytes)
//   u64 index
//   u32 sibling_count
//   sibling_count * [len:u32, bytes]   (32 bytes each)
//   [len:u32, bytes]  direction bits, one byte per direction ('0'/'1')

pub fn compact_to_binary_envelope(compact: &CompactProof) -> Result<Vec<u8>, CodecError> {
    let full = compact_to_full(compact)?;
    let mut buf = Vec::new();
    buf.push(compact.v);
    write_bytes(&mut buf, full.leaf.as_str().as_bytes());
    write_bytes(&mut buf, full.root.as_str().as_bytes());
    buf.extend_from_slice(&full.index.to_le_bytes());
    buf.extend_from_slice(&(full.proof.len() as u32).to_le_bytes());
    for sibling in &full.proof {
        write_bytes(&mut buf, sibling.as_str().as_bytes());
    }
    let direction_bytes: Vec<u8> = full.directions.iter().map(|d| d.as_bit() as u8).collect();
    write_bytes(&mut buf, &direction_bytes);
    Ok(buf)
}

pub fn binary_envelope_to_compact(bytes: &[u8]) -> Result<CompactProof, CodecError> {
    let mut cursor = 0usize;
    let version = read_u8(bytes, &mut cursor)?;
    if version != PROOF_VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }
    let leaf_bytes = read_bytes(bytes, &mut cursor)?;
    let root_bytes = read_bytes(bytes, &mut cursor)?;
    let index = read_u64(bytes, &mut cursor)?;
    let sibling_count = read_u32(bytes, &mut cursor)? as usize;

    let mut proof_hex = String::with_capacity(sibling_count * 64);
    for _ in 0..sibling_count {
        let sibling_bytes = read_bytes(bytes, &mut cursor)?;
        proof_hex.push_str(
            std::str::from_utf8(&sibling_bytes).map_err(|_| CodecError::TruncatedEnvelope(cursor))?,
        );
    }
    let direction_bytes = read_bytes(bytes, &mut cursor)?;
    let directions: String = direction_bytes.iter().map(|&b| b as char).collect();

    Ok(CompactProof {
        v: version,
        l: Hash::from_hex(
            std::str::from_utf8(&leaf_bytes).map_err(|_| CodecError::TruncatedEnvelope(0))?,
        )?,
        r: Hash::from_hex(
            std::str::from_utf8(&root_bytes).map_err(|_| CodecError::TruncatedEnvelope(0))?,
        )?,
        i: index,
        p: proof_hex,
        d: directions,
    })
}

pub fn to_base64url(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn from_base64url(s: &str) -> Result<Vec<u8>, CodecError> {
    URL_SAFE_NO_PAD
        .decode(s)
        .map_err(|e| CodecError::InvalidBase64(e.to_string()))
}

fn write_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    buf.extend_from_slice(bytes);
}

fn read_u8(bytes: &[u8], cursor: &mut usize) -> Result<u8, CodecError> {
    let b = *bytes.get(*cursor).ok_or(CodecError::TruncatedEnvelope(*cursor))?;
    *cursor += 1;
    Ok(b)
}

fn read_u32(bytes: &[u8], cursor: &mut usize) -> Result<u32, CodecError> {
    let slice = bytes
        .get(*cursor..*cursor + 4)
        .ok_or(CodecError::TruncatedEnvelope(*cursor))?;
    *cursor += 4;
    Ok(u32::from_le_bytes(slice.try_into().unwrap()))
}

fn read_u64(bytes: &[u8], cursor: &mut usize) -> Result<u64, CodecError> {
    let slice = bytes
        .get(*cursor..*cursor + 8)
        .ok_or(CodecError::TruncatedEnvelope(*cursor))?;
    *cursor += 8;
    Ok(u64::from_le_bytes(slice.try_into().unwrap()))
}

fn read_bytes(bytes: &[u8], cursor: &mut usize) -> Result<Vec<u8>, CodecError> {
    let len = read_u32(bytes, cursor)? as usize;
    let slice = bytes
        .get(*cursor..*cursor + len)
        .ok_or(CodecError::TruncatedEnvelope(*cursor))?;
    *cursor += len;
    Ok(slice.to_vec())
}

// ---------------------------------------------------------------------------
// QR payload (pointer, not a proof carrier)
// ---------------------------------------------------------------------------

pub fn build_qr_payload(
    ledger_id: impl Into<String>,
    entry_id: impl Into<String>,
    root_hash: Hash,
    verify_base_url: &str,
) -> QrPayload {
    let ledger_id = ledger_id.into();
    let entry_id = entry_id.into();
    let verify_url = format!("{verify_base_url}/verify?ledger={ledger_id}&entry={entry_id}");
    QrPayload {
        kind: "veilchain_proof".to_string(),
        version: PROOF_VERSION,
        ledger_id,
        entry_id,
        root_hash,
        verify_url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merkle::MerkleTree;

    fn sample_proof() -> MerkleProof {
        let mut tree = MerkleTree::new();
        for n in 1u8..=5 {
            tree.append(Hash::from_hex_unchecked(hex::encode([n; 32])));
        }
        tree.proof(2).unwrap()
    }

    #[test]
    fn full_compact_round_trip_is_identity() {
        let full = sample_proof();
        let compact = full_to_compact(&full);
        let back = compact_to_full(&compact).unwrap();
        assert_eq!(full, back);
    }

    #[test]
    fn full_serialized_v1_round_trip_is_identity() {
        let full = sample_proof();
        let serialized = full_to_serialized_v1(&full);
        let back = serialized_v1_to_full(&serialized).unwrap();
        assert_eq!(full, back);
    }

    #[test]
    fn compact_binary_round_trip_is_identity() {
        let full = sample_proof();
        let compact = full_to_compact(&full);
        let binary = compact_to_binary_envelope(&compact).unwrap();
        let back = binary_envelope_to_compact(&binary).unwrap();
        assert_eq!(compact, back);
    }

    #[test]
    fn binary_envelope_survives_base64_wrapping() {
        let full = sample_proof();
        let compact = full_to_compact(&full);
        let binary = compact_to_binary_envelope(&compact).unwrap();
        let wrapped = to_base64url(&binary);
        let unwrapped = from_base64url(&wrapped).unwrap();
        assert_eq!(binary, unwrapped);
        let back = binary_envelope_to_compact(&unwrapped).unwrap();
        assert_eq!(compact, back);
    }

    #[test]
    fn unknown_version_is_rejected_not_best_effort_decoded() {
        let mut compact = full_to_compact(&sample_proof());
        compact.v = 99;
        assert!(matches!(
            compact_to_full(&compact),
            Err(CodecError::UnsupportedVersion(99))
        ));
    }

    #[test]
    fn qr_payload_is_a_pointer_not_a_proof() {
        let root = Hash::from_hex_unchecked(hex::encode([7u8; 32]));
        let qr = build_qr_payload("ledger-1", "entry-1", root.clone(), "https://verify.example");
        assert_eq!(qr.kind, "veilchain_proof");
        assert_eq!(qr.root_hash, root);
        assert!(qr.verify_url.contains("ledger-1"));
    }
}
