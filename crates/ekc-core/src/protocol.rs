//! Wire protocol: command tags and frame classification.
//!
//! Inbound frames are classified by a byte-prefix match against the known
//! command tags, in fixed priority order. Anything that matches no tag is,
//! by default, treated as a message to sign. That permissive fallback is
//! part of the wire contract; hosts that want strictness can switch the
//! policy to reject unmatched frames instead.

use thiserror::Error;

/// Tag requesting the custodian public key.
pub const PUBLIC_KEY_TAG: &[u8] = b"__public_key__";

/// Tag requesting a key-agreement operation; the 32-byte scalar follows
/// immediately after the tag.
pub const KEY_AGREEMENT_TAG: &[u8] = b"__scalarmult__";

/// Caller-supplied key-agreement scalar length.
pub const SCALAR_LEN: usize = 32;

/// Upper bound on an inbound command frame.
pub const MAX_FRAME_LEN: usize = 1024;

/// Errors produced while classifying a frame. Neither variant terminates
/// the service loop; the offending request is dropped and logged.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    MalformedFrame(&'static str),

    #[error("unknown command")]
    UnknownCommand,
}

/// What to do with a frame that matches no command tag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnknownCommandPolicy {
    /// Sign the whole frame as an arbitrary message (wire-compatible
    /// default; requires host-side access control).
    #[default]
    SignFallback,
    /// Reject the frame with [`ProtocolError::UnknownCommand`].
    Reject,
}

/// A classified command, borrowing from the inbound frame.
#[derive(Debug, PartialEq, Eq)]
pub enum Command<'a> {
    /// Return the 32-byte public key.
    PublicKey,
    /// Scalar-multiply against the caller's 32-byte value.
    KeyAgreement { scalar: [u8; SCALAR_LEN] },
    /// Sign the entire frame (not a remainder after a tag).
    Sign { message: &'a [u8] },
}

/// Classify an inbound frame.
///
/// Tags are matched in priority order: public key, key agreement, fallback.
/// Frames shorter than a tag never match it and fall through. A frame
/// carrying the key-agreement tag with fewer than [`SCALAR_LEN`] trailing
/// bytes is malformed; bytes past the scalar are ignored.
pub fn classify(
    frame: &[u8],
    policy: UnknownCommandPolicy,
) -> Result<Command<'_>, ProtocolError> {
    if frame.starts_with(PUBLIC_KEY_TAG) {
        return Ok(Command::PublicKey);
    }

    if frame.starts_with(KEY_AGREEMENT_TAG) {
        let rest = &frame[KEY_AGREEMENT_TAG.len()..];
        if rest.len() < SCALAR_LEN {
            return Err(ProtocolError::MalformedFrame(
                "key agreement scalar shorter than 32 bytes",
            ));
        }
        let mut scalar = [0u8; SCALAR_LEN];
        scalar.copy_from_slice(&rest[..SCALAR_LEN]);
        return Ok(Command::KeyAgreement { scalar });
    }

    match policy {
        UnknownCommandPolicy::SignFallback => Ok(Command::Sign { message: frame }),
        UnknownCommandPolicy::Reject => Err(ProtocolError::UnknownCommand),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_public_key_tag() {
        let cmd = classify(b"__public_key__", UnknownCommandPolicy::SignFallback).unwrap();
        assert_eq!(cmd, Command::PublicKey);
    }

    #[test]
    fn test_public_key_tag_has_priority_over_sign() {
        // A frame beginning with the tag is never signed, even though it
        // would also be a valid arbitrary message.
        let cmd = classify(
            b"__public_key__ and trailing garbage",
            UnknownCommandPolicy::SignFallback,
        )
        .unwrap();
        assert_eq!(cmd, Command::PublicKey);
    }

    #[test]
    fn test_key_agreement_extracts_scalar() {
        let mut frame = KEY_AGREEMENT_TAG.to_vec();
        frame.extend_from_slice(&[0x42u8; SCALAR_LEN]);

        let cmd = classify(&frame, UnknownCommandPolicy::SignFallback).unwrap();
        assert_eq!(
            cmd,
            Command::KeyAgreement {
                scalar: [0x42u8; SCALAR_LEN]
            }
        );
    }

    #[test]
    fn test_key_agreement_ignores_trailing_bytes() {
        let mut frame = KEY_AGREEMENT_TAG.to_vec();
        frame.extend_from_slice(&[0x42u8; SCALAR_LEN]);
        frame.extend_from_slice(b"extra");

        let cmd = classify(&frame, UnknownCommandPolicy::SignFallback).unwrap();
        assert_eq!(
            cmd,
            Command::KeyAgreement {
                scalar: [0x42u8; SCALAR_LEN]
            }
        );
    }

    #[test]
    fn test_key_agreement_short_scalar_is_malformed() {
        let mut frame = KEY_AGREEMENT_TAG.to_vec();
        frame.extend_from_slice(&[0u8; SCALAR_LEN - 1]);

        let err = classify(&frame, UnknownCommandPolicy::SignFallback).unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedFrame(_)));
    }

    #[test]
    fn test_bare_key_agreement_tag_is_malformed() {
        let err = classify(KEY_AGREEMENT_TAG, UnknownCommandPolicy::SignFallback).unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedFrame(_)));
    }

    #[test]
    fn test_short_frame_falls_through_to_sign() {
        // Shorter than any tag: must not read out of bounds, must sign.
        let cmd = classify(b"__pub", UnknownCommandPolicy::SignFallback).unwrap();
        assert_eq!(cmd, Command::Sign { message: b"__pub" });
    }

    #[test]
    fn test_arbitrary_message_signs_whole_frame() {
        let cmd = classify(b"hello", UnknownCommandPolicy::SignFallback).unwrap();
        assert_eq!(cmd, Command::Sign { message: b"hello" });
    }

    #[test]
    fn test_reject_policy_refuses_unknown() {
        let err = classify(b"hello", UnknownCommandPolicy::Reject).unwrap_err();
        assert_eq!(err, ProtocolError::UnknownCommand);
    }

    #[test]
    fn test_reject_policy_still_accepts_tagged_commands() {
        let cmd = classify(b"__public_key__", UnknownCommandPolicy::Reject).unwrap();
        assert_eq!(cmd, Command::PublicKey);
    }

    #[test]
    fn test_tag_lengths() {
        assert_eq!(PUBLIC_KEY_TAG.len(), 14);
        assert_eq!(KEY_AGREEMENT_TAG.len(), 14);
    }

    proptest! {
        #[test]
        fn prop_untagged_frames_always_sign(frame in prop::collection::vec(any::<u8>(), 0..MAX_FRAME_LEN)) {
            prop_assume!(!frame.starts_with(PUBLIC_KEY_TAG));
            prop_assume!(!frame.starts_with(KEY_AGREEMENT_TAG));

            let cmd = classify(&frame, UnknownCommandPolicy::SignFallback).unwrap();
            prop_assert_eq!(cmd, Command::Sign { message: &frame });
        }

        #[test]
        fn prop_key_agreement_round_trips_scalar(scalar in prop::array::uniform32(any::<u8>())) {
            let mut frame = KEY_AGREEMENT_TAG.to_vec();
            frame.extend_from_slice(&scalar);

            let cmd = classify(&frame, UnknownCommandPolicy::Reject).unwrap();
            prop_assert_eq!(cmd, Command::KeyAgreement { scalar });
        }
    }
}
