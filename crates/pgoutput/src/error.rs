//! Decoder error kinds.
//!
//! These are values, not faults: apart from [`DecodeError::EmptyInput`],
//! which the dispatcher reports as a [`crate::ChangeEvent::Error`], every
//! kind here describes a degradation the decoder recovers from on its own.
//! They exist so diagnostics and logs name the condition consistently.

/// Error type for change-message decoding.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// A zero-length buffer was handed to the dispatcher.
    #[error("empty input buffer")]
    EmptyInput,

    /// A fixed-offset or length-prefixed read would exceed the remaining
    /// bytes; the component returns what it decoded so far.
    #[error("buffer truncated at byte {offset}")]
    TruncatedBuffer { offset: usize },

    /// The one-byte message tag selects no known decoder.
    #[error("unknown message tag 0x{tag:02x}")]
    UnknownMessageTag { tag: u8 },

    /// A tuple column carried an unrecognized kind tag.
    #[error("unknown column tag 0x{code:02x}")]
    UnknownColumnTag { code: u8 },

    /// Tuple mapping was requested for a relation id the registry has not
    /// seen; the mapping degrades to a positional list.
    #[error("relation {relation_id} not announced on this session")]
    UnresolvedRelation { relation_id: u32 },

    /// Binary coercion found no scalar interpretation and fell back to hex.
    #[error("binary payload of {len} bytes fell back to hex")]
    AmbiguousCoercion { len: usize },
}
