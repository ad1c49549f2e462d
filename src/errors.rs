//! Error kinds for the Marshal 4.8 codec (distilled spec §7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarshalError {
    #[error("I/O error at offset {offset}: {source}")]
    StreamError {
        offset: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("unexpected end of stream at offset {offset}")]
    UnexpectedEnd { offset: u64 },

    #[error("bad magic header: expected 04 08, found {found:?}")]
    BadMagic { found: Vec<u8> },

    #[error("unknown tag byte {tag:#04x} ({tag_char:?}) at offset {offset}")]
    UnknownTag {
        tag: u8,
        tag_char: char,
        offset: u64,
    },

    #[error("unsupported fixnum header byte {header:#04x}")]
    BadFixnum { header: u8 },

    #[error("dangling {kind} reference: id {id}")]
    BadReference { kind: &'static str, id: u32 },

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("unsupported attribute {name:?} on {kind}")]
    UnsupportedAttribute { kind: &'static str, name: String },

    #[error("factory failed to instantiate {class_name:?}: {reason}")]
    FactoryFailure { class_name: String, reason: String },

    #[error("host call {method:?} failed: {reason}")]
    HostCallFailure { method: &'static str, reason: String },

    #[error("encode overflow: {0}")]
    EncodeOverflow(String),

    #[error("cycle detected while rendering a representation")]
    CycleDuringRender,

    #[error("nesting depth exceeded ({limit})")]
    DepthExceeded { limit: u32 },
}

pub type Result<T> = std::result::Result<T, MarshalError>;
