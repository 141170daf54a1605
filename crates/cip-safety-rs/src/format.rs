//! Describes the wire format of a safety connection.
//!
//! The four independent axes are kept as separate enums so that every
//! combination is valid by construction and dispatch is an exhaustive match.

use crate::types::{LONG_PAYLOAD_MAX, LONG_PAYLOAD_MIN, SHORT_PAYLOAD_MAX, SHORT_PAYLOAD_MIN};

/// One producer to one consumer, or one producer to up to 15 consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Cast {
    #[default]
    Single,
    Multi,
}

/// Payload size class: Short carries 1-2 bytes, Long 3-250 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Width {
    #[default]
    Short,
    Long,
}

/// Wire format family. Extended adds rollover counting to the CRC and
/// tolerates a bounded number of faulted messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum FormatClass {
    #[default]
    Base,
    Extended,
}

/// Which side opened the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ConnectionRole {
    #[default]
    Target,
    Originator,
}

/// Complete description of a connection's message format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MessageFormat {
    pub cast: Cast,
    pub width: Width,
    pub class: FormatClass,
    pub role: ConnectionRole,
}

impl MessageFormat {
    pub fn new(cast: Cast, width: Width, class: FormatClass, role: ConnectionRole) -> Self {
        Self { cast, width, class, role }
    }

    pub fn is_multicast(&self) -> bool {
        self.cast == Cast::Multi
    }

    pub fn is_extended(&self) -> bool {
        self.class == FormatClass::Extended
    }

    /// Checks that `payload_size` fits this format's width.
    pub fn accepts_payload_size(&self, payload_size: usize) -> bool {
        match self.width {
            Width::Short => (SHORT_PAYLOAD_MIN..=SHORT_PAYLOAD_MAX).contains(&payload_size),
            Width::Long => (LONG_PAYLOAD_MIN..=LONG_PAYLOAD_MAX).contains(&payload_size),
        }
    }

    /// Length of the safety data section for the given payload size.
    pub fn data_section_len(&self, payload_size: usize) -> usize {
        match (self.class, self.width) {
            (FormatClass::Base, Width::Short) => payload_size + 6,
            (FormatClass::Base, Width::Long) => 2 * payload_size + 8,
            (FormatClass::Extended, Width::Short) => payload_size + 6,
            (FormatClass::Extended, Width::Long) => 2 * payload_size + 9,
        }
    }
}
