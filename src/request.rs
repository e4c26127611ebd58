//! A single type to generate descriptors for.
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::capability::{CapabilityProfile, CapabilityResolver};
use crate::error::GenError;
use crate::facts::{CapabilityQuery, RecordId};
use crate::names::Normalizer;

/// Bits of the registration flag word.
pub mod root_flag {
    pub const NO_STREAMER: i32 = 0x01;
    pub const NO_INPUT_OPERATOR: i32 = 0x02;
    pub const STREAMER_INFO: i32 = 0x04;
    pub const HAS_VERSION: i32 = 0x08;
    /// Set by the emitter when a custom member streamer is wired.
    pub const CUSTOM_STREAMER: i32 = 0x10;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestFlags {
    pub wants_streamer_info: bool,
    pub no_streamer: bool,
    pub no_input_operator: bool,
    /// Register the class without hooking its member streamer.
    pub only_register_class: bool,
}

#[derive(Debug)]
pub struct TypeRequest {
    index: usize,
    record: RecordId,
    requested_name: Option<String>,
    normalized_name: String,
    flags: RequestFlags,
    requested_version: Option<i32>,
    profile: OnceCell<CapabilityProfile>,
}

impl TypeRequest {
    /// Build a request, normalizing both spellings up front.
    pub fn new(
        index: usize,
        record: RecordId,
        requested: Option<&str>,
        flags: RequestFlags,
        version: Option<i32>,
        facts: &dyn CapabilityQuery,
        normalizer: &Normalizer<'_>,
    ) -> Result<Self, GenError> {
        let qualified = facts
            .qualified_name(record)
            .ok_or_else(|| GenError::MissingTypeInfo { name: requested.unwrap_or("<unnamed>").to_owned() })?;
        let requested = requested.map(str::trim).filter(|s| !s.is_empty());
        let source = requested.unwrap_or(&qualified);
        let normalized_name = normalizer.canonical(source)?;
        let requested_name = requested.map(|r| normalizer.requested_spelling(r)).transpose()?;
        tracing::debug!(index, %normalized_name, "request");
        Ok(Self {
            index,
            record,
            requested_name,
            normalized_name,
            flags,
            requested_version: version,
            profile: OnceCell::new(),
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn record(&self) -> RecordId {
        self.record
    }

    /// Canonical name; the emission key.
    pub fn normalized_name(&self) -> &str {
        &self.normalized_name
    }

    pub fn requested_name(&self) -> Option<&str> {
        self.requested_name.as_deref()
    }

    pub fn flags(&self) -> RequestFlags {
        self.flags
    }

    pub fn requested_version(&self) -> Option<i32> {
        self.requested_version
    }

    pub fn root_flag(&self) -> i32 {
        let mut bits = 0;
        if self.flags.no_streamer {
            bits |= root_flag::NO_STREAMER;
        }
        if self.flags.no_input_operator {
            bits |= root_flag::NO_INPUT_OPERATOR;
        }
        if self.flags.wants_streamer_info {
            bits |= root_flag::STREAMER_INFO;
        }
        if self.requested_version.is_some() {
            bits |= root_flag::HAS_VERSION;
        }
        bits
    }

    /// Capability profile, resolved on first use.
    pub fn profile(&self, resolver: &CapabilityResolver<'_>) -> &CapabilityProfile {
        self.profile.get_or_init(|| resolver.resolve(self))
    }
}
