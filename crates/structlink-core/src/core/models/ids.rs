use slotmap::new_key_type;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

new_key_type! {
    pub struct ChainId;
    pub struct ResidueId;
}

/// Identity of a structural model in the external viewer.
///
/// The viewer addresses models by a `(model, sub-model)` number pair. Both
/// numbers are packed into a single `u64`: the model number occupies the high
/// 32 bits and the sub-model number the low 32 bits. The packing is
/// collision-free and orders keys lexicographically by `(model, sub-model)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelKey(u64);

impl ModelKey {
    pub const fn new(model_number: u32, sub_model_number: u32) -> Self {
        Self(((model_number as u64) << 32) | sub_model_number as u64)
    }

    pub const fn model_number(self) -> u32 {
        (self.0 >> 32) as u32
    }

    pub const fn sub_model_number(self) -> u32 {
        (self.0 & 0xFFFF_FFFF) as u32
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }

    pub const fn from_u64(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sub_model_number() == 0 {
            write!(f, "#{}", self.model_number())
        } else {
            write!(f, "#{}.{}", self.model_number(), self.sub_model_number())
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid model identifier: '{0}'")]
pub struct ParseModelKeyError(pub String);

impl FromStr for ModelKey {
    type Err = ParseModelKeyError;

    /// Accepts `#M`, `#M.S`, `M` and `M.S`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let body = trimmed.strip_prefix('#').unwrap_or(trimmed);
        let (model, sub) = match body.split_once('.') {
            Some((m, s)) => (m, s),
            None => (body, "0"),
        };
        let model = model
            .parse::<u32>()
            .map_err(|_| ParseModelKeyError(s.to_string()))?;
        let sub = sub
            .parse::<u32>()
            .map_err(|_| ParseModelKeyError(s.to_string()))?;
        Ok(Self::new(model, sub))
    }
}

/// Opaque identity of an object (node or edge) in the host graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostObjectId(pub u64);

impl fmt::Display for HostObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "host:{}", self.0)
    }
}

/// Opaque identity of a network in the host graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NetworkId(pub u64);

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "network:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_key_packs_model_and_sub_model_numbers() {
        let key = ModelKey::new(3, 7);
        assert_eq!(key.model_number(), 3);
        assert_eq!(key.sub_model_number(), 7);
        assert_eq!(key.as_u64(), (3u64 << 32) | 7);
        assert_eq!(ModelKey::from_u64(key.as_u64()), key);
    }

    #[test]
    fn model_key_handles_extreme_numbers_without_collision() {
        let a = ModelKey::new(u32::MAX, 0);
        let b = ModelKey::new(0, u32::MAX);
        assert_ne!(a, b);
        assert_eq!(a.model_number(), u32::MAX);
        assert_eq!(b.sub_model_number(), u32::MAX);
    }

    #[test]
    fn model_key_orders_by_model_then_sub_model() {
        assert!(ModelKey::new(1, 5) < ModelKey::new(2, 0));
        assert!(ModelKey::new(2, 0) < ModelKey::new(2, 1));
    }

    #[test]
    fn model_key_display_omits_zero_sub_model() {
        assert_eq!(ModelKey::new(0, 0).to_string(), "#0");
        assert_eq!(ModelKey::new(4, 2).to_string(), "#4.2");
    }

    #[test]
    fn model_key_parses_with_and_without_marker() {
        assert_eq!("#0".parse::<ModelKey>(), Ok(ModelKey::new(0, 0)));
        assert_eq!("#1.2".parse::<ModelKey>(), Ok(ModelKey::new(1, 2)));
        assert_eq!("5".parse::<ModelKey>(), Ok(ModelKey::new(5, 0)));
        assert!("#a".parse::<ModelKey>().is_err());
        assert!("#1.".parse::<ModelKey>().is_err());
    }
}
