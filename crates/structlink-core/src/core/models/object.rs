use super::ids::ModelKey;
use std::cmp::Ordering;
use std::fmt;

/// Shared capabilities of every structural object addressable in the viewer.
pub trait Structural {
    /// The viewer's textual address for this object.
    fn spec(&self) -> String;

    /// The model this object belongs to (a model owns itself).
    fn owning_model(&self) -> ModelKey;
}

/// Value reference to a chain within a model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChainRef {
    pub model: ModelKey,
    pub chain: String,
}

impl ChainRef {
    pub fn new(model: ModelKey, chain: impl Into<String>) -> Self {
        Self {
            model,
            chain: chain.into(),
        }
    }
}

impl Structural for ChainRef {
    fn spec(&self) -> String {
        format!("{}:.{}", self.model, self.chain)
    }

    fn owning_model(&self) -> ModelKey {
        self.model
    }
}

/// Value reference to a residue within a model.
///
/// The residue index is kept as the viewer reports it (insertion codes such as
/// `52A` are possible). Ordering compares the leading integer of the index
/// numerically and falls back to the raw text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResidueRef {
    pub model: ModelKey,
    pub chain: String,
    pub index: String,
}

impl ResidueRef {
    pub fn new(model: ModelKey, chain: impl Into<String>, index: impl Into<String>) -> Self {
        Self {
            model,
            chain: chain.into(),
            index: index.into(),
        }
    }

    pub fn chain_ref(&self) -> ChainRef {
        ChainRef::new(self.model, self.chain.clone())
    }

    /// The numeric part of the residue index, if it has one.
    pub fn number(&self) -> Option<i64> {
        residue_number(&self.index)
    }
}

impl Structural for ResidueRef {
    fn spec(&self) -> String {
        if self.chain.is_empty() {
            format!("{}:{}", self.model, self.index)
        } else {
            format!("{}:{}.{}", self.model, self.index, self.chain)
        }
    }

    fn owning_model(&self) -> ModelKey {
        self.model
    }
}

impl PartialOrd for ResidueRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ResidueRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.model
            .cmp(&other.model)
            .then_with(|| self.chain.cmp(&other.chain))
            .then_with(|| compare_residue_indices(&self.index, &other.index))
    }
}

impl Structural for ModelKey {
    fn spec(&self) -> String {
        self.to_string()
    }

    fn owning_model(&self) -> ModelKey {
        *self
    }
}

/// A model, chain or residue, identified by value so that identities survive
/// registry refreshes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StructuralObject {
    Model(ModelKey),
    Chain(ChainRef),
    Residue(ResidueRef),
}

impl StructuralObject {
    /// The immediate parent: residue to chain, chain to model.
    pub fn parent(&self) -> Option<StructuralObject> {
        match self {
            StructuralObject::Model(_) => None,
            StructuralObject::Chain(c) => Some(StructuralObject::Model(c.model)),
            StructuralObject::Residue(r) => Some(StructuralObject::Chain(r.chain_ref())),
        }
    }

    /// All strict ancestors, nearest first.
    pub fn ancestors(&self) -> Vec<StructuralObject> {
        let mut out = Vec::new();
        let mut current = self.parent();
        while let Some(p) = current {
            current = p.parent();
            out.push(p);
        }
        out
    }

    /// `true` if `self` lies strictly inside `other`.
    pub fn is_descendant_of(&self, other: &StructuralObject) -> bool {
        self.ancestors().iter().any(|a| a == other)
    }

    pub fn is_model(&self) -> bool {
        matches!(self, StructuralObject::Model(_))
    }

    /// The same object addressed within another model.
    pub fn with_model(&self, model: ModelKey) -> StructuralObject {
        match self {
            StructuralObject::Model(_) => StructuralObject::Model(model),
            StructuralObject::Chain(c) => ChainRef::new(model, c.chain.clone()).into(),
            StructuralObject::Residue(r) => {
                ResidueRef::new(model, r.chain.clone(), r.index.clone()).into()
            }
        }
    }
}

impl Structural for StructuralObject {
    fn spec(&self) -> String {
        match self {
            StructuralObject::Model(m) => m.spec(),
            StructuralObject::Chain(c) => c.spec(),
            StructuralObject::Residue(r) => r.spec(),
        }
    }

    fn owning_model(&self) -> ModelKey {
        match self {
            StructuralObject::Model(m) => *m,
            StructuralObject::Chain(c) => c.model,
            StructuralObject::Residue(r) => r.model,
        }
    }
}

impl fmt::Display for StructuralObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.spec())
    }
}

impl From<ModelKey> for StructuralObject {
    fn from(key: ModelKey) -> Self {
        StructuralObject::Model(key)
    }
}

impl From<ChainRef> for StructuralObject {
    fn from(chain: ChainRef) -> Self {
        StructuralObject::Chain(chain)
    }
}

impl From<ResidueRef> for StructuralObject {
    fn from(residue: ResidueRef) -> Self {
        StructuralObject::Residue(residue)
    }
}

/// Parses the leading (optionally signed) integer of a residue index.
pub fn residue_number(index: &str) -> Option<i64> {
    let trimmed = index.trim();
    let end = trimmed
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && c == '-')))
        .map(|(i, _)| i)
        .unwrap_or(trimmed.len());
    trimmed[..end].parse().ok()
}

pub fn compare_residue_indices(a: &str, b: &str) -> Ordering {
    match (residue_number(a), residue_number(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m0() -> ModelKey {
        ModelKey::new(0, 0)
    }

    #[test]
    fn specs_follow_viewer_addressing_syntax() {
        assert_eq!(StructuralObject::Model(m0()).spec(), "#0");
        assert_eq!(ChainRef::new(m0(), "A").spec(), "#0:.A");
        assert_eq!(ResidueRef::new(m0(), "A", "12").spec(), "#0:12.A");
        assert_eq!(ResidueRef::new(ModelKey::new(1, 2), "", "7").spec(), "#1.2:7");
    }

    #[test]
    fn owning_model_is_reported_for_every_variant() {
        let key = ModelKey::new(2, 0);
        let objects = [
            StructuralObject::Model(key),
            ChainRef::new(key, "B").into(),
            ResidueRef::new(key, "B", "3").into(),
        ];
        assert!(objects.iter().all(|o| o.owning_model() == key));
    }

    #[test]
    fn ancestors_walk_residue_to_model() {
        let residue: StructuralObject = ResidueRef::new(m0(), "A", "5").into();
        let chain: StructuralObject = ChainRef::new(m0(), "A").into();
        assert_eq!(
            residue.ancestors(),
            vec![chain.clone(), StructuralObject::Model(m0())]
        );
        assert!(residue.is_descendant_of(&chain));
        assert!(!chain.is_descendant_of(&residue));
        assert!(!residue.is_descendant_of(&residue));
    }

    #[test]
    fn with_model_keeps_chain_and_index() {
        let moved = StructuralObject::from(ResidueRef::new(m0(), "B", "4")).with_model(ModelKey::new(0, 1));
        assert_eq!(moved.spec(), "#0.1:4.B");
        assert_eq!(StructuralObject::Model(m0()).with_model(ModelKey::new(3, 0)).spec(), "#3");
    }

    #[test]
    fn residue_ordering_is_numeric_aware() {
        let r9 = ResidueRef::new(m0(), "A", "9");
        let r10 = ResidueRef::new(m0(), "A", "10");
        let r10a = ResidueRef::new(m0(), "A", "10A");
        assert!(r9 < r10);
        assert!(r10 < r10a);
    }

    #[test]
    fn residue_number_parses_leading_integer() {
        assert_eq!(residue_number("52A"), Some(52));
        assert_eq!(residue_number("-3"), Some(-3));
        assert_eq!(residue_number("HOH"), None);
        assert_eq!(residue_number(""), None);
    }
}
