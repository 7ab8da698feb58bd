use phf::{Map, Set, phf_map, phf_set};

static BACKBONE_ATOM_NAMES: Set<&'static str> = phf_set! {
    "N", "H", "HN", "CA", "HA", "C", "O", "OXT", "H1", "H2", "H3", "NT",
    "HT1", "HT2", "HT3", "OT1", "OT2", "HC", "HOXT", "HA1", "HA2", "1HA", "2HA",
};

static WATER_RESIDUE_NAMES: Set<&'static str> = phf_set! {
    "HOH", "WAT", "H2O", "DOD",
};

static SMALL_MOLECULE_CODES: Map<&'static str, &'static str> = phf_map! {
    "ALA" => "C[C@@H](C(=O)O)N",
    "ARG" => "C(C[C@@H](C(=O)O)N)CN=C(N)N",
    "ASN" => "C([C@@H](C(=O)O)N)C(=O)N",
    "ASP" => "C([C@@H](C(=O)O)N)C(=O)O",
    "CYS" => "C([C@@H](C(=O)O)N)S",
    "GLN" => "C(CC(=O)N)[C@@H](C(=O)O)N",
    "GLU" => "C(CC(=O)O)[C@@H](C(=O)O)N",
    "GLY" => "C(C(=O)O)N",
    "HIS" => "C1=C(NC=N1)C[C@@H](C(=O)O)N",
    "ILE" => "CC[C@H](C)[C@@H](C(=O)O)N",
    "LEU" => "CC(C)C[C@@H](C(=O)O)N",
    "LYS" => "C(CCN)C[C@@H](C(=O)O)N",
    "MET" => "CSCC[C@@H](C(=O)O)N",
    "PHE" => "C1=CC=C(C=C1)C[C@@H](C(=O)O)N",
    "PRO" => "C1C[C@H](NC1)C(=O)O",
    "SER" => "C([C@@H](C(=O)O)N)O",
    "THR" => "C[C@H]([C@@H](C(=O)O)N)O",
    "TRP" => "C1=CC=C2C(=C1)C(=CN2)C[C@@H](C(=O)O)N",
    "TYR" => "C1=CC(=CC=C1C[C@@H](C(=O)O)N)O",
    "VAL" => "CC(C)[C@@H](C(=O)O)N",
    "HOH" => "O",
};

pub fn is_backbone_atom(atom_name: &str) -> bool {
    BACKBONE_ATOM_NAMES.contains(atom_name.trim())
}

pub fn is_water(residue_type: &str) -> bool {
    WATER_RESIDUE_NAMES.contains(residue_type.trim())
}

/// SMILES code for a residue type, if it is a known building block.
pub fn small_molecule_code(residue_type: &str) -> Option<&'static str> {
    SMALL_MOLECULE_CODES
        .get(residue_type.trim().to_ascii_uppercase().as_str())
        .copied()
}

/// Main-chain (`mc`) or side-chain (`sc`) classification of an interacting atom.
pub fn interaction_part(atom_name: &str) -> &'static str {
    if is_backbone_atom(atom_name) { "mc" } else { "sc" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_backbone_atom_recognizes_standard_backbone_atoms() {
        assert!(is_backbone_atom("N"));
        assert!(is_backbone_atom("CA"));
        assert!(is_backbone_atom("C"));
        assert!(is_backbone_atom("O"));
        assert!(is_backbone_atom("OXT"));
    }

    #[test]
    fn is_backbone_atom_is_case_sensitive_and_trims_whitespace() {
        assert!(!is_backbone_atom("ca"));
        assert!(is_backbone_atom(" CA "));
        assert!(!is_backbone_atom("CB"));
    }

    #[test]
    fn interaction_part_splits_main_and_side_chain() {
        assert_eq!(interaction_part("N"), "mc");
        assert_eq!(interaction_part("OD1"), "sc");
        assert_eq!(interaction_part(""), "sc");
    }

    #[test]
    fn water_names_are_recognized() {
        assert!(is_water("HOH"));
        assert!(is_water(" WAT "));
        assert!(!is_water("ALA"));
    }

    #[test]
    fn small_molecule_codes_cover_amino_acids_case_insensitively() {
        assert_eq!(small_molecule_code("GLY"), Some("C(C(=O)O)N"));
        assert_eq!(small_molecule_code("gly"), Some("C(C(=O)O)N"));
        assert_eq!(small_molecule_code("LIG"), None);
    }
}
