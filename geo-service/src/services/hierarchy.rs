//! Type hierarchy rules.
//!
//! Each structure is a straight chain of kinds (see
//! [`Structure::kind_sequence`]); a kind's parent is the kind before it and
//! its child the kind after it. Locations are the only kind allowed to move
//! between structures.

use super::error::GeoError;
use crate::models::{NodeKind, Structure};

fn position(structure: Structure, kind: NodeKind) -> Result<usize, GeoError> {
    structure
        .kind_sequence()
        .iter()
        .position(|k| *k == kind)
        .ok_or_else(|| GeoError::InvalidType(format!("{} is not part of the {} structure", kind, structure)))
}

pub fn allowed_parent_types(
    structure: Structure,
    kind: NodeKind,
) -> Result<&'static [NodeKind], GeoError> {
    let idx = position(structure, kind)?;
    let sequence = structure.kind_sequence();
    Ok(if idx == 0 { &[] } else { &sequence[idx - 1..idx] })
}

pub fn allowed_child_types(
    structure: Structure,
    kind: NodeKind,
) -> Result<&'static [NodeKind], GeoError> {
    let idx = position(structure, kind)?;
    let sequence = structure.kind_sequence();
    Ok(if idx + 1 < sequence.len() {
        &sequence[idx + 1..idx + 2]
    } else {
        &[]
    })
}

/// Checks that a `kind` node of `structure` may be re-attached below a
/// `parent` node of `parent_structure`. Only Locations cross structures.
pub fn ensure_move_allowed(
    structure: Structure,
    kind: NodeKind,
    parent_structure: Structure,
    parent: NodeKind,
) -> Result<(), GeoError> {
    let allowed = if kind == NodeKind::Location {
        allowed_child_types(parent_structure, parent)?.contains(&kind)
    } else {
        parent_structure == structure && allowed_parent_types(structure, kind)?.contains(&parent)
    };
    if allowed {
        Ok(())
    } else {
        Err(GeoError::InvalidMove(format!(
            "{} in {} cannot be moved under {} in {}",
            kind, structure, parent, parent_structure
        )))
    }
}

/// Checks that `child` may sit directly below `parent` in `structure`.
pub fn ensure_child_allowed(
    structure: Structure,
    parent: NodeKind,
    child: NodeKind,
) -> Result<(), GeoError> {
    if allowed_child_types(structure, parent)?.contains(&child) {
        Ok(())
    } else {
        Err(GeoError::InvalidType(format!(
            "{} cannot be created under {} in {}",
            child, parent, structure
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_chain() {
        assert_eq!(
            allowed_child_types(Structure::Png, NodeKind::GeoRegion).unwrap(),
            &[NodeKind::Province]
        );
        assert_eq!(
            allowed_parent_types(Structure::Png, NodeKind::Ward).unwrap(),
            &[NodeKind::Llg]
        );
        assert_eq!(
            allowed_child_types(Structure::Png, NodeKind::Ward).unwrap(),
            &[NodeKind::Location]
        );
    }

    #[test]
    fn location_is_a_leaf_in_every_structure() {
        for structure in Structure::ALL {
            assert!(allowed_child_types(structure, NodeKind::Location)
                .unwrap()
                .is_empty());
        }
    }

    #[test]
    fn root_has_no_parent() {
        assert!(allowed_parent_types(Structure::Mka, NodeKind::GeoRegion)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn kinds_outside_the_structure_are_invalid() {
        assert!(matches!(
            allowed_child_types(Structure::Mka, NodeKind::Province),
            Err(GeoError::InvalidType(_))
        ));
        assert!(matches!(
            allowed_parent_types(Structure::Png, NodeKind::Constituency),
            Err(GeoError::InvalidType(_))
        ));
    }

    #[test]
    fn mka_section_sits_under_mka_ward() {
        assert!(ensure_child_allowed(Structure::Mka, NodeKind::MkaWard, NodeKind::Location).is_ok());
        assert!(ensure_child_allowed(Structure::Mka, NodeKind::MkaRegion, NodeKind::Location).is_err());
    }

    #[test]
    fn locations_move_across_structures() {
        assert!(ensure_move_allowed(Structure::Png, NodeKind::Location, Structure::Mka, NodeKind::MkaWard).is_ok());
        assert!(ensure_move_allowed(Structure::Png, NodeKind::Location, Structure::Abg, NodeKind::Constituency).is_ok());
        assert!(ensure_move_allowed(Structure::Png, NodeKind::Location, Structure::Png, NodeKind::Llg).is_err());
    }

    #[test]
    fn other_kinds_stay_in_their_structure() {
        assert!(ensure_move_allowed(Structure::Png, NodeKind::District, Structure::Png, NodeKind::Province).is_ok());
        assert!(matches!(
            ensure_move_allowed(Structure::Png, NodeKind::Province, Structure::Abg, NodeKind::GeoRegion),
            Err(GeoError::InvalidMove(_))
        ));
        assert!(matches!(
            ensure_move_allowed(Structure::Mka, NodeKind::MkaRegion, Structure::Png, NodeKind::GeoRegion),
            Err(GeoError::InvalidMove(_))
        ));
        assert!(ensure_move_allowed(Structure::Png, NodeKind::Llg, Structure::Png, NodeKind::Province).is_err());
    }
}
