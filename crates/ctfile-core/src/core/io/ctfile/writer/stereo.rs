use super::numbered;
use crate::core::io::ctfile::primitives::LineBuffer;
use crate::core::io::ctfile::v3000::format_list;
use crate::core::io::error::MolfileError;
use crate::core::models::ids::AtomId;
use crate::core::models::stereo::EnhancedStereo;
use std::collections::HashMap;

/// Writes the enhanced stereo `COLLECTION` block: absolute atoms first, then
/// relative pools, then racemic pools, each pool in label order.
pub(super) fn write_collection3000(
    buf: &mut LineBuffer,
    stereo: &EnhancedStereo,
    atom_numbers: &HashMap<AtomId, usize>,
) -> Result<(), MolfileError> {
    if stereo.is_empty() {
        return Ok(());
    }
    buf.line("M  V30 BEGIN COLLECTION");
    if !stereo.absolute.is_empty() {
        let atoms = numbered(atom_numbers, &stereo.absolute, "atom")?;
        buf.v30(&format!("MDLV30/STEABS ATOMS={}", format_list(&atoms)));
    }
    for (kind, pools) in [("STEREL", &stereo.relative), ("STERAC", &stereo.racemic)] {
        for (label, atoms) in pools {
            let atoms = numbered(atom_numbers, atoms, "atom")?;
            buf.v30(&format!("MDLV30/{kind}{label} ATOMS={}", format_list(&atoms)));
        }
    }
    buf.line("M  V30 END COLLECTION");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::structure::Structure;
    use nalgebra::Point3;

    #[test]
    fn collections_are_written_absolute_relative_racemic() {
        let mut structure = Structure::new();
        let ids: Vec<AtomId> = (0..6)
            .map(|i| structure.add_atom(Atom::new("C", Point3::new(i as f64, 0.0, 0.0))))
            .collect();
        let mut stereo = EnhancedStereo::new();
        stereo.racemic.insert(5, vec![ids[1], ids[0], ids[5]]);
        stereo.relative.insert(4, vec![ids[0], ids[1]]);
        stereo.absolute = vec![ids[2], ids[3]];

        let mut buf = LineBuffer::new();
        write_collection3000(&mut buf, &stereo, &structure.atom_numbering()).unwrap();
        assert_eq!(
            buf.into_string(),
            "M  V30 BEGIN COLLECTION\n\
             M  V30 MDLV30/STEABS ATOMS=(2 3 4)\n\
             M  V30 MDLV30/STEREL4 ATOMS=(2 1 2)\n\
             M  V30 MDLV30/STERAC5 ATOMS=(3 2 1 6)\n\
             M  V30 END COLLECTION\n"
        );
    }

    #[test]
    fn empty_stereo_writes_nothing() {
        let mut buf = LineBuffer::new();
        write_collection3000(&mut buf, &EnhancedStereo::new(), &HashMap::new()).unwrap();
        assert_eq!(buf.into_string(), "");
    }
}
