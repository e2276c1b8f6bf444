use super::ctab2000::write_ctab2000;
use super::ctab3000::write_ctab3000;
use crate::core::io::ctfile::primitives::{LineBuffer, padded_number};
use crate::core::io::ctfile::v3000::quote;
use crate::core::io::error::MolfileError;
use crate::core::models::rgroup::RGroup;
use crate::core::models::structure::Structure;

/// Writes the V2000 R-group file: the scaffold table with its `M  LOG`
/// records, then one `$RGP` section per R-group holding a table for each
/// alternative fragment.
pub(super) fn write_rgfile2000(buf: &mut LineBuffer, structure: &Structure) -> Result<(), MolfileError> {
    buf.line("$MDL  REV  1");
    buf.line("$MOL");
    buf.line("$HDR");
    buf.line(&structure.name);
    buf.blank();
    buf.blank();
    buf.line("$END HDR");

    let logic: Vec<(u32, &RGroup)> = structure.rgroups_iter().collect();
    buf.line("$CTAB");
    write_ctab2000(buf, &structure.scaffold(), &logic)?;
    buf.line("$END CTAB");

    for (number, rgroup) in structure.rgroups_iter() {
        buf.line("$RGP");
        buf.line(&padded_number(i64::from(number), 3, "R-group number")?);
        for &fragment in &rgroup.fragments {
            buf.line("$CTAB");
            write_ctab2000(buf, &structure.fragment(fragment), &[])?;
            buf.line("$END CTAB");
        }
        buf.line("$END RGP");
    }
    buf.line("$END MOL");
    Ok(())
}

/// Writes one `RGROUP` block per R-group, following the scaffold table of a
/// V3000 molfile.
pub(super) fn write_rgroups3000(buf: &mut LineBuffer, structure: &Structure) -> Result<(), MolfileError> {
    for (number, rgroup) in structure.rgroups_iter() {
        buf.line(&format!("M  V30 BEGIN RGROUP {number}"));
        buf.v30(&format!(
            "RLOGIC {} {} {}",
            rgroup.if_then,
            u8::from(rgroup.rest_h),
            quote(&rgroup.range)
        ));
        for &fragment in &rgroup.fragments {
            write_ctab3000(buf, &structure.fragment(fragment))?;
        }
        buf.line("M  V30 END RGROUP");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::{Atom, RGROUP_LABEL};
    use crate::core::models::topology::{Bond, BondType};
    use nalgebra::Point3;

    fn substituted_benzene() -> Structure {
        let mut structure = Structure::new();
        structure.name = "scaffold".to_string();
        let ring: Vec<_> = (0..6)
            .map(|i| {
                let angle = f64::from(i) * std::f64::consts::FRAC_PI_3;
                structure.add_atom(Atom::new("C", Point3::new(angle.cos(), angle.sin(), 0.0)))
            })
            .collect();
        for i in 0..6 {
            structure
                .add_bond(Bond::new(ring[i], ring[(i + 1) % 6], BondType::Aromatic))
                .unwrap();
        }
        let mut site = Atom::new(RGROUP_LABEL, Point3::new(2.0, 0.0, 0.0));
        site.add_rgroup(1);
        let site = structure.add_atom(site);
        structure
            .add_bond(Bond::new(ring[0], site, BondType::Single))
            .unwrap();

        let methyl = structure.add_atom(Atom::new("C", Point3::new(5.0, 0.0, 0.0)));
        let ethyl_a = structure.add_atom(Atom::new("C", Point3::new(7.0, 0.0, 0.0)));
        let ethyl_b = structure.add_atom(Atom::new("C", Point3::new(8.0, 0.0, 0.0)));
        structure
            .add_bond(Bond::new(ethyl_a, ethyl_b, BondType::Single))
            .unwrap();
        structure.mark_fragments();

        let methyl_fragment = structure.atom(methyl).and_then(|atom| atom.fragment).unwrap();
        let ethyl_fragment = structure.atom(ethyl_a).and_then(|atom| atom.fragment).unwrap();
        let rgroup = structure.rgroup_entry(1);
        rgroup.fragments = vec![methyl_fragment, ethyl_fragment];
        rgroup.if_then = 2;
        rgroup.rest_h = true;
        rgroup.range = "1-3".to_string();
        structure
    }

    #[test]
    fn rgfile_wraps_scaffold_and_fragments() {
        let mut buf = LineBuffer::new();
        write_rgfile2000(&mut buf, &substituted_benzene()).unwrap();
        let text = buf.into_string();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(&lines[..8], ["$MDL  REV  1", "$MOL", "$HDR", "scaffold", "", "", "$END HDR", "$CTAB"]);
        assert_eq!(lines[8], "  7  7  0     0  0            999 V2000");
        assert!(lines.contains(&"M  LOG  1   1   2   1   1-3"));
        assert!(lines.contains(&"M  RGP  1   7   1"));
        assert_eq!(lines.iter().filter(|line| **line == "$CTAB").count(), 3);
        assert_eq!(lines.iter().filter(|line| **line == "$RGP").count(), 1);
        assert!(text.contains("$RGP\n  1\n$CTAB\n  1  0  0     0  0            999 V2000\n"));
        assert!(text.contains("$END CTAB\n$CTAB\n  2  1  0     0  0            999 V2000\n"));
        assert!(text.ends_with("$END RGP\n$END MOL\n"));
    }

    #[test]
    fn v3000_rgroup_blocks_hold_logic_and_fragment_tables() {
        let mut buf = LineBuffer::new();
        write_rgroups3000(&mut buf, &substituted_benzene()).unwrap();
        let text = buf.into_string();
        assert!(text.starts_with("M  V30 BEGIN RGROUP 1\nM  V30 RLOGIC 2 1 1-3\n"));
        assert_eq!(text.matches("M  V30 BEGIN CTAB").count(), 2);
        assert!(text.ends_with("M  V30 END CTAB\nM  V30 END RGROUP\n"));
    }
}
