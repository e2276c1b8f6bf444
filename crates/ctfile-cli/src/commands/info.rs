use crate::cli::InfoArgs;
use crate::error::{CliError, Result};
use ctfile::workflows::convert::{self, StructureSummary};
use tracing::info;

fn render(name: &str, summary: &StructureSummary) -> String {
    let mut lines = vec![format!("Name:          {}", if name.is_empty() { "(none)" } else { name })];
    lines.push(format!("Atoms:         {}", summary.atoms));
    lines.push(format!("Bonds:         {}", summary.bonds));
    lines.push(format!("S-groups:      {}", summary.sgroups));
    lines.push(format!("R-groups:      {}", summary.rgroups));
    if summary.arrows > 0 {
        lines.push(format!("Arrows:        {}", summary.arrows));
        lines.push(format!("Pluses:        {}", summary.pluses));
    }
    lines.push(format!("Stereo groups: {}", summary.stereo_groups));
    lines.join("\n")
}

pub fn run(args: InfoArgs) -> Result<()> {
    info!("Inspecting {:?}", &args.file);
    let structure = convert::read_path(&args.file).map_err(|e| CliError::FileParsing {
        path: args.file.clone(),
        source: e.into(),
    })?;
    let summary = StructureSummary::of(&structure);
    if args.toml {
        let table = toml::to_string(&summary).map_err(|e| CliError::Other(e.into()))?;
        print!("{}", table);
    } else {
        println!("{}", render(&structure.name, &summary));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reaction_lines_appear_only_for_reactions() {
        let molecule = StructureSummary {
            atoms: 3,
            bonds: 2,
            ..StructureSummary::default()
        };
        let text = render("water", &molecule);
        assert!(text.starts_with("Name:          water\n"));
        assert!(text.contains("Atoms:         3"));
        assert!(!text.contains("Arrows"));

        let reaction = StructureSummary {
            arrows: 1,
            pluses: 2,
            ..molecule
        };
        let text = render("", &reaction);
        assert!(text.starts_with("Name:          (none)"));
        assert!(text.contains("Pluses:        2"));
    }

    #[test]
    fn summary_serializes_as_toml() {
        let summary = StructureSummary {
            atoms: 4,
            sgroups: 1,
            ..StructureSummary::default()
        };
        let table = toml::to_string(&summary).unwrap();
        assert!(table.contains("atoms = 4"));
        assert!(table.contains("sgroups = 1"));
        assert!(table.contains("stereo_groups = 0"));
    }
}
