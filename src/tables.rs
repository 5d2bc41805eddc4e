use std::io::Write;

use miette::{IntoDiagnostic, Result};
use peptide_mass::{
    MassDatabase,
    mass_database::{ModificationDescription, ResidueDescription},
};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Serialize)]
struct ResidueRow<'a> {
    code: char,
    name: &'a str,
    monoisotopic_mass: Decimal,
}

#[derive(Serialize)]
struct ModificationRow<'a> {
    unimod: u32,
    name: &'a str,
    mass_delta: Decimal,
}

pub fn write_tables(db: &MassDatabase, mut out: impl Write) -> Result<()> {
    let residues = db
        .residues()
        .map(|(code, ResidueDescription { name, mass })| ResidueRow {
            code,
            name,
            monoisotopic_mass: *mass,
        });
    write_table(&mut out, residues)?;

    writeln!(out).into_diagnostic()?;

    let modifications = db.modifications().map(
        |(id, ModificationDescription { name, mass_delta })| ModificationRow {
            unimod: id.into(),
            name,
            mass_delta: *mass_delta,
        },
    );
    write_table(&mut out, modifications)
}

// NOTE: Each table gets its own header, taken from the row's field names
fn write_table<R: Serialize>(out: impl Write, rows: impl IntoIterator<Item = R>) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for row in rows {
        writer.serialize(row).into_diagnostic()?;
    }
    writer.flush().into_diagnostic()
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use insta::assert_snapshot;

    use super::*;

    fn tables(db: &MassDatabase) -> String {
        let mut out = Vec::new();
        write_tables(db, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn default_tables() {
        assert_snapshot!(tables(&MassDatabase::default()), @r"
        code,name,monoisotopic_mass
        A,Alanine,71.03711
        C,Cysteine,103.00919
        D,Aspartic Acid,115.02694
        E,Glutamic Acid,129.04259
        F,Phenylalanine,147.06841
        G,Glycine,57.02146
        H,Histidine,137.05891
        I,Isoleucine,113.08406
        K,Lysine,128.09496
        L,Leucine,113.08406
        M,Methionine,131.04049
        N,Asparagine,114.04293
        P,Proline,97.05276
        Q,Glutamine,128.05858
        R,Arginine,156.10111
        S,Serine,87.03203
        T,Threonine,101.04768
        V,Valine,99.06841
        W,Tryptophan,186.07931
        Y,Tyrosine,163.06333

        unimod,name,mass_delta
        1,Acetyl,42.011
        4,Carbamidomethyl,57.021
        21,Phospho,79.966
        35,Oxidation,15.995
        ");
    }

    #[test]
    fn quoted_names() {
        let kdl = indoc! {r#"
            proton 1.0078
            residues {
                X "The \"Mystery\" Residue" 100
                Z "Glx, either E or Q" 128.55
            }
            modifications
        "#};
        let db = MassDatabase::new("quoted.kdl", kdl).unwrap();
        let out = tables(&db);
        assert!(out.contains(r#"X,"The ""Mystery"" Residue",100"#));
        assert!(out.contains(r#"Z,"Glx, either E or Q",128.55"#));

        let mut reader = csv::Reader::from_reader(out.as_bytes());
        let names: Vec<_> = reader
            .records()
            .map(|record| record.unwrap()[1].to_owned())
            .collect();
        assert_eq!(names, [r#"The "Mystery" Residue"#, "Glx, either E or Q"]);
    }
}
