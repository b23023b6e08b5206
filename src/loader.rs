use crate::decoder::CsvDecoder;
use crate::structures::{
    parse_coordinate, Candidate, CandidateKey, LocationKey, Office, PollingLocation,
};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const DELIMITER: u8 = b';';

/// Build the polling-location reference table from the electorate export.
///
/// Rows outside the target state are ignored. The first row for a natural
/// key wins; later duplicates (one row per section, many sections per
/// location) are dropped without merging.
pub fn load_locations(
    path: &Path,
    encoding: &str,
    state: &str,
) -> Result<HashMap<LocationKey, PollingLocation>> {
    info!(path=?path, state=%state, "loading polling locations");

    let decoder = CsvDecoder::open(path, encoding, DELIMITER)
        .with_context(|| format!("failed to open locations file: {:?}", path))?;

    let mut locations = HashMap::new();
    let mut rows = 0u64;
    let mut skipped = 0u64;

    for record in decoder {
        let record = record.context("decode failure in locations file")?;
        rows += 1;
        if rows % 100_000 == 0 {
            info!(rows, unique = locations.len(), "scanning locations");
        }

        if record.require("SG_UF") != Some(state) {
            continue;
        }

        let key = match (
            record.require("CD_MUNICIPIO"),
            record.require("NR_ZONA"),
            record.require("NR_LOCAL_VOTACAO"),
        ) {
            (Some(mun), Some(zone), Some(loc)) => {
                match LocationKey::from_fields(mun, zone, loc) {
                    Some(key) => key,
                    None => {
                        skipped += 1;
                        continue;
                    }
                }
            }
            _ => {
                skipped += 1;
                continue;
            }
        };

        locations.entry(key).or_insert_with(|| PollingLocation {
            key,
            name: record.get("NM_LOCAL_VOTACAO").unwrap_or("").trim().to_string(),
            address: record.get("DS_ENDERECO").unwrap_or("").trim().to_string(),
            neighborhood: record.get("NM_BAIRRO").unwrap_or("").trim().to_string(),
            city: record.get("NM_MUNICIPIO").unwrap_or("").trim().to_string(),
            latitude: record.get("NR_LATITUDE").and_then(parse_coordinate),
            longitude: record.get("NR_LONGITUDE").and_then(parse_coordinate),
        });
    }

    if skipped > 0 {
        warn!(skipped, "location rows with unusable key fields");
    }
    info!(rows, unique = locations.len(), "polling locations loaded");
    Ok(locations)
}

/// Build the candidate reference table from one or more registry files.
///
/// File order is significant: the first file to define an (office, ballot
/// number) pair wins, both within a file and across files.
pub fn load_candidates(
    paths: &[PathBuf],
    encoding: &str,
) -> Result<HashMap<CandidateKey, Candidate>> {
    let mut candidates = HashMap::new();

    for path in paths {
        info!(path=?path, "loading candidate registry");
        let decoder = CsvDecoder::open(path, encoding, DELIMITER)
            .with_context(|| format!("failed to open candidates file: {:?}", path))?;

        let mut rows = 0u64;
        for record in decoder {
            let record = record.context("decode failure in candidates file")?;
            rows += 1;

            let number: u32 = match record.require("NR_CANDIDATO").and_then(|n| n.parse().ok()) {
                Some(n) => n,
                None => continue,
            };
            let office = Office::from_code(record.get("CD_CARGO"), record.get("DS_CARGO"));

            let name = record
                .require("NM_URNA_CANDIDATO")
                .or_else(|| record.require("NM_CANDIDATO"))
                .unwrap_or("")
                .to_string();
            let party = record.require("SG_PARTIDO").unwrap_or("N/A").to_string();

            candidates
                .entry(CandidateKey { office, number })
                .or_insert(Candidate { name, party });
        }
        info!(rows, unique = candidates.len(), "candidate registry loaded");
    }

    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn fixture(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    const LOC_HEADER: &str =
        "SG_UF;CD_MUNICIPIO;NR_ZONA;NR_LOCAL_VOTACAO;NM_LOCAL_VOTACAO;DS_ENDERECO;NM_BAIRRO;NM_MUNICIPIO;NR_LATITUDE;NR_LONGITUDE\n";

    #[test]
    fn filters_to_target_state_and_dedups_first_wins() {
        let file = fixture(&format!(
            "{LOC_HEADER}\
             RJ;100;5;20;ESCOLA A;RUA X;CENTRO;RIO;-22,9;-43,2\n\
             RJ;100;5;20;ESCOLA RENOMEADA;RUA Y;SUL;RIO;-23,0;-44,0\n\
             SP;200;1;10;ESCOLA SP;AV Z;NORTE;SAMPA;-23,5;-46,6\n"
        ));

        let locations = load_locations(file.path(), "ISO-8859-1", "RJ").unwrap();
        assert_eq!(locations.len(), 1);

        let key = LocationKey::from_fields("100", "5", "20").unwrap();
        let loc = &locations[&key];
        assert_eq!(loc.name, "ESCOLA A");
        assert_eq!(loc.address, "RUA X");
        assert_eq!(loc.latitude, Some(-22.9));
    }

    #[test]
    fn zero_or_garbage_coordinates_load_as_none() {
        let file = fixture(&format!(
            "{LOC_HEADER}\
             RJ;100;5;20;ESCOLA A;RUA X;CENTRO;RIO;0;0\n\
             RJ;100;5;21;ESCOLA B;RUA Y;SUL;RIO;#NULO#;-43,2\n"
        ));

        let locations = load_locations(file.path(), "ISO-8859-1", "RJ").unwrap();
        let a = &locations[&LocationKey::from_fields("100", "5", "20").unwrap()];
        assert_eq!(a.latitude, None);
        assert_eq!(a.longitude, None);

        let b = &locations[&LocationKey::from_fields("100", "5", "21").unwrap()];
        assert_eq!(b.latitude, None);
        assert_eq!(b.longitude, Some(-43.2));
    }

    #[test]
    fn rows_missing_key_fields_are_skipped() {
        let file = fixture(&format!(
            "{LOC_HEADER}\
             RJ;;5;20;ESCOLA A;RUA X;CENTRO;RIO;-22,9;-43,2\n\
             RJ;100;5;20;ESCOLA B;RUA Y;SUL;RIO;-22,9;-43,2\n"
        ));
        let locations = load_locations(file.path(), "ISO-8859-1", "RJ").unwrap();
        assert_eq!(locations.len(), 1);
        assert_eq!(
            locations[&LocationKey::from_fields("100", "5", "20").unwrap()].name,
            "ESCOLA B"
        );
    }

    const CAND_HEADER: &str =
        "CD_CARGO;DS_CARGO;NR_CANDIDATO;NM_URNA_CANDIDATO;NM_CANDIDATO;SG_PARTIDO\n";

    #[test]
    fn first_file_wins_across_registry_files() {
        let national = fixture(&format!("{CAND_HEADER}1;PRESIDENTE;13;LULA;LUIZ INACIO;PT\n"));
        let regional = fixture(&format!(
            "{CAND_HEADER}\
             1;PRESIDENTE;13;OUTRO NOME;OUTRO;XX\n\
             3;GOVERNADOR;13;GOV TREZE;NOME COMPLETO;PT\n"
        ));

        let candidates = load_candidates(
            &[national.path().to_path_buf(), regional.path().to_path_buf()],
            "ISO-8859-1",
        )
        .unwrap();

        let pres = &candidates[&CandidateKey {
            office: Office::Presidente,
            number: 13,
        }];
        assert_eq!(pres.name, "LULA");
        assert_eq!(pres.party, "PT");

        // Same ballot number, different office: distinct identity.
        let gov = &candidates[&CandidateKey {
            office: Office::Governador,
            number: 13,
        }];
        assert_eq!(gov.name, "GOV TREZE");
    }

    #[test]
    fn urn_name_falls_back_to_full_name() {
        let file = fixture(&format!("{CAND_HEADER}5;SENADOR;450;;MARIA DA SILVA;ABC\n"));
        let candidates = load_candidates(&[file.path().to_path_buf()], "ISO-8859-1").unwrap();
        let senator = &candidates[&CandidateKey {
            office: Office::Senador,
            number: 450,
        }];
        assert_eq!(senator.name, "MARIA DA SILVA");
    }
}
