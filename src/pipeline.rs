use crate::aggregator::{aggregate_votes, presidential_filter, state_office_filter};
use crate::cli::{ImportArgs, ValidateArgs};
use crate::loader::{load_candidates, load_locations};
use crate::overrides::PresidentialOverrides;
use crate::report;
use crate::structures::{ImportStats, VoteMap};
use crate::writer::VoteWriter;
use anyhow::{bail, Result};
use std::time::Instant;
use tracing::info;

/// Full import for one year: locations, then candidates, then the vote
/// files, then one transactional write, then the operator summary. Stages
/// run strictly in that order; the vote pass needs both reference tables
/// complete.
pub fn run_import(args: ImportArgs) -> Result<()> {
    let start = Instant::now();
    info!(year = args.year, state = %args.state, db = ?args.db, "starting import");

    if args.national_votes.is_none() && args.state_votes.is_none() {
        bail!("nothing to import: pass --national-votes and/or --state-votes");
    }

    let overrides = match &args.overrides {
        Some(path) => PresidentialOverrides::from_json(path)?,
        None => PresidentialOverrides::for_year(args.year),
    };
    info!(entries = overrides.len(), "presidential override table ready");

    let locations = load_locations(&args.locations, &args.encoding, &args.state)?;
    let candidates = load_candidates(&args.candidates, &args.encoding)?;

    let mut totals = VoteMap::new();
    let mut stats = ImportStats::default();

    if let Some(path) = &args.national_votes {
        aggregate_votes(
            path,
            &args.encoding,
            presidential_filter(args.state.clone()),
            &locations,
            &candidates,
            &overrides,
            &mut totals,
            &mut stats,
        )?;
    }
    if let Some(path) = &args.state_votes {
        aggregate_votes(
            path,
            &args.encoding,
            state_office_filter(),
            &locations,
            &candidates,
            &overrides,
            &mut totals,
            &mut stats,
        )?;
    }
    stats.log_summary();

    let mut writer = VoteWriter::open(&args.db, args.batch_size)?;
    writer.write_year(args.year, &locations, &totals, !args.keep_existing)?;

    report::print_year_summary(writer.connection(), args.year)?;
    info!(
        elapsed_s = start.elapsed().as_secs(),
        "import finished"
    );
    Ok(())
}

pub fn run_validate(args: ValidateArgs) -> Result<()> {
    let writer = VoteWriter::open(&args.db, 1)?;
    match args.year {
        Some(year) => report::print_year_summary(writer.connection(), year)?,
        None => report::print_all_years(writer.connection())?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::office_totals;
    use duckdb::Connection;
    use std::fs;
    use std::path::{Path, PathBuf};

    const LOC_HEADER: &str =
        "SG_UF;CD_MUNICIPIO;NR_ZONA;NR_LOCAL_VOTACAO;NM_LOCAL_VOTACAO;DS_ENDERECO;NM_BAIRRO;NM_MUNICIPIO;NR_LATITUDE;NR_LONGITUDE\n";
    const CAND_HEADER: &str =
        "CD_CARGO;DS_CARGO;NR_CANDIDATO;NM_URNA_CANDIDATO;NM_CANDIDATO;SG_PARTIDO\n";
    const VOTE_HEADER: &str =
        "SG_UF;CD_MUNICIPIO;NR_ZONA;NR_LOCAL_VOTACAO;CD_CARGO;DS_CARGO;NR_VOTAVEL;QT_VOTOS\n";

    fn write(dir: &Path, name: &str, content: String) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn import_args(dir: &Path) -> ImportArgs {
        let locations = write(
            dir,
            "locais.csv",
            format!("{LOC_HEADER}RJ;100;5;20;ESCOLA A;RUA X;CENTRO;RIO;-22,9;-43,2\n"),
        );
        let candidates = write(
            dir,
            "candidatos.csv",
            format!(
                "{CAND_HEADER}\
                 1;PRESIDENTE;22;NOME ERRADO;NOME ERRADO;XX\n\
                 3;GOVERNADOR;40;GOV QUARENTA;NOME COMPLETO;ZZ\n"
            ),
        );
        let national = write(
            dir,
            "votos_br.csv",
            format!(
                "{VOTE_HEADER}\
                 RJ;100;5;20;1;PRESIDENTE;22;10\n\
                 RJ;100;5;20;1;PRESIDENTE;22;5\n\
                 SP;100;5;20;1;PRESIDENTE;22;999\n"
            ),
        );
        let state = write(
            dir,
            "votos_rj.csv",
            format!("{VOTE_HEADER}RJ;100;5;20;3;GOVERNADOR;40;8\n"),
        );

        ImportArgs {
            year: 2022,
            state: "RJ".into(),
            locations,
            candidates: vec![candidates],
            national_votes: Some(national),
            state_votes: Some(state),
            db: dir.join("eleicoes.duckdb"),
            encoding: "ISO-8859-1".into(),
            batch_size: 1,
            keep_existing: false,
            overrides: None,
        }
    }

    #[test]
    fn end_to_end_import_aggregates_overrides_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let args = import_args(dir.path());
        let db = args.db.clone();
        run_import(args).unwrap();

        let conn = Connection::open(&db).unwrap();
        let totals = office_totals(&conn, 2022).unwrap();
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].office, "PRESIDENTE");
        assert_eq!(totals[0].votes, 15);
        assert_eq!(totals[1].office, "GOVERNADOR");
        assert_eq!(totals[1].votes, 8);

        // Override supplants the registry name for the presidential row.
        let name: String = conn
            .query_row(
                "SELECT candidato_nome FROM votos_agregados \
                 WHERE ano = 2022 AND cargo = 'PRESIDENTE' AND candidato_numero = 22",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(name, "JAIR BOLSONARO");
    }

    #[test]
    fn rerunning_the_import_replaces_instead_of_accumulating() {
        let dir = tempfile::tempdir().unwrap();
        let db = {
            let args = import_args(dir.path());
            let db = args.db.clone();
            run_import(args).unwrap();
            db
        };
        run_import(import_args(dir.path())).unwrap();

        let conn = Connection::open(&db).unwrap();
        let (rows, votes): (i64, i64) = conn
            .query_row(
                "SELECT COUNT(*), CAST(SUM(total_votos) AS BIGINT) \
                 FROM votos_agregados WHERE ano = 2022",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(rows, 2);
        assert_eq!(votes, 23);
    }

    #[test]
    fn import_without_any_vote_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = import_args(dir.path());
        args.national_votes = None;
        args.state_votes = None;
        assert!(run_import(args).is_err());
    }
}
