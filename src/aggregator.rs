use crate::decoder::{CsvDecoder, Record};
use crate::overrides::PresidentialOverrides;
use crate::structures::{
    parse_votes, Candidate, CandidateKey, ImportStats, LocationKey, Office, PollingLocation,
    VoteKey, VoteMap, VoteTotal,
};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

const DELIMITER: u8 = b';';

fn office_code(record: &Record) -> Option<u32> {
    record.require("CD_CARGO").and_then(|c| c.parse().ok())
}

/// National section files carry every state; keep only presidential rows for
/// the state being imported.
pub fn presidential_filter(state: String) -> impl Fn(&Record) -> bool {
    move |record| record.require("SG_UF") == Some(state.as_str()) && office_code(record) == Some(1)
}

/// Regional section files: everything except the presidential race, which
/// only the national file covers completely.
pub fn state_office_filter() -> impl Fn(&Record) -> bool {
    |record| office_code(record) != Some(1)
}

/// Stream one section-level vote file and fold its rows into `totals`.
///
/// Summation is order-independent; the only sequencing requirement is that
/// the reference tables are complete before the first call. Per-record
/// problems are counted in `stats` and never abort the pass; decode failures
/// do.
pub fn aggregate_votes<F>(
    path: &Path,
    encoding: &str,
    filter: F,
    locations: &HashMap<LocationKey, PollingLocation>,
    candidates: &HashMap<CandidateKey, Candidate>,
    overrides: &PresidentialOverrides,
    totals: &mut VoteMap,
    stats: &mut ImportStats,
) -> Result<()>
where
    F: Fn(&Record) -> bool,
{
    info!(path=?path, "aggregating votes");

    let decoder = CsvDecoder::open(path, encoding, DELIMITER)
        .with_context(|| format!("failed to open votes file: {:?}", path))?;

    for record in decoder {
        let record = record.context("decode failure in votes file")?;
        stats.rows_read += 1;
        if stats.rows_read % 1_000_000 == 0 {
            info!(
                rows_read = stats.rows_read,
                aggregated = totals.len(),
                "scanning votes"
            );
        }

        if !filter(&record) {
            stats.filtered_out += 1;
            continue;
        }

        let key = match (
            record.require("CD_MUNICIPIO"),
            record.require("NR_ZONA"),
            record.require("NR_LOCAL_VOTACAO"),
        ) {
            (Some(mun), Some(zone), Some(loc)) => LocationKey::from_fields(mun, zone, loc),
            _ => None,
        };
        let key = match key {
            Some(key) => key,
            None => {
                stats.missing_key_fields += 1;
                continue;
            }
        };
        if !locations.contains_key(&key) {
            stats.unknown_location += 1;
            continue;
        }

        let office = Office::from_code(record.get("CD_CARGO"), record.get("DS_CARGO"));
        if office.is_unmapped() {
            stats.unmapped_office += 1;
        }

        let number: u32 = match record.require("NR_VOTAVEL").and_then(|n| n.parse().ok()) {
            Some(n) => n,
            None => {
                stats.malformed_ballot += 1;
                continue;
            }
        };

        let votes = match record.get("QT_VOTOS").map(str::trim) {
            Some(raw) => match parse_votes(raw) {
                Some(v) => v,
                None => {
                    stats.malformed_votes += 1;
                    0
                }
            },
            None => {
                stats.malformed_votes += 1;
                0
            }
        };

        let (name, party) = resolve_candidate(&office, number, candidates, overrides);

        let entry = totals
            .entry(VoteKey {
                location: key,
                office,
                number,
            })
            .or_insert(VoteTotal {
                name,
                party,
                votes: 0,
            });
        entry.votes += votes;
        stats.rows_aggregated += 1;
    }

    info!(aggregated = totals.len(), "vote file done");
    Ok(())
}

/// Candidate identity for one aggregate row. Presidential ballot numbers in
/// the override table always take the pinned name/party; everything else
/// uses the registry, then a generic "OFFICE (number)" placeholder.
fn resolve_candidate(
    office: &Office,
    number: u32,
    candidates: &HashMap<CandidateKey, Candidate>,
    overrides: &PresidentialOverrides,
) -> (String, String) {
    if *office == Office::Presidente {
        if let Some(entry) = overrides.get(number) {
            return (entry.name.clone(), entry.party.clone());
        }
    }

    let key = CandidateKey {
        office: office.clone(),
        number,
    };
    match candidates.get(&key) {
        Some(candidate) => (candidate.name.clone(), candidate.party.clone()),
        None => (format!("{} ({})", office, number), "N/A".to_string()),
    }
}
