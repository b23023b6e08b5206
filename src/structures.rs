use std::collections::BTreeMap;
use std::fmt::{self, Display};
use tracing::info;

/// Natural key of a polling place: municipality + electoral zone + location
/// number, as reported by the TSE exports. Field values like "012" and "12"
/// identify the same place, so the key is held numerically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocationKey {
    pub municipality: u32,
    pub zone: u32,
    pub location: u32,
}

impl LocationKey {
    pub fn from_fields(municipality: &str, zone: &str, location: &str) -> Option<Self> {
        Some(Self {
            municipality: municipality.trim().parse().ok()?,
            zone: zone.trim().parse().ok()?,
            location: location.trim().parse().ok()?,
        })
    }
}

impl Display for LocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.municipality, self.zone, self.location)
    }
}

#[derive(Debug, Clone)]
pub struct PollingLocation {
    pub key: LocationKey,
    pub name: String,
    pub address: String,
    pub neighborhood: String,
    pub city: String,
    /// None when the export carries no usable coordinate (empty, zero or
    /// unparseable). Never stored as 0.0.
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl PollingLocation {
    pub fn id_tse(&self) -> String {
        self.key.to_string()
    }
}

/// Elected office, from the TSE numeric office code. Codes outside the fixed
/// table fall back to the raw description field, uppercased; rows carrying
/// neither resolve to DESCONHECIDO. The fallback is deterministic and never
/// drops a row on its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Office {
    Presidente,
    VicePresidente,
    Governador,
    ViceGovernador,
    Senador,
    DeputadoFederal,
    DeputadoEstadual,
    PrimeiroSuplente,
    SegundoSuplente,
    Outro(String),
}

impl Office {
    pub fn from_code(code: Option<&str>, description: Option<&str>) -> Self {
        if let Some(code) = code.and_then(|c| c.trim().parse::<u32>().ok()) {
            match code {
                1 => return Office::Presidente,
                2 => return Office::VicePresidente,
                3 => return Office::Governador,
                4 => return Office::ViceGovernador,
                5 => return Office::Senador,
                6 => return Office::DeputadoFederal,
                7 => return Office::DeputadoEstadual,
                8 => return Office::PrimeiroSuplente,
                9 => return Office::SegundoSuplente,
                _ => {}
            }
        }
        match description.map(str::trim).filter(|d| !d.is_empty()) {
            Some(d) => Office::Outro(d.to_uppercase()),
            None => Office::Outro("DESCONHECIDO".to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Office::Presidente => "PRESIDENTE",
            Office::VicePresidente => "VICE-PRESIDENTE",
            Office::Governador => "GOVERNADOR",
            Office::ViceGovernador => "VICE-GOVERNADOR",
            Office::Senador => "SENADOR",
            Office::DeputadoFederal => "DEPUTADO FEDERAL",
            Office::DeputadoEstadual => "DEPUTADO ESTADUAL",
            Office::PrimeiroSuplente => "1º SUPLENTE",
            Office::SegundoSuplente => "2º SUPLENTE",
            Office::Outro(d) => d,
        }
    }

    pub fn is_unmapped(&self) -> bool {
        matches!(self, Office::Outro(_))
    }
}

impl Display for Office {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CandidateKey {
    pub office: Office,
    pub number: u32,
}

#[derive(Debug, Clone)]
pub struct Candidate {
    pub name: String,
    pub party: String,
}

/// Aggregation key for one run: year is fixed per invocation so it is not
/// part of the in-memory key, only of the persisted row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoteKey {
    pub location: LocationKey,
    pub office: Office,
    pub number: u32,
}

#[derive(Debug, Clone)]
pub struct VoteTotal {
    pub name: String,
    pub party: String,
    pub votes: u64,
}

/// BTreeMap keeps the flush order deterministic across runs.
pub type VoteMap = BTreeMap<VoteKey, VoteTotal>;

/// Latitude/longitude parser for TSE exports: decimal comma accepted; empty,
/// zero and garbage all mean "no coordinate".
pub fn parse_coordinate(raw: &str) -> Option<f64> {
    let value: f64 = raw.trim().replace(',', ".").parse().ok()?;
    if value == 0.0 || !value.is_finite() {
        None
    } else {
        Some(value)
    }
}

/// QT_VOTOS parser. Malformed counts read as zero; the caller counts them.
pub fn parse_votes(raw: &str) -> Option<u64> {
    raw.trim().parse().ok()
}

/// Per-record skip accounting for one import run. Per-record problems never
/// abort the run; they end up here and in the operator summary.
#[derive(Debug, Default)]
pub struct ImportStats {
    pub rows_read: u64,
    pub rows_aggregated: u64,
    pub filtered_out: u64,
    pub missing_key_fields: u64,
    pub unknown_location: u64,
    pub malformed_ballot: u64,
    pub malformed_votes: u64,
    pub unmapped_office: u64,
}

impl ImportStats {
    pub fn log_summary(&self) {
        info!(
            rows_read = self.rows_read,
            rows_aggregated = self.rows_aggregated,
            filtered_out = self.filtered_out,
            missing_key_fields = self.missing_key_fields,
            unknown_location = self.unknown_location,
            malformed_ballot = self.malformed_ballot,
            malformed_votes = self.malformed_votes,
            unmapped_office = self.unmapped_office,
            "vote aggregation finished"
        );
    }
}
