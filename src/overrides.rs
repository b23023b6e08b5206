use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// One forced presidential entry: the upstream registry files disagree with
/// the section files on top-of-ticket names (a state-level "22" is not the
/// presidential "22"), so the canonical name/party per ballot number is
/// pinned explicitly per election year.
#[derive(Debug, Clone, Deserialize)]
pub struct OverrideEntry {
    pub number: u32,
    pub name: String,
    pub party: String,
}

#[derive(Debug, Clone, Default)]
pub struct PresidentialOverrides {
    entries: HashMap<u32, OverrideEntry>,
}

impl PresidentialOverrides {
    /// Built-in tables for the years the upstream data is known to need
    /// correcting. Other years start empty; use a JSON file for those.
    pub fn for_year(year: u16) -> Self {
        let table: &[(u32, &str, &str)] = match year {
            2018 => &[
                (17, "JAIR BOLSONARO", "PSL"),
                (13, "FERNANDO HADDAD", "PT"),
                (12, "CIRO GOMES", "PDT"),
                (15, "GERALDO ALCKMIN", "PSDB"),
                (45, "MARINA SILVA", "REDE"),
                (50, "GUILHERME BOULOS", "PSOL"),
                (30, "JOÃO AMOEDO", "NOVO"),
                (19, "CABO DACIOLO", "PATRIOTA"),
                (27, "HENRIQUE MEIRELLES", "MDB"),
                (51, "JOSÉ MARIA EYMAEL", "DC"),
                (16, "VERA LUCIA", "PSTU"),
                (62, "JOÃO GOULART FILHO", "PPL"),
                (21, "ALVARO DIAS", "PODE"),
                (95, "BRANCO", "N/A"),
                (96, "NULO", "N/A"),
            ],
            2022 => &[
                (22, "JAIR BOLSONARO", "PL"),
                (13, "LULA", "PT"),
                (12, "CIRO GOMES", "PDT"),
                (15, "SIMONE TEBET", "MDB"),
                (95, "BRANCO", "N/A"),
                (96, "NULO", "N/A"),
            ],
            _ => &[],
        };

        let entries = table
            .iter()
            .map(|&(number, name, party)| {
                (
                    number,
                    OverrideEntry {
                        number,
                        name: name.to_string(),
                        party: party.to_string(),
                    },
                )
            })
            .collect();
        Self { entries }
    }

    /// Load a table from a JSON array of `{number, name, party}` objects.
    pub fn from_json(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open overrides file: {:?}", path))?;
        let list: Vec<OverrideEntry> = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("failed to parse overrides file: {:?}", path))?;

        let entries = list.into_iter().map(|e| (e.number, e)).collect();
        Ok(Self { entries })
    }

    pub fn get(&self, number: u32) -> Option<&OverrideEntry> {
        self.entries.get(&number)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
