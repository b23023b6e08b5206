use crate::structures::{LocationKey, PollingLocation, VoteMap};
use anyhow::{Context, Result};
use duckdb::types::Value;
use duckdb::{params, params_from_iter, Connection, Transaction};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS locais_votacao (
    id_tse      VARCHAR PRIMARY KEY,
    nome_local  VARCHAR NOT NULL,
    endereco    VARCHAR,
    bairro      VARCHAR,
    cidade      VARCHAR,
    latitude    DOUBLE,
    longitude   DOUBLE
);

CREATE TABLE IF NOT EXISTS votos_agregados (
    ano              INTEGER NOT NULL,
    cargo            VARCHAR NOT NULL,
    candidato_numero INTEGER NOT NULL,
    candidato_nome   VARCHAR NOT NULL,
    partido_sigla    VARCHAR,
    local_tse        VARCHAR NOT NULL,
    total_votos      BIGINT NOT NULL,
    UNIQUE (ano, cargo, candidato_numero, local_tse)
);
"#;

/// Flushes one run's reference table and aggregate map into the store.
///
/// Everything for a year goes through a single transaction on a single
/// connection: a failed batch rolls the whole year back to its prior state.
pub struct VoteWriter {
    conn: Connection,
    batch_size: usize,
}

impl VoteWriter {
    pub fn open(path: &Path, batch_size: usize) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database: {:?}", path))?;
        Self::with_connection(conn, batch_size)
    }

    #[cfg(test)]
    pub fn open_in_memory(batch_size: usize) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, batch_size)
    }

    fn with_connection(conn: Connection, batch_size: usize) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .context("failed to initialize schema")?;
        Ok(Self { conn, batch_size })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Persist one year. With `replace` set (the default), prior rows for the
    /// year are removed first so a re-import is a full replacement rather
    /// than an accumulation.
    pub fn write_year(
        &mut self,
        year: u16,
        locations: &HashMap<LocationKey, PollingLocation>,
        totals: &VoteMap,
        replace: bool,
    ) -> Result<()> {
        let batch_size = self.batch_size;
        let tx = self.conn.transaction().context("failed to begin transaction")?;

        if replace {
            let removed = tx
                .execute(
                    "DELETE FROM votos_agregados WHERE ano = ?",
                    params![year as i32],
                )
                .context("failed to clear prior year")?;
            info!(year, removed, "cleared prior aggregate rows");
        }

        upsert_locations(&tx, locations, batch_size)?;
        upsert_votes(&tx, year, totals, batch_size)?;

        tx.commit().context("failed to commit import transaction")?;
        info!(
            year,
            locations = locations.len(),
            aggregates = totals.len(),
            "import committed"
        );
        Ok(())
    }
}

fn upsert_locations(
    tx: &Transaction,
    locations: &HashMap<LocationKey, PollingLocation>,
    batch_size: usize,
) -> Result<()> {
    // Sorted so batch contents are stable run to run.
    let mut rows: Vec<&PollingLocation> = locations.values().collect();
    rows.sort_by_key(|loc| loc.key);

    for chunk in rows.chunks(batch_size) {
        let placeholders = vec!["(?, ?, ?, ?, ?, ?, ?)"; chunk.len()].join(", ");
        let sql = format!(
            "INSERT INTO locais_votacao \
             (id_tse, nome_local, endereco, bairro, cidade, latitude, longitude) \
             VALUES {placeholders} \
             ON CONFLICT (id_tse) DO UPDATE SET \
             nome_local = excluded.nome_local, \
             endereco = excluded.endereco, \
             bairro = excluded.bairro"
        );

        let mut values = Vec::with_capacity(chunk.len() * 7);
        for loc in chunk {
            values.push(Value::Text(loc.id_tse()));
            values.push(Value::Text(loc.name.clone()));
            values.push(Value::Text(loc.address.clone()));
            values.push(Value::Text(loc.neighborhood.clone()));
            values.push(Value::Text(loc.city.clone()));
            values.push(loc.latitude.map(Value::Double).unwrap_or(Value::Null));
            values.push(loc.longitude.map(Value::Double).unwrap_or(Value::Null));
        }

        tx.execute(&sql, params_from_iter(values))
            .context("failed to upsert polling locations")?;
    }

    Ok(())
}

fn upsert_votes(tx: &Transaction, year: u16, totals: &VoteMap, batch_size: usize) -> Result<()> {
    let rows: Vec<_> = totals.iter().collect();

    for chunk in rows.chunks(batch_size) {
        let placeholders = vec!["(?, ?, ?, ?, ?, ?, ?)"; chunk.len()].join(", ");
        let sql = format!(
            "INSERT INTO votos_agregados \
             (ano, cargo, candidato_numero, candidato_nome, partido_sigla, local_tse, total_votos) \
             VALUES {placeholders} \
             ON CONFLICT (ano, cargo, candidato_numero, local_tse) DO UPDATE SET \
             total_votos = excluded.total_votos, \
             candidato_nome = excluded.candidato_nome, \
             partido_sigla = excluded.partido_sigla"
        );

        let mut values = Vec::with_capacity(chunk.len() * 7);
        for (key, total) in chunk {
            values.push(Value::Int(year as i32));
            values.push(Value::Text(key.office.name().to_string()));
            values.push(Value::Int(key.number as i32));
            values.push(Value::Text(total.name.clone()));
            values.push(Value::Text(total.party.clone()));
            values.push(Value::Text(key.location.to_string()));
            values.push(Value::BigInt(total.votes as i64));
        }

        tx.execute(&sql, params_from_iter(values))
            .context("failed to upsert aggregated votes")?;
    }

    Ok(())
}
