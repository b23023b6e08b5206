use anyhow::{Context, Result};
use colored::Colorize;
use duckdb::{params, Connection};
use tracing::warn;

#[derive(Debug)]
pub struct OfficeTotal {
    pub office: String,
    pub votes: i64,
    pub locations: i64,
}

#[derive(Debug)]
pub struct YearTotal {
    pub year: i32,
    pub votes: i64,
    pub rows: i64,
}

/// Persisted vote totals per office for one year, largest first.
pub fn office_totals(conn: &Connection, year: u16) -> Result<Vec<OfficeTotal>> {
    let mut stmt = conn
        .prepare(
            "SELECT cargo, \
                    CAST(SUM(total_votos) AS BIGINT), \
                    COUNT(DISTINCT local_tse) \
             FROM votos_agregados WHERE ano = ? \
             GROUP BY cargo ORDER BY 2 DESC",
        )
        .context("failed to prepare office totals query")?;

    let rows = stmt
        .query_map(params![year as i32], |row| {
            Ok(OfficeTotal {
                office: row.get(0)?,
                votes: row.get(1)?,
                locations: row.get(2)?,
            })
        })
        .context("failed to query office totals")?;

    rows.collect::<Result<Vec<_>, _>>()
        .context("failed to read office totals")
}

/// Persisted totals per year across the whole table.
pub fn year_totals(conn: &Connection) -> Result<Vec<YearTotal>> {
    let mut stmt = conn
        .prepare(
            "SELECT ano, CAST(SUM(total_votos) AS BIGINT), COUNT(*) \
             FROM votos_agregados GROUP BY ano ORDER BY ano",
        )
        .context("failed to prepare year totals query")?;

    let rows = stmt
        .query_map([], |row| {
            Ok(YearTotal {
                year: row.get(0)?,
                votes: row.get(1)?,
                rows: row.get(2)?,
            })
        })
        .context("failed to query year totals")?;

    rows.collect::<Result<Vec<_>, _>>()
        .context("failed to read year totals")
}

/// Operator-facing sanity summary for one year. Diagnostic only; the totals
/// are meant to be eyeballed against published reference figures.
pub fn print_year_summary(conn: &Connection, year: u16) -> Result<()> {
    let totals = office_totals(conn, year)?;
    if totals.is_empty() {
        warn!(year, "no aggregated rows for this year");
        return Ok(());
    }

    println!();
    println!("{}", format!("RESUMO {year}").bold());
    println!("{}", "-".repeat(56));
    let mut grand_total: i64 = 0;
    for t in &totals {
        grand_total += t.votes;
        println!(
            "  {:<22} {:>14} votos em {:>5} locais",
            t.office,
            t.votes,
            t.locations
        );
    }
    println!("{}", "-".repeat(56));
    println!("  {:<22} {:>14} votos", "TOTAL".bold(), grand_total);
    Ok(())
}

/// Whole-table summary for the `validate` subcommand without a year filter.
pub fn print_all_years(conn: &Connection) -> Result<()> {
    let totals = year_totals(conn)?;
    if totals.is_empty() {
        warn!("aggregate table is empty");
        return Ok(());
    }

    println!();
    println!("{}", "RESUMO POR ANO".bold());
    println!("{}", "-".repeat(56));
    for t in &totals {
        println!(
            "  {:<8} {:>14} votos em {:>8} registros",
            t.year, t.votes, t.rows
        );
    }
    Ok(())
}
