use anyhow::{Context, Result};
use chrono::NaiveDate;
use ep_core::{Country, Member};
use rusqlite::{params, Connection};
use std::collections::BTreeSet;

/// Insert or update members. Terms are merged, never removed, and a bare
/// identity record does not clear biographical fields already stored.
pub fn upsert_members(conn: &Connection, members: &[Member]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut upserted = 0;

    for member in members {
        let external_id = member.external_id as i64;
        let date_of_birth = member.date_of_birth.map(|d| d.to_string());
        let country = member.country.map(Country::iso_code);

        tx.execute(
            r#"INSERT INTO member (external_id, first_name, last_name, date_of_birth, country)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(external_id) DO UPDATE SET
                first_name = COALESCE(excluded.first_name, first_name),
                last_name = COALESCE(excluded.last_name, last_name),
                date_of_birth = COALESCE(excluded.date_of_birth, date_of_birth),
                country = COALESCE(excluded.country, country),
                updated_at = datetime('now')"#,
            params![
                external_id,
                &member.first_name,
                &member.last_name,
                &date_of_birth,
                country,
            ],
        )?;
        upserted += 1;

        for term in &member.terms {
            tx.execute(
                "INSERT OR IGNORE INTO member_term (external_id, term) VALUES (?1, ?2)",
                params![external_id, term],
            )?;
        }
    }

    tx.commit()?;
    tracing::info!(upserted, "upserted members");
    Ok(upserted)
}

pub fn load_members(conn: &Connection) -> Result<Vec<Member>> {
    let mut stmt = conn.prepare(
        "SELECT external_id, first_name, last_name, date_of_birth, country
         FROM member ORDER BY external_id",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, Option<String>>(1)?,
            row.get::<_, Option<String>>(2)?,
            row.get::<_, Option<String>>(3)?,
            row.get::<_, Option<String>>(4)?,
        ))
    })?;

    let mut term_stmt =
        conn.prepare("SELECT term FROM member_term WHERE external_id = ?1 ORDER BY term")?;

    let mut members = Vec::new();
    for row in rows {
        let (external_id, first_name, last_name, date_of_birth, country) = row?;
        let terms = term_stmt
            .query_map(params![external_id], |row| row.get::<_, u32>(0))?
            .collect::<rusqlite::Result<BTreeSet<_>>>()?;

        let date_of_birth = date_of_birth
            .map(|d| d.parse::<NaiveDate>())
            .transpose()
            .with_context(|| format!("bad date_of_birth stored for member {external_id}"))?;
        let country = country
            .map(|c| c.parse::<Country>())
            .transpose()
            .with_context(|| format!("bad country stored for member {external_id}"))?;

        members.push(Member {
            external_id: external_id as u64,
            terms,
            first_name,
            last_name,
            date_of_birth,
            country,
        });
    }

    Ok(members)
}
