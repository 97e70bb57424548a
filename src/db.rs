//! Database schema and operations

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};

use crate::models::{Operator, Site, SiteType};

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Production sites, listed in insertion order (rowid)
        CREATE TABLE IF NOT EXISTS sites (
            id TEXT PRIMARY KEY,
            site_type TEXT NOT NULL
        );

        -- Raw resources a site declares extractable
        CREATE TABLE IF NOT EXISTS site_resources (
            site_id TEXT NOT NULL,
            resource TEXT NOT NULL,
            position INTEGER NOT NULL,
            PRIMARY KEY (site_id, resource)
        );

        CREATE TABLE IF NOT EXISTS operators (
            name TEXT PRIMARY KEY,
            capacity INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS operator_skills (
            operator_name TEXT NOT NULL,
            skill TEXT NOT NULL,
            level INTEGER NOT NULL,
            PRIMARY KEY (operator_name, skill)
        );

        CREATE INDEX IF NOT EXISTS idx_site_resources_site ON site_resources(site_id);
        CREATE INDEX IF NOT EXISTS idx_operator_skills_operator ON operator_skills(operator_name);
        "#,
    )?;
    Ok(())
}

/// Insert or update a site, replacing its resource list
pub fn upsert_site(conn: &Connection, site: &Site) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO sites (id, site_type) VALUES (?1, ?2)
         ON CONFLICT(id) DO UPDATE SET site_type = excluded.site_type",
        (&site.id, site.site_type.to_string()),
    )?;

    tx.execute("DELETE FROM site_resources WHERE site_id = ?1", [&site.id])?;
    for (position, resource) in site.resources.iter().enumerate() {
        tx.execute(
            "INSERT OR IGNORE INTO site_resources (site_id, resource, position)
             VALUES (?1, ?2, ?3)",
            (&site.id, resource, position as i64),
        )?;
    }
    tx.commit()?;
    Ok(())
}

/// Insert or update an operator, replacing its skills
pub fn upsert_operator(conn: &Connection, operator: &Operator) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO operators (name, capacity) VALUES (?1, ?2)
         ON CONFLICT(name) DO UPDATE SET capacity = excluded.capacity",
        (&operator.name, operator.capacity as i64),
    )?;

    tx.execute(
        "DELETE FROM operator_skills WHERE operator_name = ?1",
        [&operator.name],
    )?;
    for (skill, level) in &operator.skills {
        tx.execute(
            "INSERT INTO operator_skills (operator_name, skill, level) VALUES (?1, ?2, ?3)",
            (&operator.name, skill, *level),
        )?;
    }
    tx.commit()?;
    Ok(())
}

/// Clear all sites and operators (for re-import)
pub fn clear_inventory(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DELETE FROM operator_skills;
        DELETE FROM operators;
        DELETE FROM site_resources;
        DELETE FROM sites;
        "#,
    )?;
    Ok(())
}

fn site_resources(conn: &Connection, site_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT resource FROM site_resources WHERE site_id = ?1 ORDER BY position",
    )?;

    let rows = stmt.query_map([site_id], |row| row.get(0))?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

fn operator_skills(conn: &Connection, name: &str) -> Result<BTreeMap<String, u32>> {
    let mut stmt = conn.prepare(
        "SELECT skill, level FROM operator_skills WHERE operator_name = ?1",
    )?;

    let rows = stmt.query_map([name], |row| Ok((row.get(0)?, row.get(1)?)))?;

    let mut results = BTreeMap::new();
    for row in rows {
        let (skill, level): (String, u32) = row?;
        results.insert(skill, level);
    }
    Ok(results)
}

fn load_site(conn: &Connection, id: String, site_type: &str) -> Result<Site> {
    let site_type: SiteType = site_type
        .parse()
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("site {} has a bad type", id))?;
    let resources = site_resources(conn, &id)?;
    Ok(Site {
        id,
        site_type,
        resources,
    })
}

/// List all sites in insertion order
pub fn list_sites(conn: &Connection) -> Result<Vec<Site>> {
    let mut stmt = conn.prepare("SELECT id, site_type FROM sites ORDER BY rowid")?;

    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

    let mut results = Vec::new();
    for row in rows {
        let (id, site_type) = row?;
        results.push(load_site(conn, id, &site_type)?);
    }
    Ok(results)
}

pub fn get_site(conn: &Connection, id: &str) -> Result<Option<Site>> {
    let row: Option<(String, String)> = conn
        .query_row(
            "SELECT id, site_type FROM sites WHERE id = ?1",
            [id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    match row {
        Some((id, site_type)) => Ok(Some(load_site(conn, id, &site_type)?)),
        None => Ok(None),
    }
}

/// List all operators in insertion order
pub fn list_operators(conn: &Connection) -> Result<Vec<Operator>> {
    let mut stmt = conn.prepare("SELECT name, capacity FROM operators ORDER BY rowid")?;

    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;

    let mut results = Vec::new();
    for row in rows {
        let (name, capacity) = row?;
        let skills = operator_skills(conn, &name)?;
        results.push(Operator {
            capacity: usize::try_from(capacity)
                .with_context(|| format!("operator {} has negative capacity", name))?,
            name,
            skills,
        });
    }
    Ok(results)
}

pub fn get_operator(conn: &Connection, name: &str) -> Result<Option<Operator>> {
    let capacity: Option<i64> = conn
        .query_row(
            "SELECT capacity FROM operators WHERE name = ?1",
            [name],
            |row| row.get(0),
        )
        .optional()?;

    match capacity {
        Some(capacity) => Ok(Some(Operator {
            name: name.to_string(),
            capacity: usize::try_from(capacity)
                .with_context(|| format!("operator {} has negative capacity", name))?,
            skills: operator_skills(conn, name)?,
        })),
        None => Ok(None),
    }
}
