use comfy_table::{Cell, Table};

use crate::clients;
use crate::error::Result;
use crate::fmt::money;

pub fn add(name: &str, email: Option<&str>, phone: Option<&str>, address: Option<&str>) -> Result<()> {
    let conn = super::open_db()?;
    let id = clients::add_client(&conn, name, email, phone, address)?;
    println!("Added client {id}: {}", name.trim());
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = super::open_db()?;
    let rows = clients::list_clients(&conn)?;
    if rows.is_empty() {
        println!("No clients yet. Add one with `tally clients add NAME`.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Email", "Phone", "Address", "Outstanding"]);
    for c in rows {
        table.add_row(vec![
            Cell::new(c.id),
            Cell::new(c.name),
            Cell::new(c.email.unwrap_or_default()),
            Cell::new(c.phone.unwrap_or_default()),
            Cell::new(c.address.unwrap_or_default()),
            Cell::new(money(c.outstanding)),
        ]);
    }
    println!("Clients\n{table}");
    Ok(())
}

pub fn delete(id: i64) -> Result<()> {
    let conn = super::open_db()?;
    clients::delete_client(&conn, id)?;
    println!("Deleted client {id}");
    Ok(())
}
