use std::io::{Read, Write};

use csv::{ReaderBuilder, WriterBuilder};

use crate::form::submission::ParticipantRequest;
use crate::participant::{find, Participant};

/// Writes the roster as CSV: `id,name,email,wishlist,assigned_to_name`
pub fn write_roster_csv<W: Write>(roster: &[Participant], writer: W) -> Result<(), csv::Error> {
    let mut wtr = WriterBuilder::new().from_writer(writer);
    wtr.write_record(["id", "name", "email", "wishlist", "assigned_to_name"])?;

    for p in roster {
        let assigned_name = p
            .assigned_to
            .as_ref()
            .and_then(|id| find(roster, id))
            .map(|r| r.name.as_str())
            .unwrap_or_default();
        wtr.write_record([
            p.id.as_str(),
            p.name.as_str(),
            p.email.as_str(),
            p.wishlist.as_str(),
            assigned_name,
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Reads `name,email,wishlist` rows for bulk registration.
///
/// The header row is required; the wishlist column may be missing.
/// Rows are returned unvalidated, paired with their 1-based line number.
pub fn read_roster_csv<R: Read>(reader: R) -> Result<Vec<(usize, ParticipantRequest)>, csv::Error> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
    let name_col = column("name");
    let email_col = column("email");
    let wish_col = column("wishlist");

    let mut rows = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let record = result?;
        let field = |col: Option<usize>| col.and_then(|c| record.get(c)).unwrap_or("").to_string();
        let wishlist = field(wish_col);
        rows.push((
            i + 2,
            ParticipantRequest {
                name: field(name_col),
                email: field(email_col),
                wishlist: (!wishlist.is_empty()).then_some(wishlist),
            },
        ));
    }
    Ok(rows)
}
