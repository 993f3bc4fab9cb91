use crate::lookup::ContactRecord;
use std::io::{self, Write};

const HEADER: &str = "Last name, first name\tMobile\tWork\tHome\tE-Mail";

/// Writes the group line and one tab separated row per contact, in input order.
pub fn write_report<W: Write>(writer: &mut W, group: &str, contacts: &[ContactRecord]) -> io::Result<()> {
    writeln!(writer, "In this season you play in group {group}.")?;
    writeln!(writer)?;
    writeln!(writer, "Your opponents are as follows:")?;
    writeln!(writer, "{HEADER}")?;
    for contact in contacts {
        writeln!(
            writer,
            "{}, {}\t{}\t{}\t{}\t{}",
            contact.last_name,
            contact.first_name,
            contact.phone_mobile,
            contact.phone_office,
            contact.phone_home,
            contact.email
        )?;
    }
    Ok(())
}
