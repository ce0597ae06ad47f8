use cle::{AccountReport, Result};

use csv::Writer;

pub fn write_report(report: &[AccountReport]) -> Result<String> {
    let mut writer = Writer::from_writer(vec![]);

    for line in report {
        log::debug!("Serializing report line: {line:?}");
        writer.serialize(line)?;
    }

    let utf8 = writer.into_inner()?;
    let string = String::from_utf8(utf8)?;

    return Ok(string);
}
