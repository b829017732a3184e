//! Turns the recorded statuses into the body of a report email.

use askama::Template;

use crate::structures::{errors::StatusBoardError, model::StatusRecord};

#[derive(Debug, Template)]
#[template(path = "report.html")]
struct ReportTemplate<'a> {
    title: &'a str,
    records: &'a [StatusRecord],
}

/// A rendered report, ready to be addressed to any number of recipients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Renders one `site_name: status` entry per record, in the order given.
///
/// Pure: the same title and records always give byte-identical output. An
/// empty slice yields a report with a heading and no entries.
pub fn render(title: &str, records: &[StatusRecord]) -> Result<Report, StatusBoardError> {
    let html = ReportTemplate { title, records }.render()?;

    let text = std::iter::once(title.to_string())
        .chain(
            records
                .iter()
                .map(|r| format!("{}: {}", r.site_name, r.status)),
        )
        .collect::<Vec<_>>()
        .join("\n");

    Ok(Report {
        subject: title.to_string(),
        text,
        html,
    })
}
